use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::json;
use tracing::{error, info, warn};

use super::dto::{
    CategoryTotalDto, CreateExpenseRequest, ExpenseDto, MessageDto, UpdateExpenseRequest,
};
use super::error::ApiError;
use super::AppState;

pub const WELCOME_MESSAGE: &str = "Welcome to the backend API!";
pub const DELETED_MESSAGE: &str = "Expense deleted successfully";

const SAVE_FAILED: &str = "Error saving expense";
const FETCH_FAILED: &str = "Error fetching expenses";
const UPDATE_FAILED: &str = "Error updating expense";
const DELETE_FAILED: &str = "Error deleting expense";
const ANALYTICS_FAILED: &str = "Error fetching analytics";

/// GET / - Plain text greeting
pub async fn welcome() -> &'static str {
    WELCOME_MESSAGE
}

/// GET /api/health - Store reachability
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    match state.store.ping() {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "ok" }))),
        Err(e) => {
            warn!("Health check failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "status": "unavailable", "error": e.to_string() })),
            )
        }
    }
}

/// POST /api/expenses - Create an expense
pub async fn create_expense(
    State(state): State<AppState>,
    payload: Result<Json<CreateExpenseRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ExpenseDto>), ApiError> {
    let Json(req) = payload.map_err(|rejection| {
        warn!("Rejected expense body: {}", rejection.body_text());
        ApiError::from_rejection(SAVE_FAILED, rejection)
    })?;

    match state.store.insert(req.into()) {
        Ok(expense) => {
            info!(id = %expense.id, category = %expense.category, "Created expense");
            Ok((StatusCode::CREATED, Json(expense.into())))
        }
        Err(e) => {
            error!("Failed to save expense: {}", e);
            Err(ApiError::from_write(SAVE_FAILED, e))
        }
    }
}

/// GET /api/expenses - All expenses, newest first
pub async fn list_expenses(
    State(state): State<AppState>,
) -> Result<Json<Vec<ExpenseDto>>, ApiError> {
    match state.store.list() {
        Ok(expenses) => Ok(Json(expenses.into_iter().map(ExpenseDto::from).collect())),
        Err(e) => {
            error!("Failed to fetch expenses: {}", e);
            Err(ApiError::storage(FETCH_FAILED, e))
        }
    }
}

/// PUT /api/expenses/:id - Overwrite an expense
pub async fn update_expense(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateExpenseRequest>, JsonRejection>,
) -> Result<Json<ExpenseDto>, ApiError> {
    let Json(req) = payload.map_err(|rejection| {
        warn!(id = %id, "Rejected expense update body: {}", rejection.body_text());
        // A failed cast on update is a write failure, not a client error
        ApiError::storage(UPDATE_FAILED, rejection.body_text())
    })?;

    match state.store.update(&id, req.into()) {
        Ok(Some(expense)) => {
            info!(id = %expense.id, "Updated expense");
            Ok(Json(expense.into()))
        }
        Ok(None) => Err(ApiError::NotFound),
        Err(e) => {
            error!(id = %id, "Failed to update expense: {}", e);
            Err(ApiError::storage(UPDATE_FAILED, e))
        }
    }
}

/// DELETE /api/expenses/:id - Remove an expense
pub async fn delete_expense(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageDto>, ApiError> {
    match state.store.delete(&id) {
        Ok(Some(expense)) => {
            info!(id = %expense.id, "Deleted expense");
            Ok(Json(MessageDto::new(DELETED_MESSAGE)))
        }
        Ok(None) => Err(ApiError::NotFound),
        Err(e) => {
            error!(id = %id, "Failed to delete expense: {}", e);
            Err(ApiError::storage(DELETE_FAILED, e))
        }
    }
}

/// GET /api/analytics - Spending per category
pub async fn analytics(
    State(state): State<AppState>,
) -> Result<Json<Vec<CategoryTotalDto>>, ApiError> {
    match state.store.totals_by_category() {
        Ok(totals) => Ok(Json(totals.into_iter().map(CategoryTotalDto::from).collect())),
        Err(e) => {
            error!("Failed to fetch analytics: {}", e);
            Err(ApiError::storage(ANALYTICS_FAILED, e))
        }
    }
}
