// Storage layer
// The service only talks to an `ExpenseStore`; SQLite backs it in production,
// `MemoryStore` stands in for it in tests.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use thiserror::Error;
use uuid::Uuid;

use crate::expense::{CategoryTotal, Expense, ExpenseChanges, NewExpense};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Cast to id failed for value \"{0}\"")]
    InvalidId(String),

    #[error("Validation failed: {0}")]
    Constraint(String),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Database error: {0}")]
    Database(#[source] rusqlite::Error),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(ref failure, ref message)
                if failure.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                StoreError::Constraint(message.clone().unwrap_or_else(|| failure.to_string()))
            }
            other => StoreError::Database(other),
        }
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Persistent collection of expenses.
///
/// Each method is one storage call. Implementations own all consistency
/// concerns; callers never lock or sequence calls themselves.
pub trait ExpenseStore: Send + Sync {
    /// Store a new expense and return it with its generated id
    fn insert(&self, expense: NewExpense) -> StoreResult<Expense>;

    /// All expenses, most recent `date` first. Undated records sort last.
    fn list(&self) -> StoreResult<Vec<Expense>>;

    /// Overwrite every field of an expense. `Ok(None)` when the id is unknown.
    fn update(&self, id: &str, changes: ExpenseChanges) -> StoreResult<Option<Expense>>;

    /// Remove an expense, returning what was removed. `Ok(None)` when the id is unknown.
    fn delete(&self, id: &str) -> StoreResult<Option<Expense>>;

    /// Per-category sum of `amount`, in no particular order
    fn totals_by_category(&self) -> StoreResult<Vec<CategoryTotal>>;

    /// Cheap reachability check
    fn ping(&self) -> StoreResult<()>;
}

/// Normalize an external identifier, rejecting anything that is not a UUID
pub fn parse_id(id: &str) -> StoreResult<String> {
    Uuid::parse_str(id.trim())
        .map(|uuid| uuid.to_string())
        .map_err(|_| StoreError::InvalidId(id.to_string()))
}

pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}
