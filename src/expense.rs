use chrono::{DateTime, NaiveDate, NaiveDateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

/// A single spending record as held by the store.
///
/// `amount` and `category` are always present; the store's schema rejects
/// rows without them. `date` can be cleared by an update, so it is optional
/// on the stored record even though creation always resolves one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    /// Opaque identifier assigned by the store (UUID v4), never reused
    pub id: String,
    pub amount: f64,
    pub description: Option<String>,
    pub category: String,
    pub date: Option<DateTime<Utc>>,
}

/// Input for creating an expense. The date is already resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct NewExpense {
    pub amount: f64,
    pub description: Option<String>,
    pub category: String,
    pub date: DateTime<Utc>,
}

impl NewExpense {
    /// Build a new expense, defaulting the date to `now` when none is given.
    pub fn new(
        amount: f64,
        description: Option<String>,
        category: impl Into<String>,
        date: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            amount,
            description,
            category: category.into(),
            date: truncate_to_millis(date.unwrap_or_else(Utc::now)),
        }
    }
}

/// Replacement values for an update.
///
/// Every field is written as given: `None` clears the stored value instead of
/// keeping it. Clearing `amount` or `category` is rejected by the store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpenseChanges {
    pub amount: Option<f64>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub date: Option<DateTime<Utc>>,
}

impl From<&Expense> for ExpenseChanges {
    fn from(expense: &Expense) -> Self {
        Self {
            amount: Some(expense.amount),
            description: expense.description.clone(),
            category: Some(expense.category.clone()),
            date: expense.date,
        }
    }
}

/// Sum of `amount` over all expenses sharing a category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryTotal {
    pub category: String,
    pub total: f64,
}

/// Store precision is one millisecond
pub fn truncate_to_millis(date: DateTime<Utc>) -> DateTime<Utc> {
    date.trunc_subsecs(3)
}

pub fn date_to_millis(date: &DateTime<Utc>) -> i64 {
    date.timestamp_millis()
}

pub fn date_from_millis(millis: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
}

/// Parse a caller-supplied date.
///
/// Accepts RFC 3339 (`2024-03-01T12:30:00Z`, any offset), a naive date-time
/// (`2024-03-01T12:30:00`, `2024-03-01 12:30:00.250`) read as UTC, and a bare
/// date (`2024-03-01`) read as midnight UTC.
pub fn parse_date(input: &str) -> Option<DateTime<Utc>> {
    let input = input.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(truncate_to_millis(dt.with_timezone(&Utc)));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(input, format) {
            return Some(truncate_to_millis(naive.and_utc()));
        }
    }

    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
