use chrono::{DateTime, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::expense::{
    date_from_millis, parse_date, truncate_to_millis, CategoryTotal, Expense, ExpenseChanges,
    NewExpense,
};

/// Body of `POST /api/expenses`
#[derive(Debug, Deserialize)]
pub struct CreateExpenseRequest {
    #[serde(deserialize_with = "required_amount")]
    pub amount: f64,
    #[serde(default, deserialize_with = "optional_text")]
    pub description: Option<String>,
    #[serde(deserialize_with = "required_text")]
    pub category: String,
    #[serde(default, deserialize_with = "optional_date")]
    pub date: Option<DateTime<Utc>>,
}

impl From<CreateExpenseRequest> for NewExpense {
    fn from(req: CreateExpenseRequest) -> Self {
        NewExpense::new(req.amount, req.description, req.category, req.date)
    }
}

/// Body of `PUT /api/expenses/:id`.
///
/// Every field is optional and an omitted field clears the stored value.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateExpenseRequest {
    #[serde(default, deserialize_with = "optional_amount")]
    pub amount: Option<f64>,
    #[serde(default, deserialize_with = "optional_text")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "optional_text")]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "optional_date")]
    pub date: Option<DateTime<Utc>>,
}

impl From<UpdateExpenseRequest> for ExpenseChanges {
    fn from(req: UpdateExpenseRequest) -> Self {
        Self {
            amount: req.amount,
            description: req.description,
            category: req.category,
            date: req.date,
        }
    }
}

/// Expense as returned to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseDto {
    #[serde(rename = "_id")]
    pub id: String,
    pub amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
}

impl From<Expense> for ExpenseDto {
    fn from(expense: Expense) -> Self {
        Self {
            id: expense.id,
            amount: expense.amount,
            description: expense.description,
            category: expense.category,
            date: expense.date,
        }
    }
}

/// One analytics row, shaped for chart libraries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryTotalDto {
    pub name: String,
    pub value: f64,
}

impl From<CategoryTotal> for CategoryTotalDto {
    fn from(total: CategoryTotal) -> Self {
        Self {
            name: total.category,
            value: total.total,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageDto {
    pub message: String,
}

impl MessageDto {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

// ============================================================================
// Type coercion
// Numbers may arrive as strings and text as numbers; nothing else is checked.
// ============================================================================

fn coerce_amount(value: Value) -> Result<Option<f64>, String> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => n
            .as_f64()
            .map(Some)
            .ok_or_else(|| format!("Cast to Number failed for value \"{n}\"")),
        Value::Bool(b) => Ok(Some(if b { 1.0 } else { 0.0 })),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .map(Some)
            .ok_or_else(|| format!("Cast to Number failed for value \"{s}\"")),
        other => Err(format!("Cast to Number failed for value \"{other}\"")),
    }
}

fn coerce_text(value: Value) -> Result<Option<String>, String> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::Bool(b) => Ok(Some(b.to_string())),
        other => Err(format!("Cast to string failed for value \"{other}\"")),
    }
}

/// Falsy values (`null`, `""`, `0`, `false`) mean "no date"
fn coerce_date(value: Value) -> Result<Option<DateTime<Utc>>, String> {
    match value {
        Value::Null | Value::Bool(false) => Ok(None),
        Value::String(s) if s.is_empty() => Ok(None),
        Value::String(s) => parse_date(&s)
            .map(Some)
            .ok_or_else(|| format!("Cast to date failed for value \"{s}\"")),
        Value::Number(n) => match n.as_f64() {
            Some(millis) if millis == 0.0 => Ok(None),
            Some(millis) => date_from_millis(millis as i64)
                .map(|d| Some(truncate_to_millis(d)))
                .ok_or_else(|| format!("Cast to date failed for value \"{n}\"")),
            None => Err(format!("Cast to date failed for value \"{n}\"")),
        },
        other => Err(format!("Cast to date failed for value \"{other}\"")),
    }
}

fn required_amount<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    coerce_amount(Value::deserialize(deserializer)?)
        .map_err(de::Error::custom)?
        .ok_or_else(|| de::Error::custom("Path `amount` is required."))
}

fn optional_amount<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    coerce_amount(Value::deserialize(deserializer)?).map_err(de::Error::custom)
}

fn required_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    coerce_text(Value::deserialize(deserializer)?)
        .map_err(de::Error::custom)?
        .filter(|s| !s.is_empty())
        .ok_or_else(|| de::Error::custom("Path `category` is required."))
}

fn optional_text<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    coerce_text(Value::deserialize(deserializer)?).map_err(de::Error::custom)
}

fn optional_date<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error> {
    coerce_date(Value::deserialize(deserializer)?).map_err(de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn create(body: Value) -> Result<CreateExpenseRequest, serde_json::Error> {
        serde_json::from_value(body)
    }

    #[test]
    fn test_create_request_minimal() {
        let req = create(json!({"amount": 10, "category": "food"})).unwrap();

        assert_eq!(req.amount, 10.0);
        assert_eq!(req.category, "food");
        assert_eq!(req.description, None);
        assert_eq!(req.date, None);
    }

    #[test]
    fn test_create_request_coerces_types() {
        let req = create(json!({
            "amount": " 12.50 ",
            "category": 42,
            "description": null,
            "date": "2024-02-29"
        }))
        .unwrap();

        assert_eq!(req.amount, 12.5);
        assert_eq!(req.category, "42");
        assert_eq!(req.date, parse_date("2024-02-29"));
    }

    #[test]
    fn test_create_request_requires_amount_and_category() {
        let err = create(json!({"category": "food"})).unwrap_err();
        assert!(err.to_string().contains("amount"), "{err}");

        let err = create(json!({"amount": 3})).unwrap_err();
        assert!(err.to_string().contains("category"), "{err}");

        assert!(create(json!({"amount": null, "category": "food"})).is_err());
        assert!(create(json!({"amount": 3, "category": ""})).is_err());
    }

    #[test]
    fn test_create_request_rejects_uncastable_values() {
        assert!(create(json!({"amount": "lots", "category": "food"})).is_err());
        assert!(create(json!({"amount": [1], "category": "food"})).is_err());
        assert!(create(json!({"amount": {"n": 1}, "category": "food"})).is_err());
        assert!(create(json!({"amount": 1, "category": {"a": 1}})).is_err());
        assert!(create(json!({"amount": 1, "category": "food", "date": "someday"})).is_err());
    }

    #[test]
    fn test_boolean_amount_casts_to_number() {
        let req = create(json!({"amount": true, "category": "gift"})).unwrap();
        assert_eq!(req.amount, 1.0);

        let req = create(json!({"amount": false, "category": "gift"})).unwrap();
        assert_eq!(req.amount, 0.0);
    }

    #[test]
    fn test_falsy_dates_mean_absent() {
        for date in [json!(null), json!(""), json!(0), json!(false)] {
            let req = create(json!({"amount": 1, "category": "x", "date": date})).unwrap();
            assert_eq!(req.date, None);
        }

        let req = create(json!({"amount": 1, "category": "x", "date": 1_700_000_000_000i64}))
            .unwrap();
        assert_eq!(req.date, date_from_millis(1_700_000_000_000));
    }

    #[test]
    fn test_update_request_all_optional() {
        let req: UpdateExpenseRequest = serde_json::from_value(json!({})).unwrap();
        let changes = ExpenseChanges::from(req);

        assert_eq!(changes, ExpenseChanges::default());
    }

    #[test]
    fn test_expense_dto_shape() {
        let dto = ExpenseDto::from(Expense {
            id: "6b7c2a7e-9a3e-4f0e-8f53-5d1f1c9d8a11".to_string(),
            amount: 4.5,
            description: None,
            category: "coffee".to_string(),
            date: parse_date("2024-01-02T03:04:05Z"),
        });

        let value = serde_json::to_value(&dto).unwrap();
        assert_eq!(
            value,
            json!({
                "_id": "6b7c2a7e-9a3e-4f0e-8f53-5d1f1c9d8a11",
                "amount": 4.5,
                "category": "coffee",
                "date": "2024-01-02T03:04:05Z"
            })
        );
    }

    #[test]
    fn test_category_total_dto_shape() {
        let dto = CategoryTotalDto::from(CategoryTotal {
            category: "rent".to_string(),
            total: 20.0,
        });

        assert_eq!(
            serde_json::to_value(dto).unwrap(),
            json!({"name": "rent", "value": 20.0})
        );
    }
}
