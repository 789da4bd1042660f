use parking_lot::RwLock;
use std::collections::HashMap;

use super::{generate_id, parse_id, ExpenseStore, StoreError, StoreResult};
use crate::expense::{CategoryTotal, Expense, ExpenseChanges, NewExpense};

/// In-process expense collection with the same semantics as `SqliteStore`.
///
/// Used as the substitute store in tests; nothing is persisted.
#[derive(Default)]
pub struct MemoryStore {
    expenses: RwLock<HashMap<String, Expense>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.expenses.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn check_required(amount: Option<f64>, category: Option<&str>) -> StoreResult<(f64, String)> {
    let amount =
        amount.ok_or_else(|| StoreError::Constraint("Path `amount` is required.".to_string()))?;

    match category {
        Some(category) if !category.is_empty() => Ok((amount, category.to_string())),
        _ => Err(StoreError::Constraint(
            "Path `category` is required.".to_string(),
        )),
    }
}

impl ExpenseStore for MemoryStore {
    fn insert(&self, expense: NewExpense) -> StoreResult<Expense> {
        let (amount, category) = check_required(Some(expense.amount), Some(&expense.category))?;

        let stored = Expense {
            id: generate_id(),
            amount,
            description: expense.description,
            category,
            date: Some(expense.date),
        };

        self.expenses
            .write()
            .insert(stored.id.clone(), stored.clone());

        Ok(stored)
    }

    fn list(&self) -> StoreResult<Vec<Expense>> {
        let mut expenses: Vec<Expense> = self.expenses.read().values().cloned().collect();
        // None < Some, so undated records land at the end
        expenses.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(expenses)
    }

    fn update(&self, id: &str, changes: ExpenseChanges) -> StoreResult<Option<Expense>> {
        let id = parse_id(id)?;
        let mut expenses = self.expenses.write();

        let Some(existing) = expenses.get_mut(&id) else {
            return Ok(None);
        };

        let (amount, category) = check_required(changes.amount, changes.category.as_deref())?;

        existing.amount = amount;
        existing.description = changes.description;
        existing.category = category;
        existing.date = changes.date;

        Ok(Some(existing.clone()))
    }

    fn delete(&self, id: &str) -> StoreResult<Option<Expense>> {
        let id = parse_id(id)?;
        Ok(self.expenses.write().remove(&id))
    }

    fn totals_by_category(&self) -> StoreResult<Vec<CategoryTotal>> {
        let mut totals: HashMap<String, f64> = HashMap::new();

        for expense in self.expenses.read().values() {
            *totals.entry(expense.category.clone()).or_insert(0.0) += expense.amount;
        }

        Ok(totals
            .into_iter()
            .map(|(category, total)| CategoryTotal { category, total })
            .collect())
    }

    fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expense::parse_date;

    #[test]
    fn test_memory_store_crud() {
        let store = MemoryStore::new();
        assert!(store.is_empty());

        let created = store
            .insert(NewExpense::new(9.99, None, "books", parse_date("2024-04-04")))
            .unwrap();
        assert_eq!(store.len(), 1);

        let mut changes = ExpenseChanges::from(&created);
        changes.description = Some("paperback".to_string());
        let updated = store.update(&created.id, changes).unwrap().unwrap();
        assert_eq!(updated.description.as_deref(), Some("paperback"));
        assert_eq!(updated.date, created.date);

        assert_eq!(store.delete(&created.id).unwrap(), Some(updated));
        assert!(store.is_empty());
    }

    #[test]
    fn test_memory_store_matches_sqlite_ordering() {
        let store = MemoryStore::new();
        let undated = store
            .insert(NewExpense::new(1.0, None, "a", parse_date("2024-01-01")))
            .unwrap();
        store
            .update(
                &undated.id,
                ExpenseChanges {
                    amount: Some(1.0),
                    category: Some("a".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        store
            .insert(NewExpense::new(2.0, None, "b", parse_date("2022-01-01")))
            .unwrap();
        store
            .insert(NewExpense::new(3.0, None, "c", parse_date("2023-01-01")))
            .unwrap();

        let amounts: Vec<f64> = store.list().unwrap().iter().map(|e| e.amount).collect();
        assert_eq!(amounts, vec![3.0, 2.0, 1.0]);
    }

    #[test]
    fn test_memory_store_update_requires_category() {
        let store = MemoryStore::new();
        let created = store
            .insert(NewExpense::new(1.0, None, "a", None))
            .unwrap();

        let err = store
            .update(
                &created.id,
                ExpenseChanges {
                    amount: Some(2.0),
                    ..Default::default()
                },
            )
            .unwrap_err();

        assert!(matches!(err, StoreError::Constraint(_)));
        assert_eq!(store.list().unwrap(), vec![created]);
    }
}
