use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::info;

use crate::expense::{parse_date, NewExpense};
use crate::store::ExpenseStore;

/// One CSV line: `amount,description,category,date`
#[derive(Debug, Deserialize)]
struct CsvExpense {
    amount: f64,
    #[serde(default)]
    description: Option<String>,
    category: String,
    #[serde(default)]
    date: Option<String>,
}

impl CsvExpense {
    fn into_new_expense(self, line: u64) -> Result<NewExpense> {
        let date = match self.date.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(
                parse_date(raw).ok_or_else(|| anyhow!("line {}: invalid date {:?}", line, raw))?,
            ),
        };

        let description = self.description.filter(|d| !d.trim().is_empty());

        Ok(NewExpense::new(self.amount, description, self.category, date))
    }
}

/// Read expenses from a CSV file with a header row
pub fn load_csv(csv_path: &Path) -> Result<Vec<NewExpense>> {
    let rdr = csv::Reader::from_path(csv_path)
        .with_context(|| format!("Failed to open CSV file {}", csv_path.display()))?;

    read_expenses(rdr)
}

fn read_expenses<R: std::io::Read>(mut rdr: csv::Reader<R>) -> Result<Vec<NewExpense>> {
    let mut expenses = Vec::new();

    for (index, result) in rdr.deserialize::<CsvExpense>().enumerate() {
        // Header is line 1
        let line = index as u64 + 2;
        let row = result.with_context(|| format!("Failed to deserialize expense on line {}", line))?;
        expenses.push(row.into_new_expense(line)?);
    }

    Ok(expenses)
}

/// Insert every expense, stopping at the first store failure
pub fn import_expenses(store: &dyn ExpenseStore, expenses: Vec<NewExpense>) -> Result<usize> {
    let mut inserted = 0;

    for expense in expenses {
        store
            .insert(expense)
            .with_context(|| format!("Failed to insert expense #{}", inserted + 1))?;
        inserted += 1;
    }

    info!(inserted, "Imported expenses");
    Ok(inserted)
}
