use anyhow::{bail, Context, Result};
use std::env;
use std::path::Path;

use expense_ledger::{
    import_expenses, init_logging, load_csv, ExpenseStore, ServerConfig, SqliteStore,
};

fn main() -> Result<()> {
    let config = ServerConfig::load().context("Failed to load configuration")?;
    init_logging(&config.log_level);

    let args: Vec<String> = env::args().collect();

    match args.get(1).map(String::as_str) {
        Some("import") => {
            let Some(csv_path) = args.get(2) else {
                bail!("usage: expense-ledger import <file.csv>");
            };
            run_import(&config, Path::new(csv_path))
        }
        Some("list") => run_list(&config),
        Some("summary") => run_summary(&config),
        _ => {
            print_usage();
            Ok(())
        }
    }
}

fn open_store(config: &ServerConfig) -> Result<SqliteStore> {
    let path = config
        .database_url
        .strip_prefix("sqlite://")
        .unwrap_or(&config.database_url);

    SqliteStore::open(path).with_context(|| format!("Failed to open database {}", path))
}

fn run_import(config: &ServerConfig, csv_path: &Path) -> Result<()> {
    println!("📂 Loading {}...", csv_path.display());
    let expenses = load_csv(csv_path)?;
    println!("✓ Loaded {} expenses from CSV", expenses.len());

    let store = open_store(config)?;
    let inserted = import_expenses(&store, expenses)?;
    let count = store.count()?;

    println!("✓ Inserted: {} expenses", inserted);
    println!("✓ Database now holds {} expenses", count);

    Ok(())
}

fn run_list(config: &ServerConfig) -> Result<()> {
    let store = open_store(config)?;

    for expense in store.list()? {
        let date = expense
            .date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "----------".to_string());

        println!(
            "{}  {:>10.2}  {:<16}  {}",
            date,
            expense.amount,
            expense.category,
            expense.description.as_deref().unwrap_or("")
        );
    }

    Ok(())
}

fn run_summary(config: &ServerConfig) -> Result<()> {
    let store = open_store(config)?;

    let mut totals = store.totals_by_category()?;
    totals.sort_by(|a, b| b.total.total_cmp(&a.total));

    let grand_total: f64 = totals.iter().map(|t| t.total).sum();

    for total in &totals {
        println!("{:<16}  {:>10.2}", total.category, total.total);
    }
    println!("{:<16}  {:>10.2}", "TOTAL", grand_total);

    Ok(())
}

fn print_usage() {
    println!("expense-ledger {}", expense_ledger::VERSION);
    println!();
    println!("Usage:");
    println!("  expense-ledger import <file.csv>   Load expenses (amount,description,category,date)");
    println!("  expense-ledger list                Print expenses, newest first");
    println!("  expense-ledger summary             Print spending per category");
    println!();
    println!("The database is taken from DATABASE_URL (default: finance.db).");
    println!("Run the HTTP API with: cargo run --bin expense-server");
}
