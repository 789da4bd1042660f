// Expense Ledger - Core Library
// Exposes all modules for use in the CLI, the API server and tests

pub mod config;
pub mod expense;
pub mod import;
pub mod logging;
pub mod store;

#[cfg(feature = "server")]
pub mod api;

// Re-export commonly used types
pub use config::ServerConfig;
pub use expense::{parse_date, CategoryTotal, Expense, ExpenseChanges, NewExpense};
pub use import::{import_expenses, load_csv};
pub use logging::init_logging;
pub use store::{ExpenseStore, MemoryStore, SqliteStore, StoreError, StoreResult};

#[cfg(feature = "server")]
pub use api::{router, ApiError, AppState};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
