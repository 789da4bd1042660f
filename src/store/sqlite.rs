use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::{Path, PathBuf};
use tracing::{error, info};

use super::{generate_id, parse_id, ExpenseStore, StoreError, StoreResult};
use crate::expense::{
    date_from_millis, date_to_millis, CategoryTotal, Expense, ExpenseChanges, NewExpense,
};

const MEMORY_LOCATION: &str = ":memory:";

const EXPENSE_COLUMNS: &str = "id, amount, description, category, date";

/// SQLite-backed expense collection.
///
/// The connection is opened lazily: if the database cannot be opened at
/// startup the store stays disconnected and every call retries the open,
/// failing with `StoreError::Unavailable` until it succeeds.
pub struct SqliteStore {
    location: PathBuf,
    conn: Mutex<Option<Connection>>,
}

impl SqliteStore {
    /// Open the database at `path`, failing if it cannot be opened
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let location = path.as_ref().to_path_buf();
        let conn = open_connection(&location)?;

        Ok(Self {
            location,
            conn: Mutex::new(Some(conn)),
        })
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        Self::open(MEMORY_LOCATION)
    }

    /// Open the database at `database_url`, logging instead of failing.
    ///
    /// Accepts a plain path, a `sqlite://` URL or `:memory:`.
    pub fn connect(database_url: &str) -> Self {
        let location = PathBuf::from(
            database_url
                .strip_prefix("sqlite://")
                .unwrap_or(database_url),
        );

        let conn = match open_connection(&location) {
            Ok(conn) => {
                info!(database = %location.display(), "Connected to database");
                Some(conn)
            }
            Err(e) => {
                error!(database = %location.display(), error = %e, "Error connecting to database");
                None
            }
        };

        Self {
            location,
            conn: Mutex::new(conn),
        }
    }

    /// Number of stored expenses
    pub fn count(&self) -> StoreResult<i64> {
        self.with_conn(|conn| {
            let count = conn.query_row("SELECT COUNT(*) FROM expenses", [], |row| row.get(0))?;
            Ok(count)
        })
    }

    fn with_conn<T>(&self, op: impl FnOnce(&Connection) -> StoreResult<T>) -> StoreResult<T> {
        let mut guard = self.conn.lock();

        if guard.is_none() {
            let conn = open_connection(&self.location)
                .map_err(|e| StoreError::Unavailable(e.to_string()))?;
            info!(database = %self.location.display(), "Reconnected to database");
            *guard = Some(conn);
        }

        match guard.as_ref() {
            Some(conn) => op(conn),
            None => Err(StoreError::Unavailable("no database connection".to_string())),
        }
    }
}

fn open_connection(location: &Path) -> StoreResult<Connection> {
    let conn = Connection::open(location)?;

    if location != Path::new(MEMORY_LOCATION) {
        // WAL for crash recovery
        conn.pragma_update(None, "journal_mode", "WAL")?;
    }

    setup_database(&conn)?;
    Ok(conn)
}

/// Create the expenses table and its indexes if missing.
///
/// The table schema is the only place `amount` and `category` are enforced.
pub fn setup_database(conn: &Connection) -> StoreResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS expenses (
            id TEXT PRIMARY KEY NOT NULL,
            amount REAL NOT NULL,
            description TEXT,
            category TEXT NOT NULL CHECK (length(category) > 0),
            date INTEGER
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_expenses_date ON expenses(date)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_expenses_category ON expenses(category)",
        [],
    )?;

    Ok(())
}

fn row_to_expense(row: &Row) -> rusqlite::Result<Expense> {
    let date_millis: Option<i64> = row.get(4)?;

    Ok(Expense {
        id: row.get(0)?,
        amount: row.get(1)?,
        description: row.get(2)?,
        category: row.get(3)?,
        date: date_millis.and_then(date_from_millis),
    })
}

impl ExpenseStore for SqliteStore {
    fn insert(&self, expense: NewExpense) -> StoreResult<Expense> {
        let id = generate_id();

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO expenses (id, amount, description, category, date)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    id,
                    expense.amount,
                    expense.description,
                    expense.category,
                    date_to_millis(&expense.date),
                ],
            )?;
            Ok(())
        })?;

        Ok(Expense {
            id,
            amount: expense.amount,
            description: expense.description,
            category: expense.category,
            date: Some(expense.date),
        })
    }

    fn list(&self) -> StoreResult<Vec<Expense>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {EXPENSE_COLUMNS} FROM expenses ORDER BY date DESC"
            ))?;

            let expenses = stmt
                .query_map([], row_to_expense)?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(expenses)
        })
    }

    fn update(&self, id: &str, changes: ExpenseChanges) -> StoreResult<Option<Expense>> {
        let id = parse_id(id)?;

        self.with_conn(|conn| {
            let updated = conn
                .query_row(
                    &format!(
                        "UPDATE expenses
                         SET amount = ?2, description = ?3, category = ?4, date = ?5
                         WHERE id = ?1
                         RETURNING {EXPENSE_COLUMNS}"
                    ),
                    params![
                        id,
                        changes.amount,
                        changes.description,
                        changes.category,
                        changes.date.as_ref().map(date_to_millis),
                    ],
                    row_to_expense,
                )
                .optional()?;

            Ok(updated)
        })
    }

    fn delete(&self, id: &str) -> StoreResult<Option<Expense>> {
        let id = parse_id(id)?;

        self.with_conn(|conn| {
            let deleted = conn
                .query_row(
                    &format!("DELETE FROM expenses WHERE id = ?1 RETURNING {EXPENSE_COLUMNS}"),
                    params![id],
                    row_to_expense,
                )
                .optional()?;

            Ok(deleted)
        })
    }

    fn totals_by_category(&self) -> StoreResult<Vec<CategoryTotal>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT category, SUM(amount) AS total
                 FROM expenses
                 GROUP BY category",
            )?;

            let totals = stmt
                .query_map([], |row| {
                    Ok(CategoryTotal {
                        category: row.get(0)?,
                        total: row.get(1)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(totals)
        })
    }

    fn ping(&self) -> StoreResult<()> {
        self.with_conn(|conn| {
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
            Ok(())
        })
    }
}
