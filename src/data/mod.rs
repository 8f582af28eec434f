pub mod migrations;

use rusqlite::Connection;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::info;

use crate::error::{Result, SalesWebError};
use crate::metrics::{elapsed_secs, DatabaseMetrics};

/// Where the SQLite database lives, parsed from the `SalesWebContext`
/// connection string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    Memory,
    File(PathBuf),
}

impl DataSource {
    /// Accepts a bare path, `:memory:`, or a `key=value;` connection string
    /// carrying `Data Source`, `DataSource` or `Filename`.
    pub fn parse(connection_string: &str) -> Result<Self> {
        let trimmed = connection_string.trim();
        if trimmed.is_empty() {
            return Err(SalesWebError::Config("Connection string is empty".to_string()));
        }

        let source = if trimmed.contains('=') {
            trimmed
                .split(';')
                .filter_map(|pair| pair.split_once('='))
                .find(|(key, _)| {
                    let key = key.trim().to_ascii_lowercase().replace(' ', "");
                    key == "datasource" || key == "filename"
                })
                .map(|(_, value)| value.trim())
                .ok_or_else(|| {
                    SalesWebError::Config(format!(
                        "Unsupported connection string '{trimmed}': expected a SQLite Data Source"
                    ))
                })?
        } else {
            trimmed
        };

        if source == ":memory:" {
            Ok(DataSource::Memory)
        } else {
            Ok(DataSource::File(PathBuf::from(source)))
        }
    }
}

/// Database context shared by the request-scoped services.
///
/// Clones share one connection; every call runs on the blocking pool.
#[derive(Clone)]
pub struct SalesWebContext {
    conn: Arc<Mutex<Connection>>,
}

impl SalesWebContext {
    pub fn open(connection_string: &str) -> Result<Self> {
        let conn = match DataSource::parse(connection_string)? {
            DataSource::Memory => Connection::open_in_memory()?,
            DataSource::File(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent)?;
                }
                info!("Opening database at {}", path.display());
                let conn = Connection::open(&path)?;
                conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
                    row.get::<_, String>(0)
                })?;
                conn
            }
        };
        conn.pragma_update(None, "foreign_keys", "ON")?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::open(":memory:")
    }

    /// Runs `f` against the connection on the blocking thread pool.
    pub async fn call<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        let start = Instant::now();
        let result = tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|_| SalesWebError::Task("database connection lock poisoned".to_string()))?;
            f(&mut guard)
        })
        .await
        .map_err(|e| SalesWebError::Task(e.to_string()))
        .and_then(|inner| inner);

        match &result {
            Ok(_) => DatabaseMetrics::record_call_success(elapsed_secs(start)),
            Err(_) => DatabaseMetrics::record_call_error(elapsed_secs(start)),
        }
        result
    }

    /// Applies pending migrations, returning how many ran.
    pub async fn migrate(&self) -> Result<usize> {
        let applied = self.call(migrations::apply_migrations).await?;
        DatabaseMetrics::record_migrations_applied(applied);
        info!(applied, "Database migrations completed");
        Ok(applied)
    }
}
