use crate::errors::StoreError;
use rusqlite::Connection;
use std::cell::RefCell;

const SCHEMA_SQL: &str = include_str!("../../sql/schema.sql");

// Thread-local connection slot, tagged with the path it was opened for.
thread_local! {
    static DB_CONN: RefCell<Option<(String, Connection)>> = RefCell::new(None);
}

/// Handle to the SQLite store. Cheap to clone (path only); each thread opens
/// its own connection on first use.
#[derive(Debug, Clone)]
pub struct Database {
    path: String,
}

impl Database {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Provides a mutable connection to the closure. Must not be nested.
    pub fn with_conn<F, T, E>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Connection) -> Result<T, E>,
        E: From<StoreError>,
    {
        DB_CONN
            .try_with(|cell| {
                let mut slot = cell.borrow_mut();

                let reuse = matches!(slot.as_ref(), Some((path, _)) if *path == self.path);
                if !reuse {
                    let conn = Connection::open(&self.path).map_err(|source| StoreError::Open {
                        path: self.path.clone(),
                        source,
                    })?;
                    *slot = Some((self.path.clone(), conn));
                }

                match slot.as_mut() {
                    Some((_, conn)) => f(conn),
                    None => Err(StoreError::Unavailable.into()),
                }
            })
            .map_err(|_| E::from(StoreError::Unavailable))?
    }
}

/// Create missing tables and indexes.
pub fn apply_schema(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

pub fn init_db(db: &Database) -> Result<(), StoreError> {
    db.with_conn(|conn| apply_schema(conn))?;
    tracing::info!(path = %db.path(), "database initialized");
    Ok(())
}
