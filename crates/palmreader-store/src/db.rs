//! SQLite-backed store handle with WAL mode and performance pragmas.
//!
//! The [`Database`] struct wraps a `rusqlite::Connection` behind an
//! `Arc<Mutex<>>` and exposes async methods that use
//! `tokio::task::spawn_blocking` to avoid blocking the async runtime.
//! Collection-level operations live in [`crate::collection`].

use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use rusqlite::Connection;
use tracing::{debug, info};

use crate::error::{StoreError, StoreResult};
use crate::migration::{self, Migration};

/// Thread-safe handle to an open store.
///
/// Cloning is cheap; every clone shares the same underlying connection.
/// All read/write operations go through [`Database::execute`] which
/// dispatches onto the blocking thread pool.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
    version: Arc<AtomicU32>,
}

impl Database {
    /// Open (or create) a database file at `path` and apply performance
    /// pragmas. The schema is left untouched; see [`Database::upgrade`].
    ///
    /// This call blocks briefly (file I/O), so call it during startup or
    /// wrap it in `spawn_blocking`.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "opening store");

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        Self::apply_pragmas(&conn)?;
        Self::from_connection(conn)
    }

    /// Create an in-memory database, used by tests.
    pub fn open_in_memory() -> StoreResult<Self> {
        debug!("opening in-memory store");

        let conn = Connection::open_in_memory()?;
        Self::apply_pragmas(&conn)?;
        Self::from_connection(conn)
    }

    /// Apply the migrations needed to reach `version`.
    ///
    /// Fails with [`StoreError::VersionConflict`] if the store is already at
    /// a newer version. Calls are serialised on the connection, so two
    /// concurrent upgrades to the same version run the migrations once.
    pub async fn upgrade(&self, version: u32, migrations: &'static [Migration]) -> StoreResult<u32> {
        let reached = self
            .execute_mut(move |conn| migration::run_to(conn, version, migrations))
            .await?;
        self.version.store(reached, Ordering::Release);
        Ok(reached)
    }

    /// Schema version this handle was last upgraded to (or found at).
    pub fn version(&self) -> u32 {
        self.version.load(Ordering::Acquire)
    }

    /// Execute an arbitrary closure against the connection on the blocking pool.
    ///
    /// The closure receives a `&Connection` and must return a `StoreResult<T>`.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let count: i64 = db.execute(|conn| {
    ///     let count = conn.query_row("SELECT count(*) FROM _migrations", [], |row| row.get(0))?;
    ///     Ok(count)
    /// }).await?;
    /// ```
    pub async fn execute<F, T>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&Connection) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .map_err(|e| StoreError::TaskJoin(format!("mutex poisoned: {e}")))?;
            f(&conn)
        })
        .await?
    }

    /// Execute a mutable closure (for transactions, etc.) on the blocking pool.
    pub async fn execute_mut<F, T>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&mut Connection) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|e| StoreError::TaskJoin(format!("mutex poisoned: {e}")))?;
            f(&mut conn)
        })
        .await?
    }

    /// Whether two handles share the same underlying connection.
    pub fn same_connection(&self, other: &Database) -> bool {
        Arc::ptr_eq(&self.conn, &other.conn)
    }

    fn from_connection(conn: Connection) -> StoreResult<Self> {
        let version = migration::current_version(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            version: Arc::new(AtomicU32::new(version)),
        })
    }

    // ── pragmas ──────────────────────────────────────────────────────

    fn apply_pragmas(conn: &Connection) -> StoreResult<()> {
        debug!("applying SQLite pragmas");

        // WAL mode: readers never block the single writer.
        conn.pragma_update(None, "journal_mode", "WAL")?;

        // NORMAL sync is safe with WAL; a power failure loses at most the
        // last transaction, never the file.
        conn.pragma_update(None, "synchronous", "NORMAL")?;

        // The store is small; 8 MiB of page cache is plenty.
        conn.pragma_update(None, "cache_size", -8_000_i32)?;

        conn.pragma_update(None, "temp_store", "MEMORY")?;

        // Another process holding the write lock makes us wait, not fail.
        conn.pragma_update(None, "busy_timeout", 5_000_i32)?;

        Ok(())
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("version", &self.version())
            .finish_non_exhaustive()
    }
}

// ── tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migration::{CollectionSpec, KeyScheme};

    static MIGRATIONS: &[Migration] = &[Migration {
        version: 1,
        description: "kv",
        collections: &[CollectionSpec {
            name: "kv",
            keys: KeyScheme::OutOfLine,
        }],
    }];

    #[tokio::test]
    async fn open_in_memory_works() {
        let db = Database::open_in_memory().unwrap();
        let version: String = db
            .execute(|conn| {
                let v: String =
                    conn.query_row("SELECT sqlite_version()", [], |row| row.get(0))?;
                Ok(v)
            })
            .await
            .unwrap();
        assert!(!version.is_empty());
        assert_eq!(db.version(), 0);
    }

    #[tokio::test]
    async fn upgrade_updates_version() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.upgrade(1, MIGRATIONS).await.unwrap(), 1);
        assert_eq!(db.version(), 1);
    }

    #[tokio::test]
    async fn clones_share_connection() {
        let db = Database::open_in_memory().unwrap();
        let other = Database::open_in_memory().unwrap();
        assert!(db.same_connection(&db.clone()));
        assert!(!db.same_connection(&other));
    }

    #[tokio::test]
    async fn reopen_reports_persisted_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("store.db");

        let db = Database::open(&path).unwrap();
        db.upgrade(1, MIGRATIONS).await.unwrap();
        drop(db);

        let db = Database::open(&path).unwrap();
        assert_eq!(db.version(), 1);
    }
}
