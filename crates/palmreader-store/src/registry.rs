//! Process-wide registry of open stores.
//!
//! A [`StoreRegistry`] is created once at startup and handed to whatever
//! needs a store. Opening the same name twice, even concurrently, runs
//! the schema upgrade once and yields handles that share one connection.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::db::Database;
use crate::error::{StoreError, StoreResult};
use crate::migration::Migration;

/// Where the registry keeps its stores.
#[derive(Debug, Clone)]
pub enum Location {
    /// One `<name>.db` file per store inside this directory.
    Directory(PathBuf),
    /// Volatile in-memory stores; used by tests and dry runs.
    Memory,
}

/// Shared, lazily-initialised store handles keyed by name.
#[derive(Clone)]
pub struct StoreRegistry {
    inner: Arc<RegistryInner>,
}

struct RegistryInner {
    location: Location,
    handles: Mutex<HashMap<String, Arc<OnceCell<Database>>>>,
}

impl StoreRegistry {
    /// Registry keeping store files under `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self::with_location(Location::Directory(dir.into()))
    }

    /// Registry whose stores live in memory.
    pub fn in_memory() -> Self {
        Self::with_location(Location::Memory)
    }

    fn with_location(location: Location) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                location,
                handles: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Where stores are kept.
    pub fn location(&self) -> &Location {
        &self.inner.location
    }

    /// Open the store `name` at schema `version`.
    ///
    /// The first caller opens the connection and runs the upgrade; any
    /// concurrent caller waits on the same initialisation and receives a
    /// handle to the same connection. A later call asking for a newer
    /// version upgrades the shared handle in place; an older version fails
    /// with [`StoreError::VersionConflict`].
    pub async fn open(
        &self,
        name: &str,
        version: u32,
        migrations: &'static [Migration],
    ) -> StoreResult<Database> {
        validate_name(name)?;

        let cell = {
            let mut handles = self
                .inner
                .handles
                .lock()
                .map_err(|e| StoreError::TaskJoin(format!("mutex poisoned: {e}")))?;
            Arc::clone(handles.entry(name.to_owned()).or_default())
        };

        let db = cell
            .get_or_try_init(|| self.connect(name, version, migrations))
            .await?
            .clone();

        let active = db.version();
        if version < active {
            return Err(StoreError::VersionConflict {
                requested: version,
                active,
            });
        }
        if version > active {
            info!(store = name, from = active, to = version, "upgrading shared store");
            db.upgrade(version, migrations).await?;
        }

        Ok(db)
    }

    async fn connect(
        &self,
        name: &str,
        version: u32,
        migrations: &'static [Migration],
    ) -> StoreResult<Database> {
        let db = match &self.inner.location {
            Location::Directory(dir) => {
                let path = dir.join(format!("{name}.db"));
                tokio::task::spawn_blocking(move || Database::open(&path)).await??
            }
            Location::Memory => Database::open_in_memory()?,
        };
        db.upgrade(version, migrations).await?;
        debug!(store = name, version, "store handle initialised");
        Ok(db)
    }
}

fn validate_name(name: &str) -> StoreResult<()> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidArgument(format!("invalid store name: {name:?}")))
    }
}

// ── tests ────────────────────────────────────────────────────────────
