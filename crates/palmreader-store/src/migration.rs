//! Schema migration system.
//!
//! A store is described by an ordered list of [`Migration`]s. Each one
//! declares the collections that must exist once the store reaches its
//! version. Declaring a collection is idempotent: the backing table is
//! created with `CREATE TABLE IF NOT EXISTS` and registered in the
//! `_collections` catalogue, so existing records are never touched.
//!
//! Applied versions are tracked in a `_migrations` table. Every pending
//! migration for one version transition runs inside a single
//! `BEGIN IMMEDIATE` transaction.

use rusqlite::{Connection, OptionalExtension, TransactionBehavior};
use tracing::{debug, info, warn};

use crate::error::{StoreError, StoreResult};

/// How records in a collection are keyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyScheme {
    /// The caller supplies the key alongside the record.
    OutOfLine,
    /// The key is read from the named field of the record.
    InLine { key_path: &'static str },
    /// The engine assigns a strictly increasing integer and exposes it
    /// under the named field when the record is read back.
    AutoIncrement { key_path: &'static str },
}

impl KeyScheme {
    pub(crate) fn tag(&self) -> &'static str {
        match self {
            Self::OutOfLine => "out_of_line",
            Self::InLine { .. } => "in_line",
            Self::AutoIncrement { .. } => "auto_increment",
        }
    }

    pub(crate) fn key_path(&self) -> Option<&'static str> {
        match self {
            Self::OutOfLine => None,
            Self::InLine { key_path } | Self::AutoIncrement { key_path } => Some(key_path),
        }
    }
}

/// Declaration of a named collection.
#[derive(Debug, Clone, Copy)]
pub struct CollectionSpec {
    /// Collection name; lowercase ASCII letters, digits and `_` only.
    pub name: &'static str,
    /// Key scheme for records in this collection.
    pub keys: KeyScheme,
}

/// A single migration definition.
#[derive(Debug)]
pub struct Migration {
    /// Monotonically increasing version number (1, 2, 3, ...).
    pub version: u32,
    /// Human-readable description.
    pub description: &'static str,
    /// Collections that must exist after this migration.
    pub collections: &'static [CollectionSpec],
}

// ── public API ───────────────────────────────────────────────────────

/// Bring the store behind `conn` to `target`, applying every migration
/// with `current < version <= target` in one transaction.
///
/// Returns the version the store is at afterwards. This is a
/// **synchronous** function; call it from `spawn_blocking`.
pub fn run_to(conn: &mut Connection, target: u32, migrations: &[Migration]) -> StoreResult<u32> {
    validate(target, migrations)?;
    ensure_bookkeeping(conn)?;

    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(|e| StoreError::Migration {
            version: target,
            message: format!("failed to begin transaction: {e}"),
        })?;

    // Read inside the write lock so a racing process cannot upgrade between
    // the check and the apply.
    let current = current_version(&tx)?;
    if current > target {
        return Err(StoreError::VersionConflict {
            requested: target,
            active: current,
        });
    }
    if current == target {
        debug!(current_version = current, "store schema is up to date");
        return Ok(current);
    }

    let pending: Vec<&Migration> = migrations
        .iter()
        .filter(|m| m.version > current && m.version <= target)
        .collect();

    info!(
        current_version = current,
        target_version = target,
        pending = pending.len(),
        "running pending migrations"
    );

    for migration in pending {
        if let Err(err) = apply(&tx, migration) {
            warn!(version = migration.version, %err, "migration failed, rolling back");
            return Err(err);
        }
    }

    tx.commit().map_err(|e| StoreError::Migration {
        version: target,
        message: format!("failed to commit: {e}"),
    })?;

    info!(new_version = target, "all migrations applied");
    Ok(target)
}

/// Return the latest applied migration version, or 0 if none.
pub fn current_version(conn: &Connection) -> StoreResult<u32> {
    ensure_bookkeeping(conn)?;
    let version: u32 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM _migrations",
            [],
            |row| row.get(0),
        )
        .map_err(|e| StoreError::Migration {
            version: 0,
            message: format!("failed to read current version: {e}"),
        })?;
    Ok(version)
}

/// Physical table backing a collection.
pub(crate) fn table_name(collection: &str) -> String {
    format!("\"c_{collection}\"")
}

// ── internals ────────────────────────────────────────────────────────

fn validate(target: u32, migrations: &[Migration]) -> StoreResult<()> {
    for window in migrations.windows(2) {
        if window[1].version <= window[0].version {
            return Err(StoreError::InvalidArgument(format!(
                "migration versions must be strictly increasing: {} >= {}",
                window[0].version, window[1].version
            )));
        }
    }

    if target != 0 && !migrations.iter().any(|m| m.version == target) {
        return Err(StoreError::InvalidArgument(format!(
            "no migration declares version {target}"
        )));
    }

    for spec in migrations.iter().flat_map(|m| m.collections) {
        let valid = !spec.name.is_empty()
            && spec
                .name
                .bytes()
                .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_');
        if !valid {
            return Err(StoreError::InvalidArgument(format!(
                "invalid collection name: {:?}",
                spec.name
            )));
        }
    }

    Ok(())
}

/// Create the `_migrations` and `_collections` bookkeeping tables.
fn ensure_bookkeeping(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS _migrations (
            version     INTEGER PRIMARY KEY,
            description TEXT NOT NULL,
            applied_at  INTEGER NOT NULL
        );
        CREATE TABLE IF NOT EXISTS _collections (
            name      TEXT PRIMARY KEY,
            scheme    TEXT NOT NULL CHECK(scheme IN ('out_of_line','in_line','auto_increment')),
            key_path  TEXT
        );",
    )
    .map_err(|e| StoreError::Migration {
        version: 0,
        message: format!("failed to create bookkeeping tables: {e}"),
    })?;
    Ok(())
}

fn apply(conn: &Connection, migration: &Migration) -> StoreResult<()> {
    info!(
        version = migration.version,
        description = migration.description,
        "applying migration"
    );

    for spec in migration.collections {
        ensure_collection(conn, spec).map_err(|e| StoreError::Migration {
            version: migration.version,
            message: format!("collection {}: {e}", spec.name),
        })?;
    }

    let now = chrono::Utc::now().timestamp();
    conn.execute(
        "INSERT INTO _migrations (version, description, applied_at) VALUES (?1, ?2, ?3)",
        rusqlite::params![migration.version, migration.description, now],
    )
    .map_err(|e| StoreError::Migration {
        version: migration.version,
        message: format!("failed to record migration: {e}"),
    })?;

    Ok(())
}

fn ensure_collection(conn: &Connection, spec: &CollectionSpec) -> StoreResult<()> {
    let existing: Option<(String, Option<String>)> = conn
        .query_row(
            "SELECT scheme, key_path FROM _collections WHERE name = ?1",
            rusqlite::params![spec.name],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    if let Some((scheme, key_path)) = existing {
        if scheme != spec.keys.tag() || key_path.as_deref() != spec.keys.key_path() {
            return Err(StoreError::InvalidArgument(format!(
                "already declared as {scheme} with a different key scheme"
            )));
        }
        debug!(collection = spec.name, "collection already exists");
        return Ok(());
    }

    let table = table_name(spec.name);
    let ddl = match spec.keys {
        KeyScheme::OutOfLine | KeyScheme::InLine { .. } => format!(
            "CREATE TABLE IF NOT EXISTS {table} (key TEXT PRIMARY KEY, value TEXT NOT NULL)"
        ),
        KeyScheme::AutoIncrement { .. } => format!(
            "CREATE TABLE IF NOT EXISTS {table} (key INTEGER PRIMARY KEY AUTOINCREMENT, value TEXT NOT NULL)"
        ),
    };
    conn.execute_batch(&ddl)?;
    conn.execute(
        "INSERT INTO _collections (name, scheme, key_path) VALUES (?1, ?2, ?3)",
        rusqlite::params![spec.name, spec.keys.tag(), spec.keys.key_path()],
    )?;

    debug!(collection = spec.name, scheme = spec.keys.tag(), "collection created");
    Ok(())
}

// ── tests ────────────────────────────────────────────────────────────
