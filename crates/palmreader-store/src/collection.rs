//! Collection operations on an open [`Database`].
//!
//! Records are JSON documents. Each call is a single statement against one
//! collection table and is therefore atomic with respect to that
//! collection. A lookup of a missing key yields `None`, never an error.

use std::fmt;

use rusqlite::types::ToSqlOutput;
use rusqlite::{Connection, OptionalExtension, ToSql};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::db::Database;
use crate::error::{StoreError, StoreResult};
use crate::migration::table_name;

/// A record key: text for caller-keyed collections, an integer for
/// engine-assigned ones.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Text(String),
    Int(i64),
}

impl Key {
    /// The integer value, if this is an engine-assigned key.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(id) => Some(*id),
            Self::Text(_) => None,
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Int(i) => write!(f, "{i}"),
        }
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for Key {
    fn from(id: i64) -> Self {
        Self::Int(id)
    }
}

impl ToSql for Key {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match self {
            Self::Text(s) => s.to_sql(),
            Self::Int(i) => i.to_sql(),
        }
    }
}

/// Key layout of a collection as recorded in the catalogue.
#[derive(Debug)]
enum Layout {
    OutOfLine,
    InLine(String),
    AutoIncrement(String),
}

/// Look up a collection in the `_collections` catalogue.
fn describe(conn: &Connection, collection: &str) -> StoreResult<(String, Layout)> {
    let row: Option<(String, Option<String>)> = conn
        .query_row(
            "SELECT scheme, key_path FROM _collections WHERE name = ?1",
            rusqlite::params![collection],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    let (scheme, key_path) =
        row.ok_or_else(|| StoreError::UnknownCollection(collection.to_owned()))?;
    let layout = match (scheme.as_str(), key_path) {
        ("out_of_line", _) => Layout::OutOfLine,
        ("in_line", Some(path)) => Layout::InLine(path),
        ("auto_increment", Some(path)) => Layout::AutoIncrement(path),
        (other, _) => {
            return Err(StoreError::InvalidArgument(format!(
                "corrupt catalogue entry for {collection}: {other}"
            )));
        }
    };
    Ok((table_name(collection), layout))
}

fn check_key(collection: &str, layout: &Layout, key: &Key) -> StoreResult<()> {
    match (layout, key) {
        (Layout::AutoIncrement(_), Key::Int(_)) => Ok(()),
        (Layout::OutOfLine | Layout::InLine(_), Key::Text(_)) => Ok(()),
        _ => Err(StoreError::InvalidArgument(format!(
            "key {key} has the wrong type for {collection}"
        ))),
    }
}

fn decode(layout: &Layout, key: Key, raw: &str) -> StoreResult<Value> {
    let mut value: Value = serde_json::from_str(raw)?;
    if let (Layout::AutoIncrement(path), Key::Int(id), Value::Object(map)) =
        (layout, key, &mut value)
    {
        map.insert(path.clone(), Value::from(id));
    }
    Ok(value)
}

fn read_key(row: &rusqlite::Row<'_>, layout: &Layout) -> rusqlite::Result<Key> {
    match layout {
        Layout::AutoIncrement(_) => Ok(Key::Int(row.get(0)?)),
        Layout::OutOfLine | Layout::InLine(_) => Ok(Key::Text(row.get(0)?)),
    }
}

fn inline_key(collection: &str, path: &str, value: &Value) -> StoreResult<Key> {
    match value.get(path) {
        Some(Value::String(s)) if !s.is_empty() => Ok(Key::Text(s.clone())),
        _ => Err(StoreError::InvalidArgument(format!(
            "record for {collection} needs a non-empty string `{path}`"
        ))),
    }
}

fn is_constraint(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

impl Database {
    /// Fetch the record stored under `key`, or `None` if absent.
    #[instrument(skip(self))]
    pub async fn get(&self, collection: &str, key: Key) -> StoreResult<Option<Value>> {
        let collection = collection.to_owned();
        self.execute(move |conn| {
            let (table, layout) = describe(conn, &collection)?;
            check_key(&collection, &layout, &key)?;

            let raw: Option<String> = conn
                .query_row(
                    &format!("SELECT value FROM {table} WHERE key = ?1"),
                    rusqlite::params![key],
                    |row| row.get(0),
                )
                .optional()?;

            raw.map(|raw| decode(&layout, key, &raw)).transpose()
        })
        .await
    }

    /// Insert or replace a record.
    ///
    /// Out-of-line collections need `key`; in-line collections read it from
    /// the record and reject an explicit one. Returns the key written.
    #[instrument(skip(self, value))]
    pub async fn put(&self, collection: &str, key: Option<Key>, value: Value) -> StoreResult<Key> {
        let collection = collection.to_owned();
        self.execute(move |conn| {
            let (table, layout) = describe(conn, &collection)?;
            let mut value = value;

            let key = match (&layout, key) {
                (Layout::OutOfLine, Some(key)) => key,
                (Layout::InLine(path), None) => inline_key(&collection, path, &value)?,
                (Layout::AutoIncrement(path), None) => {
                    match value.get(path.as_str()).and_then(Value::as_i64) {
                        Some(id) => Key::Int(id),
                        None => {
                            return Err(StoreError::InvalidArgument(format!(
                                "put into {collection} needs an existing `{path}`; use add"
                            )));
                        }
                    }
                }
                (Layout::OutOfLine, None) => {
                    return Err(StoreError::InvalidArgument(format!(
                        "{collection} requires an explicit key"
                    )));
                }
                (_, Some(key)) => {
                    return Err(StoreError::InvalidArgument(format!(
                        "{collection} keys records in-line; got explicit key {key}"
                    )));
                }
            };
            check_key(&collection, &layout, &key)?;

            if let (Layout::AutoIncrement(path), Value::Object(map)) = (&layout, &mut value) {
                map.remove(path.as_str());
            }

            conn.execute(
                &format!(
                    "INSERT INTO {table} (key, value) VALUES (?1, ?2) \
                     ON CONFLICT(key) DO UPDATE SET value = excluded.value"
                ),
                rusqlite::params![key, serde_json::to_string(&value)?],
            )?;
            debug!(collection = %collection, key = %key, "record written");
            Ok(key)
        })
        .await
    }

    /// Insert a new record, failing with [`StoreError::KeyExists`] if its
    /// key is taken. Auto-increment collections assign and return the key.
    #[instrument(skip(self, value))]
    pub async fn add(&self, collection: &str, value: Value) -> StoreResult<Key> {
        let collection = collection.to_owned();
        self.execute(move |conn| {
            let (table, layout) = describe(conn, &collection)?;
            let mut value = value;

            let key = match &layout {
                Layout::OutOfLine => {
                    return Err(StoreError::InvalidArgument(format!(
                        "{collection} requires an explicit key; use put"
                    )));
                }
                Layout::InLine(path) => {
                    let key = inline_key(&collection, path, &value)?;
                    let inserted = conn.execute(
                        &format!("INSERT INTO {table} (key, value) VALUES (?1, ?2)"),
                        rusqlite::params![key, serde_json::to_string(&value)?],
                    );
                    match inserted {
                        Ok(_) => key,
                        Err(e) if is_constraint(&e) => {
                            return Err(StoreError::KeyExists {
                                collection,
                                key: key.to_string(),
                            });
                        }
                        Err(e) => return Err(e.into()),
                    }
                }
                Layout::AutoIncrement(path) => {
                    if let Value::Object(map) = &mut value {
                        map.remove(path.as_str());
                    }
                    conn.execute(
                        &format!("INSERT INTO {table} (value) VALUES (?1)"),
                        rusqlite::params![serde_json::to_string(&value)?],
                    )?;
                    Key::Int(conn.last_insert_rowid())
                }
            };

            debug!(collection = %collection, key = %key, "record added");
            Ok(key)
        })
        .await
    }

    /// All records in the collection, in key order.
    #[instrument(skip(self))]
    pub async fn get_all(&self, collection: &str) -> StoreResult<Vec<Value>> {
        let collection = collection.to_owned();
        self.execute(move |conn| {
            let (table, layout) = describe(conn, &collection)?;
            let mut stmt = conn.prepare(&format!("SELECT key, value FROM {table} ORDER BY key"))?;
            let rows = stmt
                .query_map([], |row| Ok((read_key(row, &layout)?, row.get::<_, String>(1)?)))?
                .collect::<Result<Vec<_>, _>>()?;

            rows.into_iter()
                .map(|(key, raw)| decode(&layout, key, &raw))
                .collect()
        })
        .await
    }

    /// Number of records in the collection.
    pub async fn count(&self, collection: &str) -> StoreResult<u64> {
        let collection = collection.to_owned();
        self.execute(move |conn| {
            let (table, _) = describe(conn, &collection)?;
            let count: i64 =
                conn.query_row(&format!("SELECT count(*) FROM {table}"), [], |row| row.get(0))?;
            Ok(count.max(0) as u64)
        })
        .await
    }

    /// Remove every record from the collection. Clearing an empty
    /// collection is a no-op. Auto-increment counters are not reset.
    #[instrument(skip(self))]
    pub async fn clear(&self, collection: &str) -> StoreResult<()> {
        let collection = collection.to_owned();
        self.execute(move |conn| {
            let (table, _) = describe(conn, &collection)?;
            let removed = conn.execute(&format!("DELETE FROM {table}"), [])?;
            debug!(collection = %collection, removed, "collection cleared");
            Ok(())
        })
        .await
    }

    /// Typed [`Database::get`] for out-of-line collections.
    pub async fn get_value<T>(&self, collection: &str, key: &str) -> StoreResult<Option<T>>
    where
        T: DeserializeOwned,
    {
        match self.get(collection, Key::from(key)).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Typed [`Database::put`] for out-of-line collections.
    pub async fn set_value<T>(&self, collection: &str, key: &str, value: &T) -> StoreResult<()>
    where
        T: Serialize + ?Sized,
    {
        let value = serde_json::to_value(value)?;
        self.put(collection, Some(Key::from(key)), value).await?;
        Ok(())
    }
}

// ── tests ────────────────────────────────────────────────────────────
