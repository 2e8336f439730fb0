//! Reading history (palm, tarot, horoscope).
//!
//! Readings are append-only and immutable once written. The collection can
//! only be emptied as a whole; there is no single-record delete.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::db::Database;
use crate::error::{StoreError, StoreResult};
use crate::schema::READINGS;

// ═══════════════════════════════════════════════════════════════════════
//  Types
// ═══════════════════════════════════════════════════════════════════════

/// Discriminant of a [`ReadingResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadingKind {
    Palm,
    Tarot,
    Horoscope,
}

impl ReadingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Palm => "palm",
            Self::Tarot => "tarot",
            Self::Horoscope => "horoscope",
        }
    }
}

impl std::fmt::Display for ReadingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The outcome of a reading, tagged by `type` when serialised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ReadingResult {
    /// Interpretation of a scanned palm.
    Palm { analysis: String },
    /// A tarot spread and its interpretation.
    Tarot {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        question: Option<String>,
        cards: Vec<String>,
        interpretation: String,
    },
    /// Guidance for a zodiac sign.
    Horoscope { sign: String, guidance: String },
}

impl ReadingResult {
    pub fn kind(&self) -> ReadingKind {
        match self {
            Self::Palm { .. } => ReadingKind::Palm,
            Self::Tarot { .. } => ReadingKind::Tarot,
            Self::Horoscope { .. } => ReadingKind::Horoscope,
        }
    }
}

/// A stored reading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reading {
    /// Unique identifier; UUID v7 unless the caller supplied one.
    pub id: String,
    /// Creation time in Unix milliseconds, stamped by the store.
    pub timestamp: i64,
    #[serde(flatten)]
    pub result: ReadingResult,
}

impl Reading {
    pub fn kind(&self) -> ReadingKind {
        self.result.kind()
    }
}

/// A reading about to be saved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReading {
    /// Explicit id; a fresh UUID v7 is assigned when `None`.
    pub id: Option<String>,
    pub result: ReadingResult,
}

impl NewReading {
    pub fn new(result: ReadingResult) -> Self {
        Self { id: None, result }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  ReadingStore
// ═══════════════════════════════════════════════════════════════════════

/// Append-only access to the `readings` collection.
#[derive(Clone, Debug)]
pub struct ReadingStore {
    db: Database,
}

impl ReadingStore {
    /// Create a new reading store backed by `db`.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Persist a reading and return it as stored.
    ///
    /// The timestamp is always the current time. Ids are UUID v7, so
    /// generated ids are unique even when several readings are saved in
    /// the same millisecond. Re-using an existing id fails with
    /// [`crate::StoreError::KeyExists`].
    #[instrument(skip(self, reading), fields(kind = %reading.result.kind()))]
    pub async fn save(&self, reading: NewReading) -> StoreResult<Reading> {
        let id = reading
            .id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| Uuid::now_v7().to_string());

        let entry = Reading {
            id,
            timestamp: Utc::now().timestamp_millis(),
            result: reading.result,
        };

        self.db
            .add(READINGS, serde_json::to_value(&entry)?)
            .await?;

        debug!(reading_id = %entry.id, "reading saved");
        Ok(entry)
    }

    /// Every stored reading, in no particular order.
    ///
    /// Callers that display history sort by `timestamp` descending.
    #[instrument(skip(self))]
    pub async fn all(&self) -> StoreResult<Vec<Reading>> {
        self.db
            .get_all(READINGS)
            .await?
            .into_iter()
            .map(|value| serde_json::from_value(value).map_err(StoreError::from))
            .collect()
    }

    pub async fn count(&self) -> StoreResult<u64> {
        self.db.count(READINGS).await
    }

    /// Remove every reading. Does not touch chat history.
    #[instrument(skip(self))]
    pub async fn clear(&self) -> StoreResult<()> {
        self.db.clear(READINGS).await?;
        debug!("reading history cleared");
        Ok(())
    }
}

// ── tests ────────────────────────────────────────────────────────────
