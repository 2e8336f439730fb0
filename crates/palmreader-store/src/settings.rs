//! Application settings.
//!
//! A generic key → scalar map in the `settings` collection. The session
//! machine depends on two keys: [`LANGUAGE`] and [`ONBOARDING_COMPLETE`].

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use crate::db::Database;
use crate::error::StoreResult;
use crate::schema::SETTINGS;

/// Selected UI language code.
pub const LANGUAGE: &str = "language";

/// Set once the user has finished onboarding.
pub const ONBOARDING_COMPLETE: &str = "onboarding_complete";

/// Language used when none has been chosen.
pub const DEFAULT_LANGUAGE: &str = "en";

/// Typed access to the `settings` collection.
#[derive(Clone, Debug)]
pub struct SettingsStore {
    db: Database,
}

impl SettingsStore {
    /// Create a new settings store backed by `db`.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Get a setting, returning `None` if it was never written.
    #[instrument(skip(self))]
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> StoreResult<Option<T>> {
        self.db.get_value(SETTINGS, key).await
    }

    /// Set a setting (insert or replace).
    #[instrument(skip(self, value))]
    pub async fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> StoreResult<()> {
        self.db.set_value(SETTINGS, key, value).await?;
        debug!(key, "setting updated");
        Ok(())
    }

    /// The stored language code, if any.
    pub async fn language(&self) -> StoreResult<Option<String>> {
        self.get(LANGUAGE).await
    }

    pub async fn set_language(&self, code: &str) -> StoreResult<()> {
        self.set(LANGUAGE, code).await
    }

    /// Whether onboarding has been completed. Absent means `false`.
    pub async fn onboarding_complete(&self) -> StoreResult<bool> {
        Ok(self.get(ONBOARDING_COMPLETE).await?.unwrap_or(false))
    }

    pub async fn set_onboarding_complete(&self, done: bool) -> StoreResult<()> {
        self.set(ONBOARDING_COMPLETE, &done).await
    }
}

// ── tests ────────────────────────────────────────────────────────────
