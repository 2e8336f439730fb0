//! The user's profile.
//!
//! A singleton record stored under [`PROFILE_KEY`] in the `profile`
//! collection. Saving always replaces the whole record; there is no merge.

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::db::Database;
use crate::error::StoreResult;
use crate::schema::{PROFILE, PROFILE_KEY};

/// Identity details collected during profile setup.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    /// Date of birth, as entered (`YYYY-MM-DD`).
    #[serde(rename = "dob")]
    pub date_of_birth: String,
    /// Time of birth, as entered (`HH:MM`); optional in the form.
    #[serde(rename = "tob", default)]
    pub time_of_birth: String,
    #[serde(default)]
    pub gender: String,
}

impl Profile {
    /// A profile is usable once it has a name and a date of birth.
    pub fn is_complete(&self) -> bool {
        !self.name.trim().is_empty() && !self.date_of_birth.trim().is_empty()
    }
}

/// Reads and replaces the singleton profile record.
#[derive(Clone, Debug)]
pub struct ProfileStore {
    db: Database,
}

impl ProfileStore {
    /// Create a new profile store backed by `db`.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// The saved profile, or `None` before the first save.
    #[instrument(skip(self))]
    pub async fn get(&self) -> StoreResult<Option<Profile>> {
        self.db.get_value(PROFILE, PROFILE_KEY).await
    }

    /// Replace the saved profile with `profile`.
    #[instrument(skip(self, profile))]
    pub async fn save(&self, profile: &Profile) -> StoreResult<()> {
        self.db.set_value(PROFILE, PROFILE_KEY, profile).await?;
        debug!("profile saved");
        Ok(())
    }
}

// ── tests ────────────────────────────────────────────────────────────
