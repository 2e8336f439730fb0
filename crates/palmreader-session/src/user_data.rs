//! In-memory view of the user's profile and reading history.
//!
//! [`UserData`] loads the profile and all readings in parallel, then
//! mediates every mutation: it writes through to the store and only updates
//! its cached state once the write has succeeded. Presentation subscribes
//! to the published [`UserDataState`].

use palmreader_store::{NewReading, Profile, ProfileStore, Reading, ReadingStore, StoreResult};
use tokio::sync::watch;
use tracing::{error, info};

/// Cached user data published to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserDataState {
    pub profile: Option<Profile>,
    /// Newest first.
    pub readings: Vec<Reading>,
    /// `true` until the initial load has finished, successfully or not.
    pub loading: bool,
}

impl Default for UserDataState {
    fn default() -> Self {
        Self {
            profile: None,
            readings: Vec::new(),
            loading: true,
        }
    }
}

/// Result of a mutation that reports failure as a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationOutcome {
    Saved,
    Failed { reason: String },
}

impl MutationOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Saved)
    }
}

/// Write-through cache over the profile and reading repositories.
pub struct UserData {
    profiles: ProfileStore,
    readings: ReadingStore,
    state: watch::Sender<UserDataState>,
}

impl UserData {
    /// Create the facade in its `loading` state. Call [`UserData::load`].
    pub fn new(profiles: ProfileStore, readings: ReadingStore) -> Self {
        let (state, _) = watch::channel(UserDataState::default());
        Self {
            profiles,
            readings,
            state,
        }
    }

    /// Read the profile and every reading concurrently and publish them.
    ///
    /// A failed read is logged and leaves that part empty; `loading` is
    /// cleared either way so the UI is never held on a storage fault.
    ///
    /// Writes that land in the cache while the reads are in flight are
    /// kept: a cached profile wins over the loaded one, and cached readings
    /// missing from the loaded set are merged in.
    pub async fn load(&self) {
        let (profile, readings) = tokio::join!(self.profiles.get(), self.readings.all());

        let profile = profile.unwrap_or_else(|err| {
            error!(%err, "failed to load profile");
            None
        });
        let loaded = readings.unwrap_or_else(|err| {
            error!(%err, "failed to load readings");
            Vec::new()
        });

        self.state.send_modify(|state| {
            if state.profile.is_none() {
                state.profile = profile;
            }

            let mut readings = loaded;
            for cached in state.readings.drain(..) {
                if !readings.iter().any(|r| r.id == cached.id) {
                    readings.push(cached);
                }
            }
            sort_newest_first(&mut readings);
            state.readings = readings;
            state.loading = false;

            info!(
                has_profile = state.profile.is_some(),
                readings = state.readings.len(),
                "user data loaded"
            );
        });
    }

    // -- Accessors ----------------------------------------------------------

    pub fn is_loading(&self) -> bool {
        self.state.borrow().loading
    }

    pub fn profile(&self) -> Option<Profile> {
        self.state.borrow().profile.clone()
    }

    pub fn readings(&self) -> Vec<Reading> {
        self.state.borrow().readings.clone()
    }

    pub fn is_profile_complete(&self) -> bool {
        self.state
            .borrow()
            .profile
            .as_ref()
            .is_some_and(Profile::is_complete)
    }

    pub fn snapshot(&self) -> UserDataState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<UserDataState> {
        self.state.subscribe()
    }

    // -- Mutations ----------------------------------------------------------

    /// Replace the profile. The cache changes only if the save succeeded.
    pub async fn update_profile(&self, profile: Profile) -> MutationOutcome {
        match self.profiles.save(&profile).await {
            Ok(()) => {
                self.state.send_modify(|state| state.profile = Some(profile));
                MutationOutcome::Saved
            }
            Err(err) => {
                error!(%err, "error saving profile");
                MutationOutcome::Failed {
                    reason: err.to_string(),
                }
            }
        }
    }

    /// Persist a reading and put it at the front of the cached history.
    pub async fn add_reading(&self, reading: NewReading) -> StoreResult<Reading> {
        let saved = self.readings.save(reading).await.inspect_err(|err| {
            error!(%err, "error saving reading");
        })?;

        self.state
            .send_modify(|state| state.readings.insert(0, saved.clone()));
        Ok(saved)
    }

    /// Wipe the reading history, durably and in memory.
    ///
    /// Chat history is a separate collection and is left untouched.
    pub async fn clear_readings(&self) -> StoreResult<()> {
        self.readings.clear().await.inspect_err(|err| {
            error!(%err, "error clearing readings");
        })?;

        self.state.send_modify(|state| state.readings.clear());
        info!("reading history cleared");
        Ok(())
    }
}

fn sort_newest_first(readings: &mut [Reading]) {
    readings.sort_by(|a, b| {
        b.timestamp
            .cmp(&a.timestamp)
            .then_with(|| b.id.cmp(&a.id))
    });
}

// ── tests ────────────────────────────────────────────────────────────
