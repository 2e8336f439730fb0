//! Session state machine.
//!
//! [`SessionController`] decides the first screen from persisted settings
//! and profile, tracks the current screen, and mirrors explicit navigation
//! into a [`NavigationHistory`] so platform back/forward gestures restore
//! earlier screens.
//!
//! ```text
//!            bootstrap
//!   splash ─────────────┬──> onboarding ──complete_onboarding──> profile-setup
//!                       ├──> profile-setup
//!                       └──> dashboard <──> feature screens (navigate_to / history)
//! ```
//!
//! State is published through a [`tokio::sync::watch`] channel; presentation
//! subscribes instead of polling.

use std::sync::Arc;

use palmreader_store::settings::DEFAULT_LANGUAGE;
use palmreader_store::{ProfileStore, SettingsStore, StoreResult};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::exit::ExitConfirmation;
use crate::history::{Direction, HistoryEntry, HistorySignal, NavigationHistory};
use crate::view::View;

/// Snapshot of the session published to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub view: View,
    pub language: String,
    /// `false` until [`SessionController::bootstrap`] has finished.
    pub initialized: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            view: View::Splash,
            language: DEFAULT_LANGUAGE.to_owned(),
            initialized: false,
        }
    }
}

/// Chooses and tracks the current screen.
pub struct SessionController {
    settings: SettingsStore,
    profile: ProfileStore,
    history: Arc<dyn NavigationHistory>,
    state: watch::Sender<SessionState>,
    exit: ExitConfirmation,
}

impl SessionController {
    /// Create a controller and register it for history restores.
    pub fn new(
        settings: SettingsStore,
        profile: ProfileStore,
        history: Arc<dyn NavigationHistory>,
    ) -> Arc<Self> {
        let (state, _) = watch::channel(SessionState::default());
        let controller = Arc::new(Self {
            settings,
            profile,
            history,
            state,
            exit: ExitConfirmation::default(),
        });

        let weak = Arc::downgrade(&controller);
        controller.history.on_restore(Box::new(move |signal| {
            if let Some(controller) = weak.upgrade() {
                controller.handle_history(signal);
            }
        }));

        controller
    }

    // -- Accessors ----------------------------------------------------------

    pub fn current_view(&self) -> View {
        self.state.borrow().view
    }

    pub fn language(&self) -> String {
        self.state.borrow().language.clone()
    }

    pub fn is_initialized(&self) -> bool {
        self.state.borrow().initialized
    }

    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Watch session state changes.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// The advisory exit-confirmation counter.
    pub fn exit(&self) -> &ExitConfirmation {
        &self.exit
    }

    // -- Bootstrap ----------------------------------------------------------

    /// Leave `splash` for the screen the persisted state calls for.
    ///
    /// Never fails: if the store cannot be read the session starts at
    /// `onboarding`, as if nothing had happened yet. Calling it again after
    /// it has completed returns the current view unchanged.
    pub async fn bootstrap(&self) -> View {
        if self.is_initialized() {
            debug!("bootstrap already completed");
            return self.current_view();
        }

        let view = match self.initial_view().await {
            Ok(view) => view,
            Err(err) => {
                warn!(
                    %err,
                    io = err.is_io(),
                    "store unreadable during bootstrap, starting at onboarding"
                );
                View::Onboarding
            }
        };

        let language = match self.settings.language().await {
            Ok(language) => language,
            Err(err) => {
                warn!(%err, "failed to read language setting");
                None
            }
        };

        self.state.send_modify(|state| {
            state.view = view;
            if let Some(language) = language {
                state.language = language;
            }
            state.initialized = true;
        });

        info!(view = %view, "session bootstrapped");
        view
    }

    async fn initial_view(&self) -> StoreResult<View> {
        if !self.settings.onboarding_complete().await? {
            return Ok(View::Onboarding);
        }
        if self.profile.get().await?.is_none() {
            return Ok(View::ProfileSetup);
        }
        Ok(View::Dashboard)
    }

    // -- Transitions --------------------------------------------------------

    /// Switch to `view`, recording it in platform history if asked.
    ///
    /// Ignored until bootstrap has completed.
    pub fn navigate_to(&self, view: View, record_history: bool) {
        if !self.is_initialized() {
            warn!(view = %view, "navigation before bootstrap ignored");
            return;
        }

        self.state.send_modify(|state| state.view = view);
        if record_history {
            self.history.push(HistoryEntry::new(view));
        }
        debug!(view = %view, record_history, "navigated");
    }

    /// Finish onboarding and move on to profile setup.
    ///
    /// Only meaningful while on `onboarding`; the UI offers it nowhere else.
    /// Before bootstrap it does nothing, so the flag is never persisted for
    /// a screen the user was not shown.
    pub async fn complete_onboarding(&self) -> StoreResult<()> {
        if !self.is_initialized() {
            warn!("complete_onboarding before bootstrap ignored");
            return Ok(());
        }

        let current = self.current_view();
        if current != View::Onboarding {
            warn!(view = %current, "complete_onboarding called outside onboarding");
        }

        self.settings.set_onboarding_complete(true).await?;
        self.navigate_to(View::ProfileSetup, true);
        Ok(())
    }

    /// Persist a new UI language, then publish it. A failed write leaves
    /// the current language in place.
    pub async fn change_language(&self, code: &str) -> StoreResult<()> {
        self.settings.set_language(code).await?;
        self.state
            .send_modify(|state| state.language = code.to_owned());
        info!(language = code, "language changed");
        Ok(())
    }

    /// React to the platform restoring a history entry.
    ///
    /// Back signals on the dashboard also feed the exit counter. Entries
    /// without a recognisable view land on `dashboard`.
    pub fn handle_history(&self, signal: HistorySignal) {
        if signal.direction == Direction::Back && self.current_view() == View::Dashboard {
            self.exit.register_back();
        }

        let view = signal
            .entry
            .as_ref()
            .and_then(HistoryEntry::view)
            .unwrap_or(View::Dashboard);
        self.navigate_to(view, false);
    }
}

// ── tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use palmreader_store::{Database, Profile, StoreRegistry, schema};

    use super::*;
    use crate::history::InMemoryHistory;

    async fn setup() -> (Database, Arc<InMemoryHistory>, Arc<SessionController>) {
        let db = schema::open(&StoreRegistry::in_memory()).await.unwrap();
        let history = Arc::new(InMemoryHistory::new());
        let controller = SessionController::new(
            SettingsStore::new(db.clone()),
            ProfileStore::new(db.clone()),
            history.clone(),
        );
        (db, history, controller)
    }

    fn profile() -> Profile {
        Profile {
            name: "Leela".into(),
            date_of_birth: "1988-08-08".into(),
            ..Profile::default()
        }
    }

    #[tokio::test]
    async fn starts_on_splash() {
        let (_, _, controller) = setup().await;
        assert_eq!(controller.current_view(), View::Splash);
        assert!(!controller.is_initialized());
    }

    #[tokio::test]
    async fn fresh_store_boots_to_onboarding() {
        let (_, _, controller) = setup().await;
        assert_eq!(controller.bootstrap().await, View::Onboarding);
        assert!(controller.is_initialized());
    }

    #[tokio::test]
    async fn explicit_false_boots_to_onboarding() {
        let (db, _, controller) = setup().await;
        SettingsStore::new(db).set_onboarding_complete(false).await.unwrap();
        assert_eq!(controller.bootstrap().await, View::Onboarding);
    }

    #[tokio::test]
    async fn onboarded_without_profile_boots_to_profile_setup() {
        let (db, _, controller) = setup().await;
        SettingsStore::new(db).set_onboarding_complete(true).await.unwrap();
        assert_eq!(controller.bootstrap().await, View::ProfileSetup);
    }

    #[tokio::test]
    async fn onboarded_with_profile_boots_to_dashboard() {
        let (db, _, controller) = setup().await;
        SettingsStore::new(db.clone())
            .set_onboarding_complete(true)
            .await
            .unwrap();
        ProfileStore::new(db).save(&profile()).await.unwrap();
        assert_eq!(controller.bootstrap().await, View::Dashboard);
    }

    #[tokio::test]
    async fn unreadable_settings_fall_back_to_onboarding() {
        // A store that never had the schema applied has no collections.
        let db = Database::open_in_memory().unwrap();
        let controller = SessionController::new(
            SettingsStore::new(db.clone()),
            ProfileStore::new(db),
            Arc::new(InMemoryHistory::new()),
        );
        assert_eq!(controller.bootstrap().await, View::Onboarding);
        assert!(controller.is_initialized());
    }

    #[tokio::test]
    async fn malformed_flag_falls_back_to_onboarding() {
        let (db, _, controller) = setup().await;
        SettingsStore::new(db)
            .set("onboarding_complete", "yes")
            .await
            .unwrap();
        assert_eq!(controller.bootstrap().await, View::Onboarding);
    }

    #[tokio::test]
    async fn bootstrap_loads_language() {
        let (db, _, controller) = setup().await;
        SettingsStore::new(db).set_language("es").await.unwrap();
        controller.bootstrap().await;
        assert_eq!(controller.language(), "es");
    }

    #[tokio::test]
    async fn navigation_before_bootstrap_is_ignored() {
        let (_, history, controller) = setup().await;
        controller.navigate_to(View::Tarot, true);
        assert_eq!(controller.current_view(), View::Splash);
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn navigate_records_history_on_request() {
        let (_, history, controller) = setup().await;
        controller.bootstrap().await;

        controller.navigate_to(View::Settings, false);
        assert_eq!(history.len(), 1);

        controller.navigate_to(View::Tarot, true);
        assert_eq!(controller.current_view(), View::Tarot);
        assert_eq!(history.current(), Some(HistoryEntry::new(View::Tarot)));
    }

    #[tokio::test]
    async fn back_then_forward_restores_screen() {
        let (_, history, controller) = setup().await;
        controller.bootstrap().await;

        controller.navigate_to(View::Tarot, true);
        history.back();
        assert_eq!(controller.current_view(), View::Dashboard);

        history.forward();
        assert_eq!(controller.current_view(), View::Tarot);
    }

    #[tokio::test]
    async fn unknown_entry_restores_dashboard() {
        let (_, _, controller) = setup().await;
        controller.bootstrap().await;
        controller.navigate_to(View::Horoscope, true);

        controller.handle_history(HistorySignal::back(Some(HistoryEntry {
            view: "retired-screen".into(),
        })));
        assert_eq!(controller.current_view(), View::Dashboard);
    }

    #[tokio::test]
    async fn complete_onboarding_persists_and_moves_on() {
        let (db, history, controller) = setup().await;
        controller.bootstrap().await;

        controller.complete_onboarding().await.unwrap();
        assert_eq!(controller.current_view(), View::ProfileSetup);
        assert_eq!(history.current(), Some(HistoryEntry::new(View::ProfileSetup)));
        assert!(
            SettingsStore::new(db)
                .onboarding_complete()
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn change_language_persists() {
        let (db, _, controller) = setup().await;
        controller.bootstrap().await;
        controller.change_language("fr").await.unwrap();

        assert_eq!(controller.language(), "fr");
        assert_eq!(
            SettingsStore::new(db).language().await.unwrap().as_deref(),
            Some("fr")
        );
    }

    #[tokio::test]
    async fn failed_language_write_keeps_current_language() {
        // No schema: the settings collection does not exist.
        let db = Database::open_in_memory().unwrap();
        let controller = SessionController::new(
            SettingsStore::new(db.clone()),
            ProfileStore::new(db),
            Arc::new(InMemoryHistory::new()),
        );
        controller.bootstrap().await;

        assert!(controller.change_language("fr").await.is_err());
        assert_eq!(controller.language(), "en");
    }

    #[tokio::test]
    async fn complete_onboarding_before_bootstrap_is_ignored() {
        let (db, history, controller) = setup().await;

        controller.complete_onboarding().await.unwrap();
        assert_eq!(controller.current_view(), View::Splash);
        assert_eq!(history.len(), 1);
        assert!(
            !SettingsStore::new(db.clone())
                .onboarding_complete()
                .await
                .unwrap()
        );

        // Bootstrap still sees a fresh user.
        assert_eq!(controller.bootstrap().await, View::Onboarding);
    }

    #[tokio::test]
    async fn subscribers_see_bootstrap() {
        let (_, _, controller) = setup().await;
        let mut rx = controller.subscribe();

        controller.bootstrap().await;
        rx.changed().await.unwrap();
        let state = rx.borrow_and_update().clone();
        assert_eq!(state.view, View::Onboarding);
        assert!(state.initialized);
    }

    #[tokio::test(start_paused = true)]
    async fn back_on_dashboard_counts_toward_exit() {
        let (db, _, controller) = setup().await;
        SettingsStore::new(db.clone())
            .set_onboarding_complete(true)
            .await
            .unwrap();
        ProfileStore::new(db).save(&profile()).await.unwrap();
        controller.bootstrap().await;

        controller.handle_history(HistorySignal::back(None));
        controller.handle_history(HistorySignal::back(None));
        assert_eq!(controller.current_view(), View::Dashboard);
        assert!(controller.exit().presses() > 1);

        tokio::time::sleep(Duration::from_millis(2100)).await;
        assert_eq!(controller.exit().presses(), 0);

        controller.handle_history(HistorySignal::back(None));
        assert_eq!(controller.exit().presses(), 1);
    }

    #[tokio::test]
    async fn back_elsewhere_does_not_count() {
        let (_, _, controller) = setup().await;
        controller.bootstrap().await;
        controller.navigate_to(View::Tarot, true);

        controller.handle_history(HistorySignal::back(None));
        assert_eq!(controller.exit().presses(), 0);
    }
}
