//! Application startup gate.
//!
//! [`App::start`] opens the store once, hands the shared handle to every
//! repository, and only returns after the session controller has chosen the
//! first screen *and* the user data facade has finished loading. Nothing
//! should be rendered before it resolves.

use std::sync::Arc;

use palmreader_store::{
    ChatStore, Database, ProfileStore, ReadingStore, SettingsStore, StoreRegistry, StoreResult,
    schema,
};
use tracing::info;

use crate::controller::SessionController;
use crate::conversation::Conversation;
use crate::gateway::InferenceGateway;
use crate::history::NavigationHistory;
use crate::user_data::UserData;

/// Everything presentation needs, wired to one store handle.
pub struct App {
    pub db: Database,
    pub session: Arc<SessionController>,
    pub user: UserData,
    pub conversation: Conversation,
}

impl App {
    /// Open the application store and run the cold-start sequence.
    ///
    /// Fails only if the store itself cannot be opened; read failures after
    /// that are absorbed by the controller and the facade.
    pub async fn start(
        registry: &StoreRegistry,
        history: Arc<dyn NavigationHistory>,
        gateway: Arc<dyn InferenceGateway>,
    ) -> StoreResult<Self> {
        let db = schema::open(registry).await?;

        let session = SessionController::new(
            SettingsStore::new(db.clone()),
            ProfileStore::new(db.clone()),
            history,
        );
        let user = UserData::new(ProfileStore::new(db.clone()), ReadingStore::new(db.clone()));
        let conversation = Conversation::new(ChatStore::new(db.clone()), gateway);

        let (view, ()) = tokio::join!(session.bootstrap(), user.load());
        info!(%view, readings = user.readings().len(), "application ready");

        Ok(Self {
            db,
            session,
            user,
            conversation,
        })
    }
}

// ── tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::Unconfigured;
    use crate::history::InMemoryHistory;
    use crate::view::View;

    #[tokio::test]
    async fn fresh_store_starts_at_onboarding() {
        let registry = StoreRegistry::in_memory();
        let app = App::start(
            &registry,
            Arc::new(InMemoryHistory::new()),
            Arc::new(Unconfigured),
        )
        .await
        .unwrap();

        assert!(app.session.is_initialized());
        assert!(!app.user.is_loading());
        assert_eq!(app.session.current_view(), View::Onboarding);
        assert_eq!(app.session.language(), "en");
    }

    #[tokio::test]
    async fn shares_the_registry_handle() {
        let registry = StoreRegistry::in_memory();
        let app = App::start(
            &registry,
            Arc::new(InMemoryHistory::new()),
            Arc::new(Unconfigured),
        )
        .await
        .unwrap();

        let again = schema::open(&registry).await.unwrap();
        assert!(app.db.same_connection(&again));
    }
}
