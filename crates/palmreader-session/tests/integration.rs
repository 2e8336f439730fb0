//! Integration tests for the palmreader-session crate.
//!
//! Cold-start scenarios run against a real store file (via tempfile): each
//! phase builds a fresh registry so nothing is shared through memory.

use std::sync::Arc;

use async_trait::async_trait;
use palmreader_session::{
    App, GatewayError, InMemoryHistory, InferenceGateway, InferenceRequest, InferenceResponse,
    Unconfigured, View,
};
use palmreader_store::{NewReading, Profile, ReadingResult, StoreRegistry};

struct Fixed(&'static str);

#[async_trait]
impl InferenceGateway for Fixed {
    async fn infer(&self, _request: InferenceRequest) -> Result<InferenceResponse, GatewayError> {
        Ok(InferenceResponse::text(self.0))
    }
}

async fn start(dir: &std::path::Path) -> App {
    App::start(
        &StoreRegistry::new(dir),
        Arc::new(InMemoryHistory::new()),
        Arc::new(Unconfigured),
    )
    .await
    .unwrap()
}

// ═══════════════════════════════════════════════════════════════════════
//  Cold start
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn first_run_walks_through_setup() {
    let dir = tempfile::tempdir().unwrap();

    {
        let app = start(dir.path()).await;
        assert_eq!(app.session.current_view(), View::Onboarding);
        app.session.complete_onboarding().await.unwrap();
        assert_eq!(app.session.current_view(), View::ProfileSetup);
    }

    {
        // Onboarded but the profile was never saved.
        let app = start(dir.path()).await;
        assert_eq!(app.session.current_view(), View::ProfileSetup);

        let outcome = app
            .user
            .update_profile(Profile {
                name: "Asha".into(),
                date_of_birth: "1992-02-29".into(),
                time_of_birth: "06:15".into(),
                gender: "female".into(),
            })
            .await;
        assert!(outcome.is_success());
        app.session.navigate_to(View::Dashboard, true);
    }

    let app = start(dir.path()).await;
    assert_eq!(app.session.current_view(), View::Dashboard);
    assert!(app.user.is_profile_complete());
    assert_eq!(app.user.profile().unwrap().time_of_birth, "06:15");
}

#[tokio::test]
async fn readings_reload_newest_first() {
    let dir = tempfile::tempdir().unwrap();

    let (first, second) = {
        let app = start(dir.path()).await;
        let first = app
            .user
            .add_reading(NewReading::new(ReadingResult::Palm {
                analysis: "a deep head line".into(),
            }))
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let second = app
            .user
            .add_reading(NewReading::new(ReadingResult::Horoscope {
                sign: "leo".into(),
                guidance: "lead with warmth".into(),
            }))
            .await
            .unwrap();
        (first, second)
    };

    let app = start(dir.path()).await;
    assert_eq!(app.user.readings(), vec![second, first]);
}

#[tokio::test]
async fn language_survives_restart() {
    let dir = tempfile::tempdir().unwrap();

    {
        let app = start(dir.path()).await;
        app.session.change_language("hi").await.unwrap();
    }

    let app = start(dir.path()).await;
    assert_eq!(app.session.language(), "hi");
}

// ═══════════════════════════════════════════════════════════════════════
//  Chat
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn chat_history_persists_and_clears_separately() {
    let dir = tempfile::tempdir().unwrap();

    {
        let app = App::start(
            &StoreRegistry::new(dir.path()),
            Arc::new(InMemoryHistory::new()),
            Arc::new(Fixed("the stars are kind")),
        )
        .await
        .unwrap();
        let reply = app.conversation.send("what do you see?", "en").await.unwrap();
        assert_eq!(reply.content, "the stars are kind");
        app.user
            .add_reading(NewReading::new(ReadingResult::Palm {
                analysis: "forked life line".into(),
            }))
            .await
            .unwrap();
    }

    let app = start(dir.path()).await;
    assert_eq!(app.conversation.history().await.unwrap().len(), 2);

    app.conversation.clear().await.unwrap();
    assert!(app.conversation.history().await.unwrap().is_empty());
    assert_eq!(app.user.readings().len(), 1);

    app.user.clear_readings().await.unwrap();
    let app = start(dir.path()).await;
    assert!(app.user.readings().is_empty());
}
