//! # palmreader-session
//!
//! Session layer for Palm Reader: decides which screen the user sees and
//! keeps in-memory user state consistent with the store.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  App::start  (gate: bootstrap + load, run concurrently)  │
//! ├───────────────────────────┬──────────────────────────────┤
//! │  SessionController        │  UserData                    │
//! │   ├─ NavigationHistory    │   ├─ ProfileStore            │
//! │   └─ ExitConfirmation     │   └─ ReadingStore            │
//! ├───────────────────────────┴──────────────────────────────┤
//! │  Conversation ── ChatStore + InferenceGateway            │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! All state is published through `tokio::sync::watch` channels.

pub mod app;
pub mod controller;
pub mod conversation;
pub mod error;
pub mod exit;
pub mod gateway;
pub mod history;
pub mod user_data;
pub mod view;

// ── re-exports ───────────────────────────────────────────────────────

pub use app::App;
pub use controller::{SessionController, SessionState};
pub use conversation::Conversation;
pub use error::{Result, SessionError};
pub use exit::{EXIT_WINDOW, ExitConfirmation};
pub use gateway::{
    GatewayError, GuidanceTopic, InferenceGateway, InferenceKind, InferenceRequest,
    InferenceResponse, Unconfigured,
};
pub use history::{
    Direction, HistoryEntry, HistorySignal, InMemoryHistory, NavigationHistory, RestoreHandler,
};
pub use user_data::{MutationOutcome, UserData, UserDataState};
pub use view::{UnknownView, View};
