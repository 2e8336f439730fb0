//! # palmreader-store
//!
//! Offline-first storage engine for Palm Reader.
//!
//! A store is a SQLite file holding named collections of JSON records.
//! Collections are declared by versioned migrations and each carries its
//! own key scheme (caller-keyed, in-line key field, or engine-assigned
//! auto-increment). Typed repositories sit on top of the engine.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │  SettingsStore │ ProfileStore │ ReadingStore │ ChatStore │
//! ├──────────────────────────────────────────────────────┤
//! │  Database: get / put / add / get_all / clear          │
//! │  Migrations (versioned, one transaction per upgrade)  │
//! ├──────────────────────────────────────────────────────┤
//! │  StoreRegistry (one shared handle per store name)     │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick start
//!
//! ```ignore
//! use palmreader_store::{schema, ProfileStore, StoreRegistry};
//!
//! let registry = StoreRegistry::new("data");
//! let db = schema::open(&registry).await?;
//! let profile = ProfileStore::new(db.clone()).get().await?;
//! ```

pub mod chat;
pub mod collection;
pub mod db;
pub mod error;
pub mod migration;
pub mod profile;
pub mod readings;
pub mod registry;
pub mod schema;
pub mod settings;

// ── re-exports ───────────────────────────────────────────────────────

pub use chat::{ChatMessage, ChatStore, Role};
pub use collection::Key;
pub use db::Database;
pub use error::{StoreError, StoreResult};
pub use migration::{CollectionSpec, KeyScheme, Migration};
pub use profile::{Profile, ProfileStore};
pub use readings::{NewReading, Reading, ReadingKind, ReadingResult, ReadingStore};
pub use registry::{Location, StoreRegistry};
pub use settings::SettingsStore;
