//! The application's store layout.
//!
//! | collection | key                          | record          |
//! |------------|------------------------------|-----------------|
//! | `settings` | setting name                 | scalar          |
//! | `profile`  | [`PROFILE_KEY`]              | `Profile`       |
//! | `readings` | `id` field                   | `Reading`       |
//! | `chats`    | engine-assigned integer `id` | `ChatMessage`   |

use crate::db::Database;
use crate::error::StoreResult;
use crate::migration::{CollectionSpec, KeyScheme, Migration};
use crate::registry::StoreRegistry;

/// Store name used by the application.
pub const STORE_NAME: &str = "palmreader";

/// Current schema version.
pub const VERSION: u32 = 1;

pub const SETTINGS: &str = "settings";
pub const PROFILE: &str = "profile";
pub const READINGS: &str = "readings";
pub const CHATS: &str = "chats";

/// Fixed key of the singleton profile record.
pub const PROFILE_KEY: &str = "user_data";

/// All migrations in order. Add new migrations to the end of this array.
pub static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    description: "initial schema: settings, profile, readings, chats",
    collections: &[
        CollectionSpec {
            name: SETTINGS,
            keys: KeyScheme::OutOfLine,
        },
        CollectionSpec {
            name: PROFILE,
            keys: KeyScheme::OutOfLine,
        },
        CollectionSpec {
            name: READINGS,
            keys: KeyScheme::InLine { key_path: "id" },
        },
        CollectionSpec {
            name: CHATS,
            keys: KeyScheme::AutoIncrement { key_path: "id" },
        },
    ],
}];

/// Open the application store at the current schema version.
pub async fn open(registry: &StoreRegistry) -> StoreResult<Database> {
    registry.open(STORE_NAME, VERSION, MIGRATIONS).await
}
