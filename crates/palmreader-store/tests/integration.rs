//! Integration tests for the palmreader-store crate.
//!
//! These tests exercise the full store lifecycle (opening, upgrading,
//! and the four repositories) against a real SQLite file on disk (via
//! tempfile).

use palmreader_store::{
    ChatStore, CollectionSpec, KeyScheme, Migration, NewReading, Profile, ProfileStore,
    ReadingResult, ReadingStore, Role, SettingsStore, StoreError, StoreRegistry, schema,
};

// ═══════════════════════════════════════════════════════════════════════
//  Store lifecycle
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn data_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();

    {
        let db = schema::open(&StoreRegistry::new(dir.path())).await.unwrap();
        SettingsStore::new(db.clone())
            .set_onboarding_complete(true)
            .await
            .unwrap();
        ProfileStore::new(db.clone())
            .save(&Profile {
                name: "Mira".into(),
                date_of_birth: "1990-01-01".into(),
                ..Profile::default()
            })
            .await
            .unwrap();
        ChatStore::new(db).add(Role::User, "hello").await.unwrap();
    }

    // A fresh registry forces a new connection to the same file.
    let db = schema::open(&StoreRegistry::new(dir.path())).await.unwrap();
    assert!(SettingsStore::new(db.clone()).onboarding_complete().await.unwrap());
    assert_eq!(
        ProfileStore::new(db.clone()).get().await.unwrap().unwrap().name,
        "Mira"
    );
    assert_eq!(ChatStore::new(db).history().await.unwrap().len(), 1);
}

static UPGRADED: &[Migration] = &[
    Migration {
        version: 1,
        description: "initial",
        collections: &[
            CollectionSpec {
                name: "settings",
                keys: KeyScheme::OutOfLine,
            },
            CollectionSpec {
                name: "profile",
                keys: KeyScheme::OutOfLine,
            },
            CollectionSpec {
                name: "readings",
                keys: KeyScheme::InLine { key_path: "id" },
            },
            CollectionSpec {
                name: "chats",
                keys: KeyScheme::AutoIncrement { key_path: "id" },
            },
        ],
    },
    Migration {
        version: 2,
        description: "journal",
        collections: &[
            // Re-declaring an existing collection is a no-op.
            CollectionSpec {
                name: "readings",
                keys: KeyScheme::InLine { key_path: "id" },
            },
            CollectionSpec {
                name: "journal",
                keys: KeyScheme::AutoIncrement { key_path: "id" },
            },
        ],
    },
];

#[tokio::test]
async fn upgrade_keeps_existing_collections() {
    let dir = tempfile::tempdir().unwrap();

    {
        let db = schema::open(&StoreRegistry::new(dir.path())).await.unwrap();
        ReadingStore::new(db)
            .save(NewReading::new(ReadingResult::Palm {
                analysis: "strong fate line".into(),
            }))
            .await
            .unwrap();
    }

    let registry = StoreRegistry::new(dir.path());
    let db = registry
        .open(schema::STORE_NAME, 2, UPGRADED)
        .await
        .unwrap();
    assert_eq!(db.version(), 2);
    assert_eq!(ReadingStore::new(db.clone()).count().await.unwrap(), 1);
    assert_eq!(db.count("journal").await.unwrap(), 0);

    // The application schema is now older than the file.
    let err = schema::open(&StoreRegistry::new(dir.path()))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::VersionConflict {
            requested: 1,
            active: 2
        }
    ));
}

#[tokio::test]
async fn concurrent_open_on_disk_runs_one_upgrade() {
    let dir = tempfile::tempdir().unwrap();
    let registry = StoreRegistry::new(dir.path());

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let registry = registry.clone();
            tokio::spawn(async move { schema::open(&registry).await })
        })
        .collect();

    let mut dbs = Vec::new();
    for handle in handles {
        dbs.push(handle.await.unwrap().unwrap());
    }
    for db in &dbs[1..] {
        assert!(dbs[0].same_connection(db));
    }

    let applied: i64 = dbs[0]
        .execute(|conn| {
            let c: i64 = conn.query_row("SELECT count(*) FROM _migrations", [], |row| row.get(0))?;
            Ok(c)
        })
        .await
        .unwrap();
    assert_eq!(applied, 1);
}

// ═══════════════════════════════════════════════════════════════════════
//  Repositories
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn readings_and_chat_clear_independently() {
    let dir = tempfile::tempdir().unwrap();
    let db = schema::open(&StoreRegistry::new(dir.path())).await.unwrap();
    let readings = ReadingStore::new(db.clone());
    let chats = ChatStore::new(db);

    readings
        .save(NewReading::new(ReadingResult::Horoscope {
            sign: "virgo".into(),
            guidance: "patience".into(),
        }))
        .await
        .unwrap();
    chats.add(Role::User, "hi").await.unwrap();
    chats.add(Role::Assistant, "welcome").await.unwrap();

    readings.clear().await.unwrap();
    assert_eq!(readings.count().await.unwrap(), 0);
    assert_eq!(chats.history().await.unwrap().len(), 2);

    chats.clear().await.unwrap();
    assert!(chats.history().await.unwrap().is_empty());
}

#[tokio::test]
async fn saved_reading_is_what_get_all_returns() {
    let dir = tempfile::tempdir().unwrap();
    let db = schema::open(&StoreRegistry::new(dir.path())).await.unwrap();
    let readings = ReadingStore::new(db);

    let saved = readings
        .save(NewReading::new(ReadingResult::Tarot {
            question: None,
            cards: vec!["The Moon".into()],
            interpretation: "trust intuition".into(),
        }))
        .await
        .unwrap();

    assert_eq!(readings.all().await.unwrap(), vec![saved]);
}
