// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! End-to-end capsule scenarios against the public service API.

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use tempfile::TempDir;

use time_capsule_server::{
    auth::{Actor, CredentialStore, PasswordHasher, Role, SessionManager},
    capsules::{CapsuleService, CapsuleView, CreateCapsule, MediaKind, MediaUpload},
    clock::ManualClock,
    config::ServerConfig,
    error::{ServiceError, ValidationError},
    state::AppState,
    storage::{
        CapsuleId, CapsuleRepository, FileStorage, FsMediaStore, InMemoryStore, MediaReference,
        MediaResolver, StoragePaths,
    },
};

struct World {
    store: Arc<InMemoryStore>,
    credentials: CredentialStore,
    sessions: SessionManager,
    capsules: CapsuleService,
    media: Arc<FsMediaStore>,
    clock: Arc<ManualClock>,
    _temp: TempDir,
}

impl World {
    fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let mut files = FileStorage::new(StoragePaths::new(temp.path()));
        files.initialize().unwrap();
        let media = Arc::new(FsMediaStore::new(Arc::new(files)));

        let store = Arc::new(InMemoryStore::new());
        let start = Utc.with_ymd_and_hms(2030, 3, 14, 9, 30, 0).unwrap();
        let clock = Arc::new(ManualClock::new(start));

        Self {
            credentials: CredentialStore::new(
                store.clone(),
                PasswordHasher::new(1_000).unwrap(),
                clock.clone(),
            ),
            sessions: SessionManager::new(
                store.clone(),
                b"integration-test-secret-of-32-bytes!",
                Duration::hours(1),
                clock.clone(),
            ),
            capsules: CapsuleService::new(store.clone(), media.clone(), clock.clone()),
            store,
            media,
            clock,
            _temp: temp,
        }
    }

    fn login(&self, username: &str) -> Actor {
        let account = match self.credentials.register(username, "correct horse") {
            Ok(account) => account,
            Err(ServiceError::DuplicateUsername) => {
                self.credentials.authenticate(username, "correct horse").unwrap()
            }
            Err(e) => panic!("registration failed: {e}"),
        };
        let issued = self.sessions.establish(&account).unwrap();
        self.sessions.authenticate_token(&issued.token).unwrap()
    }

    fn capsule(&self, name: &str, release_date: &str) -> CreateCapsule {
        CreateCapsule {
            name: name.to_string(),
            content: format!("{name} content"),
            release_date: release_date.to_string(),
            ..Default::default()
        }
    }
}

#[test]
fn sealed_capsule_opens_after_release() {
    let world = World::new();
    let alice = world.login("alice");

    let mut input = world.capsule("B1", "2030-03-15");
    input.photo = Some(MediaUpload::new("cake.jpg", b"jpeg".to_vec()));
    let created = world.capsules.create_capsule(&alice, input).unwrap();

    match world.capsules.view_capsule(&alice, created.id).unwrap() {
        CapsuleView::Sealed { available_on, .. } => {
            assert_eq!(available_on.to_string(), "2030-03-15")
        }
        other => panic!("expected sealed capsule, got {other:?}"),
    }
    assert!(matches!(
        world.capsules.open_media(&alice, created.id, MediaKind::Photo),
        Err(ServiceError::Sealed { .. })
    ));

    // One second before midnight is still sealed
    world.clock.set(Utc.with_ymd_and_hms(2030, 3, 14, 23, 59, 59).unwrap());
    assert!(!world.capsules.gate(&created).is_open());

    world.clock.advance(Duration::seconds(1));
    match world.capsules.view_capsule(&alice, created.id).unwrap() {
        CapsuleView::Revealed(capsule) => assert_eq!(capsule.content, "B1 content"),
        other => panic!("expected revealed capsule, got {other:?}"),
    }
    let photo = world.capsules.open_media(&alice, created.id, MediaKind::Photo).unwrap();
    assert_eq!(photo.bytes, b"jpeg");
}

#[test]
fn other_accounts_never_see_a_capsule() {
    let world = World::new();
    let alice = world.login("alice");
    let bob = world.login("bob");

    let sealed = world
        .capsules
        .create_capsule(&alice, world.capsule("later", "2031-01-01"))
        .unwrap();
    let open = world
        .capsules
        .create_capsule(&alice, world.capsule("past", "2029-01-01"))
        .unwrap();

    for id in [sealed.id, open.id] {
        assert!(matches!(world.capsules.view_capsule(&bob, id), Err(ServiceError::Forbidden)));
        assert!(matches!(world.capsules.delete_capsule(&bob, id), Err(ServiceError::Forbidden)));
        assert!(world.store.get_by_id(id).is_ok());
    }
    assert!(world.capsules.list_owned(&bob).unwrap().is_empty());
    assert_eq!(world.capsules.list_owned(&alice).unwrap().len(), 2);
}

#[test]
fn duplicate_registration_keeps_one_account() {
    let world = World::new();
    world.credentials.register("alice", "pw").unwrap();

    let err = world.credentials.register("alice", "pw2").unwrap_err();
    assert!(matches!(err, ServiceError::DuplicateUsername));
    assert_eq!(world.store.account_count(), 1);
}

#[test]
fn invalid_date_persists_nothing() {
    let world = World::new();
    let alice = world.login("alice");

    let mut input = world.capsule("B1", "14/03/2031");
    input.video = Some(MediaUpload::new("clip.mp4", b"mp4".to_vec()));

    let err = world.capsules.create_capsule(&alice, input).unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Validation(ValidationError::InvalidDateFormat { .. })
    ));
    assert_eq!(world.store.capsule_count(), 0);
}

#[test]
fn delete_then_view_is_not_found() {
    let world = World::new();
    let alice = world.login("alice");
    let capsule = world.capsules.create_capsule(&alice, world.capsule("B1", "2031-01-01")).unwrap();

    world.capsules.delete_capsule(&alice, capsule.id).unwrap();
    assert!(matches!(
        world.capsules.view_capsule(&alice, capsule.id),
        Err(ServiceError::NotFound)
    ));
    assert!(matches!(
        world.capsules.delete_capsule(&alice, capsule.id),
        Err(ServiceError::NotFound)
    ));
}

#[test]
fn logout_and_expiry_end_a_session() {
    let world = World::new();
    let account = world.credentials.register("alice", "pw").unwrap();

    let first = world.sessions.establish(&account).unwrap();
    let actor = world.sessions.authenticate_token(&first.token).unwrap();
    let context = world.sessions.context_for(Some(&first.token));
    assert!(context.is_authenticated());

    world.sessions.logout(context).unwrap();
    assert!(world.sessions.authenticate_token(&first.token).is_err());
    assert!(!world.sessions.context_for(Some(&first.token)).is_authenticated());
    assert_eq!(actor.username, "alice");

    let second = world.sessions.establish(&account).unwrap();
    world.clock.advance(Duration::hours(2));
    assert!(world.sessions.authenticate_token(&second.token).is_err());
    assert_eq!(world.sessions.purge_expired().unwrap(), 1);
}

#[test]
fn media_references_cannot_escape_the_media_root() {
    let world = World::new();
    let bogus: MediaReference = serde_json::from_str("\"../capsules.redb\"").unwrap();
    assert!(world.media.resolve(&bogus).is_err());

    let nested: MediaReference = serde_json::from_str("\"a/b.png\"").unwrap();
    assert!(world.media.resolve(&nested).is_err());
}

#[test]
fn state_survives_restart_with_configured_secret() {
    let temp = TempDir::new().unwrap();
    let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap()));
    let mut config = ServerConfig::for_data_dir(temp.path()).with_password_hash_iterations(1_000);
    config.session_secret = Some("a-session-secret-that-is-long-enough".to_string());

    let (token, capsule_id) = {
        let state = AppState::with_clock(&config, clock.clone()).unwrap();
        let account = state.credentials.register("alice", "pw").unwrap();
        let issued = state.sessions.establish(&account).unwrap();
        let actor = state.sessions.authenticate_token(&issued.token).unwrap();
        let capsule = state
            .capsules
            .create_capsule(
                &actor,
                CreateCapsule {
                    name: "B1".to_string(),
                    content: "kept".to_string(),
                    release_date: "2030-01-01".to_string(),
                    ..Default::default()
                },
            )
            .unwrap();
        (issued.token, capsule.id)
    };

    let state = AppState::with_clock(&config, clock).unwrap();
    let actor = state.sessions.authenticate_token(&token).unwrap();
    match state.capsules.view_capsule(&actor, capsule_id).unwrap() {
        CapsuleView::Revealed(capsule) => assert_eq!(capsule.content, "kept"),
        other => panic!("expected revealed capsule, got {other:?}"),
    }
}

#[test]
fn admin_role_is_granted_only_at_startup() {
    let temp = TempDir::new().unwrap();
    let config = ServerConfig::for_data_dir(temp.path())
        .with_password_hash_iterations(1_000)
        .with_admin_usernames(["root".to_string(), "ops".to_string()]);

    {
        let state = AppState::open(&config).unwrap();
        let root = state.credentials.register("root", "pw").unwrap();
        assert_eq!(root.role, Role::Client);
    }

    let state = AppState::open(&config).unwrap();
    let root = state.credentials.authenticate("root", "pw").unwrap();
    assert_eq!(root.role, Role::Admin);

    // Claimed after startup: still a client
    let ops = state.credentials.register("ops", "pw").unwrap();
    assert_eq!(ops.role, Role::Client);
    let actor = Actor::from_account(&ops);
    assert!(matches!(
        state.capsules.purge_capsule(&actor, CapsuleId(1)),
        Err(ServiceError::Forbidden)
    ));
}
