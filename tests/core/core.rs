use profilectl::core::config::{self, Config};
use profilectl::core::coordinator::Coordinator;
use profilectl::core::db::{self, SqliteBackend, StorageBackend};
use profilectl::core::error::ProfileError;
use profilectl::core::journal::Journal;
use profilectl::core::queue::{Task, WorkQueue};
use profilectl::core::schemas;
use profilectl::core::store::{Layout, StoreLocation, sidecar_paths};
use profilectl::core::time;
use std::cell::RefCell;
use std::fs;
use std::rc::Rc;
use tempfile::tempdir;

#[test]
fn layout_places_every_profile_artifact_under_the_root() {
    let tmp = tempdir().expect("tempdir");
    let layout = Layout::open(tmp.path()).expect("layout");

    assert_eq!(layout.profiles_dir(), tmp.path().join("Profiles"));
    assert_eq!(layout.archive_dir(), tmp.path().join("ArchivedProfiles"));
    assert_eq!(
        layout.store_path("abc"),
        tmp.path().join("Profiles").join("abc").join("store.sqlite")
    );
    assert_eq!(
        layout.documents_dir("abc"),
        tmp.path().join("Profiles").join("abc").join("Documents")
    );
    assert_eq!(layout.vault_path(), tmp.path().join("secrets.sqlite"));

    let folder = layout.ensure_profile_folders("abc").expect("folders");
    assert_eq!(folder, layout.profile_dir("abc"));
    assert!(layout.documents_dir("abc").is_dir());
}

#[test]
fn config_file_overrides_names_and_default_profile() {
    let tmp = tempdir().expect("tempdir");
    fs::write(
        tmp.path().join(schemas::CONFIG_FILE_NAME),
        r#"
service = "com.example.game"
store_file = "game.db"

[default_profile]
id = "guest"
display_name = "Guest"
"#,
    )
    .expect("write config");

    let layout = Layout::open(tmp.path()).expect("layout");
    assert_eq!(layout.config.service, "com.example.game");
    assert_eq!(layout.config.documents_dir, "Documents");
    assert_eq!(
        layout.store_path("p"),
        tmp.path().join("Profiles").join("p").join("game.db")
    );

    let coordinator = Coordinator::open(tmp.path()).expect("coordinator");
    assert_eq!(coordinator.current_profile().id, "guest");
    assert_eq!(coordinator.current_profile().display_name, "Guest");
    assert_eq!(coordinator.secrets().service(), "com.example.game");
}

#[test]
fn invalid_config_is_rejected() {
    let tmp = tempdir().expect("tempdir");
    fs::write(
        tmp.path().join(schemas::CONFIG_FILE_NAME),
        "store_file = \"nested/store.sqlite\"\n",
    )
    .expect("write config");
    assert!(matches!(
        Coordinator::open(tmp.path()),
        Err(ProfileError::ConfigError(_))
    ));

    fs::write(tmp.path().join(schemas::CONFIG_FILE_NAME), "store_file = [").expect("write");
    assert!(matches!(Config::load(tmp.path()), Err(ProfileError::ConfigError(_))));
}

#[test]
fn explicit_root_wins_over_the_environment() {
    let tmp = tempdir().expect("tempdir");
    let root = config::resolve_root(Some(tmp.path().to_path_buf())).expect("root");
    assert_eq!(root, tmp.path());
}

#[test]
fn sqlite_backend_binds_one_store_at_a_time() {
    let tmp = tempdir().expect("tempdir");
    let first = StoreLocation::File(tmp.path().join("a.sqlite"));
    let second = StoreLocation::File(tmp.path().join("b.sqlite"));

    let mut backend = SqliteBackend::new();
    assert!(matches!(backend.connection(), Err(ProfileError::NotAttached)));
    backend.attach(&first).expect("attach first");
    assert!(matches!(
        backend.attach(&second),
        Err(ProfileError::AlreadyAttached(_))
    ));
    assert_eq!(backend.attached(), Some(&first));

    backend.detach().expect("detach");
    assert_eq!(backend.attached(), None);
    backend.detach().expect("detach is idempotent");
    backend.attach(&second).expect("attach second");

    let journal_mode: String = backend
        .connection()
        .expect("connection")
        .query_row("PRAGMA journal_mode;", [], |row| row.get(0))
        .expect("pragma");
    assert_eq!(journal_mode.to_lowercase(), "wal");
}

#[test]
fn attaching_an_unopenable_path_reports_the_path() {
    let tmp = tempdir().expect("tempdir");
    let missing_parent = tmp.path().join("no").join("such").join("store.sqlite");
    let mut backend = SqliteBackend::new();
    match backend.attach(&StoreLocation::File(missing_parent.clone())) {
        Err(ProfileError::AttachError { path, .. }) => assert_eq!(path, missing_parent),
        other => panic!("expected AttachError, got {:?}", other.map(|_| ())),
    }
    assert_eq!(backend.attached(), None);
}

#[test]
fn destroy_removes_the_store_and_its_sidecars() {
    let tmp = tempdir().expect("tempdir");
    let store = tmp.path().join("store.sqlite");
    let location = StoreLocation::File(store.clone());

    let mut backend = SqliteBackend::new();
    backend.attach(&location).expect("attach");
    backend
        .connection()
        .expect("connection")
        .execute(
            "INSERT INTO records(kind, id, body, updated_at) VALUES('k', '1', '{}', '2024-01-01T00:00:00.000Z')",
            [],
        )
        .expect("insert");
    for sidecar in sidecar_paths(&store) {
        if !sidecar.exists() {
            fs::write(&sidecar, b"").expect("sidecar");
        }
    }

    backend.destroy(&store).expect("destroy");
    assert_eq!(backend.attached(), None);
    assert!(!store.exists());
    for sidecar in sidecar_paths(&store) {
        assert!(!sidecar.exists(), "{} left behind", sidecar.display());
    }
    // Destroying what is already gone is fine.
    backend.destroy(&store).expect("destroy again");
}

#[test]
fn db_connect_enables_foreign_keys() {
    let tmp = tempdir().expect("tempdir");
    let conn = db::db_connect(&tmp.path().join("x.sqlite").to_string_lossy()).expect("connect");
    let fk_on: i64 = conn
        .query_row("PRAGMA foreign_keys;", [], |row| row.get(0))
        .expect("pragma foreign_keys");
    assert_eq!(fk_on, 1);
}

#[test]
fn journal_creates_its_directory_on_first_write() {
    let tmp = tempdir().expect("tempdir");
    let path = tmp.path().join("nested").join(schemas::JOURNAL_FILE_NAME);
    let journal = Journal::new(&path);
    assert!(journal.read_all().expect("empty").is_empty());

    journal.note("profile.bootstrap", "player-one", "success", None);
    assert!(path.exists());
    let events = journal.read_all().expect("read");
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].profile_id, "player-one");
    assert_eq!(events[0].detail, None);
}

#[test]
fn failed_transitions_drop_queued_steps_but_not_deferred_work() {
    let queue: WorkQueue<u32> = WorkQueue::new();
    let ran = Rc::new(RefCell::new(Vec::new()));
    queue.submit(1);
    queue.submit(2);
    let log = Rc::clone(&ran);
    queue.scheduler().defer(move || log.borrow_mut().push("deferred"));
    queue.submit(3);

    assert_eq!(queue.len(), 4);
    let Some(Task::Transition(1)) = queue.pop() else {
        panic!("expected the first transition");
    };
    assert_eq!(queue.discard_transitions(), 2);
    assert_eq!(queue.len(), 1);
    match queue.pop() {
        Some(Task::External(job)) => job(),
        _ => panic!("expected deferred work"),
    }
    assert!(queue.is_empty());
    assert_eq!(*ran.borrow(), vec!["deferred"]);
}

#[test]
fn generated_ids_are_recognized() {
    let id = time::new_profile_id();
    assert!(time::is_generated_id(&id));
    assert!(time::is_generated_id("6f1c1c3e-9b1d-4c1a-8d0e-2f4f1d7b9a10"));
    assert!(!time::is_generated_id("Old Save"));
    assert!(time::now_iso8601().ends_with('Z'));
}
