use profilectl::core::coordinator::Coordinator;
use profilectl::core::profile::ProfileInfo;
use profilectl::core::store::Layout;
use profilectl::plugins::archive;
use profilectl::plugins::registry;
use std::fs;
use tempfile::tempdir;

#[test]
fn archive_moves_the_folder_and_keeps_its_contents() {
    let tmp = tempdir().unwrap();
    let mut coordinator = Coordinator::open(tmp.path()).unwrap();
    coordinator.bootstrap().unwrap();

    let sam = coordinator.create_profile("Sam Smith").unwrap();
    let notes = coordinator.layout().documents_dir(&sam.id).join("notes.txt");
    fs::write(&notes, b"keep me").unwrap();
    coordinator.set_password(&sam, "hunter2").unwrap();
    coordinator.create_profile("Alex").unwrap();

    coordinator.archive_profile(&sam).unwrap();

    let dst = coordinator.last_archive().cloned().unwrap();
    let folder = dst.file_name().unwrap().to_string_lossy().to_string();
    assert!(folder.ends_with(&format!("-sam-smith-{}", archive::short_id(&sam.id))));
    assert!(dst.join("Documents").join("notes.txt").exists());
    assert!(dst.join("store.sqlite").exists());
    assert!(!coordinator.layout().profile_dir(&sam.id).exists());

    // Soft delete keeps the credential.
    assert!(coordinator.password_exists(&sam).unwrap());
    assert!(coordinator.verify_password(&sam, "hunter2").unwrap());

    let listed = archive::list_archived(coordinator.layout()).unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].path, dst);
    assert_eq!(listed[0].metadata.as_ref().unwrap().display_name, "Sam Smith");
}

#[test]
fn archiving_the_current_profile_switches_away_first() {
    let tmp = tempdir().unwrap();
    let mut coordinator = Coordinator::open(tmp.path()).unwrap();
    coordinator.bootstrap().unwrap();

    let alex = coordinator.create_profile("Alex").unwrap();
    let sam = coordinator.create_profile("Sam").unwrap();
    assert_eq!(coordinator.current_profile(), &sam);

    coordinator.archive_profile(&sam).unwrap();
    assert_eq!(coordinator.current_profile(), &alex);
    assert_eq!(coordinator.list_profiles(), &[alex.clone()]);
    assert!(coordinator.last_archive().is_some());

    // Archiving the last profile lands on the default, in memory.
    coordinator.archive_profile(&alex).unwrap();
    assert!(!coordinator.has_profiles());
    assert_eq!(coordinator.current_profile(), coordinator.default_profile());
    assert_eq!(archive::list_archived(coordinator.layout()).unwrap().len(), 2);
}

#[test]
fn archive_without_a_folder_is_a_no_op() {
    let tmp = tempdir().unwrap();
    let layout = Layout::open(tmp.path()).unwrap();
    let ghost = ProfileInfo::new("ghost", "Ghost");
    assert_eq!(archive::archive(&layout, &ghost).unwrap(), None);
    assert!(!layout.archive_dir().exists());
}

#[test]
fn legacy_folders_get_metadata_when_archived() {
    let tmp = tempdir().unwrap();
    let layout = Layout::open(tmp.path()).unwrap();
    layout.ensure_profile_folders("Old Save").unwrap();
    let legacy = ProfileInfo::new("Old Save", "Old Save");

    let dst = archive::archive(&layout, &legacy).unwrap().unwrap();
    let meta = registry::read_metadata(&dst).unwrap();
    assert_eq!(meta.id, "Old Save");
    assert_eq!(meta.display_name, "Old Save");
}

#[test]
fn colliding_archive_names_get_a_suffix() {
    let tmp = tempdir().unwrap();
    let layout = Layout::open(tmp.path()).unwrap();
    let profile = ProfileInfo::new("abcdefgh-1", "Same");
    let twin = ProfileInfo::new("abcdefgh-2", "Same");

    layout.ensure_profile_folders(&profile.id).unwrap();
    layout.ensure_profile_folders(&twin.id).unwrap();
    let first = archive::archive(&layout, &profile).unwrap().unwrap();
    let second = archive::archive(&layout, &twin).unwrap().unwrap();

    assert_ne!(first, second);
    assert!(first.exists());
    assert!(second.exists());
    let listed = archive::list_archived(&layout).unwrap();
    assert_eq!(listed.len(), 2);
}
