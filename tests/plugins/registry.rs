use chrono::{Duration, TimeZone, Utc};
use profilectl::core::coordinator::Coordinator;
use profilectl::core::profile::{ProfileInfo, ProfileMetadata};
use profilectl::core::store::Layout;
use profilectl::core::time;
use profilectl::plugins::registry::{self, LEGACY_PLACEHOLDER_NAME};
use std::fs;
use tempfile::tempdir;

fn dated(layout: &Layout, id: &str, name: &str, minutes: i64) {
    let folder = layout.ensure_profile_folders(id).unwrap();
    let created = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap() + Duration::minutes(minutes);
    registry::write_metadata(&folder, &ProfileMetadata::for_profile(&ProfileInfo::new(id, name), created))
        .unwrap();
}

#[test]
fn missing_profiles_dir_is_an_empty_roster() {
    let tmp = tempdir().unwrap();
    let layout = Layout::open(tmp.path()).unwrap();
    assert!(registry::enumerate(&layout.profiles_dir()).unwrap().is_empty());
}

#[test]
fn enumerate_orders_by_creation_then_legacy_by_id() {
    let tmp = tempdir().unwrap();
    let layout = Layout::open(tmp.path()).unwrap();

    dated(&layout, "zzz", "Sam", 1);
    dated(&layout, "aaa", "Kim", 5);
    dated(&layout, "mmm", "Alex", 0);

    let ulid = time::new_profile_id();
    fs::create_dir_all(layout.profile_dir(&ulid)).unwrap();
    fs::create_dir_all(layout.profile_dir("Old Save")).unwrap();
    fs::create_dir_all(layout.profile_dir(".hidden")).unwrap();
    fs::write(layout.profiles_dir().join("stray.txt"), b"not a profile").unwrap();

    let roster = registry::enumerate(&layout.profiles_dir()).unwrap();
    let ids: Vec<&str> = roster.iter().map(|p| p.id.as_str()).collect();
    let mut legacy = vec![ulid.as_str(), "Old Save"];
    legacy.sort();
    let mut expected = vec!["mmm", "zzz", "aaa"];
    expected.extend(legacy);
    assert_eq!(ids, expected);

    let name_of = |id: &str| {
        roster
            .iter()
            .find(|p| p.id == id)
            .map(|p| p.display_name.clone())
            .unwrap()
    };
    assert_eq!(name_of("mmm"), "Alex");
    assert_eq!(name_of(&ulid), LEGACY_PLACEHOLDER_NAME);
    assert_eq!(name_of("Old Save"), "Old Save");
}

#[test]
fn corrupt_metadata_falls_back_to_folder_name() {
    let tmp = tempdir().unwrap();
    let layout = Layout::open(tmp.path()).unwrap();
    let folder = layout.ensure_profile_folders("Broken").unwrap();
    fs::write(folder.join("profile.json"), b"{ not json").unwrap();

    assert!(registry::read_metadata(&folder).is_none());
    let roster = registry::enumerate(&layout.profiles_dir()).unwrap();
    assert_eq!(roster, vec![ProfileInfo::new("Broken", "Broken")]);
}

#[test]
fn metadata_write_is_atomic_and_camel_cased() {
    let tmp = tempdir().unwrap();
    let folder = tmp.path().join("p1");
    let meta = ProfileMetadata::for_profile(&ProfileInfo::new("p1", "Alex"), time::now());
    registry::write_metadata(&folder, &meta).unwrap();

    assert!(!folder.join("profile.json.tmp").exists());
    let raw: serde_json::Value =
        serde_json::from_slice(&fs::read(folder.join("profile.json")).unwrap()).unwrap();
    assert_eq!(raw["displayName"], "Alex");
    assert!(raw.get("createdAt").is_some());
    assert_eq!(registry::read_metadata(&folder), Some(meta));
}

#[test]
fn initial_profile_prefers_remembered_then_default_then_first() {
    let default = ProfileInfo::new("player-one", "Player One");
    let roster = vec![ProfileInfo::new("a", "Alex"), ProfileInfo::new("s", "Sam")];

    assert_eq!(registry::resolve_initial(&roster, Some("s"), &default).id, "s");
    assert_eq!(registry::resolve_initial(&roster, Some("gone"), &default).id, "a");
    assert_eq!(registry::resolve_initial(&[], Some("s"), &default), default);

    let with_default = vec![
        ProfileInfo::new("a", "Alex"),
        ProfileInfo::new("player-one", "Me"),
    ];
    let picked = registry::resolve_initial(&with_default, None, &default);
    assert_eq!(picked, ProfileInfo::new("player-one", "Me"));
}

#[test]
fn legacy_profiles_on_disk_are_switchable() {
    let tmp = tempdir().unwrap();
    let layout = Layout::open(tmp.path()).unwrap();
    layout.ensure_profile_folders("Old Save").unwrap();

    let mut coordinator = Coordinator::open(tmp.path()).unwrap();
    coordinator.bootstrap().unwrap();
    assert_eq!(coordinator.current_profile().id, "Old Save");
    assert!(layout.store_path("Old Save").exists());

    let alex = coordinator.create_profile("Alex").unwrap();
    let legacy = coordinator.find_profile("Old Save").unwrap();
    coordinator.switch_to(&legacy).unwrap();
    assert_eq!(coordinator.current_profile(), &legacy);
    assert_eq!(coordinator.list_profiles().len(), 2);
    assert_ne!(alex.id, legacy.id);
}
