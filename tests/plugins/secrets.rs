use profilectl::core::coordinator::Coordinator;
use profilectl::plugins::secrets::{SecretStore, SecretVault, SqliteVault, password_account};
use tempfile::tempdir;

#[test]
fn sqlite_vault_persists_and_replaces_entries() {
    let tmp = tempdir().unwrap();
    let path = tmp.path().join("vault").join("secrets.sqlite");
    {
        let vault = SqliteVault::open(&path).unwrap();
        vault.set("svc", "acct", b"first").unwrap();
        vault.set("svc", "acct", b"second").unwrap();
        vault.set("other", "acct", b"elsewhere").unwrap();
    }

    let vault = SqliteVault::open(&path).unwrap();
    assert_eq!(vault.get("svc", "acct").unwrap().as_deref(), Some(&b"second"[..]));
    assert_eq!(vault.get("other", "acct").unwrap().as_deref(), Some(&b"elsewhere"[..]));
    vault.delete("svc", "acct").unwrap();
    vault.delete("svc", "acct").unwrap();
    assert_eq!(vault.get("svc", "acct").unwrap(), None);
    assert!(vault.get("other", "acct").unwrap().is_some());
}

#[cfg(unix)]
#[test]
fn sqlite_vault_is_owner_only() {
    use std::os::unix::fs::PermissionsExt;
    let tmp = tempdir().unwrap();
    let path = tmp.path().join("secrets.sqlite");
    SqliteVault::open(&path).unwrap();
    let mode = std::fs::metadata(&path).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
}

#[test]
fn secret_store_scopes_by_profile() {
    let tmp = tempdir().unwrap();
    let store = SecretStore::new(SqliteVault::open(&tmp.path().join("s.sqlite")).unwrap(), "svc");

    assert!(!store.exists("a").unwrap());
    assert!(!store.verify(b"anything", "a").unwrap());
    store.set(b"pw-a", "a").unwrap();
    store.set(b"pw-b", "b").unwrap();

    assert!(store.verify(b"pw-a", "a").unwrap());
    assert!(!store.verify(b"pw-b", "a").unwrap());
    assert_eq!(
        store.vault().get("svc", &password_account("b")).unwrap().as_deref(),
        Some(&b"pw-b"[..])
    );

    store.delete("a").unwrap();
    assert!(!store.exists("a").unwrap());
    assert!(store.exists("b").unwrap());
}

#[test]
fn deleting_a_profile_removes_its_password() {
    let tmp = tempdir().unwrap();
    let mut coordinator = Coordinator::open(tmp.path()).unwrap();
    coordinator.bootstrap().unwrap();

    let alex = coordinator.create_profile("Alex").unwrap();
    let sam = coordinator.create_profile("Sam").unwrap();
    coordinator.set_password(&alex, "a-secret").unwrap();
    coordinator.set_password(&sam, "s-secret").unwrap();

    coordinator.delete_profile(&sam).unwrap();
    assert!(!coordinator.password_exists(&sam).unwrap());
    assert!(coordinator.verify_password(&alex, "a-secret").unwrap());
    assert!(!coordinator.layout().store_path(&sam.id).exists());
    assert!(!coordinator.layout().profile_dir(&sam.id).exists());

    coordinator.clear_password(&alex).unwrap();
    assert!(!coordinator.password_exists(&alex).unwrap());
}

#[test]
fn passwords_survive_a_restart() {
    let tmp = tempdir().unwrap();
    let alex = {
        let mut coordinator = Coordinator::open(tmp.path()).unwrap();
        coordinator.bootstrap().unwrap();
        let alex = coordinator.create_profile("Alex").unwrap();
        coordinator.set_password(&alex, "pw").unwrap();
        alex
    };

    let coordinator = Coordinator::open(tmp.path()).unwrap();
    assert!(coordinator.verify_password(&alex, "pw").unwrap());
    assert!(!coordinator.verify_password(&alex, "wrong").unwrap());
}
