use std::fs;

use pretty_assertions::assert_eq;
use tempfile::TempDir;
use worddown_engine::{DirectoryRole, ExportDirectory, SwapError, LIVE_DIR_NAME, PENDING_DIR_NAME};

fn types() -> Vec<String> {
    vec!["post".to_string(), "page".to_string()]
}

#[test]
fn setup_pending_creates_protected_type_dirs() {
    let temp = TempDir::new().unwrap();
    let dirs = ExportDirectory::new(temp.path());
    dirs.setup_pending(&types()).unwrap();
    // Idempotent.
    dirs.setup_pending(&types()).unwrap();

    let pending = temp.path().join(PENDING_DIR_NAME);
    for dir in [pending.clone(), pending.join("post"), pending.join("page")] {
        assert!(dir.is_dir(), "{} missing", dir.display());
        assert_eq!(
            fs::read_to_string(dir.join(".htaccess")).unwrap(),
            "Options -Indexes\nDeny from all\n"
        );
        assert_eq!(fs::read_to_string(dir.join("index.html")).unwrap(), "");
    }
    assert_eq!(
        dirs.write_path(DirectoryRole::Pending, "page", "page-a-1.md"),
        pending.join("page").join("page-a-1.md")
    );
}

#[test]
fn swap_replaces_live_wholesale() {
    let temp = TempDir::new().unwrap();
    let dirs = ExportDirectory::new(temp.path());
    dirs.setup_live(&types()).unwrap();
    let old = dirs.write_path(DirectoryRole::Live, "page", "page-old-1.md");
    fs::write(&old, "old").unwrap();

    dirs.setup_pending(&types()).unwrap();
    fs::write(dirs.write_path(DirectoryRole::Pending, "page", "page-new-2.md"), "new").unwrap();

    dirs.swap().unwrap();

    let live = temp.path().join(LIVE_DIR_NAME);
    assert!(!old.exists());
    assert_eq!(fs::read_to_string(live.join("page").join("page-new-2.md")).unwrap(), "new");
    assert!(!temp.path().join(PENDING_DIR_NAME).exists());
}

#[test]
fn swap_without_pending_fails_and_keeps_live() {
    let temp = TempDir::new().unwrap();
    let dirs = ExportDirectory::new(temp.path());
    dirs.setup_live(&types()).unwrap();

    let err = dirs.swap().unwrap_err();
    assert!(matches!(err, SwapError::PendingMissing(_)));
    assert!(dirs.root(DirectoryRole::Live).is_dir());
}

#[test]
fn failed_swap_leaves_pending_for_the_caller() {
    let temp = TempDir::new().unwrap();
    let dirs = ExportDirectory::new(temp.path());
    // A plain file where the live directory should be cannot be removed as a tree.
    fs::write(temp.path().join(LIVE_DIR_NAME), "not a directory").unwrap();
    dirs.setup_pending(&types()).unwrap();

    let err = dirs.swap().unwrap_err();
    assert!(matches!(err, SwapError::RemoveLive(_)));
    assert!(dirs.root(DirectoryRole::Pending).is_dir());

    dirs.cleanup_pending().unwrap();
    assert!(!dirs.root(DirectoryRole::Pending).exists());
}

#[test]
fn cleanup_pending_is_a_noop_when_missing() {
    let temp = TempDir::new().unwrap();
    let dirs = ExportDirectory::new(temp.path());
    dirs.cleanup_pending().unwrap();
    assert!(!dirs.root(DirectoryRole::Pending).exists());
}
