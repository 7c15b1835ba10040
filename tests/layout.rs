use shoebox::layout::{UNCATEGORIZED, audit_tree, resolve_destination, verify_organized};
use std::fs;
use std::path::Path;

fn touch(path: &Path) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, b"x").unwrap();
}

#[test]
fn destination_sits_exactly_two_levels_below_root() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path();

    let dest = resolve_destination(root, "Jane_Q_Public", "W2_BofA_2023").unwrap();
    assert_eq!(dest.pdf, root.join("Jane_Q_Public").join("W2_BofA_2023.pdf"));
    assert_eq!(dest.sidecar, root.join("Jane_Q_Public").join("W2_BofA_2023.json"));
    verify_organized(root, &dest.pdf).unwrap();
}

#[test]
fn corrupted_client_token_collapses_to_last_segment() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path();

    let dest = resolve_destination(root, "a/b/Client", "Doc_2023").unwrap();
    assert_eq!(dest.client, "Client");
    verify_organized(root, &dest.pdf).unwrap();
}

#[test]
fn collisions_get_two_digit_suffixes() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path();

    let first = resolve_destination(root, "Client", "W2_2023").unwrap();
    touch(&first.pdf);
    let second = resolve_destination(root, "Client", "W2_2023").unwrap();
    assert_eq!(second.pdf, root.join("Client").join("W2_2023_01.pdf"));
    touch(&second.pdf);
    let third = resolve_destination(root, "Client", "W2_2023").unwrap();
    assert_eq!(third.pdf, root.join("Client").join("W2_2023_02.pdf"));
}

#[test]
fn collision_loop_guard_falls_back_to_timestamp() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path();
    let dir = root.join("Client");
    fs::create_dir_all(&dir).unwrap();

    touch(&dir.join("W2_2023.pdf"));
    for n in 1..=100 {
        touch(&dir.join(format!("W2_2023_{n:02}.pdf")));
    }

    let dest = resolve_destination(root, "Client", "W2_2023").unwrap();
    let stem = dest.pdf.file_stem().unwrap().to_str().unwrap().to_string();
    let suffix = stem.strip_prefix("W2_2023_").expect("timestamp suffix");
    let epoch: i64 = suffix.parse().expect("numeric suffix");
    assert!(epoch > 1_000_000_000, "expected epoch timestamp, got {stem}");
    verify_organized(root, &dest.pdf).unwrap();
}

#[test]
fn verify_rejects_wrong_depth() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path();

    assert!(verify_organized(root, &root.join("orphan.pdf")).is_err());
    assert!(verify_organized(root, &root.join("a/b/c.pdf")).is_err());
    assert!(verify_organized(root, Path::new("/elsewhere/x.pdf")).is_err());
}

#[test]
fn audit_moves_root_files_into_uncategorized() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path();
    touch(&root.join("stray.pdf"));

    let issues = audit_tree(root).unwrap();
    assert_eq!(issues.len(), 1);
    assert!(!root.join("stray.pdf").exists());
    assert!(root.join(UNCATEGORIZED).join("stray.pdf").exists());
}

#[test]
fn audit_flattens_nested_directories() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path();
    touch(&root.join("Client/keep.pdf"));
    touch(&root.join("Client/nested/deep/one.pdf"));
    touch(&root.join("Client/nested/two.pdf"));
    // Collides with a file already in the client folder.
    touch(&root.join("Client/nested/keep.pdf"));

    let issues = audit_tree(root).unwrap();
    assert_eq!(issues.len(), 1);
    assert!(!root.join("Client/nested").exists());
    assert!(root.join("Client/one.pdf").exists());
    assert!(root.join("Client/two.pdf").exists());
    assert!(root.join("Client/keep.pdf").exists());
    assert!(root.join("Client/keep_01.pdf").exists());
}

#[test]
fn audit_is_idempotent() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path();
    touch(&root.join("stray.pdf"));
    touch(&root.join("Client/nested/a.pdf"));

    let first = audit_tree(root).unwrap();
    assert_eq!(first.len(), 2);
    let second = audit_tree(root).unwrap();
    assert!(second.is_empty(), "second pass found {second:?}");
}

#[test]
fn audit_on_clean_tree_reports_nothing() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path();
    touch(&root.join("Client/W2_2023.pdf"));

    assert!(audit_tree(root).unwrap().is_empty());
}
