use dynparam::error::ResourceError;
use dynparam::resources::classpath::{autocomplete_class_path, parse_class_path, split_class_paths};
use dynparam::resources::store::{ResourceStore, is_descendant};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn store_with_dirs(names: &[&str]) -> (TempDir, ResourceStore) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    for name in names {
        fs::create_dir_all(dir.path().join(name)).unwrap();
    }
    let store = ResourceStore::new(dir.path());
    (dir, store)
}

#[test]
fn test_split_class_paths() {
    assert_eq!(split_class_paths("val1, val2, val3"), vec!["val1", "val2", "val3"]);
    assert_eq!(split_class_paths("val1; val2  , val3"), vec!["val1; val2", "val3"]);
    assert_eq!(split_class_paths("CP-First"), vec!["cp-first"]);
    assert!(split_class_paths("").is_empty());
    assert!(split_class_paths(" , ").is_empty());
}

#[test]
fn test_parse_class_path_keeps_case_and_order() {
    assert_eq!(parse_class_path("Lib, shared ,Lib"), vec!["Lib", "shared", "Lib"]);
    assert!(parse_class_path("").is_empty());
}

#[test]
fn test_autocomplete_class_path() {
    let (_dir, store) = store_with_dirs(&["cp-first", "cp-second", "cp-fourth"]);

    assert_eq!(autocomplete_class_path(&store, "cp-f"), vec!["cp-first", "cp-fourth"]);
    assert_eq!(autocomplete_class_path(&store, "cp-fourth, cp-f"), vec!["cp-first"]);
    assert_eq!(autocomplete_class_path(&store, "cp-fi"), vec!["cp-first"]);
    assert_eq!(autocomplete_class_path(&store, "cp-s"), vec!["cp-second"]);
    assert!(autocomplete_class_path(&store, "fi").is_empty());
    assert_eq!(
        autocomplete_class_path(&store, ""),
        vec!["cp-first", "cp-fourth", "cp-second"]
    );
}

#[test]
fn test_list_classpath_dirs_on_missing_base() {
    let dir = tempfile::tempdir().unwrap();
    let store = ResourceStore::new(dir.path().join("nowhere"));

    assert!(store.list_classpath_dirs().is_empty());
    assert!(autocomplete_class_path(&store, "cp").is_empty());
}

#[test]
fn test_resolve_refuses_escaping_paths() {
    let (dir, store) = store_with_dirs(&["lib"]);

    assert_eq!(store.resolve("lib").unwrap(), dir.path().join("lib"));
    assert_eq!(store.resolve("lib/nested").unwrap(), dir.path().join("lib/nested"));
    assert!(matches!(store.resolve("../etc"), Err(ResourceError::OutsideBase { .. })));
    assert!(matches!(store.resolve("/etc"), Err(ResourceError::OutsideBase { .. })));
    assert!(matches!(store.resolve("  "), Err(ResourceError::EmptyPath)));
}

#[test]
fn test_rebase_keeps_paths_inside_base() {
    let store = ResourceStore::new("/srv/classpath");

    assert_eq!(store.rebase("lib"), PathBuf::from("/srv/classpath/lib"));
    assert_eq!(store.rebase("lib/../other"), PathBuf::from("/srv/classpath/other"));
    assert_eq!(store.rebase("/srv/classpath/lib"), PathBuf::from("/srv/classpath/lib"));
    assert_eq!(store.rebase("../../etc/passwd"), PathBuf::from("/srv/classpath/passwd"));
    assert_eq!(store.rebase("/tmp/scripts"), PathBuf::from("/srv/classpath/scripts"));
    assert_eq!(store.rebase(".."), PathBuf::from("/srv/classpath/srv"));
    assert_eq!(store.rebase("/"), PathBuf::from("/srv/classpath/_newClassPath"));
}

#[test]
fn test_list_entries_of_a_subdirectory() {
    let (dir, store) = store_with_dirs(&["lib/b", "lib/a"]);
    fs::write(dir.path().join("lib/readme.txt"), "").unwrap();

    assert_eq!(store.list("lib"), vec!["a", "b", "readme.txt"]);
    assert!(store.list("lib/readme.txt").is_empty());
}

#[test]
fn test_is_descendant() {
    let root = Path::new("/srv/root");

    assert!(is_descendant(root, Path::new("/srv/root/a")));
    assert!(is_descendant(root, Path::new("/srv/root/a/b")));
    assert!(!is_descendant(root, Path::new("/srv/root")));
    assert!(!is_descendant(root, Path::new("/srv/rootless")));
    assert!(!is_descendant(root, Path::new("/srv")));
}
