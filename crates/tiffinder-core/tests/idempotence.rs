//! End-to-end runs over a scanned tree: repeating a copy must never
//! duplicate, overwrite or corrupt what an earlier (possibly interrupted)
//! run already wrote.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

use tiffinder_core::{Config, NamingPolicy, Record, TifFinder};

fn dest_snapshot(dir: &Path) -> BTreeMap<String, Vec<u8>> {
    fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| p.extension().map(|e| e != "log").unwrap_or(true))
        .map(|p| {
            (
                p.file_name().unwrap().to_string_lossy().into_owned(),
                fs::read(&p).unwrap(),
            )
        })
        .collect()
}

fn scanned_finder(scan_dir: &Path, cache_fn: &Path) -> TifFinder {
    let mut finder = TifFinder::open(cache_fn, Config::default()).unwrap();
    finder.scan(&[scan_dir.to_path_buf()]).unwrap();
    finder
}

#[test]
fn preserve_copy_is_idempotent() {
    let scan_dir = tempdir().unwrap();
    let dest_dir = tempdir().unwrap();
    let cache_dir = tempdir().unwrap();
    let cache_fn = cache_dir.path().join("cache.json");

    fs::write(scan_dir.path().join("A 110.tif"), b"page one").unwrap();
    fs::write(scan_dir.path().join("A 110 verso.tif"), b"page two").unwrap();

    let finder = scanned_finder(scan_dir.path(), &cache_fn);
    let hits = finder.search("A 110");
    assert_eq!(hits.len(), 2);

    let mut m = finder.materializer(dest_dir.path()).unwrap();
    let first = m.copy_all(&hits, &NamingPolicy::Preserve);
    assert_eq!(first.copied(), 2);
    let after_first = dest_snapshot(dest_dir.path());

    // second run: same matches, same destination, nothing changes
    let mut m = finder.materializer(dest_dir.path()).unwrap();
    let second = m.copy_all(&hits, &NamingPolicy::Preserve);
    assert_eq!(second.copied(), 0);
    assert_eq!(second.skipped_identical(), 2);
    assert_eq!(dest_snapshot(dest_dir.path()), after_first);
}

#[test]
fn resumed_run_completes_without_touching_earlier_files() {
    let scan_dir = tempdir().unwrap();
    let dest_dir = tempdir().unwrap();
    let cache_dir = tempdir().unwrap();
    let cache_fn = cache_dir.path().join("cache.json");

    fs::write(scan_dir.path().join("B 22.tif"), b"first").unwrap();
    fs::write(scan_dir.path().join("B 22a.tif"), b"second").unwrap();

    let finder = scanned_finder(scan_dir.path(), &cache_fn);
    let hits = finder.search("B 22");
    assert_eq!(hits.len(), 2);

    // simulate an interrupted first run that only got one file out
    let partial: Vec<PathBuf> = hits
        .iter()
        .filter(|p| p.file_name().unwrap() == "B 22.tif")
        .cloned()
        .collect();
    let mut m = finder.materializer(dest_dir.path()).unwrap();
    m.copy_all(&partial, &NamingPolicy::Preserve);

    // the rerun picks up the rest and leaves the finished file alone
    let mut m = finder.materializer(dest_dir.path()).unwrap();
    let report = m.copy_all(&hits, &NamingPolicy::Preserve);
    assert_eq!(report.copied(), 1);
    assert_eq!(report.skipped_identical(), 1);

    let snapshot = dest_snapshot(dest_dir.path());
    assert_eq!(snapshot.len(), 2);
    assert_eq!(snapshot.get("B 22.tif").unwrap(), b"first");
    assert_eq!(snapshot.get("B 22a.tif").unwrap(), b"second");
}

#[test]
fn distinct_content_never_collides_silently() {
    let scan_a = tempdir().unwrap();
    let scan_b = tempdir().unwrap();
    let dest_dir = tempdir().unwrap();
    let cache_dir = tempdir().unwrap();
    let cache_fn = cache_dir.path().join("cache.json");

    // same base name, different content, in two scan roots
    fs::write(scan_a.path().join("C 7.tif"), b"from archive A").unwrap();
    fs::write(scan_b.path().join("C 7.tif"), b"from archive B").unwrap();

    let mut finder = TifFinder::open(&cache_fn, Config::default()).unwrap();
    finder
        .scan(&[scan_a.path().to_path_buf(), scan_b.path().to_path_buf()])
        .unwrap();
    let hits = finder.search("C 7");
    assert_eq!(hits.len(), 2);

    let mut m = finder.materializer(dest_dir.path()).unwrap();
    let report = m.copy_all(&hits, &NamingPolicy::Preserve);
    assert_eq!(report.copied(), 2);

    let snapshot = dest_snapshot(dest_dir.path());
    assert_eq!(snapshot.len(), 2);
    let mut contents: Vec<&Vec<u8>> = snapshot.values().collect();
    contents.sort();
    assert_ne!(contents[0], contents[1]);
}

#[test]
fn composite_copy_is_idempotent_by_name() {
    let scan_dir = tempdir().unwrap();
    let dest_dir = tempdir().unwrap();
    let cache_dir = tempdir().unwrap();
    let cache_fn = cache_dir.path().join("cache.json");

    fs::write(scan_dir.path().join("VII c 123.tif"), b"master bytes").unwrap();

    let finder = scanned_finder(scan_dir.path(), &cache_fn);
    let records = vec![Record {
        identifier: "VII c 123".to_string(),
        secondary_id: Some("Obj123".to_string()),
    }];
    let matches = finder.search_records(&records);
    assert_eq!(matches[0].paths.len(), 1);

    let mut m = finder.materializer(dest_dir.path()).unwrap();
    let first = m.copy_records(&matches);
    assert_eq!(first.copied(), 1);
    let after_first = dest_snapshot(dest_dir.path());
    assert_eq!(after_first.len(), 1);
    let name = after_first.keys().next().unwrap().clone();
    assert!(name.starts_with("Obj123."));
    assert!(name.ends_with(".tif"));

    let mut m = finder.materializer(dest_dir.path()).unwrap();
    let second = m.copy_records(&matches);
    assert_eq!(second.copied(), 0);
    assert_eq!(second.skipped_identical(), 1);
    assert_eq!(dest_snapshot(dest_dir.path()), after_first);
}
