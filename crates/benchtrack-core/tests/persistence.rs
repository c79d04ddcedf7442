//! Exchange document persistence.

mod common;

use std::fs;

use benchtrack_core::{load, load_or_init, save, BenchError, BenchStore, SeriesSource};
use common::{bench, entry, REPO};

const FIXTURE: &str = r#"window.BENCHMARK_DATA = {
  "lastUpdate": 1709287200000,
  "repoUrl": "https://github.com/acme/widget",
  "entries": {
    "Rust Benchmark": [
      {
        "commit": {
          "author": {"email": "jane@example.com", "name": "Jane Doe", "username": "jdoe"},
          "committer": {"email": "noreply@github.com", "name": "GitHub", "username": "web-flow"},
          "distinct": true,
          "id": "5f3ab6c1d2e4f5a6b7c8d9e0f1a2b3c4d5e6f7a8",
          "message": "Speed up tokenizer (#42)",
          "timestamp": "2024-03-01T10:00:00+01:00",
          "tree_id": "a1b2c3d4e5f6a7b8c9d0e1f2a3b4c5d6e7f8a9b0",
          "url": "https://github.com/acme/widget/commit/5f3ab6c1d2e4f5a6b7c8d9e0f1a2b3c4d5e6f7a8"
        },
        "date": 1709287200000,
        "tool": "cargo",
        "benches": [
          {"name": "parse::small", "value": 135, "range": "± 24", "unit": "ns/iter"},
          {"name": "parse::large", "value": 1234567, "range": "± 8,910", "unit": "ns/iter"}
        ]
      }
    ]
  }
};
"#;

fn sample_store() -> BenchStore {
    let mut store = BenchStore::new(REPO);
    store
        .append(
            "Go Benchmark",
            entry(
                "a",
                100,
                "go",
                vec![bench("BenchmarkFib10", 412.0, "ns/op").with_extra("3000000 times\n8 procs")],
            ),
        )
        .unwrap();
    store
        .append(
            "Go Benchmark",
            entry("b", 200, "go", vec![bench("BenchmarkFib10", 398.5, "ns/op")]),
        )
        .unwrap();
    store
        .append(
            "Python Benchmark",
            entry(
                "b",
                250,
                "pytest",
                vec![bench("t::insert", 800.0, "iter/sec").with_range("stddev: 0.0002")],
            ),
        )
        .unwrap();
    store
}

#[test]
fn roundtrip_preserves_store() {
    let dir = tempfile::tempdir().unwrap();
    for name in ["data.json", "data.js"] {
        let path = dir.path().join(name);
        let store = sample_store();
        save(&store, &path).unwrap();
        let loaded = load(&path).unwrap();
        assert_eq!(loaded, store, "roundtrip through {name}");
        assert_eq!(loaded.last_update(), 250);
    }
}

#[test]
fn loads_dashboard_fixture() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.js");
    fs::write(&path, FIXTURE).unwrap();

    let store = load(&path).unwrap();
    assert_eq!(store.repo_url(), REPO);
    assert_eq!(store.last_update(), 1_709_287_200_000);

    let suite = store.suite("Rust Benchmark").unwrap();
    let e = suite.latest().unwrap();
    assert_eq!(e.tool, "cargo");
    assert_eq!(e.commit.author.username.as_deref(), Some("jdoe"));
    assert_eq!(e.benches[1].value, 1_234_567.0);
    assert_eq!(e.benches[1].range.as_deref(), Some("± 8,910"));

    let series = store.series("Rust Benchmark", "parse::small").unwrap();
    assert_eq!(series.iter().map(|p| p.value()).collect::<Vec<_>>(), vec![135.0]);

    // Saving and reloading keeps the document equivalent.
    save(&store, &path).unwrap();
    assert_eq!(load(&path).unwrap(), store);
}

#[test]
fn scenario_d_corrupt_byte_is_serialization_error_and_file_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.json");
    save(&sample_store(), &path).unwrap();

    let mut bytes = fs::read(&path).unwrap();
    let pos = bytes.iter().position(|b| *b == b':').unwrap();
    bytes[pos] = b'#';
    fs::write(&path, &bytes).unwrap();

    let err = load(&path).unwrap_err();
    assert!(matches!(err, BenchError::Serialization { .. }), "got {err:?}");
    assert_eq!(fs::read(&path).unwrap(), bytes);

    // Never falls back to an empty store either.
    assert!(load_or_init(&path, REPO).is_err());
    assert_eq!(fs::read(&path).unwrap(), bytes);
}

#[test]
fn wrong_value_type_is_serialization_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.json");
    fs::write(
        &path,
        r#"{"lastUpdate": 1, "repoUrl": "r", "entries": {"S": [{"date": "yesterday"}]}}"#,
    )
    .unwrap();
    assert!(matches!(load(&path), Err(BenchError::Serialization { .. })));
}

#[test]
fn save_replaces_atomically_without_leftovers() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.json");

    let mut store = sample_store();
    save(&store, &path).unwrap();
    store
        .append(
            "Go Benchmark",
            entry("c", 300, "go", vec![bench("BenchmarkFib10", 401.0, "ns/op")]),
        )
        .unwrap();
    save(&store, &path).unwrap();

    let names: Vec<String> = fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["data.json".to_string()]);
    assert_eq!(load(&path).unwrap().suite("Go Benchmark").unwrap().len(), 3);
}

#[test]
fn load_or_init_creates_nothing_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.json");
    let store = load_or_init(&path, REPO).unwrap();
    assert_eq!(store, BenchStore::new(REPO));
    assert!(!path.exists());
}
