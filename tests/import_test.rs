//! Content-addressed import into a result store

mod common;

use std::fs;

use common::{pipeline, Store};
use falba::import::{import_result, RESULT_ID_LEN};
use falba::model::{Fact, Value};
use falba::{Database, Error};

fn source_tree() -> tempfile::TempDir {
    let src = tempfile::tempdir().unwrap();
    fs::create_dir_all(src.path().join("run/tmp")).unwrap();
    fs::write(src.path().join("etc_os-release"), "VARIANT_ID=asi-on\n").unwrap();
    fs::write(src.path().join("run/latency_ns.samples"), "1\n2\n3\n").unwrap();
    fs::write(src.path().join("run/tmp/kconfig"), "CONFIG_HZ=250\n").unwrap();
    src
}

#[test]
fn test_imported_result_loads() {
    let src = source_tree();
    let store = Store::new();

    let imported = import_result(
        store.root(),
        "bench",
        &[src.path().join("etc_os-release"), src.path().join("run")],
    )
    .unwrap();
    assert_eq!(imported.test_name, "bench");
    assert_eq!(imported.result_id.len(), RESULT_ID_LEN);
    assert!(imported.result_id.chars().all(|c| c.is_ascii_hexdigit()));
    assert_eq!(imported.artifact_count, 3);
    assert_eq!(imported.path, store.root().join(imported.dirname()));

    let db = Database::load(store.root(), &pipeline()).unwrap();
    let result = db.result(&imported.dirname()).unwrap();
    assert!(result.artifacts().contains_key("tmp/kconfig"));
    assert!(result.artifacts().contains_key("latency_ns.samples"));
    assert_eq!(
        result.fact("os_release_variant_id").map(Fact::value),
        Some(&Value::from("asi-on"))
    );
    assert_eq!(result.metrics().len(), 3);
}

#[test]
fn test_importing_twice_is_a_duplicate() {
    let src = source_tree();
    let store = Store::new();
    let inputs = [src.path().join("run")];

    let first = import_result(store.root(), "bench", &inputs).unwrap();
    let marker = first.path.join("artifacts/latency_ns.samples");
    let before = fs::read_to_string(&marker).unwrap();

    match import_result(store.root(), "bench", &inputs) {
        Err(Error::DuplicateResult(dirname)) => assert_eq!(dirname, first.dirname()),
        other => panic!("expected DuplicateResult, got {other:?}"),
    }

    // Nothing was written into the existing result
    assert_eq!(fs::read_to_string(&marker).unwrap(), before);
    assert_eq!(fs::read_dir(store.root()).unwrap().count(), 1);
}

#[test]
fn test_same_content_under_another_test_name() {
    let src = source_tree();
    let store = Store::new();
    let inputs = [src.path().join("run")];

    let a = import_result(store.root(), "bench", &inputs).unwrap();
    let b = import_result(store.root(), "bench-rerun", &inputs).unwrap();
    assert_eq!(a.result_id, b.result_id);
    assert_ne!(a.path, b.path);
}

#[test]
fn test_changed_content_gets_a_new_id() {
    let src = source_tree();
    let store = Store::new();
    let inputs = [src.path().join("run")];

    let a = import_result(store.root(), "bench", &inputs).unwrap();
    fs::write(src.path().join("run/latency_ns.samples"), "1\n2\n4\n").unwrap();
    let b = import_result(store.root(), "bench", &inputs).unwrap();
    assert_ne!(a.result_id, b.result_id);
}

#[test]
fn test_empty_directory_input_is_rejected() {
    let src = tempfile::tempdir().unwrap();
    let store = Store::new();
    assert!(matches!(
        import_result(store.root(), "bench", &[src.path()]),
        Err(Error::InvalidInput(_))
    ));
}
