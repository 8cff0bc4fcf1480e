//! Database loading and tabular projections

mod common;

use common::{pipeline, spread, tgz, Store};
use falba::model::Value;
use falba::query::Predicate;
use falba::{Database, Error};

fn three_result_store() -> Store {
    let store = Store::new();
    store.add_sampled_result(
        "bench:ccc",
        &[("mode", "on"), ("kernel_version", "6.1")],
        "latency_ns",
        &spread(5, 10.0, 50.0),
    );
    store.add_sampled_result(
        "bench:aaa",
        &[("mode", "off"), ("kernel_version", "6.1")],
        "latency_ns",
        &spread(3, 10.0, 30.0),
    );
    store.add_sampled_result(
        "other:bbb",
        &[("nproc_hint", "8")],
        "throughput",
        &[1.0, 2.0],
    );
    store
}

#[test]
fn test_results_sorted_by_dirname() {
    let store = three_result_store();
    let db = Database::load(store.root(), &pipeline()).unwrap();
    let names: Vec<String> = db.results().iter().map(|r| r.dirname()).collect();
    assert_eq!(names, vec!["bench:aaa", "bench:ccc", "other:bbb"]);
    assert_eq!(db.len(), 3);
    assert_eq!(db.root(), store.root());
}

#[test]
fn test_parallel_and_sequential_loads_agree() {
    let store = three_result_store();
    let pipeline = pipeline();
    let parallel = Database::builder()
        .pipeline(&pipeline)
        .parallel(true)
        .load(store.root())
        .unwrap();
    let sequential = Database::builder()
        .pipeline(&pipeline)
        .parallel(false)
        .load(store.root())
        .unwrap();
    assert_eq!(parallel.results_table().rows(), sequential.results_table().rows());
    assert_eq!(parallel.flat_table().rows(), sequential.flat_table().rows());
}

#[test]
fn test_name_sets() {
    let store = three_result_store();
    let db = Database::load(store.root(), &pipeline()).unwrap();
    let facts: Vec<&str> = db.unique_fact_names().iter().map(String::as_str).collect();
    assert_eq!(facts, vec!["kernel_version", "mode", "nproc_hint"]);
    assert_eq!(
        db.metric_names().into_iter().collect::<Vec<_>>(),
        vec!["latency_ns", "throughput"]
    );
    assert_eq!(
        db.test_names().into_iter().collect::<Vec<_>>(),
        vec!["bench", "other"]
    );
}

#[test]
fn test_results_table() {
    let store = three_result_store();
    let db = Database::load(store.root(), &pipeline()).unwrap();
    let table = db.results_table();
    assert_eq!(table.len(), 3);
    assert_eq!(table.fact_names(), &["kernel_version", "mode", "nproc_hint"]);

    let first = &table.rows()[0];
    assert_eq!(first.result_id, "aaa");
    assert_eq!(first.test_name, "bench");
    assert_eq!(first.fact("mode"), Some(&Value::from("off")));
    assert_eq!(first.fact("nproc_hint"), None);
}

#[test]
fn test_flat_table_matches_results() {
    let store = three_result_store();
    let db = Database::load(store.root(), &pipeline()).unwrap();
    let table = db.flat_table();

    let total_metrics: usize = db.results().iter().map(|r| r.metrics().len()).sum();
    assert_eq!(table.len(), total_metrics);
    assert_eq!(table.len(), 5 + 3 + 2);

    for row in table.rows() {
        let result = db
            .result(&format!("{}:{}", row.test_name, row.result_id))
            .unwrap();
        assert_eq!(row.facts, result.fact_values());
    }

    let first = &table.rows()[0];
    assert_eq!(first.metric, "latency_ns");
    assert_eq!(first.unit.as_deref(), Some("ns"));
    assert_eq!(first.value, Value::Float(10.0));
}

#[test]
fn test_load_failure_aggregates_every_bad_result() {
    let store = three_result_store();
    store.add_result("bad:1", &[("kconfig", "BROKEN\n")]);
    store.add_result("no-colon", &[]);

    match Database::load(store.root(), &pipeline()) {
        Err(Error::LoadFailed { failures }) => {
            let names: Vec<&str> = failures.iter().map(|f| f.dirname.as_str()).collect();
            assert_eq!(names, vec!["bad:1", "no-colon"]);
            assert!(matches!(failures[0].error, Error::Enrichment { .. }));
            assert!(matches!(failures[1].error, Error::MalformedResultName(_)));
        }
        other => panic!("expected LoadFailed, got {other:?}"),
    }
}

#[test]
fn test_duplicate_fact_fails_load() {
    let store = Store::new();
    store.add_result(
        "t:1",
        &[
            ("a/falba-facts.json", r#"{"mode": "on"}"#),
            ("b/falba-facts.json", r#"{"mode": "off"}"#),
        ],
    );
    let err = Database::load(store.root(), &pipeline()).unwrap_err();
    match err {
        Error::LoadFailed { failures } => {
            assert!(matches!(failures[0].error, Error::DuplicateAttribute { .. }));
        }
        other => panic!("expected LoadFailed, got {other}"),
    }
}

#[test]
fn test_filter_with_predicate() {
    let store = three_result_store();
    let db = Database::load(store.root(), &pipeline()).unwrap();

    let on = Predicate::parse("mode = 'on'").unwrap();
    let names: Vec<String> = db.filter(&on).unwrap().iter().map(|r| r.dirname()).collect();
    assert_eq!(names, vec!["bench:ccc"]);

    let by_test = Predicate::parse("test_name = 'bench' AND kernel_version = '6.1'").unwrap();
    assert_eq!(db.filter(&by_test).unwrap().len(), 2);

    let missing = Predicate::parse("mode IS NULL").unwrap();
    let names: Vec<String> = db.filter(&missing).unwrap().iter().map(|r| r.dirname()).collect();
    assert_eq!(names, vec!["other:bbb"]);

    let bad = Predicate::parse("mode").unwrap();
    assert!(matches!(db.filter(&bad), Err(Error::Predicate(_))));
}

#[test]
fn test_filter_on_sysfs_vulnerability_fact() {
    let store = three_result_store();
    let snapshot = tgz(&[(
        "/sys/devices/system/cpu/vulnerabilities/spectre_v2",
        "Mitigation: Retpolines\n",
    )]);
    store.add_binary_artifact("bench:ccc", "tmp/sysfs_cpu.tgz", &snapshot);
    let db = Database::load(store.root(), &pipeline()).unwrap();

    let missing = Predicate::parse("\"sysfs_cpu_vuln:spectre_v2\" IS NULL").unwrap();
    let names: Vec<String> = db.filter(&missing).unwrap().iter().map(|r| r.dirname()).collect();
    assert_eq!(names, vec!["bench:aaa", "other:bbb"]);
}
