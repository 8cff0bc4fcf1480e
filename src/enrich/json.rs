//! Enrichers for JSON artifacts

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde_json::Value as Json;

use super::{Enrichment, EnrichmentError};
use crate::model::{Artifact, Fact, Metric, Value};

/// Only Phoronix results with this identifier are understood.
const PTS_FIO_IDENTIFIER: &str = "pts/fio-2.1.0";

fn field<'a>(obj: &'a Json, path: &[&str]) -> Result<&'a Json, EnrichmentError> {
    let mut cur = obj;
    for key in path {
        cur = cur
            .get(key)
            .ok_or_else(|| EnrichmentError::MissingField(path.join(".")))?;
    }
    Ok(cur)
}

fn str_field<'a>(obj: &'a Json, path: &[&str]) -> Result<&'a str, EnrichmentError> {
    field(obj, path)?
        .as_str()
        .ok_or_else(|| EnrichmentError::Malformed(format!("{} is not a string", path.join("."))))
}

fn value_field(obj: &Json, path: &[&str]) -> Result<Value, EnrichmentError> {
    Value::from_json(field(obj, path)?.clone())
        .ok_or_else(|| EnrichmentError::MissingField(path.join(".")))
}

/// `falba-facts.json`: free-form facts written by the benchmark harness.
///
/// Each top-level key is a fact. `{"value": v, "unit": u}` objects carry a
/// unit; null values are skipped.
///
/// # Errors
///
/// Returns error if the file is not a JSON object
pub fn enrich_from_falba_facts_json(artifact: &Artifact) -> Result<Enrichment, EnrichmentError> {
    let Json::Object(map) = artifact.json()? else {
        return Err(EnrichmentError::Malformed(
            "falba-facts.json must contain a JSON object".to_string(),
        ));
    };

    let mut facts = Vec::with_capacity(map.len());
    for (name, json) in map {
        let (json, unit) = match json {
            Json::Object(mut obj) if obj.contains_key("value") => {
                let unit = obj.get("unit").and_then(Json::as_str).map(str::to_string);
                (obj.remove("value").unwrap_or(Json::Null), unit)
            }
            other => (other, None),
        };
        let Some(value) = Value::from_json(json) else {
            continue;
        };
        let fact = Fact::new(name, value);
        facts.push(match unit {
            Some(unit) => fact.with_unit(unit),
            None => fact,
        });
    }
    Ok(Enrichment::facts(facts))
}

/// `ansible_facts.json`: output of Ansible's setup module.
///
/// # Errors
///
/// Returns error if a required field is missing or has the wrong shape
pub fn enrich_from_ansible(artifact: &Artifact) -> Result<Enrichment, EnrichmentError> {
    let obj = artifact.json()?;

    let ts = str_field(&obj, &["ansible_date_time", "iso8601_micro"])?;
    let timestamp = DateTime::parse_from_rfc3339(ts)
        .map_err(|e| EnrichmentError::Malformed(format!("bad timestamp {ts:?}: {e}")))?
        .with_timezone(&Utc);

    // ansible_processor is a flat list of (index, vendor, model) triples.
    let processor = field(&obj, &["ansible_processor"])?
        .as_array()
        .ok_or_else(|| EnrichmentError::Malformed("ansible_processor is not a list".to_string()))?;
    if processor.len() % 3 != 0 {
        return Err(EnrichmentError::Malformed(format!(
            "ansible_processor has {} entries, expected triples",
            processor.len()
        )));
    }
    let mut cpu_models = BTreeSet::new();
    for triple in processor.chunks(3) {
        let vendor = triple[1].as_str().unwrap_or_default();
        let model = triple[2].as_str().unwrap_or_default();
        cpu_models.insert(format!("{vendor} {model}"));
    }

    let facts = vec![
        Fact::new("cmdline_fields", value_field(&obj, &["ansible_cmdline"])?),
        Fact::new("nproc", value_field(&obj, &["ansible_processor_nproc"])?),
        Fact::new("memory", value_field(&obj, &["ansible_memtotal_mb"])?).with_unit("MB"),
        Fact::new("kernel_version", value_field(&obj, &["ansible_facts", "kernel"])?),
        Fact::new("timestamp", timestamp),
        Fact::new(
            "cpu",
            cpu_models.into_iter().collect::<Vec<_>>().join(" + "),
        ),
    ];
    Ok(Enrichment::facts(facts))
}

/// `pts-results.json`: Phoronix Test Suite result export.
///
/// Each raw sample of an FIO result becomes one metric sample.
///
/// # Errors
///
/// Returns error if a required field is missing
pub fn enrich_from_phoronix_json(artifact: &Artifact) -> Result<Enrichment, EnrichmentError> {
    let obj = artifact.json()?;
    let results = field(&obj, &["results"])?
        .as_object()
        .ok_or_else(|| EnrichmentError::Malformed("results is not an object".to_string()))?;

    let mut metrics = Vec::new();
    for result in results.values() {
        let identifier = str_field(result, &["identifier"])?;
        if identifier != PTS_FIO_IDENTIFIER {
            tracing::debug!(identifier, "ignoring unknown Phoronix result");
            continue;
        }
        let args = str_field(result, &["arguments"])?;
        let scale = str_field(result, &["scale"])?;
        let subresults = field(result, &["results"])?
            .as_object()
            .ok_or_else(|| EnrichmentError::Malformed("results.results is not an object".to_string()))?;

        for subresult in subresults.values() {
            let raw = field(subresult, &["raw_values"])?
                .as_array()
                .ok_or_else(|| EnrichmentError::Malformed("raw_values is not a list".to_string()))?;
            for sample in raw {
                let Some(value) = Value::from_json(sample.clone()) else {
                    continue;
                };
                metrics.push(
                    Metric::new(format!("PTS FIO [{args}] {scale}"), value).with_unit(scale),
                );
            }
        }
    }
    Ok(Enrichment::metrics(metrics))
}

/// `fio_output_*.json`: FIO run with `--output-format=json+`.
///
/// # Errors
///
/// Returns error if a required field is missing
pub fn enrich_from_fio_json_plus(artifact: &Artifact) -> Result<Enrichment, EnrichmentError> {
    let obj = artifact.json()?;
    let jobs = field(&obj, &["jobs"])?
        .as_array()
        .ok_or_else(|| EnrichmentError::Malformed("jobs is not a list".to_string()))?;

    let mut metrics = Vec::new();
    for job in jobs {
        let jobname = str_field(job, &["jobname"])?;
        for lat in ["lat_ns", "slat_ns", "clat_ns"] {
            metrics.push(
                Metric::new(
                    format!("fio_{jobname}_read_{lat}_mean"),
                    value_field(job, &["read", lat, "mean"])?,
                )
                .with_unit("ns"),
            );
        }
        metrics.push(Metric::new(
            format!("fio_{jobname}_read_iops"),
            value_field(job, &["read", "iops"])?,
        ));
    }
    Ok(Enrichment::metrics(metrics))
}

/// `nixos-version.json`: output of `nixos-version --json`.
///
/// # Errors
///
/// Returns error if `configurationRevision` is missing
pub fn enrich_from_nixos_version_json(artifact: &Artifact) -> Result<Enrichment, EnrichmentError> {
    let obj = artifact.json()?;
    let revision = value_field(&obj, &["configurationRevision"])?;
    Ok(Enrichment::facts(vec![Fact::new(
        "nixos_configuration_revision",
        revision,
    )]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn artifact(dir: &tempfile::TempDir, name: &str, body: &str) -> Artifact {
        let path = dir.path().join(name);
        fs::write(&path, body).unwrap();
        Artifact::new(name, path)
    }

    #[test]
    fn test_falba_facts_json_with_units() {
        let dir = tempfile::tempdir().unwrap();
        let a = artifact(
            &dir,
            "falba-facts.json",
            r#"{"mode": "on", "cpus": 8, "iterations": {"value": 100, "unit": "runs"}, "skip": null}"#,
        );
        let out = enrich_from_falba_facts_json(&a).unwrap();
        assert_eq!(out.facts.len(), 3);
        assert!(out.facts.contains(&Fact::new("mode", "on")));
        assert!(out.facts.contains(&Fact::new("cpus", 8_i64)));
        assert!(out
            .facts
            .contains(&Fact::new("iterations", 100_i64).with_unit("runs")));
        assert!(out.metrics.is_empty());
    }

    #[test]
    fn test_falba_facts_json_rejects_non_object() {
        let dir = tempfile::tempdir().unwrap();
        let a = artifact(&dir, "falba-facts.json", "[1, 2]");
        assert!(matches!(
            enrich_from_falba_facts_json(&a),
            Err(EnrichmentError::Malformed(_))
        ));
    }

    #[test]
    fn test_fio_json_plus() {
        let dir = tempfile::tempdir().unwrap();
        let a = artifact(
            &dir,
            "fio_output_1.json",
            r#"{"jobs": [{"jobname": "randread", "read": {
                "lat_ns": {"mean": 56960.234619},
                "slat_ns": {"mean": 0.0},
                "clat_ns": {"mean": 56932.733276},
                "iops": 17448.349308}}]}"#,
        );
        let out = enrich_from_fio_json_plus(&a).unwrap();
        let names: Vec<&str> = out.metrics.iter().map(Metric::name).collect();
        assert_eq!(
            names,
            vec![
                "fio_randread_read_lat_ns_mean",
                "fio_randread_read_slat_ns_mean",
                "fio_randread_read_clat_ns_mean",
                "fio_randread_read_iops",
            ]
        );
        let iops = out.metrics[3].value().as_f64().unwrap();
        assert!((iops - 17_448.349_308).abs() < 1e-6);
    }

    #[test]
    fn test_fio_json_plus_missing_field() {
        let dir = tempfile::tempdir().unwrap();
        let a = artifact(&dir, "fio_output_1.json", r#"{"jobs": [{"jobname": "x"}]}"#);
        assert!(matches!(
            enrich_from_fio_json_plus(&a),
            Err(EnrichmentError::MissingField(_))
        ));
    }

    #[test]
    fn test_nixos_version_json() {
        let dir = tempfile::tempdir().unwrap();
        let a = artifact(
            &dir,
            "nixos-version.json",
            r#"{"configurationRevision": "1254e976fb3bfe9ea80a6a23e9456248149f36eb"}"#,
        );
        let out = enrich_from_nixos_version_json(&a).unwrap();
        assert_eq!(
            out.facts,
            vec![Fact::new(
                "nixos_configuration_revision",
                "1254e976fb3bfe9ea80a6a23e9456248149f36eb"
            )]
        );
    }

    #[test]
    fn test_phoronix_only_fio_results() {
        let dir = tempfile::tempdir().unwrap();
        let a = artifact(
            &dir,
            "pts-results.json",
            r#"{"results": {
                "a": {"identifier": "pts/fio-2.1.0", "arguments": "randread", "scale": "IOPS",
                      "results": {"sut": {"raw_values": [100, 110.5]}}},
                "b": {"identifier": "pts/other-1.0", "arguments": "x", "scale": "MB/s",
                      "results": {}}}}"#,
        );
        let out = enrich_from_phoronix_json(&a).unwrap();
        assert_eq!(out.metrics.len(), 2);
        assert_eq!(out.metrics[0].name(), "PTS FIO [randread] IOPS");
        assert_eq!(out.metrics[0].unit(), Some("IOPS"));
    }

    #[test]
    fn test_ansible_facts() {
        let dir = tempfile::tempdir().unwrap();
        let a = artifact(
            &dir,
            "ansible_facts.json",
            r#"{
                "ansible_cmdline": {"quiet": true, "mitigations": "auto"},
                "ansible_processor_nproc": 8,
                "ansible_memtotal_mb": 15875,
                "ansible_facts": {"kernel": "6.1.0"},
                "ansible_date_time": {"iso8601_micro": "2024-05-01T10:00:00.123456Z"},
                "ansible_processor": ["0", "AuthenticAMD", "EPYC", "1", "AuthenticAMD", "EPYC"]
            }"#,
        );
        let out = enrich_from_ansible(&a).unwrap();
        let get = |name: &str| out.facts.iter().find(|f| f.name() == name).unwrap().value().clone();
        assert_eq!(get("nproc"), Value::Int(8));
        assert_eq!(get("kernel_version"), Value::from("6.1.0"));
        assert_eq!(get("cpu"), Value::from("AuthenticAMD EPYC"));
        assert!(matches!(get("timestamp"), Value::Timestamp(_)));
        assert!(matches!(get("cmdline_fields"), Value::Map(_)));
    }
}
