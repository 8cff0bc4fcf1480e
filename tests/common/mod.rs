//! Shared fixtures: result stores built in temporary directories

#![allow(dead_code)]

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use falba::enrich::{Enrichment, EnrichmentError, FnEnricher};
use falba::model::{Artifact, Metric};
use falba::Pipeline;
use flate2::write::GzEncoder;
use flate2::Compression;
use tempfile::TempDir;

/// A result store in a temporary directory.
pub struct Store {
    dir: TempDir,
}

impl Store {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Create `<dirname>/artifacts/<key>` for every `(key, body)`.
    pub fn add_result(&self, dirname: &str, files: &[(&str, &str)]) -> PathBuf {
        let dir = self.root().join(dirname);
        let artifacts = dir.join("artifacts");
        fs::create_dir_all(&artifacts).unwrap();
        for (key, body) in files {
            let path = artifacts.join(key);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, body).unwrap();
        }
        dir
    }

    /// A result whose facts come from `falba-facts.json` and whose metric
    /// samples come from `<metric>.samples`.
    pub fn add_sampled_result(
        &self,
        dirname: &str,
        facts: &[(&str, &str)],
        metric: &str,
        samples: &[f64],
    ) -> PathBuf {
        let samples_key = format!("{metric}.samples");
        let facts_json = facts_json(facts);
        let body = samples_body(samples);
        self.add_result(
            dirname,
            &[
                ("falba-facts.json", facts_json.as_str()),
                (samples_key.as_str(), body.as_str()),
            ],
        )
    }

    /// Write a binary artifact into an existing or new result.
    pub fn add_binary_artifact(&self, dirname: &str, key: &str, body: &[u8]) -> PathBuf {
        let dir = self.add_result(dirname, &[]);
        let path = dir.join("artifacts").join(key);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, body).unwrap();
        dir
    }

    pub fn write_config(&self, json: &str) {
        fs::write(self.root().join("results.json"), json).unwrap();
    }
}

/// `{"k": "v", ...}` with string values.
pub fn facts_json(facts: &[(&str, &str)]) -> String {
    let map: serde_json::Map<String, serde_json::Value> = facts
        .iter()
        .map(|(k, v)| ((*k).to_string(), serde_json::Value::from(*v)))
        .collect();
    serde_json::Value::Object(map).to_string()
}

fn samples_body(samples: &[f64]) -> String {
    let mut body = String::new();
    for s in samples {
        let _ = writeln!(body, "{s}");
    }
    body
}

/// `<metric>.samples`: one float per line, unit `ns`.
pub fn enrich_samples(artifact: &Artifact) -> Result<Enrichment, EnrichmentError> {
    let metric = artifact
        .file_name()
        .strip_suffix(".samples")
        .unwrap_or_default()
        .to_string();
    let mut metrics = Vec::new();
    for line in artifact.text()?.lines().filter(|l| !l.trim().is_empty()) {
        let v: f64 = line
            .trim()
            .parse()
            .map_err(|_| EnrichmentError::Malformed(format!("bad sample {line:?}")))?;
        metrics.push(Metric::new(metric.clone(), v).with_unit("ns"));
    }
    Ok(Enrichment::metrics(metrics))
}

/// A gzipped tarball of `(member name, content)` regular files. Names are
/// stored verbatim, so a leading `/` survives.
pub fn tgz(members: &[(&str, &str)]) -> Vec<u8> {
    let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
    for (name, data) in members {
        let mut header = tar::Header::new_gnu();
        header.as_old_mut().name[..name.len()].copy_from_slice(name.as_bytes());
        header.set_entry_type(tar::EntryType::Regular);
        header.set_size(data.len() as u64);
        header.set_mode(0o444);
        header.set_cksum();
        builder.append(&header, data.as_bytes()).unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap()
}

/// Built-in pipeline plus the `.samples` enricher.
pub fn pipeline() -> Pipeline {
    Pipeline::builtin()
        .unwrap()
        .with_enricher(FnEnricher::new("samples", "*.samples", enrich_samples).unwrap())
}

/// `n` evenly spread samples in `[lo, hi]`.
#[allow(clippy::cast_precision_loss)]
pub fn spread(n: usize, lo: f64, hi: f64) -> Vec<f64> {
    if n <= 1 {
        return vec![hi; n];
    }
    (0..n)
        .map(|i| lo + (hi - lo) * i as f64 / (n - 1) as f64)
        .collect()
}
