//! Enrichers for plain-text artifacts

use regex::Regex;

use super::{Enrichment, EnrichmentError};
use crate::model::{Artifact, Fact, Metric};

/// Non-blank, non-comment lines.
fn content_lines(text: &str) -> impl Iterator<Item = &str> {
    text.lines()
        .filter(|line| !line.trim().is_empty() && !line.starts_with('#'))
}

/// `kconfig`: kernel build configuration, one `CONFIG_X=value` per line.
///
/// # Errors
///
/// Returns error if a line is not of the form `KEY=value`
pub fn enrich_from_kconfig(artifact: &Artifact) -> Result<Enrichment, EnrichmentError> {
    let text = artifact.text()?;
    let mut facts = Vec::new();
    for line in content_lines(&text) {
        let (key, value) = line.split_once('=').ok_or_else(|| {
            EnrichmentError::Malformed(format!("failed to parse kconfig line: {line}"))
        })?;
        facts.push(Fact::new(format!("kconfig_{}", key.trim()), value.trim()));
    }
    Ok(Enrichment::facts(facts))
}

/// `etc_os-release`: a copy of `/etc/os-release`.
///
/// # Errors
///
/// Returns error if a line is not `KEY=value` or its value is not a single
/// shell word
pub fn enrich_from_os_release(artifact: &Artifact) -> Result<Enrichment, EnrichmentError> {
    let text = artifact.text()?;
    let mut variant_id = None;
    for line in content_lines(&text) {
        let (key, raw) = line.split_once('=').ok_or_else(|| {
            EnrichmentError::Malformed(format!("invalid /etc/os-release line: {line}"))
        })?;
        let parts = shlex::split(raw).unwrap_or_default();
        let [value] = parts.as_slice() else {
            return Err(EnrichmentError::Malformed(format!(
                "invalid /etc/os-release line (shell words: {parts:?}): {line}"
            )));
        };
        if key == "VARIANT_ID" {
            variant_id = Some(value.clone());
        }
    }

    Ok(Enrichment::facts(
        variant_id
            .map(|v| Fact::new("os_release_variant_id", v))
            .into_iter()
            .collect(),
    ))
}

/// `bpftrace_asi_exits.log`: output of the ASI exit-counting bpftrace script.
///
/// # Errors
///
/// Returns error if the log cannot be read
pub fn enrich_from_bpftrace_logs(artifact: &Artifact) -> Result<Enrichment, EnrichmentError> {
    let pattern = Regex::new(r"@total_exits:\s+(\d+)")
        .map_err(|e| EnrichmentError::Malformed(e.to_string()))?;
    let text = artifact.text()?;

    let mut exits = None;
    for caps in text.lines().filter_map(|line| pattern.captures(line)) {
        if exits.is_some() {
            tracing::warn!(artifact = artifact.key(), "found two @total_exits results");
        }
        let count: i64 = caps[1]
            .parse()
            .map_err(|_| EnrichmentError::Malformed(format!("bad exit count {}", &caps[1])))?;
        exits = Some(count);
    }

    Ok(match exits {
        Some(count) => Enrichment {
            facts: vec![Fact::new("instrumented", true)],
            metrics: vec![Metric::new("asi_exits", count)],
        },
        None => Enrichment::none(),
    })
}

/// `compile-kernel_elapsed_ns_*`: a single integer nanosecond count.
///
/// # Errors
///
/// Returns error if the file does not contain an integer
pub fn enrich_from_elapsed_ns(artifact: &Artifact) -> Result<Enrichment, EnrichmentError> {
    let text = artifact.text()?;
    let ns: i64 = text.trim().parse().map_err(|_| {
        EnrichmentError::Malformed(format!("{} didn't contain an int", artifact.key()))
    })?;
    Ok(Enrichment::metrics(vec![
        Metric::new("compile-kernel_elapsed", ns).with_unit("ns")
    ]))
}

/// `nixos-system.txt`: store path of the booted NixOS system.
///
/// # Errors
///
/// Returns error if the file cannot be read
pub fn enrich_from_nixos_system(artifact: &Artifact) -> Result<Enrichment, EnrichmentError> {
    let text = artifact.text()?;
    Ok(Enrichment::facts(vec![Fact::new(
        "nixos_system",
        text.trim(),
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
    fn test_os_release_variant_id() {
        let dir = tempfile::tempdir().unwrap();
        let a = artifact(
            &dir,
            "etc_os-release",
            "# comment\nNAME=NixOS\nPRETTY_NAME=\"NixOS 24.05 (Uakari)\"\nVARIANT_ID=aethelred-asi-on\n",
        );
        let out = enrich_from_os_release(&a).unwrap();
        assert_eq!(
            out.facts,
            vec![Fact::new("os_release_variant_id", "aethelred-asi-on")]
        );
        assert!(out.metrics.is_empty());
    }

    #[test]
    fn test_os_release_without_variant() {
        let dir = tempfile::tempdir().unwrap();
        let a = artifact(&dir, "etc_os-release", "NAME=Debian\n");
        assert!(enrich_from_os_release(&a).unwrap().is_empty());
    }

    #[test]
    fn test_os_release_rejects_multi_word_value() {
        let dir = tempfile::tempdir().unwrap();
        let a = artifact(&dir, "etc_os-release", "NAME=two words\n");
        assert!(matches!(
            enrich_from_os_release(&a),
            Err(EnrichmentError::Malformed(_))
        ));
    }

    #[test]
    fn test_bpftrace_logs() {
        let dir = tempfile::tempdir().unwrap();
        let a = artifact(
            &dir,
            "bpftrace_asi_exits.log",
            "Attaching 3 probes...\n\n@total_exits: 16764\n",
        );
        let out = enrich_from_bpftrace_logs(&a).unwrap();
        assert_eq!(out.facts, vec![Fact::new("instrumented", true)]);
        assert_eq!(out.metrics, vec![Metric::new("asi_exits", 16_764_i64)]);
    }

    #[test]
    fn test_bpftrace_logs_without_total() {
        let dir = tempfile::tempdir().unwrap();
        let a = artifact(&dir, "bpftrace_asi_exits.log", "Attaching 3 probes...\n");
        assert!(enrich_from_bpftrace_logs(&a).unwrap().is_empty());
    }

    #[test]
    fn test_elapsed_ns() {
        let dir = tempfile::tempdir().unwrap();
        let a = artifact(&dir, "compile-kernel_elapsed_ns_1", "123456789\n");
        let out = enrich_from_elapsed_ns(&a).unwrap();
        assert_eq!(
            out.metrics,
            vec![Metric::new("compile-kernel_elapsed", 123_456_789_i64).with_unit("ns")]
        );

        let bad = artifact(&dir, "compile-kernel_elapsed_ns_2", "soon");
        assert!(enrich_from_elapsed_ns(&bad).is_err());
    }

    #[test]
    fn test_kconfig() {
        let dir = tempfile::tempdir().unwrap();
        let a = artifact(
            &dir,
            "kconfig",
            "#\n# CONFIG_FOO is not set\nCONFIG_MITIGATION_PAGE_TABLE_ISOLATION=y\nCONFIG_HZ=1000\n",
        );
        let out = enrich_from_kconfig(&a).unwrap();
        assert_eq!(
            out.facts,
            vec![
                Fact::new("kconfig_CONFIG_MITIGATION_PAGE_TABLE_ISOLATION", "y"),
                Fact::new("kconfig_CONFIG_HZ", "1000"),
            ]
        );

        let bad = artifact(&dir, "kconfig2", "CONFIG_BROKEN\n");
        assert!(enrich_from_kconfig(&bad).is_err());
    }

    #[test]
    fn test_nixos_system() {
        let dir = tempfile::tempdir().unwrap();
        let a = artifact(&dir, "nixos-system.txt", "/nix/store/abc-nixos-system\n");
        assert_eq!(
            enrich_from_nixos_system(&a).unwrap().facts,
            vec![Fact::new("nixos_system", "/nix/store/abc-nixos-system")]
        );
    }
}
