//! Enrichers for compressed archives

use std::fs::File;
use std::io::Read;
use std::path::Path;

use flate2::read::GzDecoder;
use tar::Archive;

use super::{Enrichment, EnrichmentError};
use crate::model::{Artifact, Fact};

/// Directory whose files become `sysfs_cpu_vuln:*` facts.
const CPU_VULNERABILITIES_DIR: &str = "sys/devices/system/cpu/vulnerabilities";

/// `tmp/sysfs_cpu.tgz`: a gzipped tar snapshot of `/sys/devices/system/cpu`.
///
/// Every member directly under `/sys/devices/system/cpu/vulnerabilities`
/// becomes Fact `sysfs_cpu_vuln:<file name>` with its content, NULs and
/// surrounding whitespace stripped. Members are matched with or without the
/// leading `/`.
///
/// # Errors
///
/// Returns error if the archive cannot be decoded, or a vulnerability member
/// is not a regular file ([`EnrichmentError::Malformed`])
pub fn enrich_from_sysfs_cpu_tgz(artifact: &Artifact) -> Result<Enrichment, EnrichmentError> {
    let file = File::open(artifact.path())?;
    let mut archive = Archive::new(GzDecoder::new(file));
    let mut facts = Vec::new();

    for entry in archive.entries()? {
        let mut entry = entry?;
        let path = entry.path()?.into_owned();
        let relative = path.strip_prefix("/").unwrap_or(&path);
        if relative.parent() != Some(Path::new(CPU_VULNERABILITIES_DIR)) {
            continue;
        }
        let Some(name) = relative.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            continue;
        };
        if !entry.header().entry_type().is_file() {
            return Err(EnrichmentError::Malformed(format!(
                "{} is not a regular file",
                path.display()
            )));
        }

        let mut content = String::new();
        entry.read_to_string(&mut content)?;
        // tar pads sysfs files with NULs
        let value = content.trim_matches('\0').trim();
        facts.push(Fact::new(format!("sysfs_cpu_vuln:{name}"), value));
    }

    tracing::debug!(key = artifact.key(), facts = facts.len(), "read sysfs snapshot");
    Ok(Enrichment::facts(facts))
}
