//! Artifact - lazy handle to one file under a result's artifact tree

use std::fs;
use std::path::{Path, PathBuf};

use crate::enrich::EnrichmentError;

/// Artifact represents a file produced by a benchmark run.
///
/// The `key` is the path relative to the result's `artifacts/` directory,
/// always with `/` separators. Content is read from disk on each access;
/// artifacts are never written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    key: String,
    path: PathBuf,
}

impl Artifact {
    /// Create a new artifact handle.
    ///
    /// # Arguments
    ///
    /// * `key` - Path relative to the artifacts root (e.g. "tmp/fio_output_1.json")
    /// * `path` - Location of the file on disk
    #[must_use]
    pub fn new(key: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            key: key.into(),
            path: path.into(),
        }
    }

    /// Get the artifact key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Get the on-disk path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Final component of the key.
    #[must_use]
    pub fn file_name(&self) -> &str {
        self.key.rsplit('/').next().unwrap_or(&self.key)
    }

    /// Read the whole file.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read
    pub fn content(&self) -> Result<Vec<u8>, EnrichmentError> {
        Ok(fs::read(&self.path)?)
    }

    /// Read the whole file as UTF-8 text.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or is not valid UTF-8
    pub fn text(&self) -> Result<String, EnrichmentError> {
        Ok(String::from_utf8(self.content()?)?)
    }

    /// Read and parse the whole file as JSON.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or parsed
    pub fn json(&self) -> Result<serde_json::Value, EnrichmentError> {
        Ok(serde_json::from_slice(&self.content()?)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_file_name() {
        let artifact = Artifact::new("tmp/sysfs/fio_output_1.json", "/x/fio_output_1.json");
        assert_eq!(artifact.file_name(), "fio_output_1.json");

        let artifact = Artifact::new("kconfig", "/x/kconfig");
        assert_eq!(artifact.file_name(), "kconfig");
    }

    #[test]
    fn test_artifact_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.json");
        fs::write(&path, br#"{"k": 1}"#).unwrap();

        let artifact = Artifact::new("a.json", &path);
        assert_eq!(artifact.json().unwrap()["k"], 1);
        assert_eq!(artifact.text().unwrap(), r#"{"k": 1}"#);
    }

    #[test]
    fn test_artifact_missing_file_is_io_error() {
        let artifact = Artifact::new("gone", "/nonexistent/falba/gone");
        assert!(matches!(artifact.content(), Err(EnrichmentError::Io(_))));
    }
}
