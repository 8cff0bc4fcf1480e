//! Importing artifacts into a result store
//!
//! A result's ID is derived from the content of its artifacts, so importing
//! the same files twice under one test name is detected and refused.
//!
//! Identity: SHA-256 of each file, then SHA-256 over the concatenated raw
//! per-file digests taken in artifact-key order; the ID is the first
//! [`RESULT_ID_LEN`] hex characters. Key order makes the ID independent of
//! the order inputs are given in and of filesystem enumeration order.
//!
//! Import copies and is not transactional: a failure part-way through leaves
//! a partial result directory, which must be deleted before retrying.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use walkdir::WalkDir;

use crate::builder::{relative_key, ARTIFACTS_DIR};
use crate::{Error, Result};

/// Number of hex characters of the content digest used as the result ID.
pub const RESULT_ID_LEN: usize = 12;

/// A result directory created by [`import_result`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedResult {
    /// Test name
    pub test_name: String,
    /// Content-derived result ID
    pub result_id: String,
    /// Path of the new result directory
    pub path: PathBuf,
    /// Number of artifacts copied
    pub artifact_count: usize,
}

impl ImportedResult {
    /// Directory name (`test_name:result_id`).
    #[must_use]
    pub fn dirname(&self) -> String {
        format!("{}:{}", self.test_name, self.result_id)
    }
}

/// Import files and directories as a new result of `test_name`.
///
/// A file input lands at `artifacts/<file name>`; a directory input
/// contributes every file beneath it at `artifacts/<path relative to it>`.
///
/// # Errors
///
/// Returns error if:
/// - `test_name` is empty or contains `/` ([`Error::InvalidInput`])
/// - no input files are given, an input does not exist, or two inputs map to
///   the same artifact path ([`Error::InvalidInput`])
/// - a result with the same content already exists ([`Error::DuplicateResult`])
/// - reading or copying fails ([`Error::Io`])
pub fn import_result<P: AsRef<Path>>(
    store_root: &Path,
    test_name: &str,
    paths: &[P],
) -> Result<ImportedResult> {
    if test_name.is_empty() || test_name.contains('/') {
        return Err(Error::InvalidInput(format!(
            "test name {test_name:?} must be non-empty and must not contain '/'"
        )));
    }
    if paths.is_empty() {
        return Err(Error::InvalidInput("no artifacts to import".to_string()));
    }

    let sources = collect_sources(paths)?;
    if sources.is_empty() {
        return Err(Error::InvalidInput(
            "inputs contain no files to import".to_string(),
        ));
    }

    let result_id = content_id(&sources)?;
    let dirname = format!("{test_name}:{result_id}");
    let result_dir = store_root.join(&dirname);

    fs::create_dir_all(store_root)?;
    // Non-recursive create: an existing result directory is never written into
    match fs::create_dir(&result_dir) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            return Err(Error::DuplicateResult(dirname));
        }
        Err(e) => return Err(e.into()),
    }

    let artifacts_dir = result_dir.join(ARTIFACTS_DIR);
    fs::create_dir(&artifacts_dir)?;
    for (key, source) in &sources {
        let dest = artifacts_dir.join(key);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(source, &dest)?;
    }

    tracing::info!(
        result = %dirname,
        artifacts = sources.len(),
        "imported result"
    );

    Ok(ImportedResult {
        test_name: test_name.to_string(),
        result_id,
        path: result_dir,
        artifact_count: sources.len(),
    })
}

/// Map every input file to its artifact key.
fn collect_sources<P: AsRef<Path>>(paths: &[P]) -> Result<BTreeMap<String, PathBuf>> {
    let mut sources: BTreeMap<String, PathBuf> = BTreeMap::new();
    let mut insert = |key: String, path: PathBuf| -> Result<()> {
        if let Some(existing) = sources.get(&key) {
            return Err(Error::InvalidInput(format!(
                "{} and {} both map to artifact {key}",
                existing.display(),
                path.display()
            )));
        }
        sources.insert(key, path);
        Ok(())
    };

    for input in paths {
        let input = input.as_ref();
        if input.is_dir() {
            for entry in WalkDir::new(input).sort_by_file_name() {
                let entry = entry.map_err(io::Error::from)?;
                if entry.path().is_dir() {
                    continue;
                }
                insert(relative_key(input, entry.path()), entry.path().to_path_buf())?;
            }
        } else if input.is_file() {
            let key = input
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .ok_or_else(|| {
                    Error::InvalidInput(format!("{} has no file name", input.display()))
                })?;
            insert(key, input.to_path_buf())?;
        } else {
            return Err(Error::InvalidInput(format!(
                "{} does not exist",
                input.display()
            )));
        }
    }
    Ok(sources)
}

/// Content identity of a set of artifact files, in key order.
fn content_id(sources: &BTreeMap<String, PathBuf>) -> Result<String> {
    let mut outer = Sha256::new();
    for path in sources.values() {
        let mut file = File::open(path)?;
        let mut inner = Sha256::new();
        io::copy(&mut file, &mut inner)?;
        outer.update(inner.finalize());
    }
    let mut id = hex::encode(outer.finalize());
    id.truncate(RESULT_ID_LEN);
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(path: &Path, body: &str) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, body).unwrap();
    }

    #[test]
    fn test_import_file_and_directory() {
        let src = tempfile::tempdir().unwrap();
        let store = tempfile::tempdir().unwrap();
        write(&src.path().join("kconfig"), "CONFIG_HZ=1000\n");
        write(&src.path().join("run/tmp/fio_output_1.json"), "{}");

        let imported = import_result(
            store.path(),
            "fio",
            &[src.path().join("kconfig"), src.path().join("run")],
        )
        .unwrap();

        assert_eq!(imported.result_id.len(), RESULT_ID_LEN);
        assert_eq!(imported.artifact_count, 2);
        let artifacts = imported.path.join(ARTIFACTS_DIR);
        assert!(artifacts.join("kconfig").is_file());
        assert!(artifacts.join("tmp/fio_output_1.json").is_file());
        // copies, never moves
        assert!(src.path().join("kconfig").is_file());
    }

    #[test]
    fn test_identity_is_input_order_independent() {
        let src = tempfile::tempdir().unwrap();
        write(&src.path().join("a"), "alpha");
        write(&src.path().join("b"), "beta");
        let forward = collect_sources(&[src.path().join("a"), src.path().join("b")]).unwrap();
        let reverse = collect_sources(&[src.path().join("b"), src.path().join("a")]).unwrap();
        assert_eq!(content_id(&forward).unwrap(), content_id(&reverse).unwrap());
    }

    #[test]
    fn test_identity_depends_on_content() {
        let one = tempfile::tempdir().unwrap();
        let two = tempfile::tempdir().unwrap();
        write(&one.path().join("out"), "1");
        write(&two.path().join("out"), "2");
        let a = collect_sources(&[one.path().join("out")]).unwrap();
        let b = collect_sources(&[two.path().join("out")]).unwrap();
        assert_ne!(content_id(&a).unwrap(), content_id(&b).unwrap());
    }

    #[test]
    fn test_conflicting_keys_rejected() {
        let one = tempfile::tempdir().unwrap();
        let two = tempfile::tempdir().unwrap();
        write(&one.path().join("out"), "1");
        write(&two.path().join("out"), "2");
        let err = collect_sources(&[one.path().join("out"), two.path().join("out")]).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_invalid_inputs() {
        let store = tempfile::tempdir().unwrap();
        let none: &[PathBuf] = &[];
        assert!(matches!(
            import_result(store.path(), "t", none),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            import_result(store.path(), "a/b", &[store.path()]),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            import_result(store.path(), "t", &[store.path().join("missing")]),
            Err(Error::InvalidInput(_))
        ));
    }
}
