//! Pipeline artifacts on disk
//!
//! Layout: `<cache_folder>/<trial_hash>/pipeline.json`. The file holds the
//! serialized [`PipelineState`](crate::pipeline::PipelineState), so a trained
//! pipeline can be reloaded from the folder alone.

use std::fs;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::pipeline::{Pipeline, PipelineState};
use crate::trial::ArtifactRecord;
use crate::{Error, Result};

/// File name of a trial's pipeline artifact.
pub const PIPELINE_FILE: &str = "pipeline.json";

const TEMP_SUFFIX: &str = ".tmp";

/// Folder holding one trial's files.
///
/// # Errors
/// Returns `InvalidInput` if `trial_hash` is empty or contains anything but
/// ASCII alphanumerics, `-` and `_`.
pub fn trial_folder(cache_folder: &Path, trial_hash: &str) -> Result<PathBuf> {
    let valid = !trial_hash.is_empty()
        && trial_hash
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !valid {
        return Err(Error::InvalidInput(format!(
            "trial hash {trial_hash:?} is not a valid folder name"
        )));
    }
    Ok(cache_folder.join(trial_hash))
}

/// Serialize `pipeline` under `trial_hash`, replacing any previous artifact.
///
/// Bytes are written to a temporary file and renamed into place.
///
/// # Errors
/// Returns `StorageError` on filesystem failures and `Serialization` if the
/// pipeline state cannot be encoded.
pub fn save_pipeline(cache_folder: &Path, trial_hash: &str, pipeline: &Pipeline) -> Result<ArtifactRecord> {
    let folder = trial_folder(cache_folder, trial_hash)?;
    fs::create_dir_all(&folder)
        .map_err(|e| Error::StorageError(format!("create {}: {e}", folder.display())))?;

    let bytes = serde_json::to_vec_pretty(&pipeline.state())?;
    let path = folder.join(PIPELINE_FILE);
    let temp = folder.join(format!("{PIPELINE_FILE}{TEMP_SUFFIX}"));
    fs::write(&temp, &bytes).map_err(|e| Error::StorageError(format!("write {}: {e}", temp.display())))?;
    fs::rename(&temp, &path).map_err(|e| {
        Error::StorageError(format!("rename {} -> {}: {e}", temp.display(), path.display()))
    })?;

    let cas_hash = format!("sha256:{:x}", Sha256::digest(&bytes));
    debug!(trial_hash, path = %path.display(), size = bytes.len(), "pipeline artifact written");
    Ok(ArtifactRecord::new(
        trial_hash,
        PIPELINE_FILE,
        cas_hash,
        bytes.len() as u64,
    ))
}

/// Reload the pipeline saved under `trial_hash`.
///
/// # Errors
/// Returns `TrialNotFound` if no artifact exists, `StorageError` if it cannot
/// be read, and `Serialization` if it does not decode.
pub fn load_pipeline(cache_folder: &Path, trial_hash: &str) -> Result<Pipeline> {
    let path = trial_folder(cache_folder, trial_hash)?.join(PIPELINE_FILE);
    if !path.is_file() {
        return Err(Error::TrialNotFound(trial_hash.to_string()));
    }
    let bytes = fs::read(&path).map_err(|e| Error::StorageError(format!("read {}: {e}", path.display())))?;
    let state: PipelineState = serde_json::from_slice(&bytes)?;
    Pipeline::from_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::MultiplyByN;

    fn pipeline(factor: i64) -> Pipeline {
        Pipeline::new(vec![Box::new(MultiplyByN::new(factor))]).unwrap()
    }

    #[test]
    fn test_trial_folder_rejects_paths() {
        let root = Path::new("/cache");
        assert!(trial_folder(root, "abc123").is_ok());
        assert!(trial_folder(root, "").is_err());
        assert!(trial_folder(root, "../escape").is_err());
        assert!(trial_folder(root, "a/b").is_err());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let record = save_pipeline(dir.path(), "abc", &pipeline(3)).unwrap();

        assert_eq!(record.key(), PIPELINE_FILE);
        assert!(record.cas_hash().starts_with("sha256:"));
        assert_eq!(record.cas_hash().len(), "sha256:".len() + 64);
        assert!(dir.path().join("abc").join(PIPELINE_FILE).is_file());
        assert!(!dir.path().join("abc").join("pipeline.json.tmp").exists());

        let loaded = load_pipeline(dir.path(), "abc").unwrap();
        assert_eq!(loaded.state(), pipeline(3).state());
    }

    #[test]
    fn test_resave_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let first = save_pipeline(dir.path(), "abc", &pipeline(2)).unwrap();
        let second = save_pipeline(dir.path(), "abc", &pipeline(5)).unwrap();
        assert_ne!(first.cas_hash(), second.cas_hash());

        let loaded = load_pipeline(dir.path(), "abc").unwrap();
        assert_eq!(loaded.state(), pipeline(5).state());
    }

    #[test]
    fn test_missing_artifact_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_pipeline(dir.path(), "missing").unwrap_err();
        assert!(matches!(err, Error::TrialNotFound(hash) if hash == "missing"));
    }
}
