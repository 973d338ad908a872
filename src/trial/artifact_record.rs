//! Artifact Record - content-addressed trained pipeline of a trial

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A trained pipeline persisted for a trial.
///
/// There is at most one artifact per trial hash. `cas_hash` is
/// `algorithm:hex_digest` over the stored bytes, e.g.
/// `sha256:e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArtifactRecord {
    trial_hash: String,
    key: String,
    cas_hash: String,
    size_bytes: u64,
    created_at: DateTime<Utc>,
}

impl ArtifactRecord {
    /// Create an artifact record stamped with the current time.
    ///
    /// # Arguments
    ///
    /// * `trial_hash` - Hash of the owning trial
    /// * `key` - File name inside the trial folder (e.g. "pipeline.json")
    /// * `cas_hash` - Content hash of the stored bytes
    /// * `size_bytes` - Size of the stored bytes
    #[must_use]
    pub fn new(
        trial_hash: impl Into<String>,
        key: impl Into<String>,
        cas_hash: impl Into<String>,
        size_bytes: u64,
    ) -> Self {
        Self {
            trial_hash: trial_hash.into(),
            key: key.into(),
            cas_hash: cas_hash.into(),
            size_bytes,
            created_at: Utc::now(),
        }
    }

    /// Owning trial hash.
    #[must_use]
    pub fn trial_hash(&self) -> &str {
        &self.trial_hash
    }

    /// File name.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Content-addressable hash.
    #[must_use]
    pub fn cas_hash(&self) -> &str {
        &self.cas_hash
    }

    /// Stored size in bytes.
    #[must_use]
    pub const fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    /// Creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_record_new() {
        let artifact = ArtifactRecord::new("abc", "pipeline.json", "sha256:00ff", 12);
        assert_eq!(artifact.trial_hash(), "abc");
        assert_eq!(artifact.key(), "pipeline.json");
        assert!(artifact.cas_hash().starts_with("sha256:"));
        assert_eq!(artifact.size_bytes(), 12);
    }
}
