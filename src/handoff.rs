//! Cross-phase handoff record.
//!
//! Phase A leaves a small JSON record in the git directory when the index
//! should be committed on its own; phase B consumes and deletes it. Anything
//! that cannot be read back (missing, malformed, or from a newer schema) is
//! treated as "nothing pending".
use anyhow::{anyhow, Context, Result};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

pub const HANDOFF_SCHEMA_VERSION: u32 = 1;

fn default_schema_version() -> u32 {
    HANDOFF_SCHEMA_VERSION
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandoffMetadata {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    /// ISO-8601 UTC time phase A finished merging.
    pub timestamp: String,
    pub commit_message: String,
    pub has_artifacts: bool,
}

impl HandoffMetadata {
    pub fn new(commit_message: String, has_artifacts: bool) -> Self {
        Self::at(now_timestamp(), commit_message, has_artifacts)
    }

    pub fn at(timestamp: String, commit_message: String, has_artifacts: bool) -> Self {
        Self {
            schema_version: HANDOFF_SCHEMA_VERSION,
            timestamp,
            commit_message,
            has_artifacts,
        }
    }
}

/// Second-precision UTC timestamp, e.g. `2024-05-01T10:00:00Z`.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Location of the handoff record and the operations on it.
#[derive(Debug, Clone)]
pub struct HandoffStore {
    path: PathBuf,
}

impl HandoffStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace any existing record with `metadata`.
    pub fn write(&self, metadata: &HandoffMetadata) -> Result<()> {
        let parent = self
            .path
            .parent()
            .ok_or_else(|| anyhow!("handoff path has no parent: {}", self.path.display()))?;
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
        let mut bytes = serde_json::to_vec_pretty(metadata).context("serialize handoff")?;
        bytes.push(b'\n');
        let mut tmp = NamedTempFile::new_in(parent)
            .with_context(|| format!("create temp file in {}", parent.display()))?;
        tmp.write_all(&bytes).context("write handoff temp file")?;
        tmp.as_file().sync_all().context("sync handoff temp file")?;
        tmp.persist(&self.path)
            .map_err(|err| err.error)
            .with_context(|| format!("persist {}", self.path.display()))?;
        Ok(())
    }

    pub fn load(&self) -> Option<HandoffMetadata> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return None,
            Err(err) => {
                tracing::warn!(path = %self.path.display(), error = %err, "unreadable handoff");
                return None;
            }
        };
        let metadata: HandoffMetadata = match serde_json::from_slice(&bytes) {
            Ok(metadata) => metadata,
            Err(err) => {
                tracing::warn!(path = %self.path.display(), error = %err, "malformed handoff");
                return None;
            }
        };
        if metadata.schema_version != HANDOFF_SCHEMA_VERSION {
            tracing::warn!(
                path = %self.path.display(),
                schema_version = metadata.schema_version,
                "unsupported handoff schema version"
            );
            return None;
        }
        Some(metadata)
    }

    /// Remove the record if present. Returns whether a file was removed.
    pub fn delete(&self) -> bool {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::debug!(path = %self.path.display(), "handoff removed");
                true
            }
            Err(err) if err.kind() == ErrorKind::NotFound => false,
            Err(err) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %err,
                    "failed to remove handoff"
                );
                false
            }
        }
    }
}
