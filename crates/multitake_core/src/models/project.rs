//! Input description of one auto-cut run.

use std::collections::HashSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::RecordingId;

/// One take on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TakeSource {
    pub id: RecordingId,
    pub path: PathBuf,
}

impl TakeSource {
    /// Take identified by its file stem.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            id: RecordingId::from_path_stem(&path),
            path,
        }
    }
}

/// Reference track plus the takes to cut between.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectSpec {
    /// Run name used for log and output file names.
    pub name: String,
    /// Reference audio that defines the master timeline.
    pub reference: PathBuf,
    /// Takes in discovery order.
    pub takes: Vec<TakeSource>,
}

impl ProjectSpec {
    pub fn new(name: impl Into<String>, reference: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            reference: reference.into(),
            takes: Vec::new(),
        }
    }

    pub fn with_take(mut self, take: TakeSource) -> Self {
        self.takes.push(take);
        self
    }

    pub fn take_path(&self, id: &RecordingId) -> Option<&PathBuf> {
        self.takes.iter().find(|t| &t.id == id).map(|t| &t.path)
    }

    /// Check that there is at least one take and that ids are unique.
    pub fn validate(&self) -> Result<(), String> {
        if self.takes.is_empty() {
            return Err("no takes to cut between".to_string());
        }
        let mut seen = HashSet::new();
        for take in &self.takes {
            if !seen.insert(&take.id) {
                return Err(format!("duplicate take id '{}'", take.id));
            }
        }
        Ok(())
    }
}
