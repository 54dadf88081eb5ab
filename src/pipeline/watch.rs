use std::{
    path::{Path, PathBuf},
    time::SystemTime,
};

use tokio::fs;

use super::PipelineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileStamp {
    modified: Option<SystemTime>,
    len: u64,
}

/// Polls a log file's modification time between ticks.
#[derive(Debug)]
pub struct LogWatcher {
    path: PathBuf,
    last_seen: Option<FileStamp>,
}

impl LogWatcher {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            last_seen: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reports whether the file changed since the previous successful poll.
    /// The first poll after construction or [`invalidate`](Self::invalidate)
    /// always reports a change.
    pub async fn poll(&mut self) -> Result<bool, PipelineError> {
        let metadata = fs::metadata(&self.path)
            .await
            .map_err(|source| PipelineError::Metadata {
                path: self.path.clone(),
                source,
            })?;

        let stamp = FileStamp {
            modified: metadata.modified().ok(),
            len: metadata.len(),
        };

        let changed = self.last_seen != Some(stamp);
        self.last_seen = Some(stamp);
        Ok(changed)
    }

    pub fn invalidate(&mut self) {
        self.last_seen = None;
    }
}
