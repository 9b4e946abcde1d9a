//! Best-effort record of every comment read and every notable event.
//!
//! A failed write is reported to the caller as a [`LogError`] and must never
//! stop ingestion.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::info;

/// Prefix of event lines in the comment log file.
pub const EVENT_PREFIX: &str = "[EVENT] ";

#[derive(Debug, Error)]
pub enum LogError {
    #[error("failed to write comment log: {0}")]
    Io(#[from] std::io::Error),
}

#[async_trait]
pub trait CommentLog: Send + Sync {
    async fn log_comment(&self, comment: &str) -> Result<(), LogError>;

    async fn log_event(&self, event: &str) -> Result<(), LogError>;
}

/// Appends comments and events to a plain text file, one per line.
pub struct FileCommentLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl FileCommentLog {
    /// Create (or truncate) the log file at `path`.
    pub async fn create(path: impl AsRef<Path>) -> Result<Self, LogError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)
            .await?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn write_line(&self, line: &str) -> Result<(), LogError> {
        let mut file = self.file.lock().await;
        file.write_all(line.as_bytes()).await?;
        file.write_all(b"\n").await?;
        file.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl CommentLog for FileCommentLog {
    async fn log_comment(&self, comment: &str) -> Result<(), LogError> {
        self.write_line(comment).await
    }

    async fn log_event(&self, event: &str) -> Result<(), LogError> {
        self.write_line(&format!("{EVENT_PREFIX}{event}")).await
    }
}

/// Echoes comments to the tracing output instead of a file.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleCommentLog;

#[async_trait]
impl CommentLog for ConsoleCommentLog {
    async fn log_comment(&self, comment: &str) -> Result<(), LogError> {
        info!(target: "ycp::comments", comment, "Comment");
        Ok(())
    }

    async fn log_event(&self, event: &str) -> Result<(), LogError> {
        info!(target: "ycp::comments", event, "Event");
        Ok(())
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullCommentLog;

#[async_trait]
impl CommentLog for NullCommentLog {
    async fn log_comment(&self, _comment: &str) -> Result<(), LogError> {
        Ok(())
    }

    async fn log_event(&self, _event: &str) -> Result<(), LogError> {
        Ok(())
    }
}
