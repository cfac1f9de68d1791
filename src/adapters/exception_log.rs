use crate::core::ExceptionLog;
use crate::domain::model::ExceptionRecord;
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Appends one JSON object per line. Write failures are reported through
/// tracing and never reach the caller.
#[derive(Debug)]
pub struct FileExceptionLog {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileExceptionLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    async fn append(&self, record: &ExceptionRecord) -> crate::utils::error::Result<()> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        let _guard = self.lock.lock().await;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(&line).await?;
        file.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl ExceptionLog for FileExceptionLog {
    async fn log_exception(&self, record: ExceptionRecord) {
        tracing::error!(
            context = %record.context,
            sources = ?record.sources,
            "Exception: {}",
            record.message
        );
        if let Err(e) = self.append(&record).await {
            tracing::warn!(
                "⚠️ Could not write exception log {}: {}",
                self.path.display(),
                e
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::GroupTextError;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_file_log_appends_json_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logs").join("exceptions.jsonl");
        let log = FileExceptionLog::new(&path);

        let err = GroupTextError::StorageError {
            message: "write failed".to_string(),
        };
        log.log_exception(ExceptionRecord::from_error("first", &err))
            .await;
        log.log_exception(ExceptionRecord::from_error("second", &err))
            .await;

        let content = std::fs::read_to_string(&path).unwrap();
        let records: Vec<ExceptionRecord> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].context, "first");
        assert!(records[1].message.contains("write failed"));
    }
}
