//! ファイルベースのチェックポイントストア
//!
//! # ディレクトリ構成
//!
//! ```text
//! {root}/
//! └── {thread_id}/
//!     ├── checkpoint_00000.json
//!     ├── checkpoint_00001.json
//!     └── checkpoint_00002.json
//! ```
//!
//! 書き込みは一時ファイルに書いて `sync_all` した後に rename するため、
//! 読み出し側から書きかけのファイルが見えることはありません。
//! rename の後はスレッドのディレクトリも `sync_all` し、電源断でも名前の変更が残るようにします。

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;

use super::{Checkpoint, CheckpointStore, validate_thread_id};
use crate::error::CheckpointError;

const FILE_PREFIX: &str = "checkpoint_";
const FILE_EXTENSION: &str = "json";

#[derive(Debug)]
pub struct FileCheckpointStore {
    root: PathBuf,
    // シーケンス検査と書き込みをまとめて直列化する
    write_lock: Mutex<()>,
}

impl FileCheckpointStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            write_lock: Mutex::new(()),
        }
    }

    fn thread_dir(&self, thread_id: &str) -> PathBuf {
        self.root.join(thread_id)
    }

    fn checkpoint_path(&self, thread_id: &str, sequence: u64) -> PathBuf {
        self.thread_dir(thread_id)
            .join(format!("{FILE_PREFIX}{sequence:05}.{FILE_EXTENSION}"))
    }

    fn temp_path(&self, thread_id: &str, sequence: u64) -> PathBuf {
        self.thread_dir(thread_id)
            .join(format!("{FILE_PREFIX}{sequence:05}.tmp"))
    }

    /// ファイル名からシーケンス番号を取り出す（一時ファイルは対象外）
    fn parse_sequence(path: &Path) -> Option<u64> {
        let filename = path.file_name()?.to_str()?;
        let stem = filename
            .strip_prefix(FILE_PREFIX)?
            .strip_suffix(FILE_EXTENSION)?
            .strip_suffix('.')?;
        stem.parse().ok()
    }

    async fn sequences(&self, thread_id: &str) -> Result<Vec<u64>, CheckpointError> {
        let dir = self.thread_dir(thread_id);
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut sequences = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if let Some(sequence) = Self::parse_sequence(&entry.path()) {
                sequences.push(sequence);
            }
        }

        sequences.sort_unstable();
        Ok(sequences)
    }

    async fn read(&self, path: &Path) -> Result<Option<Checkpoint>, CheckpointError> {
        match fs::read(path).await {
            Ok(data) => Ok(Some(serde_json::from_slice(&data)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// ディレクトリエントリの変更（rename）をディスクに反映する
#[cfg(unix)]
async fn sync_dir(dir: &Path) -> Result<(), CheckpointError> {
    fs::File::open(dir).await?.sync_all().await?;
    Ok(())
}

// Windows ではディレクトリを開いて同期できない
#[cfg(not(unix))]
async fn sync_dir(_dir: &Path) -> Result<(), CheckpointError> {
    Ok(())
}

#[async_trait]
impl CheckpointStore for FileCheckpointStore {
    async fn put(&self, checkpoint: Checkpoint) -> Result<(), CheckpointError> {
        validate_thread_id(&checkpoint.thread_id)?;
        let thread_id = checkpoint.thread_id.as_str();

        let _guard = self.write_lock.lock().await;

        if let Some(&latest) = self.sequences(thread_id).await?.last() {
            if checkpoint.sequence <= latest {
                return Err(CheckpointError::SequenceConflict {
                    thread_id: checkpoint.thread_id.clone(),
                    sequence: checkpoint.sequence,
                    latest,
                });
            }
        }

        fs::create_dir_all(self.thread_dir(thread_id)).await?;

        let json = serde_json::to_vec_pretty(&checkpoint)?;
        let temp_path = self.temp_path(thread_id, checkpoint.sequence);
        let final_path = self.checkpoint_path(thread_id, checkpoint.sequence);

        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(&json).await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&temp_path, &final_path).await?;
        sync_dir(&self.thread_dir(thread_id)).await?;

        debug!(
            thread_id,
            sequence = checkpoint.sequence,
            path = %final_path.display(),
            "チェックポイントを保存"
        );
        Ok(())
    }

    async fn get_latest(&self, thread_id: &str) -> Result<Option<Checkpoint>, CheckpointError> {
        validate_thread_id(thread_id)?;
        match self.sequences(thread_id).await?.last() {
            Some(&sequence) => self.read(&self.checkpoint_path(thread_id, sequence)).await,
            None => Ok(None),
        }
    }

    async fn get(
        &self,
        thread_id: &str,
        sequence: u64,
    ) -> Result<Option<Checkpoint>, CheckpointError> {
        validate_thread_id(thread_id)?;
        self.read(&self.checkpoint_path(thread_id, sequence)).await
    }

    async fn list(&self, thread_id: &str) -> Result<Vec<u64>, CheckpointError> {
        validate_thread_id(thread_id)?;
        self.sequences(thread_id).await
    }

    async fn delete_thread(&self, thread_id: &str) -> Result<(), CheckpointError> {
        validate_thread_id(thread_id)?;
        let _guard = self.write_lock.lock().await;
        match fs::remove_dir_all(self.thread_dir(thread_id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
