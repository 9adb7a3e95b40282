//! インメモリのチェックポイントストア

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{Checkpoint, CheckpointStore, validate_thread_id};
use crate::error::CheckpointError;

/// プロセス内でのみ保持するストア
///
/// プロセス終了で履歴は失われます。
#[derive(Debug, Default)]
pub struct MemoryCheckpointStore {
    threads: RwLock<HashMap<String, Vec<Checkpoint>>>,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CheckpointStore for MemoryCheckpointStore {
    async fn put(&self, checkpoint: Checkpoint) -> Result<(), CheckpointError> {
        validate_thread_id(&checkpoint.thread_id)?;

        let mut threads = self.threads.write().await;
        let history = threads.entry(checkpoint.thread_id.clone()).or_default();

        if let Some(latest) = history.last().map(|c| c.sequence) {
            if checkpoint.sequence <= latest {
                return Err(CheckpointError::SequenceConflict {
                    thread_id: checkpoint.thread_id,
                    sequence: checkpoint.sequence,
                    latest,
                });
            }
        }

        history.push(checkpoint);
        Ok(())
    }

    async fn get_latest(&self, thread_id: &str) -> Result<Option<Checkpoint>, CheckpointError> {
        validate_thread_id(thread_id)?;
        let threads = self.threads.read().await;
        Ok(threads.get(thread_id).and_then(|history| history.last().cloned()))
    }

    async fn get(
        &self,
        thread_id: &str,
        sequence: u64,
    ) -> Result<Option<Checkpoint>, CheckpointError> {
        validate_thread_id(thread_id)?;
        let threads = self.threads.read().await;
        Ok(threads.get(thread_id).and_then(|history| {
            history
                .iter()
                .find(|checkpoint| checkpoint.sequence == sequence)
                .cloned()
        }))
    }

    async fn list(&self, thread_id: &str) -> Result<Vec<u64>, CheckpointError> {
        validate_thread_id(thread_id)?;
        let threads = self.threads.read().await;
        Ok(threads
            .get(thread_id)
            .map(|history| history.iter().map(|checkpoint| checkpoint.sequence).collect())
            .unwrap_or_default())
    }

    async fn delete_thread(&self, thread_id: &str) -> Result<(), CheckpointError> {
        validate_thread_id(thread_id)?;
        self.threads.write().await.remove(thread_id);
        Ok(())
    }
}
