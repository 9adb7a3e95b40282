//! チェックポイントストア
//!
//! ステップが成功するたびに、合成済みの [`WorkflowState`] をスレッドIDと
//! 単調増加するシーケンス番号付きで保存します。保存済みのチェックポイントは
//! 変更されず、スレッドごとの追記のみの履歴になります。
//!
//! # モジュール構成
//!
//! - `memory` - プロセス内のみで保持するストア（テスト・単発実行向け）
//! - `file` - スレッドごとのディレクトリに JSON で保存する永続ストア
//!
//! # 使用例
//!
//! ```rust,no_run
//! use essay_writer::checkpoint::{Checkpoint, CheckpointStore, MemoryCheckpointStore};
//! use essay_writer::engine::WorkflowState;
//!
//! # async fn example() -> Result<(), essay_writer::error::CheckpointError> {
//! let store = MemoryCheckpointStore::new();
//! store.put(Checkpoint::initial("thread-1", WorkflowState::new("topic", 2))).await?;
//!
//! if let Some(latest) = store.get_latest("thread-1").await? {
//!     println!("sequence {} next {:?}", latest.sequence, latest.next);
//! }
//! # Ok(())
//! # }
//! ```

mod file;
mod memory;

pub use file::FileCheckpointStore;
pub use memory::MemoryCheckpointStore;

use std::sync::Arc;
use std::time::SystemTime;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::{CheckpointBackend, CheckpointSettings};
use crate::engine::{StepName, WorkflowState};
use crate::error::CheckpointError;

/// ある時点のワークフロー状態のスナップショット
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// スレッド（実行）ID
    pub thread_id: String,

    /// スレッド内のシーケンス番号（入力時点が 0）
    pub sequence: u64,

    /// 合成済みの状態
    pub state: WorkflowState,

    /// このチェックポイントを作ったステップ（入力時点は `None`）
    pub step: Option<StepName>,

    /// 次に実行するステップ（`None` は終了済み）
    pub next: Option<StepName>,

    /// 作成時刻
    pub created_at: SystemTime,
}

impl Checkpoint {
    pub fn new(
        thread_id: impl Into<String>,
        sequence: u64,
        state: WorkflowState,
        step: StepName,
        next: Option<StepName>,
    ) -> Self {
        Self {
            thread_id: thread_id.into(),
            sequence,
            state,
            step: Some(step),
            next,
            created_at: SystemTime::now(),
        }
    }

    /// 実行開始時の入力チェックポイント（シーケンス 0、次は plan）
    pub fn initial(thread_id: impl Into<String>, state: WorkflowState) -> Self {
        Self {
            thread_id: thread_id.into(),
            sequence: 0,
            state,
            step: None,
            next: Some(StepName::Plan),
            created_at: SystemTime::now(),
        }
    }

    /// ワークフローが終了済みかどうか
    pub fn is_done(&self) -> bool {
        self.next.is_none()
    }
}

/// チェックポイントの保存先
///
/// 実装はスレッドIDごとに独立した追記のみの履歴を保持します。
/// `put` が返った時点で `get_latest` から読み出せることを保証します。
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// チェックポイントを追記する
    ///
    /// # エラー
    ///
    /// - [`CheckpointError::InvalidThreadId`] - スレッドIDが不正
    /// - [`CheckpointError::SequenceConflict`] - 既存の最新以下のシーケンス
    async fn put(&self, checkpoint: Checkpoint) -> Result<(), CheckpointError>;

    /// 最新のチェックポイントを取得する（履歴がなければ `None`）
    async fn get_latest(&self, thread_id: &str) -> Result<Option<Checkpoint>, CheckpointError>;

    /// シーケンス番号を指定して取得する
    async fn get(&self, thread_id: &str, sequence: u64)
    -> Result<Option<Checkpoint>, CheckpointError>;

    /// スレッドのシーケンス番号一覧（昇順）
    async fn list(&self, thread_id: &str) -> Result<Vec<u64>, CheckpointError>;

    /// スレッドの履歴をすべて削除する
    async fn delete_thread(&self, thread_id: &str) -> Result<(), CheckpointError>;
}

/// スレッドIDをストアのキーとして検証する
///
/// 英数字と `-` `_` `.` のみを許可し、`.` `..` は拒否します。
pub fn validate_thread_id(thread_id: &str) -> Result<(), CheckpointError> {
    let valid = !thread_id.is_empty()
        && thread_id != "."
        && thread_id != ".."
        && thread_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));

    if valid {
        Ok(())
    } else {
        Err(CheckpointError::InvalidThreadId(thread_id.to_string()))
    }
}

/// 設定に応じたストアを生成する
pub fn create_checkpoint_store(settings: &CheckpointSettings) -> Arc<dyn CheckpointStore> {
    match settings.backend {
        CheckpointBackend::Memory => Arc::new(MemoryCheckpointStore::new()),
        CheckpointBackend::File => Arc::new(FileCheckpointStore::new(settings.path.clone())),
    }
}
