//! ワークフロー実行結果の型定義
//!
//! # 主要な型
//!
//! - [`WorkflowResult`][]: 1回の駆動の結果（最終状態、各ステップの記録、トークン使用量等）
//! - [`StepResult`][]: 個別ステップの記録（書き込んだチェックポイントのシーケンス等）
//! - [`ExecutionStatus`][]: 駆動の終了理由
//! - [`ExecutionError`][]: ワークフロー実行時のエラー型
//!
//! 失敗した場合は [`WorkflowResult`] を返さず、[`ExecutionError`] を返します。
//! 途中までの状態は最後に書き込まれたチェックポイントから参照できます。
//!
//! # 使用例
//!
//! ```rust,no_run
//! use essay_writer::engine::result::WorkflowResult;
//!
//! fn handle_result(result: WorkflowResult) {
//!     println!("スレッド: {}", result.thread_id);
//!     println!("ドラフト数: {}", result.final_state.revision_number);
//!     println!("総トークン使用量: {}", result.total_tokens_used);
//!
//!     if let Ok(json) = result.to_json() {
//!         println!("JSON: {}", json);
//!     }
//! }
//! ```

use std::time::{Duration, SystemTime};

use serde::Serialize;
use thiserror::Error;

use super::graph::StepName;
use super::state::WorkflowState;
use crate::error::{CheckpointError, ConfigError, GraphError, ProviderError, SearchError};
use crate::provider::TokenUsage;

/// ワークフロー実行結果
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowResult {
    /// スレッドID
    pub thread_id: String,

    /// 終了理由
    pub status: ExecutionStatus,

    /// 終了時点の状態
    pub final_state: WorkflowState,

    /// この駆動で実行した各ステップの記録
    pub steps: Vec<StepResult>,

    /// 実行開始時刻
    pub start_time: SystemTime,

    /// 実行終了時刻
    pub end_time: SystemTime,

    /// 総実行時間
    pub total_duration: Duration,

    /// 総トークン使用量
    pub total_tokens_used: u32,

    /// 最後に書き込まれた（または読み込んだ）チェックポイントのシーケンス
    pub last_sequence: u64,
}

impl WorkflowResult {
    /// 結果をJSON形式でシリアライズ
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// DONE に到達しているかどうか
    pub fn is_success(&self) -> bool {
        matches!(
            self.status,
            ExecutionStatus::Completed | ExecutionStatus::AlreadyCompleted
        )
    }

    /// 最終ドラフト
    pub fn draft(&self) -> &str {
        &self.final_state.draft
    }

    /// この駆動で指定ステップを実行した回数
    pub fn count_step(&self, step: StepName) -> usize {
        self.steps.iter().filter(|result| result.step == step).count()
    }
}

/// ステップ実行記録
#[derive(Debug, Clone, Serialize)]
pub struct StepResult {
    /// ステップ名
    pub step: StepName,

    /// 書き込んだチェックポイントのシーケンス
    pub sequence: u64,

    /// 次に実行されるステップ（`None` は終了）
    pub next: Option<StepName>,

    /// トークン使用量
    pub token_usage: TokenUsage,

    /// 実行時間
    pub duration: Duration,

    /// 追記された調査メモ数
    pub content_added: usize,
}

/// 駆動の終了理由
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExecutionStatus {
    /// この駆動で DONE に到達した
    Completed,

    /// 駆動開始時点ですでに DONE だった（何も実行していない）
    AlreadyCompleted,
}

/// 実行エラー
///
/// # エラー種別
///
/// - 外部呼び出しの失敗: [`ProviderError`](ExecutionError::ProviderError),
///   [`SearchError`](ExecutionError::SearchError),
///   [`TimeoutError`](ExecutionError::TimeoutError)
/// - 構造化出力の不正: [`MalformedOutput`](ExecutionError::MalformedOutput)
/// - 永続化・グラフ・入力の不備: 上記以外
///
/// いずれの場合も失敗したステップの結果はチェックポイントに書き込まれません。
#[derive(Debug, Error)]
#[allow(clippy::enum_variant_names)]
pub enum ExecutionError {
    /// 設定エラー
    #[error("設定エラー: {0}")]
    ConfigError(#[from] ConfigError),

    /// プロバイダーエラー
    #[error("プロバイダーエラー: {0}")]
    ProviderError(#[from] ProviderError),

    /// 検索エラー
    #[error("検索エラー: {0}")]
    SearchError(#[from] SearchError),

    /// タイムアウト
    #[error("タイムアウト: ステップ '{step_name}' が {timeout_secs}秒以内に完了しませんでした")]
    TimeoutError {
        /// タイムアウトしたステップ名
        step_name: String,
        /// タイムアウト時間（秒）
        timeout_secs: u64,
    },

    /// 構造化出力がスキーマに合わない
    #[error("構造化出力エラー: ステップ '{step_name}' の出力が不正です: {reason}")]
    MalformedOutput {
        step_name: String,
        reason: String,
    },

    /// チェックポイントエラー
    #[error("チェックポイントエラー: {0}")]
    CheckpointError(#[from] CheckpointError),

    /// グラフエラー
    #[error("グラフエラー: {0}")]
    GraphError(#[from] GraphError),

    /// 1回の駆動で実行できるステップ数を超えた
    #[error("ステップ数の上限 {limit} に達しました")]
    StepLimitExceeded { limit: usize },

    /// 再開しようとしたスレッドが存在しない
    #[error("スレッド '{0}' のチェックポイントが見つかりません")]
    ThreadNotFound(String),

    /// 新規実行しようとしたスレッドにすでに履歴がある
    #[error("スレッド '{0}' はすでに存在します")]
    ThreadAlreadyExists(String),

    /// バリデーションエラー
    #[error("バリデーションエラー: {0}")]
    ValidationError(String),
}

impl ExecutionError {
    /// 外部サービス呼び出しの失敗かどうか
    pub fn is_external_call_failure(&self) -> bool {
        matches!(
            self,
            ExecutionError::ProviderError(_)
                | ExecutionError::SearchError(_)
                | ExecutionError::TimeoutError { .. }
        )
    }
}
