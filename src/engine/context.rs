//! スレッド実行コンテキストの管理
//!
//! # 責務
//!
//! - 1回の駆動（`run` / `resume`）で完了したステップの記録
//! - テレメトリー情報（トークン使用量、実行時間）の累積
//! - 駆動終了時の [`WorkflowResult`] の組み立て

use std::time::{Duration, SystemTime};

use super::result::{ExecutionStatus, StepResult, WorkflowResult};
use super::state::WorkflowState;

/// スレッド実行コンテキスト
///
/// 駆動ごとに1つ作られ、他のスレッドと共有されることはありません。
#[derive(Debug)]
pub struct ExecutionContext {
    thread_id: String,
    start_time: SystemTime,

    // ステップ実行履歴
    step_results: Vec<StepResult>,

    // テレメトリー情報
    total_tokens_used: u32,
}

impl ExecutionContext {
    pub fn new(thread_id: impl Into<String>) -> Self {
        Self {
            thread_id: thread_id.into(),
            start_time: SystemTime::now(),
            step_results: Vec::new(),
            total_tokens_used: 0,
        }
    }

    /// ステップ完了と結果を記録
    pub fn record_step_result(&mut self, result: StepResult) {
        self.total_tokens_used += result.token_usage.total();
        self.step_results.push(result);
    }

    /// この駆動で完了したステップ数
    pub fn steps_completed(&self) -> usize {
        self.step_results.len()
    }

    pub fn total_tokens(&self) -> u32 {
        self.total_tokens_used
    }

    /// 記録を締めて実行結果にする
    pub fn finish(
        self,
        status: ExecutionStatus,
        final_state: WorkflowState,
        last_sequence: u64,
    ) -> WorkflowResult {
        let end_time = SystemTime::now();
        let total_duration = end_time
            .duration_since(self.start_time)
            .unwrap_or(Duration::ZERO);

        WorkflowResult {
            thread_id: self.thread_id,
            status,
            final_state,
            steps: self.step_results,
            start_time: self.start_time,
            end_time,
            total_duration,
            total_tokens_used: self.total_tokens_used,
            last_sequence,
        }
    }
}
