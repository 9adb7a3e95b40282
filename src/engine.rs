//! ワークフロー実行エンジン
//!
//! # 責務
//!
//! - 状態 [`WorkflowState`] と部分更新の合成規則
//! - ドラフト生成後の継続判定（ドラフト数と上限の比較）
//! - ステップ間の遷移グラフ
//! - 各ステップの実行（外部サービスの呼び出し）
//! - スレッド単位の駆動とチェックポイントの書き込み
//! - テレメトリー収集のためのデータ記録
//!
//! # モジュール構成
//!
//! - [`context`][]: スレッド実行コンテキスト
//! - [`executor`][]: ワークフロー実行エンジン本体
//! - [`graph`][]: ステップ名と遷移グラフ
//! - [`policy`][]: 継続判定
//! - [`prompts`][]: 各ステップのシステムプロンプト
//! - [`result`][]: 実行結果型とエラー型
//! - [`state`][]: ワークフロー状態と合成規則
//! - [`steps`][]: ステップ関数
//!
//! # 使用例
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use essay_writer::checkpoint::MemoryCheckpointStore;
//! use essay_writer::config::{AgentConfig, Secrets};
//! use essay_writer::engine::WorkflowExecutor;
//! use essay_writer::provider::create_provider;
//! use essay_writer::search::create_search_client;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AgentConfig::default();
//!     let secrets = Secrets::load(config.secrets().resolved_path());
//!
//!     let executor = WorkflowExecutor::new(
//!         create_provider(config.model(), &secrets),
//!         create_search_client(config.search(), &secrets),
//!         Arc::new(MemoryCheckpointStore::new()),
//!     );
//!
//!     let result = executor.run("1", "The history of tide prediction", 2).await?;
//!
//!     println!("Drafts: {}", result.final_state.revision_number);
//!     println!("Total tokens: {}", result.total_tokens_used);
//!     for step in &result.steps {
//!         println!("  #{} {} -> {:?}", step.sequence, step.step, step.next);
//!     }
//!     Ok(())
//! }
//! ```

pub mod context;
pub mod executor;
pub mod graph;
pub mod policy;
pub mod prompts;
pub mod result;
pub mod state;
pub mod steps;

// 公開APIの再エクスポート
pub use context::ExecutionContext;
pub use executor::WorkflowExecutor;
pub use graph::{Next, StepName, WorkflowGraph};
pub use policy::{Continuation, decide};
pub use result::{ExecutionError, ExecutionStatus, StepResult, WorkflowResult};
pub use state::{StateUpdate, WorkflowState, append_content};
pub use steps::{StepOutcome, StepRunner};
