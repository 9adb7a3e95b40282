//! ワークフロー実行エンジン
//!
//! # 責務
//!
//! このモジュールは、スレッド単位でワークフローを駆動する [`WorkflowExecutor`] を提供します。
//! グラフに従ってステップを順次実行し、各ステップの部分更新を状態に合成して
//! チェックポイントに書き込んでから次のステップへ進みます。
//!
//! # 実行フロー
//!
//! 1. 入力チェックポイント（シーケンス 0、次はグラフのエントリー）を書き込む
//! 2. 次のステップを実行
//!    - 外部サービスを呼び出す（タイムアウト付き、リトライなし）
//!    - 部分更新を状態に合成する
//!    - グラフから遷移先を決める
//!    - チェックポイントを書き込む
//! 3. 遷移先が DONE になるまで 2 を繰り返す
//!
//! ステップが失敗した場合はその時点で停止し、チェックポイントは書き込みません。
//! 直前のチェックポイントから [`WorkflowExecutor::resume`] で再開できます。
//!
//! # 使用例
//!
//! ```rust,no_run
//! use essay_writer::config::{AgentConfig, Secrets};
//! use essay_writer::engine::WorkflowExecutor;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AgentConfig::from_file("configs/example.toml")?;
//!     let secrets = Secrets::load(config.secrets().resolved_path());
//!     let executor = WorkflowExecutor::from_config(&config, &secrets);
//!
//!     let result = executor.run("1", "The history of tide prediction", 2).await?;
//!     println!("{}", result.draft());
//!     Ok(())
//! }
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{error, info};

use super::context::ExecutionContext;
use super::graph::{StepName, WorkflowGraph};
use super::result::{ExecutionError, ExecutionStatus, StepResult, WorkflowResult};
use super::state::WorkflowState;
use super::steps::{StepOutcome, StepRunner};
use crate::checkpoint::{self, Checkpoint, CheckpointStore};
use crate::config::{AgentConfig, Secrets};
use crate::provider::{self, ProviderClient};
use crate::search::{self, SearchClient};

/// 1回の駆動で実行できるステップ数の既定値
pub const DEFAULT_STEP_LIMIT: usize = 25;

/// ワークフロー実行エンジン
///
/// 外部サービスとチェックポイントストアを保持します。`&self` で駆動するため、
/// `Arc` で共有して異なるスレッドIDを並行に実行できます。
pub struct WorkflowExecutor {
    graph: WorkflowGraph,
    steps: StepRunner,
    store: Arc<dyn CheckpointStore>,
    step_timeout: Option<Duration>,
    step_limit: usize,
}

impl WorkflowExecutor {
    /// 新しいエグゼキューターを生成
    pub fn new(
        provider: Arc<dyn ProviderClient>,
        search: Arc<dyn SearchClient>,
        store: Arc<dyn CheckpointStore>,
    ) -> Self {
        Self {
            graph: WorkflowGraph::essay(),
            steps: StepRunner::new(provider, search),
            store,
            step_timeout: None,
            step_limit: DEFAULT_STEP_LIMIT,
        }
    }

    /// 設定ファイルの内容から外部サービスとストアを組み立てる
    pub fn from_config(config: &AgentConfig, secrets: &Secrets) -> Self {
        let provider = provider::create_provider(config.model(), secrets);
        let search = search::create_search_client(config.search(), secrets);
        let store = checkpoint::create_checkpoint_store(config.checkpoint());

        let mut executor = Self::new(provider, search, store)
            .with_step_limit(config.run().step_limit)
            .with_research_limits(config.search().max_queries, config.search().max_results);

        if let Some(secs) = config.run().step_timeout_secs {
            executor = executor.with_step_timeout(Duration::from_secs(secs));
        }
        executor
    }

    /// 遷移グラフを差し替える（既定は [`WorkflowGraph::essay`]）
    pub fn with_graph(mut self, graph: WorkflowGraph) -> Self {
        self.graph = graph;
        self
    }

    /// ステップごとのタイムアウトを設定
    pub fn with_step_timeout(mut self, timeout: Duration) -> Self {
        self.step_timeout = Some(timeout);
        self
    }

    /// 1回の駆動で実行できるステップ数を設定
    pub fn with_step_limit(mut self, limit: usize) -> Self {
        self.step_limit = limit;
        self
    }

    /// 調査ステップのクエリ数上限と検索結果数を設定
    pub fn with_research_limits(mut self, max_queries: usize, max_results: u32) -> Self {
        self.steps = self.steps.with_research_limits(max_queries, max_results);
        self
    }

    pub fn store(&self) -> &Arc<dyn CheckpointStore> {
        &self.store
    }

    /// 新しいスレッドでワークフローを実行
    ///
    /// # エラー
    ///
    /// - [`ExecutionError::ValidationError`] - お題が空
    /// - [`ExecutionError::ThreadAlreadyExists`] - スレッドにすでに履歴がある
    /// - ステップの失敗時はそのエラー（それまでのチェックポイントは残る）
    pub async fn run(
        &self,
        thread_id: &str,
        task: &str,
        max_revision: u32,
    ) -> Result<WorkflowResult, ExecutionError> {
        checkpoint::validate_thread_id(thread_id)?;

        if task.trim().is_empty() {
            return Err(ExecutionError::ValidationError(
                "お題が空です".to_string(),
            ));
        }

        if self.store.get_latest(thread_id).await?.is_some() {
            return Err(ExecutionError::ThreadAlreadyExists(thread_id.to_string()));
        }

        let initial = Checkpoint {
            next: Some(self.graph.entry()),
            ..Checkpoint::initial(thread_id, WorkflowState::new(task, max_revision))
        };
        self.store.put(initial.clone()).await?;

        info!(thread_id, max_revision, "ワークフローを開始");
        self.drive(initial).await
    }

    /// 最新のチェックポイントから再開
    ///
    /// 終了済みのスレッドは何も実行せずに [`ExecutionStatus::AlreadyCompleted`] を返します。
    pub async fn resume(&self, thread_id: &str) -> Result<WorkflowResult, ExecutionError> {
        let latest = self
            .store
            .get_latest(thread_id)
            .await?
            .ok_or_else(|| ExecutionError::ThreadNotFound(thread_id.to_string()))?;

        info!(
            thread_id,
            sequence = latest.sequence,
            next = latest.next.map(|s| s.as_str()).unwrap_or("DONE"),
            "ワークフローを再開"
        );
        self.drive(latest).await
    }

    /// スレッドのチェックポイント履歴（古い順）
    pub async fn history(&self, thread_id: &str) -> Result<Vec<Checkpoint>, ExecutionError> {
        let mut history = Vec::new();
        for sequence in self.store.list(thread_id).await? {
            if let Some(checkpoint) = self.store.get(thread_id, sequence).await? {
                history.push(checkpoint);
            }
        }
        Ok(history)
    }

    /// チェックポイントから DONE までステップを進める
    async fn drive(&self, start: Checkpoint) -> Result<WorkflowResult, ExecutionError> {
        let thread_id = start.thread_id;
        let mut context = ExecutionContext::new(thread_id.clone());
        let mut state = start.state;
        let mut sequence = start.sequence;
        let mut next = start.next;

        let status = if next.is_none() {
            ExecutionStatus::AlreadyCompleted
        } else {
            ExecutionStatus::Completed
        };

        while let Some(step) = next {
            if context.steps_completed() >= self.step_limit {
                error!(
                    thread_id = %thread_id,
                    limit = self.step_limit,
                    step = %step,
                    "ステップ数の上限に達したため停止します"
                );
                return Err(ExecutionError::StepLimitExceeded {
                    limit: self.step_limit,
                });
            }

            let step_start = Instant::now();

            let outcome = match self.execute_with_timeout(step, &state).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!(
                        thread_id = %thread_id,
                        step = %step,
                        sequence,
                        error = %e,
                        "ステップが失敗したため停止します"
                    );
                    return Err(e);
                }
            };
            let duration = step_start.elapsed();

            let content_added = outcome.update.content.len();
            state = state.merge(outcome.update);
            let following = self.graph.next(step, &state)?.as_step();

            sequence += 1;
            self.store
                .put(Checkpoint::new(
                    thread_id.clone(),
                    sequence,
                    state.clone(),
                    step,
                    following,
                ))
                .await?;

            info!(
                thread_id = %thread_id,
                sequence,
                step = %step,
                next = following.map(|s| s.as_str()).unwrap_or("DONE"),
                revision_number = state.revision_number,
                content = state.content.len(),
                "ステップ完了"
            );

            context.record_step_result(StepResult {
                step,
                sequence,
                next: following,
                token_usage: outcome.token_usage,
                duration,
                content_added,
            });

            next = following;
        }

        info!(
            thread_id = %thread_id,
            steps = context.steps_completed(),
            revision_number = state.revision_number,
            total_tokens = context.total_tokens(),
            "ワークフローが完了"
        );

        Ok(context.finish(status, state, sequence))
    }

    /// タイムアウト付きでステップを実行
    async fn execute_with_timeout(
        &self,
        step: StepName,
        state: &WorkflowState,
    ) -> Result<StepOutcome, ExecutionError> {
        match self.step_timeout {
            Some(timeout) => match tokio::time::timeout(timeout, self.steps.run(step, state)).await {
                Ok(result) => result,
                Err(_) => Err(ExecutionError::TimeoutError {
                    step_name: step.to_string(),
                    timeout_secs: timeout.as_secs(),
                }),
            },
            None => self.steps.run(step, state).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::MemoryCheckpointStore;
    use crate::error::{ProviderError, SearchError};
    use crate::provider::{ChatMessage, OutputSchema, ProviderResponse, StopReason, TokenUsage};
    use crate::search::SearchResult;
    use async_trait::async_trait;

    /// 固定の応答を返すモックプロバイダー
    struct MockProviderClient {
        delay: Option<Duration>,
    }

    #[async_trait]
    impl ProviderClient for MockProviderClient {
        async fn execute(&self, messages: &[ChatMessage]) -> Result<ProviderResponse, ProviderError> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            Ok(ProviderResponse {
                content: format!("response to: {}", messages[1].content),
                token_usage: TokenUsage {
                    input_tokens: 100,
                    output_tokens: 50,
                },
                stop_reason: StopReason::EndTurn,
                model: "mock-model".to_string(),
            })
        }

        async fn execute_structured(
            &self,
            _messages: &[ChatMessage],
            _schema: &OutputSchema,
        ) -> Result<ProviderResponse, ProviderError> {
            Ok(ProviderResponse {
                content: r#"{"queries": ["q"]}"#.to_string(),
                token_usage: TokenUsage::default(),
                stop_reason: StopReason::EndTurn,
                model: "mock-model".to_string(),
            })
        }
    }

    struct MockSearchClient;

    #[async_trait]
    impl SearchClient for MockSearchClient {
        async fn search(&self, query: &str, _max_results: u32) -> Result<Vec<SearchResult>, SearchError> {
            Ok(vec![SearchResult {
                title: String::new(),
                url: String::new(),
                content: format!("about {query}"),
                score: 1.0,
            }])
        }
    }

    fn executor(delay: Option<Duration>) -> WorkflowExecutor {
        WorkflowExecutor::new(
            Arc::new(MockProviderClient { delay }),
            Arc::new(MockSearchClient),
            Arc::new(MemoryCheckpointStore::new()),
        )
    }

    #[tokio::test]
    async fn test_run_single_revision() {
        let executor = executor(None);
        let result = executor.run("t1", "topic", 1).await.unwrap();

        assert_eq!(result.status, ExecutionStatus::Completed);
        let steps: Vec<StepName> = result.steps.iter().map(|s| s.step).collect();
        assert_eq!(
            steps,
            vec![StepName::Plan, StepName::ResearchPlan, StepName::Generate]
        );
        assert_eq!(result.final_state.revision_number, 1);
        assert_eq!(result.final_state.content, vec!["about q"]);
        assert_eq!(result.last_sequence, 3);
        assert_eq!(result.total_tokens_used, 300);
    }

    #[tokio::test]
    async fn test_run_writes_initial_checkpoint() {
        let executor = executor(None);
        executor.run("t1", "topic", 0).await.unwrap();

        let history = executor.history("t1").await.unwrap();
        assert_eq!(history[0].sequence, 0);
        assert_eq!(history[0].step, None);
        assert_eq!(history[0].next, Some(StepName::Plan));
        assert!(history.last().unwrap().is_done());
    }

    #[tokio::test]
    async fn test_run_rejects_empty_task() {
        let result = executor(None).run("t1", "   ", 1).await;
        assert!(matches!(result, Err(ExecutionError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_run_rejects_existing_thread() {
        let executor = executor(None);
        executor.run("t1", "topic", 0).await.unwrap();

        let result = executor.run("t1", "other topic", 0).await;
        assert!(matches!(result, Err(ExecutionError::ThreadAlreadyExists(id)) if id == "t1"));
    }

    #[tokio::test]
    async fn test_resume_unknown_thread() {
        let result = executor(None).resume("missing").await;
        assert!(matches!(result, Err(ExecutionError::ThreadNotFound(_))));
    }

    #[tokio::test]
    async fn test_resume_completed_thread_is_noop() {
        let executor = executor(None);
        let first = executor.run("t1", "topic", 1).await.unwrap();

        let resumed = executor.resume("t1").await.unwrap();
        assert_eq!(resumed.status, ExecutionStatus::AlreadyCompleted);
        assert!(resumed.steps.is_empty());
        assert_eq!(resumed.final_state, first.final_state);
        assert_eq!(resumed.last_sequence, first.last_sequence);
    }

    #[tokio::test]
    async fn test_step_limit() {
        let executor = executor(None).with_step_limit(2);
        let result = executor.run("t1", "topic", 1).await;

        assert!(matches!(
            result,
            Err(ExecutionError::StepLimitExceeded { limit: 2 })
        ));
        let latest = executor.store().get_latest("t1").await.unwrap().unwrap();
        assert_eq!(latest.sequence, 2);
        assert_eq!(latest.next, Some(StepName::Generate));
    }

    #[tokio::test]
    async fn test_step_timeout() {
        let executor =
            executor(Some(Duration::from_millis(200))).with_step_timeout(Duration::from_millis(20));

        let result = executor.run("t1", "topic", 1).await;

        match result {
            Err(ExecutionError::TimeoutError { step_name, .. }) => assert_eq!(step_name, "plan"),
            other => panic!("Expected TimeoutError, got {other:?}"),
        }
        let latest = executor.store().get_latest("t1").await.unwrap().unwrap();
        assert_eq!(latest.sequence, 0);
    }

    #[tokio::test]
    async fn test_custom_graph_without_research() {
        let graph = WorkflowGraph::builder()
            .step(StepName::Plan)
            .step(StepName::Generate)
            .entry(StepName::Plan)
            .edge(StepName::Plan, StepName::Generate)
            .finish(StepName::Generate)
            .build()
            .unwrap();
        let executor = executor(None).with_graph(graph);

        let result = executor.run("t1", "topic", 3).await.unwrap();

        let steps: Vec<StepName> = result.steps.iter().map(|s| s.step).collect();
        assert_eq!(steps, vec![StepName::Plan, StepName::Generate]);
        assert_eq!(result.final_state.revision_number, 1);
        assert!(result.final_state.content.is_empty());
    }

    #[tokio::test]
    async fn test_from_config_uses_memory_store() {
        let config = AgentConfig::from_toml(
            r#"
            [checkpoint]
            backend = "memory"

            [run]
            step_limit = 7
            step_timeout_secs = 30
            "#,
        )
        .unwrap();

        let executor = WorkflowExecutor::from_config(&config, &Secrets::default());

        assert_eq!(executor.step_limit, 7);
        assert_eq!(executor.step_timeout, Some(Duration::from_secs(30)));
        assert!(executor.store().list("t1").await.unwrap().is_empty());
    }
}
