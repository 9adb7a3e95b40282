//! ステップ関数
//!
//! 各ステップは現在の [`WorkflowState`] を読み、部分更新 [`StateUpdate`] を返します。
//! 状態そのものは変更しません。合成とチェックポイントはエグゼキューター側の責務です。
//!
//! | ステップ            | 読む                  | 外部呼び出し                          | 更新                     |
//! |---------------------|-----------------------|---------------------------------------|--------------------------|
//! | `plan`              | task                  | 生成 1 回                             | plan                     |
//! | `research_plan`     | task                  | 構造化生成 1 回 + クエリごとに検索    | content 追記             |
//! | `generate`          | task, plan, content   | 生成 1 回                             | draft, revision_number+1 |
//! | `reflect`           | draft                 | 生成 1 回                             | critique                 |
//! | `research_critique` | critique              | 構造化生成 1 回 + クエリごとに検索    | content 追記             |
//!
//! 調査ステップはすべての検索が成功したときだけ更新を返します。
//! 途中の検索が失敗した場合、それまでの結果は破棄されます。

use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, warn};

use super::graph::StepName;
use super::prompts;
use super::result::ExecutionError;
use super::state::{StateUpdate, WorkflowState};
use crate::provider::{ChatMessage, OutputSchema, ProviderClient, TokenUsage};
use crate::search::SearchClient;

/// 1回の調査で使うクエリ数の上限（設定でこれより増やすことはできない）
pub const MAX_QUERIES: usize = 3;

/// 1クエリあたりの検索結果数の既定値
pub const DEFAULT_MAX_RESULTS: u32 = 3;

const QUERIES_SCHEMA_NAME: &str = "queries";

/// ステップ実行の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOutcome {
    pub update: StateUpdate,
    pub token_usage: TokenUsage,
}

/// 構造化出力 `{queries: [text]}`
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Queries {
    queries: Vec<String>,
}

/// 外部サービスを保持してステップを実行する
pub struct StepRunner {
    provider: Arc<dyn ProviderClient>,
    search: Arc<dyn SearchClient>,
    max_queries: usize,
    max_results: u32,
}

impl StepRunner {
    pub fn new(provider: Arc<dyn ProviderClient>, search: Arc<dyn SearchClient>) -> Self {
        Self {
            provider,
            search,
            max_queries: MAX_QUERIES,
            max_results: DEFAULT_MAX_RESULTS,
        }
    }

    /// 調査ステップのクエリ数上限と検索結果数を設定
    ///
    /// クエリ数は `1..=MAX_QUERIES` に丸めます。
    pub fn with_research_limits(mut self, max_queries: usize, max_results: u32) -> Self {
        self.max_queries = max_queries.clamp(1, MAX_QUERIES);
        self.max_results = max_results;
        self
    }

    /// 指定したステップを実行する
    pub async fn run(
        &self,
        step: StepName,
        state: &WorkflowState,
    ) -> Result<StepOutcome, ExecutionError> {
        match step {
            StepName::Plan => self.plan(state).await,
            StepName::ResearchPlan => {
                self.research(step, &prompts::research_plan(self.max_queries), &state.task)
                    .await
            }
            StepName::Generate => self.generate(state).await,
            StepName::Reflect => self.reflect(state).await,
            StepName::ResearchCritique => {
                self.research(
                    step,
                    &prompts::research_critique(self.max_queries),
                    &state.critique,
                )
                .await
            }
        }
    }

    async fn plan(&self, state: &WorkflowState) -> Result<StepOutcome, ExecutionError> {
        let response = self
            .provider
            .execute(&[
                ChatMessage::system(prompts::PLAN),
                ChatMessage::user(state.task.as_str()),
            ])
            .await?;

        Ok(StepOutcome {
            update: StateUpdate::plan(response.content),
            token_usage: response.token_usage,
        })
    }

    async fn generate(&self, state: &WorkflowState) -> Result<StepOutcome, ExecutionError> {
        let content = state.content.join("\n\n");
        let response = self
            .provider
            .execute(&[
                ChatMessage::system(prompts::writer(&content)),
                ChatMessage::user(prompts::writer_request(&state.task, &state.plan)),
            ])
            .await?;

        Ok(StepOutcome {
            update: StateUpdate::draft(response.content, state.revision_number.saturating_add(1)),
            token_usage: response.token_usage,
        })
    }

    async fn reflect(&self, state: &WorkflowState) -> Result<StepOutcome, ExecutionError> {
        let response = self
            .provider
            .execute(&[
                ChatMessage::system(prompts::REFLECTION),
                ChatMessage::user(state.draft.as_str()),
            ])
            .await?;

        Ok(StepOutcome {
            update: StateUpdate::critique(response.content),
            token_usage: response.token_usage,
        })
    }

    /// クエリを生成し、クエリごとに検索して結果本文を集める
    async fn research(
        &self,
        step: StepName,
        instruction: &str,
        subject: &str,
    ) -> Result<StepOutcome, ExecutionError> {
        let response = self
            .provider
            .execute_structured(
                &[ChatMessage::system(instruction), ChatMessage::user(subject)],
                &queries_schema(),
            )
            .await?;

        let queries = parse_queries(step, &response.content, self.max_queries)?;

        let mut snippets = Vec::new();
        for query in &queries {
            let results = self.search.search(query, self.max_results).await?;
            debug!(step = %step, query = %query, results = results.len(), "検索結果を取得");
            snippets.extend(results.into_iter().map(|result| result.content));
        }

        Ok(StepOutcome {
            update: StateUpdate::content(snippets),
            token_usage: response.token_usage,
        })
    }
}

fn queries_schema() -> OutputSchema {
    OutputSchema::new(
        QUERIES_SCHEMA_NAME,
        serde_json::json!({
            "type": "object",
            "properties": {
                "queries": {
                    "type": "array",
                    "items": {"type": "string"}
                }
            },
            "required": ["queries"],
            "additionalProperties": false
        }),
    )
}

/// 構造化出力を検証し、空白のクエリを除いて上限までに切り詰める
fn parse_queries(step: StepName, raw: &str, cap: usize) -> Result<Vec<String>, ExecutionError> {
    let parsed: Queries =
        serde_json::from_str(raw).map_err(|e| ExecutionError::MalformedOutput {
            step_name: step.to_string(),
            reason: e.to_string(),
        })?;

    let mut queries: Vec<String> = parsed
        .queries
        .into_iter()
        .map(|query| query.trim().to_string())
        .filter(|query| !query.is_empty())
        .collect();

    if queries.len() > cap {
        warn!(
            step = %step,
            returned = queries.len(),
            cap,
            "クエリ数が上限を超えたため切り詰めます"
        );
        queries.truncate(cap);
    }

    Ok(queries)
}
