//! ステップ間の遷移グラフ
//!
//! ステップ名は [`StepName`] 列挙型で表し、文字列による遷移先の指定は行いません。
//! 分岐は generate の出口に置かれる条件付きエッジだけで、
//! その判定は [`Continuation`] を返す関数で表現します。
//!
//! ```text
//! START -> plan -> research_plan -> generate -> [decide] -> {DONE | reflect}
//! reflect -> research_critique -> generate
//! ```

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::policy::{self, Continuation};
use super::state::WorkflowState;
use crate::error::GraphError;

/// ステップ名
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepName {
    Plan,
    ResearchPlan,
    Generate,
    Reflect,
    ResearchCritique,
}

impl StepName {
    pub const ALL: [StepName; 5] = [
        StepName::Plan,
        StepName::ResearchPlan,
        StepName::Generate,
        StepName::Reflect,
        StepName::ResearchCritique,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StepName::Plan => "plan",
            StepName::ResearchPlan => "research_plan",
            StepName::Generate => "generate",
            StepName::Reflect => "reflect",
            StepName::ResearchCritique => "research_critique",
        }
    }
}

impl fmt::Display for StepName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 遷移先
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Next {
    Step(StepName),
    Done,
}

impl Next {
    /// チェックポイントに記録する形（`None` は終了済み）
    pub fn as_step(&self) -> Option<StepName> {
        match self {
            Next::Step(step) => Some(*step),
            Next::Done => None,
        }
    }
}

/// 条件付きエッジの判定関数
pub type Router = fn(&WorkflowState) -> Continuation;

/// ステップの出口
#[derive(Debug, Clone, Copy)]
pub enum Edge {
    /// 無条件で次のステップへ
    To(StepName),
    /// 無条件で終了
    End,
    /// 状態に応じて分岐
    Conditional(Router),
}

/// 検証済みのワークフローグラフ
#[derive(Debug, Clone)]
pub struct WorkflowGraph {
    entry: StepName,
    steps: Vec<StepName>,
    edges: HashMap<StepName, Edge>,
}

impl WorkflowGraph {
    pub fn builder() -> GraphBuilder {
        GraphBuilder::default()
    }

    /// エッセイ執筆ワークフローの標準グラフ
    pub fn essay() -> Self {
        let edges = HashMap::from([
            (StepName::Plan, Edge::To(StepName::ResearchPlan)),
            (StepName::ResearchPlan, Edge::To(StepName::Generate)),
            (StepName::Generate, Edge::Conditional(continue_after_generate)),
            (StepName::Reflect, Edge::To(StepName::ResearchCritique)),
            (StepName::ResearchCritique, Edge::To(StepName::Generate)),
        ]);

        Self {
            entry: StepName::Plan,
            steps: StepName::ALL.to_vec(),
            edges,
        }
    }

    pub fn entry(&self) -> StepName {
        self.entry
    }

    pub fn contains(&self, step: StepName) -> bool {
        self.steps.contains(&step)
    }

    /// `from` を終えた直後の状態から次の遷移先を決める
    pub fn next(&self, from: StepName, state: &WorkflowState) -> Result<Next, GraphError> {
        let edge = self
            .edges
            .get(&from)
            .ok_or_else(|| GraphError::MissingEdge(from.to_string()))?;

        match edge {
            Edge::To(step) => Ok(Next::Step(*step)),
            Edge::End => Ok(Next::Done),
            Edge::Conditional(router) => match router(state) {
                Continuation::Continue { next } if self.contains(next) => Ok(Next::Step(next)),
                Continuation::Continue { next } => Err(GraphError::UnknownStep(next.to_string())),
                Continuation::Terminate => Ok(Next::Done),
            },
        }
    }

    fn validate(&self) -> Result<(), GraphError> {
        if !self.contains(self.entry) {
            return Err(GraphError::UnknownStep(self.entry.to_string()));
        }

        for step in &self.steps {
            match self.edges.get(step) {
                None => return Err(GraphError::MissingEdge(step.to_string())),
                Some(Edge::To(target)) if !self.contains(*target) => {
                    return Err(GraphError::UnknownStep(target.to_string()));
                }
                Some(_) => {}
            }
        }

        for from in self.edges.keys() {
            if !self.contains(*from) {
                return Err(GraphError::UnknownStep(from.to_string()));
            }
        }

        Ok(())
    }
}

fn continue_after_generate(state: &WorkflowState) -> Continuation {
    policy::decide(state.revision_number, state.max_revision)
}

/// [`WorkflowGraph`] のビルダー
#[derive(Debug, Default)]
pub struct GraphBuilder {
    entry: Option<StepName>,
    steps: Vec<StepName>,
    edges: HashMap<StepName, Edge>,
}

impl GraphBuilder {
    pub fn step(mut self, step: StepName) -> Self {
        if !self.steps.contains(&step) {
            self.steps.push(step);
        }
        self
    }

    pub fn entry(mut self, step: StepName) -> Self {
        self.entry = Some(step);
        self
    }

    pub fn edge(mut self, from: StepName, to: StepName) -> Self {
        self.edges.insert(from, Edge::To(to));
        self
    }

    pub fn finish(mut self, from: StepName) -> Self {
        self.edges.insert(from, Edge::End);
        self
    }

    pub fn conditional(mut self, from: StepName, router: Router) -> Self {
        self.edges.insert(from, Edge::Conditional(router));
        self
    }

    /// 検証してグラフを構築する
    ///
    /// # エラー
    ///
    /// - [`GraphError::NoEntryPoint`] - エントリーポイント未設定
    /// - [`GraphError::UnknownStep`] - 未登録のステップを参照している
    /// - [`GraphError::MissingEdge`] - 出口のないステップがある
    pub fn build(self) -> Result<WorkflowGraph, GraphError> {
        let entry = self.entry.ok_or(GraphError::NoEntryPoint)?;
        let graph = WorkflowGraph {
            entry,
            steps: self.steps,
            edges: self.edges,
        };
        graph.validate()?;
        Ok(graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_with(revision_number: u32, max_revision: u32) -> WorkflowState {
        WorkflowState {
            revision_number,
            ..WorkflowState::new("t", max_revision)
        }
    }

    #[test]
    fn test_essay_graph_is_valid() {
        let graph = WorkflowGraph::essay();
        assert!(graph.validate().is_ok());
        assert_eq!(graph.entry(), StepName::Plan);
    }

    #[test]
    fn test_essay_graph_fixed_edges() {
        let graph = WorkflowGraph::essay();
        let state = state_with(0, 2);

        assert_eq!(
            graph.next(StepName::Plan, &state).unwrap(),
            Next::Step(StepName::ResearchPlan)
        );
        assert_eq!(
            graph.next(StepName::ResearchPlan, &state).unwrap(),
            Next::Step(StepName::Generate)
        );
        assert_eq!(
            graph.next(StepName::Reflect, &state).unwrap(),
            Next::Step(StepName::ResearchCritique)
        );
        assert_eq!(
            graph.next(StepName::ResearchCritique, &state).unwrap(),
            Next::Step(StepName::Generate)
        );
    }

    #[test]
    fn test_generate_routes_by_revision() {
        let graph = WorkflowGraph::essay();

        assert_eq!(
            graph.next(StepName::Generate, &state_with(1, 2)).unwrap(),
            Next::Step(StepName::Reflect)
        );
        assert_eq!(
            graph.next(StepName::Generate, &state_with(2, 2)).unwrap(),
            Next::Done
        );
        assert_eq!(
            graph.next(StepName::Generate, &state_with(1, 0)).unwrap(),
            Next::Done
        );
    }

    #[test]
    fn test_builder_missing_entry() {
        let result = WorkflowGraph::builder()
            .step(StepName::Plan)
            .finish(StepName::Plan)
            .build();

        assert_eq!(result.unwrap_err(), GraphError::NoEntryPoint);
    }

    #[test]
    fn test_builder_missing_edge() {
        let result = WorkflowGraph::builder()
            .step(StepName::Plan)
            .step(StepName::Generate)
            .entry(StepName::Plan)
            .edge(StepName::Plan, StepName::Generate)
            .build();

        assert_eq!(
            result.unwrap_err(),
            GraphError::MissingEdge("generate".to_string())
        );
    }

    #[test]
    fn test_builder_unknown_target() {
        let result = WorkflowGraph::builder()
            .step(StepName::Plan)
            .entry(StepName::Plan)
            .edge(StepName::Plan, StepName::Reflect)
            .build();

        assert_eq!(
            result.unwrap_err(),
            GraphError::UnknownStep("reflect".to_string())
        );
    }

    #[test]
    fn test_conditional_to_unregistered_step_fails_at_routing() {
        let graph = WorkflowGraph::builder()
            .step(StepName::Generate)
            .entry(StepName::Generate)
            .conditional(StepName::Generate, continue_after_generate)
            .build()
            .unwrap();

        assert_eq!(
            graph.next(StepName::Generate, &state_with(0, 1)).unwrap_err(),
            GraphError::UnknownStep("reflect".to_string())
        );
        assert_eq!(
            graph.next(StepName::Generate, &state_with(1, 1)).unwrap(),
            Next::Done
        );
    }

    #[test]
    fn test_step_name_serde() {
        assert_eq!(
            serde_json::to_string(&StepName::ResearchCritique).unwrap(),
            r#""research_critique""#
        );
        let parsed: StepName = serde_json::from_str(r#""research_plan""#).unwrap();
        assert_eq!(parsed, StepName::ResearchPlan);
        for step in StepName::ALL {
            assert_eq!(
                serde_json::to_string(&step).unwrap(),
                format!("\"{}\"", step.as_str())
            );
        }
    }

    #[test]
    fn test_next_as_step() {
        assert_eq!(Next::Step(StepName::Plan).as_step(), Some(StepName::Plan));
        assert_eq!(Next::Done.as_step(), None);
    }
}
