//! ワークフロー状態と部分更新の合成
//!
//! 1回の実行（スレッド）を通して受け渡される唯一の集約 [`WorkflowState`] と、
//! 各ステップが返す部分更新 [`StateUpdate`] を定義します。
//!
//! # フィールドごとの合成規則
//!
//! | フィールド        | 規則                             |
//! |-------------------|----------------------------------|
//! | `task`            | 生成後は不変（更新に含まれない） |
//! | `plan`            | 置き換え                         |
//! | `draft`           | 置き換え                         |
//! | `critique`        | 置き換え                         |
//! | `content`         | 末尾に追記（既存分は保持）       |
//! | `revision_number` | 置き換え                         |
//! | `max_revision`    | 生成後は不変（更新に含まれない） |

use serde::{Deserialize, Serialize};

/// 1回の実行を通して受け渡されるワークフロー状態
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowState {
    /// エッセイのお題（ユーザー入力）
    pub task: String,

    /// plan ステップが作成したアウトライン
    #[serde(default)]
    pub plan: String,

    /// 最新のドラフト
    #[serde(default)]
    pub draft: String,

    /// 最新ドラフトへの講評
    #[serde(default)]
    pub critique: String,

    /// 蓄積された調査メモ（追記のみ）
    #[serde(default)]
    pub content: Vec<String>,

    /// これまでに生成したドラフト数
    #[serde(default)]
    pub revision_number: u32,

    /// ドラフト数の上限
    pub max_revision: u32,
}

impl WorkflowState {
    /// 実行開始時の状態を作成する
    pub fn new(task: impl Into<String>, max_revision: u32) -> Self {
        Self {
            task: task.into(),
            max_revision,
            ..Self::default()
        }
    }

    /// 部分更新を合成した新しい状態を返す
    pub fn merge(mut self, update: StateUpdate) -> Self {
        if let Some(plan) = update.plan {
            self.plan = plan;
        }
        if let Some(draft) = update.draft {
            self.draft = draft;
        }
        if let Some(critique) = update.critique {
            self.critique = critique;
        }
        if let Some(revision_number) = update.revision_number {
            self.revision_number = revision_number;
        }
        append_content(&mut self.content, update.content);
        self
    }
}

/// ステップが返す部分更新
///
/// 変更するフィールドだけを `Some` にします。`content` は追記分のみを持ちます。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateUpdate {
    pub plan: Option<String>,
    pub draft: Option<String>,
    pub critique: Option<String>,
    pub content: Vec<String>,
    pub revision_number: Option<u32>,
}

impl StateUpdate {
    pub fn plan(plan: impl Into<String>) -> Self {
        Self {
            plan: Some(plan.into()),
            ..Self::default()
        }
    }

    pub fn draft(draft: impl Into<String>, revision_number: u32) -> Self {
        Self {
            draft: Some(draft.into()),
            revision_number: Some(revision_number),
            ..Self::default()
        }
    }

    pub fn critique(critique: impl Into<String>) -> Self {
        Self {
            critique: Some(critique.into()),
            ..Self::default()
        }
    }

    pub fn content(snippets: Vec<String>) -> Self {
        Self {
            content: snippets,
            ..Self::default()
        }
    }

    /// 何も変更しない更新かどうか
    pub fn is_empty(&self) -> bool {
        self.plan.is_none()
            && self.draft.is_none()
            && self.critique.is_none()
            && self.content.is_empty()
            && self.revision_number.is_none()
    }
}

/// 調査メモを既存の並びの末尾に追記する
///
/// 既存の要素は並び順を含めて保持されます。空の既存リストも正常な入力です。
pub fn append_content(content: &mut Vec<String>, snippets: impl IntoIterator<Item = String>) {
    content.extend(snippets);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state() {
        let state = WorkflowState::new("Write about tides", 2);
        assert_eq!(state.task, "Write about tides");
        assert_eq!(state.max_revision, 2);
        assert_eq!(state.revision_number, 0);
        assert!(state.content.is_empty());
        assert!(state.plan.is_empty());
    }

    #[test]
    fn test_merge_replaces_text_fields() {
        let state = WorkflowState::new("t", 2)
            .merge(StateUpdate::plan("outline v1"))
            .merge(StateUpdate::draft("draft v1", 1))
            .merge(StateUpdate::draft("draft v2", 2))
            .merge(StateUpdate::critique("too short"));

        assert_eq!(state.plan, "outline v1");
        assert_eq!(state.draft, "draft v2");
        assert_eq!(state.critique, "too short");
        assert_eq!(state.revision_number, 2);
    }

    #[test]
    fn test_merge_appends_content() {
        let state = WorkflowState::new("t", 2)
            .merge(StateUpdate::content(vec!["a".into(), "b".into()]))
            .merge(StateUpdate::content(vec!["c".into()]));

        assert_eq!(state.content, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_merge_keeps_untouched_fields() {
        let before = WorkflowState::new("t", 3).merge(StateUpdate::plan("p"));
        let after = before.clone().merge(StateUpdate::content(vec!["x".into()]));

        assert_eq!(after.task, before.task);
        assert_eq!(after.plan, before.plan);
        assert_eq!(after.max_revision, before.max_revision);
        assert_eq!(after.revision_number, before.revision_number);
    }

    #[test]
    fn test_merge_empty_update_is_identity() {
        let state = WorkflowState::new("t", 1).merge(StateUpdate::plan("p"));
        assert!(StateUpdate::default().is_empty());
        assert_eq!(state.clone().merge(StateUpdate::default()), state);
    }

    #[test]
    fn test_append_content_to_empty() {
        let mut content = Vec::new();
        append_content(&mut content, vec!["first".to_string()]);
        assert_eq!(content, vec!["first"]);
    }

    #[test]
    fn test_append_content_preserves_prefix() {
        let mut content = vec!["a".to_string(), "b".to_string()];
        let before = content.clone();
        append_content(&mut content, vec!["a".to_string()]);

        assert_eq!(&content[..before.len()], before.as_slice());
        assert_eq!(content.len(), 3);
    }

    #[test]
    fn test_deserialize_tolerates_missing_content() {
        let state: WorkflowState =
            serde_json::from_str(r#"{"task": "t", "max_revision": 1}"#).unwrap();
        assert!(state.content.is_empty());
        assert_eq!(state.revision_number, 0);
    }
}
