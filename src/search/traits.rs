//! 検索プロバイダーの共通インターフェース定義

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::SearchError;

/// 検索結果1件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// ページタイトル
    #[serde(default)]
    pub title: String,

    /// ページURL
    #[serde(default)]
    pub url: String,

    /// 抽出されたテキスト（研究メモとして蓄積される部分）
    pub content: String,

    /// 関連度スコア（0〜1）
    #[serde(default)]
    pub score: f64,
}

/// 検索プロバイダーの共通インターフェース
///
/// 1回の呼び出しで外部サービスへの要求は1回です。自動リトライはしません。
#[async_trait]
pub trait SearchClient: Send + Sync {
    /// クエリを検索し、最大 `max_results` 件の結果を返す
    ///
    /// 結果が0件でもエラーにはなりません。
    async fn search(&self, query: &str, max_results: u32) -> Result<Vec<SearchResult>, SearchError>;
}
