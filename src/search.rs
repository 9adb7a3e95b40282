//! Web 検索プロバイダー
//!
//! # モジュール構成
//!
//! - `traits` - 共通インターフェース（[`SearchClient`]トレイト、[`SearchResult`]）
//! - `tavily` - Tavily Search API クライアント

pub mod traits;
pub mod tavily;

pub use traits::{SearchClient, SearchResult};

use std::sync::Arc;

use crate::config::{SearchSettings, Secrets};

/// 検索クライアントを生成するファクトリー関数
///
/// APIキーは `secrets` から `TAVILY_API_KEY` を引きます。未設定の場合は
/// 最初の検索で [`SearchError::MissingCredentials`](crate::error::SearchError::MissingCredentials)
/// になります。
pub fn create_search_client(settings: &SearchSettings, secrets: &Secrets) -> Arc<dyn SearchClient> {
    let api_key = secrets.get(tavily::API_KEY_NAME);
    Arc::new(tavily::TavilyClient::from_settings(settings, api_key))
}
