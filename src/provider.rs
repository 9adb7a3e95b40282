//! テキスト生成プロバイダー抽象化レイヤー
//!
//! # 責務
//!
//! - テキスト生成サービスを統一的に扱うインターフェースを提供
//! - 設定に応じたクライアントを生成するファクトリー機能
//! - モデルティア（Heavy/Medium/Light）から実際のモデル名へのマッピング
//!
//! # モジュール構成
//!
//! - `traits` - 共通インターフェース（[`ProviderClient`]トレイト等）
//! - `model_tier` - モデルティアマッピング
//! - `openai` - OpenAI 互換 Chat Completions API クライアント
//!
//! # 使用例
//!
//! ```rust,no_run
//! use essay_writer::config::{AgentConfig, Secrets};
//! use essay_writer::provider::{create_provider, ChatMessage};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AgentConfig::default();
//!     let secrets = Secrets::load(config.secrets().resolved_path());
//!
//!     let client = create_provider(config.model(), &secrets);
//!     let response = client.execute(&[
//!         ChatMessage::system("You are a helpful assistant."),
//!         ChatMessage::user("Explain Rust ownership in one sentence."),
//!     ]).await?;
//!
//!     println!("Response: {}", response.content);
//!     Ok(())
//! }
//! ```

pub mod traits;
pub mod model_tier;
pub mod openai;

// 公開APIの再エクスポート
pub use traits::{
    ChatMessage, OutputSchema, ProviderClient, ProviderResponse, Role, StopReason, TokenUsage,
};

use std::sync::Arc;

use crate::config::{ModelSettings, Secrets};

/// テキスト生成クライアントを生成するファクトリー関数
///
/// APIキーは `secrets` から `OPENAI_API_KEY` を引きます。見つからない場合も
/// クライアントは生成され、最初の呼び出しで
/// [`ProviderError::MissingCredentials`](crate::error::ProviderError::MissingCredentials)
/// になります。
pub fn create_provider(settings: &ModelSettings, secrets: &Secrets) -> Arc<dyn ProviderClient> {
    let api_key = secrets.get(openai::API_KEY_NAME);
    Arc::new(openai::OpenAIClient::from_settings(settings, api_key))
}
