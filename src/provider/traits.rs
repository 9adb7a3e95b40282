//! テキスト生成プロバイダーの共通インターフェース定義
//!
//! # 責務
//!
//! - テキスト生成プロバイダーの共通トレイト [`ProviderClient`] を定義
//! - ロール付きメッセージ [`ChatMessage`] と構造化出力スキーマ [`OutputSchema`] を定義
//! - プロバイダー非依存のレスポンス型 [`ProviderResponse`] を提供
//! - トークン使用量 [`TokenUsage`] と停止理由 [`StopReason`] の型を定義
//!
//! # 使用例
//!
//! ```rust,no_run
//! use essay_writer::provider::{ChatMessage, ProviderClient};
//!
//! async fn example(client: &dyn ProviderClient) {
//!     let response = client.execute(&[
//!         ChatMessage::system("You are a helpful assistant."),
//!         ChatMessage::user("Hello!"),
//!     ]).await.unwrap();
//!
//!     println!("Response: {}", response.content);
//!     println!("Tokens: {} in, {} out",
//!         response.token_usage.input_tokens,
//!         response.token_usage.output_tokens
//!     );
//! }
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

/// メッセージの送り手
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// ロール付きメッセージ
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// 構造化出力モードで使う JSON Schema
#[derive(Debug, Clone, PartialEq)]
pub struct OutputSchema {
    /// スキーマ名（プロバイダーに渡す識別子）
    pub name: String,
    /// JSON Schema 本体
    pub schema: serde_json::Value,
}

impl OutputSchema {
    pub fn new(name: impl Into<String>, schema: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            schema,
        }
    }
}

/// テキスト生成プロバイダーの共通インターフェース
///
/// このトレイトを実装することで、任意のプロバイダーを
/// ワークフローに組み込めます。テストではフェイク実装に差し替えます。
///
/// # 実装要件
///
/// - `Send + Sync`: 複数スレッド（実行）から共有可能
/// - 1回の呼び出しにつき外部サービスへの要求は1回（自動リトライしない）
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// メッセージ列を送り、生成テキストを取得する
    ///
    /// # エラー
    ///
    /// - [`ProviderError::MissingCredentials`] - 認証情報が未設定
    /// - [`ProviderError::AuthenticationError`] - 認証失敗
    /// - [`ProviderError::RateLimitExceeded`] - レート制限超過
    /// - [`ProviderError::Timeout`] - タイムアウト
    /// - [`ProviderError::InvalidResponse`] - 不正なレスポンス
    async fn execute(&self, messages: &[ChatMessage]) -> Result<ProviderResponse, ProviderError>;

    /// 構造化出力モードで実行する
    ///
    /// 返される [`ProviderResponse::content`] はスキーマに従う JSON 文字列です。
    /// スキーマへの適合は呼び出し側で検証します。
    async fn execute_structured(
        &self,
        messages: &[ChatMessage],
        schema: &OutputSchema,
    ) -> Result<ProviderResponse, ProviderError>;
}

/// プロバイダーからのレスポンス
#[derive(Debug, Clone)]
pub struct ProviderResponse {
    /// 生成されたテキスト（構造化モードでは JSON 文字列）
    pub content: String,

    /// トークン使用量
    pub token_usage: TokenUsage,

    /// 生成停止理由
    pub stop_reason: StopReason,

    /// 使用されたモデル名（例: "gpt-4o"）
    pub model: String,
}

/// トークン使用量
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TokenUsage {
    /// 入力トークン数（プロンプト）
    pub input_tokens: u32,

    /// 出力トークン数（生成テキスト）
    pub output_tokens: u32,
}

impl TokenUsage {
    /// 総トークン数を計算
    pub fn total(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }

    /// 別の使用量を加算する
    pub fn accumulate(&mut self, other: TokenUsage) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
    }
}

/// 生成停止理由
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// 自然な終了
    EndTurn,

    /// 最大トークン数到達
    MaxTokens,

    /// コンテンツフィルター発動
    ContentFilter,

    /// 不明な理由
    Unknown,
}

impl StopReason {
    /// OpenAI 互換 API の `finish_reason` から変換
    pub fn from_finish_reason(reason: Option<&str>) -> Self {
        match reason {
            Some("stop") => StopReason::EndTurn,
            Some("length") => StopReason::MaxTokens,
            Some("content_filter") => StopReason::ContentFilter,
            _ => StopReason::Unknown,
        }
    }
}
