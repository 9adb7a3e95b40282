//! OpenAI 互換 Chat Completions API クライアント
//!
//! # 責務
//!
//! - `POST {base_url}/chat/completions` との HTTP 通信を担当
//! - [`ProviderClient`] トレイトを実装し、統一インターフェースを提供
//! - 構造化出力（`response_format: json_schema`）の要求
//! - HTTP ステータス・通信エラーを [`ProviderError`] に分類
//!
//! # 認証
//!
//! APIキーは生成時に `Option<String>` で受け取ります。`None` の場合でも
//! 生成自体は成功し、最初の呼び出しで [`ProviderError::MissingCredentials`] を返します。
//!
//! # 使用例
//!
//! ```rust,no_run
//! use essay_writer::provider::openai::OpenAIClient;
//! use essay_writer::provider::{ChatMessage, ProviderClient};
//!
//! #[tokio::main]
//! async fn main() {
//!     let client = OpenAIClient::new(std::env::var("OPENAI_API_KEY").ok(), "gpt-4o");
//!
//!     let response = client.execute(&[
//!         ChatMessage::system("You are a helpful assistant."),
//!         ChatMessage::user("Hello!"),
//!     ]).await.unwrap();
//!
//!     println!("{}", response.content);
//! }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::traits::{
    ChatMessage, OutputSchema, ProviderClient, ProviderResponse, StopReason, TokenUsage,
};
use crate::config::ModelSettings;
use crate::error::ProviderError;

/// APIキーを参照するシークレット名
pub const API_KEY_NAME: &str = "OPENAI_API_KEY";

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// OpenAI 互換 API クライアント
pub struct OpenAIClient {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
    temperature: f32,
    timeout: Duration,
}

impl OpenAIClient {
    /// 新しいクライアントを生成
    ///
    /// # 引数
    ///
    /// - `api_key`: APIキー（未設定なら呼び出し時にエラー）
    /// - `model`: モデル名（例: "gpt-4o"）
    pub fn new(api_key: Option<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: model.into(),
            temperature: 0.0,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// 設定ファイルの `[model]` セクションから生成
    pub fn from_settings(settings: &ModelSettings, api_key: Option<String>) -> Self {
        Self::new(api_key, settings.model_name())
            .with_base_url(settings.base_url.clone())
            .with_temperature(settings.temperature)
            .with_timeout(Duration::from_secs(settings.timeout_secs))
    }

    /// ベースURLを変更（互換サーバーやテスト用モックサーバー向け）
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// 使用するモデル名
    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    /// リクエストを1回送信し、レスポンスを共通形式に変換する
    async fn send(&self, request: &ChatRequest<'_>) -> Result<ProviderResponse, ProviderError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ProviderError::MissingCredentials(API_KEY_NAME.to_string()))?;

        debug!(
            model = %self.model,
            messages = request.messages.len(),
            structured = request.response_format.is_some(),
            "chat completion リクエストを送信"
        );

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(api_key)
            .timeout(self.timeout)
            .json(request)
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, body));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("JSON のパースに失敗: {e}")))?;

        chat.into_provider_response(&self.model)
    }
}

#[async_trait]
impl ProviderClient for OpenAIClient {
    async fn execute(&self, messages: &[ChatMessage]) -> Result<ProviderResponse, ProviderError> {
        let request = ChatRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
            response_format: None,
        };
        self.send(&request).await
    }

    async fn execute_structured(
        &self,
        messages: &[ChatMessage],
        schema: &OutputSchema,
    ) -> Result<ProviderResponse, ProviderError> {
        let request = ChatRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
            response_format: Some(ResponseFormat {
                kind: "json_schema",
                json_schema: JsonSchemaFormat {
                    name: &schema.name,
                    schema: &schema.schema,
                    strict: true,
                },
            }),
        };
        self.send(&request).await
    }
}

fn classify_transport_error(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout(e.to_string())
    } else {
        ProviderError::Network(e.to_string())
    }
}

fn classify_status(status: StatusCode, body: String) -> ProviderError {
    match status.as_u16() {
        401 | 403 => ProviderError::AuthenticationError(body),
        429 => ProviderError::RateLimitExceeded,
        408 | 504 => ProviderError::Timeout(body),
        code => ProviderError::HttpError(code, body),
    }
}

// リクエスト型定義

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat<'a>>,
}

#[derive(Debug, Serialize)]
struct ResponseFormat<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    json_schema: JsonSchemaFormat<'a>,
}

#[derive(Debug, Serialize)]
struct JsonSchemaFormat<'a> {
    name: &'a str,
    schema: &'a serde_json::Value,
    strict: bool,
}

// レスポンス型定義

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: Option<String>,
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    refusal: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

impl ChatResponse {
    fn into_provider_response(self, requested_model: &str) -> Result<ProviderResponse, ProviderError> {
        let choice = self
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::InvalidResponse("choices が空です".to_string()))?;

        if let Some(refusal) = choice.message.refusal {
            return Err(ProviderError::InvalidResponse(format!(
                "モデルが応答を拒否しました: {refusal}"
            )));
        }

        let content = choice
            .message
            .content
            .ok_or_else(|| ProviderError::InvalidResponse("content がありません".to_string()))?;

        let token_usage = self
            .usage
            .map(|usage| TokenUsage {
                input_tokens: usage.prompt_tokens,
                output_tokens: usage.completion_tokens,
            })
            .unwrap_or_default();

        Ok(ProviderResponse {
            content,
            token_usage,
            stop_reason: StopReason::from_finish_reason(choice.finish_reason.as_deref()),
            model: self.model.unwrap_or_else(|| requested_model.to_string()),
        })
    }
}
