//! TOML デシリアライズ用の DTO (Data Transfer Object)
//!
//! # 責務
//!
//! このモジュールは、TOML ファイルからのデータ読み込み専用の構造体を提供します。
//! DTO はバリデーション前の「生データ」を表現し、ドメインモデルとは分離されています。
//!
//! ## 設計思想
//!
//! - **単一責務**: TOML のデシリアライズのみを担当
//! - **全セクション省略可**: 省略されたセクション・キーはドメインモデル側の既定値で補う
//! - **カプセル化**: config モジュール内部のみで使用（外部非公開）
//!
//! ## 変換フロー
//!
//! ```text
//! TOML ファイル
//!   ↓ (デシリアライズ)
//! AgentConfigDto
//!   ↓ (TryFrom でバリデーション)
//! AgentConfig (ドメインモデル)
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::agent::{CheckpointBackend, LogFormat, ModelTier};

/// エージェント設定 DTO
///
/// **注**: この構造体は config モジュール内部の実装詳細です。
/// 外部からは [`AgentConfig`](super::agent::AgentConfig) を使用してください。
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct AgentConfigDto {
    #[serde(default)]
    pub(super) model: ModelDto,
    #[serde(default)]
    pub(super) search: SearchDto,
    #[serde(default)]
    pub(super) run: RunDto,
    #[serde(default)]
    pub(super) checkpoint: CheckpointDto,
    #[serde(default)]
    pub(super) secrets: SecretsDto,
    #[serde(default)]
    pub(super) logging: LoggingDto,
}

/// `[model]` セクション
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct ModelDto {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) tier: Option<ModelTier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) timeout_secs: Option<u64>,
}

/// `[search]` セクション
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct SearchDto {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) max_queries: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) max_results: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) timeout_secs: Option<u64>,
}

/// `[run]` セクション
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct RunDto {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) max_revision: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) step_limit: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) step_timeout_secs: Option<u64>,
}

/// `[checkpoint]` セクション
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct CheckpointDto {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) backend: Option<CheckpointBackend>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) path: Option<PathBuf>,
}

/// `[secrets]` セクション
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct SecretsDto {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) path: Option<PathBuf>,
}

/// `[logging]` セクション
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct LoggingDto {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) format: Option<LogFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) directory: Option<PathBuf>,
}
