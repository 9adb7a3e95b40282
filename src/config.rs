//! 実行設定
//!
//! # モジュール構成
//!
//! - [`agent`][]: TOML 設定ファイルのドメインモデル [`AgentConfig`]
//! - [`secrets`][]: APIキー等のシークレット読み込み
//! - `dto`: TOML デシリアライズ専用の内部 DTO

pub mod agent;
pub mod secrets;
mod dto;

pub use agent::{
    AgentConfig, CheckpointBackend, CheckpointSettings, LogFormat, LoggingSettings, ModelSettings,
    ModelTier, RunSettings, SearchSettings, SecretsSettings,
};
pub use secrets::Secrets;
