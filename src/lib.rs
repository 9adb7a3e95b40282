//! エッセイ執筆エージェントのワークフローエンジン
//!
//! 計画、調査、執筆、講評を繰り返し、ドラフト数の上限に達したところで終了します。
//! 各ステップの後に状態をチェックポイントとして保存し、途中から再開できます。
//!
//! # モジュール構成
//!
//! - [`config`][]: TOML 設定とシークレット
//! - [`engine`][]: 状態、遷移グラフ、ステップ、実行エンジン
//! - [`checkpoint`][]: チェックポイントストア
//! - [`provider`][]: テキスト生成サービス
//! - [`search`][]: Web 検索サービス
//! - [`error`][]: 末端のエラー型

pub mod checkpoint;
pub mod config;
pub mod engine;
pub mod error;
pub mod provider;
pub mod search;
