//! エージェント設定の読み込みと管理を行うモジュール
//!
//! # 責務
//!
//! このモジュールは、エッセイ執筆エージェントの実行設定を TOML 形式で定義し、
//! それを Rust の型として扱うための機能を提供します。
//!
//! ## 主な機能
//!
//! - **TOML パース**: 設定ファイルを読み込み、[`AgentConfig`] にデシリアライズ
//! - **既定値の補完**: 省略されたセクション・キーを元の実行環境と同じ値で補う
//!   （gpt-4o, temperature 0, 3クエリ × 3件, max_revision 2）
//! - **バリデーション**: 範囲外の値を [`ConfigError::Validation`] として拒否
//!
//! ## 使用例
//!
//! ```toml
//! [model]
//! tier = "medium"
//! temperature = 0.0
//!
//! [search]
//! max_queries = 3
//! max_results = 3
//!
//! [run]
//! max_revision = 2
//!
//! [checkpoint]
//! backend = "file"
//! path = ".essay-writer/checkpoints"
//! ```
//!
//! ## 関連モジュール
//!
//! - [`crate::provider::model_tier`]: ティアからモデル名への解決
//! - [`crate::engine::executor`]: ワークフローの実行エンジン

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::dto::{
    AgentConfigDto, CheckpointDto, LoggingDto, ModelDto, RunDto, SearchDto, SecretsDto,
};
use crate::error::ConfigError;
use crate::engine::steps::MAX_QUERIES;
use crate::provider::model_tier::resolve_model;

const DEFAULT_MODEL_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_SEARCH_BASE_URL: &str = "https://api.tavily.com";
const DEFAULT_MODEL_TIMEOUT_SECS: u64 = 120;
const DEFAULT_SEARCH_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_RESULTS: u32 = 3;
const DEFAULT_MAX_REVISION: u32 = 2;
const DEFAULT_STEP_LIMIT: usize = 25;
const DEFAULT_CHECKPOINT_PATH: &str = ".essay-writer/checkpoints";
const DEFAULT_SECRETS_PATH: &str = "~/secrets.json";

/// Tavily が受け付ける1クエリあたりの最大件数
const MAX_RESULTS_UPPER_BOUND: u32 = 20;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// モデルのティア（Heavy/Medium/Light）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelTier {
    /// 複雑な推論タスク用
    Heavy,
    /// 一般的なタスク用
    #[default]
    Medium,
    /// 簡単なタスク用
    Light,
}

/// チェックポイントの保存先
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckpointBackend {
    /// プロセス内メモリ（プロセス終了で消える）
    Memory,
    /// ディレクトリ配下の JSON ファイル
    #[default]
    File,
}

/// ログの出力形式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// 人間向けの整形出力
    #[default]
    Pretty,
    /// 1行1イベントの JSON
    Json,
}

/// テキスト生成モデルの設定
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSettings {
    /// モデルティア（`name` 未指定時に使用）
    pub tier: ModelTier,
    /// 明示的なモデル名（ティアより優先）
    pub name: Option<String>,
    /// サンプリング温度
    pub temperature: f32,
    /// OpenAI 互換 API のベースURL
    pub base_url: String,
    /// HTTP リクエストのタイムアウト（秒）
    pub timeout_secs: u64,
}

impl ModelSettings {
    /// 実際に使用するモデル名
    pub fn model_name(&self) -> &str {
        self.name
            .as_deref()
            .unwrap_or_else(|| resolve_model(&self.tier))
    }
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            tier: ModelTier::default(),
            name: None,
            temperature: 0.0,
            base_url: DEFAULT_MODEL_BASE_URL.to_string(),
            timeout_secs: DEFAULT_MODEL_TIMEOUT_SECS,
        }
    }
}

/// 検索の設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchSettings {
    /// 1回のリサーチで使用するクエリ数の上限（1〜3）
    pub max_queries: usize,
    /// 1クエリあたりの取得件数
    pub max_results: u32,
    /// 検索 API のベースURL
    pub base_url: String,
    /// HTTP リクエストのタイムアウト（秒）
    pub timeout_secs: u64,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            max_queries: MAX_QUERIES,
            max_results: DEFAULT_MAX_RESULTS,
            base_url: DEFAULT_SEARCH_BASE_URL.to_string(),
            timeout_secs: DEFAULT_SEARCH_TIMEOUT_SECS,
        }
    }
}

/// 実行制御の設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSettings {
    /// 改訂回数の上限（新規実行時の既定値）
    pub max_revision: u32,
    /// 1回の実行で進めるステップ数の上限
    pub step_limit: usize,
    /// ステップ単位のタイムアウト（秒）
    pub step_timeout_secs: Option<u64>,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            max_revision: DEFAULT_MAX_REVISION,
            step_limit: DEFAULT_STEP_LIMIT,
            step_timeout_secs: None,
        }
    }
}

/// チェックポイントストアの設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointSettings {
    pub backend: CheckpointBackend,
    /// `File` バックエンドの保存ディレクトリ
    pub path: PathBuf,
}

impl Default for CheckpointSettings {
    fn default() -> Self {
        Self {
            backend: CheckpointBackend::default(),
            path: PathBuf::from(DEFAULT_CHECKPOINT_PATH),
        }
    }
}

/// シークレットファイルの設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretsSettings {
    /// `~/` で始まる場合はホームディレクトリを基準に解決する
    pub path: PathBuf,
}

impl SecretsSettings {
    /// `~/` を展開した実パス
    pub fn resolved_path(&self) -> PathBuf {
        expand_home(&self.path)
    }
}

impl Default for SecretsSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_SECRETS_PATH),
        }
    }
}

/// ログの設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingSettings {
    /// `trace` / `debug` / `info` / `warn` / `error`
    pub level: String,
    pub format: LogFormat,
    /// 指定時は日次ローテーションのファイルにも出力する
    pub directory: Option<PathBuf>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
            directory: None,
        }
    }
}

/// エージェント設定（ドメインモデル）
///
/// バリデーション済みの状態を保証します。
///
/// ## DTO との違い
///
/// - [`AgentConfigDto`]: TOML デシリアライズ専用、バリデーション前の生データ
/// - [`AgentConfig`]: バリデーション済み、既定値で補完済み
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AgentConfig {
    model: ModelSettings,
    search: SearchSettings,
    run: RunSettings,
    checkpoint: CheckpointSettings,
    secrets: SecretsSettings,
    logging: LoggingSettings,
}

impl AgentConfig {
    /// TOML ファイルから設定を読み込む
    ///
    /// # 処理フロー
    ///
    /// 1. ファイル読み込み
    /// 2. TOML デシリアライズ → [`AgentConfigDto`]
    /// 3. バリデーション & 変換 → [`AgentConfig`]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    /// TOML 文字列から設定を読み込む
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        let dto: AgentConfigDto = toml::from_str(toml)?;
        Self::try_from(dto)
    }

    /// 設定を TOML 文字列に変換
    pub fn to_string(&self) -> Result<String, ConfigError> {
        let dto = AgentConfigDto::from(self.clone());
        Ok(toml::to_string(&dto)?)
    }

    /// 設定を TOML ファイルに保存
    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let text = self.to_string()?;
        std::fs::write(path, text)?;
        Ok(())
    }

    pub fn model(&self) -> &ModelSettings {
        &self.model
    }

    pub fn search(&self) -> &SearchSettings {
        &self.search
    }

    pub fn run(&self) -> &RunSettings {
        &self.run
    }

    pub fn checkpoint(&self) -> &CheckpointSettings {
        &self.checkpoint
    }

    pub fn secrets(&self) -> &SecretsSettings {
        &self.secrets
    }

    pub fn logging(&self) -> &LoggingSettings {
        &self.logging
    }

    /// CLI 引数による上書き用
    pub fn run_mut(&mut self) -> &mut RunSettings {
        &mut self.run
    }

    /// CLI 引数による上書き用
    pub fn checkpoint_mut(&mut self) -> &mut CheckpointSettings {
        &mut self.checkpoint
    }

    /// CLI 引数による上書き用
    pub fn logging_mut(&mut self) -> &mut LoggingSettings {
        &mut self.logging
    }
}

/// DTO からドメインモデルへの変換（読み込み方向）
///
/// 省略値を既定値で補い、範囲外の値は [`ConfigError::Validation`] を返します。
impl TryFrom<AgentConfigDto> for AgentConfig {
    type Error = ConfigError;

    fn try_from(dto: AgentConfigDto) -> Result<Self, Self::Error> {
        let model_defaults = ModelSettings::default();
        let model = ModelSettings {
            tier: dto.model.tier.unwrap_or(model_defaults.tier),
            name: dto.model.name,
            temperature: dto.model.temperature.unwrap_or(model_defaults.temperature),
            base_url: dto.model.base_url.unwrap_or(model_defaults.base_url),
            timeout_secs: dto.model.timeout_secs.unwrap_or(model_defaults.timeout_secs),
        };
        if !(0.0..=2.0).contains(&model.temperature) {
            return Err(ConfigError::Validation(format!(
                "model.temperature は 0.0〜2.0 の範囲で指定してください: {}",
                model.temperature
            )));
        }
        if matches!(&model.name, Some(name) if name.trim().is_empty()) {
            return Err(ConfigError::Validation("model.name が空です".to_string()));
        }
        require_non_empty("model.base_url", &model.base_url)?;
        require_positive("model.timeout_secs", model.timeout_secs)?;

        let search_defaults = SearchSettings::default();
        let search = SearchSettings {
            max_queries: dto.search.max_queries.unwrap_or(search_defaults.max_queries),
            max_results: dto.search.max_results.unwrap_or(search_defaults.max_results),
            base_url: dto.search.base_url.unwrap_or(search_defaults.base_url),
            timeout_secs: dto.search.timeout_secs.unwrap_or(search_defaults.timeout_secs),
        };
        if !(1..=MAX_QUERIES).contains(&search.max_queries) {
            return Err(ConfigError::Validation(format!(
                "search.max_queries は 1〜{} の範囲で指定してください: {}",
                MAX_QUERIES, search.max_queries
            )));
        }
        if !(1..=MAX_RESULTS_UPPER_BOUND).contains(&search.max_results) {
            return Err(ConfigError::Validation(format!(
                "search.max_results は 1〜{} の範囲で指定してください: {}",
                MAX_RESULTS_UPPER_BOUND, search.max_results
            )));
        }
        require_non_empty("search.base_url", &search.base_url)?;
        require_positive("search.timeout_secs", search.timeout_secs)?;

        let run_defaults = RunSettings::default();
        let run = RunSettings {
            max_revision: dto.run.max_revision.unwrap_or(run_defaults.max_revision),
            step_limit: dto.run.step_limit.unwrap_or(run_defaults.step_limit),
            step_timeout_secs: dto.run.step_timeout_secs,
        };
        if run.step_limit == 0 {
            return Err(ConfigError::Validation(
                "run.step_limit は 1 以上で指定してください".to_string(),
            ));
        }
        if let Some(secs) = run.step_timeout_secs {
            require_positive("run.step_timeout_secs", secs)?;
        }

        let checkpoint_defaults = CheckpointSettings::default();
        let checkpoint = CheckpointSettings {
            backend: dto.checkpoint.backend.unwrap_or(checkpoint_defaults.backend),
            path: dto.checkpoint.path.unwrap_or(checkpoint_defaults.path),
        };

        let secrets = SecretsSettings {
            path: dto.secrets.path.unwrap_or_else(|| SecretsSettings::default().path),
        };

        let logging_defaults = LoggingSettings::default();
        let logging = LoggingSettings {
            level: dto
                .logging
                .level
                .map(|level| level.to_lowercase())
                .unwrap_or(logging_defaults.level),
            format: dto.logging.format.unwrap_or(logging_defaults.format),
            directory: dto.logging.directory,
        };
        if !LOG_LEVELS.contains(&logging.level.as_str()) {
            return Err(ConfigError::Validation(format!(
                "logging.level が不正です: {}",
                logging.level
            )));
        }

        Ok(Self {
            model,
            search,
            run,
            checkpoint,
            secrets,
            logging,
        })
    }
}

/// ドメインモデルから DTO への変換（書き込み方向）
///
/// バリデーション済みのドメインモデルから DTO を生成するため、
/// この変換は失敗しません（`From` トレイトを使用）。
impl From<AgentConfig> for AgentConfigDto {
    fn from(config: AgentConfig) -> Self {
        Self {
            model: ModelDto {
                tier: Some(config.model.tier),
                name: config.model.name,
                temperature: Some(config.model.temperature),
                base_url: Some(config.model.base_url),
                timeout_secs: Some(config.model.timeout_secs),
            },
            search: SearchDto {
                max_queries: Some(config.search.max_queries),
                max_results: Some(config.search.max_results),
                base_url: Some(config.search.base_url),
                timeout_secs: Some(config.search.timeout_secs),
            },
            run: RunDto {
                max_revision: Some(config.run.max_revision),
                step_limit: Some(config.run.step_limit),
                step_timeout_secs: config.run.step_timeout_secs,
            },
            checkpoint: CheckpointDto {
                backend: Some(config.checkpoint.backend),
                path: Some(config.checkpoint.path),
            },
            secrets: SecretsDto {
                path: Some(config.secrets.path),
            },
            logging: LoggingDto {
                level: Some(config.logging.level),
                format: Some(config.logging.format),
                directory: config.logging.directory,
            },
        }
    }
}

fn require_non_empty(key: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Validation(format!("{key} が空です")));
    }
    Ok(())
}

fn require_positive(key: &str, value: u64) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::Validation(format!(
            "{key} は 1 以上で指定してください"
        )));
    }
    Ok(())
}

/// 先頭の `~/` をホームディレクトリに置き換える
fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), std::env::var_os("HOME")) {
        (Ok(rest), Some(home)) => PathBuf::from(home).join(rest),
        _ => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = AgentConfig::from_toml("").unwrap();

        assert_eq!(config, AgentConfig::default());
        assert_eq!(config.model().model_name(), "gpt-4o");
        assert_eq!(config.model().temperature, 0.0);
        assert_eq!(config.search().max_queries, 3);
        assert_eq!(config.search().max_results, 3);
        assert_eq!(config.run().max_revision, 2);
        assert_eq!(config.run().step_limit, 25);
        assert_eq!(config.checkpoint().backend, CheckpointBackend::File);
    }

    #[test]
    fn test_explicit_model_name_overrides_tier() {
        let config = AgentConfig::from_toml(
            "[model]\n\
             tier = \"light\"\n\
             name = \"my-local-model\"\n",
        )
        .unwrap();

        assert_eq!(config.model().tier, ModelTier::Light);
        assert_eq!(config.model().model_name(), "my-local-model");
    }

    #[test]
    fn test_tier_resolves_model_name() {
        let config = AgentConfig::from_toml("[model]\ntier = \"light\"\n").unwrap();
        assert_eq!(config.model().model_name(), "gpt-4o-mini");
    }

    #[test]
    fn test_max_revision_zero_is_accepted() {
        // 0 は「最初の生成で終了」を意味する正当な値
        let config = AgentConfig::from_toml("[run]\nmax_revision = 0\n").unwrap();
        assert_eq!(config.run().max_revision, 0);
    }

    #[test]
    fn test_validation_rejects_out_of_range_values() {
        let cases = [
            "[model]\ntemperature = 3.5\n",
            "[model]\nname = \"  \"\n",
            "[model]\ntimeout_secs = 0\n",
            "[search]\nmax_queries = 0\n",
            "[search]\nmax_queries = 4\n",
            "[search]\nmax_results = 0\n",
            "[search]\nmax_results = 21\n",
            "[run]\nstep_limit = 0\n",
            "[run]\nstep_timeout_secs = 0\n",
            "[logging]\nlevel = \"loud\"\n",
        ];

        for toml in cases {
            let result = AgentConfig::from_toml(toml);
            assert!(
                matches!(result, Err(ConfigError::Validation(_))),
                "expected validation error for {toml:?}, got {result:?}"
            );
        }
    }

    #[test]
    fn test_max_queries_above_cap_is_rejected() {
        let result = AgentConfig::from_toml("[search]\nmax_queries = 10\n");
        match result {
            Err(ConfigError::Validation(message)) => assert!(message.contains("max_queries")),
            other => panic!("Expected Validation error, got {other:?}"),
        }

        let config = AgentConfig::from_toml("[search]\nmax_queries = 2\n").unwrap();
        assert_eq!(config.search().max_queries, 2);
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let result = AgentConfig::from_toml("[model]\nmodle = \"typo\"\n");
        assert!(matches!(result, Err(ConfigError::TomlDeserialize(_))));
    }

    #[test]
    fn test_logging_level_is_normalized() {
        let config = AgentConfig::from_toml("[logging]\nlevel = \"DEBUG\"\nformat = \"json\"\n")
            .unwrap();
        assert_eq!(config.logging().level, "debug");
        assert_eq!(config.logging().format, LogFormat::Json);
    }

    #[test]
    fn test_roundtrip_through_toml() {
        let original = AgentConfig::from_toml(
            "[model]\n\
             tier = \"heavy\"\n\
             temperature = 0.5\n\n\
             [run]\n\
             max_revision = 4\n\
             step_timeout_secs = 90\n\n\
             [checkpoint]\n\
             backend = \"memory\"\n",
        )
        .unwrap();

        let text = original.to_string().unwrap();
        let restored = AgentConfig::from_toml(&text).unwrap();

        assert_eq!(restored, original);
    }

    #[test]
    fn test_to_file_and_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agent.toml");

        let config = AgentConfig::default();
        config.to_file(&path).unwrap();

        assert_eq!(AgentConfig::from_file(&path).unwrap(), config);
    }

    #[test]
    fn test_from_file_missing() {
        let result = AgentConfig::from_file("/nonexistent/agent.toml");
        assert!(matches!(result, Err(ConfigError::FileRead(_))));
    }

    #[test]
    fn test_expand_home_leaves_relative_paths() {
        assert_eq!(
            expand_home(Path::new("secrets/keys.json")),
            PathBuf::from("secrets/keys.json")
        );
    }
}
