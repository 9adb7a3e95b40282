//! エラー型の定義
//!
//! このモジュールは、essay-writer 全体で使用される末端のエラー型を定義します。
//! ワークフロー実行時のエラー [`ExecutionError`](crate::engine::ExecutionError) は
//! これらを `#[from]` で包んで伝播します。

use thiserror::Error;

/// 設定関連のエラー
#[derive(Debug, Error)]
pub enum ConfigError {
    /// ファイルの読み込みに失敗
    #[error("設定ファイルの読み込みに失敗しました: {0}")]
    FileRead(#[from] std::io::Error),

    /// TOML のデシリアライズに失敗
    #[error("TOML のデシリアライズに失敗しました: {0}")]
    TomlDeserialize(#[from] toml::de::Error),

    /// TOML のシリアライズに失敗
    #[error("TOML のシリアライズに失敗しました: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// バリデーションエラー
    #[error("設定のバリデーションに失敗しました: {0}")]
    Validation(String),
}

/// テキスト生成プロバイダーのエラー
///
/// いずれも外部呼び出しの失敗として扱われ、自動リトライは行いません。
#[derive(Debug, Error)]
pub enum ProviderError {
    /// 認証情報が未設定（シークレット読み込み失敗時は最初の呼び出しでここに到達する）
    #[error("認証情報が設定されていません: {0}")]
    MissingCredentials(String),

    /// 認証失敗
    #[error("認証に失敗しました: {0}")]
    AuthenticationError(String),

    /// レート制限超過
    #[error("レート制限を超えました")]
    RateLimitExceeded,

    /// タイムアウト
    #[error("タイムアウトしました: {0}")]
    Timeout(String),

    /// 接続・送受信エラー
    #[error("ネットワークエラー: {0}")]
    Network(String),

    /// 想定外の HTTP ステータス
    #[error("HTTP エラー ({0}): {1}")]
    HttpError(u16, String),

    /// レスポンスの形式が不正
    #[error("不正なレスポンス: {0}")]
    InvalidResponse(String),
}

/// 検索プロバイダーのエラー
#[derive(Debug, Error)]
pub enum SearchError {
    /// 認証情報が未設定
    #[error("検索の認証情報が設定されていません: {0}")]
    MissingCredentials(String),

    /// 認証失敗
    #[error("検索 API の認証に失敗しました")]
    Unauthorized,

    /// レート制限超過
    #[error("検索 API のレート制限を超えました")]
    RateLimited,

    /// タイムアウト
    #[error("検索リクエストがタイムアウトしました")]
    Timeout,

    /// 接続・送受信エラー
    #[error("検索のネットワークエラー: {0}")]
    Network(String),

    /// 想定外の HTTP ステータス
    #[error("検索 API の HTTP エラー ({0}): {1}")]
    HttpError(u16, String),

    /// レスポンスの形式が不正
    #[error("検索結果のパースに失敗しました: {0}")]
    InvalidResponse(String),
}

/// チェックポイントストアのエラー
#[derive(Debug, Error)]
pub enum CheckpointError {
    /// ファイル I/O の失敗
    #[error("チェックポイントの入出力に失敗しました: {0}")]
    Io(#[from] std::io::Error),

    /// JSON の変換に失敗
    #[error("チェックポイントの変換に失敗しました: {0}")]
    Serialization(#[from] serde_json::Error),

    /// スレッドIDがストアのキーとして使えない
    #[error("不正なスレッドID: '{0}'")]
    InvalidThreadId(String),

    /// 追記のみの履歴に対して古いシーケンスを書き込もうとした
    #[error("スレッド '{thread_id}' のシーケンス {sequence} は最新 {latest} 以下です")]
    SequenceConflict {
        /// 対象スレッド
        thread_id: String,
        /// 書き込もうとしたシーケンス
        sequence: u64,
        /// 既存の最新シーケンス
        latest: u64,
    },
}

/// ワークフローグラフの構築・遷移エラー
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    /// エントリーポイント未設定
    #[error("ワークフローのエントリーポイントが設定されていません")]
    NoEntryPoint,

    /// 出口のエッジがないステップ
    #[error("ステップ '{0}' に遷移先がありません")]
    MissingEdge(String),

    /// グラフに登録されていないステップへの遷移
    #[error("ステップ '{0}' はグラフに登録されていません")]
    UnknownStep(String),
}
