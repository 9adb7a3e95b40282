//! シークレット（APIキー等）の読み込み
//!
//! フラットな JSON オブジェクト（`{"OPENAI_API_KEY": "...", "TAVILY_API_KEY": "..."}`）
//! を読み込み、名前で引けるようにします。
//!
//! ファイルが存在しない・壊れている場合は警告ログを出して空の集合として扱います。
//! 起動時には失敗させず、実際に認証情報が必要になった外部呼び出しの時点で
//! `MissingCredentials` として表面化させます。
//!
//! プロセスの環境変数は書き換えず、値を [`Secrets`] として明示的に受け渡します。
//! 見つからない名前は環境変数にフォールバックします。

use std::collections::HashMap;
use std::path::Path;

use tracing::{debug, warn};

/// 読み込み済みのシークレット集合
#[derive(Clone, Default)]
pub struct Secrets {
    values: HashMap<String, String>,
}

impl Secrets {
    /// シークレットファイルを読み込む（失敗しない）
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();

        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "シークレットファイルを読み込めません");
                return Self::default();
            }
        };

        match serde_json::from_str::<HashMap<String, String>>(&text) {
            Ok(values) => {
                debug!(path = %path.display(), count = values.len(), "シークレットを読み込みました");
                Self { values }
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "シークレットファイルの形式が不正です");
                Self::default()
            }
        }
    }

    /// 値を直接指定して生成（テスト・埋め込み用）
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// 名前で値を取得する。ファイルに無ければ環境変数を参照する
    pub fn get(&self, name: &str) -> Option<String> {
        self.values
            .get(name)
            .cloned()
            .or_else(|| std::env::var(name).ok())
            .filter(|value| !value.trim().is_empty())
    }

    /// ファイルから読み込んだ件数
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

// 値をログに出さない
impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&String> = self.values.keys().collect();
        names.sort();
        f.debug_struct("Secrets").field("names", &names).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_valid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secrets.json");
        std::fs::write(
            &path,
            r#"{"ESSAY_TEST_OPENAI_KEY": "sk-test", "ESSAY_TEST_TAVILY_KEY": "tvly-test"}"#,
        )
        .unwrap();

        let secrets = Secrets::load(&path);

        assert_eq!(secrets.len(), 2);
        assert_eq!(secrets.get("ESSAY_TEST_OPENAI_KEY").as_deref(), Some("sk-test"));
        assert_eq!(secrets.get("ESSAY_TEST_TAVILY_KEY").as_deref(), Some("tvly-test"));
    }

    #[test]
    fn test_missing_file_is_not_fatal() {
        let secrets = Secrets::load("/nonexistent/dir/secrets.json");
        assert!(secrets.is_empty());
    }

    #[test]
    fn test_malformed_file_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secrets.json");
        std::fs::write(&path, "OPENAI_API_KEY=sk-test").unwrap();

        let secrets = Secrets::load(&path);
        assert!(secrets.is_empty());
    }

    #[test]
    fn test_blank_value_counts_as_missing() {
        let secrets = Secrets::from_pairs([("ESSAY_TEST_BLANK_KEY", "   ")]);
        assert_eq!(secrets.get("ESSAY_TEST_BLANK_KEY"), None);
    }

    #[test]
    fn test_debug_does_not_print_values() {
        let secrets = Secrets::from_pairs([("ESSAY_TEST_KEY", "super-secret")]);
        let printed = format!("{secrets:?}");

        assert!(printed.contains("ESSAY_TEST_KEY"));
        assert!(!printed.contains("super-secret"));
    }
}
