//! モデルティアマッピング
//!
//! # 責務
//!
//! - [`ModelTier`] から実際のモデル名を解決
//! - モデル名定数を管理
//!
//! # マッピング表
//!
//! | Tier   | Model       |
//! |--------|-------------|
//! | Heavy  | o1          |
//! | Medium | gpt-4o      |
//! | Light  | gpt-4o-mini |
//!
//! 設定ファイルで `model.name` を明示した場合はこの表を使いません。
//!
//! # 使用例
//!
//! ```rust
//! use essay_writer::provider::model_tier::resolve_model;
//! use essay_writer::config::ModelTier;
//!
//! assert_eq!(resolve_model(&ModelTier::Medium), "gpt-4o");
//! ```

use crate::config::ModelTier;

const HEAVY_MODEL: &str = "o1";
const MEDIUM_MODEL: &str = "gpt-4o";
const LIGHT_MODEL: &str = "gpt-4o-mini";

/// モデルティアから実際のモデル名を解決する
pub fn resolve_model(tier: &ModelTier) -> &'static str {
    match tier {
        ModelTier::Heavy => HEAVY_MODEL,
        ModelTier::Medium => MEDIUM_MODEL,
        ModelTier::Light => LIGHT_MODEL,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_models() {
        assert_eq!(resolve_model(&ModelTier::Heavy), "o1");
        assert_eq!(resolve_model(&ModelTier::Medium), "gpt-4o");
        assert_eq!(resolve_model(&ModelTier::Light), "gpt-4o-mini");
    }

    #[test]
    fn test_default_tier_matches_writer_model() {
        assert_eq!(resolve_model(&ModelTier::default()), "gpt-4o");
    }
}
