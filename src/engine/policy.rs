//! ドラフト生成後の継続判定

use super::graph::StepName;

/// generate ステップの出口で評価される分岐結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Continuation {
    /// 講評サイクルを続ける
    Continue { next: StepName },
    /// 実行を終了する
    Terminate,
}

/// ドラフト数が上限に達していれば終了、そうでなければ reflect へ進む
///
/// `max_revision` が 0 の場合は最初の generate の直後に終了します。
pub fn decide(revision_number: u32, max_revision: u32) -> Continuation {
    if revision_number >= max_revision {
        Continuation::Terminate
    } else {
        Continuation::Continue {
            next: StepName::Reflect,
        }
    }
}
