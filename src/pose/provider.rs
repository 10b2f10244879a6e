use anyhow::Result;
use std::collections::VecDeque;

use super::landmark::LandmarkSet;
use crate::protocol::Frame;

/// 姿勢ランドマーク供給インターフェース
///
/// 検出本体（MediaPipe等）は外部コラボレータ。セッションごとに注入され、
/// プロセス全体で共有されることはない。
///
/// 戻り値:
/// - `Ok(Some(set))` — 検出成功
/// - `Ok(None)` — フレーム内に人物が見つからない（正常系）
/// - `Err(_)` — 検出器自体の失敗。呼び出し側は欠損フレームとして扱う
pub trait PoseProvider {
    fn detect(&mut self, frame: &Frame) -> Result<Option<LandmarkSet>>;
}

/// 事前記録された検出結果を順に返すプロバイダ
///
/// リプレイとテスト用。キューが尽きたら検出なし扱い。
pub struct ScriptedProvider {
    queue: VecDeque<Result<Option<LandmarkSet>>>,
}

impl ScriptedProvider {
    pub fn new(detections: Vec<Option<LandmarkSet>>) -> Self {
        Self {
            queue: detections.into_iter().map(Ok).collect(),
        }
    }

    /// 検出器エラーをシナリオに差し込む
    pub fn push_error(&mut self, message: &str) {
        self.queue.push_back(Err(anyhow::anyhow!("{}", message)));
    }

    pub fn push(&mut self, detection: Option<LandmarkSet>) {
        self.queue.push_back(Ok(detection));
    }
}

impl PoseProvider for ScriptedProvider {
    fn detect(&mut self, _frame: &Frame) -> Result<Option<LandmarkSet>> {
        self.queue.pop_front().unwrap_or(Ok(None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::landmark::{Landmark, LandmarkIndex};

    fn dummy_frame() -> Frame {
        Frame {
            timestamp_us: 0,
            width: 640,
            height: 480,
            jpeg_data: Vec::new(),
        }
    }

    #[test]
    fn test_scripted_provider_order() {
        let mut points = vec![None; LandmarkIndex::COUNT];
        points[LandmarkIndex::Nose as usize] = Some(Landmark::new(0.5, 0.5));
        let mut provider =
            ScriptedProvider::new(vec![Some(LandmarkSet::new(points)), None]);

        let first = provider.detect(&dummy_frame()).unwrap();
        assert!(first.is_some());
        let second = provider.detect(&dummy_frame()).unwrap();
        assert!(second.is_none());
        // 尽きた後は検出なし
        let third = provider.detect(&dummy_frame()).unwrap();
        assert!(third.is_none());
    }

    #[test]
    fn test_scripted_provider_error() {
        let mut provider = ScriptedProvider::new(vec![]);
        provider.push_error("backend down");
        assert!(provider.detect(&dummy_frame()).is_err());
    }
}
