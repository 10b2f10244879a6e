use std::time::Duration;

use crate::config::TrackerConfig;
use crate::counter::{RepCounter, TrackerUpdate};
use crate::pose::{LandmarkSet, PoseProvider};
use crate::protocol::Frame;

/// フレーム→検出→カウンタ更新のセッション内パイプライン
///
/// プロバイダはセッションごとに注入する。検出器のエラーは「検出なし」に
/// 落としてセッションを継続する（カウンタ側で欠損フレーム扱い）。
pub struct FrameOrchestrator<P: PoseProvider> {
    provider: P,
    counter: RepCounter,
    detect_failures: u64,
}

impl<P: PoseProvider> FrameOrchestrator<P> {
    pub fn new(provider: P, config: &TrackerConfig, now: Duration) -> Self {
        Self {
            provider,
            counter: RepCounter::new(config, now),
            detect_failures: 0,
        }
    }

    /// 1フレームを処理して結果を返す。失敗してもセッションは壊さない
    pub fn process_frame(&mut self, frame: &Frame, now: Duration) -> TrackerUpdate {
        let detection = match self.provider.detect(frame) {
            Ok(detection) => detection,
            Err(_) => {
                self.detect_failures += 1;
                None
            }
        };
        self.counter.update(detection.as_ref(), now)
    }

    /// クライアント側で検出済みのランドマークを直接流し込む
    pub fn process_detection(
        &mut self,
        detection: Option<&LandmarkSet>,
        now: Duration,
    ) -> TrackerUpdate {
        self.counter.update(detection, now)
    }

    pub fn counter(&self) -> &RepCounter {
        &self.counter
    }

    /// 検出器エラーの累計（ログ用）
    pub fn detect_failures(&self) -> u64 {
        self.detect_failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::{Landmark, LandmarkIndex, ScriptedProvider};

    fn t(secs: f64) -> Duration {
        Duration::from_secs_f64(secs)
    }

    fn frame(timestamp_us: u64) -> Frame {
        Frame {
            timestamp_us,
            width: 640,
            height: 480,
            jpeg_data: Vec::new(),
        }
    }

    fn arms(elbow_angle_bent: bool) -> LandmarkSet {
        let hip_x = if elbow_angle_bent { 5.0 } else { 30.0 };
        let hip_y = if elbow_angle_bent { -5.0 } else { -2.0 };
        let mut all = vec![None; LandmarkIndex::COUNT];
        all[11] = Some(Landmark::new(0.0, 0.0));
        all[12] = Some(Landmark::new(100.0, 0.0));
        all[13] = Some(Landmark::new(10.0, 0.0));
        all[14] = Some(Landmark::new(110.0, 0.0));
        all[23] = Some(Landmark::new(hip_x, hip_y));
        all[24] = Some(Landmark::new(100.0 + hip_x, hip_y));
        LandmarkSet::new(all)
    }

    #[test]
    fn test_orchestrator_counts_with_scripted_provider() {
        // キャリブレーション後: 屈曲→伸展→屈曲で2レップ
        let provider = ScriptedProvider::new(vec![
            Some(arms(true)),
            Some(arms(false)),
            Some(arms(true)),
        ]);
        let config = TrackerConfig {
            calibration_window_s: 0.0,
            ..TrackerConfig::default()
        };
        let mut orchestrator = FrameOrchestrator::new(provider, &config, t(0.0));

        let update = orchestrator.process_frame(&frame(0), t(2.0));
        assert_eq!(update.pushup_count, 1);
        orchestrator.process_frame(&frame(1), t(2.5));
        let update = orchestrator.process_frame(&frame(2), t(4.0));
        assert_eq!(update.pushup_count, 2);
    }

    #[test]
    fn test_orchestrator_provider_error_is_skipped_frame() {
        let mut provider = ScriptedProvider::new(vec![Some(arms(true))]);
        provider.push_error("backend crashed");
        provider.push(Some(arms(true)));
        let config = TrackerConfig {
            calibration_window_s: 0.0,
            ..TrackerConfig::default()
        };
        let mut orchestrator = FrameOrchestrator::new(provider, &config, t(0.0));

        let update = orchestrator.process_frame(&frame(0), t(2.0));
        assert_eq!(update.pushup_count, 1);

        // エラーは欠損フレーム扱い: カウントも状態も保持
        let update = orchestrator.process_frame(&frame(1), t(2.6));
        assert_eq!(update.pushup_count, 1);
        assert!(update.landmarks.is_empty());
        assert_eq!(orchestrator.detect_failures(), 1);

        // DOWNのままなので連続屈曲では増えない
        let update = orchestrator.process_frame(&frame(2), t(4.5));
        assert_eq!(update.pushup_count, 1);
    }

    #[test]
    fn test_orchestrator_direct_detection_path() {
        let provider = ScriptedProvider::new(vec![]);
        let mut orchestrator =
            FrameOrchestrator::new(provider, &TrackerConfig::default(), t(0.0));

        let update = orchestrator.process_detection(Some(&arms(true)), t(1.0));
        assert_eq!(update.calibration_remaining, 4);
        assert_eq!(update.pushup_count, 0);

        orchestrator.process_detection(None, t(5.0));
        let update = orchestrator.process_detection(Some(&arms(true)), t(5.2));
        assert_eq!(update.pushup_count, 1);
    }
}
