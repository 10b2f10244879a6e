use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::angle::joint_angle;
use crate::config::TrackerConfig;
use crate::pose::{Landmark, LandmarkIndex, LandmarkSet};

/// カウントに使う6ランドマーク（この順でクライアントへ返す）
pub const TRACKED_LANDMARKS: [LandmarkIndex; 6] = [
    LandmarkIndex::LeftShoulder,
    LandmarkIndex::RightShoulder,
    LandmarkIndex::LeftElbow,
    LandmarkIndex::RightElbow,
    LandmarkIndex::LeftHip,
    LandmarkIndex::RightHip,
];

/// レップサイクルの現在フェーズ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    Up,
    Down,
}

/// 1フレームの評価で発生したイベント
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepEvent {
    /// レップ1回をカウント
    Rep,
    /// レップカウントと同時にセット完了
    SetComplete,
}

/// クライアントへ返すフレームごとの結果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerUpdate {
    pub pushup_count: u32,
    pub set_count: u32,
    pub feedback: String,
    /// 追跡6点の [x, y]（欠損フレームは空）。描画用で内部状態ではない
    pub landmarks: Vec<[f32; 2]>,
    /// キャリブレーション残り秒数（完了後は0）
    pub calibration_remaining: u32,
}

/// プッシュアップ回数カウンタ（セッションごとに1つ）
///
/// 状態機械は UP/DOWN の2状態。両肘角度がしきい値を下回った瞬間
/// （UP→DOWN遷移）にカウントする。DOWNで数える挙動は意図的な設計で、
/// 伸展復帰を待たない分、1サイクルにつき必ず1回で確定する。
///
/// 時刻は呼び出し側が単調クロックから与える（セッション開始からではなく
/// 任意原点からの経過時間）。フレーム間隔の不均一は許容する。
pub struct RepCounter {
    threshold_angle: f32,
    min_rep_interval: Duration,
    calibration_window: Duration,
    set_size: u32,

    pushup_count: u32,
    set_count: u32,
    reps_in_current_set: u32,
    position: Position,
    /// 最後にカウントした時刻。原点初期値のため初回のデバウンスは
    /// 自明に通る（元実装の初期条件を踏襲）
    last_rep_at: Duration,
    session_start: Duration,
    calibration_done: bool,
}

impl RepCounter {
    pub fn new(config: &TrackerConfig, now: Duration) -> Self {
        Self {
            threshold_angle: config.threshold_angle,
            min_rep_interval: Duration::from_secs_f32(config.min_rep_interval_s),
            calibration_window: Duration::from_secs_f32(config.calibration_window_s),
            set_size: config.set_size,
            pushup_count: 0,
            set_count: 0,
            reps_in_current_set: 0,
            position: Position::Up,
            last_rep_at: Duration::ZERO,
            session_start: now,
            calibration_done: false,
        }
    }

    pub fn pushup_count(&self) -> u32 {
        self.pushup_count
    }

    pub fn set_count(&self) -> u32 {
        self.set_count
    }

    pub fn reps_in_current_set(&self) -> u32 {
        self.reps_in_current_set
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn calibration_done(&self) -> bool {
        self.calibration_done
    }

    /// 1フレーム分の検出結果を処理する
    ///
    /// `detection` が `None` のフレーム（検出失敗）と必須ランドマークの
    /// 欠損フレームは評価をスキップし、状態とカウントをそのまま保持する。
    /// どんな入力でも必ず整形済みの結果を返す。
    pub fn update(&mut self, detection: Option<&LandmarkSet>, now: Duration) -> TrackerUpdate {
        let mut update = TrackerUpdate {
            pushup_count: self.pushup_count,
            set_count: self.set_count,
            feedback: String::new(),
            landmarks: Vec::new(),
            calibration_remaining: 0,
        };

        if !self.calibration_done {
            let elapsed = now.saturating_sub(self.session_start);
            if elapsed < self.calibration_window {
                let remaining = (self.calibration_window - elapsed).as_secs_f32();
                update.calibration_remaining = remaining.floor() as u32;
                update.feedback = format!("Adjust position: {}s", remaining.ceil() as u32);
                if let Some(set) = detection {
                    // 位置合わせ用に取得できた点だけ返す
                    update.landmarks = TRACKED_LANDMARKS
                        .iter()
                        .filter_map(|&idx| set.get(idx))
                        .map(|lm| [lm.x, lm.y])
                        .collect();
                }
                return update;
            }
            // 完了フレームから即座に評価を始める
            self.calibration_done = true;
            update.feedback = "Start doing push-ups!".to_string();
        }

        let Some(set) = detection else {
            return update;
        };
        let Some(points) = self.required_landmarks(set) else {
            return update;
        };
        let [shoulder_l, shoulder_r, elbow_l, elbow_r, hip_l, hip_r] = points;

        let left_angle = joint_angle(shoulder_l, elbow_l, hip_l);
        let right_angle = joint_angle(shoulder_r, elbow_r, hip_r);

        if let Some(event) = self.evaluate(left_angle, right_angle, now) {
            update.feedback = match event {
                RepEvent::Rep => "Good pushup!".to_string(),
                RepEvent::SetComplete => "Set complete! Rest now.".to_string(),
            };
        }

        update.pushup_count = self.pushup_count;
        update.set_count = self.set_count;
        update.landmarks = points.iter().map(|lm| [lm.x, lm.y]).collect();
        update
    }

    /// 状態遷移の本体。角度と時刻だけで決まり、検出器にもソケットにも
    /// 依存しない
    ///
    /// 規則（この順で評価）:
    /// 1. 両角度 < しきい値: UPかつデバウンス経過ならカウントしてDOWNへ
    /// 2. 両角度 > しきい値: 無条件にUPへ（副作用なし）
    /// 3. 片側のみ（遮蔽等のノイズ）: 遷移しない
    pub fn evaluate(&mut self, left_angle: f32, right_angle: f32, now: Duration) -> Option<RepEvent> {
        if left_angle < self.threshold_angle && right_angle < self.threshold_angle {
            let since_last = now.saturating_sub(self.last_rep_at);
            if self.position == Position::Up && since_last > self.min_rep_interval {
                self.pushup_count += 1;
                self.reps_in_current_set += 1;
                self.position = Position::Down;
                self.last_rep_at = now;
                if self.reps_in_current_set >= self.set_size {
                    self.set_count += 1;
                    self.reps_in_current_set = 0;
                    return Some(RepEvent::SetComplete);
                }
                return Some(RepEvent::Rep);
            }
            None
        } else if left_angle > self.threshold_angle && right_angle > self.threshold_angle {
            self.position = Position::Up;
            None
        } else {
            None
        }
    }

    fn required_landmarks(&self, set: &LandmarkSet) -> Option<[Landmark; 6]> {
        Some([
            set.get(LandmarkIndex::LeftShoulder)?,
            set.get(LandmarkIndex::RightShoulder)?,
            set.get(LandmarkIndex::LeftElbow)?,
            set.get(LandmarkIndex::RightElbow)?,
            set.get(LandmarkIndex::LeftHip)?,
            set.get(LandmarkIndex::RightHip)?,
        ])
    }
}
