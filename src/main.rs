use anyhow::Result;
use std::io::{self, Write};
use std::time::Duration;

use pushup_tracker::config::Config;
use pushup_tracker::counter::{RepCounter, TrackerUpdate};
use pushup_tracker::pose::{Landmark, LandmarkIndex, LandmarkSet};

const CONFIG_PATH: &str = "tracker.toml";

/// 両肘が指定角度になる合成ランドマークを作る
fn synthetic_arms(elbow_angle_deg: f32) -> LandmarkSet {
    let rad = elbow_angle_deg.to_radians();
    // 肩(0,0) - 肘(10,0)。腰を肘から角度radの方向に置く
    let hip = Landmark::new(10.0 - 10.0 * rad.cos(), -10.0 * rad.sin());

    let mut points = vec![None; LandmarkIndex::COUNT];
    points[LandmarkIndex::LeftShoulder as usize] = Some(Landmark::new(0.0, 0.0));
    points[LandmarkIndex::LeftElbow as usize] = Some(Landmark::new(10.0, 0.0));
    points[LandmarkIndex::LeftHip as usize] = Some(hip);
    points[LandmarkIndex::RightShoulder as usize] = Some(Landmark::new(100.0, 0.0));
    points[LandmarkIndex::RightElbow as usize] = Some(Landmark::new(110.0, 0.0));
    points[LandmarkIndex::RightHip as usize] = Some(Landmark::new(100.0 + hip.x, hip.y));
    LandmarkSet::new(points)
}

fn print_update(update: &TrackerUpdate, counter: &RepCounter, now: Duration) {
    println!(
        "  t={:.1}s  count={}  set={}  position={:?}  calibration_remaining={}",
        now.as_secs_f32(),
        update.pushup_count,
        update.set_count,
        counter.position(),
        update.calibration_remaining,
    );
    if !update.feedback.is_empty() {
        println!("  feedback: {}", update.feedback);
    }
}

fn main() -> Result<()> {
    let config = Config::load_or_default(CONFIG_PATH);

    println!("=== Pushup Tracker - カウンタ対話テスト ===");
    println!(
        "しきい値: {}度 / デバウンス: {}秒 / セット: {}回 / キャリブレーション: {}秒",
        config.tracker.threshold_angle,
        config.tracker.min_rep_interval_s,
        config.tracker.set_size,
        config.tracker.calibration_window_s,
    );
    println!();
    println!("コマンド:");
    println!("  d             - 屈曲フレーム (両肘45度)");
    println!("  u             - 伸展フレーム (両肘170度)");
    println!("  a deg         - 任意角度フレーム (例: a 60)");
    println!("  n             - 検出なしフレーム");
    println!("  w secs        - 時計を進める (例: w 1.5)");
    println!("  q             - 終了");
    println!();

    let mut now = Duration::ZERO;
    let mut counter = RepCounter::new(&config.tracker, now);
    // フレームごとに仮想時計を進める
    let frame_step = Duration::from_millis(100);

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        let parts: Vec<&str> = input.trim().split_whitespace().collect();

        if parts.is_empty() {
            continue;
        }

        match parts[0] {
            "d" => {
                now += frame_step;
                let update = counter.update(Some(&synthetic_arms(45.0)), now);
                print_update(&update, &counter, now);
            }
            "u" => {
                now += frame_step;
                let update = counter.update(Some(&synthetic_arms(170.0)), now);
                print_update(&update, &counter, now);
            }
            "a" if parts.len() == 2 => {
                let deg: f32 = parts[1].parse()?;
                now += frame_step;
                let update = counter.update(Some(&synthetic_arms(deg)), now);
                print_update(&update, &counter, now);
            }
            "n" => {
                now += frame_step;
                let update = counter.update(None, now);
                print_update(&update, &counter, now);
            }
            "w" if parts.len() == 2 => {
                let secs: f64 = parts[1].parse()?;
                now += Duration::from_secs_f64(secs);
                println!("t={:.1}s", now.as_secs_f32());
            }
            "q" => {
                println!(
                    "終了します (count={}, set={}, position={:?})",
                    counter.pushup_count(),
                    counter.set_count(),
                    counter.position()
                );
                break;
            }
            _ => {
                println!("不明なコマンド: {}", parts[0]);
            }
        }
    }

    Ok(())
}
