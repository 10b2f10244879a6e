use crate::pose::Landmark;

/// 不正入力時の中立角度（度）
///
/// 90度は閾値ちょうどで、屈曲側にも伸展側にも倒れない。
pub const NEUTRAL_ANGLE_DEG: f32 = 90.0;

/// 3点 a-b-c がなす関節角度を度で返す（頂点 b、範囲 [0, 180]）
///
/// atan2差分の絶対値を度に変換し、180度を超える場合は 360 - v で折り返す。
/// 座標に NaN/Inf が含まれる場合は NEUTRAL_ANGLE_DEG を返す（エラーにしない）。
pub fn joint_angle(a: Landmark, b: Landmark, c: Landmark) -> f32 {
    if !a.is_finite() || !b.is_finite() || !c.is_finite() {
        return NEUTRAL_ANGLE_DEG;
    }

    let raw = (c.y - b.y).atan2(c.x - b.x) - (a.y - b.y).atan2(a.x - b.x);
    let deg = raw.to_degrees().abs();
    if deg <= 180.0 {
        deg
    } else {
        360.0 - deg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lm(x: f32, y: f32) -> Landmark {
        Landmark::new(x, y)
    }

    #[test]
    fn test_right_angle() {
        let angle = joint_angle(lm(0.0, 1.0), lm(0.0, 0.0), lm(1.0, 0.0));
        assert!((angle - 90.0).abs() < 0.001);
    }

    #[test]
    fn test_straight_line() {
        let angle = joint_angle(lm(-1.0, 0.0), lm(0.0, 0.0), lm(1.0, 0.0));
        assert!((angle - 180.0).abs() < 0.001);
    }

    #[test]
    fn test_zero_angle() {
        let angle = joint_angle(lm(1.0, 0.0), lm(0.0, 0.0), lm(2.0, 0.0));
        assert!(angle.abs() < 0.001);
    }

    #[test]
    fn test_fold_over_180() {
        // atan2差分が180度を超えるケース: 折り返して [0, 180] に収まる
        let angle = joint_angle(lm(1.0, 0.1), lm(0.0, 0.0), lm(1.0, -0.1));
        assert!(angle >= 0.0 && angle <= 180.0);
        assert!(angle < 90.0);
    }

    #[test]
    fn test_symmetric_outer_points() {
        // 外側2点の入れ替えで角度は不変
        let a = lm(3.0, 7.0);
        let b = lm(1.0, 2.0);
        let c = lm(-4.0, 5.0);
        let forward = joint_angle(a, b, c);
        let reversed = joint_angle(c, b, a);
        assert!((forward - reversed).abs() < 0.001);
    }

    #[test]
    fn test_malformed_input_neutral() {
        let angle = joint_angle(lm(f32::NAN, 1.0), lm(0.0, 0.0), lm(1.0, 0.0));
        assert_eq!(angle, NEUTRAL_ANGLE_DEG);

        let angle = joint_angle(lm(0.0, 1.0), lm(0.0, f32::INFINITY), lm(1.0, 0.0));
        assert_eq!(angle, NEUTRAL_ANGLE_DEG);
    }

    #[test]
    fn test_bent_elbow() {
        // 肩(0,0) - 肘(1,0) - 腰(1,1): 肘で90度
        let angle = joint_angle(lm(0.0, 0.0), lm(1.0, 0.0), lm(1.0, 1.0));
        assert!((angle - 90.0).abs() < 0.001);
    }
}
