use anyhow::Result;
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub tracker: TrackerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// 待ち受けアドレス
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    /// フレーム処理の最小間隔（秒）。これより速い到着は破棄
    #[serde(default = "default_min_frame_interval")]
    pub min_frame_interval_s: f32,
    #[serde(default)]
    pub verbose: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TrackerConfig {
    /// 肘角度のしきい値（度）。両腕がこれを下回ったらDOWN
    #[serde(default = "default_threshold_angle")]
    pub threshold_angle: f32,
    /// レップ間の最小間隔（秒）。ジッタによる二重カウント防止
    #[serde(default = "default_min_rep_interval")]
    pub min_rep_interval_s: f32,
    /// 1セットのレップ数
    #[serde(default = "default_set_size")]
    pub set_size: u32,
    /// セッション開始後のキャリブレーション時間（秒）
    #[serde(default = "default_calibration_window")]
    pub calibration_window_s: f32,
}

fn default_listen_addr() -> String { "0.0.0.0:9000".to_string() }
fn default_min_frame_interval() -> f32 { 0.1 }
fn default_threshold_angle() -> f32 { 90.0 }
fn default_min_rep_interval() -> f32 { 1.5 }
fn default_set_size() -> u32 { 10 }
fn default_calibration_window() -> f32 { 5.0 }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            min_frame_interval_s: default_min_frame_interval(),
            verbose: false,
        }
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            threshold_angle: default_threshold_angle(),
            min_rep_interval_s: default_min_rep_interval(),
            set_size: default_set_size(),
            calibration_window_s: default_calibration_window(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// ファイルがなければデフォルト設定
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        Self::load(path).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_toml() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.tracker.threshold_angle, 90.0);
        assert_eq!(config.tracker.min_rep_interval_s, 1.5);
        assert_eq!(config.tracker.set_size, 10);
        assert_eq!(config.tracker.calibration_window_s, 5.0);
        assert_eq!(config.server.listen_addr, "0.0.0.0:9000");
        assert_eq!(config.server.min_frame_interval_s, 0.1);
        assert!(!config.server.verbose);
    }

    #[test]
    fn test_partial_override() {
        let toml_str = r#"
            [tracker]
            set_size = 5

            [server]
            listen_addr = "127.0.0.1:9100"
        "#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.tracker.set_size, 5);
        // 未指定フィールドはデフォルトのまま
        assert_eq!(config.tracker.threshold_angle, 90.0);
        assert_eq!(config.server.listen_addr, "127.0.0.1:9100");
    }
}
