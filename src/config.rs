//! 监控配置
//!
//! 读取 `~/.config/freshkeeper/config.json`（JSON 格式，所有字段可选）。
//! 文件不存在时使用默认值，格式错误时报错。命令行参数覆盖文件中的值。

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::expiry::ExpiryThresholds;
use crate::notification::PermissionState;

/// 自动关闭时长的允许范围（毫秒）
const DIRECT_AUTO_CLOSE_RANGE_MS: (u64, u64) = (5_000, 8_000);

/// 监控配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// 周期扫描间隔（秒）
    pub scan_interval_secs: u64,
    /// 会话开始后首次扫描的延迟（毫秒），避免与初始数据加载竞争
    pub settle_delay_ms: u64,
    /// critical 上限（天）
    pub critical_days: i64,
    /// 提醒窗口（天）
    pub warning_days: i64,
    /// 同批 toast 之间的插入间隔（毫秒）
    pub toast_stagger_ms: u64,
    /// toast 插入到可见的延迟（毫秒）
    pub toast_settle_ms: u64,
    /// toast 可见后自动关闭（毫秒）
    pub toast_auto_dismiss_ms: u64,
    /// toast 退出动画（毫秒）
    pub toast_exit_ms: u64,
    /// 下拉关闭阈值（像素）
    pub drag_dismiss_threshold_px: f64,
    /// 是否为触摸展示（启用拖拽手势）
    pub touch_presentation: bool,
    /// 前台通知自动关闭（毫秒）
    pub direct_auto_close_ms: u64,
    /// 等待后台 worker 就绪的上限（毫秒）
    pub ready_timeout_ms: u64,
    /// 应用根地址
    pub app_url: String,
    /// 打开新窗口时用于补全相对地址
    pub app_origin: String,
    pub app_name: String,
    pub icon: String,
    pub badge: String,
    /// 震动模式
    pub vibrate: Vec<u32>,
    /// 初始通知权限
    pub permission: PermissionState,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            scan_interval_secs: 30 * 60,
            settle_delay_ms: 1_000,
            critical_days: 1,
            warning_days: 3,
            toast_stagger_ms: 500,
            toast_settle_ms: 100,
            toast_auto_dismiss_ms: 8_000,
            toast_exit_ms: 300,
            drag_dismiss_threshold_px: 50.0,
            touch_presentation: false,
            direct_auto_close_ms: 6_000,
            ready_timeout_ms: 2_000,
            app_url: "/".to_string(),
            app_origin: "http://localhost:5173".to_string(),
            app_name: "FreshKeeper".to_string(),
            icon: "/favicon.svg".to_string(),
            badge: "/favicon.svg".to_string(),
            vibrate: vec![200, 100, 200],
            permission: PermissionState::Default,
        }
    }
}

impl MonitorConfig {
    /// 默认配置文件路径
    pub fn path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join("freshkeeper")
            .join("config.json")
    }

    /// 从默认路径加载
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("invalid config {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("invalid config {}", path.display()))?;
        Ok(config)
    }

    /// 检查无法运行的取值
    pub fn validate(&self) -> Result<()> {
        if self.scan_interval_secs == 0 {
            bail!("scan_interval_secs must be greater than 0");
        }
        Ok(())
    }

    pub fn thresholds(&self) -> ExpiryThresholds {
        ExpiryThresholds {
            critical_days: self.critical_days.min(self.warning_days),
            warning_days: self.warning_days,
        }
    }

    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.scan_interval_secs)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn ready_timeout(&self) -> Duration {
        Duration::from_millis(self.ready_timeout_ms)
    }

    /// 前台通知自动关闭时长，限制在 5-8 秒
    pub fn direct_auto_close(&self) -> Duration {
        let (min, max) = DIRECT_AUTO_CLOSE_RANGE_MS;
        Duration::from_millis(self.direct_auto_close_ms.clamp(min, max))
    }

    pub fn toast_timing(&self) -> ToastTiming {
        ToastTiming {
            stagger: Duration::from_millis(self.toast_stagger_ms),
            settle: Duration::from_millis(self.toast_settle_ms),
            auto_dismiss: Duration::from_millis(self.toast_auto_dismiss_ms),
            exit: Duration::from_millis(self.toast_exit_ms),
            drag_threshold: self.drag_dismiss_threshold_px,
            touch: self.touch_presentation,
        }
    }
}

/// toast 队列的时间参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToastTiming {
    pub stagger: Duration,
    pub settle: Duration,
    pub auto_dismiss: Duration,
    pub exit: Duration,
    pub drag_threshold: f64,
    pub touch: bool,
}

impl Default for ToastTiming {
    fn default() -> Self {
        MonitorConfig::default().toast_timing()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MonitorConfig::default();
        assert_eq!(config.scan_interval(), Duration::from_secs(1800));
        assert_eq!(config.thresholds(), ExpiryThresholds::default());
        assert_eq!(config.toast_timing().auto_dismiss, Duration::from_millis(8000));
        assert_eq!(config.permission, PermissionState::Default);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = MonitorConfig::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, MonitorConfig::default());
    }

    #[test]
    fn test_partial_file_overrides_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"warning_days": 7, "permission": "granted"}"#).unwrap();

        let config = MonitorConfig::load_from(&path).unwrap();
        assert_eq!(config.warning_days, 7);
        assert_eq!(config.permission, PermissionState::Granted);
        assert_eq!(config.scan_interval_secs, 1800);
    }

    #[test]
    fn test_malformed_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ nope").unwrap();
        assert!(MonitorConfig::load_from(&path).is_err());
    }

    #[test]
    fn test_zero_scan_interval_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"scan_interval_secs": 0}"#).unwrap();
        assert!(MonitorConfig::load_from(&path).is_err());

        let config = MonitorConfig {
            scan_interval_secs: 0,
            ..MonitorConfig::default()
        };
        assert!(config.validate().is_err());
        assert!(MonitorConfig::default().validate().is_ok());
    }

    #[test]
    fn test_direct_auto_close_is_clamped() {
        let mut config = MonitorConfig::default();
        config.direct_auto_close_ms = 1_000;
        assert_eq!(config.direct_auto_close(), Duration::from_secs(5));
        config.direct_auto_close_ms = 60_000;
        assert_eq!(config.direct_auto_close(), Duration::from_secs(8));
    }

    #[test]
    fn test_path_location() {
        let path = MonitorConfig::path();
        assert!(path.to_string_lossy().ends_with("freshkeeper/config.json"));
    }
}
