//! 通知展示参数（rich 与 direct 两层共用）

use serde::{Deserialize, Serialize};

use crate::config::MonitorConfig;
use crate::expiry::{Alert, UrgencyTier};

/// 通知携带的结构化数据
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NotificationData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// 通知按钮
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationAction {
    pub action: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl NotificationAction {
    pub const VIEW: &'static str = "view";
    pub const CLOSE: &'static str = "close";

    pub fn new(action: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            title: title.into(),
            icon: None,
        }
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }
}

/// 通知参数
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationOptions {
    pub title: String,
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub badge: Option<String>,
    /// 同一 tag 的通知替换而不是堆叠
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub vibrate: Vec<u32>,
    #[serde(default)]
    pub data: NotificationData,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<NotificationAction>,
    /// 自动关闭（毫秒），仅前台通知使用
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

impl NotificationOptions {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            ..Default::default()
        }
    }

    /// 提醒的基础参数：标题、正文、图标、tag 和数据，不含按钮与震动
    pub fn for_alert(alert: &Alert, branding: &Branding) -> Self {
        let headline = match alert.tier {
            UrgencyTier::Critical => "Expires within a day!",
            _ => "Item expiring soon",
        };
        Self {
            title: format!("🍎 {} - {}", branding.app_name, headline),
            body: format!("{}. Use it before it goes bad!", alert.message),
            icon: Some(branding.icon.clone()),
            badge: Some(branding.badge.clone()),
            tag: Some(alert.tag()),
            data: NotificationData {
                item_id: Some(alert.item_id.clone()),
                url: Some(branding.app_url.clone()),
            },
            ..Default::default()
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn with_vibrate(mut self, pattern: Vec<u32>) -> Self {
        self.vibrate = pattern;
        self
    }

    pub fn with_actions(mut self, actions: Vec<NotificationAction>) -> Self {
        self.actions = actions;
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    /// 最小通知：只保留标题和正文
    pub fn minimal(&self) -> Self {
        Self::new(self.title.clone(), self.body.clone())
    }
}

/// 应用品牌信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Branding {
    pub app_name: String,
    pub icon: String,
    pub badge: String,
    pub app_url: String,
    pub vibrate: Vec<u32>,
}

impl Branding {
    /// 带 `view` 按钮
    pub fn view_action(&self) -> NotificationAction {
        NotificationAction::new(NotificationAction::VIEW, "View items").with_icon(self.icon.clone())
    }

    pub fn close_action(&self) -> NotificationAction {
        NotificationAction::new(NotificationAction::CLOSE, "Close").with_icon(self.icon.clone())
    }
}

impl Default for Branding {
    fn default() -> Self {
        Self::from(&MonitorConfig::default())
    }
}

impl From<&MonitorConfig> for Branding {
    fn from(config: &MonitorConfig) -> Self {
        Self {
            app_name: config.app_name.clone(),
            icon: config.icon.clone(),
            badge: config.badge.clone(),
            app_url: config.app_url.clone(),
            vibrate: config.vibrate.clone(),
        }
    }
}
