//! 过期提醒

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::classifier::UrgencyTier;
use crate::item::Item;

/// 提醒 ID，由物品 ID 确定性派生
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlertId(String);

impl AlertId {
    pub fn for_item(item_id: &str) -> Self {
        Self(format!("exp-{}", item_id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AlertId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AlertId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// 物品进入提醒窗口时产生的事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: AlertId,
    pub item_id: String,
    pub item_name: String,
    pub tier: UrgencyTier,
    pub message: String,
    pub expiry_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    /// 是否以 toast 形式展示
    pub show_as_toast: bool,
}

impl Alert {
    pub fn new(item: &Item, tier: UrgencyTier, created_at: DateTime<Utc>) -> Self {
        Self {
            id: AlertId::for_item(&item.id),
            item_id: item.id.clone(),
            item_name: item.name.clone(),
            tier,
            message: Self::format_message(&item.name, tier),
            expiry_date: item.expiry_date,
            created_at,
            show_as_toast: true,
        }
    }

    pub fn with_toast(mut self, show_as_toast: bool) -> Self {
        self.show_as_toast = show_as_toast;
        self
    }

    /// 通知标签，同一物品重复展示时替换而不是堆叠
    pub fn tag(&self) -> String {
        format!("freshkeeper-{}", self.item_id)
    }

    fn format_message(name: &str, tier: UrgencyTier) -> String {
        match tier {
            UrgencyTier::Critical => format!("{} expires within a day", name),
            UrgencyTier::Expired => format!("{} has expired", name),
            _ => format!("{} expires soon", name),
        }
    }
}
