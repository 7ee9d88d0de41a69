//! 投递层 trait 与结果

use async_trait::async_trait;
use serde::Serialize;

use super::error::DeliveryError;
use super::options::NotificationOptions;
use super::permission::PermissionState;

/// 单层投递结果
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "result", content = "reason", rename_all = "lowercase")]
pub enum SendResult {
    /// 发送成功
    Sent,
    /// 跳过（不可用或 dry-run）
    Skipped(String),
    /// 发送失败
    Failed(String),
}

/// 整条投递链的结果；任何一种都不是错误
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryOutcome {
    Delivered { tier: String },
    PermissionBlocked(PermissionState),
    Exhausted,
    DryRun,
}

/// 一次分发的记录
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeliveryReport {
    pub outcome: DeliveryOutcome,
    /// 按尝试顺序记录每一层
    pub attempts: Vec<(String, SendResult)>,
}

impl DeliveryReport {
    pub fn blocked(state: PermissionState) -> Self {
        Self {
            outcome: DeliveryOutcome::PermissionBlocked(state),
            attempts: Vec::new(),
        }
    }

    pub fn is_delivered(&self) -> bool {
        matches!(self.outcome, DeliveryOutcome::Delivered { .. })
    }

    /// 成功投递的层
    pub fn delivered_by(&self) -> Option<&str> {
        match &self.outcome {
            DeliveryOutcome::Delivered { tier } => Some(tier),
            _ => None,
        }
    }
}

/// 投递层
///
/// 分发器按注册顺序尝试，第一个成功的层结束整条链。
#[async_trait]
pub trait DeliveryTier: Send + Sync {
    /// 层名称（用于日志）
    fn name(&self) -> &str;

    /// 当前是否可以尝试；不可用的层直接跳过
    fn is_available(&self) -> bool {
        true
    }

    /// 展示通知
    async fn deliver(&self, options: &NotificationOptions) -> Result<(), DeliveryError>;
}
