//! 通知分发器 - 按顺序尝试各投递层，第一个成功即停止

use super::options::{Branding, NotificationOptions};
use super::permission::{PermissionManager, PermissionState};
use super::tier::{DeliveryOutcome, DeliveryReport, DeliveryTier, SendResult};
use crate::expiry::Alert;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 通知分发器
///
/// 失败只记录日志，不会返回错误；toast 才是保证可见的渠道。
pub struct NotificationDispatcher {
    /// 按优先级排列的投递层
    tiers: Vec<Arc<dyn DeliveryTier>>,
    permission: Arc<PermissionManager>,
    branding: Branding,
    /// 是否为 dry-run 模式
    dry_run: bool,
}

impl NotificationDispatcher {
    pub fn new(permission: Arc<PermissionManager>) -> Self {
        Self {
            tiers: Vec::new(),
            permission,
            branding: Branding::default(),
            dry_run: false,
        }
    }

    /// 设置 dry-run 模式
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_branding(mut self, branding: Branding) -> Self {
        self.branding = branding;
        self
    }

    /// 追加投递层（优先级低于已注册的层）
    pub fn register_tier(&mut self, tier: Arc<dyn DeliveryTier>) {
        info!(tier = tier.name(), "Registering delivery tier");
        self.tiers.push(tier);
    }

    pub fn permission(&self) -> &Arc<PermissionManager> {
        &self.permission
    }

    pub fn branding(&self) -> &Branding {
        &self.branding
    }

    /// 分发一条提醒
    pub async fn dispatch(&self, alert: &Alert) -> DeliveryReport {
        let options = NotificationOptions::for_alert(alert, &self.branding);
        let report = self.dispatch_options(&options).await;
        match &report.outcome {
            DeliveryOutcome::Delivered { tier } => {
                info!(item_id = %alert.item_id, tier = %tier, "Alert delivered")
            }
            DeliveryOutcome::Exhausted => {
                warn!(item_id = %alert.item_id, "All delivery tiers failed")
            }
            DeliveryOutcome::PermissionBlocked(state) => {
                debug!(item_id = %alert.item_id, permission = %state, "Platform notification skipped")
            }
            DeliveryOutcome::DryRun => {}
        }
        report
    }

    /// 按顺序尝试各层
    pub async fn dispatch_options(&self, options: &NotificationOptions) -> DeliveryReport {
        let state = self.permission.state();
        if state != PermissionState::Granted {
            return DeliveryReport::blocked(state);
        }

        let mut attempts = Vec::with_capacity(self.tiers.len());

        for tier in &self.tiers {
            let name = tier.name().to_string();

            if self.dry_run {
                eprintln!("[DRY-RUN] Would deliver through tier: {}", name);
                attempts.push((name, SendResult::Skipped("dry-run".to_string())));
                continue;
            }

            if !tier.is_available() {
                debug!(tier = %name, "Delivery tier unavailable");
                attempts.push((name, SendResult::Skipped("unavailable".to_string())));
                continue;
            }

            match tier.deliver(options).await {
                Ok(()) => {
                    attempts.push((name.clone(), SendResult::Sent));
                    return DeliveryReport {
                        outcome: DeliveryOutcome::Delivered { tier: name },
                        attempts,
                    };
                }
                Err(e) => {
                    warn!(tier = %name, error = %e, "Delivery tier failed, falling through");
                    attempts.push((name, SendResult::Failed(e.to_string())));
                }
            }
        }

        let outcome = if self.dry_run {
            DeliveryOutcome::DryRun
        } else {
            DeliveryOutcome::Exhausted
        };
        DeliveryReport { outcome, attempts }
    }

    /// 用户显式触发：先重试权限请求，再发送一条测试通知
    pub async fn test_notification(&self) -> DeliveryReport {
        let state = self.permission.request_explicit().await;
        if state != PermissionState::Granted {
            return DeliveryReport::blocked(state);
        }

        let options = NotificationOptions::new(
            format!("🍎 {} - Test notification", self.branding.app_name),
            "Notifications are working. You will be warned before your items expire.",
        )
        .with_icon(self.branding.icon.clone())
        .with_tag("freshkeeper-test");
        self.dispatch_options(&options).await
    }

    /// 获取已注册的层数量
    pub fn tier_count(&self) -> usize {
        self.tiers.len()
    }

    /// 获取已注册的层名称
    pub fn tier_names(&self) -> Vec<&str> {
        self.tiers.iter().map(|t| t.name()).collect()
    }
}
