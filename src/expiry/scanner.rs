//! 过期扫描器 - 无状态，每次从快照重新计算
//!
//! 是否已经提醒过由 `AlertDeduper` 负责，扫描器本身不记忆任何结果。

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use super::classifier::{days_until, ExpiryThresholds, UrgencyTier};
use crate::item::{Item, ItemSource};

/// 进入提醒窗口的物品
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertableItem {
    pub item: Item,
    pub tier: UrgencyTier,
    pub days_left: i64,
}

/// 一次扫描的结果
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScanReport {
    /// warning / critical，保持快照顺序
    pub alertable: Vec<AlertableItem>,
    /// 已过期，仅用于展示
    pub expired: Vec<Item>,
    /// 扫描的物品总数
    pub scanned: usize,
}

impl ScanReport {
    pub fn fresh_count(&self) -> usize {
        self.scanned - self.alertable.len() - self.expired.len()
    }
}

/// 过期扫描器
#[derive(Debug, Clone, Default)]
pub struct ExpiryScanner {
    thresholds: ExpiryThresholds,
}

impl ExpiryScanner {
    pub fn new(thresholds: ExpiryThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> ExpiryThresholds {
        self.thresholds
    }

    /// 对物品集合分类
    pub fn scan(&self, items: &[Item], now: DateTime<Utc>) -> ScanReport {
        let mut report = ScanReport {
            scanned: items.len(),
            ..Default::default()
        };

        for item in items {
            let days_left = days_until(item.expiry_date, now);
            match self.thresholds.classify_days(days_left) {
                UrgencyTier::Expired => report.expired.push(item.clone()),
                UrgencyTier::Fresh => {}
                tier => report.alertable.push(AlertableItem {
                    item: item.clone(),
                    tier,
                    days_left,
                }),
            }
        }

        debug!(
            scanned = report.scanned,
            alertable = report.alertable.len(),
            expired = report.expired.len(),
            "Expiry scan finished"
        );
        report
    }

    /// 从物品来源读取快照后扫描
    pub fn scan_source(&self, source: &dyn ItemSource, now: DateTime<Utc>) -> Result<ScanReport> {
        let items = source.snapshot()?;
        Ok(self.scan(&items, now))
    }
}
