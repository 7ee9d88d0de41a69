//! 提醒去重器 - 会话内每个物品至多一条未清除的提醒
//!
//! 与时间窗口去重不同，这里的记录只在以下情况被移除：
//! 1. 用户显式清除提醒
//! 2. 物品被删除或被消耗
//! 3. 会话结束（`clear_all`）

use std::collections::HashSet;
use tracing::debug;

/// 提醒去重器
#[derive(Debug, Default)]
pub struct AlertDeduper {
    /// 本会话已经提醒过的物品 ID
    alerted: HashSet<String>,
}

impl AlertDeduper {
    pub fn new() -> Self {
        Self::default()
    }

    /// 是否应该为该物品产生提醒
    pub fn should_alert(&self, item_id: &str) -> bool {
        !self.alerted.contains(item_id)
    }

    /// 记录已提醒，返回是否为新记录
    pub fn mark_alerted(&mut self, item_id: &str) -> bool {
        let inserted = self.alerted.insert(item_id.to_string());
        if !inserted {
            debug!(item_id = %item_id, "Item already marked as alerted");
        }
        inserted
    }

    /// 清除单个物品的记录
    pub fn clear(&mut self, item_id: &str) -> bool {
        self.alerted.remove(item_id)
    }

    /// 清除全部记录（会话结束）
    pub fn clear_all(&mut self) {
        debug!(count = self.alerted.len(), "Clearing alert dedup record");
        self.alerted.clear();
    }

    pub fn len(&self) -> usize {
        self.alerted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alerted.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mark_then_suppress() {
        let mut dedup = AlertDeduper::new();
        assert!(dedup.should_alert("a"));
        assert!(dedup.mark_alerted("a"));
        assert!(!dedup.should_alert("a"));
        // 重复标记不改变状态
        assert!(!dedup.mark_alerted("a"));
        assert_eq!(dedup.len(), 1);
    }

    #[test]
    fn test_clear_allows_alert_again() {
        let mut dedup = AlertDeduper::new();
        dedup.mark_alerted("a");
        dedup.mark_alerted("b");

        assert!(dedup.clear("a"));
        assert!(dedup.should_alert("a"));
        assert!(!dedup.should_alert("b"));
        assert!(!dedup.clear("a"));
    }

    #[test]
    fn test_clear_all_empties_record() {
        let mut dedup = AlertDeduper::new();
        for id in ["a", "b", "c"] {
            dedup.mark_alerted(id);
        }
        dedup.clear_all();
        assert!(dedup.is_empty());
        assert!(dedup.should_alert("a"));
    }

    #[test]
    fn test_items_are_independent() {
        let mut dedup = AlertDeduper::new();
        dedup.mark_alerted("a");
        assert!(dedup.should_alert("b"));
        assert!(!dedup.should_alert("a"));
    }
}
