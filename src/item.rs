//! 物品快照 - 由持久化层提供，监控核心只读

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

/// 易腐物品
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    /// 物品 ID
    pub id: String,
    /// 显示名称
    pub name: String,
    /// 分类
    #[serde(default)]
    pub category: String,
    /// 过期时间
    pub expiry_date: DateTime<Utc>,
}

impl Item {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        category: impl Into<String>,
        expiry_date: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category: category.into(),
            expiry_date,
        }
    }
}

/// 物品来源 - 每次扫描读取一次快照
pub trait ItemSource: Send + Sync {
    /// 当前物品集合
    fn snapshot(&self) -> Result<Vec<Item>>;

    /// 物品是否仍然存在
    fn contains(&self, item_id: &str) -> Result<bool> {
        Ok(self.snapshot()?.iter().any(|item| item.id == item_id))
    }
}

/// JSON 文件来源（数组格式，字段与前端保持一致）
pub struct JsonItemSource {
    path: PathBuf,
}

impl JsonItemSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ItemSource for JsonItemSource {
    fn snapshot(&self) -> Result<Vec<Item>> {
        // 文件不存在视为空集合，持久化层可能尚未写入
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read items from {}", self.path.display()))?;
        let items: Vec<Item> = serde_json::from_str(&content)
            .with_context(|| format!("invalid item file {}", self.path.display()))?;
        Ok(items)
    }
}

/// 内存来源，可在运行中增删物品
#[derive(Clone, Default)]
pub struct MemoryItemSource {
    items: Arc<RwLock<Vec<Item>>>,
}

impl MemoryItemSource {
    pub fn new(items: Vec<Item>) -> Self {
        Self {
            items: Arc::new(RwLock::new(items)),
        }
    }

    pub fn insert(&self, item: Item) {
        if let Ok(mut items) = self.items.write() {
            items.retain(|existing| existing.id != item.id);
            items.push(item);
        }
    }

    pub fn remove(&self, item_id: &str) -> Option<Item> {
        let mut items = self.items.write().ok()?;
        let pos = items.iter().position(|item| item.id == item_id)?;
        Some(items.remove(pos))
    }
}

impl ItemSource for MemoryItemSource {
    fn snapshot(&self) -> Result<Vec<Item>> {
        self.items
            .read()
            .map(|items| items.clone())
            .map_err(|_| anyhow::anyhow!("item store lock poisoned"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_item_json_uses_camel_case() {
        let json = r#"[{"id":"1","name":"Whole milk","category":"Dairy","expiryDate":"2026-10-18T09:00:00Z"}]"#;
        let items: Vec<Item> = serde_json::from_str(json).unwrap();
        assert_eq!(items[0].name, "Whole milk");
        assert_eq!(
            items[0].expiry_date,
            Utc.with_ymd_and_hms(2026, 10, 18, 9, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_json_source_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let source = JsonItemSource::new(dir.path().join("items.json"));
        assert!(source.snapshot().unwrap().is_empty());
    }

    #[test]
    fn test_json_source_rejects_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("items.json");
        fs::write(&path, "{not json").unwrap();
        assert!(JsonItemSource::new(&path).snapshot().is_err());
    }

    #[test]
    fn test_memory_source_insert_and_remove() {
        let source = MemoryItemSource::default();
        source.insert(Item::new("a", "Apples", "Fruit", Utc::now()));
        source.insert(Item::new("a", "Green apples", "Fruit", Utc::now()));
        assert_eq!(source.snapshot().unwrap().len(), 1);
        assert!(source.contains("a").unwrap());

        let removed = source.remove("a").unwrap();
        assert_eq!(removed.name, "Green apples");
        assert!(!source.contains("a").unwrap());
        assert!(source.remove("a").is_none());
    }
}
