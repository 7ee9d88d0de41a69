//! 控制台通知接口 - 没有桌面通知时输出到终端

use anyhow::Result;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::notification::options::NotificationOptions;
use crate::notification::sink::{NotificationId, NotificationSink, ShownNotification};

pub struct ConsoleSink {
    next_id: AtomicU64,
}

impl ConsoleSink {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
        }
    }

    fn format(options: &NotificationOptions) -> String {
        match &options.tag {
            Some(tag) => format!("[通知] {} - {} ({})", options.title, options.body, tag),
            None => format!("[通知] {} - {}", options.title, options.body),
        }
    }
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NotificationSink for ConsoleSink {
    fn name(&self) -> &str {
        "console"
    }

    async fn show(&self, options: &NotificationOptions) -> Result<ShownNotification> {
        println!("{}", Self::format(options));
        Ok(ShownNotification::new(
            self.next_id.fetch_add(1, Ordering::Relaxed),
        ))
    }

    async fn close(&self, _id: NotificationId) -> Result<()> {
        Ok(())
    }
}
