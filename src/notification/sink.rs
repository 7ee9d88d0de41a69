//! 平台通知接口

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::oneshot;

use super::options::NotificationOptions;

pub type NotificationId = u64;

/// 已展示的通知
#[derive(Debug)]
pub struct ShownNotification {
    pub id: NotificationId,
    /// 平台支持点击回调时，点击后收到一次按钮名（点击正文为空字符串）
    pub clicked: Option<oneshot::Receiver<String>>,
}

impl ShownNotification {
    pub fn new(id: NotificationId) -> Self {
        Self { id, clicked: None }
    }

    pub fn with_click(id: NotificationId, clicked: oneshot::Receiver<String>) -> Self {
        Self {
            id,
            clicked: Some(clicked),
        }
    }
}

/// 平台通知接口
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// 接口名称（用于日志）
    fn name(&self) -> &str;

    /// 展示通知；相同 tag 替换旧通知
    async fn show(&self, options: &NotificationOptions) -> Result<ShownNotification>;

    /// 关闭通知
    async fn close(&self, id: NotificationId) -> Result<()>;
}
