//! 内存通知接口 - 记录所有展示与关闭，用于 dry-run 和测试

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use tokio::sync::oneshot;
use tracing::debug;

use crate::notification::options::NotificationOptions;
use crate::notification::sink::{NotificationId, NotificationSink, ShownNotification};

#[derive(Default)]
struct MemoryState {
    next_id: NotificationId,
    /// 每次 show 调用
    history: Vec<NotificationOptions>,
    /// 当前打开的通知
    open: Vec<(NotificationId, NotificationOptions)>,
    closed: Vec<NotificationId>,
    clicks: HashMap<NotificationId, oneshot::Sender<String>>,
}

/// 内存通知接口
pub struct MemorySink {
    name: String,
    state: Mutex<MemoryState>,
    failing: AtomicBool,
    clickable: bool,
}

impl MemorySink {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Mutex::new(MemoryState::default()),
            failing: AtomicBool::new(false),
            clickable: false,
        }
    }

    /// 展示的通知支持点击回调
    pub fn clickable(mut self) -> Self {
        self.clickable = true;
        self
    }

    /// 之后的 show 调用全部失败
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn history(&self) -> Vec<NotificationOptions> {
        self.state
            .lock()
            .map(|s| s.history.clone())
            .unwrap_or_default()
    }

    pub fn open(&self) -> Vec<(NotificationId, NotificationOptions)> {
        self.state
            .lock()
            .map(|s| s.open.clone())
            .unwrap_or_default()
    }

    pub fn closed(&self) -> Vec<NotificationId> {
        self.state
            .lock()
            .map(|s| s.closed.clone())
            .unwrap_or_default()
    }

    pub fn show_count(&self) -> usize {
        self.state.lock().map(|s| s.history.len()).unwrap_or(0)
    }

    /// 模拟用户点击通知正文
    pub fn click(&self, id: NotificationId) -> bool {
        self.click_action(id, "")
    }

    /// 模拟用户点击按钮
    pub fn click_action(&self, id: NotificationId, action: &str) -> bool {
        let sender = self
            .state
            .lock()
            .ok()
            .and_then(|mut s| s.clicks.remove(&id));
        match sender {
            Some(tx) => tx.send(action.to_string()).is_ok(),
            None => false,
        }
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new("memory")
    }
}

#[async_trait]
impl NotificationSink for MemorySink {
    fn name(&self) -> &str {
        &self.name
    }

    async fn show(&self, options: &NotificationOptions) -> Result<ShownNotification> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(anyhow!("{} refused to show notification", self.name));
        }

        let mut state = self
            .state
            .lock()
            .map_err(|_| anyhow!("memory sink lock poisoned"))?;
        state.next_id += 1;
        let id = state.next_id;

        if let Some(tag) = &options.tag {
            state.open.retain(|(_, open)| open.tag.as_ref() != Some(tag));
        }
        state.history.push(options.clone());
        state.open.push((id, options.clone()));
        debug!(sink = %self.name, id, title = %options.title, "Notification recorded");

        if self.clickable {
            let (tx, rx) = oneshot::channel();
            state.clicks.insert(id, tx);
            Ok(ShownNotification::with_click(id, rx))
        } else {
            Ok(ShownNotification::new(id))
        }
    }

    async fn close(&self, id: NotificationId) -> Result<()> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| anyhow!("memory sink lock poisoned"))?;
        let before = state.open.len();
        state.open.retain(|(open_id, _)| *open_id != id);
        if state.open.len() != before {
            state.closed.push(id);
        }
        state.clicks.remove(&id);
        Ok(())
    }
}
