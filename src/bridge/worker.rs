//! 后台投递 worker
//!
//! worker 是一个独立的 tokio 任务，只通过消息与监控循环通信：
//! - 入站 `WorkerEvent`：生命周期、推送、展示请求、通知点击与关闭
//! - 出站 `BridgeMessage`：`ViewRequested` / `CloseAcknowledged`
//!
//! worker 不持有任何提醒状态。

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::push::decode_push;
use super::windows::{focus_or_open, ClientWindows};
use crate::notification::sink::{NotificationId, NotificationSink};
use crate::notification::{
    Branding, DeliveryError, NotificationAction, NotificationData, NotificationOptions,
};

/// worker 生命周期
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Unregistered,
    Installing,
    Installed,
    Activating,
    Active,
}

impl std::fmt::Display for WorkerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            WorkerState::Unregistered => "unregistered",
            WorkerState::Installing => "installing",
            WorkerState::Installed => "installed",
            WorkerState::Activating => "activating",
            WorkerState::Active => "active",
        };
        f.write_str(s)
    }
}

/// worker 入站事件
#[derive(Debug)]
pub enum WorkerEvent {
    /// 安装后立即自激活
    Install,
    /// 接管已打开的窗口
    Activate,
    /// 原始推送负载
    Push(String),
    /// rich 层的展示请求
    Show {
        options: NotificationOptions,
        reply: oneshot::Sender<Result<NotificationId, DeliveryError>>,
    },
    /// 点击通知；`action` 为空表示点击正文
    NotificationClick {
        action: String,
        tag: Option<String>,
        data: NotificationData,
    },
    NotificationClose {
        tag: Option<String>,
    },
}

/// worker 发回监控循环的消息
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeMessage {
    ViewRequested {
        item_id: Option<String>,
        url: String,
    },
    CloseAcknowledged {
        tag: Option<String>,
    },
}

struct Registration {
    events: mpsc::UnboundedSender<WorkerEvent>,
    task: JoinHandle<()>,
}

/// 后台投递通道
pub struct BackgroundChannelBridge {
    sink: Arc<dyn NotificationSink>,
    windows: Arc<dyn ClientWindows>,
    outbound: mpsc::UnboundedSender<BridgeMessage>,
    branding: Branding,
    state: Arc<watch::Sender<WorkerState>>,
    registration: Mutex<Option<Registration>>,
}

impl BackgroundChannelBridge {
    pub fn new(
        sink: Arc<dyn NotificationSink>,
        windows: Arc<dyn ClientWindows>,
        outbound: mpsc::UnboundedSender<BridgeMessage>,
        branding: Branding,
    ) -> Self {
        let (state, _) = watch::channel(WorkerState::Unregistered);
        Self {
            sink,
            windows,
            outbound,
            branding,
            state: Arc::new(state),
            registration: Mutex::new(None),
        }
    }

    /// 注册 worker（幂等）
    ///
    /// 首次调用启动 worker 任务并发送 `Install`，返回 true；
    /// 已注册时直接返回 false，不会再启动第二个 worker。
    pub fn register(&self) -> bool {
        let Ok(mut registration) = self.registration.lock() else {
            return false;
        };
        if let Some(existing) = registration.as_ref() {
            if !existing.task.is_finished() {
                debug!("Background worker already registered");
                return false;
            }
        }

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let worker = Worker {
            sink: self.sink.clone(),
            windows: self.windows.clone(),
            outbound: self.outbound.clone(),
            branding: self.branding.clone(),
            state: self.state.clone(),
            events: events_tx.downgrade(),
            open: HashMap::new(),
        };
        let task = tokio::spawn(worker.run(events_rx));

        let _ = events_tx.send(WorkerEvent::Install);
        *registration = Some(Registration {
            events: events_tx,
            task,
        });
        info!("Background worker registered");
        true
    }

    pub fn is_registered(&self) -> bool {
        self.registration
            .lock()
            .map(|r| r.as_ref().is_some_and(|r| !r.task.is_finished()))
            .unwrap_or(false)
    }

    pub fn state(&self) -> WorkerState {
        *self.state.borrow()
    }

    /// 等待 worker 进入 `Active`
    pub async fn ready(&self, timeout: Duration) -> Result<(), DeliveryError> {
        if !self.is_registered() {
            return Err(DeliveryError::ChannelUnavailable(
                "background worker not registered".to_string(),
            ));
        }

        let mut state = self.state.subscribe();
        let result =
            match tokio::time::timeout(timeout, state.wait_for(|s| *s == WorkerState::Active)).await
            {
                Ok(Ok(_)) => Ok(()),
                Ok(Err(_)) => Err(DeliveryError::WorkerGone),
                Err(_) => Err(DeliveryError::NotReady(timeout.as_millis() as u64)),
            };
        result
    }

    /// 请求 worker 展示通知
    pub async fn show_notification(
        &self,
        options: NotificationOptions,
    ) -> Result<NotificationId, DeliveryError> {
        let (reply, response) = oneshot::channel();
        self.post(WorkerEvent::Show { options, reply })?;
        response.await.map_err(|_| DeliveryError::WorkerGone)?
    }

    /// 向 worker 投递事件
    pub fn post(&self, event: WorkerEvent) -> Result<(), DeliveryError> {
        let events = self
            .registration
            .lock()
            .ok()
            .and_then(|r| r.as_ref().map(|r| r.events.clone()))
            .ok_or_else(|| {
                DeliveryError::ChannelUnavailable("background worker not registered".to_string())
            })?;
        events.send(event).map_err(|_| DeliveryError::WorkerGone)
    }

    /// 注销 worker；已排队的事件会先处理完，返回的句柄可用于等待 worker 退出
    pub fn unregister(&self) -> Option<JoinHandle<()>> {
        let registration = self.registration.lock().ok().and_then(|mut r| r.take())?;
        self.state.send_replace(WorkerState::Unregistered);
        info!("Background worker unregistered");
        Some(registration.task)
    }
}

impl Drop for BackgroundChannelBridge {
    fn drop(&mut self) {
        if let Ok(mut registration) = self.registration.lock() {
            if let Some(registration) = registration.take() {
                registration.task.abort();
            }
        }
    }
}

struct Worker {
    sink: Arc<dyn NotificationSink>,
    windows: Arc<dyn ClientWindows>,
    outbound: mpsc::UnboundedSender<BridgeMessage>,
    branding: Branding,
    state: Arc<watch::Sender<WorkerState>>,
    /// 自身事件队列的弱引用，用于回送点击事件
    events: mpsc::WeakUnboundedSender<WorkerEvent>,
    /// tag -> 当前打开的通知
    open: HashMap<String, NotificationId>,
}

impl Worker {
    async fn run(mut self, mut events: mpsc::UnboundedReceiver<WorkerEvent>) {
        while let Some(event) = events.recv().await {
            self.handle(event).await;
        }
        self.state.send_replace(WorkerState::Unregistered);
        debug!("Background worker stopped");
    }

    async fn handle(&mut self, event: WorkerEvent) {
        match event {
            WorkerEvent::Install => {
                self.state.send_replace(WorkerState::Installing);
                info!("Background worker installed");
                self.state.send_replace(WorkerState::Installed);
                self.activate().await;
            }
            WorkerEvent::Activate => {
                if *self.state.borrow() != WorkerState::Active {
                    self.activate().await;
                }
            }
            WorkerEvent::Push(raw) => match decode_push(&raw) {
                Some(payload) => {
                    let options = payload.to_options(&self.branding);
                    if let Err(e) = self.show(options).await {
                        warn!(error = %e, "Failed to show push notification");
                    }
                }
                None => debug!("Empty push payload ignored"),
            },
            WorkerEvent::Show { options, reply } => {
                let result = self.show(options).await;
                let _ = reply.send(result);
            }
            WorkerEvent::NotificationClick { action, tag, data } => {
                self.on_click(action, tag, data).await;
            }
            WorkerEvent::NotificationClose { tag } => {
                info!(tag = ?tag, "Notification closed");
                if let Some(tag) = &tag {
                    self.open.remove(tag);
                }
            }
        }
    }

    async fn activate(&mut self) {
        self.state.send_replace(WorkerState::Activating);
        match self.windows.claim().await {
            Ok(count) => info!(clients = count, "Background worker activated"),
            Err(e) => warn!(error = %e, "Failed to claim clients"),
        }
        self.state.send_replace(WorkerState::Active);
    }

    async fn show(&mut self, options: NotificationOptions) -> Result<NotificationId, DeliveryError> {
        let shown = self
            .sink
            .show(&options)
            .await
            .map_err(DeliveryError::show_failed)?;

        if let Some(tag) = &options.tag {
            self.open.insert(tag.clone(), shown.id);
        }

        if let Some(clicked) = shown.clicked {
            let events = self.events.clone();
            let tag = options.tag.clone();
            let data = options.data.clone();
            tokio::spawn(async move {
                if let Ok(action) = clicked.await {
                    if let Some(events) = events.upgrade() {
                        let _ = events.send(WorkerEvent::NotificationClick { action, tag, data });
                    }
                }
            });
        }

        debug!(id = shown.id, tag = ?options.tag, "Worker showed notification");
        Ok(shown.id)
    }

    async fn on_click(&mut self, action: String, tag: Option<String>, data: NotificationData) {
        // 点击后总是关闭通知
        if let Some(id) = tag.as_ref().and_then(|t| self.open.remove(t)) {
            if let Err(e) = self.sink.close(id).await {
                warn!(id, error = %e, "Failed to close clicked notification");
            }
        }

        match action.as_str() {
            NotificationAction::VIEW => {
                let url = data
                    .url
                    .clone()
                    .unwrap_or_else(|| self.branding.app_url.clone());
                if let Err(e) = focus_or_open(self.windows.as_ref(), &self.branding.app_url).await {
                    warn!(error = %e, "Failed to focus or open application window");
                }
                let _ = self.outbound.send(BridgeMessage::ViewRequested {
                    item_id: data.item_id,
                    url,
                });
            }
            NotificationAction::CLOSE => {
                debug!(tag = ?tag, "Notification close action");
                let _ = self.outbound.send(BridgeMessage::CloseAcknowledged { tag });
            }
            _ => debug!(action = %action, "Notification clicked"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::windows::RecordingWindows;
    use crate::notification::sinks::MemorySink;

    fn bridge() -> (
        BackgroundChannelBridge,
        Arc<MemorySink>,
        Arc<RecordingWindows>,
        mpsc::UnboundedReceiver<BridgeMessage>,
    ) {
        let sink = Arc::new(MemorySink::default());
        let windows = Arc::new(RecordingWindows::new());
        let (tx, rx) = mpsc::unbounded_channel();
        let bridge = BackgroundChannelBridge::new(
            sink.clone(),
            windows.clone(),
            tx,
            Branding::default(),
        );
        (bridge, sink, windows, rx)
    }

    #[tokio::test]
    async fn test_register_is_idempotent() {
        let (bridge, _, _, _rx) = bridge();
        assert_eq!(bridge.state(), WorkerState::Unregistered);

        assert!(bridge.register());
        assert!(!bridge.register());
        assert!(bridge.is_registered());

        bridge.ready(Duration::from_secs(1)).await.unwrap();
        assert_eq!(bridge.state(), WorkerState::Active);
    }

    #[tokio::test]
    async fn test_ready_without_registration() {
        let (bridge, _, _, _rx) = bridge();
        assert!(matches!(
            bridge.ready(Duration::from_millis(10)).await,
            Err(DeliveryError::ChannelUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_show_through_worker() {
        let (bridge, sink, _, _rx) = bridge();
        bridge.register();

        let id = bridge
            .show_notification(NotificationOptions::new("t", "b").with_tag("freshkeeper-1"))
            .await
            .unwrap();
        assert_eq!(sink.open().len(), 1);
        assert_eq!(sink.open()[0].0, id);
    }

    #[tokio::test]
    async fn test_show_failure_is_typed() {
        let (bridge, sink, _, _rx) = bridge();
        bridge.register();
        sink.set_failing(true);

        assert!(matches!(
            bridge.show_notification(NotificationOptions::new("t", "b")).await,
            Err(DeliveryError::ShowFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_unregister_then_post_fails() {
        let (bridge, _, _, _rx) = bridge();
        bridge.register();
        bridge.unregister();

        assert!(!bridge.is_registered());
        assert_eq!(bridge.state(), WorkerState::Unregistered);
        assert!(matches!(
            bridge.post(WorkerEvent::Activate),
            Err(DeliveryError::ChannelUnavailable(_))
        ));
    }
}
