//! direct 层 - 直接通过平台接口展示前台通知
//!
//! 不带按钮；到时自动关闭，点击时聚焦应用并确认提醒。

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::bridge::{focus_or_open, BridgeMessage, ClientWindows};
use crate::notification::error::DeliveryError;
use crate::notification::options::NotificationOptions;
use crate::notification::sink::NotificationSink;
use crate::notification::tier::DeliveryTier;

pub struct DirectTier {
    sink: Arc<dyn NotificationSink>,
    windows: Arc<dyn ClientWindows>,
    outbound: mpsc::UnboundedSender<BridgeMessage>,
    app_url: String,
    auto_close: Duration,
}

impl DirectTier {
    pub fn new(
        sink: Arc<dyn NotificationSink>,
        windows: Arc<dyn ClientWindows>,
        outbound: mpsc::UnboundedSender<BridgeMessage>,
        app_url: impl Into<String>,
        auto_close: Duration,
    ) -> Self {
        Self {
            sink,
            windows,
            outbound,
            app_url: app_url.into(),
            auto_close,
        }
    }
}

#[async_trait]
impl DeliveryTier for DirectTier {
    fn name(&self) -> &str {
        "direct"
    }

    async fn deliver(&self, options: &NotificationOptions) -> Result<(), DeliveryError> {
        let mut options = options.clone();
        options.actions.clear();
        options.vibrate.clear();
        options.timeout_ms = Some(self.auto_close.as_millis() as u64);

        let shown = self
            .sink
            .show(&options)
            .await
            .map_err(DeliveryError::show_failed)?;
        debug!(id = shown.id, sink = self.sink.name(), "Direct notification shown");

        let id = shown.id;
        let sink = self.sink.clone();
        let windows = self.windows.clone();
        let outbound = self.outbound.clone();
        let app_url = self.app_url.clone();
        let auto_close = self.auto_close;
        let data = options.data;
        let clicked_rx = shown.clicked;

        tokio::spawn(async move {
            let clicked = async move {
                match clicked_rx {
                    Some(rx) => rx.await.ok(),
                    None => std::future::pending().await,
                }
            };

            tokio::select! {
                Some(_) = clicked => {
                    if let Err(e) = focus_or_open(windows.as_ref(), &app_url).await {
                        warn!(error = %e, "Failed to focus application");
                    }
                    let _ = outbound.send(BridgeMessage::ViewRequested {
                        item_id: data.item_id,
                        url: data.url.unwrap_or(app_url),
                    });
                }
                _ = tokio::time::sleep(auto_close) => {
                    debug!(id, "Direct notification auto-closed");
                }
            }

            if let Err(e) = sink.close(id).await {
                warn!(id, error = %e, "Failed to close direct notification");
            }
        });

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::RecordingWindows;
    use crate::notification::options::NotificationData;
    use crate::notification::sinks::MemorySink;

    fn options() -> NotificationOptions {
        NotificationOptions {
            data: NotificationData {
                item_id: Some("42".to_string()),
                url: Some("/".to_string()),
            },
            ..NotificationOptions::new("t", "b")
        }
        .with_tag("freshkeeper-42")
        .with_vibrate(vec![200])
        .with_actions(vec![crate::notification::Branding::default().view_action()])
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_actions_and_auto_close() {
        let sink = Arc::new(MemorySink::default());
        let (tx, _rx) = mpsc::unbounded_channel();
        let tier = DirectTier::new(
            sink.clone(),
            Arc::new(RecordingWindows::new()),
            tx,
            "/",
            Duration::from_secs(6),
        );

        tier.deliver(&options()).await.unwrap();
        let shown = sink.history();
        assert!(shown[0].actions.is_empty());
        assert!(shown[0].vibrate.is_empty());
        assert_eq!(shown[0].timeout_ms, Some(6000));
        assert_eq!(sink.open().len(), 1);

        tokio::time::sleep(Duration::from_millis(6100)).await;
        assert!(sink.open().is_empty());
    }

    #[tokio::test]
    async fn test_click_focuses_and_acknowledges() {
        let sink = Arc::new(MemorySink::default().clickable());
        let windows = Arc::new(RecordingWindows::new());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let tier = DirectTier::new(sink.clone(), windows.clone(), tx, "/", Duration::from_secs(6));

        tier.deliver(&options()).await.unwrap();
        let id = sink.open()[0].0;
        assert!(sink.click(id));

        let message = rx.recv().await.unwrap();
        assert_eq!(
            message,
            BridgeMessage::ViewRequested {
                item_id: Some("42".to_string()),
                url: "/".to_string(),
            }
        );
        assert_eq!(windows.opened(), vec!["/"]);
    }

    #[tokio::test]
    async fn test_show_failure() {
        let sink = Arc::new(MemorySink::default());
        sink.set_failing(true);
        let (tx, _rx) = mpsc::unbounded_channel();
        let tier = DirectTier::new(
            sink,
            Arc::new(RecordingWindows::new()),
            tx,
            "/",
            Duration::from_secs(6),
        );
        assert!(matches!(
            tier.deliver(&options()).await,
            Err(DeliveryError::ShowFailed(_))
        ));
    }
}
