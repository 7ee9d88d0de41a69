//! rich 层 - 通过后台 worker 展示，带按钮、震动和数据

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::bridge::{BackgroundChannelBridge, WorkerState};
use crate::notification::error::DeliveryError;
use crate::notification::options::{Branding, NotificationOptions};
use crate::notification::tier::DeliveryTier;

pub struct RichTier {
    bridge: Arc<BackgroundChannelBridge>,
    branding: Branding,
    ready_timeout: Duration,
}

impl RichTier {
    pub fn new(bridge: Arc<BackgroundChannelBridge>, branding: Branding, ready_timeout: Duration) -> Self {
        Self {
            bridge,
            branding,
            ready_timeout,
        }
    }

    fn decorate(&self, options: &NotificationOptions) -> NotificationOptions {
        options
            .clone()
            .with_vibrate(self.branding.vibrate.clone())
            .with_actions(vec![self.branding.view_action()])
    }
}

#[async_trait]
impl DeliveryTier for RichTier {
    fn name(&self) -> &str {
        "rich"
    }

    fn is_available(&self) -> bool {
        self.bridge.is_registered()
    }

    async fn deliver(&self, options: &NotificationOptions) -> Result<(), DeliveryError> {
        if self.bridge.state() != WorkerState::Active {
            debug!(state = %self.bridge.state(), "Waiting for background worker");
        }
        self.bridge.ready(self.ready_timeout).await?;

        let id = self.bridge.show_notification(self.decorate(options)).await?;
        debug!(id, tag = ?options.tag, "Rich notification shown");
        Ok(())
    }
}
