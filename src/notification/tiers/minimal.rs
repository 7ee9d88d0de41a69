//! minimal 层 - 只有标题和正文的最后手段

use async_trait::async_trait;
use std::sync::Arc;

use crate::notification::error::DeliveryError;
use crate::notification::options::NotificationOptions;
use crate::notification::sink::NotificationSink;
use crate::notification::tier::DeliveryTier;

pub struct MinimalTier {
    sink: Arc<dyn NotificationSink>,
}

impl MinimalTier {
    pub fn new(sink: Arc<dyn NotificationSink>) -> Self {
        Self { sink }
    }
}

#[async_trait]
impl DeliveryTier for MinimalTier {
    fn name(&self) -> &str {
        "minimal"
    }

    async fn deliver(&self, options: &NotificationOptions) -> Result<(), DeliveryError> {
        self.sink
            .show(&options.minimal())
            .await
            .map(|_| ())
            .map_err(DeliveryError::show_failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::sinks::MemorySink;

    #[tokio::test]
    async fn test_only_title_and_body() {
        let sink = Arc::new(MemorySink::default());
        let tier = MinimalTier::new(sink.clone());

        let options = NotificationOptions::new("t", "b")
            .with_tag("freshkeeper-1")
            .with_icon("/favicon.svg");
        tier.deliver(&options).await.unwrap();

        assert_eq!(sink.history(), vec![NotificationOptions::new("t", "b")]);
    }
}
