//! 监控构建器 - 组装投递层、后台通道和分发器

use anyhow::{anyhow, Result};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;

use super::ExpiryMonitor;
use crate::bridge::{BackgroundChannelBridge, ClientWindows, SystemWindows};
use crate::config::MonitorConfig;
use crate::item::ItemSource;
use crate::notification::{
    Branding, ConsoleSink, DesktopSink, DirectTier, MinimalTier, NotificationDispatcher,
    NotificationSink, PermissionBackend, PermissionManager, PromptPermission, RichTier,
};

/// 监控构建器
pub struct MonitorBuilder {
    config: MonitorConfig,
    source: Option<Arc<dyn ItemSource>>,
    sink: Option<Arc<dyn NotificationSink>>,
    fallback_sink: Option<Arc<dyn NotificationSink>>,
    windows: Option<Arc<dyn ClientWindows>>,
    permission: Option<Arc<dyn PermissionBackend>>,
    dry_run: bool,
}

impl MonitorBuilder {
    pub fn new(config: MonitorConfig) -> Self {
        Self {
            config,
            source: None,
            sink: None,
            fallback_sink: None,
            windows: None,
            permission: None,
            dry_run: false,
        }
    }

    /// 物品来源（必需）
    pub fn source(mut self, source: Arc<dyn ItemSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// rich / direct 层使用的平台接口，默认自动检测桌面通知，否则输出到终端
    pub fn sink(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// minimal 层使用的平台接口，默认与 `sink` 相同
    pub fn fallback_sink(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.fallback_sink = Some(sink);
        self
    }

    pub fn windows(mut self, windows: Arc<dyn ClientWindows>) -> Self {
        self.windows = Some(windows);
        self
    }

    /// 权限后端，默认在终端交互询问
    pub fn permission(mut self, backend: Arc<dyn PermissionBackend>) -> Self {
        self.permission = Some(backend);
        self
    }

    /// 设置 dry-run 模式
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// 构建监控（需要在 tokio 运行时中调用）
    pub fn build(self) -> Result<ExpiryMonitor> {
        self.config.validate()?;
        let source = self
            .source
            .ok_or_else(|| anyhow!("item source is required"))?;
        let branding = Branding::from(&self.config);

        let sink = match self.sink {
            Some(sink) => sink,
            None => Self::detect_sink(&branding),
        };
        let fallback_sink = self.fallback_sink.unwrap_or_else(|| sink.clone());
        let windows = self
            .windows
            .unwrap_or_else(|| Arc::new(SystemWindows::new(self.config.app_origin.clone())));
        let permission = self
            .permission
            .unwrap_or_else(|| Arc::new(PromptPermission::new(self.config.permission)));

        let (bridge_tx, bridge_rx) = mpsc::unbounded_channel();
        let bridge = Arc::new(BackgroundChannelBridge::new(
            sink.clone(),
            windows.clone(),
            bridge_tx.clone(),
            branding.clone(),
        ));

        let mut dispatcher =
            NotificationDispatcher::new(Arc::new(PermissionManager::new(permission)))
                .with_dry_run(self.dry_run)
                .with_branding(branding.clone());
        dispatcher.register_tier(Arc::new(RichTier::new(
            bridge.clone(),
            branding.clone(),
            self.config.ready_timeout(),
        )));
        dispatcher.register_tier(Arc::new(DirectTier::new(
            sink,
            windows.clone(),
            bridge_tx,
            branding.app_url.clone(),
            self.config.direct_auto_close(),
        )));
        dispatcher.register_tier(Arc::new(MinimalTier::new(fallback_sink)));

        Ok(ExpiryMonitor::new(
            self.config,
            source,
            dispatcher,
            bridge,
            bridge_rx,
            windows,
        ))
    }

    fn detect_sink(branding: &Branding) -> Arc<dyn NotificationSink> {
        match DesktopSink::detect(&branding.app_name) {
            Some(sink) => Arc::new(sink),
            None => {
                info!("notify-send not found, notifications go to the console");
                Arc::new(ConsoleSink::new())
            }
        }
    }
}
