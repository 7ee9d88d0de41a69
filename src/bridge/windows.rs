//! 应用窗口 - 聚焦已打开的窗口或打开新窗口

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Mutex;
use tokio::process::Command;
use tracing::{debug, info};

/// `focus_or_open` 的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowAction {
    Focused,
    Opened,
}

/// 应用客户端窗口
#[async_trait]
pub trait ClientWindows: Send + Sync {
    /// 聚焦一个可见窗口；没有可见窗口时返回 false
    async fn focus_visible(&self) -> Result<bool>;

    /// 打开新窗口
    async fn open(&self, url: &str) -> Result<()>;

    /// worker 激活时接管已打开的窗口，返回数量
    async fn claim(&self) -> Result<usize>;
}

/// 优先聚焦可见窗口，否则打开 `url`
pub async fn focus_or_open(windows: &dyn ClientWindows, url: &str) -> Result<WindowAction> {
    if windows.focus_visible().await? {
        debug!("Focused existing window");
        return Ok(WindowAction::Focused);
    }
    windows.open(url).await?;
    Ok(WindowAction::Opened)
}

/// 系统浏览器：无法感知已打开的窗口，总是通过 xdg-open / open 打开
pub struct SystemWindows {
    opener: Option<PathBuf>,
    origin: String,
}

impl SystemWindows {
    pub fn new(origin: impl Into<String>) -> Self {
        let opener = which::which("xdg-open")
            .or_else(|_| which::which("open"))
            .ok();
        Self {
            opener,
            origin: origin.into(),
        }
    }

    /// 相对地址补全为完整 URL
    fn resolve(&self, url: &str) -> String {
        if url.contains("://") {
            return url.to_string();
        }
        format!(
            "{}/{}",
            self.origin.trim_end_matches('/'),
            url.trim_start_matches('/')
        )
    }
}

#[async_trait]
impl ClientWindows for SystemWindows {
    async fn focus_visible(&self) -> Result<bool> {
        Ok(false)
    }

    async fn open(&self, url: &str) -> Result<()> {
        let opener = self
            .opener
            .as_ref()
            .ok_or_else(|| anyhow!("no URL opener found (xdg-open / open)"))?;
        let target = self.resolve(url);
        let status = Command::new(opener)
            .arg(&target)
            .status()
            .await
            .with_context(|| format!("failed to run {}", opener.display()))?;
        if !status.success() {
            return Err(anyhow!("{} exited with {}", opener.display(), status));
        }
        info!(url = %target, "Opened application window");
        Ok(())
    }

    async fn claim(&self) -> Result<usize> {
        Ok(0)
    }
}

/// 记录所有窗口操作
#[derive(Default)]
pub struct RecordingWindows {
    visible: Mutex<bool>,
    focused: Mutex<usize>,
    opened: Mutex<Vec<String>>,
}

impl RecordingWindows {
    pub fn new() -> Self {
        Self::default()
    }

    /// 模拟已有一个可见窗口
    pub fn with_visible_window(self) -> Self {
        if let Ok(mut visible) = self.visible.lock() {
            *visible = true;
        }
        self
    }

    pub fn focus_count(&self) -> usize {
        self.focused.lock().map(|f| *f).unwrap_or(0)
    }

    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().map(|o| o.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ClientWindows for RecordingWindows {
    async fn focus_visible(&self) -> Result<bool> {
        let visible = self.visible.lock().map(|v| *v).unwrap_or(false);
        if visible {
            if let Ok(mut focused) = self.focused.lock() {
                *focused += 1;
            }
        }
        Ok(visible)
    }

    async fn open(&self, url: &str) -> Result<()> {
        if let Ok(mut opened) = self.opened.lock() {
            opened.push(url.to_string());
        }
        // 打开后即为可见窗口
        if let Ok(mut visible) = self.visible.lock() {
            *visible = true;
        }
        Ok(())
    }

    async fn claim(&self) -> Result<usize> {
        Ok(self.visible.lock().map(|v| usize::from(*v)).unwrap_or(0))
    }
}
