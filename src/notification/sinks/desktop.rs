//! 桌面通知 - 通过 notify-send 展示，gdbus 关闭

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::notification::options::NotificationOptions;
use crate::notification::sink::{NotificationId, NotificationSink, ShownNotification};

/// notify-send 点击正文时输出的按钮名
const DEFAULT_ACTION: &str = "default";

pub struct DesktopSink {
    notify_send: PathBuf,
    gdbus: Option<PathBuf>,
    app_name: String,
    /// tag -> 最近一次展示的通知 ID，用于 --replace-id
    tags: Mutex<HashMap<String, NotificationId>>,
    fallback_id: AtomicU64,
}

impl DesktopSink {
    pub fn new(notify_send: PathBuf, app_name: impl Into<String>) -> Self {
        Self {
            notify_send,
            gdbus: None,
            app_name: app_name.into(),
            tags: Mutex::new(HashMap::new()),
            fallback_id: AtomicU64::new(1 << 32),
        }
    }

    /// 在 PATH 中查找 notify-send
    pub fn detect(app_name: &str) -> Option<Self> {
        let notify_send = which::which("notify-send").ok()?;
        let mut sink = Self::new(notify_send, app_name);
        sink.gdbus = which::which("gdbus").ok();
        info!(path = %sink.notify_send.display(), "Desktop notifications available");
        Some(sink)
    }

    fn replace_id(&self, tag: Option<&str>) -> Option<NotificationId> {
        let tag = tag?;
        self.tags.lock().ok()?.get(tag).copied()
    }

    fn remember(&self, tag: Option<&str>, id: NotificationId) {
        if let (Some(tag), Ok(mut tags)) = (tag, self.tags.lock()) {
            tags.insert(tag.to_string(), id);
        }
    }

    fn build_args(&self, options: &NotificationOptions, wait: bool) -> Vec<String> {
        let mut args = vec![
            format!("--app-name={}", self.app_name),
            "--print-id".to_string(),
        ];
        if let Some(icon) = &options.icon {
            args.push(format!("--icon={}", icon));
        }
        if let Some(timeout) = options.timeout_ms {
            args.push(format!("--expire-time={}", timeout));
        }
        if let Some(id) = self.replace_id(options.tag.as_deref()) {
            args.push(format!("--replace-id={}", id));
        }
        if wait {
            args.push("--wait".to_string());
            args.push(format!("--action={}=Open", DEFAULT_ACTION));
            for action in &options.actions {
                args.push(format!("--action={}={}", action.action, action.title));
            }
        }
        args.push(options.title.clone());
        args.push(options.body.clone());
        args
    }
}

#[async_trait]
impl NotificationSink for DesktopSink {
    fn name(&self) -> &str {
        "desktop"
    }

    async fn show(&self, options: &NotificationOptions) -> Result<ShownNotification> {
        // 带数据的提醒需要点击回调，--wait 会阻塞到通知关闭，放到后台任务里等
        let wait = options.data.item_id.is_some() || !options.actions.is_empty();
        let args = self.build_args(options, wait);

        let mut child = Command::new(&self.notify_send)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(false)
            .spawn()
            .with_context(|| format!("failed to spawn {}", self.notify_send.display()))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| anyhow!("notify-send stdout unavailable"))?;
        let mut lines = BufReader::new(stdout).lines();

        let id = match lines.next_line().await? {
            Some(line) => line.trim().parse::<NotificationId>().ok(),
            None => None,
        };

        let id = match id {
            Some(id) => id,
            None => {
                let status = child.wait().await?;
                if !status.success() {
                    return Err(anyhow!("notify-send exited with {}", status));
                }
                self.fallback_id.fetch_add(1, Ordering::Relaxed)
            }
        };
        self.remember(options.tag.as_deref(), id);
        debug!(id, title = %options.title, "Desktop notification shown");

        if !wait {
            let _ = child.wait().await;
            return Ok(ShownNotification::new(id));
        }

        let (tx, rx) = oneshot::channel();
        tokio::spawn(async move {
            if let Ok(Some(line)) = lines.next_line().await {
                let action = line.trim();
                let action = if action == DEFAULT_ACTION { "" } else { action };
                let _ = tx.send(action.to_string());
            }
            let _ = child.wait().await;
        });
        Ok(ShownNotification::with_click(id, rx))
    }

    async fn close(&self, id: NotificationId) -> Result<()> {
        let Some(gdbus) = &self.gdbus else {
            return Ok(());
        };

        let status = Command::new(gdbus)
            .args([
                "call",
                "--session",
                "--dest",
                "org.freedesktop.Notifications",
                "--object-path",
                "/org/freedesktop/Notifications",
                "--method",
                "org.freedesktop.Notifications.CloseNotification",
                &id.to_string(),
            ])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await?;

        if !status.success() {
            warn!(id, "Failed to close desktop notification");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::options::NotificationAction;

    fn sink() -> DesktopSink {
        DesktopSink::new(PathBuf::from("/usr/bin/notify-send"), "FreshKeeper")
    }

    #[test]
    fn test_args_without_wait() {
        let options = NotificationOptions::new("Title", "Body")
            .with_icon("/favicon.svg")
            .with_timeout_ms(6000);
        let args = sink().build_args(&options, false);

        assert_eq!(
            args,
            vec![
                "--app-name=FreshKeeper",
                "--print-id",
                "--icon=/favicon.svg",
                "--expire-time=6000",
                "Title",
                "Body",
            ]
        );
    }

    #[test]
    fn test_args_replace_same_tag() {
        let sink = sink();
        sink.remember(Some("freshkeeper-1"), 17);

        let options = NotificationOptions::new("Title", "Body").with_tag("freshkeeper-1");
        assert!(sink
            .build_args(&options, false)
            .contains(&"--replace-id=17".to_string()));

        let other = NotificationOptions::new("Title", "Body").with_tag("freshkeeper-2");
        assert!(!sink
            .build_args(&other, false)
            .iter()
            .any(|a| a.starts_with("--replace-id")));
    }

    #[test]
    fn test_args_with_actions() {
        let options = NotificationOptions::new("Title", "Body")
            .with_actions(vec![NotificationAction::new("view", "View items")]);
        let args = sink().build_args(&options, true);

        assert!(args.contains(&"--wait".to_string()));
        assert!(args.contains(&"--action=default=Open".to_string()));
        assert!(args.contains(&"--action=view=View items".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("Body"));
    }
}
