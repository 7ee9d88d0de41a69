//! 通知权限 - default → (request) → {granted, denied}
//!
//! 会话开始时最多自动请求一次；之后只能由用户显式操作（例如测试通知）重试。

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

/// 权限状态
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionState {
    #[default]
    Default,
    Granted,
    Denied,
}

impl std::fmt::Display for PermissionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PermissionState::Default => "default",
            PermissionState::Granted => "granted",
            PermissionState::Denied => "denied",
        };
        f.write_str(s)
    }
}

/// 平台权限接口：只读查询 + 一次请求操作
#[async_trait]
pub trait PermissionBackend: Send + Sync {
    fn query(&self) -> PermissionState;

    async fn request(&self) -> Result<PermissionState>;
}

/// 固定响应的权限后端
///
/// `request` 只在 `Default` 时生效，之后状态不再变化。
pub struct StaticPermission {
    state: Mutex<PermissionState>,
    response: PermissionState,
    requests: AtomicUsize,
}

impl StaticPermission {
    pub fn new(initial: PermissionState) -> Self {
        Self {
            state: Mutex::new(initial),
            response: initial,
            requests: AtomicUsize::new(0),
        }
    }

    /// 请求时返回的结果
    pub fn with_response(mut self, response: PermissionState) -> Self {
        self.response = response;
        self
    }

    pub fn granted() -> Self {
        Self::new(PermissionState::Granted)
    }

    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PermissionBackend for StaticPermission {
    fn query(&self) -> PermissionState {
        self.state
            .lock()
            .map(|s| *s)
            .unwrap_or(PermissionState::Default)
    }

    async fn request(&self) -> Result<PermissionState> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let mut state = self
            .state
            .lock()
            .map_err(|_| anyhow::anyhow!("permission lock poisoned"))?;
        if *state == PermissionState::Default {
            *state = self.response;
        }
        Ok(*state)
    }
}

/// 终端交互式权限请求
pub struct PromptPermission {
    state: Mutex<PermissionState>,
}

impl PromptPermission {
    pub fn new(initial: PermissionState) -> Self {
        Self {
            state: Mutex::new(initial),
        }
    }
}

#[async_trait]
impl PermissionBackend for PromptPermission {
    fn query(&self) -> PermissionState {
        self.state
            .lock()
            .map(|s| *s)
            .unwrap_or(PermissionState::Default)
    }

    async fn request(&self) -> Result<PermissionState> {
        let current = self.query();
        if current != PermissionState::Default {
            return Ok(current);
        }

        let allowed = tokio::task::spawn_blocking(|| {
            dialoguer::Confirm::new()
                .with_prompt("允许 FreshKeeper 发送桌面通知？")
                .default(true)
                .interact()
        })
        .await??;

        let next = if allowed {
            PermissionState::Granted
        } else {
            PermissionState::Denied
        };
        if let Ok(mut state) = self.state.lock() {
            *state = next;
        }
        Ok(next)
    }
}

/// 权限状态机
pub struct PermissionManager {
    backend: Arc<dyn PermissionBackend>,
    auto_requested: AtomicBool,
}

impl PermissionManager {
    pub fn new(backend: Arc<dyn PermissionBackend>) -> Self {
        Self {
            backend,
            auto_requested: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> PermissionState {
        self.backend.query()
    }

    pub fn is_granted(&self) -> bool {
        self.state() == PermissionState::Granted
    }

    /// 会话开始时的自动请求，整个生命周期只发生一次
    pub async fn request_on_session_start(&self) -> PermissionState {
        if self.auto_requested.swap(true, Ordering::SeqCst) {
            return self.state();
        }
        self.request_if_default("session start").await
    }

    /// 用户显式操作触发的重试
    ///
    /// 只有仍处于 `Default` 时才会真正请求；已拒绝的权限需要用户在系统设置中修改。
    pub async fn request_explicit(&self) -> PermissionState {
        let state = self.request_if_default("user action").await;
        if state == PermissionState::Denied {
            warn!("Notifications are blocked; enable them in the system settings");
        }
        state
    }

    async fn request_if_default(&self, reason: &str) -> PermissionState {
        let current = self.state();
        if current != PermissionState::Default {
            return current;
        }

        match self.backend.request().await {
            Ok(state) => {
                info!(reason = %reason, permission = %state, "Notification permission resolved");
                state
            }
            Err(e) => {
                warn!(reason = %reason, error = %e, "Notification permission request failed");
                self.state()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_auto_request_happens_once() {
        let backend = Arc::new(StaticPermission::new(PermissionState::Default));
        let manager = PermissionManager::new(backend.clone());

        // 用户关闭了弹窗，仍是 default
        assert_eq!(manager.request_on_session_start().await, PermissionState::Default);
        assert_eq!(manager.request_on_session_start().await, PermissionState::Default);
        assert_eq!(backend.request_count(), 1);
    }

    #[tokio::test]
    async fn test_explicit_retry_after_default() {
        let backend = Arc::new(
            StaticPermission::new(PermissionState::Default).with_response(PermissionState::Granted),
        );
        let manager = PermissionManager::new(backend.clone());

        assert_eq!(manager.request_explicit().await, PermissionState::Granted);
        assert!(manager.is_granted());
        // 已授权后不再请求
        assert_eq!(manager.request_on_session_start().await, PermissionState::Granted);
        assert_eq!(backend.request_count(), 1);
    }

    #[tokio::test]
    async fn test_denied_is_terminal() {
        let backend = Arc::new(
            StaticPermission::new(PermissionState::Default).with_response(PermissionState::Denied),
        );
        let manager = PermissionManager::new(backend.clone());

        assert_eq!(manager.request_on_session_start().await, PermissionState::Denied);
        assert_eq!(manager.request_explicit().await, PermissionState::Denied);
        assert_eq!(backend.request_count(), 1);
    }

    #[test]
    fn test_permission_serde() {
        let state: PermissionState = serde_json::from_str("\"denied\"").unwrap();
        assert_eq!(state, PermissionState::Denied);
        assert_eq!(PermissionState::Granted.to_string(), "granted");
    }
}
