//! 平台通知投递
//!
//! # 设计目标
//! 1. 分层回退：`NotificationDispatcher` 依次尝试 rich → direct → minimal，第一个成功即停止
//! 2. 权限状态机：`default → (request) → {granted, denied}`，未授权时跳过所有层
//! 3. 失败不外抛：每层的错误只记录日志，toast 队列才是保证可见的渠道
//!
//! # 使用示例
//! ```ignore
//! use freshkeeper::notification::{NotificationDispatcher, PermissionManager, StaticPermission};
//!
//! let permission = Arc::new(PermissionManager::new(Arc::new(StaticPermission::granted())));
//! let mut dispatcher = NotificationDispatcher::new(permission);
//! dispatcher.register_tier(Arc::new(MinimalTier::new(Arc::new(ConsoleSink::new()))));
//! let report = dispatcher.dispatch(&alert).await;
//! ```

pub mod dispatcher;
pub mod error;
pub mod options;
pub mod permission;
pub mod sink;
pub mod sinks;
pub mod tier;
pub mod tiers;

pub use dispatcher::NotificationDispatcher;
pub use error::DeliveryError;
pub use options::{Branding, NotificationAction, NotificationData, NotificationOptions};
pub use permission::{
    PermissionBackend, PermissionManager, PermissionState, PromptPermission, StaticPermission,
};
pub use sink::{NotificationId, NotificationSink, ShownNotification};
pub use sinks::{ConsoleSink, DesktopSink, MemorySink};
pub use tier::{DeliveryOutcome, DeliveryReport, DeliveryTier, SendResult};
pub use tiers::{DirectTier, MinimalTier, RichTier};
