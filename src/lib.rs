//! FreshKeeper - 易腐物品过期监控与提醒投递

pub mod bridge;
pub mod config;
pub mod expiry;
pub mod item;
pub mod monitor;
pub mod notification;
pub mod scheduler;
pub mod toast;

pub use bridge::{BackgroundChannelBridge, BridgeMessage, WorkerEvent, WorkerState};
pub use config::{MonitorConfig, ToastTiming};
pub use expiry::{
    classify, days_until, Alert, AlertDeduper, AlertId, ExpiryScanner, ExpiryThresholds,
    ScanReport, UrgencyTier,
};
pub use item::{Item, ItemSource, JsonItemSource, MemoryItemSource};
pub use monitor::{ExpiryMonitor, MonitorBuilder, MonitorCommand, MonitorEvent};
pub use notification::{DeliveryOutcome, DeliveryReport, NotificationDispatcher, PermissionState};
pub use scheduler::{Scheduler, TimerHandle};
pub use toast::{PresentationState, ToastId, ToastQueue};
