//! 后台投递通道：worker 生命周期、推送解码、窗口聚焦

pub mod push;
pub mod windows;
pub mod worker;

pub use push::{decode_push, PushPayload};
pub use windows::{focus_or_open, ClientWindows, RecordingWindows, SystemWindows, WindowAction};
pub use worker::{BackgroundChannelBridge, BridgeMessage, WorkerEvent, WorkerState};
