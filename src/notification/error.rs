//! 投递错误分类

use thiserror::Error;

/// 单层投递失败的原因；由分发器记录后吞掉，不会传给调用方
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    #[error("delivery channel unavailable: {0}")]
    ChannelUnavailable(String),
    #[error("background worker not ready after {0} ms")]
    NotReady(u64),
    #[error("show failed: {0}")]
    ShowFailed(String),
    #[error("background worker has stopped")]
    WorkerGone,
}

impl DeliveryError {
    pub fn show_failed(error: impl std::fmt::Display) -> Self {
        Self::ShowFailed(error.to_string())
    }
}
