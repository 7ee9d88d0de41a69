//! 页面内 toast：错峰插入、自动关闭、下拉手势

pub mod gesture;
pub mod queue;

pub use gesture::{DragGesture, DragOutcome};
pub use queue::{
    ExitCause, PresentationState, ToastChange, ToastEntry, ToastId, ToastQueue, ToastRemoved,
    ToastTimer,
};
