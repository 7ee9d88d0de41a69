//! 平台通知接口实现

pub mod console;
pub mod desktop;
pub mod memory;

pub use console::ConsoleSink;
pub use desktop::DesktopSink;
pub use memory::MemorySink;
