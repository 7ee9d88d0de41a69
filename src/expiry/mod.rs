//! 过期监控 - 分类、扫描与去重

pub mod alert;
pub mod classifier;
pub mod deduper;
pub mod scanner;

pub use alert::{Alert, AlertId};
pub use classifier::{classify, days_until, ExpiryThresholds, UrgencyTier};
pub use deduper::AlertDeduper;
pub use scanner::{AlertableItem, ExpiryScanner, ScanReport};
