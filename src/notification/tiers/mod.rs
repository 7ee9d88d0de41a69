//! 投递层：rich → direct → minimal

pub mod direct;
pub mod minimal;
pub mod rich;

pub use direct::DirectTier;
pub use minimal::MinimalTier;
pub use rich::RichTier;
