//! Concrete pooling backend variants.

pub mod basic;
pub mod pooled;

pub use basic::BasicAdapter;
pub use pooled::PooledAdapter;
