//! Configuration and lifecycle management for database connection pools.
//!
//! The crate validates and normalizes pool settings ([`PoolConfig`]), infers
//! vendor defaults from a JDBC-style url ([`DatabaseVendor`]), and manages
//! interchangeable pooling backends behind one contract: a [`ManagedPool`]
//! binds a configuration to a [`PoolAdapter`] variant and drives the
//! `Created -> Started -> Stopped` lifecycle, while a [`PoolRegistry`] keeps
//! a named collection of pools for coordinated startup and shutdown.

pub mod adapter;
pub mod adapters;
pub mod config;
pub mod error;
pub mod managed;
pub mod registry;
pub mod tracing;
pub mod vendor;

pub mod prelude;

pub use adapter::{adapter_for, BackendPool, Connector, PoolAdapter, PoolConnection, PoolSnapshot};
pub use adapters::{BasicAdapter, PooledAdapter};
pub use config::{PoolConfig, ProviderKind};
pub use error::{PoolError, Result};
pub use managed::{ManagedPool, PoolState};
pub use registry::{BatchReport, PoolRegistry};
pub use crate::tracing::init_tracing;
pub use vendor::DatabaseVendor;
