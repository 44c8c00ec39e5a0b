//! The capability boundary a pooling backend implements.
//!
//! A backend plugs in by implementing [`PoolAdapter`] (create a pool from a
//! finalized configuration) and [`BackendPool`] (the running pool handle).
//! Physical connectivity is supplied by the caller through a [`Connector`],
//! keeping the actual database transport outside this crate.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;

use crate::{
    config::{PoolConfig, ProviderKind},
    error::Result,
};

/// A physical database connection handed out by a pool.
#[async_trait]
pub trait PoolConnection: Send {
    /// Execute a SQL statement. Pools use this to run validation queries.
    async fn execute(&mut self, sql: &str) -> Result<()>;

    /// Close the underlying physical connection.
    async fn close(&mut self) -> Result<()>;
}

/// Factory for physical connections, supplied by the caller.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Dial a new physical connection using the configuration's url and
    /// credentials.
    async fn connect(&self, config: &PoolConfig) -> Result<Box<dyn PoolConnection>>;
}

/// Occupancy counts reported by a backend pool.
///
/// Any count a backend cannot report is absent rather than failing the
/// whole snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolSnapshot {
    pub idle: Option<u32>,
    pub busy: Option<u32>,
    pub total: Option<u32>,
}

/// A running backend pool created by a [`PoolAdapter`].
#[async_trait]
pub trait BackendPool: Send + Sync {
    /// Acquire a connection, waiting up to `timeout` (`None` = wait
    /// indefinitely). Fails with
    /// [`CheckoutTimeout`](crate::PoolError::CheckoutTimeout) when the
    /// timeout elapses with nothing available.
    async fn acquire(&self, timeout: Option<Duration>) -> Result<Box<dyn PoolConnection>>;

    /// Return a connection to the pool. Never fails; problems are logged
    /// and the connection discarded.
    async fn release(&self, conn: Box<dyn PoolConnection>);

    /// Close a connection without returning it, freeing its capacity slot.
    async fn discard(&self, conn: Box<dyn PoolConnection>);

    /// Current occupancy of the pool.
    fn snapshot(&self) -> Result<PoolSnapshot>;

    /// Validate connections that have been idle longer than `older_than`,
    /// evicting any that fail `query`. Returns the number evicted.
    async fn validate_idle(&self, older_than: Duration, query: &str) -> Result<usize>;

    /// Release all pooled connections and backend resources. Safe to call
    /// more than once.
    async fn shutdown(&self) -> Result<()>;
}

/// A pooling backend variant: creates [`BackendPool`] handles from a
/// finalized configuration.
#[async_trait]
pub trait PoolAdapter: Send + Sync {
    /// Allocate and start the underlying pool. Any backend failure is
    /// reported as [`PoolCreationFailed`](crate::PoolError::PoolCreationFailed).
    async fn create(&self, config: &PoolConfig) -> Result<Arc<dyn BackendPool>>;
}

/// Picks the adapter variant matching a configuration's provider kind.
pub fn adapter_for(
    provider: ProviderKind,
    connector: Arc<dyn Connector>,
) -> Arc<dyn PoolAdapter> {
    match provider {
        ProviderKind::Basic => Arc::new(crate::adapters::BasicAdapter::new(connector)),
        ProviderKind::Pooled => Arc::new(crate::adapters::PooledAdapter::new(connector)),
    }
}
