//! The no-pooling adapter: every checkout dials a fresh physical connection
//! and every checkin closes it.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use tracing::debug;

use crate::{
    adapter::{BackendPool, Connector, PoolAdapter, PoolConnection, PoolSnapshot},
    config::PoolConfig,
    error::{PoolError, Result},
};

/// Adapter variant that does no pooling at all.
pub struct BasicAdapter {
    connector: Arc<dyn Connector>,
}

impl BasicAdapter {
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self { connector }
    }
}

#[async_trait]
impl PoolAdapter for BasicAdapter {
    async fn create(&self, config: &PoolConfig) -> Result<Arc<dyn BackendPool>> {
        // probe once so unreachable databases fail at start rather than on
        // the first checkout
        let mut probe = self
            .connector
            .connect(config)
            .await
            .map_err(|e| PoolError::PoolCreationFailed(e.to_string()))?;
        if let Err(e) = probe.close().await {
            debug!(error = %e, "failed to close probe connection");
        }

        Ok(Arc::new(BasicPool {
            connector: self.connector.clone(),
            config: config.clone(),
        }))
    }
}

struct BasicPool {
    connector: Arc<dyn Connector>,
    config: PoolConfig,
}

#[async_trait]
impl BackendPool for BasicPool {
    async fn acquire(&self, timeout: Option<Duration>) -> Result<Box<dyn PoolConnection>> {
        match timeout {
            Some(t) => tokio::time::timeout(t, self.connector.connect(&self.config))
                .await
                .map_err(|_| PoolError::CheckoutTimeout(t.as_millis() as u64))?,
            None => self.connector.connect(&self.config).await,
        }
    }

    async fn release(&self, mut conn: Box<dyn PoolConnection>) {
        if let Err(e) = conn.close().await {
            debug!(error = %e, "failed to close released connection");
        }
    }

    async fn discard(&self, mut conn: Box<dyn PoolConnection>) {
        if let Err(e) = conn.close().await {
            debug!(error = %e, "failed to close discarded connection");
        }
    }

    fn snapshot(&self) -> Result<PoolSnapshot> {
        // nothing is pooled, so there is nothing to count
        Ok(PoolSnapshot::default())
    }

    async fn validate_idle(&self, _older_than: Duration, _query: &str) -> Result<usize> {
        Ok(0)
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }
}
