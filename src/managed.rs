//! The managed pool: one configuration bound to one adapter, driven through
//! the `Created -> Started -> Stopped` lifecycle.

use std::{sync::Arc, time::Duration};

use tokio::{sync::Mutex, task::JoinHandle};
use tracing::{debug, error, info, warn};

use crate::{
    adapter::{BackendPool, PoolAdapter, PoolConnection},
    config::PoolConfig,
    error::{PoolError, Result},
};

/// Lifecycle state of a [`ManagedPool`]. Transitions only move forward; a
/// stopped pool is never restarted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolState {
    Created,
    Started,
    Stopped,
}

struct Inner {
    state: PoolState,
    handle: Option<Arc<dyn BackendPool>>,
    sweeper: Option<JoinHandle<()>>,
}

/// A connection pool bound to one [`PoolConfig`] and one adapter variant.
///
/// The backend pool is created on [`start`](Self::start) and destroyed on
/// [`stop`](Self::stop); checkouts are only valid in between. Instances are
/// shared across tasks behind an `Arc`.
pub struct ManagedPool {
    config: PoolConfig,
    adapter: Arc<dyn PoolAdapter>,
    inner: Mutex<Inner>,
}

impl ManagedPool {
    /// Binds a configuration to an adapter. The pool starts in
    /// [`PoolState::Created`]; no backend resources are allocated yet.
    pub fn new(config: PoolConfig, adapter: Arc<dyn PoolAdapter>) -> Self {
        Self {
            config,
            adapter,
            inner: Mutex::new(Inner {
                state: PoolState::Created,
                handle: None,
                sweeper: None,
            }),
        }
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    pub async fn state(&self) -> PoolState {
        self.inner.lock().await.state
    }

    fn display_name(&self) -> &str {
        self.config.name().unwrap_or("unnamed")
    }

    /// Creates the backend pool. On failure the pool stays in `Created` and
    /// the error propagates; retrying is the caller's choice. Concurrent
    /// calls serialize, so at most one backend pool is ever created.
    pub async fn start(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        match inner.state {
            PoolState::Created => {}
            PoolState::Started => {
                return Err(PoolError::IllegalState(format!(
                    "pool '{}' is already started",
                    self.display_name()
                )))
            }
            PoolState::Stopped => {
                return Err(PoolError::IllegalState(format!(
                    "pool '{}' is stopped and cannot be restarted",
                    self.display_name()
                )))
            }
        }

        self.config.validate().map_err(|e| {
            PoolError::PoolCreationFailed(format!(
                "invalid configuration for pool '{}': {}",
                self.display_name(),
                e
            ))
        })?;

        let handle = self.adapter.create(&self.config).await?;

        let idle_timeout = self.config.validate_idle_connection_timeout();
        if idle_timeout > 0 {
            match self.config.validation_query() {
                Some(query) => {
                    inner.sweeper =
                        Some(self.spawn_sweeper(handle.clone(), idle_timeout, query.to_string()));
                }
                None => warn!(
                    pool = self.display_name(),
                    "idle validation enabled but no validation query configured; not sweeping"
                ),
            }
        }
        inner.handle = Some(handle);
        inner.state = PoolState::Started;
        info!(pool = self.display_name(), "pool started");
        Ok(())
    }

    /// Destroys the backend pool. Idempotent: every call leaves the pool in
    /// `Stopped`, and a backend shutdown failure is logged rather than
    /// propagated.
    pub async fn stop(&self) {
        let mut inner = self.inner.lock().await;
        if let Some(sweeper) = inner.sweeper.take() {
            sweeper.abort();
        }
        if let Some(handle) = inner.handle.take() {
            if let Err(e) = handle.shutdown().await {
                error!(pool = self.display_name(), error = %e, "backend shutdown failed");
            }
        }
        if inner.state != PoolState::Stopped {
            info!(pool = self.display_name(), "pool stopped");
        }
        inner.state = PoolState::Stopped;
    }

    /// Checks a connection out of the pool, waiting up to the configured
    /// checkout timeout (zero means wait indefinitely). With
    /// validate-on-checkout enabled, connections failing the validation
    /// query are discarded and acquisition retried up to the configured
    /// retry count.
    pub async fn get_connection(&self) -> Result<Box<dyn PoolConnection>> {
        let handle = self.started_handle().await?;

        let timeout = match self.config.checkout_timeout() {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        };

        let query = if self.config.validate_on_checkout() {
            self.config.validation_query()
        } else {
            None
        };
        let Some(query) = query else {
            return handle.acquire(timeout).await;
        };

        let retries = self.config.checkout_validation_retries();
        for attempt in 1..=retries {
            let mut conn = handle.acquire(timeout).await?;
            match conn.execute(query).await {
                Ok(()) => return Ok(conn),
                Err(e) => {
                    warn!(
                        pool = self.display_name(),
                        attempt,
                        error = %e,
                        "checkout validation failed; discarding connection"
                    );
                    handle.discard(conn).await;
                }
            }
        }
        Err(PoolError::ValidationFailed(retries))
    }

    /// Checks a connection back in. With validate-on-checkin enabled the
    /// validation runs on a background task, so the caller never waits on
    /// it; connections failing validation are discarded instead of pooled.
    pub async fn release_connection(&self, conn: Box<dyn PoolConnection>) -> Result<()> {
        let handle = match self.started_handle().await {
            Ok(handle) => handle,
            Err(e) => {
                // the connection cannot go back to a pool that is not
                // started, but it must not leak either
                let mut conn = conn;
                if let Err(close_err) = conn.close().await {
                    debug!(
                        pool = self.display_name(),
                        error = %close_err,
                        "failed to close connection returned outside the started state"
                    );
                }
                return Err(e);
            }
        };

        if self.config.validate_on_checkin() {
            if let Some(query) = self.config.validation_query() {
                let query = query.to_string();
                let pool_name = self.display_name().to_string();
                tokio::spawn(async move {
                    let mut conn = conn;
                    match conn.execute(&query).await {
                        Ok(()) => handle.release(conn).await,
                        Err(e) => {
                            warn!(
                                pool = %pool_name,
                                error = %e,
                                "checkin validation failed; discarding connection"
                            );
                            handle.discard(conn).await;
                        }
                    }
                });
                return Ok(());
            }
        }

        handle.release(conn).await;
        Ok(())
    }

    /// Number of idle connections, or `None` when the backend cannot say.
    pub async fn idle_connection_count(&self) -> Option<u32> {
        self.snapshot().await.and_then(|s| s.idle)
    }

    /// Number of checked-out connections, or `None` when the backend cannot
    /// say.
    pub async fn busy_connection_count(&self) -> Option<u32> {
        self.snapshot().await.and_then(|s| s.busy)
    }

    /// Total number of open connections, or `None` when the backend cannot
    /// say.
    pub async fn connection_count(&self) -> Option<u32> {
        self.snapshot().await.and_then(|s| s.total)
    }

    /// Health reporting must never destabilize the pool, so snapshot
    /// failures degrade to `None` with a logged diagnostic.
    async fn snapshot(&self) -> Option<crate::adapter::PoolSnapshot> {
        let inner = self.inner.lock().await;
        let handle = inner.handle.as_ref()?;
        match handle.snapshot() {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                debug!(pool = self.display_name(), error = %e, "pool snapshot unavailable");
                None
            }
        }
    }

    async fn started_handle(&self) -> Result<Arc<dyn BackendPool>> {
        let inner = self.inner.lock().await;
        match (&inner.state, &inner.handle) {
            (PoolState::Started, Some(handle)) => Ok(handle.clone()),
            _ => Err(PoolError::IllegalState(format!(
                "pool '{}' is not started",
                self.display_name()
            ))),
        }
    }

    fn spawn_sweeper(
        &self,
        handle: Arc<dyn BackendPool>,
        idle_timeout_ms: u64,
        query: String,
    ) -> JoinHandle<()> {
        let older_than = Duration::from_millis(idle_timeout_ms);
        let pool_name = self.display_name().to_string();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(older_than);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // the first tick completes immediately; skip it
            interval.tick().await;
            loop {
                interval.tick().await;
                match handle.validate_idle(older_than, &query).await {
                    Ok(0) => {}
                    Ok(evicted) => {
                        debug!(pool = %pool_name, evicted, "idle validation evicted connections")
                    }
                    Err(e) => {
                        warn!(pool = %pool_name, error = %e, "idle validation sweep failed")
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::PoolSnapshot;
    use async_trait::async_trait;

    // a backend that cannot report occupancy and has nothing to hand out
    struct OpaquePool;

    #[async_trait]
    impl BackendPool for OpaquePool {
        async fn acquire(&self, _timeout: Option<Duration>) -> Result<Box<dyn PoolConnection>> {
            Err(PoolError::PoolExhausted("nothing available".to_string()))
        }

        async fn release(&self, _conn: Box<dyn PoolConnection>) {}

        async fn discard(&self, _conn: Box<dyn PoolConnection>) {}

        fn snapshot(&self) -> Result<PoolSnapshot> {
            Err(PoolError::Backend("snapshot unsupported".to_string()))
        }

        async fn validate_idle(&self, _older_than: Duration, _query: &str) -> Result<usize> {
            Ok(0)
        }

        async fn shutdown(&self) -> Result<()> {
            Ok(())
        }
    }

    struct OpaqueAdapter;

    #[async_trait]
    impl PoolAdapter for OpaqueAdapter {
        async fn create(&self, _config: &PoolConfig) -> Result<Arc<dyn BackendPool>> {
            Ok(Arc::new(OpaquePool))
        }
    }

    fn config() -> PoolConfig {
        let mut config = PoolConfig::new();
        config.set_name("opaque");
        config.set_url("jdbc:mysql://localhost/db").unwrap();
        config
    }

    #[tokio::test]
    async fn snapshot_failures_degrade_to_absent_counts() {
        let pool = ManagedPool::new(config(), Arc::new(OpaqueAdapter));
        pool.start().await.unwrap();

        // a backend snapshot error must never surface to the caller
        assert_eq!(pool.idle_connection_count().await, None);
        assert_eq!(pool.busy_connection_count().await, None);
        assert_eq!(pool.connection_count().await, None);
        assert_eq!(pool.state().await, PoolState::Started);
    }

    #[tokio::test]
    async fn backend_acquire_errors_surface_to_the_caller() {
        let pool = ManagedPool::new(config(), Arc::new(OpaqueAdapter));
        pool.start().await.unwrap();

        assert!(matches!(
            pool.get_connection().await,
            Err(PoolError::PoolExhausted(_))
        ));
    }
}
