//! The built-in pooling engine: a capacity-bounded pool that reuses idle
//! connections and dials new ones on demand.

use std::{
    sync::{
        atomic::{AtomicBool, AtomicU32, Ordering},
        Arc,
    },
    time::Duration,
};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::{sync::Semaphore, task::JoinHandle, time::Instant};
use tracing::{debug, warn};

use crate::{
    adapter::{BackendPool, Connector, PoolAdapter, PoolConnection, PoolSnapshot},
    config::PoolConfig,
    error::{PoolError, Result},
};

/// Adapter variant backed by the built-in pooling engine.
pub struct PooledAdapter {
    connector: Arc<dyn Connector>,
}

impl PooledAdapter {
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self { connector }
    }
}

#[async_trait]
impl PoolAdapter for PooledAdapter {
    async fn create(&self, config: &PoolConfig) -> Result<Arc<dyn BackendPool>> {
        let pool = PooledPool {
            connector: self.connector.clone(),
            config: config.clone(),
            semaphore: Arc::new(Semaphore::new(config.max_pool_size() as usize)),
            idle: Arc::new(Mutex::new(Vec::new())),
            busy: AtomicU32::new(0),
            closed: Arc::new(AtomicBool::new(false)),
        };

        // pre-warm up to the minimum size; a partial warm-up is rolled back
        for n in 0..config.min_pool_size() {
            match self.connector.connect(config).await {
                Ok(conn) => pool.idle.lock().push(IdleConn::new(conn)),
                Err(e) => {
                    let opened: Vec<IdleConn> = pool.idle.lock().drain(..).collect();
                    for mut entry in opened {
                        if let Err(close_err) = entry.conn.close().await {
                            debug!(error = %close_err, "failed to close connection during rollback");
                        }
                    }
                    return Err(PoolError::PoolCreationFailed(format!(
                        "connection {} of {}: {}",
                        n + 1,
                        config.min_pool_size(),
                        e
                    )));
                }
            }
        }

        Ok(Arc::new(pool))
    }
}

struct IdleConn {
    conn: Box<dyn PoolConnection>,
    since: Instant,
}

impl IdleConn {
    fn new(conn: Box<dyn PoolConnection>) -> Self {
        Self {
            conn,
            since: Instant::now(),
        }
    }
}

struct PooledPool {
    connector: Arc<dyn Connector>,
    config: PoolConfig,
    // one permit per checkout slot; idle connections hold no permit. The
    // shared pieces are Arc'd so a dial abandoned at the timeout boundary
    // can still settle into the pool from a background task.
    semaphore: Arc<Semaphore>,
    idle: Arc<Mutex<Vec<IdleConn>>>,
    busy: AtomicU32,
    closed: Arc<AtomicBool>,
}

impl PooledPool {
    /// Decrements the busy count, refusing to go below zero. A false return
    /// means the connection was not checked out of this pool.
    fn checkin_accounting(&self) -> bool {
        self.busy
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |b| b.checked_sub(1))
            .is_ok()
    }

    /// Lets a dial the caller timed out on finish in the background. A
    /// connection that completes goes onto the idle stack rather than being
    /// dropped, and the abandoned checkout's capacity slot comes back once
    /// the dial settles either way.
    fn adopt_abandoned_dial(&self, dial: JoinHandle<Result<Box<dyn PoolConnection>>>) {
        let idle = self.idle.clone();
        let semaphore = self.semaphore.clone();
        let closed = self.closed.clone();
        tokio::spawn(async move {
            match dial.await {
                Ok(Ok(mut conn)) => {
                    if closed.load(Ordering::SeqCst) {
                        if let Err(e) = conn.close().await {
                            debug!(error = %e, "failed to close connection dialed after shutdown");
                        }
                    } else {
                        idle.lock().push(IdleConn::new(conn));
                    }
                }
                Ok(Err(e)) => debug!(error = %e, "abandoned dial failed"),
                Err(e) => debug!(error = %e, "abandoned dial task failed"),
            }
            semaphore.add_permits(1);
        });
    }
}

#[async_trait]
impl BackendPool for PooledPool {
    async fn acquire(&self, timeout: Option<Duration>) -> Result<Box<dyn PoolConnection>> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(PoolError::IllegalState("pool is shut down".to_string()));
        }
        let started = Instant::now();

        // wait for a checkout slot; a waiter cancelled by the timeout never
        // holds a permit, so capacity cannot leak
        let permit = match timeout {
            Some(t) => match tokio::time::timeout(t, self.semaphore.acquire()).await {
                Ok(acquired) => acquired,
                Err(_) => return Err(PoolError::CheckoutTimeout(t.as_millis() as u64)),
            },
            None => self.semaphore.acquire().await,
        };
        let permit =
            permit.map_err(|_| PoolError::Backend("pool is shut down".to_string()))?;
        // the slot is handed to the connection and restored on checkin
        permit.forget();

        // newest idle connection first
        if let Some(entry) = self.idle.lock().pop() {
            self.busy.fetch_add(1, Ordering::SeqCst);
            return Ok(entry.conn);
        }

        // the dial runs on its own task so a connection that completes
        // exactly at the deadline can still be pooled
        let connector = self.connector.clone();
        let config = self.config.clone();
        let mut dial = tokio::spawn(async move { connector.connect(&config).await });

        // the checkout timeout covers the dial as well as the permit wait
        let dialed = match timeout {
            Some(t) => {
                let remaining = t.saturating_sub(started.elapsed());
                match tokio::time::timeout(remaining, &mut dial).await {
                    Ok(joined) => joined,
                    Err(_) => {
                        self.adopt_abandoned_dial(dial);
                        return Err(PoolError::CheckoutTimeout(t.as_millis() as u64));
                    }
                }
            }
            None => (&mut dial).await,
        };

        match dialed {
            Ok(Ok(conn)) => {
                self.busy.fetch_add(1, Ordering::SeqCst);
                Ok(conn)
            }
            Ok(Err(e)) => {
                self.semaphore.add_permits(1);
                Err(PoolError::Backend(format!("failed to open connection: {}", e)))
            }
            Err(e) => {
                self.semaphore.add_permits(1);
                Err(PoolError::Backend(format!("connection dial failed: {}", e)))
            }
        }
    }

    async fn release(&self, mut conn: Box<dyn PoolConnection>) {
        if self.closed.load(Ordering::SeqCst) {
            if let Err(e) = conn.close().await {
                debug!(error = %e, "failed to close connection released after shutdown");
            }
            return;
        }
        if !self.checkin_accounting() {
            warn!("connection released with no checkouts outstanding; discarding");
            if let Err(e) = conn.close().await {
                debug!(error = %e, "failed to close stray connection");
            }
            return;
        }
        self.idle.lock().push(IdleConn::new(conn));
        self.semaphore.add_permits(1);
    }

    async fn discard(&self, mut conn: Box<dyn PoolConnection>) {
        if self.checkin_accounting() && !self.closed.load(Ordering::SeqCst) {
            self.semaphore.add_permits(1);
        }
        if let Err(e) = conn.close().await {
            debug!(error = %e, "failed to close discarded connection");
        }
    }

    fn snapshot(&self) -> Result<PoolSnapshot> {
        let idle = self.idle.lock().len() as u32;
        let busy = self.busy.load(Ordering::SeqCst);
        Ok(PoolSnapshot {
            idle: Some(idle),
            busy: Some(busy),
            total: Some(idle + busy),
        })
    }

    async fn validate_idle(&self, older_than: Duration, query: &str) -> Result<usize> {
        // pull stale entries out under the lock, validate them without it
        let stale: Vec<IdleConn> = {
            let mut idle = self.idle.lock();
            let (stale, keep) = idle
                .drain(..)
                .partition(|entry| entry.since.elapsed() >= older_than);
            *idle = keep;
            stale
        };

        let mut evicted = 0;
        for mut entry in stale {
            match entry.conn.execute(query).await {
                Ok(()) => self.idle.lock().push(IdleConn::new(entry.conn)),
                Err(e) => {
                    debug!(error = %e, "evicting idle connection that failed validation");
                    if let Err(close_err) = entry.conn.close().await {
                        debug!(error = %close_err, "failed to close evicted connection");
                    }
                    evicted += 1;
                }
            }
        }
        Ok(evicted)
    }

    async fn shutdown(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        // fail waiters promptly instead of leaving them parked
        self.semaphore.close();

        let drained: Vec<IdleConn> = self.idle.lock().drain(..).collect();
        for mut entry in drained {
            if let Err(e) = entry.conn.close().await {
                debug!(error = %e, "failed to close idle connection during shutdown");
            }
        }
        Ok(())
    }
}
