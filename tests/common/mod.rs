//! Common utilities for tests: a scriptable stub connector standing in for
//! a real database transport.

use std::sync::{
    atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering},
    Arc,
};

use async_trait::async_trait;
use parking_lot::Mutex;

use db_poolkit::{Connector, PoolConfig, PoolConnection, PoolError, Result};

/// Initialize tracing for tests if it hasn't been already
#[allow(dead_code)]
pub fn init_tracing() {
    // Delegate to the central init_tracing function
    db_poolkit::init_tracing();
}

/// Observable state of one stub connection, kept by the connector so tests
/// can flip validity and assert closes after the connection is handed out.
pub struct ConnProbe {
    pub valid: Arc<AtomicBool>,
    pub closed: Arc<AtomicBool>,
}

/// A stub physical connection. `execute` succeeds while the connection is
/// marked valid; `close` records itself on the probe.
pub struct StubConnection {
    valid: Arc<AtomicBool>,
    closed: Arc<AtomicBool>,
    executed: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl PoolConnection for StubConnection {
    async fn execute(&mut self, sql: &str) -> Result<()> {
        self.executed.lock().push(sql.to_string());
        if self.valid.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(PoolError::Backend("connection has gone away".to_string()))
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// A connector that fabricates [`StubConnection`]s, with switches for the
/// failure modes the pool has to handle.
pub struct StubConnector {
    dialed: AtomicU32,
    // dial attempts from this count onward fail; u32::MAX means never
    fail_from: AtomicU32,
    // dial attempts from this count onward never complete
    hang_from: AtomicU32,
    // milliseconds each dial takes; 0 means instant
    dial_delay_ms: AtomicU64,
    // when set, newly dialed connections start out invalid
    dial_invalid: AtomicBool,
    probes: Mutex<Vec<ConnProbe>>,
    executed: Arc<Mutex<Vec<String>>>,
}

impl Default for StubConnector {
    fn default() -> Self {
        Self {
            dialed: AtomicU32::new(0),
            fail_from: AtomicU32::new(u32::MAX),
            hang_from: AtomicU32::new(u32::MAX),
            dial_delay_ms: AtomicU64::new(0),
            dial_invalid: AtomicBool::new(false),
            probes: Mutex::new(Vec::new()),
            executed: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl StubConnector {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Number of physical connections dialed so far.
    #[allow(dead_code)]
    pub fn dialed(&self) -> u32 {
        self.dialed.load(Ordering::SeqCst)
    }

    /// Number of connections that have been closed.
    #[allow(dead_code)]
    pub fn closed_count(&self) -> usize {
        self.probes
            .lock()
            .iter()
            .filter(|probe| probe.closed.load(Ordering::SeqCst))
            .count()
    }

    /// Make `connect` fail until cleared.
    #[allow(dead_code)]
    pub fn set_fail_connect(&self, fail: bool) {
        let from = if fail { 0 } else { u32::MAX };
        self.fail_from.store(from, Ordering::SeqCst);
    }

    /// Allow `count` more successful dials, then fail.
    #[allow(dead_code)]
    pub fn fail_after(&self, count: u32) {
        let from = self.dialed.load(Ordering::SeqCst) + count;
        self.fail_from.store(from, Ordering::SeqCst);
    }

    /// Make every further dial stall forever.
    #[allow(dead_code)]
    pub fn hang_dials(&self) {
        self.hang_from
            .store(self.dialed.load(Ordering::SeqCst), Ordering::SeqCst);
    }

    /// Make every further dial take `ms` milliseconds.
    #[allow(dead_code)]
    pub fn set_dial_delay(&self, ms: u64) {
        self.dial_delay_ms.store(ms, Ordering::SeqCst);
    }

    /// Every statement executed on any connection, in order.
    #[allow(dead_code)]
    pub fn executed_queries(&self) -> Vec<String> {
        self.executed.lock().clone()
    }

    /// Make newly dialed connections invalid until cleared.
    #[allow(dead_code)]
    pub fn set_dial_invalid(&self, invalid: bool) {
        self.dial_invalid.store(invalid, Ordering::SeqCst);
    }

    /// Mark every connection dialed so far as invalid.
    #[allow(dead_code)]
    pub fn invalidate_all(&self) {
        for probe in self.probes.lock().iter() {
            probe.valid.store(false, Ordering::SeqCst);
        }
    }

    /// Mark the `index`-th dialed connection as invalid.
    #[allow(dead_code)]
    pub fn invalidate(&self, index: usize) {
        self.probes.lock()[index].valid.store(false, Ordering::SeqCst);
    }
}

#[async_trait]
impl Connector for StubConnector {
    async fn connect(&self, _config: &PoolConfig) -> Result<Box<dyn PoolConnection>> {
        if self.dialed.load(Ordering::SeqCst) >= self.fail_from.load(Ordering::SeqCst) {
            return Err(PoolError::Backend("database unreachable".to_string()));
        }
        if self.dialed.load(Ordering::SeqCst) >= self.hang_from.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        let delay = self.dial_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
        }

        let valid = Arc::new(AtomicBool::new(!self.dial_invalid.load(Ordering::SeqCst)));
        let closed = Arc::new(AtomicBool::new(false));
        self.probes.lock().push(ConnProbe {
            valid: valid.clone(),
            closed: closed.clone(),
        });
        self.dialed.fetch_add(1, Ordering::SeqCst);

        Ok(Box::new(StubConnection {
            valid,
            closed,
            executed: self.executed.clone(),
        }))
    }
}

/// A minimal valid configuration for a pooled backend.
#[allow(dead_code)]
pub fn pooled_config(name: &str) -> PoolConfig {
    let mut config = PoolConfig::new();
    config.set_name(name);
    config
        .set_url("jdbc:mysql://localhost:3306/testdb")
        .unwrap();
    config.set_username("app");
    config.set_password("secret");
    config
}
