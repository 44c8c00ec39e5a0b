//! A named collection of managed pools with coordinated lifecycle control.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::info;

use crate::{
    adapter::PoolAdapter,
    config::PoolConfig,
    error::{PoolError, Result},
    managed::ManagedPool,
};

/// Per-pool outcomes of a batch start or stop, in registration order.
///
/// Batch operations never abort on the first failure; callers inspect the
/// report to decide overall success.
#[derive(Debug, Default)]
pub struct BatchReport {
    outcomes: Vec<(String, Result<()>)>,
}

impl BatchReport {
    fn push(&mut self, name: String, result: Result<()>) {
        self.outcomes.push((name, result));
    }

    /// True when every pool in the batch succeeded.
    pub fn succeeded(&self) -> bool {
        self.outcomes.iter().all(|(_, result)| result.is_ok())
    }

    /// The pools that failed, with their errors.
    pub fn failures(&self) -> impl Iterator<Item = (&str, &PoolError)> {
        self.outcomes.iter().filter_map(|(name, result)| {
            result.as_ref().err().map(|e| (name.as_str(), e))
        })
    }

    /// All per-pool outcomes in registration order.
    pub fn outcomes(&self) -> &[(String, Result<()>)] {
        &self.outcomes
    }
}

/// Registry of managed pools keyed by their configured name.
#[derive(Default)]
pub struct PoolRegistry {
    // a Vec keeps registration order for batch operations
    entries: Mutex<Vec<(String, Arc<ManagedPool>)>>,
}

impl PoolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Constructs a managed pool in `Created` state and registers it under
    /// the configuration's name. The name must be set and not already in
    /// use.
    pub fn register(
        &self,
        config: PoolConfig,
        adapter: Arc<dyn PoolAdapter>,
    ) -> Result<Arc<ManagedPool>> {
        let name = config
            .name()
            .ok_or_else(|| {
                PoolError::ConfigError("cannot register a pool without a name".to_string())
            })?
            .to_string();

        let mut entries = self.entries.lock();
        if entries.iter().any(|(existing, _)| existing == &name) {
            return Err(PoolError::DuplicateName(name));
        }

        let pool = Arc::new(ManagedPool::new(config, adapter));
        entries.push((name.clone(), pool.clone()));
        info!(pool = %name, "pool registered");
        Ok(pool)
    }

    /// Looks up a pool by name.
    pub fn lookup(&self, name: &str) -> Option<Arc<ManagedPool>> {
        self.entries
            .lock()
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, pool)| pool.clone())
    }

    /// Removes a pool from the registry, returning it. Stopping the pool is
    /// left to the caller.
    pub fn remove(&self, name: &str) -> Option<Arc<ManagedPool>> {
        let mut entries = self.entries.lock();
        let position = entries.iter().position(|(existing, _)| existing == name)?;
        let (_, pool) = entries.remove(position);
        info!(pool = %name, "pool deregistered");
        Some(pool)
    }

    /// Registered pool names in registration order.
    pub fn names(&self) -> Vec<String> {
        self.entries
            .lock()
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Starts every registered pool in registration order, collecting each
    /// pool's outcome instead of aborting on the first failure.
    pub async fn start_all(&self) -> BatchReport {
        let mut report = BatchReport::default();
        for (name, pool) in self.snapshot_entries() {
            report.push(name, pool.start().await);
        }
        report
    }

    /// Stops every registered pool in registration order. Stop itself never
    /// fails, so the report only records successes; it is returned for
    /// symmetry with [`start_all`](Self::start_all).
    pub async fn stop_all(&self) -> BatchReport {
        let mut report = BatchReport::default();
        for (name, pool) in self.snapshot_entries() {
            pool.stop().await;
            report.push(name, Ok(()));
        }
        report
    }

    // copies the entry list out so batch operations never hold the lock
    // across await points
    fn snapshot_entries(&self) -> Vec<(String, Arc<ManagedPool>)> {
        self.entries.lock().clone()
    }
}
