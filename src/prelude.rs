pub use crate::adapter::{
    adapter_for, BackendPool, Connector, PoolAdapter, PoolConnection, PoolSnapshot,
};
pub use crate::adapters::{BasicAdapter, PooledAdapter};
pub use crate::config::{PoolConfig, ProviderKind};
pub use crate::error::{PoolError, Result};
pub use crate::managed::{ManagedPool, PoolState};
pub use crate::registry::{BatchReport, PoolRegistry};
pub use crate::vendor::DatabaseVendor;
