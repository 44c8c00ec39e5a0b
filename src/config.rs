//! Pool configuration: validated settings plus vendor-derived defaults.

use std::fmt;

use crate::{
    error::{PoolError, Result},
    vendor::DatabaseVendor,
};

/// Which pooling backend a [`PoolConfig`] is intended for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProviderKind {
    /// No pooling: every checkout dials a fresh physical connection.
    Basic,
    /// The built-in pooling engine.
    Pooled,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::Basic => write!(f, "BASIC"),
            ProviderKind::Pooled => write!(f, "POOLED"),
        }
    }
}

/// Configuration for a managed connection pool.
///
/// Built up through validating setters, then handed to a
/// [`ManagedPool`](crate::managed::ManagedPool). Setting the vendor (directly
/// or indirectly through [`set_url`](Self::set_url)) back-fills the driver
/// class and validation query from the vendor registry, but only for fields
/// that have not been set explicitly.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    provider: ProviderKind,
    vendor: Option<DatabaseVendor>,
    driver: Option<String>,
    name: Option<String>,
    url: Option<String>,
    username: Option<String>,
    password: Option<String>,
    min_pool_size: u32,
    max_pool_size: u32,
    checkout_timeout_ms: u64,
    validate_on_checkout: bool,
    validate_on_checkin: bool,
    validate_idle_connection_timeout_ms: u64,
    validation_query: Option<String>,
    checkout_validation_retries: u32,
    jmx: bool,
    jmx_domain: String,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            // the pooling engine is the default provider
            provider: ProviderKind::Pooled,
            vendor: None,
            driver: None,
            name: None,
            url: None,
            username: None,
            password: None,
            min_pool_size: 1,
            max_pool_size: 10,
            checkout_timeout_ms: 15_000,
            validate_on_checkout: false,
            validate_on_checkin: false,
            validate_idle_connection_timeout_ms: 0,
            validation_query: None,
            checkout_validation_retries: 3,
            jmx: true,
            jmx_domain: "com.cloudhopper".to_string(),
        }
    }
}

impl PoolConfig {
    /// Create a configuration with all defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the JDBC url used to connect to the database.
    ///
    /// The url must begin with `jdbc:`, followed by a protocol token ending
    /// in `:` and an optional sub-protocol token up to the next `:`. The
    /// token pair is mapped to a vendor (for example `jdbc:mysql://...` maps
    /// to MySQL and `jdbc:jtds:sqlserver://...` to SQL Server), which seeds
    /// the driver and validation-query defaults if those are still unset.
    /// Unmapped protocols are rejected and the stored url is left unchanged.
    pub fn set_url(&mut self, url: &str) -> Result<()> {
        let rest = url.strip_prefix("jdbc:").ok_or_else(|| {
            PoolError::InvalidUrl("does not start with 'jdbc:'".to_string())
        })?;

        // protocol token runs up to the next ':' after the prefix
        let protocol_end = rest.find(':').ok_or_else(|| {
            PoolError::InvalidUrl(
                "does not start with a protocol that ends in ':' such as 'jdbc:protocol:'"
                    .to_string(),
            )
        })?;
        let protocol = &rest[..protocol_end];

        // optional sub-protocol token up to the following ':'
        let after = &rest[protocol_end + 1..];
        let sub_protocol = match after.find(':') {
            Some(pos) => &after[..pos],
            None => "",
        };

        let vendor = DatabaseVendor::from_jdbc_protocol(protocol, sub_protocol).ok_or_else(
            || {
                let shown = if sub_protocol.is_empty() {
                    protocol.to_string()
                } else {
                    format!("{}:{}", protocol, sub_protocol)
                };
                PoolError::InvalidUrl(format!("unsupported protocol '{}'", shown))
            },
        )?;

        // url-derived vendor never overrides an explicitly set one
        if self.vendor.is_none() {
            self.set_vendor(vendor);
        }
        self.url = Some(url.to_string());
        Ok(())
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// Sets the database vendor and back-fills the driver class and
    /// validation query from the vendor registry, leaving any explicitly set
    /// values untouched.
    pub fn set_vendor(&mut self, vendor: DatabaseVendor) {
        if self.driver.is_none() {
            self.driver = Some(vendor.default_driver().to_string());
        }
        if self.validation_query.is_none() {
            self.validation_query = Some(vendor.default_validation_query().to_string());
        }
        self.vendor = Some(vendor);
    }

    pub fn vendor(&self) -> Option<DatabaseVendor> {
        self.vendor
    }

    pub fn set_provider(&mut self, provider: ProviderKind) {
        self.provider = provider;
    }

    pub fn provider(&self) -> ProviderKind {
        self.provider
    }

    /// Sets the database driver class. Normally derived from the vendor.
    pub fn set_driver(&mut self, driver: impl Into<String>) {
        self.driver = Some(driver.into());
    }

    pub fn driver(&self) -> Option<&str> {
        self.driver.as_deref()
    }

    /// Sets the logical name of this pool, used as the registry key and for
    /// logging and metrics naming.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = Some(name.into());
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn set_username(&mut self, username: impl Into<String>) {
        self.username = Some(username.into());
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn set_password(&mut self, password: impl Into<String>) {
        self.password = Some(password.into());
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    /// Sets the minimum number of pooled connections. Default is 1.
    pub fn set_min_pool_size(&mut self, size: u32) -> Result<()> {
        if size == 0 {
            return Err(PoolError::ConfigError(
                "min pool size must be > 0".to_string(),
            ));
        }
        self.min_pool_size = size;
        Ok(())
    }

    pub fn min_pool_size(&self) -> u32 {
        self.min_pool_size
    }

    /// Sets the maximum number of pooled connections. Default is 10.
    pub fn set_max_pool_size(&mut self, size: u32) -> Result<()> {
        if size == 0 {
            return Err(PoolError::ConfigError(
                "max pool size must be > 0".to_string(),
            ));
        }
        self.max_pool_size = size;
        Ok(())
    }

    pub fn max_pool_size(&self) -> u32 {
        self.max_pool_size
    }

    /// Sets the number of milliseconds a checkout waits for a connection
    /// when the pool is exhausted. Zero means wait indefinitely. Default is
    /// 15000 (15 seconds).
    pub fn set_checkout_timeout(&mut self, ms: u64) {
        self.checkout_timeout_ms = ms;
    }

    pub fn checkout_timeout(&self) -> u64 {
        self.checkout_timeout_ms
    }

    /// Sets whether a connection is validated on checkout. Guarantees a
    /// valid connection at the cost of a round trip per checkout. Default is
    /// false.
    pub fn set_validate_on_checkout(&mut self, flag: bool) {
        self.validate_on_checkout = flag;
    }

    pub fn validate_on_checkout(&self) -> bool {
        self.validate_on_checkout
    }

    /// Sets whether a connection is validated after checkin. Validation runs
    /// asynchronously and never blocks the caller returning the connection.
    /// Default is false.
    pub fn set_validate_on_checkin(&mut self, flag: bool) {
        self.validate_on_checkin = flag;
    }

    pub fn validate_on_checkin(&self) -> bool {
        self.validate_on_checkin
    }

    /// Sets the number of milliseconds a connection may sit idle before the
    /// background task validates it. Zero disables idle validation. Default
    /// is zero.
    pub fn set_validate_idle_connection_timeout(&mut self, ms: u64) {
        self.validate_idle_connection_timeout_ms = ms;
    }

    pub fn validate_idle_connection_timeout(&self) -> u64 {
        self.validate_idle_connection_timeout_ms
    }

    /// Sets the SQL query used to validate a connection. Normally derived
    /// from the vendor.
    pub fn set_validation_query(&mut self, query: impl Into<String>) {
        self.validation_query = Some(query.into());
    }

    pub fn validation_query(&self) -> Option<&str> {
        self.validation_query.as_deref()
    }

    /// Sets how many acquisition attempts a checkout makes before giving up
    /// when validate-on-checkout keeps rejecting connections. Default is 3.
    pub fn set_checkout_validation_retries(&mut self, retries: u32) -> Result<()> {
        if retries == 0 {
            return Err(PoolError::ConfigError(
                "checkout validation retries must be > 0".to_string(),
            ));
        }
        self.checkout_validation_retries = retries;
        Ok(())
    }

    pub fn checkout_validation_retries(&self) -> u32 {
        self.checkout_validation_retries
    }

    /// Advisory flag for an external JMX registrar. Default is true.
    pub fn set_jmx(&mut self, flag: bool) {
        self.jmx = flag;
    }

    pub fn jmx(&self) -> bool {
        self.jmx
    }

    /// Advisory JMX domain for an external registrar. Default is
    /// "com.cloudhopper".
    pub fn set_jmx_domain(&mut self, domain: impl Into<String>) {
        self.jmx_domain = domain.into();
    }

    pub fn jmx_domain(&self) -> &str {
        &self.jmx_domain
    }

    /// Cross-field check run when a pool starts.
    pub fn validate(&self) -> Result<()> {
        if self.max_pool_size < self.min_pool_size {
            return Err(PoolError::ConfigError(format!(
                "max pool size {} is less than min pool size {}",
                self.max_pool_size, self.min_pool_size
            )));
        }
        if self.url.is_none() {
            return Err(PoolError::ConfigError("no url configured".to_string()));
        }
        Ok(())
    }
}

impl fmt::Display for PoolConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // the password is masked whenever credentials are present
        write!(
            f,
            "[name={}, provider={}, vendor={}, driver={}, url={{{}}}, username={}, password={}]",
            self.name.as_deref().unwrap_or("null"),
            self.provider,
            self.vendor
                .map(|v| v.to_string())
                .unwrap_or_else(|| "null".to_string()),
            self.driver.as_deref().unwrap_or("null"),
            self.url.as_deref().unwrap_or("null"),
            self.username.as_deref().unwrap_or("null"),
            if self.username.is_some() { "*****" } else { "null" },
        )
    }
}
