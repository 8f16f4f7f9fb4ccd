//! Pool configuration.

use crate::error::{RegistryError, RegistryResult};
use crate::pool::PoolOptions;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Port used when an address names no port (the SSDB default).
pub const DEFAULT_PORT: u16 = 8888;

/// Name given to a pool configured on its own without a name.
pub const DEFAULT_POOL_NAME: &str = "default";

/// Command dialect spoken by the store behind a pool.
///
/// Both dialects use the Redis wire protocol; they only differ in how a
/// sorted set is cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dialect {
    /// SSDB: sorted sets are cleared with `ZCLEAR`.
    #[default]
    Ssdb,
    /// Redis: sorted sets are cleared with `DEL`.
    Redis,
}

fn default_pool_size() -> usize {
    PoolOptions::default().size
}

fn default_timeout_secs() -> u64 {
    PoolOptions::default().timeout.as_secs()
}

/// Configuration of one named connection pool.
///
/// The address is taken from `url` when present, otherwise from
/// `host`/`port`.
///
/// ```rust
/// use kvattr_store::PoolConfig;
///
/// let config = PoolConfig::from_url("redis://localhost:8888")
///     .with_name("ssdb")
///     .with_pool_size(10)
///     .as_default();
/// assert_eq!(config.address().unwrap(), "localhost:8888");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Pool name. Required when more than one pool is configured.
    #[serde(default)]
    pub name: Option<String>,
    /// Store URL, e.g. `redis://localhost:8888`.
    #[serde(default)]
    pub url: Option<String>,
    /// Store host, used when no URL is given.
    #[serde(default)]
    pub host: Option<String>,
    /// Store port, used when no URL is given.
    #[serde(default)]
    pub port: Option<u16>,
    /// Maximum number of connections.
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
    /// Checkout and socket timeout, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout: u64,
    /// Whether this is the default pool.
    #[serde(default)]
    pub default: bool,
    /// Command dialect.
    #[serde(default)]
    pub dialect: Dialect,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            name: None,
            url: None,
            host: None,
            port: None,
            pool_size: default_pool_size(),
            timeout: default_timeout_secs(),
            default: false,
            dialect: Dialect::default(),
        }
    }
}

impl PoolConfig {
    /// Creates a configuration pointing at `url`.
    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Self::default()
        }
    }

    /// Creates a configuration pointing at `host:port`.
    pub fn from_host(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: Some(host.into()),
            port: Some(port),
            ..Self::default()
        }
    }

    /// Sets the pool name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the maximum number of connections.
    #[must_use]
    pub fn with_pool_size(mut self, size: usize) -> Self {
        self.pool_size = size;
        self
    }

    /// Sets the timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout.as_secs();
        self
    }

    /// Sets the command dialect.
    #[must_use]
    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    /// Flags this pool as the default one.
    #[must_use]
    pub fn as_default(mut self) -> Self {
        self.default = true;
        self
    }

    /// Returns the timeout as a duration.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    /// Returns the pool sizing options.
    ///
    /// # Errors
    ///
    /// Fails if the pool size is zero.
    pub fn pool_options(&self) -> RegistryResult<PoolOptions> {
        if self.pool_size == 0 {
            return Err(RegistryError::invalid_option("pool_size must be greater than zero"));
        }
        Ok(PoolOptions {
            size: self.pool_size,
            timeout: self.timeout(),
        })
    }

    /// Resolves the `host:port` address to connect to.
    ///
    /// # Errors
    ///
    /// Fails if neither a URL nor a host is configured, or the URL cannot
    /// be parsed.
    pub fn address(&self) -> RegistryResult<String> {
        if let Some(url) = &self.url {
            return parse_url(url);
        }
        match &self.host {
            Some(host) if !host.is_empty() => {
                Ok(join_host_port(host, self.port.unwrap_or(DEFAULT_PORT)))
            }
            _ => Err(RegistryError::invalid_address("either url or host must be configured")),
        }
    }
}

/// Extracts `host:port` from a URL such as `redis://user:pw@host:port/0`.
///
/// # Errors
///
/// Fails on a missing host or a non-numeric port.
pub fn parse_url(url: &str) -> RegistryResult<String> {
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    let authority = rest.split(['/', '?']).next().unwrap_or_default();
    let host_port = authority.rsplit_once('@').map_or(authority, |(_, hp)| hp);

    let (host, port) = if let Some(bracketed) = host_port.strip_prefix('[') {
        let (host, tail) = bracketed
            .split_once(']')
            .ok_or_else(|| RegistryError::invalid_address(format!("unterminated IPv6 host in {url}")))?;
        (host, tail.strip_prefix(':'))
    } else {
        match host_port.rsplit_once(':') {
            Some((host, port)) => (host, Some(port)),
            None => (host_port, None),
        }
    };

    if host.is_empty() {
        return Err(RegistryError::invalid_address(format!("no host in {url}")));
    }

    let port = match port {
        Some(p) => p
            .parse::<u16>()
            .map_err(|_| RegistryError::invalid_address(format!("invalid port in {url}")))?,
        None => DEFAULT_PORT,
    };

    Ok(join_host_port(host, port))
}

fn join_host_port(host: &str, port: u16) -> String {
    if host.contains(':') {
        format!("[{host}]:{port}")
    } else {
        format!("{host}:{port}")
    }
}

/// The pool section of a configuration: one pool, or a list of named pools.
///
/// Deserializes from either a single map or a list of maps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RegistryConfig {
    /// A single pool; it is the default pool whatever its flag says.
    Single(PoolConfig),
    /// Several named pools, exactly one flagged default.
    Many(Vec<PoolConfig>),
}

impl From<PoolConfig> for RegistryConfig {
    fn from(config: PoolConfig) -> Self {
        RegistryConfig::Single(config)
    }
}

impl From<Vec<PoolConfig>> for RegistryConfig {
    fn from(configs: Vec<PoolConfig>) -> Self {
        RegistryConfig::Many(configs)
    }
}
