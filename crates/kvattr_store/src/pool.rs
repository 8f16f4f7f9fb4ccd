//! Bounded connection pool.

use crate::client::StoreClient;
use crate::error::{StoreError, StoreResult};
use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Opens new store connections for a [`Pool`].
pub trait Connect: Send + Sync {
    /// Opens one connection.
    fn connect(&self) -> StoreResult<Box<dyn StoreClient>>;
}

impl<F> Connect for F
where
    F: Fn() -> StoreResult<Box<dyn StoreClient>> + Send + Sync,
{
    fn connect(&self) -> StoreResult<Box<dyn StoreClient>> {
        self()
    }
}

/// Sizing and blocking behaviour of a [`Pool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolOptions {
    /// Maximum number of open connections.
    pub size: usize,
    /// How long a checkout may block when every connection is busy.
    pub timeout: Duration,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            size: 5,
            timeout: Duration::from_secs(5),
        }
    }
}

impl PoolOptions {
    /// Sets the maximum number of connections.
    #[must_use]
    pub const fn with_size(mut self, size: usize) -> Self {
        self.size = size;
        self
    }

    /// Sets the checkout timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

struct PoolState {
    idle: Vec<Box<dyn StoreClient>>,
    open: usize,
}

struct PoolInner {
    name: String,
    options: PoolOptions,
    connector: Box<dyn Connect>,
    state: Mutex<PoolState>,
    available: Condvar,
}

/// A bounded set of reusable store connections.
///
/// Connections are opened lazily, up to [`PoolOptions::size`]. A checkout
/// blocks for at most [`PoolOptions::timeout`] when all of them are busy and
/// then fails with [`StoreError::PoolTimeout`]; it is never retried.
///
/// `Pool` is a cheap handle: clones share the same connections.
///
/// # Example
///
/// ```rust
/// use kvattr_store::{MemoryStore, Pool, PoolOptions};
///
/// let store = MemoryStore::new();
/// let pool = Pool::new("default", PoolOptions::default(), store.clone());
/// pool.with_connection(|conn| conn.set("k", "v")).unwrap();
/// assert_eq!(store.peek("k").as_deref(), Some("v"));
/// ```
#[derive(Clone)]
pub struct Pool {
    inner: Arc<PoolInner>,
}

impl fmt::Debug for Pool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("Pool")
            .field("name", &self.inner.name)
            .field("options", &self.inner.options)
            .field("open", &state.open)
            .field("idle", &state.idle.len())
            .finish()
    }
}

impl Pool {
    /// Creates a pool. No connection is opened until the first checkout.
    pub fn new(name: impl Into<String>, options: PoolOptions, connector: impl Connect + 'static) -> Self {
        Self::from_boxed(name, options, Box::new(connector))
    }

    /// Creates a pool around an already boxed connector.
    pub fn from_boxed(name: impl Into<String>, options: PoolOptions, connector: Box<dyn Connect>) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                name: name.into(),
                options,
                connector,
                state: Mutex::new(PoolState {
                    idle: Vec::new(),
                    open: 0,
                }),
                available: Condvar::new(),
            }),
        }
    }

    /// Returns the pool name.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Returns the pool options.
    pub fn options(&self) -> PoolOptions {
        self.inner.options
    }

    /// Number of connections currently open (idle or checked out).
    pub fn open_connections(&self) -> usize {
        self.inner.state.lock().open
    }

    /// Number of open connections waiting in the pool.
    pub fn idle_connections(&self) -> usize {
        self.inner.state.lock().idle.len()
    }

    /// Returns true if both handles refer to the same pool.
    pub fn ptr_eq(&self, other: &Pool) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Runs `f` with one checked-out connection.
    ///
    /// The connection goes back to the pool when `f` returns. It is closed
    /// instead, freeing its slot for a fresh one, when `f` panics or fails
    /// with a connection error (see [`StoreError::is_connection_error`]).
    pub fn with_connection<R, F>(&self, f: F) -> StoreResult<R>
    where
        F: FnOnce(&mut dyn StoreClient) -> StoreResult<R>,
    {
        let mut conn = self.checkout()?;
        let result = f(conn.client());
        if let Err(err) = &result {
            if err.is_connection_error() {
                warn!(pool = %self.inner.name, error = %err, "discarding broken connection");
                conn.discard();
            }
        }
        result
    }

    fn checkout(&self) -> StoreResult<PooledConnection<'_>> {
        let inner = &*self.inner;
        let deadline = Instant::now() + inner.options.timeout;
        let mut state = inner.state.lock();

        loop {
            if let Some(client) = state.idle.pop() {
                return Ok(PooledConnection::new(inner, client));
            }

            if state.open < inner.options.size {
                state.open += 1;
                drop(state);
                debug!(pool = %inner.name, "opening store connection");
                return match inner.connector.connect() {
                    Ok(client) => Ok(PooledConnection::new(inner, client)),
                    Err(err) => {
                        inner.release_slot();
                        Err(err)
                    }
                };
            }

            if inner.available.wait_until(&mut state, deadline).timed_out() {
                if let Some(client) = state.idle.pop() {
                    return Ok(PooledConnection::new(inner, client));
                }
                debug!(pool = %inner.name, "connection checkout timed out");
                return Err(StoreError::PoolTimeout {
                    pool: inner.name.clone(),
                    timeout: inner.options.timeout,
                });
            }
        }
    }
}

impl PoolInner {
    fn release_slot(&self) {
        let mut state = self.state.lock();
        state.open = state.open.saturating_sub(1);
        drop(state);
        self.available.notify_one();
    }

    fn check_in(&self, client: Box<dyn StoreClient>) {
        self.state.lock().idle.push(client);
        self.available.notify_one();
    }
}

/// A connection checked out of a [`Pool`], returned on drop.
struct PooledConnection<'a> {
    pool: &'a PoolInner,
    client: Option<Box<dyn StoreClient>>,
}

impl<'a> PooledConnection<'a> {
    fn new(pool: &'a PoolInner, client: Box<dyn StoreClient>) -> Self {
        Self {
            pool,
            client: Some(client),
        }
    }

    fn client(&mut self) -> &mut dyn StoreClient {
        self.client
            .as_deref_mut()
            .map(|client| client as &mut dyn StoreClient)
            .unwrap_or_else(|| unreachable!("pooled connection used after discard"))
    }

    fn discard(&mut self) {
        if self.client.take().is_some() {
            self.pool.release_slot();
        }
    }
}

impl Drop for PooledConnection<'_> {
    fn drop(&mut self) {
        // A panic may have left a reply unread on the connection.
        if std::thread::panicking() {
            self.discard();
        } else if let Some(client) = self.client.take() {
            self.pool.check_in(client);
        }
    }
}
