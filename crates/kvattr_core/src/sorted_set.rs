//! Sorted-set collections.

use kvattr_store::{Pool, StoreResult};
use tracing::debug;

/// A handle on one sorted set in the store.
///
/// Nothing is cached: every call is one round trip on a pooled connection,
/// and failures are the store's own errors. Scores are integers.
///
/// # Example
///
/// ```rust
/// use kvattr_core::SortedSet;
/// use kvattr_store::{MemoryStore, Pool, PoolOptions};
///
/// let pool = Pool::new("default", PoolOptions::default(), MemoryStore::new());
/// let ranks = SortedSet::new("posts:1:ranks", pool);
///
/// ranks.rebuild_with(["gold", "silver", "bronze"]).unwrap();
/// assert_eq!(ranks.score("silver").unwrap(), Some(1));
/// assert_eq!(ranks.incr("bronze", 5).unwrap(), 7);
/// assert_eq!(ranks.all().unwrap(), vec!["gold", "silver", "bronze"]);
/// ```
#[derive(Debug, Clone)]
pub struct SortedSet {
    key: String,
    pool: Pool,
}

impl SortedSet {
    /// Creates a handle on the sorted set at `key`.
    pub fn new(key: impl Into<String>, pool: Pool) -> Self {
        Self {
            key: key.into(),
            pool,
        }
    }

    /// Store key of this set.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Inserts `member`, or moves it to `score`.
    pub fn add(&self, member: &str, score: i64) -> StoreResult<()> {
        self.pool
            .with_connection(|conn| conn.zset(&self.key, member, score))
    }

    /// Score of `member`, `None` if it is not in the set.
    pub fn score(&self, member: &str) -> StoreResult<Option<i64>> {
        self.pool.with_connection(|conn| conn.zscore(&self.key, member))
    }

    /// Removes every member. Returns how many there were.
    pub fn clear(&self) -> StoreResult<u64> {
        self.pool.with_connection(|conn| conn.zclear(&self.key))
    }

    /// Number of members.
    pub fn count(&self) -> StoreResult<u64> {
        self.pool.with_connection(|conn| conn.zcard(&self.key))
    }

    /// Every member, lowest score first.
    pub fn all(&self) -> StoreResult<Vec<String>> {
        self.range(0, None)
    }

    /// Members from rank `offset`, at most `limit` of them.
    pub fn range(&self, offset: usize, limit: Option<usize>) -> StoreResult<Vec<String>> {
        self.pool
            .with_connection(|conn| conn.zrange(&self.key, offset, limit))
    }

    /// Adds `delta` to the score of `member` and returns the new score.
    /// A missing member starts from zero.
    pub fn incr(&self, member: &str, delta: i64) -> StoreResult<i64> {
        self.pool
            .with_connection(|conn| conn.zincr(&self.key, member, delta))
    }

    /// Adds one to the score of `member`.
    pub fn increment(&self, member: &str) -> StoreResult<i64> {
        self.incr(member, 1)
    }

    /// Replaces the set with `members`, scored by position from zero.
    ///
    /// The clear and the inserts run on one connection but are not atomic:
    /// a concurrent reader may see the set empty or partly rebuilt.
    pub fn rebuild_with<I, S>(&self, members: I) -> StoreResult<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.pool.with_connection(|conn| {
            conn.zclear(&self.key)?;
            let mut written = 0usize;
            for (rank, member) in members.into_iter().enumerate() {
                conn.zset(&self.key, member.as_ref(), rank as i64)?;
                written += 1;
            }
            debug!(key = %self.key, members = written, "rebuilt sorted set");
            Ok(())
        })
    }
}
