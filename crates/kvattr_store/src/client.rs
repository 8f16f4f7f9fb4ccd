//! Store client trait definition.

use crate::error::StoreResult;

/// A single connection to a key-value / sorted-set store.
///
/// Clients are **thin**: every method is one round trip and carries no
/// knowledge of attributes, schemas or keys. Higher layers decide what to
/// read and write; a client only moves strings.
///
/// Clients are checked out of a [`crate::Pool`] for the duration of one
/// scoped operation and are never shared between threads while in use,
/// hence `&mut self` and only a `Send` bound.
///
/// # Batch methods
///
/// `multi_get`, `multi_set` and `delete` must issue exactly one round trip
/// for a non-empty batch and none for an empty one.
///
/// # Implementors
///
/// - [`crate::MemoryConnection`] - For testing
/// - [`crate::RespClient`] - Redis-protocol client over TCP
pub trait StoreClient: Send {
    /// Reads the string stored at `key`, `None` if absent.
    fn get(&mut self, key: &str) -> StoreResult<Option<String>>;

    /// Reads several keys at once. The result is positional.
    fn multi_get(&mut self, keys: &[String]) -> StoreResult<Vec<Option<String>>>;

    /// Stores `value` at `key`.
    fn set(&mut self, key: &str, value: &str) -> StoreResult<()>;

    /// Stores several key/value pairs at once.
    fn multi_set(&mut self, pairs: &[(String, String)]) -> StoreResult<()>;

    /// Removes the given scalar keys. Returns how many existed.
    fn delete(&mut self, keys: &[String]) -> StoreResult<u64>;

    /// Returns the score of `member` in the sorted set at `key`.
    fn zscore(&mut self, key: &str, member: &str) -> StoreResult<Option<i64>>;

    /// Inserts or updates `member` with `score`.
    fn zset(&mut self, key: &str, member: &str, score: i64) -> StoreResult<()>;

    /// Adds `delta` to the score of `member` (absent members start at 0)
    /// and returns the new score.
    fn zincr(&mut self, key: &str, member: &str, delta: i64) -> StoreResult<i64>;

    /// Removes every member of the sorted set at `key`. Returns how many
    /// members were removed.
    fn zclear(&mut self, key: &str) -> StoreResult<u64>;

    /// Returns the number of members in the sorted set at `key`.
    fn zcard(&mut self, key: &str) -> StoreResult<u64>;

    /// Returns members in ascending score order, skipping `offset` members
    /// and returning at most `limit` (all remaining when `None`).
    fn zrange(&mut self, key: &str, offset: usize, limit: Option<usize>)
        -> StoreResult<Vec<String>>;
}
