//! In-memory store for testing.

use crate::client::StoreClient;
use crate::error::{StoreError, StoreResult};
use crate::pool::Connect;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A command as it reached the in-memory store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `get`
    Get {
        /// Key read.
        key: String,
    },
    /// `multi_get`
    MultiGet {
        /// Keys read.
        keys: Vec<String>,
    },
    /// `set`
    Set {
        /// Key written.
        key: String,
        /// Value written.
        value: String,
    },
    /// `multi_set`
    MultiSet {
        /// Pairs written.
        pairs: Vec<(String, String)>,
    },
    /// `delete`
    Delete {
        /// Keys removed.
        keys: Vec<String>,
    },
    /// `zscore`
    ZScore {
        /// Sorted-set key.
        key: String,
        /// Member looked up.
        member: String,
    },
    /// `zset`
    ZSet {
        /// Sorted-set key.
        key: String,
        /// Member written.
        member: String,
        /// Score written.
        score: i64,
    },
    /// `zincr`
    ZIncr {
        /// Sorted-set key.
        key: String,
        /// Member incremented.
        member: String,
        /// Increment.
        delta: i64,
    },
    /// `zclear`
    ZClear {
        /// Sorted-set key.
        key: String,
    },
    /// `zcard`
    ZCard {
        /// Sorted-set key.
        key: String,
    },
    /// `zrange`
    ZRange {
        /// Sorted-set key.
        key: String,
        /// Members skipped.
        offset: usize,
        /// Maximum members returned.
        limit: Option<usize>,
    },
}

impl Command {
    /// Returns true for commands that modify the store.
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            Command::Set { .. }
                | Command::MultiSet { .. }
                | Command::Delete { .. }
                | Command::ZSet { .. }
                | Command::ZIncr { .. }
                | Command::ZClear { .. }
        )
    }
}

#[derive(Debug, Default)]
struct MemoryData {
    strings: HashMap<String, String>,
    zsets: HashMap<String, HashMap<String, i64>>,
}

#[derive(Debug, Default)]
struct Shared {
    data: RwLock<MemoryData>,
    log: Mutex<Vec<Command>>,
    connections: Mutex<usize>,
    unavailable: AtomicBool,
}

/// An in-memory key-value / sorted-set store.
///
/// This store is suitable for:
/// - Unit tests
/// - Integration tests that assert on the exact commands issued
/// - Exercising failure paths via [`MemoryStore::set_unavailable`]
///
/// Cloning the store yields another handle onto the same data. Every
/// connection opened through [`Connect`] shares it too.
///
/// # Example
///
/// ```rust
/// use kvattr_store::{MemoryStore, StoreClient};
///
/// let store = MemoryStore::new();
/// let mut conn = store.connection();
/// conn.set("posts:1:title", "hello").unwrap();
/// assert_eq!(conn.get("posts:1:title").unwrap().as_deref(), Some("hello"));
/// assert_eq!(store.commands().len(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    shared: Arc<Shared>,
}

impl MemoryStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a connection onto this store.
    #[must_use]
    pub fn connection(&self) -> MemoryConnection {
        *self.shared.connections.lock() += 1;
        MemoryConnection {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Returns every command executed so far, oldest first.
    #[must_use]
    pub fn commands(&self) -> Vec<Command> {
        self.shared.log.lock().clone()
    }

    /// Returns only the commands that modified the store.
    #[must_use]
    pub fn writes(&self) -> Vec<Command> {
        self.commands().into_iter().filter(Command::is_write).collect()
    }

    /// Forgets the recorded commands. Data is kept.
    pub fn clear_commands(&self) {
        self.shared.log.lock().clear();
    }

    /// Number of connections opened onto this store.
    #[must_use]
    pub fn connections_opened(&self) -> usize {
        *self.shared.connections.lock()
    }

    /// When set, every command and every new connection fails with
    /// [`StoreError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.shared.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Reads a scalar key without recording a command.
    #[must_use]
    pub fn peek(&self, key: &str) -> Option<String> {
        self.shared.data.read().strings.get(key).cloned()
    }

    /// Reads a sorted-set score without recording a command.
    #[must_use]
    pub fn peek_score(&self, key: &str, member: &str) -> Option<i64> {
        self.shared
            .data
            .read()
            .zsets
            .get(key)
            .and_then(|set| set.get(member).copied())
    }

    /// Returns true if the scalar key exists.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.shared.data.read().strings.contains_key(key)
    }

    /// Removes all data and recorded commands.
    pub fn reset(&self) {
        let mut data = self.shared.data.write();
        data.strings.clear();
        data.zsets.clear();
        self.shared.log.lock().clear();
    }
}

impl Connect for MemoryStore {
    fn connect(&self) -> StoreResult<Box<dyn StoreClient>> {
        if self.shared.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::unavailable("memory store is offline"));
        }
        Ok(Box::new(self.connection()))
    }
}

/// A connection onto a [`MemoryStore`].
#[derive(Debug)]
pub struct MemoryConnection {
    shared: Arc<Shared>,
}

impl MemoryConnection {
    fn record(&self, command: Command) -> StoreResult<()> {
        if self.shared.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::unavailable("memory store is offline"));
        }
        self.shared.log.lock().push(command);
        Ok(())
    }
}

impl StoreClient for MemoryConnection {
    fn get(&mut self, key: &str) -> StoreResult<Option<String>> {
        self.record(Command::Get {
            key: key.to_string(),
        })?;
        Ok(self.shared.data.read().strings.get(key).cloned())
    }

    fn multi_get(&mut self, keys: &[String]) -> StoreResult<Vec<Option<String>>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        self.record(Command::MultiGet {
            keys: keys.to_vec(),
        })?;
        let data = self.shared.data.read();
        Ok(keys.iter().map(|key| data.strings.get(key).cloned()).collect())
    }

    fn set(&mut self, key: &str, value: &str) -> StoreResult<()> {
        self.record(Command::Set {
            key: key.to_string(),
            value: value.to_string(),
        })?;
        self.shared
            .data
            .write()
            .strings
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn multi_set(&mut self, pairs: &[(String, String)]) -> StoreResult<()> {
        if pairs.is_empty() {
            return Ok(());
        }
        self.record(Command::MultiSet {
            pairs: pairs.to_vec(),
        })?;
        let mut data = self.shared.data.write();
        for (key, value) in pairs {
            data.strings.insert(key.clone(), value.clone());
        }
        Ok(())
    }

    fn delete(&mut self, keys: &[String]) -> StoreResult<u64> {
        if keys.is_empty() {
            return Ok(0);
        }
        self.record(Command::Delete {
            keys: keys.to_vec(),
        })?;
        let mut data = self.shared.data.write();
        let removed = keys
            .iter()
            .filter(|key| data.strings.remove(key.as_str()).is_some())
            .count();
        Ok(removed as u64)
    }

    fn zscore(&mut self, key: &str, member: &str) -> StoreResult<Option<i64>> {
        self.record(Command::ZScore {
            key: key.to_string(),
            member: member.to_string(),
        })?;
        Ok(self
            .shared
            .data
            .read()
            .zsets
            .get(key)
            .and_then(|set| set.get(member).copied()))
    }

    fn zset(&mut self, key: &str, member: &str, score: i64) -> StoreResult<()> {
        self.record(Command::ZSet {
            key: key.to_string(),
            member: member.to_string(),
            score,
        })?;
        self.shared
            .data
            .write()
            .zsets
            .entry(key.to_string())
            .or_default()
            .insert(member.to_string(), score);
        Ok(())
    }

    fn zincr(&mut self, key: &str, member: &str, delta: i64) -> StoreResult<i64> {
        self.record(Command::ZIncr {
            key: key.to_string(),
            member: member.to_string(),
            delta,
        })?;
        let mut data = self.shared.data.write();
        let score = data
            .zsets
            .entry(key.to_string())
            .or_default()
            .entry(member.to_string())
            .or_insert(0);
        *score = score.saturating_add(delta);
        Ok(*score)
    }

    fn zclear(&mut self, key: &str) -> StoreResult<u64> {
        self.record(Command::ZClear {
            key: key.to_string(),
        })?;
        let removed = self
            .shared
            .data
            .write()
            .zsets
            .remove(key)
            .map_or(0, |set| set.len());
        Ok(removed as u64)
    }

    fn zcard(&mut self, key: &str) -> StoreResult<u64> {
        self.record(Command::ZCard {
            key: key.to_string(),
        })?;
        Ok(self
            .shared
            .data
            .read()
            .zsets
            .get(key)
            .map_or(0, |set| set.len() as u64))
    }

    fn zrange(
        &mut self,
        key: &str,
        offset: usize,
        limit: Option<usize>,
    ) -> StoreResult<Vec<String>> {
        self.record(Command::ZRange {
            key: key.to_string(),
            offset,
            limit,
        })?;
        let data = self.shared.data.read();
        let Some(set) = data.zsets.get(key) else {
            return Ok(Vec::new());
        };

        let mut members: Vec<(&String, i64)> = set.iter().map(|(m, s)| (m, *s)).collect();
        members.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0)));

        Ok(members
            .into_iter()
            .skip(offset)
            .take(limit.unwrap_or(usize::MAX))
            .map(|(member, _)| member.clone())
            .collect())
    }
}
