//! In-process key/value store. Used for local runs without Redis and as the
//! store double in tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use async_trait::async_trait;

use super::{ConnectionFactory, StoreConnection, StoreError};

#[derive(Debug)]
struct Entry {
    value: Vec<u8>,
    ttl: Duration,
    stored_at: Instant,
}

impl Entry {
    fn is_expired(&self) -> bool {
        self.stored_at.elapsed() >= self.ttl
    }
}

#[derive(Debug)]
struct Shared {
    entries: Mutex<HashMap<String, Entry>>,
    available: AtomicBool,
    creations: AtomicUsize,
}

impl Shared {
    fn check_available(&self) -> Result<(), StoreError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Connection("memory store marked unavailable".into()))
        }
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Hands out connections to one shared map. Every connection sees the same
/// entries, and toggling availability affects all of them.
#[derive(Debug, Clone)]
pub struct MemoryConnectionFactory {
    shared: Arc<Shared>,
}

impl Default for MemoryConnectionFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryConnectionFactory {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                entries: Mutex::new(HashMap::new()),
                available: AtomicBool::new(true),
                creations: AtomicUsize::new(0),
            }),
        }
    }

    /// Simulate the store going down (or coming back).
    pub fn set_available(&self, available: bool) {
        self.shared.available.store(available, Ordering::SeqCst);
    }

    /// Number of connection attempts so far, failed ones included.
    pub fn creations(&self) -> usize {
        self.shared.creations.load(Ordering::SeqCst)
    }

    /// Write bytes directly, bypassing the repository.
    pub fn insert_raw(&self, key: &str, value: &[u8]) {
        self.shared.entries().insert(
            key.to_string(),
            Entry {
                value: value.to_vec(),
                ttl: super::CACHE_TTL,
                stored_at: Instant::now(),
            },
        );
    }

    pub fn ttl_of(&self, key: &str) -> Option<Duration> {
        self.shared.entries().get(key).map(|entry| entry.ttl)
    }
}

#[async_trait]
impl ConnectionFactory for MemoryConnectionFactory {
    async fn create(&self) -> Result<Arc<dyn StoreConnection>, StoreError> {
        self.shared.creations.fetch_add(1, Ordering::SeqCst);
        self.shared.check_available()?;
        Ok(Arc::new(MemoryConnection {
            shared: Arc::clone(&self.shared),
        }))
    }
}

struct MemoryConnection {
    shared: Arc<Shared>,
}

#[async_trait]
impl StoreConnection for MemoryConnection {
    async fn ping(&self) -> Result<(), StoreError> {
        self.shared.check_available()
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        self.shared.check_available()?;

        let mut entries = self.shared.entries();
        if entries.get(key).is_some_and(Entry::is_expired) {
            entries.remove(key);
        }
        Ok(entries.get(key).map(|entry| entry.value.clone()))
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), StoreError> {
        self.shared.check_available()?;

        let mut entries = self.shared.entries();
        entries.retain(|_, entry| !entry.is_expired());
        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_vec(),
                ttl,
                stored_at: Instant::now(),
            },
        );
        Ok(())
    }
}
