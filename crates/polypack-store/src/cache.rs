use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use crate::reader::ForwardLookup;

/// Pluggable lookup cache for a read-only pack store.
///
/// Implementations take `&self` and handle their own interior mutability, so
/// a store can be shared behind an `Arc` without outer locking.
pub trait LookupCache: Send + Sync {
    fn get(&self, word: &str) -> Option<Vec<ForwardLookup>>;
    fn put(&self, word: &str, hits: Vec<ForwardLookup>);
    fn name(&self) -> &'static str;
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Cache that never stores anything. The default for one-shot tooling.
pub struct NoCache;

impl LookupCache for NoCache {
    fn get(&self, _word: &str) -> Option<Vec<ForwardLookup>> {
        None
    }

    fn put(&self, _word: &str, _hits: Vec<ForwardLookup>) {}

    fn name(&self) -> &'static str {
        "none"
    }

    fn len(&self) -> usize {
        0
    }
}

/// Bounded in-memory cache with first-in-first-out eviction.
pub struct MemoryCache {
    capacity: usize,
    inner: Mutex<MemoryCacheInner>,
}

struct MemoryCacheInner {
    map: HashMap<String, Vec<ForwardLookup>>,
    order: VecDeque<String>,
}

impl MemoryCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: Mutex::new(MemoryCacheInner {
                map: HashMap::new(),
                order: VecDeque::new(),
            }),
        }
    }
}

impl LookupCache for MemoryCache {
    fn get(&self, word: &str) -> Option<Vec<ForwardLookup>> {
        match self.inner.lock() {
            Ok(inner) => inner.map.get(word).cloned(),
            Err(_) => None,
        }
    }

    fn put(&self, word: &str, hits: Vec<ForwardLookup>) {
        let Ok(mut inner) = self.inner.lock() else {
            return;
        };
        if inner.map.contains_key(word) {
            inner.map.insert(word.to_string(), hits);
            return;
        }
        while inner.map.len() >= self.capacity {
            match inner.order.pop_front() {
                Some(oldest) => {
                    inner.map.remove(&oldest);
                }
                None => break,
            }
        }
        inner.map.insert(word.to_string(), hits);
        inner.order.push_back(word.to_string());
    }

    fn name(&self) -> &'static str {
        "memory"
    }

    fn len(&self) -> usize {
        self.inner.lock().map(|i| i.map.len()).unwrap_or(0)
    }
}
