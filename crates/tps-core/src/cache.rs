//! The LRU reconstruction cache: a bounded `(polygon_id, time) ->
//! [Point]` map with O(1) amortized get/put and a reverse index for
//! per-polygon invalidation.

use ahash::{AHashMap, AHashSet};
use parking_lot::Mutex;
use uuid::Uuid;

use crate::point::{Point, Timestamp};

pub type CacheKey = (Uuid, Timestamp);

struct Node {
    key: CacheKey,
    value: Vec<Point>,
    prev: Option<usize>,
    next: Option<usize>,
}

/// Hash index into a doubly-linked list of [`Node`]s: the head is the most
/// recently used entry, the tail the least. A reverse index
/// (`polygon_id -> set<CacheKey>`) lets [`ReconstructionCache::invalidate`]
/// drop only the entries for one polygon in O(k), k = that polygon's entry
/// count, instead of flushing the whole cache.
pub struct ReconstructionCache {
    inner: Mutex<Inner>,
}

struct Inner {
    capacity: usize,
    nodes: Vec<Option<Node>>,
    free: Vec<usize>,
    index: AHashMap<CacheKey, usize>,
    head: Option<usize>,
    tail: Option<usize>,
    reverse: AHashMap<Uuid, AHashSet<CacheKey>>,
}

impl ReconstructionCache {
    /// Default capacity when none is configured.
    pub const DEFAULT_CAPACITY: usize = 100;

    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "LRU cache capacity must be positive");
        Self {
            inner: Mutex::new(Inner {
                capacity,
                nodes: Vec::new(),
                free: Vec::new(),
                index: AHashMap::default(),
                head: None,
                tail: None,
                reverse: AHashMap::default(),
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.inner.lock().capacity
    }

    pub fn len(&self) -> usize {
        self.inner.lock().index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Looks up `key`; on hit, moves the entry to the front (most recently
    /// used) and returns a clone of its value.
    pub fn get(&self, key: CacheKey) -> Option<Vec<Point>> {
        let mut inner = self.inner.lock();
        let idx = *inner.index.get(&key)?;
        inner.move_to_front(idx);
        Some(inner.nodes[idx].as_ref().unwrap().value.clone())
    }

    /// Inserts or updates `key`, moving it to the front. Evicts the least
    /// recently used entry if this insert would exceed capacity.
    pub fn put(&self, key: CacheKey, value: Vec<Point>) {
        let mut inner = self.inner.lock();
        if let Some(&idx) = inner.index.get(&key) {
            inner.nodes[idx].as_mut().unwrap().value = value;
            inner.move_to_front(idx);
            return;
        }

        if inner.index.len() >= inner.capacity {
            inner.evict_lru();
        }

        let idx = inner.alloc_node(Node {
            key,
            value,
            prev: None,
            next: None,
        });
        inner.index.insert(key, idx);
        inner.reverse.entry(key.0).or_default().insert(key);
        inner.push_front(idx);
    }

    /// Drops every cached entry for `polygon_id`. Entries for other
    /// polygons are untouched.
    pub fn invalidate(&self, polygon_id: Uuid) {
        let mut inner = self.inner.lock();
        let Some(keys) = inner.reverse.remove(&polygon_id) else {
            return;
        };
        for key in keys {
            if let Some(&idx) = inner.index.get(&key) {
                inner.detach(idx);
                inner.index.remove(&key);
                inner.nodes[idx] = None;
                inner.free.push(idx);
            }
        }
    }
}

impl Inner {
    fn alloc_node(&mut self, node: Node) -> usize {
        if let Some(idx) = self.free.pop() {
            self.nodes[idx] = Some(node);
            idx
        } else {
            self.nodes.push(Some(node));
            self.nodes.len() - 1
        }
    }

    fn detach(&mut self, idx: usize) {
        let (prev, next) = {
            let node = self.nodes[idx].as_ref().unwrap();
            (node.prev, node.next)
        };
        match prev {
            Some(p) => self.nodes[p].as_mut().unwrap().next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.nodes[n].as_mut().unwrap().prev = prev,
            None => self.tail = prev,
        }
    }

    fn push_front(&mut self, idx: usize) {
        let old_head = self.head;
        {
            let node = self.nodes[idx].as_mut().unwrap();
            node.prev = None;
            node.next = old_head;
        }
        if let Some(h) = old_head {
            self.nodes[h].as_mut().unwrap().prev = Some(idx);
        }
        self.head = Some(idx);
        if self.tail.is_none() {
            self.tail = Some(idx);
        }
    }

    fn move_to_front(&mut self, idx: usize) {
        if self.head == Some(idx) {
            return;
        }
        self.detach(idx);
        self.push_front(idx);
    }

    fn evict_lru(&mut self) {
        let Some(idx) = self.tail else { return };
        self.detach(idx);
        let key = self.nodes[idx].as_ref().unwrap().key;
        self.index.remove(&key);
        if let Some(keys) = self.reverse.get_mut(&key.0) {
            keys.remove(&key);
            if keys.is_empty() {
                self.reverse.remove(&key.0);
            }
        }
        self.nodes[idx] = None;
        self.free.push(idx);
        log::trace!("LRU evicted entry for polygon {} at t={}", key.0, key.1);
    }
}
