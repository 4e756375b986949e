//! Key to lane registry with least-recently-used ordering.
//!
//! Entries live in a slot vector and are linked into a doubly linked recency list by slot index, so lookups, touches
//! and evictions are all O(1).
//!
//! ```text
//!   index (HashMap<K, SlotId>)      slots (Vec<Option<Node>>)
//!   ┌─────┬────────┐                ┌────────┬──────────────────────────────┐
//!   │ "a" │ slot 0 │ ─────────────► │ slot 0 │ { key: "a", prev: 1, next: - }│
//!   │ "b" │ slot 1 │ ─────────────► │ slot 1 │ { key: "b", prev: -, next: 0 }│
//!   └─────┴────────┘                └────────┴──────────────────────────────┘
//!
//!   head (MRU) ─► [slot 1] ◄──► [slot 0] ◄── tail (LRU)
//! ```
//!
//! The registry is owned by the routing loop and never shared, so it carries no locks.

use std::{
    collections::HashMap,
    hash::{BuildHasher, Hash},
    num::NonZeroUsize,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SlotId(usize);

struct Node<K, V> {
    key: K,
    value: V,
    prev: Option<SlotId>,
    next: Option<SlotId>,
}

pub(crate) struct Registry<K, V, S> {
    index: HashMap<K, SlotId, S>,
    slots: Vec<Option<Node<K, V>>>,
    free: Vec<usize>,
    head: Option<SlotId>,
    tail: Option<SlotId>,
    max_entries: Option<NonZeroUsize>,
}

impl<K, V, S> Registry<K, V, S>
where
    K: Hash + Eq + Clone,
    S: BuildHasher,
{
    /// Creates an empty registry holding at most `max_entries` entries (`None` for no limit).
    pub(crate) fn with_hasher(max_entries: Option<NonZeroUsize>, build_hasher: S) -> Self {
        Self {
            index: HashMap::with_hasher(build_hasher),
            slots: Vec::new(),
            free: Vec::new(),
            head: None,
            tail: None,
            max_entries,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.index.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub(crate) fn is_full(&self) -> bool {
        self.max_entries
            .is_some_and(|max_entries| self.len() >= max_entries.get())
    }

    /// Looks up `key` and, if present, marks it most recently used.
    pub(crate) fn touch(&mut self, key: &K) -> Option<&V> {
        let id = *self.index.get(key)?;
        self.detach(id);
        self.attach_front(id);
        self.node(id).map(|node| &node.value)
    }

    /// Registers a key that is not yet present as most recently used.
    ///
    /// Callers make room with [`evict_lru`](Self::evict_lru) first, so the bound holds at every step.
    pub(crate) fn insert(&mut self, key: K, value: V) {
        debug_assert!(!self.index.contains_key(&key), "key is already registered");
        debug_assert!(!self.is_full(), "registry is full");

        let node = Node {
            key: key.clone(),
            value,
            prev: None,
            next: None,
        };
        let id = match self.free.pop() {
            Some(idx) => {
                self.slots[idx] = Some(node);
                SlotId(idx)
            }
            None => {
                self.slots.push(Some(node));
                SlotId(self.slots.len() - 1)
            }
        };

        self.attach_front(id);
        self.index.insert(key, id);
    }

    /// Removes and returns the least recently used entry.
    pub(crate) fn evict_lru(&mut self) -> Option<(K, V)> {
        let id = self.tail?;
        self.release(id)
    }

    /// Removes `key` regardless of its position in the recency order.
    pub(crate) fn remove(&mut self, key: &K) -> Option<V> {
        let id = *self.index.get(key)?;
        self.release(id).map(|(_, value)| value)
    }

    /// Removes every entry, least recently used first.
    pub(crate) fn drain(&mut self) -> impl Iterator<Item = (K, V)> {
        std::iter::from_fn(move || self.evict_lru())
    }

    fn release(&mut self, id: SlotId) -> Option<(K, V)> {
        self.detach(id);
        let node = self.slots.get_mut(id.0)?.take()?;
        self.free.push(id.0);
        self.index.remove(&node.key);
        Some((node.key, node.value))
    }

    fn detach(&mut self, id: SlotId) {
        let Some((prev, next)) = self.node(id).map(|node| (node.prev, node.next)) else {
            return;
        };

        match prev {
            Some(prev) => {
                if let Some(node) = self.node_mut(prev) {
                    node.next = next;
                }
            }
            None => self.head = next,
        }

        match next {
            Some(next) => {
                if let Some(node) = self.node_mut(next) {
                    node.prev = prev;
                }
            }
            None => self.tail = prev,
        }

        if let Some(node) = self.node_mut(id) {
            node.prev = None;
            node.next = None;
        }
    }

    fn attach_front(&mut self, id: SlotId) {
        let old_head = self.head;

        if let Some(node) = self.node_mut(id) {
            node.prev = None;
            node.next = old_head;
        }

        match old_head {
            Some(old_head) => {
                if let Some(node) = self.node_mut(old_head) {
                    node.prev = Some(id);
                }
            }
            None => self.tail = Some(id),
        }

        self.head = Some(id);
    }

    fn node(&self, id: SlotId) -> Option<&Node<K, V>> {
        self.slots.get(id.0).and_then(|slot| slot.as_ref())
    }

    fn node_mut(&mut self, id: SlotId) -> Option<&mut Node<K, V>> {
        self.slots.get_mut(id.0).and_then(|slot| slot.as_mut())
    }

    /// Keys from most to least recently used.
    #[cfg(test)]
    fn keys(&self) -> Vec<K> {
        let mut keys = Vec::with_capacity(self.len());
        let mut current = self.head;
        while let Some(id) = current {
            let node = self.node(id).expect("linked slot must be occupied");
            keys.push(node.key.clone());
            current = node.next;
        }
        keys
    }

    #[cfg(test)]
    fn validate_invariants(&self) {
        let keys = self.keys();
        assert_eq!(keys.len(), self.index.len(), "index and recency list disagree");

        let mut backwards = 0;
        let mut current = self.tail;
        while let Some(id) = current {
            backwards += 1;
            current = self.node(id).expect("linked slot must be occupied").prev;
        }
        assert_eq!(backwards, keys.len(), "list is not doubly linked consistently");

        for key in &keys {
            let id = self.index[key];
            assert!(self.node(id).is_some_and(|node| &node.key == key));
        }

        if let Some(max_entries) = self.max_entries {
            assert!(self.len() <= max_entries.get());
        }
    }
}

#[cfg(test)]
mod tests {
    use std::hash::RandomState;

    use super::*;

    fn registry(max_entries: usize) -> Registry<&'static str, u32, RandomState> {
        Registry::with_hasher(NonZeroUsize::new(max_entries), RandomState::new())
    }

    /// Mirrors the router: make room, then register.
    fn admit(
        registry: &mut Registry<&'static str, u32, RandomState>,
        key: &'static str,
        value: u32,
    ) -> Option<(&'static str, u32)> {
        let evicted = if registry.is_full() {
            registry.evict_lru()
        } else {
            None
        };
        registry.insert(key, value);
        evicted
    }

    #[test]
    fn insert_orders_by_recency() {
        let mut registry = registry(0);
        assert!(registry.is_empty());

        registry.insert("a", 1);
        registry.insert("b", 2);
        registry.insert("c", 3);

        assert_eq!(registry.keys(), vec!["c", "b", "a"]);
        assert_eq!(registry.len(), 3);
        assert!(!registry.is_full());
        registry.validate_invariants();
    }

    #[test]
    fn touch_moves_entry_to_front() {
        let mut registry = registry(0);
        registry.insert("a", 1);
        registry.insert("b", 2);
        registry.insert("c", 3);

        assert_eq!(registry.touch(&"a"), Some(&1));
        assert_eq!(registry.keys(), vec!["a", "c", "b"]);

        assert_eq!(registry.touch(&"a"), Some(&1));
        assert_eq!(registry.keys(), vec!["a", "c", "b"]);

        assert_eq!(registry.touch(&"b"), Some(&2));
        assert_eq!(registry.keys(), vec!["b", "a", "c"]);

        assert_eq!(registry.touch(&"missing"), None);
        registry.validate_invariants();
    }

    #[test]
    fn full_registry_evicts_least_recently_touched() {
        let mut registry = registry(2);
        assert_eq!(admit(&mut registry, "a", 1), None);
        assert_eq!(admit(&mut registry, "b", 2), None);
        assert!(registry.is_full());

        // "a" was inserted first but touched last.
        registry.touch(&"a");

        assert_eq!(admit(&mut registry, "c", 3), Some(("b", 2)));
        assert_eq!(registry.keys(), vec!["c", "a"]);
        assert_eq!(registry.len(), 2);
        registry.validate_invariants();

        assert_eq!(admit(&mut registry, "b", 4), Some(("a", 1)));
        assert_eq!(registry.keys(), vec!["b", "c"]);
        registry.validate_invariants();
    }

    #[test]
    fn single_entry_registry_always_replaces() {
        let mut registry = registry(1);
        assert_eq!(admit(&mut registry, "a", 1), None);
        assert_eq!(admit(&mut registry, "b", 2), Some(("a", 1)));
        assert_eq!(admit(&mut registry, "a", 3), Some(("b", 2)));
        assert_eq!(registry.keys(), vec!["a"]);
        assert_eq!(registry.touch(&"a"), Some(&3));
        registry.validate_invariants();
    }

    #[test]
    fn remove_unlinks_from_any_position() {
        let mut registry = registry(0);
        registry.insert("a", 1);
        registry.insert("b", 2);
        registry.insert("c", 3);

        assert_eq!(registry.remove(&"b"), Some(2));
        assert_eq!(registry.keys(), vec!["c", "a"]);
        registry.validate_invariants();

        assert_eq!(registry.remove(&"c"), Some(3));
        assert_eq!(registry.remove(&"a"), Some(1));
        assert_eq!(registry.remove(&"a"), None);
        assert!(registry.is_empty());
        assert_eq!(registry.evict_lru(), None);
        registry.validate_invariants();
    }

    #[test]
    fn slots_are_reused_after_release() {
        let mut registry = registry(2);
        let keys = ["x", "y", "z"];
        for round in 0..100 {
            admit(&mut registry, keys[round as usize % keys.len()], round);
            registry.validate_invariants();
        }
        assert_eq!(registry.slots.len(), 2);
    }

    #[test]
    fn drain_empties_least_recent_first() {
        let mut registry = registry(0);
        registry.insert("a", 1);
        registry.insert("b", 2);
        registry.insert("c", 3);
        registry.touch(&"a");

        let drained: Vec<_> = registry.drain().collect();
        assert_eq!(drained, vec![("b", 2), ("c", 3), ("a", 1)]);
        assert!(registry.is_empty());
        registry.validate_invariants();
    }
}
