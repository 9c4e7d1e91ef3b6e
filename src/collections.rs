// ============================================================================
// BOUNDED COLLECTIONS: fixed-capacity stack, ring queue and sorted list
// ============================================================================
//
// Capacity is fixed at construction. Inserting into a full collection is
// refused with `false` and leaves the contents untouched; nothing here grows
// past its capacity or panics on overflow.

use std::collections::VecDeque;

/// Slots reserved up front; anything beyond is allocated as items arrive.
const INITIAL_SLOTS: usize = 16;

/// Fixed-capacity LIFO stack.
#[derive(Clone, Debug)]
pub struct BoundedStack<T> {
    items: Vec<T>,
    capacity: usize,
}

impl<T> BoundedStack<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity.min(INITIAL_SLOTS)),
            capacity,
        }
    }

    /// Push onto the top. Returns `false` (and drops nothing) when full.
    pub fn push(&mut self, item: T) -> bool {
        if self.is_full() {
            return false;
        }
        self.items.push(item);
        true
    }

    pub fn pop(&mut self) -> Option<T> {
        self.items.pop()
    }

    pub fn peek(&self) -> Option<&T> {
        self.items.last()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.items.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Bottom to top.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + '_ {
        self.items.iter()
    }
}

/// Fixed-capacity FIFO queue.
///
/// Backed by a `VecDeque` ring that grows on demand up to `capacity`, so an
/// empty queue with a large limit costs almost nothing.
#[derive(Clone, Debug)]
pub struct BoundedQueue<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> BoundedQueue<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity.min(INITIAL_SLOTS)),
            capacity,
        }
    }

    /// Append at the back. Returns `false` when full.
    pub fn append(&mut self, item: T) -> bool {
        if self.is_full() {
            return false;
        }
        self.items.push_back(item);
        true
    }

    /// Remove and return the front element.
    pub fn serve(&mut self) -> Option<T> {
        self.items.pop_front()
    }

    pub fn peek(&self) -> Option<&T> {
        self.items.front()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.items.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Front to back.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.items.iter()
    }
}

/// Fixed-capacity list kept in ascending key order.
///
/// Insertion finds its slot by binary search. Entries with equal keys stay
/// in insertion order.
#[derive(Clone, Debug)]
pub struct SortedList<K, V> {
    entries: Vec<(K, V)>,
    capacity: usize,
}

impl<K: Ord, V> SortedList<K, V> {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity.min(INITIAL_SLOTS)),
            capacity,
        }
    }

    /// Insert keeping key order. Returns `false` when full.
    pub fn add(&mut self, key: K, value: V) -> bool {
        if self.is_full() {
            return false;
        }
        let pos = self.entries.partition_point(|(k, _)| *k <= key);
        self.entries.insert(pos, (key, value));
        true
    }

    /// Position of the first entry with `key`.
    pub fn index_of(&self, key: &K) -> Option<usize> {
        let pos = self.entries.partition_point(|(k, _)| k < key);
        match self.entries.get(pos) {
            Some((k, _)) if k == key => Some(pos),
            _ => None,
        }
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.index_of(key).is_some()
    }

    /// Remove the first entry with `key`, returning its value.
    pub fn remove_key(&mut self, key: &K) -> Option<V> {
        let pos = self.index_of(key)?;
        Some(self.entries.remove(pos).1)
    }

    pub fn get(&self, index: usize) -> Option<(&K, &V)> {
        self.entries.get(index).map(|(k, v)| (k, v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Ascending key order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (&K, &V)> + '_ {
        self.entries.iter().map(|(k, v)| (k, v))
    }
}
