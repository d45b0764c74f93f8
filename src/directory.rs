//! Sorted key → container map backing a bitmap.
//!
//! Keys and containers live in two parallel vectors so the merge loops can
//! binary-search and gallop over a dense `u16` column. Keys are strictly
//! increasing; a key is present only while its container is non-empty.
//!
//! Most mutators here are positional. Callers first locate a key with
//! [`Directory::get_index`] (`Ok(index)` when present, `Err(insertion_point)`
//! otherwise) and then act on that position, which lets the merge algorithms
//! in `ops` walk two directories without repeated searches.

use std::mem;

use crate::container::Container;
use crate::util;

const INITIAL_CAPACITY: usize = 4;

/// Ordered sequence of `(key, container)` entries.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Directory {
    keys: Vec<u16>,
    containers: Vec<Container>,
}

impl Directory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty directory with room for `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            keys: Vec::with_capacity(capacity),
            containers: Vec::with_capacity(capacity),
        }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Return true if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// The keys, in increasing order.
    pub fn keys(&self) -> &[u16] {
        &self.keys
    }

    /// Locate `key`: `Ok(index)` if present, `Err(insertion_point)` if not.
    ///
    /// Appending in key order is the common case, so the last key is checked first.
    pub fn get_index(&self, key: u16) -> Result<usize, usize> {
        match self.keys.last() {
            None => Err(0),
            Some(&last) if last == key => Ok(self.keys.len() - 1),
            Some(&last) if last < key => Err(self.keys.len()),
            _ => self.keys.binary_search(&key),
        }
    }

    /// Smallest index `i > pos` whose key is `>= key`, or `len()`.
    pub fn advance_until(&self, key: u16, pos: usize) -> usize {
        util::advance_until(&self.keys, pos, key)
    }

    /// Key at `index`.
    pub fn key_at(&self, index: usize) -> u16 {
        self.keys[index]
    }

    /// Container at `index`.
    pub fn container_at(&self, index: usize) -> &Container {
        &self.containers[index]
    }

    /// Container stored under `key`.
    pub fn lookup(&self, key: u16) -> Option<&Container> {
        self.get_index(key).ok().map(|i| &self.containers[i])
    }

    /// Store `container` under `key`, replacing any previous one.
    ///
    /// An empty container removes the entry instead.
    pub fn insert(&mut self, key: u16, container: Container) {
        match self.get_index(key) {
            Ok(i) if container.is_empty() => {
                self.remove_at_index(i);
            }
            Ok(i) => self.containers[i] = container,
            Err(_) if container.is_empty() => {}
            Err(i) => self.insert_new_key_value_at(i, key, container),
        }
    }

    /// Shift-insert a new entry at `index`.
    pub fn insert_new_key_value_at(&mut self, index: usize, key: u16, container: Container) {
        debug_assert!(index == 0 || self.keys[index - 1] < key);
        debug_assert!(index == self.keys.len() || key < self.keys[index]);
        self.extend_array(1);
        self.keys.insert(index, key);
        self.containers.insert(index, container);
    }

    /// Replace the container at `index`.
    pub fn set_container_at(&mut self, index: usize, container: Container) {
        self.containers[index] = container;
    }

    /// Overwrite both key and container at `index`.
    pub fn replace_key_and_container_at(&mut self, index: usize, key: u16, container: Container) {
        self.keys[index] = key;
        self.containers[index] = container;
    }

    /// Move the container at `index` out, leaving an empty one in its slot.
    ///
    /// The slot must be refilled or removed before the directory is used again.
    pub fn take_container_at(&mut self, index: usize) -> Container {
        mem::take(&mut self.containers[index])
    }

    /// Remove and return the entry at `index`.
    pub fn remove_at_index(&mut self, index: usize) -> (u16, Container) {
        (self.keys.remove(index), self.containers.remove(index))
    }

    /// Remove the entries in `[begin, end)`.
    pub fn remove_index_range(&mut self, begin: usize, end: usize) {
        if begin >= end {
            return;
        }
        self.keys.drain(begin..end);
        self.containers.drain(begin..end);
    }

    /// Keep only the first `new_len` entries.
    pub fn resize(&mut self, new_len: usize) {
        self.keys.truncate(new_len);
        self.containers.truncate(new_len);
    }

    /// Append an entry whose key is larger than every present key.
    pub fn append(&mut self, key: u16, container: Container) {
        debug_assert!(self.keys.last().is_none_or(|&last| last < key));
        self.extend_array(1);
        self.keys.push(key);
        self.containers.push(container);
    }

    /// Append a copy of `source`'s entry at `index`.
    pub fn append_copy(&mut self, source: &Directory, index: usize) {
        self.append(source.keys[index], source.containers[index].clone());
    }

    /// Append copies of `source`'s entries in `[begin, end)`.
    pub fn append_copy_range(&mut self, source: &Directory, begin: usize, end: usize) {
        if begin >= end {
            return;
        }
        debug_assert!(self.keys.last().is_none_or(|&last| last < source.keys[begin]));
        self.extend_array(end - begin);
        self.keys.extend_from_slice(&source.keys[begin..end]);
        self.containers
            .extend(source.containers[begin..end].iter().cloned());
    }

    /// Append copies of `source`'s entries with keys below `stopping_key`.
    pub fn append_copies_until(&mut self, source: &Directory, stopping_key: u16) {
        let end = source.keys.partition_point(|&k| k < stopping_key);
        self.append_copy_range(source, 0, end);
    }

    /// Append copies of `source`'s entries with keys above `before_start`.
    pub fn append_copies_after(&mut self, source: &Directory, before_start: u16) {
        let begin = source.keys.partition_point(|&k| k <= before_start);
        self.append_copy_range(source, begin, source.len());
    }

    /// Iterate `(key, container)` entries in key order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (u16, &Container)> + ExactSizeIterator {
        self.keys.iter().copied().zip(self.containers.iter())
    }

    /// Approximate heap memory usage in bytes.
    pub fn heap_bytes(&self) -> usize {
        self.keys.capacity() * mem::size_of::<u16>()
            + self.containers.capacity() * mem::size_of::<Container>()
            + self.containers.iter().map(Container::heap_bytes).sum::<usize>()
    }

    /// Ensure room for `k` more entries: double while small, then grow by a quarter.
    fn extend_array(&mut self, k: usize) {
        let needed = self.keys.len() + k;
        if needed <= self.keys.capacity() {
            return;
        }
        let target = if self.keys.capacity() < 1024 {
            (2 * needed).max(INITIAL_CAPACITY)
        } else {
            5 * needed / 4
        };
        self.keys.reserve_exact(target - self.keys.len());
        self.containers
            .reserve_exact(target - self.containers.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::ArrayContainer;

    fn single(v: u16) -> Container {
        Container::Array(ArrayContainer::from_sorted(vec![v]).unwrap())
    }

    fn directory(keys: &[u16]) -> Directory {
        let mut d = Directory::new();
        for &k in keys {
            d.append(k, single(k));
        }
        d
    }

    #[test]
    fn get_index_reports_insertion_points() {
        let d = directory(&[2, 4, 8]);
        assert_eq!(d.get_index(8), Ok(2));
        assert_eq!(d.get_index(4), Ok(1));
        assert_eq!(d.get_index(0), Err(0));
        assert_eq!(d.get_index(5), Err(2));
        assert_eq!(d.get_index(65535), Err(3));
        assert_eq!(Directory::new().get_index(1), Err(0));
    }

    #[test]
    fn insert_keeps_keys_sorted_and_drops_empties() {
        let mut d = Directory::new();
        d.insert(7, single(1));
        d.insert(3, single(2));
        d.insert(5, single(3));
        assert_eq!(d.keys(), &[3, 5, 7]);
        d.insert(5, Container::new());
        assert_eq!(d.keys(), &[3, 7]);
        d.insert(9, Container::new());
        assert_eq!(d.keys(), &[3, 7]);
        assert_eq!(d.lookup(7), Some(&single(1)));
        assert_eq!(d.lookup(5), None);
    }

    #[test]
    fn removal_and_take() {
        let mut d = directory(&[1, 2, 3, 4, 5]);
        let (key, c) = d.remove_at_index(0);
        assert_eq!((key, c), (1, single(1)));
        d.remove_index_range(1, 3);
        assert_eq!(d.keys(), &[2, 5]);
        let taken = d.take_container_at(1);
        assert_eq!(taken, single(5));
        assert!(d.container_at(1).is_empty());
        d.set_container_at(1, taken);
        d.resize(1);
        assert_eq!(d, directory(&[2]));
    }

    #[test]
    fn bulk_copies() {
        let source = directory(&[1, 3, 5, 7, 9]);
        let mut d = Directory::new();
        d.append_copies_until(&source, 5);
        assert_eq!(d.keys(), &[1, 3]);
        d.append_copy(&source, 2);
        d.append_copies_after(&source, 5);
        assert_eq!(d, source);

        let mut d = Directory::new();
        d.append_copy_range(&source, 1, 4);
        assert_eq!(d.keys(), &[3, 5, 7]);
    }

    #[test]
    fn advance_until_gallops_over_keys() {
        let keys: Vec<u16> = (0..1000).map(|k| k * 2).collect();
        let d = directory(&keys);
        assert_eq!(d.advance_until(1001, 0), 501);
        assert_eq!(d.advance_until(0, 10), 11);
        assert_eq!(d.advance_until(65535, 0), 1000);
    }

    #[test]
    fn growth_doubles_then_tapers() {
        let mut d = Directory::new();
        d.append(0, single(0));
        assert!(d.keys.capacity() >= INITIAL_CAPACITY);
        for k in 1..2000 {
            d.append(k, single(k));
        }
        assert_eq!(d.len(), 2000);
        assert_eq!(d.keys.capacity(), d.containers.capacity());
    }
}
