//! `RoaringBitmap`: a set of `u32` built on the directory.
//!
//! A value `x` lives in the container stored under key `x >> 16`, as the low
//! 16 bits `x & 0xFFFF`. Everything here is a thin split-and-dispatch layer;
//! the work happens in the containers and in `ops`.

use std::fmt;
use std::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, BitXor, BitXorAssign, Sub, SubAssign};

use crate::container::{self, Container, ContainerKind};
use crate::directory::Directory;
use crate::error::{check_range, Result};
use crate::ops;

const VALUE_SPACE: u64 = 1 << 32;

#[inline]
fn split(x: u32) -> (u16, u16) {
    ((x >> 16) as u16, x as u16)
}

#[inline]
fn join(key: u16, low: u16) -> u32 {
    ((key as u32) << 16) | low as u32
}

/// Compressed set of 32-bit unsigned integers.
///
/// ```
/// use rbits::RoaringBitmap;
///
/// let mut bm = RoaringBitmap::new();
/// bm.add(3);
/// bm.add_range(1 << 20, (1 << 20) + 100_000).unwrap();
/// assert!(bm.contains(3));
/// assert_eq!(bm.len(), 100_001);
/// assert_eq!(bm.select(1), Some(1 << 20));
/// ```
#[derive(Clone, Default, PartialEq, Eq)]
pub struct RoaringBitmap {
    directory: Directory,
}

impl fmt::Debug for RoaringBitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoaringBitmap")
            .field("cardinality", &self.len())
            .field("containers", &self.directory.len())
            .finish()
    }
}

impl RoaringBitmap {
    /// Create an empty bitmap.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_directory(directory: Directory) -> Self {
        Self { directory }
    }

    /// The underlying key → container directory.
    pub fn directory(&self) -> &Directory {
        &self.directory
    }

    /// Number of values.
    pub fn len(&self) -> u64 {
        self.directory.iter().map(|(_, c)| c.len() as u64).sum()
    }

    /// Return true if the bitmap holds no value.
    pub fn is_empty(&self) -> bool {
        self.directory.is_empty()
    }

    /// Return true if `x` is present.
    pub fn contains(&self, x: u32) -> bool {
        let (key, low) = split(x);
        self.directory.lookup(key).is_some_and(|c| c.contains(low))
    }

    /// Add `x`; returns true if it was absent.
    pub fn add(&mut self, x: u32) -> bool {
        let (key, low) = split(x);
        match self.directory.get_index(key) {
            Ok(i) => {
                if self.directory.container_at(i).contains(low) {
                    return false;
                }
                let c = self.directory.take_container_at(i).add(low);
                self.directory.set_container_at(i, c);
            }
            Err(i) => {
                self.directory
                    .insert_new_key_value_at(i, key, Container::new().add(low));
            }
        }
        true
    }

    /// Remove `x`; returns true if it was present.
    pub fn remove(&mut self, x: u32) -> bool {
        let (key, low) = split(x);
        let Ok(i) = self.directory.get_index(key) else {
            return false;
        };
        if !self.directory.container_at(i).contains(low) {
            return false;
        }
        let c = self.directory.take_container_at(i).remove(low);
        if c.is_empty() {
            self.directory.remove_at_index(i);
        } else {
            self.directory.set_container_at(i, c);
        }
        true
    }

    /// Split `[begin, end)` into per-key container ranges `(key, lo, hi)`.
    fn key_ranges(begin: u64, end: u64) -> impl Iterator<Item = (u16, u32, u32)> {
        let first = (begin >> 16) as u32;
        let last = ((end - 1) >> 16) as u32;
        (first..=last).map(move |key| {
            let lo = if key == first { (begin & 0xFFFF) as u32 } else { 0 };
            let hi = if key == last {
                ((end - 1) & 0xFFFF) as u32 + 1
            } else {
                container::MAX_CARDINALITY as u32
            };
            (key as u16, lo, hi)
        })
    }

    /// Add every value of `[begin, end)`; `end` may be `2^32`.
    pub fn add_range(&mut self, begin: u64, end: u64) -> Result<()> {
        check_range(begin, end, VALUE_SPACE)?;
        for (key, lo, hi) in Self::key_ranges(begin, end) {
            match self.directory.get_index(key) {
                Ok(i) => {
                    let c = self.directory.take_container_at(i).add_range(lo, hi)?;
                    self.directory.set_container_at(i, c);
                }
                Err(i) => {
                    self.directory
                        .insert_new_key_value_at(i, key, Container::from_range(lo, hi)?);
                }
            }
        }
        Ok(())
    }

    /// Remove every value of `[begin, end)`.
    pub fn remove_range(&mut self, begin: u64, end: u64) -> Result<()> {
        check_range(begin, end, VALUE_SPACE)?;
        for (key, lo, hi) in Self::key_ranges(begin, end) {
            let Ok(i) = self.directory.get_index(key) else {
                continue;
            };
            let c = self.directory.take_container_at(i).remove_range(lo, hi)?;
            if c.is_empty() {
                self.directory.remove_at_index(i);
            } else {
                self.directory.set_container_at(i, c);
            }
        }
        Ok(())
    }

    /// Complement every value of `[begin, end)` in place.
    pub fn flip_range(&mut self, begin: u64, end: u64) -> Result<()> {
        check_range(begin, end, VALUE_SPACE)?;
        for (key, lo, hi) in Self::key_ranges(begin, end) {
            match self.directory.get_index(key) {
                Ok(i) => {
                    let c = self.directory.take_container_at(i).inot(lo, hi)?;
                    if c.is_empty() {
                        self.directory.remove_at_index(i);
                    } else {
                        self.directory.set_container_at(i, c);
                    }
                }
                Err(i) => {
                    self.directory
                        .insert_new_key_value_at(i, key, Container::from_range(lo, hi)?);
                }
            }
        }
        Ok(())
    }

    /// A copy of `self` with every value of `[begin, end)` complemented.
    ///
    /// Keys outside the range are copied in bulk.
    pub fn flipped(&self, begin: u64, end: u64) -> Result<RoaringBitmap> {
        check_range(begin, end, VALUE_SPACE)?;
        let first = (begin >> 16) as u16;
        let last = ((end - 1) >> 16) as u16;
        let mut directory = Directory::new();
        directory.append_copies_until(&self.directory, first);
        for (key, lo, hi) in Self::key_ranges(begin, end) {
            let c = match self.directory.lookup(key) {
                Some(c) => c.not(lo, hi)?,
                None => Container::from_range(lo, hi)?,
            };
            if !c.is_empty() {
                directory.append(key, c);
            }
        }
        directory.append_copies_after(&self.directory, last);
        Ok(Self { directory })
    }

    /// Number of values `<= x`.
    pub fn rank(&self, x: u32) -> u64 {
        let (key, low) = split(x);
        let mut answer = 0u64;
        for (k, c) in self.directory.iter() {
            match k.cmp(&key) {
                std::cmp::Ordering::Less => answer += c.len() as u64,
                std::cmp::Ordering::Equal => return answer + c.rank(low) as u64,
                std::cmp::Ordering::Greater => break,
            }
        }
        answer
    }

    /// The `n`-th smallest value (0-indexed).
    pub fn select(&self, n: u64) -> Option<u32> {
        let mut left = n;
        for (key, c) in self.directory.iter() {
            let len = c.len() as u64;
            if left < len {
                return c.select(left as usize).map(|low| join(key, low));
            }
            left -= len;
        }
        None
    }

    /// Smallest value.
    pub fn min(&self) -> Option<u32> {
        let (key, c) = self.directory.iter().next()?;
        c.min().map(|low| join(key, low))
    }

    /// Largest value.
    pub fn max(&self) -> Option<u32> {
        let (key, c) = self.directory.iter().next_back()?;
        c.max().map(|low| join(key, low))
    }

    /// Convert each container to its smallest encoding, runs included.
    ///
    /// Returns true if any container ends up run-encoded.
    pub fn run_optimize(&mut self) -> bool {
        let mut any_runs = false;
        for i in 0..self.directory.len() {
            let c = self.directory.take_container_at(i).run_optimize();
            any_runs |= c.kind() == ContainerKind::Run;
            self.directory.set_container_at(i, c);
        }
        any_runs
    }

    /// Return true if the two bitmaps share a value.
    pub fn intersects(&self, other: &RoaringBitmap) -> bool {
        let (a, b) = (&self.directory, &other.directory);
        let (mut pos1, mut pos2) = (0, 0);
        while pos1 < a.len() && pos2 < b.len() {
            let (k1, k2) = (a.key_at(pos1), b.key_at(pos2));
            match k1.cmp(&k2) {
                std::cmp::Ordering::Equal => {
                    if a.container_at(pos1).intersects(b.container_at(pos2)) {
                        return true;
                    }
                    pos1 += 1;
                    pos2 += 1;
                }
                std::cmp::Ordering::Less => pos1 = a.advance_until(k2, pos1),
                std::cmp::Ordering::Greater => pos2 = b.advance_until(k1, pos2),
            }
        }
        false
    }

    /// Size of the intersection, computed without building it.
    pub fn and_cardinality(&self, other: &RoaringBitmap) -> u64 {
        let (a, b) = (&self.directory, &other.directory);
        let (mut pos1, mut pos2) = (0, 0);
        let mut answer = 0u64;
        while pos1 < a.len() && pos2 < b.len() {
            let (k1, k2) = (a.key_at(pos1), b.key_at(pos2));
            match k1.cmp(&k2) {
                std::cmp::Ordering::Equal => {
                    answer += a.container_at(pos1).and_cardinality(b.container_at(pos2)) as u64;
                    pos1 += 1;
                    pos2 += 1;
                }
                std::cmp::Ordering::Less => pos1 = a.advance_until(k2, pos1),
                std::cmp::Ordering::Greater => pos2 = b.advance_until(k1, pos2),
            }
        }
        answer
    }

    /// Size of the union.
    pub fn or_cardinality(&self, other: &RoaringBitmap) -> u64 {
        self.len() + other.len() - self.and_cardinality(other)
    }

    /// Size of the symmetric difference.
    pub fn xor_cardinality(&self, other: &RoaringBitmap) -> u64 {
        self.len() + other.len() - 2 * self.and_cardinality(other)
    }

    /// Size of `self \ other`.
    pub fn and_not_cardinality(&self, other: &RoaringBitmap) -> u64 {
        self.len() - self.and_cardinality(other)
    }

    /// Return true if every value of `self` is in `other`.
    pub fn is_subset(&self, other: &RoaringBitmap) -> bool {
        let (a, b) = (&self.directory, &other.directory);
        if a.len() > b.len() {
            return false;
        }
        a.iter()
            .all(|(key, c)| b.lookup(key).is_some_and(|o| c.is_subset(o)))
    }

    /// Smallest value `>= x`.
    pub fn next_value(&self, x: u32) -> Option<u32> {
        let (key, low) = split(x);
        let start = match self.directory.get_index(key) {
            Ok(i) => {
                if let Some(v) = self.directory.container_at(i).next_value(low) {
                    return Some(join(key, v));
                }
                i + 1
            }
            Err(i) => i,
        };
        if start >= self.directory.len() {
            return None;
        }
        let next_key = self.directory.key_at(start);
        self.directory.container_at(start).min().map(|low| join(next_key, low))
    }

    /// Largest value `<= x`.
    pub fn previous_value(&self, x: u32) -> Option<u32> {
        let (key, low) = split(x);
        let end = match self.directory.get_index(key) {
            Ok(i) => {
                if let Some(v) = self.directory.container_at(i).previous_value(low) {
                    return Some(join(key, v));
                }
                i
            }
            Err(i) => i,
        };
        let i = end.checked_sub(1)?;
        let prev_key = self.directory.key_at(i);
        self.directory.container_at(i).max().map(|low| join(prev_key, low))
    }

    /// Intersection.
    pub fn and(&self, other: &RoaringBitmap) -> RoaringBitmap {
        Self::from_directory(ops::and(&self.directory, &other.directory))
    }

    /// Union.
    pub fn or(&self, other: &RoaringBitmap) -> RoaringBitmap {
        Self::from_directory(ops::or(&self.directory, &other.directory))
    }

    /// Symmetric difference.
    pub fn xor(&self, other: &RoaringBitmap) -> RoaringBitmap {
        Self::from_directory(ops::xor(&self.directory, &other.directory))
    }

    /// Difference `self \ other`.
    pub fn and_not(&self, other: &RoaringBitmap) -> RoaringBitmap {
        Self::from_directory(ops::and_not(&self.directory, &other.directory))
    }

    /// In-place intersection.
    pub fn and_assign(&mut self, other: &RoaringBitmap) {
        ops::and_assign(&mut self.directory, &other.directory);
    }

    /// In-place union.
    pub fn or_assign(&mut self, other: &RoaringBitmap) {
        ops::or_assign(&mut self.directory, &other.directory);
    }

    /// In-place symmetric difference.
    pub fn xor_assign(&mut self, other: &RoaringBitmap) {
        ops::xor_assign(&mut self.directory, &other.directory);
    }

    /// In-place difference.
    pub fn and_not_assign(&mut self, other: &RoaringBitmap) {
        ops::and_not_assign(&mut self.directory, &other.directory);
    }

    /// Approximate heap memory usage in bytes.
    pub fn heap_bytes(&self) -> usize {
        self.directory.heap_bytes()
    }

    /// Iterate the values in increasing order.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            directory: &self.directory,
            index: 0,
            current: None,
        }
    }
}

/// Iterator over the values of a [`RoaringBitmap`].
///
/// Borrows the bitmap; to remove values while scanning, collect them first
/// and remove them afterwards.
#[derive(Clone, Debug)]
pub struct Iter<'a> {
    directory: &'a Directory,
    index: usize,
    current: Option<(u16, container::Iter<'a>)>,
}

impl Iterator for Iter<'_> {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        loop {
            if let Some((key, values)) = self.current.as_mut() {
                if let Some(low) = values.next() {
                    return Some(join(*key, low));
                }
            }
            if self.index >= self.directory.len() {
                return None;
            }
            let key = self.directory.key_at(self.index);
            self.current = Some((key, self.directory.container_at(self.index).iter()));
            self.index += 1;
        }
    }
}

impl<'a> IntoIterator for &'a RoaringBitmap {
    type Item = u32;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Iter<'a> {
        self.iter()
    }
}

impl FromIterator<u32> for RoaringBitmap {
    fn from_iter<I: IntoIterator<Item = u32>>(iter: I) -> Self {
        let mut bm = RoaringBitmap::new();
        bm.extend(iter);
        bm
    }
}

impl Extend<u32> for RoaringBitmap {
    fn extend<I: IntoIterator<Item = u32>>(&mut self, iter: I) {
        for x in iter {
            self.add(x);
        }
    }
}

macro_rules! binary_op {
    ($trait:ident, $method:ident, $assign_trait:ident, $assign_method:ident, $op:ident, $op_assign:ident) => {
        impl $trait<&RoaringBitmap> for &RoaringBitmap {
            type Output = RoaringBitmap;

            fn $method(self, rhs: &RoaringBitmap) -> RoaringBitmap {
                self.$op(rhs)
            }
        }

        impl $assign_trait<&RoaringBitmap> for RoaringBitmap {
            fn $assign_method(&mut self, rhs: &RoaringBitmap) {
                self.$op_assign(rhs);
            }
        }
    };
}

binary_op!(BitAnd, bitand, BitAndAssign, bitand_assign, and, and_assign);
binary_op!(BitOr, bitor, BitOrAssign, bitor_assign, or, or_assign);
binary_op!(BitXor, bitxor, BitXorAssign, bitxor_assign, xor, xor_assign);
binary_op!(Sub, sub, SubAssign, sub_assign, and_not, and_not_assign);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_remove_contains_across_keys() {
        let mut bm = RoaringBitmap::new();
        assert!(bm.add(0));
        assert!(bm.add(u32::MAX));
        assert!(bm.add(70_000));
        assert!(!bm.add(70_000));
        assert_eq!(bm.len(), 3);
        assert_eq!(bm.directory().keys(), &[0, 1, 65535]);
        assert!(bm.remove(70_000));
        assert!(!bm.remove(70_000));
        assert_eq!(bm.directory().keys(), &[0, 65535]);
        assert_eq!(bm.min(), Some(0));
        assert_eq!(bm.max(), Some(u32::MAX));
    }

    #[test]
    fn ranges_span_keys() {
        let mut bm = RoaringBitmap::new();
        bm.add_range(65_530, 131_080).unwrap();
        assert_eq!(bm.len(), 131_080 - 65_530);
        assert_eq!(bm.directory().keys(), &[0, 1, 2]);
        bm.remove_range(65_536, 131_072).unwrap();
        assert_eq!(bm.directory().keys(), &[0, 2]);
        assert_eq!(bm.len(), 6 + 8);
        bm.flip_range(0, 10).unwrap();
        assert_eq!(bm.len(), 24);
        assert!(bm.add_range(5, 5).is_err());
        assert!(bm.add_range(0, (1 << 32) + 1).is_err());
        bm.add_range(0, 1 << 32).unwrap();
        assert_eq!(bm.len(), 1 << 32);
    }

    #[test]
    fn flipped_copies_untouched_keys() {
        let bm: RoaringBitmap = [1u32, 200_000, 500_000].into_iter().collect();
        let f = bm.flipped(131_072, 262_144).unwrap();
        assert!(f.contains(1) && f.contains(500_000));
        assert!(!f.contains(200_000));
        assert_eq!(f.len(), 3 - 1 + 131_072 - 1);
        assert_eq!(f.flipped(131_072, 262_144).unwrap(), bm);
    }

    #[test]
    fn rank_select_iter() {
        let bm: RoaringBitmap = [5u32, 1 << 16, (1 << 16) + 9, 1 << 31].into_iter().collect();
        assert_eq!(bm.rank(4), 0);
        assert_eq!(bm.rank(1 << 16), 2);
        assert_eq!(bm.rank(u32::MAX), 4);
        assert_eq!(bm.select(2), Some((1 << 16) + 9));
        assert_eq!(bm.select(4), None);
        assert_eq!(bm.iter().collect::<Vec<u32>>(), vec![5, 1 << 16, (1 << 16) + 9, 1 << 31]);
    }

    #[test]
    fn operators_match_methods() {
        let a: RoaringBitmap = (0..100_000u32).step_by(3).collect();
        let b: RoaringBitmap = (0..100_000u32).step_by(5).collect();
        assert_eq!(&a & &b, a.and(&b));
        assert_eq!(&a | &b, a.or(&b));
        assert_eq!(&a ^ &b, a.xor(&b));
        assert_eq!(&a - &b, a.and_not(&b));
        let mut c = a.clone();
        c &= &b;
        assert_eq!(c.len(), (0..100_000u32).step_by(15).count() as u64);
        assert!(a.intersects(&b));
        assert!(!a.intersects(&RoaringBitmap::from_iter([1u32, 2])));
    }

    #[test]
    fn cardinality_only_operations() {
        let a: RoaringBitmap = (0..300_000u32).step_by(3).collect();
        let mut b: RoaringBitmap = (100_000..400_000u32).step_by(5).collect();
        b.add_range(250_000, 260_000).unwrap();
        b.run_optimize();
        assert_eq!(a.and_cardinality(&b), (&a & &b).len());
        assert_eq!(a.or_cardinality(&b), (&a | &b).len());
        assert_eq!(a.xor_cardinality(&b), (&a ^ &b).len());
        assert_eq!(a.and_not_cardinality(&b), (&a - &b).len());
        assert_eq!(a.and_cardinality(&RoaringBitmap::new()), 0);
    }

    #[test]
    fn subset_checks_every_key() {
        let big: RoaringBitmap = (0..200_000u32).step_by(2).collect();
        let small: RoaringBitmap = [0u32, 70_000, 199_998].into_iter().collect();
        assert!(small.is_subset(&big));
        assert!(!big.is_subset(&small));
        assert!(RoaringBitmap::new().is_subset(&small));
        let outside: RoaringBitmap = [0u32, 300_000].into_iter().collect();
        assert!(!outside.is_subset(&big));
        let odd: RoaringBitmap = [0u32, 70_001].into_iter().collect();
        assert!(!odd.is_subset(&big));
    }

    #[test]
    fn next_and_previous_cross_keys() {
        let bm: RoaringBitmap = [5u32, 1 << 16, (1 << 16) + 9, 1 << 31].into_iter().collect();
        assert_eq!(bm.next_value(0), Some(5));
        assert_eq!(bm.next_value(6), Some(1 << 16));
        assert_eq!(bm.next_value((1 << 16) + 10), Some(1 << 31));
        assert_eq!(bm.next_value((1 << 31) + 1), None);
        assert_eq!(bm.previous_value(4), None);
        assert_eq!(bm.previous_value((1 << 16) - 1), Some(5));
        assert_eq!(bm.previous_value((1 << 16) + 8), Some(1 << 16));
        assert_eq!(bm.previous_value(u32::MAX), Some(1 << 31));
        assert_eq!(RoaringBitmap::new().next_value(0), None);
    }

    #[test]
    fn collect_then_remove() {
        let mut bm: RoaringBitmap = (0..1000u32).collect();
        let odd: Vec<u32> = bm.iter().filter(|v| v % 2 == 1).collect();
        for v in odd {
            bm.remove(v);
        }
        assert_eq!(bm.len(), 500);
        assert!(bm.iter().all(|v| v % 2 == 0));
    }

    #[test]
    fn run_optimize_reports_runs() {
        let mut bm: RoaringBitmap = (0..10_000u32).collect();
        assert!(bm.run_optimize());
        assert_eq!(bm.directory().container_at(0).kind(), ContainerKind::Run);
        let mut sparse: RoaringBitmap = [1u32, 10, 100].into_iter().collect();
        assert!(!sparse.run_optimize());
    }
}
