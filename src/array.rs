//! Sparse container: a sorted, deduplicated vector of 16-bit values.
//!
//! Chosen while a chunk holds at most [`ARRAY_MAX_SIZE`] values. Past that
//! point a 65536-bit bitmap is never larger, so every operation that could
//! grow the array checks the threshold and hands back a
//! [`BitmapContainer`] instead.
//!
//! # Layout
//!
//! ```text
//! [u16 cardinality][u16 value] * cardinality      (all little-endian)
//! ```

use std::fmt;
use std::io::{Read, Write};

use crate::bitset::BitmapContainer;
use crate::container::{self, Container, ARRAY_MAX_SIZE, MAX_CARDINALITY};
use crate::error::{check_complement_range, check_range, Error, Result};
use crate::run::RunContainer;
use crate::util;

const DEFAULT_INIT_SIZE: usize = 4;

fn check_capacity(len: usize) -> Result<()> {
    if len > ARRAY_MAX_SIZE {
        return Err(Error::CapacityExceeded {
            len,
            max: ARRAY_MAX_SIZE,
        });
    }
    Ok(())
}

/// Sorted array of distinct 16-bit values.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct ArrayContainer {
    content: Vec<u16>,
}

impl fmt::Debug for ArrayContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArrayContainer")
            .field("cardinality", &self.content.len())
            .field("min", &self.min())
            .field("max", &self.max())
            .finish()
    }
}

impl ArrayContainer {
    /// Create an empty array container.
    pub fn new() -> Self {
        Self {
            content: Vec::new(),
        }
    }

    /// Create an empty array container with room for `capacity` values.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            content: Vec::with_capacity(capacity),
        }
    }

    /// Create a container holding every value of `[start, end)`.
    ///
    /// The range may cover at most [`ARRAY_MAX_SIZE`] values.
    pub fn from_range(start: u32, end: u32) -> Result<Self> {
        check_range(start as u64, end as u64, MAX_CARDINALITY as u64)?;
        check_capacity((end - start) as usize)?;
        Ok(Self {
            content: (start..end).map(|v| v as u16).collect(),
        })
    }

    /// Build from a vector that must already be strictly increasing and hold
    /// at most [`ARRAY_MAX_SIZE`] values.
    pub fn from_sorted(content: Vec<u16>) -> Result<Self> {
        check_capacity(content.len())?;
        if content.windows(2).any(|w| w[0] >= w[1]) {
            return Err(Error::InvalidEncoding(
                "array container values are not strictly increasing".to_string(),
            ));
        }
        Ok(Self { content })
    }

    pub(crate) fn from_sorted_unchecked(content: Vec<u16>) -> Self {
        debug_assert!(content.windows(2).all(|w| w[0] < w[1]));
        Self { content }
    }

    /// Number of values stored.
    pub fn len(&self) -> usize {
        self.content.len()
    }

    /// Return true if the container holds no values.
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// The sorted values.
    pub fn as_slice(&self) -> &[u16] {
        &self.content
    }

    /// Iterate the values in increasing order.
    pub fn iter(&self) -> std::iter::Copied<std::slice::Iter<'_, u16>> {
        self.content.iter().copied()
    }

    /// Smallest value.
    pub fn min(&self) -> Option<u16> {
        self.content.first().copied()
    }

    /// Largest value.
    pub fn max(&self) -> Option<u16> {
        self.content.last().copied()
    }

    /// Return true if `x` is present.
    pub fn contains(&self, x: u16) -> bool {
        self.content.binary_search(&x).is_ok()
    }

    /// Insert `x`; returns true if it was absent.
    ///
    /// Fails once the array is full. [`ArrayContainer::add`] converts to a
    /// bitmap instead.
    pub fn insert(&mut self, x: u16) -> Result<bool> {
        match self.content.binary_search(&x) {
            Ok(_) => Ok(false),
            Err(loc) => {
                check_capacity(self.content.len() + 1)?;
                self.reserve_one();
                self.content.insert(loc, x);
                Ok(true)
            }
        }
    }

    /// Remove `x`; returns true if it was present.
    pub fn remove(&mut self, x: u16) -> bool {
        match self.content.binary_search(&x) {
            Ok(loc) => {
                self.content.remove(loc);
                true
            }
            Err(_) => false,
        }
    }

    /// Add `x`, converting to a bitmap when the array is already at the threshold.
    pub fn add(mut self, x: u16) -> Container {
        match self.content.binary_search(&x) {
            Ok(_) => Container::Array(self),
            Err(_) if self.content.len() >= ARRAY_MAX_SIZE => {
                let mut bitmap = self.to_bitmap_container();
                bitmap.insert(x);
                Container::Bitmap(bitmap)
            }
            Err(loc) => {
                self.reserve_one();
                self.content.insert(loc, x);
                Container::Array(self)
            }
        }
    }

    /// Add every value of `[start, end)`.
    pub fn add_range(mut self, start: u32, end: u32) -> Result<Container> {
        check_range(start as u64, end as u64, MAX_CARDINALITY as u64)?;
        let (lo, hi) = self.range_bounds(start, end);
        let cardinality = self.content.len() - (hi - lo) + (end - start) as usize;
        if cardinality > ARRAY_MAX_SIZE {
            let mut bitmap = self.to_bitmap_container();
            bitmap.set_range(start, end);
            return Ok(bitmap.into_container());
        }
        self.content.splice(lo..hi, (start..end).map(|v| v as u16));
        Ok(Container::Array(self))
    }

    /// Remove every value of `[start, end)`.
    pub fn remove_range(&mut self, start: u32, end: u32) -> Result<()> {
        check_range(start as u64, end as u64, MAX_CARDINALITY as u64)?;
        let (lo, hi) = self.range_bounds(start, end);
        self.content.drain(lo..hi);
        Ok(())
    }

    /// Indices `[lo, hi)` of the stored values falling in `[start, end)`.
    fn range_bounds(&self, start: u32, end: u32) -> (usize, usize) {
        let lo = self.content.partition_point(|&v| (v as u32) < start);
        let hi = lo + self.content[lo..].partition_point(|&v| (v as u32) < end);
        (lo, hi)
    }

    /// Number of stored values that are `<= x`.
    pub fn rank(&self, x: u16) -> usize {
        self.content.partition_point(|&v| v <= x)
    }

    /// The `j`-th smallest value (0-indexed).
    pub fn select(&self, j: usize) -> Option<u16> {
        self.content.get(j).copied()
    }

    /// Number of maximal runs of consecutive values.
    pub fn number_of_runs(&self) -> usize {
        if self.content.is_empty() {
            return 0;
        }
        1 + self
            .content
            .windows(2)
            .filter(|w| w[0] as u32 + 1 != w[1] as u32)
            .count()
    }

    /// Convert to a bitmap container with the same membership.
    pub fn to_bitmap_container(&self) -> BitmapContainer {
        let mut bitmap = BitmapContainer::new();
        for &v in &self.content {
            bitmap.insert(v);
        }
        bitmap
    }

    /// Intersection with another array (galloping when the sizes are skewed).
    pub fn and(&self, other: &Self) -> ArrayContainer {
        let mut out = Vec::with_capacity(self.len().min(other.len()));
        util::intersect(&self.content, &other.content, &mut out);
        Self { content: out }
    }

    /// Difference `self \ other`.
    pub fn and_not(&self, other: &Self) -> ArrayContainer {
        let mut out = Vec::with_capacity(self.len());
        util::difference(&self.content, &other.content, &mut out);
        Self { content: out }
    }

    /// Union; becomes a bitmap when the result may not fit in an array.
    pub fn or(&self, other: &Self) -> Container {
        if self.len() + other.len() > ARRAY_MAX_SIZE {
            let mut bitmap = self.to_bitmap_container();
            for &v in &other.content {
                bitmap.insert(v);
            }
            return bitmap.into_container();
        }
        let mut out = Vec::with_capacity(self.len() + other.len());
        util::union(&self.content, &other.content, &mut out);
        Container::Array(Self { content: out })
    }

    /// Symmetric difference; becomes a bitmap when the result may not fit in an array.
    pub fn xor(&self, other: &Self) -> Container {
        if self.len() + other.len() > ARRAY_MAX_SIZE {
            let mut bitmap = self.to_bitmap_container();
            for &v in &other.content {
                bitmap.flip(v);
            }
            return bitmap.into_container();
        }
        let mut out = Vec::with_capacity(self.len() + other.len());
        util::symmetric_difference(&self.content, &other.content, &mut out);
        Container::Array(Self { content: out })
    }

    /// Difference `self \ other` against a bitmap.
    pub fn and_not_bitmap(&self, other: &BitmapContainer) -> ArrayContainer {
        Self {
            content: self
                .content
                .iter()
                .copied()
                .filter(|&v| !other.contains(v))
                .collect(),
        }
    }

    /// Difference `self \ other` against a run container.
    pub fn and_not_run(&self, other: &RunContainer) -> ArrayContainer {
        let runs = other.runs();
        let mut out = Vec::with_capacity(self.len());
        let mut r = 0;
        for &v in &self.content {
            while r < runs.len() && runs[r].last() < v {
                r += 1;
            }
            if r < runs.len() && runs[r].start <= v {
                continue;
            }
            out.push(v);
        }
        Self { content: out }
    }

    /// Return true if the two arrays share a value.
    pub fn intersects(&self, other: &Self) -> bool {
        util::intersects(&self.content, &other.content)
    }

    /// Complement restricted to `[start, end)`; values outside the range are kept.
    pub fn not(&self, start: u32, end: u32) -> Result<Container> {
        if !check_complement_range(start as u64, end as u64, MAX_CARDINALITY as u64)? {
            return Ok(Container::Array(self.clone()));
        }
        let (lo, hi) = self.range_bounds(start, end);
        let present = hi - lo;
        let flipped_in = (end - start) as usize - present;
        let cardinality = self.content.len() - present + flipped_in;
        if cardinality > ARRAY_MAX_SIZE {
            return self.to_bitmap_container().not(start, end);
        }

        let mut out = Vec::with_capacity(cardinality);
        out.extend_from_slice(&self.content[..lo]);
        let mut existing = self.content[lo..hi].iter().peekable();
        for v in start..end {
            if existing.peek().is_some_and(|&&e| e as u32 == v) {
                existing.next();
            } else {
                out.push(v as u16);
            }
        }
        out.extend_from_slice(&self.content[hi..]);
        assert_eq!(
            out.len(),
            cardinality,
            "negated array length disagrees with computed cardinality"
        );
        Ok(Container::Array(Self { content: out }))
    }

    /// Serialized size: a 2-byte cardinality header plus 2 bytes per value.
    pub fn serialized_size_in_bytes(&self) -> usize {
        container::array_serialized_size(self.content.len())
    }

    /// Approximate heap memory usage in bytes.
    pub fn heap_bytes(&self) -> usize {
        self.content.capacity() * 2
    }

    /// Write `[u16 cardinality][u16 value]*` in little-endian order.
    pub fn serialize<W: Write>(&self, writer: &mut W) -> Result<()> {
        check_capacity(self.content.len())?;
        writer.write_all(&(self.content.len() as u16).to_le_bytes())?;
        self.write_payload(writer)
    }

    /// Read a container written by [`ArrayContainer::serialize`].
    pub fn deserialize<R: Read>(reader: &mut R) -> Result<Self> {
        let cardinality = container::read_u16(reader)? as usize;
        Self::read_payload(reader, cardinality)
    }

    /// Write the values without the cardinality header.
    pub(crate) fn write_payload<W: Write>(&self, writer: &mut W) -> Result<()> {
        let mut buf = Vec::with_capacity(self.content.len() * 2);
        for &v in &self.content {
            buf.extend_from_slice(&v.to_le_bytes());
        }
        writer.write_all(&buf)?;
        Ok(())
    }

    /// Read `cardinality` values with no header.
    pub(crate) fn read_payload<R: Read>(reader: &mut R, cardinality: usize) -> Result<Self> {
        check_capacity(cardinality)?;
        let content = container::read_u16_vec(reader, cardinality)?;
        Self::from_sorted(content)
    }

    /// Grow the backing buffer by the array growth policy when it is full.
    fn reserve_one(&mut self) {
        let capacity = self.content.capacity();
        if self.content.len() < capacity {
            return;
        }
        let grown = if capacity == 0 {
            DEFAULT_INIT_SIZE
        } else if capacity < 64 {
            capacity * 2
        } else if capacity < 1024 {
            capacity * 3 / 2
        } else {
            capacity * 5 / 4
        };
        let target = grown.min(ARRAY_MAX_SIZE).max(capacity + 1);
        self.content.reserve_exact(target - self.content.len());
    }
}
