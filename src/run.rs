//! Run-length container: a sorted list of maximal runs of consecutive values.
//!
//! A run is stored as `(start, length)` where `length` is the number of
//! values minus one, so a single `u16` pair covers anything from one value
//! to the whole 65536-value chunk. Runs are kept sorted, non-overlapping and
//! non-adjacent; every constructor and mutation preserves that, so two run
//! containers with the same membership are structurally equal.
//!
//! # Layout
//!
//! ```text
//! [u16 run count][u16 start, u16 length] * run count   (all little-endian)
//! ```
//!
//! # Merges
//!
//! Unions walk both inputs in start order and fuse each incoming run into the
//! last output run when they touch ([`smart_append`]). Symmetric differences
//! do the same with [`append_exclusive`], which cancels the overlapping part
//! instead of fusing it. Range complement is a symmetric difference with the
//! single run `[start, end)`, and can run inside the container's own buffer
//! when there is one spare slot.

use std::fmt;
use std::io::{Read, Write};

use tracing::trace;

use crate::array::ArrayContainer;
use crate::bitset::BitmapContainer;
use crate::container::{self, Container, ContainerKind, ARRAY_MAX_SIZE, MAX_CARDINALITY};
use crate::error::{check_complement_range, check_range, Error, Result};

/// A run of `length + 1` consecutive values starting at `start`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Run {
    /// First value of the run.
    pub start: u16,
    /// Number of values in the run, minus one.
    pub length: u16,
}

impl Run {
    /// Create a run covering `[start, start + length]`.
    pub fn new(start: u16, length: u16) -> Self {
        debug_assert!(start as u32 + length as u32 <= u16::MAX as u32);
        Self { start, length }
    }

    /// Run covering the half-open range `[start, end)`; requires `start < end <= 65536`.
    #[inline]
    pub(crate) fn from_bounds(start: u32, end: u32) -> Self {
        debug_assert!(start < end && end as usize <= MAX_CARDINALITY);
        Self {
            start: start as u16,
            length: (end - start - 1) as u16,
        }
    }

    /// Last value of the run (inclusive).
    #[inline]
    pub fn last(self) -> u16 {
        self.start + self.length
    }

    /// One past the last value of the run.
    #[inline]
    pub fn end(self) -> u32 {
        self.start as u32 + self.length as u32 + 1
    }

    /// Number of values covered.
    #[inline]
    pub fn len(self) -> usize {
        self.length as usize + 1
    }
}

/// Append `run` to `out`, fusing it into the last run when they overlap or touch.
///
/// Runs must arrive in non-decreasing start order.
pub(crate) fn smart_append(out: &mut Vec<Run>, run: Run) {
    if let Some(last) = out.last_mut() {
        if run.start as u32 <= last.end() {
            if run.end() > last.end() {
                *last = Run::from_bounds(last.start as u32, run.end());
            }
            return;
        }
    }
    out.push(run);
}

/// Append `run` to `runs[..*len]` with symmetric-difference semantics.
///
/// Values covered by both the incoming run and the last run cancel out. Writes
/// at most at index `*len`, so a caller may read ahead in the same buffer.
/// Runs must arrive in non-decreasing start order.
pub(crate) fn append_exclusive(runs: &mut [Run], len: &mut usize, run: Run) {
    let start = run.start as u32;
    let end = run.end();
    if *len == 0 || start > runs[*len - 1].end() {
        runs[*len] = run;
        *len += 1;
        return;
    }

    let last = runs[*len - 1];
    let last_start = last.start as u32;
    let old_end = last.end();
    if start == old_end {
        runs[*len - 1] = Run::from_bounds(last_start, end);
        return;
    }

    if start == last_start {
        if end < old_end {
            runs[*len - 1] = Run::from_bounds(end, old_end);
        } else if end > old_end {
            runs[*len - 1] = Run::from_bounds(old_end, end);
        } else {
            *len -= 1;
        }
        return;
    }

    runs[*len - 1] = Run::from_bounds(last_start, start);
    if end < old_end {
        runs[*len] = Run::from_bounds(end, old_end);
        *len += 1;
    } else if end > old_end {
        runs[*len] = Run::from_bounds(old_end, end);
        *len += 1;
    }
}

/// Sorted list of non-overlapping, non-adjacent runs.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct RunContainer {
    runs: Vec<Run>,
}

impl fmt::Debug for RunContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunContainer")
            .field("runs", &self.runs.len())
            .field("cardinality", &self.len())
            .finish()
    }
}

impl RunContainer {
    /// Create an empty run container.
    pub fn new() -> Self {
        Self { runs: Vec::new() }
    }

    /// Create an empty container with room for `capacity` runs.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            runs: Vec::with_capacity(capacity),
        }
    }

    /// A single run covering all 65536 values.
    pub fn full() -> Self {
        Self {
            runs: vec![Run::new(0, u16::MAX)],
        }
    }

    /// A single run covering `[start, end)`.
    pub fn from_range(start: u32, end: u32) -> Result<Self> {
        check_range(start as u64, end as u64, MAX_CARDINALITY as u64)?;
        Ok(Self {
            runs: vec![Run::from_bounds(start, end)],
        })
    }

    /// Build from runs, checking that they are sorted, disjoint and non-adjacent.
    pub fn from_runs(runs: Vec<Run>) -> Result<Self> {
        for (i, run) in runs.iter().enumerate() {
            if run.end() as usize > MAX_CARDINALITY {
                return Err(Error::InvalidEncoding(format!(
                    "run {i} extends past the chunk"
                )));
            }
            if i > 0 && (run.start as u32) <= runs[i - 1].end() {
                return Err(Error::InvalidEncoding(format!(
                    "run {i} overlaps or touches its predecessor"
                )));
            }
        }
        Ok(Self { runs })
    }

    /// The runs, in increasing order.
    pub fn runs(&self) -> &[Run] {
        &self.runs
    }

    /// Number of runs.
    pub fn num_runs(&self) -> usize {
        self.runs.len()
    }

    /// Number of values covered.
    pub fn len(&self) -> usize {
        self.runs.iter().map(|r| r.len()).sum()
    }

    /// Return true if no value is covered.
    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Return true if the single run `[0, 65535]` is stored.
    pub fn is_full(&self) -> bool {
        self.runs.len() == 1 && self.runs[0].start == 0 && self.runs[0].length == u16::MAX
    }

    /// Return true if `x` falls inside a run.
    pub fn contains(&self, x: u16) -> bool {
        let i = self.runs.partition_point(|r| r.start <= x);
        i > 0 && x <= self.runs[i - 1].last()
    }

    /// Insert `x`, extending or fusing neighbouring runs; returns true if it was absent.
    pub fn insert(&mut self, x: u16) -> bool {
        let i = self.runs.partition_point(|r| r.start <= x);
        let joins_next = i < self.runs.len() && self.runs[i].start as u32 == x as u32 + 1;
        if i > 0 {
            let prev = self.runs[i - 1];
            if x <= prev.last() {
                return false;
            }
            if x as u32 == prev.end() {
                if joins_next {
                    let next = self.runs.remove(i);
                    self.runs[i - 1] = Run::from_bounds(prev.start as u32, next.end());
                } else {
                    self.runs[i - 1].length += 1;
                }
                return true;
            }
        }
        if joins_next {
            self.runs[i].start = x;
            self.runs[i].length += 1;
        } else {
            self.runs.insert(i, Run::new(x, 0));
        }
        true
    }

    /// Remove `x`, shrinking or splitting its run; returns true if it was present.
    pub fn remove(&mut self, x: u16) -> bool {
        let i = self.runs.partition_point(|r| r.start <= x);
        if i == 0 {
            return false;
        }
        let idx = i - 1;
        let run = self.runs[idx];
        if x > run.last() {
            return false;
        }
        if run.length == 0 {
            self.runs.remove(idx);
        } else if x == run.start {
            self.runs[idx] = Run::new(x + 1, run.length - 1);
        } else if x == run.last() {
            self.runs[idx].length -= 1;
        } else {
            self.runs[idx].length = x - run.start - 1;
            self.runs.insert(idx + 1, Run::new(x + 1, run.last() - x - 1));
        }
        true
    }

    /// Add every value of `[start, end)`, replacing the touched runs by one merged run.
    pub fn insert_range(&mut self, start: u32, end: u32) -> Result<()> {
        check_range(start as u64, end as u64, MAX_CARDINALITY as u64)?;
        let first = self.runs.partition_point(|r| r.end() < start);
        let last = first + self.runs[first..].partition_point(|r| r.start as u32 <= end);
        let mut merged_start = start;
        let mut merged_end = end;
        if first < last {
            merged_start = merged_start.min(self.runs[first].start as u32);
            merged_end = merged_end.max(self.runs[last - 1].end());
        }
        self.runs
            .splice(first..last, [Run::from_bounds(merged_start, merged_end)]);
        Ok(())
    }

    /// Remove every value of `[start, end)`, trimming the runs at either edge.
    pub fn remove_range(&mut self, start: u32, end: u32) -> Result<()> {
        check_range(start as u64, end as u64, MAX_CARDINALITY as u64)?;
        let first = self.runs.partition_point(|r| r.end() <= start);
        let last = first + self.runs[first..].partition_point(|r| (r.start as u32) < end);
        if first == last {
            return Ok(());
        }
        let head = self.runs[first];
        let tail = self.runs[last - 1];
        let mut keep = Vec::with_capacity(2);
        if (head.start as u32) < start {
            keep.push(Run::from_bounds(head.start as u32, start));
        }
        if tail.end() > end {
            keep.push(Run::from_bounds(end, tail.end()));
        }
        self.runs.splice(first..last, keep);
        Ok(())
    }

    /// Smallest value.
    pub fn min(&self) -> Option<u16> {
        self.runs.first().map(|r| r.start)
    }

    /// Largest value.
    pub fn max(&self) -> Option<u16> {
        self.runs.last().map(|r| r.last())
    }

    /// Number of values `<= x`.
    pub fn rank(&self, x: u16) -> usize {
        let mut answer = 0;
        for run in &self.runs {
            if x < run.start {
                return answer;
            }
            if x <= run.last() {
                return answer + (x - run.start) as usize + 1;
            }
            answer += run.len();
        }
        answer
    }

    /// The `j`-th smallest value (0-indexed).
    pub fn select(&self, j: usize) -> Option<u16> {
        let mut left = j;
        for run in &self.runs {
            if left < run.len() {
                return Some(run.start + left as u16);
            }
            left -= run.len();
        }
        None
    }

    /// Convert to a sorted array; callers check the length against the array threshold first.
    pub(crate) fn to_array_container(&self) -> ArrayContainer {
        let mut out = Vec::with_capacity(self.len());
        for run in &self.runs {
            out.extend((run.start as u32..run.end()).map(|v| v as u16));
        }
        ArrayContainer::from_sorted_unchecked(out)
    }

    /// Convert to a bitmap with the same membership.
    pub fn to_bitmap_container(&self) -> BitmapContainer {
        let mut bitmap = BitmapContainer::new();
        for run in &self.runs {
            bitmap.set_range(run.start as u32, run.end());
        }
        bitmap
    }

    /// Serialized size: a 2-byte run count plus 4 bytes per run.
    pub fn serialized_size_in_bytes(&self) -> usize {
        container::run_serialized_size(self.runs.len())
    }

    /// Approximate heap memory usage in bytes.
    pub fn heap_bytes(&self) -> usize {
        self.runs.capacity() * 4
    }

    /// Keep the run form only if it serializes no larger than both alternatives.
    pub fn into_efficient_container(self) -> Container {
        let cardinality = self.len();
        let as_run = self.serialized_size_in_bytes();
        let as_array = container::array_serialized_size(cardinality);
        if as_run <= as_array.min(container::BITMAP_SERIALIZED_SIZE) {
            return Container::Run(self);
        }
        let converted = if cardinality <= ARRAY_MAX_SIZE {
            Container::Array(self.to_array_container())
        } else {
            Container::Bitmap(self.to_bitmap_container())
        };
        trace!(
            from = ?ContainerKind::Run,
            to = ?converted.kind(),
            cardinality,
            runs = self.runs.len(),
            "converted run container"
        );
        converted
    }

    /// Intersection with another run container.
    pub fn and(&self, other: &Self) -> Container {
        let (a, b) = (&self.runs, &other.runs);
        let mut out = Vec::new();
        let (mut i, mut j) = (0, 0);
        while i < a.len() && j < b.len() {
            let (s1, e1) = (a[i].start as u32, a[i].end());
            let (s2, e2) = (b[j].start as u32, b[j].end());
            if e1 <= s2 {
                i += 1;
            } else if e2 <= s1 {
                j += 1;
            } else {
                out.push(Run::from_bounds(s1.max(s2), e1.min(e2)));
                if e1 <= e2 {
                    i += 1;
                }
                if e2 <= e1 {
                    j += 1;
                }
            }
        }
        Self { runs: out }.into_efficient_container()
    }

    /// Union with another run container.
    pub fn or(&self, other: &Self) -> Container {
        if self.is_full() || other.is_full() {
            return Container::Run(Self::full());
        }
        let (a, b) = (&self.runs, &other.runs);
        let mut out = Vec::with_capacity(a.len() + b.len());
        let (mut i, mut j) = (0, 0);
        while i < a.len() || j < b.len() {
            if j >= b.len() || (i < a.len() && a[i].start <= b[j].start) {
                smart_append(&mut out, a[i]);
                i += 1;
            } else {
                smart_append(&mut out, b[j]);
                j += 1;
            }
        }
        Self { runs: out }.into_efficient_container()
    }

    /// Symmetric difference with another run container.
    pub fn xor(&self, other: &Self) -> Container {
        let (a, b) = (&self.runs, &other.runs);
        let mut out = vec![Run::default(); a.len() + b.len()];
        let mut len = 0;
        let (mut i, mut j) = (0, 0);
        while i < a.len() || j < b.len() {
            if j >= b.len() || (i < a.len() && a[i].start <= b[j].start) {
                append_exclusive(&mut out, &mut len, a[i]);
                i += 1;
            } else {
                append_exclusive(&mut out, &mut len, b[j]);
                j += 1;
            }
        }
        out.truncate(len);
        Self { runs: out }.into_efficient_container()
    }

    /// Difference `self \ other`.
    pub fn and_not(&self, other: &Self) -> Container {
        let b = &other.runs;
        let mut out = Vec::with_capacity(self.runs.len());
        let mut j = 0;
        for run in &self.runs {
            let mut s = run.start as u32;
            let e = run.end();
            while j < b.len() && b[j].end() <= s {
                j += 1;
            }
            let mut k = j;
            while k < b.len() && (b[k].start as u32) < e {
                let bs = b[k].start as u32;
                if bs > s {
                    out.push(Run::from_bounds(s, bs));
                }
                s = s.max(b[k].end());
                k += 1;
            }
            if s < e {
                out.push(Run::from_bounds(s, e));
            }
        }
        Self { runs: out }.into_efficient_container()
    }

    /// The values of `other` covered by a run.
    pub fn and_array(&self, other: &ArrayContainer) -> ArrayContainer {
        let mut out = Vec::with_capacity(other.len());
        let mut r = 0;
        for v in other.iter() {
            while r < self.runs.len() && self.runs[r].last() < v {
                r += 1;
            }
            if r == self.runs.len() {
                break;
            }
            if self.runs[r].start <= v {
                out.push(v);
            }
        }
        ArrayContainer::from_sorted_unchecked(out)
    }

    /// Union with an array: each value is merged as a run of length one.
    pub fn or_array(&self, other: &ArrayContainer) -> Container {
        if self.is_full() {
            return Container::Run(Self::full());
        }
        let values = other.as_slice();
        let mut out = Vec::with_capacity(self.runs.len() + values.len());
        let (mut i, mut j) = (0, 0);
        while i < self.runs.len() || j < values.len() {
            if j >= values.len() || (i < self.runs.len() && self.runs[i].start <= values[j]) {
                smart_append(&mut out, self.runs[i]);
                i += 1;
            } else {
                smart_append(&mut out, Run::new(values[j], 0));
                j += 1;
            }
        }
        Self { runs: out }.into_efficient_container()
    }

    /// Symmetric difference with an array.
    pub fn xor_array(&self, other: &ArrayContainer) -> Container {
        let values = other.as_slice();
        let mut out = vec![Run::default(); self.runs.len() + values.len()];
        let mut len = 0;
        let (mut i, mut j) = (0, 0);
        while i < self.runs.len() || j < values.len() {
            if j >= values.len() || (i < self.runs.len() && self.runs[i].start <= values[j]) {
                append_exclusive(&mut out, &mut len, self.runs[i]);
                i += 1;
            } else {
                append_exclusive(&mut out, &mut len, Run::new(values[j], 0));
                j += 1;
            }
        }
        out.truncate(len);
        Self { runs: out }.into_efficient_container()
    }

    /// Difference `self \ other` against an array: split runs around the removed values.
    pub fn and_not_array(&self, other: &ArrayContainer) -> Container {
        let values = other.as_slice();
        let mut out = Vec::with_capacity(self.runs.len() + values.len());
        let mut j = 0;
        for run in &self.runs {
            let mut s = run.start as u32;
            let e = run.end();
            while j < values.len() && (values[j] as u32) < s {
                j += 1;
            }
            while j < values.len() && (values[j] as u32) < e {
                let v = values[j] as u32;
                if v > s {
                    out.push(Run::from_bounds(s, v));
                }
                s = v + 1;
                j += 1;
            }
            if s < e {
                out.push(Run::from_bounds(s, e));
            }
        }
        Self { runs: out }.into_efficient_container()
    }

    /// Intersection with a bitmap.
    pub fn and_bitmap(&self, other: &BitmapContainer) -> Container {
        other.and_run(self)
    }

    /// Union with a bitmap.
    pub fn or_bitmap(&self, other: &BitmapContainer) -> Container {
        if self.is_full() {
            return Container::Run(Self::full());
        }
        other.or_run(self)
    }

    /// Symmetric difference with a bitmap.
    pub fn xor_bitmap(&self, other: &BitmapContainer) -> Container {
        other.xor_run(self)
    }

    /// Difference `self \ other` against a bitmap.
    pub fn and_not_bitmap(&self, other: &BitmapContainer) -> Container {
        if self.len() <= ARRAY_MAX_SIZE {
            let mut out = Vec::with_capacity(self.len());
            for v in self.iter() {
                if !other.contains(v) {
                    out.push(v);
                }
            }
            return Container::Array(ArrayContainer::from_sorted_unchecked(out));
        }
        self.to_bitmap_container().iand_not(other)
    }

    /// Return true if the two run lists share a value.
    pub fn intersects(&self, other: &Self) -> bool {
        let (a, b) = (&self.runs, &other.runs);
        let (mut i, mut j) = (0, 0);
        while i < a.len() && j < b.len() {
            if a[i].end() <= b[j].start as u32 {
                i += 1;
            } else if b[j].end() <= a[i].start as u32 {
                j += 1;
            } else {
                return true;
            }
        }
        false
    }

    /// Complement restricted to `[start, end)`.
    ///
    /// An empty or reversed range leaves the values unchanged; `end` past
    /// 65536 is an error.
    pub fn not(&self, start: u32, end: u32) -> Result<Container> {
        let mut runs = Vec::with_capacity(self.runs.len() + 1);
        runs.extend_from_slice(&self.runs);
        Self { runs }.inot(start, end)
    }

    /// In-place complement restricted to `[start, end)`.
    ///
    /// Needs one spare slot: the runs are shifted right by one so the merge
    /// can read ahead of where it writes. Without spare capacity this falls
    /// back to [`RunContainer::not`].
    pub fn inot(mut self, start: u32, end: u32) -> Result<Container> {
        if !check_complement_range(start as u64, end as u64, MAX_CARDINALITY as u64)? {
            return Ok(Container::Run(self));
        }
        if self.runs.capacity() <= self.runs.len() {
            return self.not(start, end);
        }
        let n = self.runs.len();
        self.runs.insert(0, Run::default());

        let mut len = 0;
        let mut k = 0;
        while k < n && (self.runs[k + 1].start as u32) < start {
            self.runs[len] = self.runs[k + 1];
            len += 1;
            k += 1;
        }
        append_exclusive(&mut self.runs, &mut len, Run::from_bounds(start, end));
        while k < n {
            let run = self.runs[k + 1];
            append_exclusive(&mut self.runs, &mut len, run);
            k += 1;
        }
        self.runs.truncate(len);
        Ok(self.into_efficient_container())
    }

    /// Write `[u16 run count][u16 start, u16 length]*` in little-endian order.
    pub fn serialize<W: Write>(&self, writer: &mut W) -> Result<()> {
        self.write_payload(writer)
    }

    /// Read a container written by [`RunContainer::serialize`].
    pub fn deserialize<R: Read>(reader: &mut R) -> Result<Self> {
        let count = container::read_u16(reader)? as usize;
        let raw = container::read_u16_vec(reader, count * 2)?;
        let runs = raw
            .chunks_exact(2)
            .map(|pair| {
                if pair[0] as u32 + pair[1] as u32 > u16::MAX as u32 {
                    return Err(Error::InvalidEncoding(format!(
                        "run at {} with length {} extends past the chunk",
                        pair[0], pair[1]
                    )));
                }
                Ok(Run::new(pair[0], pair[1]))
            })
            .collect::<Result<Vec<_>>>()?;
        Self::from_runs(runs)
    }

    pub(crate) fn write_payload<W: Write>(&self, writer: &mut W) -> Result<()> {
        let mut buf = Vec::with_capacity(self.serialized_size_in_bytes());
        buf.extend_from_slice(&(self.runs.len() as u16).to_le_bytes());
        for run in &self.runs {
            buf.extend_from_slice(&run.start.to_le_bytes());
            buf.extend_from_slice(&run.length.to_le_bytes());
        }
        writer.write_all(&buf)?;
        Ok(())
    }

    /// Iterate the covered values in increasing order.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            runs: &self.runs,
            front_run: 0,
            front_offset: 0,
            back_run: self.runs.len().saturating_sub(1),
            back_offset: 0,
            remaining: self.len(),
        }
    }
}

impl From<&ArrayContainer> for RunContainer {
    fn from(array: &ArrayContainer) -> Self {
        let mut runs = Vec::with_capacity(array.number_of_runs());
        for v in array.iter() {
            smart_append(&mut runs, Run::new(v, 0));
        }
        Self { runs }
    }
}

impl From<&BitmapContainer> for RunContainer {
    fn from(bitmap: &BitmapContainer) -> Self {
        let mut runs = Vec::with_capacity(bitmap.number_of_runs());
        let mut pos = 0;
        while let Some(start) = bitmap.next_set_bit(pos) {
            let end = bitmap.next_unset_bit(start).unwrap_or(MAX_CARDINALITY);
            runs.push(Run::from_bounds(start as u32, end as u32));
            pos = end;
        }
        Self { runs }
    }
}

/// Double-ended iterator over the values of a [`RunContainer`].
#[derive(Clone, Debug)]
pub struct Iter<'a> {
    runs: &'a [Run],
    front_run: usize,
    front_offset: u32,
    back_run: usize,
    back_offset: u32,
    remaining: usize,
}

impl Iterator for Iter<'_> {
    type Item = u16;

    fn next(&mut self) -> Option<u16> {
        if self.remaining == 0 {
            return None;
        }
        let run = self.runs[self.front_run];
        let value = run.start as u32 + self.front_offset;
        if self.front_offset == run.length as u32 {
            self.front_run += 1;
            self.front_offset = 0;
        } else {
            self.front_offset += 1;
        }
        self.remaining -= 1;
        Some(value as u16)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl DoubleEndedIterator for Iter<'_> {
    fn next_back(&mut self) -> Option<u16> {
        if self.remaining == 0 {
            return None;
        }
        let run = self.runs[self.back_run];
        let value = run.last() as u32 - self.back_offset;
        if self.back_offset == run.length as u32 {
            self.back_run = self.back_run.saturating_sub(1);
            self.back_offset = 0;
        } else {
            self.back_offset += 1;
        }
        self.remaining -= 1;
        Some(value as u16)
    }
}

impl ExactSizeIterator for Iter<'_> {}

#[cfg(test)]
mod tests {
    use super::*;

    fn runs(pairs: &[(u32, u32)]) -> RunContainer {
        RunContainer::from_runs(pairs.iter().map(|&(s, e)| Run::from_bounds(s, e)).collect())
            .unwrap()
    }

    fn values(c: &Container) -> Vec<u16> {
        c.iter().collect()
    }

    #[test]
    fn insert_fuses_neighbours() {
        let mut c = RunContainer::new();
        assert!(c.insert(5));
        assert!(c.insert(7));
        assert_eq!(c.num_runs(), 2);
        assert!(c.insert(6));
        assert_eq!(c.runs(), &[Run::new(5, 2)]);
        assert!(!c.insert(6));
        assert!(c.insert(4));
        assert!(c.insert(65535));
        assert_eq!(c.runs(), &[Run::new(4, 3), Run::new(65535, 0)]);
    }

    #[test]
    fn remove_splits_runs() {
        let mut c = runs(&[(10, 20)]);
        assert!(c.remove(15));
        assert_eq!(c.runs(), &[Run::new(10, 4), Run::new(16, 3)]);
        assert!(c.remove(10));
        assert!(c.remove(19));
        assert!(!c.remove(19));
        assert_eq!(c.runs(), &[Run::new(11, 3), Run::new(16, 2)]);
    }

    #[test]
    fn range_insert_merges_touching_runs() {
        let mut c = runs(&[(0, 5), (10, 15), (30, 40)]);
        c.insert_range(5, 10).unwrap();
        assert_eq!(c.runs(), &[Run::from_bounds(0, 15), Run::from_bounds(30, 40)]);
        c.insert_range(20, 25).unwrap();
        assert_eq!(c.num_runs(), 3);
        c.insert_range(0, 65536).unwrap();
        assert!(c.is_full());
    }

    #[test]
    fn range_updates_reject_bad_ranges() {
        let mut c = RunContainer::new();
        assert!(matches!(
            c.insert_range(0, 70_000),
            Err(Error::InvalidRange { begin: 0, end: 70_000 })
        ));
        assert!(c.is_empty());

        let mut c = RunContainer::from_range(10, 20).unwrap();
        assert!(c.remove_range(18, 12).is_err());
        assert!(c.insert_range(30, 30).is_err());
        assert_eq!(c.len(), 10);
        assert!(RunContainer::from_range(0, 65_537).is_err());
        assert!(RunContainer::from_range(9, 3).is_err());
        assert!(c.not(0, 65_537).is_err());
        assert_eq!(values(&c.not(18, 12).unwrap()), (10..20).collect::<Vec<u16>>());
    }

    #[test]
    fn range_remove_example() {
        let mut c = runs(&[(10, 20), (30, 40)]);
        c.remove_range(15, 35).unwrap();
        let left: Vec<u16> = c.iter().collect();
        let expected: Vec<u16> = (10..15).chain(35..40).collect();
        assert_eq!(left, expected);
        c.remove_range(0, 100).unwrap();
        assert!(c.is_empty());
    }

    #[test]
    fn exclusive_append_cases() {
        let mut buf = vec![Run::default(); 4];
        let mut len = 0;
        append_exclusive(&mut buf, &mut len, Run::from_bounds(0, 10));
        // same start, shorter: keep the tail
        append_exclusive(&mut buf, &mut len, Run::from_bounds(0, 4));
        assert_eq!(&buf[..len], &[Run::from_bounds(4, 10)]);
        // adjacent: merge
        append_exclusive(&mut buf, &mut len, Run::from_bounds(10, 12));
        assert_eq!(&buf[..len], &[Run::from_bounds(4, 12)]);
        // overlap in the middle: trim and append the remainder
        append_exclusive(&mut buf, &mut len, Run::from_bounds(6, 8));
        assert_eq!(&buf[..len], &[Run::from_bounds(4, 6), Run::from_bounds(8, 12)]);
        // identical: wipe out
        append_exclusive(&mut buf, &mut len, Run::from_bounds(8, 12));
        assert_eq!(&buf[..len], &[Run::from_bounds(4, 6)]);
    }

    #[test]
    fn not_matches_xor_with_range() {
        let c = runs(&[(0, 5), (10, 15), (100, 200)]);
        let negated = c.not(3, 120).unwrap();
        let expected = c.xor(&runs(&[(3, 120)]));
        assert_eq!(values(&negated), values(&expected));
        assert_eq!(negated.len(), 3 + 5 + 85 + 80);
    }

    #[test]
    fn inot_in_place_and_fallback_agree() {
        let mut spare = RunContainer::with_capacity(8);
        for &(s, e) in &[(0u32, 5u32), (10, 15), (100, 200)] {
            spare.insert_range(s, e).unwrap();
        }
        let tight = RunContainer::from_runs(spare.runs().to_vec()).unwrap();
        let expected = values(&spare.not(2, 150).unwrap());
        assert_eq!(values(&spare.inot(2, 150).unwrap()), expected);
        assert_eq!(values(&tight.inot(2, 150).unwrap()), expected);
    }

    #[test]
    fn unions_and_differences() {
        let a = runs(&[(0, 10), (20, 30)]);
        let b = runs(&[(5, 25), (40, 50)]);
        assert_eq!(values(&a.or(&b)), (0..30).chain(40..50).collect::<Vec<u16>>());
        assert_eq!(values(&a.and(&b)), (5..10).chain(20..25).collect::<Vec<u16>>());
        assert_eq!(values(&a.and_not(&b)), (0..5).chain(25..30).collect::<Vec<u16>>());
        assert_eq!(
            values(&a.xor(&b)),
            (0..5).chain(10..20).chain(25..30).chain(40..50).collect::<Vec<u16>>()
        );
        assert!(a.intersects(&b));
        assert!(!a.intersects(&runs(&[(10, 20)])));
    }

    #[test]
    fn array_interplay() {
        let r = runs(&[(0, 100)]);
        let a = ArrayContainer::from_sorted(vec![5, 50, 99, 100, 500]).unwrap();
        assert_eq!(r.and_array(&a).as_slice(), &[5, 50, 99]);
        assert_eq!(r.or_array(&a).len(), 102);
        assert_eq!(r.xor_array(&a).len(), 99);
        assert_eq!(r.and_not_array(&a).len(), 97);
    }

    #[test]
    fn efficient_form_is_chosen() {
        let scattered: Vec<Run> = (0..3000u32).map(|i| Run::from_bounds(i * 3, i * 3 + 1)).collect();
        let c = RunContainer::from_runs(scattered).unwrap().into_efficient_container();
        assert_eq!(c.kind(), ContainerKind::Array);

        let dense = runs(&[(0, 60_000)]).into_efficient_container();
        assert_eq!(dense.kind(), ContainerKind::Run);
    }

    #[test]
    fn conversions_from_other_variants() {
        let a = ArrayContainer::from_sorted(vec![1, 2, 3, 7, 65535]).unwrap();
        let r = RunContainer::from(&a);
        assert_eq!(r.runs(), &[Run::new(1, 2), Run::new(7, 0), Run::new(65535, 0)]);
        let b = r.to_bitmap_container();
        assert_eq!(RunContainer::from(&b), r);
    }

    #[test]
    fn rank_select_min_max() {
        let c = runs(&[(10, 20), (30, 40)]);
        assert_eq!(c.rank(9), 0);
        assert_eq!(c.rank(10), 1);
        assert_eq!(c.rank(25), 10);
        assert_eq!(c.rank(35), 16);
        assert_eq!(c.select(10), Some(30));
        assert_eq!(c.select(20), None);
        assert_eq!(c.min(), Some(10));
        assert_eq!(c.max(), Some(39));
    }

    #[test]
    fn iterator_both_ends() {
        let c = runs(&[(0, 2), (65534, 65536)]);
        let forward: Vec<u16> = c.iter().collect();
        let mut backward: Vec<u16> = c.iter().rev().collect();
        backward.reverse();
        assert_eq!(forward, backward);
        assert_eq!(forward, vec![0, 1, 65534, 65535]);
    }

    #[test]
    fn deserialize_rejects_bad_runs() {
        // one run starting at 65535 with length 1
        let overflow = [1u8, 0, 0xff, 0xff, 1, 0];
        assert!(RunContainer::deserialize(&mut &overflow[..]).is_err());
        // two touching runs
        let touching = [2u8, 0, 0, 0, 1, 0, 2, 0, 0, 0];
        assert!(RunContainer::deserialize(&mut &touching[..]).is_err());
    }
}
