//! Dense container: a fixed 65536-bit bitmap with a cached cardinality.
//!
//! Chosen once a chunk holds more than [`ARRAY_MAX_SIZE`] values. The bitmap
//! costs 8 KiB no matter what it holds, so operations whose result falls back
//! to or below the threshold return an [`ArrayContainer`] instead.
//!
//! Single-bit updates keep the cardinality exact without a recount: the
//! change is `(old ^ new) >> bit`, which is 1 exactly when the bit moved.
//! Word-parallel operations recount with popcount.

use std::fmt;
use std::io::{Read, Write};

use crate::array::ArrayContainer;
use crate::container::{self, Container, ARRAY_MAX_SIZE, BITMAP_WORDS, MAX_CARDINALITY};
use crate::error::{check_complement_range, check_range, Result};
use crate::run::{Run, RunContainer};
use crate::util;

/// 65536-bit bitmap stored as 1024 little-endian `u64` words.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct BitmapContainer {
    words: Box<[u64; BITMAP_WORDS]>,
    cardinality: usize,
}

impl fmt::Debug for BitmapContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BitmapContainer")
            .field("cardinality", &self.cardinality)
            .field("runs", &self.number_of_runs())
            .finish()
    }
}

impl Default for BitmapContainer {
    fn default() -> Self {
        Self::new()
    }
}

/// Push the positions of the set bits of `word` (offset by `base`) onto `out`.
#[inline]
fn push_set_bits(out: &mut Vec<u16>, base: usize, mut word: u64) {
    while word != 0 {
        out.push((base + word.trailing_zeros() as usize) as u16);
        word &= word - 1;
    }
}

impl BitmapContainer {
    /// Create an empty bitmap.
    pub fn new() -> Self {
        Self {
            words: Box::new([0u64; BITMAP_WORDS]),
            cardinality: 0,
        }
    }

    /// Create a bitmap with every bit of `[start, end)` set.
    pub fn from_range(start: u32, end: u32) -> Result<Self> {
        let mut bitmap = Self::new();
        bitmap.insert_range(start, end)?;
        Ok(bitmap)
    }

    /// Wrap raw words, recounting the cardinality.
    pub fn from_words(words: Box<[u64; BITMAP_WORDS]>) -> Self {
        let mut bitmap = Self {
            words,
            cardinality: 0,
        };
        bitmap.compute_cardinality();
        bitmap
    }

    /// The underlying words.
    pub fn words(&self) -> &[u64; BITMAP_WORDS] {
        &self.words
    }

    /// Number of set bits.
    pub fn len(&self) -> usize {
        self.cardinality
    }

    /// Return true if no bit is set.
    pub fn is_empty(&self) -> bool {
        self.cardinality == 0
    }

    /// Return true if all 65536 bits are set.
    pub fn is_full(&self) -> bool {
        self.cardinality == MAX_CARDINALITY
    }

    /// Recount the cardinality from the words.
    pub fn compute_cardinality(&mut self) {
        self.cardinality = self.words.iter().map(|w| w.count_ones() as usize).sum();
    }

    /// Return true if bit `x` is set.
    #[inline]
    pub fn contains(&self, x: u16) -> bool {
        let x = x as usize;
        (self.words[x / 64] >> (x % 64)) & 1 == 1
    }

    /// Set bit `x`; returns true if it was clear.
    #[inline]
    pub fn insert(&mut self, x: u16) -> bool {
        let x = x as usize;
        let old = self.words[x / 64];
        let new = old | (1u64 << (x % 64));
        self.words[x / 64] = new;
        let changed = ((old ^ new) >> (x % 64)) as usize;
        self.cardinality += changed;
        changed == 1
    }

    /// Clear bit `x`; returns true if it was set.
    #[inline]
    pub fn remove(&mut self, x: u16) -> bool {
        let x = x as usize;
        let old = self.words[x / 64];
        let new = old & !(1u64 << (x % 64));
        self.words[x / 64] = new;
        let changed = ((old ^ new) >> (x % 64)) as usize;
        self.cardinality -= changed;
        changed == 1
    }

    /// Toggle bit `x`.
    #[inline]
    pub fn flip(&mut self, x: u16) {
        let x = x as usize;
        let bit = 1u64 << (x % 64);
        if self.words[x / 64] & bit == 0 {
            self.cardinality += 1;
        } else {
            self.cardinality -= 1;
        }
        self.words[x / 64] ^= bit;
    }

    /// Set every bit of `[start, end)`.
    pub fn insert_range(&mut self, start: u32, end: u32) -> Result<()> {
        check_range(start as u64, end as u64, MAX_CARDINALITY as u64)?;
        self.set_range(start, end);
        Ok(())
    }

    /// Clear every bit of `[start, end)`.
    pub fn remove_range(&mut self, start: u32, end: u32) -> Result<()> {
        check_range(start as u64, end as u64, MAX_CARDINALITY as u64)?;
        self.clear_range(start, end);
        Ok(())
    }

    /// Toggle every bit of `[start, end)`.
    pub fn flip_range(&mut self, start: u32, end: u32) -> Result<()> {
        check_range(start as u64, end as u64, MAX_CARDINALITY as u64)?;
        self.toggle_range(start, end);
        Ok(())
    }

    /// [`BitmapContainer::insert_range`] for a range already known to fit.
    pub(crate) fn set_range(&mut self, start: u32, end: u32) {
        let (start, end) = (start as usize, end as usize);
        let before = util::cardinality_in_bitmap_range(&self.words[..], start, end);
        util::set_bitmap_range(&mut self.words[..], start, end);
        self.cardinality += (end.saturating_sub(start)) - before;
    }

    pub(crate) fn clear_range(&mut self, start: u32, end: u32) {
        let (start, end) = (start as usize, end as usize);
        let before = util::cardinality_in_bitmap_range(&self.words[..], start, end);
        util::reset_bitmap_range(&mut self.words[..], start, end);
        self.cardinality -= before;
    }

    pub(crate) fn toggle_range(&mut self, start: u32, end: u32) {
        let (start, end) = (start as usize, end as usize);
        let before = util::cardinality_in_bitmap_range(&self.words[..], start, end);
        util::flip_bitmap_range(&mut self.words[..], start, end);
        self.cardinality = self.cardinality - before + (end.saturating_sub(start) - before);
    }

    /// Pick the cheapest representation for the current contents.
    ///
    /// At or below the array threshold this becomes an array; a full bitmap
    /// becomes a single-run container.
    pub fn into_container(self) -> Container {
        if self.cardinality <= ARRAY_MAX_SIZE {
            Container::Array(self.to_array_container())
        } else if self.is_full() {
            Container::Run(RunContainer::full())
        } else {
            Container::Bitmap(self)
        }
    }

    /// Convert to a sorted array with the same membership.
    ///
    /// Only called on bitmaps at or below the array threshold.
    pub(crate) fn to_array_container(&self) -> ArrayContainer {
        let mut out = Vec::with_capacity(self.cardinality);
        for (k, &w) in self.words.iter().enumerate() {
            push_set_bits(&mut out, k * 64, w);
        }
        ArrayContainer::from_sorted_unchecked(out)
    }

    /// Smallest set bit at or after `i`.
    pub fn next_set_bit(&self, i: usize) -> Option<usize> {
        if i >= MAX_CARDINALITY {
            return None;
        }
        let mut x = i / 64;
        let mut w = self.words[x] & (!0u64 << (i % 64));
        loop {
            if w != 0 {
                return Some(x * 64 + w.trailing_zeros() as usize);
            }
            x += 1;
            if x == BITMAP_WORDS {
                return None;
            }
            w = self.words[x];
        }
    }

    /// Smallest clear bit at or after `i`.
    pub fn next_unset_bit(&self, i: usize) -> Option<usize> {
        if i >= MAX_CARDINALITY {
            return None;
        }
        let mut x = i / 64;
        let mut w = !self.words[x] & (!0u64 << (i % 64));
        loop {
            if w != 0 {
                return Some(x * 64 + w.trailing_zeros() as usize);
            }
            x += 1;
            if x == BITMAP_WORDS {
                return None;
            }
            w = !self.words[x];
        }
    }

    /// Largest set bit at or before `i`.
    pub fn prev_set_bit(&self, i: usize) -> Option<usize> {
        let i = i.min(MAX_CARDINALITY - 1);
        let mut x = i / 64;
        let mut w = self.words[x] & (!0u64 >> (63 - i % 64));
        loop {
            if w != 0 {
                return Some(x * 64 + 63 - w.leading_zeros() as usize);
            }
            if x == 0 {
                return None;
            }
            x -= 1;
            w = self.words[x];
        }
    }

    /// Number of maximal runs of consecutive set bits.
    ///
    /// A run starts wherever a set bit follows a clear one, which is the
    /// popcount of `!w & (w << 1)` plus a carry term across word boundaries.
    pub fn number_of_runs(&self) -> usize {
        let mut runs = 0usize;
        let mut next = self.words[0];
        for i in 0..BITMAP_WORDS - 1 {
            let word = next;
            next = self.words[i + 1];
            runs += ((!word) & (word << 1)).count_ones() as usize
                + (((word >> 63) & !next) as usize);
        }
        let word = next;
        runs += ((!word) & (word << 1)).count_ones() as usize;
        if word & (1u64 << 63) != 0 {
            runs += 1;
        }
        runs
    }

    /// Number of set bits `<= x`.
    pub fn rank(&self, x: u16) -> usize {
        let x = x as usize;
        let k = x / 64;
        let below: usize = self.words[..k].iter().map(|w| w.count_ones() as usize).sum();
        below + (self.words[k] & (!0u64 >> (63 - x % 64))).count_ones() as usize
    }

    /// Position of the `j`-th (0-indexed) set bit.
    pub fn select(&self, j: usize) -> Option<u16> {
        if j >= self.cardinality {
            return None;
        }
        let mut left = j;
        for (k, &w) in self.words.iter().enumerate() {
            let count = w.count_ones() as usize;
            if left < count {
                return Some((k * 64 + util::select_in_word(w, left)) as u16);
            }
            left -= count;
        }
        None
    }

    /// Smallest set bit.
    pub fn min(&self) -> Option<u16> {
        self.next_set_bit(0).map(|v| v as u16)
    }

    /// Largest set bit.
    pub fn max(&self) -> Option<u16> {
        if self.is_empty() {
            return None;
        }
        self.prev_set_bit(MAX_CARDINALITY - 1).map(|v| v as u16)
    }

    /// Combine word by word, choosing the output variant from the exact result cardinality.
    fn combine(&self, other: &Self, op: impl Fn(u64, u64) -> u64) -> Container {
        let cardinality: usize = self
            .words
            .iter()
            .zip(other.words.iter())
            .map(|(&a, &b)| op(a, b).count_ones() as usize)
            .sum();
        if cardinality > ARRAY_MAX_SIZE {
            let mut words = Box::new([0u64; BITMAP_WORDS]);
            for (k, w) in words.iter_mut().enumerate() {
                *w = op(self.words[k], other.words[k]);
            }
            return Self { words, cardinality }.into_container();
        }
        let mut out = Vec::with_capacity(cardinality);
        for k in 0..BITMAP_WORDS {
            push_set_bits(&mut out, k * 64, op(self.words[k], other.words[k]));
        }
        Container::Array(ArrayContainer::from_sorted_unchecked(out))
    }

    /// Apply `op` word by word into `self`, then recount.
    fn combine_in_place(mut self, other: &Self, op: impl Fn(u64, u64) -> u64) -> Container {
        for (a, &b) in self.words.iter_mut().zip(other.words.iter()) {
            *a = op(*a, b);
        }
        self.compute_cardinality();
        self.into_container()
    }

    /// Intersection with another bitmap.
    pub fn and(&self, other: &Self) -> Container {
        self.combine(other, |a, b| a & b)
    }

    /// Union with another bitmap.
    pub fn or(&self, other: &Self) -> Container {
        self.combine(other, |a, b| a | b)
    }

    /// Symmetric difference with another bitmap.
    pub fn xor(&self, other: &Self) -> Container {
        self.combine(other, |a, b| a ^ b)
    }

    /// Difference `self \ other`.
    pub fn and_not(&self, other: &Self) -> Container {
        self.combine(other, |a, b| a & !b)
    }

    /// In-place intersection.
    pub fn iand(self, other: &Self) -> Container {
        self.combine_in_place(other, |a, b| a & b)
    }

    /// In-place union.
    pub fn ior(self, other: &Self) -> Container {
        self.combine_in_place(other, |a, b| a | b)
    }

    /// In-place symmetric difference.
    pub fn ixor(self, other: &Self) -> Container {
        self.combine_in_place(other, |a, b| a ^ b)
    }

    /// In-place difference.
    pub fn iand_not(self, other: &Self) -> Container {
        self.combine_in_place(other, |a, b| a & !b)
    }

    /// The values of `other` that are also set here.
    pub fn and_array(&self, other: &ArrayContainer) -> ArrayContainer {
        ArrayContainer::from_sorted_unchecked(
            other.iter().filter(|&v| self.contains(v)).collect(),
        )
    }

    /// Union with an array.
    pub fn or_array(&self, other: &ArrayContainer) -> Container {
        self.clone().ior_array(other)
    }

    /// Symmetric difference with an array.
    pub fn xor_array(&self, other: &ArrayContainer) -> Container {
        self.clone().ixor_array(other)
    }

    /// Difference `self \ other` against an array.
    pub fn and_not_array(&self, other: &ArrayContainer) -> Container {
        self.clone().iand_not_array(other)
    }

    /// In-place union with an array.
    pub fn ior_array(mut self, other: &ArrayContainer) -> Container {
        for v in other.iter() {
            self.insert(v);
        }
        self.into_container()
    }

    /// In-place symmetric difference with an array.
    pub fn ixor_array(mut self, other: &ArrayContainer) -> Container {
        for v in other.iter() {
            self.flip(v);
        }
        self.into_container()
    }

    /// In-place difference against an array.
    pub fn iand_not_array(mut self, other: &ArrayContainer) -> Container {
        for v in other.iter() {
            self.remove(v);
        }
        self.into_container()
    }

    /// Intersection with a run container.
    pub fn and_run(&self, other: &RunContainer) -> Container {
        if other.len() <= ARRAY_MAX_SIZE {
            let mut out = Vec::with_capacity(other.len());
            for v in other.iter() {
                if self.contains(v) {
                    out.push(v);
                }
            }
            return Container::Array(ArrayContainer::from_sorted_unchecked(out));
        }
        self.clone().iand_run(other)
    }

    /// Union with a run container.
    pub fn or_run(&self, other: &RunContainer) -> Container {
        self.clone().ior_run(other)
    }

    /// Symmetric difference with a run container.
    pub fn xor_run(&self, other: &RunContainer) -> Container {
        self.clone().ixor_run(other)
    }

    /// Difference `self \ other` against a run container.
    pub fn and_not_run(&self, other: &RunContainer) -> Container {
        self.clone().iand_not_run(other)
    }

    /// In-place intersection with a run container: clear every gap between runs.
    pub fn iand_run(mut self, other: &RunContainer) -> Container {
        let mut start = 0usize;
        for run in other.runs() {
            util::reset_bitmap_range(&mut self.words[..], start, run.start as usize);
            start = run.end() as usize;
        }
        util::reset_bitmap_range(&mut self.words[..], start, MAX_CARDINALITY);
        self.compute_cardinality();
        self.into_container()
    }

    /// In-place union with a run container.
    pub fn ior_run(mut self, other: &RunContainer) -> Container {
        self.apply_runs(other.runs(), util::set_bitmap_range);
        self.into_container()
    }

    /// In-place symmetric difference with a run container.
    pub fn ixor_run(mut self, other: &RunContainer) -> Container {
        self.apply_runs(other.runs(), util::flip_bitmap_range);
        self.into_container()
    }

    /// In-place difference against a run container.
    pub fn iand_not_run(mut self, other: &RunContainer) -> Container {
        self.apply_runs(other.runs(), util::reset_bitmap_range);
        self.into_container()
    }

    fn apply_runs(&mut self, runs: &[Run], op: fn(&mut [u64], usize, usize)) {
        for run in runs {
            op(&mut self.words[..], run.start as usize, run.end() as usize);
        }
        self.compute_cardinality();
    }

    /// Return true if the two bitmaps share a set bit.
    pub fn intersects(&self, other: &Self) -> bool {
        self.words
            .iter()
            .zip(other.words.iter())
            .any(|(&a, &b)| a & b != 0)
    }

    /// Complement restricted to `[start, end)`.
    ///
    /// An empty or reversed range leaves the values unchanged; `end` past
    /// 65536 is an error.
    pub fn not(&self, start: u32, end: u32) -> Result<Container> {
        self.clone().inot(start, end)
    }

    /// In-place complement restricted to `[start, end)`.
    pub fn inot(mut self, start: u32, end: u32) -> Result<Container> {
        if !check_complement_range(start as u64, end as u64, MAX_CARDINALITY as u64)? {
            return Ok(Container::Bitmap(self));
        }
        self.toggle_range(start, end);
        Ok(self.into_container())
    }

    /// Serialized size: always 8192 bytes.
    pub fn serialized_size_in_bytes(&self) -> usize {
        container::BITMAP_SERIALIZED_SIZE
    }

    /// Approximate heap memory usage in bytes.
    pub fn heap_bytes(&self) -> usize {
        container::BITMAP_SERIALIZED_SIZE
    }

    /// Write the 1024 words in little-endian order.
    pub fn serialize<W: Write>(&self, writer: &mut W) -> Result<()> {
        self.write_payload(writer)
    }

    /// Read 1024 little-endian words and recount the cardinality.
    pub fn deserialize<R: Read>(reader: &mut R) -> Result<Self> {
        let mut words = Box::new([0u64; BITMAP_WORDS]);
        for w in words.iter_mut() {
            *w = container::read_u64(reader)?;
        }
        Ok(Self::from_words(words))
    }

    pub(crate) fn write_payload<W: Write>(&self, writer: &mut W) -> Result<()> {
        let mut buf = Vec::with_capacity(container::BITMAP_SERIALIZED_SIZE);
        for w in self.words.iter() {
            buf.extend_from_slice(&w.to_le_bytes());
        }
        writer.write_all(&buf)?;
        Ok(())
    }

    /// Iterate the set bits in increasing order.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            words: &self.words[..],
            front_index: 0,
            front_word: self.words[0],
            back_index: BITMAP_WORDS - 1,
            back_word: self.words[BITMAP_WORDS - 1],
            remaining: self.cardinality,
        }
    }
}

/// Double-ended iterator over the set bits of a [`BitmapContainer`].
///
/// Front and back each consume a private copy of their current word; the
/// shared `remaining` count stops them before they cross.
#[derive(Clone, Debug)]
pub struct Iter<'a> {
    words: &'a [u64],
    front_index: usize,
    front_word: u64,
    back_index: usize,
    back_word: u64,
    remaining: usize,
}

impl Iterator for Iter<'_> {
    type Item = u16;

    fn next(&mut self) -> Option<u16> {
        if self.remaining == 0 {
            return None;
        }
        while self.front_word == 0 {
            self.front_index += 1;
            self.front_word = self.words[self.front_index];
        }
        let bit = self.front_word.trailing_zeros() as usize;
        self.front_word &= self.front_word - 1;
        self.remaining -= 1;
        Some((self.front_index * 64 + bit) as u16)
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
        while self.back_word == 0 {
            self.back_index -= 1;
            self.back_word = self.words[self.back_index];
        }
        let bit = 63 - self.back_word.leading_zeros() as usize;
        self.back_word &= !(1u64 << bit);
        self.remaining -= 1;
        Some((self.back_index * 64 + bit) as u16)
    }
}

impl ExactSizeIterator for Iter<'_> {}
