//! Numeric utilities shared by the containers.
//!
//! Two families live here:
//! - merge primitives over sorted, deduplicated `u16` slices (the payload of
//!   array containers and the key column of the directory), including the
//!   one-sided galloping intersection used when one side is much smaller;
//! - word-range helpers over packed `u64` bitmaps (set, reset, flip and count
//!   the bits of a half-open range `[start, end)`).
//!
//! Values are `u16`, so every comparison is already unsigned.

use std::cmp::Ordering;

/// Size ratio above which intersection switches from a linear merge to galloping.
pub const GALLOP_RATIO: usize = 64;

/// Find the smallest index `i > pos` such that `array[i] >= min`, or `array.len()`.
///
/// Exponential probing from `pos + 1` bounds the target, then a binary search
/// pins it down. Cost is logarithmic in the distance skipped, not in the
/// length of `array`.
pub fn advance_until(array: &[u16], pos: usize, min: u16) -> usize {
    let len = array.len();
    let mut lower = pos + 1;
    if lower >= len || array[lower] >= min {
        return lower;
    }

    let mut span = 1;
    while lower + span < len && array[lower + span] < min {
        span *= 2;
    }
    let upper = if lower + span < len {
        lower + span
    } else {
        len - 1
    };

    if array[upper] == min {
        return upper;
    }
    if array[upper] < min {
        return len;
    }

    // array[lower] < min < array[upper]
    lower += span / 2;
    let mut upper = upper;
    while lower + 1 != upper {
        let mid = lower + (upper - lower) / 2;
        match array[mid].cmp(&min) {
            Ordering::Equal => return mid,
            Ordering::Less => lower = mid,
            Ordering::Greater => upper = mid,
        }
    }
    upper
}

/// Append `a ∩ b` to `out`, galloping through the larger side when the sizes are skewed.
pub fn intersect(a: &[u16], b: &[u16], out: &mut Vec<u16>) {
    if a.len() * GALLOP_RATIO < b.len() {
        intersect_galloping(a, b, out);
    } else if b.len() * GALLOP_RATIO < a.len() {
        intersect_galloping(b, a, out);
    } else {
        intersect_local(a, b, out);
    }
}

/// Two-pointer intersection.
pub fn intersect_local(a: &[u16], b: &[u16], out: &mut Vec<u16>) {
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            Ordering::Less => i += 1,
            Ordering::Greater => j += 1,
            Ordering::Equal => {
                out.push(a[i]);
                i += 1;
                j += 1;
            }
        }
    }
}

/// One-sided galloping intersection: walk `small`, gallop through `large`.
pub fn intersect_galloping(small: &[u16], large: &[u16], out: &mut Vec<u16>) {
    if small.is_empty() || large.is_empty() {
        return;
    }
    let (mut k1, mut k2) = (0usize, 0usize);
    loop {
        if large[k1] < small[k2] {
            k1 = advance_until(large, k1, small[k2]);
            if k1 == large.len() {
                return;
            }
        }
        if small[k2] < large[k1] {
            k2 += 1;
            if k2 == small.len() {
                return;
            }
        } else {
            out.push(small[k2]);
            k2 += 1;
            if k2 == small.len() {
                return;
            }
            k1 = advance_until(large, k1, small[k2]);
            if k1 == large.len() {
                return;
            }
        }
    }
}

/// Return true if the two sorted slices share at least one value.
pub fn intersects(a: &[u16], b: &[u16]) -> bool {
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            Ordering::Less => i = advance_until(a, i, b[j]),
            Ordering::Greater => j = advance_until(b, j, a[i]),
            Ordering::Equal => return true,
        }
    }
    false
}

/// Append `a ∪ b` to `out`.
pub fn union(a: &[u16], b: &[u16], out: &mut Vec<u16>) {
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            Ordering::Less => {
                out.push(a[i]);
                i += 1;
            }
            Ordering::Greater => {
                out.push(b[j]);
                j += 1;
            }
            Ordering::Equal => {
                out.push(a[i]);
                i += 1;
                j += 1;
            }
        }
    }
    out.extend_from_slice(&a[i..]);
    out.extend_from_slice(&b[j..]);
}

/// Append `a \ b` to `out`.
pub fn difference(a: &[u16], b: &[u16], out: &mut Vec<u16>) {
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            Ordering::Less => {
                out.push(a[i]);
                i += 1;
            }
            Ordering::Greater => j += 1,
            Ordering::Equal => {
                i += 1;
                j += 1;
            }
        }
    }
    out.extend_from_slice(&a[i..]);
}

/// Append `a △ b` to `out`.
pub fn symmetric_difference(a: &[u16], b: &[u16], out: &mut Vec<u16>) {
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            Ordering::Less => {
                out.push(a[i]);
                i += 1;
            }
            Ordering::Greater => {
                out.push(b[j]);
                j += 1;
            }
            Ordering::Equal => {
                i += 1;
                j += 1;
            }
        }
    }
    out.extend_from_slice(&a[i..]);
    out.extend_from_slice(&b[j..]);
}

#[inline]
fn first_word_mask(start: usize) -> u64 {
    !0u64 << (start % 64)
}

#[inline]
fn last_word_mask(end: usize) -> u64 {
    !0u64 >> ((64 - end % 64) % 64)
}

/// Apply `op` to every word overlapping `[start, end)`, passing the mask of in-range bits.
#[inline]
fn for_range_words(words: &mut [u64], start: usize, end: usize, op: impl Fn(&mut u64, u64)) {
    if start >= end {
        return;
    }
    let first = start / 64;
    let last = (end - 1) / 64;
    if first == last {
        op(&mut words[first], first_word_mask(start) & last_word_mask(end));
        return;
    }
    op(&mut words[first], first_word_mask(start));
    for w in &mut words[first + 1..last] {
        op(w, !0u64);
    }
    op(&mut words[last], last_word_mask(end));
}

/// Set all bits in `[start, end)`.
pub fn set_bitmap_range(words: &mut [u64], start: usize, end: usize) {
    for_range_words(words, start, end, |w, mask| *w |= mask);
}

/// Clear all bits in `[start, end)`.
pub fn reset_bitmap_range(words: &mut [u64], start: usize, end: usize) {
    for_range_words(words, start, end, |w, mask| *w &= !mask);
}

/// Flip all bits in `[start, end)`.
pub fn flip_bitmap_range(words: &mut [u64], start: usize, end: usize) {
    for_range_words(words, start, end, |w, mask| *w ^= mask);
}

/// Count the set bits in `[start, end)`.
pub fn cardinality_in_bitmap_range(words: &[u64], start: usize, end: usize) -> usize {
    if start >= end {
        return 0;
    }
    let first = start / 64;
    let last = (end - 1) / 64;
    if first == last {
        let mask = first_word_mask(start) & last_word_mask(end);
        return (words[first] & mask).count_ones() as usize;
    }
    let mut count = (words[first] & first_word_mask(start)).count_ones() as usize;
    for w in &words[first + 1..last] {
        count += w.count_ones() as usize;
    }
    count + (words[last] & last_word_mask(end)).count_ones() as usize
}

/// Position of the `k`-th (0-indexed) set bit of `word`; 64 if there is none.
#[cfg(all(target_arch = "x86_64", target_feature = "bmi2"))]
#[inline]
pub fn select_in_word(word: u64, k: usize) -> usize {
    if k >= 64 {
        return 64;
    }
    // SAFETY: the cfg gate guarantees BMI2 is available.
    let res = unsafe { core::arch::x86_64::_pdep_u64(1u64 << k, word) };
    res.trailing_zeros() as usize
}

/// Position of the `k`-th (0-indexed) set bit of `word`; 64 if there is none.
#[cfg(not(all(target_arch = "x86_64", target_feature = "bmi2")))]
#[inline]
pub fn select_in_word(word: u64, k: usize) -> usize {
    let mut w = word;
    for _ in 0..k {
        w &= w.wrapping_sub(1);
    }
    w.trailing_zeros() as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_until_finds_first_not_less() {
        let data: Vec<u16> = (0..100).map(|i| i * 3).collect();
        assert_eq!(advance_until(&data, 0, 0), 1);
        assert_eq!(advance_until(&data, 0, 4), 2);
        assert_eq!(advance_until(&data, 0, 6), 2);
        assert_eq!(advance_until(&data, 0, 150), 50);
        assert_eq!(advance_until(&data, 10, 151), 51);
        assert_eq!(advance_until(&data, 0, 297), 99);
        assert_eq!(advance_until(&data, 0, 298), 100);
        assert_eq!(advance_until(&data, 99, 0), 100);
    }

    #[test]
    fn advance_until_matches_linear_scan() {
        let data: Vec<u16> = (0..500u32).map(|i| (i * 7 % 65536) as u16).collect();
        for pos in [0usize, 3, 17, 250] {
            for min in (0..3600u16).step_by(11) {
                let expected = (pos + 1..data.len())
                    .find(|&i| data[i] >= min)
                    .unwrap_or(data.len());
                assert_eq!(advance_until(&data, pos, min), expected, "pos={pos} min={min}");
            }
        }
    }

    #[test]
    fn galloping_and_local_intersections_agree() {
        let small = vec![5u16, 700, 1400, 65535];
        let large: Vec<u16> = (0..=65535u16).step_by(5).collect();
        let mut a = Vec::new();
        let mut b = Vec::new();
        intersect_galloping(&small, &large, &mut a);
        intersect_local(&small, &large, &mut b);
        assert_eq!(a, b);
        assert_eq!(a, vec![5, 700, 1400, 65535]);

        let mut c = Vec::new();
        intersect(&large, &small, &mut c);
        assert_eq!(c, a);
    }

    #[test]
    fn merge_primitives() {
        let a = [1u16, 3, 5, 7];
        let b = [3u16, 4, 5, 65535];

        let mut out = Vec::new();
        union(&a, &b, &mut out);
        assert_eq!(out, vec![1, 3, 4, 5, 7, 65535]);

        out.clear();
        difference(&a, &b, &mut out);
        assert_eq!(out, vec![1, 7]);

        out.clear();
        symmetric_difference(&a, &b, &mut out);
        assert_eq!(out, vec![1, 4, 7, 65535]);

        assert!(intersects(&a, &b));
        assert!(!intersects(&[1, 2], &[3, 4]));
    }

    #[test]
    fn bitmap_range_helpers() {
        let mut words = vec![0u64; 4];
        set_bitmap_range(&mut words, 3, 130);
        assert_eq!(cardinality_in_bitmap_range(&words, 0, 256), 127);
        assert_eq!(cardinality_in_bitmap_range(&words, 64, 128), 64);
        assert_eq!(words[0], !0u64 << 3);
        assert_eq!(words[2], 0b11);

        reset_bitmap_range(&mut words, 60, 70);
        assert_eq!(cardinality_in_bitmap_range(&words, 0, 256), 117);

        flip_bitmap_range(&mut words, 0, 256);
        assert_eq!(cardinality_in_bitmap_range(&words, 0, 256), 256 - 117);

        // Empty ranges are no-ops.
        set_bitmap_range(&mut words, 10, 10);
        assert_eq!(cardinality_in_bitmap_range(&words, 10, 10), 0);
    }

    #[test]
    fn select_in_word_basic() {
        let w = 0b1011u64;
        assert_eq!(select_in_word(w, 0), 0);
        assert_eq!(select_in_word(w, 1), 1);
        assert_eq!(select_in_word(w, 2), 3);
        assert_eq!(select_in_word(1u64 << 63, 0), 63);
    }
}
