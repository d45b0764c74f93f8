//! The three container representations behind one closed type.
//!
//! Every chunk of 65536 values is held by exactly one [`Container`]. Binary
//! operations match on both operands' variants (nine pairs per operation)
//! and each pair calls the specialised routine in `array`, `bitset` or `run`.
//! Operations that may change the representation consume `self` and return
//! a new `Container`, so callers store whatever comes back and never assume
//! the variant survived.
//!
//! # Conversion policy
//!
//! | from | to | when |
//! |---|---|---|
//! | Array | Bitmap | cardinality would exceed [`ARRAY_MAX_SIZE`] |
//! | Bitmap | Array | cardinality at or below [`ARRAY_MAX_SIZE`] |
//! | Bitmap | Run | all 65536 bits set |
//! | Run | Array / Bitmap | run encoding is larger than the smaller alternative |
//! | any | Run | [`Container::run_optimize`] finds the run encoding smallest |

use std::io::{Read, Write};

use tracing::trace;

use crate::array::ArrayContainer;
use crate::bitset::{self, BitmapContainer};
use crate::error::{Error, Result};
use crate::run::{self, RunContainer};

/// Largest cardinality stored as an array.
pub const ARRAY_MAX_SIZE: usize = 4096;

/// Number of 64-bit words in a bitmap container.
pub const BITMAP_WORDS: usize = 1024;

/// Number of distinct values a container can hold.
pub const MAX_CARDINALITY: usize = 1 << 16;

/// Serialized size of a bitmap container in bytes.
pub const BITMAP_SERIALIZED_SIZE: usize = BITMAP_WORDS * 8;

/// A run container with more runs than this can never be the smallest encoding.
const MAX_USEFUL_RUNS: usize = (BITMAP_SERIALIZED_SIZE - 2) / 4;

/// Serialized size of an array container holding `cardinality` values.
#[inline]
pub fn array_serialized_size(cardinality: usize) -> usize {
    2 + 2 * cardinality
}

/// Serialized size of a run container holding `num_runs` runs.
#[inline]
pub fn run_serialized_size(num_runs: usize) -> usize {
    2 + 4 * num_runs
}

pub(crate) fn read_u16<R: Read>(reader: &mut R) -> Result<u16> {
    let mut buf = [0u8; 2];
    reader.read_exact(&mut buf).map_err(Error::from_read)?;
    Ok(u16::from_le_bytes(buf))
}

pub(crate) fn read_u32<R: Read>(reader: &mut R) -> Result<u32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf).map_err(Error::from_read)?;
    Ok(u32::from_le_bytes(buf))
}

pub(crate) fn read_u64<R: Read>(reader: &mut R) -> Result<u64> {
    let mut buf = [0u8; 8];
    reader.read_exact(&mut buf).map_err(Error::from_read)?;
    Ok(u64::from_le_bytes(buf))
}

pub(crate) fn read_u16_vec<R: Read>(reader: &mut R, count: usize) -> Result<Vec<u16>> {
    let mut bytes = vec![0u8; count * 2];
    reader.read_exact(&mut bytes).map_err(Error::from_read)?;
    Ok(bytes
        .chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .collect())
}

/// Which representation a container uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ContainerKind {
    /// Sorted array of values.
    Array,
    /// 65536-bit bitmap.
    Bitmap,
    /// Run-length encoded ranges.
    Run,
}

/// The set of low 16-bit values sharing one directory key.
#[derive(Clone, Debug)]
pub enum Container {
    /// Sparse representation.
    Array(ArrayContainer),
    /// Dense representation.
    Bitmap(BitmapContainer),
    /// Clustered representation.
    Run(RunContainer),
}

impl Default for Container {
    fn default() -> Self {
        Container::Array(ArrayContainer::new())
    }
}

/// Membership equality: containers holding the same values are equal whatever their variant.
impl PartialEq for Container {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Container::Array(a), Container::Array(b)) => a == b,
            (Container::Bitmap(a), Container::Bitmap(b)) => a == b,
            (Container::Run(a), Container::Run(b)) => a == b,
            _ => self.len() == other.len() && self.iter().eq(other.iter()),
        }
    }
}

impl Eq for Container {}

impl Container {
    /// An empty container.
    pub fn new() -> Self {
        Self::default()
    }

    /// A container holding all 65536 values.
    pub fn full() -> Self {
        Container::Run(RunContainer::full())
    }

    /// A container holding every value of `[begin, end)`, in its cheapest form.
    pub fn from_range(begin: u32, end: u32) -> Result<Self> {
        Ok(RunContainer::from_range(begin, end)?.into_efficient_container())
    }

    /// The representation currently in use.
    pub fn kind(&self) -> ContainerKind {
        match self {
            Container::Array(_) => ContainerKind::Array,
            Container::Bitmap(_) => ContainerKind::Bitmap,
            Container::Run(_) => ContainerKind::Run,
        }
    }

    /// Number of values held.
    pub fn len(&self) -> usize {
        match self {
            Container::Array(a) => a.len(),
            Container::Bitmap(b) => b.len(),
            Container::Run(r) => r.len(),
        }
    }

    /// Return true if no value is held.
    pub fn is_empty(&self) -> bool {
        match self {
            Container::Array(a) => a.is_empty(),
            Container::Bitmap(b) => b.is_empty(),
            Container::Run(r) => r.is_empty(),
        }
    }

    /// Return true if all 65536 values are held.
    pub fn is_full(&self) -> bool {
        match self {
            Container::Array(_) => false,
            Container::Bitmap(b) => b.is_full(),
            Container::Run(r) => r.is_full(),
        }
    }

    /// Return true if `x` is held.
    pub fn contains(&self, x: u16) -> bool {
        match self {
            Container::Array(a) => a.contains(x),
            Container::Bitmap(b) => b.contains(x),
            Container::Run(r) => r.contains(x),
        }
    }

    /// Smallest value.
    pub fn min(&self) -> Option<u16> {
        match self {
            Container::Array(a) => a.min(),
            Container::Bitmap(b) => b.min(),
            Container::Run(r) => r.min(),
        }
    }

    /// Largest value.
    pub fn max(&self) -> Option<u16> {
        match self {
            Container::Array(a) => a.max(),
            Container::Bitmap(b) => b.max(),
            Container::Run(r) => r.max(),
        }
    }

    /// Number of values `<= x`.
    pub fn rank(&self, x: u16) -> usize {
        match self {
            Container::Array(a) => a.rank(x),
            Container::Bitmap(b) => b.rank(x),
            Container::Run(r) => r.rank(x),
        }
    }

    /// The `j`-th smallest value (0-indexed).
    pub fn select(&self, j: usize) -> Option<u16> {
        match self {
            Container::Array(a) => a.select(j),
            Container::Bitmap(b) => b.select(j),
            Container::Run(r) => r.select(j),
        }
    }

    /// Add `x`.
    pub fn add(self, x: u16) -> Container {
        match self {
            Container::Array(a) => a.add(x),
            Container::Bitmap(mut b) => {
                b.insert(x);
                Container::Bitmap(b)
            }
            Container::Run(mut r) => {
                r.insert(x);
                Self::check_run_count(r)
            }
        }
    }

    /// Remove `x`.
    pub fn remove(self, x: u16) -> Container {
        match self {
            Container::Array(mut a) => {
                a.remove(x);
                Container::Array(a)
            }
            Container::Bitmap(mut b) => {
                if b.remove(x) && b.len() <= ARRAY_MAX_SIZE {
                    trace!(from = ?ContainerKind::Bitmap, to = ?ContainerKind::Array, cardinality = b.len(), "bitmap shrank to threshold");
                    return Container::Array(b.to_array_container());
                }
                Container::Bitmap(b)
            }
            Container::Run(mut r) => {
                r.remove(x);
                Self::check_run_count(r)
            }
        }
    }

    /// Add `x` if absent, remove it if present.
    pub fn flip(self, x: u16) -> Container {
        if self.contains(x) {
            self.remove(x)
        } else {
            self.add(x)
        }
    }

    /// Point updates can split runs; give up the run form once it cannot win.
    fn check_run_count(r: RunContainer) -> Container {
        if r.num_runs() > MAX_USEFUL_RUNS {
            r.into_efficient_container()
        } else {
            Container::Run(r)
        }
    }

    /// Add every value of `[begin, end)`.
    pub fn add_range(self, begin: u32, end: u32) -> Result<Container> {
        Ok(match self {
            Container::Array(a) => a.add_range(begin, end)?,
            Container::Bitmap(mut b) => {
                b.insert_range(begin, end)?;
                b.into_container()
            }
            Container::Run(mut r) => {
                r.insert_range(begin, end)?;
                r.into_efficient_container()
            }
        })
    }

    /// Remove every value of `[begin, end)`.
    pub fn remove_range(self, begin: u32, end: u32) -> Result<Container> {
        Ok(match self {
            Container::Array(mut a) => {
                a.remove_range(begin, end)?;
                Container::Array(a)
            }
            Container::Bitmap(mut b) => {
                b.remove_range(begin, end)?;
                b.into_container()
            }
            Container::Run(mut r) => {
                r.remove_range(begin, end)?;
                r.into_efficient_container()
            }
        })
    }

    /// Complement restricted to `[begin, end)`.
    ///
    /// An empty range (`begin >= end`) leaves the container unchanged; an
    /// `end` past 65536 is an error.
    pub fn not(&self, begin: u32, end: u32) -> Result<Container> {
        match self {
            Container::Array(a) => a.not(begin, end),
            Container::Bitmap(b) => b.not(begin, end),
            Container::Run(r) => r.not(begin, end),
        }
    }

    /// In-place complement restricted to `[begin, end)`.
    pub fn inot(self, begin: u32, end: u32) -> Result<Container> {
        match self {
            Container::Array(a) => a.not(begin, end),
            Container::Bitmap(b) => b.inot(begin, end),
            Container::Run(r) => r.inot(begin, end),
        }
    }

    /// Intersection.
    pub fn and(&self, other: &Container) -> Container {
        match (self, other) {
            (Container::Array(a), Container::Array(b)) => Container::Array(a.and(b)),
            (Container::Array(a), Container::Bitmap(b))
            | (Container::Bitmap(b), Container::Array(a)) => Container::Array(b.and_array(a)),
            (Container::Array(a), Container::Run(r)) | (Container::Run(r), Container::Array(a)) => {
                Container::Array(r.and_array(a))
            }
            (Container::Bitmap(a), Container::Bitmap(b)) => a.and(b),
            (Container::Bitmap(b), Container::Run(r)) | (Container::Run(r), Container::Bitmap(b)) => {
                b.and_run(r)
            }
            (Container::Run(a), Container::Run(b)) => a.and(b),
        }
    }

    /// Union.
    pub fn or(&self, other: &Container) -> Container {
        match (self, other) {
            (Container::Array(a), Container::Array(b)) => a.or(b),
            (Container::Array(a), Container::Bitmap(b))
            | (Container::Bitmap(b), Container::Array(a)) => b.or_array(a),
            (Container::Array(a), Container::Run(r)) | (Container::Run(r), Container::Array(a)) => {
                r.or_array(a)
            }
            (Container::Bitmap(a), Container::Bitmap(b)) => a.or(b),
            (Container::Bitmap(b), Container::Run(r)) | (Container::Run(r), Container::Bitmap(b)) => {
                r.or_bitmap(b)
            }
            (Container::Run(a), Container::Run(b)) => a.or(b),
        }
    }

    /// Symmetric difference.
    pub fn xor(&self, other: &Container) -> Container {
        match (self, other) {
            (Container::Array(a), Container::Array(b)) => a.xor(b),
            (Container::Array(a), Container::Bitmap(b))
            | (Container::Bitmap(b), Container::Array(a)) => b.xor_array(a),
            (Container::Array(a), Container::Run(r)) | (Container::Run(r), Container::Array(a)) => {
                r.xor_array(a)
            }
            (Container::Bitmap(a), Container::Bitmap(b)) => a.xor(b),
            (Container::Bitmap(b), Container::Run(r)) | (Container::Run(r), Container::Bitmap(b)) => {
                r.xor_bitmap(b)
            }
            (Container::Run(a), Container::Run(b)) => a.xor(b),
        }
    }

    /// Difference `self \ other`.
    pub fn and_not(&self, other: &Container) -> Container {
        match (self, other) {
            (Container::Array(a), Container::Array(b)) => Container::Array(a.and_not(b)),
            (Container::Array(a), Container::Bitmap(b)) => Container::Array(a.and_not_bitmap(b)),
            (Container::Array(a), Container::Run(r)) => Container::Array(a.and_not_run(r)),
            (Container::Bitmap(a), Container::Array(b)) => a.and_not_array(b),
            (Container::Bitmap(a), Container::Bitmap(b)) => a.and_not(b),
            (Container::Bitmap(a), Container::Run(r)) => a.and_not_run(r),
            (Container::Run(r), Container::Array(a)) => r.and_not_array(a),
            (Container::Run(r), Container::Bitmap(b)) => r.and_not_bitmap(b),
            (Container::Run(a), Container::Run(b)) => a.and_not(b),
        }
    }

    /// Intersection, reusing `self`'s storage where the variant allows.
    pub fn iand(self, other: &Container) -> Container {
        match (self, other) {
            (Container::Bitmap(a), Container::Bitmap(b)) => a.iand(b),
            (Container::Bitmap(a), Container::Run(r)) if r.len() > ARRAY_MAX_SIZE => a.iand_run(r),
            (this, other) => this.and(other),
        }
    }

    /// Union, reusing `self`'s storage where the variant allows.
    pub fn ior(self, other: &Container) -> Container {
        match (self, other) {
            (Container::Bitmap(a), Container::Bitmap(b)) => a.ior(b),
            (Container::Bitmap(a), Container::Array(b)) => a.ior_array(b),
            (Container::Bitmap(a), Container::Run(r)) => a.ior_run(r),
            (this, other) => this.or(other),
        }
    }

    /// Symmetric difference, reusing `self`'s storage where the variant allows.
    pub fn ixor(self, other: &Container) -> Container {
        match (self, other) {
            (Container::Bitmap(a), Container::Bitmap(b)) => a.ixor(b),
            (Container::Bitmap(a), Container::Array(b)) => a.ixor_array(b),
            (Container::Bitmap(a), Container::Run(r)) => a.ixor_run(r),
            (this, other) => this.xor(other),
        }
    }

    /// Difference, reusing `self`'s storage where the variant allows.
    pub fn iand_not(self, other: &Container) -> Container {
        match (self, other) {
            (Container::Bitmap(a), Container::Bitmap(b)) => a.iand_not(b),
            (Container::Bitmap(a), Container::Array(b)) => a.iand_not_array(b),
            (Container::Bitmap(a), Container::Run(r)) => a.iand_not_run(r),
            (this, other) => this.and_not(other),
        }
    }

    /// Return true if the two containers share a value.
    pub fn intersects(&self, other: &Container) -> bool {
        match (self, other) {
            (Container::Array(a), Container::Array(b)) => a.intersects(b),
            (Container::Array(a), Container::Bitmap(b))
            | (Container::Bitmap(b), Container::Array(a)) => a.iter().any(|v| b.contains(v)),
            (Container::Array(a), Container::Run(r)) | (Container::Run(r), Container::Array(a)) => {
                a.iter().any(|v| r.contains(v))
            }
            (Container::Bitmap(a), Container::Bitmap(b)) => a.intersects(b),
            (Container::Bitmap(b), Container::Run(r)) | (Container::Run(r), Container::Bitmap(b)) => r
                .runs()
                .iter()
                .any(|run| b.next_set_bit(run.start as usize).is_some_and(|p| p < run.end() as usize)),
            (Container::Run(a), Container::Run(b)) => a.intersects(b),
        }
    }

    /// Size of the intersection, computed without building it.
    pub fn and_cardinality(&self, other: &Container) -> usize {
        match (self, other) {
            (Container::Array(a), other) | (other, Container::Array(a)) => {
                a.iter().filter(|&v| other.contains(v)).count()
            }
            (Container::Bitmap(a), Container::Bitmap(b)) => a
                .words()
                .iter()
                .zip(b.words().iter())
                .map(|(x, y)| (x & y).count_ones() as usize)
                .sum(),
            (Container::Bitmap(b), Container::Run(r)) | (Container::Run(r), Container::Bitmap(b)) => r
                .runs()
                .iter()
                .map(|run| {
                    let below = if run.start == 0 { 0 } else { b.rank(run.start - 1) };
                    b.rank(run.last()) - below
                })
                .sum(),
            (Container::Run(a), Container::Run(b)) => {
                let (a, b) = (a.runs(), b.runs());
                let (mut i, mut j, mut count) = (0, 0, 0usize);
                while i < a.len() && j < b.len() {
                    let start = a[i].start.max(b[j].start) as u32;
                    let end = a[i].end().min(b[j].end());
                    if start < end {
                        count += (end - start) as usize;
                    }
                    if a[i].end() < b[j].end() {
                        i += 1;
                    } else {
                        j += 1;
                    }
                }
                count
            }
        }
    }

    /// Return true if every value of `self` is also in `other`.
    pub fn is_subset(&self, other: &Container) -> bool {
        let len = self.len();
        len <= other.len() && self.and_cardinality(other) == len
    }

    /// Smallest value `>= x`.
    pub fn next_value(&self, x: u16) -> Option<u16> {
        match self {
            Container::Array(a) => {
                let values = a.as_slice();
                values.get(values.partition_point(|&v| v < x)).copied()
            }
            Container::Bitmap(b) => b.next_set_bit(x as usize).map(|i| i as u16),
            Container::Run(r) => {
                let runs = r.runs();
                runs.get(runs.partition_point(|run| run.last() < x))
                    .map(|run| run.start.max(x))
            }
        }
    }

    /// Largest value `<= x`.
    pub fn previous_value(&self, x: u16) -> Option<u16> {
        match self {
            Container::Array(a) => {
                let values = a.as_slice();
                values.partition_point(|&v| v <= x).checked_sub(1).map(|i| values[i])
            }
            Container::Bitmap(b) => b.prev_set_bit(x as usize).map(|i| i as u16),
            Container::Run(r) => {
                let runs = r.runs();
                let i = runs.partition_point(|run| run.start <= x).checked_sub(1)?;
                Some(runs[i].last().min(x))
            }
        }
    }

    /// Switch to the run encoding when it is the smallest, or away from it when it is not.
    pub fn run_optimize(self) -> Container {
        match self {
            Container::Array(a) => {
                let runs = a.number_of_runs();
                if run_serialized_size(runs) < a.serialized_size_in_bytes() {
                    trace!(from = ?ContainerKind::Array, to = ?ContainerKind::Run, cardinality = a.len(), runs, "run-optimized container");
                    Container::Run(RunContainer::from(&a))
                } else {
                    Container::Array(a)
                }
            }
            Container::Bitmap(b) if b.len() <= ARRAY_MAX_SIZE => {
                Container::Array(b.to_array_container()).run_optimize()
            }
            Container::Bitmap(b) => {
                let runs = b.number_of_runs();
                if run_serialized_size(runs) < BITMAP_SERIALIZED_SIZE {
                    trace!(from = ?ContainerKind::Bitmap, to = ?ContainerKind::Run, cardinality = b.len(), runs, "run-optimized container");
                    Container::Run(RunContainer::from(&b))
                } else {
                    Container::Bitmap(b)
                }
            }
            Container::Run(r) => r.into_efficient_container(),
        }
    }

    /// Convert to a bitmap with the same membership.
    pub fn to_bitmap_container(&self) -> BitmapContainer {
        match self {
            Container::Array(a) => a.to_bitmap_container(),
            Container::Bitmap(b) => b.clone(),
            Container::Run(r) => r.to_bitmap_container(),
        }
    }

    /// Size of this container's own serialized form, header included.
    pub fn serialized_size_in_bytes(&self) -> usize {
        match self {
            Container::Array(a) => a.serialized_size_in_bytes(),
            Container::Bitmap(b) => b.serialized_size_in_bytes(),
            Container::Run(r) => r.serialized_size_in_bytes(),
        }
    }

    /// Approximate heap memory usage in bytes.
    pub fn heap_bytes(&self) -> usize {
        match self {
            Container::Array(a) => a.heap_bytes(),
            Container::Bitmap(b) => b.heap_bytes(),
            Container::Run(r) => r.heap_bytes(),
        }
    }

    /// Write the container in its variant's layout.
    pub fn serialize<W: Write>(&self, writer: &mut W) -> Result<()> {
        match self {
            Container::Array(a) => a.serialize(writer),
            Container::Bitmap(b) => b.serialize(writer),
            Container::Run(r) => r.serialize(writer),
        }
    }

    /// Read a container of the given kind, as written by [`Container::serialize`].
    pub fn deserialize<R: Read>(kind: ContainerKind, reader: &mut R) -> Result<Container> {
        Ok(match kind {
            ContainerKind::Array => Container::Array(ArrayContainer::deserialize(reader)?),
            ContainerKind::Bitmap => Container::Bitmap(BitmapContainer::deserialize(reader)?),
            ContainerKind::Run => Container::Run(RunContainer::deserialize(reader)?),
        })
    }

    /// Iterate the values in increasing order.
    pub fn iter(&self) -> Iter<'_> {
        match self {
            Container::Array(a) => Iter::Array(a.iter()),
            Container::Bitmap(b) => Iter::Bitmap(b.iter()),
            Container::Run(r) => Iter::Run(r.iter()),
        }
    }
}

impl<'a> IntoIterator for &'a Container {
    type Item = u16;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Iter<'a> {
        self.iter()
    }
}

/// Iterator over the values of a [`Container`].
#[derive(Clone, Debug)]
pub enum Iter<'a> {
    /// Over an array container.
    Array(std::iter::Copied<std::slice::Iter<'a, u16>>),
    /// Over a bitmap container.
    Bitmap(bitset::Iter<'a>),
    /// Over a run container.
    Run(run::Iter<'a>),
}

impl Iterator for Iter<'_> {
    type Item = u16;

    #[inline]
    fn next(&mut self) -> Option<u16> {
        match self {
            Iter::Array(it) => it.next(),
            Iter::Bitmap(it) => it.next(),
            Iter::Run(it) => it.next(),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self {
            Iter::Array(it) => it.size_hint(),
            Iter::Bitmap(it) => it.size_hint(),
            Iter::Run(it) => it.size_hint(),
        }
    }
}

impl DoubleEndedIterator for Iter<'_> {
    fn next_back(&mut self) -> Option<u16> {
        match self {
            Iter::Array(it) => it.next_back(),
            Iter::Bitmap(it) => it.next_back(),
            Iter::Run(it) => it.next_back(),
        }
    }
}

impl ExactSizeIterator for Iter<'_> {}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_values(kind: ContainerKind, values: &[u16]) -> Container {
        let mut bitmap = BitmapContainer::new();
        for &v in values {
            bitmap.insert(v);
        }
        match kind {
            ContainerKind::Array => Container::Array(bitmap.to_array_container()),
            ContainerKind::Bitmap => Container::Bitmap(bitmap),
            ContainerKind::Run => Container::Run(RunContainer::from(&bitmap)),
        }
    }

    const KINDS: [ContainerKind; 3] = [ContainerKind::Array, ContainerKind::Bitmap, ContainerKind::Run];

    #[test]
    fn equality_ignores_representation() {
        let values = [1u16, 2, 3, 100, 65535];
        for a in KINDS {
            for b in KINDS {
                assert_eq!(from_values(a, &values), from_values(b, &values), "{a:?} vs {b:?}");
            }
        }
        assert_ne!(
            from_values(ContainerKind::Array, &[1, 2]),
            from_values(ContainerKind::Run, &[1, 3])
        );
    }

    #[test]
    fn all_variant_pairs_agree() {
        let a: Vec<u16> = (0..300).map(|i| i * 7).chain(5000..5100).collect();
        let b: Vec<u16> = (0..300).map(|i| i * 5).chain(5050..5200).collect();
        let expected_and = from_values(ContainerKind::Array, &a)
            .and(&from_values(ContainerKind::Array, &b));
        let expected_or = from_values(ContainerKind::Array, &a)
            .or(&from_values(ContainerKind::Array, &b));
        let expected_xor = from_values(ContainerKind::Array, &a)
            .xor(&from_values(ContainerKind::Array, &b));
        let expected_diff = from_values(ContainerKind::Array, &a)
            .and_not(&from_values(ContainerKind::Array, &b));
        for ka in KINDS {
            for kb in KINDS {
                let (x, y) = (from_values(ka, &a), from_values(kb, &b));
                assert_eq!(x.and(&y), expected_and, "and {ka:?} {kb:?}");
                assert_eq!(x.or(&y), expected_or, "or {ka:?} {kb:?}");
                assert_eq!(x.xor(&y), expected_xor, "xor {ka:?} {kb:?}");
                assert_eq!(x.and_not(&y), expected_diff, "and_not {ka:?} {kb:?}");
                assert_eq!(x.clone().iand(&y), expected_and);
                assert_eq!(x.clone().ior(&y), expected_or);
                assert_eq!(x.clone().ixor(&y), expected_xor);
                assert_eq!(x.clone().iand_not(&y), expected_diff);
                assert_eq!(x.intersects(&y), !expected_and.is_empty());
            }
        }
    }

    #[test]
    fn range_arguments_are_validated() {
        let c = Container::new();
        assert!(matches!(
            c.clone().add_range(5, 5),
            Err(Error::InvalidRange { begin: 5, end: 5 })
        ));
        assert!(c.clone().remove_range(0, 65537).is_err());
        assert!(c.not(0, 65537).is_err());
        assert_eq!(c.not(10, 10).unwrap(), c);
    }

    #[test]
    fn range_constructors_and_updates() {
        let c = Container::new().add_range(0, 50_000).unwrap();
        assert_eq!(c.kind(), ContainerKind::Bitmap);
        let c = Container::from_range(0, 50_000).unwrap();
        assert_eq!(c.kind(), ContainerKind::Run);
        assert_eq!(c.len(), 50_000);
        assert_eq!(Container::from_range(7, 8).unwrap().kind(), ContainerKind::Array);
        let c = c.remove_range(100, 49_900).unwrap();
        assert_eq!(c.len(), 200);
        assert!(c.contains(99) && !c.contains(100) && c.contains(49_900));
    }

    #[test]
    fn bitmap_shrinks_at_threshold() {
        let mut c = Container::new();
        for v in 0..=ARRAY_MAX_SIZE as u16 {
            c = c.add(v * 2);
        }
        assert_eq!(c.kind(), ContainerKind::Bitmap);
        let c = c.remove(0);
        assert_eq!(c.kind(), ContainerKind::Array);
        assert_eq!(c.len(), ARRAY_MAX_SIZE);
    }

    #[test]
    fn run_count_limit_converts() {
        let mut c = Container::Run(RunContainer::new());
        for v in 0..=MAX_USEFUL_RUNS as u16 {
            c = c.add(v * 2);
        }
        assert_eq!(c.kind(), ContainerKind::Array);
        assert_eq!(c.len(), MAX_USEFUL_RUNS + 1);
    }

    #[test]
    fn run_optimize_is_idempotent() {
        let values: Vec<u16> = (1000..9000).collect();
        let once = from_values(ContainerKind::Bitmap, &values).run_optimize();
        assert_eq!(once.kind(), ContainerKind::Run);
        let twice = once.clone().run_optimize();
        assert_eq!(once, twice);
        assert_eq!(twice.kind(), ContainerKind::Run);

        let sparse = from_values(ContainerKind::Array, &[1, 3, 5]).run_optimize();
        assert_eq!(sparse.kind(), ContainerKind::Array);
    }

    #[test]
    fn run_optimize_settles_on_sparse_bitmap() {
        let mut b = BitmapContainer::new();
        b.insert(0);
        let once = Container::Bitmap(b).run_optimize();
        assert_eq!(once.kind(), ContainerKind::Array);
        let twice = once.clone().run_optimize();
        assert_eq!(twice.kind(), ContainerKind::Array);
        assert_eq!(once, twice);

        let dense: Vec<u16> = (0..30_000).map(|i| i * 2).collect();
        let c = from_values(ContainerKind::Bitmap, &dense).run_optimize();
        assert_eq!(c.kind(), ContainerKind::Bitmap);
        assert_eq!(c.clone().run_optimize().kind(), ContainerKind::Bitmap);
    }

    #[test]
    fn counting_and_subset_agree_with_materialized_results() {
        let a: Vec<u16> = (0..300).map(|i| i * 7).chain(5000..5100).chain(20_000..23_000).collect();
        let b: Vec<u16> = (0..300).map(|i| i * 5).chain(5050..5200).chain(22_000..25_000).collect();
        for ka in KINDS {
            for kb in KINDS {
                let (x, y) = (from_values(ka, &a), from_values(kb, &b));
                assert_eq!(x.and_cardinality(&y), x.and(&y).len(), "{ka:?} {kb:?}");
                assert!(!x.is_subset(&y));
                assert!(x.and(&y).is_subset(&x), "{ka:?} {kb:?}");
                assert!(x.and(&y).is_subset(&y), "{ka:?} {kb:?}");
            }
        }
        assert!(Container::new().is_subset(&Container::new()));
    }

    #[test]
    fn next_and_previous_values() {
        let values = [3u16, 4, 5, 100, 65535];
        for kind in KINDS {
            let c = from_values(kind, &values);
            assert_eq!(c.next_value(0), Some(3), "{kind:?}");
            assert_eq!(c.next_value(4), Some(4), "{kind:?}");
            assert_eq!(c.next_value(6), Some(100), "{kind:?}");
            assert_eq!(c.next_value(65535), Some(65535), "{kind:?}");
            assert_eq!(c.previous_value(2), None, "{kind:?}");
            assert_eq!(c.previous_value(5), Some(5), "{kind:?}");
            assert_eq!(c.previous_value(99), Some(5), "{kind:?}");
            assert_eq!(c.previous_value(65534), Some(100), "{kind:?}");
        }
        let c = from_values(ContainerKind::Run, &[3, 4, 5]);
        assert_eq!(c.next_value(6), None);
        assert_eq!(Container::new().previous_value(65535), None);
    }

    #[test]
    fn not_involution_on_every_variant() {
        let values: Vec<u16> = (0..200).map(|i| i * 3).collect();
        for kind in KINDS {
            let c = from_values(kind, &values);
            let twice = c.not(10, 400).unwrap().not(10, 400).unwrap();
            assert_eq!(twice, c, "{kind:?}");
            let twice = c.clone().inot(0, 65536).unwrap().inot(0, 65536).unwrap();
            assert_eq!(twice, c, "{kind:?}");
        }
    }

    #[test]
    fn rank_select_flip() {
        let c = from_values(ContainerKind::Run, &[4, 5, 6, 10]);
        assert_eq!(c.rank(5), 2);
        assert_eq!(c.select(3), Some(10));
        let c = c.flip(5).flip(11);
        assert_eq!(c.iter().collect::<Vec<u16>>(), vec![4, 6, 10, 11]);
        assert_eq!(c.iter().rev().next(), Some(11));
    }

    #[test]
    fn serialize_each_variant() {
        let values: Vec<u16> = (0..4000).map(|i| i * 13).collect();
        for kind in KINDS {
            let c = from_values(kind, &values);
            let mut buf = Vec::new();
            c.serialize(&mut buf).unwrap();
            assert_eq!(buf.len(), c.serialized_size_in_bytes());
            let back = Container::deserialize(kind, &mut buf.as_slice()).unwrap();
            assert_eq!(back.kind(), kind);
            assert_eq!(back, c);
        }
    }
}
