//! Operations over many bitmaps at once.
//!
//! [`or`] groups every container by key and unions each group in a single
//! word buffer. The buffer skips cardinality upkeep while it absorbs inputs
//! and is converted back to a proper container once per key with
//! `repair`. It only supports absorbing containers by union and never leaves
//! this module.
//!
//! [`and`] and [`xor`] are folds over the pairwise operations.

use crate::bitset::BitmapContainer;
use crate::container::{Container, BITMAP_WORDS};
use crate::directory::Directory;
use crate::roaring::RoaringBitmap;
use crate::util;

/// Union buffer with deferred cardinality.
struct LazyOr {
    words: Box<[u64; BITMAP_WORDS]>,
}

impl LazyOr {
    fn new() -> Self {
        Self {
            words: Box::new([0u64; BITMAP_WORDS]),
        }
    }

    fn absorb(&mut self, c: &Container) {
        match c {
            Container::Array(a) => {
                for v in a.iter() {
                    self.words[v as usize / 64] |= 1u64 << (v % 64);
                }
            }
            Container::Bitmap(b) => {
                for (w, &x) in self.words.iter_mut().zip(b.words().iter()) {
                    *w |= x;
                }
            }
            Container::Run(r) => {
                for run in r.runs() {
                    util::set_bitmap_range(&mut self.words[..], run.start as usize, run.end() as usize);
                }
            }
        }
    }

    /// Recount and pick the final representation.
    fn repair(self) -> Container {
        BitmapContainer::from_words(self.words).into_container()
    }
}

/// Union of all `bitmaps`.
pub fn or<'a, I>(bitmaps: I) -> RoaringBitmap
where
    I: IntoIterator<Item = &'a RoaringBitmap>,
{
    let mut entries: Vec<(u16, &Container)> = bitmaps
        .into_iter()
        .flat_map(|bm| bm.directory().iter())
        .collect();
    entries.sort_by_key(|&(key, _)| key);

    let mut directory = Directory::new();
    for group in entries.chunk_by(|a, b| a.0 == b.0) {
        let key = group[0].0;
        let c = match group {
            [(_, only)] => (*only).clone(),
            [(_, first), (_, second)] => first.or(second),
            _ => {
                let mut buffer = LazyOr::new();
                for (_, c) in group {
                    buffer.absorb(c);
                }
                buffer.repair()
            }
        };
        directory.append(key, c);
    }
    RoaringBitmap::from_directory(directory)
}

/// Intersection of all `bitmaps`; empty when there are none.
pub fn and<'a, I>(bitmaps: I) -> RoaringBitmap
where
    I: IntoIterator<Item = &'a RoaringBitmap>,
{
    let mut sorted: Vec<&RoaringBitmap> = bitmaps.into_iter().collect();
    sorted.sort_by_key(|bm| bm.directory().len());
    let Some((first, rest)) = sorted.split_first() else {
        return RoaringBitmap::new();
    };
    let mut acc = (*first).clone();
    for bm in rest {
        if acc.is_empty() {
            break;
        }
        acc.and_assign(bm);
    }
    acc
}

/// Symmetric difference of all `bitmaps`.
pub fn xor<'a, I>(bitmaps: I) -> RoaringBitmap
where
    I: IntoIterator<Item = &'a RoaringBitmap>,
{
    let mut acc = RoaringBitmap::new();
    for bm in bitmaps {
        acc.xor_assign(bm);
    }
    acc
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bitmaps() -> Vec<RoaringBitmap> {
        vec![
            (0..200_000u32).step_by(2).collect(),
            (0..200_000u32).step_by(3).collect(),
            (100_000..300_000u32).collect(),
            [7u32, 1 << 30].into_iter().collect(),
        ]
    }

    #[test]
    fn or_matches_pairwise_fold() {
        let all = bitmaps();
        let expected = all.iter().fold(RoaringBitmap::new(), |acc, bm| &acc | bm);
        let got = or(&all);
        assert_eq!(got, expected);
        assert_eq!(got.len(), expected.len());
    }

    #[test]
    fn and_and_xor_folds() {
        let all = bitmaps();
        let both = and(&all[..2]);
        assert_eq!(both, (0..200_000u32).step_by(6).collect::<RoaringBitmap>());
        assert!(and(&all).is_empty());
        assert!(and(std::iter::empty()).is_empty());

        let sym = xor(&all);
        let mut expected = RoaringBitmap::new();
        for bm in &all {
            expected = &expected ^ bm;
        }
        assert_eq!(sym, expected);
    }

    #[test]
    fn lazy_union_repairs_representation() {
        let sparse: Vec<RoaringBitmap> = (0..3u32).map(|i| [i, i + 10].into_iter().collect()).collect();
        let u = or(&sparse);
        assert_eq!(u.len(), 6);
        assert!(matches!(u.directory().container_at(0), Container::Array(_)));

        let mut full_parts: Vec<RoaringBitmap> = Vec::new();
        for i in 0..4u64 {
            let mut bm = RoaringBitmap::new();
            bm.add_range(i * 16_384, (i + 1) * 16_384).unwrap();
            full_parts.push(bm);
        }
        let u = or(&full_parts);
        assert!(u.directory().container_at(0).is_full());
    }
}
