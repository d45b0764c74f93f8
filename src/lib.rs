//! # Roaring Bitmaps
//!
//! *Compressed sets of 32-bit integers with fast set algebra.*
//!
//! ## Intuition First
//!
//! Picture a warehouse of 65536 shelves, each able to hold 65536 numbered
//! boxes. Most shelves are empty, some hold a handful of boxes, some are
//! nearly full, and some hold long unbroken stretches. Writing every shelf
//! down the same way wastes space: a checklist of 65536 ticks is silly for
//! three boxes, and a list of three numbers is silly for sixty thousand.
//!
//! A Roaring bitmap keeps a short index of the shelves that hold anything,
//! and writes each shelf down in whichever of three notations is smallest:
//! a sorted list, a tick sheet, or a list of stretches.
//!
//! ## The Problem
//!
//! Plain bitsets over $[0, 2^{32})$ cost 512 MiB no matter what they hold.
//! Sorted arrays are compact for sparse data but make unions and
//! intersections of dense sets slow. Run-length encodings shine on
//! contiguous data and collapse on scattered data. Real workloads (posting
//! lists, row selections, event ids) mix all three shapes within one set.
//!
//! ## Historical Context
//!
//! ```text
//! 1977  Elias       Run-length and gap encodings for sparse bit vectors
//! 2001  Antoshenkov BBC: byte-aligned bitmap compression in Oracle
//! 2006  Wu et al.   WAH: word-aligned hybrid, compressed bitmaps for OLAP
//! 2016  Chambi      Roaring: partitioned bitmaps with array and bitmap chunks
//! 2016  Lemire      Run containers added to Roaring ("Consistently faster")
//! 2018  Lemire      Portable serialization format shared across languages
//! ```
//!
//! The word-aligned schemes compress well but only support sequential
//! access; Roaring gave up a little compression for random access and
//! chunk-local algorithms.
//!
//! ## Mathematical Formulation
//!
//! A value $x \in [0, 2^{32})$ splits into a key $k = \lfloor x / 2^{16} \rfloor$
//! and a low part $l = x \bmod 2^{16}$. The set $S$ is stored as
//!
//! $$S = \bigcup_{k} \{ k \cdot 2^{16} + l : l \in C_k \}$$
//!
//! where each non-empty chunk $C_k \subseteq [0, 2^{16})$ is one of:
//!
//! - **Array**: sorted `u16` values, $2|C_k|$ bytes, used when $|C_k| \le 4096$.
//! - **Bitmap**: 1024 words, always 8 KiB, used when $|C_k| > 4096$.
//! - **Run**: $r$ pairs `(start, length - 1)`, $4r$ bytes.
//!
//! The 4096 threshold is where the array and bitmap cost the same.
//!
//! ## Complexity Analysis
//!
//! - **Membership**: binary search over keys, then $O(\log |C_k|)$, $O(1)$ or
//!   $O(\log r)$ inside the chunk.
//! - **Set algebra**: linear in the number of keys, plus per-chunk work of
//!   $O(n_1 + n_2)$ for arrays (galloping when sizes differ a lot),
//!   1024 word operations for bitmaps, and $O(r_1 + r_2)$ for runs.
//! - **Space**: at most 8 KiB plus 4 bytes of index per non-empty chunk.
//!
//! ## What Could Go Wrong
//!
//! 1. **Representation drift**: an operation can leave an array above the
//!    threshold or a bitmap below it. Every mutating container operation
//!    consumes the container and returns whatever representation fits.
//! 2. **Empty chunks**: a chunk emptied by removal must leave the index,
//!    otherwise cardinality and serialization disagree with membership.
//! 3. **Untrusted bytes**: serialized input can claim any cardinality or key
//!    order; decoding validates both rather than trusting the header.
//!
//! ## Implementation Notes
//!
//! This crate provides:
//! - **`RoaringBitmap`**: the 32-bit set with in-place and allocating set algebra.
//! - **`Container`**: one chunk, an enum over the three representations.
//! - **`Directory`**: the sorted key index pairing keys with containers.
//! - **`aggregate`**: unions, intersections and symmetric differences of many bitmaps.
//! - **Portable format**: byte-compatible with other Roaring implementations.
//!
//! ## References
//!
//! - Chambi, S., et al. (2016). "Better bitmap performance with Roaring bitmaps."
//! - Lemire, D., et al. (2016). "Consistently faster and smaller compressed bitmaps with Roaring."
//! - Lemire, D., et al. (2018). "Roaring bitmaps: Implementation of an optimized software library."

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod aggregate;
pub mod array;
pub mod bitset;
pub mod container;
pub mod directory;
pub mod error;
pub mod format;
pub mod ops;
pub mod roaring;
pub mod run;
mod util;

pub use array::ArrayContainer;
pub use bitset::BitmapContainer;
pub use container::{Container, ContainerKind, ARRAY_MAX_SIZE, MAX_CARDINALITY};
pub use directory::Directory;
pub use error::{Error, Result};
pub use roaring::RoaringBitmap;
pub use run::{Run, RunContainer};
