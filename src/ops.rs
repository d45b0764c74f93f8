//! Merge algorithms over two directories.
//!
//! Each operation walks both key columns with one cursor per side. Equal keys
//! combine their containers; unequal keys are copied, skipped or galloped past
//! depending on the operation. Entries whose combined container comes out
//! empty are never emitted.
//!
//! The `*_assign` forms rewrite the left directory while walking it. `and`
//! and `and_not` compact survivors towards the front with a write index;
//! `or` and `xor` insert or remove entries under the cursor and track the
//! logical length in a local counter.

use std::cmp::Ordering;

use crate::directory::Directory;

/// Entries whose keys are in both directories, intersected.
pub fn and(a: &Directory, b: &Directory) -> Directory {
    let mut answer = Directory::with_capacity(a.len().min(b.len()));
    let (mut pos1, mut pos2) = (0, 0);
    while pos1 < a.len() && pos2 < b.len() {
        let (k1, k2) = (a.key_at(pos1), b.key_at(pos2));
        match k1.cmp(&k2) {
            Ordering::Equal => {
                let c = a.container_at(pos1).and(b.container_at(pos2));
                if !c.is_empty() {
                    answer.append(k1, c);
                }
                pos1 += 1;
                pos2 += 1;
            }
            Ordering::Less => pos1 = a.advance_until(k2, pos1),
            Ordering::Greater => pos2 = b.advance_until(k1, pos2),
        }
    }
    answer
}

/// Union of two directories.
pub fn or(a: &Directory, b: &Directory) -> Directory {
    let mut answer = Directory::with_capacity(a.len() + b.len());
    let (mut pos1, mut pos2) = (0, 0);
    while pos1 < a.len() && pos2 < b.len() {
        let (k1, k2) = (a.key_at(pos1), b.key_at(pos2));
        match k1.cmp(&k2) {
            Ordering::Equal => {
                answer.append(k1, a.container_at(pos1).or(b.container_at(pos2)));
                pos1 += 1;
                pos2 += 1;
            }
            Ordering::Less => {
                let next = a.advance_until(k2, pos1);
                answer.append_copy_range(a, pos1, next);
                pos1 = next;
            }
            Ordering::Greater => {
                let next = b.advance_until(k1, pos2);
                answer.append_copy_range(b, pos2, next);
                pos2 = next;
            }
        }
    }
    answer.append_copy_range(a, pos1, a.len());
    answer.append_copy_range(b, pos2, b.len());
    answer
}

/// Symmetric difference of two directories.
pub fn xor(a: &Directory, b: &Directory) -> Directory {
    let mut answer = Directory::with_capacity(a.len() + b.len());
    let (mut pos1, mut pos2) = (0, 0);
    while pos1 < a.len() && pos2 < b.len() {
        let (k1, k2) = (a.key_at(pos1), b.key_at(pos2));
        match k1.cmp(&k2) {
            Ordering::Equal => {
                let c = a.container_at(pos1).xor(b.container_at(pos2));
                if !c.is_empty() {
                    answer.append(k1, c);
                }
                pos1 += 1;
                pos2 += 1;
            }
            Ordering::Less => {
                let next = a.advance_until(k2, pos1);
                answer.append_copy_range(a, pos1, next);
                pos1 = next;
            }
            Ordering::Greater => {
                let next = b.advance_until(k1, pos2);
                answer.append_copy_range(b, pos2, next);
                pos2 = next;
            }
        }
    }
    answer.append_copy_range(a, pos1, a.len());
    answer.append_copy_range(b, pos2, b.len());
    answer
}

/// Entries of `a` with the values of `b` removed.
pub fn and_not(a: &Directory, b: &Directory) -> Directory {
    let mut answer = Directory::with_capacity(a.len());
    let (mut pos1, mut pos2) = (0, 0);
    while pos1 < a.len() && pos2 < b.len() {
        let (k1, k2) = (a.key_at(pos1), b.key_at(pos2));
        match k1.cmp(&k2) {
            Ordering::Equal => {
                let c = a.container_at(pos1).and_not(b.container_at(pos2));
                if !c.is_empty() {
                    answer.append(k1, c);
                }
                pos1 += 1;
                pos2 += 1;
            }
            Ordering::Less => {
                let next = a.advance_until(k2, pos1);
                answer.append_copy_range(a, pos1, next);
                pos1 = next;
            }
            Ordering::Greater => pos2 = b.advance_until(k1, pos2),
        }
    }
    answer.append_copy_range(a, pos1, a.len());
    answer
}

/// In-place intersection: survivors are compacted to the front of `a`.
pub fn and_assign(a: &mut Directory, b: &Directory) {
    let len1 = a.len();
    let (mut pos1, mut pos2, mut write) = (0, 0, 0);
    while pos1 < len1 && pos2 < b.len() {
        let (k1, k2) = (a.key_at(pos1), b.key_at(pos2));
        match k1.cmp(&k2) {
            Ordering::Equal => {
                let c = a.take_container_at(pos1).iand(b.container_at(pos2));
                if !c.is_empty() {
                    a.replace_key_and_container_at(write, k1, c);
                    write += 1;
                }
                pos1 += 1;
                pos2 += 1;
            }
            Ordering::Less => pos1 = a.advance_until(k2, pos1),
            Ordering::Greater => pos2 = b.advance_until(k1, pos2),
        }
    }
    a.resize(write);
}

/// In-place union: keys only in `b` are inserted under the cursor.
pub fn or_assign(a: &mut Directory, b: &Directory) {
    let mut len1 = a.len();
    let (mut pos1, mut pos2) = (0, 0);
    while pos1 < len1 && pos2 < b.len() {
        let (k1, k2) = (a.key_at(pos1), b.key_at(pos2));
        match k1.cmp(&k2) {
            Ordering::Equal => {
                let c = a.take_container_at(pos1).ior(b.container_at(pos2));
                a.set_container_at(pos1, c);
                pos1 += 1;
                pos2 += 1;
            }
            Ordering::Less => pos1 = a.advance_until(k2, pos1),
            Ordering::Greater => {
                a.insert_new_key_value_at(pos1, k2, b.container_at(pos2).clone());
                pos1 += 1;
                len1 += 1;
                pos2 += 1;
            }
        }
    }
    if pos1 == len1 {
        a.append_copy_range(b, pos2, b.len());
    }
}

/// In-place symmetric difference: emptied entries are removed under the cursor.
pub fn xor_assign(a: &mut Directory, b: &Directory) {
    let mut len1 = a.len();
    let (mut pos1, mut pos2) = (0, 0);
    while pos1 < len1 && pos2 < b.len() {
        let (k1, k2) = (a.key_at(pos1), b.key_at(pos2));
        match k1.cmp(&k2) {
            Ordering::Equal => {
                let c = a.take_container_at(pos1).ixor(b.container_at(pos2));
                if c.is_empty() {
                    a.remove_at_index(pos1);
                    len1 -= 1;
                } else {
                    a.set_container_at(pos1, c);
                    pos1 += 1;
                }
                pos2 += 1;
            }
            Ordering::Less => pos1 = a.advance_until(k2, pos1),
            Ordering::Greater => {
                a.insert_new_key_value_at(pos1, k2, b.container_at(pos2).clone());
                pos1 += 1;
                len1 += 1;
                pos2 += 1;
            }
        }
    }
    if pos1 == len1 {
        a.append_copy_range(b, pos2, b.len());
    }
}

/// In-place difference: survivors are compacted to the front of `a`.
pub fn and_not_assign(a: &mut Directory, b: &Directory) {
    let len1 = a.len();
    let (mut pos1, mut pos2, mut write) = (0, 0, 0);
    while pos1 < len1 && pos2 < b.len() {
        let (k1, k2) = (a.key_at(pos1), b.key_at(pos2));
        match k1.cmp(&k2) {
            Ordering::Equal => {
                let c = a.take_container_at(pos1).iand_not(b.container_at(pos2));
                if !c.is_empty() {
                    a.replace_key_and_container_at(write, k1, c);
                    write += 1;
                }
                pos1 += 1;
                pos2 += 1;
            }
            Ordering::Less => {
                if write != pos1 {
                    let c = a.take_container_at(pos1);
                    a.replace_key_and_container_at(write, k1, c);
                }
                write += 1;
                pos1 += 1;
            }
            Ordering::Greater => pos2 = b.advance_until(k1, pos2),
        }
    }
    // Entries past pos1 are untouched; close the gap left by dropped ones.
    a.remove_index_range(write, pos1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::Container;

    fn directory(entries: &[(u16, &[(u32, u32)])]) -> Directory {
        let mut d = Directory::new();
        for &(key, ranges) in entries {
            let mut c = Container::new();
            for &(s, e) in ranges {
                c = c.add_range(s, e).unwrap();
            }
            d.append(key, c);
        }
        d
    }

    fn flatten(d: &Directory) -> Vec<u32> {
        d.iter()
            .flat_map(|(k, c)| c.iter().map(move |v| ((k as u32) << 16) | v as u32))
            .collect()
    }

    fn fixtures() -> (Directory, Directory) {
        let a = directory(&[
            (0, &[(0, 10)]),
            (2, &[(0, 5000)]),
            (3, &[(100, 200)]),
            (9, &[(7, 8)]),
        ]);
        let b = directory(&[
            (1, &[(0, 3)]),
            (2, &[(2500, 7000)]),
            (3, &[(100, 200)]),
            (10, &[(0, 65536)]),
        ]);
        (a, b)
    }

    #[test]
    fn allocating_and_in_place_agree() {
        let (a, b) = fixtures();

        let mut x = a.clone();
        and_assign(&mut x, &b);
        assert_eq!(x, and(&a, &b));
        assert_eq!(x.keys(), &[2, 3]);

        let mut x = a.clone();
        or_assign(&mut x, &b);
        assert_eq!(x, or(&a, &b));
        assert_eq!(x.keys(), &[0, 1, 2, 3, 9, 10]);

        let mut x = a.clone();
        xor_assign(&mut x, &b);
        assert_eq!(x, xor(&a, &b));
        assert_eq!(x.keys(), &[0, 1, 2, 9, 10]);

        let mut x = a.clone();
        and_not_assign(&mut x, &b);
        assert_eq!(x, and_not(&a, &b));
        assert_eq!(x.keys(), &[0, 2, 9]);
    }

    #[test]
    fn container_results() {
        let (a, b) = fixtures();
        let both = and(&a, &b);
        assert_eq!(both.container_at(0).len(), 2500);
        let diff = and_not(&a, &b);
        assert_eq!(diff.lookup(2).map(Container::len), Some(2500));
        let sym = xor(&a, &b);
        assert_eq!(sym.lookup(2).map(Container::len), Some(2500 + 2000));
    }

    #[test]
    fn disjoint_keys() {
        let a = directory(&[(0, &[(0, 4)]), (1, &[(5, 9)])]);
        let b = directory(&[(5, &[(1, 2)]), (6, &[(0, 65536)])]);
        assert!(and(&a, &b).is_empty());
        let u = or(&a, &b);
        assert_eq!(u.keys(), &[0, 1, 5, 6]);
        let mut expected = flatten(&a);
        expected.extend(flatten(&b));
        assert_eq!(flatten(&u), expected);
        assert_eq!(and_not(&a, &b), a);
    }

    #[test]
    fn operands_are_not_mutated() {
        let (a, b) = fixtures();
        let (a0, b0) = (a.clone(), b.clone());
        let mut x = a.clone();
        xor_assign(&mut x, &b);
        or_assign(&mut x, &b);
        assert_eq!(a, a0);
        assert_eq!(b, b0);
    }
}
