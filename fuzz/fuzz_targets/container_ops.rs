#![no_main]
use std::collections::BTreeSet;

use libfuzzer_sys::fuzz_target;
use rbits::RoaringBitmap;

fuzz_target!(|data: (Vec<u32>, Vec<(u32, u16)>, Vec<u8>)| {
    let (values, ranges, raw) = data;

    // Arbitrary bytes must never panic the decoder.
    if let Ok(bm) = RoaringBitmap::from_bytes(&raw) {
        assert_eq!(bm.iter().count() as u64, bm.len());
        let again = RoaringBitmap::from_bytes(&bm.to_bytes()).unwrap();
        assert_eq!(again, bm);
    }

    // Keep values in a few chunks so containers actually collide.
    let values: Vec<u32> = values.into_iter().map(|v| v % (1 << 19)).collect();
    let (left, right) = values.split_at(values.len() / 2);
    let mut a: RoaringBitmap = left.iter().copied().collect();
    let mut b: RoaringBitmap = right.iter().copied().collect();
    let mut sa: BTreeSet<u32> = left.iter().copied().collect();
    let mut sb: BTreeSet<u32> = right.iter().copied().collect();

    for (i, &(start, len)) in ranges.iter().enumerate() {
        let start = (start % (1 << 19)) as u64;
        let end = start + len as u64 + 1;
        let (bm, set) = if i % 2 == 0 { (&mut a, &mut sa) } else { (&mut b, &mut sb) };
        match i % 3 {
            0 => {
                bm.add_range(start, end).unwrap();
                set.extend(start as u32..end as u32);
            }
            1 => {
                bm.remove_range(start, end).unwrap();
                set.retain(|&v| !(start as u32..end as u32).contains(&v));
            }
            _ => {
                bm.flip_range(start, end).unwrap();
                for v in start as u32..end as u32 {
                    if !set.remove(&v) {
                        set.insert(v);
                    }
                }
            }
        }
    }
    if ranges.len() % 2 == 1 {
        a.run_optimize();
    }

    assert!(a.iter().eq(sa.iter().copied()));
    assert!((&a & &b).iter().eq(sa.intersection(&sb).copied()));
    assert!((&a | &b).iter().eq(sa.union(&sb).copied()));
    assert!((&a ^ &b).iter().eq(sa.symmetric_difference(&sb).copied()));
    assert!((&a - &b).iter().eq(sa.difference(&sb).copied()));

    let back = RoaringBitmap::from_bytes(&a.to_bytes()).unwrap();
    assert_eq!(back, a);
});
