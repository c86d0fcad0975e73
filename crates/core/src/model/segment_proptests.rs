// SPDX-License-Identifier: MIT

use super::*;
use proptest::prelude::*;

proptest! {
    #[test]
    fn evenly_split_segments_are_always_contiguous(total in 1.0f64..10_000.0, n in 1u32..32) {
        let step = total / n as f64;
        let segments: Vec<Segment> = (0..n)
            .map(|i| Segment {
                index: i,
                start_time_sec: i as f64 * step,
                end_time_sec: if i + 1 == n { total } else { (i + 1) as f64 * step },
            })
            .collect();
        prop_assert!(segments_are_contiguous(&segments, total));
    }

    #[test]
    fn shuffled_indices_are_rejected(n in 2u32..16) {
        let total = n as f64 * 10.0;
        let mut segments: Vec<Segment> = (0..n)
            .map(|i| Segment { index: i, start_time_sec: i as f64 * 10.0, end_time_sec: (i + 1) as f64 * 10.0 })
            .collect();
        segments.swap(0, (n - 1) as usize);
        prop_assert!(!segments_are_contiguous(&segments, total));
    }
}
