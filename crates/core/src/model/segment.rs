// SPDX-License-Identifier: MIT

//! Transient segmentation plan: how the orchestrator splits a source's
//! timeline into per-worker transcode ranges. Segments are never persisted;
//! they exist only as the input to the `transcode` tasks created from a
//! completed `probe` result.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub index: u32,
    pub start_time_sec: f64,
    pub end_time_sec: f64,
}

impl Segment {
    pub fn duration_sec(&self) -> f64 {
        self.end_time_sec - self.start_time_sec
    }
}

/// `true` iff `segments` are in ascending, contiguous, non-overlapping
/// `index` order covering `[0, total_duration_sec)` with no gaps.
pub fn segments_are_contiguous(segments: &[Segment], total_duration_sec: f64) -> bool {
    if segments.is_empty() {
        return total_duration_sec == 0.0;
    }
    let mut expected_start = 0.0_f64;
    for (i, segment) in segments.iter().enumerate() {
        if segment.index as usize != i {
            return false;
        }
        if (segment.start_time_sec - expected_start).abs() > 1e-6 {
            return false;
        }
        if segment.end_time_sec <= segment.start_time_sec {
            return false;
        }
        expected_start = segment.end_time_sec;
    }
    (expected_start - total_duration_sec).abs() < 1e-6
}

#[cfg(test)]
#[path = "segment_tests.rs"]
mod tests;

#[cfg(test)]
#[path = "segment_proptests.rs"]
mod proptests;
