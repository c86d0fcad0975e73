// SPDX-License-Identifier: MIT

//! Decides how many transcode tasks a probe result turns into, and where
//! each one's boundaries fall, without touching the bus or the store — a
//! pure function so the scenarios in its test module don't need either.

use mf_core::model::Segment;

/// Target segment duration as a step function of the healthy worker count.
/// The ≥8 branch is checked before ≥4 so both are reachable; checking
/// low-to-high would make the ≥8 branch dead code, since any count ≥8 also
/// satisfies ≥4.
fn target_segment_duration_sec(healthy_worker_count: usize) -> f64 {
    if healthy_worker_count >= 8 {
        10.0
    } else if healthy_worker_count >= 4 {
        15.0
    } else {
        30.0
    }
}

/// Plan segment boundaries for a source of `duration_sec` with keyframes at
/// `keyframe_offsets_sec` (ascending, starting at or before 0).
///
/// With at most one healthy worker there's no one to fan out to, so the
/// whole source becomes a single segment. Otherwise, walk forward from each
/// segment's start accumulating duration; once the accumulated duration
/// would reach the target, cut at the next keyframe at or after that point
/// so no segment splits a GOP. The final segment always ends at
/// `duration_sec`, whether or not that's a keyframe.
pub fn plan_segments(duration_sec: f64, keyframe_offsets_sec: &[f64], healthy_worker_count: usize) -> Vec<Segment> {
    if duration_sec <= 0.0 {
        return Vec::new();
    }
    if healthy_worker_count <= 1 {
        return vec![Segment { index: 0, start_time_sec: 0.0, end_time_sec: duration_sec }];
    }

    let target = target_segment_duration_sec(healthy_worker_count);
    let mut segments = Vec::new();
    let mut start = 0.0_f64;
    let mut index = 0_u32;

    loop {
        let cumulative_target = start + target;
        if cumulative_target >= duration_sec - f64::EPSILON {
            segments.push(Segment { index, start_time_sec: start, end_time_sec: duration_sec });
            break;
        }
        let boundary = keyframe_offsets_sec
            .iter()
            .copied()
            .find(|&k| k >= cumulative_target && k > start)
            .unwrap_or(duration_sec);
        let end = boundary.min(duration_sec);
        segments.push(Segment { index, start_time_sec: start, end_time_sec: end });
        if end >= duration_sec - f64::EPSILON {
            break;
        }
        start = end;
        index += 1;
    }

    segments
}

#[cfg(test)]
#[path = "segmentation_tests.rs"]
mod tests;
