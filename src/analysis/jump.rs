//! Jump apex detection on the ankle-height track.
//!
//! Image y grows downwards, so the apex of a jump is a local *minimum* of the
//! ankle series. A minimum only counts while the wrists are actually turning a
//! rope, and counted minima closer than a fixed real-time gap are merged.

use crate::config::AnalysisConfig;

/// A counted jump: position of its apex in the motion series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct JumpEvent {
    pub index: usize,
}

pub struct JumpDetector {
    window: usize,
    wrist_speed_gate: f64,
    min_gap_seconds: f64,
    ground_percentile: f64,
}

impl JumpDetector {
    pub fn new(window: usize, wrist_speed_gate: f64, min_gap_seconds: f64, ground_percentile: f64) -> Self {
        Self {
            window,
            wrist_speed_gate,
            min_gap_seconds,
            ground_percentile,
        }
    }

    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self::new(
            config.peak_window,
            config.wrist_speed_gate,
            config.min_gap_seconds,
            config.ground_percentile,
        )
    }

    /// Ground level: the configured percentile of each foot, averaged.
    pub fn ground_reference(&self, left_ankle_y: &[f64], right_ankle_y: &[f64]) -> f64 {
        let left = percentile(left_ankle_y, self.ground_percentile);
        let right = percentile(right_ankle_y, self.ground_percentile);
        (left + right) / 2.0
    }

    /// Minimum spacing between counted jumps, in samples.
    pub fn min_gap(&self, effective_fps: f64) -> usize {
        min_gap_frames(effective_fps, self.min_gap_seconds)
    }

    /// Indices whose ankle height is the minimum of the surrounding window.
    ///
    /// Returns nothing unless `wrist_speed` clears the gate: a still rope means
    /// any bobbing of the feet is not skipping.
    pub fn candidates(&self, ankle_y: &[f64], wrist_speed: f64) -> Vec<usize> {
        let w = self.window;
        if wrist_speed <= self.wrist_speed_gate || ankle_y.len() < 2 * w + 1 {
            return Vec::new();
        }

        (w..ankle_y.len() - w)
            .filter(|&i| {
                let lowest = ankle_y[i - w..=i + w]
                    .iter()
                    .copied()
                    .fold(f64::INFINITY, f64::min);
                ankle_y[i] == lowest
            })
            .collect()
    }

    pub fn detect(&self, ankle_y: &[f64], wrist_speed: f64, effective_fps: f64) -> Vec<JumpEvent> {
        let candidates = self.candidates(ankle_y, wrist_speed);
        debounce(&candidates, self.min_gap(effective_fps))
    }
}

/// `max(2, round(effective_fps * seconds))`.
pub fn min_gap_frames(effective_fps: f64, seconds: f64) -> usize {
    let gap = (effective_fps * seconds).round();
    if gap.is_finite() && gap > 2.0 {
        gap as usize
    } else {
        2
    }
}

/// Keep each candidate that lands at least `min_gap` samples after the last kept one.
pub fn debounce(candidates: &[usize], min_gap: usize) -> Vec<JumpEvent> {
    let mut kept: Vec<JumpEvent> = Vec::new();
    for &index in candidates {
        match kept.last() {
            Some(last) if index < last.index + min_gap => {}
            _ => kept.push(JumpEvent { index }),
        }
    }
    kept
}

/// Percentile with linear interpolation between closest ranks. 0.0 for no data.
pub fn percentile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let rank = (q.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64)
}
