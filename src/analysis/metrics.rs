use serde::{Deserialize, Serialize};

use crate::pose::Point2;

/// Guards the symmetry ratio when both wrists are still.
const SYMMETRY_EPS: f64 = 1e-6;

/// Jumps counted per suspected miss when the rope looks slack.
const JUMPS_PER_MISS: usize = 10;

/// Outcome of one video analysis. Field names are the HTTP wire format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub count: usize,
    pub cadence_spm: f64,
    pub avg_height_cm: f64,
    pub symmetry_score: f64,
    pub misses: usize,
    pub frames_analyzed: usize,
    #[serde(default)]
    pub analysis: Vec<String>,
    pub duration_seconds: f64,
}

impl AnalysisResult {
    /// All-zero result for clips with too few usable frames.
    pub fn insufficient(frames_analyzed: usize, duration_seconds: f64) -> Self {
        Self {
            count: 0,
            cadence_spm: 0.0,
            avg_height_cm: 0.0,
            symmetry_score: 0.0,
            misses: 0,
            frames_analyzed,
            analysis: Vec::new(),
            duration_seconds,
        }
    }
}

/// Mean displacement between consecutive points; 0 with fewer than two points.
pub fn mean_speed(track: &[Point2]) -> f64 {
    if track.len() < 2 {
        return 0.0;
    }
    let total: f64 = track.windows(2).map(|w| w[1].distance(&w[0])).sum();
    total / (track.len() - 1) as f64
}

/// `1 - |l - r| / (l + r + eps)` clamped to [0, 1]. Two still wrists score 1.0.
pub fn symmetry(left_speed: f64, right_speed: f64) -> f64 {
    let s = 1.0 - (left_speed - right_speed).abs() / (left_speed + right_speed + SYMMETRY_EPS);
    s.clamp(0.0, 1.0)
}

/// Highest ankle lift above ground, scaled by the uncalibrated `cm_per_px` factor.
pub fn jump_height_cm(ground: f64, ankle_y: &[f64], cm_per_px: f64) -> f64 {
    let Some(highest) = ankle_y.iter().copied().reduce(f64::min) else {
        return 0.0;
    };
    ((ground - highest) * cm_per_px).max(0.0)
}

/// Real time covered by the sampled frames.
pub fn duration_seconds(frames_analyzed: usize, stride: usize, fps: f64) -> f64 {
    if fps <= 0.0 {
        return 0.0;
    }
    (frames_analyzed * stride) as f64 / fps
}

/// Jumps per minute; 0 for an empty window.
pub fn cadence_spm(count: usize, duration_seconds: f64) -> f64 {
    if duration_seconds > 0.0 {
        count as f64 / duration_seconds * 60.0
    } else {
        0.0
    }
}

/// Counted jumps with barely moving wrists are likely trips over the rope.
pub fn estimate_misses(count: usize, wrist_speed: f64, slack_threshold: f64) -> usize {
    if wrist_speed < slack_threshold {
        count / JUMPS_PER_MISS
    } else {
        0
    }
}

pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, eps: f64) -> bool {
        (a - b).abs() < eps
    }

    fn track(step: f64, n: usize) -> Vec<Point2> {
        (0..n).map(|i| Point2::new(step * i as f64, 50.0)).collect()
    }

    #[test]
    fn test_mean_speed() {
        assert!(approx_eq(mean_speed(&track(5.0, 30)), 5.0, 1e-12));
        let zigzag = [Point2::new(0.0, 0.0), Point2::new(3.0, 4.0), Point2::new(3.0, 0.0)];
        assert!(approx_eq(mean_speed(&zigzag), 4.5, 1e-12));
    }

    #[test]
    fn test_mean_speed_needs_two_points() {
        assert_eq!(mean_speed(&[]), 0.0);
        assert_eq!(mean_speed(&[Point2::new(4.0, 4.0)]), 0.0);
    }

    #[test]
    fn test_symmetry_equal_speeds() {
        assert!(approx_eq(symmetry(5.0, 5.0), 1.0, 1e-12));
    }

    #[test]
    fn test_symmetry_still_wrists_is_one() {
        assert_eq!(symmetry(0.0, 0.0), 1.0);
    }

    #[test]
    fn test_symmetry_one_sided() {
        assert!(approx_eq(symmetry(4.0, 0.0), 0.0, 1e-6));
        assert!(approx_eq(symmetry(3.0, 1.0), 0.5, 1e-6));
    }

    #[test]
    fn test_symmetry_stays_in_unit_range() {
        let speeds = [0.0, 1e-9, 0.3, 1.0, 2.5, 17.0, 1e6];
        for &l in &speeds {
            for &r in &speeds {
                let s = symmetry(l, r);
                assert!((0.0..=1.0).contains(&s), "symmetry({l}, {r}) = {s}");
            }
        }
    }

    #[test]
    fn test_jump_height() {
        let ankles = [400.0, 320.0, 390.0];
        assert!(approx_eq(jump_height_cm(400.0, &ankles, 0.1), 8.0, 1e-9));
        // ground above the highest point clamps to zero
        assert_eq!(jump_height_cm(300.0, &ankles, 0.1), 0.0);
        assert_eq!(jump_height_cm(300.0, &[], 0.1), 0.0);
    }

    #[test]
    fn test_duration_and_cadence() {
        let d = duration_seconds(30, 3, 30.0);
        assert_eq!(d, 3.0);
        assert_eq!(cadence_spm(3, d), 60.0);
        assert_eq!(cadence_spm(3, 0.0), 0.0);
        assert_eq!(duration_seconds(30, 3, 0.0), 0.0);
    }

    #[test]
    fn test_misses() {
        assert_eq!(estimate_misses(25, 0.5, 1.0), 2);
        assert_eq!(estimate_misses(9, 0.5, 1.0), 0);
        assert_eq!(estimate_misses(25, 1.0, 1.0), 0);
    }

    #[test]
    fn test_round1() {
        assert_eq!(round1(59.96), 60.0);
        assert_eq!(round1(7.04), 7.0);
    }

    #[test]
    fn test_wire_field_names() {
        let json = serde_json::to_value(AnalysisResult::insufficient(4, 0.4)).unwrap();
        for key in [
            "count",
            "cadence_spm",
            "avg_height_cm",
            "symmetry_score",
            "misses",
            "frames_analyzed",
            "analysis",
            "duration_seconds",
        ] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
    }
}
