use crate::pose::{KeypointFrame, Point2};

/// Per-frame motion tracks, index-aligned in sampling order.
///
/// Every series has the same length, one entry per valid sampled frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MotionSeries {
    left_ankle_y: Vec<f64>,
    right_ankle_y: Vec<f64>,
    ankle_y: Vec<f64>,
    hip_y: Vec<f64>,
    left_wrist: Vec<Point2>,
    right_wrist: Vec<Point2>,
}

impl MotionSeries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, frame: &KeypointFrame) {
        let la = frame.left_ankle.y;
        let ra = frame.right_ankle.y;
        self.left_ankle_y.push(la);
        self.right_ankle_y.push(ra);
        self.ankle_y.push((la + ra) / 2.0);
        self.hip_y.push((frame.left_hip.y + frame.right_hip.y) / 2.0);
        self.left_wrist.push(frame.left_wrist);
        self.right_wrist.push(frame.right_wrist);
    }

    pub fn frames_analyzed(&self) -> usize {
        self.ankle_y.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ankle_y.is_empty()
    }

    /// Mean of both ankles.
    pub fn ankle_y(&self) -> &[f64] {
        &self.ankle_y
    }

    pub fn left_ankle_y(&self) -> &[f64] {
        &self.left_ankle_y
    }

    pub fn right_ankle_y(&self) -> &[f64] {
        &self.right_ankle_y
    }

    /// Mean of both hips.
    pub fn hip_y(&self) -> &[f64] {
        &self.hip_y
    }

    pub fn left_wrist(&self) -> &[Point2] {
        &self.left_wrist
    }

    pub fn right_wrist(&self) -> &[Point2] {
        &self.right_wrist
    }
}

impl<'a> Extend<&'a KeypointFrame> for MotionSeries {
    fn extend<I: IntoIterator<Item = &'a KeypointFrame>>(&mut self, iter: I) {
        for frame in iter {
            self.push(frame);
        }
    }
}

impl<'a> FromIterator<&'a KeypointFrame> for MotionSeries {
    fn from_iter<I: IntoIterator<Item = &'a KeypointFrame>>(iter: I) -> Self {
        let mut series = Self::new();
        series.extend(iter);
        series
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(index: usize, left_ankle: f64, right_ankle: f64) -> KeypointFrame {
        KeypointFrame {
            index,
            left_wrist: Point2::new(1.0, 2.0),
            right_wrist: Point2::new(3.0, 4.0),
            left_hip: Point2::new(0.0, 100.0),
            right_hip: Point2::new(0.0, 110.0),
            left_ankle: Point2::new(0.0, left_ankle),
            right_ankle: Point2::new(0.0, right_ankle),
        }
    }

    #[test]
    fn test_series_stay_aligned() {
        let frames = [frame(3, 400.0, 410.0), frame(6, 380.0, 390.0)];
        let series: MotionSeries = frames.iter().collect();

        assert_eq!(series.frames_analyzed(), 2);
        assert_eq!(series.ankle_y(), &[405.0, 385.0]);
        assert_eq!(series.left_ankle_y(), &[400.0, 380.0]);
        assert_eq!(series.hip_y(), &[105.0, 105.0]);
        assert_eq!(series.left_wrist().len(), 2);
        assert_eq!(series.right_wrist()[1], Point2::new(3.0, 4.0));
    }

    #[test]
    fn test_empty_series() {
        let series = MotionSeries::new();
        assert!(series.is_empty());
        assert_eq!(series.frames_analyzed(), 0);
    }
}
