use std::fmt;

/// COCO 17-landmark indices, as emitted by YOLOv8-pose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum KeypointIndex {
    Nose = 0,
    LeftEye = 1,
    RightEye = 2,
    LeftEar = 3,
    RightEar = 4,
    LeftShoulder = 5,
    RightShoulder = 6,
    LeftElbow = 7,
    RightElbow = 8,
    LeftWrist = 9,
    RightWrist = 10,
    LeftHip = 11,
    RightHip = 12,
    LeftKnee = 13,
    RightKnee = 14,
    LeftAnkle = 15,
    RightAnkle = 16,
}

impl KeypointIndex {
    pub const COUNT: usize = 17;

    /// Landmarks the jump pipeline reads from every frame.
    pub const REQUIRED: [KeypointIndex; 6] = [
        Self::LeftWrist,
        Self::RightWrist,
        Self::LeftHip,
        Self::RightHip,
        Self::LeftAnkle,
        Self::RightAnkle,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Nose => "nose",
            Self::LeftEye => "left_eye",
            Self::RightEye => "right_eye",
            Self::LeftEar => "left_ear",
            Self::RightEar => "right_ear",
            Self::LeftShoulder => "left_shoulder",
            Self::RightShoulder => "right_shoulder",
            Self::LeftElbow => "left_elbow",
            Self::RightElbow => "right_elbow",
            Self::LeftWrist => "left_wrist",
            Self::RightWrist => "right_wrist",
            Self::LeftHip => "left_hip",
            Self::RightHip => "right_hip",
            Self::LeftKnee => "left_knee",
            Self::RightKnee => "right_knee",
            Self::LeftAnkle => "left_ankle",
            Self::RightAnkle => "right_ankle",
        }
    }
}

/// A single landmark in image pixel coordinates (y grows downwards).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Keypoint {
    pub x: f32,
    pub y: f32,
    pub confidence: f32,
}

impl Keypoint {
    pub fn new(x: f32, y: f32, confidence: f32) -> Self {
        Self { x, y, confidence }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    pub fn point(&self) -> Point2 {
        Point2::new(self.x as f64, self.y as f64)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point2) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// The six landmarks of one sampled frame. Only built through [`check_landmarks`],
/// so every point is present and finite.
#[derive(Debug, Clone, PartialEq)]
pub struct KeypointFrame {
    /// 1-based position of the frame in the decoded stream.
    pub index: usize,
    pub left_wrist: Point2,
    pub right_wrist: Point2,
    pub left_hip: Point2,
    pub right_hip: Point2,
    pub left_ankle: Point2,
    pub right_ankle: Point2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidFrame {
    NoDetection,
    TooFewLandmarks { found: usize },
    NonFinite { landmark: KeypointIndex },
}

impl fmt::Display for InvalidFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoDetection => write!(f, "no person detected"),
            Self::TooFewLandmarks { found } => {
                write!(f, "expected {} landmarks, got {}", KeypointIndex::COUNT, found)
            }
            Self::NonFinite { landmark } => write!(f, "{} is not finite", landmark.name()),
        }
    }
}

/// Outcome of validating one extractor result.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameCheck {
    Valid(KeypointFrame),
    Invalid(InvalidFrame),
}

/// Validate raw extractor output for the frame at `index`.
///
/// `None` means the extractor found nobody. A detection must carry the full
/// 17-landmark layout and finite coordinates for every required landmark.
pub fn check_landmarks(index: usize, landmarks: Option<&[Keypoint]>) -> FrameCheck {
    let Some(landmarks) = landmarks else {
        return FrameCheck::Invalid(InvalidFrame::NoDetection);
    };
    if landmarks.len() < KeypointIndex::COUNT {
        return FrameCheck::Invalid(InvalidFrame::TooFewLandmarks {
            found: landmarks.len(),
        });
    }
    for landmark in KeypointIndex::REQUIRED {
        if !landmarks[landmark as usize].is_finite() {
            return FrameCheck::Invalid(InvalidFrame::NonFinite { landmark });
        }
    }

    let at = |k: KeypointIndex| landmarks[k as usize].point();
    FrameCheck::Valid(KeypointFrame {
        index,
        left_wrist: at(KeypointIndex::LeftWrist),
        right_wrist: at(KeypointIndex::RightWrist),
        left_hip: at(KeypointIndex::LeftHip),
        right_hip: at(KeypointIndex::RightHip),
        left_ankle: at(KeypointIndex::LeftAnkle),
        right_ankle: at(KeypointIndex::RightAnkle),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_pose() -> Vec<Keypoint> {
        (0..KeypointIndex::COUNT)
            .map(|i| Keypoint::new(i as f32, 10.0 * i as f32, 0.9))
            .collect()
    }

    #[test]
    fn test_required_landmarks_match_coco_layout() {
        let idx: Vec<usize> = KeypointIndex::REQUIRED.iter().map(|k| *k as usize).collect();
        assert_eq!(idx, vec![9, 10, 11, 12, 15, 16]);
    }

    #[test]
    fn test_point_distance() {
        let a = Point2::new(0.0, 0.0);
        let b = Point2::new(3.0, 4.0);
        assert!((a.distance(&b) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_check_valid_frame() {
        let pose = full_pose();
        match check_landmarks(6, Some(&pose)) {
            FrameCheck::Valid(frame) => {
                assert_eq!(frame.index, 6);
                assert_eq!(frame.left_wrist, Point2::new(9.0, 90.0));
                assert_eq!(frame.right_ankle, Point2::new(16.0, 160.0));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_check_no_detection() {
        assert_eq!(
            check_landmarks(3, None),
            FrameCheck::Invalid(InvalidFrame::NoDetection)
        );
    }

    #[test]
    fn test_check_too_few_landmarks() {
        let pose = &full_pose()[..12];
        assert_eq!(
            check_landmarks(3, Some(pose)),
            FrameCheck::Invalid(InvalidFrame::TooFewLandmarks { found: 12 })
        );
    }

    #[test]
    fn test_check_non_finite_required_landmark() {
        let mut pose = full_pose();
        pose[KeypointIndex::LeftHip as usize].y = f32::NAN;
        assert_eq!(
            check_landmarks(3, Some(&pose)),
            FrameCheck::Invalid(InvalidFrame::NonFinite {
                landmark: KeypointIndex::LeftHip
            })
        );
    }

    #[test]
    fn test_non_finite_unused_landmark_is_ignored() {
        let mut pose = full_pose();
        pose[KeypointIndex::Nose as usize].x = f32::INFINITY;
        assert!(matches!(check_landmarks(3, Some(&pose)), FrameCheck::Valid(_)));
    }
}
