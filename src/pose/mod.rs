#[cfg(feature = "desktop")]
pub mod detector;
pub mod extractor;
pub mod keypoint;
#[cfg(feature = "desktop")]
pub mod preprocess;

#[cfg(feature = "desktop")]
pub use detector::YoloPoseDetector;
pub use extractor::KeypointExtractor;
pub use keypoint::{
    check_landmarks, FrameCheck, InvalidFrame, Keypoint, KeypointFrame, KeypointIndex, Point2,
};
#[cfg(feature = "desktop")]
pub use preprocess::{letterbox_for_yolo, LetterboxInfo};
