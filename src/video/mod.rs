#[cfg(feature = "desktop")]
pub mod capture;

#[cfg(feature = "desktop")]
pub use capture::OpenCvVideo;

use anyhow::Result;

/// A decoded, forward-only frame stream.
pub trait VideoSource {
    type Frame;

    /// Container frame rate, if the backend reports one.
    fn fps(&self) -> Option<f64>;

    /// Next decoded frame, or `None` at end of stream.
    fn next_frame(&mut self) -> Result<Option<Self::Frame>>;
}
