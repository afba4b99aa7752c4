use anyhow::{Context, Result};
use opencv::{
    core::Mat,
    prelude::*,
    videoio::{self, VideoCapture, VideoCaptureAPIs},
};
use std::path::Path;

use super::VideoSource;
use crate::analysis::AnalysisError;

/// Backends tried in order when opening a file.
const BACKENDS: [VideoCaptureAPIs; 2] = [VideoCaptureAPIs::CAP_ANY, VideoCaptureAPIs::CAP_FFMPEG];

/// Video file decoded through OpenCV. The capture is released on drop.
pub struct OpenCvVideo {
    capture: VideoCapture,
    fps: Option<f64>,
}

impl OpenCvVideo {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, AnalysisError> {
        let path = path.as_ref();
        let name = path.to_string_lossy();

        for backend in BACKENDS {
            match VideoCapture::from_file(&name, backend as i32) {
                Ok(capture) if capture.is_opened().unwrap_or(false) => {
                    let fps = capture.get(videoio::CAP_PROP_FPS).ok();
                    tracing::debug!("opened {} with {:?} (fps {:?})", name, backend, fps);
                    return Ok(Self { capture, fps });
                }
                Ok(_) => tracing::debug!("{:?} could not open {}", backend, name),
                Err(e) => tracing::debug!("{:?} failed on {}: {}", backend, name, e),
            }
        }

        Err(AnalysisError::SourceUnreadable(name.into_owned()))
    }
}

impl VideoSource for OpenCvVideo {
    type Frame = Mat;

    fn fps(&self) -> Option<f64> {
        self.fps
    }

    fn next_frame(&mut self) -> Result<Option<Mat>> {
        let mut frame = Mat::default();
        let ok = self
            .capture
            .read(&mut frame)
            .context("Failed to read frame")?;

        if !ok || frame.empty() {
            return Ok(None);
        }
        Ok(Some(frame))
    }
}

impl Drop for OpenCvVideo {
    fn drop(&mut self) {
        if let Err(e) = self.capture.release() {
            tracing::warn!("failed to release video capture: {}", e);
        }
    }
}
