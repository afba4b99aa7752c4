//! Keypoints in, jump metrics out.
//!
//! [`Analyzer::analyze`] drives the whole pipeline: [`FrameSampler`] walks the
//! video, [`MotionSeries`] accumulates the tracks, [`JumpDetector`] finds the
//! apexes and the metrics/feedback modules turn them into an [`AnalysisResult`].

pub mod feedback;
pub mod jump;
pub mod metrics;
pub mod sampler;
pub mod signal;

pub use feedback::{SessionMetrics, Tip};
pub use jump::{JumpDetector, JumpEvent};
pub use metrics::AnalysisResult;
pub use sampler::FrameSampler;
pub use signal::MotionSeries;

use std::time::Duration;
use thiserror::Error;

use crate::config::AnalysisConfig;
use crate::pose::KeypointExtractor;
use crate::video::VideoSource;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("cannot open video {0}")]
    SourceUnreadable(String),

    #[error("analysis exceeded its {0:?} budget")]
    TimedOut(Duration),

    #[error(transparent)]
    Extraction(anyhow::Error),
}

pub struct Analyzer {
    config: AnalysisConfig,
    detector: JumpDetector,
}

impl Analyzer {
    pub fn new(config: AnalysisConfig) -> Self {
        let detector = JumpDetector::from_config(&config);
        Self { config, detector }
    }

    /// The container frame rate, or the configured fallback when it is unusable.
    pub fn effective_source_fps(&self, reported: Option<f64>) -> f64 {
        match reported {
            Some(fps) if fps.is_finite() && fps > 0.0 => fps,
            _ => {
                tracing::warn!(
                    "video reports no usable fps ({:?}), assuming {}",
                    reported,
                    self.config.fallback_fps
                );
                self.config.fallback_fps
            }
        }
    }

    /// Sample `source`, extract keypoints and compute the session metrics.
    pub fn analyze<S, E>(&self, source: S, extractor: &mut E) -> Result<AnalysisResult, AnalysisError>
    where
        S: VideoSource,
        E: KeypointExtractor<S::Frame> + ?Sized,
    {
        let fps = self.effective_source_fps(source.fps());
        let budget = self.config.timeout_secs.map(Duration::from_secs);

        let mut sampler = FrameSampler::new(source, extractor, self.config.stride).with_budget(budget);
        let mut series = MotionSeries::new();
        for frame in sampler.by_ref() {
            series.push(&frame?);
        }
        tracing::debug!(
            "decoded {} frames, {} valid, {} skipped",
            sampler.decoded(),
            series.frames_analyzed(),
            sampler.skipped()
        );

        let result = self.analyze_series(&series, fps);
        tracing::info!(
            "analysis: {} jumps over {:.1}s ({} frames, {:.1} spm)",
            result.count,
            result.duration_seconds,
            result.frames_analyzed,
            result.cadence_spm
        );
        Ok(result)
    }

    /// Metrics for an already-built series sampled from a `fps` video.
    pub fn analyze_series(&self, series: &MotionSeries, fps: f64) -> AnalysisResult {
        let stride = self.config.stride.max(1);
        let frames = series.frames_analyzed();
        let duration = metrics::duration_seconds(frames, stride, fps);

        if frames < self.config.min_frames {
            return AnalysisResult::insufficient(frames, duration);
        }

        let ground = self
            .detector
            .ground_reference(series.left_ankle_y(), series.right_ankle_y());
        let avg_height_cm = metrics::jump_height_cm(ground, series.ankle_y(), self.config.cm_per_px);

        let left_speed = metrics::mean_speed(series.left_wrist());
        let right_speed = metrics::mean_speed(series.right_wrist());
        let wrist_speed = (left_speed + right_speed) / 2.0;
        let symmetry = metrics::symmetry(left_speed, right_speed);

        let effective_fps = fps / stride as f64;
        let events = self.detector.detect(series.ankle_y(), wrist_speed, effective_fps);
        let count = events.len();

        let cadence = metrics::cadence_spm(count, duration);
        let misses = metrics::estimate_misses(count, wrist_speed, self.config.miss_speed_threshold);

        let tips = feedback::tips(&SessionMetrics {
            count,
            cadence_spm: cadence,
            avg_height_cm,
            symmetry,
            misses,
            frames_analyzed: frames,
            duration_seconds: duration,
        });

        AnalysisResult {
            count,
            cadence_spm: metrics::round1(cadence),
            avg_height_cm: metrics::round1(avg_height_cm),
            symmetry_score: symmetry,
            misses,
            frames_analyzed: frames,
            analysis: tips.iter().map(|t| t.message().to_string()).collect(),
            duration_seconds: duration,
        }
    }
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new(AnalysisConfig::default())
    }
}
