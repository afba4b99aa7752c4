use std::time::{Duration, Instant};

use super::AnalysisError;
use crate::pose::{check_landmarks, FrameCheck, KeypointExtractor, KeypointFrame};
use crate::video::VideoSource;

/// Lazily walks a video at a fixed stride and yields validated keypoint frames.
///
/// Only frames whose 1-based decode position is a multiple of `stride` reach the
/// extractor. Invalid detections are dropped and counted in [`skipped`](Self::skipped).
/// The source is dropped (and so released) as soon as iteration ends or fails.
pub struct FrameSampler<'e, S: VideoSource, E: ?Sized> {
    source: Option<S>,
    extractor: &'e mut E,
    stride: usize,
    decoded: usize,
    skipped: usize,
    deadline: Option<(Instant, Duration)>,
}

impl<'e, S, E> FrameSampler<'e, S, E>
where
    S: VideoSource,
    E: KeypointExtractor<S::Frame> + ?Sized,
{
    pub fn new(source: S, extractor: &'e mut E, stride: usize) -> Self {
        Self {
            source: Some(source),
            extractor,
            stride: stride.max(1),
            decoded: 0,
            skipped: 0,
            deadline: None,
        }
    }

    /// Abort with [`AnalysisError::TimedOut`] once `budget` has elapsed from now.
    pub fn with_budget(mut self, budget: Option<Duration>) -> Self {
        self.deadline = budget.map(|b| (Instant::now() + b, b));
        self
    }

    /// Frames decoded so far, visited or not.
    pub fn decoded(&self) -> usize {
        self.decoded
    }

    /// Visited frames that failed validation.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    fn release(&mut self) {
        self.source = None;
    }

    fn step(&mut self) -> Result<Option<KeypointFrame>, AnalysisError> {
        loop {
            let Some(source) = self.source.as_mut() else {
                return Ok(None);
            };
            if let Some((deadline, budget)) = self.deadline {
                if Instant::now() >= deadline {
                    return Err(AnalysisError::TimedOut(budget));
                }
            }
            let Some(frame) = source.next_frame().map_err(AnalysisError::Extraction)? else {
                return Ok(None);
            };
            self.decoded += 1;
            if self.decoded % self.stride != 0 {
                continue;
            }

            let landmarks = self
                .extractor
                .extract(&frame)
                .map_err(AnalysisError::Extraction)?;
            match check_landmarks(self.decoded, landmarks.as_deref()) {
                FrameCheck::Valid(kf) => return Ok(Some(kf)),
                FrameCheck::Invalid(reason) => {
                    self.skipped += 1;
                    tracing::debug!("frame {} skipped: {}", self.decoded, reason);
                }
            }
        }
    }
}

impl<'e, S, E> Iterator for FrameSampler<'e, S, E>
where
    S: VideoSource,
    E: KeypointExtractor<S::Frame> + ?Sized,
{
    type Item = Result<KeypointFrame, AnalysisError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.step() {
            Ok(Some(frame)) => Some(Ok(frame)),
            Ok(None) => {
                self.release();
                None
            }
            Err(e) => {
                self.release();
                Some(Err(e))
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::fakes::*;
    use super::*;
    use crate::pose::KeypointIndex;

    fn still() -> Option<Vec<crate::pose::Keypoint>> {
        Some(pose(400.0, (50.0, 200.0), (150.0, 200.0)))
    }

    #[test]
    fn test_visits_every_stride_frame() {
        let video = ScriptedVideo::new(vec![still(); 10], Some(30.0));
        let mut extractor = PassThrough::default();
        let frames: Vec<_> = FrameSampler::new(video, &mut extractor, 3)
            .collect::<Result<_, _>>()
            .unwrap();

        let indices: Vec<usize> = frames.iter().map(|f| f.index).collect();
        assert_eq!(indices, vec![3, 6, 9]);
        assert_eq!(extractor.calls, 3);
    }

    #[test]
    fn test_skips_invalid_frames() {
        let mut broken = pose(400.0, (50.0, 200.0), (150.0, 200.0));
        broken[KeypointIndex::RightAnkle as usize].y = f32::NAN;
        let short = Some(broken[..10].to_vec());
        let video = ScriptedVideo::new(vec![still(), None, short, Some(broken), still()], None);

        let mut extractor = PassThrough::default();
        let mut sampler = FrameSampler::new(video, &mut extractor, 1);
        let frames: Vec<_> = sampler.by_ref().collect::<Result<_, _>>().unwrap();

        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1].index, 5);
        assert_eq!(sampler.skipped(), 3);
        assert_eq!(sampler.decoded(), 5);
    }

    #[test]
    fn test_releases_source_at_end() {
        let video = ScriptedVideo::new(vec![still(); 4], None);
        let released = video.released.clone();
        let mut extractor = PassThrough::default();
        let mut sampler = FrameSampler::new(video, &mut extractor, 2);

        while sampler.next().is_some() {}
        assert!(released.get());
    }

    #[test]
    fn test_zero_budget_times_out_and_releases() {
        let video = ScriptedVideo::new(vec![still(); 4], None);
        let released = video.released.clone();
        let mut extractor = PassThrough::default();
        let mut sampler =
            FrameSampler::new(video, &mut extractor, 1).with_budget(Some(Duration::ZERO));

        assert!(matches!(sampler.next(), Some(Err(AnalysisError::TimedOut(_)))));
        assert!(released.get());
        assert!(sampler.next().is_none());
    }
}
