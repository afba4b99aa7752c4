use anyhow::Result;

use super::keypoint::Keypoint;

/// Turns one decoded frame into body landmarks.
///
/// `Ok(None)` means nobody was detected; the sampler skips the frame. An `Err`
/// is a hard failure (model or decoder broke) and aborts the analysis.
pub trait KeypointExtractor<F> {
    fn extract(&mut self, frame: &F) -> Result<Option<Vec<Keypoint>>>;
}

impl<F, E: KeypointExtractor<F> + ?Sized> KeypointExtractor<F> for &mut E {
    fn extract(&mut self, frame: &F) -> Result<Option<Vec<Keypoint>>> {
        (**self).extract(frame)
    }
}

impl<F, E: KeypointExtractor<F> + ?Sized> KeypointExtractor<F> for Box<E> {
    fn extract(&mut self, frame: &F) -> Result<Option<Vec<Keypoint>>> {
        (**self).extract(frame)
    }
}
