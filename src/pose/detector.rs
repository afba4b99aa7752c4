use anyhow::{Context, Result};
use opencv::{core::Mat, prelude::*};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Tensor;
use std::path::Path;

use super::extractor::KeypointExtractor;
use super::keypoint::{Keypoint, KeypointIndex};
use super::preprocess::letterbox_for_yolo;
use crate::config::PoseConfig;

/// Channels ahead of the keypoint triplets: cx, cy, w, h, person score.
const BOX_CHANNELS: usize = 5;

/// YOLOv8-pose (ONNX) single-person keypoint extractor.
///
/// Picks the highest-scoring person; keypoints come back in source-frame pixels.
pub struct YoloPoseDetector {
    session: Session,
    input_size: i32,
    score_threshold: f32,
    keypoint_threshold: f32,
}

fn build_session(model_path: &Path) -> Result<Session> {
    let builder = Session::builder()?.with_optimization_level(GraphOptimizationLevel::Level3)?;

    #[cfg(feature = "cuda")]
    let builder = {
        tracing::info!("attempting CUDA execution provider");
        builder.with_execution_providers([
            ort::execution_providers::CUDAExecutionProvider::default().build()
        ])?
    };

    builder
        .commit_from_file(model_path)
        .with_context(|| format!("Failed to load ONNX model {}", model_path.display()))
}

impl YoloPoseDetector {
    pub fn new<P: AsRef<Path>>(model_path: P, config: &PoseConfig) -> Result<Self> {
        Ok(Self {
            session: build_session(model_path.as_ref())?,
            input_size: config.input_size,
            score_threshold: config.score_threshold,
            keypoint_threshold: config.keypoint_threshold,
        })
    }

    pub fn from_config(config: &PoseConfig) -> Result<Self> {
        Self::new(&config.model_path, config)
    }

    pub fn detect(&mut self, frame: &Mat) -> Result<Option<Vec<Keypoint>>> {
        let (input, letterbox) = letterbox_for_yolo(frame, self.input_size)?;
        let input_tensor = Tensor::from_array(input)?;
        let outputs = self
            .session
            .run(ort::inputs!["images" => input_tensor])
            .context("Pose inference failed")?;

        // [1, 5 + 17 * 3, N]
        let output: ndarray::ArrayViewD<f32> = outputs["output0"]
            .try_extract_array()
            .context("Failed to extract pose output")?;
        let shape = output.shape();
        if shape.len() != 3 || shape[1] < BOX_CHANNELS + KeypointIndex::COUNT * 3 {
            anyhow::bail!("unexpected pose output shape {:?}", shape);
        }

        let mut best_score = self.score_threshold;
        let mut best_idx: Option<usize> = None;
        for i in 0..shape[2] {
            let score = output[[0, 4, i]];
            if score >= best_score {
                best_score = score;
                best_idx = Some(i);
            }
        }
        let Some(idx) = best_idx else {
            return Ok(None);
        };

        let keypoints = (0..KeypointIndex::COUNT)
            .map(|k| {
                let base = BOX_CHANNELS + k * 3;
                let confidence = output[[0, base + 2, idx]];
                // Ultralytics zeroes low-visibility landmarks instead of dropping them
                if confidence < self.keypoint_threshold {
                    return Keypoint::new(0.0, 0.0, confidence);
                }
                let (x, y) = letterbox.to_frame(output[[0, base, idx]], output[[0, base + 1, idx]]);
                Keypoint::new(x, y, confidence)
            })
            .collect();

        Ok(Some(keypoints))
    }
}

impl KeypointExtractor<Mat> for YoloPoseDetector {
    fn extract(&mut self, frame: &Mat) -> Result<Option<Vec<Keypoint>>> {
        if frame.empty() {
            return Ok(None);
        }
        self.detect(frame)
    }
}
