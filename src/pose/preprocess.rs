use anyhow::Result;
use ndarray::Array4;
use opencv::{
    core::{self, Mat, Scalar, Size, Vec3b},
    imgproc,
    prelude::*,
};

/// Ultralytics pads with this grey level.
const PAD_VALUE: f64 = 114.0;

/// How a frame was fitted into the square model input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LetterboxInfo {
    pub scale: f32,
    pub pad_x: f32,
    pub pad_y: f32,
}

impl LetterboxInfo {
    pub fn new(frame_w: i32, frame_h: i32, input_size: i32) -> Self {
        let scale = (input_size as f32 / frame_w as f32).min(input_size as f32 / frame_h as f32);
        let new_w = (frame_w as f32 * scale).round();
        let new_h = (frame_h as f32 * scale).round();
        Self {
            scale,
            pad_x: (input_size as f32 - new_w) / 2.0,
            pad_y: (input_size as f32 - new_h) / 2.0,
        }
    }

    /// Model-input coordinates back to source-frame pixels.
    pub fn to_frame(&self, x: f32, y: f32) -> (f32, f32) {
        ((x - self.pad_x) / self.scale, (y - self.pad_y) / self.scale)
    }
}

/// BGR frame -> NCHW [1, 3, size, size] RGB tensor in [0, 1], aspect-preserving.
pub fn letterbox_for_yolo(frame: &Mat, input_size: i32) -> Result<(Array4<f32>, LetterboxInfo)> {
    let info = LetterboxInfo::new(frame.cols(), frame.rows(), input_size);
    let new_w = (frame.cols() as f32 * info.scale).round() as i32;
    let new_h = (frame.rows() as f32 * info.scale).round() as i32;

    let mut rgb = Mat::default();
    imgproc::cvt_color_def(frame, &mut rgb, imgproc::COLOR_BGR2RGB)?;

    let mut resized = Mat::default();
    imgproc::resize(
        &rgb,
        &mut resized,
        Size::new(new_w, new_h),
        0.0,
        0.0,
        imgproc::INTER_LINEAR,
    )?;

    let top = (info.pad_y - 0.1).round() as i32;
    let left = (info.pad_x - 0.1).round() as i32;
    let bottom = input_size - new_h - top;
    let right = input_size - new_w - left;
    let mut padded = Mat::default();
    core::copy_make_border(
        &resized,
        &mut padded,
        top,
        bottom,
        left,
        right,
        core::BORDER_CONSTANT,
        Scalar::all(PAD_VALUE),
    )?;

    let s = input_size as usize;
    let mut tensor = Array4::<f32>::zeros((1, 3, s, s));
    for y in 0..input_size {
        for x in 0..input_size {
            let pixel = padded.at_2d::<Vec3b>(y, x)?;
            for c in 0..3 {
                tensor[[0, c, y as usize, x as usize]] = pixel[c] as f32 / 255.0;
            }
        }
    }

    Ok((tensor, info))
}
