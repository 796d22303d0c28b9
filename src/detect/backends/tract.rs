#![cfg(feature = "backend-tract")]

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use image::{imageops::FilterType, RgbImage};
use tract_onnx::prelude::*;

use crate::detect::backend::DetectorBackend;
use crate::detect::result::{Detection, MAX_CLASS_ID};
use crate::geometry::BoundingBox;

/// Tract-based backend for YOLOv8-style ONNX detectors.
///
/// The model takes a `1x3xSxS` float tensor and returns `1x(4+C)xN` rows of
/// `cx, cy, w, h` followed by one score per class. Frames are resized (no
/// letterboxing) to the model input and boxes are scaled back afterwards.
pub struct TractBackend {
    model: TypedRunnableModel<TypedModel>,
    input_size: u32,
    confidence_threshold: f32,
    iou_threshold: f32,
}

impl TractBackend {
    /// Load an ONNX model from disk and prepare it for inference.
    pub fn new<P: AsRef<Path>>(model_path: P, input_size: u32) -> Result<Self> {
        let model_path = model_path.as_ref();
        let side = input_size as usize;
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(0, f32::fact([1, 3, side, side]).into())
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        Ok(Self {
            model,
            input_size,
            confidence_threshold: 0.25,
            iou_threshold: 0.45,
        })
    }

    /// Override the default confidence threshold.
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    /// Override the default non-maximum suppression IoU threshold.
    pub fn with_iou_threshold(mut self, threshold: f32) -> Self {
        self.iou_threshold = threshold;
        self
    }

    fn build_input(&self, pixels: &[u8], width: u32, height: u32) -> Result<Tensor> {
        let frame = RgbImage::from_raw(width, height, pixels.to_vec()).ok_or_else(|| {
            anyhow!(
                "expected {} RGB bytes for {}x{}, received {}",
                width as usize * height as usize * 3,
                width,
                height,
                pixels.len()
            )
        })?;
        let resized = image::imageops::resize(
            &frame,
            self.input_size,
            self.input_size,
            FilterType::Triangle,
        );

        let side = self.input_size as usize;
        let input =
            tract_ndarray::Array4::from_shape_fn((1, 3, side, side), |(_, channel, y, x)| {
                resized.get_pixel(x as u32, y as u32)[channel] as f32 / 255.0
            });

        Ok(input.into_tensor())
    }

    fn decode(&self, outputs: TVec<TValue>, sx: f32, sy: f32) -> Result<Vec<Detection>> {
        let output = outputs
            .first()
            .ok_or_else(|| anyhow!("model produced no outputs"))?;
        let view = output
            .to_array_view::<f32>()
            .context("model output tensor was not f32")?;
        let shape = view.shape().to_vec();
        if shape.len() != 3 || shape[0] != 1 || shape[1] < 5 {
            return Err(anyhow!("unexpected model output shape {:?}", shape));
        }
        let view = view
            .into_dimensionality::<tract_ndarray::Ix3>()
            .context("model output was not rank 3")?;
        let num_classes = (shape[1] - 4).min(MAX_CLASS_ID as usize + 1);

        let mut candidates = Vec::new();
        for anchor in 0..shape[2] {
            let mut best_class = 0usize;
            let mut best_score = f32::NEG_INFINITY;
            for class in 0..num_classes {
                let score = view[[0, 4 + class, anchor]];
                if score > best_score {
                    best_score = score;
                    best_class = class;
                }
            }
            if best_score.is_nan() || best_score < self.confidence_threshold {
                continue;
            }
            let bbox = BoundingBox::from_center(
                view[[0, 0, anchor]],
                view[[0, 1, anchor]],
                view[[0, 2, anchor]],
                view[[0, 3, anchor]],
            )
            .scaled(sx, sy);
            candidates.push(Detection::new(best_class as u32, best_score, bbox));
        }

        Ok(non_max_suppression(candidates, self.iou_threshold))
    }
}

/// Per-class greedy suppression, highest confidence first.
fn non_max_suppression(mut candidates: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    let mut kept: Vec<Detection> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let suppressed = kept.iter().any(|k| {
            k.class_id == candidate.class_id && k.bbox.iou(&candidate.bbox) > iou_threshold
        });
        if !suppressed {
            kept.push(candidate);
        }
    }
    kept
}

impl DetectorBackend for TractBackend {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn detect(&mut self, pixels: &[u8], width: u32, height: u32) -> Result<Vec<Detection>> {
        let input = self.build_input(pixels, width, height)?;
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .context("ONNX inference failed")?;
        let sx = width as f32 / self.input_size as f32;
        let sy = height as f32 / self.input_size as f32;
        self.decode(outputs, sx, sy)
    }

    /// One blank frame at model resolution so the first request does not pay
    /// for lazy allocations.
    fn warm_up(&mut self) -> Result<()> {
        let side = self.input_size;
        let pixels = vec![0u8; side as usize * side as usize * 3];
        self.detect(&pixels, side, side).map(|_| ())
    }
}
