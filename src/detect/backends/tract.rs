#![cfg(feature = "backend-tract")]

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use tract_onnx::prelude::*;

use crate::detect::backend::DetectionService;
use crate::detect::result::RawDetection;
use crate::frame::{Frame, RGB_CHANNELS};

/// IoU above which a lower-scored box of the same class is suppressed.
const NMS_IOU_THRESHOLD: f32 = 0.45;

/// Tract-based backend for Ultralytics YOLO ONNX exports.
///
/// Expects a single `[1, 3, imgsz, imgsz]` f32 input and a `[1, 4 + classes, anchors]`
/// output where the first four rows are `cx, cy, w, h` in input pixels.
/// The image is stretched to `imgsz` (no letterboxing) and boxes are scaled back.
pub struct TractYoloBackend {
    model: TypedRunnableModel<TypedModel>,
    imgsz: u32,
}

impl TractYoloBackend {
    /// Load an ONNX model from disk and prepare it for inference at `imgsz`.
    pub fn load<P: AsRef<Path>>(model_path: P, imgsz: u32) -> Result<Self> {
        let model_path = model_path.as_ref();
        let side = imgsz as usize;
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(f32::datum_type(), tvec!(1, 3, side, side)),
            )
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        Ok(Self { model, imgsz })
    }

    /// Nearest-neighbour resize into a normalized CHW tensor.
    fn build_input(&self, image: &Frame) -> Tensor {
        let side = self.imgsz as usize;
        let (src_w, src_h) = (image.width() as usize, image.height() as usize);
        let pixels = image.pixels();
        let input = tract_ndarray::Array4::from_shape_fn((1, 3, side, side), |(_, c, y, x)| {
            let sx = (x * src_w / side).min(src_w - 1);
            let sy = (y * src_h / side).min(src_h - 1);
            pixels[(sy * src_w + sx) * RGB_CHANNELS + c] as f32 / 255.0
        });
        input.into_tensor()
    }

    fn decode(
        &self,
        outputs: TVec<TValue>,
        conf_threshold: f32,
        scale_x: f32,
        scale_y: f32,
    ) -> Result<Vec<RawDetection>> {
        let output = outputs
            .first()
            .ok_or_else(|| anyhow!("model produced no outputs"))?;
        let view = output
            .to_array_view::<f32>()
            .context("model output tensor was not f32")?
            .into_dimensionality::<tract_ndarray::Ix3>()
            .context("expected a [1, 4 + classes, anchors] output")?;
        let (_, rows, anchors) = view.dim();
        if rows <= 4 {
            return Err(anyhow!("model output has no class rows ({} rows)", rows));
        }

        let mut candidates = Vec::new();
        for a in 0..anchors {
            let (class_id, score) = (4..rows)
                .map(|r| (r - 4, view[[0, r, a]]))
                .fold((0, f32::NEG_INFINITY), |best, cur| {
                    if cur.1 > best.1 {
                        cur
                    } else {
                        best
                    }
                });
            if !score.is_finite() || score < conf_threshold {
                continue;
            }
            let (cx, cy) = (view[[0, 0, a]], view[[0, 1, a]]);
            let (w, h) = (view[[0, 2, a]], view[[0, 3, a]]);
            candidates.push(RawDetection {
                class_id: class_id as u32,
                confidence: score,
                x1: (cx - w / 2.0) * scale_x,
                y1: (cy - h / 2.0) * scale_y,
                x2: (cx + w / 2.0) * scale_x,
                y2: (cy + h / 2.0) * scale_y,
            });
        }
        Ok(non_max_suppression(candidates, NMS_IOU_THRESHOLD))
    }
}

impl DetectionService for TractYoloBackend {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn infer(&mut self, image: &Frame, conf_threshold: f32, imgsz: u32) -> Result<Vec<RawDetection>> {
        if imgsz != self.imgsz {
            return Err(anyhow!(
                "model was prepared for imgsz {}, asked for {}",
                self.imgsz,
                imgsz
            ));
        }
        if image.is_empty() {
            return Ok(Vec::new());
        }
        let input = self.build_input(image);
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .context("ONNX inference failed")?;
        let scale_x = image.width() as f32 / self.imgsz as f32;
        let scale_y = image.height() as f32 / self.imgsz as f32;
        self.decode(outputs, conf_threshold, scale_x, scale_y)
    }

    fn warm_up(&mut self) -> Result<()> {
        let side = self.imgsz;
        let blank = Frame::filled(side, side, [114, 114, 114])?;
        self.infer(&blank, 1.0, side).map(|_| ())
    }
}

/// Greedy per-class NMS, highest confidence first.
fn non_max_suppression(mut boxes: Vec<RawDetection>, iou_threshold: f32) -> Vec<RawDetection> {
    boxes.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    let mut kept: Vec<RawDetection> = Vec::new();
    for candidate in boxes {
        let overlaps = kept
            .iter()
            .any(|k| k.class_id == candidate.class_id && iou(k, &candidate) > iou_threshold);
        if !overlaps {
            kept.push(candidate);
        }
    }
    kept
}

fn iou(a: &RawDetection, b: &RawDetection) -> f32 {
    let ix = (a.x2.min(b.x2) - a.x1.max(b.x1)).max(0.0);
    let iy = (a.y2.min(b.y2) - a.y1.max(b.y1)).max(0.0);
    let inter = ix * iy;
    let area_a = (a.x2 - a.x1) * (a.y2 - a.y1);
    let area_b = (b.x2 - b.x1) * (b.y2 - b.y1);
    let union = area_a + area_b - inter;
    if union <= 0.0 {
        0.0
    } else {
        inter / union
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boxed(class_id: u32, confidence: f32, x1: f32, x2: f32) -> RawDetection {
        RawDetection {
            class_id,
            confidence,
            x1,
            y1: 0.0,
            x2,
            y2: 10.0,
        }
    }

    #[test]
    fn nms_keeps_best_box_per_class() {
        let kept = non_max_suppression(
            vec![
                boxed(0, 0.5, 0.0, 10.0),
                boxed(0, 0.9, 1.0, 11.0),
                boxed(1, 0.6, 0.0, 10.0),
                boxed(0, 0.7, 50.0, 60.0),
            ],
            NMS_IOU_THRESHOLD,
        );
        let scores: Vec<f32> = kept.iter().map(|d| d.confidence).collect();
        assert_eq!(scores, vec![0.9, 0.7, 0.6]);
    }
}
