//! ROI gating.
//!
//! A detection counts as inside the alarm region when enough of the *box* lies
//! in the region: `intersection(box, region) / area(box) >= threshold`.
//! The denominator is the box area, not the union, so a small box fully
//! inside a large region scores 1.0.

use crate::detect::{BoundingBox, Detection, GatedDetection};
use crate::frame::PixelRect;

/// Share of `bbox` covered by `region`, in `[0, 1]`. Zero-area boxes score 0.
pub fn containment_ratio(bbox: &BoundingBox, region: &PixelRect) -> f32 {
    let box_area = bbox.area();
    if box_area <= 0 {
        return 0.0;
    }
    let ix1 = (bbox.x1 as i64).max(region.x as i64);
    let iy1 = (bbox.y1 as i64).max(region.y as i64);
    let ix2 = (bbox.x2 as i64).min(region.right() as i64);
    let iy2 = (bbox.y2 as i64).min(region.bottom() as i64);
    let inter = (ix2 - ix1).max(0) * (iy2 - iy1).max(0);
    (inter as f64 / box_area as f64) as f32
}

#[derive(Clone, Copy, Debug)]
pub struct RoiGate {
    enabled: bool,
    threshold: f32,
}

impl RoiGate {
    pub fn new(enabled: bool, threshold: f32) -> Self {
        Self { enabled, threshold }
    }

    /// Gate that lets everything through.
    pub fn disabled() -> Self {
        Self::new(false, 0.0)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn gate_one(&self, detection: Detection, region: &PixelRect) -> GatedDetection {
        if !self.enabled {
            return GatedDetection {
                detection,
                containment: 1.0,
                inside: true,
            };
        }
        let containment = containment_ratio(&detection.bbox, region);
        GatedDetection {
            detection,
            containment,
            inside: containment >= self.threshold,
        }
    }

    /// Gate a batch, preserving order.
    pub fn gate(&self, detections: Vec<Detection>, region: &PixelRect) -> Vec<GatedDetection> {
        detections
            .into_iter()
            .map(|d| self.gate_one(d, region))
            .collect()
    }
}
