/// Raw output of a detection service, relative to the image it was given.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RawDetection {
    pub class_id: u32,
    pub confidence: f32,
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

/// Integer box in full-frame pixel space. Always `x1 <= x2` and `y1 <= y2`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BoundingBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl BoundingBox {
    /// Build a box, reordering corners so the min/max invariant holds.
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self {
            x1: x1.min(x2),
            y1: y1.min(y2),
            x2: x1.max(x2),
            y2: y1.max(y2),
        }
    }

    pub fn width(&self) -> i64 {
        self.x2 as i64 - self.x1 as i64
    }

    pub fn height(&self) -> i64 {
        self.y2 as i64 - self.y1 as i64
    }

    pub fn area(&self) -> i64 {
        self.width() * self.height()
    }

    pub fn translate(&self, dx: i32, dy: i32) -> Self {
        Self {
            x1: self.x1.saturating_add(dx),
            y1: self.y1.saturating_add(dy),
            x2: self.x2.saturating_add(dx),
            y2: self.y2.saturating_add(dy),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
    pub class_id: u32,
    pub confidence: f32,
    pub bbox: BoundingBox,
}

/// Detection after ROI gating.
#[derive(Clone, Debug, PartialEq)]
pub struct GatedDetection {
    pub detection: Detection,
    /// Fraction of the box area that lies inside the alarm region.
    pub containment: f32,
    pub inside: bool,
}

impl GatedDetection {
    pub fn class_id(&self) -> u32 {
        self.detection.class_id
    }
}

/// Per-frame decision: the alarm flag plus every gated detection, in service order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DetectionBatch {
    pub alarm: bool,
    pub detections: Vec<GatedDetection>,
}

impl DetectionBatch {
    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }

    /// Class ids in detection order (duplicates kept).
    pub fn class_ids(&self) -> Vec<u32> {
        self.detections.iter().map(|d| d.class_id()).collect()
    }
}
