use crate::detect::backend::DetectionService;
use crate::detect::result::{BoundingBox, Detection, RawDetection};
use crate::frame::{Frame, PixelRect};

/// Runs the detection service on a frame, optionally cropped to the alarm region,
/// and reports detections in full-frame pixel coordinates.
pub struct DetectorAdapter {
    service: Box<dyn DetectionService>,
    conf_threshold: f32,
    imgsz: u32,
}

impl DetectorAdapter {
    pub fn new(service: Box<dyn DetectionService>, conf_threshold: f32, imgsz: u32) -> Self {
        Self {
            service,
            conf_threshold,
            imgsz,
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.service.name()
    }

    /// Detect objects in `frame`.
    ///
    /// With `crop = Some(region)` only the region is sent to the service and
    /// every box is shifted by the region's top-left corner. Service failures
    /// are logged and reported as "nothing detected".
    pub fn detect(&mut self, frame: &Frame, crop: Option<PixelRect>) -> Vec<Detection> {
        let (width, height) = frame.dimensions();

        let raw = match crop {
            Some(region) => {
                if region.is_empty() {
                    log::debug!("alarm region is empty for {}x{} frame", width, height);
                    return Vec::new();
                }
                let cropped = match frame.crop(region) {
                    Ok(cropped) => cropped,
                    Err(e) => {
                        log::warn!("failed to crop alarm region: {}", e);
                        return Vec::new();
                    }
                };
                self.infer(&cropped)
            }
            None => self.infer(frame),
        };

        let (dx, dy) = crop
            .map(|region| (region.x as i32, region.y as i32))
            .unwrap_or((0, 0));
        raw.iter()
            .map(|r| to_frame_space(r, dx, dy, width, height))
            .collect()
    }

    fn infer(&mut self, image: &Frame) -> Vec<RawDetection> {
        match self
            .service
            .infer(image, self.conf_threshold, self.imgsz)
        {
            Ok(raw) => raw,
            Err(e) => {
                log::warn!("detector '{}' failed: {:#}", self.service.name(), e);
                Vec::new()
            }
        }
    }
}

/// Truncate to integer pixels, shift by the crop offset and clamp to the frame.
fn to_frame_space(raw: &RawDetection, dx: i32, dy: i32, width: u32, height: u32) -> Detection {
    let local = BoundingBox::new(
        raw.x1 as i32,
        raw.y1 as i32,
        raw.x2 as i32,
        raw.y2 as i32,
    );
    let global = local.translate(dx, dy);
    let max_x = width.min(i32::MAX as u32) as i32;
    let max_y = height.min(i32::MAX as u32) as i32;
    Detection {
        class_id: raw.class_id,
        confidence: raw.confidence,
        bbox: BoundingBox::new(
            global.x1.clamp(0, max_x),
            global.y1.clamp(0, max_y),
            global.x2.clamp(0, max_x),
            global.y2.clamp(0, max_y),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::backends::ScriptedBackend;
    use anyhow::anyhow;

    fn raw(class_id: u32, x1: f32, y1: f32, x2: f32, y2: f32) -> RawDetection {
        RawDetection {
            class_id,
            confidence: 0.8,
            x1,
            y1,
            x2,
            y2,
        }
    }

    #[test]
    fn crop_local_boxes_are_translated_to_frame_space() {
        let backend = ScriptedBackend::new(vec![Ok(vec![raw(0, 10.0, 10.0, 50.0, 50.0)])]);
        let calls = backend.calls();
        let mut adapter = DetectorAdapter::new(Box::new(backend), 0.4, 640);
        let frame = Frame::filled(640, 480, [0, 0, 0]).unwrap();

        let detections = adapter.detect(&frame, Some(PixelRect::new(100, 200, 300, 200)));

        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].bbox, BoundingBox::new(110, 210, 150, 250));
        // Service saw the crop, not the full frame.
        assert_eq!(calls.lock().unwrap().as_slice(), &[(300, 200)]);
    }

    #[test]
    fn full_frame_passes_through_unshifted() {
        let backend = ScriptedBackend::new(vec![Ok(vec![raw(1, 10.9, 10.2, 50.7, 50.1)])]);
        let calls = backend.calls();
        let mut adapter = DetectorAdapter::new(Box::new(backend), 0.4, 640);
        let frame = Frame::filled(640, 480, [0, 0, 0]).unwrap();

        let detections = adapter.detect(&frame, None);

        assert_eq!(detections[0].bbox, BoundingBox::new(10, 10, 50, 50));
        assert_eq!(detections[0].class_id, 1);
        assert_eq!(calls.lock().unwrap().as_slice(), &[(640, 480)]);
    }

    #[test]
    fn swapped_corners_and_out_of_frame_boxes_are_normalized() {
        let backend = ScriptedBackend::new(vec![Ok(vec![raw(0, 700.0, 30.0, -5.0, 10.0)])]);
        let mut adapter = DetectorAdapter::new(Box::new(backend), 0.4, 640);
        let frame = Frame::filled(640, 480, [0, 0, 0]).unwrap();

        let detections = adapter.detect(&frame, None);

        assert_eq!(detections[0].bbox, BoundingBox::new(0, 10, 640, 30));
    }

    #[test]
    fn service_error_and_empty_result_yield_no_detections() {
        let backend = ScriptedBackend::new(vec![Err(anyhow!("model crashed")), Ok(vec![])]);
        let mut adapter = DetectorAdapter::new(Box::new(backend), 0.4, 640);
        let frame = Frame::filled(64, 48, [0, 0, 0]).unwrap();

        assert!(adapter.detect(&frame, None).is_empty());
        assert!(adapter.detect(&frame, None).is_empty());
    }

    #[test]
    fn empty_region_skips_the_service() {
        let backend = ScriptedBackend::new(vec![Ok(vec![raw(0, 0.0, 0.0, 5.0, 5.0)])]);
        let calls = backend.calls();
        let mut adapter = DetectorAdapter::new(Box::new(backend), 0.4, 640);
        let frame = Frame::filled(64, 48, [0, 0, 0]).unwrap();

        assert!(adapter
            .detect(&frame, Some(PixelRect::new(64, 48, 0, 0)))
            .is_empty());
        assert!(calls.lock().unwrap().is_empty());
    }
}
