use anyhow::{anyhow, Result};

use crate::detect::backend::DetectionService;
use crate::detect::result::RawDetection;
use crate::frame::Frame;

/// Confidence reported for stub detections.
const STUB_CONFIDENCE: f32 = 0.9;

/// Stub backend for dry runs without a model.
///
/// `stub://` detects nothing. `stub://hand` and `stub://spaghetti` report a
/// single centered object covering the middle quarter of whatever image they
/// receive.
pub struct StubBackend {
    class_id: Option<u32>,
}

impl StubBackend {
    pub fn new() -> Self {
        Self { class_id: None }
    }

    /// Stub that always reports `class_id`.
    pub fn reporting(class_id: u32) -> Self {
        Self {
            class_id: Some(class_id),
        }
    }

    /// Parse a `stub://` model path.
    pub fn from_url(url: &str) -> Result<Self> {
        let kind = url
            .strip_prefix("stub://")
            .ok_or_else(|| anyhow!("stub backend requires a stub:// model path, got '{}'", url))?;
        match kind {
            "" | "empty" => Ok(Self::new()),
            "hand" => Ok(Self::reporting(0)),
            "spaghetti" => Ok(Self::reporting(1)),
            other => Err(anyhow!("unknown stub model '{}'", other)),
        }
    }
}

impl Default for StubBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl DetectionService for StubBackend {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn infer(
        &mut self,
        image: &Frame,
        conf_threshold: f32,
        _imgsz: u32,
    ) -> Result<Vec<RawDetection>> {
        let Some(class_id) = self.class_id else {
            return Ok(Vec::new());
        };
        if STUB_CONFIDENCE < conf_threshold || image.is_empty() {
            return Ok(Vec::new());
        }
        let (w, h) = (image.width() as f32, image.height() as f32);
        Ok(vec![RawDetection {
            class_id,
            confidence: STUB_CONFIDENCE,
            x1: w * 0.25,
            y1: h * 0.25,
            x2: w * 0.75,
            y2: h * 0.75,
        }])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stub_urls_select_class() {
        let frame = Frame::filled(100, 40, [0, 0, 0]).unwrap();

        let mut empty = StubBackend::from_url("stub://").unwrap();
        assert!(empty.infer(&frame, 0.4, 640).unwrap().is_empty());

        let mut hand = StubBackend::from_url("stub://hand").unwrap();
        let out = hand.infer(&frame, 0.4, 640).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].class_id, 0);
        assert_eq!((out[0].x1, out[0].y1, out[0].x2, out[0].y2), (25.0, 10.0, 75.0, 30.0));

        let mut spaghetti = StubBackend::from_url("stub://spaghetti").unwrap();
        assert_eq!(spaghetti.infer(&frame, 0.4, 640).unwrap()[0].class_id, 1);

        assert!(StubBackend::from_url("stub://unicorn").is_err());
        assert!(StubBackend::from_url("models/best.onnx").is_err());
    }

    #[test]
    fn stub_respects_confidence_threshold() {
        let frame = Frame::filled(10, 10, [0, 0, 0]).unwrap();
        let mut hand = StubBackend::reporting(0);
        assert!(hand.infer(&frame, 0.95, 640).unwrap().is_empty());
    }
}
