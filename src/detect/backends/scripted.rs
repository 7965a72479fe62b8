use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use anyhow::Result;

use crate::detect::backend::DetectionService;
use crate::detect::result::RawDetection;
use crate::frame::Frame;

/// Backend that replays a fixed sequence of results, one per call.
///
/// Once the script runs out every call returns no detections. The size of each
/// image it receives is recorded so callers can check what was sent.
pub struct ScriptedBackend {
    script: VecDeque<Result<Vec<RawDetection>>>,
    calls: Arc<Mutex<Vec<(u32, u32)>>>,
}

impl ScriptedBackend {
    pub fn new(script: Vec<Result<Vec<RawDetection>>>) -> Self {
        Self {
            script: script.into(),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Shared log of `(width, height)` for every image passed to `infer`.
    pub fn calls(&self) -> Arc<Mutex<Vec<(u32, u32)>>> {
        self.calls.clone()
    }
}

impl DetectionService for ScriptedBackend {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn infer(
        &mut self,
        image: &Frame,
        _conf_threshold: f32,
        _imgsz: u32,
    ) -> Result<Vec<RawDetection>> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(image.dimensions());
        }
        self.script.pop_front().unwrap_or_else(|| Ok(Vec::new()))
    }
}
