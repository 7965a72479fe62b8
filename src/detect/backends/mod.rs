mod scripted;
mod stub;

#[cfg(feature = "backend-tract")]
mod tract;

pub use scripted::ScriptedBackend;
pub use stub::StubBackend;

#[cfg(feature = "backend-tract")]
pub use tract::TractYoloBackend;

use anyhow::Result;

use super::backend::DetectionService;

/// Open the detection backend for `model_path`.
///
/// `stub://` paths select the built-in stub. Anything else is loaded as an
/// ONNX model, which requires the `backend-tract` feature. Load failures are
/// returned to the caller; nothing is processed without a working detector.
pub fn open_backend(model_path: &str, imgsz: u32) -> Result<Box<dyn DetectionService>> {
    if model_path.starts_with("stub://") {
        return Ok(Box::new(StubBackend::from_url(model_path)?));
    }
    #[cfg(feature = "backend-tract")]
    {
        let mut backend = TractYoloBackend::load(model_path, imgsz)?;
        backend.warm_up()?;
        Ok(Box::new(backend))
    }
    #[cfg(not(feature = "backend-tract"))]
    {
        let _ = imgsz;
        anyhow::bail!(
            "model '{}' requires the backend-tract feature (or use a stub:// model path)",
            model_path
        )
    }
}
