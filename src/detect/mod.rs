//! Object detection: the service contract, its backends, and the adapter that
//! maps service output into full-frame detections.

mod adapter;
mod backend;
mod backends;
mod result;

pub use adapter::DetectorAdapter;
pub use backend::DetectionService;
pub use backends::{open_backend, ScriptedBackend, StubBackend};
#[cfg(feature = "backend-tract")]
pub use backends::TractYoloBackend;
pub use result::{BoundingBox, Detection, DetectionBatch, GatedDetection, RawDetection};
