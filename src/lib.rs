//! print-sentinel
//!
//! Camera watchdog for a 3D printer. A pretrained detector runs on sampled
//! frames and an audible alarm sounds when a hand or a failed print
//! ("spaghetti") shows up inside the monitored print area.
//!
//! # Pipeline
//!
//! 1. `region`: alarm region in pixels, resolved per frame size.
//! 2. `throttle`: inference on one of every `frame_skip + 1` frames, replay otherwise.
//! 3. `detect`: detection service contract, backends, and the crop-aware adapter.
//! 4. `gate`: containment of each box in the region.
//! 5. `alarm`: alarm classification and debounced dispatch.
//! 6. `audio`: background playback worker.
//!
//! `monitor::Monitor` wires these together for one frame at a time.
//!
//! # Module Structure
//!
//! - `frame`: RGB8 frames and pixel rectangles
//! - `ingest`: frame sources (synthetic, image directories)
//! - `config`: file + environment configuration
//! - `status`: periodic console status line

pub mod alarm;
pub mod audio;
pub mod config;
pub mod detect;
pub mod frame;
pub mod gate;
pub mod ingest;
pub mod monitor;
pub mod region;
pub mod status;
pub mod throttle;

pub use alarm::{AlarmClassSet, AlarmDispatcher, DebouncePolicy, DispatchOutcome};
pub use audio::{
    AudioHandle, AudioSink, AudioWorker, CommandSink, OverlapPolicy, PlayRequest, SilentSink,
    SubmitOutcome,
};
pub use config::SentinelConfig;
pub use detect::{
    open_backend, BoundingBox, Detection, DetectionBatch, DetectionService, DetectorAdapter,
    GatedDetection, RawDetection, ScriptedBackend, StubBackend,
};
pub use frame::{Frame, PixelRect};
pub use gate::{containment_ratio, RoiGate};
pub use ingest::{open_source, FrameSource, SourceConfig, SyntheticSource};
pub use monitor::{FrameReport, Monitor, MonitorStats};
pub use region::{AbsoluteRegion, RatioRegion, RegionResolver, RegionSpec};
pub use status::StatusReporter;
pub use throttle::{FrameThrottle, Throttled};
