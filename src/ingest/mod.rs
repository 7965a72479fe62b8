//! Frame sources.
//!
//! Camera capture lives outside this crate; sources here cover dry runs and
//! offline checks:
//! - `stub://` synthetic frames (testing, daemon dry runs)
//! - image directories (feature: ingest-images)
//!
//! Every source yields `Frame` values one at a time. Frames are not buffered
//! beyond the one being handed out.

#[cfg(feature = "ingest-images")]
pub mod images;
pub mod synthetic;

use anyhow::Result;

use crate::frame::Frame;

#[cfg(feature = "ingest-images")]
pub use images::ImageDirSource;
pub use synthetic::SyntheticSource;

/// Configuration for a frame source.
#[derive(Clone, Debug, PartialEq)]
pub struct SourceConfig {
    /// `stub://<name>` or a local directory of images.
    pub url: String,
    /// Frame width for synthetic sources.
    pub width: u32,
    /// Frame height for synthetic sources.
    pub height: u32,
    /// Pacing target for live-like sources (frames per second).
    pub fps: u32,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url: "stub://camera".to_string(),
            width: 1920,
            height: 1080,
            fps: 30,
        }
    }
}

pub trait FrameSource {
    /// Next frame, or `None` once the source is exhausted.
    fn next_frame(&mut self) -> Result<Option<Frame>>;

    /// Human-readable description for logs.
    fn describe(&self) -> String;

    /// True for sources that produce frames as fast as asked and need pacing.
    fn is_live(&self) -> bool {
        false
    }

    /// Frames produced so far.
    fn frames_captured(&self) -> u64;
}

/// Open the source named by `config.url`.
pub fn open_source(config: &SourceConfig) -> Result<Box<dyn FrameSource>> {
    if config.url.starts_with("stub://") {
        return Ok(Box::new(SyntheticSource::new(config.clone())?));
    }
    if config.url.contains("://") {
        anyhow::bail!(
            "unsupported frame source '{}' (camera capture is provided by the host)",
            config.url
        );
    }
    #[cfg(feature = "ingest-images")]
    {
        Ok(Box::new(ImageDirSource::open(&config.url)?))
    }
    #[cfg(not(feature = "ingest-images"))]
    {
        anyhow::bail!(
            "image directory source '{}' requires the ingest-images feature",
            config.url
        )
    }
}
