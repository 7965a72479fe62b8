//! Synthetic frame source for `stub://` URLs.
//!
//! Produces an endless stream of gradient frames at the configured size. The
//! pattern shifts every frame and jumps every 50 frames so consecutive frames
//! differ the way a real feed would.

use anyhow::{anyhow, Result};

use super::{FrameSource, SourceConfig};
use crate::frame::{Frame, RGB_CHANNELS};

pub struct SyntheticSource {
    config: SourceConfig,
    frame_count: u64,
    scene_state: u8,
}

impl SyntheticSource {
    pub fn new(config: SourceConfig) -> Result<Self> {
        if config.width == 0 || config.height == 0 {
            return Err(anyhow!(
                "synthetic source needs a non-zero frame size, got {}x{}",
                config.width,
                config.height
            ));
        }
        log::info!(
            "SyntheticSource: connected to {} ({}x{})",
            config.url,
            config.width,
            config.height
        );
        Ok(Self {
            config,
            frame_count: 0,
            scene_state: 0,
        })
    }

    fn generate_pixels(&mut self) -> Vec<u8> {
        if self.frame_count % 50 == 0 {
            self.scene_state = self.scene_state.wrapping_add(1);
        }
        let width = self.config.width as usize;
        let height = self.config.height as usize;
        let shift = self.frame_count as usize + self.scene_state as usize * 32;
        let mut pixels = vec![0u8; width * height * RGB_CHANNELS];
        for (i, px) in pixels.chunks_exact_mut(RGB_CHANNELS).enumerate() {
            let (x, y) = (i % width, i / width);
            px[0] = ((x + shift) % 256) as u8;
            px[1] = ((y + shift) % 256) as u8;
            px[2] = self.scene_state;
        }
        pixels
    }
}

impl FrameSource for SyntheticSource {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        self.frame_count += 1;
        let pixels = self.generate_pixels();
        Frame::new(pixels, self.config.width, self.config.height).map(Some)
    }

    fn describe(&self) -> String {
        format!(
            "{} (synthetic {}x{})",
            self.config.url, self.config.width, self.config.height
        )
    }

    fn is_live(&self) -> bool {
        true
    }

    fn frames_captured(&self) -> u64 {
        self.frame_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(width: u32, height: u32) -> SourceConfig {
        SourceConfig {
            url: "stub://test".to_string(),
            width,
            height,
            fps: 30,
        }
    }

    #[test]
    fn produces_frames_of_configured_size() {
        let mut source = SyntheticSource::new(config(16, 8)).unwrap();
        let a = source.next_frame().unwrap().unwrap();
        let b = source.next_frame().unwrap().unwrap();
        assert_eq!(a.dimensions(), (16, 8));
        assert_ne!(a, b);
        assert_eq!(source.frames_captured(), 2);
    }

    #[test]
    fn zero_size_is_rejected() {
        assert!(SyntheticSource::new(config(0, 8)).is_err());
    }
}
