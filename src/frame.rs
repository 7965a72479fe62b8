//! Frame buffers handed through the pipeline.
//!
//! - `Frame`: packed RGB8 image owned by the caller for one pipeline pass.
//! - `PixelRect`: absolute pixel rectangle inside a frame (used for crops).
//!
//! Frames are never retained by the pipeline. The detector adapter may build
//! an owned crop for ROI inference; the crop is dropped once inference returns.

use anyhow::{anyhow, Result};

/// Bytes per pixel for packed RGB8.
pub const RGB_CHANNELS: usize = 3;

// ----------------------------------------------------------------------------
// PixelRect: absolute rectangle in frame space
// ----------------------------------------------------------------------------

/// Axis-aligned rectangle in absolute pixel coordinates.
///
/// `x`/`y` is the top-left corner; the rectangle covers `[x, x+w) × [y, y+h)`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl PixelRect {
    pub fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }

    pub fn right(&self) -> u32 {
        self.x.saturating_add(self.w)
    }

    pub fn bottom(&self) -> u32 {
        self.y.saturating_add(self.h)
    }

    pub fn area(&self) -> u64 {
        self.w as u64 * self.h as u64
    }

    pub fn is_empty(&self) -> bool {
        self.w == 0 || self.h == 0
    }
}

// ----------------------------------------------------------------------------
// Frame: packed RGB8 image
// ----------------------------------------------------------------------------

/// Packed RGB8 frame.
///
/// The byte length is checked on construction so every consumer can index
/// `(y * width + x) * 3 + channel` without bounds surprises.
#[derive(Clone, PartialEq, Eq)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
}

impl Frame {
    /// Wrap an RGB8 buffer. Fails when the buffer size does not match the dimensions.
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Result<Self> {
        let expected = rgb_len(width, height)?;
        if data.len() != expected {
            return Err(anyhow!(
                "expected {} RGB bytes for {}x{} frame, received {}",
                expected,
                width,
                height,
                data.len()
            ));
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Solid-colour frame, mostly useful for tests and synthetic sources.
    pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Result<Self> {
        let len = rgb_len(width, height)?;
        let mut data = Vec::with_capacity(len);
        for _ in 0..(len / RGB_CHANNELS) {
            data.extend_from_slice(&rgb);
        }
        Self::new(data, width, height)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Read-only pixel bytes (row-major RGB8).
    pub fn pixels(&self) -> &[u8] {
        &self.data
    }

    /// Copy out the pixels covered by `rect`.
    ///
    /// The rectangle is intersected with the frame first, so an out-of-range
    /// rectangle produces a smaller (possibly empty) crop rather than an error.
    pub fn crop(&self, rect: PixelRect) -> Result<Frame> {
        let x0 = rect.x.min(self.width);
        let y0 = rect.y.min(self.height);
        let x1 = rect.right().min(self.width);
        let y1 = rect.bottom().min(self.height);
        let crop_w = x1 - x0;
        let crop_h = y1 - y0;

        let row_bytes = crop_w as usize * RGB_CHANNELS;
        let stride = self.width as usize * RGB_CHANNELS;
        let mut data = Vec::with_capacity(row_bytes * crop_h as usize);
        for row in y0..y1 {
            let start = row as usize * stride + x0 as usize * RGB_CHANNELS;
            data.extend_from_slice(&self.data[start..start + row_bytes]);
        }
        Frame::new(data, crop_w, crop_h)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Pixel content is never logged.
        f.debug_struct("Frame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.data.len())
            .finish()
    }
}

fn rgb_len(width: u32, height: u32) -> Result<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(RGB_CHANNELS))
        .ok_or_else(|| anyhow!("frame dimensions overflow"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: u32, height: u32) -> Frame {
        let mut data = Vec::new();
        for y in 0..height {
            for x in 0..width {
                data.extend_from_slice(&[x as u8, y as u8, 0]);
            }
        }
        Frame::new(data, width, height).unwrap()
    }

    #[test]
    fn frame_rejects_wrong_length() {
        assert!(Frame::new(vec![0u8; 10], 2, 2).is_err());
        assert!(Frame::new(vec![0u8; 12], 2, 2).is_ok());
    }

    #[test]
    fn crop_copies_the_requested_window() {
        let frame = gradient(8, 6);
        let crop = frame.crop(PixelRect::new(2, 1, 3, 2)).unwrap();

        assert_eq!(crop.dimensions(), (3, 2));
        // Top-left pixel of the crop is (2, 1) in the source frame.
        assert_eq!(&crop.pixels()[0..3], &[2, 1, 0]);
        // Bottom-right pixel of the crop is (4, 2).
        assert_eq!(&crop.pixels()[15..18], &[4, 2, 0]);
    }

    #[test]
    fn crop_outside_frame_is_clipped() {
        let frame = gradient(8, 6);
        let crop = frame.crop(PixelRect::new(6, 4, 10, 10)).unwrap();
        assert_eq!(crop.dimensions(), (2, 2));

        let empty = frame.crop(PixelRect::new(20, 20, 5, 5)).unwrap();
        assert!(empty.is_empty());
        assert!(empty.pixels().is_empty());
    }

    #[test]
    fn debug_does_not_print_pixels() {
        let frame = Frame::filled(2, 2, [255, 0, 0]).unwrap();
        let rendered = format!("{:?}", frame);
        assert!(rendered.contains("bytes: 12"));
        assert!(!rendered.contains("255"));
    }
}
