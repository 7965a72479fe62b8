#![cfg(feature = "ingest-images")]

//! Image directory source.
//!
//! Decodes every supported image in a directory (sorted by file name) into an
//! RGB8 frame, then ends. Used to run the alarm pipeline over a folder of
//! test pictures.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};

use super::FrameSource;
use crate::frame::Frame;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

pub struct ImageDirSource {
    dir: PathBuf,
    files: Vec<PathBuf>,
    next: usize,
}

impl ImageDirSource {
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        let entries = std::fs::read_dir(&dir)
            .with_context(|| format!("failed to read image directory {}", dir.display()))?;
        let mut files = Vec::new();
        for entry in entries {
            let path = entry?.path();
            let supported = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                .unwrap_or(false);
            if path.is_file() && supported {
                files.push(path);
            }
        }
        files.sort();
        if files.is_empty() {
            return Err(anyhow!("no images found in {}", dir.display()));
        }
        log::info!("ImageDirSource: {} images in {}", files.len(), dir.display());
        Ok(Self {
            dir,
            files,
            next: 0,
        })
    }

    /// File the most recent frame was decoded from.
    pub fn current_file(&self) -> Option<&Path> {
        self.next
            .checked_sub(1)
            .and_then(|i| self.files.get(i))
            .map(PathBuf::as_path)
    }
}

impl FrameSource for ImageDirSource {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        let Some(path) = self.files.get(self.next) else {
            return Ok(None);
        };
        self.next += 1;
        let rgb = image::open(path)
            .with_context(|| format!("failed to decode {}", path.display()))?
            .into_rgb8();
        let (width, height) = rgb.dimensions();
        log::debug!("decoded {} ({}x{})", path.display(), width, height);
        Frame::new(rgb.into_raw(), width, height).map(Some)
    }

    fn describe(&self) -> String {
        format!("{} ({} images)", self.dir.display(), self.files.len())
    }

    fn frames_captured(&self) -> u64 {
        self.next as u64
    }
}
