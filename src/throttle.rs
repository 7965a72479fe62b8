//! Frame-rate throttling with result replay.
//!
//! Inference runs on one of every `skip_interval + 1` frames. Frames in
//! between replay the last computed `DetectionBatch` verbatim. The counter
//! starts at 1 so the very first frame always runs inference.

use crate::detect::DetectionBatch;

/// Result of one throttle step.
#[derive(Clone, Debug, PartialEq)]
pub struct Throttled {
    pub batch: DetectionBatch,
    /// True when the batch was computed for this frame, false when replayed.
    pub fresh: bool,
}

/// Frame counter plus the cached batch. The cache is only replaced by `advance`.
///
/// ```compile_fail
/// use print_sentinel::{DetectionBatch, FrameThrottle};
///
/// let mut throttle = FrameThrottle::new(2);
/// throttle.cached = DetectionBatch::default();
/// ```
pub struct FrameThrottle {
    frame_count: u64,
    skip_interval: u32,
    cached: DetectionBatch,
}

impl FrameThrottle {
    pub fn new(skip_interval: u32) -> Self {
        Self {
            frame_count: 0,
            skip_interval,
            cached: DetectionBatch::default(),
        }
    }

    /// Frames seen so far.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Count a frame and report whether it should run inference.
    fn tick(&mut self) -> bool {
        self.frame_count += 1;
        if self.skip_interval == 0 {
            return true;
        }
        self.frame_count % (self.skip_interval as u64 + 1) == 1
    }

    /// Advance by one frame.
    ///
    /// `compute` runs only on proceed frames; its batch replaces the cache as a
    /// whole. Skipped frames get a copy of the cache.
    pub fn advance<F>(&mut self, compute: F) -> Throttled
    where
        F: FnOnce() -> DetectionBatch,
    {
        if self.tick() {
            self.cached = compute();
            Throttled {
                batch: self.cached.clone(),
                fresh: true,
            }
        } else {
            Throttled {
                batch: self.cached.clone(),
                fresh: false,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::{BoundingBox, Detection, GatedDetection};

    fn batch_for(frame_no: u64) -> DetectionBatch {
        DetectionBatch {
            alarm: frame_no % 2 == 0,
            detections: vec![GatedDetection {
                detection: Detection {
                    class_id: frame_no as u32,
                    confidence: 0.5,
                    bbox: BoundingBox::new(0, 0, 10, 10),
                },
                containment: 1.0,
                inside: true,
            }],
        }
    }

    #[test]
    fn first_frame_always_proceeds() {
        for skip in [0u32, 1, 2, 5, 100] {
            let mut throttle = FrameThrottle::new(skip);
            let out = throttle.advance(|| batch_for(1));
            assert!(out.fresh, "skip_interval={skip}");
            assert_eq!(out.batch, batch_for(1));
        }
    }

    #[test]
    fn zero_interval_processes_every_frame() {
        let mut throttle = FrameThrottle::new(0);
        for n in 1..=10 {
            assert!(throttle.advance(|| batch_for(n)).fresh);
        }
    }

    #[test]
    fn skip_two_processes_one_in_three_and_replays_exactly() {
        let mut throttle = FrameThrottle::new(2);
        let mut proceeded = Vec::new();
        let mut last_fresh = DetectionBatch::default();

        for n in 1..=9u64 {
            let out = throttle.advance(|| batch_for(n));
            if out.fresh {
                proceeded.push(n);
                last_fresh = out.batch.clone();
            } else {
                assert_eq!(out.batch, last_fresh, "frame {n} must replay the cache");
            }
        }

        assert_eq!(proceeded, vec![1, 4, 7]);
        assert_eq!(throttle.frame_count(), 9);
    }

    #[test]
    fn compute_is_not_called_on_skipped_frames() {
        let mut throttle = FrameThrottle::new(3);
        let mut calls = 0;
        for _ in 0..8 {
            throttle.advance(|| {
                calls += 1;
                DetectionBatch::default()
            });
        }
        assert_eq!(calls, 2);
    }
}
