//! Periodic status line for the console log.

use std::time::{Duration, Instant};

use crate::monitor::FrameReport;

/// Weight of the newest frame interval in the FPS average.
const FPS_SMOOTHING: f64 = 0.1;

/// Emits at most one status line per interval: FPS, detection count, alarm state
/// and the labels of whatever is in view.
pub struct StatusReporter {
    interval: Duration,
    last_emit: Option<Instant>,
    last_frame: Option<Instant>,
    fps: f64,
}

impl StatusReporter {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_emit: None,
            last_frame: None,
            fps: 0.0,
        }
    }

    /// Smoothed frames per second.
    pub fn fps(&self) -> f64 {
        self.fps
    }

    /// Record a frame. Returns the status line when one is due (it is also logged).
    pub fn record<F>(&mut self, now: Instant, report: &FrameReport, label: F) -> Option<String>
    where
        F: Fn(u32) -> String,
    {
        if let Some(prev) = self.last_frame {
            let dt = now.saturating_duration_since(prev).as_secs_f64();
            if dt > 0.0 {
                let instant_fps = 1.0 / dt;
                self.fps = if self.fps == 0.0 {
                    instant_fps
                } else {
                    FPS_SMOOTHING * instant_fps + (1.0 - FPS_SMOOTHING) * self.fps
                };
            }
        }
        self.last_frame = Some(now);

        let due = self
            .last_emit
            .map_or(true, |last| now.saturating_duration_since(last) >= self.interval);
        if !due {
            return None;
        }
        self.last_emit = Some(now);

        let labels: Vec<String> = report
            .batch
            .detections
            .iter()
            .map(|d| label(d.class_id()))
            .collect();
        let line = format!(
            "FPS: {:.0} | Detections: {} | Status: {} | {}",
            self.fps,
            report.batch.detections.len(),
            if report.batch.alarm { "ALARM!" } else { "Normal" },
            labels.join(", ")
        );
        log::info!("{}", line);
        Some(line)
    }
}
