//! Per-frame detection-to-alarm pipeline.
//!
//! One `Monitor::process_frame` call runs, in order:
//! 1. region resolution (cached per frame size)
//! 2. throttling (inference or replay of the last batch)
//! 3. detection, optionally on the region crop
//! 4. ROI gating and alarm classification
//! 5. debounced alarm dispatch
//!
//! Everything runs on the caller's thread except audio playback.

use std::time::Instant;

use crate::alarm::{AlarmClassSet, AlarmDispatcher, DispatchOutcome};
use crate::audio::AudioHandle;
use crate::config::SentinelConfig;
use crate::detect::{DetectionBatch, DetectionService, DetectorAdapter};
use crate::frame::{Frame, PixelRect};
use crate::gate::RoiGate;
use crate::region::RegionResolver;
use crate::throttle::FrameThrottle;

/// Outcome of one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameReport {
    pub batch: DetectionBatch,
    /// Inference ran for this frame (false when the batch was replayed).
    pub fresh: bool,
    /// Alarm region in this frame's pixel space.
    pub region: PixelRect,
    pub dispatch: DispatchOutcome,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MonitorStats {
    pub frames: u64,
    pub inferences: u64,
    pub alarm_frames: u64,
    /// Alarms let through by the debounce rules.
    pub alarms_fired: u64,
    /// Alarms that reached the audio worker.
    pub sounds_dispatched: u64,
}

pub struct Monitor {
    resolver: RegionResolver,
    throttle: FrameThrottle,
    detector: DetectorAdapter,
    gate: RoiGate,
    classes: AlarmClassSet,
    dispatcher: AlarmDispatcher,
    crop: bool,
    class_names: Vec<String>,
    stats: MonitorStats,
}

impl Monitor {
    pub fn new(cfg: &SentinelConfig, service: Box<dyn DetectionService>, audio: AudioHandle) -> Self {
        let detector = DetectorAdapter::new(
            service,
            cfg.detector.conf_threshold,
            cfg.detector.imgsz,
        );
        let gate = RoiGate::new(cfg.region.enabled, cfg.region.threshold);
        let dispatcher = AlarmDispatcher::new(
            cfg.alarm.debounce(),
            cfg.alarm.sound_path.clone(),
            cfg.alarm.volume,
            audio,
        );
        log::info!(
            "monitor ready: backend={} frame_skip={} roi={} crop={} classes={:?}",
            detector.backend_name(),
            cfg.detector.frame_skip,
            cfg.region.enabled,
            cfg.region.enabled && cfg.region.crop,
            cfg.alarm.classes.iter().collect::<Vec<_>>()
        );
        Self {
            resolver: RegionResolver::new(cfg.region.spec),
            throttle: FrameThrottle::new(cfg.detector.frame_skip),
            detector,
            gate,
            classes: cfg.alarm.classes.clone(),
            dispatcher,
            crop: cfg.region.enabled && cfg.region.crop,
            class_names: cfg.alarm.class_names.clone(),
            stats: MonitorStats::default(),
        }
    }

    /// Run one frame through the pipeline.
    pub fn process_frame(&mut self, frame: &Frame, now: Instant) -> FrameReport {
        let (width, height) = frame.dimensions();
        let region = self.resolver.resolve(width, height);

        let detector = &mut self.detector;
        let gate = &self.gate;
        let classes = &self.classes;
        let crop = self.crop.then_some(region);
        let throttled = self.throttle.advance(|| {
            let detections = detector.detect(frame, crop);
            let gated = gate.gate(detections, &region);
            let alarm = classes.classify(&gated, gate.is_enabled());
            DetectionBatch {
                alarm,
                detections: gated,
            }
        });

        let dispatch = self.dispatcher.observe(throttled.batch.alarm, now);

        self.stats.frames += 1;
        if throttled.fresh {
            self.stats.inferences += 1;
        }
        if throttled.batch.alarm {
            self.stats.alarm_frames += 1;
        }
        if dispatch.fired() {
            self.stats.alarms_fired += 1;
            log::warn!(
                "ALARM: {} in print area ({:?})",
                self.alarm_labels(&throttled.batch).join(", "),
                dispatch
            );
        }
        if dispatch == DispatchOutcome::Dispatched {
            self.stats.sounds_dispatched += 1;
        }

        FrameReport {
            batch: throttled.batch,
            fresh: throttled.fresh,
            region,
            dispatch,
        }
    }

    pub fn stats(&self) -> MonitorStats {
        self.stats
    }

    pub fn class_label(&self, class_id: u32) -> String {
        self.class_names
            .get(class_id as usize)
            .cloned()
            .unwrap_or_else(|| format!("class {}", class_id))
    }

    /// Labels of the detections that raised the alarm.
    fn alarm_labels(&self, batch: &DetectionBatch) -> Vec<String> {
        let gating = self.gate.is_enabled();
        batch
            .detections
            .iter()
            .filter(|d| self.classes.contains(d.class_id()) && (d.inside || !gating))
            .map(|d| self.class_label(d.class_id()))
            .collect()
    }
}
