use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::audio::{AudioHandle, PlayRequest, SubmitOutcome};

/// Which debounce rules apply. Both may be active; a dispatch needs both to agree.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DebouncePolicy {
    /// Minimum time between dispatches. Zero disables the cooldown rule.
    pub cooldown: Duration,
    /// Only dispatch on a no-alarm → alarm transition.
    pub edge_triggered: bool,
}

impl Default for DebouncePolicy {
    fn default() -> Self {
        Self {
            cooldown: Duration::from_secs(1),
            edge_triggered: false,
        }
    }
}

/// What a single observation did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// No alarm this frame.
    Idle,
    /// Alarm, but the debounce rules held it back.
    Suppressed,
    /// Sound handed to the audio worker.
    Dispatched,
    /// Debounce allowed it, the audio worker was busy or full.
    Dropped,
    /// Debounce allowed it, the sound file does not exist.
    ResourceMissing,
}

impl DispatchOutcome {
    /// True when the debounce rules let this alarm through, whether or not it was audible.
    pub fn fired(&self) -> bool {
        matches!(
            self,
            DispatchOutcome::Dispatched | DispatchOutcome::Dropped | DispatchOutcome::ResourceMissing
        )
    }
}

struct AlarmState {
    last_fire_time: Option<Instant>,
    cooldown_duration: Duration,
    previously_alarmed: bool,
}

/// Debounces the per-frame alarm flag and triggers the alarm sound.
///
/// The state is private and only `observe` writes it. A failed or dropped
/// playback still counts as a fire for debounce purposes.
///
/// ```compile_fail
/// use print_sentinel::AlarmDispatcher;
///
/// fn rearm(dispatcher: &mut AlarmDispatcher) {
///     dispatcher.state.previously_alarmed = false;
/// }
/// ```
pub struct AlarmDispatcher {
    state: AlarmState,
    edge_triggered: bool,
    sound: PlayRequest,
    audio: AudioHandle,
}

impl AlarmDispatcher {
    pub fn new(policy: DebouncePolicy, sound_path: PathBuf, volume: f32, audio: AudioHandle) -> Self {
        Self {
            state: AlarmState {
                last_fire_time: None,
                cooldown_duration: policy.cooldown,
                previously_alarmed: false,
            },
            edge_triggered: policy.edge_triggered,
            sound: PlayRequest {
                path: sound_path,
                volume,
            },
            audio,
        }
    }

    /// Feed one frame's alarm flag observed at `now`.
    pub fn observe(&mut self, alarm: bool, now: Instant) -> DispatchOutcome {
        let rising = alarm && !self.state.previously_alarmed;
        self.state.previously_alarmed = alarm;

        if !alarm {
            return DispatchOutcome::Idle;
        }
        if self.edge_triggered && !rising {
            return DispatchOutcome::Suppressed;
        }
        if let Some(last) = self.state.last_fire_time {
            if now.saturating_duration_since(last) < self.state.cooldown_duration {
                return DispatchOutcome::Suppressed;
            }
        }
        self.state.last_fire_time = Some(now);

        if !self.sound.path.exists() {
            log::warn!(
                "alarm sound not found: {} (alarm raised without sound)",
                self.sound.path.display()
            );
            return DispatchOutcome::ResourceMissing;
        }
        match self.audio.submit(self.sound.clone()) {
            SubmitOutcome::Accepted => DispatchOutcome::Dispatched,
            SubmitOutcome::Dropped => {
                log::debug!("alarm sound dropped; previous playback still active");
                DispatchOutcome::Dropped
            }
        }
    }

    pub fn last_fire_time(&self) -> Option<Instant> {
        self.state.last_fire_time
    }

    pub fn previously_alarmed(&self) -> bool {
        self.state.previously_alarmed
    }
}
