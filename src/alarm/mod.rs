//! Alarm decision and dispatch.
//!
//! - `AlarmClassSet`: reduces gated detections to a single alarm flag.
//! - `AlarmDispatcher`: debounces the flag (cooldown and/or rising edge) and
//!   hands the alarm sound to the audio worker.

mod classifier;
mod dispatcher;

pub use classifier::AlarmClassSet;
pub use dispatcher::{AlarmDispatcher, DebouncePolicy, DispatchOutcome};
