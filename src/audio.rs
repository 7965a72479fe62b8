//! Alarm audio output.
//!
//! Playback runs on one background worker thread. The frame thread hands it
//! requests through a bounded channel with `try_send` only, so a slow or
//! wedged audio device can never stall frame processing:
//!
//! - `OverlapPolicy::Drop`: a request is accepted only when nothing is playing
//!   or pending.
//! - `OverlapPolicy::Queue`: requests wait behind the current playback, up to
//!   the configured depth. Anything beyond that is dropped.
//!
//! Sinks are the devices that actually make noise. `CommandSink` shells out
//! to a player program, `SilentSink` only logs.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::sync::Arc;
use std::thread::JoinHandle;

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;

/// Default player command; `{path}` and `{volume}` are substituted per request.
/// `aplay` has no volume option, so the default plays at the device level.
pub const DEFAULT_PLAYER_COMMAND: &[&str] = &["aplay", "-q", "{path}"];

// ----------------------------------------------------------------------------
// Sinks
// ----------------------------------------------------------------------------

/// Audio output device. Called on the worker thread only; may block.
pub trait AudioSink: Send {
    fn name(&self) -> &'static str;

    fn play(&mut self, path: &Path, volume: f32) -> Result<()>;
}

/// Plays a sound by running an external player and waiting for it to exit.
pub struct CommandSink {
    argv: Vec<String>,
}

impl CommandSink {
    pub fn new(argv: Vec<String>) -> Result<Self> {
        if argv.first().map_or(true, |program| program.trim().is_empty()) {
            return Err(anyhow!("player command must name a program"));
        }
        let sink = Self { argv };
        if !sink.applies_volume() {
            log::debug!(
                "player command '{}' has no {{volume}} placeholder; alarm_volume is ignored",
                sink.argv[0]
            );
        }
        Ok(sink)
    }

    /// True when the command passes the requested volume to the player.
    pub fn applies_volume(&self) -> bool {
        self.argv.iter().any(|arg| arg.contains("{volume}"))
    }

    fn expand(&self, path: &Path, volume: f32) -> Vec<String> {
        let path = path.to_string_lossy();
        let volume = format!("{:.2}", volume);
        self.argv
            .iter()
            .map(|arg| arg.replace("{path}", &path).replace("{volume}", &volume))
            .collect()
    }
}

impl Default for CommandSink {
    fn default() -> Self {
        Self {
            argv: DEFAULT_PLAYER_COMMAND.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl AudioSink for CommandSink {
    fn name(&self) -> &'static str {
        "command"
    }

    fn play(&mut self, path: &Path, volume: f32) -> Result<()> {
        let argv = self.expand(path, volume);
        let status = Command::new(&argv[0])
            .args(&argv[1..])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .status()
            .with_context(|| format!("failed to start player '{}'", argv[0]))?;
        if !status.success() {
            return Err(anyhow!("player '{}' exited with {}", argv[0], status));
        }
        Ok(())
    }
}

/// Sink for headless runs. Logs instead of playing.
#[derive(Default)]
pub struct SilentSink;

impl AudioSink for SilentSink {
    fn name(&self) -> &'static str {
        "silent"
    }

    fn play(&mut self, path: &Path, volume: f32) -> Result<()> {
        log::info!("alarm sound (silent): {} volume={:.2}", path.display(), volume);
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Worker
// ----------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OverlapPolicy {
    #[default]
    Drop,
    Queue,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PlayRequest {
    pub path: PathBuf,
    pub volume: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    Accepted,
    /// Worker busy, queue full, or worker gone.
    Dropped,
}

pub struct AudioWorker;

impl AudioWorker {
    /// Start the playback thread.
    ///
    /// `queue_depth` only matters for `OverlapPolicy::Queue` and is raised to 1.
    pub fn spawn(
        sink: Box<dyn AudioSink>,
        overlap: OverlapPolicy,
        queue_depth: usize,
    ) -> Result<AudioHandle> {
        let capacity = match overlap {
            OverlapPolicy::Drop => 1,
            OverlapPolicy::Queue => queue_depth.max(1),
        };
        let (tx, rx) = mpsc::sync_channel(capacity);
        let in_flight = Arc::new(AtomicUsize::new(0));
        let worker_in_flight = in_flight.clone();
        let sink_name = sink.name();
        let join = std::thread::Builder::new()
            .name("sentinel-audio".to_string())
            .spawn(move || run_worker(sink, rx, worker_in_flight))
            .context("failed to spawn audio worker")?;
        log::debug!(
            "audio worker started (sink={}, overlap={:?}, capacity={})",
            sink_name,
            overlap,
            capacity
        );
        Ok(AudioHandle {
            tx: Some(tx),
            in_flight,
            overlap,
            join: Some(join),
        })
    }
}

fn run_worker(mut sink: Box<dyn AudioSink>, rx: Receiver<PlayRequest>, in_flight: Arc<AtomicUsize>) {
    for request in rx {
        if let Err(e) = sink.play(&request.path, request.volume) {
            log::warn!(
                "alarm playback failed ({}): {:#}",
                request.path.display(),
                e
            );
        }
        in_flight.fetch_sub(1, Ordering::SeqCst);
    }
    log::debug!("audio worker stopped");
}

/// Owner handle for the playback thread. Dropping it stops and joins the worker.
pub struct AudioHandle {
    tx: Option<SyncSender<PlayRequest>>,
    in_flight: Arc<AtomicUsize>,
    overlap: OverlapPolicy,
    join: Option<JoinHandle<()>>,
}

impl AudioHandle {
    /// Hand a request to the worker without blocking.
    pub fn submit(&self, request: PlayRequest) -> SubmitOutcome {
        let Some(tx) = self.tx.as_ref() else {
            return SubmitOutcome::Dropped;
        };

        match self.overlap {
            OverlapPolicy::Drop => {
                if self
                    .in_flight
                    .compare_exchange(0, 1, Ordering::SeqCst, Ordering::SeqCst)
                    .is_err()
                {
                    return SubmitOutcome::Dropped;
                }
            }
            OverlapPolicy::Queue => {
                self.in_flight.fetch_add(1, Ordering::SeqCst);
            }
        }

        match tx.try_send(request) {
            Ok(()) => SubmitOutcome::Accepted,
            Err(TrySendError::Full(_)) => {
                self.in_flight.fetch_sub(1, Ordering::SeqCst);
                SubmitOutcome::Dropped
            }
            Err(TrySendError::Disconnected(_)) => {
                self.in_flight.fetch_sub(1, Ordering::SeqCst);
                log::error!("audio worker is gone; alarm sound dropped");
                SubmitOutcome::Dropped
            }
        }
    }

    /// Requests accepted but not yet finished (playing or queued).
    pub fn pending(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }
}

impl Drop for AudioHandle {
    fn drop(&mut self) {
        // Closing the channel ends the worker loop once queued requests finish.
        self.tx.take();
        if let Some(join) = self.join.take() {
            if join.join().is_err() {
                log::error!("audio worker panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::{Duration, Instant};

    /// Sink that blocks each playback until the test releases it.
    struct GatedSink {
        played: Arc<Mutex<Vec<PathBuf>>>,
        release: Receiver<()>,
    }

    impl AudioSink for GatedSink {
        fn name(&self) -> &'static str {
            "gated"
        }

        fn play(&mut self, path: &Path, _volume: f32) -> Result<()> {
            let _ = self.release.recv();
            self.played.lock().unwrap().push(path.to_path_buf());
            Ok(())
        }
    }

    fn gated_worker(
        overlap: OverlapPolicy,
        depth: usize,
    ) -> (AudioHandle, Arc<Mutex<Vec<PathBuf>>>, mpsc::Sender<()>) {
        let played = Arc::new(Mutex::new(Vec::new()));
        let (release_tx, release_rx) = mpsc::channel();
        let sink = GatedSink {
            played: played.clone(),
            release: release_rx,
        };
        let handle = AudioWorker::spawn(Box::new(sink), overlap, depth).unwrap();
        (handle, played, release_tx)
    }

    fn request(name: &str) -> PlayRequest {
        PlayRequest {
            path: PathBuf::from(name),
            volume: 1.0,
        }
    }

    fn wait_idle(handle: &AudioHandle) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while handle.pending() > 0 {
            assert!(Instant::now() < deadline, "audio worker never went idle");
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn drop_policy_rejects_while_playing() {
        let (handle, played, release) = gated_worker(OverlapPolicy::Drop, 4);

        assert_eq!(handle.submit(request("a.wav")), SubmitOutcome::Accepted);
        assert_eq!(handle.submit(request("b.wav")), SubmitOutcome::Dropped);

        release.send(()).unwrap();
        wait_idle(&handle);
        assert_eq!(handle.submit(request("c.wav")), SubmitOutcome::Accepted);
        release.send(()).unwrap();
        wait_idle(&handle);

        let played = played.lock().unwrap().clone();
        assert_eq!(played, vec![PathBuf::from("a.wav"), PathBuf::from("c.wav")]);
    }

    #[test]
    fn queue_policy_buffers_up_to_depth() {
        let (handle, played, release) = gated_worker(OverlapPolicy::Queue, 2);

        let outcomes: Vec<SubmitOutcome> = ["a", "b", "c", "d", "e"]
            .iter()
            .map(|n| handle.submit(request(n)))
            .collect();
        // One request may already be on the worker, two more fit the channel.
        let accepted = outcomes
            .iter()
            .filter(|o| **o == SubmitOutcome::Accepted)
            .count();
        assert!((2..=3).contains(&accepted), "accepted {accepted}");
        assert_eq!(outcomes[0], SubmitOutcome::Accepted);
        assert_eq!(outcomes[1], SubmitOutcome::Accepted);

        for _ in 0..accepted {
            release.send(()).unwrap();
        }
        wait_idle(&handle);
        assert_eq!(played.lock().unwrap().len(), accepted);
    }

    #[test]
    fn submit_never_blocks_on_a_stuck_sink() {
        let (handle, _played, release) = gated_worker(OverlapPolicy::Queue, 1);
        let start = Instant::now();
        for i in 0..100 {
            handle.submit(request(&format!("{i}.wav")));
        }
        assert!(start.elapsed() < Duration::from_secs(1));
        // Unblock everything so the worker can be joined on drop.
        for _ in 0..100 {
            let _ = release.send(());
        }
    }

    #[test]
    fn command_sink_substitutes_placeholders() {
        let sink = CommandSink::new(vec![
            "paplay".to_string(),
            "--volume={volume}".to_string(),
            "{path}".to_string(),
        ])
        .unwrap();
        let argv = sink.expand(Path::new("/tmp/alarm.wav"), 0.5);
        assert_eq!(argv, vec!["paplay", "--volume=0.50", "/tmp/alarm.wav"]);
        assert!(sink.applies_volume());
    }

    #[test]
    fn default_player_ignores_volume() {
        let sink = CommandSink::default();
        assert!(!sink.applies_volume());
        let argv = sink.expand(Path::new("/tmp/alarm.wav"), 0.25);
        assert_eq!(argv, vec!["aplay", "-q", "/tmp/alarm.wav"]);
    }

    #[test]
    fn command_sink_requires_a_program() {
        assert!(CommandSink::new(Vec::new()).is_err());
        assert!(CommandSink::new(vec![" ".to_string()]).is_err());
    }

    #[test]
    fn command_sink_reports_missing_program() {
        let mut sink = CommandSink::new(vec!["definitely-not-a-player-7f3a".to_string()]).unwrap();
        assert!(sink.play(Path::new("alarm.wav"), 1.0).is_err());
    }
}
