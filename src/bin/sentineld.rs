//! sentineld - print area watchdog daemon
//!
//! This daemon:
//! 1. Loads configuration (file, then PRINT_SENTINEL_* overrides)
//! 2. Opens the detector (fatal if the model cannot be loaded)
//! 3. Pulls frames from the configured source
//! 4. Runs every frame through the monitor pipeline
//! 5. Plays the alarm sound on a background worker

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use print_sentinel::{
    open_backend, open_source, AudioSink, AudioWorker, CommandSink, Monitor, SentinelConfig,
    SilentSink, StatusReporter,
};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Config file (JSON, or TOML when the name ends in .toml).
    #[arg(long, env = "PRINT_SENTINEL_CONFIG")]
    config: Option<PathBuf>,
    /// Stop after this many frames.
    #[arg(long)]
    max_frames: Option<u64>,
    /// Log alarms instead of playing the sound.
    #[arg(long)]
    silent: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let cfg = SentinelConfig::load(args.config.as_deref())?;
    log::info!("model: {}", cfg.detector.model_path);
    log::info!("source: {}", cfg.source.url);
    log::info!(
        "alarm region: {:?} (enabled={}, threshold={:.2})",
        cfg.region.spec,
        cfg.region.enabled,
        cfg.region.threshold
    );

    let service = open_backend(&cfg.detector.model_path, cfg.detector.imgsz)
        .with_context(|| format!("failed to open detector {}", cfg.detector.model_path))?;
    let mut source = open_source(&cfg.source)?;
    log::info!("frame source: {}", source.describe());

    let sink: Box<dyn AudioSink> = if args.silent {
        Box::new(SilentSink)
    } else {
        let player = CommandSink::new(cfg.alarm.player_command.clone())?;
        if !player.applies_volume() && cfg.alarm.volume != 1.0 {
            log::warn!(
                "alarm_volume={} has no effect: player_command has no {{volume}} placeholder",
                cfg.alarm.volume
            );
        }
        Box::new(player)
    };
    if !cfg.alarm.sound_path.exists() {
        log::warn!(
            "alarm sound {} not found; alarms will be logged without sound",
            cfg.alarm.sound_path.display()
        );
    }
    let audio = AudioWorker::spawn(sink, cfg.alarm.overlap, cfg.alarm.queue_depth)?;

    let mut monitor = Monitor::new(&cfg, service, audio);
    let mut status = StatusReporter::new(cfg.status_interval);

    let running = Arc::new(AtomicBool::new(true));
    let handler_flag = running.clone();
    ctrlc::set_handler(move || handler_flag.store(false, Ordering::SeqCst))
        .context("failed to install Ctrl-C handler")?;

    let frame_period = Duration::from_secs_f64(1.0 / cfg.source.fps as f64);
    log::info!("sentineld running. press Ctrl-C to stop");

    while running.load(Ordering::SeqCst) {
        if args
            .max_frames
            .is_some_and(|max| monitor.stats().frames >= max)
        {
            break;
        }

        let started = Instant::now();
        let Some(frame) = source.next_frame()? else {
            log::info!("frame source exhausted");
            break;
        };

        let report = monitor.process_frame(&frame, Instant::now());
        status.record(Instant::now(), &report, |id| monitor.class_label(id));

        if source.is_live() {
            let elapsed = started.elapsed();
            if elapsed < frame_period {
                std::thread::sleep(frame_period - elapsed);
            }
        }
    }

    let stats = monitor.stats();
    log::info!(
        "sentineld stopped: frames={} inferences={} alarm_frames={} alarms={} sounds={}",
        stats.frames,
        stats.inferences,
        stats.alarm_frames,
        stats.alarms_fired,
        stats.sounds_dispatched
    );
    Ok(())
}
