//! Run a live mixing session with synthetic participants.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tessera_common::config::MixerDefaults;
use tessera_frame::{PatternColor, TestPatternSource};
use tessera_mixer::{DecodingEvent, LocalControls, MixerStatsSnapshot, VideoMixer};
use tokio::time::{Instant, MissedTickBehavior};

use crate::commands::layout::MAX_PARTICIPANTS;
use crate::y4m_sink::Y4mSink;

const MIXER_ID: &str = "session";
const PARTICIPANT_WIDTH: u32 = 320;
const PARTICIPANT_HEIGHT: u32 = 240;

/// Distinct YUV colours for participants, preview first.
const PALETTE: [[u8; 3]; 6] = [
    [81, 90, 240],
    [145, 54, 34],
    [41, 240, 110],
    [210, 16, 146],
    [170, 166, 16],
    [106, 202, 222],
];

/// A geometry change scheduled during the session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResizeAt {
    pub width: u32,
    pub height: u32,
    pub after_secs: f64,
}

impl ResizeAt {
    /// Parse `WxH@SECS`, e.g. `320x240@2.5`.
    pub fn parse(spec: &str) -> anyhow::Result<Self> {
        let (size, secs) = spec
            .split_once('@')
            .ok_or_else(|| anyhow::anyhow!("Expected WxH@SECS, got '{spec}'"))?;
        let (w, h) = size
            .split_once('x')
            .ok_or_else(|| anyhow::anyhow!("Expected WxH before '@', got '{size}'"))?;
        let after_secs: f64 = secs.parse()?;
        if !after_secs.is_finite() || after_secs < 0.0 {
            anyhow::bail!("Resize time must be a non-negative number of seconds");
        }
        Ok(Self {
            width: w.parse()?,
            height: h.parse()?,
            after_secs,
        })
    }
}

pub struct SessionOptions {
    pub width: u32,
    pub height: u32,
    pub participants: usize,
    pub fps: u32,
    pub duration_secs: f64,
    pub output: PathBuf,
    pub resize: Option<ResizeAt>,
}

#[derive(Serialize)]
struct SessionReport {
    stats: MixerStatsSnapshot,
    drop_rate_percent: f64,
    sources: usize,
    files: Vec<PathBuf>,
    events: Vec<DecodingEvent>,
}

pub async fn run(mut config: MixerDefaults, options: SessionOptions) -> anyhow::Result<()> {
    if options.participants == 0 {
        anyhow::bail!("At least one participant (the local preview) is required");
    }
    if options.participants > MAX_PARTICIPANTS {
        anyhow::bail!("At most {MAX_PARTICIPANTS} participants are supported");
    }
    if options.fps == 0 {
        anyhow::bail!("FPS must be positive");
    }
    if !options.duration_secs.is_finite() || options.duration_secs <= 0.0 {
        anyhow::bail!("Duration must be a positive number of seconds");
    }
    std::fs::create_dir_all(&options.output)?;

    println!("Starting mixing session");
    println!("  Canvas: {}x{}", options.width, options.height);
    println!("  Participants: {}", options.participants);
    println!("  FPS: {}", options.fps);
    println!("  Duration: {:.1}s", options.duration_secs);
    println!("  Output: {}", options.output.display());
    if let Some(resize) = options.resize {
        println!(
            "  Resize: {}x{} after {:.1}s",
            resize.width, resize.height, resize.after_secs
        );
    }
    println!();

    let sources: Vec<Arc<TestPatternSource>> = (0..options.participants)
        .map(|i| {
            Arc::new(
                TestPatternSource::new(
                    PARTICIPANT_WIDTH,
                    PARTICIPANT_HEIGHT,
                    PatternColor::Yuv(PALETTE[i % PALETTE.len()]),
                )
                .with_moving_bar(),
            )
        })
        .collect();

    config.canvas_width = options.width;
    config.canvas_height = options.height;
    let controls = Arc::new(LocalControls::new(sources[0].clone()));
    let sink = Arc::new(Y4mSink::new(
        &options.output,
        config.sink_name(MIXER_ID),
        options.fps,
    ));
    let mixer = VideoMixer::new(MIXER_ID, &config, controls.clone(), sink.clone())?;
    for remote in &sources[1..] {
        mixer.attach_source(&**remote);
    }
    let source_count = mixer.source_count();

    let deadline = Instant::now() + Duration::from_secs_f64(options.duration_secs);
    let period = Duration::from_secs_f64(1.0 / f64::from(options.fps));

    let mut tasks = Vec::new();
    for source in &sources {
        let source = Arc::clone(source);
        tasks.push(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if Instant::now() >= deadline {
                    break;
                }
                let source = Arc::clone(&source);
                match tokio::task::spawn_blocking(move || source.emit()).await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => tracing::warn!(error = %e, "Participant failed to emit"),
                    Err(e) => tracing::error!(error = %e, "Emit task panicked"),
                }
            }
        }));
    }

    if let Some(resize) = options.resize {
        let mixer = Arc::clone(&mixer);
        tasks.push(tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs_f64(resize.after_secs)).await;
            if Instant::now() >= deadline {
                return;
            }
            if let Err(e) = mixer.set_dimensions(resize.width, resize.height) {
                tracing::warn!(error = %e, "Resize rejected");
            }
        }));
    }

    let abort_handles: Vec<_> = tasks.iter().map(|task| task.abort_handle()).collect();
    tokio::select! {
        _ = join_all(tasks) => {}
        _ = tokio::signal::ctrl_c() => {
            println!("Interrupted, stopping session...");
            for handle in &abort_handles {
                handle.abort();
            }
        }
    }

    let stats = mixer.stats();
    drop(mixer);

    let report = SessionReport {
        drop_rate_percent: stats.drop_rate(),
        stats,
        sources: source_count,
        files: sink.files(),
        events: controls.events(),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn join_all(tasks: Vec<tokio::task::JoinHandle<()>>) {
    for task in tasks {
        if let Err(e) = task.await {
            tracing::error!(error = %e, "Session task failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_resize_spec() {
        assert_eq!(
            ResizeAt::parse("320x240@2.5").unwrap(),
            ResizeAt {
                width: 320,
                height: 240,
                after_secs: 2.5,
            }
        );
    }

    #[test]
    fn test_rejects_malformed_resize_spec() {
        assert!(ResizeAt::parse("320x240").is_err());
        assert!(ResizeAt::parse("320@1").is_err());
        assert!(ResizeAt::parse("axb@1").is_err());
        assert!(ResizeAt::parse("320x240@-1").is_err());
    }
}
