//! vox-play - stream a raw audio file through the playback engine
//!
//! Developer tool and end-to-end check: reads a headerless mu-law or
//! s16le file, pushes it chunk by chunk over the control channel the way
//! a voice transport would, and plays it on the default (or named)
//! output device. Exits when the engine reports the stream finished.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vox_ap::audio::AudioOutput;
use vox_ap::{PlaybackEngine, PlayerEvent, SampleFormat};

/// Command-line arguments for vox-play
#[derive(Parser, Debug)]
#[command(name = "vox-play")]
#[command(about = "Stream a raw mu-law or s16le file to an audio output device")]
#[command(version)]
struct Args {
    /// Raw (headerless) audio file to play
    input: PathBuf,

    /// Input sample format: "mulaw" or "linear16"
    #[arg(short, long, default_value = "mulaw", env = "VOX_FORMAT")]
    format: String,

    /// Input sample rate in Hz
    #[arg(short = 'r', long, default_value = "8000", env = "VOX_SAMPLE_RATE")]
    sample_rate: u32,

    /// Bytes pushed per control message
    #[arg(short, long, default_value = "3200")]
    chunk_bytes: usize,

    /// Output device name (default device when omitted)
    #[arg(short, long)]
    device: Option<String>,

    /// Playback volume, 0.0 to 1.0
    #[arg(long, default_value = "1.0")]
    volume: f32,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vox_ap=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let format = match args.format.as_str() {
        "mulaw" => SampleFormat::MuLaw8,
        "linear16" => SampleFormat::Linear16,
        other => bail!("Unknown format '{}' (expected \"mulaw\" or \"linear16\")", other),
    };
    if args.chunk_bytes == 0 {
        bail!("Chunk size must be at least one byte");
    }

    let data = std::fs::read(&args.input)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;
    info!(
        "Loaded {} bytes of {} audio at {} Hz",
        data.len(),
        args.format,
        args.sample_rate
    );

    let mut output =
        AudioOutput::new(args.device.clone()).context("Failed to open audio output")?;
    output.set_volume(args.volume);
    info!(
        "Output device: {} at {} Hz, {} channels",
        output.device_name(),
        output.sample_rate(),
        output.channels()
    );

    let (mut engine, mut handle, mut events) = PlaybackEngine::new(output.sample_rate());
    handle
        .set_format(format, Some(args.sample_rate))
        .context("Failed to send format message")?;

    output
        .start(move |out| engine.render(out))
        .context("Failed to start audio stream")?;

    // Pace the pushes like a streaming transport: each chunk is sent at
    // half its own play duration, keeping the queue ahead of the device
    // without flooding the control ring.
    let bytes_per_sample = match format {
        SampleFormat::MuLaw8 => 1,
        SampleFormat::Linear16 => 2,
    };
    let chunk_duration = Duration::from_secs_f64(
        (args.chunk_bytes / bytes_per_sample) as f64 / args.sample_rate as f64,
    );

    for chunk in data.chunks(args.chunk_bytes) {
        loop {
            match handle.push_buffer(chunk.to_vec()) {
                Ok(()) => break,
                Err(vox_ap::Error::ControlChannelFull { .. }) => {
                    // Ring full: the render side will catch up shortly
                    debug!("Control ring full, retrying");
                    tokio::time::sleep(chunk_duration).await;
                }
                Err(e) => return Err(e).context("Failed to push buffer"),
            }
        }
        tokio::time::sleep(chunk_duration / 2).await;
    }
    info!("All chunks pushed, waiting for playback to finish");

    loop {
        match events.recv().await {
            Some(PlayerEvent::StreamFinished { .. }) => {
                info!("Stream finished");
                break;
            }
            None => bail!("Engine event channel closed unexpectedly"),
        }
    }

    output.stop().context("Failed to stop audio stream")?;
    Ok(())
}
