//! # Pitch - Command-Line Frequency Estimator
//!
//! Drives `pitch-core` the way a platform bridge would: one estimator per
//! session, fixed-size frames in, one number per frame out.
//!
//! ## Architecture
//! - **Producer**: file/stdin recording sliced in place, or audio device
//!   callbacks cut into frames
//! - **Communication**: Crossbeam channel carrying live frames to the analysis loop
//! - **Analysis**: stateless estimator followed by optional smoothing

mod audio;
mod input;

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::PathBuf;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use pitch_core::{EstimatorConfig, FrequencyEstimator, Smoother, SmoothingStrategy};

const DEFAULT_SAMPLE_RATE: u32 = 44100;
const DEFAULT_BUFFER_SIZE: usize = 4096;

#[derive(Parser)]
#[command(name = "pitch")]
#[command(about = "Estimate the fundamental frequency of mono audio frames")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Estimate the frequency of every frame in a text sample file
    Analyze {
        /// Sample file (reads stdin when omitted)
        file: Option<PathBuf>,

        #[command(flatten)]
        estimator: EstimatorArgs,

        /// Samples between frame starts (defaults to the buffer size)
        #[arg(long)]
        hop: Option<usize>,
    },

    /// Print a synthetic tone as text samples
    Tone {
        /// Fundamental frequency in Hz
        #[arg(short, long)]
        frequency: f64,

        /// Amplitude of the 2nd harmonic relative to the fundamental
        #[arg(long, default_value = "0.0")]
        harmonic_ratio: f64,

        #[arg(long, default_value = "1.0")]
        amplitude: f64,

        #[arg(long, default_value = "1.0")]
        seconds: f64,

        #[arg(long, default_value_t = DEFAULT_SAMPLE_RATE)]
        sample_rate: u32,
    },

    /// Write an estimator configuration as JSON
    Config {
        /// Output file (prints to stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[arg(long, default_value_t = DEFAULT_SAMPLE_RATE)]
        sample_rate: u32,

        #[arg(long, default_value_t = DEFAULT_BUFFER_SIZE)]
        buffer_size: usize,
    },

    /// Estimate frequencies live from the default input device
    #[cfg(feature = "capture")]
    Listen {
        #[command(flatten)]
        estimator: EstimatorArgs,

        /// Stop after this many seconds
        #[arg(long, default_value = "10.0")]
        seconds: f64,
    },
}

#[derive(Args)]
struct EstimatorArgs {
    /// JSON estimator configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Overrides the configured sample rate
    #[arg(long)]
    sample_rate: Option<u32>,

    /// Overrides the configured buffer size (4 x a power of two)
    #[arg(long)]
    buffer_size: Option<usize>,

    /// none, median or debounce
    #[arg(long, default_value = "none")]
    smoothing: SmoothingStrategy,
}

impl EstimatorArgs {
    fn resolve(&self) -> Result<EstimatorConfig> {
        let mut config = match &self.config {
            Some(path) => EstimatorConfig::load(path)
                .with_context(|| format!("loading config from {}", path.display()))?,
            None => EstimatorConfig::new(DEFAULT_SAMPLE_RATE, DEFAULT_BUFFER_SIZE),
        };
        if let Some(rate) = self.sample_rate {
            config.sample_rate = rate;
        }
        if let Some(size) = self.buffer_size {
            config.buffer_size = size;
        }

        // Bad configs still run; every frame will come back as an error sentinel.
        if let Err(e) = config.validate() {
            warn!("{}", e);
        }
        Ok(config)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Analyze {
            file,
            estimator,
            hop,
        } => analyze(file, &estimator, hop),
        Commands::Tone {
            frequency,
            harmonic_ratio,
            amplitude,
            seconds,
            sample_rate,
        } => {
            let len = (seconds.max(0.0) * sample_rate as f64).round() as usize;
            let samples =
                input::synthesize_tone(frequency, harmonic_ratio, amplitude, sample_rate, len);
            input::write_samples(BufWriter::new(io::stdout().lock()), &samples)
        }
        Commands::Config {
            output,
            sample_rate,
            buffer_size,
        } => {
            let config = EstimatorConfig::new(sample_rate, buffer_size);
            match output {
                Some(path) => {
                    config
                        .save(&path)
                        .with_context(|| format!("saving config to {}", path.display()))?;
                    info!(path = %path.display(), "config written");
                    Ok(())
                }
                None => {
                    println!("{}", serde_json::to_string_pretty(&config)?);
                    Ok(())
                }
            }
        }
        #[cfg(feature = "capture")]
        Commands::Listen { estimator, seconds } => listen(&estimator, seconds),
    }
}

fn init_logging(verbose: u8) {
    let default_filter = match verbose {
        0 => "pitch=info,pitch_core=warn",
        1 => "pitch=debug,pitch_core=debug",
        _ => "pitch=trace,pitch_core=trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(io::stderr)
        .init();
}

fn analyze(file: Option<PathBuf>, args: &EstimatorArgs, hop: Option<usize>) -> Result<()> {
    let config = args.resolve()?;
    let samples = match &file {
        Some(path) => {
            let f = File::open(path).with_context(|| format!("opening {}", path.display()))?;
            input::read_samples(BufReader::new(f))?
        }
        None => input::read_samples(io::stdin().lock())?,
    };
    info!(
        samples = samples.len(),
        sample_rate = config.sample_rate,
        buffer_size = config.buffer_size,
        "analyzing"
    );

    let hop = hop.unwrap_or(config.buffer_size);
    let leftover = audio::trailing_samples(samples.len(), config.buffer_size, hop);
    if leftover > 0 {
        debug!(leftover, "trailing samples shorter than a frame");
    }

    let seconds_per_hop =
        hop.clamp(1, config.buffer_size.max(1)) as f64 / config.sample_rate.max(1) as f64;
    let estimator = FrequencyEstimator::with_config(config);
    let mut smoother = Smoother::new(args.smoothing);
    let mut out = BufWriter::new(io::stdout().lock());

    writeln!(out, "# frame\tseconds\traw_hz\tsmoothed_hz")?;
    let frames = audio::frames(&samples, estimator.config().buffer_size, hop);
    let frames = report_frames(frames, &estimator, &mut smoother, |index, raw, smoothed| {
        writeln!(
            out,
            "{index}\t{:.3}\t{raw:.2}\t{smoothed:.2}",
            index as f64 * seconds_per_hop
        )
    })?;
    out.flush()?;

    info!(frames, "analysis finished");
    Ok(())
}

/// Estimates each frame in order, handing `emit` the frame index, the raw
/// result and the smoothed result. Frames are pulled one at a time.
fn report_frames<I, F>(
    frames: I,
    estimator: &FrequencyEstimator,
    smoother: &mut Smoother,
    mut emit: F,
) -> io::Result<usize>
where
    I: IntoIterator,
    I::Item: AsRef<[f64]>,
    F: FnMut(usize, f64, f64) -> io::Result<()>,
{
    let mut count = 0;
    for frame in frames {
        let raw = estimator.find_frequency(frame.as_ref());
        let smoothed = smoother.push(raw);
        emit(count, raw, smoothed)?;
        count += 1;
    }
    Ok(count)
}

#[cfg(feature = "capture")]
fn listen(args: &EstimatorArgs, seconds: f64) -> Result<()> {
    use cpal::traits::StreamTrait;
    use std::time::Duration;

    let mut config = args.resolve()?;
    let (tx, rx) = crossbeam_channel::bounded::<Vec<f64>>(8);
    let (stream, sample_rate) =
        audio::start_audio_capture(tx, config.buffer_size, config.buffer_size, config.sample_rate)?;
    config.sample_rate = sample_rate;
    info!(sample_rate, buffer_size = config.buffer_size, "listening");

    let estimator = FrequencyEstimator::with_config(config);
    let mut smoother = Smoother::new(args.smoothing);
    let deadline = crossbeam_channel::after(Duration::from_secs_f64(seconds.max(0.0)));

    loop {
        crossbeam_channel::select! {
            recv(rx) -> msg => match msg {
                Ok(frame) => {
                    let raw = estimator.find_frequency(&frame);
                    let smoothed = smoother.push(raw);
                    println!("{raw:.2}\t{smoothed:.2}");
                }
                Err(_) => {
                    warn!("audio channel closed");
                    break;
                }
            },
            recv(deadline) -> _ => break,
        }
    }

    if let Err(e) = stream.pause() {
        warn!("error pausing stream: {}", e);
    }
    Ok(())
}
