//! Runs channel sums over a synthetic RGBA buffer and logs timing.
//!
//! Run with: `cargo run -p pixel_reduce --release -- --samples 10000000 --runs 10`

use std::time::Duration;

use anyhow::{Context, bail};
use clap::{Parser, ValueEnum};
use pixel_reduce::{
    BatchSize, Channel, DEFAULT_LEAF_LEN, Pipeline, PipelineConfig, ReduceStrategy, Sample,
    SampleBuffer,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ReduceArg {
    Sequential,
    Tree,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ChannelArg {
    Red,
    Green,
    Blue,
    Alpha,
}

impl From<ChannelArg> for Channel {
    fn from(arg: ChannelArg) -> Self {
        match arg {
            ChannelArg::Red => Channel::Red,
            ChannelArg::Green => Channel::Green,
            ChannelArg::Blue => Channel::Blue,
            ChannelArg::Alpha => Channel::Alpha,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "pixel_reduce", version, about = "Parallel channel sum benchmark")]
struct Args {
    /// Number of synthetic samples.
    #[arg(long, default_value_t = 1_000_000)]
    samples: usize,

    /// Samples per map batch, or "auto".
    #[arg(long, default_value = "auto", value_parser = parse_batch_size)]
    batch_size: BatchSize,

    #[arg(long, value_enum, default_value_t = ReduceArg::Tree)]
    reduce: ReduceArg,

    /// Values per tree-reduce leaf.
    #[arg(long, default_value_t = DEFAULT_LEAF_LEN)]
    leaf_len: usize,

    /// Dedicated worker threads. Uses the global pool when omitted.
    #[arg(long)]
    threads: Option<usize>,

    #[arg(long, value_enum, default_value_t = ChannelArg::Red)]
    channel: ChannelArg,

    #[arg(long, default_value_t = 5)]
    runs: usize,

    /// Log filter used when RUST_LOG is not set.
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn parse_batch_size(s: &str) -> Result<BatchSize, String> {
    if s.eq_ignore_ascii_case("auto") {
        return Ok(BatchSize::Auto);
    }
    let size: usize = s
        .parse()
        .map_err(|e| format!("invalid batch size '{s}': {e}"))?;
    BatchSize::fixed(size).map_err(|e| e.to_string())
}

/// Deterministic hash noise, so every run sees the same pixels.
fn synthetic_samples(count: usize) -> Vec<Sample> {
    (0..count)
        .map(|i| {
            let hash = (i as u32).wrapping_mul(2654435761) ^ (i as u32 >> 7);
            Sample::from_array(hash.to_le_bytes())
        })
        .collect()
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    common::log_setup::setup_logging(&args.log_level)?;

    if args.runs == 0 {
        bail!("--runs must be at least 1");
    }

    let reduce = match args.reduce {
        ReduceArg::Sequential => ReduceStrategy::Sequential,
        ReduceArg::Tree => ReduceStrategy::Tree {
            leaf_len: args.leaf_len,
        },
    };
    let mut config = PipelineConfig::default()
        .with_batch_size(args.batch_size)
        .with_reduce(reduce);
    if let Some(threads) = args.threads {
        config = config.with_threads(threads);
    }
    let pipeline = Pipeline::new(config).context("Failed to create pipeline")?;

    let channel = Channel::from(args.channel);
    let samples = synthetic_samples(args.samples);
    let buffer = SampleBuffer::new(&samples);
    let expected: u64 = buffer.iter().map(|s| u64::from(s.channel(channel))).sum();

    tracing::info!(
        samples = args.samples,
        channel = %channel,
        config = ?pipeline.config(),
        runs = args.runs,
        "Starting channel sum"
    );

    let mut timings = Vec::with_capacity(args.runs);
    for run in 0..args.runs {
        let metrics = pipeline
            .sum_channel(buffer, channel)
            .with_context(|| format!("Run {run} failed"))?;
        if metrics.aggregate != expected {
            bail!(
                "Run {run} returned {} but a sequential sum gives {expected}",
                metrics.aggregate
            );
        }
        tracing::info!(
            run,
            samples_per_sec = metrics.samples_per_second(),
            "{metrics}"
        );
        timings.push(metrics.elapsed);
    }

    let total: Duration = timings.iter().sum();
    let mean = total / timings.len() as u32;
    let min = timings.iter().min().copied().unwrap_or_default();
    tracing::info!(?mean, ?min, aggregate = expected, "Finished {} runs", args.runs);

    Ok(())
}
