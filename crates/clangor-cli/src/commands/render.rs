//! Offline render of a preset to a WAV file.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use anyhow::Context;
use clangor_config::{ConfigError, Preset, get_factory_preset};
use clangor_synth::{OversampleFactor, RenderError, RenderOutput, render_channel, render_stereo};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use crate::wav::write_wav;

#[derive(Args)]
pub struct RenderArgs {
    /// Preset file (TOML)
    #[arg(value_name = "PRESET", required_unless_present = "factory")]
    preset: Option<PathBuf>,

    /// Factory preset name instead of a file
    #[arg(short, long, conflicts_with = "preset")]
    factory: Option<String>,

    /// Output WAV file
    #[arg(short, long)]
    output: PathBuf,

    /// Render the left channel only
    #[arg(long)]
    mono: bool,

    /// Override the preset seed
    #[arg(long)]
    seed: Option<u64>,

    /// Override the oversampling factor (1, 2, 16, or 64)
    #[arg(long)]
    oversample: Option<OversampleFactor>,

    /// Override the render duration in seconds
    #[arg(long)]
    duration: Option<f64>,

    /// Fail on out-of-range parameters instead of clamping them
    #[arg(long)]
    strict: bool,
}

pub fn run(args: RenderArgs) -> anyhow::Result<()> {
    let mut preset = load_preset(&args)?;

    let render = preset.instrument.render_params_mut();
    if let Some(seed) = args.seed {
        render.seed = seed;
    }
    if let Some(oversample) = args.oversample {
        render.oversample = oversample;
    }
    if let Some(duration) = args.duration {
        render.duration_seconds = duration;
    }

    if let Err(err) = preset.validate() {
        if args.strict {
            return Err(ConfigError::from(err)).context(format!("preset '{}'", preset.name));
        }
        warn!(preset = %preset.name, %err, "clamping out-of-range parameters");
        preset = preset.clamped();
    }

    let cancel = Arc::new(AtomicBool::new(false));
    let handler_flag = Arc::clone(&cancel);
    ctrlc::set_handler(move || {
        handler_flag.store(true, Ordering::SeqCst);
    })?;

    let render = preset.instrument.render_params();
    let sample_rate = render.sample_rate.round() as u32;
    println!(
        "Rendering '{}' ({}, {:.2}s at {} Hz, oversample x{})",
        preset.name,
        preset.instrument.kind(),
        render.duration_seconds,
        sample_rate,
        render.oversample
    );

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner} {msg} [{elapsed}]")?);
    spinner.set_message("rendering");
    spinner.enable_steady_tick(Duration::from_millis(100));

    let start = Instant::now();
    let result = if args.mono {
        render_channel(&preset.instrument, 0, &cancel).map(|output| vec![output])
    } else {
        render_stereo(&preset.instrument, &cancel).map(Vec::from)
    };

    let outputs = match result {
        Ok(outputs) => {
            spinner.finish_with_message("done");
            outputs
        }
        Err(RenderError::Cancelled) => {
            spinner.abandon_with_message("cancelled");
            anyhow::bail!("render cancelled, nothing written");
        }
        Err(err) => {
            spinner.abandon();
            return Err(err.into());
        }
    };
    info!(elapsed_ms = start.elapsed().as_millis() as u64, "render complete");

    print_stats(&outputs, sample_rate);

    let channels: Vec<Vec<f64>> = outputs.into_iter().map(|o| o.samples).collect();
    write_wav(&args.output, &channels, sample_rate)?;
    println!("Wrote {}", args.output.display());
    Ok(())
}

fn load_preset(args: &RenderArgs) -> anyhow::Result<Preset> {
    if let Some(name) = &args.factory {
        return get_factory_preset(name)
            .ok_or_else(|| ConfigError::PresetNotFound(name.clone()).into());
    }
    match &args.preset {
        Some(path) => {
            Preset::load(path).with_context(|| format!("loading preset {}", path.display()))
        }
        None => anyhow::bail!("no preset given; pass a file or --factory NAME"),
    }
}

fn print_stats(outputs: &[RenderOutput], sample_rate: u32) {
    for (channel, output) in outputs.iter().enumerate() {
        println!(
            "  channel {}: {} samples, peak {:.1} dB, RMS {:.1} dB",
            channel,
            output.samples.len(),
            linear_to_db(peak(&output.samples)),
            linear_to_db(rms(&output.samples))
        );
    }
    if let Some(dry) = outputs.first().and_then(|o| o.dry_length) {
        println!(
            "  dry length: {} samples ({:.2}s)",
            dry,
            dry as f64 / f64::from(sample_rate)
        );
    }
}

fn peak(samples: &[f64]) -> f64 {
    samples.iter().fold(0.0, |acc, s| acc.max(s.abs()))
}

fn rms(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    (samples.iter().map(|s| s * s).sum::<f64>() / samples.len() as f64).sqrt()
}

fn linear_to_db(linear: f64) -> f64 {
    20.0 * linear.max(1e-10).log10()
}
