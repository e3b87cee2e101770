//! Per-channel render driver.
//!
//! A render builds a fresh voice per channel from the instrument's
//! parameters and a channel-derived seed, pulls it through a
//! [`MultirateContext`], and applies the post fade. Channels share nothing
//! but the read-only parameters and the cancel flag, so [`render_stereo`]
//! runs them on scoped threads.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use clangor_core::{MultirateContext, channel_seed};
use tracing::{debug, info};

use crate::RenderParams;
use crate::drum::DrumVoice;
use crate::error::RenderError;
use crate::instrument::Instrument;
use crate::pad::PadVoice;
use crate::voice::Voice;

/// Rendered samples of one channel.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOutput {
    /// Output-rate samples, exactly `floor(sample_rate × duration)` long.
    pub samples: Vec<f64>,
    /// Length of the dry sound, for voices that report one; never longer
    /// than `samples`.
    pub dry_length: Option<usize>,
}

/// Renders one channel of `instrument`.
///
/// `cancel` is polled once per output sample; raising it ends the render
/// with [`RenderError::Cancelled`].
pub fn render_channel(
    instrument: &Instrument,
    channel: usize,
    cancel: &AtomicBool,
) -> Result<RenderOutput, RenderError> {
    let render = instrument.render_params();
    let seed = channel_seed(render.seed, channel, render.stereo_seed);
    debug!(
        kind = instrument.kind(),
        channel,
        seed,
        oversample = %render.oversample,
        "render started"
    );

    let result = match instrument {
        Instrument::Drum(params) => render_voice(DrumVoice::new(params, seed), render, cancel),
        Instrument::Pad(params) => render_voice(PadVoice::new(params, seed), render, cancel),
    };

    match &result {
        Ok(output) => debug!(channel, samples = output.samples.len(), "render finished"),
        Err(RenderError::Cancelled) => info!(channel, "render cancelled"),
        Err(_) => {}
    }
    result
}

/// Renders the left and right channels of `instrument` in parallel.
pub fn render_stereo(
    instrument: &Instrument,
    cancel: &AtomicBool,
) -> Result<[RenderOutput; 2], RenderError> {
    thread::scope(|scope| {
        let left = scope.spawn(|| render_channel(instrument, 0, cancel));
        let right = scope.spawn(|| render_channel(instrument, 1, cancel));
        let left = left.join().map_err(|_| RenderError::ChannelPanicked(0))??;
        let right = right.join().map_err(|_| RenderError::ChannelPanicked(1))??;
        Ok([left, right])
    })
}

/// Drives `voice` for one render.
pub fn render_voice<V: Voice>(
    mut voice: V,
    render: &RenderParams,
    cancel: &AtomicBool,
) -> Result<RenderOutput, RenderError> {
    let len = render.output_length();
    let dry_length = voice.dry_length().map(|n| n.min(len));

    let mut ctx = MultirateContext::new(render.oversample);
    let mut first = Some(voice.first_sample());
    let mut samples = ctx
        .render_until(
            len,
            || first.take().unwrap_or_else(|| voice.process()),
            || cancel.load(Ordering::Relaxed),
        )
        .ok_or(RenderError::Cancelled)?;

    apply_decay(&mut samples, render.decay_to);
    Ok(RenderOutput {
        samples,
        dry_length,
    })
}

/// Fades `samples` geometrically so the gain past the last sample is
/// `decay_to`.
pub fn apply_decay(samples: &mut [f64], decay_to: f64) {
    if samples.is_empty() || decay_to == 1.0 {
        return;
    }
    let decay = libm::pow(decay_to.max(0.0), 1.0 / samples.len() as f64);
    let mut gain = 1.0;
    for s in samples {
        *s *= gain;
        gain *= decay;
    }
}
