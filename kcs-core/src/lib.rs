// kcs-core
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Signal-to-bits decoder core for Kansas City Standard and related FSK cassette-tape encodings.
//!
//! This crate owns the hard part of the pipeline: short-time spectral analysis, adaptive
//! thresholding, bit-timeline smoothing, and the frame-synchronous byte decoder. It knows nothing
//! about file formats or command-line arguments — those live in `kcs-wav` and the `kcs-cli`
//! binary.

pub mod bits;
pub mod config;
pub mod dsp;
pub mod emit;
pub mod errors;
pub mod frame;
pub mod ingest;
pub mod threshold;

pub use config::{ChannelSelect, DecoderConfig, Derived, FrameLayout, Parity, WindowKind};
pub use errors::{Error, Result};
pub use frame::DecodeResult;
pub use ingest::{SampleFrame, SampleSource};
pub use threshold::Thresholds;

/// One point of the optional `.dat` graph output: step index and `100·(hi/avhi - lo/avlo)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GraphPoint {
    pub step: usize,
    pub value: f64,
}

/// Everything the pipeline produced for one input waveform.
#[derive(Debug, Default)]
pub struct PipelineOutput {
    pub decode: DecodeResult,
    pub graph: Option<Vec<GraphPoint>>,
}

fn build_graph(lo: &[f64], hi: &[f64], thresholds: &Thresholds) -> Vec<GraphPoint> {
    lo.iter()
        .zip(hi.iter())
        .enumerate()
        .map(|(step, (&l, &h))| GraphPoint {
            step,
            value: 100.0 * (h / thresholds.avhi - l / thresholds.avlo),
        })
        .collect()
}

/// Runs the full pipeline over one already-ingested waveform source: sample ingestion,
/// spectral analysis, edge trimming, adaptive thresholding, bit-timeline construction (with
/// smoothing unless `graph_mode` is set), and frame decoding.
pub fn run(source: &mut dyn SampleSource, cfg: &DecoderConfig, graph_mode: bool) -> Result<PipelineOutput> {
    let sample_rate = source.sample_rate();
    let derived = Derived::compute(cfg, sample_rate)?;

    log::info!(
        "frequencies: lo={}Hz (bin {}) hi={}Hz (bin {}) W={} step={} bit_width={:.2}",
        cfg.lo_hz,
        derived.lo_bin.n1,
        cfg.hi_hz,
        derived.hi_bin.n1,
        derived.fft_width,
        derived.step,
        derived.bit_width
    );

    let samples = ingest::ingest(source, cfg.channel, cfg.max_samples)?;
    log::info!("ingested {} samples at {} Hz", samples.len(), sample_rate);

    let mut analyzer = dsp::SpectralAnalyzer::new(&derived, cfg);
    let (lo, hi) = analyzer.analyze(&samples, &derived, cfg);
    log::info!("computed {} spectral steps", lo.len());

    let global = threshold::global_means(&lo, &hi);

    let mut trimmed_lo = lo.clone();
    let mut trimmed_hi = hi.clone();
    threshold::trim_edges(&mut trimmed_lo, &mut trimmed_hi, &global);

    let thresholds = threshold::refine(&trimmed_lo, &trimmed_hi, &global);
    log::info!("class averages: avlo={:.3} avhi={:.3}", thresholds.avlo, thresholds.avhi);

    let graph = graph_mode.then(|| build_graph(&lo, &hi, &thresholds));

    let mut timeline = bits::build_timeline(&trimmed_lo, &trimmed_hi, &thresholds);
    if !graph_mode {
        bits::smooth(&mut timeline, cfg.steps_per_bit);
    }

    let decode = frame::decode(&timeline, cfg, &derived);
    if decode.max_variance > 0.0 {
        log::info!("max tracked speed variance: {:.3}", decode.max_variance);
    }

    Ok(PipelineOutput { decode, graph })
}
