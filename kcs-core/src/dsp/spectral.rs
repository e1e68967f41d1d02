// kcs-core
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The spectral analyzer: slides a window across the sample series, computes a power
//! spectrum per step, and extracts the low-tone and high-tone energies used by everything
//! downstream.

use std::sync::Arc;

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

use crate::config::{BinInterp, Derived, DecoderConfig};
use crate::dsp::window;

/// Owns a single FFT plan of width `W`, reused across every window position.
pub struct SpectralAnalyzer {
    fft: Arc<dyn Fft<f64>>,
    width: usize,
    kind: crate::config::WindowKind,
    windowed: Vec<f64>,
    freq: Vec<Complex<f64>>,
}

impl SpectralAnalyzer {
    pub fn new(derived: &Derived, cfg: &DecoderConfig) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(derived.fft_width);
        Self {
            fft,
            width: derived.fft_width,
            kind: cfg.window,
            windowed: vec![0.0; derived.fft_width],
            freq: vec![Complex::default(); derived.fft_width],
        }
    }

    /// Computes the power spectrum of length `W/2 + 1` for one window of samples.
    fn power_spectrum(&mut self, sub: &[f64]) -> &[Complex<f64>] {
        self.windowed.copy_from_slice(sub);
        window::apply(self.kind, &mut self.windowed);

        for (c, &re) in self.freq.iter_mut().zip(self.windowed.iter()) {
            *c = Complex::new(re, 0.0);
        }
        self.fft.process(&mut self.freq);
        &self.freq[..=self.width / 2]
    }

    fn bin_energy(spec: &[Complex<f64>], bin: &BinInterp, sum_of_three: bool) -> f64 {
        if sum_of_three && bin.n1 >= 1 && bin.n1 + 1 < spec.len() {
            spec[bin.n1 - 1].norm_sqr() + spec[bin.n1].norm_sqr() + spec[bin.n1 + 1].norm_sqr()
        }
        else {
            bin.a1 * spec[bin.n1].norm_sqr() + bin.a2 * spec[bin.n2].norm_sqr()
        }
    }

    /// Runs the analyzer over the whole sample series, returning the parallel `lo`/`hi` energy
    /// sequences of length `P = floor((N - W) / step) + 1` (0 if `N < W`).
    pub fn analyze(&mut self, samples: &[f64], derived: &Derived, cfg: &DecoderConfig) -> (Vec<f64>, Vec<f64>) {
        let n = samples.len();
        let w = derived.fft_width;
        if n < w {
            return (Vec::new(), Vec::new());
        }
        let p = (n - w) / derived.step + 1;

        let use_sum_of_three =
            cfg.assume_resampled && derived.lo_bin.is_exact() && derived.hi_bin.is_exact();

        let mut lo = Vec::with_capacity(p);
        let mut hi = Vec::with_capacity(p);

        for i in 0..p {
            let start = i * derived.step;
            let spec = self.power_spectrum(&samples[start..start + w]);
            lo.push(Self::bin_energy(spec, &derived.lo_bin, use_sum_of_three));
            hi.push(Self::bin_energy(spec, &derived.hi_bin, use_sum_of_three));
        }

        (lo, hi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ChannelSelect, FrameLayout, Parity, WindowKind};

    fn cuts_free_cfg() -> DecoderConfig {
        DecoderConfig {
            lo_hz: 1200.0,
            hi_hz: 2400.0,
            baud: 300.0,
            frame: FrameLayout { data_bits: 8, parity: Parity::None, stop_bits: 2 },
            window: WindowKind::Hann,
            steps_per_bit: 4,
            channel: ChannelSelect::Left,
            keep_short_runs: false,
            assume_resampled: false,
            bitstream_output: false,
            print_data: false,
            max_samples: None,
        }
    }

    #[test]
    fn pure_low_tone_favors_lo_bin() {
        let cfg = cuts_free_cfg();
        let sample_rate = 44100u32;
        let derived = Derived::compute(&cfg, sample_rate).unwrap();

        let n = derived.fft_width * 4;
        let samples: Vec<f64> = (0..n)
            .map(|i| (2.0 * std::f64::consts::PI * cfg.lo_hz * i as f64 / sample_rate as f64).sin())
            .collect();

        let mut analyzer = SpectralAnalyzer::new(&derived, &cfg);
        let (lo, hi) = analyzer.analyze(&samples, &derived, &cfg);

        assert!(!lo.is_empty());
        assert_eq!(lo.len(), hi.len());
        let mid = lo.len() / 2;
        assert!(lo[mid] > hi[mid]);
    }

    #[test]
    fn pure_high_tone_favors_hi_bin() {
        let cfg = cuts_free_cfg();
        let sample_rate = 44100u32;
        let derived = Derived::compute(&cfg, sample_rate).unwrap();

        let n = derived.fft_width * 4;
        let samples: Vec<f64> = (0..n)
            .map(|i| (2.0 * std::f64::consts::PI * cfg.hi_hz * i as f64 / sample_rate as f64).sin())
            .collect();

        let mut analyzer = SpectralAnalyzer::new(&derived, &cfg);
        let (lo, hi) = analyzer.analyze(&samples, &derived, &cfg);

        let mid = hi.len() / 2;
        assert!(hi[mid] > lo[mid]);
    }

    #[test]
    fn empty_input_yields_zero_steps() {
        let cfg = cuts_free_cfg();
        let derived = Derived::compute(&cfg, 44100).unwrap();
        let mut analyzer = SpectralAnalyzer::new(&derived, &cfg);
        let (lo, hi) = analyzer.analyze(&[], &derived, &cfg);
        assert_eq!(lo.len(), 0);
        assert_eq!(hi.len(), 0);
    }
}
