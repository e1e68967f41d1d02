// kcs-core
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Decoder configuration and the quantities derived from it once the sample rate is known.

use crate::config_error;
use crate::errors::Result;

/// Parity handling named by the frame layout. Never actually checked: the frame format
/// declares parity only so the bit cursor lands on the correct stop-bit positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parity {
    None,
    Even,
    Odd,
}

/// One UART-style character: start bit + data bits (LSB first) + optional parity + stop bits.
#[derive(Debug, Clone, Copy)]
pub struct FrameLayout {
    pub data_bits: u32,
    pub parity: Parity,
    pub stop_bits: u32,
}

impl FrameLayout {
    pub fn parity_bits(&self) -> u32 {
        match self.parity {
            Parity::None => 0,
            Parity::Even | Parity::Odd => 1,
        }
    }

    /// `1 + data_bits + parity_bits + stop_bits`.
    pub fn frame_bits(&self) -> u32 {
        1 + self.data_bits + self.parity_bits() + self.stop_bits
    }
}

/// Spectral window function applied to each FFT input window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowKind {
    None,
    Bartlett,
    Welch,
    Hann,
}

/// Multi-channel-to-mono reduction policy for the sample ingester.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelSelect {
    Left,
    Right,
    /// `left + right`, deliberately not averaged: all downstream thresholds are relative.
    Sum,
}

/// Immutable decoder configuration, frozen once `main` has parsed the CLI surface.
#[derive(Debug, Clone)]
pub struct DecoderConfig {
    pub lo_hz: f64,
    pub hi_hz: f64,
    pub baud: f64,
    pub frame: FrameLayout,
    pub window: WindowKind,
    pub steps_per_bit: u32,
    pub channel: ChannelSelect,
    pub keep_short_runs: bool,
    pub assume_resampled: bool,
    pub bitstream_output: bool,
    pub print_data: bool,
    pub max_samples: Option<u64>,
}

/// One FFT bin pair (`n1`, `n2 = n1 + 1`) with linear interpolation weights.
#[derive(Debug, Clone, Copy)]
pub struct BinInterp {
    pub n1: usize,
    pub n2: usize,
    pub a1: f64,
    pub a2: f64,
}

impl BinInterp {
    fn new(bin: f64, w: usize) -> Self {
        let n1 = bin.floor() as usize;
        let n2 = n1 + 1;
        let (mut a1, mut a2) = (n2 as f64 - bin, 1.0 - (n2 as f64 - bin));
        if n1 == 0 {
            a1 = 0.0;
            a2 = 1.0;
        }
        let n2 = n2.min(w / 2);
        Self { n1, n2, a1, a2 }
    }

    /// True when this bin pair lands on an exact integer bin (all interpolation weight on
    /// `n1`), the precondition for the spectral analyzer's sum-of-three-bins rule.
    pub fn is_exact(&self) -> bool {
        self.a1 == 1.0
    }
}

/// Quantities computed once from [`DecoderConfig`] and the waveform's sample rate `Fs`.
#[derive(Debug, Clone, Copy)]
pub struct Derived {
    pub samples_per_bit: f64,
    pub step: usize,
    pub bit_width: f64,
    pub frame_bits: u32,
    pub frame_width: f64,
    /// FFT width `W`: the largest power of two `<= Fs / baud`, doubled when `lo_hz < baud` so a
    /// sub-cycle '0' bit (as in CUTS) still spans one full low-tone cycle.
    pub fft_width: usize,
    pub lo_bin: BinInterp,
    pub hi_bin: BinInterp,
}

/// Round-to-nearest via "add 0.5, truncate": used everywhere a bit position is computed so
/// rounding is consistent and drift does not accumulate across an implementation.
pub(crate) fn round_half_up(x: f64) -> f64 {
    (x + 0.5).floor()
}

fn largest_pow2_leq(x: f64) -> usize {
    if x < 1.0 {
        return 1;
    }
    1usize << (x.log2().floor() as u32)
}

impl Derived {
    pub fn compute(cfg: &DecoderConfig, sample_rate: u32) -> Result<Self> {
        if cfg.baud <= 0.0 {
            config_error!("baud must be positive");
        }
        if cfg.steps_per_bit == 0 {
            config_error!("steps must be at least 1");
        }

        let fs = sample_rate as f64;
        let samples_per_bit = round_half_up(fs / cfg.baud);
        let step = (round_half_up(fs / cfg.baud / cfg.steps_per_bit as f64) as usize).max(1);
        let bit_width = fs / cfg.baud / step as f64;
        let frame_bits = cfg.frame.frame_bits();
        let frame_width = bit_width * frame_bits as f64;

        let mut fft_width = largest_pow2_leq(fs / cfg.baud);
        if cfg.lo_hz < cfg.baud {
            fft_width *= 2;
        }

        let lo_bin = BinInterp::new(cfg.lo_hz * fft_width as f64 / fs, fft_width);
        let hi_bin = BinInterp::new(cfg.hi_hz * fft_width as f64 / fs, fft_width);

        Ok(Self {
            samples_per_bit,
            step,
            bit_width,
            frame_bits,
            frame_width,
            fft_width,
            lo_bin,
            hi_bin,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> DecoderConfig {
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
    fn fft_width_is_power_of_two() {
        let d = Derived::compute(&cfg(), 44100).unwrap();
        assert!(d.fft_width.is_power_of_two());
        assert!(d.fft_width >= 1);
        assert!(d.lo_bin.n2 <= d.fft_width / 2);
        assert!(d.hi_bin.n2 <= d.fft_width / 2);
    }

    #[test]
    fn cuts_preset_doubles_width_when_lo_below_baud() {
        // CUTS: hi=1200, lo=600, baud=1200 — lo_hz < baud, so W must double.
        let mut c = cfg();
        c.lo_hz = 600.0;
        c.hi_hz = 1200.0;
        c.baud = 1200.0;
        let plain_w = largest_pow2_leq(44100.0 / 1200.0);
        let d = Derived::compute(&c, 44100).unwrap();
        assert_eq!(d.fft_width, plain_w * 2);
    }

    #[test]
    fn frame_bits_counts_every_field() {
        let layout = FrameLayout { data_bits: 8, parity: Parity::Even, stop_bits: 2 };
        assert_eq!(layout.frame_bits(), 1 + 8 + 1 + 2);
        assert_eq!(layout.parity_bits(), 1);
    }
}
