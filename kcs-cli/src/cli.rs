// kcs-cli
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Command-line surface and its translation into a [`kcs_core::DecoderConfig`].

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use kcs_core::{ChannelSelect, DecoderConfig, FrameLayout, Parity, WindowKind};

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum WindowArg {
    None,
    Bartlett,
    Welch,
    Hann,
}

impl From<WindowArg> for WindowKind {
    fn from(w: WindowArg) -> Self {
        match w {
            WindowArg::None => WindowKind::None,
            WindowArg::Bartlett => WindowKind::Bartlett,
            WindowArg::Welch => WindowKind::Welch,
            WindowArg::Hann => WindowKind::Hann,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ChannelArg {
    L,
    R,
    A,
}

impl From<ChannelArg> for ChannelSelect {
    fn from(c: ChannelArg) -> Self {
        match c {
            ChannelArg::L => ChannelSelect::Left,
            ChannelArg::R => ChannelSelect::Right,
            ChannelArg::A => ChannelSelect::Sum,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum YesNo {
    Y,
    N,
}

impl YesNo {
    pub fn is_yes(self) -> bool {
        self == YesNo::Y
    }
}

/// Recovers byte streams from Kansas City Standard / FSK cassette-tape recordings.
#[derive(Debug, Parser)]
#[command(name = "kcs", version, about)]
pub struct Cli {
    /// PCM waveform file to decode.
    pub input: PathBuf,

    /// High-tone frequency in Hz (default 2400, or 1200 with --cuts).
    #[arg(long)]
    pub hi: Option<f64>,

    /// Low-tone frequency in Hz (default 1200, or 600 with --cuts).
    #[arg(long)]
    pub lo: Option<f64>,

    /// Baud rate (default 300, or 1200 with --cuts).
    #[arg(long)]
    pub baud: Option<f64>,

    /// Apply the CUTS preset: hi=1200, lo=600, baud=1200.
    #[arg(long)]
    pub cuts: bool,

    /// Frame layout as `NxY`: N data bits, x parity (N/E/O), Y stop bits.
    #[arg(long, default_value = "8N2")]
    pub frame: String,

    /// Stop after this many ingested samples.
    #[arg(long)]
    pub max: Option<u64>,

    /// FFT window positions per bit.
    #[arg(long, default_value_t = 2)]
    pub steps: u32,

    /// Spectral window function.
    #[arg(long, value_enum, default_value_t = WindowArg::None)]
    pub window: WindowArg,

    /// Resample to `resample * baud` Hz via an external resampler before decoding.
    #[arg(long)]
    pub resample: Option<u32>,

    /// Keep every decoded run, even runs below 20 bytes.
    #[arg(long, value_enum, default_value_t = YesNo::N)]
    pub keep: YesNo,

    /// Emit a `<basename>.dat` two-column file for external plotting.
    #[arg(long, value_enum, default_value_t = YesNo::N)]
    pub graph: YesNo,

    /// Channel reduction policy for stereo input.
    #[arg(long, value_enum, default_value_t = ChannelArg::L)]
    pub channel: ChannelArg,

    /// Emit a `<basename>.bit` ASCII '0'/'1' bit-stream file.
    #[arg(long, value_enum, default_value_t = YesNo::N)]
    pub bit: YesNo,

    /// Echo decoded bytes to standard output as they are produced.
    #[arg(long)]
    pub print_data: bool,
}

/// Parses the `NxY` frame-layout mini-grammar: digits, one parity letter, digits.
pub fn parse_frame(spec: &str) -> Result<FrameLayout, String> {
    let parity_pos = spec
        .find(|c: char| matches!(c.to_ascii_uppercase(), 'N' | 'E' | 'O'))
        .ok_or_else(|| format!("frame spec '{spec}' has no parity letter (N/E/O)"))?;

    let (data_part, rest) = spec.split_at(parity_pos);
    let (parity_part, stop_part) = rest.split_at(1);

    let data_bits: u32 =
        data_part.parse().map_err(|_| format!("frame spec '{spec}' has a malformed data-bit count"))?;
    let stop_bits: u32 =
        stop_part.parse().map_err(|_| format!("frame spec '{spec}' has a malformed stop-bit count"))?;

    let parity = match parity_part.to_ascii_uppercase().as_str() {
        "N" => Parity::None,
        "E" => Parity::Even,
        "O" => Parity::Odd,
        _ => unreachable!("validated by find() above"),
    };

    Ok(FrameLayout { data_bits, parity, stop_bits })
}

impl Cli {
    /// Resolves `(hi_hz, lo_hz, baud)`, applying the CUTS preset before any explicit
    /// `--hi`/`--lo`/`--baud` override.
    pub fn resolved_tones(&self) -> (f64, f64, f64) {
        let (mut hi, mut lo, mut baud) = (2400.0, 1200.0, 300.0);
        if self.cuts {
            hi = 1200.0;
            lo = 600.0;
            baud = 1200.0;
        }
        if let Some(v) = self.hi {
            hi = v;
        }
        if let Some(v) = self.lo {
            lo = v;
        }
        if let Some(v) = self.baud {
            baud = v;
        }
        (hi, lo, baud)
    }

    /// Lowers the parsed CLI surface into an immutable [`DecoderConfig`].
    pub fn to_decoder_config(&self, assume_resampled: bool) -> Result<DecoderConfig, String> {
        let (hi, lo, baud) = self.resolved_tones();
        let frame = parse_frame(&self.frame)?;

        Ok(DecoderConfig {
            lo_hz: lo,
            hi_hz: hi,
            baud,
            frame,
            window: self.window.into(),
            steps_per_bit: self.steps,
            channel: self.channel.into(),
            keep_short_runs: self.keep.is_yes(),
            assume_resampled,
            bitstream_output: self.bit.is_yes(),
            print_data: self.print_data,
            max_samples: self.max,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_standard_8n2() {
        let layout = parse_frame("8N2").unwrap();
        assert_eq!(layout.data_bits, 8);
        assert_eq!(layout.parity, Parity::None);
        assert_eq!(layout.stop_bits, 2);
    }

    #[test]
    fn parses_parity_and_single_stop_bit() {
        let layout = parse_frame("7E1").unwrap();
        assert_eq!(layout.data_bits, 7);
        assert_eq!(layout.parity, Parity::Even);
        assert_eq!(layout.stop_bits, 1);
    }

    #[test]
    fn rejects_missing_parity_letter() {
        assert!(parse_frame("82").is_err());
    }
}
