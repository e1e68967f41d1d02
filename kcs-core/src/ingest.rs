// kcs-core
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The sample ingester: reduces a multi-channel PCM pull source to a single real-valued
//! sample series, honoring the channel-selection policy and an optional sample cap.

use crate::config::ChannelSelect;
use crate::decode_error;
use crate::errors::Result;

/// One multi-channel sample, already normalized to a real amplitude by the waveform reader.
#[derive(Debug, Clone, Copy)]
pub enum SampleFrame {
    Mono(f64),
    Stereo(f64, f64),
}

/// The waveform handle contract: a header the ingester can inspect, plus a pull
/// interface yielding one multi-channel sample per call. Implemented by `kcs-wav`; the ingester
/// itself never opens a file.
pub trait SampleSource {
    fn sample_rate(&self) -> u32;
    fn channels(&self) -> u16;
    fn sample_width_bits(&self) -> u16;
    fn total_samples(&self) -> u64;
    fn next_frame(&mut self) -> Result<Option<SampleFrame>>;
}

/// Drains `source` into a single sample series `S`, applying `channel` to every stereo frame and
/// halting once `max_samples` is reached. An empty or all-silence result is not an error here —
/// downstream stages treat `P == 0` as a clean, fileless run.
pub fn ingest(source: &mut dyn SampleSource, channel: ChannelSelect, max_samples: Option<u64>) -> Result<Vec<f64>> {
    let channels = source.channels();
    if !(1..=2).contains(&channels) {
        decode_error!("waveform declares an unsupported channel count");
    }

    let limit = max_samples.unwrap_or(u64::MAX);
    let mut series = Vec::new();

    while (series.len() as u64) < limit {
        match source.next_frame()? {
            None => break,
            Some(SampleFrame::Mono(v)) => series.push(v),
            Some(SampleFrame::Stereo(l, r)) => {
                let v = match channel {
                    ChannelSelect::Left => l,
                    ChannelSelect::Right => r,
                    ChannelSelect::Sum => l + r,
                };
                series.push(v);
            }
        }
    }

    Ok(series)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedSource {
        channels: u16,
        frames: Vec<SampleFrame>,
        pos: usize,
    }

    impl SampleSource for FixedSource {
        fn sample_rate(&self) -> u32 {
            44100
        }
        fn channels(&self) -> u16 {
            self.channels
        }
        fn sample_width_bits(&self) -> u16 {
            16
        }
        fn total_samples(&self) -> u64 {
            self.frames.len() as u64
        }
        fn next_frame(&mut self) -> Result<Option<SampleFrame>> {
            if self.pos >= self.frames.len() {
                return Ok(None);
            }
            let f = self.frames[self.pos];
            self.pos += 1;
            Ok(Some(f))
        }
    }

    #[test]
    fn stereo_sum_is_not_averaged() {
        let mut src = FixedSource {
            channels: 2,
            frames: vec![SampleFrame::Stereo(1.0, 1.0), SampleFrame::Stereo(-1.0, 1.0)],
            pos: 0,
        };
        let out = ingest(&mut src, ChannelSelect::Sum, None).unwrap();
        assert_eq!(out, vec![2.0, 0.0]);
    }

    #[test]
    fn left_and_right_select_their_channel() {
        let frames = vec![SampleFrame::Stereo(3.0, 4.0)];
        let mut src = FixedSource { channels: 2, frames: frames.clone(), pos: 0 };
        assert_eq!(ingest(&mut src, ChannelSelect::Left, None).unwrap(), vec![3.0]);
        let mut src = FixedSource { channels: 2, frames, pos: 0 };
        assert_eq!(ingest(&mut src, ChannelSelect::Right, None).unwrap(), vec![4.0]);
    }

    #[test]
    fn max_samples_halts_early() {
        let frames = vec![SampleFrame::Mono(1.0); 100];
        let mut src = FixedSource { channels: 1, frames, pos: 0 };
        let out = ingest(&mut src, ChannelSelect::Left, Some(7)).unwrap();
        assert_eq!(out.len(), 7);
    }

    #[test]
    fn unsupported_channel_count_is_fatal() {
        let mut src = FixedSource { channels: 3, frames: vec![], pos: 0 };
        assert!(ingest(&mut src, ChannelSelect::Left, None).is_err());
    }

    #[test]
    fn empty_source_yields_empty_series_not_an_error() {
        let mut src = FixedSource { channels: 1, frames: vec![], pos: 0 };
        let out = ingest(&mut src, ChannelSelect::Left, None).unwrap();
        assert!(out.is_empty());
    }
}
