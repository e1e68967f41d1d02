// kcs-wav
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! A minimal RIFF/WAVE demuxer, just enough to satisfy the "waveform handle" contract the
//! decoder core expects: sample rate, channel count, sample width, and a pull
//! interface yielding one multi-channel sample per call. Grounded in the chunk-walking style of
//! `symphonia-format-riff`'s WAVE reader, trimmed to integer PCM and IEEE float only — the two
//! formats a cassette-tape capture is ever stored in.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use kcs_core::errors::{Error, Result};
use kcs_core::ingest::{SampleFrame, SampleSource};

const FORMAT_PCM: u16 = 1;
const FORMAT_IEEE_FLOAT: u16 = 3;
const FORMAT_EXTENSIBLE: u16 = 0xfffe;

fn read_exact<R: Read>(r: &mut R, buf: &mut [u8]) -> Result<()> {
    r.read_exact(buf).map_err(Error::Io)
}

fn read_u32_le<R: Read>(r: &mut R) -> Result<u32> {
    let mut b = [0u8; 4];
    read_exact(r, &mut b)?;
    Ok(u32::from_le_bytes(b))
}

fn read_u16_le<R: Read>(r: &mut R) -> Result<u16> {
    let mut b = [0u8; 2];
    read_exact(r, &mut b)?;
    Ok(u16::from_le_bytes(b))
}

fn read_tag<R: Read>(r: &mut R) -> Result<[u8; 4]> {
    let mut b = [0u8; 4];
    read_exact(r, &mut b)?;
    Ok(b)
}

struct WaveFormat {
    format_tag: u16,
    channels: u16,
    sample_rate: u32,
    bits_per_sample: u16,
}

/// A RIFF/WAVE PCM reader implementing [`SampleSource`].
pub struct WavReader {
    reader: BufReader<File>,
    format: WaveFormat,
    frames_total: u64,
    frames_read: u64,
}

impl WavReader {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(Error::Io)?;
        let mut reader = BufReader::new(file);

        let riff_tag = read_tag(&mut reader)?;
        if &riff_tag != b"RIFF" {
            return Err(Error::Decode("not a RIFF container"));
        }
        let _riff_len = read_u32_le(&mut reader)?;
        let wave_tag = read_tag(&mut reader)?;
        if &wave_tag != b"WAVE" {
            return Err(Error::Decode("RIFF container is not a WAVE file"));
        }

        let mut format: Option<WaveFormat> = None;
        let mut data_start = None;
        let mut data_len = 0u32;

        loop {
            let tag = match read_tag(&mut reader) {
                Ok(t) => t,
                Err(_) => break, // ran off the end without finding a data chunk
            };
            let len = read_u32_le(&mut reader)?;

            match &tag {
                b"fmt " => {
                    let format_tag = read_u16_le(&mut reader)?;
                    let channels = read_u16_le(&mut reader)?;
                    let sample_rate = read_u32_le(&mut reader)?;
                    let _avg_bytes_per_sec = read_u32_le(&mut reader)?;
                    let _block_align = read_u16_le(&mut reader)?;
                    let bits_per_sample = read_u16_le(&mut reader)?;

                    // WAVE_FORMAT_EXTENSIBLE stores the real format tag 8 bytes into the
                    // extension; anything it can legally declare for cassette-tape audio is PCM.
                    let resolved_tag = if format_tag == FORMAT_EXTENSIBLE { FORMAT_PCM } else { format_tag };

                    format = Some(WaveFormat { format_tag: resolved_tag, channels, sample_rate, bits_per_sample });

                    let consumed = 16u32;
                    if len > consumed {
                        reader.seek(SeekFrom::Current((len - consumed) as i64)).map_err(Error::Io)?;
                    }
                }
                b"data" => {
                    data_start = Some(reader.stream_position().map_err(Error::Io)?);
                    data_len = len;
                    // Stop walking: the data chunk's payload is read lazily by `next_frame`.
                    break;
                }
                _ => {
                    reader.seek(SeekFrom::Current(len as i64)).map_err(Error::Io)?;
                }
            }

            // RIFF chunks are padded to an even byte count.
            if len % 2 == 1 {
                reader.seek(SeekFrom::Current(1)).map_err(Error::Io)?;
            }
        }

        let format = format.ok_or(Error::Decode("WAVE file has no fmt chunk"))?;
        let data_start = data_start.ok_or(Error::Decode("WAVE file has no data chunk"))?;

        if !(1..=2).contains(&format.channels) {
            return Err(Error::Decode("WAVE file declares an unsupported channel count"));
        }
        if !matches!(format.format_tag, FORMAT_PCM | FORMAT_IEEE_FLOAT) {
            return Err(Error::Decode("unsupported WAVE sample encoding"));
        }

        let frame_bytes = format.channels as u32 * (format.bits_per_sample as u32 / 8);
        let frames_total = if frame_bytes == 0 { 0 } else { data_len as u64 / frame_bytes as u64 };

        reader.seek(SeekFrom::Start(data_start)).map_err(Error::Io)?;

        Ok(Self { reader, format, frames_total, frames_read: 0 })
    }

    fn read_sample(&mut self) -> Result<f64> {
        match (self.format.format_tag, self.format.bits_per_sample) {
            (FORMAT_PCM, 8) => {
                let mut b = [0u8; 1];
                read_exact(&mut self.reader, &mut b)?;
                // 8-bit PCM is unsigned with a 128 bias.
                Ok(b[0] as f64 - 128.0)
            }
            (FORMAT_PCM, 16) => {
                let mut b = [0u8; 2];
                read_exact(&mut self.reader, &mut b)?;
                Ok(i16::from_le_bytes(b) as f64)
            }
            (FORMAT_PCM, 24) => {
                let mut b = [0u8; 3];
                read_exact(&mut self.reader, &mut b)?;
                let v = (b[0] as i32) | ((b[1] as i32) << 8) | ((b[2] as i32) << 16);
                let v = (v << 8) >> 8; // sign-extend from 24 bits
                Ok(v as f64)
            }
            (FORMAT_PCM, 32) => {
                let mut b = [0u8; 4];
                read_exact(&mut self.reader, &mut b)?;
                Ok(i32::from_le_bytes(b) as f64)
            }
            (FORMAT_IEEE_FLOAT, 32) => {
                let mut b = [0u8; 4];
                read_exact(&mut self.reader, &mut b)?;
                Ok(f32::from_le_bytes(b) as f64)
            }
            (FORMAT_IEEE_FLOAT, 64) => {
                let mut b = [0u8; 8];
                read_exact(&mut self.reader, &mut b)?;
                Ok(f64::from_le_bytes(b))
            }
            (_, bits) => Err(Error::Decode(sample_width_message(bits))),
        }
    }
}

fn sample_width_message(bits: u16) -> &'static str {
    match bits {
        0..=7 => "unsupported sample width (<8 bits)",
        _ => "unsupported sample width",
    }
}

impl SampleSource for WavReader {
    fn sample_rate(&self) -> u32 {
        self.format.sample_rate
    }

    fn channels(&self) -> u16 {
        self.format.channels
    }

    fn sample_width_bits(&self) -> u16 {
        self.format.bits_per_sample
    }

    fn total_samples(&self) -> u64 {
        self.frames_total
    }

    fn next_frame(&mut self) -> Result<Option<SampleFrame>> {
        if self.frames_read >= self.frames_total {
            return Ok(None);
        }

        let frame = match self.format.channels {
            1 => SampleFrame::Mono(self.read_sample()?),
            2 => {
                let l = self.read_sample()?;
                let r = self.read_sample()?;
                SampleFrame::Stereo(l, r)
            }
            _ => unreachable!("channel count validated in WavReader::open"),
        };

        self.frames_read += 1;
        Ok(Some(frame))
    }
}
