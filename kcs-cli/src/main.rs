// kcs-cli
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Recovers byte streams from Kansas City Standard / FSK cassette-tape recordings: wires the
//! waveform reader, decoder core, and the external resampler collaborator together, then writes
//! the files, bit stream, and graph data the CLI surface promises.

mod cli;
mod resample;

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;

use cli::Cli;

fn basename_stem(path: &Path) -> PathBuf {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    let stem = path.file_stem().unwrap_or_default();
    parent.join(stem)
}

fn run(cli: &Cli) -> Result<(), String> {
    let (_, _, resolved_baud) = cli.resolved_tones();
    let (input_path, assume_resampled) = match cli.resample {
        Some(factor) => {
            let rate = (factor as f64 * resolved_baud).round() as u32;
            let path = resample::resample(&cli.input, rate).map_err(|e| format!("resample failed: {e}"))?;
            (path, true)
        }
        None => (cli.input.clone(), false),
    };

    let config = cli.to_decoder_config(assume_resampled)?;

    let mut reader = kcs_wav::WavReader::open(&input_path).map_err(|e| format!("{e}"))?;
    log::info!(
        "input: {} Hz, {} channel(s), {}-bit",
        reader.sample_rate(),
        reader.channels(),
        reader.sample_width_bits()
    );

    let graph_mode = cli.graph.is_yes();
    let output = kcs_core::run(&mut reader, &config, graph_mode).map_err(|e| format!("{e}"))?;

    let basename = basename_stem(&cli.input);

    for (i, bytes) in output.decode.files.iter().enumerate() {
        let path = format!("{}-{:03}.txt", basename.display(), i + 1);
        fs::write(&path, bytes).map_err(|e| format!("writing {path}: {e}"))?;
        log::info!("wrote {path} ({} bytes)", bytes.len());
    }

    if let Some(stream) = &output.decode.bitstream {
        let path = format!("{}.bit", basename.display());
        fs::write(&path, stream).map_err(|e| format!("writing {path}: {e}"))?;
        log::info!("wrote {path}");
    }

    if let Some(graph) = &output.graph {
        let path = format!("{}.dat", basename.display());
        let mut out = fs::File::create(&path).map_err(|e| format!("writing {path}: {e}"))?;
        for point in graph {
            writeln!(out, "{} {:.4}", point.step, point.value).map_err(|e| format!("writing {path}: {e}"))?;
        }
        log::info!("wrote {path}");
    }

    if let Some(printed) = &output.decode.printed {
        print!("{printed}");
    }

    log::info!(
        "decoded {} file(s), {} stop-bit warning(s), max speed variance {:.3}",
        output.decode.files.len(),
        output.decode.stop_bit_warnings,
        output.decode.max_variance
    );

    Ok(())
}

fn main() -> ExitCode {
    pretty_env_logger::init();

    let cli = Cli::parse();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(msg) => {
            log::error!("{msg}");
            ExitCode::FAILURE
        }
    }
}
