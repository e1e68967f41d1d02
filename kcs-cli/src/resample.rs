// kcs-cli
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The optional upstream resampler: a collaborator process, not part of the core decoder.
//! Invoked as `sox <input> -r <rate> <basename>-r.wav`; the CLI then reads that file instead.

use std::path::{Path, PathBuf};
use std::process::Command;

/// Rewrites `input` to `<basename>-r.wav` at `rate` Hz using `sox`, returning the new path.
pub fn resample(input: &Path, rate: u32) -> std::io::Result<PathBuf> {
    let stem = input.file_stem().unwrap_or_default().to_string_lossy();
    let parent = input.parent().unwrap_or_else(|| Path::new("."));
    let out = parent.join(format!("{stem}-r.wav"));

    log::info!("resampling {} to {} Hz via sox", input.display(), rate);

    let status = Command::new("sox")
        .arg(input)
        .arg("-r")
        .arg(rate.to_string())
        .arg(&out)
        .status()?;

    if !status.success() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::Other,
            format!("sox exited with status {status}"),
        ));
    }

    Ok(out)
}
