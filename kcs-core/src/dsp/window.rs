// kcs-core
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Spectral window functions, applied in-place to an FFT input buffer.

use crate::config::WindowKind;
use std::f64::consts::PI;

/// Applies `kind` to `buf` in-place. `buf.len()` is the FFT width `W`.
pub fn apply(kind: WindowKind, buf: &mut [f64]) {
    let w = buf.len();
    if w <= 1 {
        return;
    }

    match kind {
        WindowKind::None => {}
        WindowKind::Bartlett => {
            let half = (w - 1) as f64 / 2.0;
            for (n, s) in buf.iter_mut().enumerate() {
                *s *= 1.0 - ((n as f64 - half) / half).abs();
            }
        }
        WindowKind::Welch => {
            let half = (w - 1) as f64 / 2.0;
            for (n, s) in buf.iter_mut().enumerate() {
                let t = (n as f64 - half) / half;
                *s *= 1.0 - t * t;
            }
        }
        WindowKind::Hann => {
            let denom = (w - 1) as f64;
            for (n, s) in buf.iter_mut().enumerate() {
                *s *= 0.5 * (1.0 - (2.0 * PI * n as f64 / denom).cos());
            }
        }
    }
}
