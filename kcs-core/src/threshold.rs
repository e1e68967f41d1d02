// kcs-core
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The edge trimmer and iterative two-class thresholder.

/// Per-class energy averages used to classify every step as "low" or "high" tone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub avlo: f64,
    pub avhi: f64,
}

/// How many leading/trailing near-silence steps the trim removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrimReport {
    pub head_trimmed: usize,
    pub tail_trimmed: usize,
}

fn mean(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        0.0
    }
    else {
        xs.iter().sum::<f64>() / xs.len() as f64
    }
}

/// The global means `avlo_0`, `avhi_0` computed before any trimming or refinement.
pub fn global_means(lo: &[f64], hi: &[f64]) -> Thresholds {
    Thresholds { avlo: mean(lo), avhi: mean(hi) }
}

/// Drops leading and trailing near-silence steps: both `lo` and `hi` must be below a tenth of
/// their respective global mean for a step to count as silence.
pub fn trim_edges(lo: &mut Vec<f64>, hi: &mut Vec<f64>, global: &Thresholds) -> TrimReport {
    let is_silent = |lo_v: f64, hi_v: f64| lo_v < global.avlo / 10.0 && hi_v < global.avhi / 10.0;

    let mut head = 0;
    while head < lo.len() && is_silent(lo[head], hi[head]) {
        head += 1;
    }

    let mut tail = lo.len();
    while tail > head && is_silent(lo[tail - 1], hi[tail - 1]) {
        tail -= 1;
    }

    let tail_trimmed = lo.len() - tail;
    lo.truncate(tail);
    hi.truncate(tail);
    lo.drain(..head);
    hi.drain(..head);

    log::info!(
        "edge trim: dropped {} leading and {} trailing near-silence steps",
        head,
        tail_trimmed
    );

    TrimReport { head_trimmed: head, tail_trimmed }
}

/// Iteratively refines `(avlo, avhi)` by re-partitioning every step into the class whose energy
/// ratio is larger, up to five passes. Reverts to `global` if a pass empties a class, or if the
/// final split gives either class less than 8% of the steps.
pub fn refine(lo: &[f64], hi: &[f64], global: &Thresholds) -> Thresholds {
    if lo.is_empty() {
        return *global;
    }

    let mut avlo = global.avlo;
    let mut avhi = global.avhi;
    let mut final_split = (0usize, 0usize);

    for pass in 0..5 {
        let mut lo_sum = 0.0;
        let mut lo_num = 0usize;
        let mut hi_sum = 0.0;
        let mut hi_num = 0usize;

        for (&l, &h) in lo.iter().zip(hi.iter()) {
            if l / avlo > h / avhi {
                lo_sum += l;
                lo_num += 1;
            }
            else {
                hi_sum += h;
                hi_num += 1;
            }
        }

        if lo_num == 0 || hi_num == 0 {
            log::debug!("refinement pass {pass} emptied a class, reverting to global means");
            return *global;
        }

        avlo = lo_sum / lo_num as f64;
        avhi = hi_sum / hi_num as f64;
        final_split = (lo_num, hi_num);

        log::debug!("refinement pass {pass}: avlo={avlo:.3} avhi={avhi:.3}");
    }

    let total = lo.len() as f64;
    if (final_split.0 as f64) < 0.08 * total || (final_split.1 as f64) < 0.08 * total {
        log::debug!("final split below 8% floor, reverting to global means");
        return *global;
    }

    Thresholds { avlo, avhi }
}
