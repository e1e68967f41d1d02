// kcs-core
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Digital signal processing: window functions and the short-time power-spectrum analyzer.

pub mod spectral;
pub mod window;

pub use spectral::SpectralAnalyzer;
