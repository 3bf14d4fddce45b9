// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

//! Straight-ray crosswell travel-time tomography.
//!
//! A source in one borehole fires at receivers in a second borehole. The
//! plane between them is divided into a grid of cells; each ray's length
//! through each cell forms the observation matrix G, so that travel times are
//! `t = G s` for a per-cell slowness `s`. The library builds G, synthesizes
//! reproducible travel times, and recovers `s` with a truncated singular
//! value decomposition.

#![warn(missing_docs)]

/// Error types for the library.
pub mod error;
/// Observation matrix assembly.
pub mod forward;
/// Survey layout: grid, source and receivers.
pub mod geometry;
/// Ray/cell intersection lengths.
pub mod intersection;
/// Truncated-SVD inversion.
pub mod inversion;
/// Export of matrices and reports to .npy, .mat and JSON.
pub mod io;
/// Request parsing and the response shape.
pub mod report;
/// Seeded synthetic models and travel times.
pub mod synthetic;
/// End-to-end pipeline for a single request.
pub mod tomography;

pub use crate::error::{Result, TomographyError};
pub use crate::forward::{ForwardModel, ObservationMatrix};
pub use crate::geometry::{SurveyConfig, SurveyGeometry};
pub use crate::inversion::{invert, Decomposition, Inversion};
pub use crate::report::{InversionReport, InversionRequest, Response};
pub use crate::synthetic::SyntheticConfig;
pub use crate::tomography::{InversionConfig, Tomography};
