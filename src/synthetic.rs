// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

//! Seeded synthetic slowness models and travel times.
//!
//! Stands in for measured data: the inversion only needs a travel-time vector
//! with one entry per ray, whatever produced it.

use nalgebra::{DMatrix, DVector};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use tracing::debug;

use crate::error::{Result, TomographyError};

/// Seed used when none is given.
pub const DEFAULT_SEED: u64 = 42;
/// Standard deviation of the slowness perturbation applied to anomalous cells.
pub const DEFAULT_ANOMALY_STD: f64 = 0.1;
/// Standard deviation of the per-ray travel-time noise.
pub const DEFAULT_NOISE_STD: f64 = 0.01;

/// Parameters of the synthetic model.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticConfig {
    seed: u64,
    anomaly_std: f64,
    noise_std: f64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        SyntheticConfig {
            seed: DEFAULT_SEED,
            anomaly_std: DEFAULT_ANOMALY_STD,
            noise_std: DEFAULT_NOISE_STD,
        }
    }
}

impl SyntheticConfig {
    /// Set the RNG seed (builder method).
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the anomaly standard deviation (builder method).
    ///
    /// # Errors
    /// Returns an error if `std` is negative or not finite.
    pub fn with_anomaly_std(mut self, std: f64) -> Result<Self> {
        self.anomaly_std = check_std("anomaly standard deviation", std)?;
        Ok(self)
    }

    /// Set the travel-time noise standard deviation (builder method).
    ///
    /// # Errors
    /// Returns an error if `std` is negative or not finite.
    pub fn with_noise_std(mut self, std: f64) -> Result<Self> {
        self.noise_std = check_std("noise standard deviation", std)?;
        Ok(self)
    }

    /// The RNG seed.
    pub fn seed(&self) -> u64 {
        self.seed
    }
}

fn check_std(name: &'static str, value: f64) -> Result<f64> {
    if !value.is_finite() || value < 0.0 {
        return Err(TomographyError::InvalidDimension { name, value });
    }
    Ok(value)
}

fn normal(std: f64) -> Result<Normal<f64>> {
    Normal::new(0.0, std).map_err(|e| TomographyError::Other(format!("normal distribution: {}", e)))
}

/// Ground-truth slowness and the travel times it produces.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticData {
    /// Slowness per cell, length = number of columns of G.
    pub true_slowness: DVector<f64>,
    /// Noisy travel time per ray, length = number of rows of G.
    pub travel_times: DVector<f64>,
}

/// Build a random slowness model and its noisy travel times through `g`.
///
/// Starts from unit slowness, perturbs a random quarter of the cells (chosen
/// without replacement) by `N(0, anomaly_std)`, then computes `g * s` and adds
/// `N(0, noise_std)` to each ray. The same config always yields the same
/// output, on any platform.
///
/// # Errors
/// Returns an error if a noise distribution cannot be constructed.
pub fn generate(g: &DMatrix<f64>, config: &SyntheticConfig) -> Result<SyntheticData> {
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let num_cells = g.ncols();

    let anomaly = normal(config.anomaly_std)?;
    let noise = normal(config.noise_std)?;

    let mut true_slowness = DVector::from_element(num_cells, 1.0);
    let picks = rand::seq::index::sample(&mut rng, num_cells, num_cells / 4);
    for idx in picks.iter() {
        true_slowness[idx] += anomaly.sample(&mut rng);
    }

    let mut travel_times = g * &true_slowness;
    for t in travel_times.iter_mut() {
        *t += noise.sample(&mut rng);
    }

    debug!(
        seed = config.seed,
        anomalies = num_cells / 4,
        rays = travel_times.len(),
        "generated synthetic data"
    );

    Ok(SyntheticData {
        true_slowness,
        travel_times,
    })
}
