// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use nalgebra::{DMatrix, DVector, SVD};
use tracing::{info, warn};

use crate::error::{Result, TomographyError};

/// Singular values at or below this are treated as zero, both for the
/// numerical rank and for the pseudo-inverse.
pub const RANK_TOLERANCE: f64 = 1e-10;

/// Reduced singular value decomposition `G = U diag(s) Vt` with `s` descending.
///
/// For an `R x C` matrix, `U` is `R x min(R, C)` and `Vt` is `min(R, C) x C`.
#[derive(Debug, Clone)]
pub struct Decomposition {
    u: DMatrix<f64>,
    singular_values: DVector<f64>,
    v_t: DMatrix<f64>,
}

impl Decomposition {
    /// Decompose `g`.
    ///
    /// Matrices with no rows or no columns decompose to an empty spectrum.
    ///
    /// # Errors
    /// Returns an error if the iteration does not converge.
    pub fn new(g: &DMatrix<f64>) -> Result<Self> {
        let (rows, cols) = g.shape();
        if rows == 0 || cols == 0 {
            return Ok(Decomposition {
                u: DMatrix::zeros(rows, 0),
                singular_values: DVector::zeros(0),
                v_t: DMatrix::zeros(0, cols),
            });
        }

        let svd = SVD::try_new(g.clone(), true, true, f64::EPSILON, 0)
            .ok_or(TomographyError::DecompositionFailed { rows, cols })?;

        match (svd.u, svd.v_t) {
            (Some(u), Some(v_t)) => Ok(Decomposition {
                u,
                singular_values: svd.singular_values,
                v_t,
            }),
            _ => Err(TomographyError::DecompositionFailed { rows, cols }),
        }
    }

    /// The full spectrum, descending.
    pub fn singular_values(&self) -> &DVector<f64> {
        &self.singular_values
    }

    /// Number of singular values above [`RANK_TOLERANCE`].
    pub fn rank(&self) -> usize {
        self.singular_values
            .iter()
            .filter(|&&s| s > RANK_TOLERANCE)
            .count()
    }

    /// Number of singular triplets kept for truncation `k`.
    ///
    /// `None`, `Some(0)` and any `k` not below the spectrum length keep
    /// everything.
    pub fn retained(&self, k: Option<usize>) -> usize {
        let len = self.singular_values.len();
        match k {
            Some(k) if k > 0 && k < len => k,
            _ => len,
        }
    }

    fn inverse_singular_value(&self, j: usize) -> f64 {
        let s = self.singular_values[j];
        if s > RANK_TOLERANCE {
            1.0 / s
        } else {
            0.0
        }
    }

    /// The truncated pseudo-inverse `V_k diag(1/s_k) U_k^T`, shape `C x R`.
    pub fn pseudo_inverse(&self, k: Option<usize>) -> DMatrix<f64> {
        let k = self.retained(k);
        let mut v = self.v_t.rows(0, k).transpose();
        for (j, mut col) in v.column_iter_mut().enumerate() {
            col *= self.inverse_singular_value(j);
        }
        v * self.u.columns(0, k).transpose()
    }

    /// Apply the truncated pseudo-inverse to `t` without forming it.
    ///
    /// # Errors
    /// Returns an error if `t` does not have one entry per row of G.
    pub fn solve(&self, t: &DVector<f64>, k: Option<usize>) -> Result<DVector<f64>> {
        if t.len() != self.u.nrows() {
            return Err(TomographyError::ShapeMismatch {
                expected: vec![self.u.nrows()],
                got: vec![t.len()],
            });
        }
        let k = self.retained(k);
        let mut coeffs = self.u.columns(0, k).tr_mul(t);
        for (j, c) in coeffs.iter_mut().enumerate() {
            *c *= self.inverse_singular_value(j);
        }
        Ok(self.v_t.rows(0, k).tr_mul(&coeffs))
    }
}

/// Result of a truncated-SVD inversion.
#[derive(Debug, Clone, PartialEq)]
pub struct Inversion {
    /// Recovered model, one entry per column of G.
    pub solution: DVector<f64>,
    /// Numerical rank of G over the full spectrum.
    pub rank: usize,
    /// Full, untruncated spectrum.
    pub singular_values: DVector<f64>,
    /// Number of singular triplets actually used.
    pub retained: usize,
    /// `||G x - t||`.
    pub residual_norm: f64,
}

/// Solve `G x = t` in the least-squares sense using the top `k` singular
/// triplets of G.
///
/// The rank and the spectrum in the result always describe the full
/// decomposition, independent of `k`.
///
/// # Errors
/// Returns an error if `t` has the wrong length or the decomposition fails.
pub fn invert(g: &DMatrix<f64>, t: &DVector<f64>, k: Option<usize>) -> Result<Inversion> {
    if t.len() != g.nrows() {
        return Err(TomographyError::ShapeMismatch {
            expected: vec![g.nrows()],
            got: vec![t.len()],
        });
    }

    let decomposition = Decomposition::new(g)?;
    let rank = decomposition.rank();
    let retained = decomposition.retained(k);
    let solution = decomposition.solve(t, k)?;
    let residual_norm = (g * &solution - t).norm();

    if rank == 0 {
        warn!(
            rows = g.nrows(),
            cols = g.ncols(),
            "observation matrix has numerical rank 0"
        );
    }
    info!(rank, retained, residual_norm, "inversion complete");

    Ok(Inversion {
        solution,
        rank,
        singular_values: decomposition.singular_values,
        retained,
        residual_norm,
    })
}
