// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use std::ops::Range;

use nalgebra::DMatrix;
use rayon::prelude::*;
use serde::Serialize;
use tracing::debug;

use crate::error::{Result, TomographyError};
use crate::geometry::{Grid, Ray, SurveyGeometry};
use crate::intersection::intersection_length;

/// Endpoints of one source-receiver ray, in the shape plotting code expects.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RayPath {
    /// `[source x, receiver x]`.
    pub x: [f64; 2],
    /// `[source depth, receiver depth]`.
    pub y: [f64; 2],
    /// Depth of the receiver this ray ends at.
    pub receiver_depth: f64,
}

impl From<&Ray> for RayPath {
    fn from(ray: &Ray) -> Self {
        RayPath {
            x: [ray.start.x, ray.end.x],
            y: [ray.start.y, ray.end.y],
            receiver_depth: ray.end.y,
        }
    }
}

/// The dense ray-path matrix G and the rays that produced it.
///
/// `matrix[(i, j)]` is the length of ray `i` inside cell `j`.
#[derive(Debug, Clone)]
pub struct ObservationMatrix {
    matrix: DMatrix<f64>,
    ray_paths: Vec<RayPath>,
}

impl ObservationMatrix {
    /// The matrix G, shape `(num_rays, num_cells)`.
    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.matrix
    }

    /// Per-ray endpoints, in row order.
    pub fn ray_paths(&self) -> &[RayPath] {
        &self.ray_paths
    }

    /// Number of rays (rows).
    pub fn num_rays(&self) -> usize {
        self.matrix.nrows()
    }

    /// Number of cells (columns).
    pub fn num_cells(&self) -> usize {
        self.matrix.ncols()
    }

    /// Consume and return the matrix.
    pub fn into_matrix(self) -> DMatrix<f64> {
        self.matrix
    }
}

/// Builds the observation matrix for a survey.
///
/// Rows are independent, so they are computed on a rayon pool; the result
/// does not depend on the thread count.
pub struct ForwardModel<'a> {
    geometry: &'a SurveyGeometry,
    num_threads: Option<usize>,
}

impl<'a> ForwardModel<'a> {
    /// Create a forward model for the given survey.
    pub fn new(geometry: &'a SurveyGeometry) -> Self {
        ForwardModel {
            geometry,
            num_threads: None,
        }
    }

    /// Set the number of worker threads (builder method).
    /// If not specified, defaults to the number of available CPU cores.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.num_threads = Some(threads);
        self
    }

    fn get_num_threads(&self) -> usize {
        self.num_threads.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }

    /// Trace every ray through every cell it can reach.
    ///
    /// # Errors
    /// Returns an error if the worker pool cannot be created.
    pub fn build(&self) -> Result<ObservationMatrix> {
        let grid = self.geometry.grid();
        let rays = self.geometry.rays();
        let num_cells = grid.num_cells();

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.get_num_threads())
            .build()
            .map_err(|e| TomographyError::Other(e.to_string()))?;

        let rows: Vec<Vec<f64>> =
            pool.install(|| rays.par_iter().map(|ray| ray_row(grid, ray)).collect());

        let flat: Vec<f64> = rows.into_iter().flatten().collect();
        let matrix = DMatrix::from_row_slice(rays.len(), num_cells, &flat);

        debug!(
            rays = rays.len(),
            cells = num_cells,
            nonzeros = matrix.iter().filter(|&&v| v > 0.0).count(),
            "assembled observation matrix"
        );

        Ok(ObservationMatrix {
            matrix,
            ray_paths: rays.iter().map(RayPath::from).collect(),
        })
    }
}

/// Path length of `ray` through each cell of `grid`, indexed by flat cell index.
///
/// Only cells within one cell of the ray's bounding box are tested; the rest
/// are zero.
pub fn ray_row(grid: &Grid, ray: &Ray) -> Vec<f64> {
    let mut row = vec![0.0; grid.num_cells()];

    let cols = index_span(
        ray.start.x.min(ray.end.x),
        ray.start.x.max(ray.end.x),
        grid.dx(),
        grid.nx(),
    );
    let rows = index_span(
        ray.start.y.min(ray.end.y),
        ray.start.y.max(ray.end.y),
        grid.dy(),
        grid.ny(),
    );

    for j in rows {
        for k in cols.clone() {
            let length = intersection_length(ray, &grid.cell(j, k));
            row[grid.flat_index(j, k)] = length;
        }
    }
    row
}

/// Indices of the cells of width `step` that may overlap `[lo, hi]`, padded
/// by one cell on each side and clamped to `0..n`.
fn index_span(lo: f64, hi: f64, step: f64, n: usize) -> Range<usize> {
    if step <= 0.0 || !step.is_finite() || !lo.is_finite() || !hi.is_finite() {
        return 0..n;
    }
    let first = ((lo / step).floor() - 1.0).max(0.0) as usize;
    let last = ((hi / step).floor() + 2.0).max(0.0) as usize;
    let first = first.min(n);
    first..last.clamp(first, n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Point, SurveyConfig};
    use approx::assert_relative_eq;

    fn default_matrix(source_depth: f64) -> ObservationMatrix {
        let geom = SurveyGeometry::new(source_depth, &SurveyConfig::default()).unwrap();
        ForwardModel::new(&geom).with_threads(1).build().unwrap()
    }

    #[test]
    fn default_shape() {
        let g = default_matrix(50.0);
        assert_eq!(g.num_rays(), 10);
        assert_eq!(g.num_cells(), 400);
        assert_eq!(g.ray_paths().len(), 10);
    }

    #[test]
    fn rows_sum_to_ray_length() {
        for source_depth in [0.0, 13.7, 50.0, 81.25, 100.0] {
            let geom = SurveyGeometry::new(source_depth, &SurveyConfig::default()).unwrap();
            let g = ForwardModel::new(&geom).with_threads(1).build().unwrap();
            for (i, ray) in geom.rays().iter().enumerate() {
                let sum: f64 = g.matrix().row(i).iter().sum();
                assert_relative_eq!(sum, ray.length(), epsilon = 1e-8);
            }
        }
    }

    #[test]
    fn entries_non_negative() {
        let g = default_matrix(37.0);
        assert!(g.matrix().iter().all(|&v| v >= 0.0));
    }

    #[test]
    fn horizontal_ray_on_row_boundary() {
        // Receivers at 10, 20, ..., 90; the one at 50 lies on a row boundary
        let config = SurveyConfig::default().with_receivers(9);
        let geom = SurveyGeometry::new(50.0, &config).unwrap();
        let g = ForwardModel::new(&geom).build().unwrap();
        let sum: f64 = g.matrix().row(4).iter().sum();
        assert_relative_eq!(sum, 50.0, epsilon = 1e-9);
        // Only row 10 of the grid carries it
        let grid = geom.grid();
        for k in 0..grid.nx() {
            assert_eq!(g.matrix()[(4, grid.flat_index(9, k))], 0.0);
            assert_relative_eq!(g.matrix()[(4, grid.flat_index(10, k))], 2.5);
        }
    }

    #[test]
    fn thread_count_does_not_change_result() {
        let geom = SurveyGeometry::new(42.0, &SurveyConfig::default()).unwrap();
        let g1 = ForwardModel::new(&geom).with_threads(1).build().unwrap();
        let g4 = ForwardModel::new(&geom).with_threads(4).build().unwrap();
        assert_eq!(g1.matrix(), g4.matrix());
    }

    #[test]
    fn bounding_box_matches_full_scan() {
        let grid = Grid::new(10, 10, 10.0, 10.0).unwrap();
        let ray = Ray::new(Point::new(2.3, 1.1), Point::new(7.9, 4.6));
        let fast = ray_row(&grid, &ray);
        for j in 0..grid.ny() {
            for k in 0..grid.nx() {
                let full = intersection_length(&ray, &grid.cell(j, k));
                assert_eq!(fast[grid.flat_index(j, k)], full);
            }
        }
    }

    #[test]
    fn ray_paths_record_endpoints() {
        let g = default_matrix(25.0);
        let first = &g.ray_paths()[0];
        assert_eq!(first.x, [0.0, 50.0]);
        assert_eq!(first.y, [25.0, 10.0]);
        assert_eq!(first.receiver_depth, 10.0);
    }

    #[test]
    fn no_receivers_gives_empty_matrix() {
        let config = SurveyConfig::default().with_receivers(0);
        let geom = SurveyGeometry::new(50.0, &config).unwrap();
        let g = ForwardModel::new(&geom).build().unwrap();
        assert_eq!(g.num_rays(), 0);
        assert_eq!(g.num_cells(), 400);
    }

    #[test]
    fn index_span_clamps() {
        assert_eq!(index_span(0.0, 50.0, 2.5, 20), 0..20);
        assert_eq!(index_span(12.0, 14.0, 5.0, 20), 1..4);
        assert_eq!(index_span(0.0, 0.0, 0.0, 7), 0..7);
    }
}
