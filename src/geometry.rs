// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use serde::Serialize;

use crate::error::{Result, TomographyError};

/// Default horizontal separation between the source and receiver boreholes.
pub const DEFAULT_BOREHOLE_DISTANCE: f64 = 50.0;
/// Default number of cells along each grid axis.
pub const DEFAULT_GRID_SIZE: usize = 20;
/// Default vertical extent of the survey.
pub const DEFAULT_DEPTH_RANGE: f64 = 100.0;
/// Default number of receivers in the receiver borehole.
pub const DEFAULT_NUM_RECEIVERS: usize = 10;
/// Default distance between the outermost receivers and the survey's top and bottom.
pub const DEFAULT_RECEIVER_MARGIN: f64 = 10.0;
/// Upper bound on `nx * ny`.
pub const MAX_CELLS: usize = 250_000;
/// Upper bound on the receiver count.
pub const MAX_RECEIVERS: usize = 10_000;

/// Survey layout parameters shared by every inversion request.
///
/// The source depth is the only per-request geometric input; everything else
/// lives here. Builder methods consume and return the config.
#[derive(Debug, Clone, PartialEq)]
pub struct SurveyConfig {
    /// Horizontal distance from the source borehole (x = 0) to the receiver borehole.
    pub borehole_distance: f64,
    /// Vertical extent of the survey, measured downward from y = 0.
    pub depth_range: f64,
    /// Number of horizontal cells.
    pub nx: usize,
    /// Number of vertical cells.
    pub ny: usize,
    /// Number of receivers.
    pub num_receivers: usize,
    /// Depth of the first receiver below the top, and of the last above the bottom.
    pub receiver_margin: f64,
}

impl Default for SurveyConfig {
    fn default() -> Self {
        SurveyConfig {
            borehole_distance: DEFAULT_BOREHOLE_DISTANCE,
            depth_range: DEFAULT_DEPTH_RANGE,
            nx: DEFAULT_GRID_SIZE,
            ny: DEFAULT_GRID_SIZE,
            num_receivers: DEFAULT_NUM_RECEIVERS,
            receiver_margin: DEFAULT_RECEIVER_MARGIN,
        }
    }
}

impl SurveyConfig {
    /// Set the borehole separation (builder method).
    pub fn with_borehole_distance(mut self, borehole_distance: f64) -> Self {
        self.borehole_distance = borehole_distance;
        self
    }

    /// Set the depth range (builder method).
    pub fn with_depth_range(mut self, depth_range: f64) -> Self {
        self.depth_range = depth_range;
        self
    }

    /// Use a square `n x n` grid (builder method).
    pub fn with_grid_size(mut self, n: usize) -> Self {
        self.nx = n;
        self.ny = n;
        self
    }

    /// Use an `nx x ny` grid (builder method).
    pub fn with_cells(mut self, nx: usize, ny: usize) -> Self {
        self.nx = nx;
        self.ny = ny;
        self
    }

    /// Set the receiver count (builder method).
    pub fn with_receivers(mut self, num_receivers: usize) -> Self {
        self.num_receivers = num_receivers;
        self
    }

    /// Set the receiver margin (builder method).
    pub fn with_receiver_margin(mut self, receiver_margin: f64) -> Self {
        self.receiver_margin = receiver_margin;
        self
    }

    /// Check every parameter against its constraints.
    ///
    /// # Errors
    /// Returns the first violated constraint. Receivers must fit between the
    /// margins, so `2 * receiver_margin <= depth_range` whenever there are any.
    /// Zero-width or zero-depth surveys and zero receivers are degenerate but
    /// valid.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("borehole distance", self.borehole_distance),
            ("depth range", self.depth_range),
            ("receiver margin", self.receiver_margin),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(TomographyError::InvalidDimension { name, value });
            }
        }

        if self.num_receivers > 0 && 2.0 * self.receiver_margin > self.depth_range {
            return Err(TomographyError::ReceiverMarginTooLarge {
                margin: self.receiver_margin,
                depth_range: self.depth_range,
            });
        }

        for (axis, size) in [self.nx, self.ny].into_iter().enumerate() {
            if size == 0 {
                return Err(TomographyError::InvalidGridShape { axis, size });
            }
        }

        let cells = self.nx.saturating_mul(self.ny);
        if cells > MAX_CELLS {
            return Err(TomographyError::GridTooLarge {
                cells,
                limit: MAX_CELLS,
            });
        }

        if self.num_receivers > MAX_RECEIVERS {
            return Err(TomographyError::TooManyReceivers {
                count: self.num_receivers,
                limit: MAX_RECEIVERS,
            });
        }

        Ok(())
    }
}

/// A point in the survey plane. `y` grows with depth.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    /// Horizontal coordinate.
    pub x: f64,
    /// Depth coordinate.
    pub y: f64,
}

impl Point {
    /// Create a point.
    pub fn new(x: f64, y: f64) -> Self {
        Point { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance(&self, other: &Point) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }
}

/// A straight ray from a source to a receiver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    /// Ray start (the source).
    pub start: Point,
    /// Ray end (the receiver).
    pub end: Point,
}

impl Ray {
    /// Create a ray between two points.
    pub fn new(start: Point, end: Point) -> Self {
        Ray { start, end }
    }

    /// Total straight-line length.
    pub fn length(&self) -> f64 {
        self.start.distance(&self.end)
    }
}

/// Boundaries of one grid cell.
///
/// Cell spans are closed intervals. For axis-aligned rays that run exactly
/// along a boundary shared by two cells, the cell on the larger-coordinate
/// side owns the boundary; `closed_right` / `closed_bottom` mark the grid's
/// outermost column and row, which also own their far edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellBounds {
    /// Left edge.
    pub x_left: f64,
    /// Right edge.
    pub x_right: f64,
    /// Top edge (shallower).
    pub y_top: f64,
    /// Bottom edge (deeper).
    pub y_bottom: f64,
    /// Whether the cell is in the last column.
    pub closed_right: bool,
    /// Whether the cell is in the last row.
    pub closed_bottom: bool,
}

impl CellBounds {
    /// Create interior cell bounds (neither far edge owned).
    pub fn new(x_left: f64, x_right: f64, y_top: f64, y_bottom: f64) -> Self {
        CellBounds {
            x_left,
            x_right,
            y_top,
            y_bottom,
            closed_right: false,
            closed_bottom: false,
        }
    }

    /// Whether `x` falls in the half-open column span, closed on the far edge
    /// for the last column.
    pub fn owns_x(&self, x: f64) -> bool {
        self.x_left <= x && (x < self.x_right || (self.closed_right && x <= self.x_right))
    }

    /// Whether `y` falls in the half-open row span, closed on the far edge for
    /// the last row.
    pub fn owns_y(&self, y: f64) -> bool {
        self.y_top <= y && (y < self.y_bottom || (self.closed_bottom && y <= self.y_bottom))
    }
}

/// A rectangular cell grid covering `[0, width] x [0, depth]`.
///
/// Cells are stored row-major with the row index running down in depth:
/// cell `(row, col)` has flat index `row * nx + col`.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    nx: usize,
    ny: usize,
    dx: f64,
    dy: f64,
}

impl Grid {
    /// Create a grid of `nx x ny` cells spanning `width x depth`.
    ///
    /// # Errors
    /// Returns an error if either cell count is zero or either extent is
    /// negative or not finite.
    pub fn new(nx: usize, ny: usize, width: f64, depth: f64) -> Result<Self> {
        for (axis, size) in [nx, ny].into_iter().enumerate() {
            if size == 0 {
                return Err(TomographyError::InvalidGridShape { axis, size });
            }
        }
        for (name, value) in [("grid width", width), ("grid depth", depth)] {
            if !value.is_finite() || value < 0.0 {
                return Err(TomographyError::InvalidDimension { name, value });
            }
        }
        Ok(Grid {
            nx,
            ny,
            dx: width / nx as f64,
            dy: depth / ny as f64,
        })
    }

    /// Number of horizontal cells.
    pub fn nx(&self) -> usize {
        self.nx
    }

    /// Number of vertical cells.
    pub fn ny(&self) -> usize {
        self.ny
    }

    /// Cell width.
    pub fn dx(&self) -> f64 {
        self.dx
    }

    /// Cell height.
    pub fn dy(&self) -> f64 {
        self.dy
    }

    /// Total number of cells.
    pub fn num_cells(&self) -> usize {
        self.nx * self.ny
    }

    /// Flat index of cell `(row, col)`.
    pub fn flat_index(&self, row: usize, col: usize) -> usize {
        row * self.nx + col
    }

    /// Boundaries of cell `(row, col)`.
    pub fn cell(&self, row: usize, col: usize) -> CellBounds {
        CellBounds {
            x_left: col as f64 * self.dx,
            x_right: (col + 1) as f64 * self.dx,
            y_top: row as f64 * self.dy,
            y_bottom: (row + 1) as f64 * self.dy,
            closed_right: col + 1 == self.nx,
            closed_bottom: row + 1 == self.ny,
        }
    }

    /// Horizontal cell-center coordinates.
    pub fn x_centers(&self) -> Vec<f64> {
        let width = self.dx * self.nx as f64;
        linspace(self.dx / 2.0, width - self.dx / 2.0, self.nx)
    }

    /// Vertical cell-center coordinates.
    pub fn y_centers(&self) -> Vec<f64> {
        let depth = self.dy * self.ny as f64;
        linspace(self.dy / 2.0, depth - self.dy / 2.0, self.ny)
    }
}

/// `n` evenly spaced values from `start` to `stop` inclusive.
///
/// A single value is `start`; the last of several values is exactly `stop`.
pub fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (n - 1) as f64;
            let mut values: Vec<f64> = (0..n).map(|i| start + i as f64 * step).collect();
            values[n - 1] = stop;
            values
        }
    }
}

/// Source, receivers and grid for a single inversion request.
#[derive(Debug, Clone, PartialEq)]
pub struct SurveyGeometry {
    borehole_distance: f64,
    depth_range: f64,
    grid: Grid,
    source: Point,
    receivers: Vec<Point>,
}

impl SurveyGeometry {
    /// Lay out the survey for a source at `source_depth`.
    ///
    /// # Errors
    /// Returns an error if the config is invalid or the source depth is not
    /// finite or outside `[0, depth_range]`.
    pub fn new(source_depth: f64, config: &SurveyConfig) -> Result<Self> {
        config.validate()?;

        if !source_depth.is_finite() || source_depth < 0.0 || source_depth > config.depth_range {
            return Err(TomographyError::InvalidSourceDepth {
                depth: source_depth,
                depth_range: config.depth_range,
            });
        }

        let grid = Grid::new(
            config.nx,
            config.ny,
            config.borehole_distance,
            config.depth_range,
        )?;

        let receivers = linspace(
            config.receiver_margin,
            config.depth_range - config.receiver_margin,
            config.num_receivers,
        )
        .into_iter()
        .map(|depth| Point::new(config.borehole_distance, depth))
        .collect();

        Ok(SurveyGeometry {
            borehole_distance: config.borehole_distance,
            depth_range: config.depth_range,
            grid,
            source: Point::new(0.0, source_depth),
            receivers,
        })
    }

    /// The cell grid.
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Source position.
    pub fn source(&self) -> Point {
        self.source
    }

    /// Receiver positions, shallowest first.
    pub fn receivers(&self) -> &[Point] {
        &self.receivers
    }

    /// Borehole separation.
    pub fn borehole_distance(&self) -> f64 {
        self.borehole_distance
    }

    /// Vertical extent of the survey.
    pub fn depth_range(&self) -> f64 {
        self.depth_range
    }

    /// One ray per receiver, in receiver order.
    pub fn rays(&self) -> Vec<Ray> {
        self.receivers
            .iter()
            .map(|&receiver| Ray::new(self.source, receiver))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn default_layout() {
        let geom = SurveyGeometry::new(50.0, &SurveyConfig::default()).unwrap();
        assert_eq!(geom.grid().nx(), 20);
        assert_eq!(geom.grid().ny(), 20);
        assert_relative_eq!(geom.grid().dx(), 2.5);
        assert_relative_eq!(geom.grid().dy(), 5.0);
        assert_eq!(geom.source(), Point::new(0.0, 50.0));
        assert_eq!(geom.receivers().len(), 10);
        assert_eq!(geom.receivers()[0], Point::new(50.0, 10.0));
        assert_eq!(geom.receivers()[9], Point::new(50.0, 90.0));
        assert_relative_eq!(geom.receivers()[1].y, 10.0 + 80.0 / 9.0, epsilon = 1e-12);
    }

    #[test]
    fn linspace_edge_cases() {
        assert!(linspace(0.0, 1.0, 0).is_empty());
        assert_eq!(linspace(3.0, 7.0, 1), vec![3.0]);
        assert_eq!(linspace(0.0, 1.0, 5), vec![0.0, 0.25, 0.5, 0.75, 1.0]);
    }

    #[test]
    fn cell_centers() {
        let grid = Grid::new(4, 2, 8.0, 10.0).unwrap();
        assert_eq!(grid.x_centers(), vec![1.0, 3.0, 5.0, 7.0]);
        assert_eq!(grid.y_centers(), vec![2.5, 7.5]);
    }

    #[test]
    fn flat_index_is_row_major() {
        let grid = Grid::new(7, 3, 7.0, 3.0).unwrap();
        assert_eq!(grid.flat_index(0, 0), 0);
        assert_eq!(grid.flat_index(0, 6), 6);
        assert_eq!(grid.flat_index(2, 1), 15);
    }

    #[test]
    fn cell_bounds_and_ownership() {
        let grid = Grid::new(2, 2, 10.0, 10.0).unwrap();
        let interior = grid.cell(0, 0);
        assert_eq!(interior.x_right, 5.0);
        assert!(!interior.owns_x(5.0));
        assert!(!interior.owns_y(5.0));

        let corner = grid.cell(1, 1);
        assert_eq!(corner.y_top, 5.0);
        assert!(corner.owns_x(10.0));
        assert!(corner.owns_y(10.0));
        assert!(corner.owns_y(5.0));
    }

    #[test]
    fn zero_receivers_is_valid() {
        let config = SurveyConfig::default().with_receivers(0);
        let geom = SurveyGeometry::new(10.0, &config).unwrap();
        assert!(geom.rays().is_empty());
    }

    #[test]
    fn source_depth_out_of_range() {
        let config = SurveyConfig::default();
        for depth in [-0.5, 100.5, f64::NAN, f64::INFINITY] {
            let result = SurveyGeometry::new(depth, &config);
            assert!(matches!(
                result,
                Err(TomographyError::InvalidSourceDepth { .. })
            ));
        }
        assert!(SurveyGeometry::new(0.0, &config).is_ok());
        assert!(SurveyGeometry::new(100.0, &config).is_ok());
    }

    #[test]
    fn invalid_grid_shape() {
        let config = SurveyConfig::default().with_cells(0, 5);
        assert!(matches!(
            config.validate(),
            Err(TomographyError::InvalidGridShape { axis: 0, size: 0 })
        ));
    }

    #[test]
    fn invalid_dimension() {
        let config = SurveyConfig::default().with_borehole_distance(-1.0);
        assert!(matches!(
            config.validate(),
            Err(TomographyError::InvalidDimension { name: "borehole distance", .. })
        ));
    }

    #[test]
    fn grid_limit() {
        let config = SurveyConfig::default().with_grid_size(1000);
        assert!(matches!(
            config.validate(),
            Err(TomographyError::GridTooLarge { cells: 1_000_000, .. })
        ));
    }

    #[test]
    fn receivers_must_fit_inside_survey() {
        let shallow = SurveyConfig::default().with_depth_range(5.0).with_receivers(3);
        assert!(matches!(
            SurveyGeometry::new(2.0, &shallow),
            Err(TomographyError::ReceiverMarginTooLarge { .. })
        ));

        let fitted = shallow.clone().with_receiver_margin(1.0);
        let geom = SurveyGeometry::new(2.0, &fitted).unwrap();
        assert_eq!(
            geom.receivers().iter().map(|r| r.y).collect::<Vec<_>>(),
            vec![1.0, 2.5, 4.0]
        );

        // A margin of exactly half the depth stacks every receiver mid-survey
        let stacked = SurveyConfig::default().with_receiver_margin(50.0);
        assert!(SurveyGeometry::new(2.0, &stacked).is_ok());

        // With no receivers the margin is irrelevant
        let empty = SurveyConfig::default().with_depth_range(5.0).with_receivers(0);
        assert!(SurveyGeometry::new(2.0, &empty).is_ok());
    }

    #[test]
    fn receiver_limit() {
        let config = SurveyConfig::default().with_receivers(MAX_RECEIVERS + 1);
        assert!(matches!(
            config.validate(),
            Err(TomographyError::TooManyReceivers { .. })
        ));
    }

    #[test]
    fn ray_length() {
        let ray = Ray::new(Point::new(0.0, 0.0), Point::new(3.0, 4.0));
        assert_relative_eq!(ray.length(), 5.0);
    }
}
