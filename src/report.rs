// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

//! Request parsing and the JSON response shape consumed by plotting clients.

use nalgebra::DVector;
use serde::Serialize;
use serde_json::Value;

use crate::error::{Result, TomographyError};
use crate::forward::{ObservationMatrix, RayPath};
use crate::geometry::{Grid, Point, SurveyGeometry};
use crate::inversion::Inversion;

/// Parameters of one inversion request.
#[derive(Debug, Clone, PartialEq)]
pub struct InversionRequest {
    /// Depth of the source in the source borehole.
    pub source_depth: f64,
    /// Number of singular triplets to keep; `None` keeps all.
    pub k: Option<usize>,
}

impl InversionRequest {
    /// A request with no truncation.
    pub fn new(source_depth: f64) -> Self {
        InversionRequest {
            source_depth,
            k: None,
        }
    }

    /// Keep only the top `k` singular triplets (builder method).
    /// A `k` of 0 means no truncation.
    pub fn with_truncation(mut self, k: usize) -> Self {
        self.k = if k == 0 { None } else { Some(k) };
        self
    }

    /// Parse a request body such as `{"sourceDepth": 50, "k": 5}`.
    ///
    /// # Errors
    /// Returns an error if the body is not JSON or a field is invalid; see
    /// [`InversionRequest::from_json_value`].
    pub fn from_json_str(body: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(body)?;
        Self::from_json_value(&value)
    }

    /// Interpret a decoded request body.
    ///
    /// `sourceDepth` must be a number or a numeric string. `k` may be an
    /// integer, an integral float or an integer string; a missing, null,
    /// `false`, `0` or empty-string `k` and any negative `k` mean no
    /// truncation. A fractional `k` such as `2.5` is rejected, not truncated
    /// to 2.
    ///
    /// # Errors
    /// Returns an error if `sourceDepth` is missing or not numeric, or if `k`
    /// cannot be read as an integer.
    pub fn from_json_value(value: &Value) -> Result<Self> {
        let source_depth = match value.get("sourceDepth") {
            None | Some(Value::Null) => return Err(TomographyError::MissingField("sourceDepth")),
            Some(v) => parse_number("sourceDepth", v)?,
        };
        let k = match value.get("k") {
            None => None,
            Some(v) => parse_rank(v)?,
        };
        Ok(InversionRequest { source_depth, k })
    }
}

fn parse_number(field: &'static str, value: &Value) -> Result<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| TomographyError::InvalidNumber {
        field,
        value: value.to_string(),
    })
}

fn parse_rank(value: &Value) -> Result<Option<usize>> {
    let invalid = || TomographyError::InvalidRank(value.to_string());
    let k: i64 = match value {
        Value::Null | Value::Bool(false) => return Ok(None),
        Value::String(s) if s.is_empty() => return Ok(None),
        Value::String(s) => s.trim().parse().map_err(|_| invalid())?,
        Value::Number(n) => match n.as_i64() {
            Some(k) => k,
            None => {
                let f = n.as_f64().ok_or_else(invalid)?;
                if f.fract() != 0.0 || f.abs() > i64::MAX as f64 {
                    return Err(invalid());
                }
                f as i64
            }
        },
        _ => return Err(invalid()),
    };
    Ok(usize::try_from(k).ok().filter(|&k| k > 0))
}

/// Grid dimensions reported alongside the image.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridInfo {
    /// Horizontal cells.
    pub nx: usize,
    /// Vertical cells.
    pub ny: usize,
    /// Cell width.
    pub dx: f64,
    /// Cell height.
    pub dy: f64,
    /// Borehole separation.
    pub borehole_distance: f64,
    /// Survey depth.
    pub depth_range: f64,
}

/// Vertical line segments for drawing the two boreholes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoreholeLines {
    /// x of both ends of the source borehole.
    pub source_x: [f64; 2],
    /// Top and bottom of the source borehole.
    pub source_y: [f64; 2],
    /// x of both ends of the receiver borehole.
    pub receiver_x: [f64; 2],
    /// Top and bottom of the receiver borehole.
    pub receiver_y: [f64; 2],
}

/// Source and receiver positions plus borehole outlines.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoreholeData {
    /// Source position.
    pub source: Point,
    /// Receiver positions, shallowest first.
    pub receivers: Vec<Point>,
    /// Borehole outlines.
    pub boreholes: BoreholeLines,
}

impl BoreholeData {
    fn new(geometry: &SurveyGeometry) -> Self {
        let source = geometry.source();
        let receiver_x = geometry.borehole_distance();
        let depth = geometry.depth_range();
        BoreholeData {
            source,
            receivers: geometry.receivers().to_vec(),
            boreholes: BoreholeLines {
                source_x: [source.x, source.x],
                source_y: [0.0, depth],
                receiver_x: [receiver_x, receiver_x],
                receiver_y: [0.0, depth],
            },
        }
    }
}

/// Everything a client needs to plot one inversion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InversionReport {
    /// Numerical rank of G.
    pub rank: usize,
    /// Full singular-value spectrum, descending.
    pub singular_values: Vec<f64>,
    /// Recovered model as `ny` rows of `nx` values, shallowest row first.
    pub slowness_grid: Vec<Vec<f64>>,
    /// Horizontal cell centers.
    pub x_centers: Vec<f64>,
    /// Vertical cell centers.
    pub y_centers: Vec<f64>,
    /// Ray endpoints.
    pub ray_paths: Vec<RayPath>,
    /// Borehole drawing data.
    pub borehole_data: BoreholeData,
    /// Grid dimensions.
    pub grid_info: GridInfo,
}

impl InversionReport {
    /// Assemble the report for a finished inversion.
    pub fn new(
        geometry: &SurveyGeometry,
        observation: &ObservationMatrix,
        inversion: &Inversion,
    ) -> Self {
        let grid = geometry.grid();
        InversionReport {
            rank: inversion.rank,
            singular_values: inversion.singular_values.iter().copied().collect(),
            slowness_grid: reshape_grid(&inversion.solution, grid),
            x_centers: grid.x_centers(),
            y_centers: grid.y_centers(),
            ray_paths: observation.ray_paths().to_vec(),
            borehole_data: BoreholeData::new(geometry),
            grid_info: GridInfo {
                nx: grid.nx(),
                ny: grid.ny(),
                dx: grid.dx(),
                dy: grid.dy(),
                borehole_distance: geometry.borehole_distance(),
                depth_range: geometry.depth_range(),
            },
        }
    }
}

/// Split a per-cell vector into `ny` rows of `nx` values.
pub fn reshape_grid(values: &DVector<f64>, grid: &Grid) -> Vec<Vec<f64>> {
    values
        .as_slice()
        .chunks(grid.nx())
        .map(|row| row.to_vec())
        .collect()
}

/// The JSON body returned to the caller: the report on success, or an error
/// message and no partial results on failure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    success: bool,
    #[serde(flatten)]
    report: Option<InversionReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl Response {
    /// A successful response carrying `report`.
    pub fn success(report: InversionReport) -> Self {
        Response {
            success: true,
            report: Some(report),
            error: None,
        }
    }

    /// A failure response describing `error`.
    pub fn failure(error: &TomographyError) -> Self {
        Response {
            success: false,
            report: None,
            error: Some(error.to_string()),
        }
    }

    /// Whether the request succeeded.
    pub fn is_success(&self) -> bool {
        self.success
    }

    /// The report, if the request succeeded.
    pub fn report(&self) -> Option<&InversionReport> {
        self.report.as_ref()
    }

    /// The error message, if the request failed.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Encode as a JSON string.
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_basic_request() {
        let req = InversionRequest::from_json_str(r#"{"sourceDepth": 50, "k": 5}"#).unwrap();
        assert_eq!(req, InversionRequest::new(50.0).with_truncation(5));
    }

    #[test]
    fn parse_string_fields() {
        let req = InversionRequest::from_json_value(&json!({"sourceDepth": " 12.5 ", "k": "3"}))
            .unwrap();
        assert_eq!(req.source_depth, 12.5);
        assert_eq!(req.k, Some(3));
    }

    #[test]
    fn falsy_and_negative_k_mean_no_truncation() {
        for k in [json!(null), json!(0), json!(false), json!(""), json!(-4), json!(0.0)] {
            let req = InversionRequest::from_json_value(&json!({"sourceDepth": 1, "k": k}))
                .unwrap();
            assert_eq!(req.k, None, "k = {:?}", k);
        }
        let req = InversionRequest::from_json_value(&json!({"sourceDepth": 1})).unwrap();
        assert_eq!(req.k, None);
    }

    #[test]
    fn integral_float_k_accepted() {
        let req = InversionRequest::from_json_value(&json!({"sourceDepth": 1, "k": 4.0})).unwrap();
        assert_eq!(req.k, Some(4));
    }

    #[test]
    fn invalid_k_rejected() {
        for k in [json!("three"), json!(2.5), json!(true), json!([1])] {
            let result = InversionRequest::from_json_value(&json!({"sourceDepth": 1, "k": k}));
            assert!(matches!(result, Err(TomographyError::InvalidRank(_))));
        }
    }

    #[test]
    fn missing_source_depth() {
        for body in [json!({}), json!({"sourceDepth": null, "k": 3})] {
            let result = InversionRequest::from_json_value(&body);
            assert!(matches!(
                result,
                Err(TomographyError::MissingField("sourceDepth"))
            ));
        }
    }

    #[test]
    fn non_numeric_source_depth() {
        let result = InversionRequest::from_json_value(&json!({"sourceDepth": "deep"}));
        assert!(matches!(
            result,
            Err(TomographyError::InvalidNumber { field: "sourceDepth", .. })
        ));
    }

    #[test]
    fn malformed_body() {
        let result = InversionRequest::from_json_str("{not json");
        assert!(matches!(result, Err(TomographyError::Json(_))));
    }

    #[test]
    fn reshape_is_row_major() {
        let grid = Grid::new(3, 2, 3.0, 2.0).unwrap();
        let values = DVector::from_vec(vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(
            reshape_grid(&values, &grid),
            vec![vec![0.0, 1.0, 2.0], vec![3.0, 4.0, 5.0]]
        );
    }

    #[test]
    fn failure_response_shape() {
        let response = Response::failure(&TomographyError::MissingField("sourceDepth"));
        let value: Value = serde_json::from_str(&response.to_json().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({"success": false, "error": "missing required field 'sourceDepth'"})
        );
    }
}
