// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use tracing::{debug, warn};

use crate::error::Result;
use crate::forward::{ForwardModel, ObservationMatrix};
use crate::geometry::{SurveyConfig, SurveyGeometry};
use crate::inversion::{invert, Inversion};
use crate::report::{InversionReport, InversionRequest, Response};
use crate::synthetic::{self, SyntheticConfig, SyntheticData};

/// Configuration shared by every request a [`Tomography`] serves.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InversionConfig {
    /// Survey layout.
    pub survey: SurveyConfig,
    /// Synthetic data parameters.
    pub synthetic: SyntheticConfig,
    /// Worker threads for matrix assembly; `None` uses all cores.
    pub num_threads: Option<usize>,
}

impl InversionConfig {
    /// Set the survey layout (builder method).
    pub fn with_survey(mut self, survey: SurveyConfig) -> Self {
        self.survey = survey;
        self
    }

    /// Set the synthetic data parameters (builder method).
    pub fn with_synthetic(mut self, synthetic: SyntheticConfig) -> Self {
        self.synthetic = synthetic;
        self
    }

    /// Set the number of worker threads (builder method).
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.num_threads = Some(threads);
        self
    }
}

/// Every intermediate product of one inversion.
#[derive(Debug, Clone)]
pub struct InversionOutcome {
    /// The survey layout used.
    pub geometry: SurveyGeometry,
    /// G and the ray paths.
    pub observation: ObservationMatrix,
    /// The ground truth and travel times that were inverted.
    pub synthetic: SyntheticData,
    /// The inversion result.
    pub inversion: Inversion,
    /// The client-facing report.
    pub report: InversionReport,
}

/// Runs the geometry, forward model, synthetic data and inversion stages
/// for each request. Holds no per-request state.
#[derive(Debug, Clone, Default)]
pub struct Tomography {
    config: InversionConfig,
}

impl Tomography {
    /// Create a pipeline with the given configuration.
    pub fn new(config: InversionConfig) -> Self {
        Tomography { config }
    }

    /// The pipeline configuration.
    pub fn config(&self) -> &InversionConfig {
        &self.config
    }

    /// Run one inversion.
    ///
    /// # Errors
    /// Returns an error for an invalid source depth or survey, or if the
    /// decomposition fails. Degenerate surveys yield a rank-0 result, not an
    /// error.
    pub fn run(&self, request: &InversionRequest) -> Result<InversionOutcome> {
        let geometry = SurveyGeometry::new(request.source_depth, &self.config.survey)?;
        debug!(
            source_depth = request.source_depth,
            k = ?request.k,
            receivers = geometry.receivers().len(),
            "survey laid out"
        );

        let mut forward = ForwardModel::new(&geometry);
        if let Some(threads) = self.config.num_threads {
            forward = forward.with_threads(threads);
        }
        let observation = forward.build()?;

        let synthetic = synthetic::generate(observation.matrix(), &self.config.synthetic)?;
        let inversion = invert(observation.matrix(), &synthetic.travel_times, request.k)?;
        let report = InversionReport::new(&geometry, &observation, &inversion);

        Ok(InversionOutcome {
            geometry,
            observation,
            synthetic,
            inversion,
            report,
        })
    }

    /// Handle a request body end to end, converting any error into a failure
    /// response.
    pub fn respond(&self, body: &str) -> Response {
        let result = InversionRequest::from_json_str(body).and_then(|request| self.run(&request));
        match result {
            Ok(outcome) => Response::success(outcome.report),
            Err(e) => {
                warn!(error = %e, invalid_input = e.is_invalid_input(), "request rejected");
                Response::failure(&e)
            }
        }
    }
}
