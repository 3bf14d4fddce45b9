// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crosswell_tomo::io;
use crosswell_tomo::synthetic::SyntheticConfig;
use crosswell_tomo::tomography::InversionOutcome;
use crosswell_tomo::{
    Decomposition, InversionConfig, InversionRequest, Response, SurveyConfig, Tomography,
};

#[derive(Parser)]
#[command(
    name = "crosswell-tomo",
    about = "Crosswell travel-time tomography with truncated-SVD inversion"
)]
struct Cli {
    /// Source depth in the source borehole
    #[arg(long, required_unless_present = "request")]
    source_depth: Option<f64>,

    /// Number of singular values to keep (0 keeps all)
    #[arg(short = 'k', long)]
    k: Option<usize>,

    /// JSON request file, e.g. {"sourceDepth": 50, "k": 5}
    #[arg(long, conflicts_with_all = ["source_depth", "k"])]
    request: Option<PathBuf>,

    /// Horizontal distance between the boreholes
    #[arg(long, default_value = "50.0")]
    borehole_distance: f64,

    /// Cells along each grid axis
    #[arg(long, default_value = "20")]
    grid_size: usize,

    /// Vertical extent of the survey
    #[arg(long, default_value = "100.0")]
    depth_range: f64,

    /// Number of receivers
    #[arg(long, default_value = "10")]
    receivers: usize,

    /// Distance of the outermost receivers from the top and bottom
    #[arg(long, default_value = "10.0")]
    receiver_margin: f64,

    /// Seed for the synthetic model and noise
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Number of Rayon worker threads
    #[arg(long)]
    threads: Option<usize>,

    /// Response JSON path (stdout if omitted)
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    /// Write the observation matrix G (.npy or .mat)
    #[arg(long)]
    export_matrix: Option<PathBuf>,

    /// Write the recovered slowness grid (.npy or .mat)
    #[arg(long)]
    export_grid: Option<PathBuf>,

    /// Write the singular-value spectrum (.npy or .mat)
    #[arg(long)]
    export_spectrum: Option<PathBuf>,

    /// Write the truncated pseudo-inverse of G (.npy or .mat)
    #[arg(long)]
    export_pseudo_inverse: Option<PathBuf>,

    /// Log filter used when RUST_LOG is unset (e.g. "info", "crosswell_tomo=debug")
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn init_logging(level: &str) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level).context("invalid --log-level")?,
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

fn build_config(cli: &Cli) -> InversionConfig {
    let survey = SurveyConfig::default()
        .with_borehole_distance(cli.borehole_distance)
        .with_depth_range(cli.depth_range)
        .with_grid_size(cli.grid_size)
        .with_receivers(cli.receivers)
        .with_receiver_margin(cli.receiver_margin);

    let mut config = InversionConfig::default()
        .with_survey(survey)
        .with_synthetic(SyntheticConfig::default().with_seed(cli.seed));
    if let Some(threads) = cli.threads {
        config = config.with_threads(threads);
    }
    config
}

fn read_request(cli: &Cli) -> crosswell_tomo::Result<InversionRequest> {
    if let Some(path) = &cli.request {
        let body = std::fs::read_to_string(path)?;
        return InversionRequest::from_json_str(&body);
    }
    let source_depth = cli
        .source_depth
        .ok_or(crosswell_tomo::TomographyError::MissingField("sourceDepth"))?;
    Ok(InversionRequest::new(source_depth).with_truncation(cli.k.unwrap_or(0)))
}

fn write_response(response: &Response, output: Option<&PathBuf>) -> Result<()> {
    match output {
        Some(path) => io::save_json(response, path)
            .with_context(|| format!("failed to write {}", path.display())),
        None => {
            let json = serde_json::to_string_pretty(response).context("failed to encode response")?;
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{}", json)?;
            Ok(())
        }
    }
}

fn export(cli: &Cli, request: &InversionRequest, outcome: &InversionOutcome) -> Result<()> {
    if let Some(path) = &cli.export_matrix {
        io::save_matrix(outcome.observation.matrix(), path, "observation_matrix")
            .with_context(|| format!("failed to export G to {}", path.display()))?;
    }
    if let Some(path) = &cli.export_grid {
        let grid = io::slowness_matrix(&outcome.inversion.solution, outcome.geometry.grid())?;
        io::save_matrix(&grid, path, "slowness_grid")
            .with_context(|| format!("failed to export grid to {}", path.display()))?;
    }
    if let Some(path) = &cli.export_spectrum {
        io::save_vector(&outcome.inversion.singular_values, path, "singular_values")
            .with_context(|| format!("failed to export spectrum to {}", path.display()))?;
    }
    if let Some(path) = &cli.export_pseudo_inverse {
        let pinv = Decomposition::new(outcome.observation.matrix())?.pseudo_inverse(request.k);
        io::save_matrix(&pinv, path, "pseudo_inverse")
            .with_context(|| format!("failed to export pseudo-inverse to {}", path.display()))?;
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;

    let tomography = Tomography::new(build_config(&cli));
    let result = read_request(&cli)
        .and_then(|request| tomography.run(&request).map(|outcome| (request, outcome)));

    match result {
        Ok((request, outcome)) => {
            info!(
                rank = outcome.inversion.rank,
                retained = outcome.inversion.retained,
                residual = outcome.inversion.residual_norm,
                "writing response"
            );
            export(&cli, &request, &outcome)?;
            write_response(&Response::success(outcome.report), cli.output.as_ref())?;
            Ok(())
        }
        Err(e) => {
            write_response(&Response::failure(&e), cli.output.as_ref())?;
            bail!("inversion failed: {}", e);
        }
    }
}
