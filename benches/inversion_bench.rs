// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use crosswell_tomo::geometry::{SurveyConfig, SurveyGeometry};
use crosswell_tomo::inversion::invert;
use crosswell_tomo::synthetic::{self, SyntheticConfig};
use crosswell_tomo::{ForwardModel, InversionConfig, InversionRequest, Tomography};

fn survey(cells: usize, receivers: usize) -> SurveyConfig {
    SurveyConfig::default()
        .with_grid_size(cells)
        .with_receivers(receivers)
}

fn num_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Forward assembly: G for growing grids, 1 thread and all-cores.
fn bench_forward_build(c: &mut Criterion) {
    let cpus = num_cpus();
    let mut group = c.benchmark_group("forward_build");
    for &(n, receivers) in &[(20, 10), (100, 50), (250, 200)] {
        let geom = SurveyGeometry::new(50.0, &survey(n, receivers)).unwrap();
        for &threads in &[1, cpus] {
            group.bench_function(format!("{}x{}_{}rays_{}threads", n, n, receivers, threads), |b| {
                b.iter(|| {
                    let g = ForwardModel::new(&geom)
                        .with_threads(threads)
                        .build()
                        .unwrap();
                    black_box(g)
                });
            });
        }
    }
    group.finish();
}

/// SVD inversion of a prebuilt G with and without truncation.
fn bench_invert(c: &mut Criterion) {
    let mut group = c.benchmark_group("invert");
    for &(n, receivers) in &[(20, 10), (60, 40)] {
        let geom = SurveyGeometry::new(50.0, &survey(n, receivers)).unwrap();
        let g = ForwardModel::new(&geom).build().unwrap().into_matrix();
        let data = synthetic::generate(&g, &SyntheticConfig::default()).unwrap();
        for k in [None, Some(receivers / 2)] {
            let label = match k {
                Some(k) => format!("{}x{}_k{}", n, n, k),
                None => format!("{}x{}_full", n, n),
            };
            group.bench_function(label, |b| {
                b.iter(|| black_box(invert(&g, &data.travel_times, k).unwrap()));
            });
        }
    }
    group.finish();
}

/// End-to-end request on the default survey.
fn bench_pipeline(c: &mut Criterion) {
    let tomo = Tomography::new(InversionConfig::default());
    let request = InversionRequest::new(50.0).with_truncation(5);
    c.bench_function("pipeline_default_survey", |b| {
        b.iter(|| black_box(tomo.run(black_box(&request)).unwrap()));
    });
    c.bench_function("respond_json", |b| {
        b.iter(|| {
            let response = tomo.respond(black_box(r#"{"sourceDepth": 50, "k": 5}"#));
            black_box(response.to_json().unwrap())
        });
    });
}

criterion_group!(benches, bench_forward_build, bench_invert, bench_pipeline);
criterion_main!(benches);
