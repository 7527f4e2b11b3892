use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;

use gs_inference::{
    build_synthetic_control, simulate_geo_panel, GeoPanelConfig, Method, SyntheticControlConfig,
};

fn panel(n_geos: usize, n_days: usize) -> gs_inference::LongTable {
    let geos: Vec<String> = (1..=n_geos).map(|g| format!("geo_{}", g)).collect();
    let config = GeoPanelConfig {
        geos,
        treated_geo: "geo_1".to_string(),
        n_days,
        boundary: (n_days / 2) as f64,
        noise_sd: 1.0,
        ..Default::default()
    };
    simulate_geo_panel(&config, 42).unwrap()
}

fn bench_fit_explicit_alpha(c: &mut Criterion) {
    let mut group = c.benchmark_group("synth_fit_explicit_alpha");
    for (n_geos, n_days) in [(5, 90), (20, 180), (50, 365)] {
        let table = panel(n_geos, n_days);
        let config = SyntheticControlConfig {
            boundary: Some((n_days / 2) as f64),
            alpha: Some(1.0),
            ..SyntheticControlConfig::new("geo_1", "spend", "date", "geo")
        };
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}geos_{}days", n_geos, n_days)),
            &(table, config),
            |b, (table, config)| {
                b.iter(|| build_synthetic_control(black_box(table), black_box(config)).unwrap())
            },
        );
    }
    group.finish();
}

fn bench_fit_with_selection(c: &mut Criterion) {
    let mut group = c.benchmark_group("synth_fit_grid_search");
    for method in [Method::Ridge, Method::Lasso] {
        let table = panel(10, 120);
        let config = SyntheticControlConfig {
            boundary: Some(60.0),
            method,
            ..SyntheticControlConfig::new("geo_1", "spend", "date", "geo")
        };
        group.bench_with_input(
            BenchmarkId::from_parameter(method.name()),
            &(table, config),
            |b, (table, config)| {
                b.iter(|| build_synthetic_control(black_box(table), black_box(config)).unwrap())
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_fit_explicit_alpha, bench_fit_with_selection);
criterion_main!(benches);
