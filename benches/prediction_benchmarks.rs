use criterion::{black_box, criterion_group, criterion_main, Criterion};

use pacecast::geometry;
use pacecast::models::TrackPoint;
use pacecast::power_law::{self, PowerLawParams};
use pacecast::predictor::{integrate_route_time, PredictorConfig};
use pacecast::slope_model::SlopeSpeedCoefficients;

fn record_series() -> (Vec<f64>, Vec<f64>) {
    let truth = PowerLawParams {
        vm: 210.0,
        tc: 12.0,
        gamma_s: 0.15,
        gamma_l: 0.08,
    };
    let distances = vec![800.0, 1500.0, 3000.0, 5000.0, 10000.0, 21097.0];
    let times = distances.iter().map(|&d| truth.predicted_time(d)).collect();
    (distances, times)
}

fn hilly_route(points: usize) -> Vec<TrackPoint> {
    (0..points)
        .map(|i| {
            let elevation = 500.0 + 50.0 * (i as f64 / 40.0).sin();
            TrackPoint::new(45.0 + i as f64 * 0.0009, 6.0, elevation)
        })
        .collect()
}

fn bench_power_law_fit(c: &mut Criterion) {
    let (distances, times) = record_series();
    c.bench_function("power_law_fit", |b| {
        b.iter(|| power_law::fit(black_box(&distances), black_box(&times)))
    });
}

fn bench_slope_profile(c: &mut Criterion) {
    let route = hilly_route(2000);
    c.bench_function("slope_profile_2k_points", |b| {
        b.iter(|| geometry::slope_profile(black_box(&route)))
    });
}

fn bench_route_integration(c: &mut Criterion) {
    let route = hilly_route(2000);
    let profile = geometry::slope_profile(&route);
    let params = PowerLawParams {
        vm: 210.0,
        tc: 12.0,
        gamma_s: 0.15,
        gamma_l: 0.08,
    };
    let coefficients = SlopeSpeedCoefficients::default();
    let config = PredictorConfig::default();

    c.bench_function("route_time_integration_2k_points", |b| {
        b.iter(|| {
            integrate_route_time(
                black_box(&profile),
                black_box(&params),
                black_box(&coefficients),
                black_box(&config),
            )
        })
    });
}

criterion_group!(
    benches,
    bench_power_law_fit,
    bench_slope_profile,
    bench_route_integration
);
criterion_main!(benches);
