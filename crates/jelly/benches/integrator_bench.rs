//! Benchmarks for the jelly integrator
//!
//! Run with: `cargo bench -p jelly`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use jelly::integrator::{integrate, KernelParams};
use jelly::{JellyConfig, Mat4, SimulationState, Vec3};

fn shell_points(count: usize) -> Vec<Vec3> {
    // Fibonacci sphere
    let golden = std::f32::consts::PI * (3.0 - 5.0_f32.sqrt());
    (0..count)
        .map(|i| {
            let y = 1.0 - 2.0 * (i as f32 + 0.5) / count as f32;
            let r = (1.0 - y * y).sqrt();
            let theta = golden * i as f32;
            Vec3::new(r * theta.cos(), y, r * theta.sin())
        })
        .collect()
}

fn moving_state(count: usize) -> SimulationState {
    let mut state = SimulationState::new(&shell_points(count)).unwrap();
    state.sample_motion(&Mat4::IDENTITY);
    state.sample_motion(&Mat4::from_translation(Vec3::new(0.05, 0.0, 0.0)));
    state
}

// ============================================================================
// Kernel throughput
// ============================================================================

fn bench_integrate(c: &mut Criterion) {
    let mut group = c.benchmark_group("integrate");
    let config = JellyConfig::default();

    for count in [1_000, 10_000, 100_000] {
        let mut state = moving_state(count);
        let params = KernelParams::from_config(&config, state.pivot_local, Mat4::IDENTITY, 1.0 / 60.0);
        let batch = jelly::governor::batch_size(count, rayon::current_num_threads());

        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, _| {
            b.iter(|| {
                integrate(&mut state, black_box(&params), batch);
                state.store.live[0]
            });
        });
    }

    group.finish();
}

// ============================================================================
// Batch size sweep
// ============================================================================

fn bench_batch_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("batch_size_100k");
    let config = JellyConfig::default();
    let mut state = moving_state(100_000);
    let params = KernelParams::from_config(&config, state.pivot_local, Mat4::IDENTITY, 1.0 / 60.0);

    for batch in [32, 128, 512, 4096] {
        group.bench_with_input(BenchmarkId::from_parameter(batch), &batch, |b, &batch| {
            b.iter(|| {
                integrate(&mut state, &params, black_box(batch));
                state.store.live[0]
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_integrate, bench_batch_sizes);
criterion_main!(benches);
