//! Wobble diagnostic - drives a jelly sphere along a shaking path
//!
//! The sphere translates side to side, spins about Y, then stops dead so
//! the wobble has to settle. A viewer walks away and comes back so the
//! LOD governor passes through every level and culls once.
//!
//! PASS CRITERIA:
//! 1. Deformation appears while moving
//! 2. Deformation decays after the sphere stops
//! 3. No vertex ever becomes NaN
//!
//! Run with: RUST_LOG=debug cargo run --example wobble_diagnostic -p jelly --release

use std::f32::consts::{PI, TAU};

use jelly::{JellyConfig, JellyMesh, Mat4, RenderSurface, StaticMesh, TickInput, Vec3};

/// Keeps the last uploaded pose so deformation can be measured.
struct CapturedPose {
    positions: Vec<Vec3>,
    deformed: bool,
}

impl RenderSurface for CapturedPose {
    fn apply_positions(&mut self, positions: &[Vec3], _update_collider: bool) {
        self.positions.clear();
        self.positions.extend_from_slice(positions);
    }

    fn show_deformed(&mut self, deformed: bool) {
        self.deformed = deformed;
    }
}

fn uv_sphere(radius: f32, rings: usize, segments: usize) -> Vec<Vec3> {
    let mut vertices = Vec::with_capacity((rings + 1) * segments);
    for ring in 0..=rings {
        let theta = PI * ring as f32 / rings as f32;
        for segment in 0..segments {
            let phi = TAU * segment as f32 / segments as f32;
            vertices.push(Vec3::new(
                radius * theta.sin() * phi.cos(),
                radius * theta.cos(),
                radius * theta.sin() * phi.sin(),
            ));
        }
    }
    vertices
}

/// Owner transform at time `t`: shake for 3s, spin for 2s, then hold.
fn owner_transform(t: f32) -> Mat4 {
    let shake = if t < 3.0 { (t * 6.0).sin() * 0.5 } else { 0.0 };
    let spin = if (3.0..5.0).contains(&t) {
        (t - 3.0) * PI
    } else if t >= 5.0 {
        2.0 * PI
    } else {
        0.0
    };
    Mat4::from_translation(Vec3::new(shake, 0.0, 0.0)) * Mat4::from_rotation_y(spin)
}

/// Viewer walks from 2m out to 70m and back over 10s.
fn viewer_distance(t: f32) -> f32 {
    let phase = (t / 10.0).min(1.0);
    2.0 + 68.0 * (phase * PI).sin()
}

fn max_deformation(rest: &[Vec3], live: &[Vec3]) -> f32 {
    rest.iter()
        .zip(live)
        .map(|(r, l)| r.distance(*l))
        .fold(0.0, f32::max)
}

fn main() {
    env_logger::init();

    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║              JELLY WOBBLE DIAGNOSTIC                         ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    let rest = uv_sphere(1.0, 24, 48);
    let config = JellyConfig {
        use_lod: true,
        performance_level: 0.2,
        ..JellyConfig::default()
    };
    println!("Vertices: {}", rest.len());
    println!(
        "Config: stiffness {} damping {} radius strength {} LOD {}-{}m\n",
        config.stiffness,
        config.damping,
        config.radius_constraint_strength,
        config.min_lod_distance,
        config.max_lod_distance
    );

    let surface = CapturedPose {
        positions: Vec::new(),
        deformed: true,
    };
    let mut jelly = JellyMesh::new(StaticMesh::new(rest.clone()), surface, config);
    if let Err(err) = jelly.initialize() {
        eprintln!("Failed to initialize: {}", err);
        return;
    }

    let dt = 1.0 / 60.0;
    let total_frames = 60 * 12;
    let mut peak_moving = 0.0f32;
    let mut peak_settled = 0.0f32;
    let mut nan_seen = false;
    let mut live = Vec::with_capacity(rest.len());

    println!(
        "{:>6} {:>8} {:>10} {:>8} {:>8} {:>8}",
        "Time", "Viewer", "MaxDeform", "Level", "Every", "Culled"
    );
    println!("{}", "-".repeat(56));

    for frame in 0..total_frames {
        let t = frame as f32 * dt;
        let mut input = TickInput::at(owner_transform(t));
        input.viewer_distance = Some(viewer_distance(t));

        let report = jelly.step(dt, &input);

        match jelly.state() {
            Some(state) => state.store.live_positions_into(&mut live),
            None => live.clear(),
        }
        if live.iter().any(|p| !p.is_finite()) {
            nan_seen = true;
        }
        let deform = max_deformation(&rest, &live);
        if t < 5.0 {
            peak_moving = peak_moving.max(deform);
        } else if t > 10.0 {
            peak_settled = peak_settled.max(deform);
        }

        if frame % 60 == 0 {
            let (level, interval) = report
                .profile
                .map(|p| (p.effective_level, p.update_interval_frames))
                .unwrap_or((0.0, 0));
            println!(
                "{:>5.1}s {:>7.1}m {:>10.4} {:>8.2} {:>8} {:>8}",
                t,
                viewer_distance(t),
                deform,
                level,
                interval + 1,
                if report.culled { "yes" } else { "no" }
            );
        }
    }

    println!("\n{}", jelly.metrics().format_summary());
    println!("Showing deformed output: {}", jelly.surface().deformed);
    println!("Last uploaded pose: {} vertices", jelly.surface().positions.len());
    if let Some(state) = jelly.state() {
        println!("Flat upload buffer: {} floats", state.store.as_flat_f32().len());
    }

    println!("\nRESULTS");
    let moving_ok = peak_moving > 1e-3;
    let settled_ok = peak_settled < peak_moving;
    println!(
        "  [{}] Deformation while moving: {:.4}",
        if moving_ok { "PASS" } else { "FAIL" },
        peak_moving
    );
    println!(
        "  [{}] Deformation after settling: {:.4}",
        if settled_ok { "PASS" } else { "FAIL" },
        peak_settled
    );
    println!("  [{}] Finite positions", if nan_seen { "FAIL" } else { "PASS" });

    jelly.teardown();
}
