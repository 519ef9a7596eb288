//! Attitude stabilizer: orthonormalization and gravity-based drift correction.

use crate::buffer::ImuRingBuffer;
use crate::linalg::Vec3;
use crate::types::{FilterConfig, State};

/// Gram-Schmidt orthonormalization of the columns of `G_R_I`. Idempotent on
/// already-orthonormal input.
pub fn orthonormalize(state: &mut State) {
    let r = &state.rotation;
    let c0 = r.column(0).into_owned();
    let c1 = r.column(1).into_owned();

    let c0n = if c0.norm() > 1e-12 {
        c0 / c0.norm()
    } else {
        Vec3::new(1.0, 0.0, 0.0)
    };

    let c1_orth = c1 - c0n * c0n.dot(&c1);
    let c1n = if c1_orth.norm() > 1e-12 {
        c1_orth / c1_orth.norm()
    } else {
        Vec3::new(0.0, 1.0, 0.0)
    };

    let c2n = c0n.cross(&c1n);

    state.rotation.set_column(0, &c0n);
    state.rotation.set_column(1, &c1n);
    state.rotation.set_column(2, &c2n);
}

fn velocity_gain_factor(speed: f32) -> f32 {
    if speed < 1.0 {
        2.0
    } else if speed < 5.0 {
        1.0
    } else if speed < 15.0 {
        0.5
    } else {
        0.2
    }
}

/// Bleeds off gyro-drift attitude error using the accelerometer as a slow
/// gravity reference. `avg_specific_force` is the debiased, averaged
/// accelerometer reading used by the predictor for this step. Returns
/// `true` if a correction was applied.
pub fn maybe_gravity_correction(
    state: &mut State,
    cfg: &FilterConfig,
    buffer: &ImuRingBuffer<500>,
    avg_specific_force: Vec3,
    gain: f32,
) -> bool {
    let measured_norm = avg_specific_force.norm();
    let gravity_norm = cfg.gravity.norm();
    if (measured_norm - gravity_norm).abs() > 2.0 {
        return false;
    }

    if buffer.len() >= 10 {
        let window: Vec<&crate::types::ImuSample> = buffer.recent(20).collect();
        let mean_acc: Vec3 =
            window.iter().map(|s| s.acc).fold(Vec3::zeros(), |a, b| a + b) / window.len() as f32;
        let mean_abs_dev: f32 = window
            .iter()
            .map(|s| (s.acc - mean_acc).norm())
            .sum::<f32>()
            / window.len() as f32;
        if mean_abs_dev > 0.5 {
            return false;
        }
    }

    let vf = velocity_gain_factor(state.velocity.norm());
    let effective_gain = gain * vf;

    if measured_norm < 1e-9 {
        return false;
    }
    let m = avg_specific_force / measured_norm;
    let e_raw = state.rotation.transpose() * cfg.gravity;
    let e_norm = e_raw.norm();
    if e_norm < 1e-9 {
        return false;
    }
    let e = e_raw / e_norm;
    let delta = m.cross(&e);

    let correction = crate::linalg::Mat3::identity() + crate::linalg::skew(&(delta * effective_gain));
    state.rotation = state.rotation * correction;
    orthonormalize(state);
    true
}
