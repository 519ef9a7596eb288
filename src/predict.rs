//! IMU-driven state and covariance propagation (mid-point integration).

use crate::attitude;
use crate::buffer::ImuRingBuffer;
use crate::linalg::{rotation_from_axis_angle, Vec3};
use crate::types::{FilterConfig, ImuSample, State};

/// Low-gain gravity correction applied after every prediction step to bleed
/// off gyro-drift attitude error.
const PREDICT_GRAVITY_GAIN: f32 = 0.001;

/// Propagates `state` from `last` to `cur` using mid-point integration of
/// the averaged raw samples, then grows the diagonal covariance terms and
/// applies the low-gain gravity correction. `dt <= 0` is a dynamics no-op
/// but `state.t` is still advanced to `cur.t`.
pub fn predict(
    state: &mut State,
    cfg: &FilterConfig,
    buffer: &ImuRingBuffer<500>,
    last: &ImuSample,
    cur: &ImuSample,
) {
    let dt = (cur.t - last.t) as f32;
    state.t = cur.t;

    if dt <= 0.0 {
        return;
    }

    let avg_acc = 0.5 * (last.acc + cur.acc) - state.acc_bias;
    let avg_gyro = 0.5 * (last.gyro + cur.gyro) - state.gyro_bias;

    let a_g = state.rotation * avg_acc + cfg.gravity;

    state.position += state.velocity * dt + 0.5 * a_g * dt * dt;
    state.velocity += a_g * dt;

    let phi = avg_gyro * dt;
    if phi.norm() > 1e-12 {
        state.rotation *= rotation_from_axis_angle(&phi);
        attitude::orthonormalize(state);
    }

    attitude::maybe_gravity_correction(state, cfg, buffer, avg_acc, PREDICT_GRAVITY_GAIN);

    propagate_covariance_diagonal(state, cfg, dt);

    let (roll, pitch, yaw) = crate::linalg::rotation_to_euler_zyx(&state.rotation);
    state.roll = roll;
    state.pitch = pitch;
    state.yaw = yaw;
}

fn propagate_covariance_diagonal(state: &mut State, cfg: &FilterConfig, dt: f32) {
    let speed = state.velocity.norm();
    let sigma_a = cfg.acc_noise;
    let sigma_g = cfg.gyro_noise;

    let pos_growth = (sigma_a * dt * dt / 2.0 + speed * dt * 0.01).powi(2);
    let vel_growth = (sigma_a * dt).powi(2);
    let att_growth = (sigma_g * dt).powi(2);
    let ba_growth = cfg.acc_bias_noise.powi(2) * dt;
    let bg_growth = cfg.gyro_bias_noise.powi(2) * dt;

    for i in 0..3 {
        state.cov[(i, i)] += pos_growth;
    }
    for i in 3..6 {
        state.cov[(i, i)] += vel_growth;
    }
    for i in 6..9 {
        state.cov[(i, i)] += att_growth;
    }
    for i in 9..12 {
        state.cov[(i, i)] += ba_growth;
    }
    for i in 12..15 {
        state.cov[(i, i)] += bg_growth;
    }
}
