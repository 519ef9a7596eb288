//! Scalar-gain GPS correction: residual computation, Kalman-style gain,
//! position/velocity correction, and covariance deflation.
//!
//! This is intentionally not a full Joseph-form Kalman update — the gain is
//! a scalar ratio of position covariance to measurement noise, applied
//! identically across axes. That simplification is the filter's documented
//! contract, not an oversight.

use crate::buffer::ImuRingBuffer;
use crate::geo;
use crate::linalg::Vec3;
use crate::types::{FilterConfig, GpsFix, State};

/// Gravity-correction gain applied once per GPS update.
const GPS_GRAVITY_GAIN: f32 = 0.02;

/// Applies a GPS fix to an already-initialized filter state. `origin` is the
/// filter's `init_lla` reference point. Returns the residual magnitude
/// (meters) for callers that want to log or inspect it; the state is
/// mutated in place.
pub fn update(
    state: &mut State,
    cfg: &FilterConfig,
    buffer: &ImuRingBuffer<500>,
    origin: (f64, f64, f64),
    fix: &GpsFix,
) -> f32 {
    let (east, north, up) = geo::lla_to_enu(origin, (fix.lat, fix.lon, fix.alt));
    let z = Vec3::new(east as f32, north as f32, up as f32);

    let z_hat = state.position + state.rotation * cfg.i_p_gps;
    let r = z - z_hat;

    let satellites = fix.satellites.max(1) as f32;
    let sigma = 5.0 / satellites.sqrt();
    let noise = sigma * sigma;

    let k_p = (0..3).map(|i| state.cov[(i, i)] / (state.cov[(i, i)] + noise)).sum::<f32>() / 3.0;
    let k_v = 0.1 * k_p;

    state.position += r * k_p;
    state.velocity += r * k_v;

    for i in 0..3 {
        state.cov[(i, i)] *= 1.0 - k_p;
    }
    for i in 3..6 {
        state.cov[(i, i)] *= 1.0 - k_v;
    }
    for i in 6..9 {
        state.cov[(i, i)] *= 0.98;
    }

    if let Some(last_imu) = buffer.iter().last() {
        let avg_acc = last_imu.acc - state.acc_bias;
        crate::attitude::maybe_gravity_correction(state, cfg, buffer, avg_acc, GPS_GRAVITY_GAIN);
    }

    let (roll, pitch, yaw) = crate::linalg::rotation_to_euler_zyx(&state.rotation);
    state.roll = roll;
    state.pitch = pitch;
    state.yaw = yaw;

    let p = state.position;
    let (lat, lon, alt) = geo::enu_to_lla(origin, (p.x as f64, p.y as f64, p.z as f64));
    state.lat = lat;
    state.lon = lon;
    state.alt = alt;

    r.norm()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ImuSample;

    fn fix(lat: f64, lon: f64, sats: u32) -> GpsFix {
        GpsFix {
            t: 1.0,
            lat,
            lon,
            alt: 0.0,
            satellites: sats,
            cov: None,
        }
    }

    #[test]
    fn residual_pulls_position_toward_measurement() {
        let mut state = State::default();
        let cfg = FilterConfig::default();
        let buffer: ImuRingBuffer<500> = ImuRingBuffer::new();
        let origin = (0.0, 0.0, 0.0);

        update(&mut state, &cfg, &buffer, origin, &fix(0.0001, 0.0, 12));
        assert!(state.position.y > 0.0);
    }

    #[test]
    fn variance_deflates_after_update() {
        let mut state = State::default();
        state.cov[(0, 0)] = 1.0;
        let cfg = FilterConfig::default();
        let buffer: ImuRingBuffer<500> = ImuRingBuffer::new();
        let origin = (0.0, 0.0, 0.0);
        let before = state.cov[(0, 0)];
        update(&mut state, &cfg, &buffer, origin, &fix(0.0, 0.0, 12));
        assert!(state.cov[(0, 0)] <= before);
        assert!(state.cov[(0, 0)] >= 0.0);
    }

    #[test]
    fn fewer_satellites_yields_smaller_gain() {
        let mut state_good = State::default();
        state_good.cov[(0, 0)] = 1.0;
        let mut state_bad = state_good.clone();
        let cfg = FilterConfig::default();
        let buffer: ImuRingBuffer<500> = ImuRingBuffer::new();
        let origin = (0.0, 0.0, 0.0);

        update(&mut state_good, &cfg, &buffer, origin, &fix(0.0001, 0.0, 16));
        update(&mut state_bad, &cfg, &buffer, origin, &fix(0.0001, 0.0, 4));

        // More satellites -> smaller measurement noise -> larger correction.
        assert!(state_good.position.y >= state_bad.position.y);
    }

    #[test]
    fn gravity_correction_uses_most_recent_buffered_sample() {
        let mut state = State::default();
        state.rotation = crate::linalg::rotation_from_axis_angle(&Vec3::new(0.05, 0.0, 0.0));
        let cfg = FilterConfig::default();
        let mut buffer: ImuRingBuffer<500> = ImuRingBuffer::new();
        buffer.push(ImuSample {
            t: 0.0,
            acc: Vec3::new(0.0, 0.0, 9.81007),
            gyro: Vec3::zeros(),
        });
        let origin = (0.0, 0.0, 0.0);
        update(&mut state, &cfg, &buffer, origin, &fix(0.0, 0.0, 12));
        let r = state.rotation;
        assert!((r.transpose() * r - crate::linalg::Mat3::identity()).norm() < 1e-3);
    }
}
