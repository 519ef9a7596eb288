//! Gravity/gyro-bias initialization from a quiescent IMU window.

use crate::buffer::ImuRingBuffer;
use crate::linalg::{skew, Mat3, Vec3};
use crate::types::{GpsFix, State};

/// Covariance diagonal seeded at initialization, in the fixed state ordering
/// `[dp(0..2), dv(3..5), d theta(6..8), d b_a(9..11), d b_g(12..14)]`.
const INIT_COV_DIAG: [f32; 15] = [
    1.0, 1.0, 1.0, //
    0.1, 0.1, 0.1, //
    0.1, 0.1, 0.1, //
    0.01, 0.01, 0.01, //
    0.01, 0.01, 0.01,
];

/// Rotation mapping `from` onto `to` (both assumed unit vectors), via the
/// Rodrigues closed form `I + [v]x + [v]x^2 * (1-c)/s^2`.
fn rotation_aligning(from: &Vec3, to: &Vec3) -> Mat3 {
    let v = from.cross(to);
    let s = v.norm();
    let c = from.dot(to);

    if (c - 1.0).abs() < 1e-6 {
        return Mat3::identity();
    }
    if s <= 1e-6 {
        return Mat3::identity();
    }

    let vx = skew(&v);
    Mat3::identity() + vx + vx * vx * ((1.0 - c) / (s * s))
}

/// Runs the initialization procedure described in the filter's init
/// component, given every IMU sample buffered so far and the first GPS fix.
/// Returns the freshly-seeded `State`; the caller is responsible for setting
/// `init_lla` and the `initialized` flag from the returned state's fields.
pub fn initialize(buffer: &ImuRingBuffer<500>, fix: &GpsFix) -> State {
    let n = buffer.len().max(1) as f32;

    let mean_acc: Vec3 = buffer
        .iter()
        .map(|s| s.acc)
        .fold(Vec3::zeros(), |a, b| a + b)
        / n;
    let mean_gyro: Vec3 = buffer
        .iter()
        .map(|s| s.gyro)
        .fold(Vec3::zeros(), |a, b| a + b)
        / n;

    let g_meas = if mean_acc.norm() > 1e-12 {
        mean_acc / mean_acc.norm()
    } else {
        Vec3::new(0.0, 0.0, 1.0)
    };

    let rotation = rotation_aligning(&g_meas, &Vec3::new(0.0, 0.0, 1.0));

    let mut cov = crate::linalg::Mat15::zeros();
    for (i, v) in INIT_COV_DIAG.iter().enumerate() {
        cov[(i, i)] = *v;
    }

    let (roll, pitch, yaw) = crate::linalg::rotation_to_euler_zyx(&rotation);

    let state = State {
        t: fix.t,
        position: Vec3::zeros(),
        velocity: Vec3::zeros(),
        rotation,
        acc_bias: Vec3::zeros(),
        gyro_bias: mean_gyro,
        cov,
        lat: fix.lat,
        lon: fix.lon,
        alt: fix.alt,
        roll,
        pitch,
        yaw,
    };

    log::info!(
        "eskf initialized from {} buffered imu samples, yaw={:.4} rad",
        buffer.len(),
        yaw
    );

    state
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use crate::types::ImuSample;

    fn fix() -> GpsFix {
        GpsFix {
            t: 1.0,
            lat: 0.0,
            lon: 0.0,
            alt: 0.0,
            satellites: 12,
            cov: None,
        }
    }

    #[test]
    fn static_bench_aligns_gravity_and_zeros_gyro_bias() {
        let mut buf: ImuRingBuffer<500> = ImuRingBuffer::new();
        for i in 0..100 {
            buf.push(ImuSample {
                t: i as f64 * 0.01,
                acc: Vec3::new(0.0, 0.0, 9.81),
                gyro: Vec3::zeros(),
            });
        }
        let state = initialize(&buf, &fix());
        assert_relative_eq!(state.gyro_bias, Vec3::zeros(), epsilon = 1e-6);

        let gravity = Vec3::new(0.0, 0.0, -9.81007);
        let residual = state.rotation * Vec3::new(0.0, 0.0, 9.81) + gravity;
        assert!(residual.norm() < 0.05);
    }

    #[test]
    fn gyro_bias_is_mean_of_buffered_samples() {
        let mut buf: ImuRingBuffer<500> = ImuRingBuffer::new();
        for i in 0..20 {
            buf.push(ImuSample {
                t: i as f64 * 0.01,
                acc: Vec3::new(0.0, 0.0, 9.81),
                gyro: Vec3::new(0.01, -0.02, 0.005),
            });
        }
        let state = initialize(&buf, &fix());
        assert_relative_eq!(state.gyro_bias, Vec3::new(0.01, -0.02, 0.005), epsilon = 1e-5);
    }

    #[test]
    fn covariance_diagonal_matches_seed() {
        let mut buf: ImuRingBuffer<500> = ImuRingBuffer::new();
        buf.push(ImuSample {
            t: 0.0,
            acc: Vec3::new(0.0, 0.0, 9.81),
            gyro: Vec3::zeros(),
        });
        let state = initialize(&buf, &fix());
        for (i, v) in INIT_COV_DIAG.iter().enumerate() {
            assert_relative_eq!(state.cov[(i, i)], *v, epsilon = 1e-6);
        }
    }
}
