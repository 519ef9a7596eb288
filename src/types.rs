//! Public data model: samples, fixes, rail nodes, filter state and config.

use serde::{Deserialize, Serialize};

use crate::linalg::{Mat15, Mat3, Vec3};

/// One inertial measurement: specific force and angular rate in the sensor frame.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ImuSample {
    pub t: f64,
    pub acc: Vec3,
    pub gyro: Vec3,
}

/// One GPS fix. `cov` is an optional advisory horizontal covariance; the
/// filter does not require it and falls back to the satellite-count noise
/// model when absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GpsFix {
    pub t: f64,
    pub lat: f64,
    pub lon: f64,
    pub alt: f64,
    pub satellites: u32,
    #[serde(default)]
    pub cov: Option<Mat3>,
}

/// A single vertex of the rail polyline. Segment `i` connects node `i` to
/// node `i + 1`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct RailNode {
    pub lat: f32,
    pub lon: f32,
}

/// Filter configuration. Everything here is free-form `f32`/[`Vec3`]; there
/// is no invalid combination the filter rejects, matching the reference
/// implementation's unchecked `eskf_set_config`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FilterConfig {
    pub acc_noise: f32,
    pub gyro_noise: f32,
    pub acc_bias_noise: f32,
    pub gyro_bias_noise: f32,
    pub gravity: Vec3,
    pub i_p_gps: Vec3,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            acc_noise: 0.5,
            gyro_noise: 0.01,
            acc_bias_noise: 0.01,
            gyro_bias_noise: 0.001,
            gravity: Vec3::new(0.0, 0.0, -9.81007),
            i_p_gps: Vec3::zeros(),
        }
    }
}

/// A snapshot of the filter's internal state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct State {
    pub t: f64,
    pub position: Vec3,
    pub velocity: Vec3,
    pub rotation: Mat3,
    pub acc_bias: Vec3,
    pub gyro_bias: Vec3,
    pub cov: Mat15,
    pub lat: f64,
    pub lon: f64,
    pub alt: f64,
    pub roll: f32,
    pub pitch: f32,
    pub yaw: f32,
}

impl Default for State {
    fn default() -> Self {
        Self {
            t: 0.0,
            position: Vec3::zeros(),
            velocity: Vec3::zeros(),
            rotation: Mat3::identity(),
            acc_bias: Vec3::zeros(),
            gyro_bias: Vec3::zeros(),
            cov: Mat15::identity() * 0.01,
            lat: 0.0,
            lon: 0.0,
            alt: 0.0,
            roll: 0.0,
            pitch: 0.0,
            yaw: 0.0,
        }
    }
}
