//! Fixed-size linear algebra kernel.
//!
//! Ordinary vector/matrix arithmetic (add, subtract, scale, dot, cross,
//! transpose, multiply) comes straight from `nalgebra`'s operator overloads
//! and methods on [`Vec3`]/[`Mat3`]. This module only supplies the
//! primitives `nalgebra` doesn't hand you for free: skew-symmetric
//! construction, the Rodrigues exponential map, a cofactor inverse with an
//! explicit singularity threshold, ZYX Euler conversions, and 15x15 block
//! access.

use nalgebra::{Matrix3, SMatrix, Vector3};

use crate::error::LinalgError;

pub type Vec3 = Vector3<f32>;
pub type Mat3 = Matrix3<f32>;

pub const STATE_DIM: usize = 15;
pub type Mat15 = SMatrix<f32, 15, 15>;

/// Skew-symmetric cross-product matrix `[v]x` such that `[v]x * w == v.cross(&w)`.
pub fn skew(v: &Vec3) -> Mat3 {
    Mat3::new(
        0.0, -v.z, v.y, //
        v.z, 0.0, -v.x, //
        -v.y, v.x, 0.0,
    )
}

/// Rodrigues' formula: rotation corresponding to the axis-angle vector `phi`
/// (direction = axis, magnitude = angle in radians). Identity when
/// `|phi| < 1e-12`.
pub fn rotation_from_axis_angle(phi: &Vec3) -> Mat3 {
    let angle = phi.norm();
    if angle < 1e-12 {
        return Mat3::identity();
    }
    let axis = phi / angle;
    let c = angle.cos();
    let s = angle.sin();
    let t = 1.0 - c;
    let (x, y, z) = (axis.x, axis.y, axis.z);
    Mat3::new(
        t * x * x + c,
        t * x * y - s * z,
        t * x * z + s * y,
        t * x * y + s * z,
        t * y * y + c,
        t * y * z - s * x,
        t * x * z - s * y,
        t * y * z + s * x,
        t * z * z + c,
    )
}

/// Cofactor-expansion inverse, returning `Err` when `|det| < 1e-10`.
pub fn try_invert3(m: &Mat3) -> Result<Mat3, LinalgError> {
    let det = m[(0, 0)] * (m[(1, 1)] * m[(2, 2)] - m[(1, 2)] * m[(2, 1)])
        - m[(0, 1)] * (m[(1, 0)] * m[(2, 2)] - m[(1, 2)] * m[(2, 0)])
        + m[(0, 2)] * (m[(1, 0)] * m[(2, 1)] - m[(1, 1)] * m[(2, 0)]);

    if det.abs() < 1e-10 {
        return Err(LinalgError::Singular);
    }
    let inv_det = 1.0 / det;

    Ok(Mat3::new(
        (m[(1, 1)] * m[(2, 2)] - m[(1, 2)] * m[(2, 1)]) * inv_det,
        (m[(0, 2)] * m[(2, 1)] - m[(0, 1)] * m[(2, 2)]) * inv_det,
        (m[(0, 1)] * m[(1, 2)] - m[(0, 2)] * m[(1, 1)]) * inv_det,
        (m[(1, 2)] * m[(2, 0)] - m[(1, 0)] * m[(2, 2)]) * inv_det,
        (m[(0, 0)] * m[(2, 2)] - m[(0, 2)] * m[(2, 0)]) * inv_det,
        (m[(0, 2)] * m[(1, 0)] - m[(0, 0)] * m[(1, 2)]) * inv_det,
        (m[(1, 0)] * m[(2, 1)] - m[(1, 1)] * m[(2, 0)]) * inv_det,
        (m[(0, 1)] * m[(2, 0)] - m[(0, 0)] * m[(2, 1)]) * inv_det,
        (m[(0, 0)] * m[(1, 1)] - m[(0, 1)] * m[(1, 0)]) * inv_det,
    ))
}

/// ZYX (intrinsic yaw-pitch-roll) extraction: `roll, pitch, yaw`.
pub fn rotation_to_euler_zyx(m: &Mat3) -> (f32, f32, f32) {
    let pitch = (-m[(2, 0)]).asin();
    if pitch.cos() > 1e-6 {
        let roll = m[(2, 1)].atan2(m[(2, 2)]);
        let yaw = m[(1, 0)].atan2(m[(0, 0)]);
        (roll, pitch, yaw)
    } else {
        let roll = 0.0;
        let yaw = (-m[(0, 1)]).atan2(m[(1, 1)]);
        (roll, pitch, yaw)
    }
}

/// ZYX synthesis: `Rz(yaw) * Ry(pitch) * Rx(roll)`.
pub fn rotation_from_euler_zyx(roll: f32, pitch: f32, yaw: f32) -> Mat3 {
    let (sr, cr) = roll.sin_cos();
    let (sp, cp) = pitch.sin_cos();
    let (sy, cy) = yaw.sin_cos();

    Mat3::new(
        cy * cp,
        cy * sp * sr - sy * cr,
        cy * sp * cr + sy * sr,
        sy * cp,
        sy * sp * sr + cy * cr,
        sy * sp * cr - cy * sr,
        -sp,
        cp * sr,
        cp * cr,
    )
}

/// Writes a 3x3 block into a 15x15 matrix at `(row, col)` (top-left corner).
pub fn set_block3x3(m: &mut Mat15, row: usize, col: usize, block: &Mat3) {
    m.fixed_view_mut::<3, 3>(row, col).copy_from(block);
}

/// Reads a 3x3 block out of a 15x15 matrix at `(row, col)`.
pub fn get_block3x3(m: &Mat15, row: usize, col: usize) -> Mat3 {
    m.fixed_view::<3, 3>(row, col).into_owned()
}
