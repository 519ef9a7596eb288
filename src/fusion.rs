//! Outage/rail fusion: rail-snap position correction and tunnel-mode
//! heading realignment toward the nearest rail segment.

use crate::geo;
use crate::linalg::{rotation_from_euler_zyx, Vec3};
use crate::rail::RailIndex;
use crate::types::State;

/// Distance gate below which a rail projection is accepted as a snap.
pub const DEFAULT_RAIL_SNAP_DISTANCE_M: f32 = 20.0;

const DEG_TO_M: f32 = 111_000.0;

fn wrap_to_pi(angle: f32) -> f32 {
    let two_pi = std::f32::consts::TAU;
    let mut a = angle % two_pi;
    if a > std::f32::consts::PI {
        a -= two_pi;
    } else if a < -std::f32::consts::PI {
        a += two_pi;
    }
    a
}

/// Runs rail-snap and, if in tunnel mode, heading realignment. `origin` is
/// the filter's `init_lla`. Does nothing if `rail.is_empty()`. Returns
/// `true` if a snap was applied (for logging by the caller).
pub fn apply(
    state: &mut State,
    rail: &RailIndex,
    origin: (f64, f64, f64),
    in_tunnel: bool,
    snap_distance_m: f32,
    heading_smoothing_factor: f32,
) -> bool {
    if rail.is_empty() {
        return false;
    }

    let proj = rail.closest_rail_point(state.lat as f32, state.lon as f32);
    if proj.dist_m >= snap_distance_m {
        return false;
    }

    let alt = state.alt;
    state.lat = proj.lat as f64;
    state.lon = proj.lon as f64;
    let (east, north, up) = geo::lla_to_enu(origin, (state.lat, state.lon, alt));
    state.position = Vec3::new(east as f32, north as f32, up as f32);

    if in_tunnel {
        if let Some(seg) = proj.segment {
            let nodes = rail.nodes();
            let a = nodes[seg];
            let b = nodes[seg + 1];
            let cos_lat = (proj.lat.to_radians()).cos();
            let dx_east = (b.lon - a.lon) * DEG_TO_M * cos_lat;
            let dy_north = (b.lat - a.lat) * DEG_TO_M;
            let rail_heading = dx_east.atan2(dy_north);

            let delta = wrap_to_pi(rail_heading - state.yaw);
            let new_yaw = state.yaw + heading_smoothing_factor * delta;

            state.rotation = rotation_from_euler_zyx(state.roll, state.pitch, new_yaw);
            crate::attitude::orthonormalize(state);
            let (roll, pitch, yaw) = crate::linalg::rotation_to_euler_zyx(&state.rotation);
            state.roll = roll;
            state.pitch = pitch;
            state.yaw = yaw;
        }
    }

    true
}
