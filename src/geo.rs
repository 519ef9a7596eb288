//! Equirectangular geodetic <-> local East-North-Up transforms.
//!
//! Accurate to roughly a meter over ranges of a few kilometers around the
//! reference point; not a spheroid model. Good enough for local filtering,
//! not for continental-scale polylines.

const EARTH_RADIUS_M: f64 = 6_371_000.0;
const DEG_TO_RAD: f64 = std::f64::consts::PI / 180.0;
const RAD_TO_DEG: f64 = 180.0 / std::f64::consts::PI;

/// Converts `(lat, lon, alt)` to local `(east, north, up)` meters around `origin`.
pub fn lla_to_enu(origin: (f64, f64, f64), target: (f64, f64, f64)) -> (f64, f64, f64) {
    let (lat0, lon0, alt0) = origin;
    let (lat, lon, alt) = target;

    let lat0_rad = lat0 * DEG_TO_RAD;
    let dlat_rad = (lat - lat0) * DEG_TO_RAD;
    let dlon_rad = (lon - lon0) * DEG_TO_RAD;

    let east = EARTH_RADIUS_M * dlon_rad * lat0_rad.cos();
    let north = EARTH_RADIUS_M * dlat_rad;
    let up = alt - alt0;
    (east, north, up)
}

/// Analytic inverse of [`lla_to_enu`].
pub fn enu_to_lla(origin: (f64, f64, f64), enu: (f64, f64, f64)) -> (f64, f64, f64) {
    let (lat0, lon0, alt0) = origin;
    let (east, north, up) = enu;

    let lat0_rad = lat0 * DEG_TO_RAD;
    let dlat_deg = (north / EARTH_RADIUS_M) * RAD_TO_DEG;
    let dlon_deg = (east / (EARTH_RADIUS_M * lat0_rad.cos())) * RAD_TO_DEG;

    (lat0 + dlat_deg, lon0 + dlon_deg, alt0 + up)
}
