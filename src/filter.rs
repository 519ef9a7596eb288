//! Top-level orchestrator: the public API surface (`create`/`reset`/
//! `set_config`/`load_rail_nodes`/`process_imu`/`process_gps`/`get_state`).

use crate::buffer::ImuRingBuffer;
use crate::fusion;
use crate::init;
use crate::predict;
use crate::rail::RailIndex;
use crate::types::{FilterConfig, GpsFix, ImuSample, State};
use crate::update;

const IMU_BUFFER_CAPACITY: usize = 500;
const MIN_IMU_SAMPLES_TO_INITIALIZE: usize = 10;
const DEFAULT_TUNNEL_THRESHOLD_S: f64 = 5.0;
const DEFAULT_HEADING_SMOOTHING_FACTOR: f32 = 0.5;
const DEFAULT_LOW_SATELLITE_THRESHOLD: u32 = 8;

/// Loosely-coupled ESKF fusing IMU and GPS into a continuous pose estimate,
/// with an optional railway-aware fallback for GPS outages.
///
/// Single-threaded, cooperative: every public method runs to completion on
/// the calling thread, allocates nothing beyond construction, and does not
/// reorder out-of-order timestamps — callers own serialization and ordering.
pub struct EskfFilter {
    config: FilterConfig,
    state: State,
    initialized: bool,
    init_lla: (f64, f64, f64),
    imu_buffer: ImuRingBuffer<IMU_BUFFER_CAPACITY>,
    last_imu: Option<ImuSample>,
    last_gps_t: f64,
    current_satellites: u32,
    in_tunnel: bool,
    rail: RailIndex,
    tunnel_threshold: f64,
    heading_smoothing_factor: f32,
    rail_snap_distance_m: f32,
    low_satellite_threshold: u32,
}

impl EskfFilter {
    /// Creates a new, uninitialized filter with default configuration.
    pub fn new() -> Self {
        Self {
            config: FilterConfig::default(),
            state: State::default(),
            initialized: false,
            init_lla: (0.0, 0.0, 0.0),
            imu_buffer: ImuRingBuffer::new(),
            last_imu: None,
            last_gps_t: 0.0,
            current_satellites: 0,
            in_tunnel: false,
            rail: RailIndex::new(),
            tunnel_threshold: DEFAULT_TUNNEL_THRESHOLD_S,
            heading_smoothing_factor: DEFAULT_HEADING_SMOOTHING_FACTOR,
            rail_snap_distance_m: fusion::DEFAULT_RAIL_SNAP_DISTANCE_M,
            low_satellite_threshold: DEFAULT_LOW_SATELLITE_THRESHOLD,
        }
    }

    /// Returns the filter to its uninitialized state. Configuration and the
    /// loaded rail polyline are preserved; the IMU buffer and all derived
    /// state are cleared.
    pub fn reset(&mut self) {
        let config = self.config;
        let rail = std::mem::replace(&mut self.rail, RailIndex::new());
        let tunnel_threshold = self.tunnel_threshold;
        let heading_smoothing_factor = self.heading_smoothing_factor;
        let rail_snap_distance_m = self.rail_snap_distance_m;
        let low_satellite_threshold = self.low_satellite_threshold;

        *self = Self::new();
        self.config = config;
        self.rail = rail;
        self.tunnel_threshold = tunnel_threshold;
        self.heading_smoothing_factor = heading_smoothing_factor;
        self.rail_snap_distance_m = rail_snap_distance_m;
        self.low_satellite_threshold = low_satellite_threshold;

        log::info!("eskf reset to uninitialized state");
    }

    /// Replaces the filter's configuration (noise parameters, gravity,
    /// GPS lever-arm). Takes effect on the very next `process_imu`/
    /// `process_gps` call.
    pub fn set_config(&mut self, config: FilterConfig) {
        self.config = config;
    }

    pub fn set_tunnel_threshold(&mut self, seconds: f64) {
        self.tunnel_threshold = seconds;
    }

    pub fn set_heading_smoothing_factor(&mut self, factor: f32) {
        self.heading_smoothing_factor = factor;
    }

    pub fn set_rail_snap_distance(&mut self, meters: f32) {
        self.rail_snap_distance_m = meters;
    }

    pub fn set_low_satellite_threshold(&mut self, satellites: u32) {
        self.low_satellite_threshold = satellites;
    }

    /// Loads up to 5000 rail nodes, truncating any excess.
    pub fn load_rail_nodes(&mut self, nodes: &[crate::types::RailNode]) {
        self.rail.load(nodes);
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn is_in_tunnel(&self) -> bool {
        self.in_tunnel
    }

    /// Returns a snapshot of the current filter state.
    pub fn get_state(&self) -> State {
        self.state.clone()
    }

    /// Processes one IMU sample. Returns `true` if the sample was used for
    /// prediction (filter already initialized), `false` if it was only
    /// buffered (still waiting on the first GPS fix).
    pub fn process_imu(&mut self, sample: ImuSample) -> bool {
        self.imu_buffer.push(sample);

        if !self.initialized {
            self.last_imu = Some(sample);
            return false;
        }

        if let Some(last) = self.last_imu {
            predict::predict(&mut self.state, &self.config, &self.imu_buffer, &last, &sample);
            self.sync_geodetic_readout();
        } else {
            self.state.t = sample.t;
        }
        self.last_imu = Some(sample);

        self.update_tunnel_flag();

        if !self.rail.is_empty() && self.current_satellites < self.low_satellite_threshold {
            let snapped = fusion::apply(
                &mut self.state,
                &self.rail,
                self.init_lla,
                self.in_tunnel,
                self.rail_snap_distance_m,
                self.heading_smoothing_factor,
            );
            if snapped {
                log::debug!(
                    "rail snap applied at t={:.3}, lat={:.6} lon={:.6}",
                    self.state.t,
                    self.state.lat,
                    self.state.lon
                );
            }
        }

        true
    }

    /// Processes one GPS fix. Returns `true` if the fix was consumed
    /// (either it triggered initialization, or the filter was already
    /// initialized and the fix was fused), `false` if the filter is still
    /// waiting for enough buffered IMU samples.
    pub fn process_gps(&mut self, fix: GpsFix) -> bool {
        if !self.initialized {
            if self.imu_buffer.len() < MIN_IMU_SAMPLES_TO_INITIALIZE {
                return false;
            }

            self.init_lla = (fix.lat, fix.lon, fix.alt);
            self.state = init::initialize(&self.imu_buffer, &fix);
            self.initialized = true;
            self.last_gps_t = fix.t;
            self.current_satellites = fix.satellites;
            self.in_tunnel = false;
            return true;
        }

        let was_in_tunnel = self.in_tunnel;
        update::update(&mut self.state, &self.config, &self.imu_buffer, self.init_lla, &fix);

        self.last_gps_t = fix.t;
        self.current_satellites = fix.satellites;
        self.in_tunnel = false;

        if was_in_tunnel {
            log::info!("eskf exited tunnel mode at t={:.3}", fix.t);
        }

        true
    }

    /// Recomputes the cached `(lat, lon, alt)` readout from the current ENU
    /// position. Called after every prediction step, since the predictor
    /// only integrates the local tangent-plane position.
    fn sync_geodetic_readout(&mut self) {
        let p = self.state.position;
        let (lat, lon, alt) = crate::geo::enu_to_lla(self.init_lla, (p.x as f64, p.y as f64, p.z as f64));
        self.state.lat = lat;
        self.state.lon = lon;
        self.state.alt = alt;
    }

    fn update_tunnel_flag(&mut self) {
        let now_in_tunnel =
            self.last_gps_t > 0.0 && (self.state.t - self.last_gps_t) > self.tunnel_threshold;
        if now_in_tunnel && !self.in_tunnel {
            log::info!("eskf entered tunnel mode at t={:.3}", self.state.t);
        }
        self.in_tunnel = now_in_tunnel;
    }
}

impl Default for EskfFilter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linalg::Vec3;
    use crate::types::RailNode;

    fn imu(t: f64, acc: Vec3, gyro: Vec3) -> ImuSample {
        ImuSample { t, acc, gyro }
    }

    fn gps(t: f64, lat: f64, lon: f64, sats: u32) -> GpsFix {
        GpsFix {
            t,
            lat,
            lon,
            alt: 0.0,
            satellites: sats,
            cov: None,
        }
    }

    #[test]
    fn buffers_until_initialized() {
        let mut filter = EskfFilter::new();
        for i in 0..5 {
            let used = filter.process_imu(imu(i as f64 * 0.01, Vec3::new(0.0, 0.0, 9.81), Vec3::zeros()));
            assert!(!used);
        }
        assert!(!filter.is_initialized());
        let consumed = filter.process_gps(gps(0.05, 0.0, 0.0, 12));
        assert!(!consumed); // fewer than 10 buffered samples
    }

    #[test]
    fn static_bench_initializes_on_first_gps_fix() {
        let mut filter = EskfFilter::new();
        for i in 0..100 {
            filter.process_imu(imu(i as f64 * 0.01, Vec3::new(0.0, 0.0, 9.81), Vec3::zeros()));
        }
        let consumed = filter.process_gps(gps(1.0, 0.0, 0.0, 12));
        assert!(consumed);
        assert!(filter.is_initialized());

        let state = filter.get_state();
        assert!(state.yaw.abs() < 1e-3);
        assert!(state.gyro_bias.norm() < 1e-6);

        let gravity = Vec3::new(0.0, 0.0, -9.81007);
        let residual = state.rotation * Vec3::new(0.0, 0.0, 9.81) + gravity;
        assert!(residual.norm() < 0.05);
    }

    #[test]
    fn rotation_stays_orthonormal_through_a_full_cycle() {
        let mut filter = EskfFilter::new();
        for i in 0..100 {
            filter.process_imu(imu(i as f64 * 0.01, Vec3::new(0.0, 0.0, 9.81), Vec3::zeros()));
        }
        filter.process_gps(gps(1.0, 0.0, 0.0, 12));

        let mut t = 1.0;
        for _ in 0..200 {
            t += 0.01;
            filter.process_imu(imu(t, Vec3::new(0.1, 0.0, 9.81), Vec3::new(0.01, 0.0, 0.0)));
        }

        let state = filter.get_state();
        let r = state.rotation;
        let identity_err = (r.transpose() * r - crate::linalg::Mat3::identity()).norm();
        assert!(identity_err < 1e-3);
        assert!(r.determinant() > 0.0);
    }

    #[test]
    fn tunnel_flag_follows_gps_gap_predicate() {
        let mut filter = EskfFilter::new();
        for i in 0..20 {
            filter.process_imu(imu(i as f64 * 0.01, Vec3::new(0.0, 0.0, 9.81), Vec3::zeros()));
        }
        filter.process_gps(gps(0.2, 0.0, 0.0, 4));
        assert!(!filter.is_in_tunnel());

        let mut t = 0.2;
        for _ in 0..800 {
            t += 0.01; // advances 8s, past the 5s default threshold
            filter.process_imu(imu(t, Vec3::new(0.0, 0.0, 9.81), Vec3::zeros()));
        }
        assert!(filter.is_in_tunnel());
    }

    #[test]
    fn rail_snap_engages_under_low_satellite_count() {
        let mut filter = EskfFilter::new();
        filter.load_rail_nodes(&[RailNode { lat: 0.0, lon: 0.0 }, RailNode { lat: 0.0, lon: 1.0 }]);

        for i in 0..20 {
            filter.process_imu(imu(i as f64 * 0.01, Vec3::new(0.0, 0.0, 9.81), Vec3::zeros()));
        }
        filter.process_gps(gps(0.2, 0.0001, 0.5, 4));

        let state_before = filter.get_state();
        assert!(state_before.lat.abs() > 0.0);

        filter.process_imu(imu(0.21, Vec3::new(0.0, 0.0, 9.81), Vec3::zeros()));
        let state_after = filter.get_state();
        assert!((state_after.lat - 0.0).abs() < 1e-5);
    }

    #[test]
    fn reset_restores_default_state_preserving_config() {
        let mut config = FilterConfig::default();
        config.acc_noise = 1.23;

        let mut filter = EskfFilter::new();
        filter.set_config(config);
        for i in 0..100 {
            filter.process_imu(imu(i as f64 * 0.01, Vec3::new(0.0, 0.0, 9.81), Vec3::zeros()));
        }
        filter.process_gps(gps(1.0, 0.0, 0.0, 12));
        assert!(filter.is_initialized());

        filter.reset();
        assert!(!filter.is_initialized());

        let mut fresh = EskfFilter::new();
        fresh.set_config(config);
        assert_eq!(filter.config.acc_noise, fresh.config.acc_noise);
        assert_eq!(filter.imu_buffer.len(), fresh.imu_buffer.len());
    }
}
