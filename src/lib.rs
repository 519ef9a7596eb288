//! A loosely-coupled Error-State Kalman Filter fusing inertial measurements
//! with periodic GPS fixes into a continuous vehicle pose estimate
//! (position, velocity, orientation, IMU biases), with a railway-aware
//! fallback that snaps position onto a polyline and realigns heading
//! during GPS outages ("tunnel mode").
//!
//! This crate is a pure computation library: it has no sensor I/O, no
//! process lifecycle, and no persistence. Callers feed it `ImuSample`s and
//! `GpsFix`es and read back `State` snapshots; everything else (reading
//! hardware, scheduling, storing rail nodes between runs) is an external
//! collaborator's job.
//!
//! ```
//! use eskf_rail::{EskfFilter, ImuSample, GpsFix};
//! use eskf_rail::linalg::Vec3;
//!
//! let mut filter = EskfFilter::new();
//! for i in 0..20 {
//!     filter.process_imu(ImuSample {
//!         t: i as f64 * 0.01,
//!         acc: Vec3::new(0.0, 0.0, 9.81),
//!         gyro: Vec3::zeros(),
//!     });
//! }
//! filter.process_gps(GpsFix { t: 0.2, lat: 0.0, lon: 0.0, alt: 0.0, satellites: 12, cov: None });
//! assert!(filter.is_initialized());
//! ```

pub mod attitude;
pub mod buffer;
pub mod error;
pub mod filter;
pub mod fusion;
pub mod geo;
pub mod init;
pub mod linalg;
pub mod predict;
pub mod rail;
pub mod types;
pub mod update;

pub use error::LinalgError;
pub use filter::EskfFilter;
pub use types::{FilterConfig, GpsFix, ImuSample, RailNode, State};
