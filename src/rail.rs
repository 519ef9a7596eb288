//! Closest-point-on-polyline projection over a fixed-capacity rail index.
//!
//! No heap-backed spatial index (contrast the reference crate's `rstar`
//! R-tree over `geo::LineString`): the polyline is small enough in practice
//! that a full O(n) segment scan over a fixed array satisfies the
//! no-allocation-on-the-hot-path contract.

use crate::types::RailNode;

pub const MAX_RAIL_NODES: usize = 5000;

/// Sentinel distance returned when the index has fewer than two nodes.
pub const NO_MATCH_DISTANCE_M: f32 = 1e6;

const DEG_TO_M: f32 = 111_000.0;

/// Result of projecting a point onto the closest rail segment.
#[derive(Debug, Clone, Copy)]
pub struct RailProjection {
    pub lat: f32,
    pub lon: f32,
    pub dist_m: f32,
    pub segment: Option<usize>,
    pub t: f32,
}

pub struct RailIndex {
    nodes: [RailNode; MAX_RAIL_NODES],
    count: usize,
}

impl RailIndex {
    pub fn new() -> Self {
        Self {
            nodes: [RailNode::default(); MAX_RAIL_NODES],
            count: 0,
        }
    }

    /// Loads up to [`MAX_RAIL_NODES`] nodes, truncating any excess.
    pub fn load(&mut self, nodes: &[RailNode]) {
        let n = nodes.len().min(MAX_RAIL_NODES);
        self.nodes[..n].copy_from_slice(&nodes[..n]);
        self.count = n;
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn nodes(&self) -> &[RailNode] {
        &self.nodes[..self.count]
    }

    /// Projects `(lat, lon)` onto the closest rail segment.
    pub fn closest_rail_point(&self, lat: f32, lon: f32) -> RailProjection {
        if self.count < 2 {
            return RailProjection {
                lat,
                lon,
                dist_m: NO_MATCH_DISTANCE_M,
                segment: None,
                t: 0.0,
            };
        }

        let cos_lat = (lat.to_radians()).cos();
        let mut best = RailProjection {
            lat,
            lon,
            dist_m: NO_MATCH_DISTANCE_M,
            segment: None,
            t: 0.0,
        };

        for i in 0..self.count - 1 {
            let a = self.nodes[i];
            let b = self.nodes[i + 1];
            let dx = b.lon - a.lon;
            let dy = b.lat - a.lat;
            let len_sq = dx * dx + dy * dy;
            if len_sq < 1e-12 {
                continue;
            }
            let t = (((lon - a.lon) * dx + (lat - a.lat) * dy) / len_sq).clamp(0.0, 1.0);
            let cand_lon = a.lon + t * dx;
            let cand_lat = a.lat + t * dy;

            let dlat_m = (cand_lat - lat) * DEG_TO_M;
            let dlon_m = (cand_lon - lon) * DEG_TO_M * cos_lat;
            let dist = (dlat_m * dlat_m + dlon_m * dlon_m).sqrt();

            if dist < best.dist_m {
                best = RailProjection {
                    lat: cand_lat,
                    lon: cand_lon,
                    dist_m: dist,
                    segment: Some(i),
                    t,
                };
            }
        }

        best
    }
}

impl Default for RailIndex {
    fn default() -> Self {
        Self::new()
    }
}
