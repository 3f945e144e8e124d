//! Radar chart data and polygon projection
//!
//! The report carries one point per dimension. Projection onto screen
//! coordinates is provided for hosts that draw the chart themselves; the
//! first axis points straight up and axes proceed clockwise.

use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_2, PI};

/// Maximum value on every radar axis
pub const FULL_MARK: u8 = 100;

/// Concentric grid rings, as fractions of the full radius
pub const GRID_LEVELS: [f64; 5] = [0.2, 0.4, 0.6, 0.8, 1.0];

/// One axis of the radar chart
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RadarPoint {
    pub subject: String,
    pub value: u8,
    pub full_mark: u8,
}

/// Pair dimension names with display values
pub fn radar_points(dimensions: &[String], values: &[u8]) -> Vec<RadarPoint> {
    dimensions
        .iter()
        .zip(values)
        .map(|(subject, value)| RadarPoint {
            subject: subject.clone(),
            value: *value,
            full_mark: FULL_MARK,
        })
        .collect()
}

/// Square canvas the chart is projected onto
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RadarGeometry {
    /// Width and height of the canvas
    pub size: f64,
    /// Space kept free for axis labels
    pub margin: f64,
}

impl Default for RadarGeometry {
    fn default() -> Self {
        Self {
            size: 300.0,
            margin: 40.0,
        }
    }
}

impl RadarGeometry {
    pub fn center(&self) -> f64 {
        self.size / 2.0
    }

    pub fn radius(&self) -> f64 {
        self.size / 2.0 - self.margin
    }

    /// Canvas coordinates of `value` on axis `index` of `axes`
    pub fn project(&self, value: f64, max: f64, index: usize, axes: usize) -> (f64, f64) {
        let slice = 2.0 * PI / axes.max(1) as f64;
        let angle = index as f64 * slice - FRAC_PI_2;
        let r = if max > 0.0 { value / max * self.radius() } else { 0.0 };
        (
            self.center() + r * angle.cos(),
            self.center() + r * angle.sin(),
        )
    }

    /// Vertices of the data polygon
    pub fn polygon(&self, points: &[RadarPoint]) -> Vec<(f64, f64)> {
        points
            .iter()
            .enumerate()
            .map(|(i, p)| {
                self.project(f64::from(p.value), f64::from(p.full_mark), i, points.len())
            })
            .collect()
    }

    /// Vertices of the grid ring at `level` (fraction of full radius)
    pub fn grid_ring(&self, level: f64, axes: usize) -> Vec<(f64, f64)> {
        (0..axes)
            .map(|i| self.project(level, 1.0, i, axes))
            .collect()
    }
}

/// Format vertices as an SVG `points` attribute
pub fn svg_points(vertices: &[(f64, f64)]) -> String {
    vertices
        .iter()
        .map(|(x, y)| format!("{:.2},{:.2}", x, y))
        .collect::<Vec<_>>()
        .join(" ")
}
