//! Mapping unit samples into output space, and path serialization.

use serde::{Deserialize, Serialize};
use std::f64::consts::{PI, SQRT_2};
use std::fmt::{self, Write as _};
use std::str::FromStr;

use crate::attractor::{Point, PointSequence};
use crate::bounds::AxisPair;
use crate::error::{ChaosError, Result};
use crate::rng::UniformSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ProjectionMode {
    /// Components pass through unchanged.
    #[default]
    Cube,
    /// Uniform triple read as spherical coordinates, then remapped to `[0, 1]`.
    Sphere,
}

impl ProjectionMode {
    pub const ALL: [ProjectionMode; 2] = [ProjectionMode::Cube, ProjectionMode::Sphere];

    pub const fn name(self) -> &'static str {
        match self {
            ProjectionMode::Cube => "Cube",
            ProjectionMode::Sphere => "Sphere",
        }
    }
}

impl fmt::Display for ProjectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ProjectionMode {
    type Err = ChaosError;

    fn from_str(s: &str) -> Result<Self> {
        ProjectionMode::ALL
            .into_iter()
            .find(|m| m.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| ChaosError::UnknownProjection(s.to_string()))
    }
}

/// Projects three uniform values. Non-finite input stays non-finite.
pub fn project(v1: f64, v2: f64, v3: f64, mode: ProjectionMode) -> Point {
    match mode {
        ProjectionMode::Cube => Point::new(v1, v2, v3),
        ProjectionMode::Sphere => {
            let phi = v1 * 2.0 * PI;
            let theta = (2.0 * v2 - 1.0).acos();
            let r = v3.cbrt() * SQRT_2;
            Point::new(
                (r * theta.sin() * phi.cos() + 1.0) / 2.0,
                (r * theta.sin() * phi.sin() + 1.0) / 2.0,
                (r * theta.cos() + 1.0) / 2.0,
            )
        }
    }
}

/// `count` points, each from three consecutive draws.
pub fn scatter(rng: &mut impl UniformSource, mode: ProjectionMode, count: usize) -> PointSequence {
    (0..count)
        .map(|_| {
            let v1 = rng.next_f64();
            let v2 = rng.next_f64();
            let v3 = rng.next_f64();
            project(v1, v2, v3, mode)
        })
        .collect::<Vec<_>>()
        .into()
}

/// SVG path data visiting points in sequence order: `M x y L x y L ...`.
/// No reordering and no deduplication, so output is stable.
pub fn path_data(points: &[Point], axes: AxisPair) -> String {
    let mut d = String::with_capacity(points.len() * 24);
    for (i, p) in points.iter().enumerate() {
        let (h, v) = axes.project(p);
        let cmd = if i == 0 { "M" } else { " L" };
        // Writing into a String cannot fail.
        let _ = write!(d, "{} {} {}", cmd, h, v);
    }
    d
}
