//! Axis-aligned extents of a point sequence and the plot transform built
//! from them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

use crate::attractor::Point;
use crate::error::{ChaosError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub fn of(self, p: &Point) -> f64 {
        match self {
            Axis::X => p.x,
            Axis::Y => p.y,
            Axis::Z => p.z,
        }
    }

    fn letter(self) -> char {
        match self {
            Axis::X => 'x',
            Axis::Y => 'y',
            Axis::Z => 'z',
        }
    }

    fn from_letter(c: char) -> Option<Self> {
        match c.to_ascii_lowercase() {
            'x' => Some(Axis::X),
            'y' => Some(Axis::Y),
            'z' => Some(Axis::Z),
            _ => None,
        }
    }
}

/// Two distinct axes picked for display, e.g. `zx` plots z horizontally
/// and x vertically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AxisPair {
    pub horizontal: Axis,
    pub vertical: Axis,
}

impl AxisPair {
    pub const XY: AxisPair = AxisPair {
        horizontal: Axis::X,
        vertical: Axis::Y,
    };

    pub fn project(&self, p: &Point) -> (f64, f64) {
        (self.horizontal.of(p), self.vertical.of(p))
    }
}

impl Default for AxisPair {
    fn default() -> Self {
        AxisPair::XY
    }
}

impl fmt::Display for AxisPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.horizontal.letter(), self.vertical.letter())
    }
}

impl FromStr for AxisPair {
    type Err = ChaosError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || ChaosError::InvalidAxisPair(s.to_string());
        let mut chars = s.chars();
        let (Some(h), Some(v), None) = (chars.next(), chars.next(), chars.next()) else {
            return Err(invalid());
        };
        let horizontal = Axis::from_letter(h).ok_or_else(invalid)?;
        let vertical = Axis::from_letter(v).ok_or_else(invalid)?;
        if horizontal == vertical {
            return Err(invalid());
        }
        Ok(AxisPair {
            horizontal,
            vertical,
        })
    }
}

/// `[min, max]` on one axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    pub min: f64,
    pub max: f64,
}

impl Extent {
    fn of(value: f64) -> Self {
        Self {
            min: value,
            max: value,
        }
    }

    // f64::min/max drop NaN operands; these keep them.
    fn include(self, value: f64) -> Self {
        if self.min.is_nan() || value.is_nan() {
            return Self {
                min: f64::NAN,
                max: f64::NAN,
            };
        }
        Self {
            min: self.min.min(value),
            max: self.max.max(value),
        }
    }

    pub fn span(&self) -> f64 {
        self.max - self.min
    }

    pub fn contains(&self, value: f64) -> bool {
        self.min <= value && value <= self.max
    }

    pub fn is_finite(&self) -> bool {
        self.min.is_finite() && self.max.is_finite()
    }
}

/// Extents of a sequence on a chosen axis pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub axes: AxisPair,
    pub horizontal: Extent,
    pub vertical: Extent,
}

impl Bounds {
    /// Scans the whole sequence once. NaN or infinite coordinates end up in
    /// the result as-is.
    pub fn compute(points: &[Point], axes: AxisPair) -> Result<Self> {
        let (first, rest) = points.split_first().ok_or(ChaosError::EmptySequence)?;
        let (h, v) = axes.project(first);
        let (horizontal, vertical) = rest.iter().fold((Extent::of(h), Extent::of(v)), |(he, ve), p| {
            let (h, v) = axes.project(p);
            (he.include(h), ve.include(v))
        });

        let bounds = Self {
            axes,
            horizontal,
            vertical,
        };
        if !bounds.is_finite() {
            warn!(axes = %axes, ?horizontal, ?vertical, "bounds contain non-finite values");
        }
        Ok(bounds)
    }

    pub fn width(&self) -> f64 {
        self.horizontal.span()
    }

    pub fn height(&self) -> f64 {
        self.vertical.span()
    }

    pub fn contains(&self, p: &Point) -> bool {
        let (h, v) = self.axes.project(p);
        self.horizontal.contains(h) && self.vertical.contains(v)
    }

    pub fn is_finite(&self) -> bool {
        self.horizontal.is_finite() && self.vertical.is_finite()
    }
}

/// Shorthand for [`Bounds::compute`].
pub fn compute_bounds(points: &[Point], axes: AxisPair) -> Result<Bounds> {
    Bounds::compute(points, axes)
}

/// Uniform scale plus offset that centers a bounds box on a canvas with a
/// margin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlotTransform {
    pub scale: f64,
    pub offset_x: f64,
    pub offset_y: f64,
    bounds: Bounds,
}

impl PlotTransform {
    /// `margin_ratio` is taken as a fraction of the canvas width, split
    /// between both sides.
    pub fn fit(bounds: Bounds, width: f64, height: f64, margin_ratio: f64) -> Self {
        let margin = width * margin_ratio;
        let sx = (width - margin) / bounds.width();
        let sy = (height - margin) / bounds.height();
        // A flat extent (zero span) gives an infinite candidate; use the other.
        let scale = match (sx.is_finite(), sy.is_finite()) {
            (true, true) => sx.min(sy),
            (true, false) => sx,
            (false, true) => sy,
            (false, false) if bounds.is_finite() => 1.0,
            (false, false) => f64::NAN,
        };
        Self {
            scale,
            offset_x: (width - bounds.width() * scale) / 2.0,
            offset_y: (height - bounds.height() * scale) / 2.0,
            bounds,
        }
    }

    pub fn apply(&self, p: &Point) -> (f64, f64) {
        let (h, v) = self.bounds.axes.project(p);
        (
            self.offset_x + (h - self.bounds.horizontal.min) * self.scale,
            self.offset_y + (v - self.bounds.vertical.min) * self.scale,
        )
    }
}
