//! Attractor integration.
//!
//! Each system is a pure step function `state' = f(state, coefficients, dt)`
//! iterated with forward Euler. Nothing here checks for stability: a
//! coefficient set that blows up produces infinities or NaNs, and those
//! flow through to the caller untouched.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

use crate::error::{ChaosError, Result};
use crate::rng::{truncate_float, NumericalRecipes, Seed, UniformSource};
use crate::state::GeneratorParams;

/// Default upper bound on `steps + discard` for one run.
pub const DEFAULT_MAX_STEPS: usize = 1_000_000;

/// How often a long run looks at its cancel token.
const CANCEL_CHECK_INTERVAL: usize = 4096;

/// A point in state space. Planar systems leave `z` at zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub const fn planar(x: f64, y: f64) -> Self {
        Self { x, y, z: 0.0 }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    fn distance(&self, other: &Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2) + (self.z - other.z).powi(2))
            .sqrt()
    }
}

/// The closed set of supported systems, by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SystemKind {
    Lorenz,
    Halvorsen,
    Sprott,
    Thomas,
    Quadratic,
}

impl SystemKind {
    pub const ALL: [SystemKind; 5] = [
        SystemKind::Lorenz,
        SystemKind::Halvorsen,
        SystemKind::Sprott,
        SystemKind::Thomas,
        SystemKind::Quadratic,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            SystemKind::Lorenz => "lorenz",
            SystemKind::Halvorsen => "halvorsen",
            SystemKind::Sprott => "sprott",
            SystemKind::Thomas => "thomas",
            SystemKind::Quadratic => "quadratic",
        }
    }
}

impl fmt::Display for SystemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SystemKind {
    type Err = ChaosError;

    fn from_str(s: &str) -> Result<Self> {
        SystemKind::ALL
            .into_iter()
            .find(|k| k.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| ChaosError::UnsupportedSystem(s.to_string()))
    }
}

/// Two independent full quadratic forms in `(x, y)`:
/// `c0 + c1 x + c2 x² + c3 xy + c4 y + c5 y²`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuadraticMap {
    pub ax: [f64; 6],
    pub ay: [f64; 6],
}

impl QuadraticMap {
    fn form(c: &[f64; 6], x: f64, y: f64) -> f64 {
        c[0] + c[1] * x + c[2] * x * x + c[3] * x * y + c[4] * y + c[5] * y * y
    }

    pub fn apply(&self, p: Point) -> Point {
        Point::planar(Self::form(&self.ax, p.x, p.y), Self::form(&self.ay, p.x, p.y))
    }

    /// Draws coefficients in `[-2, 2)` and a start point in `[-0.5, 0.5)`,
    /// all rounded to four decimals so they survive a query string.
    pub fn sample(rng: &mut impl UniformSource) -> (Self, Point) {
        let mut ax = [0.0; 6];
        let mut ay = [0.0; 6];
        for i in 0..6 {
            ax[i] = truncate_float(4.0 * (rng.next_f64() - 0.5));
            ay[i] = truncate_float(4.0 * (rng.next_f64() - 0.5));
        }
        let x0 = truncate_float(rng.next_f64() - 0.5);
        let y0 = truncate_float(rng.next_f64() - 0.5);
        (Self { ax, ay }, Point::planar(x0, y0))
    }

    /// Coefficients and start point derived from a seed through the
    /// Numerical Recipes stream.
    pub fn from_seed(seed: &Seed) -> (Self, Point) {
        let mut rng = NumericalRecipes::new(seed.to_register() as u32);
        Self::sample(&mut rng)
    }
}

/// A system together with its coefficients.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum System {
    Lorenz { a: f64, b: f64, c: f64 },
    Halvorsen { a: f64 },
    Sprott { a: f64, b: f64 },
    Thomas { b: f64 },
    Quadratic(QuadraticMap),
}

impl System {
    pub fn kind(&self) -> SystemKind {
        match self {
            System::Lorenz { .. } => SystemKind::Lorenz,
            System::Halvorsen { .. } => SystemKind::Halvorsen,
            System::Sprott { .. } => SystemKind::Sprott,
            System::Thomas { .. } => SystemKind::Thomas,
            System::Quadratic(_) => SystemKind::Quadratic,
        }
    }

    /// Discrete maps ignore `dt`.
    pub fn is_map(&self) -> bool {
        matches!(self, System::Quadratic(_))
    }

    /// One step from `p`.
    pub fn step(&self, p: Point, dt: f64) -> Point {
        let Point { x, y, z } = p;
        match *self {
            System::Lorenz { a, b, c } => Point::new(
                x + a * (y - x) * dt,
                y + (x * (b - z) - y) * dt,
                z + (x * y - c * z) * dt,
            ),
            System::Halvorsen { a } => Point::new(
                x + (-a * x - 4.0 * y - 4.0 * z - y * y) * dt,
                y + (-a * y - 4.0 * z - 4.0 * x - z * z) * dt,
                z + (-a * z - 4.0 * x - 4.0 * y - x * x) * dt,
            ),
            System::Sprott { a, b } => Point::new(
                x + (y + a * x * y + x * z) * dt,
                y + (1.0 - b * x * x + y * z) * dt,
                z + (x - x * x - y * y) * dt,
            ),
            System::Thomas { b } => Point::new(
                x + (y.sin() - b * x) * dt,
                y + (z.sin() - b * y) * dt,
                z + (x.sin() - b * z) * dt,
            ),
            System::Quadratic(map) => map.apply(p),
        }
    }

    /// Builds a system from a flat parameter set: `attractor` selects the
    /// system, `a`/`b`/`c` are its coefficients, and a quadratic map is
    /// derived from `seed`.
    pub fn from_params(params: &GeneratorParams) -> Result<Self> {
        let kind: SystemKind = params.parse("attractor")?;
        Ok(match kind {
            SystemKind::Lorenz => System::Lorenz {
                a: params.number("a")?,
                b: params.number("b")?,
                c: params.number("c")?,
            },
            SystemKind::Halvorsen => System::Halvorsen {
                a: params.number("a")?,
            },
            SystemKind::Sprott => System::Sprott {
                a: params.number("a")?,
                b: params.number("b")?,
            },
            SystemKind::Thomas => System::Thomas {
                b: params.number("b")?,
            },
            SystemKind::Quadratic => {
                let seed = Seed::Text(params.text("seed")?);
                System::Quadratic(QuadraticMap::from_seed(&seed).0)
            }
        })
    }
}

/// Everything one integration run consumes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunParams {
    pub system: System,
    pub initial: Point,
    pub dt: f64,
    pub steps: usize,
    pub discard: usize,
}

impl RunParams {
    /// Known-good coefficients, start point and step size for each system.
    /// The quadratic map has no sensible fixed default and uses the seed
    /// `3vg11h8l6`.
    pub fn defaults(kind: SystemKind) -> Self {
        let (system, initial, dt) = match kind {
            SystemKind::Lorenz => (
                System::Lorenz { a: 10.0, b: 28.0, c: 8.0 / 3.0 },
                Point::new(0.1, 0.0, -1.0),
                0.003,
            ),
            SystemKind::Halvorsen => (
                System::Halvorsen { a: 1.89 },
                Point::new(-1.48, -1.51, 2.04),
                0.005,
            ),
            SystemKind::Sprott => (
                System::Sprott { a: 2.07, b: 1.79 },
                Point::new(0.63, 0.47, -0.54),
                0.01,
            ),
            SystemKind::Thomas => (
                System::Thomas { b: 0.2 },
                Point::new(1.1, 1.1, -0.01),
                0.2,
            ),
            SystemKind::Quadratic => {
                let (map, start) = QuadraticMap::from_seed(&Seed::from("3vg11h8l6"));
                (System::Quadratic(map), start, 1.0)
            }
        };
        Self {
            system,
            initial,
            dt,
            steps: 10_000,
            discard: 0,
        }
    }

    /// Reads `attractor`, coefficients, `x`/`y`/`z`, `dt`, `pointCount` and
    /// `offset` from a parameter set.
    pub fn from_params(params: &GeneratorParams) -> Result<Self> {
        let system = System::from_params(params)?;
        let initial = match system {
            System::Quadratic(_) => {
                QuadraticMap::from_seed(&Seed::Text(params.text("seed")?)).1
            }
            _ => Point::new(params.number("x")?, params.number("y")?, params.number("z")?),
        };
        let dt = if system.is_map() { 1.0 } else { params.number("dt")? };
        Ok(Self {
            system,
            initial,
            dt,
            steps: params.count("pointCount")?,
            discard: params.count("offset")?,
        })
    }
}

/// An ordered run of points from one integration. Built once, then only read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PointSequence {
    points: Vec<Point>,
}

impl PointSequence {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Point> {
        self.points.iter()
    }

    pub fn as_slice(&self) -> &[Point] {
        &self.points
    }

    pub fn first(&self) -> Option<&Point> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&Point> {
        self.points.last()
    }

    /// True when every coordinate is finite.
    pub fn is_finite(&self) -> bool {
        self.points.iter().all(Point::is_finite)
    }
}

impl From<Vec<Point>> for PointSequence {
    fn from(points: Vec<Point>) -> Self {
        Self { points }
    }
}

impl<'a> IntoIterator for &'a PointSequence {
    type Item = &'a Point;
    type IntoIter = std::slice::Iter<'a, Point>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}

/// Shared flag that asks an in-flight run to stop.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Runs step functions to completion on the calling thread.
///
/// A run is a single synchronous loop; large step counts block the caller
/// for as long as they take. `max_steps` bounds `steps + discard` and an
/// oversized request is refused rather than truncated.
#[derive(Debug, Clone, Copy)]
pub struct Integrator {
    pub max_steps: usize,
}

impl Default for Integrator {
    fn default() -> Self {
        Self {
            max_steps: DEFAULT_MAX_STEPS,
        }
    }
}

impl Integrator {
    pub fn new(max_steps: usize) -> Self {
        Self { max_steps }
    }

    pub fn run(&self, run: &RunParams) -> Result<PointSequence> {
        self.integrate(&run.system, run.initial, run.dt, run.steps, run.discard)
    }

    pub fn integrate(
        &self,
        system: &System,
        initial: Point,
        dt: f64,
        steps: usize,
        discard: usize,
    ) -> Result<PointSequence> {
        self.integrate_with_cancel(system, initial, dt, steps, discard, None)
    }

    /// Steps `steps + discard` times from `initial` and records every output
    /// after the first `discard`. The result always has exactly `steps`
    /// points.
    pub fn integrate_with_cancel(
        &self,
        system: &System,
        initial: Point,
        dt: f64,
        steps: usize,
        discard: usize,
        cancel: Option<&CancelToken>,
    ) -> Result<PointSequence> {
        let total = steps
            .checked_add(discard)
            .filter(|total| *total <= self.max_steps)
            .ok_or(ChaosError::StepsExceeded {
                requested: steps.saturating_add(discard),
                max: self.max_steps,
            })?;

        debug!(system = %system.kind(), steps, discard, dt, "integrating");

        let mut points = Vec::with_capacity(steps);
        let mut state = initial;
        for i in 0..total {
            if i % CANCEL_CHECK_INTERVAL == 0 && cancel.is_some_and(CancelToken::is_cancelled) {
                debug!(system = %system.kind(), completed = i, "integration cancelled");
                return Err(ChaosError::Cancelled);
            }
            state = system.step(state, dt);
            if i >= discard {
                points.push(state);
            }
        }

        debug!(system = %system.kind(), points = points.len(), "integration finished");
        Ok(PointSequence { points })
    }
}

/// Integrates with the default step limit.
pub fn integrate(
    system: &System,
    initial: Point,
    dt: f64,
    steps: usize,
    discard: usize,
) -> Result<PointSequence> {
    Integrator::default().integrate(system, initial, dt, steps, discard)
}

/// Largest Lyapunov exponent per iteration, estimated by following a
/// neighbour `1e-8` away and renormalising its separation every step.
/// Steps before `start` only settle the pair; `start..end` are averaged.
pub fn lyapunov_exponent(system: &System, initial: Point, dt: f64, start: usize, end: usize) -> f64 {
    const D0: f64 = 1e-8;

    let mut a = initial;
    let mut b = Point::new(initial.x + D0, initial.y, initial.z);
    let mut sum = 0.0;
    for i in 0..end {
        a = system.step(a, dt);
        b = system.step(b, dt);
        let d = a.distance(&b);
        if !d.is_finite() || !a.is_finite() {
            return f64::NAN;
        }
        if d == 0.0 {
            return f64::NEG_INFINITY;
        }
        if i >= start {
            sum += (d / D0).ln();
        }
        let k = D0 / d;
        b = Point::new(a.x + (b.x - a.x) * k, a.y + (b.y - a.y) * k, a.z + (b.z - a.z) * k);
    }
    sum / end.saturating_sub(start).max(1) as f64
}

/// Bounded, finite, and with a positive Lyapunov exponent.
pub fn is_chaotic(system: &System, initial: Point, dt: f64, start: usize, end: usize) -> bool {
    let exponent = lyapunov_exponent(system, initial, dt, start, end);
    exponent.is_finite() && exponent > 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lorenz() -> System {
        System::Lorenz { a: 10.0, b: 28.0, c: 8.0 / 3.0 }
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn lorenz_single_step() {
        let p = lorenz().step(Point::new(0.1, 0.0, -1.0), 0.003);
        assert!(close(p.x, 0.097), "x = {}", p.x);
        assert!(close(p.y, 0.0087), "y = {}", p.y);
        assert!(close(p.z, -0.992), "z = {}", p.z);
    }

    #[test]
    fn first_recorded_point_is_after_one_step() {
        let seq = integrate(&lorenz(), Point::new(0.1, 0.0, -1.0), 0.003, 1, 0).unwrap();
        assert_eq!(seq.len(), 1);
        assert!(close(seq.as_slice()[0].x, 0.097));
    }

    #[test]
    fn length_is_steps_regardless_of_discard() {
        let steps = 500;
        for discard in [0, steps - 1] {
            let seq = integrate(&lorenz(), Point::new(0.1, 0.0, -1.0), 0.003, steps, discard).unwrap();
            assert_eq!(seq.len(), steps);
        }
    }

    #[test]
    fn discard_skips_leading_outputs() {
        let start = Point::new(0.1, 0.0, -1.0);
        let full = integrate(&lorenz(), start, 0.003, 300, 0).unwrap();
        let tail = integrate(&lorenz(), start, 0.003, 200, 100).unwrap();
        assert_eq!(tail.as_slice(), &full.as_slice()[100..]);
    }

    #[test]
    fn zero_steps_is_empty() {
        let seq = integrate(&lorenz(), Point::default(), 0.003, 0, 10).unwrap();
        assert!(seq.is_empty());
    }

    #[test]
    fn unknown_system_name_is_rejected() {
        assert_eq!(
            "rossler".parse::<SystemKind>(),
            Err(ChaosError::UnsupportedSystem("rossler".into()))
        );
        let params = GeneratorParams::new().with("attractor", "rossler");
        assert_eq!(
            System::from_params(&params),
            Err(ChaosError::UnsupportedSystem("rossler".into()))
        );
    }

    #[test]
    fn oversized_runs_are_refused() {
        let integrator = Integrator::new(100);
        let err = integrator
            .integrate(&lorenz(), Point::default(), 0.003, 90, 20)
            .unwrap_err();
        assert_eq!(err, ChaosError::StepsExceeded { requested: 110, max: 100 });
        assert!(integrator.integrate(&lorenz(), Point::default(), 0.003, 80, 20).is_ok());
    }

    #[test]
    fn divergence_is_data_not_error() {
        let wild = System::Lorenz { a: 1e200, b: 1e200, c: 1e200 };
        let seq = integrate(&wild, Point::new(1.0, 2.0, 3.0), 1.0, 50, 0).unwrap();
        assert_eq!(seq.len(), 50);
        assert!(!seq.is_finite());
    }

    #[test]
    fn cancelled_run_stops() {
        let token = CancelToken::new();
        token.cancel();
        let result = Integrator::default().integrate_with_cancel(
            &lorenz(),
            Point::default(),
            0.003,
            10,
            0,
            Some(&token),
        );
        assert_eq!(result, Err(ChaosError::Cancelled));
    }

    #[test]
    fn quadratic_map_is_seed_deterministic() {
        let (a, pa) = QuadraticMap::from_seed(&Seed::from("1mr99uuz9"));
        let (b, pb) = QuadraticMap::from_seed(&Seed::from("1mr99uuz9"));
        assert_eq!(a, b);
        assert_eq!(pa, pb);
        for c in a.ax.iter().chain(a.ay.iter()) {
            assert!((-2.0..=2.0).contains(c));
        }
        assert!(pa.x.abs() <= 0.5 && pa.y.abs() <= 0.5 && pa.z == 0.0);
        let (other, _) = QuadraticMap::from_seed(&Seed::from("3r3anjk2v"));
        assert_ne!(a, other);
    }

    #[test]
    fn quadratic_map_formula() {
        let map = QuadraticMap {
            ax: [1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
            ay: [0.0, 0.0, 0.0, 0.0, 1.0, 0.0],
        };
        let p = map.apply(Point::planar(1.0, 2.0));
        assert_eq!(p, Point::planar(1.0 + 2.0 + 3.0 + 8.0 + 10.0 + 24.0, 2.0));
    }

    #[test]
    fn run_params_from_flat_set() {
        let params = GeneratorParams::new()
            .with("attractor", "lorenz")
            .with("a", 10.0)
            .with("b", 28.0)
            .with("c", 8.0 / 3.0)
            .with("x", 0.1)
            .with("y", 0.0)
            .with("z", -1.0)
            .with("dt", 0.003)
            .with("pointCount", 1000.0)
            .with("offset", 10.0);
        let run = RunParams::from_params(&params).unwrap();
        assert_eq!(run.system, lorenz());
        assert_eq!(run.steps, 1000);
        assert_eq!(run.discard, 10);
        assert_eq!(Integrator::default().run(&run).unwrap().len(), 1000);
    }

    #[test]
    fn default_flows_stay_finite() {
        for kind in [SystemKind::Lorenz, SystemKind::Thomas] {
            let run = RunParams::defaults(kind);
            let seq = Integrator::default().run(&run).unwrap();
            assert!(seq.is_finite(), "{} diverged", kind);
        }
    }

    #[test]
    fn lorenz_is_chaotic_fixed_point_is_not() {
        assert!(is_chaotic(&lorenz(), Point::new(0.1, 0.0, -1.0), 0.003, 2000, 40_000));
        let contracting = System::Quadratic(QuadraticMap {
            ax: [0.0, 0.5, 0.0, 0.0, 0.0, 0.0],
            ay: [0.0, 0.0, 0.0, 0.0, 0.5, 0.0],
        });
        assert!(!is_chaotic(&contracting, Point::planar(0.3, 0.2), 1.0, 1000, 2000));
    }
}
