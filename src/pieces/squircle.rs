//! Nested rounded squares that twist, shift, and soften toward the center.

use std::f64::consts::{PI, TAU};
use std::fmt::Write as _;
use std::str::FromStr;
use tracing::info;

use crate::error::{ChaosError, Result};
use crate::features::SquircleFeatures;
use crate::pieces::{wrap_svg, Piece, RenderContext};
use crate::rng::{map_range, source_for, NumericalRecipes, Seed, UniformSource};
use crate::state::GeneratorParams;

fn invalid(key: &str, expected: &'static str, found: &str) -> ChaosError {
    ChaosError::InvalidParam {
        key: key.to_string(),
        expected,
        found: found.to_string(),
    }
}

/// Per-line rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotateFn {
    None,
    Linear,
    Sin,
    Noise,
}

impl FromStr for RotateFn {
    type Err = ChaosError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "none" => Ok(RotateFn::None),
            "linear" => Ok(RotateFn::Linear),
            "sin" => Ok(RotateFn::Sin),
            "noise" => Ok(RotateFn::Noise),
            other => Err(invalid("rotateFn", "none, linear, sin or noise", other)),
        }
    }
}

/// Shared by translation and corner radius: off, constant, or growing with
/// the line index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progression {
    None,
    Fixed,
    Linear,
}

impl Progression {
    fn parse(key: &str, s: &str) -> Result<Self> {
        match s {
            "none" => Ok(Progression::None),
            "fixed" => Ok(Progression::Fixed),
            "linear" => Ok(Progression::Linear),
            other => Err(invalid(key, "none, fixed or linear", other)),
        }
    }
}

/// Seeded 1D value noise. Four octaves, each half the amplitude of the last,
/// so output stays within `[0, 1)`.
struct ValueNoise {
    lattice: [f64; Self::SIZE],
}

impl ValueNoise {
    const SIZE: usize = 256;
    const OCTAVES: u32 = 4;
    const FALLOFF: f64 = 0.5;

    fn new(seed: u32) -> Self {
        let mut rng = NumericalRecipes::new(seed);
        let mut lattice = [0.0; Self::SIZE];
        for v in lattice.iter_mut() {
            *v = rng.next_f64();
        }
        Self { lattice }
    }

    fn octave(&self, x: f64) -> f64 {
        let cell = x.floor();
        let t = x - cell;
        let i = cell.rem_euclid(Self::SIZE as f64) as usize;
        let a = self.lattice[i];
        let b = self.lattice[(i + 1) % Self::SIZE];
        let blend = (1.0 - (t * PI).cos()) / 2.0;
        a + (b - a) * blend
    }

    fn sample(&self, x: f64) -> f64 {
        let mut amplitude = Self::FALLOFF;
        let mut frequency = 1.0;
        let mut total = 0.0;
        for _ in 0..Self::OCTAVES {
            total += self.octave(x * frequency) * amplitude;
            amplitude *= Self::FALLOFF;
            frequency *= 2.0;
        }
        total
    }
}

/// Everything a render needs, read and checked once up front.
struct Layout {
    line_count: usize,
    margin_ratio: f64,
    squareness: f64,
    rotate_fn: RotateFn,
    rotate_inc: f64,
    rotate_reverse: bool,
    translate_fn: Progression,
    translate_inc: f64,
    translate_reverse: bool,
    radius_fn: Progression,
    radius_inc: f64,
    radius_reverse: bool,
    noise: ValueNoise,
    noise_res: f64,
}

impl Layout {
    fn from_params(params: &GeneratorParams) -> Result<Self> {
        let line_count = params.count("lineCount")?;
        if line_count < 2 {
            return Err(invalid("lineCount", "at least 2", &line_count.to_string()));
        }
        let noise_seed = params.number("noiseSeed")?;
        Ok(Self {
            line_count,
            margin_ratio: params.number("marginRatio")?,
            squareness: params.number("squareness")?,
            rotate_fn: params.text("rotateFn")?.parse()?,
            rotate_inc: params.number("rotateInc")?,
            rotate_reverse: params.boolean("rotateReverse")?,
            translate_fn: Progression::parse("translateFn", &params.text("translateFn")?)?,
            translate_inc: params.number("translateInc")?,
            translate_reverse: params.boolean("translateReverse")?,
            radius_fn: Progression::parse("radiusFn", &params.text("radiusFn")?)?,
            radius_inc: params.number("radiusInc")?,
            radius_reverse: params.boolean("radiusReverse")?,
            noise: ValueNoise::new(noise_seed.abs() as u32),
            noise_res: params.number("noiseRes")?,
        })
    }

    fn sign(reverse: bool) -> f64 {
        if reverse {
            -1.0
        } else {
            1.0
        }
    }

    /// Radians.
    fn rotation(&self, i: usize) -> f64 {
        let i = i as f64;
        match self.rotate_fn {
            RotateFn::None => 0.0,
            RotateFn::Linear => self.rotate_inc * i * Self::sign(self.rotate_reverse),
            RotateFn::Sin => {
                let period = self.line_count as f64;
                let pos = map_range(i % period, 0.0, period, 0.0, TAU);
                let factor = map_range(pos.sin(), 0.0, 1.0, -1.0, 1.0);
                self.rotate_inc / (period * 0.3) * 4.0 * i * factor
            }
            RotateFn::Noise => {
                let n = self.noise.sample(i * self.noise_res);
                self.rotate_inc * map_range(n, 0.0, 1.0, -0.5, 0.5) * 10.0
            }
        }
    }

    fn translation(&self, i: usize) -> f64 {
        match self.translate_fn {
            Progression::None => 0.0,
            Progression::Fixed => self.translate_inc,
            Progression::Linear => self.translate_inc * i as f64 * Self::sign(self.translate_reverse),
        }
    }

    fn radius(&self, i: usize, min_side: f64) -> f64 {
        match self.radius_fn {
            Progression::None => 0.0,
            Progression::Fixed => self.radius_inc,
            Progression::Linear => {
                let last = (self.line_count - 1) as f64;
                let (from, to) = if self.radius_reverse {
                    (min_side * 0.1, 0.0)
                } else {
                    (0.0, min_side * 0.1)
                };
                map_range(i as f64, 0.0, last, from, to)
            }
        }
    }
}

pub struct Squircle;

impl Piece for Squircle {
    fn name(&self) -> &'static str {
        "squircle"
    }

    fn defaults(&self) -> GeneratorParams {
        GeneratorParams::new()
            .with("lineCount", 18.0)
            .with("marginRatio", 0.2)
            .with("thickness", 2.0)
            .with("squareness", 1.0)
            .with("background", "#fff")
            .with("stroke", "#000")
            .with("transparent", true)
            .with("noiseSeed", 2.0)
            .with("noiseRes", 0.05)
            .with("radiusFn", "linear")
            .with("radiusInc", 30.0)
            .with("radiusReverse", false)
            .with("rotateFn", "linear")
            .with("rotateInc", TAU / 120.0)
            .with("rotateReverse", false)
            .with("translateFn", "none")
            .with("translateInc", 3.0)
            .with("translateReverse", false)
    }

    fn render(&self, params: &GeneratorParams, ctx: &RenderContext) -> Result<String> {
        let layout = Layout::from_params(params)?;
        let background = params.text("background")?;
        let fill = if params.boolean("transparent")? {
            "none".to_string()
        } else {
            background.clone()
        };

        let (width, height) = (ctx.width as f64, ctx.height as f64);
        let (cx, cy) = (width / 2.0, height / 2.0);
        let min_side = ctx.min_side();
        let portrait = ctx.width <= ctx.height;
        let max_width = min_side * (1.0 - layout.margin_ratio);
        let min_width = min_side * 0.01;
        let inc = (max_width - min_width) / (layout.line_count - 1) as f64;

        let mut rects = String::new();
        for i in 0..layout.line_count {
            let w = max_width - i as f64 * inc;
            let (rw, rh) = if portrait {
                (w * layout.squareness, w)
            } else {
                (w, w * layout.squareness)
            };
            let rot = layout.rotation(i).to_degrees();
            let trans = layout.translation(i);
            let _ = writeln!(
                rects,
                r#"<rect x="{:.3}" y="{:.3}" width="{:.3}" height="{:.3}" rx="{:.3}" transform="translate({} {}) rotate({:.4}) translate({} {})"/>"#,
                cx - rw / 2.0,
                cy - rh / 2.0,
                rw,
                rh,
                layout.radius(i, min_side),
                cx,
                cy,
                rot,
                trans - cx,
                trans - cy
            );
        }
        info!(lines = layout.line_count, rotate = ?layout.rotate_fn, "drew squircle");

        let content = format!(
            r#"<g fill="{}" stroke="{}" stroke-width="{}">
{}</g>"#,
            fill,
            params.text("stroke")?,
            params.number("thickness")?,
            rects
        );
        Ok(wrap_svg(ctx, None, Some(&background), &content))
    }

    /// Samples every squircle feature. Layout keys outside the trait tables
    /// are carried over from `params`.
    fn randomize(&self, params: &GeneratorParams, seed: Option<&Seed>) -> Result<GeneratorParams> {
        let mut rng = source_for(seed);
        let (next, report) = SquircleFeatures::randomize(params, &mut rng)?;
        for (feature, variant) in &report.picks {
            info!(feature, variant = %variant, "picked feature");
        }
        Ok(next)
    }

    fn artifact_name(&self, _params: &GeneratorParams) -> String {
        format!("squircle.{}", self.extension())
    }
}
