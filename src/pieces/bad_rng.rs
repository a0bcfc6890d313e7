//! Point clouds from bad random number generators.
//!
//! Three consecutive draws from a historical LCG become one point. A good
//! generator fills the cube (or sphere) evenly; RANDU and friends show
//! their lattice structure instead.

use std::fmt::Write as _;
use tracing::info;

use crate::bounds::{AxisPair, Bounds, PlotTransform};
use crate::error::{ChaosError, Result};
use crate::pieces::{wrap_svg, Piece, RenderContext};
use crate::projection::{scatter, ProjectionMode};
use crate::rng::{source_for, Lcg, LcgPreset, Seed, UniformSource};
use crate::state::GeneratorParams;

/// Every cloud starts from register 1, so a preset always draws the same
/// picture.
const CLOUD_SEED: u64 = 1;

pub struct BadRng;

impl Piece for BadRng {
    fn name(&self) -> &'static str {
        "bad-rng"
    }

    fn defaults(&self) -> GeneratorParams {
        GeneratorParams::new()
            .with("pointCount", 100_000.0)
            .with("pointSize", 0.02)
            .with("color", "#00ff00")
            .with("backgroundColor", "#000000")
            .with("opacity", 0.9)
            .with("rngType", LcgPreset::Ucodia.name())
            .with("projectionMode", ProjectionMode::Cube.name())
    }

    fn render(&self, params: &GeneratorParams, ctx: &RenderContext) -> Result<String> {
        let preset: LcgPreset = params.parse("rngType")?;
        let mode: ProjectionMode = params.parse("projectionMode")?;
        let count = params.count("pointCount")?;
        if count > ctx.integrator.max_steps {
            return Err(ChaosError::StepsExceeded {
                requested: count,
                max: ctx.integrator.max_steps,
            });
        }

        let mut rng = Lcg::new(preset, CLOUD_SEED);
        let points = scatter(&mut rng, mode, count);
        let bounds = Bounds::compute(points.as_slice(), AxisPair::XY)?;
        let transform = PlotTransform::fit(bounds, ctx.width as f64, ctx.height as f64, ctx.margin_ratio);
        let radius = params.number("pointSize")? * ctx.min_side() / 8.0;

        let mut dots = String::new();
        for p in &points {
            let (x, y) = transform.apply(p);
            let _ = writeln!(dots, r#"<circle cx="{:.2}" cy="{:.2}" r="{:.2}"/>"#, x, y, radius);
        }
        info!(rng = %preset, projection = %mode, points = points.len(), "scattered point cloud");

        let content = format!(
            r#"<g fill="{}" fill-opacity="{}">
{}</g>"#,
            params.text("color")?,
            params.number("opacity")?.clamp(0.0, 1.0),
            dots
        );
        Ok(wrap_svg(ctx, None, Some(&params.text("backgroundColor")?), &content))
    }

    /// Picks a preset and a projection mode.
    fn randomize(&self, params: &GeneratorParams, seed: Option<&Seed>) -> Result<GeneratorParams> {
        let mut rng = source_for(seed);
        let pick = |u: f64, n: usize| ((u * n as f64) as usize).min(n - 1);
        let preset = LcgPreset::ALL[pick(rng.next_f64(), LcgPreset::ALL.len())];
        let mode = ProjectionMode::ALL[pick(rng.next_f64(), ProjectionMode::ALL.len())];
        Ok(params
            .clone()
            .with("rngType", preset.name())
            .with("projectionMode", mode.name()))
    }

    fn artifact_name(&self, params: &GeneratorParams) -> String {
        format!(
            "bad-rng_{}_{}.{}",
            params.text("rngType").unwrap_or_default(),
            params.text("projectionMode").unwrap_or_default(),
            self.extension()
        )
    }
}
