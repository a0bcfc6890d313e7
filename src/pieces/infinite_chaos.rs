//! Quadratic-map dust.
//!
//! Every seed names a different 2D quadratic map. Most of them collapse to
//! a point or fly off to infinity; the chaotic ones leave a fine cloud of
//! dots, which is what this piece draws.

use std::fmt::Write as _;
use tracing::{info, warn};

use crate::attractor::{is_chaotic, Point, QuadraticMap, System};
use crate::bounds::{AxisPair, Bounds, PlotTransform};
use crate::error::Result;
use crate::pieces::{wrap_svg, Piece, RenderContext};
use crate::rng::Seed;
use crate::state::GeneratorParams;

/// Unseeded randomize tries this many fresh seeds looking for chaos.
const SEARCH_ATTEMPTS: usize = 64;

pub struct InfiniteChaos;

impl InfiniteChaos {
    fn map_for(params: &GeneratorParams) -> Result<(QuadraticMap, Point)> {
        Ok(QuadraticMap::from_seed(&Seed::Text(params.text("seed")?)))
    }

    fn chaotic(params: &GeneratorParams, seed: &Seed) -> Result<bool> {
        let (map, start) = QuadraticMap::from_seed(seed);
        Ok(is_chaotic(
            &System::Quadratic(map),
            start,
            1.0,
            params.count("lyapunovStart")?,
            params.count("lyapunovEnd")?,
        ))
    }
}

impl Piece for InfiniteChaos {
    fn name(&self) -> &'static str {
        "infinite-chaos"
    }

    fn defaults(&self) -> GeneratorParams {
        GeneratorParams::new()
            .with("length", 100_000.0)
            .with("background", "#333333")
            .with("color", "#ffffff")
            .with("opacity", 0.3)
            .with("marginRatio", 0.3)
            .with("seed", "3vg11h8l6")
            .with("lyapunovStart", 1000.0)
            .with("lyapunovEnd", 2000.0)
    }

    fn render(&self, params: &GeneratorParams, ctx: &RenderContext) -> Result<String> {
        let (map, start) = Self::map_for(params)?;
        let length = params.count("length")?;
        let margin_ratio = params.number("marginRatio")?;
        let opacity = params.number("opacity")?.clamp(0.0, 1.0);
        let color = params.text("color")?;
        let background = params.text("background")?;

        let points = ctx
            .integrator
            .integrate(&System::Quadratic(map), start, 1.0, length, 0)?;
        let bounds = Bounds::compute(points.as_slice(), AxisPair::XY)?;
        let transform = PlotTransform::fit(bounds, ctx.width as f64, ctx.height as f64, margin_ratio);

        let mut dots = String::new();
        let mut skipped = 0usize;
        for p in &points {
            let (x, y) = transform.apply(p);
            if !(x.is_finite() && y.is_finite()) {
                skipped += 1;
                continue;
            }
            let _ = writeln!(dots, r#"<circle cx="{:.2}" cy="{:.2}" r="1"/>"#, x, y);
        }
        if skipped > 0 {
            warn!(skipped, "points with non-finite screen position left out");
        }
        info!(seed = %params.text("seed")?, points = points.len(), "drew quadratic map");

        let content = format!(
            r#"<g fill="{}" fill-opacity="{}" stroke="none">
{}</g>"#,
            color, opacity, dots
        );
        Ok(wrap_svg(ctx, None, Some(&background), &content))
    }

    /// Seeded mode adopts the given seed. Unseeded mode tries fresh random
    /// seeds until one yields a positive Lyapunov exponent.
    fn randomize(&self, params: &GeneratorParams, seed: Option<&Seed>) -> Result<GeneratorParams> {
        if let Some(seed) = seed {
            return Ok(params.updated("seed", seed.to_string()));
        }

        let mut candidate = Seed::random();
        for attempt in 1..=SEARCH_ATTEMPTS {
            if Self::chaotic(params, &candidate)? {
                info!(seed = %candidate, attempt, "found chaotic seed");
                return Ok(params.updated("seed", candidate.to_string()));
            }
            candidate = Seed::random();
        }
        warn!(attempts = SEARCH_ATTEMPTS, seed = %candidate, "no chaotic seed found, keeping last");
        Ok(params.updated("seed", candidate.to_string()))
    }

    fn artifact_name(&self, params: &GeneratorParams) -> String {
        let seed = params.text("seed").unwrap_or_default();
        format!("infinite-chaos-{}.{}", seed, self.extension())
    }
}
