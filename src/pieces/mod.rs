//! Generative pieces - each turns a parameter snapshot into an SVG document.

pub mod attractor_plot;
pub mod bad_rng;
pub mod infinite_chaos;
pub mod session;
pub mod squircle;

use crate::attractor::Integrator;
use crate::error::{ChaosError, Result};
use crate::rng::Seed;
use crate::state::{decode_with_defaults, encode, EncodePolicy, GeneratorParams};

pub use attractor_plot::AttractorPlot;
pub use bad_rng::BadRng;
pub use infinite_chaos::InfiniteChaos;
pub use session::Session;
pub use squircle::Squircle;

/// Canvas and limits shared by every piece for one render.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext {
    pub width: u32,
    pub height: u32,
    /// Stroke width as a fraction of the smaller plot side.
    pub stroke_ratio: f64,
    /// Canvas margin as a fraction of the width, for pieces that fit points
    /// to the canvas.
    pub margin_ratio: f64,
    pub integrator: Integrator,
}

impl Default for RenderContext {
    fn default() -> Self {
        Self {
            width: 512,
            height: 512,
            stroke_ratio: 0.001,
            margin_ratio: 0.1,
            integrator: Integrator::default(),
        }
    }
}

impl RenderContext {
    pub fn min_side(&self) -> f64 {
        self.width.min(self.height) as f64
    }
}

/// Trait for all generative pieces.
pub trait Piece {
    /// Name used on the command line and in output files.
    fn name(&self) -> &'static str;

    /// The documented defaults. Keys missing from a decoded query fall back
    /// to these.
    fn defaults(&self) -> GeneratorParams;

    /// Render a fully resolved parameter set.
    fn render(&self, params: &GeneratorParams, ctx: &RenderContext) -> Result<String>;

    /// A new snapshot with the piece's randomizable parameters re-drawn.
    /// `None` is unseeded mode.
    fn randomize(&self, params: &GeneratorParams, seed: Option<&Seed>) -> Result<GeneratorParams>;

    /// Output file name for this parameter set.
    fn artifact_name(&self, params: &GeneratorParams) -> String;

    /// File extension for this piece's output.
    fn extension(&self) -> &'static str {
        "svg"
    }

    /// Decode a query string and fill in defaults.
    fn resolve(&self, query: &str) -> GeneratorParams {
        decode_with_defaults(query, &self.defaults())
    }

    /// Query string reproducing `params`.
    fn share_query(&self, params: &GeneratorParams, policy: EncodePolicy) -> String {
        encode(params, &self.defaults(), policy)
    }
}

pub fn all() -> Vec<Box<dyn Piece>> {
    vec![
        Box::new(AttractorPlot),
        Box::new(InfiniteChaos),
        Box::new(BadRng),
        Box::new(Squircle),
    ]
}

pub fn find(name: &str) -> Result<Box<dyn Piece>> {
    all()
        .into_iter()
        .find(|p| p.name() == name)
        .ok_or_else(|| ChaosError::UnknownPiece(name.to_string()))
}

/// Wraps SVG content in a document. `view_box` defaults to the pixel size.
pub(crate) fn wrap_svg(
    ctx: &RenderContext,
    view_box: Option<String>,
    background: Option<&str>,
    content: &str,
) -> String {
    let view_box = view_box.unwrap_or_else(|| format!("0 0 {} {}", ctx.width, ctx.height));
    let background = background
        .map(|fill| format!(r#"<rect width="100%" height="100%" fill="{}"/>"#, fill))
        .unwrap_or_default();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<svg xmlns="http://www.w3.org/2000/svg" viewBox="{}" width="{}" height="{}">
  {}
  {}
</svg>"#,
        view_box, ctx.width, ctx.height, background, content
    )
}
