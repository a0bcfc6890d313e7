//! Single-stroke attractor plot for pen plotters.
//!
//! Integrates one of the continuous attractors and draws the trajectory as
//! one unbroken SVG path, viewed along a chosen pair of axes.

use tracing::info;

use crate::attractor::{RunParams, System, SystemKind};
use crate::bounds::{AxisPair, Bounds};
use crate::error::Result;
use crate::pieces::{wrap_svg, Piece, RenderContext};
use crate::projection::path_data;
use crate::rng::{map_range, source_for, truncate_float, Seed, UniformSource};
use crate::state::GeneratorParams;

/// Keys in the order the artifact name lists them.
const DECLARED_KEYS: [&str; 11] = [
    "attractor", "pointCount", "offset", "projection", "x", "y", "z", "a", "b", "c", "dt",
];

/// Start point, step size and coefficients `kind` runs with when the query
/// does not set its own.
fn system_defaults(kind: SystemKind) -> GeneratorParams {
    let run = RunParams::defaults(kind);
    let base = GeneratorParams::new()
        .with("x", run.initial.x)
        .with("y", run.initial.y)
        .with("z", run.initial.z)
        .with("dt", run.dt);
    match run.system {
        System::Lorenz { a, b, c } => base.with("a", a).with("b", b).with("c", c),
        System::Halvorsen { a } => base.with("a", a),
        System::Sprott { a, b } => base.with("a", a).with("b", b),
        System::Thomas { b } => base.with("b", b),
        System::Quadratic(_) => base,
    }
}

pub struct AttractorPlot;

impl AttractorPlot {
    /// The piece defaults are Lorenz values. For any other system, keys
    /// that are missing or still at those values take the system's own.
    fn effective_params(&self, params: &GeneratorParams) -> Result<GeneratorParams> {
        let kind: SystemKind = params.parse("attractor")?;
        let plot_defaults = self.defaults();
        let mut effective = params.clone();
        for (key, value) in system_defaults(kind).iter() {
            let current = params.get(key);
            if current.is_none() || current == plot_defaults.get(key) {
                effective.insert(key, value.clone());
            }
        }
        Ok(effective)
    }
}

impl Piece for AttractorPlot {
    fn name(&self) -> &'static str {
        "attractor-plot"
    }

    fn defaults(&self) -> GeneratorParams {
        GeneratorParams::new()
            .with("attractor", SystemKind::Lorenz.name())
            .with("pointCount", 10_000.0)
            .with("offset", 0.0)
            .with("projection", "xy")
            .with("x", 0.1)
            .with("y", 0.0)
            .with("z", -1.0)
            .with("a", 10.0)
            .with("b", 28.0)
            .with("c", 8.0 / 3.0)
            .with("dt", 0.003)
    }

    fn render(&self, params: &GeneratorParams, ctx: &RenderContext) -> Result<String> {
        let run = RunParams::from_params(&self.effective_params(params)?)?;
        let axes: AxisPair = params.parse("projection")?;
        let points = ctx.integrator.run(&run)?;
        let bounds = Bounds::compute(points.as_slice(), axes)?;

        info!(
            attractor = %run.system.kind(),
            points = points.len(),
            width = bounds.width(),
            height = bounds.height(),
            "plotted attractor"
        );

        let stroke_width = bounds.width().min(bounds.height()) * ctx.stroke_ratio;
        let view_box = format!(
            "{} {} {} {}",
            bounds.horizontal.min,
            bounds.vertical.min,
            bounds.width(),
            bounds.height()
        );
        let path = format!(
            r##"<path d="{}" fill="none" stroke="#121212" stroke-width="{}"/>"##,
            path_data(points.as_slice(), axes),
            stroke_width
        );
        Ok(wrap_svg(ctx, Some(view_box), None, &path))
    }

    /// Re-draws the start point within `[-1, 1]` on each axis.
    fn randomize(&self, params: &GeneratorParams, seed: Option<&Seed>) -> Result<GeneratorParams> {
        let mut rng = source_for(seed);
        let mut draw = || truncate_float(map_range(rng.next_f64(), 0.0, 1.0, -1.0, 1.0));
        Ok(params
            .clone()
            .with("x", draw())
            .with("y", draw())
            .with("z", draw()))
    }

    fn artifact_name(&self, params: &GeneratorParams) -> String {
        let values: Vec<String> = DECLARED_KEYS
            .iter()
            .filter_map(|key| params.get(key))
            .map(|v| v.to_string())
            .collect();
        format!("lorenz-attractor_{}.{}", values.join("_"), self.extension())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ChaosError;

    fn small() -> GeneratorParams {
        AttractorPlot.defaults().updated("pointCount", 200.0)
    }

    #[test]
    fn path_has_one_segment_per_point() {
        let svg = AttractorPlot.render(&small(), &RenderContext::default()).unwrap();
        assert_eq!(svg.matches(" L ").count(), 199);
        assert!(svg.contains(r#"<path d="M "#));
        assert!(svg.contains(r#"fill="none""#));
    }

    #[test]
    fn every_flow_renders() {
        for kind in ["lorenz", "halvorsen", "sprott", "thomas"] {
            let params = small().updated("attractor", kind).updated("dt", 0.001);
            assert!(AttractorPlot.render(&params, &RenderContext::default()).is_ok(), "{}", kind);
        }
    }

    #[test]
    fn unsupported_attractor_fails() {
        let params = small().updated("attractor", "rossler");
        assert_eq!(
            AttractorPlot.render(&params, &RenderContext::default()),
            Err(ChaosError::UnsupportedSystem("rossler".into()))
        );
    }

    #[test]
    fn bad_projection_fails() {
        let params = small().updated("projection", "xx");
        assert!(matches!(
            AttractorPlot.render(&params, &RenderContext::default()),
            Err(ChaosError::InvalidAxisPair(_))
        ));
    }

    #[test]
    fn text_coefficient_is_a_config_error() {
        let params = small().updated("a", "ten");
        assert!(matches!(
            AttractorPlot.render(&params, &RenderContext::default()),
            Err(ChaosError::InvalidParam { .. })
        ));
    }

    #[test]
    fn randomize_only_moves_the_start() {
        let defaults = AttractorPlot.defaults();
        let next = AttractorPlot.randomize(&defaults, Some(&Seed::from("s"))).unwrap();
        for key in ["x", "y", "z"] {
            let v = next.number(key).unwrap();
            assert!((-1.0..=1.0).contains(&v));
        }
        assert_eq!(next.get("a"), defaults.get("a"));
        assert_eq!(next.get("attractor"), defaults.get("attractor"));
    }

    #[test]
    fn thomas_runs_from_its_own_defaults() {
        let params = AttractorPlot.resolve("attractor=thomas&pointCount=2000");
        let effective = AttractorPlot.effective_params(&params).unwrap();
        assert_eq!(effective.number("b").unwrap(), 0.2);
        assert_eq!(effective.number("dt").unwrap(), 0.2);
        assert_eq!(effective.number("x").unwrap(), 1.1);

        let run = RunParams::from_params(&effective).unwrap();
        let points = RenderContext::default().integrator.run(&run).unwrap();
        let bounds = Bounds::compute(points.as_slice(), AxisPair::XY).unwrap();
        assert!(bounds.width() > 1.0 && bounds.height() > 1.0, "{:?}", bounds);
        assert!(AttractorPlot.render(&params, &RenderContext::default()).is_ok());
    }

    #[test]
    fn explicit_coefficients_win_over_system_defaults() {
        let params = AttractorPlot.resolve("attractor=thomas&b=0.18&dt=0.1");
        let effective = AttractorPlot.effective_params(&params).unwrap();
        assert_eq!(effective.number("b").unwrap(), 0.18);
        assert_eq!(effective.number("dt").unwrap(), 0.1);
        assert_eq!(effective.number("z").unwrap(), -0.01);

        let lorenz = AttractorPlot.defaults();
        assert_eq!(AttractorPlot.effective_params(&lorenz).unwrap(), lorenz);
    }

    #[test]
    fn artifact_name_follows_declaration_order() {
        assert_eq!(
            AttractorPlot.artifact_name(&AttractorPlot.defaults()),
            "lorenz-attractor_lorenz_10000_0_xy_0.1_0_-1_10_28_2.6666666666666665_0.003.svg"
        );
    }

    #[test]
    fn artifact_name_joins_values() {
        let params = GeneratorParams::new().with("a", 10.0).with("b", "xy");
        assert_eq!(AttractorPlot.artifact_name(&params), "lorenz-attractor_10_xy.svg");
    }
}
