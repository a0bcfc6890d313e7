//! Rarity-weighted trait sampling.
//!
//! A trait table is a list of named variants, each with a non-negative
//! rarity weight. Variants are ordered by ascending rarity and a single
//! uniform draw `u` picks the first variant whose running rarity sum
//! exceeds `u`. Rare variants therefore sit in a thin band near zero and
//! the last, usually weight-1, variant takes whatever is left.

use std::fmt;
use tracing::debug;

use crate::error::{ChaosError, Result};
use crate::rng::{map_range, truncate_float, UniformSource};
use crate::state::GeneratorParams;

type ValueFn<V> = Box<dyn Fn(&mut dyn UniformSource) -> V>;

/// One named variant of a trait. Its value is materialized on selection and
/// may consume further draws from the same stream.
pub struct TraitVariant<V> {
    pub name: String,
    pub rarity: f64,
    value: ValueFn<V>,
}

impl<V> TraitVariant<V> {
    pub fn new(
        name: impl Into<String>,
        rarity: f64,
        value: impl Fn(&mut dyn UniformSource) -> V + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            rarity,
            value: Box::new(value),
        }
    }
}

impl<V: Clone + 'static> TraitVariant<V> {
    /// A variant whose value does not depend on the stream.
    pub fn fixed(name: impl Into<String>, rarity: f64, value: V) -> Self {
        Self::new(name, rarity, move |_| value.clone())
    }
}

impl<V> fmt::Debug for TraitVariant<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TraitVariant")
            .field("name", &self.name)
            .field("rarity", &self.rarity)
            .finish_non_exhaustive()
    }
}

/// Outcome of one sampling call.
#[derive(Debug, Clone, PartialEq)]
pub struct TraitSelection<V> {
    pub name: String,
    pub value: V,
}

/// Variants sorted by ascending rarity with precomputed cumulative sums.
#[derive(Debug)]
pub struct TraitTable<V> {
    variants: Vec<TraitVariant<V>>,
    thresholds: Vec<f64>,
}

impl<V> TraitTable<V> {
    /// Validates and sorts the variants.
    ///
    /// Every rarity must be finite and non-negative, and the total must
    /// reach 1 so that any draw in `[0, 1)` lands on some variant. Equal
    /// rarities keep their given order.
    pub fn new(mut variants: Vec<TraitVariant<V>>) -> Result<Self> {
        if variants.is_empty() {
            return Err(ChaosError::InvalidTraitTable("table has no variants".into()));
        }
        if let Some(bad) = variants
            .iter()
            .find(|v| !v.rarity.is_finite() || v.rarity < 0.0)
        {
            return Err(ChaosError::InvalidTraitTable(format!(
                "variant {:?} has rarity {}",
                bad.name, bad.rarity
            )));
        }

        variants.sort_by(|a, b| a.rarity.total_cmp(&b.rarity));
        let thresholds: Vec<f64> = variants
            .iter()
            .scan(0.0, |sum, v| {
                *sum += v.rarity;
                Some(*sum)
            })
            .collect();

        let total = thresholds.last().copied().unwrap_or(0.0);
        if total < 1.0 {
            return Err(ChaosError::InvalidTraitTable(format!(
                "rarities sum to {}, some draws in [0, 1) would select nothing",
                total
            )));
        }

        Ok(Self {
            variants,
            thresholds,
        })
    }

    pub fn variants(&self) -> &[TraitVariant<V>] {
        &self.variants
    }

    /// Cumulative rarity after each variant, in sorted order.
    pub fn thresholds(&self) -> &[f64] {
        &self.thresholds
    }

    /// The first variant whose cumulative rarity exceeds `u`. A draw past
    /// the total falls to the last variant.
    pub fn select(&self, u: f64) -> &TraitVariant<V> {
        let idx = self.thresholds.partition_point(|t| *t <= u);
        &self.variants[idx.min(self.variants.len() - 1)]
    }

    /// Draws `u`, selects a variant, then lets it materialize its value from
    /// the same stream.
    pub fn sample<R: UniformSource>(&self, rng: &mut R) -> TraitSelection<V> {
        let u = rng.next_f64();
        let variant = self.select(u);
        debug!(variant = %variant.name, u, "trait selected");
        TraitSelection {
            name: variant.name.clone(),
            value: (variant.value)(rng),
        }
    }
}

/// Converts HSV (hue in degrees, saturation and value in `[0, 1]`) to a
/// `#rrggbb` string.
pub fn hsv_to_hex(h: f64, s: f64, v: f64) -> String {
    let h = ((h % 360.0) + 360.0) % 360.0;

    let c = v * s;
    let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
    let m = v - c;

    let (r, g, b) = if h < 60.0 {
        (c, x, 0.0)
    } else if h < 120.0 {
        (x, c, 0.0)
    } else if h < 180.0 {
        (0.0, c, x)
    } else if h < 240.0 {
        (0.0, x, c)
    } else if h < 300.0 {
        (x, 0.0, c)
    } else {
        (c, 0.0, x)
    };

    let to_byte = |channel: f64| ((channel + m) * 255.0).round().clamp(0.0, 255.0) as u8;
    format!("#{:02x}{:02x}{:02x}", to_byte(r), to_byte(g), to_byte(b))
}

/// `n` evenly spaced hues starting at `offset * hue_max`, rounded to whole
/// degrees.
pub fn hue_divisions(offset: f64, n: usize, hue_max: f64) -> Vec<f64> {
    let inc = hue_max / n as f64;
    (0..n)
        .map(|i| ((offset * hue_max + i as f64 * inc) % hue_max).round())
        .collect()
}

fn saturated(hues: Vec<f64>) -> Vec<String> {
    hues.into_iter().map(|h| hsv_to_hex(h, 1.0, 1.0)).collect()
}

pub fn complementary(offset: f64) -> Vec<String> {
    saturated(hue_divisions(offset, 2, 360.0))
}

pub fn triadic(offset: f64) -> Vec<String> {
    saturated(hue_divisions(offset, 3, 360.0))
}

pub fn analogous(offset: f64) -> Vec<String> {
    saturated(hue_divisions(offset, 12, 360.0))
}

/// Black then white, or white then black from `offset >= 0.5`.
pub fn black_white(offset: f64) -> Vec<String> {
    let mut bw = vec!["#000000".to_string(), "#ffffff".to_string()];
    if offset >= 0.5 {
        bw.reverse();
    }
    bw
}

/// The variant names picked by one randomization, in draw order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureReport {
    pub picks: Vec<(&'static str, String)>,
}

impl FeatureReport {
    fn record(&mut self, feature: &'static str, name: &str) {
        self.picks.push((feature, name.to_string()));
    }

    pub fn get(&self, feature: &str) -> Option<&str> {
        self.picks
            .iter()
            .find(|(f, _)| *f == feature)
            .map(|(_, name)| name.as_str())
    }
}

/// Trait tables for the squircle piece: palette, paper/ink colors,
/// density, rotation style and strength, and corner radius behavior.
pub struct SquircleFeatures;

impl SquircleFeatures {
    pub fn density() -> Result<TraitTable<f64>> {
        TraitTable::new(vec![
            TraitVariant::new("High", 1.0 / 30.0, |r| {
                map_range(r.next_f64(), 0.0, 1.0, 51.0, 100.0).round()
            }),
            TraitVariant::new("Medium", 1.0 / 10.0, |r| {
                map_range(r.next_f64(), 0.0, 1.0, 31.0, 50.0).round()
            }),
            TraitVariant::new("Low", 1.0, |r| {
                map_range(r.next_f64(), 0.0, 1.0, 10.0, 30.0).round()
            }),
        ])
    }

    pub fn rotation() -> Result<TraitTable<&'static str>> {
        TraitTable::new(vec![
            TraitVariant::fixed("Noisy", 1.0 / 30.0, "noise"),
            TraitVariant::fixed("Linear", 2.0 / 5.0, "linear"),
            TraitVariant::fixed("Sinusoid", 2.0 / 5.0, "sin"),
            TraitVariant::fixed("None", 1.0, "none"),
        ])
    }

    pub fn rotation_strength() -> Result<TraitTable<f64>> {
        let tau = std::f64::consts::TAU;
        TraitTable::new(vec![
            TraitVariant::new("High", 1.0 / 10.0, move |r| {
                tau / map_range(r.next_f64(), 0.0, 1.0, 30.0, 60.0)
            }),
            TraitVariant::new("Medium", 1.0 / 5.0, move |r| {
                tau / map_range(r.next_f64(), 0.0, 1.0, 60.0, 120.0)
            }),
            TraitVariant::new("Low", 1.0, move |r| {
                tau / map_range(r.next_f64(), 0.0, 1.0, 120.0, 360.0)
            }),
        ])
    }

    pub fn radius() -> Result<TraitTable<&'static str>> {
        TraitTable::new(vec![
            TraitVariant::fixed("Linear", 2.0 / 5.0, "linear"),
            TraitVariant::fixed("None", 1.0, "none"),
        ])
    }

    pub fn palette(offset: f64) -> Result<TraitTable<Vec<String>>> {
        TraitTable::new(vec![
            TraitVariant::new("Complementary", 1.0 / 3.0, move |_| complementary(offset)),
            TraitVariant::new("Analogous", 1.0 / 3.0, move |_| analogous(offset)),
            TraitVariant::new("Triadic", 1.0, move |_| triadic(offset)),
        ])
    }

    /// Paper and ink draw from this same table so their colors stay related.
    pub fn color(offset: f64, palette: Vec<String>) -> Result<TraitTable<Vec<String>>> {
        TraitTable::new(vec![
            TraitVariant::new("Black & White", 1.0 / 2.0, move |_| black_white(offset)),
            TraitVariant::fixed("Color", 1.0 / 2.0, palette),
        ])
    }

    /// Samples every feature and returns a new parameter snapshot built on
    /// `base`. `base` itself is not modified.
    pub fn randomize<R: UniformSource>(
        base: &GeneratorParams,
        rng: &mut R,
    ) -> Result<(GeneratorParams, FeatureReport)> {
        let mut report = FeatureReport::default();

        let palette_offset = rng.next_f64();
        let palette = Self::palette(palette_offset)?.sample(rng);
        report.record("palette", &palette.name);

        let colors = Self::color(palette_offset, palette.value)?;
        let paper = colors.sample(rng);
        report.record("paper", &paper.name);
        let ink = colors.sample(rng);
        report.record("ink", &ink.name);

        let density = Self::density()?.sample(rng);
        report.record("density", &density.name);

        let rotation = Self::rotation()?.sample(rng);
        report.record("rotation", &rotation.name);
        let strength = if rotation.value != "none" {
            Self::rotation_strength()?.sample(rng)
        } else {
            TraitSelection {
                name: "None".to_string(),
                value: 0.0,
            }
        };
        report.record("rotationStrength", &strength.name);

        let radius = Self::radius()?.sample(rng);
        report.record("radius", &radius.name);

        let noise_seed = map_range(rng.next_f64(), 0.0, 1.0, 0.0, 10_000.0).floor();
        let rotate_reverse = rng.next_f64() > 0.5;

        let params = base
            .clone()
            .with("noiseSeed", noise_seed)
            .with("lineCount", density.value)
            .with("rotateFn", rotation.value)
            .with("rotateInc", truncate_float(strength.value))
            .with("rotateReverse", rotate_reverse)
            .with("radiusFn", radius.value)
            .with("background", paper.value[0].clone())
            .with("stroke", ink.value[1].clone());

        Ok((params, report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::{Lcg, LcgPreset, NumericalRecipes};

    /// Replays fixed draws.
    struct Scripted {
        draws: Vec<f64>,
        pos: usize,
    }

    impl Scripted {
        fn new(draws: &[f64]) -> Self {
            Self {
                draws: draws.to_vec(),
                pos: 0,
            }
        }
    }

    impl UniformSource for Scripted {
        fn next_f64(&mut self) -> f64 {
            let v = self.draws[self.pos];
            self.pos += 1;
            v
        }
    }

    fn three_tier() -> TraitTable<&'static str> {
        TraitTable::new(vec![
            TraitVariant::fixed("Low", 1.0, "low"),
            TraitVariant::fixed("High", 1.0 / 30.0, "high"),
            TraitVariant::fixed("Medium", 1.0 / 10.0, "medium"),
        ])
        .unwrap()
    }

    #[test]
    fn variants_are_sorted_by_rarity() {
        let table = three_tier();
        let names: Vec<&str> = table.variants().iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, ["High", "Medium", "Low"]);
        let t = table.thresholds();
        assert!((t[0] - 1.0 / 30.0).abs() < 1e-12);
        assert!((t[1] - (1.0 / 30.0 + 0.1)).abs() < 1e-12);
        assert!((t[2] - (1.0 / 30.0 + 0.1 + 1.0)).abs() < 1e-12);
    }

    #[test]
    fn first_threshold_exceeding_the_draw_wins() {
        let table = three_tier();
        assert_eq!(table.select(0.05).name, "Medium");
        assert_eq!(table.select(0.02).name, "High");
        assert_eq!(table.select(0.5).name, "Low");
        assert_eq!(table.select(0.999_999).name, "Low");
        assert_eq!(table.select(0.0).name, "High");
        assert_eq!(table.select(5.0).name, "Low");
    }

    #[test]
    fn sample_passes_the_stream_to_the_value() {
        let table = SquircleFeatures::density().unwrap();
        let picked = table.sample(&mut Scripted::new(&[0.05, 0.0]));
        assert_eq!(picked, TraitSelection { name: "Medium".into(), value: 31.0 });
        let picked = table.sample(&mut Scripted::new(&[0.9, 1.0]));
        assert_eq!(picked, TraitSelection { name: "Low".into(), value: 30.0 });
    }

    #[test]
    fn tables_that_cannot_cover_the_unit_interval_fail() {
        let short = TraitTable::new(vec![
            TraitVariant::fixed("A", 0.3, 1),
            TraitVariant::fixed("B", 0.3, 2),
        ]);
        assert!(matches!(short, Err(ChaosError::InvalidTraitTable(_))));

        let negative = TraitTable::new(vec![
            TraitVariant::fixed("A", -0.1, 1),
            TraitVariant::fixed("B", 2.0, 2),
        ]);
        assert!(matches!(negative, Err(ChaosError::InvalidTraitTable(_))));

        let nan = TraitTable::new(vec![TraitVariant::fixed("A", f64::NAN, 1)]);
        assert!(matches!(nan, Err(ChaosError::InvalidTraitTable(_))));

        let empty: Result<TraitTable<i32>> = TraitTable::new(vec![]);
        assert!(matches!(empty, Err(ChaosError::InvalidTraitTable(_))));
    }

    #[test]
    fn total_of_exactly_one_is_enough() {
        let table = SquircleFeatures::color(0.2, vec!["#f00".into(), "#0f0".into()]).unwrap();
        assert_eq!(table.select(0.999_999).name, "Color");
        assert_eq!(table.select(0.2).name, "Black & White");
    }

    #[test]
    fn every_builtin_table_is_valid() {
        assert!(SquircleFeatures::density().is_ok());
        assert!(SquircleFeatures::rotation().is_ok());
        assert!(SquircleFeatures::rotation_strength().is_ok());
        assert!(SquircleFeatures::radius().is_ok());
        assert!(SquircleFeatures::palette(0.4).is_ok());
    }

    #[test]
    fn sampling_is_reproducible_with_a_seeded_stream() {
        let table = SquircleFeatures::rotation_strength().unwrap();
        let a: Vec<_> = {
            let mut rng = NumericalRecipes::new(99);
            (0..50).map(|_| table.sample(&mut rng)).collect()
        };
        let b: Vec<_> = {
            let mut rng = NumericalRecipes::new(99);
            (0..50).map(|_| table.sample(&mut rng)).collect()
        };
        assert_eq!(a, b);
    }

    #[test]
    fn palettes() {
        assert_eq!(hue_divisions(0.1, 3, 360.0), vec![36.0, 156.0, 276.0]);
        assert_eq!(hsv_to_hex(0.0, 1.0, 1.0), "#ff0000");
        assert_eq!(hsv_to_hex(120.0, 1.0, 1.0), "#00ff00");
        assert_eq!(hsv_to_hex(240.0, 1.0, 1.0), "#0000ff");
        assert_eq!(hsv_to_hex(360.0, 1.0, 1.0), "#ff0000");
        assert_eq!(hsv_to_hex(0.0, 0.0, 0.0), "#000000");
        assert_eq!(complementary(0.0), vec!["#ff0000", "#00ffff"]);
        assert_eq!(analogous(0.5).len(), 12);
        assert_eq!(black_white(0.2), vec!["#000000", "#ffffff"]);
        assert_eq!(black_white(0.5), vec!["#ffffff", "#000000"]);
    }

    #[test]
    fn randomize_follows_the_draw_order() {
        let base = GeneratorParams::new().with("thickness", 2.0);
        let mut rng = Scripted::new(&[
            0.1,  // palette offset
            0.9,  // palette -> Triadic
            0.2,  // paper -> Black & White
            0.7,  // ink -> Color
            0.5,  // density -> Low
            0.5,  // density value -> 20
            0.99, // rotation -> None
            0.1,  // radius -> Linear
            0.5,  // noise seed -> 5000
            0.7,  // reverse
        ]);
        let (params, report) = SquircleFeatures::randomize(&base, &mut rng).unwrap();

        assert_eq!(report.get("palette"), Some("Triadic"));
        assert_eq!(report.get("paper"), Some("Black & White"));
        assert_eq!(report.get("ink"), Some("Color"));
        assert_eq!(report.get("density"), Some("Low"));
        assert_eq!(report.get("rotation"), Some("None"));
        assert_eq!(report.get("rotationStrength"), Some("None"));
        assert_eq!(report.get("radius"), Some("Linear"));

        assert_eq!(params.number("lineCount").unwrap(), 20.0);
        assert_eq!(params.text("rotateFn").unwrap(), "none");
        assert_eq!(params.number("rotateInc").unwrap(), 0.0);
        assert_eq!(params.text("radiusFn").unwrap(), "linear");
        assert_eq!(params.number("noiseSeed").unwrap(), 5000.0);
        assert!(params.boolean("rotateReverse").unwrap());
        assert_eq!(params.text("background").unwrap(), "#000000");
        assert_eq!(params.text("stroke").unwrap(), "#00ff99");
        assert_eq!(params.number("thickness").unwrap(), 2.0);
        assert!(!base.contains_key("lineCount"));
    }

    #[test]
    fn rotation_strength_only_when_rotating() {
        for seed in 1..200 {
            let mut rng = Lcg::new(LcgPreset::JavaRandom, seed);
            let (params, _) = SquircleFeatures::randomize(&GeneratorParams::new(), &mut rng).unwrap();
            let count = params.number("lineCount").unwrap();
            assert!((10.0..=100.0).contains(&count));
            let inc = params.number("rotateInc").unwrap();
            if params.text("rotateFn").unwrap() == "none" {
                assert_eq!(inc, 0.0);
            } else {
                let tau = std::f64::consts::TAU;
                assert!(inc >= truncate_float(tau / 360.0) && inc <= truncate_float(tau / 30.0));
            }
        }
    }
}
