//! Configuration loading for chaosforge.
//!
//! Configuration is loaded from TOML files with environment variable overrides.

use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::Path;

use crate::attractor::{Integrator, DEFAULT_MAX_STEPS};
use crate::pieces::RenderContext;
use crate::state::EncodePolicy;

pub const DEFAULT_CONFIG_FILE: &str = "config.default.toml";

pub const ENV_PREFIX: &str = "CHAOSFORGE";

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ChaosConfig {
    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub generation: GenerationConfig,

    #[serde(default)]
    pub render: RenderConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_directory")]
    pub directory: String,

    #[serde(default = "default_width")]
    pub width: u32,

    #[serde(default = "default_height")]
    pub height: u32,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_directory(),
            width: default_width(),
            height: default_height(),
        }
    }
}

fn default_directory() -> String {
    "output".to_string()
}

fn default_width() -> u32 {
    512
}

fn default_height() -> u32 {
    512
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerationConfig {
    /// Upper bound on integration steps and scattered points per render.
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,

    #[serde(default)]
    pub encode_policy: EncodePolicy,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
            encode_policy: EncodePolicy::default(),
        }
    }
}

fn default_max_steps() -> usize {
    DEFAULT_MAX_STEPS
}

#[derive(Debug, Clone, Deserialize)]
pub struct RenderConfig {
    #[serde(default = "default_margin_ratio")]
    pub margin_ratio: f64,

    #[serde(default = "default_stroke_ratio")]
    pub stroke_ratio: f64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            margin_ratio: default_margin_ratio(),
            stroke_ratio: default_stroke_ratio(),
        }
    }
}

fn default_margin_ratio() -> f64 {
    0.1
}

fn default_stroke_ratio() -> f64 {
    0.001
}

impl ChaosConfig {
    /// Layers `config.default.toml`, then `path`, then `CHAOSFORGE__*`
    /// variables (e.g. `CHAOSFORGE__OUTPUT__WIDTH=1024`). Missing files are
    /// skipped; malformed ones are an error.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let config = Config::builder()
            .add_source(File::with_name(DEFAULT_CONFIG_FILE).required(false))
            .add_source(File::from(path).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;

        let chaos_config: ChaosConfig = config.try_deserialize()?;
        Ok(chaos_config)
    }

    /// Canvas size falls back to the configured output size.
    pub fn render_context(&self, width: Option<u32>, height: Option<u32>) -> RenderContext {
        RenderContext {
            width: width.unwrap_or(self.output.width),
            height: height.unwrap_or(self.output.height),
            stroke_ratio: self.render.stroke_ratio,
            margin_ratio: self.render.margin_ratio,
            integrator: Integrator::new(self.generation.max_steps),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn missing_file_gives_defaults() {
        let config = ChaosConfig::load(Path::new("does-not-exist.toml")).unwrap();
        assert_eq!(config.output.width, 512);
        assert_eq!(config.generation.max_steps, DEFAULT_MAX_STEPS);
        assert_eq!(config.generation.encode_policy, EncodePolicy::Sparse);
        assert_eq!(config.render.margin_ratio, 0.1);
    }

    #[test]
    fn file_overrides_defaults() {
        let dir = std::env::temp_dir().join(format!("chaosforge-config-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("chaosforge.toml");
        fs::write(
            &path,
            r#"
[output]
directory = "renders"
width = 1024

[generation]
max_steps = 5000
encode_policy = "full"
"#,
        )
        .unwrap();

        let config = ChaosConfig::load(&path).unwrap();
        assert_eq!(config.output.directory, "renders");
        assert_eq!(config.output.width, 1024);
        assert_eq!(config.output.height, 512);
        assert_eq!(config.generation.max_steps, 5000);
        assert_eq!(config.generation.encode_policy, EncodePolicy::Full);

        let ctx = config.render_context(None, Some(300));
        assert_eq!((ctx.width, ctx.height), (1024, 300));
        assert_eq!(ctx.integrator.max_steps, 5000);

        fs::remove_dir_all(&dir).unwrap();
    }
}
