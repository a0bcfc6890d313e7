//! chaosforge - deterministic generative art.
//!
//! Pieces are pure functions of a parameter snapshot: the same query string
//! and seed always give the same SVG. The building blocks are a handful of
//! historical random number generators, a fixed-step attractor integrator,
//! a rarity-weighted trait sampler and a query-string codec for sharing
//! parameter sets.

pub mod attractor;
pub mod bounds;
pub mod config;
pub mod error;
pub mod features;
pub mod pieces;
pub mod projection;
pub mod rng;
pub mod state;

pub use attractor::{integrate, Integrator, Point, PointSequence, RunParams, System};
pub use bounds::{compute_bounds, AxisPair, Bounds};
pub use config::ChaosConfig;
pub use error::{ChaosError, Result};
pub use features::{TraitTable, TraitVariant};
pub use pieces::Piece;
pub use projection::{project, ProjectionMode};
pub use rng::{hash_seed, Lcg, LcgPreset, Seed, UniformSource};
pub use state::{decode, encode, EncodePolicy, GeneratorParams, ParamValue};
