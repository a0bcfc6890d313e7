//! Seeded pseudo-random streams.
//!
//! These generators reproduce specific historical integer recurrences
//! bit-for-bit. None of them are suitable for anything but art: RANDU in
//! particular is famous for placing consecutive triples on 15 planes,
//! which is exactly what the bad-rng piece shows off.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::info;

use crate::error::{ChaosError, Result};

/// Anything that hands out uniform values in `[0, 1)`.
pub trait UniformSource {
    fn next_f64(&mut self) -> f64;
}

impl<T: UniformSource + ?Sized> UniformSource for &mut T {
    fn next_f64(&mut self) -> f64 {
        (**self).next_f64()
    }
}

impl<T: UniformSource + ?Sized> UniformSource for Box<T> {
    fn next_f64(&mut self) -> f64 {
        (**self).next_f64()
    }
}

/// Named linear congruential presets. The `(a, c, m)` triples are fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LcgPreset {
    /// Sinclair ZX81 BASIC `RND`.
    Zx81,
    /// `java.util.Random` recurrence, without the output bit shift.
    JavaRandom,
    /// IBM RANDU.
    Randu,
    /// Hand-picked custom triple.
    Ucodia,
}

impl LcgPreset {
    pub const ALL: [LcgPreset; 4] = [
        LcgPreset::Zx81,
        LcgPreset::JavaRandom,
        LcgPreset::Randu,
        LcgPreset::Ucodia,
    ];

    /// Returns `(a, c, m)`.
    pub const fn coefficients(self) -> (u64, u64, u64) {
        match self {
            LcgPreset::Zx81 => (75, 74, 65_537),
            LcgPreset::JavaRandom => (25_214_903_917, 11, 281_474_976_710_656),
            LcgPreset::Randu => (65_539, 0, 2_147_483_648),
            LcgPreset::Ucodia => (1597, 51_749, 244_944),
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            LcgPreset::Zx81 => "ZX81",
            LcgPreset::JavaRandom => "JavaRandom",
            LcgPreset::Randu => "RANDU",
            LcgPreset::Ucodia => "Ucodia",
        }
    }
}

impl fmt::Display for LcgPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LcgPreset {
    type Err = ChaosError;

    fn from_str(s: &str) -> Result<Self> {
        LcgPreset::ALL
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| ChaosError::UnknownPreset(s.to_string()))
    }
}

/// Linear congruential generator `z' = (a*z + c) mod m`, yielding `z'/m`.
#[derive(Debug, Clone)]
pub struct Lcg {
    a: u64,
    c: u64,
    m: u64,
    z: u64,
}

impl Lcg {
    pub fn new(preset: LcgPreset, seed: u64) -> Self {
        let (a, c, m) = preset.coefficients();
        Self { a, c, m, z: seed }
    }

    /// Arbitrary triple. A zero modulus is rejected.
    pub fn with_coefficients(a: u64, c: u64, m: u64, seed: u64) -> Result<Self> {
        if m == 0 {
            return Err(ChaosError::InvalidParam {
                key: "m".to_string(),
                expected: "positive modulus",
                found: m.to_string(),
            });
        }
        Ok(Self { a, c, m, z: seed })
    }

    pub fn register(&self) -> u64 {
        self.z
    }

    pub fn next_u64(&mut self) -> u64 {
        // a*z overflows u64 for JavaRandom; widen so the product stays exact.
        let next = (self.a as u128 * self.z as u128 + self.c as u128) % self.m as u128;
        self.z = next as u64;
        self.z
    }
}

impl UniformSource for Lcg {
    fn next_f64(&mut self) -> f64 {
        let z = self.next_u64();
        z as f64 / self.m as f64
    }
}

/// The "quick and dirty" generator from Numerical Recipes,
/// `z' = 1664525*z + 1013904223 (mod 2^32)`.
#[derive(Debug, Clone)]
pub struct NumericalRecipes {
    z: u32,
}

impl NumericalRecipes {
    const A: u32 = 1_664_525;
    const C: u32 = 1_013_904_223;
    const M: f64 = 4_294_967_296.0;

    pub fn new(seed: u32) -> Self {
        Self { z: seed }
    }

    pub fn next_u32(&mut self) -> u32 {
        self.z = self.z.wrapping_mul(Self::A).wrapping_add(Self::C);
        self.z
    }
}

impl UniformSource for NumericalRecipes {
    fn next_f64(&mut self) -> f64 {
        self.next_u32() as f64 / Self::M
    }
}

/// Adapts any `rand` generator, for places where reproducibility is not wanted.
#[derive(Debug, Clone)]
pub struct RandSource<R: Rng>(pub R);

impl<R: Rng> UniformSource for RandSource<R> {
    fn next_f64(&mut self) -> f64 {
        self.0.gen::<f64>()
    }
}

/// Which recurrence a stream runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StreamKind {
    Lcg(LcgPreset),
    NumericalRecipes,
}

/// A stream created from a `(kind, seed)` pair. Owns its register; two
/// streams never share state.
#[derive(Debug, Clone)]
pub enum RandomStream {
    Lcg(Lcg),
    NumericalRecipes(NumericalRecipes),
}

impl RandomStream {
    pub fn new(kind: StreamKind, seed: &Seed) -> Self {
        let register = seed.to_register();
        match kind {
            StreamKind::Lcg(preset) => RandomStream::Lcg(Lcg::new(preset, register)),
            // The 32-bit recurrence only ever sees the low word.
            StreamKind::NumericalRecipes => {
                RandomStream::NumericalRecipes(NumericalRecipes::new(register as u32))
            }
        }
    }
}

impl UniformSource for RandomStream {
    fn next_f64(&mut self) -> f64 {
        match self {
            RandomStream::Lcg(lcg) => lcg.next_f64(),
            RandomStream::NumericalRecipes(nr) => nr.next_f64(),
        }
    }
}

/// Seeded mode runs the Numerical Recipes stream from `seed`; unseeded mode
/// draws from the thread-local `rand` generator and is not reproducible.
pub fn source_for(seed: Option<&Seed>) -> Box<dyn UniformSource> {
    match seed {
        Some(seed) => Box::new(RandomStream::new(StreamKind::NumericalRecipes, seed)),
        None => Box::new(RandSource(rand::thread_rng())),
    }
}

/// Java-style string hash: `h = 31*h + ch` over UTF-16 code units, wrapping
/// in signed 32-bit arithmetic.
pub fn hash_seed(text: &str) -> i32 {
    text.encode_utf16()
        .fold(0i32, |h, ch| h.wrapping_mul(31).wrapping_add(ch as i32))
}

/// A generation seed, either typed in as text or given as an integer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Seed {
    Text(String),
    Int(u64),
}

impl Seed {
    const ALPHABET: &'static [u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

    /// Unseeded mode: a fresh 9-character base-36 seed.
    pub fn random() -> Self {
        let mut rng = rand::thread_rng();
        let text: String = (0..9)
            .map(|_| Self::ALPHABET[rng.gen_range(0..Self::ALPHABET.len())] as char)
            .collect();
        info!(seed = %text, "generated unseeded run seed");
        Seed::Text(text)
    }

    /// Integer register for integer-based generators. Text seeds are hashed
    /// and the magnitude is taken.
    pub fn to_register(&self) -> u64 {
        match self {
            Seed::Text(text) => hash_seed(text).unsigned_abs() as u64,
            Seed::Int(n) => *n,
        }
    }
}

impl fmt::Display for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Seed::Text(text) => f.write_str(text),
            Seed::Int(n) => write!(f, "{}", n),
        }
    }
}

impl From<&str> for Seed {
    fn from(text: &str) -> Self {
        Seed::Text(text.to_string())
    }
}

impl From<u64> for Seed {
    fn from(n: u64) -> Self {
        Seed::Int(n)
    }
}

/// Maps `value` from `[lo0, hi0]` onto `[lo1, hi1]`, unclamped.
pub fn map_range(value: f64, lo0: f64, hi0: f64, lo1: f64, hi1: f64) -> f64 {
    lo1 + (value - lo0) / (hi0 - lo0) * (hi1 - lo1)
}

/// Rounds to four decimal places through a decimal string, so stored
/// parameters read back identically from a query string.
pub fn truncate_float(value: f64) -> f64 {
    format!("{:.4}", value).parse().unwrap_or(value)
}
