//! Flat parameter sets and their query-string form.
//!
//! A piece's whole configuration is one `GeneratorParams` snapshot. It can
//! be written out as a URL query string and read back with types inferred
//! from the text, so a share link reproduces the piece exactly.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{ChaosError, Result};

/// A single typed parameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Number(f64),
    Bool(bool),
    Text(String),
    /// A decimal whose text an `f64` would not reproduce, such as `0123` or
    /// a 20-digit seed. Reads as a number and writes back as typed.
    Numeral(String),
}

impl ParamValue {
    /// Infers the type of a raw query value: signed decimal first, then a
    /// case-insensitive boolean, otherwise the text itself.
    pub fn infer(raw: &str) -> Self {
        if is_decimal(raw) {
            if let Ok(n) = raw.parse::<f64>() {
                if n.to_string() == raw {
                    return ParamValue::Number(n);
                }
                return ParamValue::Numeral(raw.to_string());
            }
        }
        if raw.eq_ignore_ascii_case("true") {
            ParamValue::Bool(true)
        } else if raw.eq_ignore_ascii_case("false") {
            ParamValue::Bool(false)
        } else {
            ParamValue::Text(raw.to_string())
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            ParamValue::Number(_) | ParamValue::Numeral(_) => "number",
            ParamValue::Bool(_) => "boolean",
            ParamValue::Text(_) => "string",
        }
    }
}

/// `-?\d+(\.\d+)?`
fn is_decimal(raw: &str) -> bool {
    let digits = raw.strip_prefix('-').unwrap_or(raw);
    let (int, frac) = match digits.split_once('.') {
        Some((int, frac)) => (int, Some(frac)),
        None => (digits, None),
    };
    let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    all_digits(int) && frac.map_or(true, all_digits)
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // f64 Display already prints integral values without ".0".
            ParamValue::Number(n) => write!(f, "{}", n),
            ParamValue::Numeral(digits) => f.write_str(digits),
            ParamValue::Bool(b) => write!(f, "{}", b),
            ParamValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for ParamValue {
    fn from(n: f64) -> Self {
        ParamValue::Number(n)
    }
}

impl From<i64> for ParamValue {
    fn from(n: i64) -> Self {
        ParamValue::Number(n as f64)
    }
}

impl From<bool> for ParamValue {
    fn from(b: bool) -> Self {
        ParamValue::Bool(b)
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        ParamValue::Text(s.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(s: String) -> Self {
        ParamValue::Text(s)
    }
}

/// Immutable-by-convention snapshot of a piece's parameters.
///
/// Keys are kept sorted so encoding and hashing are stable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneratorParams {
    values: BTreeMap<String, ParamValue>,
}

impl GeneratorParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: &str, value: impl Into<ParamValue>) -> Self {
        self.values.insert(key.to_string(), value.into());
        self
    }

    /// Returns a copy with `key` replaced; the receiver is left untouched.
    pub fn updated(&self, key: &str, value: impl Into<ParamValue>) -> Self {
        self.clone().with(key, value)
    }

    pub fn insert(&mut self, key: &str, value: impl Into<ParamValue>) {
        self.values.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.values.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    fn require(&self, key: &str) -> Result<&ParamValue> {
        self.values
            .get(key)
            .ok_or_else(|| ChaosError::MissingParam(key.to_string()))
    }

    fn mismatch(key: &str, expected: &'static str, found: &ParamValue) -> ChaosError {
        ChaosError::InvalidParam {
            key: key.to_string(),
            expected,
            found: found.to_string(),
        }
    }

    pub fn number(&self, key: &str) -> Result<f64> {
        let value = self.require(key)?;
        match value {
            ParamValue::Number(n) => Ok(*n),
            ParamValue::Numeral(digits) => digits
                .parse()
                .map_err(|_| Self::mismatch(key, "number", value)),
            other => Err(Self::mismatch(key, "number", other)),
        }
    }

    /// Non-negative integral count, e.g. a step or line count.
    pub fn count(&self, key: &str) -> Result<usize> {
        let n = self.number(key)?;
        if n.is_finite() && n >= 0.0 && n.fract() == 0.0 {
            Ok(n as usize)
        } else {
            Err(Self::mismatch(key, "non-negative integer", &ParamValue::Number(n)))
        }
    }

    pub fn boolean(&self, key: &str) -> Result<bool> {
        match self.require(key)? {
            ParamValue::Bool(b) => Ok(*b),
            other => Err(Self::mismatch(key, "boolean", other)),
        }
    }

    /// Text value. Numbers and booleans are rendered back to text, since a
    /// seed like `123` is inferred as a number on decode.
    pub fn text(&self, key: &str) -> Result<String> {
        Ok(self.require(key)?.to_string())
    }

    /// Parses a text parameter into an enum-like selector.
    pub fn parse<T>(&self, key: &str) -> Result<T>
    where
        T: FromStr<Err = ChaosError>,
    {
        self.text(key)?.parse()
    }

    /// Short hex digest of every key and value. Equal snapshots always give
    /// the same fingerprint.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for (key, value) in &self.values {
            hasher.update(key.as_bytes());
            hasher.update([0u8]);
            hasher.update(value.type_name().as_bytes());
            hasher.update(value.to_string().as_bytes());
            hasher.update([0u8]);
        }
        let hash = hasher.finalize();
        hash[..6].iter().map(|b| format!("{:02x}", b)).collect()
    }

    /// Overlays `self` on `defaults`. Keys unknown to the defaults are kept.
    pub fn resolve(&self, defaults: &GeneratorParams) -> GeneratorParams {
        let mut values = defaults.values.clone();
        values.extend(self.values.iter().map(|(k, v)| (k.clone(), v.clone())));
        GeneratorParams { values }
    }
}

impl<K: Into<String>, V: Into<ParamValue>> FromIterator<(K, V)> for GeneratorParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        GeneratorParams {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Which keys an encoder writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncodePolicy {
    /// Only keys whose value differs from the default. The primary policy.
    #[default]
    Sparse,
    /// Every key.
    Full,
}

impl FromStr for EncodePolicy {
    type Err = ChaosError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "sparse" => Ok(EncodePolicy::Sparse),
            "full" => Ok(EncodePolicy::Full),
            _ => Err(ChaosError::InvalidParam {
                key: "encode_policy".to_string(),
                expected: "sparse or full",
                found: s.to_string(),
            }),
        }
    }
}

/// Writes `params` as an `application/x-www-form-urlencoded` query string
/// without the leading `?`.
pub fn encode(params: &GeneratorParams, defaults: &GeneratorParams, policy: EncodePolicy) -> String {
    let mut out = form_urlencoded::Serializer::new(String::new());
    for (key, value) in params.iter() {
        if policy == EncodePolicy::Sparse && defaults.get(key) == Some(value) {
            continue;
        }
        out.append_pair(key, &value.to_string());
    }
    out.finish()
}

/// Reads a query string, with or without a leading `?`. Decoding is the
/// same whichever policy wrote it.
pub fn decode(query: &str) -> GeneratorParams {
    let query = query.strip_prefix('?').unwrap_or(query);
    form_urlencoded::parse(query.as_bytes())
        .map(|(k, v)| (k.into_owned(), ParamValue::infer(&v)))
        .collect()
}

/// `decode` followed by [`GeneratorParams::resolve`]; omitted keys fall
/// back to their defaults.
pub fn decode_with_defaults(query: &str, defaults: &GeneratorParams) -> GeneratorParams {
    decode(query).resolve(defaults)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn squircle_like() -> GeneratorParams {
        GeneratorParams::new()
            .with("lineCount", 18.0)
            .with("transparent", true)
            .with("background", "#fff")
    }

    #[test]
    fn round_trip_keeps_types() {
        let params = GeneratorParams::new()
            .with("lineCount", 42.0)
            .with("transparent", true)
            .with("background", "#fff");
        let query = encode(&params, &GeneratorParams::new(), EncodePolicy::Sparse);
        let back = decode(&query);
        assert_eq!(back, params);
        assert_eq!(back.get("lineCount"), Some(&ParamValue::Number(42.0)));
        assert_eq!(back.get("transparent"), Some(&ParamValue::Bool(true)));
        assert_eq!(back.get("background"), Some(&ParamValue::Text("#fff".into())));
    }

    #[test]
    fn sparse_omits_defaults_and_resolves_back() {
        let defaults = squircle_like();
        let params = defaults.updated("lineCount", 42.0);
        let query = encode(&params, &defaults, EncodePolicy::Sparse);
        assert_eq!(query, "lineCount=42");
        assert_eq!(decode_with_defaults(&query, &defaults), params);
    }

    #[test]
    fn full_policy_emits_everything() {
        let defaults = squircle_like();
        let query = encode(&defaults, &defaults, EncodePolicy::Full);
        assert_eq!(query, "background=%23fff&lineCount=18&transparent=true");
        assert_eq!(decode(&query), defaults);
    }

    #[test]
    fn inference_order() {
        assert_eq!(ParamValue::infer("-3.25"), ParamValue::Number(-3.25));
        assert_eq!(ParamValue::infer("007"), ParamValue::Numeral("007".into()));
        assert_eq!(ParamValue::infer("1.50"), ParamValue::Numeral("1.50".into()));
        assert_eq!(ParamValue::infer("-0"), ParamValue::Number(-0.0));
        assert_eq!(ParamValue::infer("TRUE"), ParamValue::Bool(true));
        assert_eq!(ParamValue::infer("False"), ParamValue::Bool(false));
        assert_eq!(ParamValue::infer("1e5"), ParamValue::Text("1e5".into()));
        assert_eq!(ParamValue::infer(".5"), ParamValue::Text(".5".into()));
        assert_eq!(ParamValue::infer("5."), ParamValue::Text("5.".into()));
        assert_eq!(ParamValue::infer("-"), ParamValue::Text("-".into()));
        assert_eq!(ParamValue::infer(""), ParamValue::Text("".into()));
    }

    #[test]
    fn fractional_numbers_survive() {
        let params = GeneratorParams::new().with("rotateInc", 0.0524).with("c", 8.0 / 3.0);
        assert_eq!(decode(&encode(&params, &GeneratorParams::new(), EncodePolicy::Full)), params);
    }

    #[test]
    fn unknown_keys_pass_through() {
        let defaults = squircle_like();
        let resolved = decode_with_defaults("?utm_source=mail&lineCount=3", &defaults);
        assert_eq!(resolved.text("utm_source").unwrap(), "mail");
        assert_eq!(resolved.number("lineCount").unwrap(), 3.0);
        assert_eq!(resolved.text("background").unwrap(), "#fff");
    }

    #[test]
    fn non_numeric_string_for_number_is_an_error() {
        let params = decode("lineCount=lots");
        assert_eq!(
            params.number("lineCount"),
            Err(ChaosError::InvalidParam {
                key: "lineCount".into(),
                expected: "number",
                found: "lots".into(),
            })
        );
        assert_eq!(
            params.number("missing"),
            Err(ChaosError::MissingParam("missing".into()))
        );
        assert!(decode("n=2.5").count("n").is_err());
        assert_eq!(decode("n=25").count("n"), Ok(25));
    }

    #[test]
    fn numeric_seed_reads_back_as_text() {
        let params = decode("seed=123");
        assert_eq!(params.text("seed").unwrap(), "123");

        let params = decode("seed=0123&big=12345678901234567890&dt=0.0030");
        assert_eq!(params.text("seed").unwrap(), "0123");
        assert_eq!(params.text("big").unwrap(), "12345678901234567890");
        assert_eq!(params.number("seed").unwrap(), 123.0);
        assert_eq!(params.count("seed").unwrap(), 123);
        assert_eq!(params.number("dt").unwrap(), 0.003);
        assert_eq!(
            encode(&params, &GeneratorParams::new(), EncodePolicy::Full),
            "big=12345678901234567890&dt=0.0030&seed=0123"
        );
    }

    #[test]
    fn fingerprint_tracks_values_and_types() {
        let a = squircle_like();
        assert_eq!(a.fingerprint(), squircle_like().fingerprint());
        assert_eq!(a.fingerprint().len(), 12);
        assert_ne!(a.fingerprint(), a.updated("lineCount", 19.0).fingerprint());
        assert_ne!(
            a.updated("seed", 5.0).fingerprint(),
            a.updated("seed", "5").fingerprint()
        );
    }

    #[test]
    fn spaces_and_symbols_are_escaped() {
        let params = GeneratorParams::new().with("title", "a b&c=d");
        let query = encode(&params, &GeneratorParams::new(), EncodePolicy::Full);
        assert_eq!(query, "title=a+b%26c%3Dd");
        assert_eq!(decode(&query), params);
    }
}
