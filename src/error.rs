use thiserror::Error;

pub type Result<T> = std::result::Result<T, ChaosError>;

#[derive(Debug, Error, PartialEq)]
pub enum ChaosError {
    #[error("unsupported system: {0}")]
    UnsupportedSystem(String),

    #[error("unknown rng preset: {0}")]
    UnknownPreset(String),

    #[error("unknown projection mode: {0}")]
    UnknownProjection(String),

    #[error("invalid axis pair: {0} (expected two distinct axes out of x, y, z)")]
    InvalidAxisPair(String),

    #[error("missing parameter: {0}")]
    MissingParam(String),

    #[error("parameter {key} expected {expected}, found {found:?}")]
    InvalidParam {
        key: String,
        expected: &'static str,
        found: String,
    },

    #[error("invalid trait table: {0}")]
    InvalidTraitTable(String),

    #[error("requested {requested} steps, limit is {max}")]
    StepsExceeded { requested: usize, max: usize },

    #[error("cannot compute bounds of an empty point sequence")]
    EmptySequence,

    #[error("generation cancelled")]
    Cancelled,

    #[error("unknown piece: {0}")]
    UnknownPiece(String),
}
