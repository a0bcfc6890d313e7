//! A piece plus its current parameter snapshot.
//!
//! Edits never touch the live snapshot in place: each one builds a new
//! `GeneratorParams`, swaps it in, and hands it to every observer, which
//! is where a front end hooks regeneration.

use tracing::debug;

use crate::error::Result;
use crate::pieces::{Piece, RenderContext};
use crate::rng::Seed;
use crate::state::{EncodePolicy, GeneratorParams, ParamValue};

type Observer = Box<dyn FnMut(&GeneratorParams)>;

pub struct Session {
    piece: Box<dyn Piece>,
    ctx: RenderContext,
    params: GeneratorParams,
    observers: Vec<Observer>,
}

impl Session {
    pub fn new(piece: Box<dyn Piece>, ctx: RenderContext) -> Self {
        let params = piece.defaults();
        Self {
            piece,
            ctx,
            params,
            observers: Vec::new(),
        }
    }

    /// Starts from a shared query string instead of the defaults.
    pub fn from_query(piece: Box<dyn Piece>, ctx: RenderContext, query: &str) -> Self {
        let params = piece.resolve(query);
        Self {
            piece,
            ctx,
            params,
            observers: Vec::new(),
        }
    }

    pub fn piece(&self) -> &dyn Piece {
        self.piece.as_ref()
    }

    pub fn params(&self) -> &GeneratorParams {
        &self.params
    }

    /// Called with every snapshot that replaces the current one.
    pub fn subscribe(&mut self, observer: impl FnMut(&GeneratorParams) + 'static) {
        self.observers.push(Box::new(observer));
    }

    fn replace(&mut self, params: GeneratorParams) -> &GeneratorParams {
        debug!(piece = self.piece.name(), fingerprint = %params.fingerprint(), "new snapshot");
        self.params = params;
        for observer in &mut self.observers {
            observer(&self.params);
        }
        &self.params
    }

    pub fn set(&mut self, key: &str, value: impl Into<ParamValue>) -> &GeneratorParams {
        let next = self.params.updated(key, value);
        self.replace(next)
    }

    /// On error the current snapshot is kept and no observer runs.
    pub fn randomize(&mut self, seed: Option<&Seed>) -> Result<&GeneratorParams> {
        let next = self.piece.randomize(&self.params, seed)?;
        Ok(self.replace(next))
    }

    pub fn render(&self) -> Result<String> {
        self.piece.render(&self.params, &self.ctx)
    }

    pub fn artifact_name(&self) -> String {
        self.piece.artifact_name(&self.params)
    }

    pub fn share_query(&self, policy: EncodePolicy) -> String {
        self.piece.share_query(&self.params, policy)
    }
}
