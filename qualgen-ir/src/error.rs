use failure::Fail;

use crate::symbol::{KVar, Symbol};

/// The full error taxonomy for the qualifier-synthesis pipeline (§7),
/// modeled with `failure::Fail` the way chalk-repl models `ReplError`
/// (`chalk-repl/src/main.rs`), predating `thiserror`/`anyhow` in this
/// code's ancestry.
#[derive(Debug, Fail)]
pub enum QError {
    #[fail(display = "malformed input at {}: {}", location, message)]
    InputError { location: String, message: String },

    #[fail(display = "sort lookup failed for symbol `{}`", symbol)]
    SortLookupMiss { symbol: Symbol },

    #[fail(display = "no declaration found for k-variable `{}`", kvar)]
    UnknownKVar { kvar: KVar },

    #[fail(display = "unroll invariant violated: {}", message)]
    UnrollInvariantError { message: String },

    #[fail(
        display = "expected {} interpolant(s) for {} cut(s), solver returned {}",
        expected_cuts, expected_cuts, got
    )]
    CutInterpolantMismatch { expected_cuts: usize, got: usize },

    #[fail(display = "smt solver protocol violation: {}", message)]
    SmtProtocolError { message: String },

    #[fail(display = "smt solver process exited unexpectedly: {}", message)]
    SmtProcessError { message: String },

    #[fail(display = "i/o error: {}", _0)]
    Io(#[fail(cause)] std::io::Error),
}

impl From<std::io::Error> for QError {
    fn from(e: std::io::Error) -> QError {
        QError::Io(e)
    }
}

pub type QResult<T> = Result<T, QError>;
