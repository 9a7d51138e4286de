//! Recoverable error surface. Everything else (treap structural invariants,
//! aggregate bookkeeping, tree-shape corruption) is an unrecoverable bug and
//! is reported via `panic!`/`assert!`/`debug_assert!` instead, never via
//! this enum — see the module docs on [`crate::contig_tree`] for why.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HictError {
    #[error("operation requires an open assembly, but none is open")]
    IncorrectFileState,

    #[error("resolution {0} is not among the stored resolutions")]
    IncorrectResolution(u32),

    #[error("invalid range [{start}, {end}): start must be < end")]
    IncorrectRange { start: u64, end: u64 },

    #[error("malformed AGP record at line {line}: {reason}")]
    MalformedAssemblyRecord { line: usize, reason: String },
}

pub type Result<T> = std::result::Result<T, HictError>;
