//! Library error type shared by the diff, match and patch engines.

use thiserror::Error;

/// Convenience alias for fallible library operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Caller handed us a configuration value outside its legal range.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The fuzzy matcher is bit-parallel; patterns must fit one machine word.
    #[error("pattern of {len} chars exceeds the {max_bits}-bit match window")]
    PatternTooLong { len: usize, max_bits: usize },

    /// A delta token had an unknown operation or an unparsable parameter.
    #[error("malformed delta token {0:?}")]
    MalformedDelta(String),

    /// A patch header line did not match `@@ -s,l +s,l @@`.
    #[error("malformed patch header {0:?}")]
    MalformedPatchHeader(String),

    /// A patch body line started with something other than `+`, `-`, ` ` or `@`.
    #[error("malformed patch body line {0:?}")]
    MalformedPatchBody(String),

    /// The `=`/`-` spans of a delta must cover the source text exactly.
    #[error("delta spans {covered} chars but the source text has {expected}")]
    DeltaLengthMismatch { covered: usize, expected: usize },
}
