//! **patchup** - Character-level diff, fuzzy match and fuzzy patch for plain text
//!
//! Three cooperating engines: a Myers diff with semantic cleanup, a bitap
//! fuzzy matcher, and a patch engine that survives drifted source text.
//! All offsets count Unicode code points.

/// Command-line interface with clap integration
pub mod cli;

/// Shell completion generation
pub mod completion;

/// Core engines - diff, match and patch
pub mod core {
    /// Myers diff with half-match, line-mode and cleanup passes
    pub mod diff;
    pub use diff::{DiffConfig, DiffEngine, Edit, EditKind};

    /// Shared library error type
    pub mod error;
    pub use error::{Error, Result};

    /// Line interning for line-mode diffs
    pub mod lines;

    /// Bitap fuzzy matcher with weighted scoring
    pub mod matcher;
    pub use matcher::{MatchConfig, Matcher};

    /// Context-carrying patches with fuzzy application
    pub mod patch;
    pub use patch::{Patch, PatchConfig, PatchEngine, PatchSet, PatchSource};

    /// Code-point level text primitives
    pub mod text;
}

/// Infrastructure - configuration and wire escaping
pub mod infra {
    /// Configuration management with TOML support
    pub mod config;
    pub use config::{Config, init as config_init, load_config};

    /// Percent-escaping for the delta and patch wire formats
    pub mod escape;
}

// Strategic re-exports for clean consumer interface
pub use cli::{AppContext, Cli, Commands};
pub use infra::{Config, load_config};
pub use self::core::{
    DiffConfig, DiffEngine, Edit, EditKind, Error, MatchConfig, Matcher, Patch, PatchConfig,
    PatchEngine, PatchSet, PatchSource, Result,
};
pub use self::core::diff::{
    cleanup_merge, cleanup_semantic, cleanup_semantic_lossless, from_delta, levenshtein,
    pretty_html, source_text, target_text, to_delta, x_index,
};
