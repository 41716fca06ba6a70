use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Shared application context for global flags
#[derive(Clone, Debug)]
pub struct AppContext {
    pub quiet: bool,    // global --quiet
    pub no_color: bool, // global --no-color
}

#[derive(Parser)]
#[command(name = "pup")]
#[command(
    about = "Character-level diff, fuzzy match and fuzzy patch for plain text"
)]
#[command(version, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compare two files character by character
    Diff(DiffArgs),

    /// Fuzzily locate a pattern inside a file
    Find(FindArgs),

    /// Build a patch from two versions of a file
    Make(MakeArgs),

    /// Apply a patch, tolerating drifted text
    Apply(ApplyArgs),

    /// Initialize a patchup.toml config file
    Init(InitArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum DiffFormat {
    /// Inline terminal rendering
    Text,
    /// Compact delta encoding
    Delta,
    /// Minimal styled HTML
    Html,
}

#[derive(Parser)]
pub struct DiffArgs {
    /// Old version of the file
    pub old: PathBuf,

    /// New version of the file
    pub new: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = DiffFormat::Text)]
    pub format: DiffFormat,

    /// Disable the line-mode speedup for large inputs
    #[arg(long)]
    pub no_line_mode: bool,

    /// Emit the raw edit script without semantic cleanup
    #[arg(long)]
    pub raw: bool,

    /// Seconds before settling for a coarse diff (0 = unlimited)
    #[arg(long)]
    pub timeout: Option<f32>,

    /// Cost of an empty edit, in chars, for efficiency cleanup
    #[arg(long)]
    pub edit_cost: Option<usize>,
}

#[derive(Parser)]
pub struct FindArgs {
    /// File to search
    pub file: PathBuf,

    /// Pattern to locate
    pub pattern: String,

    /// Expected location of the match, in code points
    #[arg(short, long, default_value_t = 0)]
    pub loc: usize,

    /// Match threshold (0.0 exact .. 1.0 anything)
    #[arg(long)]
    pub threshold: Option<f64>,

    /// Distance weight for the proximity penalty
    #[arg(long)]
    pub distance: Option<usize>,
}

#[derive(Parser)]
pub struct MakeArgs {
    /// Old version of the file
    pub old: PathBuf,

    /// New version of the file
    pub new: PathBuf,

    /// Write the patch here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Parser)]
pub struct ApplyArgs {
    /// Patch file produced by `pup make`
    pub patch: PathBuf,

    /// File to apply the patch to
    pub file: PathBuf,

    /// Write the result here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Emit a JSON report with the patched text and per-hunk results
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser)]
pub struct InitArgs {
    /// Directory to initialize config in
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Overwrite existing config file
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

#[derive(Parser)]
pub struct CompletionsArgs {
    /// Target shell
    #[arg(value_enum)]
    pub shell: Shell,

    /// Output directory; if omitted and --stdout not set, prints error
    #[arg(long)]
    pub out_dir: Option<PathBuf>,

    /// Print completion script to stdout instead of a file
    #[arg(long)]
    pub stdout: bool,
}
