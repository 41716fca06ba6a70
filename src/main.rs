use anyhow::Result;
use clap::Parser;
use patchup::cli::{AppContext, Cli, Commands};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Build a context once, pass everywhere
    let ctx = AppContext {
        quiet: cli.quiet,
        no_color: cli.no_color,
    };

    match cli.command {
        Commands::Diff(args) => patchup::core::diff::run(&args, &ctx),
        Commands::Find(args) => patchup::core::matcher::run(&args, &ctx),
        Commands::Make(args) => patchup::core::patch::run_make(&args, &ctx),
        Commands::Apply(args) => patchup::core::patch::run_apply(&args, &ctx),
        Commands::Init(args) => patchup::infra::config::init(args, &ctx),
        Commands::Completions(args) => patchup::completion::run(args),
    }
}
