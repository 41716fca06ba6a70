use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::cli::{AppContext, InitArgs};
use crate::core::diff::DiffConfig;
use crate::core::matcher::MatchConfig;
use crate::core::patch::PatchConfig;

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config
{
    /// Diff engine defaults
    pub diff: DiffSection,

    /// Fuzzy matcher defaults
    pub matcher: MatchSection,

    /// Patch engine defaults
    pub patch: PatchSection,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffSection
{
    pub timeout_secs: f32,
    pub edit_cost: usize,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchSection
{
    pub threshold: f64,
    pub distance: usize,
    pub max_bits: usize,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PatchSection
{
    pub delete_threshold: f64,
    pub margin: usize,
}

impl Default for DiffSection
{
    fn default() -> Self
    {
        let d = DiffConfig::default();
        Self { timeout_secs: d.timeout_secs, edit_cost: d.edit_cost }
    }
}

impl Default for MatchSection
{
    fn default() -> Self
    {
        let d = MatchConfig::default();
        Self { threshold: d.threshold, distance: d.distance, max_bits: d.max_bits }
    }
}

impl Default for PatchSection
{
    fn default() -> Self
    {
        let d = PatchConfig::default();
        Self { delete_threshold: d.delete_threshold, margin: d.margin }
    }
}

impl Config
{
    pub fn diff_config(&self) -> DiffConfig
    {
        DiffConfig {
            timeout_secs: self.diff.timeout_secs,
            edit_cost: self.diff.edit_cost,
        }
    }

    pub fn match_config(&self) -> MatchConfig
    {
        MatchConfig {
            threshold: self.matcher.threshold,
            distance: self.matcher.distance,
            max_bits: self.matcher.max_bits,
        }
    }

    pub fn patch_config(&self) -> PatchConfig
    {
        PatchConfig {
            delete_threshold: self.patch.delete_threshold,
            margin: self.patch.margin,
        }
    }
}

pub fn load_config() -> Result<Config>
{
    let mut builder = config::Config::builder();

    // Load from config files in priority order
    let config_paths = ["patchup.toml", ".patchup.toml"];

    for path in &config_paths
    {
        if Path::new(path).exists()
        {
            builder = builder.add_source(config::File::with_name(path));
            break;
        }
    }

    // Add environment variables with PATCHUP_ prefix
    builder = builder.add_source(config::Environment::with_prefix("PATCHUP").separator("_"));

    let cfg = builder
        .build()
        .context("Failed to load configuration")?;
    let parsed: Config = cfg
        .try_deserialize()
        .context("Failed to parse configuration")?;

    Ok(parsed)
}

pub fn init(
    args: InitArgs,
    ctx: &AppContext,
) -> Result<()>
{
    let config_path = args
        .path
        .join("patchup.toml");

    if config_path.exists() && !args.force
    {
        anyhow::bail!(
            "Config file already exists at {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    let config = Config::default();
    let toml_string =
        toml::to_string_pretty(&config).context("Failed to serialize default config")?;

    std::fs::write(&config_path, toml_string).context("Failed to write config file")?;

    if !ctx.quiet
    {
        println!("Created config file at {}", config_path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn defaults_mirror_engine_defaults()
    {
        let cfg = Config::default();
        let diff = cfg.diff_config();
        assert_eq!(diff.timeout_secs, DiffConfig::default().timeout_secs);
        assert_eq!(diff.edit_cost, DiffConfig::default().edit_cost);
        let matcher = cfg.match_config();
        assert_eq!(matcher.threshold, MatchConfig::default().threshold);
        assert_eq!(matcher.max_bits, MatchConfig::default().max_bits);
        assert_eq!(cfg.patch_config().margin, PatchConfig::default().margin);
    }

    #[test]
    fn partial_toml_fills_in_defaults()
    {
        let cfg: Config = toml::from_str("[matcher]\nthreshold = 0.8\n").unwrap();
        assert_eq!(cfg.matcher.threshold, 0.8);
        assert_eq!(cfg.matcher.distance, MatchConfig::default().distance);
        assert_eq!(cfg.diff.edit_cost, DiffConfig::default().edit_cost);
    }

    #[test]
    fn default_config_serializes()
    {
        let toml_string = toml::to_string_pretty(&Config::default()).unwrap();
        assert!(toml_string.contains("[diff]"));
        assert!(toml_string.contains("[matcher]"));
        assert!(toml_string.contains("[patch]"));
    }
}
