//! Factory preset commands.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clangor_config::{ConfigError, Preset, factory_presets, get_factory_preset};
use clap::{Args, Subcommand};

#[derive(Args)]
pub struct PresetsArgs {
    #[command(subcommand)]
    command: Option<PresetsCommand>,
}

#[derive(Subcommand)]
enum PresetsCommand {
    /// List factory presets (the default)
    List,

    /// Print a preset as TOML
    Show {
        /// Factory preset name or path to a preset file
        name: String,
    },

    /// Write a factory preset to a file for customization
    Export {
        /// Factory preset name
        name: String,

        /// Destination TOML file
        #[arg(short, long)]
        output: PathBuf,

        /// Overwrite the destination if it exists
        #[arg(long)]
        force: bool,
    },
}

pub fn run(args: PresetsArgs) -> anyhow::Result<()> {
    match args.command.unwrap_or(PresetsCommand::List) {
        PresetsCommand::List => list(),
        PresetsCommand::Show { name } => show(&name),
        PresetsCommand::Export {
            name,
            output,
            force,
        } => export(&name, &output, force),
    }
}

fn list() -> anyhow::Result<()> {
    println!("Factory presets:\n");
    for (id, preset) in clangor_config::factory_preset_names()
        .into_iter()
        .zip(factory_presets())
    {
        println!(
            "  {:<12} {:<5} {}",
            id,
            preset.instrument.kind(),
            preset.description.as_deref().unwrap_or("")
        );
    }
    Ok(())
}

fn show(name: &str) -> anyhow::Result<()> {
    let preset = match get_factory_preset(name) {
        Some(preset) => preset,
        None => {
            let path = PathBuf::from(name);
            if !path.exists() {
                return Err(ConfigError::PresetNotFound(name.to_string()).into());
            }
            Preset::load(&path).with_context(|| format!("loading preset {}", path.display()))?
        }
    };
    print!("{}", preset.to_toml()?);
    Ok(())
}

fn export(name: &str, output: &Path, force: bool) -> anyhow::Result<()> {
    let preset =
        get_factory_preset(name).ok_or_else(|| ConfigError::PresetNotFound(name.to_string()))?;
    if output.exists() && !force {
        anyhow::bail!(
            "{} already exists; pass --force to overwrite",
            output.display()
        );
    }
    preset.save(output)?;
    println!("Exported '{}' to {}", preset.name, output.display());
    Ok(())
}
