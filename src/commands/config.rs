//! Configuration management CLI commands.

use clap::{Args, Subcommand};

use mediatree_core::config::AppConfig;
use mediatree_core::error::AppError;
use mediatree_core::result::AppResult;

use crate::output::{self, OutputFormat};

/// Arguments for config commands
#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// Config subcommand
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Config subcommands
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show the effective configuration
    Show,
    /// Print a summary of the effective configuration
    Validate,
    /// Write the default configuration file
    Generate {
        /// Output file path
        #[arg(short, long, default_value = "config/generated.toml")]
        output: String,
    },
}

/// Execute config commands
pub fn execute(args: &ConfigArgs, config: &AppConfig, format: OutputFormat) -> AppResult<()> {
    match &args.command {
        ConfigCommand::Show => output::print_item(config, format),
        ConfigCommand::Validate => {
            config.validate()?;
            output::print_success("Configuration is valid");
            output::print_kv("Snapshot", &config.database.snapshot_path);
            output::print_kv("Storage", &config.storage.provider);
            output::print_kv("Lock timeout (ms)", &config.tree.lock_timeout_ms.to_string());
            output::print_kv(
                "Name collisions",
                if config.tree.auto_rename {
                    config.tree.unique_name_format.as_str()
                } else {
                    "rejected"
                },
            );
        }
        ConfigCommand::Generate { output: out_path } => {
            let default_config = include_str!("../../config/default.toml");
            if let Some(parent) = std::path::Path::new(out_path).parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| AppError::internal(format!("Failed to create dir: {e}")))?;
            }
            std::fs::write(out_path, default_config)
                .map_err(|e| AppError::internal(format!("Failed to write config: {e}")))?;
            output::print_success(&format!("Default config written to '{out_path}'"));
        }
    }
    Ok(())
}
