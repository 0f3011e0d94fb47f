//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// catalogd - multi-model catalog enrichment pipeline
#[derive(Parser)]
#[command(
    name = "catd",
    about = "Multi-model catalog enrichment pipeline",
    version
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI subcommands
#[derive(Subcommand)]
pub enum Command {
    /// Run one enrichment batch over a set of product ids
    Run {
        /// Task type (meta, content, keywords, tags, categories, schema)
        #[arg(short, long, value_name = "TYPE")]
        task: String,

        /// Product ids to process
        #[arg(long, value_name = "IDS", value_delimiter = ',', required = true)]
        product_ids: Vec<i64>,

        /// Substitute quantized model variants
        #[arg(long)]
        quantize: bool,

        /// JSON file of products to seed the in-memory store with
        #[arg(long, value_name = "FILE")]
        seed: Option<PathBuf>,
    },

    /// List configured models and probe their availability
    Models,

    /// Show the effective configuration
    Status,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run_command() {
        let cli = Cli::parse_from([
            "catd",
            "run",
            "--task",
            "meta",
            "--product-ids",
            "1,2,3",
            "--quantize",
        ]);

        match cli.command {
            Some(Command::Run {
                task,
                product_ids,
                quantize,
                seed,
            }) => {
                assert_eq!(task, "meta");
                assert_eq!(product_ids, vec![1, 2, 3]);
                assert!(quantize);
                assert!(seed.is_none());
            }
            _ => panic!("expected run command"),
        }
    }

    #[test]
    fn test_parse_global_config_flag() {
        let cli = Cli::parse_from(["catd", "--config", "custom.yml", "status"]);
        assert_eq!(cli.config, Some(PathBuf::from("custom.yml")));
        assert!(matches!(cli.command, Some(Command::Status)));
    }

    #[test]
    fn test_no_subcommand_is_allowed() {
        let cli = Cli::parse_from(["catd"]);
        assert!(cli.command.is_none());
    }
}
