//! Command-line interface definitions.
//!
//! Defines all CLI arguments and subcommands using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Homer static site generator CLI
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Project root directory (default: current directory)
    #[arg(short, long)]
    pub root: Option<PathBuf>,

    /// Config file name, relative to the root (default: homer.toml)
    #[arg(short = 'C', long, default_value = "homer.toml")]
    pub config: PathBuf,

    /// Print per-file and per-request details
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only print errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Source/output overrides shared by Build and Dev
#[derive(clap::Args, Debug, Clone, Default)]
pub struct BuildArgs {
    /// Source directory (relative to project root)
    #[arg(short, long)]
    pub source: Option<PathBuf>,

    /// Output directory (relative to project root)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Listener overrides shared by Run and Dev
#[derive(clap::Args, Debug, Clone, Default)]
pub struct ServeArgs {
    /// Interface to bind on
    #[arg(short, long)]
    pub interface: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    pub port: Option<u16>,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Deletes the output directory if there is one and rebuilds the site
    Build {
        #[command(flatten)]
        build_args: BuildArgs,
    },

    /// Serve the last build with file-based routing
    #[command(visible_alias = "start")]
    Run {
        /// Directory to serve (relative to project root)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        serve_args: ServeArgs,
    },

    /// Build once, then serve with browser caching disabled
    Dev {
        #[command(flatten)]
        build_args: BuildArgs,

        #[command(flatten)]
        serve_args: ServeArgs,
    },
}

impl Cli {
    /// Source/output overrides for the current command.
    pub fn build_args(&self) -> BuildArgs {
        match &self.command {
            Commands::Build { build_args } | Commands::Dev { build_args, .. } => build_args.clone(),
            Commands::Run { output, .. } => BuildArgs {
                source: None,
                output: output.clone(),
            },
        }
    }

    /// Listener overrides for the current command.
    pub fn serve_args(&self) -> Option<&ServeArgs> {
        match &self.command {
            Commands::Run { serve_args, .. } | Commands::Dev { serve_args, .. } => {
                Some(serve_args)
            }
            Commands::Build { .. } => None,
        }
    }
}
