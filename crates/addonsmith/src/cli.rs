//! CLI argument parsing with clap

use std::path::PathBuf;

use addonsmith_core::AddonDirKind;
use clap::{Args, Parser, Subcommand};

/// Addonsmith - install addon packages from URLs or local paths
#[derive(Parser, Debug)]
#[command(name = "addonsmith")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Install an addon package
    Install(InstallArgs),

    /// Show an addon package's metadata without installing it
    Info(InfoArgs),
}

// Install command
#[derive(Args, Debug)]
pub struct InstallArgs {
    /// URL or local path of the addon package (.py or .zip)
    pub reference: String,

    /// Addon directory to install into (user, system)
    #[arg(short, long, default_value = "user")]
    pub dir: AddonDirKind,

    /// Install into an explicit directory instead of a named one
    #[arg(long, conflicts_with = "dir")]
    pub target_dir: Option<PathBuf>,

    /// Replace an existing installation of the same addon
    #[arg(short, long)]
    pub overwrite: bool,

    /// Output the installation report as JSON
    #[arg(long)]
    pub json: bool,
}

// Info command
#[derive(Args, Debug)]
pub struct InfoArgs {
    /// URL or local path of the addon package (.py or .zip)
    pub reference: String,

    /// Output metadata as JSON
    #[arg(long)]
    pub json: bool,
}
