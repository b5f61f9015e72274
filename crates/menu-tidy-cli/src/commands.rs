use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "menu-tidy")]
#[command(about = "Keeps a Start Menu tree in line with a saved layout", long_about = None)]
pub struct Cli {
    /// Tree to organize instead of the configured one
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// Layout file to read or write instead of the configured one
    #[arg(long, global = true)]
    pub layout: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Print the saved layout as a tree
    Display {
        /// Show recreation metadata for each item
        #[arg(long)]
        details: bool,
    },
    /// Scan the tree and save it as the layout
    Save {
        /// Skip the zip archive even when a backup directory is configured
        #[arg(long)]
        no_archive: bool,
    },
    /// Bring the tree in line with the saved layout
    Enforce {
        /// Apply the plan without asking for confirmation
        #[arg(long)]
        unattended: bool,
        /// Only print the plan
        #[arg(long, conflicts_with = "unattended")]
        dry_run: bool,
    },
    /// Compare the live tree with the saved layout
    Diff,
    /// Print configuration values
    PrintConfig,
}
