use crate::init_config::CmdConfig;
use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand};
use clap_verbosity_flag::InfoLevel;
use directories::ProjectDirs;
use std::path::PathBuf;

mod cmd;
mod config;
mod init_config;

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// config file to use instead of the one in the user config directory
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(flatten)]
    verbosity: clap_verbosity_flag::Verbosity<InfoLevel>,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Modify the treecast config
    Config {
        #[command(subcommand)]
        cmd: CmdConfig,
    },
    /// Infer a bundle schema from a directory tree and print it
    Infer {
        dir: PathBuf,
        /// Type name for the root directory
        #[arg(long, value_name = "NAME")]
        root_name: Option<String>,
        /// Write the schema to this file instead of stdout
        #[arg(long, value_name = "FILE")]
        schema_out: Option<PathBuf>,
    },
    /// Infer a bundle from SRC and write it out again under DST
    Copy {
        src: PathBuf,
        dst: PathBuf,
        /// Write into DST even if it already has content
        #[arg(long, action = ArgAction::SetTrue)]
        overwrite: bool,
        /// Type name for the root directory
        #[arg(long, value_name = "NAME")]
        root_name: Option<String>,
    },
    /// Check that a directory tree survives an infer/write round trip
    Verify { dir: PathBuf },
    /// Print the inferred field tree of a directory
    Tree { dir: PathBuf },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(cli.verbosity)
        .init();

    // Default config location: ~/.config/treecast/config.toml
    let config_file = match cli.config {
        Some(path) => path,
        None => ProjectDirs::from("", "", "treecast")
            .context("failed to determine config directory path")?
            .config_dir()
            .join("config.toml"),
    };

    cmd::run_command(config_file, cli.cmd)
}
