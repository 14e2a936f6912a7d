use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "lcm",
    author,
    version,
    about = "LocalMind: run prompt files against source files with a local model"
)]
pub struct Cli {
    /// Model override (otherwise the config default)
    #[arg(long, global = true)]
    pub model: Option<String>,

    /// Print what would run without calling the engine or writing anything
    #[arg(long, global = true)]
    pub dry_run: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a prompt file on a file
    File {
        prompt_file: PathBuf,
        source_file: PathBuf,
    },

    /// Run inline prompt text on a file ('-' reads the source from stdin)
    Text { prompt: String, source_file: PathBuf },

    /// Run a prompt file on every file under a directory
    Dir {
        #[arg(long)]
        prompt_file: PathBuf,

        source_dir: PathBuf,

        /// Only process files whose name ends with this suffix (e.g. '.py')
        #[arg(long)]
        ext: Option<String>,

        /// Glob pattern, relative to the directory, to skip (repeatable)
        #[arg(long, action = ArgAction::Append)]
        exclude: Vec<String>,

        /// Keep going when a file fails and report failures at the end
        #[arg(long)]
        keep_going: bool,
    },

    /// Re-run the last invocation
    Last,

    /// Show LocalMind paths
    Paths,

    /// Show the output folder and recent files
    Outputs,

    /// Select a prompt interactively, optionally running it on a file
    Prompt { source_file: Option<PathBuf> },
}
