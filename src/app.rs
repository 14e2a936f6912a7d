// Declare modules
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod formatter;
pub mod models;
pub mod orchestrator;
pub mod scanner;
pub mod selector;
pub mod state;
pub mod writer;

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::io::Read;
use std::path::Path;

use self::cli::{Cli, Command};
use self::config::{ConfigProvider, Paths};
use self::engine::CommandInvoker;
use self::models::{BatchPolicy, RunResult};
use self::orchestrator::Orchestrator;
use self::selector::FzfSelector;
use self::state::FileStateStore;

/// Initializes components and dispatches the chosen subcommand.
pub fn run() -> Result<()> {
    let args = Cli::parse();

    let paths = Paths::discover()?;
    let settings = ConfigProvider::new(paths.clone()).settings();
    log::debug!("Resolved settings: {:?}", settings);

    let state = FileStateStore::new(paths.state_dir(), settings.recent_files_limit);
    let invoker = CommandInvoker::new(settings.engine.clone());
    let selector = FzfSelector::new(settings.selector.clone());
    let mut orchestrator = Orchestrator::new(
        paths,
        settings,
        Box::new(invoker),
        Box::new(state),
        Box::new(selector),
    );

    let model = args.model.as_deref();
    let dry_run = args.dry_run;

    match args.command {
        Command::File {
            prompt_file,
            source_file,
        } => {
            let result = orchestrator.run_file(&prompt_file, &source_file, model, dry_run)?;
            print_result(&result);
        }
        Command::Text {
            prompt,
            source_file,
        } => {
            let result = if source_file == Path::new("-") {
                let mut source_text = String::new();
                std::io::stdin()
                    .read_to_string(&mut source_text)
                    .context("Failed to read source text from stdin")?;
                orchestrator.run_text(&prompt, &source_text, None, model, dry_run)?
            } else {
                let source_text = models::read_input(&source_file)?;
                let source_path = Some(source_file.as_path());
                orchestrator.run_text(&prompt, &source_text, source_path, model, dry_run)?
            };
            print_result(&result);
        }
        Command::Dir {
            prompt_file,
            source_dir,
            ext,
            exclude,
            keep_going,
        } => {
            if keep_going {
                orchestrator = orchestrator.with_batch_policy(BatchPolicy::ContinueOnError);
            }
            let report = orchestrator.run_dir(
                &prompt_file,
                &source_dir,
                model,
                dry_run,
                ext.as_deref(),
                &exclude,
            )?;

            if report.results.is_empty() && report.failures.is_empty() {
                log::warn!("No files matched under {}", source_dir.display());
            }
            for result in &report.results {
                print_result(result);
            }
            if !report.failures.is_empty() {
                for (path, err) in &report.failures {
                    eprintln!("FAILED {}: {}", path.display(), err);
                }
                bail!(
                    "{} of {} file(s) failed",
                    report.failures.len(),
                    report.failures.len() + report.results.len()
                );
            }
        }
        Command::Last => {
            let result = orchestrator.run_last(model, dry_run)?;
            print_result(&result);
        }
        Command::Paths => println!("{}", orchestrator.paths_report()),
        Command::Outputs => println!("{}", orchestrator.outputs_report()),
        Command::Prompt { source_file } => {
            let prompt_file = orchestrator.select_prompt_interactive()?;
            match source_file {
                Some(source_file) => {
                    let result = orchestrator.run_file(&prompt_file, &source_file, model, dry_run)?;
                    print_result(&result);
                }
                None => println!("{}", prompt_file.display()),
            }
        }
    }

    Ok(())
}

fn print_result(result: &RunResult) {
    println!("{}", result.output_text);
    if let Some(path) = &result.output_path {
        println!("[OUTPUT SAVED] {}", path.display());
    }
}
