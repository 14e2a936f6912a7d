use crate::app::config::{Paths, Settings};
use crate::app::engine::ProcessInvoker;
use crate::app::error::RunError;
use crate::app::formatter::OutputGenerator;
use crate::app::models::{
    read_input, resolve_input, BatchPolicy, BatchReport, LastInvocation, PromptSpec, RunRequest,
    RunResult, SourceTarget,
};
use crate::app::scanner::Scanner;
use crate::app::selector::PromptSelector;
use crate::app::state::StateStore;
use crate::app::writer::OutputWriter;
use pathdiff::diff_paths;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// One prompt applied to one piece of source text.
struct Job<'a> {
    prompt: &'a PromptSpec,
    prompt_text: &'a str,
    source_path: Option<&'a Path>,
    source_text: &'a str,
    stem: Option<&'a str>,
    model: &'a str,
    dry_run: bool,
}

/// Drives every execution path: file, text, directory batch, replay and selection.
///
/// Dry runs return a preview before the engine is called and before any
/// output or state is written.
pub struct Orchestrator {
    paths: Paths,
    settings: Settings,
    invoker: Box<dyn ProcessInvoker>,
    state: Box<dyn StateStore>,
    selector: Box<dyn PromptSelector>,
    writer: OutputWriter,
    cancel: Arc<AtomicBool>,
}

impl Orchestrator {
    pub fn new(
        paths: Paths,
        settings: Settings,
        invoker: Box<dyn ProcessInvoker>,
        state: Box<dyn StateStore>,
        selector: Box<dyn PromptSelector>,
    ) -> Self {
        let writer = OutputWriter::new(settings.outputs_dir.clone());
        Self {
            paths,
            settings,
            invoker,
            state,
            selector,
            writer,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_batch_policy(mut self, policy: BatchPolicy) -> Self {
        self.settings.batch_policy = policy;
        self
    }

    /// Setting the flag stops a directory batch before its next file.
    pub fn cancel_token(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    fn resolve_model(&self, model: Option<&str>) -> String {
        model
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(self.settings.default_model.as_str())
            .to_string()
    }

    fn resolve(
        &self,
        prompt: PromptSpec,
        source: SourceTarget,
        model: Option<&str>,
        dry_run: bool,
    ) -> Result<RunRequest, RunError> {
        let prompt = match prompt {
            PromptSpec::File(path) => PromptSpec::File(resolve_input(&path)?),
            literal => literal,
        };
        let source = match source {
            SourceTarget::SingleFile(path) => SourceTarget::SingleFile(resolve_input(&path)?),
            SourceTarget::Directory {
                path,
                extension_filter,
                exclude,
            } => {
                let path = resolve_input(&path)?;
                if !path.is_dir() {
                    return Err(RunError::MissingInput {
                        path,
                        source: std::io::Error::other("not a directory"),
                    });
                }
                SourceTarget::Directory {
                    path,
                    extension_filter,
                    exclude,
                }
            }
        };
        Ok(RunRequest {
            prompt,
            source,
            model: self.resolve_model(model),
            dry_run,
        })
    }

    pub fn run_file(
        &self,
        prompt_file: &Path,
        source_file: &Path,
        model: Option<&str>,
        dry_run: bool,
    ) -> Result<RunResult, RunError> {
        let request = self.resolve(
            PromptSpec::File(prompt_file.to_path_buf()),
            SourceTarget::SingleFile(source_file.to_path_buf()),
            model,
            dry_run,
        )?;
        let prompt_text = request.prompt.read()?;
        let source_path = request.source.path();
        log::info!(
            "Running {} -> {} (model={})",
            request.prompt.label(),
            source_path.display(),
            request.model
        );
        self.process_file(&request, &prompt_text, source_path)
    }

    /// Literal prompt over already-loaded source text. Outputs use the `text` stem.
    pub fn run_text(
        &self,
        prompt_text: &str,
        source_text: &str,
        source_path: Option<&Path>,
        model: Option<&str>,
        dry_run: bool,
    ) -> Result<RunResult, RunError> {
        let source_path = source_path.map(resolve_input).transpose()?;
        let model = self.resolve_model(model);
        let prompt = PromptSpec::Literal(prompt_text.to_string());
        log::info!("Running literal prompt (model={})", model);

        self.execute(Job {
            prompt: &prompt,
            prompt_text,
            source_path: source_path.as_deref(),
            source_text,
            stem: None,
            model: &model,
            dry_run,
        })
    }

    pub fn run_dir(
        &self,
        prompt_file: &Path,
        source_dir: &Path,
        model: Option<&str>,
        dry_run: bool,
        extension_filter: Option<&str>,
        exclude: &[String],
    ) -> Result<BatchReport, RunError> {
        let request = self.resolve(
            PromptSpec::File(prompt_file.to_path_buf()),
            SourceTarget::Directory {
                path: source_dir.to_path_buf(),
                extension_filter: extension_filter.map(str::to_string),
                exclude: exclude.to_vec(),
            },
            model,
            dry_run,
        )?;
        let prompt_text = request.prompt.read()?;

        let (root, files) = match &request.source {
            SourceTarget::Directory {
                path,
                extension_filter,
                exclude,
            } => {
                let scanner = Scanner::new(path.clone(), extension_filter.clone(), exclude)?;
                (path.clone(), scanner.scan())
            }
            SourceTarget::SingleFile(path) => (path.clone(), vec![path.clone()]),
        };
        log::info!(
            "Running {} over {} file(s) in {} (model={})",
            request.prompt.label(),
            files.len(),
            root.display(),
            request.model
        );

        let mut report = BatchReport::default();
        for (processed, file) in files.iter().enumerate() {
            if self.cancel.load(Ordering::SeqCst) {
                return Err(RunError::Cancelled { processed });
            }

            let relative = diff_paths(file, &root).unwrap_or_else(|| file.clone());
            log::info!("Processing file: {}", relative.display());

            match self.process_file(&request, &prompt_text, file) {
                Ok(result) => report.results.push(result),
                Err(err) => match self.settings.batch_policy {
                    BatchPolicy::AbortOnFirst => return Err(err),
                    BatchPolicy::ContinueOnError => {
                        log::warn!("Skipping {}: {}", relative.display(), err);
                        report.failures.push((file.clone(), err));
                    }
                },
            }
        }
        Ok(report)
    }

    pub fn run_last(&self, model: Option<&str>, dry_run: bool) -> Result<RunResult, RunError> {
        let last = self.state.load_last().ok_or(RunError::NoPriorInvocation)?;
        match &last.prompt {
            PromptSpec::File(prompt_file) => {
                self.run_file(prompt_file, &last.source_path, model, dry_run)
            }
            PromptSpec::Literal(prompt_text) => {
                let source_text = read_input(&last.source_path)?;
                let source_path = last.source_path.as_path();
                self.run_text(prompt_text, &source_text, Some(source_path), model, dry_run)
            }
        }
    }

    pub fn select_prompt_interactive(&self) -> Result<PathBuf, RunError> {
        let dir = &self.settings.prompts_dir;
        if !dir.is_dir() {
            return Err(RunError::NoPrompts(dir.clone()));
        }
        let candidates = Scanner::new(dir.clone(), None, &[])?.scan();
        if candidates.is_empty() {
            return Err(RunError::NoPrompts(dir.clone()));
        }
        self.selector.select(&candidates)
    }

    pub fn paths_report(&self) -> String {
        OutputGenerator::paths_report(&self.paths, &self.settings)
    }

    pub fn outputs_report(&self) -> String {
        let dir = &self.settings.outputs_dir;
        let outputs = fs::read_dir(dir).ok().map(|entries| {
            let mut files: Vec<PathBuf> = entries
                .filter_map(Result::ok)
                .map(|entry| entry.path())
                .filter(|path| path.is_file())
                .collect();
            // Names start with the timestamp, so reverse name order is newest first.
            files.sort_by(|a, b| b.file_name().cmp(&a.file_name()));
            files
        });
        OutputGenerator::outputs_report(dir, outputs.as_deref(), &self.state.load_recent())
    }

    fn process_file(
        &self,
        request: &RunRequest,
        prompt_text: &str,
        source_path: &Path,
    ) -> Result<RunResult, RunError> {
        let source_text = read_input(source_path)?;
        let stem = source_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string());

        self.execute(Job {
            prompt: &request.prompt,
            prompt_text,
            source_path: Some(source_path),
            source_text: &source_text,
            stem: stem.as_deref(),
            model: &request.model,
            dry_run: request.dry_run,
        })
    }

    fn execute(&self, job: Job<'_>) -> Result<RunResult, RunError> {
        if job.dry_run {
            let source_label = job
                .source_path
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "text".to_string());
            let preview = OutputGenerator::dry_run_preview(
                job.model,
                &job.prompt.label(),
                job.prompt_text,
                &source_label,
                job.source_text,
            );
            return Ok(RunResult {
                output_text: preview,
                output_path: None,
            });
        }

        let output = self
            .invoker
            .invoke(job.prompt_text, job.source_text, job.model)?;
        let output_path = self.writer.write(&output, job.stem, job.model)?;

        if let Some(source_path) = job.source_path {
            self.remember(LastInvocation {
                prompt: job.prompt.clone(),
                source_path: source_path.to_path_buf(),
            });
        }

        Ok(RunResult {
            output_text: output,
            output_path: Some(output_path),
        })
    }

    /// State write failures are logged, never fatal.
    fn remember(&self, last: LastInvocation) {
        if let Err(err) = self.state.record_last(&last) {
            log::warn!("Could not record last invocation: {}", err);
        }
        if let Err(err) = self.state.record_recent(&last.source_path) {
            log::warn!("Could not record recent file: {}", err);
        }
    }
}
