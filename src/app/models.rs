use crate::app::error::RunError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Where the prompt text comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum PromptSpec {
    File(PathBuf),
    Literal(String),
}

impl PromptSpec {
    pub fn read(&self) -> Result<String, RunError> {
        match self {
            PromptSpec::File(path) => read_input(path),
            PromptSpec::Literal(text) => Ok(text.clone()),
        }
    }

    pub fn label(&self) -> String {
        match self {
            PromptSpec::File(path) => path.display().to_string(),
            PromptSpec::Literal(_) => "literal".to_string(),
        }
    }
}

/// What the prompt is applied to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceTarget {
    SingleFile(PathBuf),
    Directory {
        path: PathBuf,
        extension_filter: Option<String>,
        exclude: Vec<String>,
    },
}

impl SourceTarget {
    pub fn path(&self) -> &Path {
        match self {
            SourceTarget::SingleFile(path) => path,
            SourceTarget::Directory { path, .. } => path,
        }
    }
}

/// A fully resolved request: model defaulted, paths canonical.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub prompt: PromptSpec,
    pub source: SourceTarget,
    pub model: String,
    pub dry_run: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunResult {
    /// Engine output, or the preview for a dry run.
    pub output_text: String,
    pub output_path: Option<PathBuf>,
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub results: Vec<RunResult>,
    pub failures: Vec<(PathBuf, RunError)>,
}

/// How a directory run reacts to a failing file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BatchPolicy {
    #[default]
    AbortOnFirst,
    ContinueOnError,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastInvocation {
    pub prompt: PromptSpec,
    pub source_path: PathBuf,
}

/// Canonicalizes an input path, mapping any failure to `MissingInput`.
pub fn resolve_input(path: &Path) -> Result<PathBuf, RunError> {
    fs::canonicalize(path).map_err(|source| RunError::MissingInput {
        path: path.to_path_buf(),
        source,
    })
}

pub fn read_input(path: &Path) -> Result<String, RunError> {
    fs::read_to_string(path).map_err(|source| RunError::MissingInput {
        path: path.to_path_buf(),
        source,
    })
}
