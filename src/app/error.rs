use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("cannot read input '{}': {source}", path.display())]
    MissingInput {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("engine invocation failed: {0}")]
    EngineInvocationFailed(String),

    #[error("failed to launch engine '{binary}' (is it installed?): {source}")]
    EngineUnavailable {
        binary: String,
        source: std::io::Error,
    },

    #[error("no previous invocation recorded; run `lcm file` or `lcm text` first")]
    NoPriorInvocation,

    #[error("prompt selection cancelled")]
    SelectionCancelled,

    #[error("failed to launch selector '{binary}': {source}")]
    SelectorUnavailable {
        binary: String,
        source: std::io::Error,
    },

    #[error("no prompts found in '{}'", .0.display())]
    NoPrompts(PathBuf),

    #[error("state file '{}' is corrupt: {message}", path.display())]
    PersistenceCorrupt { path: PathBuf, message: String },

    #[error("failed to write '{}': {source}", path.display())]
    OutputWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid glob pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        source: globset::Error,
    },

    #[error("batch cancelled after {processed} file(s)")]
    Cancelled { processed: usize },
}
