use crate::app::error::RunError;
use std::io::{ErrorKind, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};

/// Interactive choice of one prompt out of a candidate list.
pub trait PromptSelector {
    fn select(&self, candidates: &[PathBuf]) -> Result<PathBuf, RunError>;
}

/// Pipes candidates into an fzf-compatible picker and reads the chosen line.
pub struct FzfSelector {
    binary: String,
}

impl FzfSelector {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl PromptSelector for FzfSelector {
    fn select(&self, candidates: &[PathBuf]) -> Result<PathBuf, RunError> {
        let listing = candidates
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join("\n");

        // stderr stays attached to the terminal so the picker can draw.
        let mut child = Command::new(&self.binary)
            .arg("--prompt")
            .arg("prompt> ")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| RunError::SelectorUnavailable {
                binary: self.binary.clone(),
                source,
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            if let Err(err) = stdin.write_all(listing.as_bytes()) {
                if err.kind() != ErrorKind::BrokenPipe {
                    log::warn!("Failed to send candidates to {}: {}", self.binary, err);
                }
            }
        }

        let output = child
            .wait_with_output()
            .map_err(|source| RunError::SelectorUnavailable {
                binary: self.binary.clone(),
                source,
            })?;

        // fzf exits 130 on Esc/Ctrl-C and 1 on no match.
        if !output.status.success() {
            return Err(RunError::SelectionCancelled);
        }

        let chosen = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if chosen.is_empty() {
            return Err(RunError::SelectionCancelled);
        }
        Ok(PathBuf::from(chosen))
    }
}
