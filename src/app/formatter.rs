use crate::app::config::{Paths, Settings};
use std::path::{Path, PathBuf};

const NEWEST_OUTPUTS_SHOWN: usize = 10;

pub struct OutputGenerator;

impl OutputGenerator {
    pub fn dry_run_preview(
        model: &str,
        prompt_label: &str,
        prompt_text: &str,
        source_label: &str,
        source_text: &str,
    ) -> String {
        let mut out = String::from("[DRY RUN]\n");
        out.push_str(&format!("Model: {}\n", model));
        out.push_str(&format!("Prompt ({}):\n{}\n", prompt_label, prompt_text));
        out.push_str(&format!("Source ({}):\n{}", source_label, source_text));
        out
    }

    pub fn paths_report(paths: &Paths, settings: &Settings) -> String {
        [
            format!("LocalMind home: {}", paths.home.display()),
            format!("Config file: {}", paths.config_file().display()),
            format!("State dir: {}", paths.state_dir().display()),
            format!("Prompts dir: {}", settings.prompts_dir.display()),
            format!("Outputs dir: {}", settings.outputs_dir.display()),
        ]
        .join("\n")
    }

    /// `outputs` is expected newest first.
    pub fn outputs_report(outputs_dir: &Path, outputs: Option<&[PathBuf]>, recent: &[String]) -> String {
        let Some(outputs) = outputs else {
            return "No output folder exists yet.".to_string();
        };

        let mut out = format!("Last output folder: {}", outputs_dir.display());
        if outputs.is_empty() {
            out.push_str("\n  (empty)");
        }
        for path in outputs.iter().take(NEWEST_OUTPUTS_SHOWN) {
            let name = path.file_name().unwrap_or_default().to_string_lossy();
            out.push_str(&format!("\n  {}", name));
        }

        if !recent.is_empty() {
            out.push_str("\nRecent files:");
            for file in recent {
                out.push_str(&format!("\n  {}", file));
            }
        }

        out
    }
}
