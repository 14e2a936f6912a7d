use crate::app::error::RunError;
use chrono::{DateTime, Local};
use std::fs;
use std::path::PathBuf;

pub const TEXT_STEM: &str = "text";

/// Persists engine output as `{YYYYMMDD_HHMMSS}_{stem}_{model}.txt`.
///
/// Two writes in the same second for the same stem and model share a name;
/// the later one wins.
pub struct OutputWriter {
    dir: PathBuf,
}

impl OutputWriter {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn write(&self, output_text: &str, stem: Option<&str>, model: &str) -> Result<PathBuf, RunError> {
        let path = self.dir.join(output_file_name(Local::now(), stem, model));
        fs::create_dir_all(&self.dir).map_err(|source| RunError::OutputWrite {
            path: self.dir.clone(),
            source,
        })?;
        fs::write(&path, output_text).map_err(|source| RunError::OutputWrite {
            path: path.clone(),
            source,
        })?;
        log::info!("Output saved to {}", path.display());
        Ok(path)
    }
}

pub fn output_file_name(at: DateTime<Local>, stem: Option<&str>, model: &str) -> String {
    format!(
        "{}_{}_{}.txt",
        at.format("%Y%m%d_%H%M%S"),
        stem.unwrap_or(TEXT_STEM),
        sanitize_model(model)
    )
}

/// `name:tag` and registry paths like `hf.co/user/model` become one file name segment.
pub fn sanitize_model(model: &str) -> String {
    model.replace([':', '/', '\\'], "_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    #[test]
    fn file_name_has_timestamp_stem_and_sanitized_model() {
        let at = Local.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        assert_eq!(
            output_file_name(at, Some("main"), "deepseek-coder-v2:latest"),
            "20240309_070501_main_deepseek-coder-v2_latest.txt"
        );
        assert_eq!(output_file_name(at, None, "local"), "20240309_070501_text_local.txt");
    }

    #[test]
    fn write_creates_missing_directories() {
        let dir = TempDir::new().unwrap();
        let writer = OutputWriter::new(dir.path().join("nested").join("outputs"));

        let path = writer.write("refactored code", Some("hello"), "llama3:8b").unwrap();

        assert!(path.starts_with(dir.path().join("nested").join("outputs")));
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.ends_with("_hello_llama3_8b.txt"), "{name}");
        assert_eq!(fs::read_to_string(path).unwrap(), "refactored code");
    }

    #[test]
    fn model_path_separators_stay_in_file_name() {
        assert_eq!(sanitize_model("hf.co/user/model:Q4"), "hf.co_user_model_Q4");

        let dir = TempDir::new().unwrap();
        let writer = OutputWriter::new(dir.path().to_path_buf());
        let path = writer.write("out", Some("main"), "hf.co/user/model:Q4").unwrap();

        assert_eq!(path.parent().unwrap(), dir.path());
        assert!(path.exists());
    }
}
