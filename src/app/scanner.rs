use crate::app::error::RunError;
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use pathdiff::diff_paths;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

/// Recursive listing of regular files under a root, in sorted path order.
pub struct Scanner {
    root: PathBuf,
    extension: Option<String>,
    exclude_set: GlobSet,
}

impl Scanner {
    pub fn new(root: PathBuf, extension: Option<String>, exclude: &[String]) -> Result<Self, RunError> {
        Ok(Self {
            root,
            extension,
            exclude_set: build_globset(exclude)?,
        })
    }

    pub fn scan(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();

        // Every file counts; ignore files and hidden-file rules do not apply here.
        // `.git` directories are pruned rather than walked.
        let walker = WalkBuilder::new(&self.root)
            .standard_filters(false)
            .follow_links(false)
            .filter_entry(|entry| entry.file_name() != OsStr::new(".git"))
            .build();

        for result in walker {
            match result {
                Ok(entry) => {
                    let is_file = entry.file_type().is_some_and(|t| t.is_file());
                    if is_file && self.accepts(entry.path()) {
                        files.push(entry.path().to_path_buf());
                    }
                }
                Err(err) => log::warn!("Error walking entry: {}", err),
            }
        }

        files.sort();
        files
    }

    fn accepts(&self, path: &Path) -> bool {
        let Some(relative) = diff_paths(path, &self.root) else {
            return false;
        };

        if let Some(ext) = &self.extension {
            let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
            if !name.ends_with(ext.as_str()) {
                return false;
            }
        }

        !self.exclude_set.is_match(&relative)
    }
}

fn build_globset(patterns: &[String]) -> Result<GlobSet, RunError> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = Glob::new(pat).map_err(|source| RunError::InvalidPattern {
            pattern: pat.clone(),
            source,
        })?;
        builder.add(glob);
    }
    builder.build().map_err(|source| RunError::InvalidPattern {
        pattern: patterns.join(", "),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn tree(files: &[&str]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for file in files {
            let path = dir.path().join(file);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, "x").unwrap();
        }
        dir
    }

    fn names(dir: &TempDir, files: Vec<PathBuf>) -> Vec<String> {
        files
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_string_lossy().replace('\\', "/"))
            .collect()
    }

    #[test]
    fn walks_recursively_in_sorted_order() {
        let dir = tree(&["c.py", "a.py", "sub/b.md", ".hidden", ".git/HEAD"]);
        let scanner = Scanner::new(dir.path().to_path_buf(), None, &[]).unwrap();

        assert_eq!(names(&dir, scanner.scan()), vec![".hidden", "a.py", "c.py", "sub/b.md"]);
    }

    #[test]
    fn nested_git_directories_are_skipped() {
        let dir = tree(&["vendor/lib/.git/objects/ab/cdef", "vendor/lib/mod.rs", "main.rs"]);
        let scanner = Scanner::new(dir.path().to_path_buf(), None, &[]).unwrap();

        assert_eq!(names(&dir, scanner.scan()), vec!["main.rs", "vendor/lib/mod.rs"]);
    }

    #[test]
    fn extension_filter_matches_suffix_exactly() {
        let dir = tree(&["a.py", "b.md", "c.py", "d.pyc"]);
        let scanner = Scanner::new(dir.path().to_path_buf(), Some(".py".into()), &[]).unwrap();

        assert_eq!(names(&dir, scanner.scan()), vec!["a.py", "c.py"]);
    }

    #[test]
    fn exclude_patterns_apply_to_relative_paths() {
        let dir = tree(&["src/lib.rs", "target/debug/out.rs", "notes.txt"]);
        let scanner =
            Scanner::new(dir.path().to_path_buf(), None, &["target/**".to_string()]).unwrap();

        assert_eq!(names(&dir, scanner.scan()), vec!["notes.txt", "src/lib.rs"]);
    }

    #[test]
    fn invalid_glob_is_rejected() {
        let err = Scanner::new(PathBuf::from("."), None, &["a[".to_string()]).err().unwrap();
        assert!(matches!(err, RunError::InvalidPattern { .. }));
    }
}
