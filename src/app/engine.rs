use crate::app::error::RunError;
use std::io::{ErrorKind, Write};
use std::process::{Command, Stdio};
use std::thread;

/// Sends one prompt/source pair to an inference backend.
pub trait ProcessInvoker {
    fn invoke(&self, prompt_text: &str, source_text: &str, model: &str) -> Result<String, RunError>;
}

/// Prompt, a newline, then the source. An empty source still keeps the newline.
pub fn join_payload(prompt_text: &str, source_text: &str) -> String {
    format!("{}\n{}", prompt_text, source_text)
}

/// Runs `<binary> run <model>` with the payload on stdin.
pub struct CommandInvoker {
    binary: String,
}

impl CommandInvoker {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl ProcessInvoker for CommandInvoker {
    fn invoke(&self, prompt_text: &str, source_text: &str, model: &str) -> Result<String, RunError> {
        let payload = join_payload(prompt_text, source_text);
        log::debug!(
            "Spawning {} run {} ({} bytes on stdin)",
            self.binary,
            model,
            payload.len()
        );

        let mut child = Command::new(&self.binary)
            .arg("run")
            .arg(model)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| RunError::EngineUnavailable {
                binary: self.binary.clone(),
                source,
            })?;

        // stdin is fed from its own thread while stdout/stderr drain here.
        let stdin = child.stdin.take();
        let (written, output) = thread::scope(|scope| {
            let writer = scope.spawn(|| match stdin {
                Some(mut stdin) => stdin.write_all(payload.as_bytes()),
                None => Ok(()),
            });
            let output = child.wait_with_output();
            (writer.join(), output)
        });

        let output = output.map_err(|err| {
            RunError::EngineInvocationFailed(format!("failed to wait for {}: {}", self.binary, err))
        })?;

        match written {
            Ok(Ok(())) => {}
            // An engine that exits without draining stdin is judged by its exit status.
            Ok(Err(err)) if err.kind() == ErrorKind::BrokenPipe => {}
            Ok(Err(err)) => {
                return Err(RunError::EngineInvocationFailed(format!(
                    "failed to write to {}: {}",
                    self.binary, err
                )))
            }
            Err(_) => {
                return Err(RunError::EngineInvocationFailed(format!(
                    "stdin writer for {} panicked",
                    self.binary
                )))
            }
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let message = if stderr.is_empty() {
                format!("{} exited with {}", self.binary, output.status)
            } else {
                stderr
            };
            return Err(RunError::EngineInvocationFailed(message));
        }

        String::from_utf8(output.stdout).map_err(|_| {
            RunError::EngineInvocationFailed(format!("{} produced non UTF-8 output", self.binary))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_joins_prompt_and_source_with_newline() {
        assert_eq!(join_payload("Refactor this", "print('hi')"), "Refactor this\nprint('hi')");
        assert_eq!(join_payload("Summarize", ""), "Summarize\n");
    }

    #[test]
    fn missing_binary_is_unavailable() {
        let invoker = CommandInvoker::new("/nonexistent/localmind-engine");
        let err = invoker.invoke("p", "s", "local").unwrap_err();
        assert!(matches!(err, RunError::EngineUnavailable { .. }));
    }

    #[cfg(unix)]
    mod unix {
        use super::*;
        use std::fs;
        use std::os::unix::fs::PermissionsExt;
        use std::sync::mpsc;
        use std::time::Duration;
        use tempfile::TempDir;

        fn script(dir: &TempDir, body: &str) -> String {
            let path = dir.path().join("engine.sh");
            fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
            path.display().to_string()
        }

        #[test]
        fn passes_model_as_argument_and_payload_on_stdin() {
            let dir = TempDir::new().unwrap();
            let engine = script(&dir, r#"printf '%s %s|' "$1" "$2"; cat"#);
            let output = CommandInvoker::new(engine)
                .invoke("Refactor this", "print('hi')", "llama3:8b")
                .unwrap();
            assert_eq!(output, "run llama3:8b|Refactor this\nprint('hi')");
        }

        #[test]
        fn echoing_engine_with_large_payload_completes() {
            let dir = TempDir::new().unwrap();
            let engine = script(&dir, "cat");
            let source = "x".repeat(1_000_000);

            let (tx, rx) = mpsc::channel();
            let worker_source = source.clone();
            thread::spawn(move || {
                let result = CommandInvoker::new(engine).invoke("Echo", &worker_source, "m");
                let _ = tx.send(result);
            });

            let output = rx
                .recv_timeout(Duration::from_secs(60))
                .expect("engine call did not finish")
                .unwrap();
            assert_eq!(output.len(), "Echo\n".len() + source.len());
            assert!(output.starts_with("Echo\nxxx"));
        }

        #[test]
        fn non_zero_exit_carries_stderr() {
            let dir = TempDir::new().unwrap();
            let engine = script(&dir, "cat >/dev/null; echo 'model not found' >&2; exit 3");
            let err = CommandInvoker::new(engine).invoke("p", "s", "m").unwrap_err();
            match err {
                RunError::EngineInvocationFailed(message) => assert_eq!(message, "model not found"),
                other => panic!("unexpected error: {other}"),
            }
        }

        #[test]
        fn empty_stderr_falls_back_to_exit_status() {
            let dir = TempDir::new().unwrap();
            let engine = script(&dir, "cat >/dev/null; exit 2");
            let err = CommandInvoker::new(engine).invoke("p", "s", "m").unwrap_err();
            match err {
                RunError::EngineInvocationFailed(message) => assert!(message.contains("exit")),
                other => panic!("unexpected error: {other}"),
            }
        }
    }
}
