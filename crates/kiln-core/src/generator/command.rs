//! Generator adapter that runs a local model CLI as a subprocess.
//!
//! The rendered prompt is written to the child's stdin and the response is
//! read from its stdout. Works with any runner that follows that contract,
//! e.g. `ollama run <model>` or `claude -p`.

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;

use super::trait_def::Generator;
use super::types::{GenerateError, GenerationRequest};

/// Runs `program args...` once per request.
#[derive(Debug, Clone)]
pub struct CommandGenerator {
    name: String,
    program: String,
    args: Vec<String>,
    timeout: Duration,
    env: Vec<(String, String)>,
}

impl CommandGenerator {
    /// Default per-call timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);

    pub fn new(name: impl Into<String>, program: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
            args: Vec::new(),
            timeout: Self::DEFAULT_TIMEOUT,
            env: Vec::new(),
        }
    }

    /// `ollama run <model>`.
    pub fn ollama(model: &str) -> Self {
        Self::new("ollama", "ollama").with_args(["run", model])
    }

    /// `claude -p`, optionally pinned to a model.
    pub fn claude(model: Option<&str>) -> Self {
        let mut generator = Self::new("claude", "claude").with_args(["-p"]);
        if let Some(model) = model {
            generator.args.push("--model".to_owned());
            generator.args.push(model.to_owned());
        }
        generator
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn io_error(&self, source: std::io::Error) -> GenerateError {
        GenerateError::Io {
            generator: self.name.clone(),
            source,
        }
    }
}

#[async_trait]
impl Generator for CommandGenerator {
    fn name(&self) -> &str {
        &self.name
    }

    async fn invoke(&self, request: &GenerationRequest) -> Result<String, GenerateError> {
        tracing::debug!(
            generator = %self.name,
            label = %request.label,
            prompt_len = request.prompt.len(),
            "invoking command generator"
        );

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .envs(self.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| GenerateError::Unavailable {
            generator: self.name.clone(),
            reason: format!("failed to start {:?}: {e}", self.program),
        })?;

        let mut stdin_pipe = child.stdin.take();
        let mut stdout_pipe = child.stdout.take();
        let mut stderr_pipe = child.stderr.take();

        // Feed stdin while draining stdout/stderr so a chatty child cannot
        // fill a pipe and stall.
        let write_stdin = async {
            if let Some(mut pipe) = stdin_pipe.take() {
                if let Err(e) = pipe.write_all(request.prompt.as_bytes()).await {
                    if e.kind() != std::io::ErrorKind::BrokenPipe {
                        return Err(e);
                    }
                }
                // Dropping the handle closes the child's stdin.
                drop(pipe);
            }
            Ok(())
        };

        let read_stdout = async {
            let mut buf = Vec::new();
            if let Some(ref mut pipe) = stdout_pipe {
                pipe.read_to_end(&mut buf).await?;
            }
            Ok::<_, std::io::Error>(buf)
        };

        let read_stderr = async {
            let mut buf = Vec::new();
            if let Some(ref mut pipe) = stderr_pipe {
                pipe.read_to_end(&mut buf).await.ok();
            }
            String::from_utf8_lossy(&buf).into_owned()
        };

        let outcome = tokio::time::timeout(self.timeout, async {
            tokio::join!(write_stdin, child.wait(), read_stdout, read_stderr)
        })
        .await;

        match outcome {
            Ok((stdin_result, wait_result, stdout_result, stderr)) => {
                let status = wait_result.map_err(|e| self.io_error(e))?;
                stdin_result.map_err(|e| self.io_error(e))?;
                let stdout = stdout_result.map_err(|e| self.io_error(e))?;

                if !status.success() {
                    return Err(GenerateError::Failed {
                        generator: self.name.clone(),
                        status: status.code(),
                        stderr: stderr.trim().to_owned(),
                    });
                }

                String::from_utf8(stdout).map_err(|e| GenerateError::Malformed {
                    generator: self.name.clone(),
                    reason: format!("output is not valid UTF-8: {e}"),
                })
            }
            Err(_) => {
                let _ = child.kill().await;
                tracing::warn!(
                    generator = %self.name,
                    label = %request.label,
                    timeout_secs = self.timeout.as_secs(),
                    "generator timed out"
                );
                Err(GenerateError::Timeout {
                    generator: self.name.clone(),
                    after: self.timeout,
                })
            }
        }
    }
}
