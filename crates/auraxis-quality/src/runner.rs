//! Subprocess execution for the test suite and the scanner

use crate::{QualityError, QualityResult};
use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::debug;

/// A program with its arguments and extra environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
        }
    }

    /// Run `script` through `sh -c`
    pub fn shell(script: impl Into<String>) -> Self {
        Self::new("sh").arg("-c").arg(script)
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Printable form with environment values left out
    pub fn display_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Exit status and combined stdout/stderr of a finished command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// `None` when the process was killed by a signal
    pub exit_code: Option<i32>,
    pub output: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Exit code to report, with signals and odd zero codes mapped to 1
    pub fn failure_code(&self) -> i32 {
        match self.exit_code {
            Some(code) if code != 0 => code,
            _ => 1,
        }
    }
}

#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run to completion. Only launch failures are errors.
    async fn run(&self, spec: &CommandSpec) -> QualityResult<CommandOutput>;
}

/// Runs commands with `tokio::process`, echoing output as it arrives
#[derive(Debug, Clone, Default)]
pub struct SystemCommandRunner {
    echo: bool,
}

impl SystemCommandRunner {
    pub fn new() -> Self {
        Self { echo: true }
    }

    /// Capture output without echoing it
    pub fn quiet() -> Self {
        Self { echo: false }
    }
}

/// Read `reader` to EOF line by line. Bytes that are not UTF-8 are decoded
/// lossily so the pipe is always drained.
async fn collect_lines<R>(reader: Option<R>, echo: bool, to_stderr: bool) -> Vec<String>
where
    R: AsyncRead + Unpin,
{
    let mut lines_out = Vec::new();
    let Some(reader) = reader else {
        return lines_out;
    };
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                debug!(target: "auraxis::quality", error = %e, "stopped reading child output");
                break;
            }
        }
        let raw = buf.strip_suffix(b"\n").unwrap_or(&buf[..]);
        let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
        let line = String::from_utf8_lossy(raw).into_owned();
        if echo {
            if to_stderr {
                eprintln!("{}", line);
            } else {
                println!("{}", line);
            }
        }
        lines_out.push(line);
    }
    lines_out
}

#[async_trait]
impl CommandRunner for SystemCommandRunner {
    async fn run(&self, spec: &CommandSpec) -> QualityResult<CommandOutput> {
        debug!(target: "auraxis::quality", command = %spec.display_line(), "spawning");

        let mut command = Command::new(&spec.program);
        command
            .args(&spec.args)
            .envs(spec.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let spawn_error = |source: std::io::Error| QualityError::Spawn {
            program: spec.program.clone(),
            step: None,
            source,
        };
        let mut child = command.spawn().map_err(spawn_error)?;

        let (stdout, stderr) = tokio::join!(
            collect_lines(child.stdout.take(), self.echo, false),
            collect_lines(child.stderr.take(), self.echo, true),
        );
        let status = child.wait().await.map_err(spawn_error)?;

        let mut output = stdout.join("\n");
        if !stderr.is_empty() {
            if !output.is_empty() {
                output.push('\n');
            }
            output.push_str(&stderr.join("\n"));
        }

        debug!(
            target: "auraxis::quality",
            program = %spec.program,
            exit_code = ?status.code(),
            "command finished"
        );
        Ok(CommandOutput {
            exit_code: status.code(),
            output,
        })
    }
}
