//! Diagram engine backed by an external command-line renderer.

use super::{DiagramEngine, DiagramError};
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Default renderer program (mermaid-cli).
pub const DEFAULT_DIAGRAM_COMMAND: &str = "mmdc";

/// Default time allowed for one diagram.
pub const DEFAULT_DIAGRAM_TIMEOUT: Duration = Duration::from_secs(30);

const INPUT_TOKEN: &str = "{input}";
const OUTPUT_TOKEN: &str = "{output}";

/// Runs an external program for each diagram.
///
/// The source is written to a scratch directory, the program is run with
/// `{input}` and `{output}` substituted in its arguments, and the SVG is
/// read back from the output file.
#[derive(Debug, Clone)]
pub struct CommandEngine {
    program: String,
    args: Vec<String>,
    timeout: Duration,
    work_dir: PathBuf,
}

impl CommandEngine {
    /// Engine running `mmdc -i {input} -o {output}`.
    pub fn new() -> Self {
        Self::with_command(
            DEFAULT_DIAGRAM_COMMAND,
            ["-i", INPUT_TOKEN, "-o", OUTPUT_TOKEN],
        )
    }

    /// Engine running a custom program and argument template.
    pub fn with_command<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            timeout: DEFAULT_DIAGRAM_TIMEOUT,
            work_dir: std::env::temp_dir(),
        }
    }

    /// Parse a command line such as `"mmdc -i {input} -o {output}"`.
    ///
    /// Arguments are split on whitespace; a command without tokens gets
    /// `-i {input} -o {output}` appended.
    pub fn from_command_line(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace();
        let program = parts.next()?;
        let mut args: Vec<String> = parts.map(str::to_string).collect();
        if !args.iter().any(|a| a.contains(INPUT_TOKEN) || a.contains(OUTPUT_TOKEN)) {
            args.extend(["-i", INPUT_TOKEN, "-o", OUTPUT_TOKEN].map(String::from));
        }
        Some(Self::with_command(program, args))
    }

    /// Set the per-diagram timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the directory for temporary files.
    pub fn with_work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = dir.into();
        self
    }

    /// Program name.
    pub fn program(&self) -> &str {
        &self.program
    }

    async fn run(&self, input: &Path, output: &Path) -> Result<String, DiagramError> {
        let args: Vec<String> = self
            .args
            .iter()
            .map(|arg| {
                arg.replace(INPUT_TOKEN, &input.to_string_lossy())
                    .replace(OUTPUT_TOKEN, &output.to_string_lossy())
            })
            .collect();

        let child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let result = tokio::time::timeout(self.timeout, child)
            .await
            .map_err(|_| DiagramError::Timeout(self.timeout.as_millis() as u64))?;

        let out = result.map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => {
                DiagramError::Unavailable(format!("{} not found", self.program))
            }
            _ => DiagramError::Io(e),
        })?;

        if !out.status.success() {
            let stderr = String::from_utf8_lossy(&out.stderr);
            let stdout = String::from_utf8_lossy(&out.stdout);
            let message = if stderr.trim().is_empty() {
                stdout.trim().to_string()
            } else {
                stderr.trim().to_string()
            };
            return Err(DiagramError::Syntax(if message.is_empty() {
                format!("{} exited with {}", self.program, out.status)
            } else {
                message
            }));
        }

        let svg = tokio::fs::read_to_string(output).await?;
        if !svg.contains("<svg") {
            return Err(DiagramError::Engine(format!(
                "{} produced no SVG output",
                self.program
            )));
        }
        Ok(svg)
    }
}

impl Default for CommandEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl DiagramEngine for CommandEngine {
    async fn render(&self, id: &str, source: &str) -> Result<String, DiagramError> {
        // Removed on drop, including when the render is cancelled mid-run.
        let scratch = tempfile::Builder::new()
            .prefix(&format!("paperdown-{}-", sanitize(id)))
            .tempdir_in(&self.work_dir)?;
        let input = scratch.path().join("diagram.mmd");
        let output = scratch.path().join("diagram.svg");

        tokio::fs::write(&input, source).await?;
        log::debug!("Rendering diagram {} with {}", id, self.program);
        let result = self.run(&input, &output).await;

        if let Err(e) = scratch.close() {
            log::debug!("Could not remove diagram scratch directory: {}", e);
        }

        result
    }
}

fn sanitize(id: &str) -> String {
    id.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}
