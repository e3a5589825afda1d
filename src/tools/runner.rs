//! Subprocess runner for external lookup tools.

use super::{parse_output, ToolSpec};
use crate::types::{MailprobeError, Result, Status, ToolFinding, ToolResult};
use chrono::Local;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

/// Longest evidence string kept from a failed tool's output.
const MAX_EVIDENCE_CHARS: usize = 2000;

/// Captured output of a tool process, complete or cut short by the timeout.
struct ToolOutput {
    stdout: String,
    stderr: String,
    exit_code: Option<i32>,
    timed_out: bool,
}

impl ToolOutput {
    /// stdout, or stderr when stdout is blank.
    fn captured(&self) -> &str {
        if self.stdout.trim().is_empty() {
            self.stderr.trim()
        } else {
            self.stdout.trim()
        }
    }
}

/// A pipe drained into a shared buffer by a background task, so whatever was
/// read survives a timeout.
struct PipeCapture {
    buffer: Arc<Mutex<Vec<u8>>>,
    task: JoinHandle<()>,
}

impl PipeCapture {
    fn spawn<R>(pipe: Option<R>) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&buffer);

        let task = tokio::spawn(async move {
            let Some(mut pipe) = pipe else {
                return;
            };
            let mut chunk = [0u8; 4096];
            loop {
                match pipe.read(&mut chunk).await {
                    Ok(0) => break,
                    Ok(n) => sink.lock().await.extend_from_slice(&chunk[..n]),
                    Err(e) => {
                        trace!("Pipe read failed: {}", e);
                        break;
                    }
                }
            }
        });

        Self { buffer, task }
    }

    /// Wait for end of output.
    async fn finish(mut self) -> String {
        if let Err(e) = (&mut self.task).await {
            trace!("Pipe reader ended abnormally: {}", e);
        }
        self.text().await
    }

    /// Stop reading and keep what arrived so far.
    async fn abandon(self) -> String {
        self.task.abort();
        self.text().await
    }

    async fn text(&self) -> String {
        String::from_utf8_lossy(&self.buffer.lock().await).into_owned()
    }
}

/// Runs installed lookup tools one after another with a bounded timeout.
pub struct ToolRunner {
    tools: Vec<ToolSpec>,
    timeout: Duration,
}

impl ToolRunner {
    /// Create a runner over the catalog's tools.
    pub fn new(tools: Vec<ToolSpec>, timeout_secs: u64) -> Self {
        Self {
            tools,
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    /// Capability probe: the tools whose program is found on `PATH`.
    pub fn detect(&self) -> Vec<&ToolSpec> {
        self.tools
            .iter()
            .filter(|tool| match which::which(&tool.program) {
                Ok(path) => {
                    debug!("Found {} at {:?}", tool.name, path);
                    true
                }
                Err(_) => {
                    debug!("{} not installed, skipping", tool.name);
                    false
                }
            })
            .collect()
    }

    /// Run one tool. Failures become a single Error finding instead of an `Err`;
    /// a tool that turns out not to be installed yields `None`.
    ///
    /// Dropping the returned future kills the tool process.
    pub async fn run(&self, tool: &ToolSpec, email: &str) -> Option<ToolResult> {
        let target = tool.target_for(email).to_string();

        let result = match self.execute(tool, &target).await {
            Ok(output) if output.timed_out => {
                let err = MailprobeError::ToolTimeout {
                    tool: tool.name.clone(),
                    secs: self.timeout.as_secs(),
                };
                warn!("{}", err);
                let evidence = match output.captured() {
                    "" => err.to_string(),
                    captured => format!("{}\n{}", truncate(captured), err),
                };
                error_result(tool, target, evidence, None)
            }
            Ok(output) if output.exit_code == Some(0) => {
                let findings = parse_output(tool.format, &output.stdout);
                debug!("{} reported {} findings", tool.name, findings.len());
                ToolResult {
                    tool_name: tool.name.clone(),
                    target,
                    findings,
                    raw_exit_code: output.exit_code,
                    finished_at: Local::now(),
                }
            }
            Ok(output) => {
                let err = MailprobeError::ToolFailure {
                    tool: tool.name.clone(),
                    code: output.exit_code,
                };
                warn!("{}", err);
                let evidence = match output.captured() {
                    "" => err.to_string(),
                    captured => truncate(captured),
                };
                error_result(tool, target, evidence, output.exit_code)
            }
            Err(MailprobeError::ToolUnavailable(name)) => {
                debug!("{} disappeared from PATH, skipping", name);
                return None;
            }
            Err(e) => {
                warn!("{}", e);
                error_result(tool, target, e.to_string(), None)
            }
        };

        Some(result)
    }

    async fn execute(&self, tool: &ToolSpec, target: &str) -> Result<ToolOutput> {
        debug!("Running {} {:?} {}", tool.program, tool.args, target);

        let mut child = Command::new(&tool.program)
            .args(&tool.args)
            .arg(target)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => MailprobeError::ToolUnavailable(tool.name.clone()),
                _ => MailprobeError::IoError(e),
            })?;

        let stdout = PipeCapture::spawn(child.stdout.take());
        let stderr = PipeCapture::spawn(child.stderr.take());

        match tokio::time::timeout(self.timeout, child.wait()).await {
            Ok(status) => {
                let status = status?;
                Ok(ToolOutput {
                    stdout: stdout.finish().await,
                    stderr: stderr.finish().await,
                    exit_code: status.code(),
                    timed_out: false,
                })
            }
            Err(_) => {
                if let Err(e) = child.kill().await {
                    warn!("Failed to kill {}: {}", tool.name, e);
                }
                Ok(ToolOutput {
                    stdout: stdout.abandon().await,
                    stderr: stderr.abandon().await,
                    exit_code: None,
                    timed_out: true,
                })
            }
        }
    }
}

fn error_result(tool: &ToolSpec, target: String, evidence: String, code: Option<i32>) -> ToolResult {
    ToolResult {
        tool_name: tool.name.clone(),
        target,
        findings: vec![ToolFinding {
            service: tool.name.clone(),
            status: Status::Error,
            evidence,
        }],
        raw_exit_code: code,
        finished_at: Local::now(),
    }
}

fn truncate(text: &str) -> String {
    match text.char_indices().nth(MAX_EVIDENCE_CHARS) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
