//! Agents running as external executables.
//!
//! The executable reads one JSON message per line on stdin and writes one JSON reply per
//! line on stdout, following the same protocol as in-process agents. Unparsable lines are
//! forwarded as plain strings so the referee can flag them.

use std::{
    io::{BufRead, BufReader, Write},
    path::{Path, PathBuf},
    process::{Child, ChildStdin, ChildStdout, Command, Stdio},
    thread,
    time::{Duration, Instant},
};

use anyhow::{bail, Context};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::{
    agent::Agent,
    mailbox::{AgentLink, Outbox},
};

#[derive(Debug, Clone)]
pub struct ProcessAgent {
    command: PathBuf,
    args: Vec<String>,
    allow_stderr: bool,
}

impl ProcessAgent {
    /// How long the process may take to exit once its stdin is closed.
    const EXIT_GRACE: Duration = Duration::from_secs(1);

    pub fn new(command: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
            allow_stderr: false,
        }
    }

    /// Let the agent's stderr through (debug purposes only).
    pub fn with_stderr(mut self, value: bool) -> Self {
        self.allow_stderr = value;
        self
    }
}

/// Kills the child on drop.
struct ChildGuard(Child);

impl ChildGuard {
    fn wait_exit(&mut self, max_duration: Duration) -> anyhow::Result<()> {
        let deadline = Instant::now() + max_duration;
        while Instant::now() < deadline {
            if let Some(status) = self.0.try_wait().context("could not poll process")? {
                if !status.success() {
                    bail!("agent exited with {status}");
                }
                return Ok(());
            }
            thread::sleep(Duration::from_millis(5));
        }
        bail!("agent did not exit within {max_duration:?}")
    }
}

impl Drop for ChildGuard {
    fn drop(&mut self) {
        if let Ok(None) = self.0.try_wait() {
            if let Err(e) = self.0.kill() {
                warn!("could not kill agent process {}: {e}", self.0.id());
            }
            let _ = self.0.wait();
        }
    }
}

fn create_process(command: &Path, args: &[String], allow_stderr: bool) -> anyhow::Result<Child> {
    let mut cmd = Command::new(command);
    cmd.args(args).stdin(Stdio::piped()).stdout(Stdio::piped());
    if !allow_stderr {
        cmd.stderr(Stdio::null());
    }
    cmd.spawn()
        .with_context(|| format!("command '{}' not found", command.display()))
}

impl Agent for ProcessAgent {
    #[instrument(skip_all, fields(command = %self.command.display()))]
    fn run(&mut self, link: AgentLink) -> anyhow::Result<()> {
        let mut child = ChildGuard(create_process(
            &self.command,
            &self.args,
            self.allow_stderr,
        )?);
        let mut stdin = child.0.stdin.take().context("no stdin")?;
        let stdout = child.0.stdout.take().context("no stdout")?;

        let (inbox, outbox) = link.split();
        thread::Builder::new()
            .name("agent-stdout".to_owned())
            .spawn(move || pump_replies(stdout, outbox))
            .context("could not spawn stdout reader")?;

        let header = inbox.receive_value()?;
        let total_rounds = header
            .get("total_rounds")
            .and_then(Value::as_u64)
            .context("match header without total_rounds")? as usize;
        write_line(&mut stdin, &header)?;

        // a round header and a round result per round
        for _ in 0..2 * total_rounds {
            let message = inbox.receive_value()?;
            write_line(&mut stdin, &message)?;
        }
        drop(stdin);

        child.wait_exit(Self::EXIT_GRACE)
    }
}

fn write_line(stdin: &mut ChildStdin, message: &Value) -> anyhow::Result<()> {
    let mut line = serde_json::to_string(message)?;
    line.push('\n');
    stdin
        .write_all(line.as_bytes())
        .and_then(|_| stdin.flush())
        .context("agent closed its stdin")
}

fn pump_replies(stdout: ChildStdout, outbox: Outbox) {
    for line in BufReader::new(stdout).lines() {
        let Ok(line) = line else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }
        let value = serde_json::from_str(&line).unwrap_or(Value::String(line));
        if outbox.send_value(value).is_err() {
            debug!("referee hung up, dropping agent output");
            break;
        }
    }
}
