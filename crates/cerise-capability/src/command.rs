//! Runs step targets as local processes.
//!
//! The payload is written to the child's stdin as JSON and the child's stdout
//! is parsed as the result payload. Environment parameters become environment
//! variables. A non-zero exit status is an invocation failure.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::invoke::{InvocationRequest, InvokeError, Invoker};

/// Environment variable carrying the step's memory budget in MB.
pub const MEMORY_LIMIT_ENV: &str = "CERISE_MEMORY_LIMIT_MB";

#[derive(Debug, Clone, Default)]
pub struct CommandInvoker {
  root: Option<PathBuf>,
  interpreter: Option<PathBuf>,
}

impl CommandInvoker {
  pub fn new() -> Self {
    Self::default()
  }

  /// Resolve relative targets under `root`.
  pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
    self.root = Some(root.into());
    self
  }

  /// Run every target through `interpreter`, e.g. `/bin/sh`.
  pub fn with_interpreter(mut self, interpreter: impl Into<PathBuf>) -> Self {
    self.interpreter = Some(interpreter.into());
    self
  }

  fn program(&self, target: &str) -> PathBuf {
    let path = Path::new(target);
    match &self.root {
      Some(root) if path.is_relative() => root.join(path),
      _ => path.to_path_buf(),
    }
  }

  fn command(&self, request: &InvocationRequest) -> Command {
    let program = self.program(&request.target);
    let mut command = match &self.interpreter {
      Some(interpreter) => {
        let mut command = Command::new(interpreter);
        command.arg(program);
        command
      }
      None => Command::new(program),
    };

    command
      .envs(&request.env)
      .env(MEMORY_LIMIT_ENV, request.memory_mb.to_string())
      .env("CERISE_STEP", &request.step)
      .env("CERISE_EXECUTION_ID", &request.execution_id)
      .stdin(Stdio::piped())
      .stdout(Stdio::piped())
      .stderr(Stdio::piped())
      .kill_on_drop(true);
    command
  }

  async fn run(&self, request: &InvocationRequest) -> Result<serde_json::Value, InvokeError> {
    let input = serde_json::to_vec(&request.payload).map_err(|e| InvokeError::InvalidOutput {
      message: format!("payload is not serializable: {}", e),
    })?;

    let mut child = self
      .command(request)
      .spawn()
      .map_err(|source| InvokeError::Spawn {
        target: request.target.clone(),
        source,
      })?;

    // Feed stdin while output is collected; a large payload would otherwise
    // block on a full pipe. Dropping the handle closes the child's stdin.
    let stdin = child.stdin.take();
    let feed = async move {
      let Some(mut stdin) = stdin else {
        return Ok(());
      };
      match stdin.write_all(&input).await {
        // The action may exit without reading its input.
        Err(e) if e.kind() == ErrorKind::BrokenPipe => Ok(()),
        result => result,
      }
    };

    let (fed, output) = tokio::join!(feed, child.wait_with_output());
    fed?;
    let output = output?;
    if !output.status.success() {
      return Err(InvokeError::Exited {
        status: output.status.to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
      });
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    if stdout.trim().is_empty() {
      return Ok(serde_json::Value::Null);
    }
    serde_json::from_str(stdout.trim()).map_err(|e| InvokeError::InvalidOutput {
      message: format!("invalid JSON: {}", e),
    })
  }
}

#[async_trait]
impl Invoker for CommandInvoker {
  async fn invoke(&self, request: InvocationRequest) -> Result<serde_json::Value, InvokeError> {
    debug!(
      execution_id = %request.execution_id,
      step = %request.step,
      target = %request.target,
      "spawning action"
    );

    // Dropping the child on timeout kills it.
    tokio::time::timeout(request.timeout, self.run(&request))
      .await
      .map_err(|_| InvokeError::TimedOut(request.timeout))?
  }
}
