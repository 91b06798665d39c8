use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cerise_capability::{CommandInvoker, LogPublisher, Publisher, WebhookPublisher};
use cerise_config::WorkflowDef;
use cerise_orchestrator::WorkflowExecutor;
use cerise_resolver::{FsTargetCatalog, Resolver, StandardResolver};
use cerise_workflow::WorkflowDefinition;

/// Cerise - a workflow orchestrator for external actions
#[derive(Parser)]
#[command(name = "cerise")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Path to the data directory (default: ~/.cerise)
  #[arg(long, global = true)]
  data_dir: Option<PathBuf>,

  /// Skip checking that step targets exist under <data_dir>/targets
  #[arg(long, global = true)]
  permissive: bool,

  /// Enable debug logging
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Run a workflow with a JSON payload read from stdin
  Run {
    /// Path to the workflow file (JSON)
    workflow_file: PathBuf,

    /// Program used to run step targets (e.g. /bin/sh)
    #[arg(long)]
    interpreter: Option<PathBuf>,

    /// Deliver a topic to a webhook, as TOPIC=URL. May be repeated.
    #[arg(long = "webhook", value_name = "TOPIC=URL")]
    webhooks: Vec<String>,
  },

  /// Validate a workflow and print its transitions
  Validate {
    /// Path to the workflow file (JSON)
    workflow_file: PathBuf,
  },
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  let filter = if cli.verbose { "debug" } else { "info" };
  tracing_subscriber::registry()
    .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
    .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
    .init();

  let data_dir = match cli.data_dir {
    Some(dir) => dir,
    None => dirs::home_dir()
      .context("could not determine home directory")?
      .join(".cerise"),
  };

  match cli.command {
    Some(Commands::Run {
      workflow_file,
      interpreter,
      webhooks,
    }) => {
      let rt = tokio::runtime::Runtime::new()?;
      rt.block_on(run_workflow(
        workflow_file,
        data_dir,
        cli.permissive,
        interpreter,
        webhooks,
      ))?;
    }
    Some(Commands::Validate { workflow_file }) => {
      validate_workflow(&workflow_file, &data_dir, cli.permissive)?;
    }
    None => {
      println!("cerise - use --help to see available commands");
    }
  }

  Ok(())
}

fn load_workflow(workflow_file: &Path, data_dir: &Path, permissive: bool) -> Result<WorkflowDefinition> {
  let content = std::fs::read_to_string(workflow_file)
    .with_context(|| format!("failed to read workflow file: {}", workflow_file.display()))?;

  let def: WorkflowDef = serde_json::from_str(&content)
    .with_context(|| format!("failed to parse workflow file: {}", workflow_file.display()))?;

  let definition = if permissive {
    StandardResolver::permissive().resolve(def)
  } else {
    StandardResolver::new(FsTargetCatalog::new(data_dir.join("targets"))).resolve(def)
  };
  definition.context("failed to resolve workflow")
}

fn validate_workflow(workflow_file: &Path, data_dir: &Path, permissive: bool) -> Result<()> {
  let definition = load_workflow(workflow_file, data_dir, permissive)?;

  println!("workflow: {}", definition.name());
  println!("entry: {}", definition.entry().name());
  for step in definition.steps() {
    println!(
      "step {} -> {} ({:?}, {} MB, {:?}, {} retries)",
      step.name(),
      step.target(),
      step.mode(),
      step.budget().memory_mb,
      step.budget().timeout,
      step.max_retry_attempts()
    );
  }
  for edge in definition.edges() {
    println!("  {edge}");
  }

  Ok(())
}

async fn run_workflow(
  workflow_file: PathBuf,
  data_dir: PathBuf,
  permissive: bool,
  interpreter: Option<PathBuf>,
  webhooks: Vec<String>,
) -> Result<()> {
  let definition = load_workflow(&workflow_file, &data_dir, permissive)?;
  info!(workflow = %definition.name(), steps = definition.steps().len(), "workflow_loaded");

  let payload = read_payload_from_stdin()?;

  let mut invoker = CommandInvoker::new().with_root(data_dir.join("targets"));
  if let Some(interpreter) = interpreter {
    invoker = invoker.with_interpreter(interpreter);
  }
  let publisher = build_publisher(&webhooks)?;
  let executor = WorkflowExecutor::new(Arc::new(invoker), publisher);

  let cancel = CancellationToken::new();
  let on_interrupt = cancel.clone();
  tokio::spawn(async move {
    if tokio::signal::ctrl_c().await.is_ok() {
      warn!("interrupt_received_cancelling");
      on_interrupt.cancel();
    }
  });

  let result = executor.run_with_cancel(&definition, payload, cancel).await;
  println!("{}", serde_json::to_string_pretty(&result)?);

  // Event steps outlive the execution; the runtime must not drop them.
  let pending = executor.dispatched_in_flight();
  if pending > 0 {
    info!(pending, "waiting_for_dispatched_steps");
  }
  executor.wait_dispatched().await;

  if let Some(reason) = result.failure() {
    bail!("execution {} failed: {:?}", result.execution_id, reason);
  }
  Ok(())
}

fn build_publisher(webhooks: &[String]) -> Result<Arc<dyn Publisher>> {
  if webhooks.is_empty() {
    return Ok(Arc::new(LogPublisher));
  }

  let mut publisher = WebhookPublisher::new();
  for webhook in webhooks {
    let Some((topic, url)) = webhook.split_once('=') else {
      bail!("invalid --webhook '{webhook}', expected TOPIC=URL");
    };
    publisher = publisher
      .with_topic(topic, url)
      .with_context(|| format!("invalid webhook for topic '{topic}'"))?;
  }
  Ok(Arc::new(publisher))
}

fn read_payload_from_stdin() -> Result<serde_json::Value> {
  use std::io::IsTerminal;

  if io::stdin().is_terminal() {
    // No stdin pipe, use empty object
    return Ok(serde_json::json!({}));
  }

  let mut input = String::new();
  io::stdin()
    .read_to_string(&mut input)
    .context("failed to read payload from stdin")?;

  if input.trim().is_empty() {
    Ok(serde_json::json!({}))
  } else {
    serde_json::from_str(&input).context("failed to parse payload JSON from stdin")
  }
}
