use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use cerise_capability::{
  ChannelPublisher, InvocationMode, InvocationRequest, InvokeError, Invoker, Notification,
};
use cerise_orchestrator::{
  ChannelNotifier, ExecutionEvent, FailureReason, StepOutcome, WorkflowExecutor, WorkflowRunner,
};
use cerise_workflow::{
  DefinitionError, Predicate, ResourceBudget, RetryBackoff, RetryPolicy, StepSpec, Target,
  WorkflowBuilder, WorkflowDefinition, WorkflowSettings,
};
use serde_json::{Value, json};
use tokio::sync::{Barrier, mpsc};
use tokio_util::sync::CancellationToken;

#[derive(Clone)]
enum Behavior {
  Reply(Value),
  Echo,
  Fail,
  Hang,
  Rendezvous(Arc<Barrier>),
}

/// Records every invocation and answers according to a per-step behavior.
struct MockInvoker {
  behaviors: HashMap<String, Behavior>,
  calls: Mutex<Vec<String>>,
  invoked: mpsc::UnboundedSender<String>,
}

impl MockInvoker {
  fn new(behaviors: &[(&str, Behavior)]) -> (Arc<Self>, mpsc::UnboundedReceiver<String>) {
    let (invoked, receiver) = mpsc::unbounded_channel();
    let invoker = Self {
      behaviors: behaviors
        .iter()
        .map(|(step, behavior)| (step.to_string(), behavior.clone()))
        .collect(),
      calls: Mutex::new(Vec::new()),
      invoked,
    };
    (Arc::new(invoker), receiver)
  }

  fn calls(&self) -> Vec<String> {
    self.calls.lock().unwrap().clone()
  }
}

#[async_trait]
impl Invoker for MockInvoker {
  async fn invoke(&self, request: InvocationRequest) -> Result<Value, InvokeError> {
    self.calls.lock().unwrap().push(request.step.clone());
    let _ = self.invoked.send(request.step.clone());

    match self.behaviors.get(&request.step).cloned().unwrap_or(Behavior::Echo) {
      Behavior::Reply(value) => Ok(value),
      Behavior::Echo => Ok(request.payload),
      Behavior::Fail => Err(InvokeError::Action {
        message: format!("{} exploded", request.step),
      }),
      Behavior::Hang => std::future::pending::<Result<Value, InvokeError>>().await,
      Behavior::Rendezvous(barrier) => {
        barrier.wait().await;
        Ok(request.payload)
      }
    }
  }
}

fn settings() -> WorkflowSettings {
  WorkflowSettings {
    failure_topic: Some("alerts".to_string()),
    retry: RetryPolicy {
      backoff: RetryBackoff::Constant,
      initial_delay: Duration::from_millis(1),
      max_delay: Duration::from_millis(10),
    },
    ..WorkflowSettings::default()
  }
}

fn state_is_yes() -> Predicate {
  Predicate::new("$.state == \"Yes\"", |out| out["state"] == "Yes")
}

/// S1 (choice: "Yes" -> succeed, otherwise -> S2), S2 -> S3, S3 (event) -> succeed.
fn three_step() -> WorkflowDefinition {
  let mut builder = WorkflowBuilder::with_settings("three-step", settings());
  let s1 = builder.define_step(StepSpec::new("S1", "bin/s1")).unwrap();
  let s2 = builder.define_step(StepSpec::new("S2", "bin/s2")).unwrap();
  let s3 = builder
    .define_step(StepSpec::new("S3", "bin/s3").with_mode(InvocationMode::Event))
    .unwrap();

  builder.add_choice(&s1, state_is_yes(), Target::Succeeded).unwrap();
  builder.add_otherwise(&s1, &s2).unwrap();
  builder.add_transition(&s2, &s3).unwrap();
  builder.add_transition(&s3, Target::Succeeded).unwrap();
  builder.freeze().unwrap()
}

fn single_step(spec: StepSpec, settings: WorkflowSettings) -> WorkflowDefinition {
  let mut builder = WorkflowBuilder::with_settings("single", settings);
  let step = builder.define_step(spec).unwrap();
  builder.add_transition(&step, Target::Succeeded).unwrap();
  builder.freeze().unwrap()
}

fn publisher() -> (Arc<ChannelPublisher>, mpsc::UnboundedReceiver<Notification>) {
  let (publisher, receiver) = ChannelPublisher::channel();
  (Arc::new(publisher), receiver)
}

#[tokio::test]
async fn test_yes_branch_succeeds_without_later_steps() {
  let (invoker, _invoked) = MockInvoker::new(&[("S1", Behavior::Reply(json!({"state": "Yes"})))]);
  let (publisher, mut notifications) = publisher();
  let executor = WorkflowExecutor::new(invoker.clone(), publisher);

  let result = executor.run(&three_step(), json!({})).await;

  assert!(result.is_succeeded());
  assert_eq!(invoker.calls(), vec!["S1"]);
  assert_eq!(result.output, json!({"state": "Yes"}));
  assert!(notifications.try_recv().is_err());
}

#[tokio::test]
async fn test_otherwise_branch_dispatches_event_step_without_waiting() {
  let (invoker, mut invoked) = MockInvoker::new(&[
    ("S1", Behavior::Reply(json!({"state": "No"}))),
    ("S2", Behavior::Echo),
    ("S3", Behavior::Hang),
  ]);
  let (publisher, _notifications) = publisher();
  let executor = WorkflowExecutor::new(invoker.clone(), publisher);

  // S3 never completes, so finishing at all shows the executor did not wait on it.
  let result = tokio::time::timeout(Duration::from_secs(5), executor.run(&three_step(), json!({})))
    .await
    .unwrap();

  assert!(result.is_succeeded());
  assert_eq!(result.visited(), vec!["S1", "S2", "S3"]);
  assert_eq!(result.steps[2].outcome, StepOutcome::Dispatched);
  assert_eq!(result.output, json!({"state": "No"}));

  let mut seen = Vec::new();
  while seen.len() < 3 {
    let step = tokio::time::timeout(Duration::from_secs(5), invoked.recv())
      .await
      .unwrap()
      .unwrap();
    seen.push(step);
  }
  assert_eq!(seen, vec!["S1", "S2", "S3"]);
}

#[tokio::test]
async fn test_retry_limit_bounds_attempts_and_publishes_once() {
  let (invoker, _invoked) = MockInvoker::new(&[("S1", Behavior::Fail)]);
  let (publisher, mut notifications) = publisher();
  let executor = WorkflowExecutor::new(invoker.clone(), publisher);
  let definition = single_step(StepSpec::new("S1", "bin/s1").with_retries(2), settings());

  let result = executor.run(&definition, json!({"order": 7})).await;

  assert_eq!(invoker.calls().len(), 3);
  match result.failure() {
    Some(FailureReason::StepFailed { step, attempts, error }) => {
      assert_eq!(step, "S1");
      assert_eq!(*attempts, 3);
      assert!(error.contains("S1 exploded"));
    }
    other => panic!("unexpected failure: {other:?}"),
  }
  assert!(result.failure_published);

  let notification = notifications.recv().await.unwrap();
  assert_eq!(notification.topic, "alerts");
  let record: Value = serde_json::from_str(&notification.message).unwrap();
  assert_eq!(record["workflow"], "single");
  assert_eq!(record["step"], "S1");
  assert_eq!(record["payload"], json!({"order": 7}));
  assert_eq!(record["reason"]["kind"], "step_failed");
  assert!(notifications.try_recv().is_err());
}

#[tokio::test]
async fn test_first_added_choice_wins() {
  let (invoker, _invoked) = MockInvoker::new(&[("S1", Behavior::Reply(json!({"state": "Yes"})))]);
  let (publisher, _notifications) = publisher();
  let executor = WorkflowExecutor::new(invoker.clone(), publisher);

  let mut builder = WorkflowBuilder::with_settings("tie-break", settings());
  let s1 = builder.define_step(StepSpec::new("S1", "bin/s1")).unwrap();
  let first = builder.define_step(StepSpec::new("first", "bin/first")).unwrap();
  let second = builder.define_step(StepSpec::new("second", "bin/second")).unwrap();
  builder.add_choice(&s1, state_is_yes(), &first).unwrap();
  builder
    .add_choice(&s1, Predicate::new("always", |_| true), &second)
    .unwrap();
  builder.add_otherwise(&s1, Target::Failed).unwrap();
  builder.add_transition(&first, Target::Succeeded).unwrap();
  builder.add_transition(&second, Target::Succeeded).unwrap();
  let definition = builder.freeze().unwrap();

  let result = executor.run(&definition, json!({})).await;

  assert!(result.is_succeeded());
  assert_eq!(invoker.calls(), vec!["S1", "first"]);
}

#[test]
fn test_unconditional_cycle_is_rejected_before_execution() {
  let mut builder = WorkflowBuilder::new("loop");
  let s1 = builder.define_step(StepSpec::new("S1", "bin/s1")).unwrap();
  let s2 = builder.define_step(StepSpec::new("S2", "bin/s2")).unwrap();
  builder.add_transition(&s1, &s2).unwrap();
  builder.add_transition(&s2, &s1).unwrap();

  match builder.freeze() {
    Err(DefinitionError::CyclicGraph { cycle }) => assert!(cycle.contains(&"S1".to_string())),
    other => panic!("expected cyclic graph, got {other:?}"),
  }
}

#[tokio::test]
async fn test_workflow_timeout_bounds_hanging_invocation() {
  let (invoker, _invoked) = MockInvoker::new(&[("S1", Behavior::Hang)]);
  let (publisher, mut notifications) = publisher();
  let executor = WorkflowExecutor::new(invoker, publisher);
  let definition = single_step(
    StepSpec::new("S1", "bin/s1"),
    WorkflowSettings {
      timeout: Duration::from_millis(100),
      ..settings()
    },
  );

  let started = Instant::now();
  let result = executor.run(&definition, json!({"n": 1})).await;

  assert!(started.elapsed() < Duration::from_secs(2));
  assert_eq!(
    result.failure(),
    Some(&FailureReason::Timeout {
      step: Some("S1".to_string()),
      limit_ms: 100
    })
  );
  assert_eq!(result.output, json!({"n": 1}));

  let record: Value = serde_json::from_str(&notifications.recv().await.unwrap().message).unwrap();
  assert_eq!(record["reason"]["kind"], "timeout");
  assert_eq!(record["step"], "S1");
}

#[tokio::test]
async fn test_step_time_limit_counts_as_failed_attempt() {
  let (invoker, _invoked) = MockInvoker::new(&[("S1", Behavior::Hang)]);
  let (publisher, _notifications) = publisher();
  let executor = WorkflowExecutor::new(invoker.clone(), publisher);
  let spec = StepSpec::new("S1", "bin/s1")
    .with_budget(ResourceBudget::new(128, Duration::from_millis(20)))
    .with_retries(1);
  let definition = single_step(spec, settings());

  let result = executor.run(&definition, json!({})).await;

  assert_eq!(invoker.calls().len(), 2);
  match result.failure() {
    Some(FailureReason::StepFailed { attempts, error, .. }) => {
      assert_eq!(*attempts, 2);
      assert!(error.contains("timed out"));
    }
    other => panic!("unexpected failure: {other:?}"),
  }
}

#[tokio::test]
async fn test_cancellation_is_not_published() {
  let (invoker, _invoked) = MockInvoker::new(&[("S1", Behavior::Hang)]);
  let (publisher, mut notifications) = publisher();
  let executor = WorkflowExecutor::new(invoker, publisher);
  let definition = single_step(StepSpec::new("S1", "bin/s1"), settings());

  let cancel = CancellationToken::new();
  let trigger = cancel.clone();
  tokio::spawn(async move {
    tokio::time::sleep(Duration::from_millis(20)).await;
    trigger.cancel();
  });

  let result = executor.run_with_cancel(&definition, json!({}), cancel).await;

  assert_eq!(result.failure(), Some(&FailureReason::Cancelled));
  assert!(!result.failure_published);
  assert!(notifications.try_recv().is_err());
}

#[tokio::test]
async fn test_unreachable_publisher_does_not_mask_failure() {
  let (invoker, _invoked) = MockInvoker::new(&[("S1", Behavior::Fail)]);
  let (publisher, notifications) = publisher();
  drop(notifications);
  let executor = WorkflowExecutor::new(invoker, publisher);
  let definition = single_step(StepSpec::new("S1", "bin/s1"), settings());

  let result = executor.run(&definition, json!({})).await;

  assert!(matches!(result.failure(), Some(FailureReason::StepFailed { .. })));
  assert!(!result.failure_published);
}

#[tokio::test]
async fn test_failure_marker_is_explicit_fail() {
  let (invoker, _invoked) = MockInvoker::new(&[("S1", Behavior::Reply(json!({"state": "No"})))]);
  let (publisher, mut notifications) = publisher();
  let executor = WorkflowExecutor::new(invoker, publisher);

  let mut builder = WorkflowBuilder::with_settings("gate", settings());
  let s1 = builder.define_step(StepSpec::new("S1", "bin/s1")).unwrap();
  builder.add_choice(&s1, state_is_yes(), Target::Succeeded).unwrap();
  builder.add_otherwise(&s1, Target::Failed).unwrap();
  let definition = builder.freeze().unwrap();

  let result = executor.run(&definition, json!({})).await;

  assert_eq!(
    result.failure(),
    Some(&FailureReason::ExplicitFail {
      step: "S1".to_string()
    })
  );
  let record: Value = serde_json::from_str(&notifications.recv().await.unwrap().message).unwrap();
  assert_eq!(record["reason"]["kind"], "explicit_fail");
}

#[tokio::test]
async fn test_input_and_output_paths_shape_the_payload() {
  let (invoker, _invoked) = MockInvoker::new(&[]);
  let (publisher, _notifications) = publisher();
  let executor = WorkflowExecutor::new(invoker, publisher);
  let spec = StepSpec::new("S1", "bin/s1")
    .with_input_path("$.order")
    .with_output_path("$.id");
  let definition = single_step(spec, settings());

  let result = executor
    .run(&definition, json!({"order": {"id": 42}, "noise": true}))
    .await;

  assert!(result.is_succeeded());
  assert_eq!(result.output, json!(42));
}

#[tokio::test]
async fn test_missing_output_path_fails_execution() {
  let (invoker, _invoked) = MockInvoker::new(&[]);
  let (publisher, _notifications) = publisher();
  let executor = WorkflowExecutor::new(invoker, publisher);
  let definition = single_step(
    StepSpec::new("S1", "bin/s1").with_output_path("$.missing"),
    settings(),
  );

  let result = executor.run(&definition, json!({"present": 1})).await;

  assert_eq!(
    result.failure(),
    Some(&FailureReason::PathNotFound {
      step: "S1".to_string(),
      path: "$.missing".to_string()
    })
  );
}

#[tokio::test]
async fn test_failed_event_step_is_dead_lettered() {
  let (invoker, _invoked) = MockInvoker::new(&[("S1", Behavior::Fail)]);
  let (publisher, mut notifications) = publisher();
  let executor = WorkflowExecutor::new(invoker, publisher);
  let definition = single_step(
    StepSpec::new("S1", "bin/s1").with_mode(InvocationMode::Event),
    settings(),
  );

  let result = executor.run(&definition, json!({"n": 1})).await;
  assert!(result.is_succeeded());

  let notification = tokio::time::timeout(Duration::from_secs(5), notifications.recv())
    .await
    .unwrap()
    .unwrap();
  assert_eq!(notification.topic, "alerts");
  let message: Value = serde_json::from_str(&notification.message).unwrap();
  assert_eq!(message["step"], "S1");
}

#[tokio::test]
async fn test_notifier_observes_retries() {
  let (invoker, _invoked) = MockInvoker::new(&[("S1", Behavior::Fail)]);
  let (publisher, _notifications) = publisher();
  let (notifier, mut events) = ChannelNotifier::channel();
  let executor = WorkflowExecutor::with_notifier(invoker, publisher, notifier);
  let definition = single_step(StepSpec::new("S1", "bin/s1").with_retries(1), settings());

  let result = executor.run(&definition, json!({})).await;
  assert!(!result.is_succeeded());

  let mut names = Vec::new();
  while let Ok(event) = events.try_recv() {
    names.push(match event {
      ExecutionEvent::WorkflowStarted { .. } => "workflow_started",
      ExecutionEvent::StepStarted { .. } => "step_started",
      ExecutionEvent::StepCompleted { .. } => "step_completed",
      ExecutionEvent::StepDispatched { .. } => "step_dispatched",
      ExecutionEvent::StepRetrying { .. } => "step_retrying",
      ExecutionEvent::StepFailed { .. } => "step_failed",
      ExecutionEvent::WorkflowSucceeded { .. } => "workflow_succeeded",
      ExecutionEvent::WorkflowFailed { .. } => "workflow_failed",
    });
  }
  assert_eq!(
    names,
    vec![
      "workflow_started",
      "step_started",
      "step_retrying",
      "step_started",
      "step_failed",
      "workflow_failed",
    ]
  );
}

#[tokio::test]
async fn test_choice_cycle_polls_until_done() {
  // Each pass through "poll" increments the counter until the choice exits.
  struct Counter;

  #[async_trait]
  impl Invoker for Counter {
    async fn invoke(&self, request: InvocationRequest) -> Result<Value, InvokeError> {
      let n = request.payload["n"].as_u64().unwrap_or(0);
      Ok(json!({"n": n + 1}))
    }
  }

  let mut builder = WorkflowBuilder::with_settings("poll", settings());
  let poll = builder.define_step(StepSpec::new("poll", "bin/poll")).unwrap();
  builder
    .add_choice(
      &poll,
      Predicate::new("$.n < 3", |out| out["n"].as_u64().is_some_and(|n| n < 3)),
      &poll,
    )
    .unwrap();
  builder.add_otherwise(&poll, Target::Succeeded).unwrap();
  let definition = builder.freeze().unwrap();

  let (publisher, _notifications) = publisher();
  let executor = WorkflowExecutor::new(Arc::new(Counter), publisher);
  let result = executor.run(&definition, json!({"n": 0})).await;

  assert!(result.is_succeeded());
  assert_eq!(result.output, json!({"n": 3}));
  assert_eq!(result.steps.len(), 3);
}

#[tokio::test]
async fn test_runner_executes_payloads_concurrently() {
  // The barrier only opens once all three executions are in flight together.
  let barrier = Arc::new(Barrier::new(3));
  let (invoker, _invoked) = MockInvoker::new(&[("S1", Behavior::Rendezvous(barrier))]);
  let (publisher, _notifications) = publisher();
  let executor = Arc::new(WorkflowExecutor::new(invoker, publisher));
  let definition = Arc::new(single_step(StepSpec::new("S1", "bin/s1"), settings()));

  let runner = WorkflowRunner::new(executor, definition);
  let sender = runner.sender();
  for n in 0..3 {
    sender.send(json!({"n": n})).await.unwrap();
  }
  drop(sender);

  let summary = tokio::time::timeout(Duration::from_secs(5), runner.start(CancellationToken::new()))
    .await
    .unwrap();

  assert_eq!(summary.succeeded, 3);
  assert_eq!(summary.failed, 0);
}

#[tokio::test]
async fn test_wait_dispatched_lets_event_steps_finish() {
  struct SlowAction {
    finished: Arc<std::sync::atomic::AtomicBool>,
  }

  #[async_trait]
  impl Invoker for SlowAction {
    async fn invoke(&self, request: InvocationRequest) -> Result<Value, InvokeError> {
      tokio::time::sleep(Duration::from_millis(200)).await;
      self.finished.store(true, std::sync::atomic::Ordering::SeqCst);
      Ok(request.payload)
    }
  }

  let finished = Arc::new(std::sync::atomic::AtomicBool::new(false));
  let invoker = Arc::new(SlowAction {
    finished: finished.clone(),
  });
  let (publisher, _notifications) = publisher();
  let executor = WorkflowExecutor::new(invoker, publisher);
  let definition = single_step(
    StepSpec::new("S1", "bin/s1").with_mode(InvocationMode::Event),
    settings(),
  );

  let result = executor.run(&definition, json!({})).await;
  assert!(result.is_succeeded());
  assert_eq!(executor.dispatched_in_flight(), 1);
  assert!(!finished.load(std::sync::atomic::Ordering::SeqCst));

  tokio::time::timeout(Duration::from_secs(5), executor.wait_dispatched())
    .await
    .unwrap();
  assert!(finished.load(std::sync::atomic::Ordering::SeqCst));
  assert_eq!(executor.dispatched_in_flight(), 0);
}
