//! End-to-end plan advance: sync steps, async suspension and resumption,
//! adviser-driven retries, and sweeping-output visibility.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use planflow::{
    Ambiance, AdviserObtainment, AdviserType, AsyncExecutableResponse, EngineError,
    NodeExecutionStore, Notification, NotifyPublisher, PendingResponse, Plan, PlanExecutor,
    PlanNode, Status, Step, StepOutcome, StepResponse, StepType, TaskExecutableResponse,
};
use planflow::advisers::{ON_FAIL, ON_SUCCESS, RETRY};
use planflow::engine::{EngineContext, FakeIdGenerator, RealTimeProvider};

fn deterministic_context(prefix: &str) -> EngineContext {
    EngineContext {
        time_provider: Arc::new(RealTimeProvider),
        id_generator: Arc::new(FakeIdGenerator::new(prefix)),
    }
}

async fn wait_until<F: Fn() -> bool>(condition: F, what: &str) {
    for _ in 0..500 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("timed out waiting for {what}");
}

/// Concludes immediately and publishes one sweeping output.
struct EchoStep;

#[async_trait]
impl Step for EchoStep {
    async fn execute(
        &self,
        _ambiance: &Ambiance,
        parameters: &Value,
    ) -> Result<StepResponse, EngineError> {
        let message = parameters
            .get("message")
            .cloned()
            .unwrap_or(Value::String("hello".into()));
        Ok(StepResponse::Outcome(
            StepOutcome::success().with_output("echo", message),
        ))
    }
}

/// Suspends on one async callback and concludes with the collected payload.
struct CallbackStep {
    callback_id: &'static str,
}

#[async_trait]
impl Step for CallbackStep {
    async fn execute(
        &self,
        _ambiance: &Ambiance,
        _parameters: &Value,
    ) -> Result<StepResponse, EngineError> {
        Ok(StepResponse::Pending(PendingResponse::Async(
            AsyncExecutableResponse {
                callback_ids: vec![self.callback_id.to_string()],
                timeout_millis: None,
            },
        )))
    }

    async fn resume(
        &self,
        _ambiance: &Ambiance,
        _parameters: &Value,
        response_data: HashMap<String, Value>,
    ) -> Result<StepResponse, EngineError> {
        let payload = response_data
            .get(self.callback_id)
            .cloned()
            .unwrap_or(Value::Null);
        Ok(StepResponse::Outcome(
            StepOutcome::success().with_output("task_result", payload),
        ))
    }
}

/// Runs a two-link task chain before concluding.
struct ChainStep;

#[async_trait]
impl Step for ChainStep {
    async fn execute(
        &self,
        _ambiance: &Ambiance,
        _parameters: &Value,
    ) -> Result<StepResponse, EngineError> {
        Ok(StepResponse::Pending(PendingResponse::Task(
            TaskExecutableResponse {
                task_id: "chain-1".to_string(),
                task_category: "delegate".to_string(),
            },
        )))
    }

    async fn resume(
        &self,
        _ambiance: &Ambiance,
        _parameters: &Value,
        response_data: HashMap<String, Value>,
    ) -> Result<StepResponse, EngineError> {
        if response_data.contains_key("chain-1") {
            Ok(StepResponse::Pending(PendingResponse::Task(
                TaskExecutableResponse {
                    task_id: "chain-2".to_string(),
                    task_category: "delegate".to_string(),
                },
            )))
        } else {
            Ok(StepResponse::Outcome(StepOutcome::success()))
        }
    }
}

/// Fails until the configured number of attempts has been spent.
struct FlakyStep {
    succeed_on_attempt: u32,
    attempts: AtomicU32,
}

#[async_trait]
impl Step for FlakyStep {
    async fn execute(
        &self,
        _ambiance: &Ambiance,
        _parameters: &Value,
    ) -> Result<StepResponse, EngineError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if attempt < self.succeed_on_attempt {
            Ok(StepResponse::Outcome(StepOutcome::failed(format!(
                "attempt {attempt} failed"
            ))))
        } else {
            Ok(StepResponse::Outcome(StepOutcome::success()))
        }
    }
}

#[tokio::test]
async fn two_node_plan_runs_to_success_and_publishes_outputs() {
    let executor = PlanExecutor::builder()
        .context(deterministic_context("t"))
        .build();
    executor
        .step_registry()
        .register(StepType::new("ECHO"), Arc::new(EchoStep))
        .unwrap();

    let plan = Plan::new("plan-def", "n1")
        .with_node(
            PlanNode::new("n1", "First", "first", StepType::new("ECHO"))
                .with_parameters(json!({"message": "from-first"}))
                .with_adviser(AdviserObtainment::new(
                    AdviserType::new(ON_SUCCESS),
                    json!({"next_node_id": "n2"}),
                )),
        )
        .with_node(
            PlanNode::new("n2", "Second", "second", StepType::new("ECHO"))
                .with_parameters(json!({"message": "from-second"})),
        );

    let plan_execution_id = executor.start(plan, "acct", "org", "proj").unwrap();
    let status = executor.wait_for_plan(&plan_execution_id).await.unwrap();
    assert_eq!(status, Status::Succeeded);

    // The last node's output is resolvable through the expression functor.
    let ambiance = Ambiance::new(&plan_execution_id, "acct", "org", "proj");
    let resolver = executor.resolver_for(&ambiance);
    let value = resolver.resolve("echo").unwrap().unwrap();
    assert_eq!(value, json!("from-second"));
}

#[tokio::test]
async fn async_step_suspends_and_resumes_through_notify_publisher() {
    let executor = PlanExecutor::builder()
        .context(deterministic_context("a"))
        .build();
    executor
        .step_registry()
        .register(
            StepType::new("CALLBACK"),
            Arc::new(CallbackStep {
                callback_id: "cb-42",
            }),
        )
        .unwrap();

    let plan = Plan::new("plan-def", "n1").with_node(PlanNode::new(
        "n1",
        "Wait",
        "wait",
        StepType::new("CALLBACK"),
    ));
    let plan_execution_id = executor.start(plan, "acct", "org", "proj").unwrap();

    // The node execution id is deterministic: plan is "a-0", node is "a-1".
    let node_store = executor.node_store().clone();
    wait_until(
        || {
            node_store
                .fetch("a-1")
                .is_some_and(|node| node.status == Status::AsyncWaiting)
        },
        "node suspension",
    )
    .await;

    let node = node_store.fetch("a-1").unwrap();
    assert_eq!(
        node.pending_response.as_ref().map(|p| p.waiting_status()),
        Some(Status::AsyncWaiting)
    );

    // Deliver completion through the registered publisher, by name.
    let publisher = executor.notify_registry().obtain("engine").unwrap();
    publisher.send(Notification::new("cb-42", json!({"exit_code": 0})));

    let status = executor.wait_for_plan(&plan_execution_id).await.unwrap();
    assert_eq!(status, Status::Succeeded);

    let node = node_store.fetch("a-1").unwrap();
    assert_eq!(node.status, Status::Succeeded);
    assert!(node.pending_response.is_none());

    let resolver = executor.resolver_for(&Ambiance::new(&plan_execution_id, "acct", "org", "proj"));
    assert_eq!(
        resolver.resolve("task_result").unwrap().unwrap(),
        json!({"exit_code": 0})
    );
}

#[tokio::test]
async fn task_chain_parks_the_node_once_per_link() {
    let executor = PlanExecutor::builder()
        .context(deterministic_context("c"))
        .build();
    executor
        .step_registry()
        .register(StepType::new("CHAIN"), Arc::new(ChainStep))
        .unwrap();

    let plan = Plan::new("plan-def", "n1").with_node(PlanNode::new(
        "n1",
        "Chain",
        "chain",
        StepType::new("CHAIN"),
    ));
    let plan_execution_id = executor.start(plan, "acct", "org", "proj").unwrap();

    let node_store = executor.node_store().clone();
    wait_until(
        || {
            node_store
                .fetch("c-1")
                .is_some_and(|node| node.status == Status::TaskWaiting)
        },
        "first chain link",
    )
    .await;

    executor
        .notify(Notification::new("chain-1", json!("link-1 done")))
        .await;

    wait_until(
        || {
            node_store.fetch("c-1").is_some_and(|node| {
                node.pending_response
                    .as_ref()
                    .map(|p| p.callback_ids() == vec!["chain-2"])
                    .unwrap_or(false)
            })
        },
        "second chain link",
    )
    .await;

    executor
        .notify(Notification::new("chain-2", json!("link-2 done")))
        .await;

    let status = executor.wait_for_plan(&plan_execution_id).await.unwrap();
    assert_eq!(status, Status::Succeeded);
}

#[tokio::test]
async fn retry_adviser_redrives_a_flaky_node() {
    let executor = PlanExecutor::builder()
        .context(deterministic_context("r"))
        .build();
    executor
        .step_registry()
        .register(
            StepType::new("FLAKY"),
            Arc::new(FlakyStep {
                succeed_on_attempt: 3,
                attempts: AtomicU32::new(0),
            }),
        )
        .unwrap();

    let plan = Plan::new("plan-def", "n1").with_node(
        PlanNode::new("n1", "Flaky", "flaky", StepType::new("FLAKY"))
            .with_adviser(AdviserObtainment::new(
                AdviserType::new(RETRY),
                json!({"max_retries": 2, "wait_millis": [1]}),
            ))
            .with_adviser(AdviserObtainment::new(AdviserType::new(ON_FAIL), json!({}))),
    );

    let plan_execution_id = executor.start(plan, "acct", "org", "proj").unwrap();
    let status = executor.wait_for_plan(&plan_execution_id).await.unwrap();
    assert_eq!(status, Status::Succeeded);

    let node = executor.node_store().fetch("r-1").unwrap();
    assert_eq!(node.retries, 2);
    assert_eq!(node.status, Status::Succeeded);
}

#[tokio::test]
async fn exhausted_retries_fall_through_to_on_fail() {
    let executor = PlanExecutor::builder()
        .context(deterministic_context("x"))
        .build();
    executor
        .step_registry()
        .register(
            StepType::new("FLAKY"),
            Arc::new(FlakyStep {
                succeed_on_attempt: 10,
                attempts: AtomicU32::new(0),
            }),
        )
        .unwrap();

    let plan = Plan::new("plan-def", "n1").with_node(
        PlanNode::new("n1", "Flaky", "flaky", StepType::new("FLAKY"))
            .with_adviser(AdviserObtainment::new(
                AdviserType::new(RETRY),
                json!({"max_retries": 1, "wait_millis": [1]}),
            ))
            .with_adviser(AdviserObtainment::new(AdviserType::new(ON_FAIL), json!({}))),
    );

    let plan_execution_id = executor.start(plan, "acct", "org", "proj").unwrap();
    let status = executor.wait_for_plan(&plan_execution_id).await.unwrap();
    assert_eq!(status, Status::Failed);

    let node = executor.node_store().fetch("x-1").unwrap();
    assert_eq!(node.retries, 1);
    assert_eq!(node.status, Status::Failed);
}

#[tokio::test]
async fn unregistered_step_type_fails_the_node_through_the_standard_path() {
    let executor = PlanExecutor::builder()
        .context(deterministic_context("u"))
        .build();

    let plan = Plan::new("plan-def", "n1").with_node(PlanNode::new(
        "n1",
        "Ghost",
        "ghost",
        StepType::new("NOT_REGISTERED"),
    ));
    let plan_execution_id = executor.start(plan, "acct", "org", "proj").unwrap();

    let status = executor.wait_for_plan(&plan_execution_id).await.unwrap();
    assert_eq!(status, Status::Failed);

    let node = executor.node_store().fetch("u-1").unwrap();
    assert_eq!(node.status, Status::Failed);
    assert!(node
        .failure_message
        .as_deref()
        .unwrap()
        .contains("NOT_REGISTERED"));
}

#[tokio::test]
async fn unmatched_notification_is_ignored() {
    let executor = PlanExecutor::builder()
        .context(deterministic_context("g"))
        .build();
    executor
        .step_registry()
        .register(StepType::new("ECHO"), Arc::new(EchoStep))
        .unwrap();

    let plan = Plan::new("plan-def", "n1").with_node(PlanNode::new(
        "n1",
        "First",
        "first",
        StepType::new("ECHO"),
    ));
    let plan_execution_id = executor.start(plan, "acct", "org", "proj").unwrap();

    // Nothing is waiting for this correlation id; delivery must be a no-op.
    executor
        .notify(Notification::new("stray", json!(null)))
        .await;

    let status = executor.wait_for_plan(&plan_execution_id).await.unwrap();
    assert_eq!(status, Status::Succeeded);
}
