//! Plan executor — the main execution driver.
//!
//! The [`PlanExecutor`] advances plan nodes on the tokio worker pool. A node
//! whose step yields a pending-response descriptor is parked without blocking
//! any thread; resumption happens later, on a different thread, triggered by
//! a completion notification, an interrupt, or a progress update. Advisers
//! looked up in the [`AdviserRegistry`] decide what happens after a node
//! concludes.

use chrono::Utc;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

use crate::domain::{
    Ambiance, Level, NodeExecution, PendingResponse, Plan, PlanExecution, Status,
};
use crate::error::{EngineError, EngineResult};
use crate::interrupt::{InterruptPackage, InterruptProcessor, InterruptType};
use crate::observers::{InputWaitingStatusUpdate, NodeStatusUpdateObserver, NodeUpdateInfo};
use crate::progress::{AsyncProgressData, ProgressTracker};
use crate::registry::{
    Advise, AdviseEvent, Adviser, AdviserRegistry, Notification, NotifyPublisher,
    NotifyPublisherRegistry, StepRegistry,
};
use crate::resolver::{InMemorySweepingOutputService, SweepingOutputResolver, SweepingOutputService};

use super::context::EngineContext;
use super::events::{EngineEvent, EventEmitter, EventSender};
use super::step::{Step, StepOutcome, StepResponse};
use super::store::{
    InMemoryNodeExecutionStore, InMemoryPlanExecutionStore, NodeExecutionStore,
    PlanExecutionStore, SharedNodeStore, SharedPlanStore,
};

/// Configuration for the plan executor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Upper bound on node dispatches per plan execution.
    #[serde(default = "default_max_steps")]
    pub max_steps: i32,
    /// Name the engine's own notify publisher is registered under.
    #[serde(default = "default_publisher_name")]
    pub publisher_name: String,
}

fn default_max_steps() -> i32 {
    500
}

fn default_publisher_name() -> String {
    "engine".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            max_steps: default_max_steps(),
            publisher_name: default_publisher_name(),
        }
    }
}

struct PlanRun {
    plan: Arc<Plan>,
    base_ambiance: Ambiance,
    steps_taken: AtomicI32,
    status_tx: watch::Sender<Status>,
}

struct CallbackState {
    expected: HashSet<String>,
    collected: HashMap<String, Value>,
}

struct ExecutorInner {
    step_registry: Arc<StepRegistry>,
    adviser_registry: Arc<AdviserRegistry>,
    notify_registry: Arc<NotifyPublisherRegistry>,
    node_store: SharedNodeStore,
    plan_store: SharedPlanStore,
    observer: Arc<NodeStatusUpdateObserver>,
    progress: Arc<ProgressTracker>,
    outputs: Arc<dyn SweepingOutputService>,
    interrupts: InterruptProcessor,
    emitter: EventEmitter,
    context: EngineContext,
    config: EngineConfig,
    plans: DashMap<String, PlanRun>,
    /// Correlation id -> suspended node execution id.
    callbacks: DashMap<String, String>,
    /// Suspended node execution id -> outstanding callback bookkeeping.
    collecting: DashMap<String, CallbackState>,
}

/// The main plan executor: drives plan execution.
#[derive(Clone)]
pub struct PlanExecutor {
    inner: Arc<ExecutorInner>,
}

/// Publisher feeding notifications into the executor's router task.
struct ChannelNotifyPublisher {
    tx: mpsc::UnboundedSender<Notification>,
}

impl NotifyPublisher for ChannelNotifyPublisher {
    fn send(&self, notification: Notification) {
        let _ = self.tx.send(notification);
    }
}

impl PlanExecutor {
    pub fn builder() -> PlanExecutorBuilder {
        PlanExecutorBuilder::new()
    }

    /// Begin one run of `plan` under the given scope.
    ///
    /// Returns the plan execution id immediately; the start node is
    /// dispatched on the worker pool.
    pub fn start(
        &self,
        plan: Plan,
        account_id: &str,
        org_id: &str,
        project_id: &str,
    ) -> EngineResult<String> {
        let inner = &self.inner;
        let plan_execution_id = inner.context.id_generator.next_id();
        let now = inner.context.time_provider.now_millis();
        inner
            .plan_store
            .save(PlanExecution::new(&plan_execution_id, &plan.uuid, now));

        let base_ambiance = Ambiance::new(&plan_execution_id, account_id, org_id, project_id);
        let (status_tx, _) = watch::channel(Status::Running);
        let start_node = plan.start_node_id.clone();
        inner.plans.insert(
            plan_execution_id.clone(),
            PlanRun {
                plan: Arc::new(plan),
                base_ambiance,
                steps_taken: AtomicI32::new(0),
                status_tx,
            },
        );

        let inner = self.inner.clone();
        let pid = plan_execution_id.clone();
        tokio::spawn(async move {
            if let Err(err) = dispatch(inner.clone(), &pid, &start_node).await {
                tracing::error!(plan_execution_id = %pid, error = %err, "plan dispatch failed");
                inner.conclude_plan(&pid, Status::Errored);
            }
        });
        Ok(plan_execution_id)
    }

    /// Block until the plan execution reaches a terminal status.
    pub async fn wait_for_plan(&self, plan_execution_id: &str) -> EngineResult<Status> {
        let mut rx = {
            let run = self
                .inner
                .plans
                .get(plan_execution_id)
                .ok_or_else(|| EngineError::PlanNotFound(plan_execution_id.to_string()))?;
            run.status_tx.subscribe()
        };
        loop {
            let status = *rx.borrow();
            if matches!(
                status,
                Status::Succeeded
                    | Status::Failed
                    | Status::Aborted
                    | Status::Errored
                    | Status::Expired
            ) {
                return Ok(status);
            }
            if rx.changed().await.is_err() {
                return Ok(*rx.borrow());
            }
        }
    }

    /// Deliver an asynchronous completion notification.
    ///
    /// Equivalent to sending through the publisher this executor registers
    /// under its configured channel name.
    pub async fn notify(&self, notification: Notification) {
        handle_notification(self.inner.clone(), notification).await;
    }

    /// Resume a suspended node with its collected response data.
    pub async fn resume_node(
        &self,
        node_execution_id: &str,
        response_data: HashMap<String, Value>,
    ) -> EngineResult<()> {
        resume_node(self.inner.clone(), node_execution_id, response_data).await
    }

    /// Process an interrupt, consuming its package exactly once.
    pub async fn process_interrupt(
        &self,
        interrupt_type: InterruptType,
        package: InterruptPackage,
    ) -> EngineResult<()> {
        let node_execution_id = package
            .ambiance()
            .node_execution_id()
            .map(str::to_string)
            .unwrap_or_default();
        let plan_execution_id = package.ambiance().plan_execution_id().to_string();
        let user_marked = package.is_user_marked();

        self.inner.interrupts.process(interrupt_type, package).await?;

        self.inner.emitter.emit(EngineEvent::InterruptProcessed {
            node_execution_id: node_execution_id.clone(),
            interrupt: interrupt_type,
            user_marked,
            timestamp: Utc::now(),
        });

        match interrupt_type {
            InterruptType::Abort => {
                self.inner.forget_callbacks(&node_execution_id);
                self.inner.progress.clear(&node_execution_id);
                self.inner.conclude_plan(&plan_execution_id, Status::Aborted);
            }
            InterruptType::Retry => {
                self.inner.forget_callbacks(&node_execution_id);
                let inner = self.inner.clone();
                tokio::spawn(async move {
                    if let Err(err) =
                        run_node(inner.clone(), &plan_execution_id, &node_execution_id).await
                    {
                        tracing::error!(
                            node_execution_id = %node_execution_id,
                            error = %err,
                            "retry dispatch failed"
                        );
                        inner.conclude_plan(&plan_execution_id, Status::Errored);
                    }
                });
            }
            InterruptType::Pause | InterruptType::Resume => {}
        }
        Ok(())
    }

    /// Record a progress tick for a suspended node.
    ///
    /// `NoOp` leaves the node suspended. A final status triggers transition
    /// evaluation; `InputWaiting` re-parks the node and propagates to the
    /// plan-level aggregate through the status observers.
    pub fn handle_progress(&self, node_execution_id: &str, data: AsyncProgressData) {
        self.inner.progress.update(node_execution_id, data);
        if data.status == Status::NoOp {
            return;
        }

        let Some(node) = self.inner.node_store.fetch(node_execution_id) else {
            tracing::debug!(node_execution_id, "progress for unknown node execution");
            return;
        };
        if !node.status.is_waiting() {
            return;
        }
        let plan_execution_id = node.ambiance.plan_execution_id().to_string();

        if data.status.is_final() {
            let inner = self.inner.clone();
            let id = node_execution_id.to_string();
            tokio::spawn(async move {
                let outcome = StepOutcome {
                    status: data.status,
                    failure_message: None,
                    outputs: HashMap::new(),
                };
                if let Err(err) = conclude_node(inner, &plan_execution_id, &id, outcome).await {
                    tracing::error!(node_execution_id = %id, error = %err, "progress conclusion failed");
                }
            });
        } else if data.status == Status::InputWaiting {
            if self
                .inner
                .node_store
                .update_status(
                    node_execution_id,
                    Status::InputWaiting,
                    Status::waiting_statuses(),
                )
                .is_some()
            {
                self.inner.observer.dispatch(&NodeUpdateInfo::new(
                    node_execution_id,
                    &plan_execution_id,
                    Status::InputWaiting,
                ));
            }
        }
        // Other in-progress statuses are advisory only.
    }

    /// Build the expression functor for one bound ambiance.
    pub fn resolver_for(&self, ambiance: &Ambiance) -> SweepingOutputResolver {
        SweepingOutputResolver::new(self.inner.outputs.clone(), ambiance.clone())
    }

    pub fn step_registry(&self) -> &Arc<StepRegistry> {
        &self.inner.step_registry
    }

    pub fn adviser_registry(&self) -> &Arc<AdviserRegistry> {
        &self.inner.adviser_registry
    }

    pub fn notify_registry(&self) -> &Arc<NotifyPublisherRegistry> {
        &self.inner.notify_registry
    }

    pub fn node_store(&self) -> &SharedNodeStore {
        &self.inner.node_store
    }

    pub fn plan_store(&self) -> &SharedPlanStore {
        &self.inner.plan_store
    }

    pub fn observer(&self) -> &Arc<NodeStatusUpdateObserver> {
        &self.inner.observer
    }

    pub fn progress_tracker(&self) -> &Arc<ProgressTracker> {
        &self.inner.progress
    }

    pub fn sweeping_output_service(&self) -> &Arc<dyn SweepingOutputService> {
        &self.inner.outputs
    }
}

impl ExecutorInner {
    fn conclude_plan(&self, plan_execution_id: &str, status: Status) {
        self.plan_store.update_status(plan_execution_id, status);
        if let Some(run) = self.plans.get(plan_execution_id) {
            let _ = run.status_tx.send_replace(status);
        }
        self.emitter.emit(EngineEvent::PlanConcluded {
            plan_execution_id: plan_execution_id.to_string(),
            status,
            timestamp: Utc::now(),
        });
    }

    fn forget_callbacks(&self, node_execution_id: &str) {
        self.collecting.remove(node_execution_id);
        self.callbacks.retain(|_, owner| owner != node_execution_id);
    }

    /// Park a node on its waiting status and register the expected callbacks.
    ///
    /// The executing thread returns immediately; nothing blocks while the
    /// node waits.
    fn suspend_node(
        &self,
        plan_execution_id: &str,
        node_execution_id: &str,
        pending: PendingResponse,
    ) -> EngineResult<()> {
        let waiting = pending.waiting_status();
        let mode = pending.mode();
        let callback_ids: Vec<String> = pending
            .callback_ids()
            .into_iter()
            .map(str::to_string)
            .collect();

        self.node_store
            .update(node_execution_id, &mut |doc| {
                doc.pending_response = Some(pending.clone());
            })
            .ok_or_else(|| EngineError::NodeNotFound(node_execution_id.to_string()))?;
        self.node_store
            .update_status(node_execution_id, waiting, &[Status::Running])
            .ok_or(EngineError::StatusTransitionRejected {
                node_execution_id: node_execution_id.to_string(),
                from: Status::Running,
                to: waiting,
            })?;

        self.collecting.insert(
            node_execution_id.to_string(),
            CallbackState {
                expected: callback_ids.iter().cloned().collect(),
                collected: HashMap::new(),
            },
        );
        for callback_id in callback_ids {
            self.callbacks
                .insert(callback_id, node_execution_id.to_string());
        }

        self.emitter.emit(EngineEvent::NodeSuspended {
            node_execution_id: node_execution_id.to_string(),
            mode,
            timestamp: Utc::now(),
        });
        self.observer.dispatch(&NodeUpdateInfo::new(
            node_execution_id,
            plan_execution_id,
            waiting,
        ));
        Ok(())
    }
}

async fn dispatch(
    inner: Arc<ExecutorInner>,
    plan_execution_id: &str,
    plan_node_uuid: &str,
) -> EngineResult<()> {
    let (plan_node, base_ambiance) = {
        let run = inner
            .plans
            .get(plan_execution_id)
            .ok_or_else(|| EngineError::PlanNotFound(plan_execution_id.to_string()))?;
        let steps = run.steps_taken.fetch_add(1, Ordering::SeqCst) + 1;
        if steps > inner.config.max_steps {
            return Err(EngineError::Internal(format!(
                "max steps exceeded: {}",
                inner.config.max_steps
            )));
        }
        let plan_node = run
            .plan
            .node(plan_node_uuid)
            .ok_or_else(|| EngineError::PlanNodeNotFound(plan_node_uuid.to_string()))?
            .clone();
        (plan_node, run.base_ambiance.clone())
    };

    let node_execution_id = inner.context.id_generator.next_id();
    let ambiance = base_ambiance.with_level(Level::new(
        &plan_node.uuid,
        &node_execution_id,
        &plan_node.identifier,
    ));
    let now = inner.context.time_provider.now_millis();
    inner
        .node_store
        .save(NodeExecution::new(&node_execution_id, ambiance, plan_node, now));

    run_node(inner, plan_execution_id, &node_execution_id).await
}

async fn run_node(
    inner: Arc<ExecutorInner>,
    plan_execution_id: &str,
    node_execution_id: &str,
) -> EngineResult<()> {
    let existing = inner
        .node_store
        .fetch(node_execution_id)
        .ok_or_else(|| EngineError::NodeNotFound(node_execution_id.to_string()))?;
    let node = inner
        .node_store
        .update_status(node_execution_id, Status::Running, &[Status::Queued])
        .ok_or(EngineError::StatusTransitionRejected {
            node_execution_id: node_execution_id.to_string(),
            from: existing.status,
            to: Status::Running,
        })?;

    inner.emitter.emit(EngineEvent::NodeStarted {
        node_execution_id: node_execution_id.to_string(),
        node_identifier: node.plan_node.identifier.clone(),
        timestamp: Utc::now(),
    });
    inner.observer.dispatch(&NodeUpdateInfo::new(
        node_execution_id,
        plan_execution_id,
        Status::Running,
    ));

    let step = match inner.step_registry.obtain(&node.plan_node.step_type) {
        Ok(step) => step,
        Err(err) => {
            // Unregistered step type fails the node through the standard
            // failure path; advisers may still decide to retry.
            return conclude_node(
                inner,
                plan_execution_id,
                node_execution_id,
                StepOutcome::failed(err.to_string()),
            )
            .await;
        }
    };

    match step
        .execute(&node.ambiance, &node.plan_node.step_parameters)
        .await
    {
        Ok(StepResponse::Outcome(outcome)) => {
            conclude_node(inner, plan_execution_id, node_execution_id, outcome).await
        }
        Ok(StepResponse::Pending(pending)) => {
            inner.suspend_node(plan_execution_id, node_execution_id, pending)
        }
        Err(err) => {
            conclude_node(
                inner,
                plan_execution_id,
                node_execution_id,
                StepOutcome::failed(err.to_string()),
            )
            .await
        }
    }
}

async fn handle_notification(inner: Arc<ExecutorInner>, notification: Notification) {
    let Some((_, node_execution_id)) = inner.callbacks.remove(&notification.correlation_id) else {
        tracing::debug!(
            correlation_id = %notification.correlation_id,
            "notification without a waiting node"
        );
        return;
    };

    let ready = match inner.collecting.get_mut(&node_execution_id) {
        Some(mut state) => {
            state.expected.remove(&notification.correlation_id);
            state
                .collected
                .insert(notification.correlation_id, notification.data);
            state.expected.is_empty()
        }
        None => false,
    };

    if ready {
        let collected = inner
            .collecting
            .remove(&node_execution_id)
            .map(|(_, state)| state.collected)
            .unwrap_or_default();
        if let Err(err) = resume_node(inner.clone(), &node_execution_id, collected).await {
            tracing::error!(
                node_execution_id = %node_execution_id,
                error = %err,
                "node resumption failed"
            );
            if let Some(node) = inner.node_store.fetch(&node_execution_id) {
                inner.conclude_plan(node.ambiance.plan_execution_id(), Status::Errored);
            }
        }
    }
}

async fn resume_node(
    inner: Arc<ExecutorInner>,
    node_execution_id: &str,
    response_data: HashMap<String, Value>,
) -> EngineResult<()> {
    let node = inner
        .node_store
        .fetch(node_execution_id)
        .ok_or_else(|| EngineError::NodeNotFound(node_execution_id.to_string()))?;
    let plan_execution_id = node.ambiance.plan_execution_id().to_string();

    inner
        .node_store
        .update_status(node_execution_id, Status::Running, Status::waiting_statuses())
        .ok_or(EngineError::StatusTransitionRejected {
            node_execution_id: node_execution_id.to_string(),
            from: node.status,
            to: Status::Running,
        })?;
    inner.progress.clear(node_execution_id);
    inner.emitter.emit(EngineEvent::NodeResumed {
        node_execution_id: node_execution_id.to_string(),
        timestamp: Utc::now(),
    });

    let step = match inner.step_registry.obtain(&node.plan_node.step_type) {
        Ok(step) => step,
        Err(err) => {
            return conclude_node(
                inner,
                &plan_execution_id,
                node_execution_id,
                StepOutcome::failed(err.to_string()),
            )
            .await;
        }
    };

    match step
        .resume(&node.ambiance, &node.plan_node.step_parameters, response_data)
        .await
    {
        Ok(StepResponse::Outcome(outcome)) => {
            conclude_node(inner, &plan_execution_id, node_execution_id, outcome).await
        }
        Ok(StepResponse::Pending(pending)) => {
            // Next chain link: park the node again.
            inner.suspend_node(&plan_execution_id, node_execution_id, pending)
        }
        Err(err) => {
            conclude_node(
                inner,
                &plan_execution_id,
                node_execution_id,
                StepOutcome::failed(err.to_string()),
            )
            .await
        }
    }
}

async fn conclude_node(
    inner: Arc<ExecutorInner>,
    plan_execution_id: &str,
    node_execution_id: &str,
    outcome: StepOutcome,
) -> EngineResult<()> {
    let now = inner.context.time_provider.now_millis();
    let existing = inner
        .node_store
        .fetch(node_execution_id)
        .ok_or_else(|| EngineError::NodeNotFound(node_execution_id.to_string()))?;
    inner
        .node_store
        .update_status(
            node_execution_id,
            outcome.status,
            Status::finalizable_statuses(),
        )
        .ok_or(EngineError::StatusTransitionRejected {
            node_execution_id: node_execution_id.to_string(),
            from: existing.status,
            to: outcome.status,
        })?;
    let node = inner
        .node_store
        .update(node_execution_id, &mut |doc| {
            doc.failure_message = outcome.failure_message.clone();
            doc.pending_response = None;
            doc.end_ts = Some(now);
        })
        .ok_or_else(|| EngineError::NodeNotFound(node_execution_id.to_string()))?;

    for (name, value) in &outcome.outputs {
        if let Err(err) = inner.outputs.consume(&node.ambiance, name, value) {
            tracing::warn!(
                node_execution_id,
                output = %name,
                error = %err,
                "failed to publish sweeping output"
            );
        }
    }

    inner.progress.clear(node_execution_id);
    inner.emitter.emit(EngineEvent::NodeConcluded {
        node_execution_id: node_execution_id.to_string(),
        status: node.status,
        timestamp: Utc::now(),
    });
    inner.observer.dispatch(&NodeUpdateInfo::new(
        node_execution_id,
        plan_execution_id,
        node.status,
    ));

    advise(inner, plan_execution_id, node).await
}

/// Consult the node's advisers, in obtainment order; the first advise wins.
///
/// Returns a boxed future so its `Send` bound is declared rather than inferred.
/// `advise` sits on the mutually-recursive cycle
/// `dispatch -> run_node -> conclude_node -> advise -> (spawn) dispatch/run_node`;
/// the explicit `dyn Future + Send` return type is the firewall that lets the
/// compiler prove the spawned futures are `Send` without cyclic auto-trait
/// inference across the `async fn` opaque return types.
fn advise<'a>(
    inner: Arc<ExecutorInner>,
    plan_execution_id: &'a str,
    node: NodeExecution,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = EngineResult<()>> + Send + 'a>> {
    Box::pin(async move {
    let mut decision = None;
    {
        let event = AdviseEvent {
            ambiance: &node.ambiance,
            status: node.status,
            failure_message: node.failure_message.as_deref(),
            retries: node.retries,
        };
        for obtainment in &node.plan_node.adviser_obtainments {
            let adviser = inner.adviser_registry.obtain(obtainment)?;
            if adviser.can_advise(&event) {
                if let Some(advise) = adviser.on_advise(&event) {
                    decision = Some(advise);
                    break;
                }
            }
        }
    }

    match decision {
        Some(Advise::NextStep { node_id }) => {
            let pid = plan_execution_id.to_string();
            tokio::spawn(async move {
                if let Err(err) = dispatch(inner.clone(), &pid, &node_id).await {
                    tracing::error!(plan_execution_id = %pid, error = %err, "next-step dispatch failed");
                    inner.conclude_plan(&pid, Status::Errored);
                }
            });
            Ok(())
        }
        Some(Advise::Retry { wait_millis }) => {
            let retry_index = node.retries + 1;
            inner
                .node_store
                .update(&node.uuid, &mut |doc| {
                    doc.status = Status::Queued;
                    doc.failure_message = None;
                    doc.end_ts = None;
                    doc.retries = retry_index;
                })
                .ok_or_else(|| EngineError::NodeNotFound(node.uuid.clone()))?;
            inner.emitter.emit(EngineEvent::NodeRetryScheduled {
                node_execution_id: node.uuid.clone(),
                retry_index,
                wait_millis,
                timestamp: Utc::now(),
            });

            let pid = plan_execution_id.to_string();
            tokio::spawn(async move {
                if wait_millis > 0 {
                    tokio::time::sleep(std::time::Duration::from_millis(wait_millis)).await;
                }
                if let Err(err) = run_node(inner.clone(), &pid, &node.uuid).await {
                    tracing::error!(node_execution_id = %node.uuid, error = %err, "retry run failed");
                    inner.conclude_plan(&pid, Status::Errored);
                }
            });
            Ok(())
        }
        Some(Advise::EndPlan { status }) => {
            inner.conclude_plan(plan_execution_id, status);
            Ok(())
        }
        None => {
            let status = if Status::positive_statuses().contains(&node.status) {
                Status::Succeeded
            } else if node.status == Status::Aborted {
                Status::Aborted
            } else {
                Status::Failed
            };
            inner.conclude_plan(plan_execution_id, status);
            Ok(())
        }
    }
    })
}

/// Builder wiring registries, stores, and collaborators into a [`PlanExecutor`].
pub struct PlanExecutorBuilder {
    step_registry: Option<Arc<StepRegistry>>,
    adviser_registry: Option<Arc<AdviserRegistry>>,
    notify_registry: Option<Arc<NotifyPublisherRegistry>>,
    node_store: Option<SharedNodeStore>,
    plan_store: Option<SharedPlanStore>,
    outputs: Option<Arc<dyn SweepingOutputService>>,
    observer: Option<Arc<NodeStatusUpdateObserver>>,
    event_sender: Option<EventSender>,
    context: EngineContext,
    config: EngineConfig,
}

impl PlanExecutorBuilder {
    fn new() -> Self {
        Self {
            step_registry: None,
            adviser_registry: None,
            notify_registry: None,
            node_store: None,
            plan_store: None,
            outputs: None,
            observer: None,
            event_sender: None,
            context: EngineContext::default(),
            config: EngineConfig::default(),
        }
    }

    pub fn step_registry(mut self, registry: Arc<StepRegistry>) -> Self {
        self.step_registry = Some(registry);
        self
    }

    pub fn adviser_registry(mut self, registry: Arc<AdviserRegistry>) -> Self {
        self.adviser_registry = Some(registry);
        self
    }

    pub fn notify_registry(mut self, registry: Arc<NotifyPublisherRegistry>) -> Self {
        self.notify_registry = Some(registry);
        self
    }

    pub fn node_store(mut self, store: SharedNodeStore) -> Self {
        self.node_store = Some(store);
        self
    }

    pub fn plan_store(mut self, store: SharedPlanStore) -> Self {
        self.plan_store = Some(store);
        self
    }

    pub fn sweeping_output_service(mut self, service: Arc<dyn SweepingOutputService>) -> Self {
        self.outputs = Some(service);
        self
    }

    pub fn observer(mut self, observer: Arc<NodeStatusUpdateObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn event_sender(mut self, sender: EventSender) -> Self {
        self.event_sender = Some(sender);
        self
    }

    pub fn context(mut self, context: EngineContext) -> Self {
        self.context = context;
        self
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Assemble the executor, wire the default status handlers, spawn the
    /// notification router, and register the engine publisher.
    ///
    /// Must be called inside a tokio runtime: the router task is spawned here.
    pub fn build(self) -> PlanExecutor {
        let node_store = self
            .node_store
            .unwrap_or_else(|| Arc::new(InMemoryNodeExecutionStore::new()));
        let plan_store = self
            .plan_store
            .unwrap_or_else(|| Arc::new(InMemoryPlanExecutionStore::new()));
        let step_registry = self.step_registry.unwrap_or_default();
        let adviser_registry = self
            .adviser_registry
            .unwrap_or_else(|| Arc::new(crate::advisers::default_adviser_registry()));
        let notify_registry = self.notify_registry.unwrap_or_default();
        let observer = self.observer.unwrap_or_default();
        observer.register(
            Status::InputWaiting,
            Arc::new(InputWaitingStatusUpdate::new(plan_store.clone())),
        );
        let outputs = self
            .outputs
            .unwrap_or_else(|| Arc::new(InMemorySweepingOutputService::new()));
        let emitter = match self.event_sender {
            Some(sender) => EventEmitter::new(sender),
            None => EventEmitter::disabled(),
        };

        let interrupts = InterruptProcessor::new(
            node_store.clone(),
            plan_store.clone(),
            observer.clone(),
            step_registry.clone(),
            self.context.clone(),
        );

        let inner = Arc::new(ExecutorInner {
            step_registry,
            adviser_registry,
            notify_registry: notify_registry.clone(),
            node_store,
            plan_store,
            observer,
            progress: Arc::new(ProgressTracker::new()),
            outputs,
            interrupts,
            emitter,
            context: self.context,
            config: self.config.clone(),
            plans: DashMap::new(),
            callbacks: DashMap::new(),
            collecting: DashMap::new(),
        });

        let (notify_tx, mut notify_rx) = mpsc::unbounded_channel::<Notification>();
        notify_registry.register(
            self.config.publisher_name.clone(),
            Arc::new(ChannelNotifyPublisher { tx: notify_tx }),
        );
        let router = inner.clone();
        tokio::spawn(async move {
            while let Some(notification) = notify_rx.recv().await {
                handle_notification(router.clone(), notification).await;
            }
        });

        PlanExecutor { inner }
    }
}

