//! # Planflow — A Pipeline Orchestration Execution Engine
//!
//! `planflow` is the execution core of a pipeline orchestrator: it advances a
//! directed execution plan (nodes = steps), dispatches work to pluggable
//! advisers and step executables, resolves expression references against
//! ambient execution state (sweeping outputs), handles asynchronous task
//! completion and interrupts, and propagates status transitions to the
//! plan-level aggregate. It is a library embedded in a larger execution
//! service; persistence, task transport, and surfaces stay behind traits.
//!
//! - **Plan advance**: a multi-threaded executor drives nodes through their
//!   lifecycle; each node's dispatch, suspension, and resumption span
//!   independent thread invocations.
//! - **Suspension without blocking**: a step returning a pending-response
//!   descriptor (async, async-chain, task, task-chain) parks its node and
//!   frees the thread; completion notifications resume it later.
//! - **Advisers**: post-node-completion decision logic (proceed, retry, end
//!   plan) materialized from a strict, duplicate-rejecting registry.
//! - **Interrupts**: abort, pause, resume, and retry travel in an
//!   [`InterruptPackage`] carrying exactly one pending-response descriptor.
//! - **Status observers**: handlers keyed by status react to node transitions,
//!   e.g. propagating `INPUT_WAITING` to the plan-level aggregate only.
//! - **Sweeping outputs**: named values published by one node and resolved by
//!   others during expression evaluation, with no caching.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use planflow::{Plan, PlanExecutor, PlanNode, StepType};
//!
//! # async fn run() -> Result<(), planflow::EngineError> {
//! let executor = PlanExecutor::builder().build();
//! // Steps and advisers are registered during module wiring.
//! let plan = Plan::new("plan-def", "n1")
//!     .with_node(PlanNode::new("n1", "Build", "build", StepType::new("SHELL")));
//! let plan_execution_id = executor.start(plan, "acct", "org", "proj")?;
//! let status = executor.wait_for_plan(&plan_execution_id).await?;
//! println!("{status:?}");
//! # Ok(())
//! # }
//! ```

pub mod advisers;
pub mod domain;
pub mod engine;
pub mod error;
pub mod interrupt;
pub mod observers;
pub mod progress;
pub mod registry;
pub mod resolver;

pub use crate::domain::{
    Ambiance, AsyncChainExecutableResponse, AsyncExecutableResponse, Level, NodeExecution,
    PendingMode, PendingResponse, Plan, PlanExecution, PlanNode, Status, StepType,
    TaskChainExecutableResponse, TaskExecutableResponse,
};
pub use crate::engine::{
    create_event_channel, EngineConfig, EngineContext, EngineEvent, EventReceiver, EventSender,
    InMemoryNodeExecutionStore, InMemoryPlanExecutionStore, NodeExecutionStore, PlanExecutionStore,
    PlanExecutor, PlanExecutorBuilder, Step, StepOutcome, StepResponse,
};
pub use crate::error::{EngineError, EngineResult, RegistryError, ResolveError};
pub use crate::interrupt::{InterruptPackage, InterruptProcessor, InterruptType};
pub use crate::observers::{
    InputWaitingStatusUpdate, NodeStatusUpdateHandler, NodeStatusUpdateObserver, NodeUpdateInfo,
};
pub use crate::progress::{AsyncProgressData, ProgressTracker};
pub use crate::registry::{
    Advise, AdviseEvent, Adviser, AdviserObtainment, AdviserProducer, AdviserRegistry, AdviserType,
    Notification, NotifyPublisher, NotifyPublisherRegistry, StepRegistry,
};
pub use crate::resolver::{
    InMemorySweepingOutputService, RefObject, SweepingOutputResolver, SweepingOutputService,
};
