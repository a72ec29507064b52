//! Engine layer — plan advance, suspension, and resumption.
//!
//! Submodules:
//! - [`executor`] — The plan executor and its builder.
//! - [`step`] — The step executable contract.
//! - [`store`] — Persistence contracts and in-memory implementations.
//! - [`events`] — Engine events emitted while a plan advances.
//! - [`context`] — Time and id providers (real and fake).

pub mod context;
pub mod events;
pub mod executor;
pub mod step;
pub mod store;

pub use context::{
    EngineContext, FakeIdGenerator, FakeTimeProvider, IdGenerator, RealIdGenerator,
    RealTimeProvider, TimeProvider,
};
pub use events::{create_event_channel, EngineEvent, EventEmitter, EventReceiver, EventSender};
pub use executor::{EngineConfig, PlanExecutor, PlanExecutorBuilder};
pub use step::{Step, StepOutcome, StepResponse};
pub use store::{
    InMemoryNodeExecutionStore, InMemoryPlanExecutionStore, NodeExecutionStore, PlanExecutionStore,
};
