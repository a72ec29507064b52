//! Registries — process-wide dispatch tables populated at startup.
//!
//! - [`AdviserRegistry`] — strict, duplicate-rejecting mapping from adviser
//!   type to producer.
//! - [`StepRegistry`] — strict mapping from step type to executable.
//! - [`NotifyPublisherRegistry`] — last-write-wins mapping from channel name
//!   to completion-notification publisher.

pub mod adviser;
pub mod notify;
pub mod step;

pub use adviser::{
    Advise, AdviseEvent, Adviser, AdviserObtainment, AdviserProducer, AdviserRegistry, AdviserType,
};
pub use notify::{Notification, NotifyPublisher, NotifyPublisherRegistry};
pub use step::StepRegistry;
