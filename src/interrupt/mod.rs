//! Interrupts — abort, pause, resume, and retry of suspended nodes.

pub mod package;
pub mod processor;

pub use package::{InterruptPackage, InterruptType};
pub use processor::InterruptProcessor;
