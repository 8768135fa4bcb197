//! Abstraction traits implemented by the host runtime.
pub mod deadline_scheduler;
