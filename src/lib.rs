//! `korri-timer` library: single-shot and repeating deferred-callback timers
//! for `no_std` environments. A timer arms itself through a pluggable
//! deadline scheduler, reports its armed state, can be cancelled or re-armed
//! at any time (including from its own callback), and exposes a future
//! resolved by its next firing.
#![no_std]
//==================================================================================
extern crate alloc;
//==================================================================================
/// Data types shared by the timer and the scheduler backends (callback
/// wrapper, fire handler, configuration limits).
pub mod core;
/// Configuration errors.
pub mod error;
/// Deadline scheduler abstraction and a host-driven virtual-clock backend.
pub mod scheduler;
/// Timer state machine, its options builder, and the completion future.
pub mod timer;
//==================================================================================
pub use error::TimerError;
pub use scheduler::{
    manual::{ManualHandle, ManualScheduler},
    traits::deadline_scheduler::DeadlineScheduler,
};
pub use timer::{
    completion::Completion,
    options::{Millis, TimerOptions},
    Timer, WeakTimer,
};
