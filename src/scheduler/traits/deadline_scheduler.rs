//! Deadline scheduler abstraction: the runtime facility able to invoke a
//! handler once after a delay, cancel it, or push its deadline back in place.
use embassy_time::{Duration, Instant};

use crate::core::FireHandler;

/// Delayed-callback primitives provided by the host runtime.
///
/// Each [`Timer`](crate::timer::Timer) owns at most one live handle at a time
/// and never shares it.
///
/// # Contract
///
/// - A handler runs at most once, at or after its deadline. Implementations
///   may round a deadline up to their own resolution.
/// - A cancelled handle never runs its handler.
/// - Implementations must **never** invoke a handler synchronously from
///   inside [`schedule_once`](Self::schedule_once), [`cancel`](Self::cancel)
///   or [`reset_duration`](Self::reset_duration): the timer calls these while
///   updating its own state.
pub trait DeadlineScheduler {
    /// Opaque handle identifying one pending deadline.
    type Handle;

    /// Current instant on the scheduler's clock.
    fn now(&self) -> Instant;

    /// Run `handler` once, `delay` from now.
    fn schedule_once(&self, delay: Duration, handler: FireHandler) -> Self::Handle;

    /// Drop a pending deadline without running its handler.
    fn cancel(&self, handle: Self::Handle);

    /// Move a pending deadline to `delay` from now, keeping the same handle
    /// and handler.
    fn reset_duration(&self, handle: &mut Self::Handle, delay: Duration);
}
