/// Test doubles driving timers on a real clock during integration tests.
use embassy_time::{Duration, Instant};
use korri_timer::{core::FireHandler, DeadlineScheduler};
use std::{cell::Cell, rc::Rc};
use tokio::{sync::mpsc, task::JoinHandle};

#[derive(Clone)]
#[allow(dead_code)]
/// Scheduler backed by `tokio::time`. Each deadline is a local task sleeping
/// until expiry; resets are sent to it over a channel and applied with
/// `Sleep::reset`.
///
/// Must be used inside a `tokio::task::LocalSet`.
pub struct TokioScheduler {
    origin: tokio::time::Instant,
}

#[allow(dead_code)]
/// Live deadline owned by a timer.
pub struct TokioHandle {
    task: JoinHandle<()>,
    reset: mpsc::UnboundedSender<tokio::time::Instant>,
}

#[allow(dead_code)]
impl TokioScheduler {
    pub fn new() -> Self {
        Self {
            origin: tokio::time::Instant::now(),
        }
    }
}

fn std_duration(delay: Duration) -> std::time::Duration {
    delay.into()
}

impl DeadlineScheduler for TokioScheduler {
    type Handle = TokioHandle;

    fn now(&self) -> Instant {
        Instant::from_micros(self.origin.elapsed().as_micros() as u64)
    }

    fn schedule_once(&self, delay: Duration, handler: FireHandler) -> TokioHandle {
        let (reset, mut resets) = mpsc::unbounded_channel();
        let deadline = tokio::time::Instant::now() + std_duration(delay);

        let task = tokio::task::spawn_local(async move {
            let sleep = tokio::time::sleep_until(deadline);
            tokio::pin!(sleep);
            loop {
                tokio::select! {
                    biased;
                    Some(deadline) = resets.recv() => sleep.as_mut().reset(deadline),
                    () = &mut sleep => break,
                }
            }
            handler();
        });

        TokioHandle { task, reset }
    }

    fn cancel(&self, handle: TokioHandle) {
        handle.task.abort();
    }

    fn reset_duration(&self, handle: &mut TokioHandle, delay: Duration) {
        let deadline = tokio::time::Instant::now() + std_duration(delay);
        // The task only goes away after firing, and a fired handle is never reset.
        let _ = handle.reset.send(deadline);
    }
}

#[derive(Clone, Default)]
#[allow(dead_code)]
/// Shared invocation counter handed to timer callbacks.
pub struct CallCounter(Rc<Cell<u32>>);

#[allow(dead_code)]
impl CallCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Closure incrementing the counter.
    pub fn callback(&self) -> impl FnMut() + 'static {
        let count = Rc::clone(&self.0);
        move || count.set(count.get() + 1)
    }

    pub fn count(&self) -> u32 {
        self.0.get()
    }
}

#[allow(dead_code)]
/// Whether `a` and `b` are within `tolerance_ms` of each other.
pub fn is_close(a: Instant, b: Instant, tolerance_ms: u64) -> bool {
    let diff = if a > b { a - b } else { b - a };
    diff <= Duration::from_millis(tolerance_ms)
}
