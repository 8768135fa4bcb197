//! Error definitions shared across library modules.
//! Only configuration can fail: firing is infallible from the timer's point
//! of view and callback panics are left to propagate.
use thiserror_no_std::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Errors raised synchronously while configuring a [`Timer`](crate::timer::Timer).
pub enum TimerError {
    /// No callback was supplied in the options.
    #[error("No callback supplied to Timer")]
    MissingCallback,
    /// The delay is missing, NaN, infinite, negative once floored, or larger
    /// than [`MAX_DELAY_MS`](crate::core::MAX_DELAY_MS).
    #[error("Invalid delay period supplied to Timer")]
    InvalidDelay,
}
