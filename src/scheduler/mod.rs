//! Deadline scheduling: the collaborator trait a [`Timer`](crate::timer::Timer)
//! arms itself through, and a host-driven implementation of it.
pub mod manual;
pub mod traits;
