//! Supervisory core
//!
//! The state machine that turns probe results and a hot-reloadable
//! configuration into decisions: wait, restart, kill-then-restart, or pause.

pub mod watchdog;

pub use watchdog::{Supervisor, SupervisorState};
