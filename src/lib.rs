//! srcds-sentinel: watchdog daemon for a single long-running game server.
//!
//! The supervisory loop probes the server's port on a fixed cadence, restarts
//! the process after repeated failures or on a fixed daily schedule, and
//! reports state transitions to a webhook.

pub mod config;
pub mod error;
pub mod notify;
pub mod probe;
pub mod process;
pub mod supervisor;

/// Fixed timezone for timestamps and the daily-restart window.
pub const LOCAL_TZ: chrono_tz::Tz = chrono_tz::America::Sao_Paulo;

pub use config::{Config, ConfigStore, DEFAULT_CONFIG_FILE};
pub use error::{Result, SentinelError};
pub use notify::{EventKind, Notify, WebhookNotifier};
pub use probe::{HealthCheck, TcpProbe};
pub use process::{ProcessControl, SysProcessControl};
pub use supervisor::{Supervisor, SupervisorState};
