//! Watchdog loop for a single game-server process
//!
//! One sequential cycle per `check_interval`: reload configuration, honor the
//! pause flag, run the daily-restart window, probe the server port, and
//! escalate to kill + restart once the failure limit is exceeded.

use chrono::{DateTime, NaiveDate, Timelike, Utc};
use chrono_tz::Tz;
use std::sync::Arc;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::config::{Config, ConfigStore, PROBE_TIMEOUT};
use crate::error::Result;
use crate::notify::{EventKind, Notify};
use crate::probe::HealthCheck;
use crate::process::ProcessControl;
use crate::LOCAL_TZ;

/// Consecutive failures after which an informational notice goes out, before
/// any restart is considered.
const FAILURE_NOTICE_THRESHOLD: u32 = 3;

/// Local hour during which the scheduled daily restart may fire, half-open.
const DAILY_RESTART_HOUR: u32 = 6;

/// In-memory supervisory state, owned exclusively by the loop.
///
/// Lost when the daemon restarts; nothing here is persisted.
#[derive(Debug, Default)]
pub struct SupervisorState {
    /// Consecutive failed probes; reset by any successful probe or restart
    pub failure_count: u32,
    /// Calendar date the scheduled daily restart last ran
    pub last_daily_restart: Option<NaiveDate>,
    /// Log de-duplication only; does not affect behavior
    pub paused_last_cycle: Option<bool>,
}

fn daily_restart_due(state: &SupervisorState, now: DateTime<Tz>) -> bool {
    now.hour() == DAILY_RESTART_HOUR && state.last_daily_restart != Some(now.date_naive())
}

/// The supervisory loop.
///
/// Holds the only mutable [`SupervisorState`]; collaborators are reached
/// through their interfaces and receive the current configuration snapshot
/// explicitly each cycle.
pub struct Supervisor {
    store: ConfigStore,
    probe: Arc<dyn HealthCheck>,
    process: Arc<dyn ProcessControl>,
    notifier: Arc<dyn Notify>,
    state: SupervisorState,
}

impl Supervisor {
    pub fn new(
        store: ConfigStore,
        probe: Arc<dyn HealthCheck>,
        process: Arc<dyn ProcessControl>,
        notifier: Arc<dyn Notify>,
    ) -> Self {
        Self {
            store,
            probe,
            process,
            notifier,
            state: SupervisorState::default(),
        }
    }

    pub fn state(&self) -> &SupervisorState {
        &self.state
    }

    /// One-time startup sequence, run before the loop.
    ///
    /// Two grace-period waits are intentional: one for the host to stabilize
    /// after boot, one for the just-launched server's own startup.
    pub async fn startup(&mut self) {
        self.store.ensure_exists();
        let config = self.store.reload().clone();
        if let Err(issues) = config.validate() {
            for issue in issues {
                warn!("configuration: {issue}");
            }
        }

        info!(
            delay_secs = config.startup_delay_secs,
            "waiting for host to stabilize"
        );
        sleep(config.startup_delay()).await;

        if config.active && !self.process.is_running(&config.server_process_names).await {
            self.process.launch(&config.start_command).await;
            self.notifier.notify(&config, EventKind::Init, None).await;
        }

        info!(
            delay_secs = config.startup_delay_secs,
            "waiting for server startup"
        );
        sleep(config.startup_delay()).await;
    }

    /// Run the loop forever.
    ///
    /// Each cycle runs under an error boundary: an unexpected failure is
    /// logged, reported, and the loop resumes at the next cycle. The daemon
    /// stops only when killed externally.
    pub async fn run(mut self) {
        info!("starting supervisory loop");
        loop {
            let now = Utc::now().with_timezone(&LOCAL_TZ);
            if let Err(e) = self.run_cycle(now).await {
                error!("cycle failed: {e}");
                let config = self.store.snapshot().clone();
                self.notifier
                    .notify(
                        &config,
                        EventKind::Error,
                        Some(&format!("Unexpected error: {e}")),
                    )
                    .await;
            }
            sleep(self.store.snapshot().check_interval()).await;
        }
    }

    /// Advance the state machine by one cycle at the given local time.
    ///
    /// The final `check_interval` sleep belongs to [`run`](Self::run); the
    /// `startup_delay` waits after a restart happen in here, so a cycle that
    /// performs a daily restart and then still escalates sleeps twice.
    pub async fn run_cycle(&mut self, now: DateTime<Tz>) -> Result<()> {
        let config = self.store.reload().clone();

        if !config.active {
            if self.state.paused_last_cycle != Some(true) {
                info!("monitoring paused by configuration (active: false)");
            }
            self.state.paused_last_cycle = Some(true);
            return Ok(());
        }
        if self.state.paused_last_cycle == Some(true) {
            info!("monitoring resumed (active: true)");
        }
        self.state.paused_last_cycle = Some(false);

        if daily_restart_due(&self.state, now) {
            self.daily_restart(&config, now).await;
        }

        self.check_health(&config).await;

        if self.state.failure_count > config.failure_limit {
            self.escalate(&config).await;
        }

        Ok(())
    }

    /// Scheduled restart inside the 06:00-06:59 window, once per calendar day.
    async fn daily_restart(&mut self, config: &Config, now: DateTime<Tz>) {
        info!("scheduled daily restart (06:00-06:59 window)");
        self.notifier
            .notify(
                config,
                EventKind::Log,
                Some("Scheduled daily restart between 06:00 and 06:59."),
            )
            .await;
        self.process.restart(&config.restart_command).await;
        self.notifier.notify(config, EventKind::Restart, None).await;

        info!("waiting for the server to stabilize after the daily restart");
        sleep(config.startup_delay()).await;
        self.state.failure_count = 0;
        self.state.last_daily_restart = Some(now.date_naive());
    }

    async fn check_health(&mut self, config: &Config) {
        if self
            .probe
            .probe(&config.server_host, config.server_port, PROBE_TIMEOUT)
            .await
        {
            debug!("server reachable; failure counter reset");
            self.state.failure_count = 0;
            return;
        }

        self.state.failure_count += 1;
        warn!(count = self.state.failure_count, "probe failed");
        if self.state.failure_count > FAILURE_NOTICE_THRESHOLD {
            // Informational only; restart is decided by failure_limit.
            self.notifier
                .notify(
                    config,
                    EventKind::Error,
                    Some(&format!(
                        "Server failure detected. Consecutive failures: {}",
                        self.state.failure_count
                    )),
                )
                .await;
        }
    }

    /// Kill any surviving processes and restart once the limit is exceeded.
    async fn escalate(&mut self, config: &Config) {
        error!(
            count = self.state.failure_count,
            limit = config.failure_limit,
            "failure limit exceeded; restarting server"
        );
        self.notifier
            .notify(
                config,
                EventKind::Error,
                Some("Failure limit exceeded. Restarting server."),
            )
            .await;

        if self.process.is_running(&config.server_process_names).await {
            for (name, pid) in self.process.kill_all(&config.server_process_names).await {
                self.notifier
                    .notify(
                        config,
                        EventKind::Action,
                        Some(&format!("Killed process {name} with PID {pid}")),
                    )
                    .await;
            }
        }
        self.process.restart(&config.restart_command).await;
        self.notifier.notify(config, EventKind::Restart, None).await;

        info!("waiting for the server to come back up");
        sleep(config.startup_delay()).await;
        self.state.failure_count = 0;
    }
}
