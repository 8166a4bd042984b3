//! OS process discovery, termination, and opaque start/restart commands.

use async_trait::async_trait;
use sysinfo::{ProcessesToUpdate, Signal, System};
use tokio::process::Command;
use tracing::{info, warn};

/// Interface the supervisor uses to inspect and control the server process.
///
/// All operations are best-effort: failures are logged and never propagate
/// into supervisory decisions.
#[async_trait]
pub trait ProcessControl: Send + Sync {
    /// True iff at least one live OS process's name matches the set.
    async fn is_running(&self, names: &[String]) -> bool;

    /// Terminate every matching process, waiting for each to exit before
    /// moving on. Processes that vanish or are inaccessible mid-scan are
    /// skipped. Returns the (name, pid) pairs acted on, for reporting.
    async fn kill_all(&self, names: &[String]) -> Vec<(String, u32)>;

    /// Invoke the opaque start command. Does not wait for the server's own
    /// startup; that is the supervisor's grace-period wait.
    async fn launch(&self, command: &str);

    /// Invoke the opaque restart command.
    async fn restart(&self, command: &str);
}

/// Process control backed by `sysinfo` scans and `sh -c` command execution.
pub struct SysProcessControl;

impl SysProcessControl {
    fn scan() -> System {
        let mut system = System::new();
        system.refresh_processes(ProcessesToUpdate::All, true);
        system
    }

    fn matches(names: &[String], candidate: &str) -> bool {
        names.iter().any(|n| n == candidate)
    }

    async fn shell(&self, command: &str) {
        if command.trim().is_empty() {
            warn!("empty command string; nothing to run");
            return;
        }
        match Command::new("sh").arg("-c").arg(command).status().await {
            Ok(status) if status.success() => info!(%command, "command finished"),
            Ok(status) => warn!(%command, %status, "command exited with non-zero status"),
            Err(e) => warn!(%command, "failed to run command: {e}"),
        }
    }
}

#[async_trait]
impl ProcessControl for SysProcessControl {
    async fn is_running(&self, names: &[String]) -> bool {
        let system = Self::scan();
        system
            .processes()
            .values()
            .any(|p| Self::matches(names, &p.name().to_string_lossy()))
    }

    async fn kill_all(&self, names: &[String]) -> Vec<(String, u32)> {
        let system = Self::scan();
        let mut killed = Vec::new();
        for (pid, process) in system.processes() {
            let name = process.name().to_string_lossy().into_owned();
            if !Self::matches(names, &name) {
                continue;
            }
            info!(%name, pid = pid.as_u32(), "terminating server process");
            if !process.kill_with(Signal::Term).unwrap_or(false) && !process.kill() {
                // Already gone or inaccessible; skip without error.
                continue;
            }
            process.wait();
            killed.push((name, pid.as_u32()));
        }
        killed
    }

    async fn launch(&self, command: &str) {
        info!("launching server");
        self.shell(command).await;
    }

    async fn restart(&self, command: &str) {
        info!("restarting server");
        self.shell(command).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bogus_names() -> Vec<String> {
        vec!["srcds-sentinel-no-such-process".to_string()]
    }

    #[tokio::test]
    async fn is_running_false_for_unknown_name() {
        let control = SysProcessControl;
        assert!(!control.is_running(&bogus_names()).await);
    }

    #[tokio::test]
    async fn kill_all_skips_unknown_names() {
        let control = SysProcessControl;
        assert!(control.kill_all(&bogus_names()).await.is_empty());
    }

    #[tokio::test]
    async fn is_running_with_empty_set_matches_nothing() {
        let control = SysProcessControl;
        assert!(!control.is_running(&[]).await);
    }
}
