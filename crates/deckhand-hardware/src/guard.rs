//! Conflict guard for the vendor Stream Deck application.
//!
//! On Windows the Elgato application opens Stream Deck hardware exclusively.
//! Trying to claim those devices while it runs only produces "device in use"
//! failures, so every scan first asks the guard whether the protected families
//! must be skipped for that cycle.
//!
//! The guard always fails open: a disabled platform check, a failing or slow
//! process query, or a crashed query worker all yield
//! [`Suppression::Inactive`].
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use deckhand_hardware::guard::{ConflictGuard, GuardConfig};
//! use deckhand_hardware::mock::MockProcessLister;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let lister = Arc::new(MockProcessLister::new());
//! lister.set_running(["Stream Deck.exe"]);
//!
//! let guard = ConflictGuard::new(GuardConfig::default().enabled(true), lister);
//! assert!(guard.check().await.is_active());
//! # }
//! ```

use crate::error::{HardwareError, Result};
use deckhand_core::constants::{STREAMDECK_APP_PROCESS_NAME, STREAMDECK_SUPPRESSED_REASON};
use std::process::Command;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// A running process reported by a [`ProcessLister`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessInfo {
    pub pid: u32,
    pub name: String,
}

impl ProcessInfo {
    pub fn new(pid: u32, name: impl Into<String>) -> Self {
        Self {
            pid,
            name: name.into(),
        }
    }
}

/// Source of the host's running-process list.
///
/// Implementations may block; the guard always calls them from a blocking
/// worker thread.
pub trait ProcessLister: Send + Sync {
    /// Return running processes whose name contains `name`.
    fn find_by_name(&self, name: &str) -> Result<Vec<ProcessInfo>>;
}

/// Process lister backed by the Windows `tasklist` command.
#[derive(Debug, Clone, Copy, Default)]
pub struct TasklistLister;

impl ProcessLister for TasklistLister {
    fn find_by_name(&self, name: &str) -> Result<Vec<ProcessInfo>> {
        let output = Command::new("tasklist").args(["/FO", "CSV", "/NH"]).output()?;

        if !output.status.success() {
            return Err(HardwareError::process_query(format!(
                "tasklist exited with {}",
                output.status
            )));
        }

        Ok(parse_tasklist_csv(&String::from_utf8_lossy(&output.stdout), name))
    }
}

/// Parse `tasklist /FO CSV /NH` output, keeping images whose name contains
/// `name` (case-insensitive).
pub fn parse_tasklist_csv(output: &str, name: &str) -> Vec<ProcessInfo> {
    let needle = name.to_lowercase();

    output
        .lines()
        .filter_map(|line| {
            let line = line.trim().trim_start_matches('"').trim_end_matches('"');
            let mut fields = line.split("\",\"");
            let image = fields.next()?;
            let pid = fields.next()?.parse().ok()?;
            Some(ProcessInfo::new(pid, image))
        })
        .filter(|process| process.name.to_lowercase().contains(&needle))
        .collect()
}

/// Guard configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardConfig {
    /// Whether the platform needs the check at all.
    pub enabled: bool,

    /// Name searched for in the process list.
    pub process_name: String,

    /// Upper bound for the process query.
    pub timeout: Duration,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            enabled: cfg!(windows),
            process_name: STREAMDECK_APP_PROCESS_NAME.to_string(),
            timeout: Duration::from_secs(2),
        }
    }
}

impl GuardConfig {
    /// Force the check on or off regardless of platform.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set the process name to look for.
    pub fn process_name(mut self, name: impl Into<String>) -> Self {
        self.process_name = name.into();
        self
    }

    /// Set the process query timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Outcome of a guard check, valid for one scan cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Suppression {
    /// Scan all families.
    Inactive,

    /// Skip the protected families; `reason` is shown to the requester.
    Active { reason: String },
}

impl Suppression {
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active { .. })
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Active { reason } => Some(reason),
            Self::Inactive => None,
        }
    }
}

/// Decides per scan whether the protected families are suppressed.
#[derive(Clone)]
pub struct ConflictGuard {
    config: GuardConfig,
    lister: Arc<dyn ProcessLister>,
}

impl std::fmt::Debug for ConflictGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConflictGuard")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ConflictGuard {
    pub fn new(config: GuardConfig, lister: Arc<dyn ProcessLister>) -> Self {
        Self { config, lister }
    }

    /// Guard using `tasklist` with the default configuration.
    pub fn system() -> Self {
        Self::new(GuardConfig::default(), Arc::new(TasklistLister))
    }

    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    /// Query the process list and decide suppression for this cycle.
    pub async fn check(&self) -> Suppression {
        if !self.config.enabled {
            return Suppression::Inactive;
        }

        match self.query().await {
            Ok(processes) if !processes.is_empty() => {
                debug!(
                    process = %self.config.process_name,
                    count = processes.len(),
                    "Vendor application running, suppressing protected families"
                );
                Suppression::Active {
                    reason: STREAMDECK_SUPPRESSED_REASON.to_string(),
                }
            }
            Ok(_) => Suppression::Inactive,
            Err(e) => {
                warn!(error = %e, "Process query failed, scanning all families");
                Suppression::Inactive
            }
        }
    }

    /// Run the process query on a blocking worker, bounded by the timeout.
    async fn query(&self) -> Result<Vec<ProcessInfo>> {
        let lister = Arc::clone(&self.lister);
        let name = self.config.process_name.clone();
        let query = tokio::task::spawn_blocking(move || lister.find_by_name(&name));

        match tokio::time::timeout(self.config.timeout, query).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => Err(HardwareError::other(format!("process query worker failed: {e}"))),
            Err(_) => Err(HardwareError::timeout(self.config.timeout.as_millis() as u64)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockProcessLister;

    fn guard(lister: &Arc<MockProcessLister>) -> ConflictGuard {
        ConflictGuard::new(
            GuardConfig::default()
                .enabled(true)
                .timeout(Duration::from_millis(200)),
            lister.clone(),
        )
    }

    #[test]
    fn test_guard_config_defaults() {
        let config = GuardConfig::default();
        assert_eq!(config.enabled, cfg!(windows));
        assert_eq!(config.process_name, "Stream Deck");
        assert_eq!(config.timeout, Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_disabled_guard_skips_query() {
        let lister = Arc::new(MockProcessLister::new());
        lister.set_running(["Stream Deck.exe"]);

        let guard = ConflictGuard::new(GuardConfig::default().enabled(false), lister.clone());

        assert_eq!(guard.check().await, Suppression::Inactive);
        assert_eq!(lister.call_count(), 0);
    }

    #[tokio::test]
    async fn test_running_application_suppresses() {
        let lister = Arc::new(MockProcessLister::new());
        lister.set_running(["explorer.exe", "Stream Deck.exe"]);

        let suppression = guard(&lister).check().await;
        assert!(suppression.is_active());
        assert_eq!(suppression.reason(), Some(STREAMDECK_SUPPRESSED_REASON));
    }

    #[tokio::test]
    async fn test_absent_application_does_not_suppress() {
        let lister = Arc::new(MockProcessLister::new());
        lister.set_running(["explorer.exe"]);

        assert_eq!(guard(&lister).check().await, Suppression::Inactive);
        assert_eq!(lister.call_count(), 1);
    }

    #[tokio::test]
    async fn test_query_failure_fails_open() {
        let lister = Arc::new(MockProcessLister::new());
        lister.set_running(["Stream Deck.exe"]);
        lister.set_failing(true);

        assert_eq!(guard(&lister).check().await, Suppression::Inactive);
    }

    #[tokio::test]
    async fn test_slow_query_fails_open() {
        let lister = Arc::new(MockProcessLister::new());
        lister.set_running(["Stream Deck.exe"]);
        lister.set_delay(Some(Duration::from_millis(1000)));

        assert_eq!(guard(&lister).check().await, Suppression::Inactive);
    }

    #[tokio::test]
    async fn test_slow_query_reports_timeout() {
        let lister = Arc::new(MockProcessLister::new());
        lister.set_delay(Some(Duration::from_millis(1000)));

        let err = guard(&lister).query().await.unwrap_err();
        assert!(matches!(err, HardwareError::Timeout { duration_ms: 200 }));
    }

    #[tokio::test]
    async fn test_guard_is_re_evaluated() {
        let lister = Arc::new(MockProcessLister::new());
        let guard = guard(&lister);

        lister.set_running(["Stream Deck.exe"]);
        assert!(guard.check().await.is_active());

        lister.set_running(Vec::<String>::new());
        assert!(!guard.check().await.is_active());
        assert_eq!(lister.call_count(), 2);
    }

    #[test]
    fn test_parse_tasklist_csv() {
        let output = "\"System Idle Process\",\"0\",\"Services\",\"0\",\"8 K\"\r\n\
                      \"Stream Deck.exe\",\"4120\",\"Console\",\"1\",\"88,412 K\"\r\n\
                      \"stream deck helper.exe\",\"4188\",\"Console\",\"1\",\"12,004 K\"\r\n\
                      \r\n";

        let found = parse_tasklist_csv(output, "Stream Deck");
        assert_eq!(
            found,
            vec![
                ProcessInfo::new(4120, "Stream Deck.exe"),
                ProcessInfo::new(4188, "stream deck helper.exe"),
            ]
        );
    }

    #[test]
    fn test_parse_tasklist_ignores_garbage() {
        let output = "INFO: No tasks are running which match the specified criteria.\r\n";
        assert!(parse_tasklist_csv(output, "Stream Deck").is_empty());
    }
}
