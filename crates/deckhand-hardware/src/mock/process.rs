//! Scriptable process list for conflict guard tests.

use crate::error::{HardwareError, Result};
use crate::guard::{ProcessInfo, ProcessLister};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Mock process lister.
///
/// Matching follows [`TasklistLister`](crate::guard::TasklistLister):
/// case-insensitive substring on the process name.
#[derive(Debug, Default)]
pub struct MockProcessLister {
    running: Mutex<Vec<ProcessInfo>>,
    delay: Mutex<Option<Duration>>,
    failing: AtomicBool,
    calls: AtomicUsize,
}

impl MockProcessLister {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the running process list. Pids are assigned sequentially.
    pub fn set_running<I, S>(&self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let processes = names
            .into_iter()
            .enumerate()
            .map(|(i, name)| ProcessInfo::new(1000 + i as u32, name))
            .collect();
        *self.running.lock().unwrap_or_else(PoisonError::into_inner) = processes;
    }

    /// Make every query fail.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Block every query for `delay`.
    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.lock().unwrap_or_else(PoisonError::into_inner) = delay;
    }

    /// Number of queries made so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ProcessLister for MockProcessLister {
    fn find_by_name(&self, name: &str) -> Result<Vec<ProcessInfo>> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let delay = *self.delay.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }

        if self.failing.load(Ordering::SeqCst) {
            return Err(HardwareError::process_query("simulated process query failure"));
        }

        let needle = name.to_lowercase();
        Ok(self
            .running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|process| process.name.to_lowercase().contains(&needle))
            .cloned()
            .collect())
    }
}
