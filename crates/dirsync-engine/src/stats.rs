use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Mutex;
use std::time::Instant;

use dirsync_fetch::{ApiCall, CallRecorder};
use dirsync_types::Timestamp;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::error::{EngineError, EngineResult};

/// An error or warning noted during a run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunEvent {
    pub message: String,
    pub timestamp: Timestamp,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub context: BTreeMap<String, String>,
}

/// What `save_metrics` writes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunMetrics {
    /// Seconds since the run started.
    pub duration: f64,
    /// Entry-count delta per category.
    pub changes: BTreeMap<String, i64>,
    pub error_count: usize,
    pub warning_count: usize,
    pub api_calls: Vec<ApiCall>,
    pub timestamp: Timestamp,
}

struct Inner {
    started: Instant,
    errors: Vec<RunEvent>,
    warnings: Vec<RunEvent>,
    api_calls: Vec<ApiCall>,
    changes: BTreeMap<String, i64>,
}

/// Run-wide record of errors, warnings, API calls and changes.
///
/// Shared with the fetcher as its [`CallRecorder`].
pub struct RunStats {
    inner: Mutex<Inner>,
}

impl RunStats {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                started: Instant::now(),
                errors: Vec::new(),
                warnings: Vec::new(),
                api_calls: Vec::new(),
                changes: BTreeMap::new(),
            }),
        }
    }

    /// Restart the run clock that `duration` is measured from.
    pub fn start(&self) {
        self.lock().started = Instant::now();
    }

    pub fn error(&self, message: impl Into<String>, context: &[(&str, &str)], now: Timestamp) {
        let event = event(message.into(), context, now);
        error!(context = ?event.context, "{}", event.message);
        self.lock().errors.push(event);
    }

    pub fn warning(&self, message: impl Into<String>, context: &[(&str, &str)], now: Timestamp) {
        let event = event(message.into(), context, now);
        warn!(context = ?event.context, "{}", event.message);
        self.lock().warnings.push(event);
    }

    /// Record a category's entry-count delta.
    pub fn record_change(&self, category: &str, delta: i64) {
        info!(category, delta, "recorded change");
        self.lock().changes.insert(category.to_string(), delta);
    }

    pub fn errors(&self) -> Vec<RunEvent> {
        self.lock().errors.clone()
    }

    pub fn warnings(&self) -> Vec<RunEvent> {
        self.lock().warnings.clone()
    }

    pub fn api_calls(&self) -> Vec<ApiCall> {
        self.lock().api_calls.clone()
    }

    pub fn metrics(&self, now: Timestamp) -> RunMetrics {
        let inner = self.lock();
        RunMetrics {
            duration: inner.started.elapsed().as_secs_f64(),
            changes: inner.changes.clone(),
            error_count: inner.errors.len(),
            warning_count: inner.warnings.len(),
            api_calls: inner.api_calls.clone(),
            timestamp: now,
        }
    }

    /// Write [`RunMetrics`] as pretty JSON, creating parent directories.
    pub fn save_metrics(&self, path: &Path, now: Timestamp) -> EngineResult<()> {
        let io_err = |source| EngineError::Metrics {
            path: path.to_path_buf(),
            source,
        };
        let json = serde_json::to_string_pretty(&self.metrics(now))
            .map_err(|e| io_err(std::io::Error::other(e)))?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        std::fs::write(path, json).map_err(io_err)?;
        info!(path = %path.display(), "saved run metrics");
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("lock poisoned")
    }
}

impl Default for RunStats {
    fn default() -> Self {
        Self::new()
    }
}

impl CallRecorder for RunStats {
    fn record(&self, call: ApiCall) {
        self.lock().api_calls.push(call);
    }
}

fn event(message: String, context: &[(&str, &str)], now: Timestamp) -> RunEvent {
    RunEvent {
        message,
        timestamp: now,
        context: context
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn now() -> Timestamp {
        Timestamp::parse("2024-05-05 06:00:00").unwrap()
    }

    #[test]
    fn counts_errors_warnings_and_calls() {
        let stats = RunStats::new();
        stats.error("boom", &[("category", "shops"), ("action", "commit")], now());
        stats.warning("no data for parks", &[], now());
        stats.record(ApiCall {
            endpoint: "/parks".into(),
            success: false,
            attempts: 3,
            duration: Duration::from_millis(1500),
        });
        stats.record_change("shops", 2);

        let m = stats.metrics(now());
        assert_eq!(m.error_count, 1);
        assert_eq!(m.warning_count, 1);
        assert_eq!(m.api_calls.len(), 1);
        assert_eq!(m.changes.get("shops"), Some(&2));
        assert_eq!(stats.errors()[0].context.get("action").map(String::as_str), Some("commit"));
    }

    #[test]
    fn start_resets_the_run_clock() {
        let stats = RunStats::new();
        std::thread::sleep(Duration::from_millis(200));
        stats.start();
        assert!(stats.metrics(now()).duration < 0.2);
    }

    #[test]
    fn save_metrics_writes_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metrics").join("daily_stats.json");
        let stats = RunStats::new();
        stats.record_change("events", -1);

        stats.save_metrics(&path, now()).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["changes"]["events"], -1);
        assert_eq!(json["error_count"], 0);
        assert_eq!(json["timestamp"], "2024-05-05 06:00:00");
        assert!(json["duration"].is_f64());
    }
}
