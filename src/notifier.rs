// File: ./src/notifier.rs
//! User-visible error reporting.
//!
//! Every parse or I/O failure ends up here as a primary/secondary message
//! pair. Reporting is fire-and-forget.
use crate::config::Config;
use notify_rust::Notification;
use std::sync::{Arc, Mutex};

pub trait ErrorSink: Send + Sync {
    fn report(&self, primary: &str, secondary: &str);
}

/// Writes reports to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl ErrorSink for LogSink {
    fn report(&self, primary: &str, secondary: &str) {
        log::warn!("{}: {}", primary, secondary);
    }
}

/// Shows a desktop notification for each report, and logs it.
#[derive(Debug, Clone)]
pub struct DesktopSink {
    appname: String,
}

impl DesktopSink {
    pub fn new(appname: &str) -> Self {
        Self {
            appname: appname.to_string(),
        }
    }
}

impl Default for DesktopSink {
    fn default() -> Self {
        Self::new("Todo.txt")
    }
}

impl ErrorSink for DesktopSink {
    fn report(&self, primary: &str, secondary: &str) {
        LogSink.report(primary, secondary);

        let summary = primary.to_string();
        let body = secondary.to_string();
        let appname = self.appname.clone();
        // Showing can block on the session bus.
        std::thread::spawn(move || {
            if let Err(e) = Notification::new()
                .summary(&summary)
                .body(&body)
                .appname(&appname)
                .show()
            {
                log::debug!("Desktop notification failed: {}", e);
            }
        });
    }
}

/// Keeps every report in memory, in order.
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    reports: Arc<Mutex<Vec<(String, String)>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<(String, String)> {
        self.reports.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn primaries(&self) -> Vec<String> {
        self.reports().into_iter().map(|(p, _)| p).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.reports().is_empty()
    }

    pub fn clear(&self) {
        if let Ok(mut r) = self.reports.lock() {
            r.clear();
        }
    }
}

impl ErrorSink for RecordingSink {
    fn report(&self, primary: &str, secondary: &str) {
        log::debug!("Recorded report: {}: {}", primary, secondary);
        if let Ok(mut r) = self.reports.lock() {
            r.push((primary.to_string(), secondary.to_string()));
        }
    }
}

/// Picks the sink matching the configuration.
pub fn sink_from_config(config: &Config) -> Arc<dyn ErrorSink> {
    if config.desktop_notifications {
        Arc::new(DesktopSink::default())
    } else {
        Arc::new(LogSink)
    }
}
