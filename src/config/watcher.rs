//! Configuration file watcher for hot reload.
//!
//! Editors emit several modify events per save, and some of them land before
//! the file is complete. A reload is forwarded only when the file parses,
//! validates, and differs from the last accepted configuration in at least one
//! section. Each forwarded reload logs the governor policy it will install.

use std::path::{Path, PathBuf};
use std::time::Duration;
use notify::{Watcher, RecursiveMode, Event, RecommendedWatcher, Config};
use tokio::sync::mpsc;
use crate::config::loader::load_config;
use crate::config::schema::GatewayConfig;

/// Top-level sections of [`GatewayConfig`], as named in the TOML file.
pub const SECTIONS: [&str; 10] = [
    "listener",
    "upstream",
    "governor",
    "rate_limit",
    "cors",
    "health_check",
    "timeouts",
    "observability",
    "admin",
    "security",
];

/// Sections whose new values only take effect after a restart.
pub const RESTART_SECTIONS: [&str; 2] = ["listener", "upstream"];

/// Sections that differ between two configurations.
pub fn changed_sections(current: &GatewayConfig, next: &GatewayConfig) -> Vec<&'static str> {
    let (Ok(a), Ok(b)) = (serde_json::to_value(current), serde_json::to_value(next)) else {
        return SECTIONS.to_vec();
    };
    SECTIONS
        .iter()
        .copied()
        .filter(|section| a.get(section) != b.get(section))
        .collect()
}

/// A watcher that monitors the configuration file for changes.
pub struct ConfigWatcher {
    path: PathBuf,
    current: GatewayConfig,
    update_tx: mpsc::UnboundedSender<GatewayConfig>,
}

impl ConfigWatcher {
    /// Create a watcher seeded with the configuration the server starts with.
    ///
    /// Returns the watcher and a receiver for changed, validated configurations.
    pub fn new(path: &Path, current: &GatewayConfig) -> (Self, mpsc::UnboundedReceiver<GatewayConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();

        (Self {
            path: path.to_path_buf(),
            current: current.clone(),
            update_tx,
        }, update_rx)
    }

    /// Start watching the file in a background thread.
    ///
    /// The returned watcher must be kept alive for as long as reloads are wanted.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let tx = self.update_tx;
        let path = self.path.clone();
        let mut current = self.current;

        let mut watcher = RecommendedWatcher::new(move |res: notify::Result<Event>| {
            match res {
                Ok(event) if event.kind.is_modify() || event.kind.is_create() => {
                    let next = match load_config(&path) {
                        Ok(next) => next,
                        Err(e) => {
                            tracing::error!(error = %e, "Failed to reload config, keeping current configuration");
                            return;
                        }
                    };

                    let changed = changed_sections(&current, &next);
                    if changed.is_empty() {
                        tracing::debug!(path = ?path, "Config file event without changes");
                        return;
                    }

                    tracing::info!(
                        path = ?path,
                        sections = ?changed,
                        mode = next.governor.mode.as_str(),
                        rate_limit_enabled = next.rate_limit.enabled,
                        window_secs = next.rate_limit.window_secs,
                        max_requests = next.rate_limit.max_requests,
                        "Config change detected, reloading"
                    );
                    if next.governor.mode != current.governor.mode {
                        tracing::warn!(
                            from = current.governor.mode.as_str(),
                            to = next.governor.mode.as_str(),
                            "Governor mode switching"
                        );
                    }
                    let pending_restart: Vec<_> = changed
                        .iter()
                        .filter(|section| RESTART_SECTIONS.contains(*section))
                        .collect();
                    if !pending_restart.is_empty() {
                        tracing::warn!(sections = ?pending_restart, "Changes require a restart; applying the rest");
                    }

                    current = next.clone();
                    if tx.send(next).is_err() {
                        tracing::debug!("Config receiver dropped, ignoring reload");
                    }
                }
                Ok(_) => {}
                Err(e) => tracing::error!(error = ?e, "Watch error"),
            }
        }, Config::default().with_poll_interval(Duration::from_secs(2)))?;

        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, "Config watcher started");
        Ok(watcher)
    }
}
