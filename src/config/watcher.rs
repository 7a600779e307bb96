//! Configuration file watcher for hot reload of request patterns.
//!
//! Only `[intercept]` takes effect on reload. Registry timing is fixed when
//! a registry is built, so a changed `[broadcast]` section is reported and
//! otherwise ignored.

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::config::loader::{load_config, ConfigError};
use crate::config::schema::{BroadcastConfig, InterceptConfig};
use crate::matching::PatternCatalog;

/// Watches the configuration file and swaps reloaded patterns into a catalog.
pub struct ConfigWatcher {
    path: PathBuf,
    catalog: Arc<PatternCatalog>,
    broadcast: BroadcastConfig,
    update_tx: mpsc::UnboundedSender<InterceptConfig>,
}

impl ConfigWatcher {
    /// Create a watcher feeding `catalog`.
    ///
    /// `broadcast` is the registry section currently in use. The receiver
    /// gets every accepted `[intercept]` section after it has been applied.
    pub fn new(
        path: &Path,
        catalog: Arc<PatternCatalog>,
        broadcast: BroadcastConfig,
    ) -> (Self, mpsc::UnboundedReceiver<InterceptConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();

        (
            Self {
                path: path.to_path_buf(),
                catalog,
                broadcast,
                update_tx,
            },
            update_rx,
        )
    }

    /// Load and validate the file, then apply its pattern set.
    /// Returns the number of patterns now in the catalog.
    ///
    /// On error the catalog keeps its current patterns.
    pub fn reload(&self) -> Result<usize, ConfigError> {
        let config = load_config(&self.path)?;

        if config.broadcast != self.broadcast {
            tracing::warn!(path = ?self.path, "Broadcast settings changed; restart to apply them");
        }

        let intercept = config.intercept;
        let count = intercept.patterns.len();
        self.catalog.replace(intercept.patterns.clone());
        let _ = self.update_tx.send(intercept);
        Ok(count)
    }

    /// Start watching the file in a background thread.
    /// Dropping the returned watcher stops it.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let path = self.path.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if event.kind.is_modify() || event.kind.is_create() => {
                    tracing::debug!(path = ?self.path, "Config file change detected");
                    match self.reload() {
                        Ok(count) => tracing::info!(patterns = count, "Request patterns reloaded"),
                        Err(e) => tracing::error!(
                            error = %e,
                            "Failed to reload config. Keeping current patterns."
                        ),
                    }
                }
                Ok(_) => {}
                Err(e) => tracing::error!(error = ?e, "Watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?path, "Config watcher started");
        Ok(watcher)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const UPLOAD: &str = r#"
[[intercept.patterns]]
name = "Upload"
url_pattern = "*/upload/*"
method = "PUT"
"#;

    fn temp_config(content: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("crosswire-watch-{}.toml", uuid::Uuid::new_v4()));
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_reload_swaps_patterns() {
        let path = temp_config("");
        let catalog = Arc::new(PatternCatalog::default());
        let (watcher, mut updates) = ConfigWatcher::new(&path, catalog.clone(), BroadcastConfig::default());

        assert_eq!(watcher.reload().unwrap(), 5);
        assert!(catalog.get("Generate").is_some());

        fs::write(&path, UPLOAD).unwrap();
        assert_eq!(watcher.reload().unwrap(), 1);
        assert!(catalog.get("Generate").is_none());
        assert!(catalog.match_request("https://h/upload/avatar", "put").is_some());

        assert_eq!(updates.try_recv().unwrap().patterns.len(), 5);
        assert_eq!(updates.try_recv().unwrap().patterns[0].name(), "Upload");
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_invalid_reload_keeps_patterns() {
        let path = temp_config(UPLOAD);
        let catalog = Arc::new(PatternCatalog::default());
        let (watcher, mut updates) = ConfigWatcher::new(&path, catalog.clone(), BroadcastConfig::default());
        watcher.reload().unwrap();

        fs::write(&path, "[broadcast]\nping_delay_max_ms = 0\n").unwrap();
        assert!(matches!(watcher.reload(), Err(ConfigError::Validation(_))));
        assert!(catalog.get("Upload").is_some());

        assert!(updates.try_recv().is_ok());
        assert!(updates.try_recv().is_err());
        fs::remove_file(&path).unwrap();
    }

    #[tokio::test]
    async fn test_file_change_is_picked_up() {
        let path = temp_config("");
        let catalog = Arc::new(PatternCatalog::default());
        let (watcher, mut updates) = ConfigWatcher::new(&path, catalog.clone(), BroadcastConfig::default());
        let _watcher = watcher.run().unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;
        fs::write(&path, UPLOAD).unwrap();

        let reloaded = tokio::time::timeout(Duration::from_secs(10), async {
            while let Some(intercept) = updates.recv().await {
                if intercept.patterns.iter().any(|p| p.name() == "Upload") {
                    return intercept;
                }
            }
            panic!("watcher stopped");
        })
        .await
        .unwrap();

        assert_eq!(reloaded.patterns.len(), 1);
        assert!(catalog.get("Upload").is_some());
        fs::remove_file(&path).unwrap();
    }
}
