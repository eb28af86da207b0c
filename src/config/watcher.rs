//! Hot reload of the configuration file.
//!
//! `notify` reports every write, and editors often write a file several
//! times per save. The watcher only forwards a reload when the file's
//! contents actually changed and passed validation; an invalid edit is
//! logged and the running configuration stays in place.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use sha2::{Digest, Sha256};
use tokio::sync::{broadcast, mpsc};

use crate::config::loader::parse_config;
use crate::config::schema::GuardConfig;
use crate::state::GuardState;

/// Watches one configuration file and emits validated updates.
pub struct ConfigWatcher {
    path: PathBuf,
    last_digest: Arc<Mutex<Option<[u8; 32]>>>,
    update_tx: mpsc::UnboundedSender<GuardConfig>,
}

impl ConfigWatcher {
    /// Returns the watcher and the receiving end of its updates.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<GuardConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        let initial = std::fs::read(path).ok().map(|bytes| Sha256::digest(&bytes).into());
        (
            Self {
                path: path.to_path_buf(),
                last_digest: Arc::new(Mutex::new(initial)),
                update_tx,
            },
            update_rx,
        )
    }

    /// Re-read the file and forward it if it changed and is valid.
    /// Returns whether an update was sent.
    pub fn reload(&self) -> bool {
        reload(&self.path, &self.last_digest, &self.update_tx)
    }

    /// Start watching. The returned handle must be kept alive.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let path = self.path.clone();
        let digest = self.last_digest.clone();
        let tx = self.update_tx.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if event.kind.is_modify() || event.kind.is_create() => {
                    reload(&path, &digest, &tx);
                }
                Ok(_) => {}
                Err(e) => tracing::error!(error = ?e, "Config watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;
        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, "Config watcher started");
        Ok(watcher)
    }
}

fn reload(
    path: &Path,
    last_digest: &Mutex<Option<[u8; 32]>>,
    tx: &mpsc::UnboundedSender<GuardConfig>,
) -> bool {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            tracing::warn!(path = ?path, error = %e, "Config file unreadable, keeping current configuration");
            return false;
        }
    };

    let digest: [u8; 32] = Sha256::digest(content.as_bytes()).into();
    {
        let mut last = match last_digest.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if *last == Some(digest) {
            return false;
        }
        *last = Some(digest);
    }

    match parse_config(&content) {
        Ok(config) => {
            tracing::info!(path = ?path, "Config file changed, reloading");
            tx.send(config).is_ok()
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to reload config, keeping current configuration");
            false
        }
    }
}

/// Apply updates to `state` until shutdown or until the watcher goes away.
pub async fn apply_updates(
    state: Arc<GuardState>,
    mut updates: mpsc::UnboundedReceiver<GuardConfig>,
    mut shutdown: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            update = updates.recv() => match update {
                Some(config) => state.apply_config(config),
                None => break,
            },
            _ = shutdown.recv() => break,
        }
    }
}
