//! Ban-list file watcher for hot reload.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};

use crate::security::ban_list::{read_ban_file, BanList, BanListError};

/// Monitors a ban-list file and reloads it into a shared [`BanList`].
pub struct BanListWatcher {
    path: PathBuf,
    ban_list: Arc<BanList>,
}

impl BanListWatcher {
    pub fn new(path: &Path, ban_list: Arc<BanList>) -> Self {
        Self {
            path: path.to_path_buf(),
            ban_list,
        }
    }

    /// Re-read the file now. On error the current entries are kept.
    pub fn reload(&self) -> Result<usize, BanListError> {
        reload_into(&self.path, &self.ban_list)
    }

    /// Start watching the file in a background thread.
    ///
    /// The returned watcher must be kept alive for as long as reloads are wanted.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let path = self.path.clone();
        let ban_list = Arc::clone(&self.ban_list);

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() {
                        match reload_into(&path, &ban_list) {
                            Ok(count) => {
                                tracing::info!(path = ?path, entries = count, "Ban list reloaded");
                            }
                            Err(e) => {
                                tracing::error!(
                                    path = ?path,
                                    error = %e,
                                    "Failed to reload ban list. Keeping current entries."
                                );
                            }
                        }
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, "Ban list watcher started");
        Ok(watcher)
    }
}

fn reload_into(path: &Path, ban_list: &BanList) -> Result<usize, BanListError> {
    let addrs = read_ban_file(path)?;
    let count = addrs.len();
    ban_list.replace(addrs);
    Ok(count)
}
