//! Development loop: build, preview with live reload, rebuild on change

use anyhow::Result;
use notify::{RecursiveMode, Watcher};
use notify_debouncer_mini::{new_debouncer, DebounceEventResult};
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::server::{self, LiveReload, PreviewServer};
use crate::{BuildMode, Site};

const DEBOUNCE: Duration = Duration::from_millis(300);

#[derive(Debug, Default)]
struct SchedulerState {
    building: bool,
    queued: bool,
}

/// Busy/pending rule for full rebuilds
///
/// At most one build runs at a time and at most one more is remembered
/// while it runs.
#[derive(Debug, Default)]
pub struct RebuildScheduler {
    state: Mutex<SchedulerState>,
}

impl RebuildScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a change; `true` means the caller must start a build now
    pub fn request(&self) -> bool {
        let mut state = self.lock();
        if state.building {
            state.queued = true;
            false
        } else {
            state.building = true;
            true
        }
    }

    /// Mark the running build as done; `true` means one more build must run
    pub fn finish(&self) -> bool {
        let mut state = self.lock();
        if state.queued {
            state.queued = false;
            true
        } else {
            state.building = false;
            false
        }
    }

    pub fn is_building(&self) -> bool {
        self.lock().building
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SchedulerState> {
        // Poisoning is ignored; the flags are always consistent
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

struct DevContext {
    base_dir: PathBuf,
    scheduler: RebuildScheduler,
    live_reload: LiveReload,
}

/// Run the dev loop until Ctrl-C
///
/// `site` carries the resolved preview host and port. Every rebuild reloads
/// `site.yml` and the environment from `site.base_dir`.
pub async fn run(site: Site) -> Result<()> {
    let site = Site {
        mode: BuildMode::Development,
        ..site
    };
    site.build()?;

    let host = site.config.preview.host.clone();
    let port = site.config.preview.port;
    let listener = server::bind(&host, port).await?;

    let preview = PreviewServer::new(&site, true);
    let context = Arc::new(DevContext {
        base_dir: site.base_dir.clone(),
        scheduler: RebuildScheduler::new(),
        live_reload: preview.live_reload(),
    });

    let (tx, rx) = mpsc::unbounded_channel();
    let mut debouncer = new_debouncer(DEBOUNCE, move |result: DebounceEventResult| {
        let _ = tx.send(result);
    })?;

    let mut watched = Vec::new();
    for (path, mode) in [
        (&site.content_dir, RecursiveMode::Recursive),
        (&site.public_dir, RecursiveMode::Recursive),
        (&site.config_path(), RecursiveMode::NonRecursive),
    ] {
        if path.exists() {
            debouncer.watcher().watch(path, mode)?;
            watched.push(display_path(&site.base_dir, path));
        } else {
            tracing::debug!("[watch] not watching missing {:?}", path);
        }
    }
    tracing::info!("[watch] watching {}", watched.join(", "));

    let base = site.config.normalized_base_path();
    tracing::info!(
        "Preview server running: http://{}:{}{}",
        host,
        port,
        if base.is_empty() { "/" } else { base.as_str() }
    );

    let watch_task = tokio::spawn(watch_loop(context, rx));
    let served = preview.serve(listener, server::shutdown_signal()).await;

    watch_task.abort();
    drop(debouncer);
    served
}

async fn watch_loop(context: Arc<DevContext>, mut rx: mpsc::UnboundedReceiver<DebounceEventResult>) {
    while let Some(result) = rx.recv().await {
        match result {
            Ok(events) => {
                let changed: Vec<String> = events
                    .iter()
                    .filter(|e| is_relevant(&e.path))
                    .map(|e| display_path(&context.base_dir, &e.path))
                    .collect();
                if changed.is_empty() {
                    continue;
                }

                let reason = format!("changed: {}", changed.join(", "));
                if context.scheduler.request() {
                    tokio::spawn(rebuild(context.clone(), reason));
                } else {
                    tracing::debug!("[watch] build running, queued {}", reason);
                }
            }
            Err(e) => tracing::error!("[watch] watch error: {:?}", e),
        }
    }
}

/// Run builds until the scheduler has nothing queued
async fn rebuild(context: Arc<DevContext>, mut reason: String) {
    loop {
        tracing::info!("[watch] rebuild triggered: {}", reason);

        let base_dir = context.base_dir.clone();
        let result = tokio::task::spawn_blocking(move || {
            Site::new(&base_dir, BuildMode::Development)?.build()
        })
        .await;

        match result {
            Ok(Ok(report)) => {
                context.live_reload.trigger();
                tracing::info!("[watch] rebuild complete: {} posts", report.posts);
            }
            Ok(Err(e)) => tracing::error!("[watch] rebuild failed: {:#}", e),
            Err(e) => tracing::error!("[watch] rebuild task failed: {}", e),
        }

        if !context.scheduler.finish() {
            break;
        }
        reason = "queued changes".to_string();
    }
}

/// Skip VCS internals, editor backups and Finder metadata
fn is_relevant(path: &Path) -> bool {
    let in_git = path
        .components()
        .any(|c| matches!(c, Component::Normal(name) if name == ".git"));
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    !in_git && !name.ends_with('~') && name != ".DS_Store"
}

fn display_path(base_dir: &Path, path: &Path) -> String {
    path.strip_prefix(base_dir)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::Signal;
    use crate::CONFIG_FILE;
    use std::fs;
    use tokio::sync::broadcast::Receiver;

    fn dev_site() -> (tempfile::TempDir, Arc<DevContext>) {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join(CONFIG_FILE), "title: Dev Blog\n").unwrap();
        fs::create_dir_all(root.join("content/posts")).unwrap();
        fs::write(
            root.join("content/posts/first.md"),
            "---\ntitle: First\ndate: 2024-01-15\n---\nBody\n",
        )
        .unwrap();

        let live_reload = PreviewServer::with_options(root.join("dist"), "", true).live_reload();
        let context = Arc::new(DevContext {
            base_dir: root.to_path_buf(),
            scheduler: RebuildScheduler::new(),
            live_reload,
        });
        (dir, context)
    }

    fn reloads(rx: &mut Receiver<Signal>) -> usize {
        let mut count = 0;
        while let Ok(signal) = rx.try_recv() {
            assert!(matches!(signal, Signal::Reload(_)));
            count += 1;
        }
        count
    }

    #[tokio::test]
    async fn test_rebuild_fires_live_reload() {
        let (dir, context) = dev_site();
        let mut rx = context.live_reload.subscribe();

        assert!(context.scheduler.request());
        rebuild(context.clone(), "changed: content/posts/first.md".to_string()).await;

        assert_eq!(reloads(&mut rx), 1);
        assert!(!context.scheduler.is_building());
        assert!(dir.path().join("dist/posts/first/index.html").is_file());
    }

    #[tokio::test]
    async fn test_queued_change_runs_one_more_build() {
        let (_dir, context) = dev_site();
        let mut rx = context.live_reload.subscribe();

        assert!(context.scheduler.request());
        assert!(!context.scheduler.request());
        assert!(!context.scheduler.request());
        rebuild(context.clone(), "changed: site.yml".to_string()).await;

        assert_eq!(reloads(&mut rx), 2);
        assert!(!context.scheduler.is_building());
    }

    #[tokio::test]
    async fn test_failed_rebuild_keeps_the_loop_alive() {
        let (dir, context) = dev_site();
        let mut rx = context.live_reload.subscribe();
        fs::write(dir.path().join(CONFIG_FILE), "title: [unclosed\n").unwrap();

        assert!(context.scheduler.request());
        rebuild(context.clone(), "changed: site.yml".to_string()).await;
        assert_eq!(reloads(&mut rx), 0);
        assert!(!context.scheduler.is_building());

        // Fixing the config makes the next change build again
        fs::write(dir.path().join(CONFIG_FILE), "title: Dev Blog\n").unwrap();
        assert!(context.scheduler.request());
        rebuild(context.clone(), "changed: site.yml".to_string()).await;
        assert_eq!(reloads(&mut rx), 1);
    }

    #[test]
    fn test_idle_request_starts_a_build() {
        let scheduler = RebuildScheduler::new();
        assert!(scheduler.request());
        assert!(scheduler.is_building());
        assert!(!scheduler.finish());
        assert!(!scheduler.is_building());
    }

    #[test]
    fn test_requests_while_building_queue_one_build() {
        let scheduler = RebuildScheduler::new();
        assert!(scheduler.request());

        // Any number of changes during a build collapse into one rerun
        assert!(!scheduler.request());
        assert!(!scheduler.request());
        assert!(!scheduler.request());

        assert!(scheduler.finish());
        assert!(scheduler.is_building());
        assert!(!scheduler.finish());
        assert!(!scheduler.is_building());

        assert!(scheduler.request());
    }

    #[test]
    fn test_is_relevant() {
        assert!(is_relevant(Path::new("/site/content/posts/a.md")));
        assert!(!is_relevant(Path::new("/site/content/.git/index")));
        assert!(!is_relevant(Path::new("/site/content/posts/a.md~")));
        assert!(!is_relevant(Path::new("/site/public/.DS_Store")));
        assert!(is_relevant(Path::new("/site/content/posts/.github-notes.md")));
    }

    #[test]
    fn test_display_path() {
        assert_eq!(
            display_path(Path::new("/site"), Path::new("/site/content/posts/a.md")),
            "content/posts/a.md"
        );
        assert_eq!(display_path(Path::new("/site"), Path::new("/x/y")), "/x/y");
    }
}
