use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::{Duration, Instant};

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

/// Events sent from the file watcher to the rescan loop.
#[derive(Debug)]
pub enum FileEvent {
    /// One or more watched markdown files changed on disk.
    Changed(Vec<PathBuf>),
}

/// Coalesces bursts of change notifications into a single scan trigger: one
/// pending deadline that every new trigger pushes out, firing only once the
/// window elapses quietly. Pure values in and out, so the discipline is
/// testable without timers.
#[derive(Debug)]
pub struct Debouncer {
    window: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Debouncer {
        Debouncer {
            window,
            deadline: None,
        }
    }

    /// Record a trigger at `now`, resetting any pending deadline.
    pub fn trigger(&mut self, now: Instant) {
        self.deadline = Some(now + self.window);
    }

    /// True once the quiet window has elapsed. Firing clears the pending
    /// deadline; subsequent calls return false until the next trigger.
    pub fn due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    pub fn pending(&self) -> bool {
        self.deadline.is_some()
    }
}

/// Watches a workspace tree for markdown changes. Events arrive on a
/// channel and are polled from the main thread, so all repository mutation
/// stays on one logical thread.
pub struct WorkspaceWatcher {
    _watcher: RecommendedWatcher,
    rx: mpsc::Receiver<FileEvent>,
}

impl WorkspaceWatcher {
    /// Start watching `root` recursively. Only create/modify/remove events
    /// on markdown files outside hidden and dependency-cache directories
    /// are forwarded.
    pub fn start(root: &Path) -> Result<WorkspaceWatcher, notify::Error> {
        let (tx, rx) = mpsc::channel();
        let root_owned = root.to_path_buf();

        let mut watcher = RecommendedWatcher::new(
            move |result: Result<Event, notify::Error>| {
                let event = match result {
                    Ok(e) => e,
                    Err(_) => return,
                };

                match event.kind {
                    EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_) => {}
                    _ => return,
                }

                let relevant: Vec<PathBuf> = event
                    .paths
                    .into_iter()
                    .filter(|p| is_watched(p, &root_owned))
                    .collect();

                if !relevant.is_empty() {
                    let _ = tx.send(FileEvent::Changed(relevant));
                }
            },
            Config::default(),
        )?;

        watcher.watch(root, RecursiveMode::Recursive)?;
        Ok(WorkspaceWatcher {
            _watcher: watcher,
            rx,
        })
    }

    /// Non-blocking poll for pending file events.
    pub fn poll(&self) -> Vec<FileEvent> {
        let mut events = Vec::new();
        while let Ok(evt) = self.rx.try_recv() {
            events.push(evt);
        }
        events
    }
}

/// Same eligibility rules as the scanner: markdown extension, not under a
/// hidden or dependency-cache directory.
fn is_watched(path: &Path, root: &Path) -> bool {
    let Ok(rel) = path.strip_prefix(root) else {
        return false;
    };
    if !matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("md") | Some("markdown")
    ) {
        return false;
    }
    !rel.components().any(|c| {
        let name = c.as_os_str().to_string_lossy();
        name.starts_with('.') || name == "node_modules" || name == "target"
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_debouncer_fires_after_quiet_window() {
        let mut d = Debouncer::new(ms(1000));
        let t0 = Instant::now();
        assert!(!d.due(t0));

        d.trigger(t0);
        assert!(d.pending());
        assert!(!d.due(t0 + ms(999)));
        assert!(d.due(t0 + ms(1000)));
        // Fired once; nothing pending anymore
        assert!(!d.pending());
        assert!(!d.due(t0 + ms(2000)));
    }

    #[test]
    fn test_debouncer_resets_on_every_trigger() {
        let mut d = Debouncer::new(ms(1000));
        let t0 = Instant::now();

        // A rapid burst keeps pushing the deadline out
        d.trigger(t0);
        d.trigger(t0 + ms(500));
        d.trigger(t0 + ms(900));
        assert!(!d.due(t0 + ms(1500)));
        assert!(d.due(t0 + ms(1900)));
    }

    #[test]
    fn test_debouncer_coalesces_to_one_firing() {
        let mut d = Debouncer::new(ms(100));
        let t0 = Instant::now();
        for i in 0..10u64 {
            d.trigger(t0 + ms(i * 10));
        }
        let mut firings = 0;
        for i in 0..50u64 {
            if d.due(t0 + ms(i * 10)) {
                firings += 1;
            }
        }
        assert_eq!(firings, 1);
    }

    #[test]
    fn test_is_watched_filters() {
        let root = Path::new("/ws");
        assert!(is_watched(Path::new("/ws/plan.md"), root));
        assert!(is_watched(Path::new("/ws/docs/notes.markdown"), root));
        assert!(!is_watched(Path::new("/ws/src/main.rs"), root));
        assert!(!is_watched(Path::new("/ws/.git/index.md"), root));
        assert!(!is_watched(Path::new("/ws/node_modules/a/b.md"), root));
        assert!(!is_watched(Path::new("/ws/target/doc/x.md"), root));
        assert!(!is_watched(Path::new("/elsewhere/plan.md"), root));
    }
}
