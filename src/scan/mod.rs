use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, warn};

use crate::model::repository::Repository;
use crate::model::schema::Schema;
use crate::model::task::Task;
use crate::parse::{LineBuffer, classify_line};

/// Directory names never descended into, beyond dot-directories.
const PRUNED_DIRS: &[&str] = &["node_modules", "target"];

/// What a scan did, alongside the repository it produced. Skipped files are
/// counted, never fatal: a scan always completes with partial results.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanSummary {
    pub files_scanned: usize,
    pub files_skipped: usize,
    pub tasks: usize,
}

/// Scan a workspace tree into a fresh repository. Two scans of an unchanged
/// tree produce identical results: directory entries are visited in sorted
/// order and files contribute tasks in line order.
pub fn scan_workspace(root: &Path, schema: &Schema) -> (Repository, ScanSummary) {
    let mut files = IndexMap::new();
    let mut summary = ScanSummary::default();

    for path in markdown_files(root) {
        let rel = match path.strip_prefix(root) {
            Ok(rel) => rel.to_string_lossy().into_owned(),
            Err(_) => continue,
        };
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                warn!(file = %rel, error = %e, "skipping unreadable file");
                summary.files_skipped += 1;
                continue;
            }
        };
        summary.files_scanned += 1;

        let tasks = parse_file(&rel, &content, schema);
        if !tasks.is_empty() {
            summary.tasks += tasks.len();
            files.insert(rel, tasks);
        }
    }

    debug!(
        files = summary.files_scanned,
        skipped = summary.files_skipped,
        tasks = summary.tasks,
        "scan complete"
    );

    let mut repo = Repository::new();
    repo.replace(files);
    (repo, summary)
}

/// Parse one file's text into tasks. Lines that don't match the checklist
/// grammar are skipped silently.
pub fn parse_file(rel_path: &str, content: &str, schema: &Schema) -> Vec<Task> {
    let buffer = LineBuffer::split(content);
    let mut tasks = Vec::new();
    for (idx, line) in buffer.iter().enumerate() {
        if let Some(parsed) = classify_line(line, schema) {
            tasks.push(Task {
                file: rel_path.to_string(),
                line: idx,
                raw: line.to_string(),
                status: parsed.status,
                classification: parsed.classification,
                title: parsed.title,
            });
        }
    }
    tasks
}

/// All candidate markdown files under `root`, in deterministic order.
pub fn markdown_files(root: &Path) -> Vec<PathBuf> {
    let mut out = Vec::new();
    walk(root, &mut |path| {
        if is_markdown(path) {
            out.push(path.to_path_buf());
        }
    });
    out
}

/// All regular files under `root` (any extension), in deterministic order.
/// Used by gate checks that look for documentation and test artifacts.
pub fn all_files(root: &Path) -> Vec<PathBuf> {
    let mut out = Vec::new();
    walk(root, &mut |path| out.push(path.to_path_buf()));
    out
}

fn is_markdown(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("md") | Some("markdown")
    )
}

/// Depth-first walk with pruning. Unreadable directories are skipped
/// silently, like unreadable files.
fn walk(dir: &Path, visit: &mut dyn FnMut(&Path)) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(_) => return,
    };

    let mut paths: Vec<PathBuf> = entries.filter_map(|e| e.ok().map(|e| e.path())).collect();
    paths.sort();

    for path in paths {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if path.is_dir() {
            if name.starts_with('.') || PRUNED_DIRS.contains(&name) {
                continue;
            }
            walk(&path, visit);
        } else if path.is_file() {
            visit(&path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn sample_tree() -> TempDir {
        let tmp = TempDir::new().unwrap();
        write(
            tmp.path(),
            "plan.md",
            "# Plan\n\n- [ ] [PROTOTYPE] Build login form\n- [x] [PRODUCTION] Ship auth\nprose line\n- [?] Unsure about this\n",
        );
        write(tmp.path(), "docs/notes.md", "- [!] [INTEGRATION_CANDIDATE] Wire the cache\n");
        write(tmp.path(), "docs/empty.md", "no tasks here\n");
        write(tmp.path(), "code.rs", "- [ ] not scanned, wrong extension\n");
        write(tmp.path(), ".hidden/secret.md", "- [ ] hidden task\n");
        write(tmp.path(), "node_modules/dep/readme.md", "- [ ] vendored task\n");
        write(tmp.path(), "target/build/out.md", "- [ ] build artifact task\n");
        tmp
    }

    #[test]
    fn test_scan_finds_tasks_and_omits_empty_files() {
        let tmp = sample_tree();
        let schema = Schema::builtin();
        let (repo, summary) = scan_workspace(tmp.path(), &schema);

        assert_eq!(repo.total(), 4);
        assert_eq!(repo.file_count(), 2); // empty.md omitted
        assert_eq!(summary.files_scanned, 3); // plan, notes, empty
        assert_eq!(summary.files_skipped, 0);
        assert_eq!(summary.tasks, 4);
    }

    #[test]
    fn test_scan_prunes_hidden_and_cache_dirs() {
        let tmp = sample_tree();
        let schema = Schema::builtin();
        let (repo, _) = scan_workspace(tmp.path(), &schema);
        for (file, _) in repo.files() {
            assert!(!file.contains("hidden"));
            assert!(!file.contains("node_modules"));
            assert!(!file.contains("target"));
        }
    }

    #[test]
    fn test_scan_is_deterministic() {
        let tmp = sample_tree();
        let schema = Schema::builtin();
        let (first, _) = scan_workspace(tmp.path(), &schema);
        let (second, _) = scan_workspace(tmp.path(), &schema);
        assert_eq!(first, second);
    }

    #[test]
    fn test_line_indices_are_zero_based() {
        let tmp = sample_tree();
        let schema = Schema::builtin();
        let (repo, _) = scan_workspace(tmp.path(), &schema);
        let task = repo.task_at("plan.md", 2).unwrap();
        assert_eq!(task.title, "Build login form");
    }

    #[test]
    fn test_crlf_files_parse() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "win.md", "- [ ] One\r\n- [x] Two\r\n");
        let schema = Schema::builtin();
        let (repo, _) = scan_workspace(tmp.path(), &schema);
        assert_eq!(repo.total(), 2);
        // raw text carries no terminator
        assert_eq!(repo.task_at("win.md", 0).unwrap().raw, "- [ ] One");
    }

    #[test]
    fn test_unreadable_file_is_counted_not_fatal() {
        let tmp = sample_tree();
        // Not valid UTF-8, so the read fails
        fs::write(tmp.path().join("bad.md"), [0xFF, 0xFE, 0xFD]).unwrap();

        let schema = Schema::builtin();
        let (repo, summary) = scan_workspace(tmp.path(), &schema);
        assert_eq!(summary.files_skipped, 1);
        assert_eq!(repo.total(), 4); // partial results still produced
    }
}
