use indexmap::IndexMap;
use serde::Serialize;

use crate::model::task::Task;

/// In-memory set of parsed tasks, keyed by workspace-relative file path.
/// Task order within a file is line order; file order is discovery order.
/// Owned by the scan cycle: a completed scan replaces the whole map, and a
/// successful rewrite patches exactly one task.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Repository {
    files: IndexMap<String, Vec<Task>>,
}

impl Repository {
    pub fn new() -> Repository {
        Repository::default()
    }

    /// Replace the entire contents with a fresh scan result. Files with no
    /// tasks must already be omitted by the scanner.
    pub fn replace(&mut self, files: IndexMap<String, Vec<Task>>) {
        self.files = files;
    }

    pub fn files(&self) -> impl Iterator<Item = (&str, &[Task])> {
        self.files.iter().map(|(f, t)| (f.as_str(), t.as_slice()))
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn all_tasks(&self) -> impl Iterator<Item = &Task> {
        self.files.values().flatten()
    }

    pub fn total(&self) -> usize {
        self.files.values().map(Vec::len).sum()
    }

    /// Look up a task by its (file, line) identity.
    pub fn task_at(&self, file: &str, line: usize) -> Option<&Task> {
        self.files.get(file)?.iter().find(|t| t.line == line)
    }

    /// Patch a single task in place after a successful rewrite. Returns
    /// false if the task is no longer present (a re-scan has superseded it).
    pub fn patch<F: FnOnce(&mut Task)>(&mut self, file: &str, line: usize, f: F) -> bool {
        let Some(tasks) = self.files.get_mut(file) else {
            return false;
        };
        match tasks.iter_mut().find(|t| t.line == line) {
            Some(task) => {
                f(task);
                true
            }
            None => false,
        }
    }
}
