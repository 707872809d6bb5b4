use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::io::fsutil::atomic_write;
use crate::model::schema::Schema;
use crate::model::task::Classification;
use crate::parse::{LineBuffer, split_prefix};

/// Error from a single-line rewrite. A failed rewrite leaves the file and
/// the in-memory task untouched.
#[derive(Debug, thiserror::Error)]
pub enum RewriteError {
    #[error("could not read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("stale task location: {file} now has {actual} lines but the task points at line {}", .line + 1)]
    StaleLocation {
        file: String,
        line: usize,
        actual: usize,
    },
    #[error("line {} of {file} is no longer a task line", .line + 1)]
    MalformedLine { file: String, line: usize },
}

/// Rewrite one line's classification tag, preserving everything else.
///
/// The file is re-read fresh so a stale in-memory task can never corrupt a
/// file that changed shape in the meantime: the recorded line index is
/// bounds-checked against the current line count, and the checkbox prefix
/// is re-derived from the line's current content. Either check failing
/// aborts before any byte is written. On success exactly one line differs;
/// every other line, every terminator, and the presence or absence of a
/// final newline are byte-identical to what was read.
///
/// Returns the new text of the rewritten line.
pub fn rewrite_task_line(
    root: &Path,
    file: &str,
    line: usize,
    schema: &Schema,
    new: &Classification,
) -> Result<String, RewriteError> {
    let path = root.join(file);
    let content = fs::read_to_string(&path).map_err(|source| RewriteError::Read {
        path: path.clone(),
        source,
    })?;

    let mut buffer = LineBuffer::split(&content);
    let Some(current) = buffer.get(line) else {
        return Err(RewriteError::StaleLocation {
            file: file.to_string(),
            line,
            actual: buffer.len(),
        });
    };

    let new_line = compose_line(current, schema, new).ok_or_else(|| RewriteError::MalformedLine {
        file: file.to_string(),
        line,
    })?;

    if new_line != current {
        buffer.replace(line, new_line.clone());
        atomic_write(&path, buffer.join().as_bytes()).map_err(|source| RewriteError::Write {
            path: path.clone(),
            source,
        })?;
        debug!(file, line, tag = %new, "rewrote classification tag");
    }

    Ok(new_line)
}

/// Compose a task line with its classification replaced. Returns `None`
/// when the line (after tag stripping) no longer carries a checkbox prefix.
///
/// Stripping removes every active-schema tag on the line, not just the one
/// the parser would read — a line that accumulated multiple tags through
/// manual edits comes out carrying exactly the new one.
pub fn compose_line(line: &str, schema: &Schema, new: &Classification) -> Option<String> {
    let stripped = schema.strip_tags(line);
    let (prefix, text) = split_prefix(&stripped)?;
    let title = text.trim();

    let mut out = String::with_capacity(line.len() + 4);
    out.push_str(prefix);
    if let Classification::Tag(name) = new {
        out.push('[');
        out.push_str(name);
        out.push(']');
        if !title.is_empty() {
            out.push(' ');
        }
    }
    out.push_str(title);
    Some(out)
}
