use std::sync::OnceLock;

use regex::Regex;

use crate::model::schema::Schema;
use crate::model::task::{Classification, Status};

/// The persisted task-line grammar. This is the on-disk format and must
/// stay bit-compatible: optional leading whitespace, a dash, a bracketed
/// single status character, then the rest of the line as free text.
const TASK_LINE_GRAMMAR: &str = r"^\s*-\s*\[([xX ~!?])\]\s*(.*)$";

fn task_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(TASK_LINE_GRAMMAR).expect("task line grammar is valid"))
}

/// The structured reading of one task line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLine {
    pub status: Status,
    pub classification: Classification,
    pub title: String,
}

/// Classify one line of text. Returns `None` for anything that is not a
/// task line — malformed brackets, missing dash, prose — which is skipped,
/// not an error. On a match the result is total: every status character in
/// the alphabet maps to a status, and a line with no recognized tag is
/// unclassified.
pub fn classify_line(line: &str, schema: &Schema) -> Option<ParsedLine> {
    let caps = task_line_re().captures(line)?;
    let status_char = caps.get(1).expect("group 1 always present").as_str();
    let text = caps.get(2).expect("group 2 always present").as_str();

    let status = Status::from_checkbox_char(status_char.chars().next().unwrap_or(' '));

    let (classification, title) = match schema.first_match(text) {
        Some((tag, range)) => {
            let cleaned = remove_tag_token(text, range);
            (Classification::Tag(tag.name.clone()), clean_title(&cleaned))
        }
        None => (Classification::Unclassified, clean_title(text)),
    };

    Some(ParsedLine {
        status,
        classification,
        title,
    })
}

/// Split a task line into its checkbox prefix (through the whitespace after
/// `]`) and the free text that follows. Returns `None` when the line no
/// longer matches the task grammar. Used by the rewrite path to re-derive
/// the prefix from the line's current content rather than trusting a cache.
pub fn split_prefix(line: &str) -> Option<(&str, &str)> {
    let caps = task_line_re().captures(line)?;
    let text_start = caps.get(2).expect("group 2 always present").start();
    Some((&line[..text_start], &line[text_start..]))
}

/// Remove the matched tag token and the whitespace trailing it.
fn remove_tag_token(text: &str, range: std::ops::Range<usize>) -> String {
    let after = text[range.end..].trim_start();
    let mut out = String::with_capacity(text.len());
    out.push_str(&text[..range.start]);
    out.push_str(after);
    out
}

/// Title cleanup: the text before the first `|` (a convention for trailing
/// metadata after the title), trimmed.
fn clean_title(text: &str) -> String {
    let before_pipe = match text.find('|') {
        Some(idx) => &text[..idx],
        None => text,
    };
    before_pipe.trim().to_string()
}
