use std::fmt;

use serde::{Deserialize, Serialize};

/// Checkbox status of a task line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Unchecked,
    Checked,
    Cancelled,
    Important,
    Question,
}

impl Status {
    /// The character used inside the checkbox `[ ]`
    pub fn checkbox_char(self) -> char {
        match self {
            Status::Unchecked => ' ',
            Status::Checked => 'x',
            Status::Cancelled => '~',
            Status::Important => '!',
            Status::Question => '?',
        }
    }

    /// Map a checkbox character to a status. Total: anything outside the
    /// status alphabet falls back to `Unchecked`.
    pub fn from_checkbox_char(c: char) -> Status {
        match c.to_ascii_lowercase() {
            'x' => Status::Checked,
            '~' => Status::Cancelled,
            '!' => Status::Important,
            '?' => Status::Question,
            _ => Status::Unchecked,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Unchecked => "unchecked",
            Status::Checked => "checked",
            Status::Cancelled => "cancelled",
            Status::Important => "important",
            Status::Question => "question",
        }
    }

    /// Parse a status name as used on the CLI (`--status checked`).
    pub fn parse_name(s: &str) -> Option<Status> {
        match s {
            "unchecked" => Some(Status::Unchecked),
            "checked" => Some(Status::Checked),
            "cancelled" => Some(Status::Cancelled),
            "important" => Some(Status::Important),
            "question" => Some(Status::Question),
            _ => None,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle classification of a task. The tag vocabulary is owned by the
/// active schema; a task whose line carries no recognized tag is
/// `Unclassified`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Unclassified,
    /// Canonical tag name from the active schema (e.g. `PROTOTYPE`)
    Tag(String),
}

impl Classification {
    pub const UNCLASSIFIED_NAME: &'static str = "UNCLASSIFIED";

    /// Display name: the tag, or `UNCLASSIFIED`.
    pub fn name(&self) -> &str {
        match self {
            Classification::Unclassified => Self::UNCLASSIFIED_NAME,
            Classification::Tag(name) => name,
        }
    }

    pub fn is_unclassified(&self) -> bool {
        matches!(self, Classification::Unclassified)
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for Classification {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for Classification {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        if s == Self::UNCLASSIFIED_NAME {
            Ok(Classification::Unclassified)
        } else {
            Ok(Classification::Tag(s))
        }
    }
}

/// One parsed checklist line. Identity is (file, line) within a scan
/// snapshot; both are recomputed on every scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Path relative to the workspace root
    pub file: String,
    /// Zero-based line index at the time of the last scan. Must be
    /// re-validated against the file before any rewrite.
    pub line: usize,
    /// The full original line, kept for display and debugging only
    pub raw: String,
    pub status: Status,
    pub classification: Classification,
    /// Free text with the checkbox marker and classification tag stripped
    pub title: String,
}

impl Task {
    /// Stable key within a scan snapshot.
    pub fn key(&self) -> (&str, usize) {
        (&self.file, self.line)
    }
}
