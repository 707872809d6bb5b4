use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::model::task::Classification;

/// One entry in the classification vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagSpec {
    /// Canonical tag name as written between brackets (e.g. `PROTOTYPE`)
    pub name: String,
    /// Human-readable label for listings and reports
    pub label: String,
    /// Whether tasks carrying this tag count as fully done for debt
    #[serde(default)]
    pub done: bool,
    /// Whether promoting into this tag requires the readiness gate
    #[serde(default)]
    pub gated: bool,
}

/// The active classification vocabulary: an ordered, closed set of lifecycle
/// tags. The list order is both the match priority order and the promotion
/// chain. Loaded once at engine construction and immutable for the process
/// lifetime; changing the vocabulary requires a restart so a saved tag never
/// changes meaning mid-session.
#[derive(Debug, Clone)]
pub struct Schema {
    version: u32,
    tags: Vec<TagSpec>,
    /// Per-tag bracketed pattern, same order as `tags`
    patterns: Vec<Regex>,
    /// Matches any active tag (plus a literal UNCLASSIFIED) for the
    /// defensive strip-all pass on rewrite
    strip_all: Regex,
}

impl Schema {
    /// Build a schema from a versioned tag list. Fails on an empty list or
    /// duplicate tag names.
    pub fn new(version: u32, tags: Vec<TagSpec>) -> Result<Schema, SchemaError> {
        if tags.is_empty() {
            return Err(SchemaError::Empty);
        }
        for (i, tag) in tags.iter().enumerate() {
            if tags[..i]
                .iter()
                .any(|t| t.name.eq_ignore_ascii_case(&tag.name))
            {
                return Err(SchemaError::Duplicate(tag.name.clone()));
            }
        }

        let patterns = tags
            .iter()
            .map(|t| {
                Regex::new(&format!(r"(?i)\[{}\]", regex::escape(&t.name)))
                    .expect("escaped tag pattern is valid")
            })
            .collect();

        let alternation = tags
            .iter()
            .map(|t| regex::escape(&t.name))
            .chain(std::iter::once(Classification::UNCLASSIFIED_NAME.to_string()))
            .collect::<Vec<_>>()
            .join("|");
        let strip_all = Regex::new(&format!(r"(?i)\[(?:{})\]\s*", alternation))
            .expect("escaped alternation is valid");

        Ok(Schema {
            version,
            tags,
            patterns,
            strip_all,
        })
    }

    /// The built-in vocabulary (schema version 2).
    pub fn builtin() -> Schema {
        Schema::new(2, builtin_tags()).expect("built-in schema is valid")
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn tags(&self) -> &[TagSpec] {
        &self.tags
    }

    /// Look up a tag by name, case-insensitively.
    pub fn get(&self, name: &str) -> Option<&TagSpec> {
        self.tags.iter().find(|t| t.name.eq_ignore_ascii_case(name))
    }

    /// Resolve a user-supplied tag name to a classification.
    /// `unclassified` (any case) clears the tag.
    pub fn resolve(&self, name: &str) -> Option<Classification> {
        if name.eq_ignore_ascii_case(Classification::UNCLASSIFIED_NAME) {
            return Some(Classification::Unclassified);
        }
        self.get(name)
            .map(|t| Classification::Tag(t.name.clone()))
    }

    /// The successor of a tag in the promotion chain, or `None` if the tag
    /// is maximal or not in the vocabulary.
    pub fn next_after(&self, classification: &Classification) -> Option<&TagSpec> {
        let Classification::Tag(name) = classification else {
            return None;
        };
        let idx = self
            .tags
            .iter()
            .position(|t| t.name.eq_ignore_ascii_case(name))?;
        self.tags.get(idx + 1)
    }

    /// Find the classification of a line's free text: case-insensitive
    /// search for each bracketed tag in priority order; the first tag that
    /// matches wins, at its leftmost occurrence. Returns the tag and the
    /// matched byte range within `text`.
    pub fn first_match<'a>(&'a self, text: &str) -> Option<(&'a TagSpec, std::ops::Range<usize>)> {
        for (tag, pattern) in self.tags.iter().zip(&self.patterns) {
            if let Some(m) = pattern.find(text) {
                return Some((tag, m.range()));
            }
        }
        None
    }

    /// Remove every active-schema tag token (and any literal
    /// `[UNCLASSIFIED]`) from `text`, along with trailing whitespace. The
    /// strip is deliberately broader than the parse, which reads only the
    /// first match: a line that accumulated several tags through manual
    /// edits comes out clean.
    pub fn strip_tags(&self, text: &str) -> String {
        self.strip_all.replace_all(text, "").into_owned()
    }

    /// Tag names that count as fully done for debt purposes.
    pub fn done_tags(&self) -> impl Iterator<Item = &TagSpec> {
        self.tags.iter().filter(|t| t.done)
    }

    pub fn is_done(&self, classification: &Classification) -> bool {
        match classification {
            Classification::Unclassified => false,
            Classification::Tag(name) => self.get(name).is_some_and(|t| t.done),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("schema has no tags")]
    Empty,
    #[error("duplicate tag in schema: {0}")]
    Duplicate(String),
}

fn builtin_tags() -> Vec<TagSpec> {
    vec![
        TagSpec {
            name: "PROTOTYPE".into(),
            label: "Prototype".into(),
            done: false,
            gated: false,
        },
        TagSpec {
            name: "INTEGRATION_CANDIDATE".into(),
            label: "Integration candidate".into(),
            done: false,
            gated: false,
        },
        TagSpec {
            name: "PRODUCTION".into(),
            label: "Production".into(),
            done: true,
            gated: true,
        },
    ]
}
