use std::fs;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::io::fsutil::atomic_write;
use crate::model::rules::Rules;

/// Directory holding workspace configuration, relative to the root.
pub const CONFIG_DIR: &str = ".gatehouse";
/// Rules file name inside [`CONFIG_DIR`].
pub const RULES_FILE: &str = "rules.toml";

#[derive(Debug, thiserror::Error)]
pub enum RulesError {
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
    #[error("could not parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml_edit::TomlError,
    },
    #[error("unknown rules key: {0}")]
    UnknownKey(String),
}

pub fn rules_path(root: &Path) -> PathBuf {
    root.join(CONFIG_DIR).join(RULES_FILE)
}

/// Find the workspace root by walking up from `start` looking for a
/// `.gatehouse/rules.toml`. Falls back to `start` itself so the tool works
/// in an unconfigured tree with built-in defaults.
pub fn discover_root(start: &Path) -> PathBuf {
    let mut current = start.to_path_buf();
    loop {
        if rules_path(&current).exists() {
            return current;
        }
        if !current.pop() {
            return start.to_path_buf();
        }
    }
}

/// Load the rules file, merging field-by-field over built-in defaults (the
/// serde defaults on `Rules` do the merging). A missing file is the
/// defaults; a malformed file logs a warning and also falls back to the
/// defaults rather than blocking the session.
pub fn load_rules(root: &Path) -> Rules {
    let path = rules_path(root);
    let text = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(_) => return Rules::default(),
    };
    match toml::from_str(&text) {
        Ok(rules) => rules,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "malformed rules file, using defaults");
            Rules::default()
        }
    }
}

/// Read the rules file as an editable document for format-preserving
/// updates. A missing file starts from the default template.
pub fn read_rules_doc(root: &Path) -> Result<toml_edit::DocumentMut, RulesError> {
    let path = rules_path(root);
    let text = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(_) => DEFAULT_RULES.to_string(),
    };
    text.parse()
        .map_err(|source| RulesError::Parse { path, source })
}

/// Write the rules document back, preserving user formatting and comments.
pub fn write_rules_doc(root: &Path, doc: &toml_edit::DocumentMut) -> Result<(), RulesError> {
    let path = rules_path(root);
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).map_err(|source| RulesError::Write {
            path: path.clone(),
            source,
        })?;
    }
    atomic_write(&path, doc.to_string().as_bytes()).map_err(|source| RulesError::Write {
        path,
        source,
    })
}

/// Settable keys for `gate rules set`. Values are parsed as bool, integer,
/// then string, in that order.
const SETTABLE_KEYS: &[&str] = &[
    "project.require_docs_for_done",
    "project.require_tests_for_done",
    "quality.required",
    "quality.command",
    "quality.timeout_secs",
];

/// Set one dotted-path rule in the document.
pub fn set_rule(doc: &mut toml_edit::DocumentMut, key: &str, value: &str) -> Result<(), RulesError> {
    if !SETTABLE_KEYS.contains(&key) {
        return Err(RulesError::UnknownKey(key.to_string()));
    }
    let (table_name, field) = key.split_once('.').expect("settable keys are dotted");

    if !doc.contains_key(table_name) {
        doc[table_name] = toml_edit::Item::Table(toml_edit::Table::new());
    }
    doc[table_name][field] = parse_value(value);
    Ok(())
}

fn parse_value(value: &str) -> toml_edit::Item {
    if let Ok(b) = value.parse::<bool>() {
        toml_edit::value(b)
    } else if let Ok(n) = value.parse::<i64>() {
        toml_edit::value(n)
    } else {
        toml_edit::value(value)
    }
}

/// The commented template written by `gate init`.
pub const DEFAULT_RULES: &str = r#"# gatehouse workspace rules
# Partial files are fine: anything left out keeps its built-in default.

[project]
# Artifacts required before a task may enter a gated tag.
require_docs_for_done = true
require_tests_for_done = true

[quality]
# External quality check. Point `command` at a script that exits 0 on pass;
# its stdout becomes the explanation shown in gate reports.
required = false
# command = "./scripts/quality-check.sh"
timeout_secs = 30

# Replace the built-in vocabulary by listing tags here
# (listed order = match priority = promotion order):
#
# [[schema.tags]]
# name = "PROTOTYPE"
# label = "Prototype"
#
# [[schema.tags]]
# name = "INTEGRATION_CANDIDATE"
# label = "Integration candidate"
#
# [[schema.tags]]
# name = "PRODUCTION"
# label = "Production"
# done = true
# gated = true
"#;
