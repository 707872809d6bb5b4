use serde::{Deserialize, Serialize};

use crate::model::schema::{Schema, SchemaError, TagSpec};

/// Workspace rules from `.gatehouse/rules.toml`. Every field defaults, so a
/// partial user file merges over the built-ins field by field and can never
/// disable something it doesn't mention.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Rules {
    #[serde(default)]
    pub schema: SchemaRules,
    #[serde(default)]
    pub project: ProjectRules,
    #[serde(default)]
    pub quality: QualityRules,
}

/// Optional vocabulary override. When `tags` is empty the built-in
/// vocabulary is used; otherwise the listed tags replace it wholesale, in
/// listed order (priority order = promotion chain).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaRules {
    #[serde(default = "default_schema_version")]
    pub version: u32,
    #[serde(default)]
    pub tags: Vec<TagSpec>,
}

impl Default for SchemaRules {
    fn default() -> Self {
        SchemaRules {
            version: default_schema_version(),
            tags: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectRules {
    /// Require a matching documentation file before a task may enter a
    /// gated tag
    #[serde(default = "default_true")]
    pub require_docs_for_done: bool,
    /// Require a matching test file before a task may enter a gated tag
    #[serde(default = "default_true")]
    pub require_tests_for_done: bool,
}

impl Default for ProjectRules {
    fn default() -> Self {
        ProjectRules {
            require_docs_for_done: true,
            require_tests_for_done: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityRules {
    /// Whether the external quality check participates in the gate
    #[serde(default)]
    pub required: bool,
    /// Command run for the quality check (exit 0 = pass, stdout is the
    /// explanation). Absent while `required` is a distinct, reportable
    /// "not configured" gate outcome.
    #[serde(default)]
    pub command: Option<String>,
    /// Hard timeout for the quality command
    #[serde(default = "default_quality_timeout")]
    pub timeout_secs: u64,
}

impl Default for QualityRules {
    fn default() -> Self {
        QualityRules {
            required: false,
            command: None,
            timeout_secs: default_quality_timeout(),
        }
    }
}

impl Rules {
    /// Build the active schema from these rules: the override vocabulary if
    /// one is configured, the built-in otherwise.
    pub fn schema(&self) -> Result<Schema, SchemaError> {
        if self.schema.tags.is_empty() {
            Ok(Schema::builtin())
        } else {
            Schema::new(self.schema.version, self.schema.tags.clone())
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_schema_version() -> u32 {
    2
}

fn default_quality_timeout() -> u64 {
    30
}
