pub mod gate;
pub mod rewrite;

use std::path::{Path, PathBuf};

use tracing::info;

use crate::io::rules_io;
use crate::model::repository::Repository;
use crate::model::rules::Rules;
use crate::model::schema::{Schema, SchemaError};
use crate::model::task::{Classification, Task};
use crate::ops::debt::{DebtSummary, integration_debt};
use crate::parse::classify_line;
use crate::scan::{ScanSummary, scan_workspace};

use gate::{GateContext, GateReport, checks_from_rules, run_gate};
use rewrite::{RewriteError, rewrite_task_line};

/// Error from an engine operation. Scan-time problems are not here: the
/// scanner reports partial results instead of failing.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Rewrite(#[from] RewriteError),
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error("no task at {file}:{}", .line + 1)]
    NoSuchTask { file: String, line: usize },
    #[error("unknown classification tag: {0}")]
    UnknownTag(String),
    #[error("readiness gate failed: {}", .report.failed_summary())]
    GateFailed { report: GateReport },
}

/// Outcome of a promotion request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Promotion {
    Promoted {
        from: Classification,
        to: Classification,
    },
    /// The task is unclassified, carries a tag outside the promotion
    /// chain, or already sits at the maximal tag.
    NothingToPromote { current: Classification },
}

/// The session context: workspace root, rules, active schema, and the
/// current repository snapshot. Constructed explicitly when a workspace is
/// opened and dropped when it closes; the schema is fixed for the
/// lifetime of the engine.
pub struct Engine {
    root: PathBuf,
    rules: Rules,
    schema: Schema,
    repo: Repository,
}

impl Engine {
    /// Open a workspace: load the rules file (built-in defaults when it is
    /// absent or malformed) and build the schema from it.
    pub fn open(root: &Path) -> Result<Engine, EngineError> {
        let rules = rules_io::load_rules(root);
        let schema = rules.schema()?;
        info!(root = %root.display(), schema_version = schema.version(), "workspace opened");
        Ok(Engine {
            root: root.to_path_buf(),
            rules,
            schema,
            repo: Repository::new(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn rules(&self) -> &Rules {
        &self.rules
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn repository(&self) -> &Repository {
        &self.repo
    }

    /// Re-scan the workspace, replacing the repository wholesale.
    pub fn scan(&mut self) -> ScanSummary {
        let (repo, summary) = scan_workspace(&self.root, &self.schema);
        self.repo = repo;
        summary
    }

    /// Current debt figures, computed fresh from the repository.
    pub fn debt(&self) -> DebtSummary {
        integration_debt(&self.repo, &self.schema)
    }

    /// Explicit reclassification: any state to any other state, by user
    /// choice. `target` is a tag name from the active vocabulary, or
    /// `unclassified` to clear the tag.
    pub fn reclassify(
        &mut self,
        file: &str,
        line: usize,
        target: &str,
    ) -> Result<Classification, EngineError> {
        let target = self
            .schema
            .resolve(target)
            .ok_or_else(|| EngineError::UnknownTag(target.to_string()))?;
        self.require_task(file, line)?;
        self.apply(file, line, &target)?;
        Ok(target)
    }

    /// Promote a task to the next tag in the lifecycle chain. Entering a
    /// gated tag runs the readiness gate first; a failed gate rejects the
    /// transition and leaves the task unchanged.
    pub fn promote(&mut self, file: &str, line: usize) -> Result<Promotion, EngineError> {
        let task = self.require_task(file, line)?;
        let current = task.classification.clone();

        let Some(next) = self.schema.next_after(&current) else {
            return Ok(Promotion::NothingToPromote { current });
        };
        let to = Classification::Tag(next.name.clone());

        if next.gated {
            let report = self.readiness(file, line)?;
            if !report.passed() {
                return Err(EngineError::GateFailed { report });
            }
        }

        self.apply(file, line, &to)?;
        info!(file, line, from = %current, to = %to, "task promoted");
        Ok(Promotion::Promoted { from: current, to })
    }

    /// Run the readiness gate for a task without touching its tag.
    pub fn readiness(&self, file: &str, line: usize) -> Result<GateReport, EngineError> {
        let task = self.require_task(file, line)?;
        let checks = checks_from_rules(&self.rules);
        let ctx = GateContext {
            root: &self.root,
            task,
        };
        Ok(run_gate(&checks, &ctx))
    }

    fn require_task(&self, file: &str, line: usize) -> Result<&Task, EngineError> {
        self.repo.task_at(file, line).ok_or_else(|| EngineError::NoSuchTask {
            file: file.to_string(),
            line,
        })
    }

    /// Rewrite the owning line on disk, then patch the in-memory task to
    /// match. The patch mirrors what a full re-scan would produce for that
    /// line; a re-scan afterwards converges to the same state.
    fn apply(
        &mut self,
        file: &str,
        line: usize,
        target: &Classification,
    ) -> Result<(), EngineError> {
        let new_line = rewrite_task_line(&self.root, file, line, &self.schema, target)?;
        let parsed = classify_line(&new_line, &self.schema);
        self.repo.patch(file, line, |task| {
            task.raw = new_line.clone();
            if let Some(parsed) = parsed {
                task.status = parsed.status;
                task.classification = parsed.classification;
                task.title = parsed.title;
            } else {
                task.classification = target.clone();
            }
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn workspace() -> TempDir {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join("plan.md"),
            "\
# Plan

- [ ] [PROTOTYPE] Build login form
- [ ] [INTEGRATION_CANDIDATE] Wire the cache
- [x] [PRODUCTION] Ship auth
- [ ] Triage incoming reports
",
        )
        .unwrap();
        tmp
    }

    fn open_scanned(tmp: &TempDir) -> Engine {
        let mut engine = Engine::open(tmp.path()).unwrap();
        engine.scan();
        engine
    }

    #[test]
    fn test_scan_populates_repository() {
        let tmp = workspace();
        let mut engine = Engine::open(tmp.path()).unwrap();
        let summary = engine.scan();
        assert_eq!(summary.tasks, 4);
        assert_eq!(engine.repository().total(), 4);
    }

    #[test]
    fn test_reclassify_any_to_any() {
        let tmp = workspace();
        let mut engine = open_scanned(&tmp);

        // Jump straight from unclassified to the terminal tag: explicit
        // reclassification is a manual override with no gate
        let new = engine.reclassify("plan.md", 5, "production").unwrap();
        assert_eq!(new, Classification::Tag("PRODUCTION".into()));

        let on_disk = fs::read_to_string(tmp.path().join("plan.md")).unwrap();
        assert!(on_disk.contains("- [ ] [PRODUCTION] Triage incoming reports"));

        // In-memory task patched without a re-scan
        let task = engine.repository().task_at("plan.md", 5).unwrap();
        assert_eq!(task.classification, Classification::Tag("PRODUCTION".into()));
        assert_eq!(task.title, "Triage incoming reports");
    }

    #[test]
    fn test_reclassify_to_unclassified_clears_tag() {
        let tmp = workspace();
        let mut engine = open_scanned(&tmp);
        engine.reclassify("plan.md", 2, "unclassified").unwrap();
        let on_disk = fs::read_to_string(tmp.path().join("plan.md")).unwrap();
        assert!(on_disk.contains("- [ ] Build login form"));
    }

    #[test]
    fn test_reclassify_unknown_tag() {
        let tmp = workspace();
        let mut engine = open_scanned(&tmp);
        let err = engine.reclassify("plan.md", 2, "SHIPPED").unwrap_err();
        assert!(matches!(err, EngineError::UnknownTag(t) if t == "SHIPPED"));
    }

    #[test]
    fn test_reclassify_missing_task() {
        let tmp = workspace();
        let mut engine = open_scanned(&tmp);
        let err = engine.reclassify("plan.md", 0, "prototype").unwrap_err();
        assert!(matches!(err, EngineError::NoSuchTask { line: 0, .. }));
    }

    #[test]
    fn test_promote_walks_the_chain() {
        let tmp = workspace();
        let mut engine = open_scanned(&tmp);
        let outcome = engine.promote("plan.md", 2).unwrap();
        assert_eq!(
            outcome,
            Promotion::Promoted {
                from: Classification::Tag("PROTOTYPE".into()),
                to: Classification::Tag("INTEGRATION_CANDIDATE".into()),
            }
        );
    }

    #[test]
    fn test_promote_at_maximal_tag_is_nothing_to_promote() {
        let tmp = workspace();
        let mut engine = open_scanned(&tmp);
        let before = fs::read_to_string(tmp.path().join("plan.md")).unwrap();

        let outcome = engine.promote("plan.md", 4).unwrap();
        assert_eq!(
            outcome,
            Promotion::NothingToPromote {
                current: Classification::Tag("PRODUCTION".into()),
            }
        );
        // No-op: classification and file unchanged
        assert_eq!(fs::read_to_string(tmp.path().join("plan.md")).unwrap(), before);
    }

    #[test]
    fn test_promote_unclassified_is_nothing_to_promote() {
        let tmp = workspace();
        let mut engine = open_scanned(&tmp);
        let outcome = engine.promote("plan.md", 5).unwrap();
        assert_eq!(
            outcome,
            Promotion::NothingToPromote {
                current: Classification::Unclassified,
            }
        );
    }

    #[test]
    fn test_gated_promotion_rejected_without_artifacts() {
        let tmp = workspace();
        let mut engine = open_scanned(&tmp);
        // INTEGRATION_CANDIDATE -> PRODUCTION is gated; the workspace has
        // no docs or test artifacts for "Wire the cache"
        let err = engine.promote("plan.md", 3).unwrap_err();
        let EngineError::GateFailed { report } = err else {
            panic!("expected gate failure");
        };
        assert_eq!(report.failed_names(), vec!["documentation", "tests"]);

        // Task untouched on disk and in memory
        let on_disk = fs::read_to_string(tmp.path().join("plan.md")).unwrap();
        assert!(on_disk.contains("- [ ] [INTEGRATION_CANDIDATE] Wire the cache"));
        let task = engine.repository().task_at("plan.md", 3).unwrap();
        assert_eq!(
            task.classification,
            Classification::Tag("INTEGRATION_CANDIDATE".into())
        );
    }

    #[test]
    fn test_gated_promotion_passes_with_artifacts() {
        let tmp = workspace();
        fs::create_dir_all(tmp.path().join("docs")).unwrap();
        fs::write(tmp.path().join("docs/wire-the-cache.md"), "# Cache\n").unwrap();
        fs::create_dir_all(tmp.path().join("tests")).unwrap();
        fs::write(tmp.path().join("tests/wire-the-cache.test.ts"), "").unwrap();

        let mut engine = open_scanned(&tmp);
        let outcome = engine.promote("plan.md", 3).unwrap();
        assert!(matches!(outcome, Promotion::Promoted { .. }));
        let on_disk = fs::read_to_string(tmp.path().join("plan.md")).unwrap();
        assert!(on_disk.contains("- [ ] [PRODUCTION] Wire the cache"));
    }

    #[test]
    fn test_rescan_after_apply_converges() {
        let tmp = workspace();
        let mut engine = open_scanned(&tmp);
        engine.reclassify("plan.md", 2, "production").unwrap();
        let patched = engine.repository().clone();

        engine.scan();
        assert_eq!(*engine.repository(), patched);
    }

    #[test]
    fn test_stale_location_surfaces_from_rewrite() {
        let tmp = workspace();
        let mut engine = open_scanned(&tmp);
        // Truncate the file after the scan
        fs::write(tmp.path().join("plan.md"), "# Plan\n").unwrap();

        let err = engine.reclassify("plan.md", 2, "production").unwrap_err();
        assert!(matches!(
            err,
            EngineError::Rewrite(RewriteError::StaleLocation { .. })
        ));
    }
}
