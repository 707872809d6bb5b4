use std::path::Path;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::debug;

use crate::model::rules::Rules;
use crate::model::task::Task;
use crate::scan::all_files;

/// Result of one readiness sub-check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Passed,
    Failed,
    /// The check is required but nothing real backs it. A distinct state
    /// so a missing checker reads as "not configured", never as a pass or
    /// a random verdict.
    NotConfigured,
}

#[derive(Debug, Clone, Serialize)]
pub struct GateOutcome {
    pub name: String,
    pub status: CheckStatus,
    /// Human-readable explanation of what was (or wasn't) found
    pub detail: String,
}

/// Aggregate result of running the readiness gate. The gate passes only if
/// every configured check passed; a failure names each failing sub-check.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GateReport {
    pub outcomes: Vec<GateOutcome>,
}

impl GateReport {
    pub fn passed(&self) -> bool {
        self.outcomes.iter().all(|o| o.status == CheckStatus::Passed)
    }

    pub fn failed_names(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|o| o.status != CheckStatus::Passed)
            .map(|o| o.name.as_str())
            .collect()
    }

    pub fn failed_summary(&self) -> String {
        self.failed_names().join(", ")
    }
}

/// What a check gets to look at: the workspace and the task under review.
pub struct GateContext<'a> {
    pub root: &'a Path,
    pub task: &'a Task,
}

/// One pluggable readiness check. Implementations may consult the file
/// system or call out to external collaborators; the gate only needs the
/// status and an explanation back.
pub trait GateCheck {
    fn name(&self) -> &'static str;
    fn run(&self, ctx: &GateContext<'_>) -> GateOutcome;
}

/// Assemble the checks the rules ask for.
pub fn checks_from_rules(rules: &Rules) -> Vec<Box<dyn GateCheck>> {
    let mut checks: Vec<Box<dyn GateCheck>> = Vec::new();
    if rules.project.require_docs_for_done {
        checks.push(Box::new(DocsCheck));
    }
    if rules.project.require_tests_for_done {
        checks.push(Box::new(TestsCheck));
    }
    if rules.quality.required {
        checks.push(Box::new(QualityCheck {
            command: rules.quality.command.clone(),
            timeout: Duration::from_secs(rules.quality.timeout_secs),
        }));
    }
    checks
}

/// Run every check and collect the report.
pub fn run_gate(checks: &[Box<dyn GateCheck>], ctx: &GateContext<'_>) -> GateReport {
    let mut report = GateReport::default();
    for check in checks {
        let outcome = check.run(ctx);
        debug!(check = outcome.name, status = ?outcome.status, "gate check");
        report.outcomes.push(outcome);
    }
    report
}

/// Lowercased, dash-joined form of a task title, used to match artifact
/// file names against the task.
pub fn task_slug(title: &str) -> String {
    title
        .to_lowercase()
        .replace('_', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}

// ---------------------------------------------------------------------------
// Built-in checks
// ---------------------------------------------------------------------------

/// A documentation artifact exists: a markdown file, other than the task's
/// own file, whose name contains the task's slug.
struct DocsCheck;

impl GateCheck for DocsCheck {
    fn name(&self) -> &'static str {
        "documentation"
    }

    fn run(&self, ctx: &GateContext<'_>) -> GateOutcome {
        artifact_check(self.name(), ctx, |name, ext| {
            matches!(ext, "md" | "markdown") && !name_is_own_file(name, &ctx.task.file)
        })
    }
}

/// A test artifact exists: a file whose name contains the slug and a
/// test/spec marker.
struct TestsCheck;

impl GateCheck for TestsCheck {
    fn name(&self) -> &'static str {
        "tests"
    }

    fn run(&self, ctx: &GateContext<'_>) -> GateOutcome {
        artifact_check(self.name(), ctx, |name, _ext| {
            name.contains("test") || name.contains("spec")
        })
    }
}

fn name_is_own_file(name: &str, task_file: &str) -> bool {
    Path::new(task_file)
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|own| own.eq_ignore_ascii_case(name))
}

/// Shared slug-based artifact search. `accept` further filters candidate
/// files by (lowercased file name, extension).
fn artifact_check(
    name: &'static str,
    ctx: &GateContext<'_>,
    accept: impl Fn(&str, &str) -> bool,
) -> GateOutcome {
    let slug = task_slug(&ctx.task.title);
    if slug.is_empty() {
        return GateOutcome {
            name: name.to_string(),
            status: CheckStatus::Failed,
            detail: "task title yields no searchable name".to_string(),
        };
    }

    for path in all_files(ctx.root) {
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let file_name = file_name.to_lowercase();
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        if file_name.contains(&slug) && accept(&file_name, ext) {
            let rel = path
                .strip_prefix(ctx.root)
                .unwrap_or(&path)
                .to_string_lossy()
                .into_owned();
            return GateOutcome {
                name: name.to_string(),
                status: CheckStatus::Passed,
                detail: format!("found {}", rel),
            };
        }
    }

    GateOutcome {
        name: name.to_string(),
        status: CheckStatus::Failed,
        detail: format!("no matching artifact for \"{}\"", slug),
    }
}

/// External quality assessment, backed by whatever command the rules
/// configure. Exit status 0 is a pass; stdout becomes the explanation. The
/// command runs under a hard timeout and is killed on expiry — a hung
/// collaborator fails the gate instead of wedging the session.
struct QualityCheck {
    command: Option<String>,
    timeout: Duration,
}

impl GateCheck for QualityCheck {
    fn name(&self) -> &'static str {
        "quality"
    }

    fn run(&self, ctx: &GateContext<'_>) -> GateOutcome {
        let Some(command) = &self.command else {
            return GateOutcome {
                name: self.name().to_string(),
                status: CheckStatus::NotConfigured,
                detail: "no quality checker configured".to_string(),
            };
        };

        match run_with_timeout(command, ctx, self.timeout) {
            Ok((true, explanation)) => GateOutcome {
                name: self.name().to_string(),
                status: CheckStatus::Passed,
                detail: explanation,
            },
            Ok((false, explanation)) => GateOutcome {
                name: self.name().to_string(),
                status: CheckStatus::Failed,
                detail: explanation,
            },
            Err(detail) => GateOutcome {
                name: self.name().to_string(),
                status: CheckStatus::Failed,
                detail,
            },
        }
    }
}

/// Run the quality command, polling until it exits or the deadline passes.
/// Returns (passed, explanation) or an error description.
fn run_with_timeout(
    command: &str,
    ctx: &GateContext<'_>,
    timeout: Duration,
) -> Result<(bool, String), String> {
    let mut child = Command::new("sh")
        .arg("-c")
        .arg(command)
        .current_dir(ctx.root)
        .env("GATEHOUSE_TASK_TITLE", &ctx.task.title)
        .env("GATEHOUSE_TASK_FILE", &ctx.task.file)
        .env("GATEHOUSE_TASK_LINE", (ctx.task.line + 1).to_string())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| format!("could not start quality command: {}", e))?;

    let deadline = Instant::now() + timeout;
    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                let mut explanation = String::new();
                if let Some(mut out) = child.stdout.take() {
                    use std::io::Read;
                    let _ = out.read_to_string(&mut explanation);
                }
                let explanation = explanation.trim().to_string();
                let explanation = if explanation.is_empty() {
                    format!("quality command exited with {}", status)
                } else {
                    explanation
                };
                return Ok((status.success(), explanation));
            }
            Ok(None) => {
                if Instant::now() >= deadline {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(format!(
                        "quality command timed out after {}s",
                        timeout.as_secs()
                    ));
                }
                std::thread::sleep(Duration::from_millis(25));
            }
            Err(e) => return Err(format!("could not wait for quality command: {}", e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::task::{Classification, Status};
    use std::fs;
    use tempfile::TempDir;

    fn task(file: &str, title: &str) -> Task {
        Task {
            file: file.to_string(),
            line: 0,
            raw: format!("- [ ] {}", title),
            status: Status::Unchecked,
            classification: Classification::Unclassified,
            title: title.to_string(),
        }
    }

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_task_slug() {
        assert_eq!(task_slug("Build Login Form"), "build-login-form");
        assert_eq!(task_slug("wire_the_cache"), "wire-the-cache");
        assert_eq!(task_slug("  spaced   out  "), "spaced-out");
        assert_eq!(task_slug(""), "");
    }

    #[test]
    fn test_docs_check_finds_matching_markdown() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "plan.md", "- [ ] Build login form\n");
        write(tmp.path(), "docs/build-login-form.md", "# Login form\n");

        let task = task("plan.md", "Build login form");
        let ctx = GateContext {
            root: tmp.path(),
            task: &task,
        };
        let outcome = DocsCheck.run(&ctx);
        assert_eq!(outcome.status, CheckStatus::Passed);
        assert!(outcome.detail.contains("build-login-form.md"));
    }

    #[test]
    fn test_docs_check_ignores_owning_file() {
        let tmp = TempDir::new().unwrap();
        // The only match is the file the task itself lives in
        write(tmp.path(), "build-login-form.md", "- [ ] Build login form\n");

        let task = task("build-login-form.md", "Build login form");
        let ctx = GateContext {
            root: tmp.path(),
            task: &task,
        };
        assert_eq!(DocsCheck.run(&ctx).status, CheckStatus::Failed);
    }

    #[test]
    fn test_tests_check_requires_test_marker() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "src/build-login-form.rs", "");
        let task = task("plan.md", "Build login form");
        let ctx = GateContext {
            root: tmp.path(),
            task: &task,
        };
        assert_eq!(TestsCheck.run(&ctx).status, CheckStatus::Failed);

        write(tmp.path(), "tests/build-login-form.test.ts", "");
        assert_eq!(TestsCheck.run(&ctx).status, CheckStatus::Passed);
    }

    #[test]
    fn test_quality_not_configured_is_distinct() {
        let tmp = TempDir::new().unwrap();
        let task = task("plan.md", "Anything");
        let ctx = GateContext {
            root: tmp.path(),
            task: &task,
        };
        let check = QualityCheck {
            command: None,
            timeout: Duration::from_secs(1),
        };
        let outcome = check.run(&ctx);
        assert_eq!(outcome.status, CheckStatus::NotConfigured);
        assert_eq!(outcome.detail, "no quality checker configured");
    }

    #[test]
    fn test_quality_command_pass_and_fail() {
        let tmp = TempDir::new().unwrap();
        let task = task("plan.md", "Anything");
        let ctx = GateContext {
            root: tmp.path(),
            task: &task,
        };

        let pass = QualityCheck {
            command: Some("echo looks good".to_string()),
            timeout: Duration::from_secs(5),
        };
        let outcome = pass.run(&ctx);
        assert_eq!(outcome.status, CheckStatus::Passed);
        assert_eq!(outcome.detail, "looks good");

        let fail = QualityCheck {
            command: Some("echo needs work; exit 1".to_string()),
            timeout: Duration::from_secs(5),
        };
        let outcome = fail.run(&ctx);
        assert_eq!(outcome.status, CheckStatus::Failed);
        assert_eq!(outcome.detail, "needs work");
    }

    #[test]
    fn test_quality_command_timeout_kills_and_fails() {
        let tmp = TempDir::new().unwrap();
        let task = task("plan.md", "Anything");
        let ctx = GateContext {
            root: tmp.path(),
            task: &task,
        };
        let check = QualityCheck {
            command: Some("sleep 30".to_string()),
            timeout: Duration::from_millis(100),
        };
        let outcome = check.run(&ctx);
        assert_eq!(outcome.status, CheckStatus::Failed);
        assert!(outcome.detail.contains("timed out"));
    }

    #[test]
    fn test_report_names_failed_checks() {
        let report = GateReport {
            outcomes: vec![
                GateOutcome {
                    name: "documentation".into(),
                    status: CheckStatus::Failed,
                    detail: "no matching artifact".into(),
                },
                GateOutcome {
                    name: "tests".into(),
                    status: CheckStatus::Passed,
                    detail: "found tests/x.test.ts".into(),
                },
                GateOutcome {
                    name: "quality".into(),
                    status: CheckStatus::Passed,
                    detail: "ok".into(),
                },
            ],
        };
        assert!(!report.passed());
        assert_eq!(report.failed_names(), vec!["documentation"]);
        assert_eq!(report.failed_summary(), "documentation");
    }

    #[test]
    fn test_checks_from_rules_respects_toggles() {
        let mut rules = Rules::default();
        let names: Vec<&str> = checks_from_rules(&rules).iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["documentation", "tests"]);

        rules.project.require_docs_for_done = false;
        rules.quality.required = true;
        let names: Vec<&str> = checks_from_rules(&rules).iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["tests", "quality"]);
    }
}
