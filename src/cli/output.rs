use serde::Serialize;

use crate::engine::Promotion;
use crate::engine::gate::GateReport;
use crate::model::task::Task;
use crate::ops::debt::DebtSummary;
use crate::scan::ScanSummary;

// ---------------------------------------------------------------------------
// JSON output structs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct TaskJson<'a> {
    pub file: &'a str,
    /// Zero-based, matching the model; text output shows 1-based lines
    pub line: usize,
    pub status: &'a str,
    pub classification: &'a str,
    pub title: &'a str,
}

#[derive(Serialize)]
pub struct ListJson<'a> {
    pub tasks: Vec<TaskJson<'a>>,
    pub scan: &'a ScanSummary,
}

#[derive(Serialize)]
pub struct DebtJson<'a> {
    #[serde(flatten)]
    pub summary: &'a DebtSummary,
    pub summary_line: String,
}

#[derive(Serialize)]
pub struct CheckJson<'a> {
    pub passed: bool,
    #[serde(flatten)]
    pub report: &'a GateReport,
}

#[derive(Serialize)]
pub struct PromoteJson {
    pub promoted: bool,
    pub from: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

pub fn task_to_json(task: &Task) -> TaskJson<'_> {
    TaskJson {
        file: &task.file,
        line: task.line,
        status: task.status.as_str(),
        classification: task.classification.name(),
        title: &task.title,
    }
}

pub fn promotion_to_json(outcome: &Promotion) -> PromoteJson {
    match outcome {
        Promotion::Promoted { from, to } => PromoteJson {
            promoted: true,
            from: from.name().to_string(),
            to: Some(to.name().to_string()),
        },
        Promotion::NothingToPromote { current } => PromoteJson {
            promoted: false,
            from: current.name().to_string(),
            to: None,
        },
    }
}

/// One text row per task: `plan.md:12  [!] PROTOTYPE  Build login form`
pub fn task_row(task: &Task) -> String {
    format!(
        "{}:{}  [{}] {}  {}",
        task.file,
        task.line + 1,
        task.status.checkbox_char(),
        task.classification.name(),
        task.title
    )
}
