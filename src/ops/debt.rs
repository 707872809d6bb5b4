use indexmap::IndexMap;
use serde::Serialize;

use crate::model::repository::Repository;
use crate::model::schema::Schema;
use crate::model::task::Classification;

/// Debt figures over one repository snapshot. Computed fresh on every call;
/// nothing here is cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DebtSummary {
    pub total: usize,
    /// Count per classification, in schema order, `UNCLASSIFIED` last.
    /// Every vocabulary tag is present even at zero.
    pub counts: IndexMap<String, usize>,
    /// Tasks in a fully-done classification
    pub done: usize,
    /// round(100 × not-done / total); 0 when the repository is empty
    pub debt_percent: u32,
}

/// Count tasks per classification and derive the debt percentage.
pub fn integration_debt(repo: &Repository, schema: &Schema) -> DebtSummary {
    let mut counts: IndexMap<String, usize> = schema
        .tags()
        .iter()
        .map(|t| (t.name.clone(), 0))
        .collect();
    counts.insert(Classification::UNCLASSIFIED_NAME.to_string(), 0);

    let mut done = 0usize;
    let mut total = 0usize;
    for task in repo.all_tasks() {
        total += 1;
        *counts.entry(task.classification.name().to_string()).or_insert(0) += 1;
        if schema.is_done(&task.classification) {
            done += 1;
        }
    }

    let debt_percent = percentage(total - done, total);

    DebtSummary {
        total,
        counts,
        done,
        debt_percent,
    }
}

/// round(100 × part / whole), with an empty whole defined as 0.
pub fn percentage(part: usize, whole: usize) -> u32 {
    if whole == 0 {
        0
    } else {
        (part as f64 / whole as f64 * 100.0).round() as u32
    }
}
