use chrono::{DateTime, Local};

use crate::model::schema::Schema;
use crate::ops::debt::{DebtSummary, percentage};

/// One-line dashboard summary, e.g. `3/10 done, debt 70%`.
pub fn summary_line(summary: &DebtSummary) -> String {
    format!(
        "{}/{} done, debt {}%",
        summary.done, summary.total, summary.debt_percent
    )
}

/// Render the full markdown debt report. The timestamp is a parameter so
/// the output is a pure function of its inputs.
pub fn debt_report(
    summary: &DebtSummary,
    schema: &Schema,
    generated_at: DateTime<Local>,
) -> String {
    let mut out = String::new();
    out.push_str("# Integration Debt Report\n\n");

    out.push_str("## Overview\n\n");
    out.push_str(&format!("- **Total tasks:** {}\n", summary.total));
    out.push_str(&format!(
        "- **Integration debt:** {}%\n\n",
        summary.debt_percent
    ));

    out.push_str("## Distribution\n\n");
    for (name, count) in &summary.counts {
        let label = schema
            .get(name)
            .map(|t| t.label.as_str())
            .unwrap_or("Unclassified");
        out.push_str(&format!(
            "- {}: {} ({}%)\n",
            label,
            count,
            percentage(*count, summary.total)
        ));
    }
    out.push('\n');

    out.push_str("## Recommendation\n\n");
    out.push_str(recommendation(summary.debt_percent));
    out.push_str("\n\n---\n");
    out.push_str(&format!(
        "Generated by gatehouse on {}\n",
        generated_at.format("%Y-%m-%d %H:%M")
    ));
    out
}

fn recommendation(debt_percent: u32) -> &'static str {
    if debt_percent > 70 {
        "CRITICAL: very high integration debt. Stop adding prototypes and promote what exists."
    } else if debt_percent > 50 {
        "WARNING: high integration debt. Focus on moving candidates into a done state."
    } else {
        "HEALTHY: integration debt is under control."
    }
}
