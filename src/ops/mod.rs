pub mod debt;
pub mod report;

pub use debt::{DebtSummary, integration_debt};
pub use report::{debt_report, summary_line};
