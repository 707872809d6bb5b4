use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "gate",
    about = concat!("gatehouse v", env!("CARGO_PKG_VERSION"), " - lifecycle tracking for markdown checklists"),
    version,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Run against a different workspace root
    #[arg(short = 'C', long = "workspace", global = true)]
    pub workspace: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create .gatehouse/ with default rules and directives
    Init(InitArgs),
    /// Scan the workspace and list tasks
    List(ListArgs),
    /// Set a task's lifecycle tag directly (any tag, or `unclassified`)
    Classify(ClassifyArgs),
    /// Promote a task to the next lifecycle tag
    Promote(TaskRefArgs),
    /// Run the readiness gate for a task without changing it
    Check(TaskRefArgs),
    /// Show task counts per tag and the debt percentage
    Debt,
    /// Render the markdown debt report
    Report(ReportArgs),
    /// Rescan on file changes, with debounced coalescing
    Watch(WatchArgs),
    /// Inspect or edit the workspace rules
    Rules(RulesCmd),
}

// ---------------------------------------------------------------------------
// Command args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct InitArgs {
    /// Overwrite existing configuration files
    #[arg(long)]
    pub force: bool,
}

#[derive(Args)]
pub struct ListArgs {
    /// Filter by lifecycle tag (or `unclassified`)
    #[arg(long)]
    pub tag: Option<String>,
    /// Filter by checkbox status (unchecked, checked, cancelled,
    /// important, question)
    #[arg(long)]
    pub status: Option<String>,
}

/// A task addressed the way editors show it: file path plus 1-based line.
#[derive(Args)]
pub struct TaskRefArgs {
    /// Workspace-relative file path
    pub file: String,
    /// Line number (1-based)
    pub line: usize,
}

#[derive(Args)]
pub struct ClassifyArgs {
    /// Workspace-relative file path
    pub file: String,
    /// Line number (1-based)
    pub line: usize,
    /// Target tag from the active vocabulary, or `unclassified`
    pub tag: String,
}

#[derive(Args)]
pub struct ReportArgs {
    /// Write the report to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args)]
pub struct WatchArgs {
    /// Quiet window before a change burst triggers a rescan
    #[arg(long, default_value_t = 750)]
    pub debounce_ms: u64,
}

#[derive(Args)]
pub struct RulesCmd {
    #[command(subcommand)]
    pub action: RulesAction,
}

#[derive(Subcommand)]
pub enum RulesAction {
    /// Print the effective rules (defaults merged with the rules file)
    Show,
    /// Print the rules file path
    Path,
    /// Set one rule, preserving the file's formatting and comments
    Set {
        /// Dotted key, e.g. `quality.required`
        key: String,
        value: String,
    },
}
