mod init;
pub use init::cmd_init;

use std::error::Error;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::Local;

use crate::cli::commands::*;
use crate::cli::output::*;
use crate::engine::gate::CheckStatus;
use crate::engine::{Engine, Promotion};
use crate::io::rules_io;
use crate::io::watcher::{Debouncer, WorkspaceWatcher};
use crate::model::task::{Classification, Status, Task};
use crate::ops::{debt_report, summary_line};

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn dispatch(cli: Cli) -> Result<(), Box<dyn Error>> {
    let json = cli.json;

    match cli.command {
        // Init works on the start directory itself; there is nothing to
        // discover yet
        Commands::Init(args) => cmd_init(args, &start_dir(cli.workspace.as_deref())?),

        Commands::List(args) => cmd_list(args, &workspace_root(cli.workspace.as_deref())?, json),
        Commands::Classify(args) => {
            cmd_classify(args, &workspace_root(cli.workspace.as_deref())?, json)
        }
        Commands::Promote(args) => {
            cmd_promote(args, &workspace_root(cli.workspace.as_deref())?, json)
        }
        Commands::Check(args) => cmd_check(args, &workspace_root(cli.workspace.as_deref())?, json),
        Commands::Debt => cmd_debt(&workspace_root(cli.workspace.as_deref())?, json),
        Commands::Report(args) => cmd_report(args, &workspace_root(cli.workspace.as_deref())?),
        Commands::Watch(args) => cmd_watch(args, &workspace_root(cli.workspace.as_deref())?),
        Commands::Rules(args) => cmd_rules(args, &workspace_root(cli.workspace.as_deref())?, json),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// The directory the command was pointed at: the -C override or the cwd.
fn start_dir(workspace: Option<&str>) -> Result<PathBuf, Box<dyn Error>> {
    match workspace {
        Some(dir) => std::fs::canonicalize(dir)
            .map_err(|e| format!("cannot resolve -C path '{}': {}", dir, e).into()),
        None => std::env::current_dir().map_err(Into::into),
    }
}

/// The workspace root: walk up from the start directory looking for a
/// `.gatehouse/`, falling back to the start directory itself.
fn workspace_root(workspace: Option<&str>) -> Result<PathBuf, Box<dyn Error>> {
    Ok(rules_io::discover_root(&start_dir(workspace)?))
}

fn open_scanned(root: &std::path::Path) -> Result<Engine, Box<dyn Error>> {
    let mut engine = Engine::open(root)?;
    engine.scan();
    Ok(engine)
}

/// Convert a CLI 1-based line number to the model's 0-based index.
fn line_index(line: usize) -> Result<usize, Box<dyn Error>> {
    line.checked_sub(1)
        .ok_or_else(|| "line numbers are 1-based".into())
}

fn task_location(task: &Task) -> String {
    format!("{}:{}", task.file, task.line + 1)
}

// ---------------------------------------------------------------------------
// Read commands
// ---------------------------------------------------------------------------

fn cmd_list(args: ListArgs, root: &std::path::Path, json: bool) -> Result<(), Box<dyn Error>> {
    let mut engine = Engine::open(root)?;
    let summary = engine.scan();

    let tag_filter = match &args.tag {
        Some(tag) => Some(
            engine
                .schema()
                .resolve(tag)
                .ok_or_else(|| format!("unknown classification tag: {}", tag))?,
        ),
        None => None,
    };
    let status_filter = match &args.status {
        Some(status) => Some(
            Status::parse_name(status).ok_or_else(|| format!("unknown status: {}", status))?,
        ),
        None => None,
    };

    let tasks: Vec<&Task> = engine
        .repository()
        .all_tasks()
        .filter(|t| {
            tag_filter
                .as_ref()
                .is_none_or(|tag| t.classification == *tag)
        })
        .filter(|t| status_filter.is_none_or(|s| t.status == s))
        .collect();

    if json {
        let out = ListJson {
            tasks: tasks.iter().map(|t| task_to_json(t)).collect(),
            scan: &summary,
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        for task in &tasks {
            println!("{}", task_row(task));
        }
        println!(
            "{} tasks ({} files scanned, {} skipped)",
            tasks.len(),
            summary.files_scanned,
            summary.files_skipped
        );
    }
    Ok(())
}

fn cmd_debt(root: &std::path::Path, json: bool) -> Result<(), Box<dyn Error>> {
    let engine = open_scanned(root)?;
    let debt = engine.debt();

    if json {
        let out = DebtJson {
            summary: &debt,
            summary_line: summary_line(&debt),
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        for (name, count) in &debt.counts {
            let label = engine
                .schema()
                .get(name)
                .map(|t| t.label.as_str())
                .unwrap_or("Unclassified");
            println!("{}: {}", label, count);
        }
        println!();
        println!("{}", summary_line(&debt));
    }
    Ok(())
}

fn cmd_report(args: ReportArgs, root: &std::path::Path) -> Result<(), Box<dyn Error>> {
    let engine = open_scanned(root)?;
    let report = debt_report(&engine.debt(), engine.schema(), Local::now());

    match args.output {
        Some(path) => {
            crate::io::atomic_write(&path, report.as_bytes())?;
            println!("wrote {}", path.display());
        }
        None => print!("{}", report),
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Write commands
// ---------------------------------------------------------------------------

fn cmd_classify(
    args: ClassifyArgs,
    root: &std::path::Path,
    json: bool,
) -> Result<(), Box<dyn Error>> {
    let mut engine = open_scanned(root)?;
    let line = line_index(args.line)?;
    let new = engine.reclassify(&args.file, line, &args.tag)?;

    let task = engine
        .repository()
        .task_at(&args.file, line)
        .expect("task exists after successful reclassify");
    if json {
        println!("{}", serde_json::to_string_pretty(&task_to_json(task))?);
    } else if new.is_unclassified() {
        println!("cleared tag on {}", task_location(task));
    } else {
        println!("classified {} as [{}]", task_location(task), new);
    }
    Ok(())
}

fn cmd_promote(
    args: TaskRefArgs,
    root: &std::path::Path,
    json: bool,
) -> Result<(), Box<dyn Error>> {
    let mut engine = open_scanned(root)?;
    let line = line_index(args.line)?;
    let outcome = engine.promote(&args.file, line)?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&promotion_to_json(&outcome))?
        );
        return Ok(());
    }

    match outcome {
        Promotion::Promoted { from, to } => {
            println!("promoted {}:{} from [{}] to [{}]", args.file, args.line, from, to);
        }
        Promotion::NothingToPromote { current } => match current {
            Classification::Unclassified => println!(
                "nothing to promote: {}:{} is unclassified (use `gate classify` first)",
                args.file, args.line
            ),
            current => println!(
                "nothing to promote: {}:{} is already [{}]",
                args.file, args.line, current
            ),
        },
    }
    Ok(())
}

fn cmd_check(args: TaskRefArgs, root: &std::path::Path, json: bool) -> Result<(), Box<dyn Error>> {
    let engine = open_scanned(root)?;
    let line = line_index(args.line)?;
    let report = engine.readiness(&args.file, line)?;

    if json {
        let out = CheckJson {
            passed: report.passed(),
            report: &report,
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    for outcome in &report.outcomes {
        let status = match outcome.status {
            CheckStatus::Passed => "pass",
            CheckStatus::Failed => "fail",
            CheckStatus::NotConfigured => "not configured",
        };
        println!("{}: {} ({})", outcome.name, status, outcome.detail);
    }
    if report.passed() {
        println!("readiness: passed");
    } else {
        println!("readiness: failed ({})", report.failed_summary());
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Watch
// ---------------------------------------------------------------------------

fn cmd_watch(args: WatchArgs, root: &std::path::Path) -> Result<(), Box<dyn Error>> {
    let mut engine = Engine::open(root)?;
    let summary = engine.scan();
    let debt = engine.debt();
    println!(
        "watching {} ({} tasks, {})",
        root.display(),
        summary.tasks,
        summary_line(&debt)
    );

    let watcher = WorkspaceWatcher::start(root)?;
    let mut debouncer = Debouncer::new(Duration::from_millis(args.debounce_ms));

    loop {
        if !watcher.poll().is_empty() {
            debouncer.trigger(Instant::now());
        }
        if debouncer.due(Instant::now()) {
            let summary = engine.scan();
            let debt = engine.debt();
            println!(
                "[{}] {} tasks in {} files, {}",
                Local::now().format("%H:%M:%S"),
                summary.tasks,
                engine.repository().file_count(),
                summary_line(&debt)
            );
        }
        std::thread::sleep(Duration::from_millis(50));
    }
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

fn cmd_rules(args: RulesCmd, root: &std::path::Path, json: bool) -> Result<(), Box<dyn Error>> {
    match args.action {
        RulesAction::Show => {
            let rules = rules_io::load_rules(root);
            if json {
                println!("{}", serde_json::to_string_pretty(&rules)?);
            } else {
                print!("{}", toml::to_string_pretty(&rules)?);
            }
        }
        RulesAction::Path => {
            println!("{}", rules_io::rules_path(root).display());
        }
        RulesAction::Set { key, value } => {
            let mut doc = rules_io::read_rules_doc(root)?;
            rules_io::set_rule(&mut doc, &key, &value)?;
            rules_io::write_rules_doc(root, &doc)?;
            println!("set {} = {}", key, value);
        }
    }
    Ok(())
}
