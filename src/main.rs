//! shelfwise - sort a directory into categorized, duplicate-aware folders.
//!
//! Usage:
//!   shelf plan [DIR]            Preview what would be moved
//!   shelf organize [DIR]        Plan, validate and move
//!   shelf validate [DIR]        Check a plan without moving anything
//!   shelf undo [LOG]            Put a run's files back
//!   shelf --help                Show help

use std::collections::BTreeMap;
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::{Component, Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Context, Result, bail, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;
use tracing_subscriber::EnvFilter;

use shelfwise_analyze::Capabilities;
use shelfwise_core::{
    Checkpoint, ConflictPolicy, HashAlgorithm, OrganizationPlan, OrganizationResult,
    OrganizeConfig, Strategy,
};
use shelfwise_ops::{
    CheckpointManager, CheckpointRecorder, Conflict, ConflictChoice, ConflictPrompt,
    ExecutionReport, Executor, OperationLog,
};
use shelfwise_plan::{Planner, ValidationReport, Validator, optimize_plan};

#[derive(Parser)]
#[command(
    name = "shelfwise",
    version,
    about = "Sort a directory into categorized, duplicate-aware folders",
    long_about = "shelfwise moves the loose files of a directory into prefixed category \
                  folders (all_Docs, all_Pics, ...), isolates duplicate copies and moves \
                  plain subdirectories aside. Every run writes an operation log that \
                  `shelf undo` can replay backwards."
)]
struct Cli {
    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show what organizing would do
    Plan {
        #[command(flatten)]
        options: PlanOptions,

        /// Number of operations to list
        #[arg(short = 'n', long, default_value = "20")]
        top: usize,
    },

    /// Plan, validate and carry out the organization
    Organize {
        #[command(flatten)]
        options: PlanOptions,

        /// Decide everything but move nothing
        #[arg(long)]
        dry_run: bool,

        /// Write a JSON report of the run
        #[arg(long, value_name = "PATH")]
        report: Option<PathBuf>,

        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Validate a plan and report problems
    Validate {
        #[command(flatten)]
        options: PlanOptions,
    },

    /// Undo a previous run from its operation log
    Undo {
        /// Operation log to replay
        #[arg(conflicts_with = "latest")]
        log: Option<PathBuf>,

        /// Use the newest log found under this directory
        #[arg(long, value_name = "DIR")]
        latest: Option<PathBuf>,

        /// Configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

/// Options shared by every planning command.
#[derive(Args)]
struct PlanOptions {
    /// Directory to organize
    #[arg(default_value = ".")]
    path: PathBuf,

    /// Configuration file (defaults to the first one discovered)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Organization strategy: by-extension, by-date, by-size or hybrid
    #[arg(short, long)]
    strategy: Option<Strategy>,

    /// Conflict policy: rename, skip, overwrite or ask
    #[arg(long)]
    conflict: Option<ConflictPolicy>,

    /// Do not look for duplicates
    #[arg(long)]
    no_duplicates: bool,

    /// Hash algorithm: sha256, blake3 or xxhash
    #[arg(long)]
    hash: Option<HashAlgorithm>,

    /// Hash files on a worker pool
    #[arg(short, long)]
    parallel: bool,
}

fn main() -> Result<ExitCode> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let success = match cli.command {
        Command::Plan { options, top } => run_plan(&options, top)?,
        Command::Organize {
            options,
            dry_run,
            report,
            yes,
        } => run_organize(&options, dry_run, report.as_deref(), yes)?,
        Command::Validate { options } => run_validate(&options)?,
        Command::Undo {
            log,
            latest,
            config,
        } => run_undo(log, latest, config.as_deref())?,
    };

    Ok(if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

/// Load configuration and apply command-line overrides.
fn load_config(path: Option<&Path>) -> Result<OrganizeConfig> {
    match path {
        Some(path) => OrganizeConfig::load(path)
            .wrap_err_with(|| format!("Failed to load config {}", path.display())),
        None => Ok(OrganizeConfig::discover()),
    }
}

fn configure(options: &PlanOptions) -> Result<OrganizeConfig> {
    let mut config = load_config(options.config.as_deref())?;

    if let Some(strategy) = options.strategy {
        config.strategy = strategy;
    }
    if let Some(policy) = options.conflict {
        config.conflict_policy = policy;
    }
    if let Some(algorithm) = options.hash {
        config.hash_algorithm = algorithm;
    }
    if options.no_duplicates {
        config.detect_duplicates = false;
    }
    if options.parallel {
        config.parallel_hashing = true;
    }

    config.validated().wrap_err("Invalid configuration")
}

/// Build and optimize a plan for the requested directory.
fn build_plan(options: &PlanOptions) -> Result<(OrganizeConfig, OrganizationPlan)> {
    let config = configure(options)?;
    let root = options
        .path
        .canonicalize()
        .wrap_err_with(|| format!("Invalid path {}", options.path.display()))?;

    let capabilities = Capabilities::detect(&config);
    let mut planner = Planner::new(config.clone(), &capabilities);

    let checkpoints = CheckpointManager::new(&root, &config.log_directory);
    if let Some(checkpoint) = checkpoints.load().filter(|cp| cp.root_dir == root) {
        info!(
            completed = checkpoint.completed_operations,
            phase = %checkpoint.current_phase,
            "resuming from checkpoint"
        );
        planner = planner.with_completed(checkpoint.completed_hashes);
    }

    eprintln!("Scanning {}...", root.display());
    let bar = progress_bar("Hashing");
    let plan = planner.create_plan_with_progress(&root, |done, total| {
        bar.set_length(total as u64);
        bar.set_position(done as u64);
    });
    bar.finish_and_clear();
    let plan = plan.wrap_err("Planning failed")?;

    Ok((config, optimize_plan(plan)))
}

fn run_plan(options: &PlanOptions, top: usize) -> Result<bool> {
    let (_, plan) = build_plan(options)?;
    print_plan(&plan, top);

    let validation = Validator::new().validate(&plan);
    print_validation(&validation);
    Ok(validation.is_valid())
}

fn run_validate(options: &PlanOptions) -> Result<bool> {
    let (_, plan) = build_plan(options)?;
    println!(
        "{} operations planned for {}",
        plan.total_operations(),
        plan.root.display()
    );

    let validation = Validator::new().validate(&plan);
    print_validation(&validation);
    if validation.is_valid() {
        println!("Plan is valid.");
    }
    Ok(validation.is_valid())
}

fn run_organize(
    options: &PlanOptions,
    dry_run: bool,
    report_path: Option<&Path>,
    yes: bool,
) -> Result<bool> {
    let (config, plan) = build_plan(options)?;
    print_plan(&plan, 10);

    let validation = Validator::new().validate(&plan);
    print_validation(&validation);
    if !validation.is_valid() {
        eprintln!("Validation failed; nothing was changed.");
        return Ok(false);
    }
    if plan.is_empty() {
        println!("Nothing to do.");
        return Ok(true);
    }
    if !dry_run && !yes && !confirm(&format!("Move {} items?", plan.total_operations()))? {
        println!("Aborted.");
        return Ok(true);
    }

    let mut executor = Executor::from_config(&config, dry_run);
    if config.conflict_policy == ConflictPolicy::Ask && !yes && io::stdin().is_terminal() {
        executor = executor.with_prompt(Arc::new(TerminalPrompt));
    }

    let mut recorder = (!dry_run).then(|| {
        CheckpointRecorder::start(
            CheckpointManager::new(&plan.root, &config.log_directory),
            Checkpoint::new(&plan.root, plan.total_operations()),
            CheckpointRecorder::DEFAULT_SAVE_EVERY,
        )
    });

    let bar = progress_bar(if dry_run { "Simulating" } else { "Moving" });
    let result = executor.execute_with_progress(plan, |progress| {
        bar.set_length(progress.total as u64);
        bar.set_position(progress.completed as u64);
        if let Some(name) = progress.current.as_deref().and_then(Path::file_name) {
            bar.set_message(name.to_string_lossy().into_owned());
        }
        if let Some(recorder) = recorder.as_mut() {
            recorder.observe(progress);
        }
    });
    bar.finish_and_clear();

    if let Some(recorder) = recorder {
        recorder.finish(&result);
    }

    print_result(&result);

    if let Some(path) = report_path {
        ExecutionReport::from_result(&result)
            .write_json(path)
            .wrap_err_with(|| format!("Failed to write report {}", path.display()))?;
        println!("Report written to {}", path.display());
    }

    Ok(result.is_complete_success())
}

fn run_undo(log: Option<PathBuf>, latest: Option<PathBuf>, config: Option<&Path>) -> Result<bool> {
    let config = load_config(config)?;

    let log_path = match (log, latest) {
        (Some(path), _) => path,
        (None, Some(dir)) => {
            let root = dir
                .canonicalize()
                .wrap_err_with(|| format!("Invalid path {}", dir.display()))?;
            OperationLog::latest(&root, &config.log_directory)
                .ok_or_else(|| eyre!("No operation log found under {}", root.display()))?
        }
        (None, None) => bail!("Give a log file or --latest DIR"),
    };

    println!("Undoing {}...", log_path.display());
    let report = Executor::from_config(&config, false)
        .undo(&log_path)
        .wrap_err("Undo failed")?;

    println!("Restored: {}", report.succeeded());
    println!("Failed:   {}", report.failed_count());
    for (entry, reason) in &report.failed {
        println!("  {}: {reason}", entry.destination.display());
    }
    if !report.directories_removed.is_empty() {
        println!("Removed {} empty directories", report.directories_removed.len());
    }

    Ok(report.is_complete_success())
}

/// Asks on the terminal how to handle each conflict.
struct TerminalPrompt;

impl ConflictPrompt for TerminalPrompt {
    fn choose(&self, conflict: &Conflict) -> ConflictChoice {
        let question = format!(
            "{}: {}\n  [r]ename, [s]kip or [o]verwrite?",
            conflict.kind,
            conflict.destination.display()
        );
        match ask(&question).as_deref() {
            Some("s") | Some("skip") => ConflictChoice::Skip,
            Some("o") | Some("overwrite") => ConflictChoice::Overwrite,
            _ => ConflictChoice::Rename,
        }
    }
}

fn ask(question: &str) -> Option<String> {
    eprint!("{question} ");
    io::stderr().flush().ok()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line).ok()?;
    Some(line.trim().to_lowercase())
}

fn confirm(question: &str) -> Result<bool> {
    if !io::stdin().is_terminal() {
        bail!("Refusing to move files without confirmation; pass --yes");
    }
    Ok(matches!(
        ask(&format!("{question} [y/N]")).as_deref(),
        Some("y") | Some("yes")
    ))
}

fn print_plan(plan: &OrganizationPlan, top: usize) {
    println!();
    println!("{}", "─".repeat(70));
    println!(" Organization plan for {}", plan.root.display());
    println!("{}", "─".repeat(70));
    println!(
        " {} file moves ({}), {} directory moves, {} skipped",
        plan.total_files(),
        format_size(plan.total_bytes()),
        plan.directory_operations.len(),
        plan.skipped.len()
    );

    let mut per_category: BTreeMap<String, usize> = BTreeMap::new();
    for dest in plan
        .operations
        .iter()
        .map(|op| &op.destination)
        .chain(plan.directory_operations.iter().map(|op| &op.destination))
    {
        if let Some(Component::Normal(name)) = dest
            .strip_prefix(&plan.root)
            .ok()
            .and_then(|rel| rel.components().next())
        {
            *per_category.entry(name.to_string_lossy().into_owned()).or_default() += 1;
        }
    }
    if !per_category.is_empty() {
        println!();
        println!(" Categories:");
        for (category, count) in &per_category {
            println!("   {category:<30} {count:>6}");
        }
    }

    if !plan.duplicate_sets.is_empty() {
        println!();
        println!(
            " Duplicates: {} sets, {} extra copies, {} recoverable",
            plan.duplicate_sets.len(),
            plan.total_duplicates(),
            format_size(plan.space_recoverable())
        );
    }

    if !plan.is_empty() {
        println!();
        println!(" Operations:");
        for op in plan.operations.iter().take(top) {
            println!(
                "   {} -> {} ({})",
                relative(&op.source, &plan.root),
                relative(&op.destination, &plan.root),
                op.reason
            );
        }
        let shown = plan.operations.len().min(top);
        for op in plan.directory_operations.iter().take(top - shown) {
            println!(
                "   {}/ -> {}/",
                relative(&op.source, &plan.root),
                relative(&op.destination, &plan.root)
            );
        }
        let remaining = plan.total_operations().saturating_sub(top);
        if remaining > 0 {
            println!("   ... and {remaining} more");
        }
    }

    if !plan.errors.is_empty() {
        println!();
        println!(" {} problem(s) while planning:", plan.errors.len());
        for error in &plan.errors {
            println!("   {error}");
        }
    }
    println!();
}

fn print_validation(report: &ValidationReport) {
    for error in &report.errors {
        eprintln!("error: {error}");
    }
    for warning in &report.warnings {
        eprintln!("warning: {warning}");
    }
}

fn print_result(result: &OrganizationResult) {
    let verb = if result.dry_run { "Would move" } else { "Moved" };
    println!();
    println!(
        "{verb} {} files and {} directories",
        result.files_moved(),
        result.directories_moved.len()
    );
    if result.total_failed() > 0 {
        println!("{} operations failed:", result.total_failed());
        for failed in &result.failed {
            println!("  {}: {}", failed.operation.source.display(), failed.error);
        }
        for failed in &result.directories_failed {
            println!("  {}/: {}", failed.operation.source.display(), failed.error);
        }
    }
    if !result.directories_removed.is_empty() {
        let verb = if result.dry_run { "Would remove" } else { "Removed" };
        println!("{verb} {} empty directories", result.directories_removed.len());
    }
    if let Some(duration) = result.duration() {
        println!("Finished in {:.2}s", duration.as_secs_f64());
    }
    if let Some(log) = &result.log_file {
        println!("Undo with: shelf undo {}", log.display());
    }
}

/// A bar on stderr, hidden when stderr is not a terminal.
fn progress_bar(prefix: &'static str) -> ProgressBar {
    if !io::stderr().is_terminal() {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(0);
    let style = ProgressStyle::with_template(
        "{prefix:>10.cyan} [{bar:40.cyan/blue}] {pos}/{len} {wide_msg}",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar())
    .progress_chars("█▓░");
    bar.set_style(style);
    bar.set_prefix(prefix);
    bar
}

/// Format size in human-readable form.
fn format_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::BINARY)
}

fn relative(path: &Path, root: &Path) -> String {
    path.strip_prefix(root).unwrap_or(path).display().to_string()
}
