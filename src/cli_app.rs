//! Top-level CLI definition and dispatch.
//!
//! The CLI is a thin transport over [`AnalysisService`]; every subcommand
//! maps 1:1 onto one core operation.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use colored::{Colorize, control};

use codeshape::core::config::Config;
use codeshape::core::errors::Result;
use codeshape::service::{AnalysisService, AnalyzeRequest};
use codeshape::store::records::{AnalysisRecord, ProjectSettings};

/// Codebase shape analyzer — score file-size distribution, keep history.
#[derive(Debug, Parser)]
#[command(
    name = "codeshape",
    author,
    version,
    about = "Codebase shape analyzer",
    long_about = None,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Override config file path.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Override the data root for persisted analyses.
    #[arg(long, global = true, value_name = "PATH")]
    data_dir: Option<PathBuf>,
    /// Force JSON output mode.
    #[arg(long, global = true)]
    json: bool,
    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Analyze a directory and persist the snapshot.
    Analyze(AnalyzeArgs),
    /// Show the full analysis history of a project.
    History(ProjectArgs),
    /// Show the most recent analysis of a project.
    Latest(ProjectArgs),
    /// List all known projects.
    Projects,
    /// Show or replace a project's ignore-pattern overrides.
    Patterns(PatternsArgs),
    /// Show or update a project's settings.
    Settings(SettingsArgs),
}

#[derive(Debug, Clone, Args)]
struct AnalyzeArgs {
    /// Directory to analyze.
    path: PathBuf,
    /// Display name (defaults to the directory name).
    #[arg(long, value_name = "NAME")]
    name: Option<String>,
    /// Extra ignore pattern (repeatable); overrides stored project patterns.
    #[arg(long = "ignore", value_name = "PATTERN")]
    ignore_patterns: Vec<String>,
    /// Keep only the N largest files in the snapshot (0 = unlimited).
    #[arg(long, default_value_t = 100, value_name = "N")]
    max_files: usize,
    /// Persist the --ignore patterns as the project's overrides.
    #[arg(long)]
    save_patterns: bool,
}

#[derive(Debug, Clone, Args)]
struct ProjectArgs {
    /// Project identifier (see `codeshape projects`).
    project_id: String,
}

#[derive(Debug, Clone, Args)]
struct PatternsArgs {
    #[command(subcommand)]
    action: PatternsAction,
}

#[derive(Debug, Clone, Subcommand)]
enum PatternsAction {
    /// Print the stored overrides.
    Get(ProjectArgs),
    /// Replace the stored overrides.
    Set {
        /// Project identifier.
        project_id: String,
        /// New pattern list (replaces the old one).
        patterns: Vec<String>,
    },
}

#[derive(Debug, Clone, Args)]
struct SettingsArgs {
    #[command(subcommand)]
    action: SettingsAction,
}

#[derive(Debug, Clone, Subcommand)]
enum SettingsAction {
    /// Print the project settings.
    Get(ProjectArgs),
    /// Update the project settings.
    Set {
        /// Project identifier.
        project_id: String,
        /// Line-count threshold for the quadratic penalty.
        #[arg(long)]
        threshold: i64,
    },
}

/// Dispatch one parsed invocation.
pub fn run(cli: &Cli) -> Result<()> {
    if cli.no_color {
        control::set_override(false);
    }

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(dir) = &cli.data_dir {
        config.storage.data_dir.clone_from(dir);
    }
    let service = AnalysisService::new(config);

    match &cli.command {
        Command::Analyze(args) => {
            let request = AnalyzeRequest {
                path: args.path.clone(),
                name: args.name.clone(),
                ignore_patterns: if args.ignore_patterns.is_empty() {
                    None
                } else {
                    Some(args.ignore_patterns.clone())
                },
                max_files: (args.max_files > 0).then_some(args.max_files),
                save_ignore_patterns: args.save_patterns,
            };
            let record = service.analyze(&request)?;
            if cli.json {
                print_json(&record)?;
            } else {
                print_record(&record, 10);
            }
        }
        Command::History(args) => {
            let records = service.history(&args.project_id)?;
            if cli.json {
                print_json(&records)?;
            } else {
                println!(
                    "{} ({} runs)",
                    format!("history for {}", args.project_id).bold(),
                    records.len()
                );
                for record in &records {
                    println!(
                        "  {}  files {:>5}  lines {:>8}  score {}",
                        record.timestamp,
                        record.total_files,
                        record.total_lines,
                        format_score(record.shape_score)
                    );
                }
            }
        }
        Command::Latest(args) => {
            let record = service.latest(&args.project_id)?;
            if cli.json {
                print_json(&record)?;
            } else {
                print_record(&record, 10);
            }
        }
        Command::Projects => {
            let projects = service.list_projects()?;
            if cli.json {
                print_json(&projects)?;
            } else if projects.is_empty() {
                println!("no projects analyzed yet");
            } else {
                for meta in &projects {
                    println!(
                        "{}  {}  {} runs  last {}",
                        meta.id.cyan(),
                        meta.name.bold(),
                        meta.analysis_count,
                        meta.last_analyzed
                    );
                }
            }
        }
        Command::Patterns(args) => match &args.action {
            PatternsAction::Get(project) => {
                let patterns = service.ignore_patterns(&project.project_id)?;
                if cli.json {
                    print_json(&patterns)?;
                } else if patterns.is_empty() {
                    println!("no overrides (built-in defaults apply)");
                } else {
                    for pattern in &patterns {
                        println!("{pattern}");
                    }
                }
            }
            PatternsAction::Set {
                project_id,
                patterns,
            } => {
                service.set_ignore_patterns(project_id, patterns)?;
                if cli.json {
                    print_json(&patterns)?;
                } else {
                    println!("stored {} pattern(s) for {project_id}", patterns.len());
                }
            }
        },
        Command::Settings(args) => match &args.action {
            SettingsAction::Get(project) => {
                let settings = service.settings(&project.project_id)?;
                if cli.json {
                    print_json(&settings)?;
                } else {
                    println!("threshold = {}", settings.threshold);
                }
            }
            SettingsAction::Set {
                project_id,
                threshold,
            } => {
                let settings = ProjectSettings {
                    threshold: *threshold,
                };
                service.set_settings(project_id, &settings)?;
                if cli.json {
                    print_json(&settings)?;
                } else {
                    println!("threshold for {project_id} set to {threshold}");
                }
            }
        },
    }

    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let pretty = serde_json::to_string_pretty(value)
        .map_err(codeshape::core::errors::ShapeError::from)?;
    println!("{pretty}");
    Ok(())
}

fn print_record(record: &AnalysisRecord, top: usize) {
    println!(
        "{} {} ({})",
        record.name.bold(),
        record.id.cyan(),
        record.timestamp
    );
    println!("  path:    {}", record.path);
    println!(
        "  files:   {}   lines: {}   avg: {}",
        record.total_files, record.total_lines, record.average_lines
    );
    println!("  score:   {}", format_score(record.shape_score));

    if !record.files.is_empty() {
        println!("  largest files:");
        for file in record.files.iter().take(top) {
            println!("    {:>7}  {}", file.lines, file.path);
        }
        if record.files.len() > top {
            println!("    ... and {} more", record.files.len() - top);
        }
    }
}

fn format_score(score: Option<f64>) -> String {
    score.map_or_else(
        || "-".dimmed().to_string(),
        |s| {
            if s >= 1000.0 {
                format!("{s:.2}").red().to_string()
            } else if s >= 300.0 {
                format!("{s:.2}").yellow().to_string()
            } else {
                format!("{s:.2}").green().to_string()
            }
        },
    )
}
