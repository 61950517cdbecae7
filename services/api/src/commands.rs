//! One-shot administrative commands run against the configured database.

use crate::infra::{build_desk, cli_actor, parse_date};
use chrono::NaiveDate;
use clap::Args;
use job_board::config::AppConfig;
use job_board::error::AppError;
use job_board::workflows::applications::{
    ApplicationBoard, ApplicationFilter, JobId, SqliteApplicationRepository,
};
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Args, Debug, Default)]
pub(crate) struct InitDbArgs {
    /// Database to initialize (defaults to APP_DATABASE_PATH)
    #[arg(long)]
    pub(crate) database: Option<PathBuf>,
}

/// Filter flags shared by `export` and `board`.
#[derive(Args, Debug, Default)]
pub(crate) struct FilterArgs {
    /// Only applications in this status
    #[arg(long)]
    pub(crate) status: Option<String>,
    /// Only applications for this job posting
    #[arg(long)]
    pub(crate) job_id: Option<u64>,
    /// Case-insensitive match on applicant name or email
    #[arg(long)]
    pub(crate) search: Option<String>,
    /// Earliest submission day (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub(crate) submitted_from: Option<NaiveDate>,
    /// Latest submission day, inclusive (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub(crate) submitted_to: Option<NaiveDate>,
}

impl FilterArgs {
    fn into_filter(self) -> ApplicationFilter {
        ApplicationFilter {
            status: self.status,
            job_id: self.job_id.map(JobId),
            search: self.search,
            submitted_from: self.submitted_from,
            submitted_to: self.submitted_to,
        }
        .normalized()
    }
}

#[derive(Args, Debug, Default)]
pub(crate) struct ExportArgs {
    #[command(flatten)]
    pub(crate) filter: FilterArgs,
    /// Write the CSV here instead of stdout
    #[arg(long)]
    pub(crate) output: Option<PathBuf>,
    /// Reviewer id to export as (defaults to the first configured reviewer)
    #[arg(long)]
    pub(crate) actor: Option<u64>,
    /// Override the configured SQLite database path
    #[arg(long)]
    pub(crate) database: Option<PathBuf>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct BoardArgs {
    #[command(flatten)]
    pub(crate) filter: FilterArgs,
    /// Reviewer id to read as (defaults to the first configured reviewer)
    #[arg(long)]
    pub(crate) actor: Option<u64>,
    /// Override the configured SQLite database path
    #[arg(long)]
    pub(crate) database: Option<PathBuf>,
    /// List every card under its column
    #[arg(long)]
    pub(crate) cards: bool,
}

pub(crate) fn run_init_db(args: InitDbArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let path = args
        .database
        .unwrap_or_else(|| config.storage.database_path.clone());
    SqliteApplicationRepository::open(&path)?;
    println!("Application tables ready in {}", path.display());
    Ok(())
}

pub(crate) fn run_export(args: ExportArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let actor = cli_actor(&config, args.actor);
    let desk = build_desk(&config, args.database)?;
    let file = desk.export(&args.filter.into_filter(), actor)?;

    match args.output {
        Some(path) => {
            std::fs::write(&path, &file.csv)?;
            println!("{}", export_summary(file.rows, &path));
        }
        None => std::io::stdout().write_all(&file.csv)?,
    }
    Ok(())
}

fn export_summary(rows: usize, path: &Path) -> String {
    let noun = if rows == 1 { "application" } else { "applications" };
    format!("Exported {rows} {noun} to {}", path.display())
}

pub(crate) fn run_board(args: BoardArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let actor = cli_actor(&config, args.actor);
    let desk = build_desk(&config, args.database)?;
    let board = desk.board(&args.filter.into_filter(), actor)?;
    print!("{}", render_board(&board, args.cards));
    Ok(())
}

fn render_board(board: &ApplicationBoard, include_cards: bool) -> String {
    let mut out = String::from("Application board\n");
    for column in board.columns() {
        out.push_str(&format!("- {} ({})\n", column.label, column.count));
        if !include_cards {
            continue;
        }
        if column.shows_placeholder() {
            out.push_str("    no applications\n");
        }
        for card in &column.cards {
            out.push_str(&format!(
                "    #{} {} | {} | submitted {}\n",
                card.application_id,
                card.applicant_name,
                card.job_title,
                card.submitted.format("%Y-%m-%d %H:%M")
            ));
        }
    }
    out
}
