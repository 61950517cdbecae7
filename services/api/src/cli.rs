use crate::commands::{run_board, run_export, run_init_db, BoardArgs, ExportArgs, InitDbArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use job_board::error::AppError;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "Job Board Review Desk",
    about = "Serve and administer the job application review desk",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Create the application tables if they do not exist yet
    InitDb(InitDbArgs),
    /// Write matching applications as CSV
    Export(ExportArgs),
    /// Print the status board with per-column counts
    Board(BoardArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Override the configured SQLite database path
    #[arg(long)]
    pub(crate) database: Option<PathBuf>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::InitDb(args) => run_init_db(args),
        Command::Export(args) => run_export(args),
        Command::Board(args) => run_board(args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn export_flags_parse() {
        let cli = Cli::try_parse_from([
            "job-board-api",
            "export",
            "--status",
            "interview",
            "--job-id",
            "12",
            "--submitted-from",
            "2025-10-01",
            "--output",
            "out.csv",
        ])
        .expect("flags parse");

        match cli.command {
            Some(Command::Export(args)) => {
                assert_eq!(args.filter.status.as_deref(), Some("interview"));
                assert_eq!(args.filter.job_id, Some(12));
                assert_eq!(args.output, Some(PathBuf::from("out.csv")));
                assert!(args.filter.submitted_from.is_some());
            }
            other => panic!("expected export command, got {other:?}"),
        }
    }

    #[test]
    fn serve_is_the_default_command() {
        let cli = Cli::try_parse_from(["job-board-api"]).expect("parses");
        assert!(cli.command.is_none());
    }
}
