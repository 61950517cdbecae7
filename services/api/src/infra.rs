use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use job_board::config::AppConfig;
use job_board::error::AppError;
use job_board::workflows::applications::{
    ActorId, ApplicationDesk, InMemoryJobDirectory, ReviewerRoster, SqliteApplicationRepository,
    SystemClock,
};
use tracing::{info, warn};

pub(crate) type Desk = ApplicationDesk<SqliteApplicationRepository, ReviewerRoster>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Wire the review desk from configuration. `database` overrides the
/// configured SQLite path.
pub(crate) fn build_desk(
    config: &AppConfig,
    database: Option<PathBuf>,
) -> Result<Arc<Desk>, AppError> {
    let database = database.unwrap_or_else(|| config.storage.database_path.clone());
    let repository = Arc::new(SqliteApplicationRepository::open(&database)?);
    let jobs = load_jobs(config)?;
    let roster = Arc::new(ReviewerRoster::new(
        config.access.reviewers.iter().copied(),
        config.access.nonce_secret.clone(),
    ));

    info!(
        database = %database.display(),
        postings = jobs.len(),
        statuses = config.workflow.statuses.len(),
        "review desk assembled"
    );

    Ok(Arc::new(ApplicationDesk::new(
        repository,
        roster,
        Arc::new(jobs),
        config.workflow.statuses.clone(),
        Arc::new(SystemClock),
    )))
}

fn load_jobs(config: &AppConfig) -> Result<InMemoryJobDirectory, AppError> {
    match &config.storage.job_catalog {
        Some(path) => Ok(InMemoryJobDirectory::from_path(path)?),
        None => {
            warn!("APP_JOB_CATALOG not set; submissions will be rejected as unknown jobs");
            Ok(InMemoryJobDirectory::default())
        }
    }
}

/// Command-line actor: explicit id, else the first configured reviewer.
pub(crate) fn cli_actor(config: &AppConfig, explicit: Option<u64>) -> ActorId {
    explicit
        .map(ActorId)
        .or_else(|| config.access.reviewers.first().copied())
        .unwrap_or(ActorId::ANONYMOUS)
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_date_accepts_iso_days() {
        assert_eq!(
            parse_date(" 2025-10-01 "),
            Ok(NaiveDate::from_ymd_opt(2025, 10, 1).expect("valid date"))
        );
        assert!(parse_date("10/01/2025").is_err());
    }
}
