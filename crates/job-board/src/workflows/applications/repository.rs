use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{Application, ApplicationId, JobId, NewApplication, NewNote, Note};
use super::status::ApplicationStatus;

/// Storage abstraction so the services can be exercised in isolation.
///
/// Every mutation touches a single application row (plus its notes on
/// delete). Concurrent writers follow last-write-wins.
pub trait ApplicationRepository: Send + Sync {
    fn insert(&self, application: NewApplication) -> Result<Application, RepositoryError>;
    fn fetch(&self, id: ApplicationId) -> Result<Option<Application>, RepositoryError>;
    fn update_status(
        &self,
        id: ApplicationId,
        status: &ApplicationStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<Application, RepositoryError>;
    /// Remove the application and, by cascade, its notes.
    fn delete(&self, id: ApplicationId) -> Result<(), RepositoryError>;
    /// Matching applications, newest submission first.
    fn list(&self, filter: &ApplicationFilter) -> Result<Vec<Application>, RepositoryError>;
    fn insert_note(&self, note: NewNote) -> Result<Note, RepositoryError>;
    /// Notes for one application, oldest first.
    fn notes(&self, id: ApplicationId) -> Result<Vec<Note>, RepositoryError>;
    fn note_count(&self, id: ApplicationId) -> Result<usize, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("stored record is unreadable: {0}")]
    Corrupt(String),
}

/// Query shared by the list view, the board and CSV export.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<JobId>,
    /// Case-insensitive substring over applicant name and email.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitted_from: Option<NaiveDate>,
    /// Inclusive calendar day.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitted_to: Option<NaiveDate>,
}

impl ApplicationFilter {
    /// Treat blank text parameters (e.g. `status=` from a form) as absent.
    pub fn normalized(mut self) -> Self {
        self.status = non_blank(self.status);
        self.search = non_blank(self.search);
        self
    }

    pub fn matches(&self, application: &Application) -> bool {
        if let Some(status) = self.status.as_deref() {
            if application.status.as_str() != status {
                return false;
            }
        }
        if let Some(job_id) = self.job_id {
            if application.job_id != job_id {
                return false;
            }
        }
        if let Some(search) = self.search.as_deref() {
            let needle = search.to_lowercase();
            if !application.applicant_name.to_lowercase().contains(&needle)
                && !application.applicant_email.to_lowercase().contains(&needle)
            {
                return false;
            }
        }
        let submitted_on = application.created_date.date_naive();
        if let Some(from) = self.submitted_from {
            if submitted_on < from {
                return false;
            }
        }
        if let Some(to) = self.submitted_to {
            if submitted_on > to {
                return false;
            }
        }
        true
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
