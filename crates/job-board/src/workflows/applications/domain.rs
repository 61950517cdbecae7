use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::status::ApplicationStatus;

/// Identifier assigned by the store when an application is persisted.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ApplicationId(pub u64);

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Reference to a job posting owned by the content platform.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct JobId(pub u64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct NoteId(pub u64);

/// Platform user performing an action. `0` is an anonymous visitor.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ActorId(pub u64);

impl ActorId {
    pub const ANONYMOUS: ActorId = ActorId(0);
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A candidate's submission against one job posting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,
    pub job_id: JobId,
    pub applicant_name: String,
    pub applicant_email: String,
    pub phone: Option<String>,
    /// Submitted form fields; the form definition owns their shape.
    pub application_data: Value,
    pub status: ApplicationStatus,
    pub created_date: DateTime<Utc>,
    pub updated_date: DateTime<Utc>,
}

/// Insert payload handed to the repository, which assigns the identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct NewApplication {
    pub job_id: JobId,
    pub applicant_name: String,
    pub applicant_email: String,
    pub phone: Option<String>,
    pub application_data: Value,
    pub status: ApplicationStatus,
    pub submitted_at: DateTime<Utc>,
}

/// Author-attributed annotation on an application. Never edited once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    pub application_id: ApplicationId,
    pub author_id: ActorId,
    pub note_text: String,
    pub created_date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNote {
    pub application_id: ApplicationId,
    pub author_id: ActorId,
    pub note_text: String,
    pub created_at: DateTime<Utc>,
}

/// Public application form payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationSubmission {
    pub job_id: JobId,
    pub applicant_name: String,
    pub applicant_email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub application_data: Value,
}
