use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use super::domain::{Application, ApplicationId, JobId, Note};
use super::jobs::JobDirectory;
use super::status::{humanize_key, ApplicationStatus, StatusSet};

pub(crate) const DELETED_JOB_TITLE: &str = "(deleted job)";

/// Reviewer-facing detail payload for the modal / side panel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApplicationDetails {
    pub application_id: ApplicationId,
    pub job_id: JobId,
    pub applicant_name: String,
    pub applicant_email: String,
    pub phone: Option<String>,
    pub job_title: String,
    pub job_url: Option<String>,
    pub status: ApplicationStatus,
    pub status_label: String,
    pub created_date: DateTime<Utc>,
    pub updated_date: DateTime<Utc>,
    pub formatted_data: Vec<FormattedField>,
    pub notes: Vec<Note>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormattedField {
    pub label: String,
    pub value: String,
}

impl ApplicationDetails {
    pub fn build(
        application: Application,
        notes: Vec<Note>,
        statuses: &StatusSet,
        jobs: &dyn JobDirectory,
    ) -> Self {
        let (job_title, job_url) = match jobs.posting(application.job_id) {
            Some(posting) => (posting.title, posting.url),
            None => (DELETED_JOB_TITLE.to_string(), None),
        };

        Self {
            application_id: application.id,
            job_id: application.job_id,
            formatted_data: format_application_data(&application.application_data),
            status_label: statuses.label_for(&application.status),
            applicant_name: application.applicant_name,
            applicant_email: application.applicant_email,
            phone: application.phone,
            job_title,
            job_url,
            status: application.status,
            created_date: application.created_date,
            updated_date: application.updated_date,
            notes,
        }
    }
}

/// Flatten the submitted form blob into label/value rows. Non-object blobs
/// render as a single `Details` row.
pub fn format_application_data(data: &Value) -> Vec<FormattedField> {
    match data {
        Value::Object(fields) => fields
            .iter()
            .filter_map(|(key, value)| {
                render_value(value).map(|value| FormattedField {
                    label: humanize_key(key),
                    value,
                })
            })
            .collect(),
        other => render_value(other)
            .map(|value| {
                vec![FormattedField {
                    label: "Details".to_string(),
                    value,
                }]
            })
            .unwrap_or_default(),
    }
}

fn render_value(value: &Value) -> Option<String> {
    let rendered = match value {
        Value::Null => return None,
        Value::Bool(true) => "Yes".to_string(),
        Value::Bool(false) => "No".to_string(),
        Value::Number(number) => number.to_string(),
        Value::String(text) => text.trim().to_string(),
        Value::Array(items) => items
            .iter()
            .filter_map(render_value)
            .collect::<Vec<_>>()
            .join(", "),
        Value::Object(_) => value.to_string(),
    };
    if rendered.is_empty() {
        None
    } else {
        Some(rendered)
    }
}
