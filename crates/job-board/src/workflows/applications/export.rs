use std::io::Write;

use chrono::{DateTime, Utc};

use super::details::DELETED_JOB_TITLE;
use super::domain::{Application, ApplicationId};
use super::jobs::JobDirectory;
use super::repository::ApplicationFilter;
use super::status::StatusSet;

pub const EXPORT_HEADER: [&str; 8] = [
    "ID",
    "Job",
    "Applicant Name",
    "Email",
    "Phone",
    "Status",
    "Submitted",
    "Updated",
];

pub const EXPORT_ACTION: &str = "export_applications";

/// Rendered CSV plus the number of data rows it holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFile {
    pub rows: usize,
    pub csv: Vec<u8>,
}

pub(crate) fn render_csv(
    applications: &[Application],
    statuses: &StatusSet,
    jobs: &dyn JobDirectory,
) -> Result<ExportFile, csv::Error> {
    let mut csv = Vec::new();
    let rows = write_csv(&mut csv, applications, statuses, jobs)?;
    Ok(ExportFile { rows, csv })
}

/// Write applications as CSV and return the number of data rows. The header
/// row is always present, so an empty selection still yields a valid file.
pub fn write_csv<W: Write>(
    writer: W,
    applications: &[Application],
    statuses: &StatusSet,
    jobs: &dyn JobDirectory,
) -> Result<usize, csv::Error> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(EXPORT_HEADER)?;

    let mut rows = 0;
    for application in applications {
        let job_title = jobs
            .posting(application.job_id)
            .map(|posting| posting.title)
            .unwrap_or_else(|| DELETED_JOB_TITLE.to_string());

        csv_writer.write_record([
            application.id.to_string(),
            job_title,
            application.applicant_name.clone(),
            application.applicant_email.clone(),
            application.phone.clone().unwrap_or_default(),
            statuses.label_for(&application.status),
            format_export_time(application.created_date),
            format_export_time(application.updated_date),
        ])?;
        rows += 1;
    }

    csv_writer.flush()?;
    Ok(rows)
}

pub fn export_filename(now: DateTime<Utc>) -> String {
    format!("applications-{}.csv", now.format("%Y-%m-%d"))
}

/// Download link for the current list filter, or for the checked rows when
/// `selection` is non-empty (the selection then replaces the filter). The
/// browser follows it directly, so no completion callback reaches the page.
pub fn export_link(
    base_url: &str,
    filter: &ApplicationFilter,
    selection: &[ApplicationId],
    nonce: &str,
) -> String {
    let mut params: Vec<(&str, String)> = vec![
        ("action", EXPORT_ACTION.to_string()),
        ("nonce", nonce.to_string()),
    ];
    if !selection.is_empty() {
        let ids = selection
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");
        params.push(("application_ids", ids));
        return join_link(base_url, &params);
    }
    if let Some(status) = &filter.status {
        params.push(("status", status.clone()));
    }
    if let Some(job_id) = filter.job_id {
        params.push(("job_id", job_id.to_string()));
    }
    if let Some(search) = &filter.search {
        params.push(("search", search.clone()));
    }
    if let Some(from) = filter.submitted_from {
        params.push(("submitted_from", from.format("%Y-%m-%d").to_string()));
    }
    if let Some(to) = filter.submitted_to {
        params.push(("submitted_to", to.format("%Y-%m-%d").to_string()));
    }

    join_link(base_url, &params)
}

fn join_link(base_url: &str, params: &[(&str, String)]) -> String {
    let query = params
        .iter()
        .map(|(key, value)| format!("{key}={}", urlencoding::encode(value)))
        .collect::<Vec<_>>()
        .join("&");
    let separator = if base_url.contains('?') { '&' } else { '?' };
    format!("{base_url}{separator}{query}")
}

fn format_export_time(value: DateTime<Utc>) -> String {
    value.format("%Y-%m-%d %H:%M:%S").to_string()
}
