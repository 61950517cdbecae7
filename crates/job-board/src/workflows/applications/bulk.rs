use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::access::{AccessPolicy, Capability};
use super::domain::{ActorId, Application, ApplicationId};
use super::error::WorkflowError;
use super::export::render_csv;
use super::jobs::JobDirectory;
use super::repository::{ApplicationRepository, RepositoryError};
use super::status::ApplicationStatus;
use super::transition::StatusTransitionService;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BulkOperation {
    Delete,
    Export,
    UpdateStatus,
}

impl BulkOperation {
    pub const fn label(self) -> &'static str {
        match self {
            BulkOperation::Delete => "delete",
            BulkOperation::Export => "export",
            BulkOperation::UpdateStatus => "update_status",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkRequest {
    #[serde(default)]
    pub operation: Option<BulkOperation>,
    #[serde(default)]
    pub application_ids: Vec<ApplicationId>,
    /// Target status for `update_status`.
    #[serde(default)]
    pub status: Option<String>,
    /// Set once the user accepted [`confirmation_prompt`]; required for delete.
    #[serde(default)]
    pub confirmed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ItemOutcome {
    Applied,
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BulkItemResult {
    pub application_id: ApplicationId,
    #[serde(flatten)]
    pub outcome: ItemOutcome,
}

/// Per-item results of a best-effort batch. Each id is attempted on its own;
/// one failure never blocks the others.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BulkOutcome {
    pub operation: BulkOperation,
    pub items: Vec<BulkItemResult>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ApplicationStatus>,
    #[serde(skip)]
    pub export: Option<Vec<u8>>,
}

impl BulkOutcome {
    pub fn succeeded(&self) -> Vec<ApplicationId> {
        self.items
            .iter()
            .filter(|item| item.outcome == ItemOutcome::Applied)
            .map(|item| item.application_id)
            .collect()
    }

    pub fn failed(&self) -> Vec<&BulkItemResult> {
        self.items
            .iter()
            .filter(|item| item.outcome != ItemOutcome::Applied)
            .collect()
    }

    pub fn is_success(&self) -> bool {
        self.failed().is_empty()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BulkError {
    #[error("no applications selected")]
    NothingSelected,
    #[error("no bulk action selected")]
    NoOperation,
    #[error("{0}")]
    ConfirmationRequired(String),
    #[error("a target status is required")]
    MissingStatus,
    #[error(transparent)]
    Workflow(#[from] WorkflowError),
}

/// Count-aware confirmation shown before a destructive bulk delete.
pub fn confirmation_prompt(count: usize) -> String {
    match count {
        1 => "Delete the selected application? This cannot be undone.".to_string(),
        n => format!("Delete {n} selected applications? This cannot be undone."),
    }
}

/// Applies one operation across a selection of applications.
pub struct BulkDispatcher<R, P> {
    repository: Arc<R>,
    access: Arc<P>,
    transitions: Arc<StatusTransitionService<R, P>>,
    jobs: Arc<dyn JobDirectory>,
}

impl<R, P> BulkDispatcher<R, P>
where
    R: ApplicationRepository,
    P: AccessPolicy,
{
    pub fn new(
        repository: Arc<R>,
        access: Arc<P>,
        transitions: Arc<StatusTransitionService<R, P>>,
        jobs: Arc<dyn JobDirectory>,
    ) -> Self {
        Self {
            repository,
            access,
            transitions,
            jobs,
        }
    }

    pub fn apply(&self, request: BulkRequest, actor: ActorId) -> Result<BulkOutcome, BulkError> {
        let operation = request.operation.ok_or(BulkError::NoOperation)?;
        let ids = dedupe(&request.application_ids);
        if ids.is_empty() {
            return Err(BulkError::NothingSelected);
        }

        self.access
            .authorize(actor, Capability::ReviewApplications)
            .map_err(WorkflowError::from)?;

        let outcome = match operation {
            BulkOperation::Delete => {
                if !request.confirmed {
                    return Err(BulkError::ConfirmationRequired(confirmation_prompt(
                        ids.len(),
                    )));
                }
                self.delete_all(&ids)
            }
            BulkOperation::UpdateStatus => {
                let raw = request.status.ok_or(BulkError::MissingStatus)?;
                let status = self
                    .transitions
                    .statuses()
                    .resolve(&raw)
                    .ok_or(WorkflowError::InvalidStatus(raw))?;
                self.update_all(&ids, status, actor)
            }
            BulkOperation::Export => self.export_all(&ids)?,
        };

        info!(
            operation = operation.label(),
            %actor,
            selected = ids.len(),
            succeeded = outcome.succeeded().len(),
            "bulk operation finished"
        );
        Ok(outcome)
    }

    fn delete_all(&self, ids: &[ApplicationId]) -> BulkOutcome {
        let items = ids
            .iter()
            .map(|&id| {
                let outcome = match self.repository.delete(id) {
                    Ok(()) => ItemOutcome::Applied,
                    Err(err) => failed_item(id, err),
                };
                BulkItemResult {
                    application_id: id,
                    outcome,
                }
            })
            .collect();

        finish(BulkOperation::Delete, items, None, None, "Deleted")
    }

    fn update_all(
        &self,
        ids: &[ApplicationId],
        status: ApplicationStatus,
        actor: ActorId,
    ) -> BulkOutcome {
        let items = ids
            .iter()
            .map(|&id| {
                let outcome = match self.transitions.transition(id, status.as_str(), actor) {
                    Ok(_) => ItemOutcome::Applied,
                    Err(WorkflowError::NotFound(_)) => failed_item(id, RepositoryError::NotFound),
                    Err(err) => {
                        warn!(application_id = %id, error = %err, "bulk status update failed");
                        ItemOutcome::Failed {
                            reason: err.to_string(),
                        }
                    }
                };
                BulkItemResult {
                    application_id: id,
                    outcome,
                }
            })
            .collect();

        finish(
            BulkOperation::UpdateStatus,
            items,
            Some(status),
            None,
            "Updated",
        )
    }

    fn export_all(&self, ids: &[ApplicationId]) -> Result<BulkOutcome, BulkError> {
        let mut found: Vec<Application> = Vec::new();
        let mut items = Vec::with_capacity(ids.len());
        for &id in ids {
            let outcome = match self.repository.fetch(id) {
                Ok(Some(application)) => {
                    found.push(application);
                    ItemOutcome::Applied
                }
                Ok(None) => failed_item(id, RepositoryError::NotFound),
                Err(err) => failed_item(id, err),
            };
            items.push(BulkItemResult {
                application_id: id,
                outcome,
            });
        }

        let file = render_csv(&found, self.transitions.statuses(), self.jobs.as_ref())
            .map_err(|err| WorkflowError::Export(err.to_string()))?;

        Ok(finish(
            BulkOperation::Export,
            items,
            None,
            Some(file.csv),
            "Exported",
        ))
    }
}

fn failed_item(id: ApplicationId, error: RepositoryError) -> ItemOutcome {
    let reason = match error {
        RepositoryError::NotFound => "not found".to_string(),
        other => {
            warn!(application_id = %id, error = %other, "bulk item failed");
            other.to_string()
        }
    };
    ItemOutcome::Failed { reason }
}

fn finish(
    operation: BulkOperation,
    items: Vec<BulkItemResult>,
    status: Option<ApplicationStatus>,
    export: Option<Vec<u8>>,
    verb: &str,
) -> BulkOutcome {
    let total = items.len();
    let applied = items
        .iter()
        .filter(|item| item.outcome == ItemOutcome::Applied)
        .count();
    let noun = if total == 1 {
        "application"
    } else {
        "applications"
    };
    let message = if applied == total {
        format!("{verb} {total} {noun}.")
    } else {
        format!("{verb} {applied} of {total} {noun}; {} failed.", total - applied)
    };

    BulkOutcome {
        operation,
        items,
        message,
        status,
        export,
    }
}

fn dedupe(ids: &[ApplicationId]) -> Vec<ApplicationId> {
    let mut seen = HashSet::new();
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}
