use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::info;

use super::access::{AccessPolicy, Capability};
use super::clock::Clock;
use super::domain::{ActorId, ApplicationId};
use super::error::WorkflowError;
use super::repository::ApplicationRepository;
use super::status::{ApplicationStatus, StatusSet};

/// Result of an accepted status change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransitionReceipt {
    pub application_id: ApplicationId,
    pub accepted_status: ApplicationStatus,
    pub status_label: String,
    pub updated_at: DateTime<Utc>,
}

/// Validates and applies a status change to one application.
///
/// Any configured status may follow any other. A same-status call is still a
/// write and refreshes `updated_date`.
pub struct StatusTransitionService<R, P> {
    repository: Arc<R>,
    access: Arc<P>,
    statuses: Arc<StatusSet>,
    clock: Arc<dyn Clock>,
}

impl<R, P> StatusTransitionService<R, P>
where
    R: ApplicationRepository,
    P: AccessPolicy,
{
    pub fn new(
        repository: Arc<R>,
        access: Arc<P>,
        statuses: Arc<StatusSet>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repository,
            access,
            statuses,
            clock,
        }
    }

    pub fn statuses(&self) -> &StatusSet {
        &self.statuses
    }

    pub fn transition(
        &self,
        application_id: ApplicationId,
        new_status: &str,
        actor: ActorId,
    ) -> Result<TransitionReceipt, WorkflowError> {
        self.access
            .authorize(actor, Capability::ReviewApplications)?;

        let status = self
            .statuses
            .resolve(new_status)
            .ok_or_else(|| WorkflowError::InvalidStatus(new_status.to_string()))?;

        let current = self
            .repository
            .fetch(application_id)?
            .ok_or(WorkflowError::NotFound(application_id))?;

        let updated_at = next_update_time(self.clock.now(), current.updated_date);
        let stored = self
            .repository
            .update_status(application_id, &status, updated_at)
            .map_err(|err| WorkflowError::from_repository(application_id, err))?;

        info!(
            application_id = %application_id,
            %actor,
            from = %current.status,
            to = %stored.status,
            "application status updated"
        );

        Ok(TransitionReceipt {
            application_id,
            status_label: self.statuses.label_for(&stored.status),
            accepted_status: stored.status,
            updated_at: stored.updated_date,
        })
    }
}

/// `updated_date` only ever moves forward, even when the clock has not ticked
/// since the previous write.
fn next_update_time(now: DateTime<Utc>, previous: DateTime<Utc>) -> DateTime<Utc> {
    if now > previous {
        now
    } else {
        previous + Duration::microseconds(1)
    }
}
