use std::sync::Arc;

use tracing::info;

use super::access::{AccessPolicy, Capability};
use super::board::ApplicationBoard;
use super::bulk::{BulkDispatcher, BulkError, BulkOutcome, BulkRequest};
use super::clock::Clock;
use super::details::ApplicationDetails;
use super::domain::{ActorId, Application, ApplicationId, ApplicationSubmission, NewApplication};
use super::error::WorkflowError;
use super::export::{render_csv, ExportFile};
use super::jobs::JobDirectory;
use super::notes::{NoteLog, NoteReceipt};
use super::repository::{ApplicationFilter, ApplicationRepository};
use super::status::StatusSet;
use super::transition::{StatusTransitionService, TransitionReceipt};

/// Reviewer-facing facade composing the store, transition service, note log
/// and bulk dispatcher. Every collaborator is passed in explicitly.
pub struct ApplicationDesk<R, P> {
    repository: Arc<R>,
    access: Arc<P>,
    jobs: Arc<dyn JobDirectory>,
    statuses: Arc<StatusSet>,
    clock: Arc<dyn Clock>,
    transitions: Arc<StatusTransitionService<R, P>>,
    notes: NoteLog<R, P>,
    bulk: BulkDispatcher<R, P>,
}

impl<R, P> ApplicationDesk<R, P>
where
    R: ApplicationRepository + 'static,
    P: AccessPolicy + 'static,
{
    pub fn new(
        repository: Arc<R>,
        access: Arc<P>,
        jobs: Arc<dyn JobDirectory>,
        statuses: StatusSet,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let statuses = Arc::new(statuses);
        let transitions = Arc::new(StatusTransitionService::new(
            repository.clone(),
            access.clone(),
            statuses.clone(),
            clock.clone(),
        ));
        let notes = NoteLog::new(repository.clone(), access.clone(), clock.clone());
        let bulk = BulkDispatcher::new(
            repository.clone(),
            access.clone(),
            transitions.clone(),
            jobs.clone(),
        );

        Self {
            repository,
            access,
            jobs,
            statuses,
            clock,
            transitions,
            notes,
            bulk,
        }
    }

    pub fn statuses(&self) -> &StatusSet {
        &self.statuses
    }

    pub fn access(&self) -> &P {
        &self.access
    }

    pub fn transitions(&self) -> &StatusTransitionService<R, P> {
        &self.transitions
    }

    pub fn jobs(&self) -> &dyn JobDirectory {
        self.jobs.as_ref()
    }

    /// Accept a public form submission in the initial status.
    pub fn submit(&self, submission: ApplicationSubmission) -> Result<Application, WorkflowError> {
        let applicant_name = submission.applicant_name.trim().to_string();
        let applicant_email = submission.applicant_email.trim().to_string();
        if applicant_name.is_empty() {
            return Err(WorkflowError::InvalidSubmission(
                "applicant name is required".to_string(),
            ));
        }
        if !is_plausible_email(&applicant_email) {
            return Err(WorkflowError::InvalidSubmission(format!(
                "'{applicant_email}' is not a valid email address"
            )));
        }
        if self.jobs.posting(submission.job_id).is_none() {
            return Err(WorkflowError::UnknownJob(submission.job_id));
        }

        let phone = submission
            .phone
            .map(|phone| phone.trim().to_string())
            .filter(|phone| !phone.is_empty());

        let application = self.repository.insert(NewApplication {
            job_id: submission.job_id,
            applicant_name,
            applicant_email,
            phone,
            application_data: submission.application_data,
            status: self.statuses.initial(),
            submitted_at: self.clock.now(),
        })?;

        info!(
            application_id = %application.id,
            job_id = %application.job_id,
            "application submitted"
        );
        Ok(application)
    }

    pub fn transition(
        &self,
        application_id: ApplicationId,
        new_status: &str,
        actor: ActorId,
    ) -> Result<TransitionReceipt, WorkflowError> {
        self.transitions.transition(application_id, new_status, actor)
    }

    pub fn add_note(
        &self,
        application_id: ApplicationId,
        author: ActorId,
        text: &str,
    ) -> Result<NoteReceipt, WorkflowError> {
        self.notes.add_note(application_id, author, text)
    }

    pub fn details(
        &self,
        application_id: ApplicationId,
        actor: ActorId,
    ) -> Result<ApplicationDetails, WorkflowError> {
        self.authorize(actor)?;
        let application = self
            .repository
            .fetch(application_id)?
            .ok_or(WorkflowError::NotFound(application_id))?;
        let notes = self.notes.notes(application_id)?;

        Ok(ApplicationDetails::build(
            application,
            notes,
            &self.statuses,
            self.jobs.as_ref(),
        ))
    }

    pub fn delete(&self, application_id: ApplicationId, actor: ActorId) -> Result<(), WorkflowError> {
        self.authorize(actor)?;
        self.repository
            .delete(application_id)
            .map_err(|err| WorkflowError::from_repository(application_id, err))?;
        info!(%application_id, %actor, "application deleted");
        Ok(())
    }

    pub fn bulk_apply(&self, request: BulkRequest, actor: ActorId) -> Result<BulkOutcome, BulkError> {
        self.bulk.apply(request, actor)
    }

    pub fn list(
        &self,
        filter: &ApplicationFilter,
        actor: ActorId,
    ) -> Result<Vec<Application>, WorkflowError> {
        self.authorize(actor)?;
        Ok(self.repository.list(filter)?)
    }

    pub fn board(
        &self,
        filter: &ApplicationFilter,
        actor: ActorId,
    ) -> Result<ApplicationBoard, WorkflowError> {
        let applications = self.list(filter, actor)?;
        Ok(ApplicationBoard::from_applications(
            &self.statuses,
            &applications,
            self.jobs.as_ref(),
        ))
    }

    /// CSV for every application matching `filter`.
    pub fn export(
        &self,
        filter: &ApplicationFilter,
        actor: ActorId,
    ) -> Result<ExportFile, WorkflowError> {
        let applications = self.list(filter, actor)?;
        let file = render_csv(&applications, &self.statuses, self.jobs.as_ref())
            .map_err(|err| WorkflowError::Export(err.to_string()))?;
        info!(%actor, rows = file.rows, "applications exported");
        Ok(file)
    }

    fn authorize(&self, actor: ActorId) -> Result<(), WorkflowError> {
        self.access
            .authorize(actor, Capability::ReviewApplications)
            .map_err(WorkflowError::from)
    }
}

fn is_plausible_email(value: &str) -> bool {
    match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && !domain.is_empty() && !value.contains(char::is_whitespace)
        }
        None => false,
    }
}
