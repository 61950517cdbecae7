use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use super::access::{AccessPolicy, Capability};
use super::clock::Clock;
use super::domain::{ActorId, ApplicationId, NewNote, Note, NoteId};
use super::error::WorkflowError;
use super::repository::ApplicationRepository;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NoteReceipt {
    pub note_id: NoteId,
    pub created_at: DateTime<Utc>,
    /// Notes on the application after this append, for badge display.
    pub note_count: usize,
}

/// Append-only reviewer notes.
pub struct NoteLog<R, P> {
    repository: Arc<R>,
    access: Arc<P>,
    clock: Arc<dyn Clock>,
}

impl<R, P> NoteLog<R, P>
where
    R: ApplicationRepository,
    P: AccessPolicy,
{
    pub fn new(repository: Arc<R>, access: Arc<P>, clock: Arc<dyn Clock>) -> Self {
        Self {
            repository,
            access,
            clock,
        }
    }

    pub fn add_note(
        &self,
        application_id: ApplicationId,
        author: ActorId,
        text: &str,
    ) -> Result<NoteReceipt, WorkflowError> {
        self.access
            .authorize(author, Capability::ReviewApplications)?;

        let text = text.trim();
        if text.is_empty() {
            return Err(WorkflowError::EmptyNote);
        }

        let note = self
            .repository
            .insert_note(NewNote {
                application_id,
                author_id: author,
                note_text: text.to_string(),
                created_at: self.clock.now(),
            })
            .map_err(|err| WorkflowError::from_repository(application_id, err))?;
        let note_count = self.repository.note_count(application_id)?;

        info!(%application_id, %author, note_count, "note added");

        Ok(NoteReceipt {
            note_id: note.id,
            created_at: note.created_date,
            note_count,
        })
    }

    pub fn notes(&self, application_id: ApplicationId) -> Result<Vec<Note>, WorkflowError> {
        Ok(self.repository.notes(application_id)?)
    }
}
