use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use super::domain::{Application, ApplicationId, NewApplication, NewNote, Note, NoteId};
use super::repository::{ApplicationFilter, ApplicationRepository, RepositoryError};
use super::status::ApplicationStatus;

/// Process-local store used by tests and the CLI walkthrough.
#[derive(Default)]
pub struct InMemoryApplicationRepository {
    state: Mutex<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    last_application_id: u64,
    last_note_id: u64,
    applications: BTreeMap<ApplicationId, Application>,
    notes: Vec<Note>,
}

impl InMemoryApplicationRepository {
    fn state(&self) -> Result<MutexGuard<'_, MemoryState>, RepositoryError> {
        self.state
            .lock()
            .map_err(|_| RepositoryError::Unavailable("repository mutex poisoned".to_string()))
    }
}

impl ApplicationRepository for InMemoryApplicationRepository {
    fn insert(&self, application: NewApplication) -> Result<Application, RepositoryError> {
        let mut state = self.state()?;
        state.last_application_id += 1;
        let id = ApplicationId(state.last_application_id);
        let record = Application {
            id,
            job_id: application.job_id,
            applicant_name: application.applicant_name,
            applicant_email: application.applicant_email,
            phone: application.phone,
            application_data: application.application_data,
            status: application.status,
            created_date: application.submitted_at,
            updated_date: application.submitted_at,
        };
        state.applications.insert(id, record.clone());
        Ok(record)
    }

    fn fetch(&self, id: ApplicationId) -> Result<Option<Application>, RepositoryError> {
        Ok(self.state()?.applications.get(&id).cloned())
    }

    fn update_status(
        &self,
        id: ApplicationId,
        status: &ApplicationStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<Application, RepositoryError> {
        let mut state = self.state()?;
        let record = state
            .applications
            .get_mut(&id)
            .ok_or(RepositoryError::NotFound)?;
        record.status = status.clone();
        record.updated_date = updated_at;
        Ok(record.clone())
    }

    fn delete(&self, id: ApplicationId) -> Result<(), RepositoryError> {
        let mut state = self.state()?;
        state
            .applications
            .remove(&id)
            .ok_or(RepositoryError::NotFound)?;
        state.notes.retain(|note| note.application_id != id);
        Ok(())
    }

    fn list(&self, filter: &ApplicationFilter) -> Result<Vec<Application>, RepositoryError> {
        let state = self.state()?;
        let mut matching: Vec<Application> = state
            .applications
            .values()
            .filter(|application| filter.matches(application))
            .cloned()
            .collect();
        matching.sort_by(|a, b| {
            b.created_date
                .cmp(&a.created_date)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(matching)
    }

    fn insert_note(&self, note: NewNote) -> Result<Note, RepositoryError> {
        let mut state = self.state()?;
        if !state.applications.contains_key(&note.application_id) {
            return Err(RepositoryError::NotFound);
        }
        state.last_note_id += 1;
        let stored = Note {
            id: NoteId(state.last_note_id),
            application_id: note.application_id,
            author_id: note.author_id,
            note_text: note.note_text,
            created_date: note.created_at,
        };
        state.notes.push(stored.clone());
        Ok(stored)
    }

    fn notes(&self, id: ApplicationId) -> Result<Vec<Note>, RepositoryError> {
        Ok(self
            .state()?
            .notes
            .iter()
            .filter(|note| note.application_id == id)
            .cloned()
            .collect())
    }

    fn note_count(&self, id: ApplicationId) -> Result<usize, RepositoryError> {
        Ok(self
            .state()?
            .notes
            .iter()
            .filter(|note| note.application_id == id)
            .count())
    }
}
