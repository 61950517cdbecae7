//! Job application review: storage, status workflow, notes, bulk operations,
//! CSV export, the board view model and the AJAX router.

pub mod access;
pub mod board;
pub mod bulk;
pub mod clock;
pub mod details;
pub mod domain;
pub mod error;
pub mod export;
pub mod jobs;
pub mod memory;
pub mod notes;
pub mod repository;
pub mod router;
pub mod service;
pub mod sqlite;
pub mod status;
pub mod transition;

#[cfg(test)]
mod tests;

pub use access::{AccessError, AccessPolicy, Capability, ReviewerRoster};
pub use board::{
    ApplicationBoard, BoardColumn, BoardSynchronizer, CardSummary, ClientError, MoveError,
    MoveResult, Notice, NoticeKind, PendingMove, ServiceTransitionClient, TransitionClient,
};
pub use bulk::{
    confirmation_prompt, BulkError, BulkItemResult, BulkOperation, BulkOutcome, BulkRequest,
    ItemOutcome,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use details::{ApplicationDetails, FormattedField};
pub use domain::{
    ActorId, Application, ApplicationId, ApplicationSubmission, JobId, NewApplication, NewNote,
    Note, NoteId,
};
pub use error::WorkflowError;
pub use export::{export_link, write_csv, ExportFile, EXPORT_HEADER};
pub use jobs::{InMemoryJobDirectory, JobCatalogError, JobDirectory, JobPosting};
pub use memory::InMemoryApplicationRepository;
pub use notes::{NoteLog, NoteReceipt};
pub use repository::{ApplicationFilter, ApplicationRepository, RepositoryError};
pub use router::application_router;
pub use service::ApplicationDesk;
pub use sqlite::{init_db, SqliteApplicationRepository};
pub use status::{ApplicationStatus, StatusDefinition, StatusSet, StatusSetError};
pub use transition::{StatusTransitionService, TransitionReceipt};
