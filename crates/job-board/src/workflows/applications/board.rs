//! Board/list view model kept in step with the store.
//!
//! A move is applied optimistically: [`ApplicationBoard::begin_move`] shifts
//! the card and returns a [`PendingMove`]. Once the server answers, either
//! [`ApplicationBoard::commit`] settles it or [`ApplicationBoard::rollback`]
//! applies the inverse and puts the card back where it was.

use std::collections::HashSet;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use super::access::AccessPolicy;
use super::bulk::{BulkOperation, BulkOutcome};
use super::details::DELETED_JOB_TITLE;
use super::domain::{ActorId, Application, ApplicationId};
use super::jobs::JobDirectory;
use super::repository::ApplicationRepository;
use super::status::{ApplicationStatus, StatusSet};
use super::transition::StatusTransitionService;

/// Success notices fade after this long; error notices stay until dismissed
/// or replaced by the next action.
pub const SUCCESS_NOTICE_TTL: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardSummary {
    pub application_id: ApplicationId,
    pub applicant_name: String,
    pub job_title: String,
    pub submitted: DateTime<Utc>,
    /// Dimmed while a transition for this card is in flight.
    pub pending: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoardColumn {
    pub status: ApplicationStatus,
    pub label: String,
    pub count: usize,
    pub cards: Vec<CardSummary>,
}

impl BoardColumn {
    /// Whether the "no applications" placeholder is shown.
    pub fn shows_placeholder(&self) -> bool {
        self.cards.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
    #[serde(skip)]
    pub dismiss_after: Option<Duration>,
}

impl Notice {
    fn success(message: String) -> Self {
        Self {
            kind: NoticeKind::Success,
            message,
            dismiss_after: Some(SUCCESS_NOTICE_TTL),
        }
    }

    fn error(message: String) -> Self {
        Self {
            kind: NoticeKind::Error,
            message,
            dismiss_after: None,
        }
    }
}

/// Tentative move awaiting the server's answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingMove {
    application_id: ApplicationId,
    from: ApplicationStatus,
    from_index: usize,
    to: ApplicationStatus,
}

impl PendingMove {
    pub fn application_id(&self) -> ApplicationId {
        self.application_id
    }

    pub fn from(&self) -> &ApplicationStatus {
        &self.from
    }

    pub fn to(&self) -> &ApplicationStatus {
        &self.to
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoveError {
    #[error("application {0} is not on the board")]
    UnknownCard(ApplicationId),
    #[error("no board column for status '{0}'")]
    UnknownColumn(String),
    #[error("application {0} already has a status change in flight")]
    InFlight(ApplicationId),
    #[error("application {0} has no pending move")]
    NotPending(ApplicationId),
}

/// Applications grouped into one column per configured status.
#[derive(Debug, Clone, Serialize)]
pub struct ApplicationBoard {
    columns: Vec<BoardColumn>,
    #[serde(skip)]
    notices: Vec<Notice>,
    #[serde(skip)]
    in_flight: HashSet<ApplicationId>,
}

impl ApplicationBoard {
    /// Group `applications` by status, newest submission at the head of each
    /// column. Applications whose status is no longer configured are left out.
    pub fn from_applications(
        statuses: &StatusSet,
        applications: &[Application],
        jobs: &dyn JobDirectory,
    ) -> Self {
        let mut columns: Vec<BoardColumn> = statuses
            .iter()
            .zip(statuses.statuses())
            .map(|(definition, status)| BoardColumn {
                status,
                label: definition.label.clone(),
                count: 0,
                cards: Vec::new(),
            })
            .collect();

        let mut ordered: Vec<&Application> = applications.iter().collect();
        ordered.sort_by(|a, b| {
            b.created_date
                .cmp(&a.created_date)
                .then_with(|| b.id.cmp(&a.id))
        });

        for application in ordered {
            let Some(column) = columns
                .iter_mut()
                .find(|column| column.status == application.status)
            else {
                debug!(
                    application_id = %application.id,
                    status = %application.status,
                    "skipping application with unconfigured status"
                );
                continue;
            };

            let job_title = jobs
                .posting(application.job_id)
                .map(|posting| posting.title)
                .unwrap_or_else(|| DELETED_JOB_TITLE.to_string());
            column.cards.push(CardSummary {
                application_id: application.id,
                applicant_name: application.applicant_name.clone(),
                job_title,
                submitted: application.created_date,
                pending: false,
            });
            column.count += 1;
        }

        Self {
            columns,
            notices: Vec::new(),
            in_flight: HashSet::new(),
        }
    }

    pub fn columns(&self) -> &[BoardColumn] {
        &self.columns
    }

    pub fn column(&self, status: &str) -> Option<&BoardColumn> {
        self.columns
            .iter()
            .find(|column| column.status.as_str() == status)
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn dismiss_notices(&mut self) {
        self.notices.clear();
    }

    pub fn is_in_flight(&self, application_id: ApplicationId) -> bool {
        self.in_flight.contains(&application_id)
    }

    /// Column key and position of a card.
    pub fn position(&self, application_id: ApplicationId) -> Option<(&ApplicationStatus, usize)> {
        self.locate(application_id)
            .map(|(column, index)| (&self.columns[column].status, index))
    }

    /// Start a move. `Ok(None)` means the card is already in `to` and no
    /// request should be sent.
    pub fn begin_move(
        &mut self,
        application_id: ApplicationId,
        to: &str,
    ) -> Result<Option<PendingMove>, MoveError> {
        if self.in_flight.contains(&application_id) {
            return Err(MoveError::InFlight(application_id));
        }
        let (from_column, from_index) = self
            .locate(application_id)
            .ok_or(MoveError::UnknownCard(application_id))?;
        let to_column = self
            .column_index(to)
            .ok_or_else(|| MoveError::UnknownColumn(to.to_string()))?;
        if from_column == to_column {
            return Ok(None);
        }

        self.clear_errors();
        let mut card = self.take_card(from_column, from_index);
        card.pending = true;
        self.put_card(to_column, 0, card);
        self.in_flight.insert(application_id);

        Ok(Some(PendingMove {
            application_id,
            from: self.columns[from_column].status.clone(),
            from_index,
            to: self.columns[to_column].status.clone(),
        }))
    }

    /// Settle a move the server accepted. If the server reports a different
    /// status than requested, the card follows the server.
    pub fn commit(
        &mut self,
        pending: PendingMove,
        accepted: &ApplicationStatus,
    ) -> Result<(), MoveError> {
        let id = pending.application_id;
        if !self.in_flight.remove(&id) {
            return Err(MoveError::NotPending(id));
        }
        let (column, index) = self.locate(id).ok_or(MoveError::UnknownCard(id))?;

        let target = match self.column_index(accepted.as_str()) {
            Some(target) if target != column => {
                let card = self.take_card(column, index);
                self.put_card(target, 0, card);
                target
            }
            _ => column,
        };
        if let Some(card) = self.columns[target]
            .cards
            .iter_mut()
            .find(|card| card.application_id == id)
        {
            card.pending = false;
        }

        let label = self.columns[target].label.clone();
        self.notices
            .push(Notice::success(format!("Application status updated to {label}.")));
        Ok(())
    }

    /// Undo a move the server refused and surface its message verbatim.
    pub fn rollback(&mut self, pending: PendingMove, message: &str) -> Result<(), MoveError> {
        let id = pending.application_id;
        if !self.in_flight.remove(&id) {
            return Err(MoveError::NotPending(id));
        }
        let (column, index) = self.locate(id).ok_or(MoveError::UnknownCard(id))?;
        let origin = self
            .column_index(pending.from.as_str())
            .ok_or_else(|| MoveError::UnknownColumn(pending.from.to_string()))?;

        let mut card = self.take_card(column, index);
        card.pending = false;
        self.put_card(origin, pending.from_index, card);

        self.notices.push(Notice::error(message.to_string()));
        Ok(())
    }

    /// Drop cards, e.g. after a bulk delete. Returns how many were removed.
    pub fn remove_cards(&mut self, ids: &[ApplicationId]) -> usize {
        let mut removed = 0;
        for &id in ids {
            if let Some((column, index)) = self.locate(id) {
                self.take_card(column, index);
                self.in_flight.remove(&id);
                removed += 1;
            }
        }
        removed
    }

    /// Reconcile the view with a finished bulk operation.
    pub fn apply_bulk_outcome(&mut self, outcome: &BulkOutcome) {
        let succeeded = outcome.succeeded();
        match outcome.operation {
            BulkOperation::Delete => {
                self.remove_cards(&succeeded);
            }
            BulkOperation::UpdateStatus => {
                if let Some(target) = outcome
                    .status
                    .as_ref()
                    .and_then(|status| self.column_index(status.as_str()))
                {
                    for id in succeeded {
                        if let Some((column, index)) = self.locate(id) {
                            if column != target {
                                let card = self.take_card(column, index);
                                self.put_card(target, 0, card);
                            }
                        }
                    }
                }
            }
            BulkOperation::Export => {}
        }

        self.clear_errors();
        let notice = if outcome.is_success() {
            Notice::success(outcome.message.clone())
        } else {
            Notice::error(outcome.message.clone())
        };
        self.notices.push(notice);
    }

    fn locate(&self, application_id: ApplicationId) -> Option<(usize, usize)> {
        self.columns
            .iter()
            .enumerate()
            .find_map(|(column_index, column)| {
                column
                    .cards
                    .iter()
                    .position(|card| card.application_id == application_id)
                    .map(|card_index| (column_index, card_index))
            })
    }

    fn column_index(&self, status: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|column| column.status.as_str() == status)
    }

    fn take_card(&mut self, column: usize, index: usize) -> CardSummary {
        let column = &mut self.columns[column];
        column.count = column.count.saturating_sub(1);
        column.cards.remove(index)
    }

    fn put_card(&mut self, column: usize, index: usize, card: CardSummary) {
        let column = &mut self.columns[column];
        let index = index.min(column.cards.len());
        column.cards.insert(index, card);
        column.count += 1;
    }

    fn clear_errors(&mut self) {
        self.notices.retain(|notice| notice.kind != NoticeKind::Error);
    }
}

/// Transport used by the synchronizer to ask the server for a transition.
pub trait TransitionClient {
    fn update_status(
        &self,
        application_id: ApplicationId,
        status: &ApplicationStatus,
    ) -> Result<ApplicationStatus, ClientError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// The server answered with a failure response.
    #[error("{0}")]
    Rejected(String),
    /// The request never produced a response.
    #[error("network error: {0}")]
    NetworkFault(String),
}

/// In-process client calling the transition service directly.
pub struct ServiceTransitionClient<'a, R, P> {
    service: &'a StatusTransitionService<R, P>,
    actor: ActorId,
}

impl<'a, R, P> ServiceTransitionClient<'a, R, P> {
    pub fn new(service: &'a StatusTransitionService<R, P>, actor: ActorId) -> Self {
        Self { service, actor }
    }
}

impl<R, P> TransitionClient for ServiceTransitionClient<'_, R, P>
where
    R: ApplicationRepository,
    P: AccessPolicy,
{
    fn update_status(
        &self,
        application_id: ApplicationId,
        status: &ApplicationStatus,
    ) -> Result<ApplicationStatus, ClientError> {
        self.service
            .transition(application_id, status.as_str(), self.actor)
            .map(|receipt| receipt.accepted_status)
            .map_err(|err| ClientError::Rejected(err.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveResult {
    /// Source and destination were the same column; nothing was sent.
    Unchanged,
    Committed(ApplicationStatus),
    RolledBack(String),
}

/// Drives one drag-drop or dropdown change from optimistic move to
/// commit/rollback.
pub struct BoardSynchronizer<C> {
    board: ApplicationBoard,
    client: C,
}

impl<C: TransitionClient> BoardSynchronizer<C> {
    pub fn new(board: ApplicationBoard, client: C) -> Self {
        Self { board, client }
    }

    pub fn board(&self) -> &ApplicationBoard {
        &self.board
    }

    pub fn board_mut(&mut self) -> &mut ApplicationBoard {
        &mut self.board
    }

    pub fn into_board(self) -> ApplicationBoard {
        self.board
    }

    pub fn move_card(
        &mut self,
        application_id: ApplicationId,
        to: &str,
    ) -> Result<MoveResult, MoveError> {
        let Some(pending) = self.board.begin_move(application_id, to)? else {
            return Ok(MoveResult::Unchanged);
        };

        let target = pending.to().clone();
        match self.client.update_status(application_id, &target) {
            Ok(accepted) => {
                self.board.commit(pending, &accepted)?;
                Ok(MoveResult::Committed(accepted))
            }
            Err(err) => {
                let message = err.to_string();
                self.board.rollback(pending, &message)?;
                Ok(MoveResult::RolledBack(message))
            }
        }
    }
}
