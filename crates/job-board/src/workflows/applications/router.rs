use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use chrono::Utc;
use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};
use tracing::warn;

use super::access::AccessPolicy;
use super::bulk::{BulkError, BulkOperation, BulkOutcome, BulkRequest};
use super::domain::{ActorId, ApplicationId, ApplicationSubmission};
use super::error::WorkflowError;
use super::export::{export_filename, EXPORT_ACTION};
use super::repository::{ApplicationFilter, ApplicationRepository};
use super::service::ApplicationDesk;

pub const AJAX_PATH: &str = "/admin-ajax";
pub const ACTOR_HEADER: &str = "x-actor-id";

/// Actions accepted on the AJAX endpoint. The body also carries `nonce`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum AjaxRequest {
    UpdateApplicationStatus {
        application_id: ApplicationId,
        status: String,
    },
    GetApplicationDetails {
        application_id: ApplicationId,
    },
    DeleteApplication {
        application_id: ApplicationId,
    },
    BulkDeleteApplications {
        #[serde(default)]
        application_ids: Vec<ApplicationId>,
        #[serde(default)]
        confirmed: bool,
    },
    BulkUpdateStatus {
        #[serde(default)]
        application_ids: Vec<ApplicationId>,
        #[serde(default)]
        status: Option<String>,
    },
    AddApplicationNote {
        application_id: ApplicationId,
        note_text: String,
    },
    SubmitApplication(ApplicationSubmission),
    ListApplications {
        #[serde(default)]
        filter: ApplicationFilter,
    },
    GetBoard {
        #[serde(default)]
        filter: ApplicationFilter,
    },
}

/// Non-filter query parameters of the export download.
#[derive(Debug, Deserialize)]
pub(crate) struct ExportParams {
    action: String,
    #[serde(default)]
    nonce: String,
    /// Comma-separated ids of checked rows. When present the filter is ignored.
    #[serde(default, deserialize_with = "deserialize_id_list")]
    application_ids: Vec<ApplicationId>,
}

fn deserialize_id_list<'de, D>(deserializer: D) -> Result<Vec<ApplicationId>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
    raw.split(',')
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(|value| {
            value
                .parse::<u64>()
                .map(ApplicationId)
                .map_err(|_| de::Error::custom(format!("invalid application id '{value}'")))
        })
        .collect()
}

#[derive(Debug, Serialize)]
struct AjaxResponse<T: Serialize> {
    success: bool,
    data: T,
}

/// Router builder exposing the AJAX dispatch endpoint.
pub fn application_router<R, P>(desk: Arc<ApplicationDesk<R, P>>) -> Router
where
    R: ApplicationRepository + 'static,
    P: AccessPolicy + 'static,
{
    Router::new()
        .route(
            AJAX_PATH,
            post(ajax_handler::<R, P>).get(export_handler::<R, P>),
        )
        .with_state(desk)
}

pub(crate) async fn ajax_handler<R, P>(
    State(desk): State<Arc<ApplicationDesk<R, P>>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response
where
    R: ApplicationRepository + 'static,
    P: AccessPolicy + 'static,
{
    let actor = actor_from_headers(&headers);
    let action = body
        .get("action")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let nonce = body
        .get("nonce")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    if let Err(err) = desk.access().verify_nonce(actor, &action, &nonce) {
        warn!(%actor, action = %action, "rejected ajax request");
        return failure(StatusCode::FORBIDDEN, err.to_string());
    }

    let request: AjaxRequest = match serde_json::from_value(body) {
        Ok(request) => request,
        Err(err) => {
            return failure(StatusCode::BAD_REQUEST, format!("invalid request: {err}"));
        }
    };

    run_blocking(move || dispatch(&desk, request, actor)).await
}

/// Store calls go through a blocking `Mutex` and SQLite I/O, so they run off
/// the async workers.
async fn run_blocking<F>(work: F) -> Response
where
    F: FnOnce() -> Response + Send + 'static,
{
    match tokio::task::spawn_blocking(work).await {
        Ok(response) => response,
        Err(err) => {
            warn!(error = %err, "application request task failed");
            failure(
                StatusCode::INTERNAL_SERVER_ERROR,
                "request could not be completed".to_string(),
            )
        }
    }
}

fn dispatch<R, P>(desk: &ApplicationDesk<R, P>, request: AjaxRequest, actor: ActorId) -> Response
where
    R: ApplicationRepository + 'static,
    P: AccessPolicy + 'static,
{
    match request {
        AjaxRequest::UpdateApplicationStatus {
            application_id,
            status,
        } => respond(desk.transition(application_id, &status, actor)),
        AjaxRequest::GetApplicationDetails { application_id } => {
            respond(desk.details(application_id, actor))
        }
        AjaxRequest::DeleteApplication { application_id } => respond(
            desk.delete(application_id, actor)
                .map(|()| "Application deleted successfully.".to_string()),
        ),
        AjaxRequest::BulkDeleteApplications {
            application_ids,
            confirmed,
        } => respond_bulk(desk.bulk_apply(
            BulkRequest {
                operation: Some(BulkOperation::Delete),
                application_ids,
                status: None,
                confirmed,
            },
            actor,
        )),
        AjaxRequest::BulkUpdateStatus {
            application_ids,
            status,
        } => respond_bulk(desk.bulk_apply(
            BulkRequest {
                operation: Some(BulkOperation::UpdateStatus),
                application_ids,
                status,
                confirmed: false,
            },
            actor,
        )),
        AjaxRequest::AddApplicationNote {
            application_id,
            note_text,
        } => respond(desk.add_note(application_id, actor, &note_text)),
        AjaxRequest::SubmitApplication(submission) => respond(desk.submit(submission)),
        AjaxRequest::ListApplications { filter } => respond(desk.list(&filter.normalized(), actor)),
        AjaxRequest::GetBoard { filter } => respond(desk.board(&filter.normalized(), actor)),
    }
}

/// `GET /admin-ajax?action=export_applications&nonce=..&status=..` streams CSV
/// for the filter, or for `application_ids=3,8` when rows were checked.
pub(crate) async fn export_handler<R, P>(
    State(desk): State<Arc<ApplicationDesk<R, P>>>,
    headers: HeaderMap,
    params: Result<Query<ExportParams>, QueryRejection>,
    filter: Result<Query<ApplicationFilter>, QueryRejection>,
) -> Response
where
    R: ApplicationRepository + 'static,
    P: AccessPolicy + 'static,
{
    let (Query(params), Query(filter)) = match (params, filter) {
        (Ok(params), Ok(filter)) => (params, filter),
        (Err(rejection), _) | (_, Err(rejection)) => {
            return failure(StatusCode::BAD_REQUEST, rejection.body_text());
        }
    };

    let actor = actor_from_headers(&headers);
    if params.action != EXPORT_ACTION {
        return failure(
            StatusCode::BAD_REQUEST,
            format!("unsupported action '{}'", params.action),
        );
    }
    if let Err(err) = desk
        .access()
        .verify_nonce(actor, &params.action, &params.nonce)
    {
        warn!(%actor, "rejected export request");
        return failure(StatusCode::FORBIDDEN, err.to_string());
    }

    let selection = params.application_ids;
    let filter = filter.normalized();
    run_blocking(move || export_response(&desk, selection, &filter, actor)).await
}

fn export_response<R, P>(
    desk: &ApplicationDesk<R, P>,
    selection: Vec<ApplicationId>,
    filter: &ApplicationFilter,
    actor: ActorId,
) -> Response
where
    R: ApplicationRepository + 'static,
    P: AccessPolicy + 'static,
{
    let csv = if selection.is_empty() {
        match desk.export(filter, actor) {
            Ok(file) => file.csv,
            Err(err) => return workflow_failure(err),
        }
    } else {
        let request = BulkRequest {
            operation: Some(BulkOperation::Export),
            application_ids: selection,
            status: None,
            confirmed: false,
        };
        match desk.bulk_apply(request, actor) {
            Ok(outcome) => outcome.export.unwrap_or_default(),
            Err(err) => return bulk_failure(err),
        }
    };

    let disposition = format!("attachment; filename=\"{}\"", export_filename(Utc::now()));
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        csv,
    )
        .into_response()
}

fn actor_from_headers(headers: &HeaderMap) -> ActorId {
    headers
        .get(ACTOR_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(ActorId)
        .unwrap_or(ActorId::ANONYMOUS)
}

fn respond<T: Serialize>(result: Result<T, WorkflowError>) -> Response {
    match result {
        Ok(data) => (
            StatusCode::OK,
            Json(AjaxResponse {
                success: true,
                data,
            }),
        )
            .into_response(),
        Err(err) => workflow_failure(err),
    }
}

fn respond_bulk(result: Result<BulkOutcome, BulkError>) -> Response {
    match result {
        Ok(outcome) => {
            let success = outcome.is_success();
            let payload = json!({
                "success": success,
                "data": outcome,
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(err) => bulk_failure(err),
    }
}

fn bulk_failure(err: BulkError) -> Response {
    match err {
        BulkError::Workflow(err) => workflow_failure(err),
        err @ BulkError::ConfirmationRequired(_) => {
            let payload = json!({
                "success": false,
                "data": err.to_string(),
                "confirmation_required": true,
            });
            (StatusCode::BAD_REQUEST, Json(payload)).into_response()
        }
        err => failure(StatusCode::BAD_REQUEST, err.to_string()),
    }
}

fn workflow_failure(err: WorkflowError) -> Response {
    let status = match &err {
        WorkflowError::NotFound(_) => StatusCode::NOT_FOUND,
        WorkflowError::InvalidStatus(_)
        | WorkflowError::EmptyNote
        | WorkflowError::InvalidSubmission(_)
        | WorkflowError::UnknownJob(_) => StatusCode::BAD_REQUEST,
        WorkflowError::Unauthorized(_) => StatusCode::FORBIDDEN,
        WorkflowError::Export(_) | WorkflowError::Repository(_) => {
            warn!(error = %err, "application request failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    failure(status, err.to_string())
}

fn failure(status: StatusCode, message: String) -> Response {
    (
        status,
        Json(AjaxResponse {
            success: false,
            data: message,
        }),
    )
        .into_response()
}
