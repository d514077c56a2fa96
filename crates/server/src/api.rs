//! JSON API for travel requests.
//!
//! - `GET   /api`                       — service descriptor
//! - `GET   /api/requests`              — all requests, newest first
//! - `POST  /api/requests`              — create a request
//! - `POST  /api/requests/{id}/quote`   — attach a PDF quote (multipart field `quote`)
//! - `GET   /api/requests/{id}/quote`   — open the attached quote
//! - `PATCH /api/requests/{id}/status`  — set the workflow status
//! - `GET   /api/quotes/{key}`          — stored quote object

use std::sync::Arc;

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::JsonRejection,
        DefaultBodyLimit, Multipart, Path, State,
    },
    http::{header, StatusCode},
    response::{IntoResponse, Redirect, Response},
    routing::{get, patch, post},
    Json, Router,
};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use tripdesk_core::domain::quote_document::{QuoteUpload, PDF_MEDIA_TYPE};
use tripdesk_core::domain::travel_request::{
    TravelRequest, TravelRequestId, TravelRequestPatch, TravelRequestStatus,
    TravelRequestSubmission,
};
use tripdesk_core::errors::{ApplicationError, DomainError, InterfaceError};
use tripdesk_core::workflow::{StatusTransition, TransitionKind};
use tripdesk_db::repositories::TravelRequestRepository;
use tripdesk_db::{BlobStore, BlobStoreError};

use crate::attachments::QuoteAttachmentService;
use crate::notify::{self, Notifier};

/// Multipart framing allowance on top of the document itself.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;
const QUOTE_FIELD: &str = "quote";
const INLINE_QUOTE_PREFIX: &str = "data:application/pdf;base64,";

#[derive(Clone)]
pub struct ApiState {
    pub requests: Arc<dyn TravelRequestRepository>,
    pub attachments: Arc<QuoteAttachmentService>,
    pub blobs: Option<Arc<dyn BlobStore>>,
    pub notifier: Arc<dyn Notifier>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub error: String,
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct ServiceDescriptor {
    pub name: &'static str,
    pub version: &'static str,
    pub endpoints: Vec<&'static str>,
}

/// Interface error carried out of a handler and rendered as `{"error": ...}`.
#[derive(Debug)]
pub struct ApiError(InterfaceError);

impl ApiError {
    fn from_application(error: ApplicationError, correlation_id: &str) -> Self {
        Self(error.into_interface(correlation_id))
    }

    fn bad_request(message: impl Into<String>, correlation_id: &str) -> Self {
        Self(InterfaceError::BadRequest {
            message: message.into(),
            correlation_id: correlation_id.to_string(),
        })
    }

    fn not_found(correlation_id: &str) -> Self {
        Self(InterfaceError::NotFound {
            message: "Not found".to_string(),
            correlation_id: correlation_id.to_string(),
        })
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            error!(
                event_name = "api.request.failed",
                correlation_id = %self.0.correlation_id(),
                status = status.as_u16(),
                error = %self.0.message(),
                "request failed"
            );
        } else {
            warn!(
                event_name = "api.request.rejected",
                correlation_id = %self.0.correlation_id(),
                status = status.as_u16(),
                error = %self.0.message(),
                "request rejected"
            );
        }

        (status, Json(ApiErrorBody { error: self.0.message().to_string() })).into_response()
    }
}

fn correlation_id() -> String {
    Uuid::new_v4().to_string()
}

/// Non-numeric ids cannot name a record, so they read as "not found".
fn parse_id(raw: &str, correlation_id: &str) -> Result<TravelRequestId, ApiError> {
    raw.parse::<TravelRequestId>().map_err(|_| ApiError::not_found(correlation_id))
}

pub fn router(state: ApiState) -> Router {
    let upload_limit = state.attachments.max_upload_bytes().saturating_add(MULTIPART_OVERHEAD_BYTES);

    Router::new()
        .route("/api", get(service_descriptor))
        .route("/api/requests", get(list_requests).post(create_request))
        .route(
            "/api/requests/{id}/quote",
            post(attach_quote).get(open_quote).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/api/requests/{id}/status", patch(update_status))
        .route("/api/quotes/{key}", get(quote_object))
        .with_state(state)
}

async fn service_descriptor() -> Json<ServiceDescriptor> {
    Json(ServiceDescriptor {
        name: "Travel Request Portal API",
        version: env!("CARGO_PKG_VERSION"),
        endpoints: vec![
            "GET /api/health",
            "GET /api/requests",
            "POST /api/requests",
            "POST /api/requests/{id}/quote",
            "GET /api/requests/{id}/quote",
            "PATCH /api/requests/{id}/status",
            "GET /api/quotes/{key}",
        ],
    })
}

async fn list_requests(State(state): State<ApiState>) -> Result<Json<Vec<TravelRequest>>, ApiError> {
    let correlation_id = correlation_id();
    let requests = state
        .requests
        .list()
        .await
        .map_err(|e| ApiError::from_application(e.into(), &correlation_id))?;
    Ok(Json(requests))
}

async fn create_request(
    State(state): State<ApiState>,
    body: Result<Json<TravelRequestSubmission>, JsonRejection>,
) -> Result<(StatusCode, Json<TravelRequest>), ApiError> {
    let correlation_id = correlation_id();
    let Json(submission) =
        body.map_err(|_| ApiError::bad_request("Invalid JSON in request body", &correlation_id))?;

    let new_request = submission
        .into_new_request()
        .map_err(|e| ApiError::from_application(e.into(), &correlation_id))?;
    let created = state
        .requests
        .create(new_request)
        .await
        .map_err(|e| ApiError::from_application(e.into(), &correlation_id))?;

    info!(
        event_name = "api.request.created",
        correlation_id = %correlation_id,
        request_id = %created.id,
        travel_mode = created.travel_mode.as_str(),
        "travel request created"
    );

    notify::spawn_new_request(state.notifier.clone(), created.clone(), correlation_id);
    Ok((StatusCode::CREATED, Json(created)))
}

async fn attach_quote(
    Path(raw_id): Path<String>,
    State(state): State<ApiState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<TravelRequest>, ApiError> {
    let correlation_id = correlation_id();
    let id = parse_id(&raw_id, &correlation_id)?;
    let mut multipart = multipart.map_err(|_| {
        ApiError::from_application(DomainError::InvalidFile.into(), &correlation_id)
    })?;

    let limit = state.attachments.max_upload_bytes();
    let upload = read_quote_field(&mut multipart, limit)
        .await
        .map_err(|e| ApiError::from_application(e, &correlation_id))?;

    let updated = state
        .attachments
        .attach(id, upload)
        .await
        .map_err(|e| ApiError::from_application(e, &correlation_id))?;

    info!(
        event_name = "api.quote.attached",
        correlation_id = %correlation_id,
        request_id = %id,
        storage = state.attachments.storage_name(),
        "quote attached to travel request"
    );
    Ok(Json(updated))
}

/// Pulls the `quote` part out of the form. A missing part is treated like a wrong file.
async fn read_quote_field(
    multipart: &mut Multipart,
    limit: usize,
) -> Result<QuoteUpload, ApplicationError> {
    let multipart_error = |error: MultipartError| -> ApplicationError {
        if error.status() == StatusCode::PAYLOAD_TOO_LARGE {
            DomainError::FileTooLarge { size: limit.saturating_add(1), limit }.into()
        } else {
            DomainError::InvalidFile.into()
        }
    };

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(QUOTE_FIELD) {
            continue;
        }
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.map_err(multipart_error)?;
        return Ok(QuoteUpload { file_name, content_type, bytes: bytes.to_vec() });
    }

    Err(DomainError::InvalidFile.into())
}

async fn open_quote(
    Path(raw_id): Path<String>,
    State(state): State<ApiState>,
) -> Result<Response, ApiError> {
    let correlation_id = correlation_id();
    let id = parse_id(&raw_id, &correlation_id)?;
    let request = state
        .requests
        .find_by_id(id)
        .await
        .map_err(|e| ApiError::from_application(e.into(), &correlation_id))?
        .ok_or_else(|| ApiError::not_found(&correlation_id))?;

    let reference = match request.quote_pdf_url.as_deref() {
        Some(reference) if !reference.is_empty() => reference,
        _ => return Err(ApiError::not_found(&correlation_id)),
    };

    match reference.strip_prefix(INLINE_QUOTE_PREFIX) {
        Some(encoded) => {
            let bytes = BASE64.decode(encoded).map_err(|e| {
                ApiError::from_application(
                    ApplicationError::Storage(format!("stored quote is not valid base64: {e}")),
                    &correlation_id,
                )
            })?;
            Ok(pdf_response(bytes, &format!("quote-{id}.pdf")))
        }
        None => Ok(Redirect::temporary(reference).into_response()),
    }
}

async fn update_status(
    Path(raw_id): Path<String>,
    State(state): State<ApiState>,
    body: Result<Json<StatusUpdate>, JsonRejection>,
) -> Result<Json<TravelRequest>, ApiError> {
    let correlation_id = correlation_id();
    let id = parse_id(&raw_id, &correlation_id)?;
    let Json(update) =
        body.map_err(|_| ApiError::bad_request("Invalid JSON in request body", &correlation_id))?;
    let target = update
        .status
        .parse::<TravelRequestStatus>()
        .map_err(|e| ApiError::from_application(e.into(), &correlation_id))?;

    let previous = state
        .requests
        .find_by_id(id)
        .await
        .map_err(|e| ApiError::from_application(e.into(), &correlation_id))?
        .ok_or_else(|| ApiError::not_found(&correlation_id))?;

    let updated = state
        .requests
        .update(id, TravelRequestPatch::status(target))
        .await
        .map_err(|e| ApiError::from_application(e.into(), &correlation_id))?;

    let transition = StatusTransition::new(previous.status, target);
    match transition.kind() {
        TransitionKind::Irregular => warn!(
            event_name = "api.status.irregular_transition",
            correlation_id = %correlation_id,
            request_id = %id,
            from = transition.from.as_str(),
            to = transition.to.as_str(),
            "status moved outside the usual workflow"
        ),
        kind => info!(
            event_name = "api.status.updated",
            correlation_id = %correlation_id,
            request_id = %id,
            from = transition.from.as_str(),
            to = transition.to.as_str(),
            repeat = kind == TransitionKind::Repeat,
            "travel request status updated"
        ),
    }

    Ok(Json(updated))
}

async fn quote_object(
    Path(key): Path<String>,
    State(state): State<ApiState>,
) -> Result<Response, ApiError> {
    let correlation_id = correlation_id();
    let Some(blobs) = state.blobs.as_ref() else {
        return Err(ApiError::from_application(
            ApplicationError::Configuration("Quote storage not configured".to_string()),
            &correlation_id,
        ));
    };

    match blobs.get(&key).await {
        Ok(Some(bytes)) => Ok(pdf_response(bytes, &key)),
        Ok(None) | Err(BlobStoreError::InvalidKey(_)) => Err(ApiError::not_found(&correlation_id)),
        Err(error) => Err(ApiError::from_application(
            ApplicationError::Storage(error.to_string()),
            &correlation_id,
        )),
    }
}

fn pdf_response(bytes: Vec<u8>, file_name: &str) -> Response {
    (
        [
            (header::CONTENT_TYPE, PDF_MEDIA_TYPE.to_string()),
            (header::CONTENT_DISPOSITION, format!("inline; filename=\"{file_name}\"")),
        ],
        bytes,
    )
        .into_response()
}
