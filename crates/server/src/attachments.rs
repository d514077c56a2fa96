//! Quote document intake: validation, storage strategy and record update.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::Utc;
use tracing::info;

use tripdesk_core::config::{QuoteStorageBackend, StorageConfig};
use tripdesk_core::domain::quote_document::{quote_blob_key, QuoteUpload, PDF_MEDIA_TYPE};
use tripdesk_core::domain::travel_request::{TravelRequest, TravelRequestId, TravelRequestPatch};
use tripdesk_core::errors::{ApplicationError, DomainError};
use tripdesk_db::repositories::TravelRequestRepository;
use tripdesk_db::{BlobStore, BlobStoreError};

/// Path prefix under which blob-backed quotes are served.
pub const QUOTE_ROUTE_PREFIX: &str = "/api/quotes";

/// How uploaded bytes become a reference string on the record.
pub enum QuoteStorage {
    Inline { max_bytes: usize },
    Blob { store: Arc<dyn BlobStore>, public_base_url: Option<String> },
    Auto { max_inline_bytes: usize, store: Arc<dyn BlobStore>, public_base_url: Option<String> },
}

impl QuoteStorage {
    /// Builds the strategy named by `config.backend`. Blob-backed strategies need `blobs`.
    pub fn from_config(
        config: &StorageConfig,
        blobs: Option<Arc<dyn BlobStore>>,
    ) -> Result<Self, ApplicationError> {
        let public_base_url =
            config.public_base_url.as_ref().map(|url| url.trim_end_matches('/').to_string());
        let require_store = |blobs: Option<Arc<dyn BlobStore>>| {
            blobs.ok_or_else(|| {
                ApplicationError::Configuration(
                    "storage backend needs a blob store but none was configured".to_string(),
                )
            })
        };

        Ok(match config.backend {
            QuoteStorageBackend::Inline => Self::Inline { max_bytes: config.inline_max_bytes },
            QuoteStorageBackend::Blob => {
                Self::Blob { store: require_store(blobs)?, public_base_url }
            }
            QuoteStorageBackend::Auto => Self::Auto {
                max_inline_bytes: config.inline_max_bytes,
                store: require_store(blobs)?,
                public_base_url,
            },
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Inline { .. } => "inline",
            Self::Blob { .. } => "blob",
            Self::Auto { .. } => "auto",
        }
    }

    /// Stores the document and returns the reference to write onto the record.
    pub async fn store(
        &self,
        id: TravelRequestId,
        upload: &QuoteUpload,
    ) -> Result<String, ApplicationError> {
        match self {
            Self::Inline { max_bytes } => inline_reference(upload, *max_bytes),
            Self::Blob { store, public_base_url } => {
                put_blob(store.as_ref(), public_base_url.as_deref(), id, upload).await
            }
            Self::Auto { max_inline_bytes, store, public_base_url } => {
                if upload.size() <= *max_inline_bytes {
                    inline_reference(upload, *max_inline_bytes)
                } else {
                    put_blob(store.as_ref(), public_base_url.as_deref(), id, upload).await
                }
            }
        }
    }
}

fn inline_reference(upload: &QuoteUpload, max_bytes: usize) -> Result<String, ApplicationError> {
    if upload.size() > max_bytes {
        return Err(DomainError::ExceedsInlineStorage { size: upload.size(), limit: max_bytes }.into());
    }
    Ok(format!("data:{PDF_MEDIA_TYPE};base64,{}", BASE64.encode(&upload.bytes)))
}

async fn put_blob(
    store: &dyn BlobStore,
    public_base_url: Option<&str>,
    id: TravelRequestId,
    upload: &QuoteUpload,
) -> Result<String, ApplicationError> {
    let key = quote_blob_key(id, Utc::now().timestamp_millis());
    store
        .put(&key, &upload.bytes, PDF_MEDIA_TYPE)
        .await
        .map_err(|error: BlobStoreError| ApplicationError::Storage(error.to_string()))?;
    Ok(format!("{}{QUOTE_ROUTE_PREFIX}/{key}", public_base_url.unwrap_or_default()))
}

/// Validates an upload, stores it and records the reference on the request.
pub struct QuoteAttachmentService {
    requests: Arc<dyn TravelRequestRepository>,
    storage: QuoteStorage,
    max_upload_bytes: usize,
}

impl QuoteAttachmentService {
    pub fn new(
        requests: Arc<dyn TravelRequestRepository>,
        storage: QuoteStorage,
        max_upload_bytes: usize,
    ) -> Self {
        Self { requests, storage, max_upload_bytes }
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_bytes
    }

    pub fn storage_name(&self) -> &'static str {
        self.storage.name()
    }

    /// Status is never touched. The record is looked up before anything is stored,
    /// so an unknown id leaves no orphaned blob behind.
    pub async fn attach(
        &self,
        id: TravelRequestId,
        upload: QuoteUpload,
    ) -> Result<TravelRequest, ApplicationError> {
        upload.ensure_pdf()?;
        upload.ensure_within(self.max_upload_bytes)?;

        if self.requests.find_by_id(id).await?.is_none() {
            return Err(ApplicationError::NotFound(id));
        }

        let reference = self.storage.store(id, &upload).await?;
        let updated = self.requests.update(id, TravelRequestPatch::quote_reference(reference)).await?;

        info!(
            event_name = "api.quote.stored",
            request_id = %id,
            storage = self.storage.name(),
            size_bytes = upload.size(),
            file_name = upload.file_name.as_deref().unwrap_or("quote.pdf"),
            "quote document stored"
        );

        Ok(updated)
    }
}
