use async_trait::async_trait;
use thiserror::Error;

use tripdesk_core::domain::travel_request::{
    NewTravelRequest, TravelRequest, TravelRequestId, TravelRequestPatch,
};
use tripdesk_core::errors::ApplicationError;

pub mod memory;
pub mod travel_request;

pub use memory::InMemoryTravelRequestRepository;
pub use travel_request::SqlTravelRequestRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("travel request {0} not found")]
    NotFound(TravelRequestId),
}

impl From<RepositoryError> for ApplicationError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::NotFound(id) => ApplicationError::NotFound(id),
            other => ApplicationError::Persistence(other.to_string()),
        }
    }
}

/// Persistence seam for travel requests.
#[async_trait]
pub trait TravelRequestRepository: Send + Sync {
    /// Assigns an id, sets status to `WAITING_FOR_QUOTE` and returns the stored record.
    async fn create(&self, request: NewTravelRequest) -> Result<TravelRequest, RepositoryError>;

    /// All records, newest first.
    async fn list(&self) -> Result<Vec<TravelRequest>, RepositoryError>;

    async fn find_by_id(
        &self,
        id: TravelRequestId,
    ) -> Result<Option<TravelRequest>, RepositoryError>;

    /// Merges the set fields of `patch` into the record. Last write wins.
    async fn update(
        &self,
        id: TravelRequestId,
        patch: TravelRequestPatch,
    ) -> Result<TravelRequest, RepositoryError>;
}
