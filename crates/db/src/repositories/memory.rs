use chrono::Utc;
use tokio::sync::RwLock;

use tripdesk_core::domain::travel_request::{
    NewTravelRequest, TravelRequest, TravelRequestId, TravelRequestPatch,
};

use super::{RepositoryError, TravelRequestRepository};

struct MemoryState {
    next_id: i64,
    requests: Vec<TravelRequest>,
}

impl Default for MemoryState {
    fn default() -> Self {
        Self { next_id: 1, requests: Vec::new() }
    }
}

/// Process-local store. Contents are lost on restart.
#[derive(Default)]
pub struct InMemoryTravelRequestRepository {
    state: RwLock<MemoryState>,
}

#[async_trait::async_trait]
impl TravelRequestRepository for InMemoryTravelRequestRepository {
    async fn create(&self, request: NewTravelRequest) -> Result<TravelRequest, RepositoryError> {
        let mut state = self.state.write().await;
        let id = TravelRequestId(state.next_id);
        state.next_id += 1;

        let record = TravelRequest::from_new(id, request, Utc::now());
        state.requests.push(record.clone());
        Ok(record)
    }

    async fn list(&self) -> Result<Vec<TravelRequest>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state.requests.iter().rev().cloned().collect())
    }

    async fn find_by_id(
        &self,
        id: TravelRequestId,
    ) -> Result<Option<TravelRequest>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state.requests.iter().find(|request| request.id == id).cloned())
    }

    async fn update(
        &self,
        id: TravelRequestId,
        patch: TravelRequestPatch,
    ) -> Result<TravelRequest, RepositoryError> {
        let mut state = self.state.write().await;
        let record = state
            .requests
            .iter_mut()
            .find(|request| request.id == id)
            .ok_or(RepositoryError::NotFound(id))?;

        patch.apply_to(record, Utc::now());
        Ok(record.clone())
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use tripdesk_core::domain::travel_request::{
        NewTravelRequest, TravelRequestId, TravelRequestPatch, TravelRequestStatus,
    };

    use crate::repositories::{
        InMemoryTravelRequestRepository, RepositoryError, TravelRequestRepository,
    };

    fn new_request(name: &str) -> NewTravelRequest {
        let start = NaiveDate::from_ymd_opt(2024, 5, 1).expect("valid date");
        NewTravelRequest::minimal(name, start)
    }

    #[tokio::test]
    async fn ids_are_sequential_and_never_reused() {
        let repo = InMemoryTravelRequestRepository::default();

        let first = repo.create(new_request("Jane Doe")).await.expect("create first");
        let second = repo.create(new_request("Sam Field")).await.expect("create second");

        assert_eq!(first.id, TravelRequestId(1));
        assert_eq!(second.id, TravelRequestId(2));
        assert_eq!(first.status, TravelRequestStatus::WaitingForQuote);
    }

    #[tokio::test]
    async fn list_returns_newest_first() {
        let repo = InMemoryTravelRequestRepository::default();
        repo.create(new_request("Jane Doe")).await.expect("create");
        repo.create(new_request("Sam Field")).await.expect("create");

        let names: Vec<String> =
            repo.list().await.expect("list").into_iter().map(|r| r.employee_name).collect();

        assert_eq!(names, vec!["Sam Field".to_string(), "Jane Doe".to_string()]);
    }

    #[tokio::test]
    async fn update_of_unknown_id_is_not_found() {
        let repo = InMemoryTravelRequestRepository::default();

        let error = repo
            .update(TravelRequestId(404), TravelRequestPatch::status(TravelRequestStatus::Approved))
            .await
            .expect_err("unknown id");

        assert!(matches!(error, RepositoryError::NotFound(TravelRequestId(404))));
    }
}
