//! Operator dashboard served at `/`. One list call, filtered per tab.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Html,
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use tera::{Context, Tera};
use tracing::error;

use tripdesk_core::domain::travel_request::{TravelMode, TravelRequest};
use tripdesk_core::workflow::{can_submit_for_approval, filter_for_view, DashboardView};
use tripdesk_db::repositories::TravelRequestRepository;

const DASHBOARD_TEMPLATE: &str = "dashboard/index.html";

#[derive(Clone)]
pub struct DashboardState {
    requests: Arc<dyn TravelRequestRepository>,
    templates: Arc<Tera>,
}

impl DashboardState {
    pub fn new(requests: Arc<dyn TravelRequestRepository>, templates: Arc<Tera>) -> Self {
        Self { requests, templates }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct DashboardQuery {
    pub view: Option<String>,
}

#[derive(Debug, Serialize)]
struct TabLink {
    slug: &'static str,
    label: &'static str,
    count: Option<usize>,
    active: bool,
}

/// Display-ready row. Dates and labels are formatted here so templates stay dumb.
#[derive(Debug, Serialize)]
struct RequestRow {
    id: i64,
    employee_name: String,
    route: String,
    is_flight: bool,
    trip_type: &'static str,
    dates: String,
    passenger_count: u32,
    services: String,
    pickup: Option<String>,
    notes: Option<String>,
    quote_href: Option<String>,
    can_submit: bool,
    status: &'static str,
}

impl RequestRow {
    fn from_request(request: &TravelRequest) -> Self {
        let dates = if request.end_date == request.start_date {
            request.start_date.format("%d %b %Y").to_string()
        } else {
            format!(
                "{} to {}",
                request.start_date.format("%d %b %Y"),
                request.end_date.format("%d %b %Y")
            )
        };
        let pickup = request.pickup_location.as_ref().map(|location| match &request.pickup_time {
            Some(time) => format!("{location} at {time}"),
            None => location.clone(),
        });
        let services = request.service_labels();

        Self {
            id: request.id.0,
            employee_name: request.employee_name.clone(),
            route: request.route_label(),
            is_flight: request.travel_mode == TravelMode::Flight,
            trip_type: trip_type_label(request),
            dates,
            passenger_count: request.passenger_count,
            services: if services.is_empty() { "None".to_string() } else { services.join(", ") },
            pickup,
            notes: request.notes.clone(),
            quote_href: request.has_quote().then(|| format!("/api/requests/{}/quote", request.id)),
            can_submit: can_submit_for_approval(request),
            status: request.status.as_str(),
        }
    }
}

fn trip_type_label(request: &TravelRequest) -> &'static str {
    use tripdesk_core::domain::travel_request::TripType::*;
    match request.trip_type {
        OneWay => "One way",
        Return => "Return",
        MultiLeg => "Multi-leg",
    }
}

pub fn router(state: DashboardState) -> Router {
    Router::new().route("/", get(index)).with_state(state)
}

async fn index(
    Query(query): Query<DashboardQuery>,
    State(state): State<DashboardState>,
) -> Result<Html<String>, (StatusCode, Html<String>)> {
    let view = DashboardView::from_slug(query.view.as_deref());

    let requests = state.requests.list().await.map_err(|e| {
        error!(event_name = "dashboard.load.failed", error = %e, "failed to load travel requests");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Html("<h1>Could not load travel requests</h1>".to_string()),
        )
    })?;

    let tabs = DashboardView::ALL
        .into_iter()
        .map(|tab| TabLink {
            slug: tab.slug(),
            label: tab.label(),
            count: tab.status().map(|_| filter_for_view(&requests, tab).len()),
            active: tab == view,
        })
        .collect::<Vec<_>>();
    let rows = filter_for_view(&requests, view)
        .into_iter()
        .map(RequestRow::from_request)
        .collect::<Vec<_>>();

    let mut context = Context::new();
    context.insert("view", view.slug());
    context.insert("tabs", &tabs);
    context.insert("rows", &rows);

    state.templates.render(DASHBOARD_TEMPLATE, &context).map(Html).map_err(|e| {
        error!(event_name = "dashboard.render.failed", error = %e, "dashboard template failed");
        (StatusCode::INTERNAL_SERVER_ERROR, Html("<h1>Dashboard unavailable</h1>".to_string()))
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::extract::{Query, State};
    use chrono::NaiveDate;

    use tripdesk_core::domain::travel_request::{
        NewTravelRequest, TravelRequestPatch, TravelRequestStatus,
    };
    use tripdesk_db::repositories::{InMemoryTravelRequestRepository, TravelRequestRepository};

    use super::{index, DashboardQuery, DashboardState};
    use crate::templates;

    async fn state_with_requests() -> DashboardState {
        let repo = Arc::new(InMemoryTravelRequestRepository::default());
        let start = NaiveDate::from_ymd_opt(2024, 5, 1).expect("valid date");

        repo.create(NewTravelRequest::minimal("Awaiting Quote", start)).await.expect("create");
        let quoted =
            repo.create(NewTravelRequest::minimal("Quoted Person", start)).await.expect("create");
        repo.update(quoted.id, TravelRequestPatch::quote_reference("/api/quotes/quote-2-1.pdf"))
            .await
            .expect("quote");
        let approved =
            repo.create(NewTravelRequest::minimal("Ticketed Traveller", start)).await.expect("create");
        repo.update(approved.id, TravelRequestPatch::status(TravelRequestStatus::Approved))
            .await
            .expect("approve");
        let rejected =
            repo.create(NewTravelRequest::minimal("Rejected Traveller", start)).await.expect("create");
        repo.update(rejected.id, TravelRequestPatch::status(TravelRequestStatus::Rejected))
            .await
            .expect("reject");

        DashboardState::new(repo, templates::load())
    }

    async fn render(view: &str) -> String {
        let state = state_with_requests().await;
        let query = DashboardQuery { view: Some(view.to_string()) };
        index(Query(query), State(state)).await.expect("render").0
    }

    #[tokio::test]
    async fn quotes_tab_lists_awaiting_requests_and_offers_submit_only_with_quote() {
        let html = render("quotes").await;

        assert!(html.contains("Awaiting Quote"));
        assert!(html.contains("Quoted Person"));
        assert!(!html.contains("Ticketed Traveller"));
        assert_eq!(html.matches("data-action=\"submit-approval\"").count(), 1);
    }

    #[tokio::test]
    async fn tickets_tab_shows_only_approved_requests() {
        let html = render("tickets").await;

        assert!(html.contains("Ticketed Traveller"));
        assert!(!html.contains("Awaiting Quote"));
    }

    #[tokio::test]
    async fn rejected_requests_appear_in_no_tab() {
        for view in ["request", "quotes", "approve", "tickets"] {
            assert!(!render(view).await.contains("Rejected Traveller"), "{view}");
        }
    }

    #[tokio::test]
    async fn unknown_view_falls_back_to_request_form() {
        let html = render("nonsense").await;
        assert!(html.contains("id=\"request-form\""));
    }
}
