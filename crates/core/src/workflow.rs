//! Status workflow for travel requests.
//!
//! `WAITING_FOR_QUOTE -> PENDING -> {APPROVED, REJECTED}` is the intended path,
//! but a status write is unconditional: callers may move a request from any
//! status to any other. Transitions are classified so irregular moves can be
//! logged; they are never refused.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::travel_request::{TravelRequest, TravelRequestStatus};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionKind {
    Forward,
    Repeat,
    Irregular,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct StatusTransition {
    pub from: TravelRequestStatus,
    pub to: TravelRequestStatus,
}

impl StatusTransition {
    pub fn new(from: TravelRequestStatus, to: TravelRequestStatus) -> Self {
        Self { from, to }
    }

    pub fn kind(&self) -> TransitionKind {
        use TravelRequestStatus::*;

        match (self.from, self.to) {
            (from, to) if from == to => TransitionKind::Repeat,
            (WaitingForQuote, Pending) | (Pending, Approved) | (Pending, Rejected) => {
                TransitionKind::Forward
            }
            _ => TransitionKind::Irregular,
        }
    }
}

/// Writes `target` onto the request and reports what moved.
pub fn apply_status(
    request: &mut TravelRequest,
    target: TravelRequestStatus,
    now: DateTime<Utc>,
) -> StatusTransition {
    let transition = StatusTransition::new(request.status, target);
    request.status = target;
    request.updated_at = now;
    transition
}

/// Operator may send a request for approval once a quote is attached.
/// Only the dashboard enforces this; the API accepts any status write.
pub fn can_submit_for_approval(request: &TravelRequest) -> bool {
    request.status == TravelRequestStatus::WaitingForQuote && request.has_quote()
}

/// Dashboard tabs. Every list tab shows one status; rejected requests have no tab.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DashboardView {
    #[default]
    NewRequest,
    AwaitingQuote,
    PendingApproval,
    Tickets,
}

impl DashboardView {
    pub const ALL: [Self; 4] =
        [Self::NewRequest, Self::AwaitingQuote, Self::PendingApproval, Self::Tickets];

    pub fn slug(self) -> &'static str {
        match self {
            Self::NewRequest => "request",
            Self::AwaitingQuote => "quotes",
            Self::PendingApproval => "approve",
            Self::Tickets => "tickets",
        }
    }

    pub fn from_slug(slug: Option<&str>) -> Self {
        let normalized = slug.map(|value| value.trim().to_ascii_lowercase());
        Self::ALL
            .into_iter()
            .find(|view| Some(view.slug()) == normalized.as_deref())
            .unwrap_or_default()
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::NewRequest => "New request",
            Self::AwaitingQuote => "Waiting",
            Self::PendingApproval => "Approvals",
            Self::Tickets => "Tickets",
        }
    }

    pub fn status(self) -> Option<TravelRequestStatus> {
        match self {
            Self::NewRequest => None,
            Self::AwaitingQuote => Some(TravelRequestStatus::WaitingForQuote),
            Self::PendingApproval => Some(TravelRequestStatus::Pending),
            Self::Tickets => Some(TravelRequestStatus::Approved),
        }
    }
}

pub fn filter_for_view(requests: &[TravelRequest], view: DashboardView) -> Vec<&TravelRequest> {
    match view.status() {
        Some(status) => requests.iter().filter(|request| request.status == status).collect(),
        None => Vec::new(),
    }
}
