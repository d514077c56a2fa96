pub mod config;
pub mod domain;
pub mod errors;
pub mod workflow;

pub use domain::quote_document::{QuoteUpload, PDF_MEDIA_TYPE};
pub use domain::travel_request::{
    NewTravelRequest, TravelMode, TravelRequest, TravelRequestId, TravelRequestPatch,
    TravelRequestStatus, TravelRequestSubmission, TripType,
};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use workflow::{DashboardView, StatusTransition, TransitionKind};
