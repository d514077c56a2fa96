pub mod quote_document;
pub mod travel_request;
