use thiserror::Error;

use crate::domain::travel_request::TravelRequestId;

const MIB: usize = 1024 * 1024;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("Missing required fields: employeeName and startDate are required")]
    MissingRequiredFields,
    #[error("invalid `{field}`: {reason}")]
    InvalidField { field: &'static str, reason: String },
    #[error("Invalid file. Please upload a PDF file.")]
    InvalidFile,
    #[error("File too large. Maximum size is {}.", size_label(.limit))]
    FileTooLarge { size: usize, limit: usize },
    #[error(
        "File too large for current storage. Enable blob storage for files larger than {}.",
        size_label(.limit)
    )]
    ExceedsInlineStorage { size: usize, limit: usize },
}

/// Whole megabytes for large limits, rounded up so a limit never reads as zero.
fn size_label(bytes: &usize) -> String {
    const KIB: usize = 1024;
    match *bytes {
        bytes if bytes >= MIB => format!("{}MB", bytes.div_ceil(MIB)),
        bytes if bytes >= KIB => format!("{}KB", bytes.div_ceil(KIB)),
        bytes => format!("{bytes} bytes"),
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("travel request {0} not found")]
    NotFound(TravelRequestId),
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("storage failure: {0}")]
    Storage(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("not found: {message}")]
    NotFound { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn status_code(&self) -> u16 {
        match self {
            Self::BadRequest { .. } => 400,
            Self::NotFound { .. } => 404,
            Self::ServiceUnavailable { .. } => 503,
            Self::Internal { .. } => 500,
        }
    }

    /// Message placed in the `{"error": ...}` body.
    pub fn message(&self) -> &str {
        match self {
            Self::BadRequest { message, .. }
            | Self::NotFound { message, .. }
            | Self::ServiceUnavailable { message, .. }
            | Self::Internal { message, .. } => message,
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. }
            | Self::NotFound { correlation_id, .. }
            | Self::ServiceUnavailable { correlation_id, .. }
            | Self::Internal { correlation_id, .. } => correlation_id,
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::NotFound { correlation_id: id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        let correlation_id = "unassigned".to_owned();
        match value {
            ApplicationError::Domain(error) => {
                Self::BadRequest { message: error.to_string(), correlation_id }
            }
            ApplicationError::NotFound(_) => {
                Self::NotFound { message: "Not found".to_owned(), correlation_id }
            }
            ApplicationError::Persistence(message) => {
                Self::Internal { message: format!("Database error: {message}"), correlation_id }
            }
            ApplicationError::Storage(message) => {
                Self::Internal { message: format!("Storage error: {message}"), correlation_id }
            }
            ApplicationError::Configuration(message) => {
                Self::ServiceUnavailable { message, correlation_id }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::travel_request::TravelRequestId;
    use crate::errors::{ApplicationError, DomainError, InterfaceError};

    #[test]
    fn domain_error_maps_to_bad_request_with_message() {
        let interface =
            ApplicationError::from(DomainError::MissingRequiredFields).into_interface("req-1");

        assert!(matches!(
            interface,
            InterfaceError::BadRequest { ref correlation_id, .. } if correlation_id == "req-1"
        ));
        assert_eq!(interface.status_code(), 400);
        assert_eq!(
            interface.message(),
            "Missing required fields: employeeName and startDate are required"
        );
    }

    #[test]
    fn invalid_file_keeps_user_facing_text() {
        let interface = ApplicationError::from(DomainError::InvalidFile).into_interface("req-2");
        assert_eq!(interface.message(), "Invalid file. Please upload a PDF file.");
    }

    #[test]
    fn file_size_messages_report_megabytes() {
        let too_large = DomainError::FileTooLarge { size: 0, limit: 100 * 1024 * 1024 };
        let inline = DomainError::ExceedsInlineStorage { size: 0, limit: 18 * 1024 * 1024 };

        assert_eq!(too_large.to_string(), "File too large. Maximum size is 100MB.");
        assert!(inline.to_string().contains("larger than 18MB"));
    }

    #[test]
    fn small_limits_never_read_as_zero_megabytes() {
        let kib = DomainError::FileTooLarge { size: 2048, limit: 1024 };
        let bytes = DomainError::FileTooLarge { size: 600, limit: 512 };
        let odd = DomainError::FileTooLarge { size: 0, limit: 3 * 1024 * 1024 / 2 };

        assert_eq!(kib.to_string(), "File too large. Maximum size is 1KB.");
        assert_eq!(bytes.to_string(), "File too large. Maximum size is 512 bytes.");
        assert_eq!(odd.to_string(), "File too large. Maximum size is 2MB.");
    }

    #[test]
    fn not_found_maps_to_404() {
        let interface =
            ApplicationError::NotFound(TravelRequestId(99)).into_interface("req-3");

        assert!(matches!(interface, InterfaceError::NotFound { .. }));
        assert_eq!(interface.status_code(), 404);
        assert_eq!(interface.message(), "Not found");
    }

    #[test]
    fn persistence_and_storage_errors_map_to_internal() {
        let persistence =
            ApplicationError::Persistence("database is locked".to_owned()).into_interface("req-4");
        let storage = ApplicationError::Storage("disk full".to_owned()).into_interface("req-5");

        assert_eq!(persistence.status_code(), 500);
        assert_eq!(persistence.message(), "Database error: database is locked");
        assert_eq!(storage.status_code(), 500);
        assert_eq!(storage.correlation_id(), "req-5");
    }

    #[test]
    fn configuration_error_maps_to_service_unavailable() {
        let interface = ApplicationError::Configuration("blob storage not configured".to_owned())
            .into_interface("req-6");

        assert_eq!(interface.status_code(), 503);
    }
}
