use crate::domain::travel_request::TravelRequestId;
use crate::errors::DomainError;

pub const PDF_MEDIA_TYPE: &str = "application/pdf";

/// A quote document as received from a multipart upload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuoteUpload {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl QuoteUpload {
    pub fn pdf(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: Some(file_name.into()),
            content_type: Some(PDF_MEDIA_TYPE.to_string()),
            bytes,
        }
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// The media type must be exactly `application/pdf`; no sniffing, no parameters.
    pub fn ensure_pdf(&self) -> Result<(), DomainError> {
        match self.content_type.as_deref() {
            Some(PDF_MEDIA_TYPE) => Ok(()),
            _ => Err(DomainError::InvalidFile),
        }
    }

    pub fn ensure_within(&self, limit: usize) -> Result<(), DomainError> {
        if self.size() > limit {
            return Err(DomainError::FileTooLarge { size: self.size(), limit });
        }
        Ok(())
    }
}

/// Object key for a quote stored outside the record.
pub fn quote_blob_key(id: TravelRequestId, unix_millis: i64) -> String {
    format!("quote-{id}-{unix_millis}.pdf")
}

#[cfg(test)]
mod tests {
    use super::{quote_blob_key, QuoteUpload, PDF_MEDIA_TYPE};
    use crate::domain::travel_request::TravelRequestId;
    use crate::errors::DomainError;

    #[test]
    fn only_exact_pdf_media_type_is_accepted() {
        let pdf = QuoteUpload::pdf("quote.pdf", b"%PDF-1.4".to_vec());
        assert_eq!(pdf.ensure_pdf(), Ok(()));

        for content_type in [None, Some("text/plain"), Some("application/pdf; charset=binary")] {
            let upload = QuoteUpload {
                file_name: Some("quote.pdf".to_string()),
                content_type: content_type.map(str::to_string),
                bytes: b"%PDF-1.4".to_vec(),
            };
            assert_eq!(upload.ensure_pdf(), Err(DomainError::InvalidFile), "{content_type:?}");
        }
        assert_eq!(pdf.content_type.as_deref(), Some(PDF_MEDIA_TYPE));
    }

    #[test]
    fn size_limit_is_inclusive() {
        let upload = QuoteUpload::pdf("quote.pdf", vec![0; 16]);
        assert!(upload.ensure_within(16).is_ok());
        assert_eq!(upload.ensure_within(15), Err(DomainError::FileTooLarge { size: 16, limit: 15 }));
    }

    #[test]
    fn blob_key_embeds_request_id() {
        assert_eq!(quote_blob_key(TravelRequestId(42), 1_700_000_000_000), "quote-42-1700000000000.pdf");
    }
}
