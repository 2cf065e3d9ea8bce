use thiserror::Error;

use progress_core::model::CertificateMetadata;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RenderError {
    #[error("certificate rendering failed: {0}")]
    Failed(String),
}

/// Turns certificate metadata into a displayable artifact.
///
/// Rendering is a presentation concern: the certificate record exists
/// whether or not an artifact was ever produced for it.
pub trait CertificateRenderer: Send + Sync {
    /// # Errors
    ///
    /// Returns `RenderError` if the artifact cannot be produced.
    fn render(&self, metadata: &CertificateMetadata) -> Result<Vec<u8>, RenderError>;

    /// MIME type of the bytes returned by `render`.
    fn content_type(&self) -> &'static str;
}

/// Renders a certificate as a UTF-8 text page.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextRenderer;

impl CertificateRenderer for PlainTextRenderer {
    fn render(&self, metadata: &CertificateMetadata) -> Result<Vec<u8>, RenderError> {
        let learner = metadata.learner_name.trim();
        if learner.is_empty() {
            return Err(RenderError::Failed("learner name is empty".to_owned()));
        }

        let page = format!(
            "Certificate of Achievement\n\
             \n\
             This is to certify that\n\
             \n\
             {learner}\n\
             \n\
             has successfully completed the course:\n\
             {course}\n\
             \n\
             Date: {date}\n",
            course = metadata.course_name,
            date = metadata.issued_at.format("%Y-%m-%d"),
        );
        Ok(page.into_bytes())
    }

    fn content_type(&self) -> &'static str {
        "text/plain; charset=utf-8"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use progress_core::time::fixed_now;

    fn metadata(name: &str) -> CertificateMetadata {
        CertificateMetadata {
            learner_name: name.to_owned(),
            course_name: "Rust Basics".to_owned(),
            issued_at: fixed_now(),
        }
    }

    #[test]
    fn plain_text_contains_names_and_date() {
        let bytes = PlainTextRenderer.render(&metadata("Ada Lovelace")).unwrap();
        let text = String::from_utf8(bytes).unwrap();

        assert!(text.starts_with("Certificate of Achievement"));
        assert!(text.contains("Ada Lovelace"));
        assert!(text.contains("Rust Basics"));
        assert!(text.contains("Date: 2023-11-14"));
    }

    #[test]
    fn blank_learner_name_fails() {
        let err = PlainTextRenderer.render(&metadata("  ")).unwrap_err();
        assert!(matches!(err, RenderError::Failed(_)));
    }
}
