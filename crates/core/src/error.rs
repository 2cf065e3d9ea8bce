use thiserror::Error;

use crate::model::{CatalogError, CompletionError, EnrollmentError, LearnerError};

/// Any validation failure raised by the domain model.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Completion(#[from] CompletionError),
    #[error(transparent)]
    Enrollment(#[from] EnrollmentError),
    #[error(transparent)]
    Learner(#[from] LearnerError),
}
