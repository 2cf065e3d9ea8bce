mod catalog;
mod certificate;
mod completion;
mod enrollment;
mod ids;
mod learner;

pub use ids::{
    CertificateId, CompletionId, CourseId, EnrollmentId, LessonId, ParseIdError, UserId,
};

pub use catalog::{CatalogError, Course, Lesson};
pub use certificate::{Certificate, CertificateMetadata, NewCertificate};
pub use completion::{CompletionError, LessonCompletion};
pub use enrollment::{Enrollment, EnrollmentError, EnrollmentStatus};
pub use learner::{
    Experience, ExperienceError, Learner, LearnerError, XP_PER_LESSON, XP_PER_LEVEL,
    level_for_xp,
};
