use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use progress_core::model::{
    Certificate, CertificateId, CompletionId, Course, CourseId, Enrollment, EnrollmentId,
    Experience, Learner, Lesson, LessonCompletion, LessonId, NewCertificate, UserId,
};

use crate::repository::{
    AppliedCompletion, CatalogRepository, CertificateRepository, CompletionInsert,
    CompletionPersistence, CompletionRepository, EnrollmentRepository, LearnerRepository,
    NewCompletion, StorageError,
};

#[derive(Default)]
struct State {
    courses: HashMap<CourseId, Course>,
    lessons: HashMap<LessonId, Lesson>,
    learners: HashMap<UserId, Learner>,
    enrollments: HashMap<(UserId, CourseId), Enrollment>,
    completions: HashMap<(UserId, LessonId), LessonCompletion>,
    certificates: HashMap<(UserId, CourseId), Certificate>,
    next_enrollment_id: u64,
    next_completion_id: u64,
    next_certificate_id: u64,
}

impl State {
    fn insert_completion(&mut self, completion: &NewCompletion) -> CompletionInsert {
        let key = (completion.user_id, completion.lesson_id);
        let id = match self.completions.get(&key) {
            Some(existing) if existing.is_completed() => {
                return CompletionInsert::Existing(existing.clone());
            }
            Some(pending) => pending.id(),
            None => {
                self.next_completion_id += 1;
                CompletionId::new(self.next_completion_id)
            }
        };
        let record = LessonCompletion::completed(
            id,
            completion.user_id,
            completion.lesson_id,
            completion.course_id,
            completion.completed_at,
        );
        self.completions.insert(key, record.clone());
        CompletionInsert::Inserted(record)
    }

    fn award(&mut self, user: UserId, amount: u64) -> Result<Experience, StorageError> {
        let learner = self.learners.get_mut(&user).ok_or(StorageError::NotFound)?;
        let experience = learner.experience().award(amount);
        *learner = learner.clone().with_experience(experience);
        Ok(experience)
    }
}

/// Simple in-memory repository implementation for testing and prototyping.
///
/// All maps sit behind one lock, so every trait method is atomic with
/// respect to every other, uniqueness checks included.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    state: Arc<Mutex<State>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, StorageError> {
        self.state
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }
}

#[async_trait]
impl CatalogRepository for InMemoryRepository {
    async fn upsert_course(&self, course: &Course) -> Result<(), StorageError> {
        self.lock()?.courses.insert(course.id(), course.clone());
        Ok(())
    }

    async fn upsert_lesson(&self, lesson: &Lesson) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        if !guard.courses.contains_key(&lesson.course_id()) {
            return Err(StorageError::NotFound);
        }
        guard.lessons.insert(lesson.id(), lesson.clone());
        Ok(())
    }

    async fn get_course(&self, id: CourseId) -> Result<Option<Course>, StorageError> {
        Ok(self.lock()?.courses.get(&id).cloned())
    }

    async fn get_lesson(&self, id: LessonId) -> Result<Option<Lesson>, StorageError> {
        Ok(self.lock()?.lessons.get(&id).cloned())
    }

    async fn lessons_for_course(&self, course: CourseId) -> Result<Vec<Lesson>, StorageError> {
        let guard = self.lock()?;
        let mut lessons: Vec<Lesson> = guard
            .lessons
            .values()
            .filter(|l| l.belongs_to(course))
            .cloned()
            .collect();
        lessons.sort_by_key(|l| (l.position(), l.id()));
        Ok(lessons)
    }
}

#[async_trait]
impl LearnerRepository for InMemoryRepository {
    async fn upsert_learner(&self, learner: &Learner) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        let experience = guard
            .learners
            .get(&learner.id())
            .map_or_else(|| learner.experience(), Learner::experience);
        guard
            .learners
            .insert(learner.id(), learner.clone().with_experience(experience));
        Ok(())
    }

    async fn get_learner(&self, id: UserId) -> Result<Option<Learner>, StorageError> {
        Ok(self.lock()?.learners.get(&id).cloned())
    }

    async fn award_xp(&self, id: UserId, amount: u64) -> Result<Experience, StorageError> {
        self.lock()?.award(id, amount)
    }
}

#[async_trait]
impl EnrollmentRepository for InMemoryRepository {
    async fn insert_enrollment(
        &self,
        user: UserId,
        course: CourseId,
        at: DateTime<Utc>,
    ) -> Result<Enrollment, StorageError> {
        let mut guard = self.lock()?;
        if guard.enrollments.contains_key(&(user, course)) {
            return Err(StorageError::Conflict);
        }
        guard.next_enrollment_id += 1;
        let enrollment =
            Enrollment::new_active(EnrollmentId::new(guard.next_enrollment_id), user, course, at);
        guard.enrollments.insert((user, course), enrollment.clone());
        Ok(enrollment)
    }

    async fn get_enrollment(
        &self,
        user: UserId,
        course: CourseId,
    ) -> Result<Option<Enrollment>, StorageError> {
        Ok(self.lock()?.enrollments.get(&(user, course)).cloned())
    }

    async fn enrollments_for_user(&self, user: UserId) -> Result<Vec<Enrollment>, StorageError> {
        let guard = self.lock()?;
        let mut out: Vec<Enrollment> = guard
            .enrollments
            .values()
            .filter(|e| e.user_id() == user)
            .cloned()
            .collect();
        out.sort_by_key(Enrollment::id);
        Ok(out)
    }

    async fn enrollments_for_course(
        &self,
        course: CourseId,
    ) -> Result<Vec<Enrollment>, StorageError> {
        let guard = self.lock()?;
        let mut out: Vec<Enrollment> = guard
            .enrollments
            .values()
            .filter(|e| e.course_id() == course)
            .cloned()
            .collect();
        out.sort_by_key(Enrollment::id);
        Ok(out)
    }

    async fn mark_completed(
        &self,
        user: UserId,
        course: CourseId,
        at: DateTime<Utc>,
    ) -> Result<bool, StorageError> {
        let mut guard = self.lock()?;
        Ok(guard
            .enrollments
            .get_mut(&(user, course))
            .is_some_and(|e| e.complete(at)))
    }
}

#[async_trait]
impl CompletionRepository for InMemoryRepository {
    async fn record_completion(
        &self,
        completion: NewCompletion,
    ) -> Result<CompletionInsert, StorageError> {
        Ok(self.lock()?.insert_completion(&completion))
    }

    async fn get_completion(
        &self,
        user: UserId,
        lesson: LessonId,
    ) -> Result<Option<LessonCompletion>, StorageError> {
        Ok(self.lock()?.completions.get(&(user, lesson)).cloned())
    }

    async fn completions_for_course(
        &self,
        user: UserId,
        course: CourseId,
    ) -> Result<Vec<LessonCompletion>, StorageError> {
        let guard = self.lock()?;
        let mut out: Vec<LessonCompletion> = guard
            .completions
            .values()
            .filter(|c| c.user_id() == user && c.course_id() == course)
            .cloned()
            .collect();
        out.sort_by_key(LessonCompletion::id);
        Ok(out)
    }
}

#[async_trait]
impl CompletionPersistence for InMemoryRepository {
    async fn apply_completion(
        &self,
        completion: NewCompletion,
        xp: u64,
    ) -> Result<AppliedCompletion, StorageError> {
        let mut guard = self.lock()?;
        if !guard.learners.contains_key(&completion.user_id) {
            return Err(StorageError::NotFound);
        }
        match guard.insert_completion(&completion) {
            CompletionInsert::Existing(record) => Ok(AppliedCompletion::AlreadyRecorded(record)),
            CompletionInsert::Inserted(record) => {
                let experience = guard.award(completion.user_id, xp)?;
                Ok(AppliedCompletion::Recorded {
                    completion: record,
                    experience,
                })
            }
        }
    }
}

#[async_trait]
impl CertificateRepository for InMemoryRepository {
    async fn insert_certificate(
        &self,
        certificate: &NewCertificate,
    ) -> Result<Certificate, StorageError> {
        let mut guard = self.lock()?;
        let key = (certificate.user_id, certificate.course_id);
        if guard.certificates.contains_key(&key) {
            return Err(StorageError::Conflict);
        }
        guard.next_certificate_id += 1;
        let stored = certificate
            .clone()
            .assign_id(CertificateId::new(guard.next_certificate_id));
        guard.certificates.insert(key, stored.clone());
        Ok(stored)
    }

    async fn get_certificate(
        &self,
        user: UserId,
        course: CourseId,
    ) -> Result<Option<Certificate>, StorageError> {
        Ok(self.lock()?.certificates.get(&(user, course)).cloned())
    }

    async fn certificates_for_user(&self, user: UserId) -> Result<Vec<Certificate>, StorageError> {
        let guard = self.lock()?;
        let mut out: Vec<Certificate> = guard
            .certificates
            .values()
            .filter(|c| c.user_id == user)
            .cloned()
            .collect();
        out.sort_by_key(|c| c.id);
        Ok(out)
    }
}
