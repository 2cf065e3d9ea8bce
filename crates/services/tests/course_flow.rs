use chrono::Duration;
use progress_core::model::{
    Course, CourseId, EnrollmentStatus, Learner, Lesson, LessonId, UserId, XP_PER_LESSON,
};
use progress_core::time::{fixed_clock, fixed_now};
use services::{AppServices, CertificateServiceError, CompletionServiceError};

const ADA: UserId = UserId::new(1);
const TEACHER: UserId = UserId::new(2);
const COURSE: CourseId = CourseId::new(100);

async fn sqlite_services() -> AppServices {
    let path = std::env::temp_dir().join(format!("progress-flow-{}.sqlite3", uuid::Uuid::new_v4()));
    let url = format!("sqlite://{}?mode=rwc", path.display());
    AppServices::new_sqlite(&url, fixed_clock())
        .await
        .expect("sqlite services")
}

async fn seed(app: &AppServices, lessons: u64) {
    let storage = app.storage();
    for (id, username) in [(ADA, "ada"), (TEACHER, "grace")] {
        let learner = Learner::new(id, username, username, "", fixed_now()).unwrap();
        storage.learners.upsert_learner(&learner).await.unwrap();
    }
    let course = Course::new(COURSE, "Ownership 101", Some(TEACHER), fixed_now()).unwrap();
    storage.catalog.upsert_course(&course).await.unwrap();
    for id in 1..=lessons {
        let position = u32::try_from(id).unwrap();
        let lesson = Lesson::new(LessonId::new(id), COURSE, format!("Part {id}"), position).unwrap();
        storage.catalog.upsert_lesson(&lesson).await.unwrap();
    }
}

#[tokio::test]
async fn learner_completes_course_and_receives_certificate() {
    let app = sqlite_services().await;
    seed(&app, 4).await;

    app.enrollments().enroll(ADA, COURSE).await.unwrap();

    let completions = app.completions();
    for lesson in 1..=3 {
        let outcome = completions
            .complete_lesson(ADA, LessonId::new(lesson), COURSE)
            .await
            .unwrap();
        assert!(!outcome.course_completed);
    }

    let progress = app.progress().course_progress(ADA, COURSE).await.unwrap();
    assert!((progress.ratio() - 0.75).abs() < f64::EPSILON);

    let err = app.certificates().issue_certificate(ADA, COURSE).await.unwrap_err();
    assert!(matches!(err, CertificateServiceError::CourseNotCompleted { .. }));

    let last = completions
        .complete_lesson(ADA, LessonId::new(4), COURSE)
        .await
        .unwrap();
    assert!(last.course_completed);
    assert_eq!(last.experience.xp(), 4 * XP_PER_LESSON);

    let enrollment = app
        .enrollments()
        .enrollment(ADA, COURSE)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(enrollment.status(), EnrollmentStatus::Completed);

    let first = app.certificates().issue_certificate(ADA, COURSE).await.unwrap();
    assert!(first.newly_issued);
    let artifact = first.artifact.unwrap();
    assert!(String::from_utf8(artifact.bytes).unwrap().contains("Ownership 101"));

    let again = app.certificates().issue_certificate(ADA, COURSE).await.unwrap();
    assert!(!again.newly_issued);
    assert_eq!(again.certificate, first.certificate);

    let rendered = app.certificates().render_certificate(ADA, COURSE).await.unwrap();
    assert_eq!(rendered.certificate, first.certificate);
    assert!(String::from_utf8(rendered.artifact.bytes).unwrap().contains("Ownership 101"));
}

#[tokio::test]
async fn lessons_added_after_completion_do_not_reopen_enrollment() {
    let app = sqlite_services().await;
    seed(&app, 1).await;
    app.enrollments().enroll(ADA, COURSE).await.unwrap();
    app.completions()
        .complete_lesson(ADA, LessonId::new(1), COURSE)
        .await
        .unwrap();

    let extra = Lesson::new(LessonId::new(2), COURSE, "Bonus", 2).unwrap();
    app.storage().catalog.upsert_lesson(&extra).await.unwrap();

    let progress = app.progress().course_progress(ADA, COURSE).await.unwrap();
    assert_eq!(progress.completed(), 1);
    assert_eq!(progress.total(), 2);

    let enrollment = app
        .enrollments()
        .enrollment(ADA, COURSE)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(enrollment.status(), EnrollmentStatus::Completed);
}

#[tokio::test]
async fn re_completion_keeps_first_timestamp_and_xp() {
    let app = sqlite_services().await;
    seed(&app, 2).await;

    let first = app
        .completions()
        .complete_lesson(ADA, LessonId::new(1), COURSE)
        .await
        .unwrap();

    let mut clock = fixed_clock();
    clock.advance(Duration::days(1));
    let later = AppServices::with_storage(
        app.storage().clone(),
        clock,
        std::sync::Arc::new(services::PlainTextRenderer),
    );
    let err = later
        .completions()
        .complete_lesson(ADA, LessonId::new(1), COURSE)
        .await
        .unwrap_err();
    assert!(matches!(err, CompletionServiceError::AlreadyCompleted { .. }));

    let stored = app
        .completions()
        .completions_for_course(ADA, COURSE)
        .await
        .unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].completed_at(), first.completion.completed_at());
    assert_eq!(
        app.experience().experience(ADA).await.unwrap().xp(),
        XP_PER_LESSON
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_completions_over_sqlite_award_once() {
    let app = sqlite_services().await;
    seed(&app, 2).await;
    app.enrollments().enroll(ADA, COURSE).await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..10 {
        let completions = app.completions();
        handles.push(tokio::spawn(async move {
            completions.complete_lesson(ADA, LessonId::new(1), COURSE).await
        }));
    }

    let mut succeeded = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => succeeded += 1,
            Err(CompletionServiceError::AlreadyCompleted { .. }) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(succeeded, 1);

    let experience = app.experience().experience(ADA).await.unwrap();
    assert_eq!(experience.xp(), XP_PER_LESSON);
    assert_eq!(experience.level(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_certificate_requests_over_sqlite_share_one_record() {
    let app = sqlite_services().await;
    seed(&app, 1).await;
    app.enrollments().enroll(ADA, COURSE).await.unwrap();
    app.completions()
        .complete_lesson(ADA, LessonId::new(1), COURSE)
        .await
        .unwrap();

    let mut handles = Vec::new();
    for _ in 0..10 {
        let certificates = app.certificates();
        handles.push(tokio::spawn(async move {
            certificates.issue_certificate(ADA, COURSE).await
        }));
    }

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap().unwrap().certificate.id);
    }
    ids.dedup();
    assert_eq!(ids.len(), 1);
    assert_eq!(
        app.certificates().certificates_for_learner(ADA).await.unwrap().len(),
        1
    );
}

#[tokio::test]
async fn certificate_requested_later_keeps_original_issue_date() {
    let app = sqlite_services().await;
    seed(&app, 1).await;
    app.enrollments().enroll(ADA, COURSE).await.unwrap();
    app.completions()
        .complete_lesson(ADA, LessonId::new(1), COURSE)
        .await
        .unwrap();
    let issued = app.certificates().issue_certificate(ADA, COURSE).await.unwrap();

    let mut clock = fixed_clock();
    clock.advance(Duration::weeks(3));
    let later = AppServices::with_storage(
        app.storage().clone(),
        clock,
        std::sync::Arc::new(services::PlainTextRenderer),
    );
    let again = later.certificates().issue_certificate(ADA, COURSE).await.unwrap();

    assert!(!again.newly_issued);
    assert_eq!(again.certificate.issued_at, fixed_now());
    assert_eq!(again.certificate, issued.certificate);
}

#[tokio::test]
async fn teacher_cannot_enroll_and_unenrolled_learner_gets_no_certificate() {
    let app = sqlite_services().await;
    seed(&app, 1).await;

    let err = app.enrollments().enroll(TEACHER, COURSE).await.unwrap_err();
    assert!(matches!(
        err,
        services::EnrollmentServiceError::TeacherCannotEnroll { .. }
    ));

    let err = app.certificates().issue_certificate(ADA, COURSE).await.unwrap_err();
    assert!(matches!(err, CertificateServiceError::NotEnrolled { .. }));
}
