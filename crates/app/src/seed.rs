use chrono::{DateTime, Utc};

use progress_core::Error;
use progress_core::model::{Course, CourseId, Learner, Lesson, LessonId, UserId};

pub struct DemoCatalog {
    pub learners: Vec<Learner>,
    pub course: Course,
    pub lessons: Vec<Lesson>,
}

const DEMO_LESSONS: [&str; 4] = [
    "Ownership and moves",
    "Borrowing",
    "Lifetimes",
    "Smart pointers",
];

/// Learner 1 studies course 1, which learner 2 teaches.
pub fn demo_catalog(now: DateTime<Utc>) -> Result<DemoCatalog, Error> {
    let learners = vec![
        Learner::new(UserId::new(1), "ada", "Ada", "Lovelace", now)?,
        Learner::new(UserId::new(2), "grace", "Grace", "Hopper", now)?,
    ];
    let course = Course::new(CourseId::new(1), "Rust Fundamentals", Some(UserId::new(2)), now)?;

    let mut lessons = Vec::with_capacity(DEMO_LESSONS.len());
    for (position, (id, title)) in (0_u32..).zip((1_u64..).zip(DEMO_LESSONS)) {
        lessons.push(Lesson::new(LessonId::new(id), course.id(), title, position)?);
    }

    Ok(DemoCatalog {
        learners,
        course,
        lessons,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use progress_core::time::fixed_now;

    #[test]
    fn demo_catalog_is_ordered_and_taught_by_second_learner() {
        let demo = demo_catalog(fixed_now()).unwrap();
        assert_eq!(demo.learners.len(), 2);
        assert!(demo.course.is_taught_by(UserId::new(2)));

        let positions: Vec<u32> = demo.lessons.iter().map(Lesson::position).collect();
        assert_eq!(positions, vec![0, 1, 2, 3]);
        assert!(demo.lessons.iter().all(|l| l.belongs_to(demo.course.id())));
    }
}
