use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};

use progress_core::Clock;
use progress_core::model::{CourseId, LessonId, UserId};

#[derive(Parser, Debug)]
#[command(name = "progress")]
#[command(about = "Course progress, experience and certificates for learners", version)]
pub struct Args {
    /// Database URL
    #[arg(long = "db", env = "PROGRESS_DB_URL", default_value = "sqlite:progress.sqlite3?mode=rwc")]
    pub db_url: String,

    /// Pin "now" to an RFC 3339 timestamp instead of the system clock
    #[arg(long, env = "PROGRESS_NOW", value_parser = parse_now)]
    pub now: Option<DateTime<Utc>>,

    /// Log filter, e.g. `info` or `services=debug`; falls back to RUST_LOG
    #[arg(long = "log")]
    pub log_filter: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

impl Args {
    pub fn clock(&self) -> Clock {
        self.now.map_or(Clock::Default, Clock::fixed)
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create or update a learner profile
    AddLearner {
        #[arg(long)]
        id: UserId,
        #[arg(long)]
        username: String,
        #[arg(long, default_value = "")]
        name: String,
        #[arg(long, default_value = "")]
        surname: String,
    },
    /// Create or update a course
    AddCourse {
        #[arg(long)]
        id: CourseId,
        #[arg(long)]
        name: String,
        /// Learner who teaches the course
        #[arg(long)]
        teacher: Option<UserId>,
    },
    /// Create or update a lesson of an existing course
    AddLesson {
        #[arg(long)]
        id: LessonId,
        #[arg(long)]
        course: CourseId,
        #[arg(long)]
        title: String,
        #[arg(long, default_value_t = 0)]
        position: u32,
    },
    /// Load a small demo catalog with two learners and one course
    SeedDemo,
    /// Enroll a learner in a course
    Enroll {
        #[arg(long)]
        user: UserId,
        #[arg(long)]
        course: CourseId,
    },
    /// List a learner's enrollments
    Enrollments {
        #[arg(long)]
        user: UserId,
    },
    /// Mark a lesson completed
    Complete {
        #[arg(long)]
        user: UserId,
        #[arg(long)]
        lesson: LessonId,
        #[arg(long)]
        course: CourseId,
    },
    /// Show course progress
    Progress {
        #[arg(long)]
        user: UserId,
        #[arg(long)]
        course: CourseId,
    },
    /// Show xp and level
    Experience {
        #[arg(long)]
        user: UserId,
    },
    /// Issue (or fetch) the certificate for a completed course
    Certificate {
        #[arg(long)]
        user: UserId,
        #[arg(long)]
        course: CourseId,
    },
    /// List a learner's certificates
    Certificates {
        #[arg(long)]
        user: UserId,
    },
    /// Render a certificate to a file, or to stdout
    Render {
        #[arg(long)]
        user: UserId,
        #[arg(long)]
        course: CourseId,
        #[arg(long)]
        out: Option<std::path::PathBuf>,
    },
}

fn parse_now(raw: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("expected RFC 3339 timestamp: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn parses_complete_with_fixed_clock() {
        let args = Args::try_parse_from([
            "progress",
            "--db",
            "sqlite::memory:",
            "--now",
            "2023-11-14T22:13:20Z",
            "complete",
            "--user",
            "1",
            "--lesson",
            "2",
            "--course",
            "3",
        ])
        .unwrap();

        assert!(args.clock().is_fixed());
        assert_eq!(args.clock().now().timestamp(), 1_700_000_000);
        match args.command {
            Command::Complete {
                user,
                lesson,
                course,
            } => {
                assert_eq!(user, UserId::new(1));
                assert_eq!(lesson, LessonId::new(2));
                assert_eq!(course, CourseId::new(3));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn rejects_malformed_ids_and_timestamps() {
        assert!(Args::try_parse_from(["progress", "experience", "--user", "abc"]).is_err());
        assert!(
            Args::try_parse_from(["progress", "--now", "yesterday", "experience", "--user", "1"])
                .is_err()
        );
    }
}
