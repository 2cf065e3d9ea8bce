//! Command-line front end for the course progress engine.
//!
//! ```bash
//! progress seed-demo
//! progress enroll --user 1 --course 1
//! progress complete --user 1 --lesson 1 --course 1
//! progress progress --user 1 --course 1
//! progress render --user 1 --course 1 --out ada.txt
//! ```
//!
//! Every command prints its result as JSON on stdout; logs go to stderr.

mod cli;
mod seed;

use std::io::Write;

use anyhow::Context;
use clap::Parser;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use progress_core::model::{Course, Learner, Lesson};
use services::AppServices;

use crate::cli::{Args, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.log_filter.as_deref())?;

    let clock = args.clock();
    let app = AppServices::new_sqlite(&args.db_url, clock)
        .await
        .with_context(|| format!("opening {}", args.db_url))?;
    info!(db = %args.db_url, fixed_clock = clock.is_fixed(), "storage ready");

    run(&app, clock.now(), args.command).await
}

fn init_tracing(filter: Option<&str>) -> anyhow::Result<()> {
    let filter = match filter {
        Some(directives) => EnvFilter::try_new(directives)?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

async fn run(
    app: &AppServices,
    now: chrono::DateTime<chrono::Utc>,
    command: Command,
) -> anyhow::Result<()> {
    let storage = app.storage();
    match command {
        Command::AddLearner {
            id,
            username,
            name,
            surname,
        } => {
            let learner = Learner::new(id, username, name, surname, now)?;
            app.experience().register(&learner).await?;
            print_json(&app.experience().learner(id).await?)
        }
        Command::AddCourse { id, name, teacher } => {
            let course = Course::new(id, name, teacher, now)?;
            storage.catalog.upsert_course(&course).await?;
            print_json(&course)
        }
        Command::AddLesson {
            id,
            course,
            title,
            position,
        } => {
            let lesson = Lesson::new(id, course, title, position)?;
            storage
                .catalog
                .upsert_lesson(&lesson)
                .await
                .with_context(|| format!("course {course} must exist before adding lessons"))?;
            print_json(&lesson)
        }
        Command::SeedDemo => {
            let demo = seed::demo_catalog(now)?;
            for learner in &demo.learners {
                app.experience().register(learner).await?;
            }
            storage.catalog.upsert_course(&demo.course).await?;
            for lesson in &demo.lessons {
                storage.catalog.upsert_lesson(lesson).await?;
            }
            info!(
                learners = demo.learners.len(),
                lessons = demo.lessons.len(),
                "demo catalog seeded"
            );
            print_json(&demo.course)
        }
        Command::Enroll { user, course } => {
            print_json(&app.enrollments().enroll(user, course).await?)
        }
        Command::Enrollments { user } => {
            print_json(&app.enrollments().enrollments_for_learner(user).await?)
        }
        Command::Complete {
            user,
            lesson,
            course,
        } => print_json(&app.completions().complete_lesson(user, lesson, course).await?),
        Command::Progress { user, course } => {
            let progress = app.progress().course_progress(user, course).await?;
            print_json(&ProgressView {
                completed: progress.completed(),
                total: progress.total(),
                ratio: progress.ratio(),
                percent: progress.percent(),
            })
        }
        Command::Experience { user } => print_json(&app.experience().experience(user).await?),
        Command::Certificate { user, course } => {
            print_json(&app.certificates().issue_certificate(user, course).await?)
        }
        Command::Certificates { user } => {
            print_json(&app.certificates().certificates_for_learner(user).await?)
        }
        Command::Render { user, course, out } => {
            let rendered = app.certificates().render_certificate(user, course).await?;
            match out {
                Some(path) => {
                    std::fs::write(&path, &rendered.artifact.bytes)
                        .with_context(|| format!("writing {}", path.display()))?;
                    print_json(&rendered)
                }
                None => {
                    std::io::stdout().write_all(&rendered.artifact.bytes)?;
                    Ok(())
                }
            }
        }
    }
}

#[derive(Serialize)]
struct ProgressView {
    completed: u32,
    total: u32,
    ratio: f64,
    percent: f64,
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, value)?;
    writeln!(stdout)?;
    Ok(())
}
