use std::sync::Arc;

use axum::response::Response;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::{json, Value};

use crate::workflows::applications::{
    ActorId, Application, ApplicationDesk, ApplicationRepository, ApplicationSubmission,
    InMemoryApplicationRepository, InMemoryJobDirectory, JobId, ManualClock, ReviewerRoster,
    SqliteApplicationRepository, StatusSet,
};

pub(super) const REVIEWER: ActorId = ActorId(7);
pub(super) const OUTSIDER: ActorId = ActorId(99);
pub(super) const SECRET: &str = "test-nonce-secret";
pub(super) const BACKEND_JOB: JobId = JobId(12);
pub(super) const DESIGN_JOB: JobId = JobId(14);

pub(super) fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 10, 1, 9, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn jobs() -> InMemoryJobDirectory {
    InMemoryJobDirectory::default()
        .with_posting(
            BACKEND_JOB,
            "Backend Engineer",
            Some("https://jobs.example.com/backend-engineer"),
        )
        .with_posting(DESIGN_JOB, "Product Designer", None)
}

pub(super) fn roster() -> ReviewerRoster {
    ReviewerRoster::new([REVIEWER], SECRET)
}

pub(super) struct Fixture<R = InMemoryApplicationRepository> {
    pub(super) desk: Arc<ApplicationDesk<R, ReviewerRoster>>,
    pub(super) repository: Arc<R>,
    pub(super) clock: Arc<ManualClock>,
    pub(super) roster: Arc<ReviewerRoster>,
}

pub(super) fn fixture() -> Fixture {
    build(Arc::new(InMemoryApplicationRepository::default()))
}

pub(super) fn sqlite_fixture() -> Fixture<SqliteApplicationRepository> {
    build(Arc::new(
        SqliteApplicationRepository::open_in_memory().expect("in-memory database opens"),
    ))
}

fn build<R: ApplicationRepository + 'static>(repository: Arc<R>) -> Fixture<R> {
    let clock = Arc::new(ManualClock::new(start_time()));
    let roster = Arc::new(roster());
    let desk = Arc::new(ApplicationDesk::new(
        repository.clone(),
        roster.clone(),
        Arc::new(jobs()),
        StatusSet::standard(),
        clock.clone(),
    ));

    Fixture {
        desk,
        repository,
        clock,
        roster,
    }
}

pub(super) fn submission(name: &str, job_id: JobId) -> ApplicationSubmission {
    let email = format!("{}@example.com", name.to_lowercase().replace(' ', "."));
    ApplicationSubmission {
        job_id,
        applicant_name: name.to_string(),
        applicant_email: email,
        phone: Some("555-0100".to_string()),
        application_data: json!({
            "years_experience": 5,
            "skills": ["rust", "postgres"],
            "willing_to_relocate": false
        }),
    }
}

impl<R: ApplicationRepository + 'static> Fixture<R> {
    /// Submit one application a minute after the previous one.
    pub(super) fn submit(&self, name: &str) -> Application {
        self.clock.advance(Duration::minutes(1));
        self.desk
            .submit(submission(name, BACKEND_JOB))
            .expect("submission accepted")
    }

    pub(super) fn stored(&self, application: &Application) -> Application {
        self.repository
            .fetch(application.id)
            .expect("fetch succeeds")
            .expect("record present")
    }

    pub(super) fn nonce(&self, actor: ActorId, action: &str) -> String {
        self.roster.nonce_for(actor, action).expect("nonce")
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) async fn read_text_body(response: Response) -> String {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    String::from_utf8(body.to_vec()).expect("utf8 body")
}
