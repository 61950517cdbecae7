use chrono::{Duration, NaiveDate};
use rusqlite::Connection;
use serde_json::json;

use super::common::*;
use crate::workflows::applications::{
    init_db, ActorId, ApplicationFilter, ApplicationId, ApplicationRepository, ApplicationStatus,
    InMemoryApplicationRepository, NewApplication, NewNote, RepositoryError,
    SqliteApplicationRepository, WorkflowError,
};

fn new_application(name: &str, minutes: i64) -> NewApplication {
    NewApplication {
        job_id: BACKEND_JOB,
        applicant_name: name.to_string(),
        applicant_email: format!("{}@example.com", name.to_lowercase()),
        phone: None,
        application_data: json!({ "cover_letter": "Hello" }),
        status: ApplicationStatus::from_stored("pending"),
        submitted_at: start_time() + Duration::minutes(minutes),
    }
}

fn repository() -> SqliteApplicationRepository {
    SqliteApplicationRepository::open_in_memory().expect("in-memory database opens")
}

#[test]
fn schema_setup_is_idempotent_and_keeps_rows() {
    let conn = Connection::open_in_memory().expect("connection opens");
    init_db(&conn).expect("first init");
    conn.execute(
        "INSERT INTO job_applications
            (job_id, applicant_name, applicant_email, application_status, created_date, updated_date)
         VALUES (12, 'Ada', 'ada@example.com', 'pending',
                 '2025-10-01T09:00:00.000000Z', '2025-10-01T09:00:00.000000Z')",
        [],
    )
    .expect("row inserted");

    init_db(&conn).expect("second init");
    init_db(&conn).expect("third init");

    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM job_applications", [], |row| row.get(0))
        .expect("count");
    assert_eq!(count, 1);

    let repository = SqliteApplicationRepository::new(conn).expect("repository wraps connection");
    let stored = repository
        .fetch(ApplicationId(1))
        .expect("fetch")
        .expect("row survives");
    assert_eq!(stored.applicant_name, "Ada");
    assert_eq!(stored.created_date, start_time());
    assert_eq!(stored.application_data, json!({}));
}

#[test]
fn insert_and_fetch_preserve_every_field() {
    let repository = repository();
    let mut new = new_application("Ada", 0);
    new.phone = Some("555-0100".to_string());
    new.submitted_at += Duration::microseconds(123_456);

    let inserted = repository.insert(new.clone()).expect("insert");
    let fetched = repository
        .fetch(inserted.id)
        .expect("fetch")
        .expect("present");

    assert_eq!(fetched, inserted);
    assert_eq!(fetched.id, ApplicationId(1));
    assert_eq!(fetched.phone.as_deref(), Some("555-0100"));
    assert_eq!(fetched.application_data, json!({ "cover_letter": "Hello" }));
    assert_eq!(fetched.created_date, new.submitted_at);
    assert_eq!(fetched.updated_date, new.submitted_at);
}

#[test]
fn update_status_touches_only_status_and_timestamp() {
    let repository = repository();
    let inserted = repository.insert(new_application("Ada", 0)).expect("insert");
    let later = start_time() + Duration::hours(2);

    let updated = repository
        .update_status(inserted.id, &ApplicationStatus::from_stored("offered"), later)
        .expect("update");

    assert_eq!(updated.status.as_str(), "offered");
    assert_eq!(updated.updated_date, later);
    assert_eq!(updated.created_date, inserted.created_date);
    assert_eq!(updated.applicant_email, inserted.applicant_email);
}

#[test]
fn missing_rows_report_not_found() {
    let repository = repository();
    assert!(matches!(
        repository.update_status(
            ApplicationId(5),
            &ApplicationStatus::from_stored("offered"),
            start_time()
        ),
        Err(RepositoryError::NotFound)
    ));
    assert!(matches!(
        repository.delete(ApplicationId(5)),
        Err(RepositoryError::NotFound)
    ));
    assert!(matches!(
        repository.insert_note(NewNote {
            application_id: ApplicationId(5),
            author_id: REVIEWER,
            note_text: "orphan".to_string(),
            created_at: start_time(),
        }),
        Err(RepositoryError::NotFound)
    ));
    assert!(repository.fetch(ApplicationId(5)).expect("fetch").is_none());
}

#[test]
fn list_is_newest_first_and_filters_combine() {
    let repository = repository();
    repository.insert(new_application("Ada", 0)).expect("insert");
    let mut design = new_application("Grace", 10);
    design.job_id = DESIGN_JOB;
    repository.insert(design).expect("insert");
    let alan = repository.insert(new_application("Alan", 20)).expect("insert");
    repository
        .update_status(alan.id, &ApplicationStatus::from_stored("interview"), start_time())
        .expect("update");

    let all = repository.list(&ApplicationFilter::default()).expect("list");
    let names: Vec<_> = all.iter().map(|a| a.applicant_name.as_str()).collect();
    assert_eq!(names, vec!["Alan", "Grace", "Ada"]);

    let backend_pending = repository
        .list(&ApplicationFilter {
            status: Some("pending".to_string()),
            job_id: Some(BACKEND_JOB),
            ..ApplicationFilter::default()
        })
        .expect("list");
    assert_eq!(backend_pending.len(), 1);
    assert_eq!(backend_pending[0].applicant_name, "Ada");

    let search = repository
        .list(&ApplicationFilter {
            search: Some("GRACE@".to_string()),
            ..ApplicationFilter::default()
        })
        .expect("list");
    assert_eq!(search.len(), 1);
    assert_eq!(search[0].job_id, DESIGN_JOB);
}

#[test]
fn search_treats_like_wildcards_literally() {
    let repository = repository();
    let mut odd = new_application("Ann", 0);
    odd.applicant_name = "Ann 100% Real".to_string();
    repository.insert(odd).expect("insert");
    repository.insert(new_application("Annabel", 5)).expect("insert");

    let hits = repository
        .list(&ApplicationFilter {
            search: Some("100%".to_string()),
            ..ApplicationFilter::default()
        })
        .expect("list");
    assert_eq!(hits.len(), 1);

    let underscore = repository
        .list(&ApplicationFilter {
            search: Some("a_n".to_string()),
            ..ApplicationFilter::default()
        })
        .expect("list");
    assert!(underscore.is_empty());
}

#[test]
fn date_range_is_inclusive_of_whole_days() {
    let repository = repository();
    repository.insert(new_application("Early", 0)).expect("insert");
    repository
        .insert(new_application("Late", 60 * 24 + 14 * 60 + 59))
        .expect("insert");
    repository
        .insert(new_application("Later", 60 * 24 * 2))
        .expect("insert");

    let day = |d| NaiveDate::from_ymd_opt(2025, 10, d).expect("valid date");
    let filter = ApplicationFilter {
        submitted_from: Some(day(2)),
        submitted_to: Some(day(2)),
        ..ApplicationFilter::default()
    };
    let hits = repository.list(&filter).expect("list");
    let names: Vec<_> = hits.iter().map(|a| a.applicant_name.as_str()).collect();
    assert_eq!(names, vec!["Late"]);

    let through_first = repository
        .list(&ApplicationFilter {
            submitted_to: Some(day(1)),
            ..ApplicationFilter::default()
        })
        .expect("list");
    assert_eq!(through_first.len(), 1);
    assert_eq!(through_first[0].applicant_name, "Early");
}

#[test]
fn sql_filters_agree_with_in_memory_matching() {
    let repository = repository();
    for (offset, name) in ["Ada", "Grace", "Alan"].into_iter().enumerate() {
        repository
            .insert(new_application(name, offset as i64 * 90))
            .expect("insert");
    }
    let filter = ApplicationFilter {
        search: Some("a".to_string()),
        submitted_from: Some(NaiveDate::from_ymd_opt(2025, 10, 1).expect("valid date")),
        ..ApplicationFilter::default()
    };

    let from_sql = repository.list(&filter).expect("list");
    let all = repository.list(&ApplicationFilter::default()).expect("list");
    let expected: Vec<_> = all.into_iter().filter(|a| filter.matches(a)).collect();
    assert_eq!(from_sql, expected);
}

#[test]
fn search_folds_non_ascii_case_like_the_in_memory_store() {
    let sqlite = repository();
    let memory = InMemoryApplicationRepository::default();
    let mut emile = new_application("Emile", 0);
    emile.applicant_name = "Émile Zola".to_string();
    emile.applicant_email = "e.zola@example.com".to_string();
    sqlite.insert(emile.clone()).expect("insert");
    memory.insert(emile).expect("insert");
    sqlite.insert(new_application("Ada", 5)).expect("insert");

    for needle in ["émile", "ÉMILE", "Zola"] {
        let filter = ApplicationFilter {
            search: Some(needle.to_string()),
            ..ApplicationFilter::default()
        };
        let from_sql = sqlite.list(&filter).expect("list");
        let from_memory = memory.list(&filter).expect("list");
        assert_eq!(from_sql.len(), 1, "sqlite search for {needle}");
        assert_eq!(from_memory.len(), 1, "in-memory search for {needle}");
        assert_eq!(from_sql[0].applicant_name, "Émile Zola");
    }
}

#[test]
fn notes_are_ordered_and_cascade_with_their_application() {
    let repository = repository();
    let application = repository.insert(new_application("Ada", 0)).expect("insert");
    let other = repository.insert(new_application("Grace", 1)).expect("insert");

    for (minutes, text) in [(5, "phone screen booked"), (1, "resume looks good")] {
        repository
            .insert_note(NewNote {
                application_id: application.id,
                author_id: ActorId(3),
                note_text: text.to_string(),
                created_at: start_time() + Duration::minutes(minutes),
            })
            .expect("note");
    }
    repository
        .insert_note(NewNote {
            application_id: other.id,
            author_id: ActorId(3),
            note_text: "unrelated".to_string(),
            created_at: start_time(),
        })
        .expect("note");

    let notes = repository.notes(application.id).expect("notes");
    let texts: Vec<_> = notes.iter().map(|n| n.note_text.as_str()).collect();
    assert_eq!(texts, vec!["resume looks good", "phone screen booked"]);
    assert_eq!(notes[0].author_id, ActorId(3));
    assert_eq!(repository.note_count(application.id).expect("count"), 2);

    repository.delete(application.id).expect("delete");
    assert_eq!(repository.note_count(application.id).expect("count"), 0);
    assert!(repository.notes(application.id).expect("notes").is_empty());
    assert_eq!(repository.note_count(other.id).expect("count"), 1);
}

#[test]
fn desk_runs_end_to_end_on_sqlite() {
    let fx = sqlite_fixture();
    let application = fx.submit("Ada Lovelace");

    let first = fx
        .desk
        .transition(application.id, "reviewing", REVIEWER)
        .expect("transition");
    let second = fx
        .desk
        .transition(application.id, "interview", REVIEWER)
        .expect("transition");
    assert!(second.updated_at > first.updated_at);

    let receipt = fx
        .desk
        .add_note(application.id, REVIEWER, "Booked for Tuesday")
        .expect("note");
    assert_eq!(receipt.note_count, 1);

    let details = fx.desk.details(application.id, REVIEWER).expect("details");
    assert_eq!(details.status.as_str(), "interview");
    assert_eq!(details.status_label, "Interview");
    assert_eq!(details.notes.len(), 1);
    assert_eq!(details.updated_date, second.updated_at);

    fx.desk.delete(application.id, REVIEWER).expect("delete");
    assert!(matches!(
        fx.desk.details(application.id, REVIEWER),
        Err(WorkflowError::NotFound(id)) if id == application.id
    ));
    assert_eq!(fx.repository.note_count(application.id).expect("count"), 0);
}

#[test]
fn database_file_survives_reopen() {
    let path = std::env::temp_dir().join(format!(
        "job-board-reopen-{}.sqlite3",
        std::process::id()
    ));
    let _ = std::fs::remove_file(&path);

    {
        let repository = SqliteApplicationRepository::open(&path).expect("open");
        repository.insert(new_application("Ada", 0)).expect("insert");
    }
    let reopened = SqliteApplicationRepository::open(&path).expect("reopen");
    let all = reopened.list(&ApplicationFilter::default()).expect("list");
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].applicant_name, "Ada");

    drop(reopened);
    let _ = std::fs::remove_file(&path);
}
