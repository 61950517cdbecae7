use super::common::*;
use crate::workflows::applications::{ApplicationId, ApplicationRepository, WorkflowError};
use chrono::Duration;

#[test]
fn whitespace_note_is_rejected_without_changing_count() {
    let fx = fixture();
    let application = fx.submit("Ada Lovelace");

    assert!(matches!(
        fx.desk.add_note(application.id, REVIEWER, "  "),
        Err(WorkflowError::EmptyNote)
    ));
    assert_eq!(fx.repository.note_count(application.id).expect("count"), 0);
}

#[test]
fn notes_append_in_order_with_running_count() {
    let fx = fixture();
    let application = fx.submit("Grace Hopper");

    let first = fx
        .desk
        .add_note(application.id, REVIEWER, "  Strong portfolio.  ")
        .expect("first note");
    fx.clock.advance(Duration::minutes(2));
    let second = fx
        .desk
        .add_note(application.id, REVIEWER, "Schedule a call")
        .expect("second note");

    assert_eq!(first.note_count, 1);
    assert_eq!(second.note_count, 2);
    assert!(second.created_at > first.created_at);

    let notes = fx.repository.notes(application.id).expect("notes");
    let texts: Vec<_> = notes.iter().map(|note| note.note_text.as_str()).collect();
    assert_eq!(texts, vec!["Strong portfolio.", "Schedule a call"]);
    assert!(notes.iter().all(|note| note.author_id == REVIEWER));
}

#[test]
fn note_on_missing_application_is_not_found() {
    let fx = fixture();
    assert!(matches!(
        fx.desk.add_note(ApplicationId(31), REVIEWER, "hello"),
        Err(WorkflowError::NotFound(ApplicationId(31)))
    ));
}

#[test]
fn outsiders_cannot_add_notes() {
    let fx = fixture();
    let application = fx.submit("Alan Turing");
    assert!(matches!(
        fx.desk.add_note(application.id, OUTSIDER, "sneaky"),
        Err(WorkflowError::Unauthorized(_))
    ));
    assert_eq!(fx.repository.note_count(application.id).expect("count"), 0);
}

#[test]
fn deleting_an_application_drops_its_notes() {
    let fx = fixture();
    let application = fx.submit("Katherine Johnson");
    fx.desk
        .add_note(application.id, REVIEWER, "Follow up")
        .expect("note added");

    fx.desk
        .delete(application.id, REVIEWER)
        .expect("delete succeeds");

    assert!(fx.repository.fetch(application.id).expect("fetch").is_none());
    assert!(fx.repository.notes(application.id).expect("notes").is_empty());
    assert!(matches!(
        fx.desk.delete(application.id, REVIEWER),
        Err(WorkflowError::NotFound(_))
    ));
}
