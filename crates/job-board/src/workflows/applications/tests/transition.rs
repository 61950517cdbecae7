use super::common::*;
use crate::workflows::applications::{AccessError, ApplicationId, WorkflowError};
use chrono::Duration;

#[test]
fn transition_persists_status_and_refreshes_timestamp() {
    let fx = fixture();
    let application = fx.submit("Ada Lovelace");
    assert_eq!(application.status.as_str(), "pending");

    fx.clock.advance(Duration::minutes(5));
    let receipt = fx
        .desk
        .transition(application.id, "interview", REVIEWER)
        .expect("transition accepted");

    assert_eq!(receipt.accepted_status.as_str(), "interview");
    assert_eq!(receipt.status_label, "Interview");
    let stored = fx.stored(&application);
    assert_eq!(stored.status.as_str(), "interview");
    assert!(stored.updated_date > application.updated_date);
    assert_eq!(stored.updated_date, receipt.updated_at);
    assert_eq!(stored.created_date, application.created_date);
}

#[test]
fn unknown_status_is_rejected_and_not_stored() {
    let fx = fixture();
    let application = fx.submit("Grace Hopper");

    match fx.desk.transition(application.id, "hired", REVIEWER) {
        Err(WorkflowError::InvalidStatus(value)) => assert_eq!(value, "hired"),
        other => panic!("expected invalid status, got {other:?}"),
    }

    let stored = fx.stored(&application);
    assert_eq!(stored.status.as_str(), "pending");
    assert_eq!(stored.updated_date, application.updated_date);
}

#[test]
fn repeating_the_same_status_still_refreshes_updated_date() {
    let fx = fixture();
    let application = fx.submit("Alan Turing");

    // The clock is frozen between the calls; timestamps must still move forward.
    let first = fx
        .desk
        .transition(application.id, "reviewing", REVIEWER)
        .expect("first transition");
    let second = fx
        .desk
        .transition(application.id, "reviewing", REVIEWER)
        .expect("second transition");

    assert_eq!(first.accepted_status, second.accepted_status);
    assert!(second.updated_at > first.updated_at);
    assert_eq!(fx.stored(&application).status.as_str(), "reviewing");
}

#[test]
fn any_status_may_follow_any_other() {
    let fx = fixture();
    let application = fx.submit("Katherine Johnson");

    for status in ["rejected", "pending", "offered", "reviewing"] {
        let receipt = fx
            .desk
            .transition(application.id, status, REVIEWER)
            .expect("transition accepted");
        assert_eq!(receipt.accepted_status.as_str(), status);
    }
}

#[test]
fn missing_application_is_not_found() {
    let fx = fixture();
    match fx.desk.transition(ApplicationId(404), "reviewing", REVIEWER) {
        Err(WorkflowError::NotFound(id)) => assert_eq!(id, ApplicationId(404)),
        other => panic!("expected not found, got {other:?}"),
    }
}

#[test]
fn actor_without_review_capability_is_unauthorized() {
    let fx = fixture();
    let application = fx.submit("Margaret Hamilton");

    match fx.desk.transition(application.id, "reviewing", OUTSIDER) {
        Err(WorkflowError::Unauthorized(AccessError::MissingCapability { actor, .. })) => {
            assert_eq!(actor, OUTSIDER)
        }
        other => panic!("expected unauthorized, got {other:?}"),
    }
    assert_eq!(fx.stored(&application).status.as_str(), "pending");
}
