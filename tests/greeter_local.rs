//! Greeter workflow over the local executor.
//!
//! The local executor is the reference semantics: everything runs in-process
//! and errors propagate synchronously.

mod common;

use std::sync::Arc;

use rewire::error::DispatchError;
use rewire::executor::LocalExecutor;

use common::Greeter;

#[tokio::test]
async fn test_birthday_workflow_runs_in_process() {
    let greeter = Greeter::connect(Arc::new(LocalExecutor::new()))
        .await
        .unwrap();

    greeter
        .methods
        .send_birthday_greeting
        .invoke(("Jane".to_string(),))
        .await
        .unwrap();

    let sent = greeter.sent_emails.lock().await.clone();
    assert_eq!(
        sent,
        vec![(
            "jane@example.com".to_string(),
            "Happy 34th birthday!".to_string()
        )]
    );
    let saved = greeter.saved_ids.lock().await.clone();
    assert_eq!(saved, vec!["email-jane@example.com".to_string()]);
}

#[tokio::test]
async fn test_unknown_recipient_fails_validation() {
    let greeter = Greeter::connect(Arc::new(LocalExecutor::new()))
        .await
        .unwrap();

    let err = greeter
        .methods
        .send_birthday_greeting
        .invoke(("Bob".to_string(),))
        .await
        .unwrap_err();

    assert!(matches!(err, DispatchError::Handler(_)));
    assert!(greeter.sent_emails.lock().await.is_empty());
}

#[tokio::test]
async fn test_recipient_without_birthday_fails_validation() {
    let greeter = Greeter::connect(Arc::new(LocalExecutor::new()))
        .await
        .unwrap();

    let err = greeter
        .methods
        .validate_event_for_recipient
        .invoke(("John".to_string(), "birthday".to_string()))
        .await
        .unwrap_err();

    assert!(matches!(err, DispatchError::Handler(_)));
}

#[tokio::test]
async fn test_greeting_message_for_known_recipient() {
    let greeter = Greeter::connect(Arc::new(LocalExecutor::new()))
        .await
        .unwrap();

    let message = greeter
        .methods
        .generate_greeting_message
        .invoke(("Jane".to_string(), "birthday".to_string()))
        .await
        .unwrap();

    assert_eq!(message, "Happy 34th birthday!");
}
