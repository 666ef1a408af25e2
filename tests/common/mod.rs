//! Shared greeter workflow for executor tests.
//!
//! A small birthday-greeting pipeline: validate the recipient, generate the
//! message, send and save the email. Every step is a dispatchable method, so
//! the same wiring runs against any executor. Invocations of `send_email` and
//! `save_email` are captured for assertions.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use futures::FutureExt;
use tokio::sync::Mutex;

use rewire::dispatch::{DispatchAwaitMethod, DispatchMethod};
use rewire::error::{DispatchError, Result};
use rewire::executor::Executor;

#[derive(Clone)]
struct User {
    email: String,
    birthday_age: Option<u32>,
}

fn user_table() -> HashMap<String, User> {
    HashMap::from([
        (
            "Jane".to_string(),
            User {
                email: "jane@example.com".to_string(),
                birthday_age: Some(34),
            },
        ),
        (
            "John".to_string(),
            User {
                email: "john@example.com".to_string(),
                birthday_age: None,
            },
        ),
    ])
}

/// The greeter's dispatchable methods.
pub struct GreeterMethods {
    pub send_birthday_greeting: DispatchMethod<(String,)>,
    pub validate_event_for_recipient: DispatchAwaitMethod<(String, String), ()>,
    pub generate_greeting_message: DispatchAwaitMethod<(String, String), String>,
    pub send_email: DispatchMethod<(String, String)>,
    pub save_email: DispatchMethod<(String,)>,
}

/// Greeting workflow wired to one executor instance.
pub struct Greeter {
    pub methods: Arc<GreeterMethods>,
    /// (recipient, message) pairs captured by the `send_email` body.
    pub sent_emails: Arc<Mutex<Vec<(String, String)>>>,
    /// Message ids captured by the `save_email` body.
    pub saved_ids: Arc<Mutex<Vec<String>>>,
}

impl Greeter {
    /// Wire the workflow and register every method with the executor.
    pub async fn connect(executor: Arc<dyn Executor>) -> Result<Self> {
        let users = Arc::new(user_table());
        let sent_emails: Arc<Mutex<Vec<(String, String)>>> = Arc::new(Mutex::new(Vec::new()));
        let saved_ids: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        // Method bodies dispatch to sibling methods, so they share a slot
        // that is filled once the whole set is built.
        let slot: Arc<OnceLock<Arc<GreeterMethods>>> = Arc::new(OnceLock::new());

        let send_birthday_greeting = DispatchMethod::new("Greeter.sendBirthdayGreeting", {
            let slot = slot.clone();
            let users = users.clone();
            move |(recipient,): (String,)| {
                let slot = slot.clone();
                let users = users.clone();
                async move {
                    let methods = slot.get().expect("greeter wired").clone();
                    let event = "birthday".to_string();
                    methods
                        .validate_event_for_recipient
                        .invoke((recipient.clone(), event.clone()))
                        .await?;
                    let message = methods
                        .generate_greeting_message
                        .invoke((recipient.clone(), event))
                        .await?;
                    let email = users
                        .get(&recipient)
                        .map(|user| user.email.clone())
                        .unwrap_or_default();
                    methods.send_email.invoke((email, message)).await?;
                    Ok(())
                }
                .boxed()
            }
        });

        let validate_event_for_recipient =
            DispatchAwaitMethod::new("Greeter.validateEventForRecipient", {
                let users = users.clone();
                move |(recipient, event): (String, String)| {
                    let users = users.clone();
                    async move {
                        let Some(user) = users.get(&recipient) else {
                            return Err(DispatchError::Handler(format!(
                                "No user found for recipient: {}",
                                recipient
                            )));
                        };
                        if event != "birthday" || user.birthday_age.is_none() {
                            return Err(DispatchError::Handler(format!(
                                "No {} found for recipient: {}",
                                event, recipient
                            )));
                        }
                        Ok(())
                    }
                    .boxed()
                }
            });

        let generate_greeting_message =
            DispatchAwaitMethod::new("Greeter.generateGreetingMessage", {
                let users = users.clone();
                move |(recipient, event): (String, String)| {
                    let users = users.clone();
                    async move {
                        let age = users
                            .get(&recipient)
                            .and_then(|user| user.birthday_age)
                            .ok_or_else(|| {
                                DispatchError::Handler(format!("Event not supported: {}", event))
                            })?;
                        Ok(format!("Happy {}th birthday!", age))
                    }
                    .boxed()
                }
            });

        let send_email = DispatchMethod::new("Greeter.sendEmail", {
            let slot = slot.clone();
            let sent_emails = sent_emails.clone();
            move |(recipient, message): (String, String)| {
                let slot = slot.clone();
                let sent_emails = sent_emails.clone();
                async move {
                    sent_emails
                        .lock()
                        .await
                        .push((recipient.clone(), message.clone()));
                    let methods = slot.get().expect("greeter wired").clone();
                    methods
                        .save_email
                        .invoke((format!("email-{}", recipient),))
                        .await?;
                    Ok(())
                }
                .boxed()
            }
        });

        let save_email = DispatchMethod::new("Greeter.saveEmail", {
            let saved_ids = saved_ids.clone();
            move |(message_id,): (String,)| {
                let saved_ids = saved_ids.clone();
                async move {
                    saved_ids.lock().await.push(message_id);
                    Ok(())
                }
                .boxed()
            }
        });

        let methods = Arc::new(GreeterMethods {
            send_birthday_greeting,
            validate_event_for_recipient,
            generate_greeting_message,
            send_email,
            save_email,
        });
        slot.set(methods.clone()).ok();

        // Registration is part of construction: every dispatchable method is
        // bound before the greeter is handed out.
        methods
            .send_birthday_greeting
            .bind(executor.clone())
            .await?;
        methods
            .validate_event_for_recipient
            .bind(executor.clone())
            .await?;
        methods
            .generate_greeting_message
            .bind(executor.clone())
            .await?;
        methods.send_email.bind(executor.clone()).await?;
        methods.save_email.bind(executor).await?;

        Ok(Self {
            methods,
            sent_emails,
            saved_ids,
        })
    }
}
