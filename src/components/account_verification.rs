use crate::config::AppConfig;
use crate::services::account_service;
use crate::Screen;
use dioxus::prelude::*;
use nextcloud_login::Credential;

#[derive(Debug, Clone, PartialEq)]
enum VerificationStatus {
    Checking,
    Done(String),
    Failed(String),
}

/// Checks a freshly granted credential against the server and stores the account
#[component]
pub fn AccountVerificationScreen(
    credential: Credential,
    on_navigate: EventHandler<Screen>,
) -> Element {
    let config = use_context::<AppConfig>();
    let mut status = use_signal(|| VerificationStatus::Checking);
    let server_url = credential.server.clone();

    use_effect(move || {
        let config = config.clone();
        let credential = credential.clone();
        spawn(async move {
            match account_service::verify_and_store(&config, &credential).await {
                Ok(account) => {
                    status.set(VerificationStatus::Done(account.label()));
                }
                Err(e) => {
                    log::error!("Account verification failed: {}", e);
                    status.set(VerificationStatus::Failed(e.user_message()));
                }
            }
        });
    });

    rsx! {
        div { class: "tv-screen",
            h1 { class: "tv-title", "Checking account" }
            match status() {
                VerificationStatus::Checking => rsx! {
                    p { class: "tv-status", "🔄 Connecting to {server_url}..." }
                },
                VerificationStatus::Done(label) => rsx! {
                    p { class: "tv-status", "✅ Signed in as {label}" }
                    div { class: "tv-actions",
                        button {
                            class: "btn-primary",
                            autofocus: true,
                            onclick: move |_| on_navigate.call(Screen::Home),
                            "Continue"
                        }
                    }
                },
                VerificationStatus::Failed(message) => rsx! {
                    div { class: "tv-error",
                        p { class: "tv-error-title", "❌ Account could not be added" }
                        p { "{message}" }
                        div { class: "tv-actions",
                            button {
                                class: "btn-primary",
                                autofocus: true,
                                onclick: {
                                    let server_url = server_url.clone();
                                    move |_| on_navigate.call(Screen::Login {
                                        server_url: server_url.clone(),
                                    })
                                },
                                "🔄 Log in again"
                            }
                            button {
                                class: "btn-secondary",
                                onclick: move |_| on_navigate.call(Screen::Home),
                                "Back"
                            }
                        }
                    }
                },
            }
        }
    }
}
