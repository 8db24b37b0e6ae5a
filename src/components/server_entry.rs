use crate::config::{normalize_server_url, AppConfig};
use crate::Screen;
use dioxus::prelude::*;

/// Asks for the server address before starting a login
#[component]
pub fn ServerEntryScreen(on_navigate: EventHandler<Screen>) -> Element {
    let config = use_context::<AppConfig>();
    let mut server = use_signal(|| config.default_server.clone().unwrap_or_default());
    let mut error = use_signal(|| None::<String>);

    let mut submit = move || match normalize_server_url(&server()) {
        Ok(server_url) => {
            log::info!("Starting login on {}", server_url);
            on_navigate.call(Screen::Login { server_url });
        }
        Err(e) => error.set(Some(e.user_message())),
    };

    rsx! {
        div { class: "tv-screen",
            h1 { class: "tv-title", "Add account" }
            p { "Enter the address of your Nextcloud server." }
            form {
                onsubmit: move |evt| {
                    evt.prevent_default();
                    submit();
                },
                input {
                    class: "tv-input",
                    r#type: "url",
                    autofocus: true,
                    placeholder: "cloud.example.com",
                    value: "{server}",
                    oninput: move |evt| {
                        server.set(evt.value());
                        error.set(None);
                    },
                }
                if let Some(message) = error() {
                    p { class: "tv-error", "{message}" }
                }
                div { class: "tv-actions",
                    button { class: "btn-primary", r#type: "submit", "Continue" }
                    button {
                        class: "btn-secondary",
                        r#type: "button",
                        onclick: move |_| on_navigate.call(Screen::Home),
                        "Back"
                    }
                }
            }
        }
    }
}
