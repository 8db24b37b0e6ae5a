use crate::database;
use crate::models::Account;
use crate::services::account_service;
use crate::Screen;
use dioxus::prelude::*;

#[component]
pub fn HomeScreen(on_navigate: EventHandler<Screen>) -> Element {
    let mut accounts = use_signal(Vec::<Account>::new);
    let mut db_status = use_signal(|| Ok::<(), String>(()));

    let mut reload = move || match database::init_database() {
        Ok(conn) => match account_service::load_accounts(&conn) {
            Ok(list) => {
                accounts.set(list);
                db_status.set(Ok(()));
            }
            Err(e) => db_status.set(Err(format!("⚠️ Could not load accounts: {}", e))),
        },
        Err(e) => db_status.set(Err(format!("❌ Database error: {}", e))),
    };

    use_effect(move || reload());

    let remove = move |id: i64| {
        match database::init_database().and_then(|conn| account_service::delete_account(&conn, id))
        {
            Ok(()) => reload(),
            Err(e) => db_status.set(Err(e.user_message())),
        }
    };

    rsx! {
        div { class: "tv-screen",
            h1 { class: "tv-title", "💬 Talk" }

            if let Err(message) = db_status() {
                div { class: "tv-error",
                    p { "{message}" }
                }
            }

            if accounts().is_empty() {
                p { class: "tv-status", "No accounts yet. Add one to start." }
            } else {
                div { class: "account-list",
                    for account in accounts() {
                        div { key: "{account.id}", class: "account-row",
                            div {
                                p { class: "account-label", "{account.label()}" }
                                p { class: "account-detail", "Added {account.added_on()}" }
                                if let Some(version) = &account.talk_version {
                                    p { class: "account-detail", "Talk {version}" }
                                }
                            }
                            button {
                                class: "btn-secondary",
                                onclick: {
                                    let mut remove = remove;
                                    let id = account.id;
                                    move |_| remove(id)
                                },
                                "Remove"
                            }
                        }
                    }
                }
            }

            div { class: "tv-actions",
                button {
                    class: "btn-primary",
                    autofocus: true,
                    onclick: move |_| on_navigate.call(Screen::ServerEntry),
                    "➕ Add account"
                }
            }
        }
    }
}
