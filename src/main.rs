use dioxus::prelude::*;
use nextcloud_login::Credential;

mod components;
mod config;
mod database;
mod error;
mod models;
mod qr;
mod services;

use components::{AccountVerificationScreen, HomeScreen, ServerEntryScreen, TvLoginScreen};
use config::AppConfig;

const MAIN_CSS: Asset = asset!("/assets/main.css");

fn main() {
    init_logging();
    dioxus::launch(App);
}

#[cfg(target_os = "android")]
fn init_logging() {
    android_logger::init_once(
        android_logger::Config::default()
            .with_max_level(log::LevelFilter::Debug)
            .with_tag("TalkTV"),
    );
}

#[cfg(not(target_os = "android"))]
fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
}

/// Screen navigation
#[derive(Clone, PartialEq, Debug)]
pub enum Screen {
    Home,
    ServerEntry,
    Login { server_url: String },
    Verify { credential: Credential },
}

#[component]
fn App() -> Element {
    let config = use_context_provider(AppConfig::load);
    let mut current_screen = use_signal(|| Screen::Home);

    use_hook(move || {
        log::info!(
            "Talk TV {} starting (default server: {:?})",
            env!("CARGO_PKG_VERSION"),
            config.default_server
        );
    });

    rsx! {
        document::Link { rel: "stylesheet", href: MAIN_CSS }

        div { class: "tv-app",
            match current_screen() {
                Screen::Home => rsx! {
                    HomeScreen { on_navigate: move |s| current_screen.set(s) }
                },
                Screen::ServerEntry => rsx! {
                    ServerEntryScreen { on_navigate: move |s| current_screen.set(s) }
                },
                Screen::Login { server_url } => rsx! {
                    TvLoginScreen {
                        server_url,
                        on_credential: move |credential| {
                            current_screen.set(Screen::Verify { credential })
                        },
                        on_exit: move |_| current_screen.set(Screen::ServerEntry),
                    }
                },
                Screen::Verify { credential } => rsx! {
                    AccountVerificationScreen {
                        credential,
                        on_navigate: move |s| current_screen.set(s),
                    }
                },
            }
        }
    }
}
