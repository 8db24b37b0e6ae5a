use crate::config::AppConfig;
use crate::error::AppError;
use crate::qr;
use dioxus::prelude::*;
use futures_util::StreamExt;
use nextcloud_login::{
    BackAction, Credential, LoginFlow, NextcloudLoginClient, PollerState, PresentationMode,
};
use std::sync::Arc;

/// Commands from the screen to the task owning the login flow
#[derive(Debug, Clone, Copy, PartialEq)]
enum LoginCommand {
    SwitchMode,
    Back,
}

#[derive(Debug, Clone, PartialEq)]
enum LoginView {
    Connecting,
    Waiting {
        login_url: String,
        code_image: Option<String>,
    },
    Failed(String),
}

fn status_text(state: &PollerState) -> String {
    match state {
        PollerState::Idle | PollerState::Polling { attempts: 0 } => {
            "Waiting for login...".to_string()
        }
        PollerState::Polling { attempts } => format!("Waiting for login... ({} checks)", attempts),
        PollerState::Succeeded => "✅ Login successful!".to_string(),
        PollerState::Cancelled => "Login cancelled".to_string(),
        PollerState::FailedTerminally(reason) => format!("❌ {}", reason),
    }
}

fn switch_label(mode: PresentationMode) -> &'static str {
    match mode {
        PresentationMode::CodeDisplay => "🌐 Log in on this TV instead",
        PresentationMode::EmbeddedBrowser => "📱 Show QR code",
    }
}

/// Servers that forbid framing their login page leave the frame blank
const EMBEDDED_HINT: &str = "Page not loading? Press Back to show the QR code.";

fn is_back_key(key: &Key) -> bool {
    matches!(key, Key::Escape | Key::GoBack | Key::BrowserBack)
}

/// TV login screen.
///
/// Shows the login URL as a QR code for a phone, or the login page itself,
/// while one background poller waits for the grant. Switching surfaces never
/// touches the poller; leaving the screen cancels it.
#[component]
pub fn TvLoginScreen(
    server_url: String,
    on_credential: EventHandler<Credential>,
    on_exit: EventHandler<()>,
) -> Element {
    let config = use_context::<AppConfig>();
    let mut view = use_signal(|| LoginView::Connecting);
    let mut mode = use_signal(PresentationMode::default);
    let mut poll_state = use_signal(|| PollerState::Idle);

    let server = server_url.clone();
    let mut flow_task = use_coroutine(move |mut commands: UnboundedReceiver<LoginCommand>| {
        let server = server.clone();
        let config = config.clone();
        async move {
            let client = match NextcloudLoginClient::new(&config.client_config()) {
                Ok(client) => Arc::new(client),
                Err(e) => {
                    view.set(LoginView::Failed(AppError::from(e).user_message()));
                    return;
                }
            };

            // The flow lives in this task; unmounting the screen drops it,
            // which cancels polling.
            let mut flow = match LoginFlow::begin(client, &server, config.poller_config()).await {
                Ok(flow) => flow,
                Err(e) => {
                    view.set(LoginView::Failed(AppError::from(e).user_message()));
                    return;
                }
            };

            let login_url = flow.login_url().to_string();
            let code_image = match qr::login_code_data_url(&login_url) {
                Ok(image) => Some(image),
                Err(e) => {
                    log::warn!("LoginFlow: showing plain URL, {}", e);
                    None
                }
            };
            view.set(LoginView::Waiting {
                login_url,
                code_image,
            });

            let mut state = flow.subscribe();
            loop {
                tokio::select! {
                    command = commands.next() => match command {
                        Some(LoginCommand::SwitchMode) => mode.set(flow.switch_mode()),
                        Some(LoginCommand::Back) => match flow.back(false) {
                            BackAction::ExitFlow => {
                                on_exit.call(());
                                return;
                            }
                            BackAction::ShowCode | BackAction::BrowserHistoryBack => {
                                mode.set(flow.mode())
                            }
                        },
                        None => {
                            flow.cancel();
                            return;
                        }
                    },
                    changed = state.changed() => {
                        if changed.is_err() {
                            return;
                        }
                        let current = state.borrow_and_update().clone();
                        poll_state.set(current.clone());
                        match current {
                            PollerState::Succeeded => {
                                if let Some(credential) = flow.credential().await {
                                    on_credential.call(credential);
                                }
                                return;
                            }
                            PollerState::FailedTerminally(reason) => {
                                view.set(LoginView::Failed(format!(
                                    "Login could not be completed: {}",
                                    reason
                                )));
                                return;
                            }
                            PollerState::Cancelled => return,
                            PollerState::Idle | PollerState::Polling { .. } => {}
                        }
                    }
                }
            }
        }
    });

    rsx! {
        div {
            class: "tv-login",
            tabindex: 0,
            onkeydown: move |evt: KeyboardEvent| {
                if !is_back_key(&evt.key()) {
                    return;
                }
                match view() {
                    LoginView::Waiting { .. } => flow_task.send(LoginCommand::Back),
                    LoginView::Connecting | LoginView::Failed(_) => on_exit.call(()),
                }
            },

            h1 { class: "tv-title", "Log in to {server_url}" }

            match view() {
                LoginView::Connecting => rsx! {
                    div { class: "tv-status", "🔄 Connecting..." }
                },
                LoginView::Waiting { login_url, code_image } => rsx! {
                    match mode() {
                        PresentationMode::CodeDisplay => rsx! {
                            div { class: "code-display",
                                if let Some(image) = code_image {
                                    img { class: "login-code", src: "{image}", alt: "Login QR code" }
                                }
                                div { class: "code-instructions",
                                    p { "Scan the code with your phone and log in there." }
                                    p { "Or open this address on any device:" }
                                    p { class: "login-url", "{login_url}" }
                                }
                            }
                        },
                        PresentationMode::EmbeddedBrowser => rsx! {
                            iframe {
                                class: "embedded-login",
                                src: "{login_url}",
                                onload: move |_| log::debug!("LoginFlow: embedded login page loaded"),
                            }
                            p { class: "tv-status", "{EMBEDDED_HINT}" }
                        },
                    }
                    div { class: "tv-actions",
                        button {
                            class: "btn-primary",
                            autofocus: true,
                            onclick: move |_| flow_task.send(LoginCommand::SwitchMode),
                            "{switch_label(mode())}"
                        }
                        button {
                            class: "btn-secondary",
                            onclick: move |_| flow_task.send(LoginCommand::Back),
                            "Back"
                        }
                    }
                    p { class: "tv-status", "{status_text(&poll_state())}" }
                },
                LoginView::Failed(message) => rsx! {
                    div { class: "tv-error",
                        p { class: "tv-error-title", "❌ Login Error" }
                        p { "{message}" }
                        div { class: "tv-actions",
                            button {
                                class: "btn-primary",
                                autofocus: true,
                                onclick: move |_| {
                                    view.set(LoginView::Connecting);
                                    mode.set(PresentationMode::default());
                                    poll_state.set(PollerState::Idle);
                                    flow_task.restart();
                                },
                                "🔄 Retry"
                            }
                            button {
                                class: "btn-secondary",
                                onclick: move |_| on_exit.call(()),
                                "Back"
                            }
                        }
                    }
                },
            }
        }
    }
}
