//! Loopback listener for the OAuth redirect.
//!
//! The browser is sent back to `http://<redirect_bind><callback_path>?code=…`
//! (or `?error=…`).  The first request's query is parsed and forwarded once;
//! after that the listener shuts itself down.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::{Query, State};
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::{oneshot, Notify};
use tracing::{debug, error, info, warn};

/// What the provider sent back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectOutcome {
    Code(String),
    /// The provider reported an error (user denied access, bad scope, …).
    Denied(String),
    /// Neither `code` nor `error` was present.
    Empty,
}

#[derive(Debug, Error)]
pub enum CallbackError {
    #[error("cannot listen for the login redirect on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
}

/// `error` wins over `code`; empty values count as absent.
pub fn parse_redirect(params: &HashMap<String, String>) -> RedirectOutcome {
    let non_empty = |key: &str| {
        params
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };
    if let Some(err) = non_empty("error") {
        return RedirectOutcome::Denied(err);
    }
    match non_empty("code") {
        Some(code) => RedirectOutcome::Code(code),
        None => RedirectOutcome::Empty,
    }
}

struct CallbackState {
    outcome_tx: Mutex<Option<oneshot::Sender<RedirectOutcome>>>,
    done: Notify,
}

impl CallbackState {
    fn take_sender(&self) -> Option<oneshot::Sender<RedirectOutcome>> {
        self.outcome_tx.lock().ok().and_then(|mut slot| slot.take())
    }
}

/// Running redirect listener.  Dropping it stops the server.
pub struct CallbackListener {
    addr: SocketAddr,
    outcome_rx: Option<oneshot::Receiver<RedirectOutcome>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl CallbackListener {
    pub async fn bind(bind: &str, path: &str) -> Result<Self, CallbackError> {
        let listener = TcpListener::bind(bind)
            .await
            .map_err(|source| CallbackError::Bind {
                addr: bind.to_string(),
                source,
            })?;
        let addr = listener.local_addr().map_err(|source| CallbackError::Bind {
            addr: bind.to_string(),
            source,
        })?;

        let (outcome_tx, outcome_rx) = oneshot::channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let state = Arc::new(CallbackState {
            outcome_tx: Mutex::new(Some(outcome_tx)),
            done: Notify::new(),
        });

        let app = Router::new()
            .route(path, get(handle_redirect))
            .with_state(state.clone());

        info!("[callback] waiting for redirect on http://{}{}", addr, path);
        tokio::spawn(async move {
            let stop = async move {
                tokio::select! {
                    _ = shutdown_rx => debug!("[callback] listener dropped"),
                    _ = state.done.notified() => debug!("[callback] redirect handled"),
                }
            };
            if let Err(e) = axum::serve(listener, app).with_graceful_shutdown(stop).await {
                error!("[callback] server error: {}", e);
            }
            debug!("[callback] listener on {} closed", addr);
        });

        Ok(Self {
            addr,
            outcome_rx: Some(outcome_rx),
            shutdown_tx: Some(shutdown_tx),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// The redirect, once it arrives.  Can be taken once.
    pub fn take_outcome(&mut self) -> Option<oneshot::Receiver<RedirectOutcome>> {
        self.outcome_rx.take()
    }
}

impl Drop for CallbackListener {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

async fn handle_redirect(
    State(state): State<Arc<CallbackState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Html<String> {
    let Some(tx) = state.take_sender() else {
        warn!("[callback] redirect arrived after the first one, ignoring");
        return page("Already handled", "This login was already completed. You can close this tab.");
    };

    let outcome = parse_redirect(&params);
    let body = match &outcome {
        RedirectOutcome::Code(_) => page(
            "Login received",
            "You can close this tab and return to the terminal.",
        ),
        RedirectOutcome::Denied(reason) => page(
            "Login failed",
            &format!("The provider reported: {}", html_escape(reason)),
        ),
        RedirectOutcome::Empty => page(
            "Login failed",
            "The redirect carried no authorization code.",
        ),
    };
    match &outcome {
        RedirectOutcome::Code(_) => info!("[callback] authorization code received"),
        RedirectOutcome::Denied(reason) => warn!("[callback] provider error: {}", reason),
        RedirectOutcome::Empty => warn!("[callback] redirect without code or error"),
    }
    if tx.send(outcome).is_err() {
        warn!("[callback] nobody is waiting for the redirect any more");
    }
    state.done.notify_one();
    body
}

fn page(title: &str, message: &str) -> Html<String> {
    Html(format!(
        "<!doctype html><html><head><meta charset=\"utf-8\"><title>timemachine</title></head>\
         <body style=\"font-family: sans-serif; margin: 4em auto; max-width: 32em\">\
         <h2>{}</h2><p>{}</p></body></html>",
        title, message
    ))
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
