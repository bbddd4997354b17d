//! Operation routing for parsed requests.
//!
//! The router resolves a request's `op`, runs the matching handler, and builds
//! the response envelope. `TASK` goes to the task executor; the credential
//! operations go to the [`CredentialStore`]. Routing is synchronous and runs
//! on a pool worker, so the router is shared between threads behind an `Arc`.

use std::fmt;
use std::sync::Arc;

use tareas_store::{CreateError, CredentialStore};
use tracing::debug;

use crate::tasks::execute_task;

use super::errors::DispatchError;
use super::request::{Operation, Request};
use super::response::Response;

/// Tracing target for dispatch operations.
pub(crate) const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");

/// Error text returned when `GET_TAREAS_HTML` fails verification.
pub const UNAUTHORIZED: &str = "401 Unauthorized";

/// Info text returned by a successful registration.
pub const REGISTERED: &str = "ok";

/// Routes requests to the task executor or the credential store.
pub struct MessageRouter {
    store: Arc<dyn CredentialStore>,
    workers: usize,
}

impl fmt::Debug for MessageRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageRouter")
            .field("workers", &self.workers)
            .finish_non_exhaustive()
    }
}

impl MessageRouter {
    /// Creates a router over `store`. `workers` is the pool size reported in
    /// the welcome fragment.
    pub fn new(store: Arc<dyn CredentialStore>, workers: usize) -> Self {
        Self { store, workers }
    }

    /// Routes a request to its handler and returns the response to send.
    ///
    /// Outcomes the client is expected to handle (bad credentials, taken
    /// usernames) are `Ok` responses with `ok: false`.
    ///
    /// # Errors
    ///
    /// Returns `DispatchError::UnknownOperation` for an unrecognised `op`,
    /// `DispatchError::Task` for a rejected task descriptor, and
    /// `DispatchError::Store` when the credential store fails.
    pub fn route(&self, request: &Request) -> Result<Response, DispatchError> {
        let operation = request.operation()?;
        debug!(
            target: DISPATCH_TARGET,
            operation = operation.as_str(),
            "routing request"
        );

        match operation {
            Operation::Task => Ok(Response::success(execute_task(request.task())?)),
            Operation::Registro => self.register(request),
            Operation::Login => self.login(request),
            Operation::GetTareasHtml => self.render_welcome(request),
        }
    }

    fn register(&self, request: &Request) -> Result<Response, DispatchError> {
        let username = request.data_str("username");
        match self.store.create(username, request.data_str("password")) {
            Ok(()) => Ok(Response::info(true, REGISTERED)),
            Err(CreateError::Store(error)) => Err(error.into()),
            Err(rejected) => {
                debug!(target: DISPATCH_TARGET, username, %rejected, "registration rejected");
                Ok(Response::info(false, rejected.to_string()))
            }
        }
    }

    fn login(&self, request: &Request) -> Result<Response, DispatchError> {
        self.verify(request).map(Response::status)
    }

    fn render_welcome(&self, request: &Request) -> Result<Response, DispatchError> {
        if !self.verify(request)? {
            return Ok(Response::failure(UNAUTHORIZED));
        }
        Ok(Response::html(welcome_html(
            request.data_str("username"),
            self.workers,
        )))
    }

    fn verify(&self, request: &Request) -> Result<bool, DispatchError> {
        let username = request.data_str("username");
        let password = request.data_str("password");
        if username.is_empty() || password.is_empty() {
            return Ok(false);
        }
        Ok(self.store.verify(username, password)?)
    }
}

fn welcome_html(username: &str, workers: usize) -> String {
    format!(
        "<!doctype html>\n<title>Inicio</title>\n<h1>Inicio</h1>\n\
         <p>¡Bienvenido, {}! (pool={workers})</p>",
        escape_html(username)
    )
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
