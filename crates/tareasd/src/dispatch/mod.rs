//! Newline-delimited JSON request dispatch.
//!
//! This module implements the per-connection session that reads requests,
//! routes them through the worker pool, and writes responses back. The
//! dispatcher plugs into the transport layer via the `ConnectionHandler`
//! trait.
//!
//! ## Protocol
//!
//! Clients send one JSON object per line:
//!
//! ```json
//! {"op":"TASK","data":{"task":{"name":"sum","args":[1,2,3.5]}}}
//! ```
//!
//! and receive exactly one JSON object per non-empty line, in order:
//!
//! ```json
//! {"ok":true,"result":6.5}
//! ```
//!
//! ## Operations
//!
//! `TASK`, `REGISTRO`, `LOGIN` and `GET_TAREAS_HTML`, matched
//! case-insensitively. Anything else yields `{"ok":false,"error":"unknown op: <op>"}`.

mod errors;
mod framing;
mod handler;
mod request;
mod response;
mod router;

pub use self::errors::DispatchError;
pub use self::handler::DispatchConnectionHandler;
pub use self::request::{Operation, Request};
pub use self::response::{Response, ResponseWriter};
pub use self::router::{MessageRouter, REGISTERED, UNAUTHORIZED};
