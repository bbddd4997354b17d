//! Request deserialization for the dispatch loop.
//!
//! A request line is a JSON object with an `op` string and an optional `data`
//! object. Anything else is malformed input.

use serde::Deserialize;
use serde_json::{Map, Value};

use super::errors::DispatchError;

static NO_TASK: Value = Value::Null;

/// Parsed request from a client.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Request {
    /// Operation name as received; missing or `null` means empty.
    #[serde(default)]
    op: Option<String>,
    /// Operation arguments; missing or `null` means empty.
    #[serde(default)]
    data: Option<Map<String, Value>>,
    /// Legacy top-level task descriptor accepted by `TASK`.
    #[serde(default)]
    task: Option<Value>,
}

impl Request {
    /// Parses a JSONL line into a request.
    ///
    /// Trailing whitespace (including the newline delimiter) is trimmed before
    /// parsing.
    ///
    /// # Errors
    ///
    /// Returns `DispatchError::MalformedInput` if the line is not a JSON object
    /// matching the request schema.
    pub fn parse(line: &[u8]) -> Result<Self, DispatchError> {
        let trimmed = trim_trailing_whitespace(line);
        if trimmed.is_empty() {
            return Err(DispatchError::malformed("empty request line"));
        }
        serde_json::from_slice(trimmed).map_err(DispatchError::malformed)
    }

    /// Returns the operation name exactly as sent.
    pub fn op(&self) -> &str {
        self.op.as_deref().unwrap_or_default()
    }

    /// Returns the resolved operation.
    ///
    /// # Errors
    ///
    /// Returns `DispatchError::UnknownOperation` carrying the received name.
    pub fn operation(&self) -> Result<Operation, DispatchError> {
        Operation::parse(self.op())
    }

    /// Returns a string field of `data`; absent or non-string values are empty.
    pub fn data_str(&self, key: &str) -> &str {
        self.data
            .as_ref()
            .and_then(|data| data.get(key))
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    /// Returns the task descriptor from `data.task`, falling back to a
    /// top-level `task`. `Null` when neither is present.
    pub fn task(&self) -> &Value {
        self.data
            .as_ref()
            .and_then(|data| data.get("task"))
            .filter(|task| !task.is_null())
            .or(self.task.as_ref())
            .unwrap_or(&NO_TASK)
    }
}

/// Operations understood by the router.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Run a task through the executor.
    Task,
    /// Register a credential.
    Registro,
    /// Verify a credential.
    Login,
    /// Verify a credential and render the welcome fragment.
    GetTareasHtml,
}

impl Operation {
    /// Parses an operation name (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns `DispatchError::UnknownOperation` if the value does not match
    /// any known operation.
    pub fn parse(value: &str) -> Result<Self, DispatchError> {
        match value.to_ascii_uppercase().as_str() {
            "TASK" => Ok(Self::Task),
            "REGISTRO" => Ok(Self::Registro),
            "LOGIN" => Ok(Self::Login),
            "GET_TAREAS_HTML" => Ok(Self::GetTareasHtml),
            _ => Err(DispatchError::unknown_operation(value)),
        }
    }

    /// Returns the canonical wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Task => "TASK",
            Self::Registro => "REGISTRO",
            Self::Login => "LOGIN",
            Self::GetTareasHtml => "GET_TAREAS_HTML",
        }
    }
}

/// Trims trailing ASCII whitespace from a byte slice.
fn trim_trailing_whitespace(bytes: &[u8]) -> &[u8] {
    let end = bytes
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(0, |pos| pos + 1);
    &bytes[..end]
}
