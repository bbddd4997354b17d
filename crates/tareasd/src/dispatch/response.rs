//! Response envelope and JSONL writer.
//!
//! A [`Response`] always carries `ok` and at most one payload field. The
//! constructors are the only way the daemon builds one, so a failure can never
//! carry a `result`.

use std::io::Write;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::errors::DispatchError;

/// Response sent to the client for one request line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Whether the operation succeeded.
    pub ok: bool,
    /// Task result.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Failure description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Informational message from registration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<String>,
    /// Rendered HTML fragment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
}

impl Response {
    fn bare(ok: bool) -> Self {
        Self {
            ok,
            result: None,
            error: None,
            info: None,
            html: None,
        }
    }

    /// `{"ok":true,"result":...}`
    pub fn success(result: Value) -> Self {
        Self {
            result: Some(result),
            ..Self::bare(true)
        }
    }

    /// `{"ok":false,"error":...}`
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::bare(false)
        }
    }

    /// `{"ok":...,"info":...}`
    pub fn info(ok: bool, info: impl Into<String>) -> Self {
        Self {
            info: Some(info.into()),
            ..Self::bare(ok)
        }
    }

    /// `{"ok":true,"html":...}`
    pub fn html(html: impl Into<String>) -> Self {
        Self {
            html: Some(html.into()),
            ..Self::bare(true)
        }
    }

    /// `{"ok":...}` with no payload.
    pub fn status(ok: bool) -> Self {
        Self::bare(ok)
    }
}

/// Writer that serializes responses as JSONL.
///
/// Each response is written as one line and flushed immediately, so the client
/// sees it before the session reads the next request.
pub struct ResponseWriter<W> {
    writer: W,
}

impl<W: Write> ResponseWriter<W> {
    /// Creates a new response writer wrapping the given output stream.
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Writes a response followed by `\n` and flushes.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization, writing or flushing fails.
    pub fn write_response(&mut self, response: &Response) -> Result<(), DispatchError> {
        let mut line = serde_json::to_vec(response)?;
        line.push(b'\n');
        self.writer.write_all(&line)?;
        self.writer.flush()?;
        Ok(())
    }

    /// Writes the failure response for `error`.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_error(&mut self, error: &DispatchError) -> Result<(), DispatchError> {
        self.write_response(&error.to_response())
    }
}
