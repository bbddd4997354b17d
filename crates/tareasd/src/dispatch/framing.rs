//! Newline framing over a byte stream.
//!
//! [`LineBuffer`] accumulates bytes read from a connection and yields complete
//! `\n`-terminated frames in arrival order. It holds at most one bounded window
//! of undelimited bytes; a frame or remainder longer than the window is a
//! [`DispatchError::RequestTooLarge`].

use super::errors::DispatchError;

/// Incremental line splitter with a size cap.
#[derive(Debug)]
pub struct LineBuffer {
    buffer: Vec<u8>,
    /// Bytes already searched for a delimiter.
    scanned: usize,
    max_bytes: usize,
}

impl LineBuffer {
    /// Creates an empty buffer that rejects frames longer than `max_bytes`.
    pub fn new(max_bytes: usize) -> Self {
        Self {
            buffer: Vec::new(),
            scanned: 0,
            max_bytes,
        }
    }

    /// Appends bytes read from the peer.
    pub fn extend(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    /// Removes and returns the next complete frame, newline included.
    ///
    /// Returns `Ok(None)` when no complete frame is buffered yet.
    ///
    /// # Errors
    ///
    /// Returns `DispatchError::RequestTooLarge` when the next frame, or the
    /// undelimited remainder, exceeds the limit.
    pub fn next_frame(&mut self) -> Result<Option<Vec<u8>>, DispatchError> {
        let newline = self.buffer[self.scanned..]
            .iter()
            .position(|byte| *byte == b'\n')
            .map(|offset| self.scanned + offset);

        match newline {
            Some(position) => {
                self.enforce_limit(position)?;
                let frame: Vec<u8> = self.buffer.drain(..=position).collect();
                self.scanned = 0;
                Ok(Some(frame))
            }
            None => {
                self.scanned = self.buffer.len();
                self.enforce_limit(self.buffer.len())?;
                Ok(None)
            }
        }
    }

    /// Number of buffered bytes not yet returned as a frame.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    fn enforce_limit(&self, size: usize) -> Result<(), DispatchError> {
        if size > self.max_bytes {
            return Err(DispatchError::request_too_large(size, self.max_bytes));
        }
        Ok(())
    }
}
