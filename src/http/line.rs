//! Resumable line tokenizer over the receive buffer.

use crate::http::buffer::ReceiveBuffer;
use crate::http::parser::ParseError;

/// Accumulates one line at a time out of a [`ReceiveBuffer`].
///
/// A line may arrive over any number of refills; bytes are consumed from
/// the buffer as they are scanned and never looked at twice. Once a
/// terminator is seen the line stays available until the next
/// [`read_line`](LineParser::read_line) call starts a new one.
#[derive(Debug, Default)]
pub struct LineParser {
    text: Vec<u8>,
    finished: bool,
    /// The last scanned byte was a `\r`.
    pending_cr: bool,
}

impl LineParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan pending bytes for the end of the current line.
    ///
    /// Returns `Ok(true)` once the line is complete. The terminator (`\r\n`,
    /// or a bare `\n`) is consumed but not stored. More than `limit` bytes
    /// without a terminator is an error, as is a `\r` not followed by `\n`.
    pub fn read_line(&mut self, buffer: &mut ReceiveBuffer, limit: usize) -> Result<bool, ParseError> {
        if self.finished {
            self.reset();
        }

        let mut consumed = 0;
        for &byte in buffer.unprocessed() {
            consumed += 1;

            if self.pending_cr {
                self.pending_cr = false;
                if byte == b'\n' {
                    self.finished = true;
                    break;
                }
                return Err(ParseError::InvalidLineEnding);
            }

            match byte {
                b'\r' => self.pending_cr = true,
                b'\n' => {
                    self.finished = true;
                    break;
                }
                _ => {
                    if self.text.len() >= limit {
                        return Err(ParseError::LineTooLong { limit });
                    }
                    self.text.push(byte);
                }
            }
        }

        buffer.consume(consumed);
        Ok(self.finished)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Whether part of a line has been scanned already.
    pub fn in_progress(&self) -> bool {
        !self.finished && (!self.text.is_empty() || self.pending_cr)
    }

    pub fn reset(&mut self) {
        self.text.clear();
        self.finished = false;
        self.pending_cr = false;
    }
}
