//! Line-based codec for tokio.
//!
//! Frames newline-terminated UTF-8 lines. AGI replies are short; the default
//! limit of 4096 bytes leaves generous headroom for long variable values.

use bytes::{BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::AgiError;

const DEFAULT_MAX_LEN: usize = 4096;

/// Newline-delimited codec with a maximum line length.
pub struct LineCodec {
    /// Index of next byte to check for newline.
    next_index: usize,
    /// Maximum line length.
    max_len: usize,
}

impl LineCodec {
    /// Create a codec with the default line limit.
    pub fn new() -> Self {
        Self {
            next_index: 0,
            max_len: DEFAULT_MAX_LEN,
        }
    }

    /// Create a codec with a custom maximum line length.
    pub fn with_max_len(max_len: usize) -> Self {
        Self {
            next_index: 0,
            max_len,
        }
    }
}

impl Default for LineCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for LineCodec {
    type Item = String;
    type Error = AgiError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<String>, AgiError> {
        // Look for a newline starting from where we left off
        if let Some(offset) = src[self.next_index..].iter().position(|b| *b == b'\n') {
            let mut line = src.split_to(self.next_index + offset + 1);
            self.next_index = 0;
            // Strip the newline and an optional carriage return
            line.truncate(line.len() - 1);
            if line.last() == Some(&b'\r') {
                line.truncate(line.len() - 1);
            }
            let line = String::from_utf8(line.to_vec())?;
            Ok(Some(line))
        } else if src.len() > self.max_len {
            Err(AgiError::LineTooLong(self.max_len))
        } else {
            self.next_index = src.len();
            Ok(None)
        }
    }
}

impl Encoder<String> for LineCodec {
    type Error = AgiError;

    fn encode(&mut self, item: String, dst: &mut BytesMut) -> Result<(), AgiError> {
        dst.reserve(item.len() + 1);
        dst.put_slice(item.as_bytes());
        if !item.ends_with('\n') {
            dst.put_u8(b'\n');
        }
        Ok(())
    }
}
