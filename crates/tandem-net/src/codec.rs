//! Line framing for inbound peer links.

use std::io;
use tokio_util::bytes::{Buf, BytesMut};
use tokio_util::codec::Decoder;
use tracing::warn;

/// Newline-delimited decoder that never fails on content.
///
/// [`LinesCodec`](tokio_util::codec::LinesCodec) ends the stream at the first
/// line that is not UTF-8 or is too long. Here such bytes are decoded lossily,
/// and a line longer than `max_length` is skipped whole, so only an I/O error
/// can end a connection.
#[derive(Clone, Debug)]
pub struct PeerLineCodec {
    max_length: usize,
    /// Bytes at the front of the buffer already searched for a newline.
    next_index: usize,
    /// Inside an overlong line: drop everything up to the next newline.
    discarding: bool,
}

impl PeerLineCodec {
    pub fn new(max_length: usize) -> Self {
        Self {
            max_length,
            next_index: 0,
            discarding: false,
        }
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }
}

fn to_line(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\n").unwrap_or(bytes);
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

impl Decoder for PeerLineCodec {
    type Item = String;
    type Error = io::Error;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<String>, io::Error> {
        loop {
            let newline = buf[self.next_index..].iter().position(|b| *b == b'\n');
            match (self.discarding, newline) {
                (true, Some(offset)) => {
                    buf.advance(self.next_index + offset + 1);
                    self.next_index = 0;
                    self.discarding = false;
                }
                (true, None) => {
                    buf.clear();
                    self.next_index = 0;
                    return Ok(None);
                }
                (false, Some(offset)) => {
                    let end = self.next_index + offset + 1;
                    self.next_index = 0;
                    let line = buf.split_to(end);
                    if end - 1 > self.max_length {
                        warn!(len = end - 1, max = self.max_length, "dropping overlong line");
                        continue;
                    }
                    return Ok(Some(to_line(&line)));
                }
                (false, None) if buf.len() > self.max_length => {
                    warn!(max = self.max_length, "dropping overlong line");
                    buf.clear();
                    self.next_index = 0;
                    self.discarding = true;
                    return Ok(None);
                }
                (false, None) => {
                    self.next_index = buf.len();
                    return Ok(None);
                }
            }
        }
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<String>, io::Error> {
        if let Some(line) = self.decode(buf)? {
            return Ok(Some(line));
        }

        // Unterminated tail of a closed connection.
        self.next_index = 0;
        if self.discarding || buf.is_empty() {
            self.discarding = false;
            buf.clear();
            return Ok(None);
        }
        let line = buf.split_to(buf.len());
        Ok(Some(to_line(&line)))
    }
}
