//! REQUEST / REPLY / RELEASE wire codec.
//!
//! One message per line, fields separated by single spaces:
//!
//! ```text
//! REQUEST <ts> <id>
//! REPLY <ts> <id>         (<ts> echoes the REQUEST being answered)
//! RELEASE <id>            (a leading <ts> is also accepted: RELEASE <ts> <id>)
//! ```
//!
//! Timestamps above [`MAX_TIMESTAMP`] are rejected so a peer cannot push a
//! clock into saturation.
//!
//! `Display` produces the line without its terminating newline; framing is
//! the transport's job.

use crate::clock::MAX_TIMESTAMP;
use crate::node::NodeId;
use crate::stamp::RequestStamp;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub const REQUEST_TAG: &str = "REQUEST";
pub const REPLY_TAG: &str = "REPLY";
pub const RELEASE_TAG: &str = "RELEASE";

/// A protocol message exchanged between the two peers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Message {
    /// Claim to enter the critical section.
    Request { timestamp: u64, from: NodeId },
    /// Permission granted for the request stamped `timestamp`.
    Reply { timestamp: u64, from: NodeId },
    /// Critical section vacated. The timestamp is optional and carries no
    /// priority information; receivers only feed it to their clock.
    Release { timestamp: Option<u64>, from: NodeId },
}

/// Why a line could not be decoded.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("empty line")]
    Empty,

    #[error("unknown message type: {0}")]
    UnknownTag(String),

    #[error("{tag}: missing field `{field}`")]
    MissingField { tag: &'static str, field: &'static str },

    #[error("{tag}: field `{field}` is not a number: {value:?}")]
    InvalidNumber {
        tag: &'static str,
        field: &'static str,
        value: String,
    },

    #[error("{tag}: timestamp {value} exceeds {max}", max = MAX_TIMESTAMP)]
    TimestampOutOfRange { tag: &'static str, value: u64 },

    #[error("{tag}: unexpected trailing field {value:?}")]
    TrailingField { tag: &'static str, value: String },
}

impl Message {
    pub fn request(stamp: RequestStamp) -> Self {
        Message::Request {
            timestamp: stamp.timestamp,
            from: stamp.node,
        }
    }

    /// Answer to the request stamped `request`.
    pub fn reply(request: RequestStamp, from: NodeId) -> Self {
        Message::Reply {
            timestamp: request.timestamp,
            from,
        }
    }

    pub fn release(from: NodeId) -> Self {
        Message::Release {
            timestamp: None,
            from,
        }
    }

    /// The node that sent this message.
    pub fn sender(&self) -> NodeId {
        match self {
            Message::Request { from, .. } | Message::Reply { from, .. } | Message::Release { from, .. } => {
                *from
            }
        }
    }

    /// The Lamport timestamp carried by this message, if any.
    pub fn timestamp(&self) -> Option<u64> {
        match self {
            Message::Request { timestamp, .. } | Message::Reply { timestamp, .. } => Some(*timestamp),
            Message::Release { timestamp, .. } => *timestamp,
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            Message::Request { .. } => REQUEST_TAG,
            Message::Reply { .. } => REPLY_TAG,
            Message::Release { .. } => RELEASE_TAG,
        }
    }

    /// Decode one line. Surrounding whitespace, including the line
    /// terminator, is ignored.
    pub fn parse(line: &str) -> Result<Self, ParseError> {
        let mut fields = line.split_whitespace();
        let tag = fields.next().ok_or(ParseError::Empty)?;

        let message = match tag {
            REQUEST_TAG => {
                let timestamp = timestamp(REQUEST_TAG, fields.next())?;
                let from = node(REQUEST_TAG, fields.next())?;
                Message::Request { timestamp, from }
            }
            REPLY_TAG => {
                let timestamp = timestamp(REPLY_TAG, fields.next())?;
                let from = node(REPLY_TAG, fields.next())?;
                Message::Reply { timestamp, from }
            }
            RELEASE_TAG => {
                let first = fields.next();
                match fields.next() {
                    Some(second) => Message::Release {
                        timestamp: Some(timestamp(RELEASE_TAG, first)?),
                        from: node(RELEASE_TAG, Some(second))?,
                    },
                    None => Message::Release {
                        timestamp: None,
                        from: node(RELEASE_TAG, first)?,
                    },
                }
            }
            other => return Err(ParseError::UnknownTag(other.to_string())),
        };

        if let Some(extra) = fields.next() {
            return Err(ParseError::TrailingField {
                tag: message.tag(),
                value: extra.to_string(),
            });
        }

        Ok(message)
    }
}

fn timestamp(tag: &'static str, raw: Option<&str>) -> Result<u64, ParseError> {
    let raw = raw.ok_or(ParseError::MissingField { tag, field: "ts" })?;
    let value: u64 = raw.parse().map_err(|_| ParseError::InvalidNumber {
        tag,
        field: "ts",
        value: raw.to_string(),
    })?;
    if value > MAX_TIMESTAMP {
        return Err(ParseError::TimestampOutOfRange { tag, value });
    }
    Ok(value)
}

fn node(tag: &'static str, raw: Option<&str>) -> Result<NodeId, ParseError> {
    let raw = raw.ok_or(ParseError::MissingField { tag, field: "id" })?;
    raw.parse().map_err(|_| ParseError::InvalidNumber {
        tag,
        field: "id",
        value: raw.to_string(),
    })
}

impl FromStr for Message {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Message::parse(s)
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Message::Request { timestamp, from } => write!(f, "{} {} {}", REQUEST_TAG, timestamp, from),
            Message::Reply { timestamp, from } => write!(f, "{} {} {}", REPLY_TAG, timestamp, from),
            Message::Release {
                timestamp: Some(ts),
                from,
            } => write!(f, "{} {} {}", RELEASE_TAG, ts, from),
            Message::Release {
                timestamp: None,
                from,
            } => write!(f, "{} {}", RELEASE_TAG, from),
        }
    }
}
