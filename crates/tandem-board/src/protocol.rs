//! Board wire protocol.
//!
//! One request line per connection:
//!
//! ```text
//! VIEW               ->  OK <bytes>\n<content>.\n
//! VIEW -n <count>    ->  same, only the last <count> entries
//! POST <entry>       ->  OK\n
//! anything else      ->  ERR badcmd\n
//! ```
//!
//! File failures on the server answer `ERR open\n`.

use std::fmt;

pub const VIEW_TAG: &str = "VIEW";
pub const POST_TAG: &str = "POST";
/// Marks the end of a VIEW body.
pub const END_MARKER: &str = ".";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BoardRequest {
    View { last: Option<usize> },
    Post { entry: String },
}

impl BoardRequest {
    pub fn view() -> Self {
        BoardRequest::View { last: None }
    }

    pub fn view_last(count: usize) -> Self {
        BoardRequest::View { last: Some(count) }
    }

    pub fn post(entry: impl Into<String>) -> Self {
        BoardRequest::Post {
            entry: entry.into(),
        }
    }

    /// Parse one request line. `None` means the server answers `ERR badcmd`.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim_end_matches(['\n', '\r']);

        if let Some(entry) = line.strip_prefix("POST ") {
            if entry.trim().is_empty() {
                return None;
            }
            return Some(BoardRequest::post(entry));
        }

        let mut parts = line.split_whitespace();
        if parts.next() != Some(VIEW_TAG) {
            return None;
        }
        match (parts.next(), parts.next(), parts.next()) {
            (None, _, _) => Some(BoardRequest::view()),
            (Some("-n"), Some(count), None) => count.parse().ok().map(BoardRequest::view_last),
            _ => None,
        }
    }
}

impl fmt::Display for BoardRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoardRequest::View { last: None } => write!(f, "{}", VIEW_TAG),
            BoardRequest::View { last: Some(n) } => write!(f, "{} -n {}", VIEW_TAG, n),
            BoardRequest::Post { entry } => write!(f, "{} {}", POST_TAG, entry),
        }
    }
}

/// Server error codes sent as `ERR <code>`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorCode {
    Open,
    BadCommand,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::Open => "open",
            ErrorCode::BadCommand => "badcmd",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BoardResponse {
    /// Body of a VIEW.
    Content(String),
    /// Acknowledged POST.
    Ok,
    Err(ErrorCode),
}

impl BoardResponse {
    /// Full response bytes, terminators included.
    pub fn encode(&self) -> String {
        match self {
            BoardResponse::Content(content) => {
                format!("OK {}\n{}{}\n", content.len(), content, END_MARKER)
            }
            BoardResponse::Ok => "OK\n".to_string(),
            BoardResponse::Err(code) => format!("ERR {}\n", code.as_str()),
        }
    }
}

/// The last `count` newline-terminated entries of `content`.
pub fn tail_entries(content: &str, count: usize) -> &str {
    if count == 0 {
        return "";
    }
    let body = content.strip_suffix('\n').unwrap_or(content);
    let mut seen = 0;
    for (idx, _) in body.rmatch_indices('\n') {
        seen += 1;
        if seen == count {
            return &content[idx + 1..];
        }
    }
    content
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_view() {
        assert_eq!(BoardRequest::parse("VIEW"), Some(BoardRequest::view()));
        assert_eq!(BoardRequest::parse("VIEW\r\n"), Some(BoardRequest::view()));
        assert_eq!(
            BoardRequest::parse("VIEW -n 5"),
            Some(BoardRequest::view_last(5))
        );
    }

    #[test]
    fn test_parse_post_keeps_entry_verbatim() {
        let line = "POST 19 Oct 10:42 AM alice:  hello  there\n";
        assert_eq!(
            BoardRequest::parse(line),
            Some(BoardRequest::post("19 Oct 10:42 AM alice:  hello  there"))
        );
    }

    #[test]
    fn test_parse_rejects_bad_commands() {
        for line in [
            "", "view", "VIEWS", "VIEW -n", "VIEW -n x", "VIEW -n 3 4", "VIEW all", "POST",
            "POST ", "POST    ", "DELETE 1",
        ] {
            assert_eq!(BoardRequest::parse(line), None, "{:?}", line);
        }
    }

    #[test]
    fn test_request_display() {
        assert_eq!(BoardRequest::view().to_string(), "VIEW");
        assert_eq!(BoardRequest::view_last(2).to_string(), "VIEW -n 2");
        assert_eq!(BoardRequest::post("a: b").to_string(), "POST a: b");
    }

    #[test]
    fn test_response_encoding() {
        assert_eq!(
            BoardResponse::Content("a\nb\n".into()).encode(),
            "OK 4\na\nb\n.\n"
        );
        assert_eq!(BoardResponse::Content(String::new()).encode(), "OK 0\n.\n");
        assert_eq!(BoardResponse::Ok.encode(), "OK\n");
        assert_eq!(
            BoardResponse::Err(ErrorCode::BadCommand).encode(),
            "ERR badcmd\n"
        );
        assert_eq!(BoardResponse::Err(ErrorCode::Open).encode(), "ERR open\n");
    }

    #[test]
    fn test_tail_entries() {
        let content = "one\ntwo\nthree\n";
        assert_eq!(tail_entries(content, 0), "");
        assert_eq!(tail_entries(content, 1), "three\n");
        assert_eq!(tail_entries(content, 2), "two\nthree\n");
        assert_eq!(tail_entries(content, 3), content);
        assert_eq!(tail_entries(content, 10), content);
        assert_eq!(tail_entries("", 2), "");
    }
}
