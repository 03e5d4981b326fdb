//! Chat REPL command parsing and entry formatting.

use chrono::{DateTime, TimeZone};
use std::fmt::Display;

/// Timestamp layout of every posted entry, e.g. `19 Oct 09:05 PM`.
pub const ENTRY_TIME_FORMAT: &str = "%d %b %I:%M %p";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Read the board without taking the lock.
    View { last: Option<usize> },
    /// Append under the lock.
    Post(String),
    Status,
    Help,
    Quit,
}

impl Command {
    /// Parse one input line. `Err` carries a usage hint.
    pub fn parse(input: &str) -> Result<Option<Command>, &'static str> {
        let input = input.trim_end_matches(['\n', '\r']);
        if input.trim().is_empty() {
            return Ok(None);
        }

        if let Some(text) = input.strip_prefix("post ") {
            if text.trim().is_empty() {
                return Err("Usage: post <text>");
            }
            return Ok(Some(Command::Post(text.to_string())));
        }

        let parts: Vec<&str> = input.split_whitespace().collect();
        let command = match parts.as_slice() {
            ["view"] => Command::View { last: None },
            ["view", "-n", count] => match count.parse() {
                Ok(n) => Command::View { last: Some(n) },
                Err(_) => return Err("Usage: view [-n <count>]"),
            },
            ["view", ..] => return Err("Usage: view [-n <count>]"),
            ["post"] => return Err("Usage: post <text>"),
            ["status"] => Command::Status,
            ["help"] | ["?"] => Command::Help,
            ["quit"] | ["exit"] => Command::Quit,
            _ => return Err("Commands: view [-n N] | post <text> | status | quit"),
        };
        Ok(Some(command))
    }
}

/// Board entry for `text` written by `user` at `at`.
pub fn format_entry<Tz>(at: &DateTime<Tz>, user: &str, text: &str) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    format!("{} {}: {}", at.format(ENTRY_TIME_FORMAT), user, text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            Command::parse("view\n"),
            Ok(Some(Command::View { last: None }))
        );
        assert_eq!(
            Command::parse("view -n 3"),
            Ok(Some(Command::View { last: Some(3) }))
        );
        assert_eq!(Command::parse("status"), Ok(Some(Command::Status)));
        assert_eq!(Command::parse("quit"), Ok(Some(Command::Quit)));
        assert_eq!(Command::parse("   "), Ok(None));
    }

    #[test]
    fn test_post_keeps_text_verbatim() {
        assert_eq!(
            Command::parse("post \"hello  world\"\n"),
            Ok(Some(Command::Post("\"hello  world\"".into())))
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(Command::parse("post").is_err());
        assert!(Command::parse("post    ").is_err());
        assert!(Command::parse("view -n").is_err());
        assert!(Command::parse("view -n lots").is_err());
        assert!(Command::parse("shout hi").is_err());
    }

    #[test]
    fn test_format_entry() {
        let at = Utc.with_ymd_and_hms(2024, 3, 7, 21, 5, 0).unwrap();
        assert_eq!(
            format_entry(&at, "alice", "hi there"),
            "07 Mar 09:05 PM alice: hi there"
        );
    }
}
