//! The two seams between the engine and whatever carries its lines.

use std::sync::Arc;

/// Outbound half of a peer link.
///
/// Sends are fire-and-forget: the implementation frames the line with exactly
/// one trailing newline and delivers it in full, or logs the failure. It must
/// not block, since the engine calls it while holding its state lock.
pub trait LineSink: Send + Sync + 'static {
    fn send_line(&self, line: &str);
}

/// Inbound half: receives each line read off the link, in arrival order.
pub trait LineHandler: Send + Sync + 'static {
    fn handle_line(&self, line: &str);
}

impl<T: LineSink + ?Sized> LineSink for Arc<T> {
    fn send_line(&self, line: &str) {
        (**self).send_line(line)
    }
}

impl<T: LineHandler + ?Sized> LineHandler for Arc<T> {
    fn handle_line(&self, line: &str) {
        (**self).handle_line(line)
    }
}

impl<T: LineSink + ?Sized> LineSink for Box<T> {
    fn send_line(&self, line: &str) {
        (**self).send_line(line)
    }
}

/// Drop any trailing `\n` / `\r\n` so the framer can add exactly one.
pub fn strip_terminator(line: &str) -> &str {
    line.trim_end_matches(['\n', '\r'])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_terminator() {
        assert_eq!(strip_terminator("REPLY 2"), "REPLY 2");
        assert_eq!(strip_terminator("REPLY 2\n"), "REPLY 2");
        assert_eq!(strip_terminator("REPLY 2\r\n"), "REPLY 2");
        assert_eq!(strip_terminator("REPLY 2\n\n"), "REPLY 2");
        assert_eq!(strip_terminator(""), "");
    }
}
