//! POP3 response parser.

use crate::error::{Error, Result};
use crate::types::{MessageNumber, Reply, ResponseCode, Stat, Status, UniqueId};

/// Parses a status line (`+OK ...` or `-ERR ...`).
///
/// The line terminator is optional. An RFC 2449 response code in brackets
/// at the start of an `-ERR` text is split off into [`Reply::code`].
///
/// # Errors
///
/// Returns an error if the line does not start with a status indicator.
pub fn parse_status_line(line: &[u8]) -> Result<Reply> {
    let line = String::from_utf8_lossy(trim_line_ending(line));

    let (status, rest) = if let Some(rest) = line.strip_prefix("+OK") {
        (Status::Ok, rest)
    } else if let Some(rest) = line.strip_prefix("-ERR") {
        (Status::Err, rest)
    } else {
        return Err(Error::Protocol(format!("Invalid status line: {line}")));
    };

    if !(rest.is_empty() || rest.starts_with(' ')) {
        return Err(Error::Protocol(format!("Invalid status line: {line}")));
    }
    let text = rest.trim_start();

    if status == Status::Err
        && let Some(inner) = text.strip_prefix('[')
        && let Some((code, message)) = inner.split_once(']')
    {
        return Ok(Reply::new(
            status,
            Some(ResponseCode::parse(code)),
            message.trim_start(),
        ));
    }

    Ok(Reply::new(status, None, text))
}

/// Parses one line of a `UIDL` listing: `msg-number unique-id`.
///
/// # Errors
///
/// Returns an error if either field is missing or the number is invalid.
pub fn parse_uidl_line(line: &[u8]) -> Result<(MessageNumber, UniqueId)> {
    let line = String::from_utf8_lossy(trim_line_ending(line));
    let mut fields = line.split_whitespace();

    let number = fields
        .next()
        .and_then(|n| n.parse::<u32>().ok())
        .and_then(MessageNumber::new)
        .ok_or_else(|| Error::Protocol(format!("Invalid UIDL line: {line}")))?;
    let uid = fields
        .next()
        .ok_or_else(|| Error::Protocol(format!("Missing unique-id in UIDL line: {line}")))?;

    Ok((number, UniqueId::new(uid)))
}

/// Parses the text of a `STAT` reply: `count size`.
///
/// # Errors
///
/// Returns an error if either number is missing or malformed.
pub fn parse_stat(text: &str) -> Result<Stat> {
    let mut fields = text.split_whitespace();
    let count = fields.next().and_then(|n| n.parse().ok());
    let size = fields.next().and_then(|n| n.parse().ok());

    match (count, size) {
        (Some(count), Some(size)) => Ok(Stat { count, size }),
        _ => Err(Error::Protocol(format!("Invalid STAT reply: {text}"))),
    }
}

/// Extracts the APOP timestamp (`<...>`) from a greeting text.
#[must_use]
pub fn apop_timestamp(greeting: &str) -> Option<&str> {
    let start = greeting.find('<')?;
    let end = greeting.rfind('>')?;
    (end > start).then(|| &greeting[start..=end])
}

/// Reverses byte-stuffing of one multi-line response line.
///
/// Returns `None` for the terminating `.` line.
#[must_use]
pub fn unstuff_line(line: &[u8]) -> Option<&[u8]> {
    let line = trim_line_ending(line);
    match line {
        b"." => None,
        _ => Some(line.strip_prefix(b".").unwrap_or(line)),
    }
}

fn trim_line_ending(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ok_line() {
        let reply = parse_status_line(b"+OK POP3 server ready\r\n").unwrap();
        assert!(reply.is_ok());
        assert_eq!(reply.text, "POP3 server ready");
        assert_eq!(reply.code, None);
    }

    #[test]
    fn test_parse_bare_ok() {
        let reply = parse_status_line(b"+OK\r\n").unwrap();
        assert!(reply.is_ok());
        assert_eq!(reply.text, "");
    }

    #[test]
    fn test_parse_err_with_code() {
        let reply = parse_status_line(b"-ERR [IN-USE] Mailbox already locked\r\n").unwrap();
        assert_eq!(reply.status, Status::Err);
        assert_eq!(reply.code, Some(ResponseCode::InUse));
        assert_eq!(reply.text, "Mailbox already locked");
    }

    #[test]
    fn test_parse_err_without_code() {
        let reply = parse_status_line(b"-ERR no such message\n").unwrap();
        assert_eq!(reply.status, Status::Err);
        assert_eq!(reply.code, None);
        assert_eq!(reply.text, "no such message");
    }

    #[test]
    fn test_parse_invalid_status() {
        assert!(parse_status_line(b"* OK imap\r\n").is_err());
        assert!(parse_status_line(b"+OKAY\r\n").is_err());
        assert!(parse_status_line(b"").is_err());
    }

    #[test]
    fn test_parse_uidl_line() {
        let (number, uid) = parse_uidl_line(b"2 QhdPYR:00WBw1Ph7x7\r\n").unwrap();
        assert_eq!(number.get(), 2);
        assert_eq!(uid.as_str(), "QhdPYR:00WBw1Ph7x7");
    }

    #[test]
    fn test_parse_uidl_line_invalid() {
        assert!(parse_uidl_line(b"0 abc").is_err());
        assert!(parse_uidl_line(b"x abc").is_err());
        assert!(parse_uidl_line(b"3").is_err());
    }

    #[test]
    fn test_parse_stat() {
        assert_eq!(parse_stat("2 320").unwrap(), Stat { count: 2, size: 320 });
        assert!(parse_stat("two").is_err());
    }

    #[test]
    fn test_apop_timestamp() {
        assert_eq!(
            apop_timestamp("POP3 server ready <1896.697170952@dbc.mtview.ca.us>"),
            Some("<1896.697170952@dbc.mtview.ca.us>")
        );
        assert_eq!(apop_timestamp("POP3 server ready"), None);
        assert_eq!(apop_timestamp("weird > order <"), None);
    }

    #[test]
    fn test_unstuff_line() {
        assert_eq!(unstuff_line(b".\r\n"), None);
        assert_eq!(unstuff_line(b"..hidden\r\n"), Some(&b".hidden"[..]));
        assert_eq!(unstuff_line(b"plain\r\n"), Some(&b"plain"[..]));
        assert_eq!(unstuff_line(b"\r\n"), Some(&b""[..]));
    }
}
