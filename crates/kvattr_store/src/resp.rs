//! Redis serialization protocol (RESP2) framing.
//!
//! Only the client half is implemented: commands are always encoded as
//! arrays of bulk strings, and replies of every RESP2 type are parsed.

use crate::error::{StoreError, StoreResult};
use bytes::{BufMut, BytesMut};
use std::io::BufRead;

const CRLF: &[u8] = b"\r\n";

/// Largest bulk string accepted in a reply (the Redis limit, 512 MiB).
pub const MAX_BULK_LEN: usize = 512 * 1024 * 1024;

/// Largest number of elements accepted in an array reply.
pub const MAX_ARRAY_LEN: usize = 1024 * 1024;

/// A parsed server reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// `+OK`
    Simple(String),
    /// `-ERR ...`
    Error(String),
    /// `:42`
    Integer(i64),
    /// `$3\r\nfoo`, or `$-1` for null.
    Bulk(Option<Vec<u8>>),
    /// `*2 ...`, or `*-1` for null.
    Array(Option<Vec<Reply>>),
}

impl Reply {
    /// Turns an error reply into [`StoreError::Server`].
    pub fn into_result(self) -> StoreResult<Reply> {
        match self {
            Reply::Error(message) => Err(StoreError::server(message)),
            other => Ok(other),
        }
    }

    /// Interprets the reply as an optional string.
    pub fn into_optional_string(self) -> StoreResult<Option<String>> {
        match self.into_result()? {
            Reply::Bulk(None) | Reply::Array(None) => Ok(None),
            Reply::Bulk(Some(bytes)) => String::from_utf8(bytes)
                .map(Some)
                .map_err(|_| StoreError::protocol("bulk reply is not valid UTF-8")),
            Reply::Simple(s) => Ok(Some(s)),
            Reply::Integer(n) => Ok(Some(n.to_string())),
            other => Err(unexpected("string", &other)),
        }
    }

    /// Interprets the reply as an integer.
    pub fn into_integer(self) -> StoreResult<i64> {
        match self.into_result()? {
            Reply::Integer(n) => Ok(n),
            Reply::Bulk(Some(bytes)) => parse_int(&bytes),
            Reply::Simple(s) => parse_int(s.as_bytes()),
            other => Err(unexpected("integer", &other)),
        }
    }

    /// Interprets the reply as an optional score.
    ///
    /// Scores may arrive as integers or as decimal strings; fractional parts
    /// are truncated.
    pub fn into_score(self) -> StoreResult<Option<i64>> {
        match self.into_optional_string()? {
            None => Ok(None),
            Some(text) => parse_score(&text).map(Some),
        }
    }

    /// Interprets the reply as a list of strings.
    pub fn into_strings(self) -> StoreResult<Vec<String>> {
        match self.into_result()? {
            Reply::Array(None) => Ok(Vec::new()),
            Reply::Array(Some(items)) => items
                .into_iter()
                .map(|item| {
                    item.into_optional_string()?
                        .ok_or_else(|| StoreError::protocol("null element in string list"))
                })
                .collect(),
            other => Err(unexpected("array", &other)),
        }
    }

    /// Interprets the reply as a list of optional strings.
    pub fn into_optional_strings(self) -> StoreResult<Vec<Option<String>>> {
        match self.into_result()? {
            Reply::Array(None) => Ok(Vec::new()),
            Reply::Array(Some(items)) => items
                .into_iter()
                .map(Reply::into_optional_string)
                .collect(),
            other => Err(unexpected("array", &other)),
        }
    }

    /// Accepts any non-error reply.
    pub fn into_unit(self) -> StoreResult<()> {
        self.into_result().map(|_| ())
    }
}

fn unexpected(expected: &str, got: &Reply) -> StoreError {
    StoreError::protocol(format!("expected {expected} reply, got {got:?}"))
}

/// Parses a score sent as text.
pub fn parse_score(text: &str) -> StoreResult<i64> {
    if let Ok(n) = text.parse::<i64>() {
        return Ok(n);
    }
    text.parse::<f64>()
        .map(|f| f.trunc() as i64)
        .map_err(|_| StoreError::protocol(format!("invalid score: {text}")))
}

/// Encodes a command as a RESP array of bulk strings.
pub fn encode_command<A: AsRef<[u8]>>(args: &[A]) -> BytesMut {
    let mut buf = BytesMut::with_capacity(16 + args.iter().map(|a| a.as_ref().len() + 16).sum::<usize>());
    buf.put_u8(b'*');
    buf.put_slice(args.len().to_string().as_bytes());
    buf.put_slice(CRLF);
    for arg in args {
        let arg = arg.as_ref();
        buf.put_u8(b'$');
        buf.put_slice(arg.len().to_string().as_bytes());
        buf.put_slice(CRLF);
        buf.put_slice(arg);
        buf.put_slice(CRLF);
    }
    buf
}

/// Reads one complete reply from `reader`.
///
/// # Errors
///
/// Returns [`StoreError::Io`] on read failures (including EOF) and
/// [`StoreError::Protocol`] on malformed input.
pub fn read_reply<R: BufRead>(reader: &mut R) -> StoreResult<Reply> {
    let line = read_line(reader)?;
    let (tag, rest) = line
        .split_first()
        .ok_or_else(|| StoreError::protocol("empty reply line"))?;

    match tag {
        b'+' => Ok(Reply::Simple(utf8(rest)?)),
        b'-' => Ok(Reply::Error(utf8(rest)?)),
        b':' => Ok(Reply::Integer(parse_int(rest)?)),
        b'$' => {
            let Some(len) = reply_len(parse_int(rest)?, MAX_BULK_LEN, "bulk string")? else {
                return Ok(Reply::Bulk(None));
            };
            let framed = len
                .checked_add(CRLF.len())
                .ok_or_else(|| StoreError::protocol("bulk string length overflows"))?;
            let mut data = vec![0u8; framed];
            reader.read_exact(&mut data)?;
            if !data.ends_with(CRLF) {
                return Err(StoreError::protocol("bulk string not terminated by CRLF"));
            }
            data.truncate(len);
            Ok(Reply::Bulk(Some(data)))
        }
        b'*' => {
            let Some(len) = reply_len(parse_int(rest)?, MAX_ARRAY_LEN, "array")? else {
                return Ok(Reply::Array(None));
            };
            let items = (0..len)
                .map(|_| read_reply(reader))
                .collect::<StoreResult<Vec<_>>>()?;
            Ok(Reply::Array(Some(items)))
        }
        other => Err(StoreError::protocol(format!(
            "unknown reply type byte {:?}",
            char::from(*other)
        ))),
    }
}

/// Validates a length header. Negative lengths mean null.
fn reply_len(len: i64, max: usize, what: &str) -> StoreResult<Option<usize>> {
    if len < 0 {
        return Ok(None);
    }
    match usize::try_from(len) {
        Ok(len) if len <= max => Ok(Some(len)),
        _ => Err(StoreError::protocol(format!(
            "{what} length {len} exceeds the limit of {max}"
        ))),
    }
}

fn read_line<R: BufRead>(reader: &mut R) -> StoreResult<Vec<u8>> {
    let mut line = Vec::new();
    let n = reader.read_until(b'\n', &mut line)?;
    if n == 0 {
        return Err(StoreError::Io(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            "connection closed by peer",
        )));
    }
    if !line.ends_with(CRLF) {
        return Err(StoreError::protocol("reply line not terminated by CRLF"));
    }
    line.truncate(line.len() - CRLF.len());
    Ok(line)
}

fn utf8(bytes: &[u8]) -> StoreResult<String> {
    String::from_utf8(bytes.to_vec()).map_err(|_| StoreError::protocol("reply is not valid UTF-8"))
}

fn parse_int(bytes: &[u8]) -> StoreResult<i64> {
    std::str::from_utf8(bytes)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| StoreError::protocol("invalid integer in reply"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn parse(input: &[u8]) -> StoreResult<Reply> {
        read_reply(&mut Cursor::new(input.to_vec()))
    }

    #[test]
    fn encode_command_frames_bulk_strings() {
        let buf = encode_command(&["SET", "k", "hello"]);
        assert_eq!(&buf[..], b"*3\r\n$3\r\nSET\r\n$1\r\nk\r\n$5\r\nhello\r\n");
    }

    #[test]
    fn encode_empty_argument() {
        let buf = encode_command(&["SET", "k", ""]);
        assert_eq!(&buf[..], b"*3\r\n$3\r\nSET\r\n$1\r\nk\r\n$0\r\n\r\n");
    }

    #[test]
    fn parse_scalar_replies() {
        assert_eq!(parse(b"+OK\r\n").unwrap(), Reply::Simple("OK".into()));
        assert_eq!(parse(b"-ERR bad\r\n").unwrap(), Reply::Error("ERR bad".into()));
        assert_eq!(parse(b":-12\r\n").unwrap(), Reply::Integer(-12));
        assert_eq!(parse(b"$-1\r\n").unwrap(), Reply::Bulk(None));
        assert_eq!(parse(b"$0\r\n\r\n").unwrap(), Reply::Bulk(Some(Vec::new())));
        assert_eq!(
            parse(b"$5\r\nhello\r\n").unwrap(),
            Reply::Bulk(Some(b"hello".to_vec()))
        );
    }

    #[test]
    fn parse_nested_array() {
        let reply = parse(b"*3\r\n$1\r\na\r\n$-1\r\n:7\r\n").unwrap();
        assert_eq!(
            reply,
            Reply::Array(Some(vec![
                Reply::Bulk(Some(b"a".to_vec())),
                Reply::Bulk(None),
                Reply::Integer(7),
            ]))
        );
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(matches!(parse(b"?x\r\n"), Err(StoreError::Protocol { .. })));
        assert!(matches!(parse(b"+OK\n"), Err(StoreError::Protocol { .. })));
        assert!(matches!(parse(b""), Err(StoreError::Io(_))));
    }

    #[test]
    fn oversized_lengths_are_rejected() {
        assert!(matches!(
            parse(b"$9223372036854775807\r\n"),
            Err(StoreError::Protocol { .. })
        ));
        assert!(matches!(
            parse(format!("${}\r\n", MAX_BULK_LEN + 1).as_bytes()),
            Err(StoreError::Protocol { .. })
        ));
        assert!(matches!(
            parse(b"*9223372036854775807\r\n"),
            Err(StoreError::Protocol { .. })
        ));
        assert_eq!(parse(b"*-1\r\n").unwrap(), Reply::Array(None));
    }

    #[test]
    fn truncated_bulk_is_an_io_error() {
        assert!(matches!(parse(b"$10\r\nabc"), Err(StoreError::Io(_))));
    }

    #[test]
    fn error_reply_becomes_server_error() {
        let err = Reply::Error("ERR nope".into()).into_unit().unwrap_err();
        assert!(matches!(err, StoreError::Server { .. }));
        assert!(!err.is_connection_error());
    }

    #[test]
    fn score_conversions() {
        assert_eq!(Reply::Bulk(Some(b"3".to_vec())).into_score().unwrap(), Some(3));
        assert_eq!(Reply::Bulk(Some(b"2.75".to_vec())).into_score().unwrap(), Some(2));
        assert_eq!(Reply::Integer(4).into_score().unwrap(), Some(4));
        assert_eq!(Reply::Bulk(None).into_score().unwrap(), None);
    }

    #[test]
    fn string_list_conversions() {
        let reply = Reply::Array(Some(vec![
            Reply::Bulk(Some(b"x".to_vec())),
            Reply::Bulk(None),
        ]));
        assert_eq!(
            reply.clone().into_optional_strings().unwrap(),
            vec![Some("x".to_string()), None]
        );
        assert!(reply.into_strings().is_err());
    }
}
