//! Nanochat wire format.
//!
//! Requests are single ASCII lines terminated by `\n`. Replies are not
//! self-describing: the caller picks the decoder that matches the request it
//! just wrote, and each decoder consumes exactly the lines that reply shape
//! occupies on the stream.

use std::fmt;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;

use crate::error::{ClientError, FramingError, ResponseError};

const LINE_ENDINGS: &[char] = &['\n', '\r'];

/// Upper bound on the up-front allocation for a list reply; the count comes from the server.
const MAX_PREALLOCATED_MESSAGES: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Send(String),
    Hist,
    Last(u64),
    Poll(u64),
    Skip(u64),
    Stat,
    Quit,
}

impl Request {
    /// Builds the `SEND` request, prefixing the payload with `"<username>: "`
    /// when a username is configured.
    pub fn send_as(username: &str, text: &str) -> Self {
        if username.is_empty() {
            Request::Send(text.to_string())
        } else {
            Request::Send(format!("{username}: {text}"))
        }
    }

    /// How the server answers this request; `None` for `QUIT`.
    pub fn reply_shape(&self) -> Option<ReplyShape> {
        match self {
            Request::Send(_) | Request::Poll(_) => Some(ReplyShape::Ack),
            Request::Hist | Request::Last(_) => Some(ReplyShape::List),
            Request::Skip(_) => Some(ReplyShape::Skip),
            Request::Stat => Some(ReplyShape::Stat),
            Request::Quit => None,
        }
    }

    /// The full wire line, newline included.
    ///
    /// `SKIP` is terminated like every other verb.
    pub fn encode(&self) -> String {
        format!("{self}\n")
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Request::Send(text) => write!(f, "SEND {text}"),
            Request::Hist => f.write_str("HIST"),
            Request::Last(n) => write!(f, "LAST {n}"),
            Request::Poll(n) => write!(f, "POLL {n}"),
            Request::Skip(n) => write!(f, "SKIP {n}"),
            Request::Stat => f.write_str("STAT"),
            Request::Quit => f.write_str("QUIT"),
        }
    }
}

/// Parses the numeric argument of `last`, `poll` and `skip`.
pub fn parse_count(input: &str) -> Result<u64, ClientError> {
    input.parse().map_err(|source| ClientError::Parse {
        input: input.to_string(),
        source,
    })
}

pub async fn write_request<W>(writer: &mut W, request: &Request) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    debug!(line = %request, "sending request");
    writer.write_all(request.encode().as_bytes()).await?;
    writer.flush().await
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyShape {
    Ack,
    List,
    Skip,
    Stat,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Ack(String),
    List(MessageList),
    Skip(SkipReply),
    Stat(StatReply),
}

/// Reads exactly one reply of the given shape.
pub async fn read_reply<R>(reader: &mut R, shape: ReplyShape) -> Result<Reply, ResponseError>
where
    R: AsyncBufRead + Unpin,
{
    let reply = match shape {
        ReplyShape::Ack => Reply::Ack(read_ack(reader).await?),
        ReplyShape::List => Reply::List(read_message_list(reader).await?),
        ReplyShape::Skip => Reply::Skip(read_skip(reader).await?),
        ReplyShape::Stat => Reply::Stat(read_stat(reader).await?),
    };
    Ok(reply)
}

/// Messages returned by `HIST`/`LAST` plus the server log position after the last one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageList {
    pub messages: Vec<String>,
    pub index: i64,
}

/// The two rendered lines of a `SKIP` reply: wire lines two and four.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkipReply {
    pub first: String,
    pub second: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatReply(pub [String; 3]);

impl fmt::Display for StatReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c] = &self.0;
        write!(f, "{a}, {b}, {c}")
    }
}

/// One-line acknowledgement for `SEND` and `POLL`.
pub async fn read_ack<R>(reader: &mut R) -> Result<String, ResponseError>
where
    R: AsyncBufRead + Unpin,
{
    require_line(reader).await
}

pub async fn read_message_list<R>(reader: &mut R) -> Result<MessageList, ResponseError>
where
    R: AsyncBufRead + Unpin,
{
    let header = require_line(reader).await?;
    let count: usize = parse_integer(&header)?;

    let mut messages = Vec::with_capacity(count.min(MAX_PREALLOCATED_MESSAGES));
    for received in 0..count {
        match read_line(reader).await? {
            Some(line) => messages.push(line.trim().to_string()),
            None => {
                return Err(FramingError::Truncated {
                    expected: count,
                    received,
                }
                .into())
            }
        }
    }

    let trailer = require_line(reader).await?;
    let index = parse_integer(&trailer)?;

    Ok(MessageList { messages, index })
}

/// Consumes all four lines of a `SKIP` reply; the first and third are dropped.
pub async fn read_skip<R>(reader: &mut R) -> Result<SkipReply, ResponseError>
where
    R: AsyncBufRead + Unpin,
{
    let _ = require_line(reader).await?;
    let first = require_line(reader).await?;
    let _ = require_line(reader).await?;
    let second = require_line(reader).await?;
    Ok(SkipReply { first, second })
}

pub async fn read_stat<R>(reader: &mut R) -> Result<StatReply, ResponseError>
where
    R: AsyncBufRead + Unpin,
{
    let a = require_line(reader).await?;
    let b = require_line(reader).await?;
    let c = require_line(reader).await?;
    Ok(StatReply([a, b, c]))
}

async fn read_line<R>(reader: &mut R) -> std::io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    let mut bytes = Vec::new();
    if reader.read_until(b'\n', &mut bytes).await? == 0 {
        return Ok(None);
    }
    // Lines are opaque text; bytes that are not UTF-8 are replaced, not rejected.
    let line = String::from_utf8_lossy(&bytes)
        .trim_end_matches(LINE_ENDINGS)
        .to_string();
    debug!(%line, "received line");
    Ok(Some(line))
}

async fn require_line<R>(reader: &mut R) -> Result<String, ResponseError>
where
    R: AsyncBufRead + Unpin,
{
    read_line(reader)
        .await?
        .ok_or_else(|| FramingError::Closed.into())
}

fn parse_integer<T>(line: &str) -> Result<T, FramingError>
where
    T: std::str::FromStr<Err = std::num::ParseIntError>,
{
    line.trim()
        .parse()
        .map_err(|source| FramingError::InvalidInteger {
            line: line.to_string(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_requests_encode_with_newline() {
        assert_eq!(Request::Last(3).encode(), "LAST 3\n");
        assert_eq!(Request::Poll(0).encode(), "POLL 0\n");
        assert_eq!(Request::Skip(42).encode(), "SKIP 42\n");
        assert_eq!(Request::Hist.encode(), "HIST\n");
        assert_eq!(Request::Stat.encode(), "STAT\n");
        assert_eq!(Request::Quit.encode(), "QUIT\n");
    }

    #[test]
    fn reply_shape_follows_request() {
        assert_eq!(Request::Send("x".into()).reply_shape(), Some(ReplyShape::Ack));
        assert_eq!(Request::Poll(1).reply_shape(), Some(ReplyShape::Ack));
        assert_eq!(Request::Hist.reply_shape(), Some(ReplyShape::List));
        assert_eq!(Request::Last(1).reply_shape(), Some(ReplyShape::List));
        assert_eq!(Request::Skip(1).reply_shape(), Some(ReplyShape::Skip));
        assert_eq!(Request::Stat.reply_shape(), Some(ReplyShape::Stat));
        assert_eq!(Request::Quit.reply_shape(), None);
    }

    #[test]
    fn send_prefixes_username_only_when_set() {
        assert_eq!(
            Request::send_as("alice", "hello").encode(),
            "SEND alice: hello\n"
        );
        assert_eq!(Request::send_as("", "hello").encode(), "SEND hello\n");
    }

    #[test]
    fn parse_count_rejects_non_integers() {
        assert_eq!(parse_count("17").expect("valid count"), 17);
        assert!(matches!(parse_count("abc"), Err(ClientError::Parse { .. })));
        assert!(matches!(parse_count("-1"), Err(ClientError::Parse { .. })));
        assert!(matches!(parse_count("1.5"), Err(ClientError::Parse { .. })));
    }

    #[tokio::test]
    async fn decodes_list_reply() {
        let mut reader: &[u8] = b"3\na\n  b \nc\n7\n";
        let list = read_message_list(&mut reader).await.expect("list reply");
        assert_eq!(
            list,
            MessageList {
                messages: vec!["a".into(), "b".into(), "c".into()],
                index: 7,
            }
        );
    }

    #[tokio::test]
    async fn list_reply_accepts_crlf_and_empty_lists() {
        let mut reader: &[u8] = b"0\r\n12\r\n";
        let list = read_message_list(&mut reader).await.expect("empty list");
        assert!(list.messages.is_empty());
        assert_eq!(list.index, 12);
    }

    #[tokio::test]
    async fn truncated_list_reply_is_a_framing_error() {
        let mut reader: &[u8] = b"5\na\nb\n";
        let err = read_message_list(&mut reader).await.unwrap_err();
        assert!(matches!(
            err,
            ResponseError::Framing(FramingError::Truncated {
                expected: 5,
                received: 2
            })
        ));
    }

    #[tokio::test]
    async fn non_integer_header_is_a_framing_error() {
        let mut reader: &[u8] = b"many\na\n";
        let err = read_message_list(&mut reader).await.unwrap_err();
        assert!(matches!(
            err,
            ResponseError::Framing(FramingError::InvalidInteger { .. })
        ));
    }

    #[tokio::test]
    async fn non_integer_trailer_is_a_framing_error() {
        let mut reader: &[u8] = b"1\na\nend\n";
        let err = read_message_list(&mut reader).await.unwrap_err();
        assert!(matches!(
            err,
            ResponseError::Framing(FramingError::InvalidInteger { line, .. }) if line == "end"
        ));
    }

    #[tokio::test]
    async fn decoders_leave_following_lines_unread() {
        let mut reader: &[u8] = b"OK\nnext\n";
        assert_eq!(read_ack(&mut reader).await.expect("ack"), "OK");
        assert_eq!(read_ack(&mut reader).await.expect("second ack"), "next");
        assert!(matches!(
            read_ack(&mut reader).await,
            Err(ResponseError::Framing(FramingError::Closed))
        ));
    }

    #[tokio::test]
    async fn non_utf8_reply_line_is_decoded_lossily() {
        let mut reader: &[u8] = b"caf\xe9\nOK\n";
        assert_eq!(read_ack(&mut reader).await.expect("ack"), "caf\u{fffd}");
        assert_eq!(read_ack(&mut reader).await.expect("next ack"), "OK");
    }

    #[tokio::test]
    async fn skip_reply_keeps_second_and_fourth_lines() {
        let mut reader: &[u8] = b"one\ntwo\nthree\nfour\nfive\n";
        let reply = read_skip(&mut reader).await.expect("skip reply");
        assert_eq!(
            reply,
            SkipReply {
                first: "two".into(),
                second: "four".into(),
            }
        );
        assert_eq!(read_ack(&mut reader).await.expect("rest"), "five");
    }

    #[tokio::test]
    async fn read_reply_dispatches_on_shape() {
        let mut reader: &[u8] = b"2\nx\ny\n4\nOK\n";
        let list = read_reply(&mut reader, ReplyShape::List).await.expect("list");
        assert!(matches!(list, Reply::List(MessageList { index: 4, .. })));
        let ack = read_reply(&mut reader, ReplyShape::Ack).await.expect("ack");
        assert_eq!(ack, Reply::Ack("OK".into()));
    }

    #[tokio::test]
    async fn stat_reply_renders_comma_joined() {
        let mut reader: &[u8] = b"10\n3\n7\n";
        let reply = read_stat(&mut reader).await.expect("stat reply");
        assert_eq!(reply.to_string(), "10, 3, 7");
    }

    #[tokio::test]
    async fn write_request_flushes_one_line() {
        let (mut writer, reader) = tokio::io::duplex(64);
        let mut reader = tokio::io::BufReader::new(reader);

        write_request(&mut writer, &Request::Poll(9))
            .await
            .expect("write request");
        let line = read_ack(&mut reader).await.expect("read back");

        assert_eq!(line, "POLL 9");
    }
}
