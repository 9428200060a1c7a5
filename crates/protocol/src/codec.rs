use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::ProtocolError;
use crate::message::Message;

/// Serialize a message to its wire form: one JSON object, newline
/// terminated. Encode failures are surfaced to the caller (§4.2).
pub fn encode(msg: &Message) -> Result<Vec<u8>, ProtocolError> {
    let mut bytes = serde_json::to_vec(msg).map_err(ProtocolError::Encode)?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Parse one line (without its trailing newline) into a message.
pub fn decode(line: &str) -> Result<Message, ProtocolError> {
    serde_json::from_str(line).map_err(ProtocolError::Decode)
}

pub async fn write_message<W: AsyncWrite + Unpin>(
    writer: &mut W,
    msg: &Message,
) -> Result<(), ProtocolError> {
    let bytes = encode(msg)?;
    writer.write_all(&bytes).await?;
    writer.flush().await?;
    Ok(())
}

/// Outcome of one `read_message` call. A frame that fails to decode is
/// `Skipped`, never propagated as an error — per §4.2 and §7, a decode
/// failure on a single frame must not kill the connection.
#[derive(Debug)]
pub enum ReadOutcome {
    /// The peer closed the connection (0-byte read).
    Eof,
    /// A frame was read but dropped: either blank or undecodable.
    Skipped,
    Message(Message),
}

/// Read one newline-delimited frame. Does not apply a read deadline
/// itself — callers that need the short-deadline polling discipline of
/// §4.1/§4.4/§4.5 wrap this call in `tokio::time::timeout` and treat
/// `Elapsed` as "continue", not as an error.
pub async fn read_message<R: AsyncBufRead + Unpin>(
    reader: &mut R,
) -> Result<ReadOutcome, ProtocolError> {
    let mut line = String::new();
    let n = reader.read_line(&mut line).await?;
    if n == 0 {
        return Ok(ReadOutcome::Eof);
    }
    let trimmed = line.trim_end_matches(['\n', '\r']);
    if trimmed.is_empty() {
        return Ok(ReadOutcome::Skipped);
    }
    match decode(trimmed) {
        Ok(msg) => Ok(ReadOutcome::Message(msg)),
        Err(e) => {
            tracing::warn!(error = %e, "dropping undecodable frame");
            Ok(ReadOutcome::Skipped)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{ErrorPayload, Handshake};
    use std::io::Cursor;

    #[test]
    fn encode_has_single_trailing_newline() {
        let msg = Message::ping();
        let bytes = encode(&msg).unwrap();
        assert_eq!(bytes.iter().filter(|&&b| b == b'\n').count(), 1);
        assert_eq!(*bytes.last().unwrap(), b'\n');
    }

    #[test]
    fn encode_decode_roundtrip() {
        let msg = Message::handshake(Handshake {
            build_hash: "abcdef".into(),
            version: "0.1.0".into(),
        })
        .unwrap();
        let bytes = encode(&msg).unwrap();
        let line = std::str::from_utf8(&bytes).unwrap().trim_end();
        let decoded = decode(line).unwrap();
        assert_eq!(decoded.message_type, msg.message_type);
        let original: Handshake = msg.payload_as().unwrap();
        let roundtripped: Handshake = decoded.payload_as().unwrap();
        assert_eq!(original, roundtripped);
    }

    #[tokio::test]
    async fn read_message_reports_eof_on_empty_stream() {
        let mut cursor = Cursor::new(Vec::<u8>::new());
        let outcome = read_message(&mut cursor).await.unwrap();
        assert!(matches!(outcome, ReadOutcome::Eof));
    }

    #[tokio::test]
    async fn read_message_skips_undecodable_frame_without_erroring() {
        let mut input = b"not json at all\n".to_vec();
        let good = encode(&Message::ping()).unwrap();
        input.extend_from_slice(&good);
        let mut cursor = Cursor::new(input);

        let first = read_message(&mut cursor).await.unwrap();
        assert!(matches!(first, ReadOutcome::Skipped));
        let second = read_message(&mut cursor).await.unwrap();
        assert!(matches!(second, ReadOutcome::Message(_)));
    }

    #[test]
    fn error_payload_roundtrips_without_code() {
        let msg = Message::error(ErrorPayload { message: "oops".into(), code: None }).unwrap();
        let bytes = encode(&msg).unwrap();
        let line = std::str::from_utf8(&bytes).unwrap().trim_end();
        let decoded = decode(line).unwrap();
        let payload: ErrorPayload = decoded.payload_as().unwrap();
        assert_eq!(payload.message, "oops");
        assert!(payload.code.is_none());
    }
}
