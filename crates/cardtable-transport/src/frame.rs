//! Length-prefixed frame codec.
//!
//! Every message on the wire is one frame: the payload length in ASCII
//! decimal, a `:` delimiter, then exactly that many payload bytes.
//!
//! ```text
//! 11:hello world
//! ```
//!
//! The decoder is incremental: the prefix, the delimiter, and the payload
//! may each arrive split across any number of reads, and the codec buffers
//! partial frames in the `BytesMut` it is handed until a frame completes.
//! Payload bytes are never inspected; interpreting them is the protocol
//! layer's job.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::TransportError;

/// Upper bound on the number of digits in a length prefix. A frame whose
/// first `MAX_LENGTH_DIGITS` bytes contain no `:` is malformed.
pub const MAX_LENGTH_DIGITS: usize = 10;

/// Default cap on a single frame's payload size (1 MiB).
pub const DEFAULT_MAX_FRAME_LEN: usize = 1024 * 1024;

/// Codec for `<decimal-length>:<payload>` frames.
///
/// One instance per connection: it carries the parse state for the frame
/// currently in flight (`pending` holds the declared payload length once
/// the prefix has been consumed).
#[derive(Debug)]
pub struct FrameCodec {
    max_frame_len: usize,
    pending: Option<usize>,
}

impl FrameCodec {
    /// Creates a codec with the default payload cap.
    pub fn new() -> Self {
        Self::with_max_frame_len(DEFAULT_MAX_FRAME_LEN)
    }

    /// Creates a codec that rejects payloads larger than `max_frame_len`.
    pub fn with_max_frame_len(max_frame_len: usize) -> Self {
        Self {
            max_frame_len,
            pending: None,
        }
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for FrameCodec {
    type Item = BytesMut;
    type Error = TransportError;

    fn decode(
        &mut self,
        src: &mut BytesMut,
    ) -> Result<Option<BytesMut>, TransportError> {
        let declared = match self.pending {
            Some(len) => len,
            None => match src.iter().position(|&b| b == b':') {
                Some(at) => {
                    if at == 0 {
                        return Err(TransportError::MalformedFrame(
                            "empty length prefix".into(),
                        ));
                    }
                    if at > MAX_LENGTH_DIGITS {
                        return Err(TransportError::MalformedFrame(format!(
                            "length prefix of {at} bytes exceeds {MAX_LENGTH_DIGITS} digits"
                        )));
                    }
                    if !src[..at].iter().all(u8::is_ascii_digit) {
                        return Err(TransportError::MalformedFrame(
                            "non-digit byte in length prefix".into(),
                        ));
                    }
                    let len = std::str::from_utf8(&src[..at])
                        .ok()
                        .and_then(|s| s.parse::<u64>().ok())
                        .ok_or_else(|| {
                            TransportError::MalformedFrame(
                                "unparseable length prefix".into(),
                            )
                        })?;
                    if len > self.max_frame_len as u64 {
                        return Err(TransportError::FrameTooLarge {
                            len: len as usize,
                            max: self.max_frame_len,
                        });
                    }
                    src.advance(at + 1);
                    let len = len as usize;
                    self.pending = Some(len);
                    len
                }
                None => {
                    // Still waiting for the delimiter. Fail fast if what
                    // has arrived already cannot be a valid prefix.
                    if src.len() > MAX_LENGTH_DIGITS {
                        return Err(TransportError::MalformedFrame(format!(
                            "no delimiter within the first {MAX_LENGTH_DIGITS} bytes"
                        )));
                    }
                    if !src.iter().all(u8::is_ascii_digit) {
                        return Err(TransportError::MalformedFrame(
                            "non-digit byte in length prefix".into(),
                        ));
                    }
                    return Ok(None);
                }
            },
        };

        if src.len() < declared {
            // Partial payload: reserve what's missing and wait for more reads.
            src.reserve(declared - src.len());
            return Ok(None);
        }

        self.pending = None;
        Ok(Some(src.split_to(declared)))
    }

    fn decode_eof(
        &mut self,
        src: &mut BytesMut,
    ) -> Result<Option<BytesMut>, TransportError> {
        match self.decode(src)? {
            Some(frame) => Ok(Some(frame)),
            None => {
                if src.is_empty() && self.pending.is_none() {
                    Ok(None)
                } else {
                    Err(TransportError::TruncatedFrame {
                        want: self.pending.unwrap_or(0),
                        got: src.len(),
                    })
                }
            }
        }
    }
}

impl Encoder<Bytes> for FrameCodec {
    type Error = TransportError;

    fn encode(
        &mut self,
        payload: Bytes,
        dst: &mut BytesMut,
    ) -> Result<(), TransportError> {
        if payload.len() > self.max_frame_len {
            return Err(TransportError::FrameTooLarge {
                len: payload.len(),
                max: self.max_frame_len,
            });
        }
        let prefix = payload.len().to_string();
        dst.reserve(prefix.len() + 1 + payload.len());
        dst.extend_from_slice(prefix.as_bytes());
        dst.put_u8(b':');
        dst.extend_from_slice(&payload);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(payload: &[u8]) -> BytesMut {
        let mut codec = FrameCodec::new();
        let mut out = BytesMut::new();
        codec
            .encode(Bytes::copy_from_slice(payload), &mut out)
            .unwrap();
        out
    }

    #[test]
    fn test_encode_prefixes_length_and_delimiter() {
        assert_eq!(&encode(b"hello world")[..], b"11:hello world");
        assert_eq!(&encode(b"")[..], b"0:");
    }

    #[test]
    fn test_decode_single_complete_frame() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::from(&b"5:abcde"[..]);
        let frame = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(&frame[..], b"abcde");
        assert!(buf.is_empty());
    }

    #[test]
    fn test_decode_back_to_back_frames() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::from(&b"3:one3:two"[..]);
        assert_eq!(&codec.decode(&mut buf).unwrap().unwrap()[..], b"one");
        assert_eq!(&codec.decode(&mut buf).unwrap().unwrap()[..], b"two");
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    /// Feeds one frame to the codec in every possible two-way split and
    /// byte-by-byte, checking the decoded payload is identical each time.
    #[test]
    fn test_decode_across_arbitrary_read_boundaries() {
        let wire = b"12:split me up!";
        let expect = b"split me up!";

        // Whole frame in one read.
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::from(&wire[..]);
        assert_eq!(&codec.decode(&mut buf).unwrap().unwrap()[..], expect);

        // Every two-way split, including inside the prefix and delimiter.
        for cut in 1..wire.len() {
            let mut codec = FrameCodec::new();
            let mut buf = BytesMut::from(&wire[..cut]);
            assert!(
                codec.decode(&mut buf).unwrap().is_none(),
                "cut at {cut} should not yield a frame yet"
            );
            buf.extend_from_slice(&wire[cut..]);
            assert_eq!(&codec.decode(&mut buf).unwrap().unwrap()[..], expect);
        }

        // One byte per read.
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::new();
        let mut got = None;
        for &b in wire.iter() {
            buf.extend_from_slice(&[b]);
            if let Some(frame) = codec.decode(&mut buf).unwrap() {
                got = Some(frame);
            }
        }
        assert_eq!(&got.expect("frame after final byte")[..], expect);
    }

    #[test]
    fn test_decode_missing_delimiter_is_malformed() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::from(&b"12345678901"[..]);
        assert!(matches!(
            codec.decode(&mut buf),
            Err(TransportError::MalformedFrame(_))
        ));
    }

    #[test]
    fn test_decode_non_digit_prefix_is_malformed() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::from(&b"5x:abcde"[..]);
        assert!(matches!(
            codec.decode(&mut buf),
            Err(TransportError::MalformedFrame(_))
        ));
    }

    #[test]
    fn test_decode_empty_prefix_is_malformed() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::from(&b":abc"[..]);
        assert!(matches!(
            codec.decode(&mut buf),
            Err(TransportError::MalformedFrame(_))
        ));
    }

    #[test]
    fn test_decode_oversized_declaration_rejected() {
        let mut codec = FrameCodec::with_max_frame_len(16);
        let mut buf = BytesMut::from(&b"17:"[..]);
        assert!(matches!(
            codec.decode(&mut buf),
            Err(TransportError::FrameTooLarge { len: 17, max: 16 })
        ));
    }

    #[test]
    fn test_eof_mid_payload_is_truncated() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::from(&b"10:only4"[..]);
        assert!(codec.decode(&mut buf).unwrap().is_none());
        assert!(matches!(
            codec.decode_eof(&mut buf),
            Err(TransportError::TruncatedFrame { want: 10, got: 5 })
        ));
    }

    #[test]
    fn test_eof_mid_prefix_is_truncated() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::from(&b"12"[..]);
        assert!(codec.decode(&mut buf).unwrap().is_none());
        assert!(matches!(
            codec.decode_eof(&mut buf),
            Err(TransportError::TruncatedFrame { .. })
        ));
    }

    #[test]
    fn test_eof_on_clean_boundary_is_not_an_error() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::from(&b"2:ok"[..]);
        assert_eq!(&codec.decode_eof(&mut buf).unwrap().unwrap()[..], b"ok");
        assert!(codec.decode_eof(&mut buf).unwrap().is_none());
    }

    #[test]
    fn test_encode_oversized_payload_rejected() {
        let mut codec = FrameCodec::with_max_frame_len(4);
        let mut out = BytesMut::new();
        assert!(matches!(
            codec.encode(Bytes::from_static(b"12345"), &mut out),
            Err(TransportError::FrameTooLarge { len: 5, max: 4 })
        ));
    }

    #[test]
    fn test_payload_bytes_are_opaque() {
        // A payload containing digits, colons, and partial prefixes of its
        // own must pass through untouched.
        let mut codec = FrameCodec::new();
        let mut buf = encode(b"7:nested 0: :::");
        let frame = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(&frame[..], b"7:nested 0: :::");
    }
}
