//! Decoding of encoded text payloads into raw bytes.
//!
//! The kind of payload is detected from its content, never declared:
//!
//! - `data:[<mime>][;base64],<payload>` is a data URI; the payload is base64 when
//!   the `;base64` flag is present and percent-encoded otherwise
//! - a string made only of base64 alphabet characters (standard or URL-safe), with
//!   a length that is a multiple of four and padding only at the end, is base64
//! - anything else is a raw byte string: characters up to U+00FF map to one byte
//!   each, strings with wider characters are taken as UTF-8
//!
//! A short plain string such as `"abcd"` is also valid base64 and is decoded as
//! such; wrap it in a data URI to force a different reading.

use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE};

use crate::error::DecodeError;

/// Detected kind of a text payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextKind {
    /// `data:` URI.
    DataUri {
        /// Whether the payload is flagged `;base64`.
        base64: bool,
    },
    /// Bare base64.
    Base64,
    /// Raw byte string.
    RawBytes,
}

fn is_base64_shaped(text: &str) -> bool {
    if text.is_empty() || text.len() % 4 != 0 {
        return false;
    }
    let body = text.trim_end_matches('=');
    if text.len() - body.len() > 2 {
        return false;
    }
    body.bytes()
        .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'+' | b'/' | b'-' | b'_'))
}

/// Detects what kind of payload `text` is.
pub fn classify_text(text: &str) -> TextKind {
    let trimmed = text.trim();
    if let Some(rest) = strip_prefix_ignore_case(trimmed, "data:") {
        if let Some((meta, _)) = rest.split_once(',') {
            let base64 = meta
                .split(';')
                .any(|part| part.trim().eq_ignore_ascii_case("base64"));
            return TextKind::DataUri { base64 };
        }
    }
    if is_base64_shaped(trimmed) {
        TextKind::Base64
    } else {
        TextKind::RawBytes
    }
}

fn strip_prefix_ignore_case<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let head = text.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix)
        .then(|| &text[prefix.len()..])
}

fn decode_base64(payload: &str) -> Result<Vec<u8>, base64::DecodeError> {
    if payload.contains(['-', '_']) {
        URL_SAFE.decode(payload)
    } else {
        STANDARD.decode(payload)
    }
}

/// Maps a raw byte string to bytes.
pub fn raw_byte_string(text: &str) -> Vec<u8> {
    if text.chars().all(|c| (c as u32) <= 0xFF) {
        text.chars().map(|c| c as u32 as u8).collect()
    } else {
        text.as_bytes().to_vec()
    }
}

/// Decodes a text payload into bytes.
///
/// # Errors
/// [`DecodeError::InvalidPayload`] when a data URI flagged `;base64` carries an
/// invalid base64 payload, or the URI has no `,` separator.
pub fn decode_text(text: &str) -> Result<Vec<u8>, DecodeError> {
    let kind = classify_text(text);
    tracing::trace!(?kind, len = text.len(), "decoding text payload");

    let trimmed = text.trim();
    match kind {
        TextKind::DataUri { base64 } => {
            let (_, payload) = trimmed
                .split_once(',')
                .ok_or_else(|| DecodeError::invalid_payload("data URI", "missing ','"))?;
            if base64 {
                decode_base64(payload.trim())
                    .map_err(|e| DecodeError::invalid_payload("data URI", e.to_string()))
            } else {
                Ok(urlencoding::decode_binary(payload.as_bytes()).into_owned())
            }
        }
        TextKind::Base64 => match decode_base64(trimmed) {
            Ok(bytes) => Ok(bytes),
            Err(e) => {
                tracing::debug!(error = %e, "base64-shaped text failed to decode, reading raw bytes");
                Ok(raw_byte_string(text))
            }
        },
        TextKind::RawBytes => Ok(raw_byte_string(text)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_uri_base64() {
        // [0, 255, 0, 255]
        let uri = "data:application/octet-stream;base64,AP8A/w==";
        assert_eq!(classify_text(uri), TextKind::DataUri { base64: true });
        assert_eq!(decode_text(uri).unwrap(), vec![0, 255, 0, 255]);
    }

    #[test]
    fn test_data_uri_percent_encoded() {
        let uri = "DATA:,%00%FFab%zz";
        assert_eq!(classify_text(uri), TextKind::DataUri { base64: false });
        assert_eq!(
            decode_text(uri).unwrap(),
            vec![0x00, 0xFF, b'a', b'b', b'%', b'z', b'z']
        );
    }

    #[test]
    fn test_bare_base64() {
        assert_eq!(classify_text("AAAAAAAAgD8="), TextKind::Base64);
        let bytes = decode_text("AAAAAAAAgD8=").unwrap();
        assert_eq!(bytes, [0.0f32.to_le_bytes(), 1.0f32.to_le_bytes()].concat());
    }

    #[test]
    fn test_url_safe_base64() {
        assert_eq!(decode_text("-_8=").unwrap(), vec![0xFB, 0xFF]);
    }

    #[test]
    fn test_raw_byte_string() {
        assert_eq!(classify_text("\u{0}\u{ff}!"), TextKind::RawBytes);
        assert_eq!(decode_text("\u{0}\u{ff}!").unwrap(), vec![0x00, 0xFF, b'!']);
        assert_eq!(decode_text("é€").unwrap(), "é€".as_bytes().to_vec());
    }

    #[test]
    fn test_invalid_data_uri_payload() {
        let err = decode_text("data:;base64,@@@@").unwrap_err();
        assert!(matches!(
            err,
            DecodeError::InvalidPayload {
                kind: "data URI",
                ..
            }
        ));
    }
}
