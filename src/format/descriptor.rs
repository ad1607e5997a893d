//! Format descriptors and their string grammar.
//!
//! A descriptor string is a loose bag of case-insensitive tokens in any order,
//! separated by whitespace, commas or slashes:
//!
//! ```rust
//! use audio_buffer_from::{ChannelLayout, FormatDescriptor, SampleEncoding};
//!
//! let format = FormatDescriptor::parse_lenient("int16 le interleaved stereo 48000");
//! assert_eq!(format.encoding, Some(SampleEncoding::Int16));
//! assert_eq!(format.layout, Some(ChannelLayout::Interleaved));
//! assert_eq!(format.channels, Some(2));
//! assert_eq!(format.sample_rate, Some(48000));
//! ```
//!
//! Recognised tokens:
//! - encodings: `int8 uint8 int16 uint16 int24 uint24 int32 uint32 float32 float64`,
//!   short forms (`i16`, `u8`, `f32`, `s16le`, ...), `float` and `double`
//! - layouts: `interleaved`, `planar` / `non-interleaved`
//! - channel names: `mono`, `stereo`, `2.1`, `quad`, `5.0`, `5.1`, `7.1`, `<n>ch`,
//!   `<n>-channel`
//! - endianness: `le`, `be`
//! - sample rates: a bare integer, `<n>hz`, `<n>khz`

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::ChannelLayout;
use crate::error::StrictError;
use crate::traits::unsigned_to_unit;

/// Numeric encoding of a single PCM element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleEncoding {
    /// Signed 8-bit integer.
    Int8,
    /// Unsigned 8-bit integer, midpoint 128.
    Uint8,
    /// Signed 16-bit integer.
    Int16,
    /// Unsigned 16-bit integer.
    Uint16,
    /// Signed 24-bit integer, packed in 3 bytes.
    Int24,
    /// Unsigned 24-bit integer, packed in 3 bytes.
    Uint24,
    /// Signed 32-bit integer.
    Int32,
    /// Unsigned 32-bit integer.
    Uint32,
    /// IEEE 754 single precision.
    Float32,
    /// IEEE 754 double precision.
    Float64,
}

impl SampleEncoding {
    /// Size of one element in bytes.
    pub const fn element_size(&self) -> usize {
        match self {
            Self::Int8 | Self::Uint8 => 1,
            Self::Int16 | Self::Uint16 => 2,
            Self::Int24 | Self::Uint24 => 3,
            Self::Int32 | Self::Uint32 | Self::Float32 => 4,
            Self::Float64 => 8,
        }
    }

    /// Bit depth.
    pub const fn bits(&self) -> u32 {
        self.element_size() as u32 * 8
    }

    /// True for floating point encodings.
    pub const fn is_float(&self) -> bool {
        matches!(self, Self::Float32 | Self::Float64)
    }

    /// True for signed integer encodings.
    pub const fn is_signed_int(&self) -> bool {
        matches!(self, Self::Int8 | Self::Int16 | Self::Int24 | Self::Int32)
    }

    /// Canonical lowercase name.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Int8 => "int8",
            Self::Uint8 => "uint8",
            Self::Int16 => "int16",
            Self::Uint16 => "uint16",
            Self::Int24 => "int24",
            Self::Uint24 => "uint24",
            Self::Int32 => "int32",
            Self::Uint32 => "uint32",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
        }
    }

    /// Scales a number expressed in this encoding's units to a unit-range float.
    ///
    /// `scale_value(255.0)` on `Uint8` is `1.0`; on `Float32` it stays `255.0`.
    pub fn scale_value(&self, value: f64) -> f32 {
        if self.is_float() {
            return value as f32;
        }
        let bits = self.bits() as i32;
        if self.is_signed_int() {
            let neg = 2f64.powi(bits - 1);
            if value < 0.0 {
                (value / neg) as f32
            } else {
                (value / (neg - 1.0)) as f32
            }
        } else {
            unsigned_to_unit(value, 2f64.powi(bits) - 1.0)
        }
    }

    fn from_name(token: &str) -> Option<Self> {
        let encoding = match token {
            "int8" | "i8" | "s8" => Self::Int8,
            "uint8" | "u8" => Self::Uint8,
            "int16" | "i16" | "s16" => Self::Int16,
            "uint16" | "u16" => Self::Uint16,
            "int24" | "i24" | "s24" => Self::Int24,
            "uint24" | "u24" => Self::Uint24,
            "int32" | "i32" | "s32" => Self::Int32,
            "uint32" | "u32" => Self::Uint32,
            "float32" | "f32" | "float" => Self::Float32,
            "float64" | "f64" | "double" => Self::Float64,
            _ => return None,
        };
        Some(encoding)
    }
}

impl fmt::Display for SampleEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Byte order of multi-byte elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Endianness {
    /// Least significant byte first.
    #[default]
    Little,
    /// Most significant byte first.
    Big,
}

impl Endianness {
    /// Byte order of the running target.
    pub const fn native() -> Self {
        if cfg!(target_endian = "big") {
            Self::Big
        } else {
            Self::Little
        }
    }
}

/// Structured description of a raw sample encoding.
///
/// Every field is optional; whatever the descriptor leaves open is filled by
/// option resolution or structural detection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FormatDescriptor {
    /// Element encoding.
    #[serde(alias = "dtype")]
    pub encoding: Option<SampleEncoding>,
    /// Channel count.
    #[serde(alias = "numberOfChannels", alias = "channelCount")]
    pub channels: Option<usize>,
    /// Sample rate in Hz.
    #[serde(alias = "rate")]
    pub sample_rate: Option<u32>,
    /// Interleaved or planar.
    #[serde(alias = "interleaved", deserialize_with = "layout_or_flag")]
    pub layout: Option<ChannelLayout>,
    /// Byte order.
    pub endianness: Option<Endianness>,
}

/// Accepts either a layout name or the boolean `interleaved` flag.
fn layout_or_flag<'de, D>(deserializer: D) -> Result<Option<ChannelLayout>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum LayoutRepr {
        Flag(bool),
        Named(ChannelLayout),
    }

    Ok(
        Option::<LayoutRepr>::deserialize(deserializer)?.map(|repr| match repr {
            LayoutRepr::Flag(true) => ChannelLayout::Interleaved,
            LayoutRepr::Flag(false) => ChannelLayout::Planar,
            LayoutRepr::Named(layout) => layout,
        }),
    )
}

/// One recognised token.
enum Token {
    Encoding(SampleEncoding, Option<Endianness>),
    Endianness(Endianness),
    Layout(ChannelLayout),
    Channels(usize),
    SampleRate(u32),
}

fn named_channels(token: &str) -> Option<usize> {
    let channels = match token {
        "mono" => 1,
        "stereo" => 2,
        "2.1" => 3,
        "quad" | "4.0" => 4,
        "5.0" => 5,
        "5.1" => 6,
        "7.1" => 8,
        _ => {
            let count = token
                .strip_suffix("channels")
                .or_else(|| token.strip_suffix("channel"))
                .or_else(|| token.strip_suffix("ch"))?;
            let count = count.strip_suffix('-').unwrap_or(count);
            return count.parse::<usize>().ok().filter(|&n| n > 0);
        }
    };
    Some(channels)
}

fn sample_rate(token: &str) -> Option<u32> {
    if let Some(khz) = token.strip_suffix("khz") {
        let rate = (khz.parse::<f64>().ok()? * 1000.0).round();
        return (rate >= 1.0 && rate <= u32::MAX as f64).then_some(rate as u32);
    }
    let hz = token.strip_suffix("hz").unwrap_or(token);
    hz.parse::<u32>().ok().filter(|&rate| rate > 0)
}

fn classify_token(token: &str) -> Option<Token> {
    if let Some(encoding) = SampleEncoding::from_name(token) {
        return Some(Token::Encoding(encoding, None));
    }
    for (suffix, endianness) in [("le", Endianness::Little), ("be", Endianness::Big)] {
        if let Some(encoding) = token.strip_suffix(suffix).and_then(SampleEncoding::from_name) {
            return Some(Token::Encoding(encoding, Some(endianness)));
        }
    }
    let token = match token {
        "le" | "little" => Token::Endianness(Endianness::Little),
        "be" | "big" => Token::Endianness(Endianness::Big),
        "interleaved" => Token::Layout(ChannelLayout::Interleaved),
        "planar" | "non-interleaved" | "noninterleaved" => Token::Layout(ChannelLayout::Planar),
        other => {
            if let Some(channels) = named_channels(other) {
                Token::Channels(channels)
            } else {
                Token::SampleRate(sample_rate(other)?)
            }
        }
    };
    Some(token)
}

impl FormatDescriptor {
    /// Parses a descriptor string, returning the descriptor and every token that
    /// was not understood.
    pub fn parse_with_unknown(text: &str) -> (Self, Vec<String>) {
        let mut descriptor = FormatDescriptor::default();
        let mut unknown = Vec::new();

        let tokens = text
            .split(|c: char| c.is_whitespace() || c == ',' || c == '/')
            .filter(|t| !t.is_empty());
        for raw in tokens {
            let token = raw.to_ascii_lowercase();
            match classify_token(&token) {
                Some(Token::Encoding(encoding, endianness)) => {
                    descriptor.encoding = Some(encoding);
                    if endianness.is_some() {
                        descriptor.endianness = endianness;
                    }
                }
                Some(Token::Endianness(endianness)) => descriptor.endianness = Some(endianness),
                Some(Token::Layout(layout)) => descriptor.layout = Some(layout),
                Some(Token::Channels(channels)) => descriptor.channels = Some(channels),
                Some(Token::SampleRate(rate)) => descriptor.sample_rate = Some(rate),
                None => unknown.push(raw.to_string()),
            }
        }
        (descriptor, unknown)
    }

    /// Parses a descriptor string, ignoring tokens it does not understand.
    pub fn parse_lenient(text: &str) -> Self {
        let (descriptor, unknown) = Self::parse_with_unknown(text);
        if !unknown.is_empty() {
            tracing::warn!(format = text, ?unknown, "ignoring unknown format tokens");
        }
        descriptor
    }

    /// Parses a descriptor string, rejecting the first unknown token.
    pub fn parse_strict(text: &str) -> Result<Self, StrictError> {
        let (descriptor, unknown) = Self::parse_with_unknown(text);
        match unknown.into_iter().next() {
            Some(token) => Err(StrictError::UnknownFormatToken(token)),
            None => Ok(descriptor),
        }
    }

    /// Channel count this descriptor implies.
    ///
    /// An explicit count wins; otherwise naming a layout implies stereo, since a
    /// layout is only meaningful for more than one channel.
    pub fn implied_channels(&self) -> Option<usize> {
        self.channels
            .or_else(|| self.layout.map(|_| 2))
            .filter(|&n| n > 0)
    }

    /// Sample rate this descriptor implies.
    pub fn implied_sample_rate(&self) -> Option<u32> {
        self.sample_rate.filter(|&rate| rate > 0)
    }

    /// Fills every field that is still open from `other`.
    pub fn or(self, other: FormatDescriptor) -> FormatDescriptor {
        FormatDescriptor {
            encoding: self.encoding.or(other.encoding),
            channels: self.channels.or(other.channels),
            sample_rate: self.sample_rate.or(other.sample_rate),
            layout: self.layout.or(other.layout),
            endianness: self.endianness.or(other.endianness),
        }
    }
}

impl FromStr for FormatDescriptor {
    type Err = StrictError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_strict(s)
    }
}

impl fmt::Display for FormatDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = Vec::new();
        if let Some(encoding) = self.encoding {
            parts.push(encoding.name().to_string());
        }
        match self.endianness {
            Some(Endianness::Little) => parts.push("le".into()),
            Some(Endianness::Big) => parts.push("be".into()),
            None => {}
        }
        match self.layout {
            Some(ChannelLayout::Interleaved) => parts.push("interleaved".into()),
            Some(ChannelLayout::Planar) => parts.push("planar".into()),
            None => {}
        }
        if let Some(channels) = self.channels {
            parts.push(format!("{channels}ch"));
        }
        if let Some(rate) = self.sample_rate {
            parts.push(rate.to_string());
        }
        f.write_str(&parts.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_descriptor() {
        let format: FormatDescriptor = "uint8 interleaved stereo".parse().unwrap();
        assert_eq!(format.encoding, Some(SampleEncoding::Uint8));
        assert_eq!(format.layout, Some(ChannelLayout::Interleaved));
        assert_eq!(format.channels, Some(2));
        assert_eq!(format.sample_rate, None);
    }

    #[test]
    fn test_bare_number_is_sample_rate() {
        let format = FormatDescriptor::parse_lenient("int8 interleaved 96000");
        assert_eq!(format.encoding, Some(SampleEncoding::Int8));
        assert_eq!(format.sample_rate, Some(96000));
        assert_eq!(format.channels, None);
        assert_eq!(format.implied_channels(), Some(2));
    }

    #[test]
    fn test_rate_units_and_channel_counts() {
        let format = FormatDescriptor::parse_lenient("44.1kHz 6ch");
        assert_eq!(format.sample_rate, Some(44100));
        assert_eq!(format.channels, Some(6));

        assert_eq!(FormatDescriptor::parse_lenient("5.1").channels, Some(6));
        assert_eq!(FormatDescriptor::parse_lenient("3-channel").channels, Some(3));
        assert_eq!(FormatDescriptor::parse_lenient("22050hz").sample_rate, Some(22050));
    }

    #[test]
    fn test_endianness_suffix() {
        let format = FormatDescriptor::parse_lenient("S16BE, mono");
        assert_eq!(format.encoding, Some(SampleEncoding::Int16));
        assert_eq!(format.endianness, Some(Endianness::Big));
        assert_eq!(format.channels, Some(1));
    }

    #[test]
    fn test_unknown_tokens() {
        let (format, unknown) = FormatDescriptor::parse_with_unknown("float32 wobbly planar");
        assert_eq!(format.encoding, Some(SampleEncoding::Float32));
        assert_eq!(format.layout, Some(ChannelLayout::Planar));
        assert_eq!(unknown, vec!["wobbly".to_string()]);

        assert_eq!(
            "float32 wobbly".parse::<FormatDescriptor>().unwrap_err(),
            StrictError::UnknownFormatToken("wobbly".into())
        );
    }

    #[test]
    fn test_no_layout_no_implied_channels() {
        let format = FormatDescriptor::parse_lenient("float64");
        assert_eq!(format.implied_channels(), None);
        assert_eq!(format.implied_sample_rate(), None);
    }

    #[test]
    fn test_scale_value() {
        assert_eq!(SampleEncoding::Uint8.scale_value(0.0), -1.0);
        assert_eq!(SampleEncoding::Uint8.scale_value(255.0), 1.0);
        assert_eq!(SampleEncoding::Int16.scale_value(-32768.0), -1.0);
        assert_eq!(SampleEncoding::Int16.scale_value(32767.0), 1.0);
        assert_eq!(SampleEncoding::Float32.scale_value(0.25), 0.25);
    }

    #[test]
    fn test_display_round_trips_through_parse() {
        let format = FormatDescriptor::parse_lenient("int24 be planar 4ch 48000");
        assert_eq!(format.to_string(), "int24 be planar 4ch 48000");
    }

    #[test]
    fn test_deserialize_descriptor_object() {
        let format: FormatDescriptor = serde_json::from_str(
            r#"{"dtype": "int16", "numberOfChannels": 2, "rate": 8000, "interleaved": true}"#,
        )
        .unwrap();
        assert_eq!(format.encoding, Some(SampleEncoding::Int16));
        assert_eq!(format.channels, Some(2));
        assert_eq!(format.sample_rate, Some(8000));
        assert_eq!(format.layout, Some(ChannelLayout::Interleaved));
    }
}
