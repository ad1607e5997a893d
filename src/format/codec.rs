//! The format codec: raw samples in, planar `f32` channels out.
//!
//! Decoding happens in two steps. First the payload is turned into one flat run of
//! unit-range floats according to the [`ResolvedFormat`]. Then that run is split
//! into `channels` equal rows, reading it either frame by frame (interleaved) or
//! channel block by channel block (planar). Samples that do not fill a whole frame
//! are dropped and reported in [`DecodedChannels::dropped`].
//!
//! Native-endian `float32` payloads that happen to be aligned are read in place
//! through `bytemuck` without an intermediate copy.

use ndarray::Array2;
use std::borrow::Cow;

use super::descriptor::{Endianness, SampleEncoding};
use crate::ChannelLayout;
use crate::error::DecodeError;
use crate::traits::{PcmSample, U24};
use i24::I24;

/// Payload handed to the codec.
#[derive(Debug, Clone, PartialEq)]
pub enum RawSamples<'a> {
    /// Bytes without an element type of their own (binary buffers, decoded text).
    Untyped(Cow<'a, [u8]>),
    /// Bytes of a typed array whose element type is known.
    Typed {
        /// The array's storage.
        bytes: Cow<'a, [u8]>,
        /// Element type of the array.
        encoding: SampleEncoding,
        /// Byte order the storage was written in.
        endianness: Endianness,
    },
    /// Plain numbers, one per sample.
    Values(Cow<'a, [f64]>),
}

/// A descriptor with every field the codec needs pinned down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedFormat {
    /// Element encoding.
    pub encoding: SampleEncoding,
    /// Byte order.
    pub endianness: Endianness,
    /// How channels are arranged in the payload.
    pub layout: ChannelLayout,
}

/// Planar output of [`decode`].
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedChannels {
    /// `(channels, length)` samples.
    pub data: Array2<f32>,
    /// Trailing samples that did not make up a whole frame.
    pub dropped: usize,
}

/// Picks an encoding and byte order for a payload that came without one.
///
/// - typed arrays use their element type
/// - untyped bytes are `float32` when their length is a non-zero multiple of four,
///   `uint8` otherwise
/// - plain numbers are already-scaled floats
pub fn detect_format(raw: &RawSamples<'_>) -> (SampleEncoding, Endianness) {
    match raw {
        RawSamples::Typed {
            encoding,
            endianness,
            ..
        } => (*encoding, *endianness),
        RawSamples::Untyped(bytes) => {
            if !bytes.is_empty() && bytes.len() % 4 == 0 {
                (SampleEncoding::Float32, Endianness::native())
            } else {
                (SampleEncoding::Uint8, Endianness::native())
            }
        }
        RawSamples::Values(_) => (SampleEncoding::Float64, Endianness::native()),
    }
}

fn read_elements<T: PcmSample>(bytes: &[u8], endianness: Endianness) -> Vec<f32> {
    match endianness {
        Endianness::Little => bytes
            .chunks_exact(T::SIZE)
            .map(|chunk| T::read_le(chunk).to_unit())
            .collect(),
        Endianness::Big => bytes
            .chunks_exact(T::SIZE)
            .map(|chunk| T::read_be(chunk).to_unit())
            .collect(),
    }
}

fn bytes_to_unit<'b>(
    bytes: &'b [u8],
    format: &ResolvedFormat,
) -> Result<Cow<'b, [f32]>, DecodeError> {
    let size = format.encoding.element_size();
    if bytes.len() % size != 0 {
        return Err(DecodeError::misaligned(
            bytes.len(),
            format.encoding.name(),
            size,
        ));
    }

    if format.encoding == SampleEncoding::Float32 && format.endianness == Endianness::native() {
        if let Ok(floats) = bytemuck::try_cast_slice::<u8, f32>(bytes) {
            tracing::trace!(samples = floats.len(), "reading float32 payload in place");
            return Ok(Cow::Borrowed(floats));
        }
    }

    let e = format.endianness;
    let samples = match format.encoding {
        SampleEncoding::Int8 => read_elements::<i8>(bytes, e),
        SampleEncoding::Uint8 => read_elements::<u8>(bytes, e),
        SampleEncoding::Int16 => read_elements::<i16>(bytes, e),
        SampleEncoding::Uint16 => read_elements::<u16>(bytes, e),
        SampleEncoding::Int24 => read_elements::<I24>(bytes, e),
        SampleEncoding::Uint24 => read_elements::<U24>(bytes, e),
        SampleEncoding::Int32 => read_elements::<i32>(bytes, e),
        SampleEncoding::Uint32 => read_elements::<u32>(bytes, e),
        SampleEncoding::Float32 => read_elements::<f32>(bytes, e),
        SampleEncoding::Float64 => read_elements::<f64>(bytes, e),
    };
    Ok(Cow::Owned(samples))
}

/// Splits a flat run of samples into `channels` rows.
fn split_channels(flat: &[f32], channels: usize, layout: ChannelLayout) -> DecodedChannels {
    let frames = flat.len() / channels;
    let dropped = flat.len() - frames * channels;
    let data = match layout {
        ChannelLayout::Interleaved => {
            Array2::from_shape_fn((channels, frames), |(c, i)| flat[i * channels + c])
        }
        ChannelLayout::Planar => {
            Array2::from_shape_fn((channels, frames), |(c, i)| flat[c * frames + i])
        }
    };
    DecodedChannels { data, dropped }
}

/// Decodes `raw` into `channels` planar rows of unit-range floats.
///
/// # Errors
/// - [`DecodeError::Unsupported`] if `channels` is zero
/// - [`DecodeError::Misaligned`] if a byte payload is not a whole number of elements
pub fn decode(
    raw: &RawSamples<'_>,
    format: &ResolvedFormat,
    channels: usize,
) -> Result<DecodedChannels, DecodeError> {
    if channels == 0 {
        return Err(DecodeError::Unsupported(
            "cannot decode into zero channels".to_string(),
        ));
    }

    let flat: Cow<'_, [f32]> = match raw {
        RawSamples::Untyped(bytes) | RawSamples::Typed { bytes, .. } => {
            bytes_to_unit(bytes, format)?
        }
        RawSamples::Values(values) => Cow::Owned(
            values
                .iter()
                .map(|&v| format.encoding.scale_value(v))
                .collect(),
        ),
    };

    tracing::trace!(
        samples = flat.len(),
        channels,
        encoding = %format.encoding,
        layout = ?format.layout,
        "decoded flat payload"
    );
    Ok(split_channels(&flat, channels, format.layout))
}
