//! Sample format descriptors and the format codec.
//!
//! - [`descriptor`] - the structured [`FormatDescriptor`] and its string grammar
//! - [`codec`] - decoding raw bytes or numeric values into planar `f32` channels

pub mod codec;
pub mod descriptor;

pub use codec::{DecodedChannels, RawSamples, ResolvedFormat, decode, detect_format};
pub use descriptor::{Endianness, FormatDescriptor, SampleEncoding};
