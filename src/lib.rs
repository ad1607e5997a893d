// Correctness and logic
#![warn(clippy::unit_cmp)] // Detects comparing unit types
#![warn(clippy::match_same_arms)]
// Duplicate match arms

// Performance-focused
#![warn(clippy::inefficient_to_string)] // `format!("{}", x)` vs `x.to_string()`
#![warn(clippy::map_clone)] // Cloning inside `map()` unnecessarily
#![warn(clippy::unnecessary_to_owned)] // Detects redundant `.to_owned()` or `.clone()`
#![warn(clippy::large_stack_arrays)] // Helps avoid stack overflows
#![warn(clippy::needless_collect)] // Avoids `.collect().iter()` chains

// Style and idiomatic Rust
#![warn(clippy::redundant_clone)] // Detects unnecessary `.clone()`
#![warn(clippy::identity_op)] // e.g., `x + 0`, `x * 1`
#![warn(clippy::needless_return)] // Avoids `return` at the end of functions
#![warn(clippy::let_unit_value)] // Avoids binding `()` to variables
#![warn(clippy::manual_map)] // Use `.map()` instead of manual `match`
#![warn(clippy::unwrap_used)] // Avoids using `unwrap()`

// Maintainability
#![warn(clippy::missing_panics_doc)] // Docs for functions that might panic
#![warn(clippy::missing_safety_doc)] // Docs for `unsafe` functions
#![deny(missing_docs)] // Documentation is a must for release

//! # audio_buffer_from
//!
//! Turns whatever holds audio samples into one canonical multichannel `f32` buffer.
//!
//! ## Overview
//!
//! A single operation, [`normalize`], accepts raw bytes, typed arrays, plain
//! numbers, per-channel arrays, `rows × channels` grids, encoded text (base64,
//! data URIs, raw byte strings), existing buffers, a bare length or nothing at
//! all. It works out the sample format, the channel count and layout, the length
//! and the sample rate, and returns a freshly allocated [`AudioBuffer`].
//!
//! ## Quick Start
//!
//! ```rust
//! use audio_buffer_from::{normalize, Options, SampleContainer};
//!
//! // 100 silent samples, one channel, 44100 Hz.
//! let silence = normalize(100usize, ()).unwrap();
//! assert_eq!(silence.length(), 100);
//! assert_eq!(silence.num_channels(), 1);
//! assert_eq!(silence.sample_rate(), 44100);
//!
//! // Raw bytes with a format string.
//! let stereo = normalize(&[0u8, 255, 0, 255][..], "uint8 interleaved stereo").unwrap();
//! assert_eq!(stereo.read_channel(0), vec![-1.0, -1.0]);
//! assert_eq!(stereo.read_channel(1), vec![1.0, 1.0]);
//!
//! // Separate channels.
//! let split = normalize(vec![vec![0.0f32, 0.0], vec![1.0, 1.0]], ()).unwrap();
//! assert_eq!(split.num_channels(), 2);
//!
//! // Options as a record.
//! let empty = normalize((), Options::new().with_duration(0.5).with_channels(2)).unwrap();
//! assert_eq!(empty.length(), 22050);
//! ```
//!
//! Loosely typed input goes through `serde_json`:
//!
//! ```rust
//! use audio_buffer_from::Normalizer;
//! use serde_json::json;
//!
//! let buffer = Normalizer::default()
//!     .normalize_json(
//!         &json!({"data": [0, 0.5, -0.5, 0, 1, -1, -1, 1], "shape": [4, 2], "format": {"sampleRate": 48000}}),
//!         &json!(null),
//!     )
//!     .unwrap();
//! assert_eq!(buffer.length(), 4);
//! assert_eq!(buffer.num_channels(), 2);
//! assert_eq!(buffer.sample_rate(), 48000);
//! ```
//!
//! ## Error Handling
//!
//! The library uses a hierarchical error system:
//!
//! ```rust
//! use audio_buffer_from::{AudioBufferError, DecodeError, Options, normalize};
//!
//! match normalize(&[0u8, 1, 2][..], Options::new().with_format("int16")) {
//!     Ok(_) => unreachable!(),
//!     Err(AudioBufferError::Decode(DecodeError::Misaligned { len, .. })) => assert_eq!(len, 3),
//!     Err(other) => panic!("unexpected error: {other}"),
//! }
//! ```
//!
//! Classification and option resolution never fail with the default
//! configuration. [`Normalizer::strict`] turns silent repairs into
//! [`StrictError`]s.
//!
//! ## Logging
//!
//! The crate emits `tracing` events (`debug` for the chosen path and resolved
//! parameters, `warn` for lenient repairs) and never installs a subscriber.
//!
//! ## License
//!
//! MIT License

mod context;
mod error;
/// Format descriptors and the format codec.
pub mod format;
mod normalize;
/// Normalization options and their resolution.
pub mod options;
mod repr;
/// Source shapes accepted by the normalizer.
pub mod source;
/// Decoding of encoded text payloads.
pub mod text;
/// Per-encoding sample scaling.
pub mod traits;

use serde::{Deserialize, Serialize};

pub use crate::context::{AudioContext, ContextOption};
pub use crate::error::{
    AllocationError, AudioBufferError, AudioBufferResult, DecodeError, StrictError,
};
pub use crate::format::{Endianness, FormatDescriptor, ResolvedFormat, SampleEncoding};
pub use crate::normalize::{Normalizer, ResolvedParams, SourcePath, normalize};
pub use crate::options::{NormalizeConfig, Options, OptionsArg, Origin, Provenance};
pub use crate::repr::{AudioBuffer, SampleContainer};
pub use crate::source::AudioSource;

pub use i24::I24; // Re-export the 24-bit sample type used by the codec

/// Describes how multi-channel data is organized in a flat payload
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelLayout {
    /// Samples from different channels alternate frame by frame (LRLRLR...)
    #[default]
    Interleaved,
    /// Each channel is one contiguous block (LLL...RRR...)
    #[serde(alias = "non-interleaved", alias = "noninterleaved")]
    Planar,
}

impl ChannelLayout {
    /// Returns true if the layout is interleaved
    pub const fn is_interleaved(&self) -> bool {
        matches!(self, ChannelLayout::Interleaved)
    }

    /// Returns true if the layout is planar
    pub const fn is_planar(&self) -> bool {
        matches!(self, ChannelLayout::Planar)
    }
}
