//! Error types and result utilities for buffer normalization.
//!
//! Classification and option resolution never fail on their own. Errors come
//! from three places only:
//!
//! - [`DecodeError`]: the format codec could not interpret a byte or text payload.
//! - [`AllocationError`]: the destination container rejected its dimensions.
//! - [`StrictError`]: a lenient default would have applied, but the caller
//!   switched `lenient_defaults` off.

use thiserror::Error;

/// Convenience type alias for results that may contain an [`AudioBufferError`].
pub type AudioBufferResult<T> = Result<T, AudioBufferError>;

/// Top level error returned by every fallible operation in this crate.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AudioBufferError {
    /// Raw or encoded data could not be decoded into samples.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// The sample container could not be created with the requested dimensions.
    #[error(transparent)]
    Allocation(#[from] AllocationError),

    /// Input that lenient mode would have repaired was rejected.
    #[error(transparent)]
    Strict(#[from] StrictError),
}

impl AudioBufferError {
    /// Returns true if the error originated in the format codec.
    pub const fn is_decode(&self) -> bool {
        matches!(self, Self::Decode(_))
    }

    /// Returns true if the error originated in container allocation.
    pub const fn is_allocation(&self) -> bool {
        matches!(self, Self::Allocation(_))
    }

    /// Returns true if the error was raised only because strict mode is enabled.
    pub const fn is_strict(&self) -> bool {
        matches!(self, Self::Strict(_))
    }
}

/// Failures raised by the format codec and the text payload decoder.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    /// Byte length is not a whole number of samples for the encoding.
    #[error("Byte length {len} is not aligned to the {encoding} element size of {element_size} bytes")]
    Misaligned {
        /// Length of the byte payload.
        len: usize,
        /// Encoding the bytes were decoded against.
        encoding: String,
        /// Element size of the encoding in bytes.
        element_size: usize,
    },

    /// A text payload looked like base64 or a data URI but failed to decode.
    #[error("Invalid {kind} payload: {reason}")]
    InvalidPayload {
        /// Payload kind ("base64", "data URI", ...).
        kind: &'static str,
        /// Decoder message.
        reason: String,
    },

    /// The descriptor cannot be applied to this source.
    #[error("Unsupported format: {0}")]
    Unsupported(String),
}

impl DecodeError {
    /// Create a misaligned payload error.
    pub fn misaligned(len: usize, encoding: impl Into<String>, element_size: usize) -> Self {
        Self::Misaligned {
            len,
            encoding: encoding.into(),
            element_size,
        }
    }

    /// Create an invalid payload error.
    pub fn invalid_payload(kind: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidPayload {
            kind,
            reason: reason.into(),
        }
    }
}

/// Failures raised when the destination container is created.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AllocationError {
    /// A container needs at least one channel.
    #[error("Invalid channel count {0}: a buffer needs at least one channel")]
    ZeroChannels(usize),

    /// Sample rate must be a positive number of Hz.
    #[error("Invalid sample rate {0}: must be > 0")]
    InvalidSampleRate(u32),

    /// `length × channels` does not fit in memory addressing.
    #[error("Buffer of {channels} channels × {length} samples is too large")]
    TooLarge {
        /// Requested channel count.
        channels: usize,
        /// Requested length per channel.
        length: usize,
    },

    /// The requested length is negative, fractional or not a number.
    #[error("Invalid length {0}: must be a non-negative whole number of samples")]
    InvalidLength(String),

    /// The allocator could not provide storage for the buffer.
    #[error("Out of memory allocating {channels} channels × {length} samples")]
    OutOfMemory {
        /// Requested channel count.
        channels: usize,
        /// Requested length per channel.
        length: usize,
    },

    /// A channel index was outside the container.
    #[error("Channel index {index} out of range for {channels} channels")]
    ChannelOutOfRange {
        /// Requested channel.
        index: usize,
        /// Channel count of the container.
        channels: usize,
    },
}

/// Inputs rejected only when `lenient_defaults` is disabled.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StrictError {
    /// A format descriptor string contained a token that means nothing.
    #[error("Unknown format token '{0}'")]
    UnknownFormatToken(String),

    /// An option carried a value outside its domain.
    #[error("Invalid option '{name}': {reason}")]
    InvalidOption {
        /// Option field name.
        name: &'static str,
        /// What was wrong with the value.
        reason: String,
    },

    /// Decoded sample count is not divisible by the channel count.
    #[error("{samples} trailing samples do not fill a frame of {channels} channels")]
    Remainder {
        /// Samples left over after the last whole frame.
        samples: usize,
        /// Resolved channel count.
        channels: usize,
    },

    /// Separated channel arrays did not all have the same length.
    #[error("Channel {channel} has {actual} samples, expected {expected}")]
    RaggedChannels {
        /// Offending channel.
        channel: usize,
        /// Length of the first channel.
        expected: usize,
        /// Length of the offending channel.
        actual: usize,
    },
}

impl StrictError {
    /// Create an invalid option error.
    pub fn invalid_option(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidOption {
            name,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sub_errors_convert_into_top_level() {
        let err: AudioBufferError = DecodeError::misaligned(3, "float32", 4).into();
        assert!(err.is_decode());
        assert_eq!(
            err.to_string(),
            "Byte length 3 is not aligned to the float32 element size of 4 bytes"
        );

        let err: AudioBufferError = AllocationError::ZeroChannels(0).into();
        assert!(err.is_allocation());

        let err: AudioBufferError = AllocationError::InvalidLength("-3".into()).into();
        assert!(err.is_allocation());
        assert_eq!(
            err.to_string(),
            "Invalid length -3: must be a non-negative whole number of samples"
        );

        let err: AudioBufferError = StrictError::UnknownFormatToken("wat".into()).into();
        assert!(err.is_strict());
        assert_eq!(err.to_string(), "Unknown format token 'wat'");
    }
}
