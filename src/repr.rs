//! The sample container produced by normalization.
//!
//! [`AudioBuffer`] stores `num_channels` independent channels of `length` 32-bit
//! float samples at a fixed sample rate. Data lives in a single row-major
//! `ndarray::Array2<f32>` with shape `(channels, length)`, so every channel is one
//! contiguous row.
//!
//! ```rust
//! use audio_buffer_from::{AudioBuffer, SampleContainer};
//!
//! let mut buffer = AudioBuffer::zeros(2, 4, 48000).unwrap();
//! buffer.copy_to_channel(&[0.5, -0.5], 1, 2).unwrap();
//!
//! assert_eq!(buffer.num_channels(), 2);
//! assert_eq!(buffer.length(), 4);
//! assert_eq!(buffer.read_channel(1), vec![0.0, 0.0, 0.5, -0.5]);
//! ```
//!
//! Anything else that holds planar channel data can be fed back into the normalizer
//! by implementing [`SampleContainer`].

use ndarray::{Array2, ArrayView1, ArrayView2, ArrayViewMut1, Axis};
use std::fmt::Display;

use crate::context::AudioContext;
use crate::error::{AllocationError, AudioBufferResult};

/// Read access to an existing multichannel sample container.
///
/// Containers that keep each channel as a contiguous `f32` slice should return it
/// from [`channel_slice`](SampleContainer::channel_slice); the normalizer then copies
/// straight from that storage. Containers that cannot expose their storage only
/// implement [`read_channel`](SampleContainer::read_channel).
pub trait SampleContainer {
    /// Number of channels.
    fn num_channels(&self) -> usize;

    /// Samples per channel.
    fn length(&self) -> usize;

    /// Sample rate in Hz.
    fn sample_rate(&self) -> u32;

    /// Direct access to a channel's storage, if the container keeps it contiguous.
    fn channel_slice(&self, _channel: usize) -> Option<&[f32]> {
        None
    }

    /// Reads a channel into a new vector. Out-of-range channels read as silence.
    fn read_channel(&self, channel: usize) -> Vec<f32>;
}

/// Multichannel, fixed-length 32-bit float audio buffer.
///
/// # Examples
/// ```rust
/// use audio_buffer_from::AudioBuffer;
///
/// let stereo = AudioBuffer::from_channels(vec![vec![0.1, 0.2], vec![0.3, 0.4]], 44100).unwrap();
/// assert_eq!(stereo.num_channels(), 2);
/// assert_eq!(stereo.length(), 2);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    data: Array2<f32>,
    sample_rate: u32,
    context: Option<AudioContext>,
}

/// Validates container dimensions.
fn check_dimensions(channels: usize, length: usize, sample_rate: u32) -> AudioBufferResult<()> {
    if channels == 0 {
        return Err(AllocationError::ZeroChannels(channels).into());
    }
    if sample_rate == 0 {
        return Err(AllocationError::InvalidSampleRate(sample_rate).into());
    }
    let too_large = AllocationError::TooLarge { channels, length };
    let bytes = length
        .checked_mul(channels)
        .and_then(|n| n.checked_mul(size_of::<f32>()))
        .ok_or_else(|| too_large.clone())?;
    if bytes > isize::MAX as usize {
        return Err(too_large.into());
    }
    Ok(())
}

impl AudioBuffer {
    /// Allocates a silent buffer attached to `context`.
    ///
    /// # Errors
    /// [`AllocationError`] if `channels` or `sample_rate` is zero, the buffer
    /// would not fit in memory addressing, or the allocator refuses the storage.
    pub fn new(
        length: usize,
        channels: usize,
        sample_rate: u32,
        context: Option<AudioContext>,
    ) -> AudioBufferResult<Self> {
        check_dimensions(channels, length, sample_rate)?;
        let total = channels * length;
        let mut samples: Vec<f32> = Vec::new();
        samples
            .try_reserve_exact(total)
            .map_err(|_| AllocationError::OutOfMemory { channels, length })?;
        samples.resize(total, 0.0);
        let data = Array2::from_shape_vec((channels, length), samples)
            .map_err(|_| AllocationError::TooLarge { channels, length })?;
        Ok(Self {
            data,
            sample_rate,
            context,
        })
    }

    /// Allocates a silent buffer with no context.
    pub fn zeros(channels: usize, length: usize, sample_rate: u32) -> AudioBufferResult<Self> {
        Self::new(length, channels, sample_rate, None)
    }

    /// Builds a buffer from per-channel vectors. Shorter channels are zero padded to
    /// the length of the first one, longer ones are truncated.
    pub fn from_channels(channels: Vec<Vec<f32>>, sample_rate: u32) -> AudioBufferResult<Self> {
        let length = channels.first().map_or(0, Vec::len);
        let mut buffer = Self::zeros(channels.len(), length, sample_rate)?;
        for (c, data) in channels.iter().enumerate() {
            let n = data.len().min(length);
            buffer.copy_to_channel(&data[..n], c, 0)?;
        }
        Ok(buffer)
    }

    /// Wraps an owned `(channels, length)` array.
    pub fn from_array(data: Array2<f32>, sample_rate: u32) -> AudioBufferResult<Self> {
        let (channels, length) = data.dim();
        check_dimensions(channels, length, sample_rate)?;
        // Row access assumes standard layout.
        let data = if data.is_standard_layout() {
            data
        } else {
            data.as_standard_layout().into_owned()
        };
        Ok(Self {
            data,
            sample_rate,
            context: None,
        })
    }

    /// Number of channels.
    pub fn num_channels(&self) -> usize {
        self.data.nrows()
    }

    /// Samples per channel.
    pub fn length(&self) -> usize {
        self.data.ncols()
    }

    /// Sample rate in Hz.
    pub const fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Duration in seconds.
    pub fn duration_seconds(&self) -> f64 {
        self.length() as f64 / self.sample_rate as f64
    }

    /// Context the buffer was created with, if any.
    pub const fn context(&self) -> Option<&AudioContext> {
        self.context.as_ref()
    }

    /// Borrow the whole `(channels, length)` array.
    pub fn as_array(&self) -> ArrayView2<'_, f32> {
        self.data.view()
    }

    /// View of one channel.
    pub fn channel(&self, channel: usize) -> Option<ArrayView1<'_, f32>> {
        (channel < self.num_channels()).then(|| self.data.index_axis(Axis(0), channel))
    }

    /// Mutable view of one channel.
    pub fn channel_mut(&mut self, channel: usize) -> Option<ArrayViewMut1<'_, f32>> {
        if channel < self.num_channels() {
            Some(self.data.index_axis_mut(Axis(0), channel))
        } else {
            None
        }
    }

    /// Iterates over the channels in order.
    pub fn channels(&self) -> impl Iterator<Item = ArrayView1<'_, f32>> {
        self.data.outer_iter()
    }

    /// Copies `source` into `channel` starting at sample `start`. Samples that would
    /// land past the end of the buffer are dropped.
    ///
    /// # Errors
    /// [`AllocationError::ChannelOutOfRange`] if the channel does not exist.
    pub fn copy_to_channel(
        &mut self,
        source: &[f32],
        channel: usize,
        start: usize,
    ) -> AudioBufferResult<()> {
        let channels = self.num_channels();
        let length = self.length();
        let mut row = self
            .channel_mut(channel)
            .ok_or(AllocationError::ChannelOutOfRange {
                index: channel,
                channels,
            })?;
        let start = start.min(length);
        let n = source.len().min(length - start);
        for (dst, src) in row.iter_mut().skip(start).zip(&source[..n]) {
            *dst = *src;
        }
        Ok(())
    }

    /// Copies samples of `channel` starting at `start` into `destination`, as many
    /// as fit. Returns how many were copied.
    ///
    /// # Errors
    /// [`AllocationError::ChannelOutOfRange`] if the channel does not exist.
    pub fn copy_from_channel(
        &self,
        destination: &mut [f32],
        channel: usize,
        start: usize,
    ) -> AudioBufferResult<usize> {
        let row = self
            .channel(channel)
            .ok_or(AllocationError::ChannelOutOfRange {
                index: channel,
                channels: self.num_channels(),
            })?;
        let mut copied = 0;
        for (dst, src) in destination.iter_mut().zip(row.iter().skip(start)) {
            *dst = *src;
            copied += 1;
        }
        Ok(copied)
    }

    /// Interleaves all channels into one vector (frame by frame).
    pub fn to_interleaved_vec(&self) -> Vec<f32> {
        self.data.t().iter().copied().collect()
    }
}

impl SampleContainer for AudioBuffer {
    fn num_channels(&self) -> usize {
        AudioBuffer::num_channels(self)
    }

    fn length(&self) -> usize {
        AudioBuffer::length(self)
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn channel_slice(&self, channel: usize) -> Option<&[f32]> {
        if channel >= AudioBuffer::num_channels(self) {
            return None;
        }
        let length = AudioBuffer::length(self);
        self.data
            .as_slice()
            .map(|all| &all[channel * length..(channel + 1) * length])
    }

    fn read_channel(&self, channel: usize) -> Vec<f32> {
        match self.channel(channel) {
            Some(row) => row.to_vec(),
            None => vec![0.0; AudioBuffer::length(self)],
        }
    }
}

impl Display for AudioBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "AudioBuffer: {} ch × {} samples @ {} Hz",
            self.num_channels(),
            self.length(),
            self.sample_rate
        )?;

        let preview_len = if f.alternate() { 8 } else { 3 };
        for (ch, row) in self.channels().enumerate() {
            let preview = preview_len.min(row.len());
            write!(f, "\nCh {}: [", ch)?;
            for (i, val) in row.iter().take(preview).enumerate() {
                write!(f, "{:.4}", val)?;
                if i < preview - 1 {
                    write!(f, ", ")?;
                }
            }
            if row.len() > preview {
                write!(f, ", ...")?;
            }
            write!(f, "]")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AudioBufferError;
    use ndarray::array;

    #[test]
    fn test_zeros_construction() {
        let buffer = AudioBuffer::zeros(2, 50, 48000).unwrap();
        assert_eq!(buffer.num_channels(), 2);
        assert_eq!(buffer.length(), 50);
        assert_eq!(buffer.sample_rate(), 48000);
        assert!(buffer.context().is_none());
        assert!(buffer.channels().all(|ch| ch.iter().all(|&x| x == 0.0)));
    }

    #[test]
    fn test_zero_length_is_allowed() {
        let buffer = AudioBuffer::zeros(1, 0, 44100).unwrap();
        assert_eq!(buffer.length(), 0);
        assert_eq!(buffer.duration_seconds(), 0.0);
        assert_eq!(buffer.channel_slice(0), Some(&[][..]));
    }

    #[test]
    fn test_invalid_dimensions() {
        assert_eq!(
            AudioBuffer::zeros(0, 10, 44100).unwrap_err(),
            AudioBufferError::Allocation(AllocationError::ZeroChannels(0))
        );
        assert_eq!(
            AudioBuffer::zeros(1, 10, 0).unwrap_err(),
            AudioBufferError::Allocation(AllocationError::InvalidSampleRate(0))
        );
        assert!(matches!(
            AudioBuffer::zeros(4, usize::MAX / 2, 44100).unwrap_err(),
            AudioBufferError::Allocation(AllocationError::TooLarge { .. })
        ));
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn test_refused_allocation_is_an_error() {
        let length = 1usize << 60;
        assert_eq!(
            AudioBuffer::zeros(1, length, 44100).unwrap_err(),
            AudioBufferError::Allocation(AllocationError::OutOfMemory {
                channels: 1,
                length
            })
        );
    }

    #[test]
    fn test_from_channels_pads_and_truncates() {
        let buffer =
            AudioBuffer::from_channels(vec![vec![1.0, 2.0, 3.0], vec![4.0], vec![5.0; 5]], 8000)
                .unwrap();
        assert_eq!(buffer.length(), 3);
        assert_eq!(buffer.read_channel(1), vec![4.0, 0.0, 0.0]);
        assert_eq!(buffer.read_channel(2), vec![5.0, 5.0, 5.0]);
    }

    #[test]
    fn test_channel_slices_are_rows() {
        let buffer = AudioBuffer::from_array(array![[1.0f32, 2.0], [3.0, 4.0]], 44100).unwrap();
        assert_eq!(buffer.channel_slice(0), Some(&[1.0f32, 2.0][..]));
        assert_eq!(buffer.channel_slice(1), Some(&[3.0f32, 4.0][..]));
        assert_eq!(buffer.channel_slice(2), None);
        assert_eq!(buffer.to_interleaved_vec(), vec![1.0, 3.0, 2.0, 4.0]);
    }

    #[test]
    fn test_from_array_normalizes_layout() {
        let transposed = array![[1.0f32, 3.0], [2.0, 4.0]].reversed_axes();
        let buffer = AudioBuffer::from_array(transposed, 44100).unwrap();
        assert_eq!(buffer.channel_slice(0), Some(&[1.0f32, 2.0][..]));
    }

    #[test]
    fn test_copy_to_and_from_channel() {
        let mut buffer = AudioBuffer::zeros(1, 4, 44100).unwrap();
        buffer.copy_to_channel(&[1.0, 2.0, 3.0], 0, 2).unwrap();
        assert_eq!(buffer.read_channel(0), vec![0.0, 0.0, 1.0, 2.0]);

        let mut out = [0.0f32; 3];
        assert_eq!(buffer.copy_from_channel(&mut out, 0, 1).unwrap(), 3);
        assert_eq!(out, [0.0, 1.0, 2.0]);

        assert!(buffer.copy_to_channel(&[1.0], 3, 0).is_err());
    }

    #[test]
    fn test_display_preview() {
        let buffer = AudioBuffer::from_channels(vec![vec![0.5, 0.25, 0.0, -0.25]], 22050).unwrap();
        let text = buffer.to_string();
        assert!(text.starts_with("AudioBuffer: 1 ch × 4 samples @ 22050 Hz"));
        assert!(text.contains("Ch 0: [0.5000, 0.2500, 0.0000, ...]"));
    }
}
