//! The buffer normalizer.
//!
//! Every call runs one pass of `Classify → Resolve → Materialize → Allocate →
//! Populate`:
//!
//! - **Classify**: options shorthands are expanded and a configuration record
//!   passed as the source is moved over to the options. The remaining
//!   [`AudioSource`] variant picks the path.
//! - **Resolve**: [`Options::resolve`] merges explicit options, the source's own
//!   hints and the format descriptor.
//! - **Materialize**: per-channel data is borrowed from the source where it is
//!   already `f32` and contiguous, otherwise it is coerced or decoded.
//! - **Allocate / Populate**: a fresh [`AudioBuffer`] is allocated and every
//!   channel is copied into it, so the result never aliases the source.
//!
//! ```rust
//! use audio_buffer_from::{normalize, Options};
//!
//! let bytes = [0u8, 255, 0, 255];
//! let buffer = normalize(&bytes[..], "uint8 interleaved stereo").unwrap();
//! assert_eq!(buffer.num_channels(), 2);
//! assert_eq!(buffer.length(), 2);
//!
//! let silence = normalize((), Options::new().with_duration(0.5)).unwrap();
//! assert_eq!(silence.length(), 22050);
//! ```

use ndarray::Array2;
use std::borrow::Cow;

use crate::ChannelLayout;
use crate::error::{AllocationError, AudioBufferResult, StrictError};
use crate::format::{ResolvedFormat, decode, detect_format};
use crate::options::{NormalizeConfig, Options, OptionsArg, Provenance, Resolution, SourceHints};
use crate::repr::{AudioBuffer, SampleContainer};
use crate::source::{AudioSource, ChannelData, Facet, FlatData, GridSource};

/// Conversion path taken for a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourcePath {
    /// No source: silence sized by `length` / `duration`.
    Empty,
    /// A count: that many silent samples.
    Count,
    /// Copy of an existing container.
    Clone,
    /// Already separated per-channel arrays.
    SeparatedChannels,
    /// Byte-level decode through the format codec.
    Decode,
}

/// Final parameters of a normalization, with the provenance of each value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedParams {
    /// Path the source took.
    pub path: SourcePath,
    /// Samples per channel.
    pub length: usize,
    /// Channel count.
    pub channels: usize,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Fully resolved format, on the decode path only.
    pub format: Option<ResolvedFormat>,
    /// Which precedence level supplied `channels` and `sample_rate`.
    pub provenance: Provenance,
}

enum Materialized<'s> {
    Silent,
    Channels(Vec<Cow<'s, [f32]>>),
    Planar(Array2<f32>),
}

struct Plan<'s> {
    params: ResolvedParams,
    data: Materialized<'s>,
}

impl Plan<'_> {
    fn silent(path: SourcePath, length: usize, resolution: &Resolution) -> Self {
        Plan {
            params: ResolvedParams {
                path,
                length,
                channels: resolution.channels,
                sample_rate: resolution.sample_rate,
                format: None,
                provenance: resolution.provenance,
            },
            data: Materialized::Silent,
        }
    }
}

/// Normalizes `source` into a new [`AudioBuffer`] with the default, lenient
/// configuration.
///
/// `options` may be `()`, a channel count, a format string or an [`Options`]
/// record.
///
/// # Errors
/// - [`DecodeError`](crate::DecodeError) if raw data cannot be read with the
///   resolved format
/// - [`AllocationError`](crate::AllocationError) if the buffer cannot be allocated
pub fn normalize<'a>(
    source: impl Into<AudioSource<'a>>,
    options: impl Into<OptionsArg>,
) -> AudioBufferResult<AudioBuffer> {
    Normalizer::default().normalize(source, options)
}

/// Moves a configuration record given as the source over to the options.
fn split_config(source: AudioSource<'_>, options: OptionsArg) -> (AudioSource<'_>, Options) {
    match (source, options.into_options()) {
        (AudioSource::Config(config), None) => (AudioSource::Empty, config),
        (AudioSource::Config(config), Some(options)) => (AudioSource::Empty, options.or(config)),
        (source, options) => (source, options.unwrap_or_default()),
    }
}

/// A normalizer bound to a [`NormalizeConfig`].
///
/// ```rust
/// use audio_buffer_from::{Normalizer, Options};
///
/// let strict = Normalizer::strict();
/// let err = strict
///     .normalize(vec![0.0f32, 0.1, 0.2], Options::new().with_channels(2))
///     .unwrap_err();
/// assert!(err.is_strict());
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Normalizer {
    config: NormalizeConfig,
}

impl Normalizer {
    /// Creates a normalizer with `config`.
    pub const fn new(config: NormalizeConfig) -> Self {
        Self { config }
    }

    /// A normalizer that fails instead of repairing malformed input.
    pub fn strict() -> Self {
        Self::new(NormalizeConfig::strict())
    }

    /// The active configuration.
    pub const fn config(&self) -> &NormalizeConfig {
        &self.config
    }

    /// Normalizes `source` into a new [`AudioBuffer`].
    ///
    /// # Errors
    /// Decode and allocation failures are always returned. In strict mode
    /// malformed input also fails with a [`StrictError`].
    pub fn normalize<'a>(
        &self,
        source: impl Into<AudioSource<'a>>,
        options: impl Into<OptionsArg>,
    ) -> AudioBufferResult<AudioBuffer> {
        let (source, options) = split_config(source.into(), options.into());
        let plan = self.plan(&source, &options)?;
        self.populate(plan, &options)
    }

    /// Runs classification, resolution and materialization without allocating the
    /// destination, and reports the parameters the buffer would get.
    ///
    /// # Errors
    /// As [`normalize`](Self::normalize), minus allocation failures.
    pub fn resolve<'a>(
        &self,
        source: impl Into<AudioSource<'a>>,
        options: impl Into<OptionsArg>,
    ) -> AudioBufferResult<ResolvedParams> {
        let (source, options) = split_config(source.into(), options.into());
        Ok(self.plan(&source, &options)?.params)
    }

    /// Normalizes loosely typed JSON source and options.
    ///
    /// # Errors
    /// As [`normalize`](Self::normalize).
    pub fn normalize_json(
        &self,
        source: &serde_json::Value,
        options: &serde_json::Value,
    ) -> AudioBufferResult<AudioBuffer> {
        self.normalize(
            AudioSource::from_json(source),
            OptionsArg::from_json(options),
        )
    }

    fn plan<'s>(
        &self,
        source: &'s AudioSource<'_>,
        options: &Options,
    ) -> AudioBufferResult<Plan<'s>> {
        tracing::debug!(kind = source.kind(), "classified source");
        let plan = match source {
            AudioSource::Empty | AudioSource::Config(_) => {
                let resolution = options.resolve(&SourceHints::default(), &self.config)?;
                let length = options.empty_length(resolution.sample_rate, &self.config)?;
                Plan::silent(SourcePath::Empty, length, &resolution)
            }
            AudioSource::Count(count) => {
                let resolution = options.resolve(&SourceHints::default(), &self.config)?;
                Plan::silent(SourcePath::Count, *count, &resolution)
            }
            AudioSource::InvalidCount(count) => {
                return Err(AllocationError::InvalidLength(count.clone()).into());
            }
            AudioSource::Container(container) => self.plan_clone(*container, options)?,
            AudioSource::Channels(channels) => {
                self.plan_channels(channels, options, SourceHints::default())?
            }
            AudioSource::Grid(grid) => self.plan_grid(grid, options)?,
            AudioSource::Wrapped(wrapped) => {
                let hints = SourceHints {
                    channels: wrapped.channels,
                    sample_rate: wrapped.sample_rate,
                    ..SourceHints::default()
                };
                self.plan_facet(&wrapped.data, options, hints)?
            }
            AudioSource::Flat(flat) => self.plan_decode(flat, options, SourceHints::default())?,
        };

        let params = &plan.params;
        tracing::debug!(
            path = ?params.path,
            length = params.length,
            channels = params.channels,
            sample_rate = params.sample_rate,
            channels_from = ?params.provenance.channels,
            sample_rate_from = ?params.provenance.sample_rate,
            "resolved parameters"
        );
        Ok(plan)
    }

    fn plan_clone<'s>(
        &self,
        container: &'s dyn SampleContainer,
        options: &Options,
    ) -> AudioBufferResult<Plan<'s>> {
        let source_channels = container.num_channels();
        let hints = SourceHints {
            channels: Some(source_channels),
            sample_rate: Some(container.sample_rate()),
            ..SourceHints::default()
        };
        let resolution = options.resolve(&hints, &self.config)?;

        let kept = resolution.channels.min(source_channels);
        let channels = (0..kept)
            .map(|c| match container.channel_slice(c) {
                Some(slice) => Cow::Borrowed(slice),
                None => Cow::Owned(container.read_channel(c)),
            })
            .collect();
        if resolution.channels > source_channels {
            tracing::trace!(
                source_channels,
                channels = resolution.channels,
                "extra channels stay silent"
            );
        }

        let mut plan = Plan::silent(SourcePath::Clone, container.length(), &resolution);
        plan.data = Materialized::Channels(channels);
        Ok(plan)
    }

    fn plan_channels<'s>(
        &self,
        channels: &'s [ChannelData<'_>],
        options: &Options,
        hints: SourceHints,
    ) -> AudioBufferResult<Plan<'s>> {
        let hints = SourceHints {
            channels: hints
                .channels
                .or_else(|| Some(channels.len()).filter(|&n| n > 0)),
            ..hints
        };
        let resolution = options.resolve(&hints, &self.config)?;
        let length = channels.first().map_or(0, ChannelData::len);

        if let Some((channel, ragged)) = channels
            .iter()
            .enumerate()
            .find(|(_, data)| data.len() != length)
        {
            if !self.config.lenient_defaults {
                return Err(StrictError::RaggedChannels {
                    channel,
                    expected: length,
                    actual: ragged.len(),
                }
                .into());
            }
            tracing::warn!(
                channel,
                expected = length,
                actual = ragged.len(),
                "channels differ in length, padding or truncating to the first"
            );
        }

        let data = channels
            .iter()
            .take(resolution.channels)
            .map(ChannelData::as_f32)
            .collect();
        let mut plan = Plan::silent(SourcePath::SeparatedChannels, length, &resolution);
        plan.data = Materialized::Channels(data);
        Ok(plan)
    }

    /// Unwraps a grid once. Its rows are frames, so the data is interleaved
    /// unless a format says otherwise. Nested rows are joined back into frames
    /// before decoding.
    fn plan_grid<'s>(
        &self,
        grid: &'s GridSource<'_>,
        options: &Options,
    ) -> AudioBufferResult<Plan<'s>> {
        let format = grid
            .format
            .as_ref()
            .map(|format| format.parse(&self.config))
            .transpose()?;
        let mut hints = SourceHints {
            channels: grid.shape.get(1).copied().filter(|&n| n > 0),
            sample_rate: format.and_then(|f| f.sample_rate),
            layout: Some(ChannelLayout::Interleaved),
            format,
        };
        match grid.flattened_rows() {
            Some(frames) => {
                hints.channels = hints
                    .channels
                    .or_else(|| grid.row_width().filter(|&n| n > 0));
                self.plan_decode(&frames, options, hints)
            }
            None => self.plan_facet(&grid.data, options, hints),
        }
    }

    fn plan_facet<'s>(
        &self,
        facet: &'s Facet<'_>,
        options: &Options,
        hints: SourceHints,
    ) -> AudioBufferResult<Plan<'s>> {
        match facet {
            Facet::Flat(flat) => self.plan_decode(flat, options, hints),
            Facet::Channels(channels) => self.plan_channels(channels, options, hints),
        }
    }

    fn plan_decode(
        &self,
        flat: &FlatData<'_>,
        options: &Options,
        hints: SourceHints,
    ) -> AudioBufferResult<Plan<'static>> {
        let raw = flat.to_raw()?;
        let resolution = options.resolve(&hints, &self.config)?;

        let (detected_encoding, detected_endianness) = detect_format(&raw);
        let explicit = resolution.format.unwrap_or_default();
        let format = ResolvedFormat {
            encoding: explicit.encoding.unwrap_or(detected_encoding),
            endianness: explicit.endianness.unwrap_or(detected_endianness),
            layout: explicit
                .layout
                .or(resolution.layout_hint)
                .unwrap_or(ChannelLayout::Planar),
        };
        tracing::trace!(
            encoding = %format.encoding,
            endianness = ?format.endianness,
            layout = ?format.layout,
            detected = explicit.encoding.is_none(),
            "decode format"
        );

        let decoded = decode(&raw, &format, resolution.channels)?;
        if decoded.dropped > 0 {
            if !self.config.lenient_defaults {
                return Err(StrictError::Remainder {
                    samples: decoded.dropped,
                    channels: resolution.channels,
                }
                .into());
            }
            tracing::warn!(
                dropped = decoded.dropped,
                channels = resolution.channels,
                "dropping samples that do not fill a whole frame"
            );
        }

        let mut plan = Plan::silent(SourcePath::Decode, decoded.data.ncols(), &resolution);
        plan.params.format = Some(format);
        plan.data = Materialized::Planar(decoded.data);
        Ok(plan)
    }

    fn populate(&self, plan: Plan<'_>, options: &Options) -> AudioBufferResult<AudioBuffer> {
        let params = plan.params;
        let mut buffer = AudioBuffer::new(
            params.length,
            params.channels,
            params.sample_rate,
            options.context.resolve(),
        )?;

        match plan.data {
            Materialized::Silent => {}
            Materialized::Channels(channels) => {
                for (c, data) in channels.iter().enumerate() {
                    buffer.copy_to_channel(data, c, 0)?;
                }
            }
            Materialized::Planar(data) => {
                for (c, row) in data.outer_iter().enumerate() {
                    if let Some(mut dst) = buffer.channel_mut(c) {
                        dst.assign(&row);
                    }
                }
            }
        }
        Ok(buffer)
    }
}
