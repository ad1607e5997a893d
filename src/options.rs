//! Normalization options and their resolution.
//!
//! Options reach the normalizer in three shapes, all funnelled through
//! [`OptionsArg`]: nothing at all, a bare channel count, a bare format string, or a
//! full [`Options`] record. Field aliases are normalized when the record is built
//! (`numberOfChannels` / `channelCount` → `channels`, `rate` → `sample_rate`,
//! `dtype` → `format`), so resolution only ever sees one name per concept.
//!
//! ## Precedence
//! For `channels` and `sample_rate`, highest first:
//!
//! 1. explicit options
//! 2. hints carried by the source itself ([`SourceHints`])
//! 3. values implied by the format descriptor
//! 4. [`NormalizeConfig`] defaults (1 channel, 44100 Hz)
//!
//! [`Resolution::provenance`] records which level won for each field.
//!
//! ## Leniency
//! With `lenient_defaults` on (the default) resolution does not fail: zero or
//! malformed values fall through to the next level. With it off, the same inputs
//! produce a [`StrictError`]. Fields that could not be read are kept in
//! [`Options::rejected`] so strict mode can report them. A rejected `length` is
//! an [`AllocationError`] in both modes.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::ChannelLayout;
use crate::context::{AudioContext, ContextOption};
use crate::error::{AllocationError, AudioBufferResult, StrictError};
use crate::format::FormatDescriptor;

/// Sample rate used when nothing else supplies one.
pub const DEFAULT_SAMPLE_RATE: u32 = 44100;
/// Channel count used when nothing else supplies one.
pub const DEFAULT_CHANNELS: usize = 1;

/// Policy knobs for the normalizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NormalizeConfig {
    /// Degrade malformed or partial input to defaults instead of failing.
    pub lenient_defaults: bool,
    /// Sample rate of last resort.
    pub default_sample_rate: u32,
    /// Channel count of last resort.
    pub default_channels: usize,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            lenient_defaults: true,
            default_sample_rate: DEFAULT_SAMPLE_RATE,
            default_channels: DEFAULT_CHANNELS,
        }
    }
}

impl NormalizeConfig {
    /// Configuration that fails instead of silently repairing input.
    pub fn strict() -> Self {
        Self {
            lenient_defaults: false,
            ..Self::default()
        }
    }
}

/// A format given either as descriptor text or as an already parsed descriptor.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum FormatSpec {
    /// Descriptor string such as `"uint8 interleaved stereo"`.
    Text(String),
    /// Pre-parsed descriptor.
    Descriptor(FormatDescriptor),
}

impl FormatSpec {
    /// Parses descriptor text with the leniency `config` asks for.
    ///
    /// # Errors
    /// [`StrictError::UnknownFormatToken`] in strict mode only.
    pub fn parse(&self, config: &NormalizeConfig) -> Result<FormatDescriptor, StrictError> {
        match self {
            FormatSpec::Descriptor(descriptor) => Ok(*descriptor),
            FormatSpec::Text(text) if config.lenient_defaults => {
                Ok(FormatDescriptor::parse_lenient(text))
            }
            FormatSpec::Text(text) => FormatDescriptor::parse_strict(text),
        }
    }
}

impl From<&str> for FormatSpec {
    fn from(text: &str) -> Self {
        FormatSpec::Text(text.to_string())
    }
}

impl From<String> for FormatSpec {
    fn from(text: String) -> Self {
        FormatSpec::Text(text)
    }
}

impl From<FormatDescriptor> for FormatSpec {
    fn from(descriptor: FormatDescriptor) -> Self {
        FormatSpec::Descriptor(descriptor)
    }
}

/// Reads a JSON number as a non-negative whole number. `48000.0` qualifies,
/// `1.5` and `-2` do not.
pub(crate) fn whole_number(value: &Value) -> Option<u64> {
    let Value::Number(number) = value else {
        return None;
    };
    number.as_u64().or_else(|| {
        number
            .as_f64()
            .filter(|f| f.is_finite() && *f >= 0.0 && f.fract() == 0.0 && *f < u64::MAX as f64)
            .map(|f| f as u64)
    })
}

fn whole<T: TryFrom<u64>>(value: &Value) -> Option<T> {
    whole_number(value).and_then(|n| T::try_from(n).ok())
}

/// `null` forces no context; any other value stands for a caller-supplied one.
fn context_field<'de, D>(deserializer: D) -> Result<ContextOption, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Null => ContextOption::Null,
        Value::String(label) => ContextOption::Explicit(AudioContext::new(label)),
        _ => ContextOption::Explicit(AudioContext::new("external")),
    })
}

/// An options field that was present but held an unusable value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedField {
    /// Field name, after alias normalization.
    pub name: &'static str,
    /// The value as it was given, in JSON notation.
    pub value: String,
}

/// Options exactly as they appear on the wire, before field validation.
#[derive(Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawOptions {
    #[serde(alias = "numberOfChannels", alias = "channelCount")]
    channels: Option<Value>,
    #[serde(alias = "rate")]
    sample_rate: Option<Value>,
    #[serde(alias = "dtype")]
    format: Option<Value>,
    length: Option<Value>,
    duration: Option<Value>,
    #[serde(deserialize_with = "context_field")]
    context: ContextOption,
}

fn read_field<T>(
    name: &'static str,
    value: Option<Value>,
    read: impl FnOnce(&Value) -> Option<T>,
    rejected: &mut Vec<RejectedField>,
) -> Option<T> {
    let value = value?;
    let parsed = read(&value);
    if parsed.is_none() {
        rejected.push(RejectedField {
            name,
            value: value.to_string(),
        });
    }
    parsed
}

impl From<RawOptions> for Options {
    fn from(raw: RawOptions) -> Self {
        let mut rejected = Vec::new();
        let channels = read_field("channels", raw.channels, whole, &mut rejected);
        let sample_rate = read_field("sampleRate", raw.sample_rate, whole, &mut rejected);
        let format = read_field(
            "format",
            raw.format,
            |v| serde_json::from_value(v.clone()).ok(),
            &mut rejected,
        );
        let length = read_field("length", raw.length, whole, &mut rejected);
        let duration = read_field("duration", raw.duration, Value::as_f64, &mut rejected);
        Options {
            channels,
            sample_rate,
            format,
            length,
            duration,
            context: raw.context,
            rejected,
        }
    }
}

impl<'de> Deserialize<'de> for Options {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        RawOptions::deserialize(deserializer).map(Options::from)
    }
}

/// Explicit normalization options.
///
/// ```rust
/// use audio_buffer_from::Options;
///
/// let options: Options =
///     serde_json::from_str(r#"{"numberOfChannels": 2, "rate": 48000, "dtype": "int16"}"#).unwrap();
/// assert_eq!(options.channels, Some(2));
/// assert_eq!(options.sample_rate, Some(48000));
///
/// let built = Options::new().with_channels(2).with_sample_rate(48000).with_format("int16");
/// assert_eq!(built, options);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Options {
    /// Channel count.
    pub channels: Option<usize>,
    /// Sample rate in Hz.
    pub sample_rate: Option<u32>,
    /// Format of raw sources.
    pub format: Option<FormatSpec>,
    /// Length of an empty buffer, in samples.
    pub length: Option<usize>,
    /// Length of an empty buffer, in seconds.
    pub duration: Option<f64>,
    /// Context for the destination container.
    pub context: ContextOption,
    /// Fields that were given but could not be read. The matching field above
    /// stays `None`.
    pub rejected: Vec<RejectedField>,
}

impl Options {
    /// Empty options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the channel count.
    pub fn with_channels(mut self, channels: usize) -> Self {
        self.channels = Some(channels);
        self
    }

    /// Sets the sample rate.
    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = Some(sample_rate);
        self
    }

    /// Sets the format from a descriptor string or descriptor.
    pub fn with_format(mut self, format: impl Into<FormatSpec>) -> Self {
        self.format = Some(format.into());
        self
    }

    /// Sets the length of an empty buffer.
    pub fn with_length(mut self, length: usize) -> Self {
        self.length = Some(length);
        self
    }

    /// Sets the duration of an empty buffer.
    pub fn with_duration(mut self, seconds: f64) -> Self {
        self.duration = Some(seconds);
        self
    }

    /// Attaches the destination to `context`.
    pub fn with_context(mut self, context: AudioContext) -> Self {
        self.context = ContextOption::Explicit(context);
        self
    }

    /// Forces a container without context.
    pub fn without_context(mut self) -> Self {
        self.context = ContextOption::Null;
        self
    }

    fn is_set(&self, name: &str) -> bool {
        match name {
            "channels" => self.channels.is_some(),
            "sampleRate" => self.sample_rate.is_some(),
            "format" => self.format.is_some(),
            "length" => self.length.is_some(),
            "duration" => self.duration.is_some(),
            _ => false,
        }
    }

    /// Fills every field that is still open from `other`.
    pub fn or(mut self, other: Options) -> Options {
        let mut rejected = std::mem::take(&mut self.rejected);
        rejected.extend(
            other
                .rejected
                .into_iter()
                .filter(|field| !self.is_set(field.name)),
        );
        Options {
            channels: self.channels.or(other.channels),
            sample_rate: self.sample_rate.or(other.sample_rate),
            format: self.format.or(other.format),
            length: self.length.or(other.length),
            duration: self.duration.or(other.duration),
            context: if self.context.is_unspecified() {
                other.context
            } else {
                self.context
            },
            rejected,
        }
    }

    /// Parses the explicit format, if any.
    pub fn explicit_format(
        &self,
        config: &NormalizeConfig,
    ) -> Result<Option<FormatDescriptor>, StrictError> {
        self.format.as_ref().map(|format| format.parse(config)).transpose()
    }

    /// Rejects out-of-domain values in strict mode.
    fn validate(&self, config: &NormalizeConfig) -> Result<(), StrictError> {
        if config.lenient_defaults {
            for field in &self.rejected {
                tracing::warn!(field = field.name, value = %field.value, "ignoring malformed option");
            }
            return Ok(());
        }
        // A bad length is reported by allocation in both modes.
        if let Some(field) = self.rejected.iter().find(|f| f.name != "length") {
            return Err(StrictError::invalid_option(
                field.name,
                format!("{} is not a usable value", field.value),
            ));
        }
        if self.channels == Some(0) {
            return Err(StrictError::invalid_option("channels", "must be >= 1"));
        }
        if self.sample_rate == Some(0) {
            return Err(StrictError::invalid_option("sampleRate", "must be > 0"));
        }
        if let Some(duration) = self.duration {
            if !duration.is_finite() || duration < 0.0 {
                return Err(StrictError::invalid_option(
                    "duration",
                    format!("{duration} is not a non-negative number of seconds"),
                ));
            }
        }
        Ok(())
    }

    /// Resolves channel count, sample rate and format against `hints`.
    ///
    /// The explicit format wins field by field over the format the source
    /// carries.
    ///
    /// # Errors
    /// Only in strict mode, see the module documentation.
    pub fn resolve(
        &self,
        hints: &SourceHints,
        config: &NormalizeConfig,
    ) -> Result<Resolution, StrictError> {
        self.validate(config)?;
        let format = match (self.explicit_format(config)?, hints.format) {
            (Some(explicit), Some(embedded)) => Some(explicit.or(embedded)),
            (explicit, embedded) => explicit.or(embedded),
        };
        let implied = format.unwrap_or_default();

        let (channels, channels_origin) = pick(
            self.channels.filter(|&n| n > 0),
            hints.channels.filter(|&n| n > 0),
            implied.implied_channels(),
            config.default_channels.max(1),
        );
        let (sample_rate, rate_origin) = pick(
            self.sample_rate.filter(|&r| r > 0),
            hints.sample_rate.filter(|&r| r > 0),
            implied.implied_sample_rate(),
            config.default_sample_rate.max(1),
        );

        Ok(Resolution {
            channels,
            sample_rate,
            format,
            layout_hint: hints.layout,
            provenance: Provenance {
                channels: channels_origin,
                sample_rate: rate_origin,
            },
        })
    }

    /// Length of an empty buffer: `length`, else `round(duration × sample_rate)`,
    /// else zero.
    ///
    /// # Errors
    /// [`AllocationError::InvalidLength`] if `length` was given but is not a
    /// non-negative whole number. A bad duration fails only in strict mode.
    pub fn empty_length(
        &self,
        sample_rate: u32,
        config: &NormalizeConfig,
    ) -> AudioBufferResult<usize> {
        if let Some(field) = self.rejected.iter().find(|f| f.name == "length") {
            return Err(AllocationError::InvalidLength(field.value.clone()).into());
        }
        if let Some(length) = self.length {
            return Ok(length);
        }
        match self.duration {
            None => Ok(0),
            Some(duration) => Ok(length_for_duration(duration, sample_rate, config)?),
        }
    }
}

/// `round(sample_rate × duration)`; negative or non-finite durations give zero in
/// lenient mode.
pub fn length_for_duration(
    duration: f64,
    sample_rate: u32,
    config: &NormalizeConfig,
) -> Result<usize, StrictError> {
    let samples = (sample_rate as f64 * duration).round();
    if samples.is_finite() && samples >= 0.0 {
        return Ok(samples as usize);
    }
    if config.lenient_defaults {
        tracing::warn!(duration, "unusable duration, falling back to zero length");
        Ok(0)
    } else {
        Err(StrictError::invalid_option(
            "duration",
            format!("{duration} is not a non-negative number of seconds"),
        ))
    }
}

fn pick<T>(explicit: Option<T>, source: Option<T>, format: Option<T>, default: T) -> (T, Origin) {
    if let Some(v) = explicit {
        (v, Origin::Options)
    } else if let Some(v) = source {
        (v, Origin::Source)
    } else if let Some(v) = format {
        (v, Origin::Format)
    } else {
        (default, Origin::Default)
    }
}

/// Options as they arrive at the normalizer.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum OptionsArg {
    /// No options.
    #[default]
    None,
    /// A bare number: shorthand for `{channels: n}`.
    Channels(usize),
    /// A bare string: shorthand for `{format: s}`.
    Format(String),
    /// A full options record.
    Options(Options),
}

impl OptionsArg {
    /// Expands shorthands into a full record. `None` means no options were given.
    pub fn into_options(self) -> Option<Options> {
        match self {
            OptionsArg::None => None,
            OptionsArg::Channels(channels) => Some(Options::new().with_channels(channels)),
            OptionsArg::Format(format) => Some(Options::new().with_format(format)),
            OptionsArg::Options(options) => Some(options),
        }
    }

    /// Classifies a loosely typed JSON value: numbers are channel counts, strings
    /// are formats, objects are records and anything else is no options.
    ///
    /// A number that is not a whole channel count becomes a record with a
    /// rejected `channels` field.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Number(_) => match whole::<usize>(value) {
                Some(channels) => OptionsArg::Channels(channels),
                None => OptionsArg::Options(Options {
                    rejected: vec![RejectedField {
                        name: "channels",
                        value: value.to_string(),
                    }],
                    ..Options::default()
                }),
            },
            Value::String(format) => OptionsArg::Format(format.clone()),
            Value::Object(_) => serde_json::from_value(value.clone())
                .map(OptionsArg::Options)
                .unwrap_or_default(),
            _ => OptionsArg::None,
        }
    }
}

impl From<()> for OptionsArg {
    fn from(_: ()) -> Self {
        OptionsArg::None
    }
}

impl From<usize> for OptionsArg {
    fn from(channels: usize) -> Self {
        OptionsArg::Channels(channels)
    }
}

impl From<&str> for OptionsArg {
    fn from(format: &str) -> Self {
        OptionsArg::Format(format.to_string())
    }
}

impl From<String> for OptionsArg {
    fn from(format: String) -> Self {
        OptionsArg::Format(format)
    }
}

impl From<Options> for OptionsArg {
    fn from(options: Options) -> Self {
        OptionsArg::Options(options)
    }
}

impl From<Option<Options>> for OptionsArg {
    fn from(options: Option<Options>) -> Self {
        options.map_or(OptionsArg::None, OptionsArg::Options)
    }
}

/// Values a source carries about itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourceHints {
    /// Channel count implied by the source's shape.
    pub channels: Option<usize>,
    /// Sample rate embedded in the source.
    pub sample_rate: Option<u32>,
    /// Layout implied by the source's shape.
    pub layout: Option<ChannelLayout>,
    /// Format descriptor embedded in the source. It ranks with the explicit
    /// format, below it.
    pub format: Option<FormatDescriptor>,
}

/// Which precedence level supplied a resolved value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Explicit options.
    Options,
    /// The source's own shape or metadata.
    Source,
    /// The format descriptor.
    Format,
    /// Configuration defaults.
    Default,
}

/// Origin of each resolved field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Provenance {
    /// Where the channel count came from.
    pub channels: Origin,
    /// Where the sample rate came from.
    pub sample_rate: Origin,
}

/// Output of [`Options::resolve`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    /// Resolved channel count, always at least 1.
    pub channels: usize,
    /// Resolved sample rate, always positive.
    pub sample_rate: u32,
    /// Explicit format merged over the source's embedded format.
    pub format: Option<FormatDescriptor>,
    /// Layout implied by the source, used when the format names none.
    pub layout_hint: Option<ChannelLayout>,
    /// Which level supplied each value.
    pub provenance: Provenance,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AudioBufferError;
    use crate::format::SampleEncoding;

    #[test]
    fn test_defaults_when_nothing_given() {
        let resolution = Options::new()
            .resolve(&SourceHints::default(), &NormalizeConfig::default())
            .unwrap();
        assert_eq!(resolution.channels, 1);
        assert_eq!(resolution.sample_rate, 44100);
        assert_eq!(resolution.provenance.channels, Origin::Default);
        assert_eq!(resolution.provenance.sample_rate, Origin::Default);
    }

    #[test]
    fn test_explicit_beats_source_beats_format() {
        let hints = SourceHints {
            channels: Some(3),
            sample_rate: Some(22050),
            ..SourceHints::default()
        };
        let options = Options::new().with_format("stereo 96000");
        let resolution = options.resolve(&hints, &NormalizeConfig::default()).unwrap();
        assert_eq!(resolution.channels, 3);
        assert_eq!(resolution.provenance.channels, Origin::Source);
        assert_eq!(resolution.sample_rate, 22050);

        let resolution = options
            .clone()
            .with_channels(5)
            .resolve(&hints, &NormalizeConfig::default())
            .unwrap();
        assert_eq!(resolution.channels, 5);
        assert_eq!(resolution.provenance.channels, Origin::Options);

        let resolution = options
            .resolve(&SourceHints::default(), &NormalizeConfig::default())
            .unwrap();
        assert_eq!(resolution.channels, 2);
        assert_eq!(resolution.sample_rate, 96000);
        assert_eq!(resolution.provenance.sample_rate, Origin::Format);
    }

    #[test]
    fn test_zero_values_fall_through_when_lenient() {
        let options = Options::new().with_channels(0).with_sample_rate(0);
        let resolution = options
            .resolve(&SourceHints::default(), &NormalizeConfig::default())
            .unwrap();
        assert_eq!(resolution.channels, 1);
        assert_eq!(resolution.sample_rate, 44100);

        let err = options
            .resolve(&SourceHints::default(), &NormalizeConfig::strict())
            .unwrap_err();
        assert!(matches!(err, StrictError::InvalidOption { name: "channels", .. }));
    }

    #[test]
    fn test_unknown_format_token_only_fails_strict() {
        let options = Options::new().with_format("float32 sparkly");
        let lenient = options
            .resolve(&SourceHints::default(), &NormalizeConfig::default())
            .unwrap();
        assert_eq!(
            lenient.format.and_then(|f| f.encoding),
            Some(SampleEncoding::Float32)
        );
        assert_eq!(
            options
                .resolve(&SourceHints::default(), &NormalizeConfig::strict())
                .unwrap_err(),
            StrictError::UnknownFormatToken("sparkly".into())
        );
    }

    #[test]
    fn test_empty_length_from_duration() {
        let config = NormalizeConfig::default();
        assert_eq!(
            Options::new().with_duration(0.5).empty_length(44100, &config),
            Ok(22050)
        );
        assert_eq!(
            Options::new().with_duration(0.0).empty_length(44100, &config),
            Ok(0)
        );
        assert_eq!(
            Options::new()
                .with_length(7)
                .with_duration(1.0)
                .empty_length(44100, &config),
            Ok(7)
        );
        assert_eq!(Options::new().empty_length(44100, &config), Ok(0));
        assert_eq!(length_for_duration(-1.0, 44100, &config), Ok(0));
        assert!(length_for_duration(-1.0, 44100, &NormalizeConfig::strict()).is_err());
    }

    #[test]
    fn test_aliases_and_rejected_fields() {
        let options: Options = serde_json::from_str(
            r#"{"channelCount": 2, "sampleRate": "fast", "length": -4, "context": null}"#,
        )
        .unwrap();
        assert_eq!(options.channels, Some(2));
        assert_eq!(options.sample_rate, None);
        assert_eq!(options.length, None);
        assert_eq!(options.context, ContextOption::Null);
        let names: Vec<_> = options.rejected.iter().map(|f| f.name).collect();
        assert_eq!(names, ["sampleRate", "length"]);
        assert_eq!(options.rejected[1].value, "-4");

        let options: Options = serde_json::from_str(r#"{"rate": 12000}"#).unwrap();
        assert_eq!(options.sample_rate, Some(12000));
        assert!(options.context.is_unspecified());
    }

    #[test]
    fn test_format_descriptor_object() {
        let options: Options =
            serde_json::from_str(r#"{"format": {"encoding": "int16", "channels": 4}}"#).unwrap();
        let format = options
            .explicit_format(&NormalizeConfig::default())
            .unwrap()
            .unwrap();
        assert_eq!(format.encoding, Some(SampleEncoding::Int16));
        assert_eq!(format.channels, Some(4));
    }

    #[test]
    fn test_shorthand_args() {
        assert_eq!(
            OptionsArg::from(2usize).into_options(),
            Some(Options::new().with_channels(2))
        );
        assert_eq!(
            OptionsArg::from("stereo").into_options(),
            Some(Options::new().with_format("stereo"))
        );
        assert_eq!(OptionsArg::from(()).into_options(), None);
        assert_eq!(
            OptionsArg::from_json(&serde_json::json!(3)),
            OptionsArg::Channels(3)
        );
        assert_eq!(
            OptionsArg::from_json(&serde_json::json!(2.0)),
            OptionsArg::Channels(2)
        );
        let OptionsArg::Options(options) = OptionsArg::from_json(&serde_json::json!(-2)) else {
            panic!("negative channel count should become a record");
        };
        assert_eq!(options.channels, None);
        assert_eq!(options.rejected[0].name, "channels");
    }

    #[test]
    fn test_whole_floats_are_accepted() {
        let options: Options = serde_json::from_str(
            r#"{"sampleRate": 48000.0, "channels": 2.0, "length": 10.0}"#,
        )
        .unwrap();
        assert_eq!(options.sample_rate, Some(48000));
        assert_eq!(options.channels, Some(2));
        assert_eq!(options.length, Some(10));
        assert!(options.rejected.is_empty());

        let options: Options = serde_json::from_str(r#"{"channels": 1.5}"#).unwrap();
        assert_eq!(options.channels, None);
        assert_eq!(options.rejected.len(), 1);
    }

    #[test]
    fn test_rejected_fields_fail_strict() {
        let options: Options = serde_json::from_str(r#"{"channels": -2}"#).unwrap();
        let lenient = options
            .resolve(&SourceHints::default(), &NormalizeConfig::default())
            .unwrap();
        assert_eq!(lenient.channels, 1);
        assert_eq!(
            options
                .resolve(&SourceHints::default(), &NormalizeConfig::strict())
                .unwrap_err(),
            StrictError::invalid_option("channels", "-2 is not a usable value")
        );
    }

    #[test]
    fn test_rejected_length_is_an_allocation_error() {
        let options: Options = serde_json::from_str(r#"{"length": -5}"#).unwrap();
        for config in [NormalizeConfig::default(), NormalizeConfig::strict()] {
            assert_eq!(
                options.empty_length(44100, &config).unwrap_err(),
                AudioBufferError::from(AllocationError::InvalidLength("-5".into()))
            );
        }
    }

    #[test]
    fn test_embedded_format_ranks_below_explicit() {
        let hints = SourceHints {
            format: Some(FormatDescriptor::parse_lenient("int16 stereo 8000")),
            ..SourceHints::default()
        };
        let resolution = Options::new()
            .with_format("float32")
            .resolve(&hints, &NormalizeConfig::default())
            .unwrap();
        let format = resolution.format.unwrap();
        assert_eq!(format.encoding, Some(SampleEncoding::Float32));
        assert_eq!(resolution.channels, 2);
        assert_eq!(resolution.provenance.channels, Origin::Format);
        assert_eq!(resolution.sample_rate, 8000);
    }

    #[test]
    fn test_or_keeps_own_values() {
        let merged = Options::new()
            .with_channels(2)
            .or(Options::new().with_channels(4).with_length(10).without_context());
        assert_eq!(merged.channels, Some(2));
        assert_eq!(merged.length, Some(10));
        assert_eq!(merged.context, ContextOption::Null);

        let config: Options = serde_json::from_str(r#"{"channels": -1, "duration": "x"}"#).unwrap();
        let merged = Options::new().with_channels(2).or(config);
        let names: Vec<_> = merged.rejected.iter().map(|f| f.name).collect();
        assert_eq!(names, ["duration"]);
    }
}
