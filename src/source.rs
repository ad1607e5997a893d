//! The shapes a normalization source can take.
//!
//! [`AudioSource`] is a closed tagged union over every input shape the normalizer
//! accepts. Rust-native inputs are converted with `From` impls, which know their
//! shape statically. Loosely typed inputs arrive as `serde_json::Value` and go
//! through [`AudioSource::from_json`], a single ordered matcher where the first
//! matching rule wins:
//!
//! 1. `null` (or `false`/`true`) → [`AudioSource::Empty`]
//! 2. a non-negative number → [`AudioSource::Count`]; any other number →
//!    [`AudioSource::InvalidCount`]
//! 3. a string → encoded text
//! 4. an array whose first element is an array → [`AudioSource::Channels`]
//! 5. any other array → plain numbers
//! 6. an object with `shape` and a data facet → [`AudioSource::Grid`]
//! 7. an object with a usable `data` / `buffer` / `channelData` facet →
//!    [`AudioSource::Wrapped`]
//! 8. any other object → [`AudioSource::Config`]
//!
//! Wrapper shapes ([`GridSource`], [`WrappedSource`]) hold a [`Facet`], which can
//! only be flat data or separated channels. A wrapper therefore unwraps exactly
//! once, and a nested wrapper is never produced.

use ndarray::{Array2, ArrayView2};
use serde_json::{Map, Value};
use std::borrow::Cow;

use crate::error::DecodeError;
use crate::format::{Endianness, FormatDescriptor, RawSamples, SampleEncoding};
use crate::options::{FormatSpec, Options, whole_number};
use crate::repr::{AudioBuffer, SampleContainer};
use crate::text::decode_text;

/// Typed numeric arrays, the equivalent of JavaScript typed arrays.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedSamples<'a> {
    /// Byte buffer. Detected as `uint8`.
    U8(Cow<'a, [u8]>),
    /// Signed bytes.
    I8(Cow<'a, [i8]>),
    /// Unsigned 16-bit.
    U16(Cow<'a, [u16]>),
    /// Signed 16-bit.
    I16(Cow<'a, [i16]>),
    /// Unsigned 32-bit.
    U32(Cow<'a, [u32]>),
    /// Signed 32-bit.
    I32(Cow<'a, [i32]>),
    /// Single precision floats.
    F32(Cow<'a, [f32]>),
    /// Double precision floats.
    F64(Cow<'a, [f64]>),
}

impl TypedSamples<'_> {
    /// Element encoding of the array.
    pub const fn encoding(&self) -> SampleEncoding {
        match self {
            TypedSamples::U8(_) => SampleEncoding::Uint8,
            TypedSamples::I8(_) => SampleEncoding::Int8,
            TypedSamples::U16(_) => SampleEncoding::Uint16,
            TypedSamples::I16(_) => SampleEncoding::Int16,
            TypedSamples::U32(_) => SampleEncoding::Uint32,
            TypedSamples::I32(_) => SampleEncoding::Int32,
            TypedSamples::F32(_) => SampleEncoding::Float32,
            TypedSamples::F64(_) => SampleEncoding::Float64,
        }
    }

    /// The array's storage as native-endian bytes.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            TypedSamples::U8(v) => &**v,
            TypedSamples::I8(v) => bytemuck::cast_slice(&**v),
            TypedSamples::U16(v) => bytemuck::cast_slice(&**v),
            TypedSamples::I16(v) => bytemuck::cast_slice(&**v),
            TypedSamples::U32(v) => bytemuck::cast_slice(&**v),
            TypedSamples::I32(v) => bytemuck::cast_slice(&**v),
            TypedSamples::F32(v) => bytemuck::cast_slice(&**v),
            TypedSamples::F64(v) => bytemuck::cast_slice(&**v),
        }
    }
}

/// Flat, byte- or number-bearing payloads that go through the decode path.
#[derive(Debug, Clone, PartialEq)]
pub enum FlatData<'a> {
    /// A typed numeric array.
    Typed(TypedSamples<'a>),
    /// A generic binary buffer with no element type.
    Binary(Cow<'a, [u8]>),
    /// A plain array of numbers.
    Numbers(Cow<'a, [f64]>),
    /// Base64, data URI or raw byte string.
    Text(Cow<'a, str>),
}

impl FlatData<'_> {
    /// Hands the payload to the codec, decoding text into bytes first.
    ///
    /// # Errors
    /// [`DecodeError::InvalidPayload`] if a text payload cannot be decoded.
    pub fn to_raw(&self) -> Result<RawSamples<'_>, DecodeError> {
        let raw = match self {
            FlatData::Typed(typed) => RawSamples::Typed {
                bytes: Cow::Borrowed(typed.as_bytes()),
                encoding: typed.encoding(),
                endianness: Endianness::native(),
            },
            FlatData::Binary(bytes) => RawSamples::Untyped(Cow::Borrowed(&**bytes)),
            FlatData::Numbers(values) => RawSamples::Values(Cow::Borrowed(&**values)),
            FlatData::Text(text) => RawSamples::Untyped(Cow::Owned(decode_text(text)?)),
        };
        Ok(raw)
    }
}

/// One channel of an already-separated source.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelData<'a> {
    /// 32-bit floats, reused as they are.
    Float32(Cow<'a, [f32]>),
    /// Any other numbers, coerced to `f32` without rescaling.
    Numbers(Cow<'a, [f64]>),
}

impl ChannelData<'_> {
    /// Number of samples in the channel.
    pub fn len(&self) -> usize {
        match self {
            ChannelData::Float32(v) => v.len(),
            ChannelData::Numbers(v) => v.len(),
        }
    }

    /// True if the channel holds no samples.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The channel as `f32`, borrowed when no coercion is needed.
    pub fn as_f32(&self) -> Cow<'_, [f32]> {
        match self {
            ChannelData::Float32(v) => Cow::Borrowed(&**v),
            ChannelData::Numbers(v) => Cow::Owned(v.iter().map(|&x| x as f32).collect()),
        }
    }
}

/// The real data behind a wrapper shape.
#[derive(Debug, Clone, PartialEq)]
pub enum Facet<'a> {
    /// Flat data to decode.
    Flat(FlatData<'a>),
    /// Already separated channels.
    Channels(Vec<ChannelData<'a>>),
}

/// A `rows × channels` grid with optional format metadata (ndarray-like).
#[derive(Debug, Clone, PartialEq)]
pub struct GridSource<'a> {
    /// Dimensions; `shape[1]` is the channel count.
    pub shape: Vec<usize>,
    /// Row-major grid data, flat or one nested array per row.
    pub data: Facet<'a>,
    /// Embedded format metadata, as text or a descriptor.
    pub format: Option<FormatSpec>,
}

impl GridSource<'_> {
    /// Nested rows joined into one frame-ordered run of numbers.
    ///
    /// Returns `None` when the data is flat, or when `shape[0]` is given and
    /// does not match the number of nested arrays. Those arrays are then read
    /// as separate channels.
    pub fn flattened_rows(&self) -> Option<FlatData<'static>> {
        let Facet::Channels(rows) = &self.data else {
            return None;
        };
        if self.shape.first().is_some_and(|&n| n != rows.len()) {
            return None;
        }
        let mut values = Vec::with_capacity(rows.iter().map(ChannelData::len).sum());
        for row in rows {
            match row {
                ChannelData::Float32(v) => values.extend(v.iter().map(|&x| f64::from(x))),
                ChannelData::Numbers(v) => values.extend_from_slice(v),
            }
        }
        Some(FlatData::Numbers(Cow::Owned(values)))
    }

    /// Width of the first nested row, if the data is nested.
    pub fn row_width(&self) -> Option<usize> {
        match &self.data {
            Facet::Channels(rows) => rows.first().map(ChannelData::len),
            Facet::Flat(_) => None,
        }
    }
}

/// An object whose only usable part is its data facet, plus whatever channel
/// count and sample rate it advertises.
#[derive(Debug, Clone, PartialEq)]
pub struct WrappedSource<'a> {
    /// The data facet.
    pub data: Facet<'a>,
    /// Advertised channel count.
    pub channels: Option<usize>,
    /// Advertised sample rate.
    pub sample_rate: Option<u32>,
}

/// Every accepted source shape.
pub enum AudioSource<'a> {
    /// No source: an empty buffer sized by the options.
    Empty,
    /// A configuration record passed where the source goes.
    Config(Options),
    /// An existing sample container to clone.
    Container(&'a dyn SampleContainer),
    /// A length: that many silent samples.
    Count(usize),
    /// A number that cannot be a length (negative, say). Allocation rejects it.
    InvalidCount(String),
    /// One array per channel.
    Channels(Vec<ChannelData<'a>>),
    /// A grid with shape and optional format metadata.
    Grid(GridSource<'a>),
    /// A data-holding wrapper.
    Wrapped(WrappedSource<'a>),
    /// Raw, typed, numeric or encoded data.
    Flat(FlatData<'a>),
}

impl std::fmt::Debug for AudioSource<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AudioSource::Empty => write!(f, "Empty"),
            AudioSource::Config(options) => f.debug_tuple("Config").field(options).finish(),
            AudioSource::Container(c) => write!(
                f,
                "Container({} ch × {} @ {} Hz)",
                c.num_channels(),
                c.length(),
                c.sample_rate()
            ),
            AudioSource::Count(n) => f.debug_tuple("Count").field(n).finish(),
            AudioSource::InvalidCount(n) => f.debug_tuple("InvalidCount").field(n).finish(),
            AudioSource::Channels(ch) => f.debug_tuple("Channels").field(ch).finish(),
            AudioSource::Grid(grid) => f.debug_tuple("Grid").field(grid).finish(),
            AudioSource::Wrapped(w) => f.debug_tuple("Wrapped").field(w).finish(),
            AudioSource::Flat(data) => f.debug_tuple("Flat").field(data).finish(),
        }
    }
}

impl<'a> AudioSource<'a> {
    /// Short name of the shape, for logs.
    pub const fn kind(&self) -> &'static str {
        match self {
            AudioSource::Empty => "empty",
            AudioSource::Config(_) => "config",
            AudioSource::Container(_) => "container",
            AudioSource::Count(_) => "count",
            AudioSource::InvalidCount(_) => "invalid count",
            AudioSource::Channels(_) => "channels",
            AudioSource::Grid(_) => "grid",
            AudioSource::Wrapped(_) => "wrapped",
            AudioSource::Flat(_) => "flat",
        }
    }

    /// Any sample container.
    pub fn container(container: &'a dyn SampleContainer) -> Self {
        AudioSource::Container(container)
    }

    /// A generic binary buffer with no element type.
    pub fn binary(bytes: impl Into<Cow<'a, [u8]>>) -> Self {
        AudioSource::Flat(FlatData::Binary(bytes.into()))
    }

    /// A plain array of numbers.
    pub fn numbers(values: impl Into<Cow<'a, [f64]>>) -> Self {
        AudioSource::Flat(FlatData::Numbers(values.into()))
    }

    /// An encoded text payload.
    pub fn text(text: impl Into<Cow<'a, str>>) -> Self {
        AudioSource::Flat(FlatData::Text(text.into()))
    }

    /// A `rows × channels` grid over flat data.
    pub fn grid(shape: Vec<usize>, data: FlatData<'a>, format: Option<FormatDescriptor>) -> Self {
        AudioSource::Grid(GridSource {
            shape,
            data: Facet::Flat(data),
            format: format.map(FormatSpec::from),
        })
    }

    /// Classifies a loosely typed value. Never fails; see the module docs for the
    /// rule order.
    pub fn from_json(value: &Value) -> AudioSource<'static> {
        match value {
            Value::Null | Value::Bool(_) => AudioSource::Empty,
            Value::Number(n) => match n.as_u64().and_then(|c| usize::try_from(c).ok()) {
                Some(count) => AudioSource::Count(count),
                None => match n.as_f64() {
                    Some(x) if x.is_finite() && x >= 0.0 && x < usize::MAX as f64 => {
                        AudioSource::Count(x.floor() as usize)
                    }
                    _ => AudioSource::InvalidCount(n.to_string()),
                },
            },
            Value::String(text) => AudioSource::Flat(FlatData::Text(Cow::Owned(text.clone()))),
            Value::Array(items) => match facet_from_array(items) {
                Facet::Channels(channels) => AudioSource::Channels(channels),
                Facet::Flat(flat) => AudioSource::Flat(flat),
            },
            Value::Object(map) => classify_object(map),
        }
    }
}

fn numbers_from(items: &[Value]) -> Vec<f64> {
    items.iter().map(|v| v.as_f64().unwrap_or(0.0)).collect()
}

fn facet_from_array(items: &[Value]) -> Facet<'static> {
    if matches!(items.first(), Some(Value::Array(_))) {
        let channels = items
            .iter()
            .map(|item| {
                let values = item.as_array().map(|a| numbers_from(a)).unwrap_or_default();
                ChannelData::Numbers(Cow::Owned(values))
            })
            .collect();
        Facet::Channels(channels)
    } else {
        Facet::Flat(FlatData::Numbers(Cow::Owned(numbers_from(items))))
    }
}

/// Extracts a usable facet from a nested value. Objects and scalars are not usable.
fn facet_from_value(value: &Value) -> Option<Facet<'static>> {
    match value {
        Value::Array(items) => Some(facet_from_array(items)),
        Value::String(text) => Some(Facet::Flat(FlatData::Text(Cow::Owned(text.clone())))),
        _ => None,
    }
}

fn first_u64(map: &Map<String, Value>, keys: &[&str]) -> Option<u64> {
    keys.iter()
        .find_map(|key| map.get(*key).and_then(whole_number))
        .filter(|&n| n > 0)
}

fn classify_object(map: &Map<String, Value>) -> AudioSource<'static> {
    let facet = ["data", "buffer", "channelData"]
        .iter()
        .find_map(|key| map.get(*key).and_then(facet_from_value));

    let Some(facet) = facet else {
        let options = serde_json::from_value(Value::Object(map.clone())).unwrap_or_default();
        return AudioSource::Config(options);
    };

    if let Some(shape) = map.get("shape").and_then(Value::as_array) {
        let shape = shape
            .iter()
            .map(|d| whole_number(d).map_or(0, |n| n as usize))
            .collect();
        let format = map
            .get("format")
            .and_then(|f| serde_json::from_value::<FormatSpec>(f.clone()).ok());
        return AudioSource::Grid(GridSource {
            shape,
            data: facet,
            format,
        });
    }

    AudioSource::Wrapped(WrappedSource {
        data: facet,
        channels: first_u64(map, &["numberOfChannels", "channels", "channelCount"])
            .map(|n| n as usize),
        sample_rate: first_u64(map, &["sampleRate", "rate"]).and_then(|r| u32::try_from(r).ok()),
    })
}

// ========================
// Conversions
// ========================

macro_rules! impl_typed_source {
    ($t:ty, $variant:ident) => {
        impl<'a> From<&'a [$t]> for AudioSource<'a> {
            fn from(samples: &'a [$t]) -> Self {
                AudioSource::Flat(FlatData::Typed(TypedSamples::$variant(Cow::Borrowed(samples))))
            }
        }

        impl<'a> From<Vec<$t>> for AudioSource<'a> {
            fn from(samples: Vec<$t>) -> Self {
                AudioSource::Flat(FlatData::Typed(TypedSamples::$variant(Cow::Owned(samples))))
            }
        }

        impl<'a> From<&'a Vec<$t>> for AudioSource<'a> {
            fn from(samples: &'a Vec<$t>) -> Self {
                AudioSource::from(samples.as_slice())
            }
        }
    };
}

impl_typed_source!(u8, U8);
impl_typed_source!(i8, I8);
impl_typed_source!(u16, U16);
impl_typed_source!(i16, I16);
impl_typed_source!(u32, U32);
impl_typed_source!(i32, I32);
impl_typed_source!(f32, F32);
impl_typed_source!(f64, F64);

impl From<()> for AudioSource<'_> {
    fn from(_: ()) -> Self {
        AudioSource::Empty
    }
}

impl From<usize> for AudioSource<'_> {
    fn from(count: usize) -> Self {
        AudioSource::Count(count)
    }
}

impl From<Options> for AudioSource<'_> {
    fn from(options: Options) -> Self {
        AudioSource::Config(options)
    }
}

impl<'a> From<&'a AudioBuffer> for AudioSource<'a> {
    fn from(buffer: &'a AudioBuffer) -> Self {
        AudioSource::Container(buffer)
    }
}

impl<'a> From<&'a str> for AudioSource<'a> {
    fn from(text: &'a str) -> Self {
        AudioSource::text(text)
    }
}

impl From<String> for AudioSource<'_> {
    fn from(text: String) -> Self {
        AudioSource::text(text)
    }
}

impl From<Vec<Vec<f32>>> for AudioSource<'_> {
    fn from(channels: Vec<Vec<f32>>) -> Self {
        AudioSource::Channels(
            channels
                .into_iter()
                .map(|c| ChannelData::Float32(Cow::Owned(c)))
                .collect(),
        )
    }
}

impl<'a> From<&'a [Vec<f32>]> for AudioSource<'a> {
    fn from(channels: &'a [Vec<f32>]) -> Self {
        AudioSource::Channels(
            channels
                .iter()
                .map(|c| ChannelData::Float32(Cow::Borrowed(c.as_slice())))
                .collect(),
        )
    }
}

impl<'a> From<Vec<&'a [f32]>> for AudioSource<'a> {
    fn from(channels: Vec<&'a [f32]>) -> Self {
        AudioSource::Channels(
            channels
                .into_iter()
                .map(|c| ChannelData::Float32(Cow::Borrowed(c)))
                .collect(),
        )
    }
}

impl From<Vec<Vec<f64>>> for AudioSource<'_> {
    fn from(channels: Vec<Vec<f64>>) -> Self {
        AudioSource::Channels(
            channels
                .into_iter()
                .map(|c| ChannelData::Numbers(Cow::Owned(c)))
                .collect(),
        )
    }
}

/// A `rows × channels` array is a grid whose rows are frames.
impl From<Array2<f32>> for AudioSource<'_> {
    fn from(grid: Array2<f32>) -> Self {
        let shape = grid.shape().to_vec();
        let data: Vec<f32> = grid.iter().copied().collect();
        AudioSource::grid(shape, FlatData::Typed(TypedSamples::F32(Cow::Owned(data))), None)
    }
}

impl<'a> From<ArrayView2<'a, f32>> for AudioSource<'a> {
    fn from(grid: ArrayView2<'a, f32>) -> Self {
        let shape = grid.shape().to_vec();
        let data = match grid.to_slice() {
            Some(slice) => Cow::Borrowed(slice),
            None => Cow::Owned(grid.iter().copied().collect()),
        };
        AudioSource::grid(shape, FlatData::Typed(TypedSamples::F32(data)), None)
    }
}

impl From<&Value> for AudioSource<'static> {
    fn from(value: &Value) -> Self {
        AudioSource::from_json(value)
    }
}

impl From<Value> for AudioSource<'static> {
    fn from(value: Value) -> Self {
        AudioSource::from_json(&value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scalar_classification() {
        assert_eq!(AudioSource::from_json(&json!(null)).kind(), "empty");
        assert!(matches!(
            AudioSource::from_json(&json!(100)),
            AudioSource::Count(100)
        ));
        assert!(matches!(
            AudioSource::from_json(&json!(2.7)),
            AudioSource::Count(2)
        ));
        match AudioSource::from_json(&json!(-3)) {
            AudioSource::InvalidCount(value) => assert_eq!(value, "-3"),
            other => panic!("expected an invalid count, got {other:?}"),
        }
        assert!(matches!(
            AudioSource::from_json(&json!("AP8A/w==")),
            AudioSource::Flat(FlatData::Text(_))
        ));
    }

    #[test]
    fn test_array_classification() {
        match AudioSource::from_json(&json!([[0, 0], [1, 1]])) {
            AudioSource::Channels(channels) => {
                assert_eq!(channels.len(), 2);
                assert_eq!(channels[1].as_f32().to_vec(), vec![1.0, 1.0]);
            }
            other => panic!("expected channels, got {other:?}"),
        }

        match AudioSource::from_json(&json!([0, -1, 0, 1])) {
            AudioSource::Flat(FlatData::Numbers(values)) => {
                assert_eq!(values.to_vec(), vec![0.0, -1.0, 0.0, 1.0]);
            }
            other => panic!("expected numbers, got {other:?}"),
        }
    }

    #[test]
    fn test_object_classification() {
        let grid = AudioSource::from_json(&json!({
            "data": [0, 0.5, -0.5, 0, 1, -1, -1, 1],
            "shape": [4, 2],
            "format": {"sampleRate": 48000}
        }));
        match grid {
            AudioSource::Grid(grid) => {
                assert_eq!(grid.shape, vec![4, 2]);
                let Some(FormatSpec::Descriptor(format)) = grid.format else {
                    panic!("expected a descriptor object");
                };
                assert_eq!(format.sample_rate, Some(48000));
            }
            other => panic!("expected grid, got {other:?}"),
        }

        let wrapped = AudioSource::from_json(&json!({
            "numberOfChannels": 2,
            "sampleRate": 8000,
            "buffer": [1, 2, 3, 4]
        }));
        match wrapped {
            AudioSource::Wrapped(w) => {
                assert_eq!(w.channels, Some(2));
                assert_eq!(w.sample_rate, Some(8000));
            }
            other => panic!("expected wrapped, got {other:?}"),
        }

        match AudioSource::from_json(&json!({"numberOfChannels": 2, "length": 5})) {
            AudioSource::Config(options) => {
                assert_eq!(options.channels, Some(2));
                assert_eq!(options.length, Some(5));
            }
            other => panic!("expected config, got {other:?}"),
        }
    }

    #[test]
    fn test_grid_format_string_is_kept() {
        let grid = AudioSource::from_json(&json!({
            "data": [0, 1, 0, 1],
            "shape": [2, 2],
            "format": "int16 stereo"
        }));
        match grid {
            AudioSource::Grid(grid) => {
                assert_eq!(grid.format, Some(FormatSpec::Text("int16 stereo".into())));
            }
            other => panic!("expected grid, got {other:?}"),
        }
    }

    #[test]
    fn test_nested_grid_rows_flatten_in_frame_order() {
        let AudioSource::Grid(grid) =
            AudioSource::from_json(&json!({"shape": [2, 2], "data": [[0, 0.5], [-0.5, 1]]}))
        else {
            panic!("expected grid");
        };
        assert_eq!(grid.row_width(), Some(2));
        assert_eq!(
            grid.flattened_rows(),
            Some(FlatData::Numbers(Cow::Owned(vec![0.0, 0.5, -0.5, 1.0])))
        );

        // Two arrays against four rows: these are channels, not rows.
        let AudioSource::Grid(grid) =
            AudioSource::from_json(&json!({"shape": [4, 2], "data": [[0, 1, 0, 1], [1, 0, 1, 0]]}))
        else {
            panic!("expected grid");
        };
        assert_eq!(grid.flattened_rows(), None);
    }

    #[test]
    fn test_nested_wrappers_are_config() {
        // A data facet that is itself an object is not unwrapped again.
        let source = AudioSource::from_json(&json!({"data": {"data": [1, 2]}}));
        assert_eq!(source.kind(), "config");
    }

    #[test]
    fn test_typed_bytes_are_native_endian() {
        let samples = [1i16, -2];
        let source = AudioSource::from(&samples[..]);
        let AudioSource::Flat(flat) = source else {
            panic!("expected flat data");
        };
        match flat.to_raw().unwrap() {
            RawSamples::Typed {
                bytes,
                encoding,
                endianness,
            } => {
                assert_eq!(encoding, SampleEncoding::Int16);
                assert_eq!(endianness, Endianness::native());
                assert_eq!(bytes.len(), 4);
            }
            other => panic!("expected typed samples, got {other:?}"),
        }
    }

    #[test]
    fn test_ndarray_grid() {
        let grid = Array2::from_shape_vec((2, 2), vec![0.0f32, 1.0, 1.0, 0.0]).unwrap();
        match AudioSource::from(grid) {
            AudioSource::Grid(grid) => assert_eq!(grid.shape, vec![2, 2]),
            other => panic!("expected grid, got {other:?}"),
        }
    }
}
