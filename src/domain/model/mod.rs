// Domain models - Core types and data structures

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::rescale;
use crate::error::{RemuxError, RemuxResult};

/// Timebase for timestamp calculations - rational number of seconds per tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Timebase {
    pub num: i32,
    pub den: i32,
}

impl Timebase {
    /// Create a new timebase; both terms must be strictly positive
    pub fn new(num: i32, den: i32) -> RemuxResult<Self> {
        if den <= 0 {
            return Err(RemuxError::invalid(format!(
                "Timebase denominator must be positive, got {}",
                den
            )));
        }
        if num <= 0 {
            return Err(RemuxError::invalid(format!(
                "Timebase numerator must be positive, got {}",
                num
            )));
        }
        Ok(Self { num, den })
    }

    /// Convert to floating point seconds per tick
    pub fn to_seconds(&self) -> f64 {
        self.num as f64 / self.den as f64
    }

    /// Rescale a timestamp from this timebase to `target`; unknown stays unknown
    pub fn rescale_ts(&self, ts: Option<i64>, target: Timebase) -> Option<i64> {
        rescale::rescale_ts(ts, *self, target)
    }

    /// Rescale a duration from this timebase to `target`
    pub fn rescale_duration(&self, duration: i64, target: Timebase) -> i64 {
        rescale::rescale_duration(duration, *self, target)
    }

    /// Convert a timestamp to seconds
    pub fn ts_to_seconds(&self, ts: i64) -> f64 {
        ts as f64 * self.to_seconds()
    }

    /// Format a timestamp the way FFmpeg's `av_ts2timestr` does
    pub fn format_ts(&self, ts: Option<i64>) -> String {
        match ts {
            Some(ts) => format!("{:.6}", self.ts_to_seconds(ts)),
            None => "NOPTS".to_string(),
        }
    }

    /// Microsecond timebase FFmpeg uses for container-level values
    pub fn av_time_base() -> Self {
        Self { num: 1, den: 1_000_000 }
    }

    pub fn millis() -> Self {
        Self { num: 1, den: 1000 }
    }
}

impl fmt::Display for Timebase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

/// Media kind of an elementary stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Audio,
    Video,
    Subtitle,
    Other,
}

impl MediaKind {
    pub const ALL: [MediaKind; 4] = [
        MediaKind::Audio,
        MediaKind::Video,
        MediaKind::Subtitle,
        MediaKind::Other,
    ];

    /// Parse media kind from string
    pub fn parse(kind_str: &str) -> RemuxResult<Self> {
        match kind_str.trim().to_lowercase().as_str() {
            "audio" | "a" => Ok(MediaKind::Audio),
            "video" | "v" => Ok(MediaKind::Video),
            "subtitle" | "sub" | "s" => Ok(MediaKind::Subtitle),
            "other" | "data" => Ok(MediaKind::Other),
            _ => Err(RemuxError::invalid(format!(
                "Invalid media kind: {}. Valid kinds: audio, video, subtitle, other",
                kind_str
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Audio => "audio",
            MediaKind::Video => "video",
            MediaKind::Subtitle => "subtitle",
            MediaKind::Other => "other",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One elementary stream inside a container.
///
/// `parameters` is the collaborator's codec-parameter blob. The core copies it
/// into the destination and never looks inside.
#[derive(Debug, Clone)]
pub struct StreamDescriptor<P> {
    pub index: usize,
    pub kind: MediaKind,
    pub codec_name: String,
    pub time_base: Timebase,
    pub bit_rate: Option<u64>,
    /// Container flagged this stream as the default of its kind
    pub is_default: bool,
    /// Hearing- or visually-impaired variant
    pub is_impaired: bool,
    /// Cleared when the source lacks what a muxer needs to carry the
    /// stream (no time base, or audio without channels or sample rate)
    pub is_usable: bool,
    pub parameters: P,
}

impl<P> StreamDescriptor<P> {
    pub fn new(index: usize, kind: MediaKind, time_base: Timebase, parameters: P) -> Self {
        Self {
            index,
            kind,
            codec_name: "unknown".to_string(),
            time_base,
            bit_rate: None,
            is_default: false,
            is_impaired: false,
            is_usable: true,
            parameters,
        }
    }

    pub fn with_codec(mut self, codec_name: impl Into<String>) -> Self {
        self.codec_name = codec_name.into();
        self
    }

    pub fn with_bit_rate(mut self, bit_rate: u64) -> Self {
        self.bit_rate = Some(bit_rate);
        self
    }

    pub fn with_default(mut self, is_default: bool) -> Self {
        self.is_default = is_default;
        self
    }

    pub fn with_impaired(mut self, is_impaired: bool) -> Self {
        self.is_impaired = is_impaired;
        self
    }

    pub fn with_usable(mut self, is_usable: bool) -> Self {
        self.is_usable = is_usable;
        self
    }

    /// Blob-free view of this descriptor for reporting
    pub fn summary(&self) -> StreamSummary {
        StreamSummary {
            index: self.index,
            kind: self.kind,
            codec: self.codec_name.clone(),
            time_base: self.time_base.to_string(),
            bit_rate: self.bit_rate,
            default: self.is_default,
            impaired: self.is_impaired,
            usable: self.is_usable,
        }
    }
}

/// Serializable stream summary used by `inspect`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamSummary {
    pub index: usize,
    pub kind: MediaKind,
    pub codec: String,
    pub time_base: String,
    pub bit_rate: Option<u64>,
    pub default: bool,
    pub impaired: bool,
    pub usable: bool,
}

/// Source to destination stream index mapping for a single selected stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamMapping {
    source_index: usize,
    destination_index: usize,
}

impl StreamMapping {
    pub fn single(source_index: usize, destination_index: usize) -> Self {
        Self {
            source_index,
            destination_index,
        }
    }

    /// Destination index for a source stream, `None` for unselected streams
    pub fn destination(&self, source_index: usize) -> Option<usize> {
        (source_index == self.source_index).then_some(self.destination_index)
    }

    pub fn source_index(&self) -> usize {
        self.source_index
    }

    pub fn destination_index(&self) -> usize {
        self.destination_index
    }
}
