//! FFmpeg collaborator using libav bindings
//!
//! Opening and probing a source, and creating a destination and opening its
//! byte sink, are separate libav calls here so the relay engine can track each
//! step. `ffmpeg_next::format::input`/`output` would fold them together.

mod input;
mod output;

pub use input::LibavInput;
pub use output::LibavOutput;

use ffmpeg_next::{codec, Packet};

use crate::error::RemuxResult;
use crate::ports::{MediaBackend, MediaPacket};

/// Media backend over FFmpeg's libavformat
#[derive(Debug, Clone)]
pub struct LibavBackend {
    _private: (),
}

impl LibavBackend {
    /// Create the backend; performs the process-wide FFmpeg initialization once
    pub fn new() -> RemuxResult<Self> {
        crate::init()?;
        Ok(Self { _private: () })
    }
}

impl MediaBackend for LibavBackend {
    type Parameters = codec::Parameters;
    type Packet = Packet;
    type Input = LibavInput;
    type Output = LibavOutput;

    fn open_input(&self, locator: &str) -> RemuxResult<LibavInput> {
        LibavInput::open(locator)
    }

    fn create_output(&self, locator: &str, format: Option<&str>) -> RemuxResult<LibavOutput> {
        LibavOutput::create(locator, format)
    }
}

// libav keeps "unknown" as AV_NOPTS_VALUE for timestamps and -1 for position;
// ffmpeg-next already maps the former to `None`.
impl MediaPacket for Packet {
    fn stream_index(&self) -> usize {
        Packet::stream(self)
    }

    fn set_stream_index(&mut self, index: usize) {
        Packet::set_stream(self, index)
    }

    fn pts(&self) -> Option<i64> {
        Packet::pts(self)
    }

    fn set_pts(&mut self, pts: Option<i64>) {
        Packet::set_pts(self, pts)
    }

    fn dts(&self) -> Option<i64> {
        Packet::dts(self)
    }

    fn set_dts(&mut self, dts: Option<i64>) {
        Packet::set_dts(self, dts)
    }

    fn duration(&self) -> i64 {
        Packet::duration(self)
    }

    fn set_duration(&mut self, duration: i64) {
        Packet::set_duration(self, duration)
    }

    fn position(&self) -> Option<u64> {
        u64::try_from(Packet::position(self)).ok()
    }

    fn set_position(&mut self, position: Option<u64>) {
        Packet::set_position(self, position.map_or(-1, |pos| pos as isize))
    }

    fn size(&self) -> usize {
        Packet::size(self)
    }
}
