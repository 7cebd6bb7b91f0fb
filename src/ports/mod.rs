// Ports - Interface definitions (contracts)

use crate::domain::model::*;
use crate::error::RemuxResult;

/// One encoded access unit as seen by the relay engine.
///
/// A packet owns its buffer: dropping it releases the buffer, and writing it
/// consumes it.
pub trait MediaPacket {
    fn stream_index(&self) -> usize;
    fn set_stream_index(&mut self, index: usize);

    /// `None` is the unknown timestamp
    fn pts(&self) -> Option<i64>;
    fn set_pts(&mut self, pts: Option<i64>);

    fn dts(&self) -> Option<i64>;
    fn set_dts(&mut self, dts: Option<i64>);

    /// 0 when unknown
    fn duration(&self) -> i64;
    fn set_duration(&mut self, duration: i64);

    /// Byte offset in the source container, `None` when unknown
    fn position(&self) -> Option<u64>;
    fn set_position(&mut self, position: Option<u64>);

    fn size(&self) -> usize;
}

/// Port for reading a source container (demuxer)
pub trait InputSession {
    type Parameters;
    type Packet: MediaPacket;

    /// Force full stream enumeration and metadata extraction
    fn probe(&mut self) -> RemuxResult<()>;

    /// Streams found by `probe`; empty before probing
    fn streams(&self) -> &[StreamDescriptor<Self::Parameters>];

    /// Short name of the detected container format
    fn format_name(&self) -> Option<String>;

    /// Next packet, `Ok(None)` at end of stream
    fn read_packet(&mut self) -> RemuxResult<Option<Self::Packet>>;

    /// Release the source; calling it again is a no-op
    fn close(&mut self);

    fn is_closed(&self) -> bool;
}

/// Port for writing a destination container (muxer)
pub trait OutputSession {
    type Parameters;
    type Packet: MediaPacket;

    /// Add a stream copying `source`'s codec parameters with a neutral codec tag
    fn declare_stream(&mut self, source: &StreamDescriptor<Self::Parameters>) -> RemuxResult<usize>;

    /// Whether the format writes through a byte sink the caller must open
    fn requires_sink(&self) -> bool;

    /// Open the byte sink; no-op for formats that manage their own I/O
    fn open_sink(&mut self) -> RemuxResult<()>;

    fn write_header(&mut self) -> RemuxResult<()>;

    /// Time base of a declared stream, final once the header is written
    fn stream_time_base(&self, index: usize) -> Option<Timebase>;

    fn write_packet(&mut self, packet: Self::Packet) -> RemuxResult<()>;

    fn write_trailer(&mut self) -> RemuxResult<()>;

    /// Close the byte sink opened by `open_sink`; idempotent
    fn close_sink(&mut self);

    /// Release the container (and the sink, if still open); idempotent
    fn close(&mut self);

    fn is_closed(&self) -> bool;
}

/// Factory for the sessions of one demuxing/muxing collaborator
pub trait MediaBackend {
    type Parameters;
    type Packet: MediaPacket;
    type Input: InputSession<Parameters = Self::Parameters, Packet = Self::Packet>;
    type Output: OutputSession<Parameters = Self::Parameters, Packet = Self::Packet>;

    /// Resolve and open a source; stream metadata may be incomplete until probed
    fn open_input(&self, locator: &str) -> RemuxResult<Self::Input>;

    /// Create a destination; the format is inferred from `locator` unless given
    fn create_output(&self, locator: &str, format: Option<&str>) -> RemuxResult<Self::Output>;
}
