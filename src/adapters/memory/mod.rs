// Memory adapter - In-process demuxer/muxer with an event journal and fault injection

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::domain::model::*;
use crate::error::{BackendFault, RemuxError, RemuxResult};
use crate::ports::*;

// FFmpeg's AVERROR(ENOENT) and AVERROR(EINVAL), so diagnostics look alike
const ENOENT: i32 = -2;
const EINVAL: i32 = -22;

/// Codec parameters of an in-memory stream
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MemoryCodecParameters {
    pub codec_name: String,
    pub codec_tag: u32,
    pub extradata: Vec<u8>,
}

impl MemoryCodecParameters {
    pub fn new(codec_name: impl Into<String>, codec_tag: u32, extradata: Vec<u8>) -> Self {
        Self {
            codec_name: codec_name.into(),
            codec_tag,
            extradata,
        }
    }
}

/// An in-memory packet; its buffer is freed when the packet is dropped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryPacket {
    pub stream_index: usize,
    pub pts: Option<i64>,
    pub dts: Option<i64>,
    pub duration: i64,
    pub position: Option<u64>,
    pub data: Vec<u8>,
}

impl MemoryPacket {
    pub fn new(stream_index: usize, pts: i64, data: Vec<u8>) -> Self {
        Self {
            stream_index,
            pts: Some(pts),
            dts: Some(pts),
            duration: 0,
            position: None,
            data,
        }
    }

    pub fn with_dts(mut self, dts: Option<i64>) -> Self {
        self.dts = dts;
        self
    }

    pub fn with_duration(mut self, duration: i64) -> Self {
        self.duration = duration;
        self
    }

    pub fn with_position(mut self, position: u64) -> Self {
        self.position = Some(position);
        self
    }
}

impl MediaPacket for MemoryPacket {
    fn stream_index(&self) -> usize {
        self.stream_index
    }

    fn set_stream_index(&mut self, index: usize) {
        self.stream_index = index;
    }

    fn pts(&self) -> Option<i64> {
        self.pts
    }

    fn set_pts(&mut self, pts: Option<i64>) {
        self.pts = pts;
    }

    fn dts(&self) -> Option<i64> {
        self.dts
    }

    fn set_dts(&mut self, dts: Option<i64>) {
        self.dts = dts;
    }

    fn duration(&self) -> i64 {
        self.duration
    }

    fn set_duration(&mut self, duration: i64) {
        self.duration = duration;
    }

    fn position(&self) -> Option<u64> {
        self.position
    }

    fn set_position(&mut self, position: Option<u64>) {
        self.position = position;
    }

    fn size(&self) -> usize {
        self.data.len()
    }
}

/// Contents of an in-memory source container
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    pub format_name: String,
    pub streams: Vec<StreamDescriptor<MemoryCodecParameters>>,
    pub packets: Vec<MemoryPacket>,
}

impl MemorySource {
    pub fn new(format_name: impl Into<String>) -> Self {
        Self {
            format_name: format_name.into(),
            streams: Vec::new(),
            packets: Vec::new(),
        }
    }

    /// Append a stream; its index is its declaration position
    pub fn with_stream(
        mut self,
        kind: MediaKind,
        time_base: Timebase,
        parameters: MemoryCodecParameters,
    ) -> Self {
        let index = self.streams.len();
        let codec = parameters.codec_name.clone();
        self.streams
            .push(StreamDescriptor::new(index, kind, time_base, parameters).with_codec(codec));
        self
    }

    pub fn with_descriptor(mut self, descriptor: StreamDescriptor<MemoryCodecParameters>) -> Self {
        self.streams.push(descriptor);
        self
    }

    pub fn with_packet(mut self, packet: MemoryPacket) -> Self {
        self.packets.push(packet);
        self
    }
}

/// Operations to fail on purpose
#[derive(Debug, Clone, Default)]
pub struct FaultPlan {
    pub open: bool,
    pub probe: bool,
    pub create: bool,
    pub declare: bool,
    pub open_sink: bool,
    pub header: bool,
    pub trailer: bool,
    /// Fail the n-th `read_packet` call (0-based)
    pub read_at: Option<usize>,
    /// Fail the n-th `write_packet` call (0-based)
    pub write_at: Option<usize>,
}

/// Everything the memory sessions did, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JournalEvent {
    InputOpened { locator: String },
    InputProbed { locator: String },
    InputClosed { locator: String },
    OutputCreated { locator: String, format: String },
    StreamDeclared { index: usize, parameters: MemoryCodecParameters },
    SinkOpened { locator: String },
    SinkClosed { locator: String },
    HeaderWritten,
    PacketWritten(MemoryPacket),
    TrailerWritten,
    OutputClosed { locator: String },
}

type Journal = Arc<Mutex<Vec<JournalEvent>>>;

fn record(journal: &Journal, event: JournalEvent) {
    lock(journal).push(event);
}

fn lock(journal: &Journal) -> MutexGuard<'_, Vec<JournalEvent>> {
    journal.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Muxer names known to the memory backend, keyed by file extension
const OUTPUT_FORMATS: &[(&str, &str)] = &[
    ("mp4", "mp4"),
    ("m4a", "mp4"),
    ("mov", "mov"),
    ("mkv", "matroska"),
    ("mka", "matroska"),
    ("webm", "webm"),
    ("aac", "adts"),
    ("mp3", "mp3"),
    ("wav", "wav"),
    ("ts", "mpegts"),
    ("flv", "flv"),
    ("ogg", "ogg"),
    ("h264", "h264"),
];

/// Formats that do their own I/O and never need a byte sink
const NO_FILE_FORMATS: &[&str] = &["null"];

fn infer_format(locator: &str, explicit: Option<&str>) -> Option<String> {
    if let Some(name) = explicit {
        let known = OUTPUT_FORMATS.iter().any(|(_, format)| *format == name)
            || NO_FILE_FORMATS.contains(&name);
        return known.then(|| name.to_string());
    }

    let extension = Path::new(locator)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())?;
    OUTPUT_FORMATS
        .iter()
        .find(|(ext, _)| *ext == extension)
        .map(|(_, format)| format.to_string())
}

/// In-memory media backend.
///
/// Clones share the journal, so a test can keep one handle and give another
/// to the relay engine.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    sources: HashMap<String, MemorySource>,
    faults: FaultPlan,
    output_time_base: Option<Timebase>,
    journal: Journal,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source(mut self, locator: impl Into<String>, source: MemorySource) -> Self {
        self.sources.insert(locator.into(), source);
        self
    }

    pub fn with_faults(mut self, faults: FaultPlan) -> Self {
        self.faults = faults;
        self
    }

    /// Time base the muxer assigns to every stream when the header is written
    pub fn with_output_time_base(mut self, time_base: Timebase) -> Self {
        self.output_time_base = Some(time_base);
        self
    }

    pub fn events(&self) -> Vec<JournalEvent> {
        lock(&self.journal).clone()
    }

    pub fn count(&self, predicate: impl Fn(&JournalEvent) -> bool) -> usize {
        lock(&self.journal).iter().filter(|&event| predicate(event)).count()
    }

    pub fn written_packets(&self) -> Vec<MemoryPacket> {
        lock(&self.journal)
            .iter()
            .filter_map(|event| match event {
                JournalEvent::PacketWritten(packet) => Some(packet.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn declared_streams(&self) -> Vec<MemoryCodecParameters> {
        lock(&self.journal)
            .iter()
            .filter_map(|event| match event {
                JournalEvent::StreamDeclared { parameters, .. } => Some(parameters.clone()),
                _ => None,
            })
            .collect()
    }
}

impl MediaBackend for MemoryBackend {
    type Parameters = MemoryCodecParameters;
    type Packet = MemoryPacket;
    type Input = MemoryInput;
    type Output = MemoryOutput;

    fn open_input(&self, locator: &str) -> RemuxResult<MemoryInput> {
        let open_error = |cause| RemuxError::Open {
            locator: locator.to_string(),
            cause,
        };

        if self.faults.open {
            return Err(open_error(BackendFault::with_code(
                "open_input",
                EINVAL,
                "injected open failure",
            )));
        }
        let source = self.sources.get(locator).cloned().ok_or_else(|| {
            open_error(BackendFault::with_code(
                "open_input",
                ENOENT,
                "No such file or directory",
            ))
        })?;

        record(
            &self.journal,
            JournalEvent::InputOpened {
                locator: locator.to_string(),
            },
        );

        Ok(MemoryInput {
            locator: locator.to_string(),
            source,
            streams: Vec::new(),
            cursor: 0,
            reads: 0,
            closed: false,
            faults: self.faults.clone(),
            journal: Arc::clone(&self.journal),
        })
    }

    fn create_output(&self, locator: &str, format: Option<&str>) -> RemuxResult<MemoryOutput> {
        let create_error = |cause| RemuxError::Create {
            locator: locator.to_string(),
            cause,
        };

        if self.faults.create {
            return Err(create_error(BackendFault::with_code(
                "create_output",
                EINVAL,
                "injected create failure",
            )));
        }
        let format = infer_format(locator, format).ok_or_else(|| {
            create_error(BackendFault::with_code(
                "create_output",
                EINVAL,
                format!("Unable to find a suitable output format for '{}'", locator),
            ))
        })?;

        record(
            &self.journal,
            JournalEvent::OutputCreated {
                locator: locator.to_string(),
                format: format.clone(),
            },
        );

        Ok(MemoryOutput {
            locator: locator.to_string(),
            requires_sink: !NO_FILE_FORMATS.contains(&format.as_str()),
            format,
            time_bases: Vec::new(),
            output_time_base: self.output_time_base,
            sink_open: false,
            header_written: false,
            trailer_written: false,
            closed: false,
            writes: 0,
            faults: self.faults.clone(),
            journal: Arc::clone(&self.journal),
        })
    }
}

/// Reading side of the memory backend
#[derive(Debug)]
pub struct MemoryInput {
    locator: String,
    source: MemorySource,
    streams: Vec<StreamDescriptor<MemoryCodecParameters>>,
    cursor: usize,
    reads: usize,
    closed: bool,
    faults: FaultPlan,
    journal: Journal,
}

impl InputSession for MemoryInput {
    type Parameters = MemoryCodecParameters;
    type Packet = MemoryPacket;

    fn probe(&mut self) -> RemuxResult<()> {
        if self.faults.probe {
            return Err(RemuxError::Probe {
                cause: BackendFault::with_code("probe", EINVAL, "injected probe failure"),
            });
        }
        self.streams = self.source.streams.clone();
        record(
            &self.journal,
            JournalEvent::InputProbed {
                locator: self.locator.clone(),
            },
        );
        Ok(())
    }

    fn streams(&self) -> &[StreamDescriptor<MemoryCodecParameters>] {
        &self.streams
    }

    fn format_name(&self) -> Option<String> {
        Some(self.source.format_name.clone())
    }

    fn read_packet(&mut self) -> RemuxResult<Option<MemoryPacket>> {
        if self.closed {
            return Err(RemuxError::Read {
                cause: BackendFault::new("read_packet", "input session is closed"),
            });
        }
        if self.faults.read_at == Some(self.reads) {
            return Err(RemuxError::Read {
                cause: BackendFault::with_code("read_packet", EINVAL, "injected read failure"),
            });
        }
        self.reads += 1;

        let packet = self.source.packets.get(self.cursor).cloned();
        if packet.is_some() {
            self.cursor += 1;
        }
        Ok(packet)
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        record(
            &self.journal,
            JournalEvent::InputClosed {
                locator: self.locator.clone(),
            },
        );
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}

/// Writing side of the memory backend
#[derive(Debug)]
pub struct MemoryOutput {
    locator: String,
    format: String,
    requires_sink: bool,
    time_bases: Vec<Timebase>,
    output_time_base: Option<Timebase>,
    sink_open: bool,
    header_written: bool,
    trailer_written: bool,
    closed: bool,
    writes: usize,
    faults: FaultPlan,
    journal: Journal,
}

impl MemoryOutput {
    pub fn format(&self) -> &str {
        &self.format
    }

    fn write_error(message: impl Into<String>) -> RemuxError {
        RemuxError::Write {
            cause: BackendFault::new("write_packet", message),
        }
    }
}

impl OutputSession for MemoryOutput {
    type Parameters = MemoryCodecParameters;
    type Packet = MemoryPacket;

    fn declare_stream(&mut self, source: &StreamDescriptor<MemoryCodecParameters>) -> RemuxResult<usize> {
        if self.faults.declare {
            return Err(RemuxError::Declare {
                cause: BackendFault::with_code("declare_stream", EINVAL, "injected declare failure"),
            });
        }
        if self.header_written {
            return Err(RemuxError::Declare {
                cause: BackendFault::new("declare_stream", "header already written"),
            });
        }

        let mut parameters = source.parameters.clone();
        parameters.codec_tag = 0;

        let index = self.time_bases.len();
        self.time_bases.push(source.time_base);
        record(&self.journal, JournalEvent::StreamDeclared { index, parameters });
        Ok(index)
    }

    fn requires_sink(&self) -> bool {
        self.requires_sink
    }

    fn open_sink(&mut self) -> RemuxResult<()> {
        if !self.requires_sink {
            return Ok(());
        }
        if self.faults.open_sink {
            return Err(RemuxError::Io {
                cause: BackendFault::with_code("open_sink", ENOENT, "injected sink failure"),
            });
        }
        self.sink_open = true;
        record(
            &self.journal,
            JournalEvent::SinkOpened {
                locator: self.locator.clone(),
            },
        );
        Ok(())
    }

    fn write_header(&mut self) -> RemuxResult<()> {
        if self.faults.header {
            return Err(RemuxError::Header {
                cause: BackendFault::with_code("write_header", EINVAL, "injected header failure"),
            });
        }
        if self.requires_sink && !self.sink_open {
            return Err(RemuxError::Header {
                cause: BackendFault::new("write_header", "byte sink is not open"),
            });
        }
        if let Some(time_base) = self.output_time_base {
            self.time_bases.iter_mut().for_each(|tb| *tb = time_base);
        }
        self.header_written = true;
        record(&self.journal, JournalEvent::HeaderWritten);
        Ok(())
    }

    fn stream_time_base(&self, index: usize) -> Option<Timebase> {
        self.time_bases.get(index).copied()
    }

    fn write_packet(&mut self, packet: MemoryPacket) -> RemuxResult<()> {
        if self.closed {
            return Err(Self::write_error("output session is closed"));
        }
        if !self.header_written {
            return Err(Self::write_error("packet written before header"));
        }
        if self.trailer_written {
            return Err(Self::write_error("packet written after trailer"));
        }
        if packet.stream_index >= self.time_bases.len() {
            return Err(Self::write_error(format!(
                "stream #{} was never declared",
                packet.stream_index
            )));
        }
        if self.faults.write_at == Some(self.writes) {
            self.writes += 1;
            return Err(RemuxError::Write {
                cause: BackendFault::with_code("write_packet", EINVAL, "injected write failure"),
            });
        }

        self.writes += 1;
        record(&self.journal, JournalEvent::PacketWritten(packet));
        Ok(())
    }

    fn write_trailer(&mut self) -> RemuxResult<()> {
        let trailer_error = |message: &str| RemuxError::Trailer {
            cause: BackendFault::new("write_trailer", message),
        };

        if !self.header_written {
            return Err(trailer_error("header was never written"));
        }
        if self.trailer_written {
            return Err(trailer_error("trailer already written"));
        }
        if self.faults.trailer {
            return Err(RemuxError::Trailer {
                cause: BackendFault::with_code("write_trailer", EINVAL, "injected trailer failure"),
            });
        }
        self.trailer_written = true;
        record(&self.journal, JournalEvent::TrailerWritten);
        Ok(())
    }

    fn close_sink(&mut self) {
        if !self.sink_open {
            return;
        }
        self.sink_open = false;
        record(
            &self.journal,
            JournalEvent::SinkClosed {
                locator: self.locator.clone(),
            },
        );
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.close_sink();
        self.closed = true;
        record(
            &self.journal,
            JournalEvent::OutputClosed {
                locator: self.locator.clone(),
            },
        );
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}
