// Inspect interactor - Orchestrates source inspection and timestamp listing

use std::fmt::Write as _;

use serde::Serialize;
use tracing::{debug, info};

use crate::domain::model::{MediaKind, StreamSummary, Timebase};
use crate::domain::rules::StreamSelector;
use crate::error::{RemuxError, RemuxResult};
use crate::ports::{InputSession, MediaBackend, MediaPacket};

/// What the source contains, and which stream a remux would pick per kind
#[derive(Debug, Clone, Serialize)]
pub struct InspectReport {
    pub input: String,
    pub format: Option<String>,
    pub streams: Vec<StreamSummary>,
    pub selection: Vec<KindSelection>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct KindSelection {
    pub kind: MediaKind,
    pub count: usize,
    pub selected: Option<usize>,
}

impl InspectReport {
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Input: {}", self.input);
        let _ = writeln!(out, "Format: {}", self.format.as_deref().unwrap_or("unknown"));
        let _ = writeln!(out, "Streams: {}", self.streams.len());

        for stream in &self.streams {
            let mut flags = Vec::new();
            if stream.default {
                flags.push("default");
            }
            if stream.impaired {
                flags.push("impaired");
            }
            if !stream.usable {
                flags.push("unusable");
            }
            let bit_rate = stream
                .bit_rate
                .map_or_else(|| "n/a".to_string(), |b| format!("{} kb/s", b / 1000));
            let _ = writeln!(
                out,
                "  #{} {}: {} (time base {}, bit rate {}){}",
                stream.index,
                stream.kind,
                stream.codec,
                stream.time_base,
                bit_rate,
                if flags.is_empty() {
                    String::new()
                } else {
                    format!(" [{}]", flags.join(", "))
                }
            );
        }

        let _ = writeln!(out, "Selection:");
        for selection in &self.selection {
            match selection.selected {
                Some(index) => {
                    let _ = writeln!(
                        out,
                        "  {}: #{} of {}",
                        selection.kind, index, selection.count
                    );
                }
                None => {
                    let _ = writeln!(out, "  {}: none", selection.kind);
                }
            }
        }
        out
    }
}

/// One packet of the listed stream
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimestampEntry {
    pub pts: Option<i64>,
    pub dts: Option<i64>,
    pub pts_time: String,
    pub dts_time: String,
    pub duration: i64,
}

/// Packet timestamps of the stream a remux of `kind` would relay
#[derive(Debug, Clone, Serialize)]
pub struct TimestampReport {
    pub input: String,
    pub kind: MediaKind,
    pub stream: usize,
    pub time_base: Timebase,
    pub packets: Vec<TimestampEntry>,
    /// Set when `limit` stopped the listing before end of stream
    pub truncated: bool,
}

impl TimestampReport {
    pub fn render_text(&self) -> String {
        let raw = |ts: Option<i64>| ts.map_or_else(|| "NOPTS".to_string(), |v| v.to_string());

        let mut out = String::new();
        let _ = writeln!(
            out,
            "{} stream #{} of {} (time base {})",
            self.kind, self.stream, self.input, self.time_base
        );
        for entry in &self.packets {
            let _ = writeln!(
                out,
                "pts: {} {}, dts: {} {}",
                raw(entry.pts),
                entry.pts_time,
                raw(entry.dts),
                entry.dts_time
            );
        }
        if self.truncated {
            let _ = writeln!(out, "... (stopped after {} packets)", self.packets.len());
        }
        out
    }
}

/// Interactor for read-only source inspection
pub struct InspectInteractor<B: MediaBackend> {
    backend: B,
}

impl<B: MediaBackend> InspectInteractor<B> {
    /// Create new inspect interactor with injected backend
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Describe every stream of the source
    pub fn inspect(&self, input: &str) -> RemuxResult<InspectReport> {
        info!("Starting inspection of: {}", input);

        self.with_probed_input(input, |session| {
            let streams = session.streams();
            let selection = StreamSelector::count_by_kind(streams)
                .into_iter()
                .map(|(kind, count)| KindSelection {
                    kind,
                    count,
                    selected: StreamSelector::select_best(streams, kind)
                        .ok()
                        .map(|position| streams[position].index),
                })
                .collect();

            Ok(InspectReport {
                input: input.to_string(),
                format: session.format_name(),
                streams: streams.iter().map(|s| s.summary()).collect(),
                selection,
            })
        })
    }

    /// List packet timestamps of the best stream of `kind`
    pub fn timestamps(
        &self,
        input: &str,
        kind: MediaKind,
        limit: Option<usize>,
    ) -> RemuxResult<TimestampReport> {
        if limit == Some(0) {
            return Err(RemuxError::invalid("limit must be greater than zero"));
        }

        self.with_probed_input(input, |session| {
            let streams = session.streams();
            let selected = &streams[StreamSelector::select_best(streams, kind)?];
            let (stream, time_base) = (selected.index, selected.time_base);
            debug!("Listing timestamps of stream #{} ({})", stream, time_base);

            let mut packets = Vec::new();
            let mut truncated = false;
            while let Some(packet) = session.read_packet()? {
                if packet.stream_index() != stream {
                    continue;
                }
                if limit.is_some_and(|limit| packets.len() >= limit) {
                    truncated = true;
                    break;
                }
                packets.push(TimestampEntry {
                    pts: packet.pts(),
                    dts: packet.dts(),
                    pts_time: time_base.format_ts(packet.pts()),
                    dts_time: time_base.format_ts(packet.dts()),
                    duration: packet.duration(),
                });
            }

            Ok(TimestampReport {
                input: input.to_string(),
                kind,
                stream,
                time_base,
                packets,
                truncated,
            })
        })
    }

    /// Open and probe `input`, run `f`, then close the session whatever `f` returned
    fn with_probed_input<T>(
        &self,
        input: &str,
        f: impl FnOnce(&mut B::Input) -> RemuxResult<T>,
    ) -> RemuxResult<T> {
        let mut session = self.backend.open_input(input)?;
        let result = session.probe().and_then(|()| f(&mut session));
        session.close();
        result
    }
}
