//! Single-stream relay: source container to destination container without decoding

use std::time::Instant;
use tracing::{debug, error, info, trace, warn};

use crate::domain::model::StreamMapping;
use crate::domain::rules::StreamSelector;
use crate::engine::{RelayReport, RelayRequest, RelayState};
use crate::error::{BackendFault, RemuxError, RemuxResult};
use crate::ports::{InputSession, MediaBackend, MediaPacket, OutputSession};

/// Drives one remux run over a media backend.
///
/// Every resource the engine acquires is released by `teardown`, which runs
/// once the run reaches `Closed` or `Failed` (and again from `Drop`, where it
/// finds nothing left to release).
pub struct RelayEngine<B: MediaBackend> {
    backend: B,
    state: RelayState,
    input: Option<B::Input>,
    output: Option<B::Output>,
    sink_opened: bool,
}

impl<B: MediaBackend> RelayEngine<B> {
    /// Create a new relay engine
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            state: RelayState::Init,
            input: None,
            output: None,
            sink_opened: false,
        }
    }

    pub fn state(&self) -> RelayState {
        self.state
    }

    /// Execute the run; the engine ends in `Closed` on success, `Failed` otherwise
    pub fn run(&mut self, request: &RelayRequest) -> RemuxResult<RelayReport> {
        if self.state != RelayState::Init {
            return Err(RemuxError::invalid(format!(
                "relay engine already ran (state {})",
                self.state
            )));
        }

        let started = Instant::now();
        info!("Starting remux: {} -> {}", request.input, request.output);
        info!("Requested stream kind: {}", request.kind);

        let mut report = RelayReport::new(request);
        let result = self.relay(request, &mut report);

        let terminal = match &result {
            Ok(()) => RelayState::Closed,
            Err(e) => {
                error!(state = %self.state, kind = ?e.kind(), "Remux failed: {}", e);
                RelayState::Failed
            }
        };

        self.teardown();
        advance(&mut self.state, terminal);

        report.state = terminal;
        report.elapsed = started.elapsed();

        result.map(|()| {
            info!(
                "Remux completed: {} packets relayed, {} discarded, {} bytes in {:.2}s",
                report.packets_relayed,
                report.packets_discarded,
                report.bytes_relayed,
                report.elapsed.as_secs_f64()
            );
            report
        })
    }

    fn relay(&mut self, request: &RelayRequest, report: &mut RelayReport) -> RemuxResult<()> {
        let input = self.input.insert(self.backend.open_input(&request.input)?);
        advance(&mut self.state, RelayState::Opened);

        input.probe()?;
        advance(&mut self.state, RelayState::Probed);
        if let Some(format) = input.format_name() {
            debug!("Source format: {}", format);
        }

        let streams = input.streams();
        let selected = StreamSelector::select_best(streams, request.kind)?;
        let source = &streams[selected];
        let source_index = source.index;
        let source_time_base = source.time_base;
        advance(&mut self.state, RelayState::StreamSelected);
        info!(
            "Selected {} stream #{} ({}, time base {})",
            source.kind, source_index, source.codec_name, source_time_base
        );

        report.source_stream = Some(source_index);
        report.source_time_base = Some(source_time_base);

        let output = self
            .output
            .insert(self.backend.create_output(&request.output, request.format.as_deref())?);
        let destination_index = output.declare_stream(source)?;
        advance(&mut self.state, RelayState::OutputDeclared);

        if output.requires_sink() {
            output.open_sink()?;
            self.sink_opened = true;
        }
        output.write_header()?;
        advance(&mut self.state, RelayState::HeaderWritten);

        let destination_time_base = output.stream_time_base(destination_index).ok_or_else(|| {
            RemuxError::Header {
                cause: BackendFault::new(
                    "stream_time_base",
                    format!("no time base for output stream #{}", destination_index),
                ),
            }
        })?;
        report.destination_time_base = Some(destination_time_base);
        debug!(
            "Rescaling timestamps {} -> {}",
            source_time_base, destination_time_base
        );

        let mapping = StreamMapping::single(source_index, destination_index);
        advance(&mut self.state, RelayState::Relaying);

        while let Some(mut packet) = input.read_packet()? {
            report.packets_read += 1;

            let Some(destination) = mapping.destination(packet.stream_index()) else {
                trace!("Discarding packet from stream #{}", packet.stream_index());
                report.packets_discarded += 1;
                continue;
            };

            packet.set_stream_index(destination);
            packet.set_pts(source_time_base.rescale_ts(packet.pts(), destination_time_base));
            packet.set_dts(source_time_base.rescale_ts(packet.dts(), destination_time_base));
            packet.set_duration(
                source_time_base.rescale_duration(packet.duration(), destination_time_base),
            );
            packet.set_position(None);

            trace!(pts = ?packet.pts(), dts = ?packet.dts(), "Relaying packet");
            let size = packet.size() as u64;
            output.write_packet(packet)?;

            report.packets_relayed += 1;
            report.bytes_relayed += size;
        }
        debug!("End of source after {} packets", report.packets_read);

        output.write_trailer()?;
        advance(&mut self.state, RelayState::TrailerWritten);

        Ok(())
    }

    /// Release whatever was acquired, each resource guarded on its own
    fn teardown(&mut self) {
        if let Some(mut output) = self.output.take() {
            if self.sink_opened {
                output.close_sink();
                self.sink_opened = false;
            }
            output.close();
            debug!("Output session closed");
        }

        if let Some(mut input) = self.input.take() {
            input.close();
            debug!("Input session closed");
        }
    }
}

impl<B: MediaBackend> Drop for RelayEngine<B> {
    fn drop(&mut self) {
        if self.input.is_some() || self.output.is_some() {
            warn!("Relay engine dropped in state {} with open sessions", self.state);
            self.teardown();
        }
    }
}

fn advance(state: &mut RelayState, next: RelayState) {
    debug!("Relay state: {} -> {}", state, next);
    *state = next;
}
