//! Demuxing side of the FFmpeg collaborator

use std::ffi::CString;
use std::ptr;

use ffmpeg_next::format::context::Input;
use ffmpeg_next::format::stream::{Disposition, Stream};
use ffmpeg_next::{codec, ffi, media, Packet};
use tracing::{debug, warn};

use crate::domain::model::{MediaKind, StreamDescriptor, Timebase};
use crate::error::{BackendFault, RemuxError, RemuxResult};
use crate::ports::InputSession;

/// Source container opened with `avformat_open_input`
pub struct LibavInput {
    locator: String,
    context: Option<Input>,
    streams: Vec<StreamDescriptor<codec::Parameters>>,
}

impl LibavInput {
    /// Open the source without probing it
    pub fn open(locator: &str) -> RemuxResult<Self> {
        let open_error = |cause| RemuxError::Open {
            locator: locator.to_string(),
            cause,
        };

        let url = CString::new(locator).map_err(|_| {
            open_error(BackendFault::new(
                "avformat_open_input",
                "locator contains a NUL byte",
            ))
        })?;

        let mut ps = ptr::null_mut();
        let ret = unsafe {
            ffi::avformat_open_input(&mut ps, url.as_ptr(), ptr::null_mut(), ptr::null_mut())
        };
        if ret < 0 {
            return Err(open_error(BackendFault::libav(
                "avformat_open_input",
                ffmpeg_next::Error::from(ret),
            )));
        }
        debug!("Opened source {}", locator);

        Ok(Self {
            locator: locator.to_string(),
            context: Some(unsafe { Input::wrap(ps) }),
            streams: Vec::new(),
        })
    }

    fn closed_error(operation: &'static str) -> BackendFault {
        BackendFault::new(operation, "input session is closed")
    }
}

impl InputSession for LibavInput {
    type Parameters = codec::Parameters;
    type Packet = Packet;

    fn probe(&mut self) -> RemuxResult<()> {
        let context = self.context.as_mut().ok_or_else(|| RemuxError::Probe {
            cause: Self::closed_error("avformat_find_stream_info"),
        })?;

        let ret = unsafe { ffi::avformat_find_stream_info(context.as_mut_ptr(), ptr::null_mut()) };
        if ret < 0 {
            return Err(RemuxError::Probe {
                cause: BackendFault::libav(
                    "avformat_find_stream_info",
                    ffmpeg_next::Error::from(ret),
                ),
            });
        }

        self.streams = context.streams().map(describe).collect();
        debug!("Probed {}: {} streams", self.locator, self.streams.len());
        Ok(())
    }

    fn streams(&self) -> &[StreamDescriptor<codec::Parameters>] {
        &self.streams
    }

    fn format_name(&self) -> Option<String> {
        self.context
            .as_ref()
            .map(|context| context.format().name().to_string())
    }

    fn read_packet(&mut self) -> RemuxResult<Option<Packet>> {
        let context = self.context.as_mut().ok_or_else(|| RemuxError::Read {
            cause: Self::closed_error("av_read_frame"),
        })?;

        let mut packet = Packet::empty();
        match packet.read(context) {
            Ok(()) => Ok(Some(packet)),
            Err(ffmpeg_next::Error::Eof) => Ok(None),
            Err(e) => Err(RemuxError::Read {
                cause: BackendFault::libav("av_read_frame", e),
            }),
        }
    }

    fn close(&mut self) {
        if self.context.take().is_some() {
            debug!("Closed source {}", self.locator);
        }
    }

    fn is_closed(&self) -> bool {
        self.context.is_none()
    }
}

/// Build a descriptor owning its own copy of the codec parameters.
///
/// Streams FFmpeg could not fully probe stay listed but are marked unusable,
/// so the selector passes over them instead of failing the whole source.
fn describe(stream: Stream) -> StreamDescriptor<codec::Parameters> {
    let parameters = stream.parameters();
    let kind = match parameters.medium() {
        media::Type::Audio => MediaKind::Audio,
        media::Type::Video => MediaKind::Video,
        media::Type::Subtitle => MediaKind::Subtitle,
        _ => MediaKind::Other,
    };

    let tb = stream.time_base();
    let time_base = match Timebase::new(tb.numerator(), tb.denominator()) {
        Ok(time_base) => Some(time_base),
        Err(_) => {
            warn!(
                "Stream #{} has no valid time base ({}/{}), it cannot be selected",
                stream.index(),
                tb.numerator(),
                tb.denominator()
            );
            None
        }
    };

    let (bit_rate, channels, sample_rate) = unsafe {
        let raw = parameters.as_ptr();
        ((*raw).bit_rate, (*raw).ch_layout.nb_channels, (*raw).sample_rate)
    };
    let audio_complete = kind != MediaKind::Audio || (channels > 0 && sample_rate > 0);
    if !audio_complete {
        warn!(
            "Audio stream #{} has no channel layout or sample rate, it cannot be selected",
            stream.index()
        );
    }

    let disposition = stream.disposition();
    let descriptor = StreamDescriptor::new(
        stream.index(),
        kind,
        time_base.unwrap_or_else(Timebase::av_time_base),
        parameters.clone(),
    )
    .with_codec(parameters.id().name())
    .with_default(disposition.contains(Disposition::DEFAULT))
    .with_impaired(
        disposition.intersects(Disposition::HEARING_IMPAIRED | Disposition::VISUAL_IMPAIRED),
    )
    .with_usable(time_base.is_some() && audio_complete);

    match u64::try_from(bit_rate) {
        Ok(bit_rate) if bit_rate > 0 => descriptor.with_bit_rate(bit_rate),
        _ => descriptor,
    }
}
