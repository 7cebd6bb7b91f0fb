//! Muxing side of the FFmpeg collaborator

use std::ffi::CString;
use std::ptr;

use ffmpeg_next::format::context::Output;
use ffmpeg_next::{codec, ffi, Packet, Rational};
use tracing::{debug, warn};

use crate::domain::model::{StreamDescriptor, Timebase};
use crate::error::{BackendFault, RemuxError, RemuxResult};
use crate::ports::OutputSession;

/// Destination container allocated with `avformat_alloc_output_context2`
pub struct LibavOutput {
    locator: String,
    url: CString,
    context: Option<Output>,
    sink_open: bool,
    header_written: bool,
    trailer_written: bool,
}

impl LibavOutput {
    /// Allocate the muxer; the format comes from `format` or the locator's extension
    pub fn create(locator: &str, format: Option<&str>) -> RemuxResult<Self> {
        let create_error = |cause| RemuxError::Create {
            locator: locator.to_string(),
            cause,
        };
        let nul_error = || {
            create_error(BackendFault::new(
                "avformat_alloc_output_context2",
                "locator or format name contains a NUL byte",
            ))
        };

        let url = CString::new(locator).map_err(|_| nul_error())?;
        let format_name = format
            .map(CString::new)
            .transpose()
            .map_err(|_| nul_error())?;

        let mut ps = ptr::null_mut();
        let ret = unsafe {
            ffi::avformat_alloc_output_context2(
                &mut ps,
                ptr::null_mut(),
                format_name.as_ref().map_or(ptr::null(), |name| name.as_ptr()),
                url.as_ptr(),
            )
        };
        if ret < 0 {
            return Err(create_error(BackendFault::libav(
                "avformat_alloc_output_context2",
                ffmpeg_next::Error::from(ret),
            )));
        }
        if ps.is_null() {
            return Err(create_error(BackendFault::new(
                "avformat_alloc_output_context2",
                "no output context allocated",
            )));
        }

        let context = unsafe { Output::wrap(ps) };
        debug!("Created destination {} ({})", locator, context.format().name());

        Ok(Self {
            locator: locator.to_string(),
            url,
            context: Some(context),
            sink_open: false,
            header_written: false,
            trailer_written: false,
        })
    }

    fn closed_error(operation: &'static str) -> BackendFault {
        BackendFault::new(operation, "output session is closed")
    }
}

impl OutputSession for LibavOutput {
    type Parameters = codec::Parameters;
    type Packet = Packet;

    fn declare_stream(&mut self, source: &StreamDescriptor<codec::Parameters>) -> RemuxResult<usize> {
        let context = self.context.as_mut().ok_or_else(|| RemuxError::Declare {
            cause: Self::closed_error("avformat_new_stream"),
        })?;
        if self.header_written {
            return Err(RemuxError::Declare {
                cause: BackendFault::new("avformat_new_stream", "header already written"),
            });
        }

        let mut stream = context
            .add_stream(codec::encoder::find(codec::Id::None))
            .map_err(|e| RemuxError::Declare {
                cause: BackendFault::libav("avformat_new_stream", e),
            })?;

        unsafe {
            let codecpar = (*stream.as_mut_ptr()).codecpar;
            let ret = ffi::avcodec_parameters_copy(codecpar, source.parameters.as_ptr());
            if ret < 0 {
                return Err(RemuxError::Declare {
                    cause: BackendFault::libav(
                        "avcodec_parameters_copy",
                        ffmpeg_next::Error::from(ret),
                    ),
                });
            }
            // codec tags are container specific; let the muxer pick its own
            (*codecpar).codec_tag = 0;
        }
        stream.set_time_base(Rational::new(source.time_base.num, source.time_base.den));

        Ok(stream.index())
    }

    fn requires_sink(&self) -> bool {
        self.context.as_ref().map_or(false, |context| unsafe {
            let oformat = (*context.as_ptr()).oformat;
            !oformat.is_null() && ((*oformat).flags & ffi::AVFMT_NOFILE as i32) == 0
        })
    }

    fn open_sink(&mut self) -> RemuxResult<()> {
        if self.sink_open || !self.requires_sink() {
            return Ok(());
        }
        let context = self.context.as_mut().ok_or_else(|| RemuxError::Io {
            cause: Self::closed_error("avio_open"),
        })?;

        let ret = unsafe {
            ffi::avio_open(
                &mut (*context.as_mut_ptr()).pb,
                self.url.as_ptr(),
                ffi::AVIO_FLAG_WRITE as i32,
            )
        };
        if ret < 0 {
            return Err(RemuxError::Io {
                cause: BackendFault::libav("avio_open", ffmpeg_next::Error::from(ret)),
            });
        }

        self.sink_open = true;
        debug!("Opened sink {}", self.locator);
        Ok(())
    }

    fn write_header(&mut self) -> RemuxResult<()> {
        let context = self.context.as_mut().ok_or_else(|| RemuxError::Header {
            cause: Self::closed_error("avformat_write_header"),
        })?;
        context.write_header().map_err(|e| RemuxError::Header {
            cause: BackendFault::libav("avformat_write_header", e),
        })?;
        self.header_written = true;
        Ok(())
    }

    fn stream_time_base(&self, index: usize) -> Option<Timebase> {
        let stream = self.context.as_ref()?.stream(index)?;
        let tb = stream.time_base();
        Timebase::new(tb.numerator(), tb.denominator()).ok()
    }

    fn write_packet(&mut self, mut packet: Packet) -> RemuxResult<()> {
        let write_error = |message: &str| RemuxError::Write {
            cause: BackendFault::new("av_interleaved_write_frame", message),
        };

        if !self.header_written {
            return Err(write_error("packet written before header"));
        }
        if self.trailer_written {
            return Err(write_error("packet written after trailer"));
        }
        let context = self
            .context
            .as_mut()
            .ok_or_else(|| write_error("output session is closed"))?;
        if context.stream(packet.stream()).is_none() {
            return Err(write_error("packet references an undeclared stream"));
        }

        // the safe wrapper rejects empty packets
        let ret = unsafe {
            ffi::av_interleaved_write_frame(context.as_mut_ptr(), packet.as_mut_ptr())
        };
        if ret < 0 {
            return Err(RemuxError::Write {
                cause: BackendFault::libav(
                    "av_interleaved_write_frame",
                    ffmpeg_next::Error::from(ret),
                ),
            });
        }
        Ok(())
    }

    fn write_trailer(&mut self) -> RemuxResult<()> {
        if !self.header_written || self.trailer_written {
            return Err(RemuxError::Trailer {
                cause: BackendFault::new(
                    "av_write_trailer",
                    "trailer must follow the header exactly once",
                ),
            });
        }
        let context = self.context.as_mut().ok_or_else(|| RemuxError::Trailer {
            cause: Self::closed_error("av_write_trailer"),
        })?;
        context.write_trailer().map_err(|e| RemuxError::Trailer {
            cause: BackendFault::libav("av_write_trailer", e),
        })?;
        self.trailer_written = true;
        Ok(())
    }

    fn close_sink(&mut self) {
        if !self.sink_open {
            return;
        }
        self.sink_open = false;

        if let Some(context) = self.context.as_mut() {
            // avio_closep nulls `pb`, so the context destructor won't close it again
            let ret = unsafe { ffi::avio_closep(&mut (*context.as_mut_ptr()).pb) };
            if ret < 0 {
                warn!(
                    "Closing sink {} reported: {}",
                    self.locator,
                    ffmpeg_next::Error::from(ret)
                );
            }
        }
        debug!("Closed sink {}", self.locator);
    }

    fn close(&mut self) {
        self.close_sink();
        if self.context.take().is_some() {
            debug!("Closed destination {}", self.locator);
        }
    }

    fn is_closed(&self) -> bool {
        self.context.is_none()
    }
}
