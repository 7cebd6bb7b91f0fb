// Domain rules - Business logic and policies

use crate::domain::model::*;
use crate::error::{RemuxError, RemuxResult};

/// Business rules for picking the stream to relay
pub struct StreamSelector;

impl StreamSelector {
    /// Select the best stream of `kind`.
    ///
    /// Follows FFmpeg's `av_find_best_stream`: unusable streams are skipped,
    /// the default flag and the absence of an impaired flag each add one
    /// point, and bit rate breaks a tie in points. Anything still tied goes
    /// to the stream declared first. The returned value is the descriptor's
    /// position in `streams`.
    pub fn select_best<P>(streams: &[StreamDescriptor<P>], kind: MediaKind) -> RemuxResult<usize> {
        let mut best: Option<(usize, (u8, u64))> = None;

        for (position, stream) in streams.iter().enumerate() {
            if stream.kind != kind || !stream.is_usable {
                continue;
            }

            let rank = Self::rank(stream);
            match best {
                // strictly better only, so the first declared wins ties
                Some((_, best_rank)) if rank <= best_rank => {}
                _ => best = Some((position, rank)),
            }
        }

        best.map(|(position, _)| position)
            .ok_or(RemuxError::StreamNotFound { kind })
    }

    /// Count streams of each kind, in `MediaKind::ALL` order
    pub fn count_by_kind<P>(streams: &[StreamDescriptor<P>]) -> [(MediaKind, usize); 4] {
        MediaKind::ALL.map(|kind| (kind, streams.iter().filter(|s| s.kind == kind).count()))
    }

    fn rank<P>(stream: &StreamDescriptor<P>) -> (u8, u64) {
        let disposition = u8::from(stream.is_default) + u8::from(!stream.is_impaired);
        (disposition, stream.bit_rate.unwrap_or(0))
    }
}
