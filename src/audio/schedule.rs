use serde::Serialize;

use crate::segment::{Level, SegmentSequence};

use super::voice::Tone;

/// A tone to sound on `channel` from `offset_ms` (relative to the playback
/// start) for `duration_ms`.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ToneEvent {
    pub channel: usize,
    pub offset_ms: u64,
    pub duration_ms: u64,
    pub tone: Tone,
}

impl ToneEvent {
    pub fn end_ms(&self) -> u64 {
        self.offset_ms.saturating_add(self.duration_ms)
    }
}

/// One tone per HIGH segment, offset by the absolute cumulative start of the
/// segment. LOW segments are silence and produce nothing.
pub fn schedule_tones(seq: &SegmentSequence, channel: usize, tone: Tone) -> Vec<ToneEvent> {
    let mut offset_ms = 0u64;
    let mut events = Vec::new();
    for segment in seq {
        if segment.level == Level::High {
            events.push(ToneEvent {
                channel,
                offset_ms,
                duration_ms: segment.duration_ms,
                tone,
            });
        }
        offset_ms = offset_ms.saturating_add(segment.duration_ms);
    }
    events
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum EdgeKind {
    // Ends sort first so a tone handed over on the same channel is cut
    // before its successor starts.
    End,
    Start,
}

/// Start/end edges of every event, ordered by time.
pub(crate) fn edges(events: &[ToneEvent]) -> Vec<(u64, EdgeKind, usize)> {
    let mut edges: Vec<(u64, EdgeKind, usize)> = events
        .iter()
        .enumerate()
        .flat_map(|(i, event)| {
            [
                (event.offset_ms, EdgeKind::Start, i),
                (event.end_ms(), EdgeKind::End, i),
            ]
        })
        .collect();
    edges.sort();
    edges
}
