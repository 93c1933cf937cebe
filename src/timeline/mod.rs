use serde::Serialize;

use crate::segment::{Level, SegmentSequence};

/// One segment scaled onto the timeline.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TimelineBar {
    pub left_px: f64,
    pub width_px: f64,
    pub level: Level,
}

/// A boundary marker on the time axis.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TimeTick {
    pub time_ms: u64,
    pub percent: f64,
    pub label: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TimelineLayout {
    pub width_px: f64,
    pub total_ms: u64,
    pub bars: Vec<TimelineBar>,
    pub ticks: Vec<TimeTick>,
}

impl TimelineLayout {
    pub fn scale(&self) -> f64 {
        self.width_px / self.total_ms as f64
    }
}

/// Scales a sequence onto `width_px` pixels.
///
/// Returns `None` for a sequence without duration or a non-positive width.
/// The first tick sits at 0 % and the last at 100 %, and the last bar ends
/// exactly at `width_px`.
pub fn layout(seq: &SegmentSequence, width_px: f64) -> Option<TimelineLayout> {
    let total_ms = seq.total_duration();
    if total_ms == 0 || !width_px.is_finite() || width_px <= 0.0 {
        return None;
    }

    let scale = width_px / total_ms as f64;
    let count = seq.len();
    let mut bars = Vec::with_capacity(count);
    let mut start_ms = 0u64;

    for (i, segment) in seq.iter().enumerate() {
        let left_px = start_ms as f64 * scale;
        let width = if i + 1 == count {
            width_px - left_px
        } else {
            segment.duration_ms as f64 * scale
        };
        bars.push(TimelineBar {
            left_px,
            width_px: width,
            level: segment.level,
        });
        start_ms += segment.duration_ms;
    }

    let boundaries: Vec<u64> = std::iter::once(0).chain(seq.boundaries()).collect();
    let last = boundaries.len() - 1;
    let ticks = boundaries
        .iter()
        .enumerate()
        .map(|(i, &time_ms)| {
            let percent = if time_ms == 0 {
                0.0
            } else if time_ms == total_ms {
                100.0
            } else {
                time_ms as f64 / total_ms as f64 * 100.0
            };
            let label = if i == last {
                format!("{time_ms}ms")
            } else {
                time_ms.to_string()
            };
            TimeTick {
                time_ms,
                percent,
                label,
            }
        })
        .collect();

    Some(TimelineLayout {
        width_px,
        total_ms,
        bars,
        ticks,
    })
}

/// Total duration as seconds for display, e.g. `3.4 s`.
pub fn format_total(total_ms: u64) -> String {
    format!("{} s", total_ms as f64 / 1000.0)
}
