use serde::{Deserialize, Serialize};

use super::{Level, SegmentSequence};

/// Gateway representation of a pattern.
///
/// `pattern_changes[i]` is the cumulative time (ms) at which segment `i` ends.
/// The last entry is the total duration, so the final segment never depends on
/// an externally known length.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WirePattern {
    pub first: Level,
    pub pattern_changes: Vec<u64>,
}

impl WirePattern {
    /// Successive differences of the change list, `None` unless the list is
    /// non-empty and strictly increasing from a positive first entry.
    pub fn durations(&self) -> Option<Vec<u64>> {
        if self.pattern_changes.is_empty() {
            return None;
        }
        let mut previous = 0u64;
        let mut durations = Vec::with_capacity(self.pattern_changes.len());
        for &change in &self.pattern_changes {
            if change <= previous {
                return None;
            }
            durations.push(change - previous);
            previous = change;
        }
        Some(durations)
    }

    pub fn total_duration(&self) -> u64 {
        self.pattern_changes.last().copied().unwrap_or(0)
    }
}

impl SegmentSequence {
    /// `None` for an empty sequence; there is no `first` level to report.
    pub fn to_wire(&self) -> Option<WirePattern> {
        let first = self.first_level()?;
        Some(WirePattern {
            first,
            pattern_changes: self.boundaries(),
        })
    }

    pub fn from_wire(pattern: &WirePattern) -> Option<Self> {
        let durations = pattern.durations()?;
        Some(Self::from_alternating(pattern.first, &durations))
    }
}
