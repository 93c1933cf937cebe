pub mod wire;

pub use wire::WirePattern;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum Level {
    High,
    Low,
}

impl Level {
    pub fn inverted(self) -> Self {
        match self {
            Level::High => Level::Low,
            Level::Low => Level::High,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::High => "HIGH",
            Level::Low => "LOW",
        }
    }
}

impl Default for Level {
    fn default() -> Self {
        Level::High
    }
}

/// One timed interval of a pulse train.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    pub level: Level,
    pub duration_ms: u64,
}

impl Segment {
    pub fn new(level: Level, duration_ms: u64) -> Self {
        Self { level, duration_ms }
    }

    pub fn high(duration_ms: u64) -> Self {
        Self::new(Level::High, duration_ms)
    }

    pub fn low(duration_ms: u64) -> Self {
        Self::new(Level::Low, duration_ms)
    }
}

/// Ordered segments describing a complete signal from t = 0.
///
/// Every constructor hands out a well-formed sequence: no zero durations and
/// no two neighbours sharing a level.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct SegmentSequence {
    segments: Vec<Segment>,
}

impl SegmentSequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a sequence that flips level on every element, starting at `initial`.
    pub fn from_alternating(initial: Level, durations: &[u64]) -> Self {
        let mut level = initial;
        let segments: Vec<Segment> = durations
            .iter()
            .map(|&duration_ms| {
                let segment = Segment::new(level, duration_ms);
                level = level.inverted();
                segment
            })
            .collect();
        Self::normalized(segments)
    }

    /// Drops zero-length segments and merges equal-level neighbours.
    pub fn normalized(segments: impl IntoIterator<Item = Segment>) -> Self {
        let mut merged: Vec<Segment> = Vec::new();
        for segment in segments {
            if segment.duration_ms == 0 {
                continue;
            }
            match merged.last_mut() {
                Some(last) if last.level == segment.level => {
                    last.duration_ms = last.duration_ms.saturating_add(segment.duration_ms);
                }
                _ => merged.push(segment),
            }
        }
        Self { segments: merged }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Segment> {
        self.segments.iter()
    }

    pub fn first_level(&self) -> Option<Level> {
        self.segments.first().map(|s| s.level)
    }

    /// Sum of all durations, 0 for an empty sequence.
    pub fn total_duration(&self) -> u64 {
        self.segments
            .iter()
            .fold(0u64, |acc, s| acc.saturating_add(s.duration_ms))
    }

    pub fn durations(&self) -> Vec<u64> {
        self.segments.iter().map(|s| s.duration_ms).collect()
    }

    /// Cumulative end time of every segment.
    pub fn boundaries(&self) -> Vec<u64> {
        let mut acc = 0u64;
        self.segments
            .iter()
            .map(|s| {
                acc = acc.saturating_add(s.duration_ms);
                acc
            })
            .collect()
    }

    pub fn inverted(&self) -> Self {
        Self {
            segments: self
                .segments
                .iter()
                .map(|s| Segment::new(s.level.inverted(), s.duration_ms))
                .collect(),
        }
    }
}

impl<'a> IntoIterator for &'a SegmentSequence {
    type Item = &'a Segment;
    type IntoIter = std::slice::Iter<'a, Segment>;

    fn into_iter(self) -> Self::IntoIter {
        self.segments.iter()
    }
}
