use serde::Serialize;

use crate::segment::{Level, SegmentSequence, WirePattern};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::log_debug;

/// One editable unit of the pattern editor.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PhaseTag {
    pub state: Level,
    pub duration_ms: u64,
    pub index: usize,
}

/// Ordered phase tags with strictly alternating states.
///
/// Only the first tag's level is stored. Every other state is derived from
/// its position, so no edit can leave two neighbours with the same state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhaseTagList {
    first: Level,
    durations: Vec<u64>,
}

/// Parses a user-entered duration. Only positive integers are accepted.
pub fn parse_duration(input: &str) -> Option<u64> {
    match input.trim().parse::<u64>() {
        Ok(value) if value > 0 => Some(value),
        _ => None,
    }
}

impl PhaseTagList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_wire(pattern: &WirePattern) -> Option<Self> {
        let durations = pattern.durations()?;
        Some(Self {
            first: pattern.first,
            durations,
        })
    }

    pub fn len(&self) -> usize {
        self.durations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.durations.is_empty()
    }

    pub fn state_at(&self, index: usize) -> Level {
        if index % 2 == 0 {
            self.first
        } else {
            self.first.inverted()
        }
    }

    pub fn get(&self, index: usize) -> Option<PhaseTag> {
        self.durations.get(index).map(|&duration_ms| PhaseTag {
            state: self.state_at(index),
            duration_ms,
            index,
        })
    }

    pub fn tags(&self) -> Vec<PhaseTag> {
        (0..self.len()).filter_map(|i| self.get(i)).collect()
    }

    pub fn add_phase_from_input(&mut self, input: &str) -> Option<PhaseTag> {
        let Some(duration_ms) = parse_duration(input) else {
            log_debug!("rejected phase duration input {:?}", input);
            return None;
        };
        self.push_phase(duration_ms)
    }

    /// Appends a tag with the opposite state of the last one, or HIGH when
    /// the list is empty.
    pub fn push_phase(&mut self, duration_ms: u64) -> Option<PhaseTag> {
        if duration_ms == 0 {
            return None;
        }
        if self.durations.is_empty() {
            self.first = Level::High;
        }
        self.durations.push(duration_ms);
        self.get(self.durations.len() - 1)
    }

    /// Removes a tag. A removed middle tag leaves two equal-state neighbours,
    /// which collapse into the earlier one.
    pub fn remove_phase(&mut self, index: usize) -> bool {
        if index >= self.durations.len() {
            return false;
        }

        if index == 0 {
            self.durations.remove(0);
            // The next tag keeps its own state and becomes the first.
            self.first = self.first.inverted();
        } else if index + 1 < self.durations.len() {
            let next = self.durations.remove(index + 1);
            self.durations.remove(index);
            let prev = &mut self.durations[index - 1];
            *prev = prev.saturating_add(next);
        } else {
            self.durations.pop();
        }

        if self.durations.is_empty() {
            self.first = Level::High;
        }
        true
    }

    pub fn invert(&mut self) {
        if self.durations.is_empty() {
            return;
        }
        self.first = self.first.inverted();
    }

    pub fn set_duration(&mut self, index: usize, input: &str) -> bool {
        match parse_duration(input) {
            Some(duration_ms) => self.set_duration_ms(index, duration_ms),
            None => false,
        }
    }

    pub fn set_duration_ms(&mut self, index: usize, duration_ms: u64) -> bool {
        if duration_ms == 0 {
            return false;
        }
        match self.durations.get_mut(index) {
            Some(slot) => {
                *slot = duration_ms;
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.durations.clear();
        self.first = Level::High;
    }

    pub fn total_duration(&self) -> u64 {
        self.durations
            .iter()
            .fold(0u64, |acc, &d| acc.saturating_add(d))
    }

    pub fn segments(&self) -> SegmentSequence {
        SegmentSequence::from_alternating(self.first, &self.durations)
    }
}
