use serde::{Deserialize, Deserializer, Serialize};

use crate::audio::{Tone, ToneEvent, Transition, Waveform};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::log_debug;

pub const TRACK_COUNT: usize = 4;

/// One tone on a speaker track, in the shape the device stores it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct TrackSegment {
    pub freq: f32,
    #[serde(default)]
    pub waveform: Waveform,
    /// Milliseconds.
    pub duration: u64,
    #[serde(default)]
    pub transition: Transition,
}

impl TrackSegment {
    pub fn new(freq: f32, waveform: Waveform, duration: u64, transition: Transition) -> Self {
        Self {
            freq,
            waveform,
            duration,
            transition,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.freq.is_finite() && self.freq > 0.0 && self.duration > 0
    }

    pub fn tone(&self) -> Tone {
        Tone {
            frequency_hz: self.freq,
            waveform: self.waveform,
            transition: self.transition,
        }
    }
}

/// The four speaker tracks. Always holds exactly `TRACK_COUNT` tracks.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SpeakerTracks {
    tracks: Vec<Vec<TrackSegment>>,
}

#[derive(Deserialize)]
struct RawTracks {
    #[serde(default)]
    tracks: Vec<Vec<TrackSegment>>,
}

impl<'de> Deserialize<'de> for SpeakerTracks {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = RawTracks::deserialize(deserializer)?;
        let mut tracks: Vec<Vec<TrackSegment>> = raw
            .tracks
            .into_iter()
            .take(TRACK_COUNT)
            .map(|track| track.into_iter().filter(TrackSegment::is_valid).collect())
            .collect();
        tracks.resize_with(TRACK_COUNT, Vec::new);
        Ok(Self { tracks })
    }
}

impl Default for SpeakerTracks {
    fn default() -> Self {
        Self::new()
    }
}

impl SpeakerTracks {
    pub fn new() -> Self {
        Self {
            tracks: vec![Vec::new(); TRACK_COUNT],
        }
    }

    pub fn track(&self, track: usize) -> Option<&[TrackSegment]> {
        self.tracks.get(track).map(Vec::as_slice)
    }

    pub fn tracks(&self) -> &[Vec<TrackSegment>] {
        &self.tracks
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.iter().all(Vec::is_empty)
    }

    pub fn add_segment(&mut self, track: usize, segment: TrackSegment) -> bool {
        if !segment.is_valid() {
            log_debug!("rejected segment {segment:?}");
            return false;
        }
        match self.tracks.get_mut(track) {
            Some(segments) => {
                segments.push(segment);
                true
            }
            None => false,
        }
    }

    pub fn update_segment(&mut self, track: usize, index: usize, segment: TrackSegment) -> bool {
        if !segment.is_valid() {
            log_debug!("rejected segment {segment:?}");
            return false;
        }
        match self.slot(track, index) {
            Some(slot) => {
                *slot = segment;
                true
            }
            None => false,
        }
    }

    pub fn remove_segment(&mut self, track: usize, index: usize) -> Option<TrackSegment> {
        let segments = self.tracks.get_mut(track)?;
        (index < segments.len()).then(|| segments.remove(index))
    }

    /// Moves a segment within its track. `to` is clamped to the last position.
    pub fn move_segment(&mut self, track: usize, from: usize, to: usize) -> bool {
        let Some(segments) = self.tracks.get_mut(track) else {
            return false;
        };
        if from >= segments.len() {
            return false;
        }
        let to = to.min(segments.len() - 1);
        let segment = segments.remove(from);
        segments.insert(to, segment);
        true
    }

    pub fn set_duration(&mut self, track: usize, index: usize, duration_ms: u64) -> bool {
        if duration_ms == 0 {
            return false;
        }
        match self.slot(track, index) {
            Some(slot) => {
                slot.duration = duration_ms;
                true
            }
            None => false,
        }
    }

    pub fn total_duration(&self, track: usize) -> u64 {
        self.track(track)
            .map(|segments| segments.iter().map(|s| s.duration).sum())
            .unwrap_or(0)
    }

    /// Length of one loop: the longest track.
    pub fn loop_length(&self) -> u64 {
        (0..TRACK_COUNT)
            .map(|track| self.total_duration(track))
            .max()
            .unwrap_or(0)
    }

    /// One loop's tone events, offsets relative to the loop start. Each
    /// non-empty track repeats on its own channel until `loop_length`; the
    /// tone crossing the boundary is cut there.
    pub fn events(&self) -> Vec<ToneEvent> {
        let loop_ms = self.loop_length();
        let mut events = Vec::new();
        for (channel, segments) in self.tracks.iter().enumerate() {
            if segments.is_empty() {
                continue;
            }
            // Every stored segment has a positive duration, so this ends.
            let mut offset_ms = 0u64;
            'fill: loop {
                for segment in segments {
                    if offset_ms >= loop_ms {
                        break 'fill;
                    }
                    let duration_ms = segment.duration.min(loop_ms - offset_ms);
                    events.push(ToneEvent {
                        channel,
                        offset_ms,
                        duration_ms,
                        tone: segment.tone(),
                    });
                    offset_ms += duration_ms;
                }
            }
        }
        events
    }

    fn slot(&mut self, track: usize, index: usize) -> Option<&mut TrackSegment> {
        self.tracks.get_mut(track)?.get_mut(index)
    }
}
