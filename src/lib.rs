//! Core of a pulse-pattern and Morse signal editor: phase tag editing, Morse
//! encoding, timeline layout, square-wave preview, looping speaker tracks and
//! debounced persistence to the device gateway.

pub mod audio;
pub mod coalesce;
pub mod editor;
pub mod gateway;
pub mod morse;
pub mod pattern;
pub mod segment;
pub mod settings;
pub mod speaker;
pub mod timeline;
pub mod utils;

pub use audio::{AudioScheduler, PlaybackStatus, Tone, ToneOutput, Transition, Waveform};
pub use coalesce::CoalescingScheduler;
pub use editor::{EditorMode, LoadReport, SignalEditor};
pub use gateway::HttpGateway;
pub use pattern::{PatternController, PhaseTag, PhaseTagList};
pub use segment::{Level, Segment, SegmentSequence, WirePattern};
pub use settings::{EditorSettings, SettingsStore};
pub use speaker::{SpeakerPlayer, SpeakerTracks, TrackSegment};
pub use timeline::TimelineLayout;
pub use utils::init_logging;
