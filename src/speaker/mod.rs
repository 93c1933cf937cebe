pub mod player;
pub mod tracks;

pub use player::SpeakerPlayer;
pub use tracks::{SpeakerTracks, TrackSegment, TRACK_COUNT};
