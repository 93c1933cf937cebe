pub mod controller;
pub mod tags;

pub use controller::{PatternController, RebuildGuard, RebuildState};
pub use tags::{parse_duration, PhaseTag, PhaseTagList};
