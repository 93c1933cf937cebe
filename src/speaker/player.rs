use std::sync::{Arc, RwLock};

use tokio::{
    runtime::Handle,
    time::{self, Duration, Instant},
};

use crate::audio::scheduler::{play_events, release, RunSlot};
use crate::audio::{PlaybackStatus, ToneOutput};
use crate::utils::sync::read;

use super::tracks::SpeakerTracks;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

/// Plays all speaker tracks in a loop until stopped.
///
/// Every iteration snapshots the tracks, so edits are heard from the next
/// loop boundary on. The longest track sets the loop length; shorter tracks
/// repeat inside it and all tracks restart together at the boundary.
#[derive(Clone)]
pub struct SpeakerPlayer {
    tracks: Arc<RwLock<SpeakerTracks>>,
    output: Arc<dyn ToneOutput>,
    slot: RunSlot,
}

impl SpeakerPlayer {
    pub fn new(tracks: Arc<RwLock<SpeakerTracks>>, output: Arc<dyn ToneOutput>) -> Self {
        Self {
            tracks,
            output,
            slot: RunSlot::default(),
        }
    }

    pub fn status(&self) -> PlaybackStatus {
        self.slot.status()
    }

    pub fn is_playing(&self) -> bool {
        self.status() == PlaybackStatus::Playing
    }

    /// Restarts the loop from now. `false` if every track is empty or there
    /// is no runtime.
    pub fn play(&self) -> bool {
        self.stop();

        if read(&self.tracks).loop_length() == 0 {
            log_debug!("speaker tracks are empty");
            return false;
        }
        let Ok(runtime) = Handle::try_current() else {
            log_warn!("speaker playback needs a tokio runtime");
            return false;
        };

        let tracks = Arc::clone(&self.tracks);
        let output = Arc::clone(&self.output);
        let slot = self.slot.clone();

        self.slot.start(|id, token| {
            runtime.spawn(async move {
                let mut start = Instant::now();
                let mut iterations = 0u64;
                loop {
                    let snapshot = read(&tracks).clone();
                    let loop_ms = snapshot.loop_length();
                    if loop_ms == 0 {
                        log_info!("speaker tracks emptied, stopping after {iterations} loops");
                        break;
                    }

                    let events = snapshot.events();
                    if !play_events(output.as_ref(), &events, start, &token).await {
                        return;
                    }

                    start += Duration::from_millis(loop_ms);
                    tokio::select! {
                        _ = token.cancelled() => return,
                        _ = time::sleep_until(start) => {}
                    }
                    iterations += 1;
                }
                if slot.finish(id) {
                    release(output.as_ref());
                }
            })
        });

        log_info!("speaker loop started");
        true
    }

    pub fn stop(&self) {
        if self.slot.stop() {
            release(self.output.as_ref());
            log_info!("speaker loop stopped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::testing::{OutputEvent, RecordingOutput};
    use crate::audio::{Transition, Waveform};
    use crate::speaker::tracks::TrackSegment;
    use crate::utils::sync::write;
    use pretty_assertions::assert_eq;

    fn seg(freq: f32, duration: u64) -> TrackSegment {
        TrackSegment::new(freq, Waveform::Square, duration, Transition::None)
    }

    fn shared(build: impl FnOnce(&mut SpeakerTracks)) -> Arc<RwLock<SpeakerTracks>> {
        let mut tracks = SpeakerTracks::new();
        build(&mut tracks);
        Arc::new(RwLock::new(tracks))
    }

    #[tokio::test(start_paused = true)]
    async fn shorter_tracks_keep_repeating_within_the_loop() {
        let tracks = shared(|t| {
            t.add_segment(0, seg(100.0, 100));
            t.add_segment(1, seg(200.0, 40));
        });
        let output = RecordingOutput::new();
        let player = SpeakerPlayer::new(tracks, output.clone());

        assert!(player.play());
        time::sleep(Duration::from_millis(150)).await;
        player.stop();

        assert_eq!(
            output.events(),
            vec![
                OutputEvent::Start { at_ms: 0, channel: 0, frequency_hz: 100.0 },
                OutputEvent::Start { at_ms: 0, channel: 1, frequency_hz: 200.0 },
                OutputEvent::End { at_ms: 40, channel: 1 },
                OutputEvent::Start { at_ms: 40, channel: 1, frequency_hz: 200.0 },
                OutputEvent::End { at_ms: 80, channel: 1 },
                OutputEvent::Start { at_ms: 80, channel: 1, frequency_hz: 200.0 },
                OutputEvent::End { at_ms: 100, channel: 0 },
                OutputEvent::End { at_ms: 100, channel: 1 },
                OutputEvent::Start { at_ms: 100, channel: 0, frequency_hz: 100.0 },
                OutputEvent::Start { at_ms: 100, channel: 1, frequency_hz: 200.0 },
                OutputEvent::End { at_ms: 140, channel: 1 },
                OutputEvent::Start { at_ms: 140, channel: 1, frequency_hz: 200.0 },
                OutputEvent::Release { at_ms: 150 },
            ]
        );
        assert_eq!(player.status(), PlaybackStatus::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn edits_apply_at_the_next_loop_boundary() {
        let tracks = shared(|t| {
            t.add_segment(0, seg(100.0, 100));
        });
        let output = RecordingOutput::new();
        let player = SpeakerPlayer::new(Arc::clone(&tracks), output.clone());

        player.play();
        time::sleep(Duration::from_millis(50)).await;
        write(&tracks).update_segment(0, 0, seg(300.0, 100));
        time::sleep(Duration::from_millis(100)).await;
        player.stop();

        let starts: Vec<(u64, f32)> = output
            .events()
            .into_iter()
            .filter_map(|e| match e {
                OutputEvent::Start { at_ms, frequency_hz, .. } => Some((at_ms, frequency_hz)),
                _ => None,
            })
            .collect();
        assert_eq!(starts, vec![(0, 100.0), (100, 300.0)]);
    }

    #[tokio::test(start_paused = true)]
    async fn emptied_tracks_end_the_loop() {
        let tracks = shared(|t| {
            t.add_segment(2, seg(100.0, 100));
        });
        let output = RecordingOutput::new();
        let player = SpeakerPlayer::new(Arc::clone(&tracks), output.clone());

        player.play();
        time::sleep(Duration::from_millis(50)).await;
        write(&tracks).remove_segment(2, 0);
        time::sleep(Duration::from_millis(200)).await;

        assert_eq!(player.status(), PlaybackStatus::Idle);
        assert_eq!(
            output.events(),
            vec![
                OutputEvent::Start { at_ms: 0, channel: 2, frequency_hz: 100.0 },
                OutputEvent::End { at_ms: 100, channel: 2 },
                OutputEvent::Release { at_ms: 100 },
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn empty_tracks_do_not_play() {
        let output = RecordingOutput::new();
        let player = SpeakerPlayer::new(shared(|_| {}), output.clone());
        assert!(!player.play());
        player.stop();
        assert!(output.events().is_empty());
    }
}
