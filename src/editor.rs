use std::sync::{Arc, Mutex, RwLock};

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::audio::{self, AudioScheduler, PlaybackStatus, Tone, ToneOutput};
use crate::coalesce::CoalescingScheduler;
use crate::gateway::HttpGateway;
use crate::morse;
use crate::pattern::{parse_duration, PatternController, PhaseTag, PhaseTagList};
use crate::segment::SegmentSequence;
use crate::settings::EditorSettings;
use crate::speaker::{SpeakerPlayer, SpeakerTracks, TrackSegment};
use crate::timeline::{self, TimelineLayout};
use crate::utils::sync::{lock, read, write};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum EditorMode {
    #[default]
    Pattern,
    Morse,
}

struct MorseState {
    text: String,
    dit_duration_ms: u64,
}

/// What `load_initial_data` managed to restore.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub morse: bool,
    pub pattern: bool,
}

/// Everything behind the editor UI: the pattern and Morse sources, speaker
/// tracks, previews and autosave.
#[derive(Clone)]
pub struct SignalEditor {
    settings: EditorSettings,
    mode: Arc<Mutex<EditorMode>>,
    pattern: PatternController,
    morse: Arc<Mutex<MorseState>>,
    speaker_tracks: Arc<RwLock<SpeakerTracks>>,
    preview: AudioScheduler,
    speaker: SpeakerPlayer,
    gateway: HttpGateway,
    pattern_saver: CoalescingScheduler,
    morse_saver: CoalescingScheduler,
    speaker_saver: CoalescingScheduler,
}

impl SignalEditor {
    /// Editor playing through the default output device.
    pub fn new(settings: EditorSettings) -> Result<Self> {
        Self::with_outputs(settings, audio::default_output(), audio::default_output())
    }

    pub fn with_outputs(
        settings: EditorSettings,
        preview_output: Arc<dyn ToneOutput>,
        speaker_output: Arc<dyn ToneOutput>,
    ) -> Result<Self> {
        let gateway = HttpGateway::new(settings.gateway_url.clone())?;
        let speaker_tracks = Arc::new(RwLock::new(SpeakerTracks::new()));

        let editor = Self {
            mode: Arc::new(Mutex::new(EditorMode::default())),
            pattern: PatternController::new(),
            morse: Arc::new(Mutex::new(MorseState {
                text: String::new(),
                dit_duration_ms: settings.dit_duration_ms,
            })),
            preview: AudioScheduler::new(
                preview_output,
                Tone::square(settings.tone_frequency_hz),
            ),
            speaker: SpeakerPlayer::new(Arc::clone(&speaker_tracks), speaker_output),
            speaker_tracks,
            pattern_saver: CoalescingScheduler::new("pattern", settings.pattern_save_delay()),
            morse_saver: CoalescingScheduler::new("morse", settings.morse_save_delay()),
            speaker_saver: CoalescingScheduler::new("speaker", settings.speaker_save_delay()),
            gateway,
            settings,
        };

        let saver = editor.pattern_saver.clone();
        let gateway = editor.gateway.clone();
        editor.pattern.on_rebuild(move |seq| {
            let Some(wire) = seq.to_wire() else {
                // An empty pattern has no wire form; drop the stale save.
                saver.cancel();
                return;
            };
            let gateway = gateway.clone();
            saver.request(move || async move {
                gateway.save_pattern(&wire).await;
            });
        });

        Ok(editor)
    }

    pub fn settings(&self) -> &EditorSettings {
        &self.settings
    }

    pub fn mode(&self) -> EditorMode {
        *lock(&self.mode)
    }

    pub fn set_mode(&self, mode: EditorMode) {
        let previous = std::mem::replace(&mut *lock(&self.mode), mode);
        if previous != mode {
            log_info!("editor mode: {:?}", mode);
        }
    }

    pub fn pattern(&self) -> &PatternController {
        &self.pattern
    }

    pub fn phase_tags(&self) -> Vec<PhaseTag> {
        self.pattern.tags()
    }

    pub fn add_phase_from_input(&self, input: &str) -> Option<PhaseTag> {
        self.pattern.add_phase_from_input(input)
    }

    pub fn remove_phase(&self, index: usize) -> bool {
        self.pattern.remove_phase(index)
    }

    pub fn invert_pattern(&self) -> bool {
        self.pattern.invert()
    }

    pub fn clear_pattern(&self) -> bool {
        self.pattern.clear()
    }

    pub fn set_phase_duration(&self, index: usize, input: &str) -> bool {
        self.pattern.set_duration(index, input)
    }

    pub fn morse_text(&self) -> String {
        lock(&self.morse).text.clone()
    }

    /// Replaces the Morse text and schedules a save of it.
    pub fn set_morse_text(&self, text: &str) {
        lock(&self.morse).text = text.to_string();

        let gateway = self.gateway.clone();
        let text = text.to_string();
        self.morse_saver.request(move || async move {
            gateway.save_morse_message(&text).await;
        });
    }

    pub fn dit_duration(&self) -> u64 {
        lock(&self.morse).dit_duration_ms
    }

    /// Sets the dit length from user input. Anything but a positive integer
    /// falls back to the configured default. Returns the value in effect.
    pub fn set_dit_duration(&self, input: &str) -> u64 {
        let dit_ms = parse_duration(input).unwrap_or_else(|| {
            log_debug!("invalid dit duration {:?}, using default", input);
            self.settings.dit_duration_ms
        });
        lock(&self.morse).dit_duration_ms = dit_ms;
        dit_ms
    }

    pub fn morse_segments(&self) -> SegmentSequence {
        let morse = lock(&self.morse);
        morse::encode(&morse.text, morse.dit_duration_ms)
    }

    pub fn morse_display(&self) -> String {
        morse::display(&lock(&self.morse).text)
    }

    /// The sequence of whichever source the editor is showing.
    pub fn current_segments(&self) -> SegmentSequence {
        match self.mode() {
            EditorMode::Pattern => self.pattern.current_segments(),
            EditorMode::Morse => self.morse_segments(),
        }
    }

    /// Lays the current sequence out over `width_px`, never narrower than the
    /// configured minimum.
    pub fn timeline(&self, width_px: f64) -> Option<TimelineLayout> {
        let width_px = width_px.max(self.settings.min_timeline_width_px);
        timeline::layout(&self.current_segments(), width_px)
    }

    pub fn total_display(&self) -> String {
        timeline::format_total(self.current_segments().total_duration())
    }

    pub fn play(&self) -> bool {
        self.preview.play(&self.current_segments())
    }

    pub fn stop(&self) {
        self.preview.stop();
    }

    pub fn playback_status(&self) -> PlaybackStatus {
        self.preview.status()
    }

    pub fn speaker_tracks(&self) -> SpeakerTracks {
        read(&self.speaker_tracks).clone()
    }

    pub fn add_speaker_segment(&self, track: usize, segment: TrackSegment) -> bool {
        self.edit_speaker(|tracks| tracks.add_segment(track, segment))
    }

    pub fn update_speaker_segment(&self, track: usize, index: usize, segment: TrackSegment) -> bool {
        self.edit_speaker(|tracks| tracks.update_segment(track, index, segment))
    }

    pub fn remove_speaker_segment(&self, track: usize, index: usize) -> Option<TrackSegment> {
        let mut removed = None;
        self.edit_speaker(|tracks| {
            removed = tracks.remove_segment(track, index);
            removed.is_some()
        });
        removed
    }

    pub fn move_speaker_segment(&self, track: usize, from: usize, to: usize) -> bool {
        self.edit_speaker(|tracks| tracks.move_segment(track, from, to))
    }

    pub fn set_speaker_duration(&self, track: usize, index: usize, duration_ms: u64) -> bool {
        self.edit_speaker(|tracks| tracks.set_duration(track, index, duration_ms))
    }

    pub fn play_speaker(&self) -> bool {
        self.speaker.play()
    }

    pub fn stop_speaker(&self) {
        self.speaker.stop();
    }

    pub fn speaker_status(&self) -> PlaybackStatus {
        self.speaker.status()
    }

    /// Restores the Morse text and pattern stored on the device. Whatever is
    /// missing or malformed leaves the editor as it was. Nothing is saved
    /// back as a result of loading.
    pub async fn load_initial_data(&self) -> LoadReport {
        let mut report = LoadReport::default();

        if let Some(text) = self.gateway.load_morse_message().await {
            lock(&self.morse).text = text;
            report.morse = true;
        }

        if let Some(list) = self
            .gateway
            .load_pattern()
            .await
            .as_ref()
            .and_then(PhaseTagList::from_wire)
        {
            report.pattern = self.pattern.replace(list);
            self.pattern_saver.cancel();
        }

        log_info!(
            "initial data loaded (morse: {}, pattern: {})",
            report.morse,
            report.pattern
        );
        report
    }

    /// Applies `edit` and, when it changed something, schedules a save of
    /// the tracks as they are when the save fires.
    fn edit_speaker(&self, edit: impl FnOnce(&mut SpeakerTracks) -> bool) -> bool {
        let changed = edit(&mut write(&self.speaker_tracks));
        if changed {
            let tracks = Arc::clone(&self.speaker_tracks);
            let gateway = self.gateway.clone();
            self.speaker_saver.request(move || async move {
                let snapshot = read(&tracks).clone();
                gateway.save_speaker_tracks(&snapshot).await;
            });
        }
        changed
    }
}
