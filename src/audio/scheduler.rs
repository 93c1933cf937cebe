use std::sync::{Arc, Mutex};

use serde::Serialize;
use tokio::{
    runtime::Handle,
    task::JoinHandle,
    time::{self, Duration, Instant},
};
use tokio_util::sync::CancellationToken;

use crate::segment::SegmentSequence;
use crate::utils::sync::lock;

use super::schedule::{edges, schedule_tones, EdgeKind, ToneEvent};
use super::voice::Tone;
use super::ToneOutput;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_warn};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum PlaybackStatus {
    Idle,
    Playing,
}

impl Default for PlaybackStatus {
    fn default() -> Self {
        PlaybackStatus::Idle
    }
}

struct PlaybackRun {
    id: u64,
    cancel: CancellationToken,
    _task: JoinHandle<()>,
}

#[derive(Default)]
struct SlotState {
    status: PlaybackStatus,
    run: Option<PlaybackRun>,
    next_id: u64,
}

/// At most one playback run and its status. Only the run that is still
/// current may finish itself, so the output is released exactly once.
#[derive(Clone, Default)]
pub(crate) struct RunSlot {
    state: Arc<Mutex<SlotState>>,
}

impl RunSlot {
    pub(crate) fn status(&self) -> PlaybackStatus {
        lock(&self.state).status
    }

    /// Installs a new run. `spawn` is called under the slot lock so the run
    /// cannot finish before it is registered.
    pub(crate) fn start(&self, spawn: impl FnOnce(u64, CancellationToken) -> JoinHandle<()>) {
        let mut state = lock(&self.state);
        let id = state.next_id;
        state.next_id = state.next_id.wrapping_add(1);

        let cancel = CancellationToken::new();
        let task = spawn(id, cancel.clone());
        state.status = PlaybackStatus::Playing;
        state.run = Some(PlaybackRun {
            id,
            cancel,
            _task: task,
        });
    }

    /// Cancels the current run. Returns whether there was one.
    pub(crate) fn stop(&self) -> bool {
        let run = {
            let mut state = lock(&self.state);
            state.status = PlaybackStatus::Idle;
            state.run.take()
        };
        match run {
            Some(run) => {
                run.cancel.cancel();
                true
            }
            None => false,
        }
    }

    /// Marks run `id` as done. Returns `false` if it was already replaced.
    pub(crate) fn finish(&self, id: u64) -> bool {
        let mut state = lock(&self.state);
        match &state.run {
            Some(run) if run.id == id => {
                state.status = PlaybackStatus::Idle;
                state.run = None;
                true
            }
            _ => false,
        }
    }
}

/// Fires the start and end edge of every event at `t0 + offset`.
///
/// Deadlines are absolute, so a late wake-up never shifts later events.
/// Returns `false` when cancelled before the last edge.
pub(crate) async fn play_events(
    output: &dyn ToneOutput,
    events: &[ToneEvent],
    t0: Instant,
    cancel: &CancellationToken,
) -> bool {
    for (at_ms, kind, index) in edges(events) {
        let deadline = t0 + Duration::from_millis(at_ms);
        tokio::select! {
            _ = cancel.cancelled() => return false,
            _ = time::sleep_until(deadline) => {}
        }
        if cancel.is_cancelled() {
            return false;
        }

        let event = &events[index];
        let result = match kind {
            EdgeKind::Start => output.start_tone(event.channel, &event.tone),
            EdgeKind::End => output.end_tone(event.channel),
        };
        if let Err(err) = result {
            log_warn!("tone output failed on channel {}: {err:?}", event.channel);
        }
    }
    true
}

pub(crate) fn release(output: &dyn ToneOutput) {
    if let Err(err) = output.release() {
        log_warn!("failed to release audio output: {err:?}");
    }
}

/// Cancellable one-shot playback of a pulse train as square-wave tones.
#[derive(Clone)]
pub struct AudioScheduler {
    output: Arc<dyn ToneOutput>,
    tone: Tone,
    channel: usize,
    slot: RunSlot,
}

impl AudioScheduler {
    pub fn new(output: Arc<dyn ToneOutput>, tone: Tone) -> Self {
        Self {
            output,
            tone,
            channel: 0,
            slot: RunSlot::default(),
        }
    }

    pub fn status(&self) -> PlaybackStatus {
        self.slot.status()
    }

    pub fn is_playing(&self) -> bool {
        self.status() == PlaybackStatus::Playing
    }

    /// Starts playback from now. A running playback is stopped first.
    ///
    /// Returns `false` when there is nothing to play or no tokio runtime to
    /// drive the schedule.
    pub fn play(&self, seq: &SegmentSequence) -> bool {
        self.stop();

        let total_ms = seq.total_duration();
        if total_ms == 0 {
            log_debug!("nothing to play");
            return false;
        }
        let Ok(runtime) = Handle::try_current() else {
            log_warn!("playback needs a tokio runtime");
            return false;
        };

        let events = schedule_tones(seq, self.channel, self.tone);
        let output = Arc::clone(&self.output);
        let slot = self.slot.clone();
        let t0 = Instant::now();

        self.slot.start(|id, token| {
            runtime.spawn(async move {
                if !play_events(output.as_ref(), &events, t0, &token).await {
                    return;
                }
                // Hold the device through the trailing LOW segments.
                let end = t0 + Duration::from_millis(total_ms);
                tokio::select! {
                    _ = token.cancelled() => return,
                    _ = time::sleep_until(end) => {}
                }
                if slot.finish(id) {
                    release(output.as_ref());
                }
            })
        });

        log_debug!("playing {} segments over {} ms", seq.len(), total_ms);
        true
    }

    /// Cancels every pending edge and releases the output. No-op when idle;
    /// safe to call from inside an output callback.
    pub fn stop(&self) {
        if self.slot.stop() {
            release(self.output.as_ref());
        }
    }
}
