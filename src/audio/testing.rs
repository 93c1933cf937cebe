use std::sync::{Arc, Mutex};

use anyhow::Result;
use tokio::time::Instant;

use crate::utils::sync::lock;

use super::{Tone, ToneOutput};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum OutputEvent {
    Start {
        at_ms: u64,
        channel: usize,
        frequency_hz: f32,
    },
    End {
        at_ms: u64,
        channel: usize,
    },
    Release {
        at_ms: u64,
    },
}

/// Records every call with its offset from creation, in tokio time.
pub(crate) struct RecordingOutput {
    origin: Instant,
    events: Mutex<Vec<OutputEvent>>,
}

impl RecordingOutput {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            origin: Instant::now(),
            events: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn events(&self) -> Vec<OutputEvent> {
        lock(&self.events).clone()
    }

    fn elapsed_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }

    fn record(&self, event: OutputEvent) {
        lock(&self.events).push(event);
    }
}

impl ToneOutput for RecordingOutput {
    fn start_tone(&self, channel: usize, tone: &Tone) -> Result<()> {
        self.record(OutputEvent::Start {
            at_ms: self.elapsed_ms(),
            channel,
            frequency_hz: tone.frequency_hz,
        });
        Ok(())
    }

    fn end_tone(&self, channel: usize) -> Result<()> {
        self.record(OutputEvent::End {
            at_ms: self.elapsed_ms(),
            channel,
        });
        Ok(())
    }

    fn release(&self) -> Result<()> {
        self.record(OutputEvent::Release {
            at_ms: self.elapsed_ms(),
        });
        Ok(())
    }
}
