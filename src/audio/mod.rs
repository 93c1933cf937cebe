pub mod schedule;
pub mod scheduler;
pub mod voice;

#[cfg(test)]
pub(crate) mod testing;

pub use schedule::{schedule_tones, ToneEvent};
pub use scheduler::{AudioScheduler, PlaybackStatus};
pub use voice::{Tone, Transition, Voice, Waveform};

use anyhow::Result;

/// Number of independent output channels (one per speaker track).
pub const CHANNELS: usize = 4;

/// Where scheduled tones go. Calls arrive in schedule order from the
/// scheduler task and must not block.
pub trait ToneOutput: Send + Sync {
    /// Starts sounding `tone` on `channel` until `end_tone` or `release`.
    fn start_tone(&self, channel: usize, tone: &Tone) -> Result<()>;
    fn end_tone(&self, channel: usize) -> Result<()>;
    /// Silences everything and frees the device.
    fn release(&self) -> Result<()>;
}

/// Discards every tone. Used when no audio device is wanted.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentOutput;

impl ToneOutput for SilentOutput {
    fn start_tone(&self, _channel: usize, _tone: &Tone) -> Result<()> {
        Ok(())
    }

    fn end_tone(&self, _channel: usize) -> Result<()> {
        Ok(())
    }

    fn release(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(feature = "playback")]
pub use engine::AudioEngineHandle;

#[cfg(feature = "playback")]
mod engine {
    use super::{Tone, ToneOutput, Voice, CHANNELS};

    use anyhow::{anyhow, Context, Result};
    use rodio::{OutputStream, OutputStreamHandle, Sink};
    use std::sync::{
        mpsc::{self, Sender},
        Arc, Mutex,
    };
    use std::thread;

    use crate::utils::sync::lock;

    // Set to true to enable verbose logging in this module
    const ENABLE_LOGS: bool = true;

    use crate::{log_error, log_info};

    enum AudioCommand {
        StartTone { channel: usize, tone: Tone },
        EndTone { channel: usize },
        Release,
    }

    /// Handle to a dedicated audio thread that owns the non-`Send` rodio
    /// stream and one sink per channel.
    #[derive(Clone)]
    pub struct AudioEngineHandle {
        tx: Arc<Mutex<Option<Sender<AudioCommand>>>>,
    }

    struct Device {
        _stream: OutputStream,
        handle: OutputStreamHandle,
        sinks: Vec<Option<Sink>>,
    }

    impl Device {
        fn open() -> Result<Self, String> {
            let (stream, handle) = OutputStream::try_default()
                .map_err(|e| format!("Failed to create audio output stream: {}", e))?;
            Ok(Self {
                _stream: stream,
                handle,
                sinks: (0..CHANNELS).map(|_| None).collect(),
            })
        }

        fn sink(&mut self, channel: usize) -> Result<&Sink, String> {
            let slot = self
                .sinks
                .get_mut(channel)
                .ok_or_else(|| format!("no audio channel {}", channel))?;
            if slot.is_none() {
                let sink = Sink::try_new(&self.handle)
                    .map_err(|e| format!("Failed to create audio sink: {}", e))?;
                *slot = Some(sink);
            }
            slot.as_ref().ok_or_else(|| "audio sink missing".to_string())
        }
    }

    impl AudioEngineHandle {
        pub fn new() -> Self {
            Self {
                tx: Arc::new(Mutex::new(None)),
            }
        }

        fn ensure_thread(&self) -> Result<Sender<AudioCommand>> {
            let mut guard = lock(&self.tx);
            if let Some(tx) = guard.as_ref() {
                return Ok(tx.clone());
            }

            let (tx, rx) = mpsc::channel::<AudioCommand>();

            thread::Builder::new()
                .name("audio-engine".to_string())
                .spawn(move || {
                    let mut device: Option<Device> = None;

                    while let Ok(cmd) = rx.recv() {
                        match cmd {
                            AudioCommand::StartTone { channel, tone } => {
                                if device.is_none() {
                                    match Device::open() {
                                        Ok(opened) => {
                                            log_info!("audio device opened");
                                            device = Some(opened);
                                        }
                                        Err(err) => {
                                            log_error!("{err}");
                                            continue;
                                        }
                                    }
                                }
                                if let Some(dev) = device.as_mut() {
                                    match dev.sink(channel) {
                                        Ok(sink) => sink.append(Voice::new(tone)),
                                        Err(err) => log_error!("{err}"),
                                    }
                                }
                            }
                            AudioCommand::EndTone { channel } => {
                                if let Some(Some(sink)) =
                                    device.as_ref().and_then(|d| d.sinks.get(channel))
                                {
                                    if !sink.empty() {
                                        sink.skip_one();
                                    }
                                }
                            }
                            AudioCommand::Release => {
                                if let Some(dev) = device.take() {
                                    for sink in dev.sinks.iter().flatten() {
                                        sink.stop();
                                    }
                                    log_info!("audio device released");
                                }
                            }
                        }
                    }
                })
                .context("failed to spawn audio thread")?;

            *guard = Some(tx.clone());
            Ok(tx)
        }

        fn send(&self, cmd: AudioCommand) -> Result<()> {
            let tx = self.ensure_thread()?;
            tx.send(cmd).map_err(|e| anyhow!("audio thread gone: {e}"))
        }
    }

    impl Default for AudioEngineHandle {
        fn default() -> Self {
            Self::new()
        }
    }

    impl ToneOutput for AudioEngineHandle {
        fn start_tone(&self, channel: usize, tone: &Tone) -> Result<()> {
            self.send(AudioCommand::StartTone {
                channel,
                tone: *tone,
            })
        }

        fn end_tone(&self, channel: usize) -> Result<()> {
            self.send(AudioCommand::EndTone { channel })
        }

        fn release(&self) -> Result<()> {
            // Nothing to release if the thread never started.
            match lock(&self.tx).as_ref() {
                Some(tx) => tx
                    .send(AudioCommand::Release)
                    .map_err(|e| anyhow!("audio thread gone: {e}")),
                None => Ok(()),
            }
        }
    }

}

/// The device-backed output when playback is compiled in, silence otherwise.
pub fn default_output() -> std::sync::Arc<dyn ToneOutput> {
    #[cfg(feature = "playback")]
    {
        std::sync::Arc::new(AudioEngineHandle::new())
    }

    #[cfg(not(feature = "playback"))]
    {
        std::sync::Arc::new(SilentOutput)
    }
}
