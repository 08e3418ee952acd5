//! Live output through the default cpal device.
//!
//! The stream callback owns a [`Mixer`]. Voices reach it through a channel
//! drained at the top of every callback, and the callback publishes its frame
//! count so the rest of the program can read the output clock without
//! locking.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex, PoisonError};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tracing::{error, info};

use super::mixer::{Mixer, Voice, VoiceId};
use super::output::AudioOutput;
use crate::error::NgoniError;
use crate::timebase::frame_at;

enum Command {
    Start(VoiceId, Voice, u64),
    Stop(VoiceId),
}

/// Owns the cpal stream. The stream is not `Send`, so it stays with whoever
/// opened it; share [`DeviceOutput::handle`] instead.
pub struct DeviceOutput {
    _stream: cpal::Stream,
    handle: Arc<DeviceHandle>,
}

/// The thread-safe side of a [`DeviceOutput`].
pub struct DeviceHandle {
    sample_rate: u32,
    frames: Arc<AtomicU64>,
    commands: Mutex<Sender<Command>>,
    error: Arc<Mutex<Option<String>>>,
    next_id: AtomicU64,
}

impl DeviceOutput {
    pub fn open() -> Result<Self, NgoniError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| NgoniError::AudioUnavailable("no default output device".to_string()))?;
        let config = device
            .default_output_config()
            .map_err(|e| NgoniError::AudioUnavailable(e.to_string()))?;
        if config.sample_format() != cpal::SampleFormat::F32 {
            return Err(NgoniError::AudioUnavailable(format!(
                "unsupported sample format {:?}",
                config.sample_format()
            )));
        }

        let sample_rate = config.sample_rate().0;
        let channels = config.channels() as usize;
        let frames = Arc::new(AtomicU64::new(0));
        let error = Arc::new(Mutex::new(None));
        let (tx, rx) = mpsc::channel::<Command>();

        let mut mixer = Mixer::new(channels);
        let frames_clock = Arc::clone(&frames);
        let stream_error = Arc::clone(&error);

        let stream = device
            .build_output_stream(
                &config.into(),
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    while let Ok(command) = rx.try_recv() {
                        match command {
                            Command::Start(id, voice, start) => mixer.schedule(id, voice, start),
                            Command::Stop(id) => mixer.stop(id),
                        }
                    }
                    mixer.process(data);
                    frames_clock.store(mixer.frame(), Ordering::Release);
                },
                move |err| {
                    error!(error = %err, "audio stream error");
                    *stream_error.lock().unwrap_or_else(PoisonError::into_inner) =
                        Some(err.to_string());
                },
                None,
            )
            .map_err(|e| NgoniError::AudioUnavailable(e.to_string()))?;
        stream
            .play()
            .map_err(|e| NgoniError::AudioUnavailable(e.to_string()))?;

        info!(sample_rate, channels, "audio device opened");
        Ok(Self {
            _stream: stream,
            handle: Arc::new(DeviceHandle {
                sample_rate,
                frames,
                commands: Mutex::new(tx),
                error,
                next_id: AtomicU64::new(1),
            }),
        })
    }

    pub fn handle(&self) -> Arc<DeviceHandle> {
        Arc::clone(&self.handle)
    }
}

impl DeviceHandle {
    fn send(&self, command: Command) {
        // The receiver only goes away with the stream.
        let _ = self
            .commands
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .send(command);
    }
}

impl AudioOutput for DeviceHandle {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn current_time(&self) -> f64 {
        self.frames.load(Ordering::Acquire) as f64 / self.sample_rate as f64
    }

    fn resume(&self) -> Result<(), NgoniError> {
        match self
            .error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
        {
            Some(reason) => Err(NgoniError::AudioUnavailable(reason)),
            None => Ok(()),
        }
    }

    fn schedule(&self, voice: Voice, at: f64) -> VoiceId {
        let id = VoiceId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.send(Command::Start(id, voice, frame_at(at, self.sample_rate)));
        id
    }

    fn stop_voice(&self, id: VoiceId) {
        self.send(Command::Stop(id));
    }
}
