//! Sample-accurate voice mixer.
//!
//! The same mixer runs inside the live device callback and inside the offline
//! renderer. A voice scheduled for frame `n` starts exactly at frame `n`
//! whichever block that frame falls in, so both paths place sounds on the
//! same frames.

use std::sync::Arc;

use super::buffer::{AudioBuffer, Sample};

/// Handle to a scheduled voice, used to stop it early.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VoiceId(pub u64);

#[derive(Debug, Clone)]
pub enum Source {
    /// Mono sample, copied to every output channel.
    Sample(Arc<Sample>),
    /// Pre-rendered multi-channel buffer.
    Buffer(Arc<AudioBuffer>),
}

impl Source {
    fn len(&self) -> usize {
        match self {
            Source::Sample(sample) => sample.len(),
            Source::Buffer(buffer) => buffer.frames(),
        }
    }

    fn value(&self, frame: usize, channel: usize) -> f32 {
        match self {
            Source::Sample(sample) => sample.frames[frame],
            Source::Buffer(buffer) => {
                let channels = buffer.channels.max(1) as usize;
                buffer.samples[frame * channels + channel.min(channels - 1)]
            }
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Source::Sample(sample) => &sample.name,
            Source::Buffer(_) => "prerendered",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Voice {
    pub source: Source,
    pub gain: f32,
}

impl Voice {
    pub fn sample(sample: Arc<Sample>, gain: f32) -> Self {
        Self {
            source: Source::Sample(sample),
            gain,
        }
    }

    pub fn buffer(buffer: Arc<AudioBuffer>) -> Self {
        Self {
            source: Source::Buffer(buffer),
            gain: 1.0,
        }
    }
}

#[derive(Debug)]
struct Playing {
    id: VoiceId,
    voice: Voice,
    start: u64,
    position: usize,
}

#[derive(Debug)]
pub struct Mixer {
    channels: usize,
    frame: u64,
    voices: Vec<Playing>,
}

impl Mixer {
    pub fn new(channels: usize) -> Self {
        Self {
            channels: channels.max(1),
            frame: 0,
            voices: Vec::new(),
        }
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Frames rendered so far.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Queue a voice to start at absolute frame `start`. Voices whose start is
    /// already past begin at the next rendered frame.
    pub fn schedule(&mut self, id: VoiceId, voice: Voice, start: u64) {
        self.voices.push(Playing {
            id,
            voice,
            start,
            position: 0,
        });
    }

    pub fn stop(&mut self, id: VoiceId) {
        self.voices.retain(|v| v.id != id);
    }

    pub fn stop_all(&mut self) {
        self.voices.clear();
    }

    pub fn active_voices(&self) -> usize {
        self.voices.len()
    }

    /// Render one interleaved block, overwriting `out`.
    pub fn process(&mut self, out: &mut [f32]) {
        out.fill(0.0);
        let frames = out.len() / self.channels;
        let block_start = self.frame;
        let block_end = block_start + frames as u64;

        for playing in self.voices.iter_mut() {
            if playing.start >= block_end {
                continue;
            }
            let offset = playing.start.saturating_sub(block_start) as usize;
            let len = playing.voice.source.len();
            for frame in offset..frames {
                if playing.position >= len {
                    break;
                }
                for channel in 0..self.channels {
                    out[frame * self.channels + channel] +=
                        playing.voice.source.value(playing.position, channel) * playing.voice.gain;
                }
                playing.position += 1;
            }
        }

        self.voices
            .retain(|v| v.start >= block_end || v.position < v.voice.source.len());
        self.frame = block_end;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn impulse() -> Arc<Sample> {
        Arc::new(Sample::new("impulse", 100, vec![1.0, 0.5]))
    }

    #[test]
    fn test_voice_starts_on_exact_frame_across_blocks() {
        let mut mixer = Mixer::new(2);
        mixer.schedule(VoiceId(1), Voice::sample(impulse(), 1.0), 5);

        let mut block = vec![0.0; 8]; // 4 frames
        mixer.process(&mut block);
        assert!(block.iter().all(|s| *s == 0.0));

        mixer.process(&mut block);
        // frame 5 is the second frame of this block
        assert_eq!(block, vec![0.0, 0.0, 1.0, 1.0, 0.5, 0.5, 0.0, 0.0]);
        assert_eq!(mixer.active_voices(), 0);
        assert_eq!(mixer.frame(), 8);
    }

    #[test]
    fn test_voice_spanning_block_boundary() {
        let mut mixer = Mixer::new(1);
        mixer.schedule(VoiceId(1), Voice::sample(impulse(), 0.5), 3);
        let mut block = vec![0.0; 4];
        mixer.process(&mut block);
        assert_eq!(block, vec![0.0, 0.0, 0.0, 0.5]);
        mixer.process(&mut block);
        assert_eq!(block, vec![0.25, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_late_voice_starts_immediately() {
        let mut mixer = Mixer::new(1);
        let mut block = vec![0.0; 4];
        mixer.process(&mut block);
        mixer.schedule(VoiceId(1), Voice::sample(impulse(), 1.0), 1);
        mixer.process(&mut block);
        assert_eq!(block, vec![1.0, 0.5, 0.0, 0.0]);
    }

    #[test]
    fn test_voices_sum_and_stop() {
        let mut mixer = Mixer::new(1);
        mixer.schedule(VoiceId(1), Voice::sample(impulse(), 1.0), 0);
        mixer.schedule(VoiceId(2), Voice::sample(impulse(), 1.0), 0);
        mixer.schedule(VoiceId(3), Voice::sample(impulse(), 1.0), 0);
        mixer.stop(VoiceId(3));
        let mut block = vec![0.0; 2];
        mixer.process(&mut block);
        assert_eq!(block, vec![2.0, 1.0]);
    }

    #[test]
    fn test_stereo_buffer_source() {
        let buffer = Arc::new(AudioBuffer {
            sample_rate: 100,
            channels: 2,
            samples: vec![0.1, 0.2, 0.3, 0.4],
        });
        let mut mixer = Mixer::new(2);
        mixer.schedule(VoiceId(1), Voice::buffer(buffer), 0);
        let mut block = vec![0.0; 6];
        mixer.process(&mut block);
        assert_eq!(block, vec![0.1, 0.2, 0.3, 0.4, 0.0, 0.0]);
    }
}
