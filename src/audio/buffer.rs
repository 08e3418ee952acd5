//! Audio data containers

/// A mono one-shot sound (string pluck or metronome click).
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// Pitch name or other label, for logs and tests.
    pub name: String,
    pub sample_rate: u32,
    pub frames: Vec<f32>,
}

impl Sample {
    pub fn new(name: impl Into<String>, sample_rate: u32, frames: Vec<f32>) -> Self {
        Self {
            name: name.into(),
            sample_rate,
            frames,
        }
    }

    /// One second of decaying sine, used when a sample file is missing.
    ///
    /// `sin(2πft) * e^(-4t)`
    pub fn fallback_tone(name: impl Into<String>, frequency: f32, sample_rate: u32) -> Self {
        let len = sample_rate as usize;
        let frames = (0..len)
            .map(|i| {
                let t = i as f32 / sample_rate as f32;
                (2.0 * std::f32::consts::PI * frequency * t).sin() * (-4.0 * t).exp()
            })
            .collect();
        Self::new(name, sample_rate, frames)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn duration(&self) -> f64 {
        self.frames.len() as f64 / self.sample_rate as f64
    }

    /// Linear-interpolation resample to `sample_rate`.
    pub fn resampled(self, sample_rate: u32) -> Self {
        if sample_rate == self.sample_rate || self.frames.is_empty() {
            return Self {
                sample_rate,
                ..self
            };
        }
        let ratio = self.sample_rate as f64 / sample_rate as f64;
        let len = (self.frames.len() as f64 / ratio).round() as usize;
        let last = self.frames.len() - 1;
        let frames = (0..len)
            .map(|i| {
                let pos = i as f64 * ratio;
                let index = (pos.floor() as usize).min(last);
                let next = (index + 1).min(last);
                let frac = (pos - index as f64) as f32;
                self.frames[index] * (1.0 - frac) + self.frames[next] * frac
            })
            .collect();
        Self {
            name: self.name,
            sample_rate,
            frames,
        }
    }
}

/// Interleaved multi-channel output buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    pub sample_rate: u32,
    pub channels: u16,
    pub samples: Vec<f32>,
}

impl AudioBuffer {
    /// A silent buffer of `frames` frames.
    pub fn silent(sample_rate: u32, channels: u16, frames: usize) -> Self {
        Self {
            sample_rate,
            channels,
            samples: vec![0.0; frames * channels as usize],
        }
    }

    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels.max(1) as usize
    }

    pub fn duration(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }

    /// Samples of one channel.
    pub fn channel(&self, channel: u16) -> impl Iterator<Item = f32> + '_ {
        self.samples
            .iter()
            .skip(channel as usize)
            .step_by(self.channels.max(1) as usize)
            .copied()
    }

    pub fn peak(&self) -> f32 {
        self.samples.iter().fold(0.0_f32, |acc, s| acc.max(s.abs()))
    }

    /// Index of the first frame whose absolute value exceeds `threshold`.
    pub fn first_sound(&self, threshold: f32) -> Option<usize> {
        self.samples
            .iter()
            .position(|s| s.abs() > threshold)
            .map(|i| i / self.channels.max(1) as usize)
    }
}
