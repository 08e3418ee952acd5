//! Metronome click synthesis.
//!
//! A click is 100 ms of white noise through a one-pole highpass, shaped by a
//! 5 ms linear attack and an exponential decay that reaches 0.001 at 50 ms.
//! Accented beats are brighter and louder.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::buffer::Sample;

const LENGTH: f32 = 0.1;
const ATTACK: f32 = 0.005;
const DECAY_END: f32 = 0.05;
const FLOOR: f32 = 0.001;

#[derive(Debug, Clone, Copy, PartialEq)]
struct ClickShape {
    cutoff: f32,
    peak: f32,
    seed: u64,
}

const ACCENT: ClickShape = ClickShape {
    cutoff: 1500.0,
    peak: 0.35,
    seed: 1,
};

const NORMAL: ClickShape = ClickShape {
    cutoff: 1000.0,
    peak: 0.15,
    seed: 2,
};

/// The two click sounds, rendered once per sample rate.
#[derive(Debug, Clone)]
pub struct Clicks {
    pub accent: Arc<Sample>,
    pub normal: Arc<Sample>,
}

impl Clicks {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            accent: Arc::new(render(ACCENT, "click-accent", sample_rate)),
            normal: Arc::new(render(NORMAL, "click", sample_rate)),
        }
    }

    pub fn for_beat(&self, accent: bool) -> Arc<Sample> {
        if accent {
            Arc::clone(&self.accent)
        } else {
            Arc::clone(&self.normal)
        }
    }
}

fn envelope(t: f32, peak: f32) -> f32 {
    if t < ATTACK {
        peak * t / ATTACK
    } else if t < DECAY_END {
        peak * (FLOOR / peak).powf((t - ATTACK) / (DECAY_END - ATTACK))
    } else {
        FLOOR
    }
}

fn render(shape: ClickShape, name: &str, sample_rate: u32) -> Sample {
    let mut rng = StdRng::seed_from_u64(shape.seed);
    let dt = 1.0 / sample_rate as f32;
    let rc = 1.0 / (2.0 * std::f32::consts::PI * shape.cutoff);
    let alpha = rc / (rc + dt);

    let len = (LENGTH * sample_rate as f32).round() as usize;
    let mut frames = Vec::with_capacity(len);
    let (mut prev_in, mut prev_out) = (0.0_f32, 0.0_f32);
    for i in 0..len {
        let noise: f32 = rng.gen_range(-1.0..1.0);
        let filtered = alpha * (prev_out + noise - prev_in);
        prev_in = noise;
        prev_out = filtered;
        frames.push(filtered * envelope(i as f32 * dt, shape.peak));
    }
    Sample::new(name, sample_rate, frames)
}
