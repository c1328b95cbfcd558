use std::f32::consts::{FRAC_1_SQRT_2, PI, TAU};

use rustfft::FftPlanner;

use super::block::{AudioBlock, RENDER_QUANTUM};
use super::convolver::{synthetic_impulse, Convolver};
use crate::pipeline::effects::{CUTOFF_MAX_HZ, EffectParameters, FilterKind};

// Description of one stage in a region's chain. Built on the UI thread from
// the region's parameters; `to_effect` does all the allocation up front so
// the audio thread never has to.
#[derive(Clone, Debug, PartialEq)]
pub enum EffectSpec {
    Filter { kind: FilterKind, cutoff_hz: f32 },
    Flanger { mix: f32 },
    Reverb { mix: f32, seed: u64 },
    Gain { gain: f32 },
}

impl EffectSpec {
    /// The chain for a region in its fixed order: filter, flanger, reverb,
    /// gain. Stages that would do nothing are left out entirely.
    pub fn chain_for(params: &EffectParameters, reverb_seed: u64) -> Vec<EffectSpec> {
        let mut chain = Vec::new();
        let wide_open = params.filter_kind == FilterKind::Lowpass
            && params.filter_cutoff_hz >= CUTOFF_MAX_HZ;
        if !wide_open {
            chain.push(EffectSpec::Filter {
                kind: params.filter_kind,
                cutoff_hz: params.filter_cutoff_hz,
            });
        }
        if params.flanger_mix > 0.0 {
            chain.push(EffectSpec::Flanger { mix: params.flanger_mix });
        }
        if params.reverb_mix > 0.0 {
            chain.push(EffectSpec::Reverb {
                mix: params.reverb_mix,
                seed: reverb_seed,
            });
        }
        if params.volume_gain != 1.0 {
            chain.push(EffectSpec::Gain { gain: params.volume_gain });
        }
        chain
    }

    pub fn to_effect(
        &self,
        channels: usize,
        sample_rate: u32,
        planner: &mut FftPlanner<f32>,
    ) -> Box<dyn Effect> {
        match self {
            EffectSpec::Filter { kind, cutoff_hz } => {
                Box::new(Filter::new(*kind, *cutoff_hz, channels, sample_rate))
            }
            EffectSpec::Flanger { mix } => Box::new(Flanger::new(*mix, channels, sample_rate)),
            EffectSpec::Reverb { mix, seed } => {
                Box::new(Reverb::new(*mix, *seed, channels, sample_rate, planner))
            }
            EffectSpec::Gain { gain } => Box::new(Gain { gain: *gain }),
        }
    }

    pub fn label(&self) -> String {
        match self {
            EffectSpec::Filter { kind, cutoff_hz } => format!("Filter({}, {:.0}Hz)", kind.label(), cutoff_hz),
            EffectSpec::Flanger { mix } => format!("Flanger({:.2})", mix),
            EffectSpec::Reverb { mix, .. } => format!("Reverb({:.2})", mix),
            EffectSpec::Gain { gain } => format!("Gain({:.2})", gain),
        }
    }
}

pub trait Effect: Send {
    fn process(&mut self, block: &mut AudioBlock);

    // stop anything that would otherwise keep running (lfos); called exactly
    // once when the owning voice ends or is stopped
    fn release(&mut self) {}

    fn running_oscillators(&self) -> usize {
        0
    }
}

// ── filter ────────────────────────────────────────────────────────

/// State-variable filter, one state pair per channel.
pub struct Filter {
    kind: FilterKind,
    a1: f32,
    a2: f32,
    a3: f32,
    k: f32,
    state: Vec<(f32, f32)>,
}

impl Filter {
    pub fn new(kind: FilterKind, cutoff_hz: f32, channels: usize, sample_rate: u32) -> Self {
        let nyquist_guard = sample_rate as f32 * 0.49;
        let cutoff = cutoff_hz.clamp(20.0, nyquist_guard.max(20.0));
        let g = (PI * cutoff / sample_rate as f32).tan();
        let k = 1.0 / FRAC_1_SQRT_2; // q of 1/sqrt(2)
        let a1 = 1.0 / (1.0 + g * (g + k));
        let a2 = g * a1;
        let a3 = g * a2;
        Self {
            kind,
            a1,
            a2,
            a3,
            k,
            state: vec![(0.0, 0.0); channels.max(1)],
        }
    }
}

impl Effect for Filter {
    fn process(&mut self, block: &mut AudioBlock) {
        for (ch, (ic1eq, ic2eq)) in block.channels.iter_mut().zip(self.state.iter_mut()) {
            for s in ch.iter_mut() {
                let input = *s;
                let v3 = input - *ic2eq;
                let v1 = self.a1 * *ic1eq + self.a2 * v3;
                let v2 = *ic2eq + self.a2 * *ic1eq + self.a3 * v3;
                *ic1eq = 2.0 * v1 - *ic1eq;
                *ic2eq = 2.0 * v2 - *ic2eq;
                *s = match self.kind {
                    FilterKind::Lowpass => v2,
                    FilterKind::Highpass => input - self.k * v1 - v2,
                    FilterKind::Bandpass => v1,
                    FilterKind::Notch => input - self.k * v1,
                };
            }
        }
    }
}

// ── flanger ───────────────────────────────────────────────────────

const FLANGER_BASE_DELAY: f32 = 0.003;

/// Sine lfo that drives the flanger's delay time. It runs until stopped;
/// a stopped oscillator outputs zero.
pub struct ModulationOscillator {
    phase: f32,
    phase_inc: f32,
    running: bool,
}

impl ModulationOscillator {
    pub fn new(freq_hz: f32, sample_rate: u32) -> Self {
        Self {
            phase: 0.0,
            phase_inc: TAU * freq_hz / sample_rate as f32, // radians per sample
            running: true,
        }
    }

    pub fn next(&mut self) -> f32 {
        if !self.running {
            return 0.0;
        }
        let v = self.phase.sin();
        self.phase += self.phase_inc;
        if self.phase > TAU {
            self.phase -= TAU;
        }
        v
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }
}

pub struct Flanger {
    mix: f32,
    feedback: f32,
    depth_samples: f32,
    base_samples: f32,
    lfo: ModulationOscillator,
    lines: Vec<Vec<f32>>,
    write_pos: usize,
    lfo_block: Vec<f32>,
}

impl Flanger {
    pub fn new(mix: f32, channels: usize, sample_rate: u32) -> Self {
        let rate_hz = 0.5 + mix * 2.0;
        let depth = 0.002 + mix * 0.003;
        let sr = sample_rate as f32;
        let max_delay = ((FLANGER_BASE_DELAY + depth) * sr).ceil() as usize + 2;
        Self {
            mix,
            feedback: 0.5 + mix * 0.3,
            depth_samples: depth * sr,
            base_samples: FLANGER_BASE_DELAY * sr,
            lfo: ModulationOscillator::new(rate_hz, sample_rate),
            lines: vec![vec![0.0; max_delay]; channels.max(1)],
            write_pos: 0,
            lfo_block: Vec::with_capacity(RENDER_QUANTUM),
        }
    }
}

impl Effect for Flanger {
    fn process(&mut self, block: &mut AudioBlock) {
        let frames = block.channels.first().map_or(0, Vec::len);
        // one lfo shared by every channel
        self.lfo_block.clear();
        for _ in 0..frames {
            let lfo = self.lfo.next();
            self.lfo_block.push((self.base_samples + lfo * self.depth_samples).max(1.0));
        }

        let len = self.lines[0].len();
        for (ch, line) in block.channels.iter_mut().zip(self.lines.iter_mut()) {
            let mut w = self.write_pos;
            for (s, &delay) in ch.iter_mut().zip(&self.lfo_block) {
                let delay = delay.min((len - 2) as f32);
                let read = w as f32 + len as f32 - delay;
                let i = read.floor() as usize;
                let frac = read - read.floor();
                let a = line[i % len];
                let b = line[(i + 1) % len];
                let delayed = a * (1.0 - frac) + b * frac;

                let dry = *s;
                line[w] = dry + delayed * self.feedback;
                *s = dry + delayed * self.mix;
                w = (w + 1) % len;
            }
        }
        self.write_pos = (self.write_pos + frames) % len;
    }

    fn release(&mut self) {
        self.lfo.stop();
    }

    fn running_oscillators(&self) -> usize {
        usize::from(self.lfo.is_running())
    }
}

// ── reverb ────────────────────────────────────────────────────────

pub struct Reverb {
    mix: f32,
    convolvers: Vec<Convolver>,
    wet: Vec<f32>,
}

impl Reverb {
    pub fn new(
        mix: f32,
        seed: u64,
        channels: usize,
        sample_rate: u32,
        planner: &mut FftPlanner<f32>,
    ) -> Self {
        let impulse = synthetic_impulse(sample_rate, mix, seed);
        // impulse is stereo; mono uses the left side, extra channels alternate
        let convolvers = (0..channels.max(1))
            .map(|c| Convolver::new(&impulse[c % 2], planner))
            .collect();
        Self {
            mix,
            convolvers,
            wet: Vec::with_capacity(RENDER_QUANTUM),
        }
    }
}

impl Effect for Reverb {
    fn process(&mut self, block: &mut AudioBlock) {
        for (ch, conv) in block.channels.iter_mut().zip(self.convolvers.iter_mut()) {
            self.wet.clear();
            self.wet.extend_from_slice(ch);
            conv.process(&mut self.wet);
            for (s, w) in ch.iter_mut().zip(&self.wet) {
                *s = *s * (1.0 - self.mix) + w * self.mix;
            }
        }
    }
}

// ── gain ──────────────────────────────────────────────────────────

pub struct Gain {
    gain: f32,
}

impl Effect for Gain {
    fn process(&mut self, block: &mut AudioBlock) {
        block.scale(self.gain);
    }
}
