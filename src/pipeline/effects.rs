// The per-region effect settings. The audio side turns these into a chain of
// EffectSpecs; this file only knows about values, ranges and defaults.

use serde::{Deserialize, Serialize};

pub const TRANSPOSE_MIN: i32 = -12;
pub const TRANSPOSE_MAX: i32 = 12;
pub const TEMPO_MIN: f32 = 0.5;
pub const TEMPO_MAX: f32 = 2.0;
pub const CUTOFF_MIN_HZ: f32 = 100.0;
pub const CUTOFF_MAX_HZ: f32 = 10_000.0;
pub const VOLUME_MAX: f32 = 2.0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterKind {
    #[default]
    Lowpass,
    Highpass,
    Bandpass,
    Notch,
}

impl FilterKind {
    pub fn next(self) -> Self {
        match self {
            FilterKind::Lowpass => FilterKind::Highpass,
            FilterKind::Highpass => FilterKind::Bandpass,
            FilterKind::Bandpass => FilterKind::Notch,
            FilterKind::Notch => FilterKind::Lowpass,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            FilterKind::Lowpass => "LP",
            FilterKind::Highpass => "HP",
            FilterKind::Bandpass => "BP",
            FilterKind::Notch => "NOTCH",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EffectParameters {
    pub transpose: i32,        // semitones
    pub tempo_ratio: f32,      // 1.0 = as recorded
    pub reverb_mix: f32,       // 0 = bypassed
    pub flanger_mix: f32,      // 0 = bypassed
    pub filter_cutoff_hz: f32, // lowpass at the max is bypassed
    pub filter_kind: FilterKind,
    pub volume_gain: f32,
}

impl Default for EffectParameters {
    fn default() -> Self {
        Self {
            transpose: 0,
            tempo_ratio: 1.0,
            reverb_mix: 0.0,
            flanger_mix: 0.0,
            filter_cutoff_hz: CUTOFF_MAX_HZ,
            filter_kind: FilterKind::Lowpass,
            volume_gain: 1.0,
        }
    }
}

impl EffectParameters {
    /// Speed of the source read head: tempo times the transposition ratio.
    pub fn playback_rate(&self) -> f64 {
        self.tempo_ratio as f64 * 2f64.powf(self.transpose as f64 / 12.0)
    }

    pub fn apply(&mut self, change: ParamChange) {
        match change {
            ParamChange::Transpose(v) => self.transpose = v.clamp(TRANSPOSE_MIN, TRANSPOSE_MAX),
            ParamChange::TempoRatio(v) => self.tempo_ratio = clamp_f(v, TEMPO_MIN, TEMPO_MAX, 1.0),
            ParamChange::ReverbMix(v) => self.reverb_mix = clamp_f(v, 0.0, 1.0, 0.0),
            ParamChange::FlangerMix(v) => self.flanger_mix = clamp_f(v, 0.0, 1.0, 0.0),
            ParamChange::FilterCutoff(v) => {
                self.filter_cutoff_hz = clamp_f(v, CUTOFF_MIN_HZ, CUTOFF_MAX_HZ, CUTOFF_MAX_HZ)
            }
            ParamChange::FilterKind(k) => self.filter_kind = k,
            ParamChange::VolumeGain(v) => self.volume_gain = clamp_f(v, 0.0, VOLUME_MAX, 1.0),
        }
    }

    // one knob click on a given parameter, in the direction of `dir`
    pub fn nudge(&self, param: Param, dir: f32) -> ParamChange {
        let dir = dir.signum();
        match param {
            Param::Transpose => ParamChange::Transpose(self.transpose + dir as i32),
            Param::TempoRatio => ParamChange::TempoRatio(self.tempo_ratio + 0.05 * dir),
            Param::ReverbMix => ParamChange::ReverbMix(self.reverb_mix + 0.05 * dir),
            Param::FlangerMix => ParamChange::FlangerMix(self.flanger_mix + 0.05 * dir),
            // cutoff moves in octave-ish steps, linear steps are useless down low
            Param::FilterCutoff => ParamChange::FilterCutoff(self.filter_cutoff_hz * 2f32.powf(0.25 * dir)),
            Param::FilterKind => ParamChange::FilterKind(self.filter_kind.next()),
            Param::VolumeGain => ParamChange::VolumeGain(self.volume_gain + 0.05 * dir),
        }
    }

    pub fn value_label(&self, param: Param) -> String {
        match param {
            Param::Transpose => format!("{:+}st", self.transpose),
            Param::TempoRatio => format!("{:.2}x", self.tempo_ratio),
            Param::ReverbMix => format!("{:.0}%", self.reverb_mix * 100.0),
            Param::FlangerMix => format!("{:.0}%", self.flanger_mix * 100.0),
            Param::FilterCutoff => format!("{:.0}Hz", self.filter_cutoff_hz),
            Param::FilterKind => self.filter_kind.label().to_string(),
            Param::VolumeGain => format!("{:.2}", self.volume_gain),
        }
    }
}

// NaN would poison the whole graph, so it falls back to the default instead
fn clamp_f(v: f32, lo: f32, hi: f32, fallback: f32) -> f32 {
    if v.is_nan() { fallback } else { v.clamp(lo, hi) }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ParamChange {
    Transpose(i32),
    TempoRatio(f32),
    ReverbMix(f32),
    FlangerMix(f32),
    FilterCutoff(f32),
    FilterKind(FilterKind),
    VolumeGain(f32),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Param {
    Transpose,
    TempoRatio,
    ReverbMix,
    FlangerMix,
    FilterCutoff,
    FilterKind,
    VolumeGain,
}

impl Param {
    pub fn label(self) -> &'static str {
        match self {
            Param::Transpose => "PITCH",
            Param::TempoRatio => "TEMPO",
            Param::ReverbMix => "REVERB",
            Param::FlangerMix => "FLANGE",
            Param::FilterCutoff => "CUTOFF",
            Param::FilterKind => "TYPE",
            Param::VolumeGain => "VOLUME",
        }
    }
}
