use super::block::RENDER_QUANTUM;
use super::frame::StereoFrame;
use super::graph::SignalGraph;
use super::voice_id::{next_voice_id, VoiceId};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VoiceState {
    Idle,
    Playing,
    Ended,
    ForceStopped,
}

impl VoiceState {
    pub fn is_terminal(self) -> bool {
        matches!(self, VoiceState::Ended | VoiceState::ForceStopped)
    }
}

/// One region being rendered to the output. Owns its graph outright; the
/// graph is released exactly once, on the transition to a terminal state.
pub struct Voice {
    pub id: VoiceId,
    pub region: usize,
    state: VoiceState,
    graph: SignalGraph,
    cursor: usize, // read position inside the current rendered quantum
    valid: usize,  // source-fed frames in the current quantum
    last_quantum: bool,
}

impl Voice {
    pub fn new(region: usize, graph: SignalGraph) -> Self {
        Self {
            id: next_voice_id(),
            region,
            state: VoiceState::Idle,
            graph,
            cursor: 0,
            valid: 0,
            last_quantum: false,
        }
    }

    pub fn state(&self) -> VoiceState {
        self.state
    }

    pub fn graph(&self) -> &SignalGraph {
        &self.graph
    }

    pub fn start(&mut self) {
        if self.state == VoiceState::Idle {
            self.state = VoiceState::Playing;
        }
    }

    pub fn force_stop(&mut self) {
        self.finish(VoiceState::ForceStopped);
    }

    fn finish(&mut self, state: VoiceState) {
        if self.state.is_terminal() {
            return;
        }
        self.graph.release();
        self.state = state;
    }

    /// Mix this voice into `out`. The voice ends once every frame fed by the
    /// source has been played; effect tails past that point are cut.
    pub fn render_into(&mut self, out: &mut [StereoFrame]) {
        if self.state != VoiceState::Playing {
            return;
        }

        for frame in out.iter_mut() {
            if self.cursor >= self.valid {
                if self.last_quantum {
                    self.finish(VoiceState::Ended);
                    return;
                }
                self.valid = self.graph.render_quantum();
                self.cursor = 0;
                self.last_quantum = self.valid < RENDER_QUANTUM || self.graph.source_finished();
                if self.valid == 0 {
                    self.finish(VoiceState::Ended);
                    return;
                }
            }

            let s = StereoFrame::from_planar(&self.graph.block().channels, self.cursor);
            frame.left += s.left;
            frame.right += s.right;
            self.cursor += 1;
        }

        // ended exactly on a buffer boundary
        if self.last_quantum && self.cursor >= self.valid {
            self.finish(VoiceState::Ended);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::audio::sample_buffer::SampleBuffer;
    use crate::pipeline::effects::{EffectParameters, ParamChange};

    fn voice(len: usize, params: &EffectParameters) -> Voice {
        let slice = Arc::new(SampleBuffer::new(8000, vec![vec![0.5; len]]).unwrap());
        Voice::new(0, SignalGraph::build(slice, params, 8000, 1))
    }

    #[test]
    fn idle_voice_renders_nothing() {
        let mut v = voice(10, &EffectParameters::default());
        let mut out = vec![StereoFrame::zero(); 4];
        v.render_into(&mut out);
        assert_eq!(out[0], StereoFrame::zero());
        assert_eq!(v.state(), VoiceState::Idle);
    }

    #[test]
    fn plays_the_whole_slice_then_ends() {
        let mut v = voice(300, &EffectParameters::default());
        v.start();
        let mut out = vec![StereoFrame::zero(); 256];
        v.render_into(&mut out);
        assert_eq!(v.state(), VoiceState::Playing);
        assert!(out.iter().all(|f| f.left == 0.5 && f.right == 0.5));

        let mut out = vec![StereoFrame::zero(); 256];
        v.render_into(&mut out);
        assert_eq!(v.state(), VoiceState::Ended);
        assert_eq!(out[43].left, 0.5);
        assert_eq!(out[44].left, 0.0);
    }

    #[test]
    fn ends_on_exact_boundary() {
        let mut v = voice(RENDER_QUANTUM * 2, &EffectParameters::default());
        v.start();
        let mut out = vec![StereoFrame::zero(); RENDER_QUANTUM * 2];
        v.render_into(&mut out);
        assert_eq!(v.state(), VoiceState::Ended);
    }

    #[test]
    fn force_stop_releases_graph() {
        let mut p = EffectParameters::default();
        p.apply(ParamChange::FlangerMix(0.3));
        let mut v = voice(1000, &p);
        v.start();
        assert_eq!(v.graph().running_oscillators(), 1);
        v.force_stop();
        assert_eq!(v.state(), VoiceState::ForceStopped);
        assert_eq!(v.graph().running_oscillators(), 0);

        // terminal states stick
        v.start();
        assert_eq!(v.state(), VoiceState::ForceStopped);
    }

    #[test]
    fn natural_end_stops_the_flanger_lfo() {
        let mut p = EffectParameters::default();
        p.apply(ParamChange::FlangerMix(0.5));
        let mut v = voice(200, &p);
        v.start();
        assert_eq!(v.graph().running_oscillators(), 1);

        let mut out = vec![StereoFrame::zero(); RENDER_QUANTUM * 2];
        v.render_into(&mut out);
        assert_eq!(v.state(), VoiceState::Ended);
        assert_eq!(v.graph().running_oscillators(), 0);
    }
}
