// The per-trigger processing graph: a resampling source reader followed by the
// region's effect stages. Live voices and the offline exporter both run this,
// so what you audition is what you export.

use std::sync::Arc;

use rustfft::FftPlanner;
use tracing::debug;

use super::block::{AudioBlock, RENDER_QUANTUM};
use super::effect::{Effect, EffectSpec};
use super::sample_buffer::SampleBuffer;
use crate::pipeline::effects::EffectParameters;

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a * (1.0 - t) + b * t
}

/// Reads a raw region slice at an arbitrary rate with linear interpolation.
pub struct SourceReader {
    buffer: Arc<SampleBuffer>,
    pos: f64,
    step: f64,
}

impl SourceReader {
    pub fn new(buffer: Arc<SampleBuffer>, step: f64) -> Self {
        Self { buffer, pos: 0.0, step }
    }

    pub fn finished(&self) -> bool {
        self.pos >= self.buffer.len() as f64
    }

    // fill the whole block; frames past the end are silence.
    // returns how many frames came from the source.
    fn fill(&mut self, block: &mut AudioBlock) -> usize {
        let len = self.buffer.len();
        let mut live = 0;
        for f in 0..RENDER_QUANTUM {
            if self.finished() {
                for ch in &mut block.channels {
                    ch[f] = 0.0;
                }
                continue;
            }
            let i = self.pos as usize;
            let frac = (self.pos - i as f64) as f32;
            for (out, data) in block.channels.iter_mut().zip(&self.buffer.channels) {
                let s0 = data[i];
                let s1 = if i + 1 < len { data[i + 1] } else { s0 };
                out[f] = lerp(s0, s1, frac);
            }
            self.pos += self.step;
            live += 1;
        }
        live
    }
}

pub struct SignalGraph {
    source: SourceReader,
    stages: Vec<Box<dyn Effect>>,
    labels: Vec<String>,
    block: AudioBlock,
    released: bool,
}

impl SignalGraph {
    /// Build the graph for one trigger of a region. `output_rate` is the rate
    /// the graph runs at; the read head is scaled so pitch stays correct when
    /// it differs from the slice's own rate.
    pub fn build(
        slice: Arc<SampleBuffer>,
        params: &EffectParameters,
        output_rate: u32,
        reverb_seed: u64,
    ) -> Self {
        let channels = slice.channel_count();
        let step = params.playback_rate() * slice.sample_rate as f64 / output_rate as f64;
        let specs = EffectSpec::chain_for(params, reverb_seed);

        let mut planner = FftPlanner::new();
        let stages = specs
            .iter()
            .map(|s| s.to_effect(channels, output_rate, &mut planner))
            .collect();
        let labels: Vec<String> = specs.iter().map(EffectSpec::label).collect();
        debug!(?labels, step, channels, "built signal graph");

        Self {
            source: SourceReader::new(slice, step),
            stages,
            labels,
            block: AudioBlock::new(channels),
            released: false,
        }
    }

    /// Run one quantum through every stage. Returns the number of frames in
    /// the block that were fed by the source; anything after is effect tail.
    pub fn render_quantum(&mut self) -> usize {
        let live = self.source.fill(&mut self.block);
        for stage in &mut self.stages {
            stage.process(&mut self.block);
        }
        live
    }

    pub fn block(&self) -> &AudioBlock {
        &self.block
    }

    pub fn channel_count(&self) -> usize {
        self.block.channel_count()
    }

    pub fn source_finished(&self) -> bool {
        self.source.finished()
    }

    pub fn stage_labels(&self) -> &[String] {
        &self.labels
    }

    /// Tear down every stage. Safe to call more than once; only the first
    /// call does anything.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        for stage in &mut self.stages {
            stage.release();
        }
        self.released = true;
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    pub fn running_oscillators(&self) -> usize {
        self.stages.iter().map(|s| s.running_oscillators()).sum()
    }
}

/// Render a region slice with its effects, non-real-time. The result is
/// exactly `floor(slice_len / tempo_ratio)` frames at the slice's rate.
pub fn render_offline(
    slice: Arc<SampleBuffer>,
    params: &EffectParameters,
    reverb_seed: u64,
) -> SampleBuffer {
    let sample_rate = slice.sample_rate;
    let target = (slice.len() as f64 / params.tempo_ratio as f64).floor() as usize;
    let mut graph = SignalGraph::build(slice, params, sample_rate, reverb_seed);
    let mut out = SampleBuffer::silence(graph.channel_count(), 0, sample_rate);
    for ch in &mut out.channels {
        ch.reserve(target);
    }

    while out.len() < target {
        graph.render_quantum();
        let take = (target - out.len()).min(RENDER_QUANTUM);
        for (dst, src) in out.channels.iter_mut().zip(&graph.block().channels) {
            dst.extend_from_slice(&src[..take]);
        }
    }
    graph.release();
    out
}
