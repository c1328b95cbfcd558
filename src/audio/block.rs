// Fixed-size planar block that a signal graph processes per step.

/// Frames per graph step. Every stage sees blocks of exactly this size, which
/// keeps the partitioned convolver aligned with the graph without extra latency.
pub const RENDER_QUANTUM: usize = 128;

#[derive(Clone, Debug)]
pub struct AudioBlock {
    pub channels: Vec<Vec<f32>>,
}

impl AudioBlock {
    pub fn new(channel_count: usize) -> Self {
        Self {
            channels: vec![vec![0.0; RENDER_QUANTUM]; channel_count.max(1)],
        }
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn clear(&mut self) {
        for ch in &mut self.channels {
            ch.fill(0.0);
        }
    }

    pub fn scale(&mut self, gain: f32) {
        for ch in &mut self.channels {
            for s in ch.iter_mut() {
                *s *= gain;
            }
        }
    }
}
