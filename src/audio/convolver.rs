// Uniformly partitioned FFT convolution (overlap-save) plus the synthetic
// impulse the reverb stage convolves against.
//
// The partition size equals the render quantum, so every graph step turns one
// input block into one output block with no added latency. Cost per block is
// one forward FFT, one inverse FFT and one complex multiply-add per partition.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

use super::block::RENDER_QUANTUM;

const PARTITION: usize = RENDER_QUANTUM;
const FFT_LEN: usize = PARTITION * 2;

// level calibration for long noise impulses, same constants a browser
// convolver applies when normalizing (-58dB, referenced to 44.1k)
const GAIN_CALIBRATION: f32 = 0.00125;
const GAIN_CALIBRATION_RATE: f32 = 44_100.0;
const MIN_POWER: f32 = 0.000125;

pub struct Convolver {
    fft: Arc<dyn Fft<f32>>,
    ifft: Arc<dyn Fft<f32>>,
    partitions: Vec<Vec<Complex<f32>>>, // impulse spectra, one per partition
    history: Vec<Vec<Complex<f32>>>,    // input spectra, newest at `head`
    head: usize,
    prev_input: Vec<f32>,
    frame: Vec<Complex<f32>>,
    acc: Vec<Complex<f32>>,
}

impl Convolver {
    pub fn new(impulse: &[f32], planner: &mut FftPlanner<f32>) -> Self {
        let fft = planner.plan_fft_forward(FFT_LEN);
        let ifft = planner.plan_fft_inverse(FFT_LEN);

        let partitions: Vec<Vec<Complex<f32>>> = impulse
            .chunks(PARTITION)
            .map(|chunk| {
                let mut spectrum = vec![Complex::new(0.0, 0.0); FFT_LEN];
                for (dst, &s) in spectrum.iter_mut().zip(chunk) {
                    dst.re = s;
                }
                fft.process(&mut spectrum);
                spectrum
            })
            .collect();
        let count = partitions.len().max(1);

        Self {
            fft,
            ifft,
            partitions,
            history: vec![vec![Complex::new(0.0, 0.0); FFT_LEN]; count],
            head: 0,
            prev_input: vec![0.0; PARTITION],
            frame: vec![Complex::new(0.0, 0.0); FFT_LEN],
            acc: vec![Complex::new(0.0, 0.0); FFT_LEN],
        }
    }

    /// Replace `block` (exactly one quantum) with its convolution against the impulse.
    pub fn process(&mut self, block: &mut [f32]) {
        debug_assert_eq!(block.len(), PARTITION);
        if self.partitions.is_empty() {
            block.fill(0.0);
            return;
        }

        // [previous block | current block]
        for (i, c) in self.frame.iter_mut().enumerate() {
            let s = if i < PARTITION { self.prev_input[i] } else { block[i - PARTITION] };
            *c = Complex::new(s, 0.0);
        }
        self.prev_input.copy_from_slice(block);
        self.fft.process(&mut self.frame);

        let n = self.history.len();
        self.history[self.head].copy_from_slice(&self.frame);

        self.acc.fill(Complex::new(0.0, 0.0));
        for (p, h) in self.partitions.iter().enumerate() {
            let x = &self.history[(self.head + n - p) % n];
            for ((a, xk), hk) in self.acc.iter_mut().zip(x).zip(h) {
                *a += xk * hk;
            }
        }
        self.head = (self.head + 1) % n;

        self.ifft.process(&mut self.acc);
        let norm = 1.0 / FFT_LEN as f32;
        for (out, y) in block.iter_mut().zip(&self.acc[PARTITION..]) {
            *out = y.re * norm;
        }
    }
}

/// Stereo decaying-noise impulse: `len = rate * (1 + 2 * mix)` frames of
/// `noise * (1 - i/len)^2`, normalized to a consistent loudness.
/// The same seed always produces the same impulse.
pub fn synthetic_impulse(sample_rate: u32, mix: f32, seed: u64) -> [Vec<f32>; 2] {
    let len = (sample_rate as f64 * (1.0 + 2.0 * mix as f64)).floor() as usize;
    let mut rng = StdRng::seed_from_u64(seed);
    let mut impulse: [Vec<f32>; 2] = [Vec::with_capacity(len), Vec::with_capacity(len)];
    for ch in impulse.iter_mut() {
        for i in 0..len {
            let decay = 1.0 - i as f32 / len as f32;
            ch.push((rng.gen_range(-1.0f32..1.0)) * decay * decay);
        }
    }

    let scale = normalization_scale(&impulse, sample_rate);
    for ch in impulse.iter_mut() {
        for s in ch.iter_mut() {
            *s *= scale;
        }
    }
    impulse
}

fn normalization_scale(impulse: &[Vec<f32>], sample_rate: u32) -> f32 {
    let len = impulse.first().map_or(0, Vec::len);
    if len == 0 {
        return 1.0;
    }
    let energy: f64 = impulse
        .iter()
        .flat_map(|ch| ch.iter())
        .map(|&s| (s as f64) * (s as f64))
        .sum();
    let mut power = (energy / (impulse.len() * len) as f64).sqrt() as f32;
    if !power.is_finite() || power < MIN_POWER {
        power = MIN_POWER;
    }
    (1.0 / power) * GAIN_CALIBRATION * (GAIN_CALIBRATION_RATE / sample_rate as f32)
}
