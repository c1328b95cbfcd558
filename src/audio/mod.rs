use std::time::Duration;

use anyhow::Context;
use crossbeam_channel::{Receiver, Sender};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tracing::{info, warn};

use crate::audio_api::{AudioCommand, VoiceEvent};
use crate::error::{EditorError, Result};

mod block;
mod convolver;
mod effect;
mod engine;
mod frame;
mod graph;
pub mod record;
mod sample_buffer;
mod voice;
mod voice_id;

pub use block::{AudioBlock, RENDER_QUANTUM};
pub use effect::{Effect, EffectSpec, ModulationOscillator};
pub use engine::Engine;
pub use frame::StereoFrame;
pub use graph::{render_offline, SignalGraph, SourceReader};
pub use sample_buffer::SampleBuffer;
pub use voice::{Voice, VoiceState};
pub use voice_id::{next_voice_id, VoiceId};

#[cfg(test)]
pub(crate) use sample_buffer::tests::wav_bytes;

const COMMAND_QUEUE: usize = 1024;
const EVENT_QUEUE: usize = 256;

/// Where playback goes. The UI side only ever talks to the audio thread
/// through this: commands in, finished voices out.
pub trait AudioOutput {
    fn sample_rate(&self) -> u32;

    fn send(&mut self, cmd: AudioCommand) -> Result<()>;

    fn poll_event(&mut self) -> Option<VoiceEvent>;

    // called once per ui tick; only outputs without a real clock care
    fn tick(&mut self, _elapsed: Duration) {}
}

// ── device output ─────────────────────────────────────────────────

pub struct AudioHandle {
    tx: Sender<AudioCommand>,
    events_rx: Receiver<VoiceEvent>,
    sample_rate: u32,
    _output_stream: cpal::Stream,
}

impl AudioOutput for AudioHandle {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn send(&mut self, cmd: AudioCommand) -> Result<()> {
        self.tx
            .try_send(cmd)
            .map_err(|e| EditorError::DeviceError(format!("audio thread not accepting commands: {e}")))
    }

    fn poll_event(&mut self) -> Option<VoiceEvent> {
        self.events_rx.try_recv().ok()
    }
}

pub fn start_audio() -> anyhow::Result<AudioHandle> {
    let (tx, rx) = crossbeam_channel::bounded::<AudioCommand>(COMMAND_QUEUE);
    let (events_tx, events_rx) = crossbeam_channel::bounded::<VoiceEvent>(EVENT_QUEUE);

    let host = cpal::default_host();
    let device = host.default_output_device().context("no default output device")?;
    let config = device.default_output_config().context("no default output config")?;

    let sample_rate = config.sample_rate();
    let channels = config.channels() as usize;

    match config.sample_format() {
        cpal::SampleFormat::F32 => {
            let output_stream =
                build_output_stream_f32(&device, &config.into(), rx, events_tx, channels)?;
            output_stream.play().context("failed to play output stream")?;
            info!(sample_rate, channels, "audio output started");

            Ok(AudioHandle {
                tx,
                events_rx,
                sample_rate,
                _output_stream: output_stream,
            })
        }
        _ => anyhow::bail!("unsupported sample format (only f32 supported for now)"),
    }
}

fn build_output_stream_f32(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    rx: Receiver<AudioCommand>,
    events_tx: Sender<VoiceEvent>,
    channels: usize,
) -> anyhow::Result<cpal::Stream> {
    let mut engine = Engine::new(events_tx);
    let mut scratch: Vec<StereoFrame> = Vec::with_capacity(4096);

    let err_fn = |err| warn!("audio output stream error: {err}");

    let stream = device.build_output_stream(
        config,
        move |data: &mut [f32], _info| {
            while let Ok(cmd) = rx.try_recv() { // set up command handling
                engine.handle_cmd(cmd);
            }

            let n_frames = data.len() / channels.max(1);
            scratch.resize(n_frames, StereoFrame::zero());
            engine.render_block(&mut scratch);

            // spread the stereo mix over however many channels the device has
            for (out, f) in data.chunks_exact_mut(channels.max(1)).zip(&scratch) {
                match out {
                    [mono] => *mono = 0.5 * (f.left + f.right),
                    [l, r, rest @ ..] => {
                        *l = f.left;
                        *r = f.right;
                        rest.fill(0.0);
                    }
                    [] => {}
                }
            }
        },
        err_fn,
        None,
    )?;

    Ok(stream)
}

// ── no device ─────────────────────────────────────────────────────

/// Runs the engine inline with no device behind it. The output is thrown
/// away; time only moves when `tick`/`advance` is called. Used for
/// `--headless` and in tests.
pub struct HeadlessOutput {
    engine: Engine,
    events_rx: Receiver<VoiceEvent>,
    sample_rate: u32,
    scratch: Vec<StereoFrame>,
    pending_frames: f64,
}

impl HeadlessOutput {
    pub fn new(sample_rate: u32) -> Self {
        let (events_tx, events_rx) = crossbeam_channel::bounded(EVENT_QUEUE);
        Self {
            engine: Engine::new(events_tx),
            events_rx,
            sample_rate,
            scratch: Vec::new(),
            pending_frames: 0.0,
        }
    }

    /// Render `frames` frames and return the mix.
    pub fn advance(&mut self, frames: usize) -> &[StereoFrame] {
        self.scratch.resize(frames, StereoFrame::zero());
        self.engine.render_block(&mut self.scratch);
        &self.scratch
    }

    pub fn active_voices(&self) -> usize {
        self.engine.active_voices()
    }
}

impl AudioOutput for HeadlessOutput {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn send(&mut self, cmd: AudioCommand) -> Result<()> {
        self.engine.handle_cmd(cmd);
        Ok(())
    }

    fn poll_event(&mut self) -> Option<VoiceEvent> {
        self.events_rx.try_recv().ok()
    }

    fn tick(&mut self, elapsed: Duration) {
        self.pending_frames += elapsed.as_secs_f64() * self.sample_rate as f64;
        let frames = self.pending_frames.floor();
        self.pending_frames -= frames;
        if frames >= 1.0 {
            self.advance(frames as usize);
        }
    }
}
