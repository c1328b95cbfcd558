// Microphone capture. Recording lives on its own input stream; when it stops,
// the captured frames become a brand new source.

use crossbeam_channel::Receiver;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tracing::{info, warn};

use super::sample_buffer::SampleBuffer;
use crate::error::{EditorError, Result};

pub trait RecordingDevice {
    fn start(&mut self) -> Result<()>;

    /// Stop capturing and hand back everything recorded since `start`.
    fn stop(&mut self) -> Result<SampleBuffer>;

    fn is_recording(&self) -> bool;
}

struct Capture {
    _stream: cpal::Stream,
    rx: Receiver<Vec<f32>>,
    channels: usize,
    sample_rate: u32,
}

#[derive(Default)]
pub struct MicRecorder {
    capture: Option<Capture>,
}

impl MicRecorder {
    pub fn new() -> Self {
        Self::default()
    }
}

fn device_err(what: &str, e: impl std::fmt::Display) -> EditorError {
    EditorError::DeviceError(format!("{what}: {e}"))
}

impl RecordingDevice for MicRecorder {
    fn start(&mut self) -> Result<()> {
        if self.capture.is_some() {
            return Err(EditorError::invalid_state("already recording"));
        }

        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| EditorError::DeviceError("no default input device".into()))?;
        let supported = device
            .default_input_config()
            .map_err(|e| device_err("no usable input config", e))?;
        if supported.sample_format() != cpal::SampleFormat::F32 {
            return Err(EditorError::DeviceError(
                "unsupported input sample format (only f32 supported for now)".into(),
            ));
        }
        let config: cpal::StreamConfig = supported.into();
        let channels = config.channels as usize;
        let sample_rate = config.sample_rate;

        let (tx, rx) = crossbeam_channel::unbounded::<Vec<f32>>();
        let err_fn = |err| warn!("audio input stream error: {err}");
        let stream = device
            .build_input_stream(
                &config,
                move |data: &[f32], _info: &cpal::InputCallbackInfo| {
                    let _ = tx.send(data.to_vec());
                },
                err_fn,
                None,
            )
            .map_err(|e| device_err("could not open input stream", e))?;
        stream
            .play()
            .map_err(|e| device_err("could not start input stream", e))?;

        info!(sample_rate, channels, "recording started");
        self.capture = Some(Capture {
            _stream: stream,
            rx,
            channels,
            sample_rate,
        });
        Ok(())
    }

    fn stop(&mut self) -> Result<SampleBuffer> {
        let capture = self
            .capture
            .take()
            .ok_or_else(|| EditorError::invalid_state("not recording"))?;
        let Capture {
            _stream,
            rx,
            channels,
            sample_rate,
        } = capture;
        drop(_stream); // closes the input, no more chunks after this

        let channels = channels.max(1);
        let mut planar = vec![Vec::new(); channels];
        for chunk in rx.try_iter() {
            for frame in chunk.chunks_exact(channels) {
                for (dst, s) in planar.iter_mut().zip(frame) {
                    dst.push(*s);
                }
            }
        }
        if planar[0].is_empty() {
            return Err(EditorError::DeviceError("nothing was recorded".into()));
        }

        let buffer = SampleBuffer::new(sample_rate, planar)?;
        info!(frames = buffer.len(), "recording finished");
        Ok(buffer)
    }

    fn is_recording(&self) -> bool {
        self.capture.is_some()
    }
}
