use std::io::Cursor;

use symphonia::core::audio::SampleBuffer as DecodeBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

use crate::error::{EditorError, Result};

/// Planar multi-channel audio. Used for the loaded source, for the raw
/// per-region slices cut from it, and for rendered export output.
///
/// All channels always have the same length.
#[derive(Clone, Debug, PartialEq)]
pub struct SampleBuffer {
    pub sample_rate: u32,
    pub channels: Vec<Vec<f32>>,
}

impl SampleBuffer {
    pub fn new(sample_rate: u32, channels: Vec<Vec<f32>>) -> Result<Self> {
        if sample_rate == 0 {
            return Err(EditorError::DecodeError("sample rate of 0".into()));
        }
        if channels.is_empty() {
            return Err(EditorError::DecodeError("no channels".into()));
        }
        let len = channels[0].len();
        if channels.iter().any(|c| c.len() != len) {
            return Err(EditorError::DecodeError("channels differ in length".into()));
        }
        Ok(Self { sample_rate, channels })
    }

    pub fn silence(channel_count: usize, len: usize, sample_rate: u32) -> Self {
        Self {
            sample_rate,
            channels: vec![vec![0.0; len]; channel_count.max(1)],
        }
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    // frames per channel
    pub fn len(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn duration(&self) -> f64 {
        self.len() as f64 / self.sample_rate as f64
    }

    pub fn frame_at(&self, seconds: f64) -> usize {
        ((seconds.max(0.0) * self.sample_rate as f64).floor() as usize).min(self.len())
    }

    /// Copy of the frames in `[start, end)` seconds. Bounds are floored to
    /// whole frames and clamped to the buffer.
    pub fn slice(&self, start: f64, end: f64) -> Self {
        let a = self.frame_at(start);
        let b = self.frame_at(end).max(a);
        Self {
            sample_rate: self.sample_rate,
            channels: self.channels.iter().map(|c| c[a..b].to_vec()).collect(),
        }
    }

    // write `other` at `offset`, growing if needed; channels beyond ours are dropped
    pub fn write_at(&mut self, other: &SampleBuffer, offset: usize) {
        let needed = offset + other.len();
        for (dst, src) in self.channels.iter_mut().zip(&other.channels) {
            if dst.len() < needed {
                dst.resize(needed, 0.0);
            }
            dst[offset..needed].copy_from_slice(src);
        }
        let len = self.channels.iter().map(Vec::len).max().unwrap_or(0);
        for ch in &mut self.channels {
            ch.resize(len, 0.0);
        }
    }

    /// Decode any container/codec symphonia knows about into planar f32.
    /// `extension` is only a probing hint.
    pub fn decode(bytes: Vec<u8>, extension: Option<&str>) -> Result<Self> {
        let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());
        let mut hint = Hint::new();
        if let Some(ext) = extension {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(decode_error)?;
        let mut format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| EditorError::DecodeError("no audio track found".into()))?;
        let track_id = track.id;
        let params = track.codec_params.clone();
        let mut sample_rate = params.sample_rate;

        let mut decoder = symphonia::default::get_codecs()
            .make(&params, &DecoderOptions::default())
            .map_err(decode_error)?;

        let mut channels: Vec<Vec<f32>> = Vec::new();
        loop {
            let packet = match format.next_packet() {
                Ok(p) => p,
                Err(SymphoniaError::IoError(e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break;
                }
                Err(SymphoniaError::ResetRequired) => break,
                Err(e) => return Err(decode_error(e)),
            };
            if packet.track_id() != track_id {
                continue;
            }

            let decoded = match decoder.decode(&packet) {
                Ok(d) => d,
                Err(SymphoniaError::DecodeError(msg)) => {
                    // a corrupt packet is skipped, same as a browser would
                    warn!(msg, "skipping undecodable packet");
                    continue;
                }
                Err(e) => return Err(decode_error(e)),
            };

            let spec = *decoded.spec();
            let n = spec.channels.count();
            if n == 0 {
                continue;
            }
            if channels.is_empty() {
                channels = vec![Vec::new(); n];
            } else if channels.len() != n {
                return Err(EditorError::DecodeError(
                    "channel count changed mid-stream".into(),
                ));
            }
            sample_rate.get_or_insert(spec.rate);

            let mut interleaved = DecodeBuffer::<f32>::new(decoded.capacity() as u64, spec);
            interleaved.copy_interleaved_ref(decoded);
            for frame in interleaved.samples().chunks_exact(n) {
                for (ch, s) in channels.iter_mut().zip(frame) {
                    ch.push(*s);
                }
            }
        }

        let sample_rate =
            sample_rate.ok_or_else(|| EditorError::DecodeError("unknown sample rate".into()))?;
        if channels.first().is_none_or(Vec::is_empty) {
            return Err(EditorError::DecodeError("no audio frames".into()));
        }

        let buffer = Self::new(sample_rate, channels)?;
        debug!(
            sample_rate,
            channels = buffer.channel_count(),
            frames = buffer.len(),
            "decoded audio"
        );
        Ok(buffer)
    }
}

fn decode_error(e: SymphoniaError) -> EditorError {
    EditorError::DecodeError(e.to_string())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    // 16-bit wav bytes via hound, for decoder fixtures
    pub(crate) fn wav_bytes(channels: &[Vec<f32>], sample_rate: u32) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels: channels.len() as u16,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for i in 0..channels[0].len() {
                for ch in channels {
                    writer.write_sample((ch[i] * 32767.0) as i16).unwrap();
                }
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn decodes_stereo_wav() {
        let left: Vec<f32> = (0..4410).map(|i| (i as f32 / 4410.0) - 0.5).collect();
        let right = vec![0.25; 4410];
        let bytes = wav_bytes(&[left.clone(), right], 44100);

        let buf = SampleBuffer::decode(bytes, Some("wav")).unwrap();
        assert_eq!(buf.sample_rate, 44100);
        assert_eq!(buf.channel_count(), 2);
        assert_eq!(buf.len(), 4410);
        assert!((buf.duration() - 0.1).abs() < 1e-9);
        assert!((buf.channels[0][0] - left[0]).abs() < 1e-3);
        assert!((buf.channels[1][100] - 0.25).abs() < 1e-3);
    }

    #[test]
    fn garbage_is_a_decode_error() {
        let err = SampleBuffer::decode(b"definitely not audio".to_vec(), None).unwrap_err();
        assert!(matches!(err, EditorError::DecodeError(_)));
    }

    #[test]
    fn slice_floors_and_clamps() {
        let buf = SampleBuffer::new(10, vec![(0..20).map(|i| i as f32).collect()]).unwrap();
        let s = buf.slice(0.55, 1.29);
        assert_eq!(s.channels[0], vec![5.0, 6.0, 7.0, 8.0, 9.0, 10.0, 11.0]);

        let tail = buf.slice(1.5, 9.0);
        assert_eq!(tail.len(), 5);
        assert!(buf.slice(3.0, 4.0).is_empty());
    }

    #[test]
    fn ragged_channels_rejected() {
        assert!(SampleBuffer::new(44100, vec![vec![0.0; 3], vec![0.0; 4]]).is_err());
    }
}
