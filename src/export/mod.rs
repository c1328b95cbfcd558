// Offline export: every region is rendered on its own through the same graph
// the live voices use, then written out as 16-bit WAV.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::audio::{render_offline, SampleBuffer};
use crate::error::{EditorError, Result};
use crate::pipeline::{slot_label, EffectParameters};

pub mod gate;
pub mod ledger;
pub mod wav;

pub use gate::{
    AccountBackend, Authorization, Entitlement, EntitlementProvider, ExportGate, QuotaReceipt,
    QuotaService, Remaining, ServiceError,
};
pub use ledger::{LocalLedger, DEFAULT_LEDGER_FILE};

pub const CONCATENATED_NAME: &str = "samplx-slices.wav";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportMode {
    PerRegion,
    Concatenated,
}

pub fn region_file_name(index: usize) -> String {
    format!("samplx-slice-{}.wav", slot_label(index))
}

/// Where finished files go.
pub trait ExportSink {
    fn emit(&mut self, name: &str, bytes: &[u8]) -> Result<()>;
}

pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ExportSink for DirectorySink {
    fn emit(&mut self, name: &str, bytes: &[u8]) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(name);
        std::fs::write(&path, bytes)?;
        debug!(path = %path.display(), bytes = bytes.len(), "wrote export");
        Ok(())
    }
}

#[derive(Default)]
pub struct MemorySink {
    pub files: Vec<(String, Vec<u8>)>,
}

impl ExportSink for MemorySink {
    fn emit(&mut self, name: &str, bytes: &[u8]) -> Result<()> {
        self.files.push((name.to_string(), bytes.to_vec()));
        Ok(())
    }
}

/// Knobs for one export run.
#[derive(Clone, Copy, Debug)]
pub struct ExportSettings {
    pub gap_seconds: f64,
    pub pause: Duration,
    pub reverb_seed: u64,
}

/// Render one raw slice with its parameters.
pub fn render_region(slice: Arc<SampleBuffer>, params: &EffectParameters, seed: u64) -> SampleBuffer {
    render_offline(slice, params, seed)
}

/// Each rendered region followed by `gap_seconds` of silence, the last one
/// included.
pub fn concatenate(rendered: &[SampleBuffer], gap_seconds: f64) -> Result<SampleBuffer> {
    let first = rendered
        .first()
        .ok_or_else(|| EditorError::invalid_state("nothing to concatenate"))?;
    let sample_rate = first.sample_rate;
    let channels = rendered.iter().map(SampleBuffer::channel_count).max().unwrap_or(1);
    let gap = (gap_seconds * sample_rate as f64).round() as usize;
    let total: usize = rendered.iter().map(|r| r.len() + gap).sum();

    let mut out = SampleBuffer::silence(channels, total, sample_rate);
    let mut offset = 0;
    for r in rendered {
        out.write_at(r, offset);
        offset += r.len() + gap;
    }
    Ok(out)
}

/// Render and emit `slices` in index order. Each entry is a region's raw
/// slice and its parameters. Returns the names that were emitted.
pub fn run_export(
    slices: &[(Arc<SampleBuffer>, EffectParameters)],
    mode: ExportMode,
    settings: &ExportSettings,
    sink: &mut dyn ExportSink,
) -> Result<Vec<String>> {
    if slices.is_empty() {
        return Err(EditorError::invalid_state("no regions to export"));
    }
    info!(?mode, regions = slices.len(), "export started");

    let mut emitted = Vec::new();
    match mode {
        ExportMode::PerRegion => {
            for (i, (slice, params)) in slices.iter().enumerate() {
                if i > 0 && !settings.pause.is_zero() {
                    std::thread::sleep(settings.pause);
                }
                let rendered = render_region(Arc::clone(slice), params, settings.reverb_seed);
                let name = region_file_name(i);
                sink.emit(&name, &wav::encode(&rendered)?)?;
                debug!(region = i, frames = rendered.len(), name = %name, "region exported");
                emitted.push(name);
            }
        }
        ExportMode::Concatenated => {
            let rendered: Vec<SampleBuffer> = slices
                .iter()
                .map(|(slice, params)| render_region(Arc::clone(slice), params, settings.reverb_seed))
                .collect();
            let joined = concatenate(&rendered, settings.gap_seconds)?;
            sink.emit(CONCATENATED_NAME, &wav::encode(&joined)?)?;
            emitted.push(CONCATENATED_NAME.to_string());
        }
    }

    info!(files = emitted.len(), "export finished");
    Ok(emitted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::ParamChange;

    fn settings() -> ExportSettings {
        ExportSettings {
            gap_seconds: 0.5,
            pause: Duration::ZERO,
            reverb_seed: 3,
        }
    }

    fn slice(len: usize, value: f32) -> Arc<SampleBuffer> {
        Arc::new(SampleBuffer::new(1000, vec![vec![value; len]]).unwrap())
    }

    fn data_size(bytes: &[u8]) -> usize {
        u32::from_le_bytes([bytes[40], bytes[41], bytes[42], bytes[43]]) as usize
    }

    #[test]
    fn per_region_writes_one_file_each() {
        let mut fast = EffectParameters::default();
        fast.apply(ParamChange::TempoRatio(2.0));
        let slices = vec![
            (slice(400, 0.5), EffectParameters::default()),
            (slice(400, 0.5), fast),
        ];
        let mut sink = MemorySink::default();
        let names = run_export(&slices, ExportMode::PerRegion, &settings(), &mut sink).unwrap();

        assert_eq!(names, ["samplx-slice-1.wav", "samplx-slice-2.wav"]);
        assert_eq!(data_size(&sink.files[0].1), 400 * 2);
        assert_eq!(data_size(&sink.files[1].1), 200 * 2);
    }

    #[test]
    fn concatenated_has_a_gap_after_every_region() {
        let slices = vec![
            (slice(100, 0.5), EffectParameters::default()),
            (slice(300, -0.5), EffectParameters::default()),
        ];
        let mut sink = MemorySink::default();
        run_export(&slices, ExportMode::Concatenated, &settings(), &mut sink).unwrap();

        assert_eq!(sink.files.len(), 1);
        let (name, bytes) = &sink.files[0];
        assert_eq!(name, CONCATENATED_NAME);
        // 100 + 500 + 300 + 500 frames, mono
        assert_eq!(data_size(bytes), 1400 * 2);

        let pcm = |frame: usize| {
            let at = wav::HEADER_LEN + frame * 2;
            i16::from_le_bytes([bytes[at], bytes[at + 1]])
        };
        assert_eq!(pcm(99), wav::to_pcm16(0.5));
        assert_eq!(pcm(100), 0);
        assert_eq!(pcm(600), wav::to_pcm16(-0.5));
        assert_eq!(pcm(899), wav::to_pcm16(-0.5));
        assert_eq!(pcm(900), 0);
    }

    #[test]
    fn export_is_byte_identical_across_runs() {
        let mut p = EffectParameters::default();
        p.apply(ParamChange::ReverbMix(0.5));
        p.apply(ParamChange::FlangerMix(0.5));
        p.apply(ParamChange::Transpose(-3));
        let data: Vec<f32> = (0..2000).map(|i| ((i as f32) * 0.05).sin() * 0.8).collect();
        let slices = vec![(Arc::new(SampleBuffer::new(1000, vec![data]).unwrap()), p)];

        let mut a = MemorySink::default();
        let mut b = MemorySink::default();
        run_export(&slices, ExportMode::PerRegion, &settings(), &mut a).unwrap();
        run_export(&slices, ExportMode::PerRegion, &settings(), &mut b).unwrap();
        assert_eq!(a.files, b.files);
    }

    #[test]
    fn directory_sink_writes_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = DirectorySink::new(dir.path().join("out"));
        let slices = vec![(slice(50, 0.1), EffectParameters::default())];
        run_export(&slices, ExportMode::PerRegion, &settings(), &mut sink).unwrap();
        let written = std::fs::read(sink.dir().join("samplx-slice-1.wav")).unwrap();
        assert_eq!(written.len(), wav::HEADER_LEN + 100);
    }

    #[test]
    fn nothing_to_export() {
        let mut sink = MemorySink::default();
        let err = run_export(&[], ExportMode::Concatenated, &settings(), &mut sink).unwrap_err();
        assert!(matches!(err, EditorError::InvalidState(_)));
        assert!(sink.files.is_empty());
    }
}
