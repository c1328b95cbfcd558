// The editor as one owned object: the loaded source, regions and their
// parameters, view, slice cache, voices, and the export gate. The shell only
// ever feeds it InputEvents and draws its DisplayState.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::audio::record::RecordingDevice;
use crate::audio::{AudioOutput, EffectSpec, SampleBuffer, VoiceId};
use crate::config::EditorConfig;
use crate::error::{EditorError, Result};
use crate::export::{self, ExportGate, ExportMode, ExportSettings, ExportSink, Remaining};
use crate::loader::{self, FileSource};
use crate::pipeline::{
    ClickOutcome, DerivedBufferCache, EffectParameters, ParamChange, Region, RegionModel,
};
use crate::playback::Playback;
use crate::shared::{DisplayState, InputEvent, Knob, ParamPage, SlotState, NUM_SLOTS};
use crate::waveform::{self, Scene, ViewState};

pub struct EditorSession<O: AudioOutput, S: ExportSink> {
    config: EditorConfig,
    source: Option<Arc<SampleBuffer>>,
    source_name: Option<String>,
    regions: RegionModel,
    view: ViewState,
    cache: DerivedBufferCache,
    playback: Playback<O>,
    gate: ExportGate,
    sink: S,
    recorder: Box<dyn RecordingDevice>,
    user: String,

    // shell-facing bits
    selected: Option<usize>,
    page: ParamPage,
    remaining: Option<Remaining>,
    upgrade_prompt: bool,
    notice: Option<String>,
}

impl<O: AudioOutput, S: ExportSink> EditorSession<O, S> {
    pub fn new(
        config: EditorConfig,
        output: O,
        gate: ExportGate,
        sink: S,
        recorder: Box<dyn RecordingDevice>,
        user: impl Into<String>,
    ) -> Self {
        let mut session = Self {
            regions: RegionModel::new(&config),
            view: ViewState::new(&config),
            playback: Playback::new(output, config.reverb_seed),
            config,
            source: None,
            source_name: None,
            cache: DerivedBufferCache::new(),
            gate,
            sink,
            recorder,
            user: user.into(),
            selected: None,
            page: ParamPage::Tone,
            remaining: None,
            upgrade_prompt: false,
            notice: None,
        };
        session.refresh_quota();
        session
    }

    // ── accessors ─────────────────────────────────────────────────

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn source(&self) -> Option<&Arc<SampleBuffer>> {
        self.source.as_ref()
    }

    pub fn regions(&self) -> &[Region] {
        self.regions.regions()
    }

    pub fn parameters(&self) -> &[EffectParameters] {
        self.regions.parameters()
    }

    pub fn region_model(&self) -> &RegionModel {
        &self.regions
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn pending(&self) -> Option<f64> {
        self.regions.pending()
    }

    pub fn active_region(&self) -> Option<usize> {
        self.playback.active_region()
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn playback(&self) -> &Playback<O> {
        &self.playback
    }

    pub fn playback_mut(&mut self) -> &mut Playback<O> {
        &mut self.playback
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn cache(&self) -> &DerivedBufferCache {
        &self.cache
    }

    pub fn upgrade_prompt(&self) -> bool {
        self.upgrade_prompt
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn can_undo(&self) -> bool {
        self.regions.can_undo()
    }

    pub fn is_recording(&self) -> bool {
        self.recorder.is_recording()
    }

    // ── source ────────────────────────────────────────────────────

    /// Decode a new source. On any failure the current one stays put.
    pub fn load(&mut self, file: &mut dyn FileSource) -> Result<()> {
        let (name, buffer) = loader::load(file)?;
        self.install_source(name, buffer)
    }

    /// Replace the source and throw away everything derived from the old one.
    pub fn install_source(&mut self, name: String, buffer: SampleBuffer) -> Result<()> {
        self.playback.stop_all()?;
        self.regions.reset();
        self.cache.clear();
        self.view.reset();
        self.selected = None;
        info!(name = %name, seconds = buffer.duration(), "source installed");
        self.source = Some(Arc::new(buffer));
        self.source_name = Some(name);
        Ok(())
    }

    fn require_source(&self) -> Result<&Arc<SampleBuffer>> {
        self.source
            .as_ref()
            .ok_or_else(|| EditorError::invalid_state("no audio loaded"))
    }

    fn clamp_time(&self, t: f64) -> Result<f64> {
        let duration = self.require_source()?.duration();
        if t.is_nan() {
            return Err(EditorError::invalid_region("time is not a number"));
        }
        Ok(t.clamp(0.0, duration))
    }

    // ── regions ───────────────────────────────────────────────────

    pub fn begin_region(&mut self, t: f64) -> Result<()> {
        let t = self.clamp_time(t)?;
        self.regions.begin_region(t)
    }

    pub fn complete_region(&mut self, t: f64) -> Result<usize> {
        let t = self.clamp_time(t)?;
        let index = self.regions.complete_region(t)?;
        self.region_inserted(index);
        Ok(index)
    }

    pub fn click(&mut self, t: f64) -> Result<ClickOutcome> {
        let t = self.clamp_time(t)?;
        let outcome = self.regions.click(t)?;
        if let ClickOutcome::Completed(index) = outcome {
            self.region_inserted(index);
        }
        Ok(outcome)
    }

    // a sorted insert shifts everything at or after `index` up by one
    fn region_inserted(&mut self, index: usize) {
        if let Some(active) = self.playback.active_region() {
            if active >= index {
                if let Err(e) = self.playback.stop_all() {
                    warn!(error = %e, "could not stop playback after insert");
                }
            }
        }
        self.selected = Some(index);
    }

    pub fn cancel_pending(&mut self) {
        self.regions.cancel_pending();
    }

    pub fn delete_region(&mut self, index: usize) -> Result<Region> {
        let removed = self.regions.delete_region(index)?;
        self.cache.invalidate(index);
        self.playback.region_deleted(index)?;
        self.selected = match self.selected {
            Some(s) if s == index => None,
            Some(s) if s > index => Some(s - 1),
            other => other,
        };
        Ok(removed)
    }

    /// Roll back the last edit. Voices are stopped since the indices they
    /// were started for may mean something else now.
    pub fn undo(&mut self) -> Result<bool> {
        if !self.regions.undo() {
            return Ok(false);
        }
        self.playback.stop_all()?;
        self.cache.clear();
        self.selected = self.selected.filter(|s| *s < self.regions.len());
        Ok(true)
    }

    pub fn set_parameter(&mut self, index: usize, change: ParamChange) -> Result<()> {
        self.regions.set_parameter(index, change)
    }

    pub fn select(&mut self, index: usize) -> Result<()> {
        self.regions.region(index)?;
        self.selected = Some(index);
        Ok(())
    }

    // ── playback ──────────────────────────────────────────────────

    pub fn play_region(&mut self, index: usize) -> Result<VoiceId> {
        let region = self.regions.region(index)?;
        let params = *self.regions.params(index)?;
        let source = Arc::clone(self.require_source()?);
        let slice = self.cache.get_or_slice(index, region, &source);
        let id = self.playback.play(index, slice, &params)?;
        self.selected = Some(index);
        Ok(id)
    }

    pub fn stop_all(&mut self) -> Result<()> {
        self.playback.stop_all()
    }

    /// Called once per ui frame: moves the audio side along and collects
    /// finished voices.
    pub fn tick(&mut self, elapsed: Duration) {
        for (id, outcome) in self.playback.poll(elapsed) {
            debug!(?id, ?outcome, "voice finished");
        }
    }

    // ── export ────────────────────────────────────────────────────

    /// Render every region and hand the files to the sink. The quota is spent
    /// once, up front; if it's refused nothing is rendered.
    pub fn export(&mut self, mode: ExportMode) -> Result<Vec<String>> {
        let source = Arc::clone(self.require_source()?);
        if self.regions.is_empty() {
            return Err(EditorError::invalid_state("no regions to export"));
        }

        let auth = match self.gate.authorize(&self.user) {
            Ok(auth) => auth,
            Err(e) => {
                self.upgrade_prompt = e.wants_upgrade_prompt();
                self.refresh_quota();
                return Err(e);
            }
        };
        self.remaining = Some(auth.remaining);
        self.upgrade_prompt = !auth.premium && auth.remaining.is_low();

        let slices: Vec<(Arc<SampleBuffer>, EffectParameters)> = self
            .regions
            .regions()
            .iter()
            .zip(self.regions.parameters())
            .enumerate()
            .map(|(i, (region, params))| (self.cache.get_or_slice(i, *region, &source), *params))
            .collect();

        let settings = ExportSettings {
            gap_seconds: self.config.export_gap_seconds,
            pause: self.config.export_pause(),
            reverb_seed: self.config.reverb_seed,
        };
        export::run_export(&slices, mode, &settings, &mut self.sink)
    }

    pub fn refresh_quota(&mut self) {
        self.remaining = self.gate.remaining(&self.user);
    }

    pub fn notify(&mut self, text: impl Into<String>) {
        self.notice = Some(text.into());
    }

    pub fn dismiss_upgrade_prompt(&mut self) {
        self.upgrade_prompt = false;
    }

    // ── recording ─────────────────────────────────────────────────

    pub fn start_recording(&mut self) -> Result<()> {
        self.playback.stop_all()?;
        self.recorder.start()
    }

    /// Finish recording and make it the source. A failed recording leaves the
    /// old source alone.
    pub fn stop_recording(&mut self) -> Result<()> {
        let buffer = self.recorder.stop()?;
        self.install_source("recording".to_string(), buffer)
    }

    pub fn toggle_recording(&mut self) -> Result<()> {
        if self.recorder.is_recording() {
            self.stop_recording()
        } else {
            self.start_recording()
        }
    }

    // ── input ─────────────────────────────────────────────────────

    /// Apply one event from the shell. Failures become a notice rather than
    /// an error; nothing here ends the session.
    pub fn handle_input(&mut self, event: InputEvent) {
        self.notice = None;
        self.dismiss_upgrade_prompt();
        if let Err(e) = self.apply(event) {
            if e.wants_upgrade_prompt() {
                self.upgrade_prompt = true;
                self.notice = Some("export limit reached, upgrade for unlimited exports".into());
            } else {
                self.notice = Some(e.to_string());
            }
            debug!(error = %e, "input rejected");
        }
    }

    fn apply(&mut self, event: InputEvent) -> Result<()> {
        let duration = self.source.as_ref().map_or(0.0, |s| s.duration());
        match event {
            InputEvent::PlaySlot(digit) => {
                self.play_region(InputEvent::slot_index(digit))?;
            }
            InputEvent::StopAll => self.stop_all()?,
            InputEvent::Undo => {
                if !self.undo()? {
                    self.notice = Some("nothing to undo".into());
                }
            }
            InputEvent::Click { x, width } => {
                let t = self.view.time_at(x, width, duration);
                self.click(t)?;
            }
            InputEvent::CancelPending => self.cancel_pending(),
            InputEvent::Pan(dir) => self.view.pan(dir, duration),
            InputEvent::ZoomIn => self.view.zoom_in(),
            InputEvent::ZoomOut => self.view.zoom_out(),
            InputEvent::ResetView => self.view.reset(),
            InputEvent::NextPage => self.page = self.page.next(),
            InputEvent::KnobA(dir) => self.turn_knob(self.page.knobs().0, dir)?,
            InputEvent::KnobB(dir) => {
                if let Some(param) = self.page.knobs().1 {
                    self.turn_knob(param, dir)?;
                }
            }
            InputEvent::DeleteSelected => {
                let index = self
                    .selected
                    .ok_or_else(|| EditorError::invalid_state("no region selected"))?;
                self.delete_region(index)?;
            }
            InputEvent::Export(mode) => {
                let files = self.export(mode)?;
                self.notice = Some(format!("exported {}", files.join(", ")));
            }
            InputEvent::ToggleRecord => self.toggle_recording()?,
            InputEvent::Quit => {}
        }
        Ok(())
    }

    fn turn_knob(&mut self, param: crate::pipeline::Param, dir: f32) -> Result<()> {
        let index = self
            .selected
            .ok_or_else(|| EditorError::invalid_state("no region selected"))?;
        let change = self.regions.params(index)?.nudge(param, dir);
        self.set_parameter(index, change)
    }

    // ── display ───────────────────────────────────────────────────

    /// Everything the shell draws, for a waveform `width` columns wide.
    pub fn display_state(&self, width: usize) -> DisplayState {
        let duration = self.source.as_ref().map_or(0.0, |s| s.duration());
        let active = self.playback.active_region();

        let draw = match &self.source {
            Some(source) => waveform::render(&Scene {
                source,
                view: &self.view,
                regions: self.regions.regions(),
                active,
                pending: self.regions.pending(),
                width,
            }),
            None => Vec::new(),
        };

        let mut slots = [SlotState::Empty; NUM_SLOTS];
        for (i, slot) in slots.iter_mut().enumerate().take(self.regions.len()) {
            *slot = if active == Some(i) {
                SlotState::Playing
            } else if self.selected == Some(i) {
                SlotState::Selected
            } else {
                SlotState::Filled
            };
        }

        let selected_params = self.selected.and_then(|i| self.regions.params(i).ok());
        let (a, b) = self.page.knobs();
        let knob = |param: crate::pipeline::Param| {
            selected_params.map(|p| Knob {
                label: param.label(),
                value: p.value_label(param),
            })
        };
        let stages = selected_params
            .map(|p| {
                EffectSpec::chain_for(p, self.config.reverb_seed)
                    .iter()
                    .map(EffectSpec::label)
                    .collect()
            })
            .unwrap_or_default();

        DisplayState {
            source_name: self.source_name.clone(),
            duration,
            zoom: self.view.zoom(),
            visible: (self.view.visible_start(duration), self.view.visible_end(duration)),
            draw,
            slots,
            region_count: self.regions.len(),
            pending: self.regions.pending(),
            selected: self.selected,
            param_page: self.page,
            knob_a: knob(a),
            knob_b: b.and_then(knob),
            stages,
            recording: self.recorder.is_recording(),
            can_undo: self.regions.can_undo(),
            remaining: self.remaining,
            upgrade_prompt: self.upgrade_prompt,
            notice: self.notice.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;
    use crate::audio::{wav_bytes, HeadlessOutput, VoiceState};
    use crate::export::gate::tests::ScriptedBackend;
    use crate::export::{LocalLedger, MemorySink};
    use crate::loader::PickedFile;

    /// Hands back a canned buffer, or a device error when there is none.
    struct FakeRecorder {
        take: Option<SampleBuffer>,
        recording: Rc<Cell<bool>>,
    }

    impl RecordingDevice for FakeRecorder {
        fn start(&mut self) -> Result<()> {
            if self.take.is_none() {
                return Err(EditorError::DeviceError("microphone permission denied".into()));
            }
            self.recording.set(true);
            Ok(())
        }

        fn stop(&mut self) -> Result<SampleBuffer> {
            self.recording.set(false);
            self.take
                .take()
                .ok_or_else(|| EditorError::DeviceError("nothing was recorded".into()))
        }

        fn is_recording(&self) -> bool {
            self.recording.get()
        }
    }

    fn no_mic() -> Box<dyn RecordingDevice> {
        Box::new(FakeRecorder {
            take: None,
            recording: Rc::default(),
        })
    }

    type TestSession = EditorSession<HeadlessOutput, MemorySink>;

    fn session_with(backend: ScriptedBackend, recorder: Box<dyn RecordingDevice>) -> TestSession {
        let config = EditorConfig {
            export_pause_ms: 0,
            ..EditorConfig::default()
        };
        let gate = ExportGate::new(Box::new(backend), config.entitlement_refresh());
        EditorSession::new(
            config,
            HeadlessOutput::new(44100),
            gate,
            MemorySink::default(),
            recorder,
            "ada",
        )
    }

    fn session() -> TestSession {
        session_with(ScriptedBackend::free(3), no_mic())
    }

    // 2 s of a quiet ramp, mono, 44.1 kHz
    fn two_second_file() -> PickedFile {
        let data: Vec<f32> = (0..88200).map(|i| (i as f32 / 88200.0) * 0.5).collect();
        PickedFile {
            name: "ramp.wav".into(),
            bytes: wav_bytes(&[data], 44100),
            extension: Some("wav".into()),
        }
    }

    fn loaded() -> TestSession {
        let mut s = session();
        s.load(&mut two_second_file()).unwrap();
        s
    }

    #[test]
    fn two_clicks_make_a_region() {
        let mut s = loaded();
        assert_eq!(s.click(0.5).unwrap(), ClickOutcome::Began);
        assert_eq!(s.click(1.5).unwrap(), ClickOutcome::Completed(0));
        assert_eq!(s.regions(), &[Region { start: 0.5, end: 1.5 }]);
        assert_eq!(s.parameters(), &[EffectParameters::default()]);
    }

    #[test]
    fn delete_then_undo_restores_the_region() {
        let mut s = loaded();
        s.click(0.5).unwrap();
        s.click(1.5).unwrap();
        s.delete_region(0).unwrap();
        assert!(s.regions().is_empty());
        assert!(s.parameters().is_empty());

        assert!(s.undo().unwrap());
        assert_eq!(s.regions(), &[Region { start: 0.5, end: 1.5 }]);
        assert_eq!(s.parameters().len(), 1);
    }

    #[test]
    fn second_complete_without_begin_is_invalid_state() {
        let mut s = loaded();
        s.begin_region(0.2).unwrap();
        s.complete_region(0.9).unwrap();
        assert!(matches!(s.complete_region(1.2), Err(EditorError::InvalidState(_))));
        assert_eq!(s.regions().len(), 1);
    }

    #[test]
    fn region_ops_need_a_source() {
        let mut s = session();
        assert!(matches!(s.begin_region(0.1), Err(EditorError::InvalidState(_))));
        assert!(matches!(s.click(0.1), Err(EditorError::InvalidState(_))));
    }

    #[test]
    fn times_are_clamped_to_the_source() {
        let mut s = loaded();
        s.begin_region(-3.0).unwrap();
        s.complete_region(99.0).unwrap();
        assert_eq!(s.regions(), &[Region { start: 0.0, end: 2.0 }]);
    }

    #[test]
    fn delete_keeps_surviving_parameters() {
        let mut s = loaded();
        for (a, b) in [(0.1, 0.2), (0.4, 0.6), (1.0, 1.5)] {
            s.begin_region(a).unwrap();
            s.complete_region(b).unwrap();
        }
        s.set_parameter(0, ParamChange::Transpose(3)).unwrap();
        s.set_parameter(2, ParamChange::ReverbMix(0.9)).unwrap();
        let before = s.parameters().to_vec();

        s.delete_region(1).unwrap();
        assert_eq!(s.parameters(), &[before[0], before[2]]);
    }

    #[test]
    fn playing_out_of_range_changes_nothing() {
        let mut s = loaded();
        s.click(0.5).unwrap();
        s.click(1.0).unwrap();
        let err = s.play_region(4).unwrap_err();
        assert!(matches!(err, EditorError::IndexOutOfRange { index: 4, len: 1 }));
        assert_eq!(s.active_region(), None);
        assert!(s.cache().is_empty());
    }

    #[test]
    fn voice_plays_to_the_end() {
        let mut s = loaded();
        s.click(0.0).unwrap();
        s.click(0.1).unwrap();
        s.play_region(0).unwrap();
        assert_eq!(s.active_region(), Some(0));
        assert!(s.cache().contains(0));

        s.tick(Duration::from_millis(150));
        assert_eq!(s.active_region(), None);
        assert_eq!(s.playback().output().active_voices(), 0);
    }

    #[test]
    fn undo_stops_voices_and_clears_the_cache() {
        let mut s = loaded();
        s.click(0.0).unwrap();
        s.click(1.0).unwrap();
        s.play_region(0).unwrap();
        s.click(1.2).unwrap();
        s.click(1.8).unwrap();

        assert!(s.undo().unwrap());
        assert_eq!(s.active_region(), None);
        assert!(s.cache().is_empty());
        let outcomes: Vec<_> = std::iter::from_fn(|| s.playback_mut().output_mut().poll_event())
            .map(|e| e.outcome)
            .collect();
        assert_eq!(outcomes, [VoiceState::ForceStopped]);
    }

    #[test]
    fn deleting_the_playing_region_stops_it() {
        let mut s = loaded();
        s.click(0.0).unwrap();
        s.click(1.0).unwrap();
        s.play_region(0).unwrap();
        s.delete_region(0).unwrap();
        assert_eq!(s.active_region(), None);
        assert_eq!(s.playback().output().active_voices(), 0);
        assert!(!s.cache().contains(0));
    }

    #[test]
    fn loading_a_new_source_resets_everything() {
        let mut s = loaded();
        s.click(0.0).unwrap();
        s.click(1.0).unwrap();
        s.play_region(0).unwrap();
        s.handle_input(InputEvent::ZoomIn);

        s.load(&mut two_second_file()).unwrap();
        assert!(s.regions().is_empty());
        assert!(!s.can_undo());
        assert!(s.cache().is_empty());
        assert_eq!(s.view().zoom(), 1.0);
        assert_eq!(s.active_region(), None);
    }

    #[test]
    fn failed_decode_keeps_the_old_source() {
        let mut s = loaded();
        s.click(0.5).unwrap();
        s.click(1.5).unwrap();
        let mut junk = PickedFile {
            name: "junk.mp3".into(),
            bytes: vec![0u8; 64],
            extension: Some("mp3".into()),
        };
        assert!(matches!(s.load(&mut junk), Err(EditorError::DecodeError(_))));
        assert!(s.source().is_some_and(|src| src.len() == 88200));
        assert_eq!(s.regions().len(), 1);
    }

    #[test]
    fn export_with_no_quota_emits_nothing() {
        let backend = ScriptedBackend::free(0);
        let left = backend.remaining.clone();
        let consumed = backend.consume_calls.clone();
        let mut s = session_with(backend, no_mic());
        s.load(&mut two_second_file()).unwrap();
        s.click(0.5).unwrap();
        s.click(1.5).unwrap();

        let err = s.export(ExportMode::Concatenated).unwrap_err();
        assert!(matches!(err, EditorError::QuotaExceeded));
        assert!(s.upgrade_prompt());
        assert!(s.sink().files.is_empty());
        assert_eq!(left.get(), 0);
        assert_eq!(consumed.get(), 1);
    }

    #[test]
    fn export_with_no_quota_leaves_the_ledger_alone() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        let ledger = LocalLedger::open(&path, 0).unwrap();
        let config = EditorConfig {
            export_pause_ms: 0,
            ..EditorConfig::default()
        };
        let gate = ExportGate::new(Box::new(ledger), config.entitlement_refresh());
        let mut s = EditorSession::new(
            config,
            HeadlessOutput::new(44100),
            gate,
            MemorySink::default(),
            no_mic(),
            "ada",
        );
        s.load(&mut two_second_file()).unwrap();
        s.click(0.5).unwrap();
        s.click(1.5).unwrap();

        s.handle_input(InputEvent::Export(ExportMode::PerRegion));
        assert!(s.upgrade_prompt());
        assert!(s.notice().is_some());
        assert!(s.sink().files.is_empty());
        assert!(!path.exists());
    }

    #[test]
    fn export_spends_one_quota_for_all_regions() {
        let backend = ScriptedBackend::free(3);
        let consumed = backend.consume_calls.clone();
        let mut s = session_with(backend, no_mic());
        s.load(&mut two_second_file()).unwrap();
        for (a, b) in [(0.1, 0.2), (0.4, 0.6), (1.0, 1.5)] {
            s.click(a).unwrap();
            s.click(b).unwrap();
        }

        let files = s.export(ExportMode::PerRegion).unwrap();
        assert_eq!(files.len(), 3);
        assert_eq!(consumed.get(), 1);
        assert_eq!(s.display_state(80).remaining, Some(Remaining::Count(2)));
        assert!(!s.upgrade_prompt());
    }

    #[test]
    fn export_needs_regions_before_asking_for_quota() {
        let backend = ScriptedBackend::free(3);
        let consumed = backend.consume_calls.clone();
        let mut s = session_with(backend, no_mic());
        assert!(matches!(
            s.export(ExportMode::PerRegion),
            Err(EditorError::InvalidState(_))
        ));
        s.load(&mut two_second_file()).unwrap();
        assert!(matches!(
            s.export(ExportMode::PerRegion),
            Err(EditorError::InvalidState(_))
        ));
        assert_eq!(consumed.get(), 0);
    }

    #[test]
    fn last_free_export_raises_the_prompt() {
        let mut s = session_with(ScriptedBackend::free(2), no_mic());
        s.load(&mut two_second_file()).unwrap();
        s.click(0.5).unwrap();
        s.click(1.5).unwrap();
        s.export(ExportMode::Concatenated).unwrap();
        assert!(s.upgrade_prompt());
        assert_eq!(s.sink().files.len(), 1);
    }

    #[test]
    fn recording_becomes_the_source() {
        let take = SampleBuffer::new(48000, vec![vec![0.1; 4800]]).unwrap();
        let recorder = FakeRecorder {
            take: Some(take),
            recording: Rc::default(),
        };
        let mut s = session_with(ScriptedBackend::free(3), Box::new(recorder));
        s.load(&mut two_second_file()).unwrap();
        s.click(0.5).unwrap();
        s.click(1.5).unwrap();

        s.handle_input(InputEvent::ToggleRecord);
        assert!(s.is_recording());
        s.handle_input(InputEvent::ToggleRecord);
        assert!(!s.is_recording());
        assert_eq!(s.source().map(|b| b.sample_rate), Some(48000));
        assert!(s.regions().is_empty());
    }

    #[test]
    fn denied_microphone_keeps_the_source() {
        let mut s = loaded();
        s.handle_input(InputEvent::ToggleRecord);
        assert!(s.notice().is_some_and(|n| n.contains("permission denied")));
        assert!(s.source().is_some_and(|src| src.len() == 88200));
    }

    #[test]
    fn keys_drive_the_session() {
        let mut s = loaded();
        // full view of 2 s over 200 columns: column 50 is 0.5 s
        s.handle_input(InputEvent::Click { x: 50.0, width: 200.0 });
        s.handle_input(InputEvent::Click { x: 150.0, width: 200.0 });
        assert_eq!(s.regions(), &[Region { start: 0.5, end: 1.5 }]);
        assert_eq!(s.selected(), Some(0));

        s.handle_input(InputEvent::KnobA(1.0));
        assert_eq!(s.parameters()[0].transpose, 1);
        s.handle_input(InputEvent::NextPage);
        s.handle_input(InputEvent::KnobB(1.0));
        assert_eq!(s.parameters()[0].filter_kind, crate::pipeline::FilterKind::Highpass);

        s.handle_input(InputEvent::PlaySlot(1));
        assert_eq!(s.active_region(), Some(0));
        s.handle_input(InputEvent::StopAll);
        assert_eq!(s.active_region(), None);

        s.handle_input(InputEvent::PlaySlot(0));
        assert!(s.notice().is_some_and(|n| n.contains("out of range")));

        s.handle_input(InputEvent::DeleteSelected);
        assert!(s.regions().is_empty());
        s.handle_input(InputEvent::Undo);
        assert_eq!(s.regions().len(), 1);
        s.handle_input(InputEvent::Undo);
        s.handle_input(InputEvent::Undo);
        assert_eq!(s.notice(), Some("nothing to undo"));
    }

    #[test]
    fn display_state_reflects_the_session() {
        let mut s = loaded();
        s.click(0.5).unwrap();
        s.click(1.5).unwrap();
        s.click(1.7).unwrap();
        s.set_parameter(0, ParamChange::FlangerMix(0.5)).unwrap();
        s.play_region(0).unwrap();

        let ds = s.display_state(100);
        assert_eq!(ds.slots[0], SlotState::Playing);
        assert_eq!(ds.slots[1], SlotState::Empty);
        assert_eq!(ds.pending, Some(1.7));
        assert_eq!(ds.region_count, 1);
        assert_eq!(ds.knob_a.as_ref().map(|k| k.label), Some("PITCH"));
        assert!(ds.stages.iter().any(|st| st.starts_with("Flanger")));
        assert!(ds.draw.len() > 100);
        assert!(ds.can_undo);
        assert_eq!(ds.remaining, Some(Remaining::Count(3)));
    }
}
