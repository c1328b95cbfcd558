// UI-side half of playback: builds a graph per trigger, hands it to the
// audio output, and keeps track of which voices are still out there.

use std::sync::Arc;

use tracing::{debug, info};

use crate::audio::{AudioOutput, SampleBuffer, SignalGraph, Voice, VoiceId, VoiceState};
use crate::audio_api::{AudioCommand, VoiceEvent};
use crate::error::Result;
use crate::pipeline::EffectParameters;

pub struct Playback<O: AudioOutput> {
    output: O,
    live: Vec<VoiceId>,              // sent to the engine, not yet reported back
    active: Option<(VoiceId, usize)>, // the voice the ui highlights, and its region
    reverb_seed: u64,
}

impl<O: AudioOutput> Playback<O> {
    pub fn new(output: O, reverb_seed: u64) -> Self {
        Self {
            output,
            live: Vec::new(),
            active: None,
            reverb_seed,
        }
    }

    pub fn output(&self) -> &O {
        &self.output
    }

    pub fn output_mut(&mut self) -> &mut O {
        &mut self.output
    }

    pub fn active_region(&self) -> Option<usize> {
        self.active.map(|(_, region)| region)
    }

    pub fn live_voices(&self) -> usize {
        self.live.len()
    }

    /// Start `slice` as region `region`. Previewing is monophonic: whatever
    /// was playing is stopped first.
    pub fn play(
        &mut self,
        region: usize,
        slice: Arc<SampleBuffer>,
        params: &EffectParameters,
    ) -> Result<VoiceId> {
        self.stop_all()?;

        let graph = SignalGraph::build(slice, params, self.output.sample_rate(), self.reverb_seed);
        let voice = Voice::new(region, graph);
        let id = voice.id;
        debug!(?id, region, stages = ?voice.graph().stage_labels(), "starting voice");
        self.output.send(AudioCommand::Start(Box::new(voice)))?;

        self.live.push(id);
        self.active = Some((id, region));
        Ok(id)
    }

    /// Force-stop everything. Does nothing when no voice is out.
    pub fn stop_all(&mut self) -> Result<()> {
        if self.live.is_empty() {
            self.active = None;
            return Ok(());
        }
        self.output.send(AudioCommand::StopAll)?;
        self.active = None;
        debug!(voices = self.live.len(), "stop all");
        Ok(())
    }

    /// A region was removed from the model. Stop it if it's the one playing,
    /// otherwise keep the highlight pointing at the same region.
    pub fn region_deleted(&mut self, index: usize) -> Result<()> {
        match self.active {
            Some((_, region)) if region == index => self.stop_all(),
            Some((id, region)) if region > index => {
                self.active = Some((id, region - 1));
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Drain finished voices from the audio side. Their graphs are already
    /// released; they get dropped here, off the audio thread.
    pub fn poll(&mut self, elapsed: std::time::Duration) -> Vec<(VoiceId, VoiceState)> {
        self.output.tick(elapsed);

        let mut finished = Vec::new();
        while let Some(VoiceEvent { id, region, outcome, voice }) = self.output.poll_event() {
            self.live.retain(|v| *v != id);
            if self.active.is_some_and(|(active, _)| active == id) {
                self.active = None;
            }
            match outcome {
                VoiceState::Ended => info!(?id, region, "voice ended"),
                _ => debug!(?id, region, ?outcome, "voice retired"),
            }
            drop(voice);
            finished.push((id, outcome));
        }
        finished
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::audio::HeadlessOutput;
    use crate::pipeline::ParamChange;

    fn playback() -> Playback<HeadlessOutput> {
        Playback::new(HeadlessOutput::new(8000), 7)
    }

    fn slice(len: usize) -> Arc<SampleBuffer> {
        Arc::new(SampleBuffer::new(8000, vec![vec![0.1; len]]).unwrap())
    }

    #[test]
    fn stop_all_when_idle_is_a_no_op() {
        let mut p = playback();
        p.stop_all().unwrap();
        assert!(p.poll(Duration::ZERO).is_empty());
        assert_eq!(p.active_region(), None);
    }

    #[test]
    fn natural_end_clears_the_active_region() {
        let mut p = playback();
        let id = p.play(2, slice(800), &EffectParameters::default()).unwrap();
        assert_eq!(p.active_region(), Some(2));

        // 800 frames at 8 kHz is 100ms
        assert!(p.poll(Duration::from_millis(50)).is_empty());
        let done = p.poll(Duration::from_millis(60));
        assert_eq!(done, vec![(id, VoiceState::Ended)]);
        assert_eq!(p.active_region(), None);
        assert_eq!(p.live_voices(), 0);
    }

    #[test]
    fn play_is_monophonic() {
        let mut p = playback();
        let first = p.play(0, slice(8000), &EffectParameters::default()).unwrap();
        let second = p.play(1, slice(8000), &EffectParameters::default()).unwrap();
        assert_eq!(p.output().active_voices(), 1);

        let done = p.poll(Duration::ZERO);
        assert_eq!(done, vec![(first, VoiceState::ForceStopped)]);
        assert_eq!(p.active_region(), Some(1));
        assert_eq!(p.live_voices(), 1);
        assert_ne!(first, second);
    }

    #[test]
    fn stop_all_tears_down_modulation() {
        let mut p = playback();
        let mut params = EffectParameters::default();
        params.apply(ParamChange::FlangerMix(0.5));
        p.play(0, slice(8000), &params).unwrap();
        p.stop_all().unwrap();
        assert_eq!(p.active_region(), None);

        let mut events = Vec::new();
        while let Some(ev) = p.output_mut().poll_event() {
            events.push(ev);
        }
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].outcome, VoiceState::ForceStopped);
        assert!(events[0].voice.graph().is_released());
        assert_eq!(events[0].voice.graph().running_oscillators(), 0);
    }

    #[test]
    fn deleting_regions_tracks_the_active_one() {
        let mut p = playback();
        p.play(3, slice(8000), &EffectParameters::default()).unwrap();
        p.region_deleted(5).unwrap();
        assert_eq!(p.active_region(), Some(3));
        p.region_deleted(1).unwrap();
        assert_eq!(p.active_region(), Some(2));
        p.region_deleted(2).unwrap();
        assert_eq!(p.active_region(), None);
        assert_eq!(p.output().active_voices(), 0);
    }
}
