use crossbeam_channel::Sender;

use crate::audio_api::{AudioCommand, VoiceEvent};
use super::frame::StereoFrame;
use super::voice::{Voice, VoiceState};

const MAX_VOICES: usize = 16; // hard cap so we wont malloc in audio callback

// Lives on the audio thread. Owns the playing voices, mixes them into the
// device buffer and reports every voice that finishes.
pub struct Engine {
    voices: Vec<Box<Voice>>,
    events: Sender<VoiceEvent>,
}

impl Engine {
    pub fn new(events: Sender<VoiceEvent>) -> Self {
        Self {
            voices: Vec::with_capacity(MAX_VOICES),
            events,
        }
    }

    pub fn handle_cmd(&mut self, cmd: AudioCommand) {
        match cmd {
            AudioCommand::Start(mut voice) => {
                if self.voices.len() >= MAX_VOICES {
                    // steal the oldest
                    let mut oldest = self.voices.remove(0);
                    oldest.force_stop();
                    self.retire(oldest);
                }
                voice.start();
                self.voices.push(voice);
            }
            AudioCommand::StopAll => {
                for mut voice in std::mem::take(&mut self.voices) {
                    voice.force_stop();
                    self.retire(voice);
                }
            }
        }
    }

    pub fn render_block(&mut self, out: &mut [StereoFrame]) {
        out.fill(StereoFrame::zero());
        for voice in &mut self.voices {
            voice.render_into(out);
        }

        let mut i = 0;
        while i < self.voices.len() {
            if self.voices[i].state() == VoiceState::Playing {
                i += 1;
            } else {
                let done = self.voices.remove(i);
                self.retire(done);
            }
        }
    }

    pub fn active_voices(&self) -> usize {
        self.voices.len()
    }

    fn retire(&self, voice: Box<Voice>) {
        let event = VoiceEvent {
            id: voice.id,
            region: voice.region,
            outcome: voice.state(),
            voice,
        };
        // if nobody is listening the voice just drops here
        let _ = self.events.try_send(event);
    }
}
