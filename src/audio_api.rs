// What the UI thread and the audio thread say to each other.
pub use crate::audio::{SampleBuffer, Voice, VoiceId, VoiceState};

pub enum AudioCommand {
    // The graph is built (and every buffer allocated) on the UI thread;
    // the engine only starts it.
    Start(Box<Voice>),

    // force-stop every voice that is still playing
    StopAll,
}

impl std::fmt::Debug for AudioCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AudioCommand::Start(v) => write!(f, "Start(voice {:?}, region {})", v.id, v.region),
            AudioCommand::StopAll => write!(f, "StopAll"),
        }
    }
}

// Sent when a voice reaches Ended or ForceStopped. The voice itself rides
// along so its graph gets dropped on the UI thread, not in the audio callback.
pub struct VoiceEvent {
    pub id: VoiceId,
    pub region: usize,
    pub outcome: VoiceState,
    pub voice: Box<Voice>,
}
