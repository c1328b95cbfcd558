pub mod audio;
pub mod audio_api;
pub mod config;
pub mod error;
pub mod export;
pub mod loader;
pub mod pipeline;
pub mod playback;
pub mod session;
pub mod shared;
pub mod tui;
pub mod waveform;

pub use config::EditorConfig;
pub use error::{EditorError, Result};
pub use session::EditorSession;
