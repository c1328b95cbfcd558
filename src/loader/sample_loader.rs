use std::path::{Path, PathBuf};

use tracing::info;

use crate::audio::SampleBuffer;
use crate::error::{EditorError, Result};

/// Raw bytes of something the user picked, before decoding.
#[derive(Clone, Debug)]
pub struct PickedFile {
    pub name: String,
    pub bytes: Vec<u8>,
    pub extension: Option<String>,
}

/// Where source audio comes from. The shell supplies one; tests use an
/// in-memory file.
pub trait FileSource {
    fn fetch(&mut self) -> Result<PickedFile>;
}

pub struct PathSource {
    path: PathBuf,
}

impl PathSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FileSource for PathSource {
    fn fetch(&mut self) -> Result<PickedFile> {
        let bytes = std::fs::read(&self.path)?;
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string());
        let extension = self
            .path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase());
        Ok(PickedFile { name, bytes, extension })
    }
}

impl FileSource for PickedFile {
    fn fetch(&mut self) -> Result<PickedFile> {
        Ok(self.clone())
    }
}

// Fetch and decode, ready to become the session's source
pub fn load(source: &mut dyn FileSource) -> Result<(String, SampleBuffer)> {
    let file = source.fetch()?;
    if file.bytes.is_empty() {
        return Err(EditorError::DecodeError(format!("{} is empty", file.name)));
    }
    let buffer = SampleBuffer::decode(file.bytes, file.extension.as_deref())?;
    info!(
        name = %file.name,
        seconds = buffer.duration(),
        channels = buffer.channel_count(),
        "source loaded"
    );
    Ok((file.name, buffer))
}
