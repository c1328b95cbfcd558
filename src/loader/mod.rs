pub mod sample_loader;

pub use sample_loader::{load, FileSource, PathSource, PickedFile};
