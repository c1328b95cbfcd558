pub mod cache;
pub mod effects;
pub mod history;
pub mod regions;

pub use cache::DerivedBufferCache;
pub use effects::{EffectParameters, FilterKind, Param, ParamChange};
pub use history::{History, HistorySnapshot};
pub use regions::{slot_label, ClickOutcome, Region, RegionModel};
