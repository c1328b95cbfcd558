// The vocabulary between the shell and the session.
//
// Keys (see tui/input.rs for the mapping):
//   1 .. 9, 0     //  PlaySlot(1..9, 0)
//   Space         //  StopAll
//   Ctrl+Z        //  Undo
//   mouse click   //  Click { x, width } on the waveform
//   Esc           //  CancelPending
//   Left / Right  //  Pan(-1 / 1)
//   Up / Down     //  ZoomIn / ZoomOut
//   r             //  ResetView
//   Tab           //  NextPage
//   [ / ]         //  KnobA(-1 / 1)
//   - / =         //  KnobB(-1 / 1)
//   x             //  DeleteSelected
//   e / E         //  Export(Concatenated / PerRegion)
//   m             //  ToggleRecord
//   q             //  Quit
//
// Rendering works like it always has: each frame the shell asks the session
// for a `DisplayState` and draws only that.

use crate::export::{ExportMode, Remaining};
use crate::pipeline::Param;
use crate::waveform::DrawCommand;

pub const NUM_SLOTS: usize = 10;

#[derive(Clone, Debug, PartialEq)]
pub enum InputEvent {
    PlaySlot(u8), // the digit that was pressed
    StopAll,
    Undo,
    Click { x: f64, width: f64 }, // column inside the waveform
    CancelPending,
    Pan(f64),
    ZoomIn,
    ZoomOut,
    ResetView,
    NextPage,
    KnobA(f32), // sign is the direction
    KnobB(f32),
    DeleteSelected,
    Export(ExportMode),
    ToggleRecord,
    Quit,
}

impl InputEvent {
    /// Region index for a digit key: 1 is the first region, 0 the tenth.
    pub fn slot_index(digit: u8) -> usize {
        if digit == 0 { 9 } else { digit as usize - 1 }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParamPage {
    Tone,
    Filter,
    Space,
    Level,
}

impl ParamPage {
    pub fn next(self) -> Self {
        match self {
            ParamPage::Tone => ParamPage::Filter,
            ParamPage::Filter => ParamPage::Space,
            ParamPage::Space => ParamPage::Level,
            ParamPage::Level => ParamPage::Tone,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ParamPage::Tone => "TONE",
            ParamPage::Filter => "FILTER",
            ParamPage::Space => "SPACE",
            ParamPage::Level => "LEVEL",
        }
    }

    // level only has the one knob
    pub fn knobs(self) -> (Param, Option<Param>) {
        match self {
            ParamPage::Tone => (Param::Transpose, Some(Param::TempoRatio)),
            ParamPage::Filter => (Param::FilterCutoff, Some(Param::FilterKind)),
            ParamPage::Space => (Param::ReverbMix, Some(Param::FlangerMix)),
            ParamPage::Level => (Param::VolumeGain, None),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlotState {
    Empty,
    Filled,
    Selected,
    Playing,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Knob {
    pub label: &'static str,
    pub value: String,
}

#[derive(Clone, Debug)]
pub struct DisplayState {
    pub source_name: Option<String>,
    pub duration: f64,
    pub zoom: f64,
    pub visible: (f64, f64), // seconds shown in the waveform
    pub draw: Vec<DrawCommand>,
    pub slots: [SlotState; NUM_SLOTS],
    pub region_count: usize,
    pub pending: Option<f64>,
    pub selected: Option<usize>,
    pub param_page: ParamPage,
    pub knob_a: Option<Knob>, // None with nothing selected
    pub knob_b: Option<Knob>,
    pub stages: Vec<String>, // effect chain of the selected region
    pub recording: bool,
    pub can_undo: bool,
    pub remaining: Option<Remaining>,
    pub upgrade_prompt: bool,
    pub notice: Option<String>,
}
