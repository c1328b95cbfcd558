use ratatui::layout::Rect;

// state local to tui. the session owns everything that matters;
// this only remembers where things were drawn last frame so mouse
// clicks can be mapped back onto the waveform
#[derive(Clone, Debug, Default)]
pub struct TuiState {
    // inner area of the waveform box, in terminal cells
    pub wave_area: Rect,
}

impl TuiState {
    pub fn wave_width(&self) -> usize {
        self.wave_area.width as usize
    }
}
