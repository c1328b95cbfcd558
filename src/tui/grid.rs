use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

use crate::pipeline::slot_label;
use crate::shared::{SlotState, NUM_SLOTS};

// one pad per number key, lit by what its region is doing
pub fn draw_slot_row(frame: &mut Frame, area: Rect, slots: &[SlotState; NUM_SLOTS]) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, NUM_SLOTS as u32); NUM_SLOTS])
        .split(area);

    for (idx, cell_area) in cols.iter().enumerate() {
        let style = match slots[idx] {
            SlotState::Playing => Style::default().fg(Color::LightMagenta).bg(Color::Magenta),
            SlotState::Selected => Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            SlotState::Filled => Style::default().fg(Color::Gray),
            SlotState::Empty => Style::default().fg(Color::DarkGray),
        };
        let pad = Paragraph::new(slot_label(idx).to_string())
            .centered()
            .style(style)
            .block(Block::default().borders(Borders::ALL).border_style(style));
        frame.render_widget(pad, *cell_area);
    }
}
