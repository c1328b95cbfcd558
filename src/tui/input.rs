use std::time::Duration;

use crossterm::event::{
    self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent,
    MouseEventKind,
};

use super::mode::TuiState;
use crate::export::ExportMode;
use crate::shared::InputEvent;

// poll for input from the terminal and turn it into session events.
// keys map one to one; mouse clicks only count inside the waveform
pub fn poll_input(timeout: Duration, ts: &TuiState) -> anyhow::Result<Vec<InputEvent>> {
    if !event::poll(timeout)? {
        return Ok(vec![]);
    }

    match event::read()? {
        Event::Key(key) if key.kind == KeyEventKind::Press => Ok(handle_key(key)),
        Event::Mouse(mouse) => Ok(handle_mouse(mouse, ts)),
        _ => Ok(vec![]),
    }
}

fn handle_key(key: KeyEvent) -> Vec<InputEvent> {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('z' | 'Z') => vec![InputEvent::Undo],
            KeyCode::Char('c') => vec![InputEvent::Quit], // raw mode eats ^C
            _ => vec![],
        };
    }

    match key.code {
        // slots: 1..9 then 0 for the tenth
        KeyCode::Char(c @ '0'..='9') => match c.to_digit(10) {
            Some(d) => vec![InputEvent::PlaySlot(d as u8)],
            None => vec![],
        },
        KeyCode::Char(' ') => vec![InputEvent::StopAll],
        KeyCode::Esc => vec![InputEvent::CancelPending],
        KeyCode::Char('q') => vec![InputEvent::Quit],

        // view
        KeyCode::Left => vec![InputEvent::Pan(-1.0)],
        KeyCode::Right => vec![InputEvent::Pan(1.0)],
        KeyCode::Up => vec![InputEvent::ZoomIn],
        KeyCode::Down => vec![InputEvent::ZoomOut],
        KeyCode::Char('r') => vec![InputEvent::ResetView],

        // params of the selected region
        KeyCode::Tab => vec![InputEvent::NextPage],
        KeyCode::Char('[') => vec![InputEvent::KnobA(-1.0)],
        KeyCode::Char(']') => vec![InputEvent::KnobA(1.0)],
        KeyCode::Char('-') => vec![InputEvent::KnobB(-1.0)],
        KeyCode::Char('=') => vec![InputEvent::KnobB(1.0)],

        KeyCode::Char('x') => vec![InputEvent::DeleteSelected],
        KeyCode::Char('e') => vec![InputEvent::Export(ExportMode::Concatenated)],
        KeyCode::Char('E') => vec![InputEvent::Export(ExportMode::PerRegion)],
        KeyCode::Char('m') => vec![InputEvent::ToggleRecord],

        _ => vec![],
    }
}

fn handle_mouse(mouse: MouseEvent, ts: &TuiState) -> Vec<InputEvent> {
    if mouse.kind != MouseEventKind::Down(MouseButton::Left) {
        return vec![];
    }
    let area = ts.wave_area;
    let inside = mouse.column >= area.x
        && mouse.column < area.x + area.width
        && mouse.row >= area.y
        && mouse.row < area.y + area.height;
    if !inside {
        return vec![];
    }
    vec![InputEvent::Click {
        x: (mouse.column - area.x) as f64,
        width: area.width as f64,
    }]
}

#[cfg(test)]
mod tests {
    use ratatui::layout::Rect;

    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn click(column: u16, row: u16) -> MouseEvent {
        MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column,
            row,
            modifiers: KeyModifiers::NONE,
        }
    }

    #[test]
    fn digits_play_slots() {
        assert_eq!(handle_key(key(KeyCode::Char('1'))), [InputEvent::PlaySlot(1)]);
        assert_eq!(handle_key(key(KeyCode::Char('0'))), [InputEvent::PlaySlot(0)]);
    }

    #[test]
    fn ctrl_z_undoes() {
        let ev = KeyEvent::new(KeyCode::Char('z'), KeyModifiers::CONTROL);
        assert_eq!(handle_key(ev), [InputEvent::Undo]);
        // plain z does nothing
        assert!(handle_key(key(KeyCode::Char('z'))).is_empty());
    }

    #[test]
    fn export_keys() {
        assert_eq!(
            handle_key(key(KeyCode::Char('e'))),
            [InputEvent::Export(ExportMode::Concatenated)]
        );
        assert_eq!(
            handle_key(KeyEvent::new(KeyCode::Char('E'), KeyModifiers::SHIFT)),
            [InputEvent::Export(ExportMode::PerRegion)]
        );
    }

    #[test]
    fn clicks_map_into_the_waveform() {
        let ts = TuiState {
            wave_area: Rect::new(2, 3, 80, 10),
            ..TuiState::default()
        };
        assert_eq!(
            handle_mouse(click(42, 5), &ts),
            [InputEvent::Click { x: 40.0, width: 80.0 }]
        );
        assert!(handle_mouse(click(1, 5), &ts).is_empty());
        assert!(handle_mouse(click(42, 13), &ts).is_empty());

        let up = MouseEvent {
            kind: MouseEventKind::Up(MouseButton::Left),
            ..click(42, 5)
        };
        assert!(handle_mouse(up, &ts).is_empty());
    }
}
