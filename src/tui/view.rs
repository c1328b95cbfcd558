use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::symbols::Marker;
use ratatui::text::{Line, Span};
use ratatui::widgets::canvas::{Canvas, Context, Line as CanvasLine, Rectangle};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

use super::grid::draw_slot_row;
use crate::shared::{DisplayState, Knob};
use crate::waveform::{DrawCommand, Stroke, Tint};

const DASH: f64 = 0.15; // dashed marker segment length, in sample units

fn sections(area: Rect) -> std::rc::Rc<[Rect]> {
    Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // status line
            Constraint::Min(8),    // waveform
            Constraint::Length(3), // slot row
            Constraint::Length(3), // params
            Constraint::Length(1), // notices
        ])
        .split(area)
}

/// Where the waveform will be drawn inside `area`, borders excluded. The
/// session needs the width before the frame is drawn.
pub fn waveform_area(area: Rect) -> Rect {
    Block::default().borders(Borders::ALL).inner(sections(area)[1])
}

pub fn render(frame: &mut Frame, area: Rect, state: &DisplayState, blink_on: bool) {
    let s = sections(area);
    draw_status(frame, s[0], state, blink_on);
    draw_waveform(frame, s[1], state);
    draw_slot_row(frame, s[2], &state.slots);
    draw_params(frame, s[3], state);
    draw_notice(frame, s[4], state);
}

fn tint_color(tint: Tint) -> Color {
    match tint {
        Tint::Waveform => Color::Cyan,
        Tint::Region => Color::Yellow,
        Tint::ActiveRegion => Color::LightGreen,
        Tint::Pending => Color::Magenta,
    }
}

fn draw_status(frame: &mut Frame, area: Rect, state: &DisplayState, blink_on: bool) {
    let name = state.source_name.as_deref().unwrap_or("no audio (m to record)");
    let mut spans = vec![
        Span::styled("SAMPLX ", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(format!(
            "{name}  {:.2}s  x{:.0}  [{:.2}s - {:.2}s]",
            state.duration, state.zoom, state.visible.0, state.visible.1
        )),
    ];
    if let Some(remaining) = state.remaining {
        spans.push(Span::raw(format!("  exports: {remaining}")));
    }
    if state.recording && blink_on {
        spans.push(Span::styled("  ● REC", Style::default().fg(Color::Red)));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn draw_waveform(frame: &mut Frame, area: Rect, state: &DisplayState) {
    let width = Block::default().borders(Borders::ALL).inner(area).width.max(1) as f64;
    let title = match state.pending {
        Some(t) => format!(" waveform  (marking from {t:.3}s, esc to cancel) "),
        None => " waveform ".to_string(),
    };
    let canvas = Canvas::default()
        .block(Block::default().borders(Borders::ALL).title(title))
        .marker(Marker::Braille)
        .x_bounds([0.0, width])
        .y_bounds([-1.0, 1.0])
        .paint(|ctx| {
            for cmd in &state.draw {
                paint(ctx, cmd);
            }
        });
    frame.render_widget(canvas, area);
}

fn paint(ctx: &mut Context, cmd: &DrawCommand) {
    match cmd {
        DrawCommand::Background => {}
        DrawCommand::Envelope { x, top, bottom } => {
            let x = *x as f64;
            ctx.draw(&CanvasLine::new(x, *bottom as f64, x, *top as f64, tint_color(Tint::Waveform)));
        }
        DrawCommand::Band { x0, x1, tint } => {
            ctx.draw(&Rectangle {
                x: *x0,
                y: -1.0,
                width: (x1 - x0).max(0.0),
                height: 2.0,
                color: tint_color(*tint),
            });
        }
        DrawCommand::Marker { x, stroke, tint } => {
            let color = tint_color(*tint);
            match stroke {
                Stroke::Solid => ctx.draw(&CanvasLine::new(*x, -1.0, *x, 1.0, color)),
                Stroke::Dashed => {
                    let mut y = -1.0;
                    while y < 1.0 {
                        ctx.draw(&CanvasLine::new(*x, y, *x, (y + DASH).min(1.0), color));
                        y += DASH * 2.0;
                    }
                }
            }
        }
        DrawCommand::Label { x, y, text, tint } => {
            ctx.print(
                *x,
                *y as f64,
                Span::styled(text.clone(), Style::default().fg(tint_color(*tint))),
            );
        }
    }
}

fn knob_span(knob: &Option<Knob>) -> Span<'static> {
    match knob {
        Some(k) => Span::raw(format!("{}: {:<8}", k.label, k.value)),
        None => Span::raw(""),
    }
}

fn draw_params(frame: &mut Frame, area: Rect, state: &DisplayState) {
    let title = match state.selected {
        Some(i) => format!(" region {} - {} ", i + 1, state.param_page.label()),
        None => format!(" {} ", state.param_page.label()),
    };
    let line = if state.selected.is_some() {
        Line::from(vec![
            Span::styled("[ ] ", Style::default().fg(Color::DarkGray)),
            knob_span(&state.knob_a),
            Span::styled("  - = ", Style::default().fg(Color::DarkGray)),
            knob_span(&state.knob_b),
            Span::styled(
                format!("  {}", state.stages.join(" > ")),
                Style::default().fg(Color::DarkGray),
            ),
        ])
    } else {
        Line::from("click twice on the waveform to mark a region")
    };
    let block = Block::default().borders(Borders::ALL).title(title);
    frame.render_widget(Paragraph::new(line).block(block), area);
}

fn draw_notice(frame: &mut Frame, area: Rect, state: &DisplayState) {
    let line = if state.upgrade_prompt {
        Line::from(Span::styled(
            state
                .notice
                .clone()
                .unwrap_or_else(|| "running low on free exports, upgrade for unlimited".into()),
            Style::default().fg(Color::Black).bg(Color::Yellow),
        ))
    } else if let Some(notice) = &state.notice {
        Line::from(Span::styled(notice.clone(), Style::default().fg(Color::LightRed)))
    } else {
        let undo = if state.can_undo { "  ^Z undo" } else { "" };
        Line::from(Span::styled(
            format!("{} regions{undo}  space stop  e/E export  q quit", state.region_count),
            Style::default().fg(Color::DarkGray),
        ))
    };
    frame.render_widget(Paragraph::new(line), area);
}

#[cfg(test)]
mod tests {
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    use super::*;
    use crate::shared::{ParamPage, SlotState, NUM_SLOTS};

    fn state() -> DisplayState {
        DisplayState {
            source_name: Some("loop.wav".into()),
            duration: 2.0,
            zoom: 1.0,
            visible: (0.0, 2.0),
            draw: vec![
                DrawCommand::Background,
                DrawCommand::Envelope { x: 3, top: 0.5, bottom: -0.5 },
                DrawCommand::Band { x0: 2.0, x1: 10.0, tint: Tint::Region },
                DrawCommand::Marker { x: 2.0, stroke: Stroke::Solid, tint: Tint::Region },
                DrawCommand::Marker { x: 10.0, stroke: Stroke::Dashed, tint: Tint::Region },
                DrawCommand::Label { x: 2.0, y: 0.9, text: "1".into(), tint: Tint::Region },
            ],
            slots: [SlotState::Empty; NUM_SLOTS],
            region_count: 1,
            pending: None,
            selected: None,
            param_page: ParamPage::Tone,
            knob_a: None,
            knob_b: None,
            stages: vec![],
            recording: false,
            can_undo: true,
            remaining: None,
            upgrade_prompt: false,
            notice: Some("index 9 out of range (have 1)".into()),
        }
    }

    #[test]
    fn waveform_area_sits_inside_the_border() {
        let area = Rect::new(0, 0, 100, 30);
        let wave = waveform_area(area);
        assert_eq!(wave.x, 1);
        assert_eq!(wave.y, 2);
        assert_eq!(wave.width, 98);
    }

    #[test]
    fn renders_without_panicking() {
        let mut term = Terminal::new(TestBackend::new(100, 30)).unwrap();
        let ds = state();
        term.draw(|frame| render(frame, frame.area(), &ds, true)).unwrap();

        let text: String = term
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect();
        assert!(text.contains("loop.wav"));
        assert!(text.contains("out of range"));
    }
}
