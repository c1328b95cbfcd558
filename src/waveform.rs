// Zoom/pan view over the loaded source plus the peak-envelope renderer.
// Rendering is a pure function producing drawing commands; the tui (or a
// test) decides what they look like.

use crate::audio::SampleBuffer;
use crate::config::EditorConfig;
use crate::pipeline::{slot_label, Region};

pub const MIN_ZOOM: f64 = 1.0;

#[derive(Clone, Debug, PartialEq)]
pub struct ViewState {
    zoom: f64,
    pan: f64, // seconds; clamped whenever it's read
    max_zoom: f64,
    zoom_step: f64,
    pan_fraction: f64,
}

impl ViewState {
    pub fn new(config: &EditorConfig) -> Self {
        Self {
            zoom: MIN_ZOOM,
            pan: 0.0,
            max_zoom: config.max_zoom,
            zoom_step: config.zoom_step,
            pan_fraction: config.pan_fraction,
        }
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn visible_duration(&self, duration: f64) -> f64 {
        duration / self.zoom
    }

    pub fn visible_start(&self, duration: f64) -> f64 {
        let max_start = (duration - self.visible_duration(duration)).max(0.0);
        self.pan.clamp(0.0, max_start)
    }

    pub fn visible_end(&self, duration: f64) -> f64 {
        self.visible_start(duration) + self.visible_duration(duration)
    }

    pub fn zoom_in(&mut self) {
        self.zoom = (self.zoom + self.zoom_step).clamp(MIN_ZOOM, self.max_zoom);
    }

    pub fn zoom_out(&mut self) {
        self.zoom = (self.zoom - self.zoom_step).clamp(MIN_ZOOM, self.max_zoom);
    }

    /// Move the window by a fraction of what's visible; `direction` is only
    /// looked at for its sign.
    pub fn pan(&mut self, direction: f64, duration: f64) {
        let visible = self.visible_duration(duration);
        let step = self.pan_fraction * visible * direction.signum();
        let max_start = (duration - visible).max(0.0);
        self.pan = (self.visible_start(duration) + step).clamp(0.0, max_start);
    }

    pub fn reset(&mut self) {
        self.zoom = MIN_ZOOM;
        self.pan = 0.0;
    }

    /// Seconds under pixel column `x` of a `width`-wide canvas.
    pub fn time_at(&self, x: f64, width: f64, duration: f64) -> f64 {
        if width <= 0.0 {
            return self.visible_start(duration);
        }
        let frac = (x / width).clamp(0.0, 1.0);
        self.visible_start(duration) + frac * self.visible_duration(duration)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tint {
    Waveform,
    Region,
    ActiveRegion,
    Pending,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stroke {
    Solid,
    Dashed,
}

/// Vertical coordinates are in sample units, -1 at the bottom to 1 at the
/// top. Horizontal ones are pixel columns.
#[derive(Clone, Debug, PartialEq)]
pub enum DrawCommand {
    Background,
    Envelope { x: usize, top: f32, bottom: f32 },
    Band { x0: f64, x1: f64, tint: Tint },
    Marker { x: f64, stroke: Stroke, tint: Tint },
    Label { x: f64, y: f32, text: String, tint: Tint },
}

const LABEL_Y: f32 = 0.9;

pub struct Scene<'a> {
    pub source: &'a SampleBuffer,
    pub view: &'a ViewState,
    pub regions: &'a [Region],
    pub active: Option<usize>,
    pub pending: Option<f64>,
    pub width: usize,
}

pub fn render(scene: &Scene) -> Vec<DrawCommand> {
    let mut out = vec![DrawCommand::Background];
    let Scene { source, view, width, .. } = *scene;
    if width == 0 || source.is_empty() {
        return out;
    }

    let duration = source.duration();
    let vis_start = view.visible_start(duration);
    let vis_dur = view.visible_duration(duration);
    let vis_end = vis_start + vis_dur;

    peaks(source, vis_start, vis_end, width, &mut out);

    let to_x = |t: f64| (t - vis_start) / vis_dur * width as f64;
    let on_screen = |t: f64| t >= vis_start && t <= vis_end;

    for (i, r) in scene.regions.iter().enumerate() {
        if r.end < vis_start || r.start > vis_end {
            continue;
        }
        let tint = if scene.active == Some(i) { Tint::ActiveRegion } else { Tint::Region };
        out.push(DrawCommand::Band {
            x0: to_x(r.start).max(0.0),
            x1: to_x(r.end).min(width as f64),
            tint,
        });
        if on_screen(r.start) {
            let x = to_x(r.start);
            out.push(DrawCommand::Marker { x, stroke: Stroke::Solid, tint });
            out.push(DrawCommand::Label {
                x,
                y: LABEL_Y,
                text: slot_label(i).to_string(),
                tint,
            });
        }
        if on_screen(r.end) {
            out.push(DrawCommand::Marker { x: to_x(r.end), stroke: Stroke::Dashed, tint });
        }
    }

    if let Some(t) = scene.pending.filter(|t| on_screen(*t)) {
        let x = to_x(t);
        out.push(DrawCommand::Marker { x, stroke: Stroke::Dashed, tint: Tint::Pending });
        out.push(DrawCommand::Label {
            x,
            y: -LABEL_Y,
            text: format!("Start: {t:.3}s"),
            tint: Tint::Pending,
        });
    }

    out
}

// one min/max pair per column over channel 0
fn peaks(source: &SampleBuffer, from: f64, to: f64, width: usize, out: &mut Vec<DrawCommand>) {
    let data = &source.channels[0];
    let start = source.frame_at(from);
    let end = source.frame_at(to).max(start);
    let per_column = (end - start).div_ceil(width).max(1);

    for x in 0..width {
        let a = start + x * per_column;
        if a >= end {
            break;
        }
        let b = (a + per_column).min(end);
        let (lo, hi) = data[a..b]
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), s| (lo.min(*s), hi.max(*s)));
        out.push(DrawCommand::Envelope { x, top: hi, bottom: lo });
    }
}
