//! HUD widget contract
//!
//! The core only pushes strings, sizes, and visibility for a handful of
//! named widgets; layout and fonts are the UI layer's business.

use crate::input::PlayerSlot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Widget {
    /// Match clock
    Timer,
    /// Big end-of-match countdown
    Countdown,
    /// Per-player score line
    Score(PlayerSlot),
}

pub trait Hud {
    fn set_text(&mut self, widget: Widget, text: &str);
    fn set_text_size(&mut self, widget: Widget, size: f32);
    fn set_visible(&mut self, widget: Widget, visible: bool);
}

#[derive(Debug, Default)]
pub struct NullHud;

impl Hud for NullHud {
    fn set_text(&mut self, _widget: Widget, _text: &str) {}
    fn set_text_size(&mut self, _widget: Widget, _size: f32) {}
    fn set_visible(&mut self, _widget: Widget, _visible: bool) {}
}

/// Last known state of each widget
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WidgetState {
    pub text: String,
    pub size: f32,
    pub visible: bool,
}

#[derive(Debug, Default)]
pub struct RecordingHud {
    widgets: Vec<(Widget, WidgetState)>,
}

impl RecordingHud {
    pub fn get(&self, widget: Widget) -> Option<&WidgetState> {
        self.widgets.iter().find(|(w, _)| *w == widget).map(|(_, s)| s)
    }

    pub fn text(&self, widget: Widget) -> &str {
        self.get(widget).map(|s| s.text.as_str()).unwrap_or("")
    }

    pub fn is_visible(&self, widget: Widget) -> bool {
        self.get(widget).is_some_and(|s| s.visible)
    }

    fn entry(&mut self, widget: Widget) -> &mut WidgetState {
        let pos = match self.widgets.iter().position(|(w, _)| *w == widget) {
            Some(pos) => pos,
            None => {
                self.widgets.push((widget, WidgetState::default()));
                self.widgets.len() - 1
            }
        };
        &mut self.widgets[pos].1
    }
}

impl Hud for RecordingHud {
    fn set_text(&mut self, widget: Widget, text: &str) {
        self.entry(widget).text = text.to_string();
    }

    fn set_text_size(&mut self, widget: Widget, size: f32) {
        self.entry(widget).size = size;
    }

    fn set_visible(&mut self, widget: Widget, visible: bool) {
        self.entry(widget).visible = visible;
    }
}
