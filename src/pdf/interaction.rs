//! Pointer driven selection state
//!
//! Events come in already converted to document space. The state machine
//! decides which resolver query a pointer event triggers and reports what the
//! host has to do next as a list of [`Effect`]s.

use log::debug;

use super::document::{Document, DocumentBackend};
use super::resolver;
use super::types::{DragGesture, Selection, SelectionMode};

/// Input events, coordinates in document units
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Event {
    PointerDown { x: f32, y: f32 },
    PointerMove { x: f32, y: f32 },
    PointerUp { x: f32, y: f32 },
    /// Select a mode explicitly
    ModeSwitch(SelectionMode),
    /// Mode shortcut pressed: Line <-> Image
    ToggleMode,
    /// Current page or document replaced
    PageChanged,
    /// View geometry changed (resize, zoom)
    ViewportChanged,
}

/// Effects produced by handling an event
#[derive(Clone, Debug, PartialEq)]
pub enum Effect {
    /// Highlight overlay changed, repaint it
    Redraw,
    /// Page raster is stale, render the page again
    Rerender,
    /// Extract this selection into the notes
    Commit(Selection),
}

/// Idle or dragging, derived from the drag gesture
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Dragging,
}

/// Selection mode, current selection and drag gesture
#[derive(Debug, Default)]
pub struct Interaction {
    selection: Selection,
    drag: DragGesture,
}

impl Interaction {
    #[must_use]
    pub fn new(mode: SelectionMode) -> Self {
        Self {
            selection: Selection::new(mode),
            drag: DragGesture::default(),
        }
    }

    #[must_use]
    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    #[must_use]
    pub fn mode(&self) -> SelectionMode {
        self.selection.mode
    }

    #[must_use]
    pub fn drag(&self) -> &DragGesture {
        &self.drag
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        if self.drag.active {
            Phase::Dragging
        } else {
            Phase::Idle
        }
    }

    /// Whether the point is over the held selection (hand cursor).
    #[must_use]
    pub fn is_over_selection(&self, x: f32, y: f32) -> bool {
        self.selection.contains(x, y)
    }

    /// Apply an event and return resulting effects
    #[must_use]
    pub fn handle_event<B: DocumentBackend>(
        &mut self,
        event: Event,
        doc: &Document<B>,
    ) -> Vec<Effect> {
        match event {
            Event::PointerDown { x, y } => {
                if !doc.is_loaded() {
                    return vec![];
                }
                debug!("Pointer down at {x} {y}");
                self.drag.start(x, y);
                vec![]
            }

            Event::PointerMove { x, y } => {
                if !doc.is_loaded() {
                    return vec![];
                }
                self.pointer_move(x, y, doc)
            }

            Event::PointerUp { x, y } => {
                if !doc.is_loaded() || !self.drag.active {
                    self.drag.reset();
                    return vec![];
                }
                self.pointer_up(x, y)
            }

            Event::ModeSwitch(mode) => self.switch_mode(mode),

            Event::ToggleMode => self.switch_mode(self.selection.mode.toggled()),

            Event::PageChanged | Event::ViewportChanged => {
                self.selection.clear();
                vec![Effect::Rerender, Effect::Redraw]
            }
        }
    }

    fn pointer_move<B: DocumentBackend>(
        &mut self,
        x: f32,
        y: f32,
        doc: &Document<B>,
    ) -> Vec<Effect> {
        // A drag is never a single-line hover
        if self.drag.active && self.selection.mode == SelectionMode::Line {
            self.selection.mode = SelectionMode::Text;
        }

        match (self.selection.mode, self.drag.active) {
            (SelectionMode::Line, false) => {
                let (text, areas) = resolver::find_line(doc, x, y);
                self.selection.set(text, areas);
                vec![Effect::Redraw]
            }

            (SelectionMode::Text, true) => {
                let query = self.drag.span_to(x, y);
                let (text, areas) = resolver::find_text(doc, &query);
                if areas.is_empty() {
                    return vec![];
                }
                self.selection.set(text, areas);
                vec![Effect::Redraw]
            }

            (SelectionMode::Image, true) => {
                let area = resolver::image_region((self.drag.anchor_x, self.drag.anchor_y), (x, y));
                // A region without extent has nothing to export
                let areas = if area.width() > 0.0 && area.height() > 0.0 {
                    vec![area]
                } else {
                    Vec::new()
                };
                self.selection.set(None, areas);
                vec![Effect::Redraw]
            }

            _ => vec![],
        }
    }

    fn pointer_up(&mut self, x: f32, y: f32) -> Vec<Effect> {
        let is_click = self.drag.is_click(x, y);
        let (anchor_x, anchor_y) = (self.drag.anchor_x, self.drag.anchor_y);
        self.drag.reset();

        if !is_click {
            debug!("Drag released, keeping {} area(s)", self.selection.areas.len());
            return vec![Effect::Redraw];
        }

        let mut effects = Vec::new();
        if self.selection.contains(anchor_x, anchor_y) {
            debug!("Click on selection, committing");
            effects.push(Effect::Commit(self.selection.clone()));
        }
        self.selection.clear();
        effects.push(Effect::Redraw);
        effects
    }

    fn switch_mode(&mut self, requested: SelectionMode) -> Vec<Effect> {
        // Text is only reachable by dragging in Line mode
        let mode = match requested {
            SelectionMode::Text => SelectionMode::Line,
            other => other,
        };
        if mode == self.selection.mode {
            return vec![];
        }

        debug!("Selection mode {} -> {}", self.selection.mode.as_str(), mode.as_str());
        self.selection.clear();
        self.selection.mode = mode;
        vec![Effect::Redraw]
    }
}
