//! Page viewer driving the selection engine
//!
//! [`Viewer`] is what a host UI talks to. It takes pointer positions in
//! surface pixels, converts them to document space, feeds the interaction
//! state machine and carries out the effects it reports. Commits are executed
//! here; repaint effects are handed back to the host.

use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::Local;
use log::{debug, error, info};

use crate::export::{ImageLimits, edit_text, export_area};
use crate::notes::NoteSink;
use crate::pdf::highlight::draw_selection;
use crate::pdf::{
    CacheKey, DocError, Document, DocumentBackend, Effect, Event, Interaction, PageCache,
    PageContext, ScrollDirection, Selection, SelectionMode, Surface, ViewState, ZoomChange,
    ZoomSetting,
};
use crate::settings::Settings;

/// Rendered pages kept around for repainting the overlay
const PAGE_CACHE_CAPACITY: usize = 8;

/// Where the host's vertical scrollbar currently is
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScrollPosition {
    pub at_top: bool,
    pub at_bottom: bool,
}

/// Result of a scroll request
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ScrollOutcome {
    /// Zoom stepped to the given percentage
    Zoomed(f32),
    /// Moved to the previous page; the host shows its bottom
    PreviousPage,
    /// Moved to the next page; the host shows its top
    NextPage,
    /// At the first or last page, nothing to do
    Consumed,
    /// Regular scrolling, left to the host
    Ignored,
}

pub struct Viewer<B, S> {
    document: Document<B>,
    view: ViewState,
    interaction: Interaction,
    cache: PageCache,
    sink: S,
    settings: Settings,
}

impl<B: DocumentBackend, S: NoteSink> Viewer<B, S> {
    pub fn new(sink: S, settings: Settings) -> Self {
        Self {
            document: Document::new(),
            view: ViewState::default(),
            interaction: Interaction::default(),
            cache: PageCache::new(PAGE_CACHE_CAPACITY),
            sink,
            settings,
        }
    }

    pub fn document(&self) -> &Document<B> {
        &self.document
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn selection(&self) -> &Selection {
        self.interaction.selection()
    }

    pub fn interaction(&self) -> &Interaction {
        &self.interaction
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    pub fn open(&mut self, path: &Path) -> Result<PageContext, DocError> {
        let page = self.document.open(path)?;
        self.document_replaced();
        Ok(page)
    }

    /// Show a document whose backend is already open.
    pub fn load(&mut self, path: PathBuf, backend: B) -> Result<PageContext, DocError> {
        let page = self.document.load(path, backend)?;
        self.document_replaced();
        Ok(page)
    }

    fn document_replaced(&mut self) {
        self.cache.invalidate_all();
        self.page_changed();
    }

    fn page_changed(&mut self) {
        let page = *self.document.page();
        info!("Showing page {} of {}", page.page_number + 1, page.pages_count);
        self.view.update(page.page_width);
        let _ = self.interaction.handle_event(Event::PageChanged, &self.document);
    }

    pub fn set_page(&mut self, n: usize) -> bool {
        let changed = self.document.set_page(n);
        if changed {
            self.page_changed();
        }
        changed
    }

    pub fn next_page(&mut self) -> bool {
        let changed = self.document.next_page();
        if changed {
            self.page_changed();
        }
        changed
    }

    pub fn prev_page(&mut self) -> bool {
        let changed = self.document.prev_page();
        if changed {
            self.page_changed();
        }
        changed
    }

    pub fn go_to_page_label(&mut self, label: &str) -> bool {
        let changed = self.document.go_to_page_label(label);
        if changed {
            self.page_changed();
        }
        changed
    }

    /// Viewport width changed; returns true when the page scale changed.
    ///
    /// Any actual width change drops the held selection, even when an
    /// explicit zoom keeps the scale.
    pub fn resize(&mut self, viewport_width: f32) -> bool {
        if !self.view.resize(viewport_width) {
            return false;
        }
        let rescaled = self.refresh_scale();
        if !rescaled {
            self.viewport_changed();
        }
        rescaled
    }

    pub fn set_zoom(&mut self, setting: ZoomSetting) -> bool {
        self.view.set_zoom(setting);
        self.refresh_scale()
    }

    fn refresh_scale(&mut self) -> bool {
        let Some((page_width, _)) = self.document.page_size() else {
            return false;
        };
        if !self.view.update(page_width) {
            return false;
        }
        debug!("Scale now {}", self.view.scale);
        self.viewport_changed();
        true
    }

    fn viewport_changed(&mut self) {
        let _ = self
            .interaction
            .handle_event(Event::ViewportChanged, &self.document);
    }

    /// Wheel scroll over the page.
    ///
    /// With the zoom modifier held the zoom steps. Otherwise scrolling past
    /// the top or bottom edge turns the page.
    pub fn scroll(
        &mut self,
        direction: ScrollDirection,
        zoom_modifier: bool,
        position: ScrollPosition,
    ) -> ScrollOutcome {
        if !self.document.is_loaded() {
            return ScrollOutcome::Ignored;
        }

        if zoom_modifier {
            return match self.view.step(direction) {
                ZoomChange::Applied(percent) => {
                    self.viewport_changed();
                    ScrollOutcome::Zoomed(percent)
                }
                ZoomChange::AtLimit => ScrollOutcome::Ignored,
            };
        }

        match direction {
            ScrollDirection::Up if position.at_top => {
                if self.prev_page() {
                    ScrollOutcome::PreviousPage
                } else {
                    ScrollOutcome::Consumed
                }
            }
            ScrollDirection::Down if position.at_bottom => {
                if self.next_page() {
                    ScrollOutcome::NextPage
                } else {
                    ScrollOutcome::Consumed
                }
            }
            _ => ScrollOutcome::Ignored,
        }
    }

    pub fn pointer_down(&mut self, screen_x: f32, screen_y: f32) -> Result<Vec<Effect>> {
        let (x, y) = self.view.to_document(screen_x, screen_y);
        self.dispatch(Event::PointerDown { x, y })
    }

    pub fn pointer_move(&mut self, screen_x: f32, screen_y: f32) -> Result<Vec<Effect>> {
        let (x, y) = self.view.to_document(screen_x, screen_y);
        self.dispatch(Event::PointerMove { x, y })
    }

    /// Release the pointer; a click on the held selection commits it.
    ///
    /// A failed commit is returned as an error, the selection is cleared
    /// either way.
    pub fn pointer_up(&mut self, screen_x: f32, screen_y: f32) -> Result<Vec<Effect>> {
        let (x, y) = self.view.to_document(screen_x, screen_y);
        self.dispatch(Event::PointerUp { x, y })
    }

    /// Whether the pointer hovers the held selection.
    pub fn is_over_selection(&self, screen_x: f32, screen_y: f32) -> bool {
        let (x, y) = self.view.to_document(screen_x, screen_y);
        self.interaction.is_over_selection(x, y)
    }

    pub fn switch_mode(&mut self, mode: SelectionMode) -> Vec<Effect> {
        self.interaction
            .handle_event(Event::ModeSwitch(mode), &self.document)
    }

    /// Mode switch shortcut fired; disabled by an empty shortcut setting.
    pub fn toggle_mode(&mut self) -> Vec<Effect> {
        if !self.settings.mode_switch_enabled() {
            return Vec::new();
        }
        self.interaction
            .handle_event(Event::ToggleMode, &self.document)
    }

    /// Use the current view scale for the display size of inserted images.
    pub fn pin_image_scale(&mut self) {
        self.view.pin_image_scale();
        debug!("Image scale pinned at {}", self.view.scale);
    }

    pub fn surface_size(&self) -> (u32, u32) {
        self.document
            .page_size()
            .map(|(w, h)| self.view.surface_size(w, h))
            .unwrap_or((0, 0))
    }

    /// Current page at the view scale with the selection overlay on top.
    pub fn render(&mut self) -> Result<Surface, DocError> {
        if !self.document.is_loaded() {
            return Err(DocError::NotLoaded);
        }

        let key = CacheKey::new(self.document.page().page_number, self.view.scale);
        let page = match self.cache.get(&key) {
            Some(page) => page,
            None => {
                let (width, height) = self.surface_size();
                let mut surface = Surface::new(width, height);
                self.document
                    .render_page(&mut surface, (0.0, 0.0), self.view.scale)?;
                self.cache.insert(key, surface)
            }
        };

        let mut surface = (*page).clone();
        draw_selection(
            &mut surface,
            self.interaction.selection(),
            self.view.scale,
            &self.document,
        )?;
        Ok(surface)
    }

    fn dispatch(&mut self, event: Event) -> Result<Vec<Effect>> {
        let effects = self.interaction.handle_event(event, &self.document);
        let mut remaining = Vec::with_capacity(effects.len());
        let mut outcome = Ok(());

        for effect in effects {
            match effect {
                Effect::Commit(selection) => {
                    if let Err(e) = self.commit(&selection) {
                        error!("Commit failed: {e:#}");
                        outcome = Err(e);
                    }
                }
                other => remaining.push(other),
            }
        }

        outcome.map(|()| remaining)
    }

    fn commit(&mut self, selection: &Selection) -> Result<()> {
        match selection.mode {
            SelectionMode::Line | SelectionMode::Text => {
                let Some(text) = selection
                    .text
                    .as_deref()
                    .and_then(|text| edit_text(text, self.settings.collapse_whitespace))
                else {
                    debug!("Nothing to insert");
                    return Ok(());
                };
                info!("Inserting {} character(s) of text", text.chars().count());
                self.sink.insert_text(&text)
            }
            SelectionMode::Image => {
                let limits = ImageLimits::from(&self.settings);
                let now = Local::now();
                for area in &selection.areas {
                    export_area(
                        &self.document,
                        area,
                        &limits,
                        self.view.image_scale,
                        &mut self.sink,
                        &now,
                    )?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::Rect;
    use crate::pdf::types::WHITE;
    use crate::test_utils::{FakeBackend, Inserted, RecordingSink};

    fn viewer() -> Viewer<FakeBackend, RecordingSink> {
        let mut viewer = Viewer::new(RecordingSink::new("/tmp/unused"), Settings::default());
        viewer
            .load(
                PathBuf::from("paper.pdf"),
                FakeBackend::with_pages(3, 600.0, 800.0)
                    .with_line(0, "Hello", Rect::new(10.0, 80.0, 60.0, 100.0))
                    .with_line(1, "Second page", Rect::new(10.0, 80.0, 120.0, 100.0)),
            )
            .unwrap();
        viewer
    }

    #[test]
    fn pointer_positions_are_scaled_to_document() {
        let mut viewer = viewer();
        assert!(viewer.set_zoom(ZoomSetting::Percent(200.0)));

        viewer.pointer_move(60.0, 180.0).unwrap();

        assert_eq!(viewer.selection().text.as_deref(), Some("Hello"));
        assert!(viewer.is_over_selection(60.0, 180.0));
        assert!(!viewer.is_over_selection(30.0, 90.0));
    }

    #[test]
    fn click_on_line_inserts_text() {
        let mut viewer = viewer();
        viewer.pointer_move(30.0, 90.0).unwrap();
        viewer.pointer_down(30.0, 90.0).unwrap();
        let effects = viewer.pointer_up(30.0, 90.0).unwrap();

        assert_eq!(effects, vec![Effect::Redraw]);
        assert_eq!(viewer.sink().texts(), vec!["Hello"]);
        assert!(viewer.selection().is_empty());
    }

    #[test]
    fn page_turn_clears_selection() {
        let mut viewer = viewer();
        viewer.pointer_move(30.0, 90.0).unwrap();

        assert!(viewer.next_page());

        assert!(viewer.selection().is_empty());
        viewer.pointer_move(30.0, 90.0).unwrap();
        assert_eq!(viewer.selection().text.as_deref(), Some("Second page"));
    }

    #[test]
    fn scroll_turns_pages_at_edges() {
        let mut viewer = viewer();
        let top = ScrollPosition {
            at_top: true,
            at_bottom: false,
        };
        let bottom = ScrollPosition {
            at_top: false,
            at_bottom: true,
        };

        assert_eq!(
            viewer.scroll(ScrollDirection::Up, false, top),
            ScrollOutcome::Consumed
        );
        assert_eq!(
            viewer.scroll(ScrollDirection::Down, false, top),
            ScrollOutcome::Ignored
        );
        assert_eq!(
            viewer.scroll(ScrollDirection::Down, false, bottom),
            ScrollOutcome::NextPage
        );
        assert_eq!(viewer.document().page().page_number, 1);
        assert_eq!(
            viewer.scroll(ScrollDirection::Up, false, top),
            ScrollOutcome::PreviousPage
        );
        assert_eq!(viewer.document().page().page_number, 0);
    }

    #[test]
    fn scroll_with_modifier_zooms() {
        let mut viewer = viewer();
        viewer.set_zoom(ZoomSetting::Percent(100.0));

        assert_eq!(
            viewer.scroll(ScrollDirection::Up, true, ScrollPosition::default()),
            ScrollOutcome::Zoomed(120.0)
        );
        assert_eq!(viewer.surface_size(), (720, 960));
    }

    #[test]
    fn fit_to_width_follows_resize() {
        let mut viewer = viewer();
        assert!(viewer.resize(300.0));
        assert_eq!(viewer.view().scale, 0.5);
        assert_eq!(viewer.surface_size(), (300, 400));
        assert!(!viewer.resize(300.0));
    }

    #[test]
    fn viewport_changes_drop_held_selection() {
        let mut viewer = viewer();
        assert!(viewer.resize(1200.0));
        viewer.pointer_move(60.0, 180.0).unwrap();
        assert!(!viewer.selection().is_empty());

        // Fit-to-width rescales on resize
        assert!(viewer.resize(300.0));
        assert!(viewer.selection().is_empty());

        viewer.pointer_move(15.0, 45.0).unwrap();
        assert_eq!(viewer.selection().text.as_deref(), Some("Hello"));
        assert_eq!(
            viewer.scroll(ScrollDirection::Up, true, ScrollPosition::default()),
            ScrollOutcome::Zoomed(70.0)
        );
        assert!(viewer.selection().is_empty());
    }

    #[test]
    fn resize_under_explicit_zoom_still_clears() {
        let mut viewer = viewer();
        viewer.set_zoom(ZoomSetting::Percent(100.0));
        viewer.pointer_move(30.0, 90.0).unwrap();
        assert!(!viewer.selection().is_empty());

        assert!(!viewer.resize(900.0));

        assert_eq!(viewer.view().scale, 1.0);
        assert!(viewer.selection().is_empty());
        // Same width again is not a viewport change
        viewer.pointer_move(30.0, 90.0).unwrap();
        assert!(!viewer.resize(900.0));
        assert!(!viewer.selection().is_empty());
    }

    #[test]
    fn disabled_shortcut_does_not_toggle() {
        let settings = Settings {
            switch_mode_shortcut: String::new(),
            ..Settings::default()
        };
        let mut viewer: Viewer<FakeBackend, _> =
            Viewer::new(RecordingSink::new("/tmp/unused"), settings);

        assert!(viewer.toggle_mode().is_empty());
        assert_eq!(viewer.interaction().mode(), SelectionMode::Line);

        let effects = viewer.switch_mode(SelectionMode::Image);
        assert_eq!(effects, vec![Effect::Redraw]);
        assert_eq!(viewer.interaction().mode(), SelectionMode::Image);
    }

    #[test]
    fn render_overlays_selection_on_cached_page() {
        let mut viewer = viewer();
        viewer.set_zoom(ZoomSetting::Percent(100.0));

        let plain = viewer.render().unwrap();
        assert_eq!(plain.dimensions(), (600, 800));
        assert_eq!(*plain.get_pixel(30, 90), WHITE);

        viewer.pointer_move(30.0, 90.0).unwrap();
        let highlighted = viewer.render().unwrap();
        assert_ne!(*highlighted.get_pixel(30, 90), WHITE);

        // The cached raster underneath stays clean
        viewer.pointer_down(500.0, 500.0).unwrap();
        viewer.pointer_up(500.0, 500.0).unwrap();
        assert_eq!(*viewer.render().unwrap().get_pixel(30, 90), WHITE);
    }

    #[test]
    fn image_commit_uses_pinned_scale() {
        let dir = tempfile::tempdir().unwrap();
        let mut viewer = Viewer::new(RecordingSink::new(dir.path()), Settings::default());
        viewer
            .load(PathBuf::from("paper.pdf"), FakeBackend::single_page(600.0, 800.0))
            .unwrap();
        viewer.set_zoom(ZoomSetting::Percent(50.0));
        viewer.pin_image_scale();
        viewer.switch_mode(SelectionMode::Image);

        // Drag (100,100)-(300,200) in document units at 50%
        viewer.pointer_down(50.0, 50.0).unwrap();
        viewer.pointer_move(150.0, 100.0).unwrap();
        viewer.pointer_up(150.0, 100.0).unwrap();
        assert_eq!(
            viewer.selection().areas,
            vec![Rect::new(100.0, 100.0, 300.0, 200.0)]
        );

        viewer.pointer_down(100.0, 75.0).unwrap();
        viewer.pointer_up(100.0, 75.0).unwrap();

        match viewer.sink().inserted.as_slice() {
            [
                Inserted::Image {
                    path,
                    width,
                    height,
                },
                Inserted::Text(newline),
            ] => {
                assert!(path.exists());
                assert_eq!((*width, *height), (100, 50));
                assert_eq!(newline, "\n");
            }
            other => panic!("unexpected insertions {other:?}"),
        }
        assert!(viewer.selection().is_empty());
        assert_eq!(viewer.interaction().mode(), SelectionMode::Image);
    }

    #[test]
    fn failed_commit_still_clears_selection() {
        let dir = tempfile::tempdir().unwrap();
        // A file where the attachment directory should be
        let blocker = dir.path().join("attachments");
        std::fs::write(&blocker, b"").unwrap();

        let mut viewer = Viewer::new(RecordingSink::new(&blocker), Settings::default());
        viewer
            .load(PathBuf::from("paper.pdf"), FakeBackend::single_page(600.0, 800.0))
            .unwrap();
        viewer.set_zoom(ZoomSetting::Percent(100.0));
        viewer.switch_mode(SelectionMode::Image);
        viewer.pointer_down(10.0, 10.0).unwrap();
        viewer.pointer_move(50.0, 50.0).unwrap();
        viewer.pointer_up(50.0, 50.0).unwrap();

        viewer.pointer_down(20.0, 20.0).unwrap();
        assert!(viewer.pointer_up(20.0, 20.0).is_err());

        assert!(viewer.selection().is_empty());
        assert!(viewer.sink().inserted.is_empty());
    }
}
