//! Grid canvas: draws every cell at its pixel rect and turns pointer gestures
//! into layout actions. Drag the title strip to move, the corner to resize.

use crate::render::render_node;
use egui::{vec2, Color32, CursorIcon, Id, Rect, RichText, Rounding, Sense, Stroke, Ui, UiBuilder};
use voxgrid_core::{Dashboard, LayoutCell, PixelRect, WidgetId};

const TITLE_HEIGHT: f32 = 26.0;
const HANDLE_SIZE: f32 = 14.0;
const MIN_CELL_PX: f32 = 40.0;

pub enum GridAction {
    Remove(WidgetId),
    Reposition {
        id: WidgetId,
        x: i64,
        y: i64,
        width: i64,
        height: i64,
    },
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum DragMode {
    Move,
    Resize,
}

struct DragDraft {
    id: WidgetId,
    mode: DragMode,
    /// Canvas-relative rect being dragged.
    rect: Rect,
}

#[derive(Default)]
pub struct GridView {
    drag: Option<DragDraft>,
}

impl GridView {
    pub fn show(&mut self, ui: &mut Ui, dashboard: &Dashboard) -> Vec<GridAction> {
        let mut actions = Vec::new();
        let layout = dashboard.layout();
        if layout.is_empty() {
            empty_state(ui);
            return actions;
        }

        let width = ui.available_width().max(320.0);
        let cell_height = layout.config().cell_height;
        let mut height = layout.content_height() + cell_height * 2.0;
        if let Some(draft) = &self.drag {
            height = height.max(draft.rect.max.y + cell_height);
        }
        let (canvas, _) = ui.allocate_exact_size(vec2(width, height), Sense::hover());
        ui.painter().rect_filled(canvas, Rounding::same(6.0), ui.visuals().extreme_bg_color);

        let mut cells: Vec<LayoutCell> = layout.cells().cloned().collect();
        if let Some(draft) = &self.drag {
            // dragged cell on top
            cells.sort_by_key(|c| c.widget_id == draft.id);
        }

        for cell in &cells {
            let base = layout.pixel_rect(cell, width);
            let mut local = Rect::from_min_size(
                egui::pos2(base.left, base.top),
                vec2(base.width, base.height),
            );
            if let Some(draft) = self.drag.as_ref().filter(|d| d.id == cell.widget_id) {
                local = draft.rect;
            }
            let rect = local.translate(canvas.min.to_vec2());
            let title = dashboard
                .registry()
                .get(&cell.widget_id)
                .map(|(compiled, _)| compiled.entry_point().to_string())
                .unwrap_or_default();

            self.draw_cell(ui, rect, &title, cell, dashboard);

            // Title strip: move.
            let title_rect = Rect::from_min_size(rect.min, vec2(rect.width() - TITLE_HEIGHT, TITLE_HEIGHT));
            let title_resp = ui
                .interact(title_rect, Id::new(("voxgrid_cell_move", cell.widget_id.as_str())), Sense::drag())
                .on_hover_cursor(CursorIcon::Grab);
            self.track(&title_resp, DragMode::Move, cell, local);

            // Corner handle: resize.
            let handle_rect = Rect::from_min_size(
                rect.max - vec2(HANDLE_SIZE, HANDLE_SIZE),
                vec2(HANDLE_SIZE, HANDLE_SIZE),
            );
            let handle_resp = ui
                .interact(handle_rect, Id::new(("voxgrid_cell_resize", cell.widget_id.as_str())), Sense::drag())
                .on_hover_cursor(CursorIcon::ResizeNwSe);
            self.track(&handle_resp, DragMode::Resize, cell, local);

            if title_resp.drag_stopped() || handle_resp.drag_stopped() {
                if let Some(draft) = self.drag.take() {
                    let (x, y, w, h) = layout.grid_from_pixels(
                        PixelRect {
                            left: draft.rect.min.x,
                            top: draft.rect.min.y,
                            width: draft.rect.width(),
                            height: draft.rect.height(),
                        },
                        width,
                    );
                    actions.push(GridAction::Reposition {
                        id: draft.id,
                        x,
                        y,
                        width: w,
                        height: h,
                    });
                }
            }

            // Close button.
            let close_rect = Rect::from_min_size(
                egui::pos2(rect.max.x - TITLE_HEIGHT, rect.min.y),
                vec2(TITLE_HEIGHT, TITLE_HEIGHT),
            );
            let close = ui
                .put(close_rect, egui::Button::new("×").frame(false))
                .on_hover_text("Remove widget");
            if close.clicked() {
                actions.push(GridAction::Remove(cell.widget_id.clone()));
            }
        }
        actions
    }

    fn track(&mut self, resp: &egui::Response, mode: DragMode, cell: &LayoutCell, current: Rect) {
        if !resp.dragged() {
            return;
        }
        let delta = resp.drag_delta();
        let continuing = matches!(&self.drag, Some(d) if d.id == cell.widget_id && d.mode == mode);
        if !continuing {
            self.drag = Some(DragDraft {
                id: cell.widget_id.clone(),
                mode,
                rect: current,
            });
        }
        let Some(draft) = self.drag.as_mut() else {
            return;
        };
        match mode {
            DragMode::Move => {
                draft.rect = draft.rect.translate(delta);
                if draft.rect.min.x < 0.0 || draft.rect.min.y < 0.0 {
                    let shift = vec2((-draft.rect.min.x).max(0.0), (-draft.rect.min.y).max(0.0));
                    draft.rect = draft.rect.translate(shift);
                }
            }
            DragMode::Resize => {
                let size = (draft.rect.size() + delta).max(vec2(MIN_CELL_PX, MIN_CELL_PX));
                draft.rect = Rect::from_min_size(draft.rect.min, size);
            }
        }
    }

    fn draw_cell(&self, ui: &mut Ui, rect: Rect, title: &str, cell: &LayoutCell, dashboard: &Dashboard) {
        let visuals = ui.visuals();
        let dragging = self.drag.as_ref().is_some_and(|d| d.id == cell.widget_id);
        let stroke = if dragging {
            Stroke::new(2.0, visuals.selection.stroke.color)
        } else {
            Stroke::new(1.0, visuals.widgets.noninteractive.bg_stroke.color)
        };
        ui.painter()
            .rect(rect, Rounding::same(8.0), visuals.panel_fill, stroke);

        let title_rect = Rect::from_min_size(rect.min, vec2(rect.width(), TITLE_HEIGHT));
        ui.painter().rect_filled(
            title_rect,
            Rounding { nw: 8.0, ne: 8.0, sw: 0.0, se: 0.0 },
            visuals.faint_bg_color,
        );
        ui.painter().text(
            title_rect.left_center() + vec2(10.0, 0.0),
            egui::Align2::LEFT_CENTER,
            title,
            egui::FontId::proportional(13.0),
            visuals.weak_text_color(),
        );

        let grip = rect.max - vec2(4.0, 4.0);
        for i in 1..=3 {
            let o = i as f32 * 3.5;
            ui.painter().line_segment(
                [grip - vec2(o, 0.0), grip - vec2(0.0, o)],
                Stroke::new(1.0, visuals.weak_text_color()),
            );
        }

        let content_rect = Rect::from_min_max(
            rect.min + vec2(10.0, TITLE_HEIGHT + 6.0),
            rect.max - vec2(10.0, 10.0),
        );
        if content_rect.width() <= 0.0 || content_rect.height() <= 0.0 {
            return;
        }
        let mut child = ui.new_child(UiBuilder::new().max_rect(content_rect));
        child.set_clip_rect(content_rect.intersect(ui.clip_rect()));
        match dashboard.layout().render_content(&cell.widget_id) {
            Some(node) => render_node(&mut child, node),
            None => {
                child.label(RichText::new("Loading...").weak());
            }
        }
    }
}

fn empty_state(ui: &mut Ui) {
    ui.vertical_centered(|ui| {
        ui.add_space(48.0);
        ui.label(RichText::new("🎤").size(32.0).color(Color32::GRAY));
        ui.add_space(12.0);
        ui.label(RichText::new("Your dashboard is empty").size(20.0).strong());
        ui.add_space(6.0);
        ui.label(
            RichText::new(
                "Tap the microphone button above and say \"weather\", \"stock price\", \"calendar\", or \"to-do\" to create widgets.",
            )
            .weak(),
        );
        ui.label(
            RichText::new("Or click the \"Display Widget\" button to add the latest widget from your workflow.")
                .weak(),
        );
    });
}
