//! Grid layout engine: cell placement, user repositioning and rendered content.

use crate::config::GridConfig;
use crate::registry::{RegistryEvent, WidgetRegistry};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use voxgrid_synth::{CompiledWidget, PropertyBag, RenderNode, WidgetId};

/// Rectangular grid region owned by exactly one widget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutCell {
    pub widget_id: WidgetId,
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
}

/// Row extent of an unbounded grid (`max_rows == 0`).
pub const MAX_GRID_ROWS: i64 = i32::MAX as i64;

impl LayoutCell {
    /// First row below the cell.
    pub fn bottom(&self) -> i64 {
        self.y.saturating_add(self.height)
    }

    fn overlaps(&self, other: &LayoutCell) -> bool {
        self.x < other.x.saturating_add(other.width)
            && other.x < self.x.saturating_add(self.width)
            && self.y < other.bottom()
            && other.y < self.bottom()
    }
}

/// Pixel rectangle relative to the grid container's top-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelRect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

struct CellState {
    cell: LayoutCell,
    content: RenderNode,
}

pub struct GridLayoutEngine {
    config: GridConfig,
    cells: IndexMap<WidgetId, CellState>,
    alive: bool,
}

impl GridLayoutEngine {
    pub fn create(config: GridConfig) -> Self {
        debug!(
            target: "voxgrid::layout",
            columns = config.columns,
            cell_height = config.cell_height,
            float = config.float,
            "grid created"
        );
        Self {
            config,
            cells: IndexMap::new(),
            alive: true,
        }
    }

    /// Tear down every cell. Later events are ignored.
    pub fn destroy(&mut self) {
        let count = self.cells.len();
        self.cells.clear();
        self.alive = false;
        info!(target: "voxgrid::layout", cells = count, "grid destroyed");
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    /// Place a new widget (or keep a replaced widget's cell) and render it.
    pub fn on_widget_added(
        &mut self,
        id: &WidgetId,
        index: usize,
        compiled: &CompiledWidget,
        properties: &PropertyBag,
    ) -> Option<LayoutCell> {
        if !self.alive {
            return None;
        }
        let content = compiled.invoke(properties);
        if let Some(state) = self.cells.get_mut(id) {
            state.content = content;
            debug!(target: "voxgrid::layout", widget_id = %id, "cell content replaced");
            return Some(state.cell.clone());
        }

        let mut cell = self.initial_placement(id, index);
        if !self.config.float {
            self.drop_to_free_row(&mut cell);
        }
        debug!(
            target: "voxgrid::layout",
            widget_id = %id,
            index,
            x = cell.x,
            y = cell.y,
            w = cell.width,
            h = cell.height,
            "cell placed"
        );
        self.cells.insert(
            id.clone(),
            CellState {
                cell: cell.clone(),
                content,
            },
        );
        Some(cell)
    }

    /// Delete the widget's cell. Idempotent.
    pub fn on_widget_removed(&mut self, id: &WidgetId) -> bool {
        if !self.alive {
            return false;
        }
        let removed = self.cells.shift_remove(id).is_some();
        if removed {
            debug!(target: "voxgrid::layout", widget_id = %id, "cell removed");
        }
        removed
    }

    /// Re-render after a property change; position is untouched.
    pub fn rerender(&mut self, id: &WidgetId, compiled: &CompiledWidget, properties: &PropertyBag) -> bool {
        if !self.alive {
            return false;
        }
        match self.cells.get_mut(id) {
            Some(state) => {
                state.content = compiled.invoke(properties);
                true
            }
            None => false,
        }
    }

    /// Apply a drag or resize. Values are clamped into the grid; unknown ids
    /// are ignored.
    pub fn on_user_reposition(
        &mut self,
        id: &WidgetId,
        x: i64,
        y: i64,
        width: i64,
        height: i64,
    ) -> Option<LayoutCell> {
        if !self.alive || !self.cells.contains_key(id) {
            return None;
        }
        let cell = self.clamp(LayoutCell {
            widget_id: id.clone(),
            x,
            y,
            width,
            height,
        });
        if let Some(state) = self.cells.get_mut(id) {
            state.cell = cell.clone();
        }
        if !self.config.float {
            self.push_down_from(id);
        }
        debug!(
            target: "voxgrid::layout",
            widget_id = %id,
            x = cell.x,
            y = cell.y,
            w = cell.width,
            h = cell.height,
            "cell repositioned"
        );
        self.cell(id).cloned()
    }

    /// Apply all pending registry events.
    pub fn sync(&mut self, registry: &mut WidgetRegistry) {
        for event in registry.drain_events() {
            match event {
                RegistryEvent::Inserted { id, .. } => {
                    let index = registry.index_of(&id).unwrap_or(registry.len());
                    if let Some((compiled, props)) = registry.get(&id) {
                        self.on_widget_added(&id, index, compiled, props);
                    }
                }
                RegistryEvent::Removed { id } => {
                    self.on_widget_removed(&id);
                }
                RegistryEvent::PropertiesChanged { id } => {
                    if let Some((compiled, props)) = registry.get(&id) {
                        self.rerender(&id, compiled, props);
                    }
                }
            }
        }
    }

    pub fn cell(&self, id: &WidgetId) -> Option<&LayoutCell> {
        self.cells.get(id).map(|s| &s.cell)
    }

    pub fn cells(&self) -> impl Iterator<Item = &LayoutCell> + '_ {
        self.cells.values().map(|s| &s.cell)
    }

    pub fn render_content(&self, id: &WidgetId) -> Option<&RenderNode> {
        self.cells.get(id).map(|s| &s.content)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Number of occupied rows.
    pub fn row_count(&self) -> i64 {
        self.cells().map(LayoutCell::bottom).max().unwrap_or(0)
    }

    // -------------------------------------------------------------------------
    // Geometry
    // -------------------------------------------------------------------------

    fn column_width(&self, container_width: f32) -> f32 {
        container_width / self.config.columns.max(1) as f32
    }

    pub fn pixel_rect(&self, cell: &LayoutCell, container_width: f32) -> PixelRect {
        let col = self.column_width(container_width);
        let row = self.config.cell_height;
        let half = self.config.margin / 2.0;
        PixelRect {
            left: cell.x as f32 * col + half,
            top: cell.y as f32 * row + half,
            width: (cell.width as f32 * col - self.config.margin).max(1.0),
            height: (cell.height as f32 * row - self.config.margin).max(1.0),
        }
    }

    /// Inverse of [`Self::pixel_rect`], snapped to whole grid units and clamped.
    pub fn grid_from_pixels(&self, rect: PixelRect, container_width: f32) -> (i64, i64, i64, i64) {
        let col = self.column_width(container_width);
        let row = self.config.cell_height;
        let half = self.config.margin / 2.0;
        let x = ((rect.left - half) / col).round() as i64;
        let y = ((rect.top - half) / row).round() as i64;
        let w = ((rect.width + self.config.margin) / col).round() as i64;
        let h = ((rect.height + self.config.margin) / row).round() as i64;
        let clamped = self.clamp(LayoutCell {
            widget_id: WidgetId::from(""),
            x,
            y,
            width: w,
            height: h,
        });
        (clamped.x, clamped.y, clamped.width, clamped.height)
    }

    pub fn content_height(&self) -> f32 {
        self.row_count() as f32 * self.config.cell_height
    }

    // -------------------------------------------------------------------------
    // Placement
    // -------------------------------------------------------------------------

    fn initial_placement(&self, id: &WidgetId, index: usize) -> LayoutCell {
        let per_row = self.config.slots_per_row.max(1);
        let n = index as i64;
        self.clamp(LayoutCell {
            widget_id: id.clone(),
            x: (n % per_row) * self.config.default_width,
            y: (n / per_row) * self.config.default_height,
            width: self.config.default_width,
            height: self.config.default_height,
        })
    }

    /// Row extent cells must stay within.
    fn row_limit(&self) -> i64 {
        if self.config.max_rows > 0 {
            self.config.max_rows.min(MAX_GRID_ROWS)
        } else {
            MAX_GRID_ROWS
        }
    }

    fn clamp(&self, mut cell: LayoutCell) -> LayoutCell {
        let columns = self.config.columns.max(1);
        cell.width = cell.width.clamp(1, columns);
        cell.x = cell.x.clamp(0, columns - cell.width);
        let rows = self.row_limit();
        cell.height = cell.height.clamp(1, rows);
        cell.y = cell.y.clamp(0, rows - cell.height);
        cell
    }

    /// Move `cell` down to the first row where it no longer collides. Every
    /// row above the nearest blocker's bottom still overlaps that blocker.
    /// When no free row fits inside the grid the cell keeps its wanted row and
    /// overlaps, as in float mode.
    fn drop_to_free_row(&self, cell: &mut LayoutCell) {
        let wanted = cell.y;
        let limit = self.row_limit();
        while let Some(bottom) = self
            .cells
            .values()
            .filter(|s| s.cell.widget_id != cell.widget_id && s.cell.overlaps(cell))
            .map(|s| s.cell.bottom())
            .min()
        {
            if bottom.saturating_add(cell.height) > limit {
                debug!(
                    target: "voxgrid::layout",
                    widget_id = %cell.widget_id,
                    limit,
                    "no free row left, overlapping"
                );
                cell.y = wanted;
                return;
            }
            cell.y = bottom;
        }
    }

    /// Move cells colliding with `anchor` below it, cascading until stable.
    /// A cell that would be pushed past the last row stays put and overlaps.
    fn push_down_from(&mut self, anchor: &WidgetId) {
        let limit = self.row_limit();
        let mut queue = vec![anchor.clone()];
        while let Some(mover_id) = queue.pop() {
            let Some(mover) = self.cell(&mover_id).cloned() else {
                continue;
            };
            let hit: Vec<WidgetId> = self
                .cells
                .values()
                .filter(|s| s.cell.widget_id != mover_id && s.cell.overlaps(&mover))
                .map(|s| s.cell.widget_id.clone())
                .collect();
            for id in hit {
                let Some(state) = self.cells.get_mut(&id) else {
                    continue;
                };
                if mover.bottom().saturating_add(state.cell.height) > limit {
                    continue;
                }
                state.cell.y = mover.bottom();
                queue.push(id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use voxgrid_synth::SnippetCompiler;

    fn compiled(id: &str) -> CompiledWidget {
        SnippetCompiler::default()
            .compile_with_id(id.into(), "const CellWidget = ({ label = 'cell' }) => label")
            .unwrap()
    }

    fn engine(float: bool) -> GridLayoutEngine {
        GridLayoutEngine::create(GridConfig {
            float,
            ..GridConfig::default()
        })
    }

    #[test]
    fn placement_is_row_major_three_per_row() {
        let mut grid = engine(true);
        let expected = [(0, 0), (4, 0), (8, 0), (0, 4), (4, 4), (8, 4)];
        for (i, (x, y)) in expected.iter().enumerate() {
            let id = WidgetId::from(format!("W{}", i));
            let cell = grid
                .on_widget_added(&id, i, &compiled(id.as_str()), &PropertyBag::new())
                .unwrap();
            assert_eq!((cell.x, cell.y, cell.width, cell.height), (*x, *y, 4, 4));
        }
        assert_eq!(grid.len(), 6);
        assert_eq!(grid.row_count(), 8);
    }

    #[test]
    fn replacement_keeps_position_and_rerenders() {
        let mut grid = engine(true);
        let id = WidgetId::from("w");
        grid.on_widget_added(&id, 0, &compiled("w"), &PropertyBag::new());
        grid.on_user_reposition(&id, 6, 3, 2, 2);

        let mut props = PropertyBag::new();
        props.insert("label".into(), "fresh".into());
        let cell = grid.on_widget_added(&id, 0, &compiled("w"), &props).unwrap();
        assert_eq!((cell.x, cell.y), (6, 3));
        assert_eq!(grid.render_content(&id), Some(&RenderNode::text("fresh")));
    }

    #[test]
    fn removal_is_idempotent() {
        let mut grid = engine(true);
        let id = WidgetId::from("w");
        grid.on_widget_added(&id, 0, &compiled("w"), &PropertyBag::new());
        assert!(grid.on_widget_removed(&id));
        assert!(!grid.on_widget_removed(&id));
        assert!(grid.render_content(&id).is_none());
    }

    #[test]
    fn reposition_clamps_out_of_range() {
        let mut grid = engine(true);
        let id = WidgetId::from("w");
        grid.on_widget_added(&id, 0, &compiled("w"), &PropertyBag::new());
        let cell = grid.on_user_reposition(&id, -3, -1, 40, 0).unwrap();
        assert_eq!((cell.x, cell.y, cell.width, cell.height), (0, 0, 12, 1));
        let cell = grid.on_user_reposition(&id, 11, 2, 3, 2).unwrap();
        assert_eq!((cell.x, cell.width), (9, 3));
        assert!(grid.on_user_reposition(&"ghost".into(), 0, 0, 1, 1).is_none());
    }

    #[test]
    fn huge_coordinates_stay_on_a_finite_grid() {
        let mut grid = engine(true);
        let id = WidgetId::from("w");
        grid.on_widget_added(&id, 0, &compiled("w"), &PropertyBag::new());
        let cell = grid.on_user_reposition(&id, i64::MAX, i64::MAX, 4, 4).unwrap();
        assert_eq!((cell.x, cell.y), (8, MAX_GRID_ROWS - 4));
        assert_eq!(grid.row_count(), MAX_GRID_ROWS);
        assert!(grid.content_height().is_finite());

        let cell = grid.on_user_reposition(&id, 0, 0, 4, i64::MAX).unwrap();
        assert_eq!(cell.height, MAX_GRID_ROWS);
        assert_eq!(cell.bottom(), MAX_GRID_ROWS);
    }

    #[test]
    fn packed_mode_handles_a_full_height_cell() {
        let mut grid = engine(false);
        let tall = WidgetId::from("tall");
        let next = WidgetId::from("next");
        grid.on_widget_added(&tall, 0, &compiled("tall"), &PropertyBag::new());
        grid.on_user_reposition(&tall, 0, 0, 4, i64::MAX);
        // no row left below the blocker, so it overlaps at its wanted row
        let cell = grid.on_widget_added(&next, 0, &compiled("next"), &PropertyBag::new()).unwrap();
        assert_eq!(cell.y, 0);

        grid.on_user_reposition(&next, 0, i64::MAX, 4, 4);
        assert_eq!(grid.cell(&tall).unwrap().y, 0);
        assert_eq!(grid.row_count(), MAX_GRID_ROWS);
    }

    fn bounded_packed(max_rows: i64) -> GridLayoutEngine {
        GridLayoutEngine::create(GridConfig {
            float: false,
            max_rows,
            ..GridConfig::default()
        })
    }

    #[test]
    fn packed_mode_keeps_new_cells_inside_bounded_rows() {
        let mut grid = bounded_packed(8);
        let a = WidgetId::from("a");
        let b = WidgetId::from("b");
        let c = WidgetId::from("c");
        grid.on_widget_added(&a, 0, &compiled("a"), &PropertyBag::new());
        grid.on_widget_added(&b, 3, &compiled("b"), &PropertyBag::new());
        // below b would be rows 8..12, past the last row
        let cell = grid.on_widget_added(&c, 0, &compiled("c"), &PropertyBag::new()).unwrap();
        assert_eq!((cell.x, cell.y), (0, 0));
        assert_eq!(grid.row_count(), 8);
    }

    #[test]
    fn packed_mode_push_down_stops_at_last_row() {
        let mut grid = bounded_packed(8);
        let a = WidgetId::from("a");
        let b = WidgetId::from("b");
        grid.on_widget_added(&a, 0, &compiled("a"), &PropertyBag::new());
        grid.on_widget_added(&b, 3, &compiled("b"), &PropertyBag::new());

        grid.on_user_reposition(&a, 0, 4, 4, 4);
        assert_eq!(grid.cell(&b).unwrap().y, 4);
        assert!(grid.cells().all(|c| c.bottom() <= 8));

        // a push that still fits moves b down to the bottom edge
        grid.on_user_reposition(&b, 0, 4, 4, 2);
        grid.on_user_reposition(&a, 0, 2, 4, 4);
        assert_eq!(grid.cell(&b).unwrap().y, 6);
        assert_eq!(grid.row_count(), 8);
    }

    #[test]
    fn packed_mode_rearranging_never_grows_past_bounded_rows() {
        let mut grid = bounded_packed(20);
        let ids: Vec<WidgetId> = (0..12).map(|i| WidgetId::from(format!("w{}", i))).collect();
        for (i, id) in ids.iter().enumerate() {
            grid.on_widget_added(id, i, &compiled(id.as_str()), &PropertyBag::new());
        }
        // deterministic pseudo-random drags and resizes
        let mut seed: i64 = 17;
        let mut next = |modulo: i64| {
            seed = (seed * 1_103_515_245 + 12_345) % 2_147_483_648;
            seed % modulo
        };
        for _ in 0..2000 {
            let id = ids[next(12) as usize].clone();
            let (x, y, w, h) = (next(14) - 1, next(26) - 2, next(7), next(7));
            grid.on_user_reposition(&id, x, y, w, h);
            assert!(grid.row_count() <= 20);
        }
        assert_eq!(grid.len(), 12);
    }

    #[test]
    fn float_mode_allows_overlap() {
        let mut grid = engine(true);
        let a = WidgetId::from("a");
        let b = WidgetId::from("b");
        grid.on_widget_added(&a, 0, &compiled("a"), &PropertyBag::new());
        grid.on_widget_added(&b, 1, &compiled("b"), &PropertyBag::new());
        grid.on_user_reposition(&b, 0, 0, 4, 4);
        assert_eq!(grid.cell(&a).unwrap().y, 0);
        assert_eq!(grid.cell(&b).unwrap().x, 0);
    }

    #[test]
    fn packed_mode_pushes_collisions_down() {
        let mut grid = engine(false);
        let a = WidgetId::from("a");
        let b = WidgetId::from("b");
        let c = WidgetId::from("c");
        grid.on_widget_added(&a, 0, &compiled("a"), &PropertyBag::new());
        grid.on_widget_added(&b, 3, &compiled("b"), &PropertyBag::new());
        grid.on_widget_added(&c, 0, &compiled("c"), &PropertyBag::new());
        // c wanted (0,0) but a is there and b sits at (0,4)
        assert_eq!(grid.cell(&c).unwrap().y, 8);

        grid.on_user_reposition(&c, 0, 0, 4, 4);
        assert_eq!(grid.cell(&a).unwrap().y, 4);
        assert_eq!(grid.cell(&b).unwrap().y, 8);
    }

    #[test]
    fn pixel_conversion_round_trips() {
        let grid = engine(true);
        let cell = LayoutCell {
            widget_id: "w".into(),
            x: 4,
            y: 2,
            width: 4,
            height: 3,
        };
        let rect = grid.pixel_rect(&cell, 1200.0);
        assert_eq!(rect.left, 405.0);
        assert_eq!(rect.top, 165.0);
        assert_eq!(rect.width, 390.0);
        assert_eq!(rect.height, 230.0);
        assert_eq!(grid.grid_from_pixels(rect, 1200.0), (4, 2, 4, 3));
    }

    #[test]
    fn destroyed_engine_ignores_events() {
        let mut grid = engine(true);
        let id = WidgetId::from("w");
        grid.on_widget_added(&id, 0, &compiled("w"), &PropertyBag::new());
        grid.destroy();
        assert!(grid.is_empty());
        assert!(grid
            .on_widget_added(&id, 0, &compiled("w"), &PropertyBag::new())
            .is_none());
        assert!(grid.on_user_reposition(&id, 0, 0, 1, 1).is_none());
    }

    #[test]
    fn failing_content_does_not_block_other_cells() {
        let mut grid = engine(true);
        let bad = SnippetCompiler::default()
            .compile_with_id("bad".into(), "const BadWidget = () => { throw new Error('x') }")
            .unwrap();
        grid.on_widget_added(&"bad".into(), 0, &bad, &PropertyBag::new());
        grid.on_widget_added(&"ok".into(), 1, &compiled("ok"), &PropertyBag::new());
        assert!(grid.render_content(&"bad".into()).unwrap().is_error());
        assert_eq!(grid.render_content(&"ok".into()), Some(&RenderNode::text("cell")));
        assert!(grid.on_user_reposition(&"bad".into(), 6, 6, 2, 2).is_some());
    }
}
