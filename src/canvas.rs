use image::Rgb;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::components::history::{PaintAction, PaintStep};
use crate::layer_store::{
    AdditiveLayerStore, DEFAULT_STORE_CAPACITY, LayerStore, SequenceLayerStore, SetLayerStore,
};
use crate::layers::{Color, Layer};
use crate::log_warn;

// ============================================================================
// DRAW STYLE
// ============================================================================

/// Composition policy shared by every cell of a grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DrawStyle {
    #[default]
    Set,
    Additive,
    Sequence,
}

impl DrawStyle {
    pub fn all() -> &'static [DrawStyle] {
        &[DrawStyle::Set, DrawStyle::Additive, DrawStyle::Sequence]
    }

    pub fn name(&self) -> &'static str {
        match self {
            DrawStyle::Set => "set",
            DrawStyle::Additive => "additive",
            DrawStyle::Sequence => "sequence",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "set" => Some(DrawStyle::Set),
            "add" | "additive" => Some(DrawStyle::Additive),
            "seq" | "sequence" => Some(DrawStyle::Sequence),
            _ => None,
        }
    }

    /// Construct an empty store of this style.
    pub fn new_store(&self, capacity: usize) -> Box<dyn LayerStore> {
        match self {
            DrawStyle::Set => Box::new(SetLayerStore::new()),
            DrawStyle::Additive => Box::new(AdditiveLayerStore::new(capacity)),
            DrawStyle::Sequence => Box::new(SequenceLayerStore::new(capacity)),
        }
    }
}

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Brush size bounds. Size is a Manhattan radius in cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BrushConfig {
    pub default_size: usize,
    pub min_size: usize,
    pub max_size: usize,
}

impl Default for BrushConfig {
    fn default() -> Self {
        Self {
            default_size: 2,
            min_size: 0,
            max_size: 5,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridConfig {
    pub style: DrawStyle,
    pub width: usize,
    pub height: usize,
    pub brush: BrushConfig,
    /// Per-cell capacity for the additive and sequence stores.
    pub store_capacity: usize,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            style: DrawStyle::Set,
            width: 16,
            height: 16,
            brush: BrushConfig::default(),
            store_capacity: DEFAULT_STORE_CAPACITY,
        }
    }
}

/// Largest number of cells a grid may hold.
pub const MAX_GRID_CELLS: usize = 1 << 20;

impl GridConfig {
    pub fn new(style: DrawStyle, width: usize, height: usize) -> Self {
        Self {
            style,
            width,
            height,
            ..Default::default()
        }
    }

    /// `width * height`, or why this shape can't back a grid.
    pub fn cell_count(&self) -> Result<usize, String> {
        match self.width.checked_mul(self.height) {
            Some(0) => Err(format!("grid must not be empty, got {}×{}", self.width, self.height)),
            Some(n) if n <= MAX_GRID_CELLS => Ok(n),
            _ => Err(format!(
                "grid {}×{} exceeds the limit of {} cells",
                self.width, self.height, MAX_GRID_CELLS
            )),
        }
    }
}

// ============================================================================
// GRID
// ============================================================================

/// 2-D array of layer stores, one per cell, all of the same style.
///
/// Cells are stored row-major (`y * width + x`).
pub struct Grid {
    config: GridConfig,
    brush_size: usize,
    cells: Vec<Box<dyn LayerStore>>,
}

impl Grid {
    /// # Panics
    ///
    /// If `width * height` overflows or exceeds [`MAX_GRID_CELLS`]. Shapes
    /// from files or user input go through [`GridConfig::cell_count`] first.
    pub fn new(config: GridConfig) -> Self {
        let total = match config.width.checked_mul(config.height) {
            Some(n) if n <= MAX_GRID_CELLS => n,
            _ => panic!(
                "grid size {}×{} exceeds {} cells",
                config.width, config.height, MAX_GRID_CELLS
            ),
        };
        let cells = (0..total)
            .map(|_| config.style.new_store(config.store_capacity))
            .collect();
        let brush_size = config
            .brush
            .default_size
            .clamp(config.brush.min_size, config.brush.max_size.max(config.brush.min_size));
        Self {
            config,
            brush_size,
            cells,
        }
    }

    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    pub fn style(&self) -> DrawStyle {
        self.config.style
    }

    pub fn width(&self) -> usize {
        self.config.width
    }

    pub fn height(&self) -> usize {
        self.config.height
    }

    pub fn brush_size(&self) -> usize {
        self.brush_size
    }

    /// Grow the brush by one, no-op at the maximum.
    pub fn increase_brush_size(&mut self) {
        if self.brush_size < self.config.brush.max_size {
            self.brush_size += 1;
        }
    }

    /// Shrink the brush by one, no-op at the minimum.
    pub fn decrease_brush_size(&mut self) {
        if self.brush_size > self.config.brush.min_size {
            self.brush_size -= 1;
        }
    }

    fn offset(&self, x: usize, y: usize) -> Option<usize> {
        if x < self.config.width && y < self.config.height {
            Some(y * self.config.width + x)
        } else {
            None
        }
    }

    pub fn cell(&self, x: usize, y: usize) -> Option<&dyn LayerStore> {
        let i = self.offset(x, y)?;
        Some(self.cells[i].as_ref())
    }

    pub fn cell_mut(&mut self, x: usize, y: usize) -> Option<&mut dyn LayerStore> {
        let i = self.offset(x, y)?;
        Some(self.cells[i].as_mut())
    }

    pub fn for_each_cell_mut(&mut self, mut f: impl FnMut(usize, usize, &mut dyn LayerStore)) {
        let width = self.config.width;
        for (i, cell) in self.cells.iter_mut().enumerate() {
            f(i % width, i / width, cell.as_mut());
        }
    }

    /// Whether running `special` twice leaves every cell as it was.
    pub fn special_is_self_inverse(&self) -> bool {
        !matches!(self.config.style, DrawStyle::Sequence)
    }

    /// Activate the special mode on every cell.
    ///
    /// For styles whose special mode discards layers, the discarded layers
    /// are returned (one step per cell and layer) so the change can be undone.
    pub fn special(&mut self) -> Vec<PaintStep> {
        let capture = !self.special_is_self_inverse();
        let mut removed = Vec::new();
        self.for_each_cell_mut(|x, y, cell| {
            if capture {
                let before = cell.layers();
                cell.special();
                let after = cell.layers();
                removed.extend(
                    before
                        .into_iter()
                        .filter(|layer| !after.contains(layer))
                        .map(|layer| PaintStep::new(x, y, layer)),
                );
            } else {
                cell.special();
            }
        });
        removed
    }

    /// Cells within Manhattan distance `brush_size` of `(px, py)`, clipped
    /// to the grid. A point off the grid still paints the cells it reaches.
    pub fn cells_in_brush(&self, px: usize, py: usize) -> impl Iterator<Item = (usize, usize)> + '_ {
        let r = self.brush_size;
        let x_end = px.saturating_add(r).min(self.config.width.saturating_sub(1));
        let y_end = py.saturating_add(r).min(self.config.height.saturating_sub(1));
        let x_start = px.saturating_sub(r);
        let y_start = py.saturating_sub(r);
        let empty = self.config.width == 0 || self.config.height == 0;
        (y_start..=y_end)
            .flat_map(move |y| (x_start..=x_end).map(move |x| (x, y)))
            .filter(move |&(x, y)| !empty && px.abs_diff(x) + py.abs_diff(y) <= r)
    }

    /// Paint `layer` on every cell under the brush centred at `(px, py)`.
    ///
    /// Returns a draw action holding one step per cell that changed.
    pub fn on_paint(&mut self, layer: Layer, px: usize, py: usize) -> PaintAction {
        let targets: Vec<(usize, usize)> = self.cells_in_brush(px, py).collect();
        let style = self.config.style;
        let mut action = PaintAction::default();
        let mut refused = 0usize;
        for (x, y) in targets {
            let Some(cell) = self.cell_mut(x, y) else {
                continue;
            };
            if cell.add(layer) {
                action.add_step(PaintStep::new(x, y, layer));
                continue;
            }
            let full = match style {
                DrawStyle::Set => false,
                DrawStyle::Additive => true,
                DrawStyle::Sequence => !cell.layers().contains(&layer),
            };
            if full {
                refused += 1;
            }
        }
        if refused > 0 {
            log_warn!("Paint {} at ({}, {}): {} cell(s) full, layer dropped", layer, px, py, refused);
        }
        action
    }

    /// Colour of a single cell, or `None` off the grid.
    pub fn color_at(&self, x: usize, y: usize, start: Color, timestamp: u64) -> Option<Color> {
        self.cell(x, y).map(|cell| cell.get_color(start, timestamp, x, y))
    }

    /// Final colour of every cell, row-major, composited in parallel.
    pub fn render(&self, start: Color, timestamp: u64) -> Vec<Color> {
        let width = self.config.width.max(1);
        self.cells
            .par_iter()
            .enumerate()
            .map(|(i, cell)| cell.get_color(start, timestamp, i % width, i / width))
            .collect()
    }
}

/// Background colour a fresh cell renders on.
pub const WHITE: Color = Rgb([255, 255, 255]);
