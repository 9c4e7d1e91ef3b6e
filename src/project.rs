use uuid::Uuid;

use crate::canvas::{Grid, GridConfig};
use crate::components::history::{Command, HistoryConfig, PaintAction, UndoTracker};
use crate::components::replay::ReplayTracker;
use crate::layers::Layer;
use crate::{log_info, log_warn};

/// Single live editing session: one grid, its undo history and the replay log.
pub struct Session {
    pub id: Uuid,
    grid_config: GridConfig,
    grid: Grid,
    undo: UndoTracker,
    replay: ReplayTracker,
}

impl Session {
    /// The shape must already have passed [`GridConfig::cell_count`].
    pub fn new(grid_config: GridConfig, history_config: HistoryConfig) -> Self {
        let id = Uuid::new_v4();
        log_info!(
            "Session {} created: {}×{} {} grid",
            id,
            grid_config.width,
            grid_config.height,
            grid_config.style.name()
        );
        Self {
            id,
            grid_config,
            grid: Grid::new(grid_config),
            undo: UndoTracker::with_config(&history_config),
            replay: ReplayTracker::with_config(&history_config),
        }
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn grid_config(&self) -> &GridConfig {
        &self.grid_config
    }

    pub fn history(&self) -> &UndoTracker {
        &self.undo
    }

    pub fn replay_log(&self) -> &ReplayTracker {
        &self.replay
    }

    /// A new, empty grid with this session's configuration.
    pub fn fresh_grid(&self) -> Grid {
        Grid::new(self.grid_config)
    }

    fn record(&mut self, action: PaintAction) {
        if !self.replay.add_action(action.clone(), false) && !self.replay.is_replaying() {
            log_warn!("Session {}: action applied but missing from replay log", self.id);
        }
        self.undo.add_action(action);
    }

    /// Paint `layer` under the brush at `(x, y)`. Returns `true` if any cell changed;
    /// only then is the stroke recorded.
    pub fn paint(&mut self, layer: Layer, x: usize, y: usize) -> bool {
        let action = self.grid.on_paint(layer, x, y);
        if action.is_empty() {
            return false;
        }
        self.record(action);
        true
    }

    /// Trigger the special mode on every cell and record it.
    pub fn special(&mut self) {
        let mut action = PaintAction::special();
        action.apply(&mut self.grid);
        self.record(action);
    }

    pub fn undo(&mut self) -> bool {
        match self.undo.undo(&mut self.grid) {
            Some(action) => {
                self.replay.add_action(action, true);
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        match self.undo.redo(&mut self.grid) {
            Some(action) => {
                self.replay.add_action(action, false);
                true
            }
            None => false,
        }
    }

    pub fn increase_brush_size(&mut self) {
        self.grid.increase_brush_size();
    }

    pub fn decrease_brush_size(&mut self) {
        self.grid.decrease_brush_size();
    }

    /// Stop recording; the log can now be played back with `replay_next`.
    pub fn start_replay(&mut self) {
        self.replay.start_replay();
    }

    /// Play the next recorded action on `target`. `true` = finished.
    pub fn replay_next(&mut self, target: &mut Grid) -> bool {
        self.replay.play_next_action(target)
    }
}
