use serde::{Deserialize, Serialize};

use crate::canvas::Grid;
use crate::collections::BoundedStack;
use crate::layers::Layer;
use crate::log_warn;

/// Default depth of the undo/redo stacks and of the replay log.
pub const DEFAULT_HISTORY_CAPACITY: usize = 10_000;

// ============================================================================
// COMMAND TRAIT
// ============================================================================

/// Trait for undoable/redoable commands against a grid.
pub trait Command: Send + Sync {
    /// First application. May capture whatever is needed to undo later.
    fn apply(&mut self, grid: &mut Grid);
    fn undo(&self, grid: &mut Grid);
    fn redo(&self, grid: &mut Grid);
    fn description(&self) -> String;
}

// ============================================================================
// PAINT STEP: one layer on one cell
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaintStep {
    x: usize,
    y: usize,
    layer: Layer,
}

impl PaintStep {
    pub fn new(x: usize, y: usize, layer: Layer) -> Self {
        Self { x, y, layer }
    }

    pub fn cell(&self) -> (usize, usize) {
        (self.x, self.y)
    }

    pub fn layer(&self) -> Layer {
        self.layer
    }

    pub fn redo_apply(&self, grid: &mut Grid) {
        if let Some(cell) = grid.cell_mut(self.x, self.y) {
            cell.add(self.layer);
        }
    }

    pub fn undo_apply(&self, grid: &mut Grid) {
        if let Some(cell) = grid.cell_mut(self.x, self.y) {
            cell.erase(self.layer);
        }
    }
}

// ============================================================================
// PAINT ACTION: a stroke or a special trigger
// ============================================================================

/// One recorded unit of user intent.
///
/// A draw action holds the steps that changed a cell. A special action
/// broadcasts the grid's special mode. On grids whose special mode discards
/// layers (sequence style) the discarded layers are captured on first
/// application in `removed`, so undo re-adds them and redo erases them
/// again instead of re-running the median pick.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaintAction {
    steps: Vec<PaintStep>,
    is_special: bool,
    removed: Option<Vec<PaintStep>>,
}

impl PaintAction {
    pub fn draw(steps: Vec<PaintStep>) -> Self {
        Self {
            steps,
            is_special: false,
            removed: None,
        }
    }

    pub fn special() -> Self {
        Self {
            steps: Vec::new(),
            is_special: true,
            removed: None,
        }
    }

    pub fn add_step(&mut self, step: PaintStep) {
        self.steps.push(step);
    }

    pub fn steps(&self) -> &[PaintStep] {
        &self.steps
    }

    pub fn is_special(&self) -> bool {
        self.is_special
    }

    pub fn is_empty(&self) -> bool {
        !self.is_special && self.steps.is_empty()
    }

    /// Layers a captured special action removed, if any.
    pub fn removed(&self) -> Option<&[PaintStep]> {
        self.removed.as_deref()
    }

    pub fn redo_apply(&self, grid: &mut Grid) {
        if self.is_special {
            match &self.removed {
                Some(removed) => removed.iter().for_each(|step| step.undo_apply(grid)),
                None => {
                    grid.special();
                }
            }
        }
        for step in &self.steps {
            step.redo_apply(grid);
        }
    }

    pub fn undo_apply(&self, grid: &mut Grid) {
        if self.is_special {
            match &self.removed {
                Some(removed) => removed.iter().rev().for_each(|step| step.redo_apply(grid)),
                None if grid.special_is_self_inverse() => {
                    grid.special();
                }
                None => {
                    log_warn!(
                        "Undo of an uncaptured special action is unsupported on {} grids; skipped",
                        grid.style().name()
                    );
                }
            }
        }
        for step in self.steps.iter().rev() {
            step.undo_apply(grid);
        }
    }
}

impl Command for PaintAction {
    fn apply(&mut self, grid: &mut Grid) {
        if self.is_special && self.removed.is_none() && !grid.special_is_self_inverse() {
            self.removed = Some(grid.special());
            for step in &self.steps {
                step.redo_apply(grid);
            }
        } else {
            self.redo_apply(grid);
        }
    }

    fn undo(&self, grid: &mut Grid) {
        self.undo_apply(grid);
    }

    fn redo(&self, grid: &mut Grid) {
        self.redo_apply(grid);
    }

    fn description(&self) -> String {
        if self.is_special {
            return "Special".to_string();
        }
        match self.steps.first() {
            Some(step) => format!("Draw {} ({} cells)", step.layer, self.steps.len()),
            None => "Draw (no change)".to_string(),
        }
    }
}

// ============================================================================
// UNDO TRACKER: bounded undo/redo stacks
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HistoryConfig {
    pub undo_capacity: usize,
    pub replay_capacity: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            undo_capacity: DEFAULT_HISTORY_CAPACITY,
            replay_capacity: DEFAULT_HISTORY_CAPACITY,
        }
    }
}

/// Linear undo/redo history with fixed-depth stacks.
pub struct UndoTracker {
    history: BoundedStack<PaintAction>,
    redo_buffer: BoundedStack<PaintAction>,
}

impl Default for UndoTracker {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl UndoTracker {
    pub fn new(capacity: usize) -> Self {
        Self {
            history: BoundedStack::new(capacity),
            redo_buffer: BoundedStack::new(capacity),
        }
    }

    pub fn with_config(config: &HistoryConfig) -> Self {
        Self::new(config.undo_capacity)
    }

    /// Record an already-applied action.
    ///
    /// A successful push ends the redo branch. When the history is full the
    /// action is dropped and the redo buffer is left as it was.
    pub fn add_action(&mut self, action: PaintAction) -> bool {
        if !self.history.push(action) {
            log_warn!(
                "Undo history full ({} actions); action not recorded",
                self.history.capacity()
            );
            return false;
        }
        self.redo_buffer.clear();
        true
    }

    /// Undo the most recent action. Returns it, or `None` if there was nothing to undo.
    pub fn undo(&mut self, grid: &mut Grid) -> Option<PaintAction> {
        let action = self.history.pop()?;
        action.undo(grid);
        // Same capacity as `history`, which just held this action.
        self.redo_buffer.push(action.clone());
        Some(action)
    }

    /// Redo the most recently undone action.
    pub fn redo(&mut self, grid: &mut Grid) -> Option<PaintAction> {
        let action = self.redo_buffer.pop()?;
        action.redo(grid);
        self.history.push(action.clone());
        Some(action)
    }

    pub fn can_undo(&self) -> bool {
        !self.history.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_buffer.is_empty()
    }

    pub fn undo_count(&self) -> usize {
        self.history.len()
    }

    pub fn redo_count(&self) -> usize {
        self.redo_buffer.len()
    }

    pub fn undo_description(&self) -> Option<String> {
        self.history.peek().map(|a| a.description())
    }

    pub fn redo_description(&self) -> Option<String> {
        self.redo_buffer.peek().map(|a| a.description())
    }

    /// All undo descriptions (most recent first)
    pub fn undo_history(&self) -> Vec<String> {
        self.history.iter().rev().map(|a| a.description()).collect()
    }

    pub fn clear(&mut self) {
        self.history.clear();
        self.redo_buffer.clear();
    }
}
