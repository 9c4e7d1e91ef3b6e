//! GridPaint: a grid of layered cells painted with composable colour layers,
//! with bounded undo/redo and deterministic replay of recorded sessions.

pub mod logger;

pub mod canvas;
pub mod cli;
pub mod collections;
pub mod components;
pub mod io;
pub mod layer_store;
pub mod layers;
pub mod ops;
pub mod project;

pub use canvas::{BrushConfig, DrawStyle, Grid, GridConfig, WHITE};
pub use components::history::{Command, HistoryConfig, PaintAction, PaintStep, UndoTracker};
pub use components::replay::{ReplayEntry, ReplayState, ReplayTracker};
pub use layer_store::{AdditiveLayerStore, LayerStore, SequenceLayerStore, SetLayerStore};
pub use layers::{Color, Layer};
pub use project::Session;
