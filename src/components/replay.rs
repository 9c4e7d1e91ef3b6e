use serde::{Deserialize, Serialize};

use crate::canvas::Grid;
use crate::collections::BoundedQueue;
use crate::components::history::{Command, DEFAULT_HISTORY_CAPACITY, HistoryConfig, PaintAction, UndoTracker};
use crate::{log_info, log_warn};

/// One recorded user action. Draw, special and redo all record with
/// `is_undo == false`; an undo records the action it undid.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayEntry {
    pub action: PaintAction,
    pub is_undo: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReplayState {
    Recording,
    Replaying,
}

/// Records a session's actions and plays them back one at a time.
///
/// Playback drives a private undo tracker, so a recorded undo undoes
/// whatever the log itself applied last. It shares nothing with the undo
/// tracker of the session that produced the log.
pub struct ReplayTracker {
    queue: BoundedQueue<ReplayEntry>,
    state: ReplayState,
    undo: UndoTracker,
}

impl Default for ReplayTracker {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl ReplayTracker {
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: BoundedQueue::new(capacity),
            state: ReplayState::Recording,
            undo: UndoTracker::new(capacity),
        }
    }

    pub fn with_config(config: &HistoryConfig) -> Self {
        Self {
            queue: BoundedQueue::new(config.replay_capacity),
            state: ReplayState::Recording,
            undo: UndoTracker::with_config(config),
        }
    }

    /// Rebuild a tracker (still recording) from saved entries.
    /// Entries past `capacity` are dropped.
    pub fn from_entries(entries: impl IntoIterator<Item = ReplayEntry>, capacity: usize) -> Self {
        let mut tracker = Self::new(capacity);
        for entry in entries {
            if !tracker.queue.append(entry) {
                log_warn!("Replay log exceeds capacity {}; remaining entries dropped", capacity);
                break;
            }
        }
        tracker
    }

    pub fn state(&self) -> ReplayState {
        self.state
    }

    pub fn is_replaying(&self) -> bool {
        self.state == ReplayState::Replaying
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Entries still to play, oldest first.
    pub fn entries(&self) -> impl Iterator<Item = &ReplayEntry> + '_ {
        self.queue.iter()
    }

    /// Record an action. Dropped (returns `false`) once replay has started
    /// or when the log is full.
    pub fn add_action(&mut self, action: PaintAction, is_undo: bool) -> bool {
        if self.is_replaying() {
            return false;
        }
        if !self.queue.append(ReplayEntry { action, is_undo }) {
            log_warn!("Replay log full ({} entries); action not recorded", self.queue.capacity());
            return false;
        }
        true
    }

    /// Stop recording and allow playback.
    pub fn start_replay(&mut self) {
        if !self.is_replaying() {
            log_info!("Replay started with {} recorded action(s)", self.queue.len());
        }
        self.state = ReplayState::Replaying;
    }

    /// Play the oldest recorded entry on `grid`.
    ///
    /// Returns `true` when there was nothing left to play (nothing happens),
    /// `false` when an entry was processed, even if it changed nothing.
    /// Before `start_replay` this is a no-op returning `true`.
    pub fn play_next_action(&mut self, grid: &mut Grid) -> bool {
        if !self.is_replaying() {
            return true;
        }
        let Some(ReplayEntry { mut action, is_undo }) = self.queue.serve() else {
            return true;
        };
        if is_undo {
            self.undo.undo(grid);
        } else {
            action.apply(grid);
            self.undo.add_action(action);
        }
        false
    }

    /// Play every remaining entry. Returns how many were processed.
    pub fn play_all(&mut self, grid: &mut Grid) -> usize {
        let mut played = 0;
        while !self.play_next_action(grid) {
            played += 1;
        }
        played
    }
}
