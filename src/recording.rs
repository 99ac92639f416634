// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use tracing::{info, warn};

use crate::grid::{GridStore, LoopId};
use crate::Error;

/// Whether a recording pass is running.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordingState {
    Idle,
    Recording(LoopId),
}

/// What happened at a loop cycle boundary.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Transitions {
    /// The loop that finished recording, if any.
    pub stopped: Option<LoopId>,
    /// The loop that started recording, if any.
    pub started: Option<LoopId>,
}

/// Decides when recording passes begin and end and keeps the undo history.
///
/// State only changes at loop cycle boundaries. A pass that is running when a
/// boundary arrives always completes there, so every loop covers exactly one
/// cycle. A request that is pending at the same boundary starts the next pass
/// immediately afterwards.
#[derive(Debug)]
pub struct Recorder {
    state: RecordingState,
    pending: bool,
    last_loop_id: u64,
    history: Vec<LoopId>,
}

impl Recorder {
    pub fn new() -> Recorder {
        Recorder {
            state: RecordingState::Idle,
            pending: false,
            last_loop_id: 0,
            history: Vec::new(),
        }
    }

    pub fn state(&self) -> RecordingState {
        self.state
    }

    /// Gets the loop currently being recorded.
    pub fn active_loop(&self) -> Option<LoopId> {
        match self.state {
            RecordingState::Idle => None,
            RecordingState::Recording(loop_id) => Some(loop_id),
        }
    }

    pub fn is_recording(&self) -> bool {
        self.active_loop().is_some()
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Completed loops, oldest first.
    pub fn history(&self) -> &[LoopId] {
        &self.history
    }

    /// Asks for a recording pass to start at the next cycle boundary. Repeated
    /// requests before that boundary collapse into one.
    pub fn request_record_toggle(&mut self) {
        self.pending = true;
    }

    /// Applies the state transitions due at a loop cycle boundary.
    pub fn on_cycle_boundary(&mut self) -> Transitions {
        let mut transitions = Transitions::default();

        if let RecordingState::Recording(loop_id) = self.state {
            self.history.push(loop_id);
            self.state = RecordingState::Idle;
            transitions.stopped = Some(loop_id);
            info!(loop_id = %loop_id, "Recording stopped.");
        }

        if self.pending {
            self.pending = false;
            self.last_loop_id += 1;
            let loop_id = LoopId(self.last_loop_id);
            self.state = RecordingState::Recording(loop_id);
            transitions.started = Some(loop_id);
            info!(loop_id = %loop_id, "Recording started.");
        }

        transitions
    }

    /// Removes the most recently completed loop from the grid. Returns the loop
    /// and the number of events that were removed with it.
    pub fn undo(&mut self, grid: &mut GridStore) -> Result<(LoopId, usize), Error> {
        let Some(loop_id) = self.history.pop() else {
            warn!("Undo requested with no completed loops.");
            return Err(Error::NothingToUndo);
        };

        let removed = grid.remove_loop(loop_id);
        info!(loop_id = %loop_id, removed, "Undid loop.");
        Ok((loop_id, removed))
    }
}

impl Default for Recorder {
    fn default() -> Self {
        Self::new()
    }
}
