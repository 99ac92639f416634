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
use crate::samples::SampleId;

/// Errors raised by the looper engine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Tempo or resolution was rejected. Fatal at construction.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A grid coordinate fell outside the grid. This is a programming defect,
    /// as every caller is expected to use transport-supplied coordinates.
    #[error("Grid position (bar {bar}, tick {tick}) is outside of a {bars}x{ticks_per_bar} grid")]
    OutOfRange {
        bar: usize,
        tick: usize,
        bars: usize,
        ticks_per_bar: usize,
    },

    /// Undo was requested without any completed loops.
    #[error("Nothing to undo")]
    NothingToUndo,

    /// A trigger arrived for a sample that was never registered.
    #[error("Unknown sample {0}")]
    UnknownSample(SampleId),
}
