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

//! The recorded event grid.

use std::fmt;

use crate::samples::SampleId;
use crate::transport::BARS_PER_LOOP;
use crate::Error;

/// Identifies one recording pass. Never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LoopId(pub u64);

impl fmt::Display for LoopId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A sample hit captured during a recording pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridEvent {
    pub loop_id: LoopId,
    pub sample: SampleId,
}

/// Fixed-size table of recorded events addressed by (bar, tick in bar).
pub struct GridStore {
    ticks_per_bar: usize,
    /// Row-major: cell index is bar * ticks_per_bar + tick.
    cells: Vec<Vec<GridEvent>>,
}

impl GridStore {
    /// Creates an empty grid covering one loop cycle.
    pub fn new(ticks_per_bar: usize) -> GridStore {
        GridStore {
            ticks_per_bar,
            cells: vec![Vec::new(); BARS_PER_LOOP * ticks_per_bar],
        }
    }

    /// Gets the number of ticks per bar the grid was built for.
    pub fn ticks_per_bar(&self) -> usize {
        self.ticks_per_bar
    }

    fn index(&self, bar: usize, tick: usize) -> Result<usize, Error> {
        if bar >= BARS_PER_LOOP || tick >= self.ticks_per_bar {
            return Err(Error::OutOfRange {
                bar,
                tick,
                bars: BARS_PER_LOOP,
                ticks_per_bar: self.ticks_per_bar,
            });
        }
        Ok(bar * self.ticks_per_bar + tick)
    }

    /// Appends an event to the addressed cell.
    pub fn record(
        &mut self,
        bar: usize,
        tick: usize,
        loop_id: LoopId,
        sample: SampleId,
    ) -> Result<(), Error> {
        let index = self.index(bar, tick)?;
        self.cells[index].push(GridEvent { loop_id, sample });
        Ok(())
    }

    /// Gets the events recorded at the addressed cell.
    pub fn events_at(&self, bar: usize, tick: usize) -> Result<&[GridEvent], Error> {
        let index = self.index(bar, tick)?;
        Ok(&self.cells[index])
    }

    /// Removes every event recorded during the given loop. Returns the number of
    /// events removed.
    pub fn remove_loop(&mut self, loop_id: LoopId) -> usize {
        let mut removed = 0;
        for cell in self.cells.iter_mut() {
            let before = cell.len();
            cell.retain(|event| event.loop_id != loop_id);
            removed += before - cell.len();
        }
        removed
    }

    /// Returns the total number of recorded events.
    pub fn len(&self) -> usize {
        self.cells.iter().map(Vec::len).sum()
    }

    /// Returns true if no events are recorded.
    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(Vec::is_empty)
    }

    /// Moves every event to a grid of a different resolution. An event at tick t
    /// lands on t * new / old, so events that collapse onto one cell are all kept.
    pub fn requantize(&mut self, ticks_per_bar: usize) {
        let mut cells = vec![Vec::new(); BARS_PER_LOOP * ticks_per_bar];
        for (index, cell) in self.cells.drain(..).enumerate() {
            let bar = index / self.ticks_per_bar;
            let tick = index % self.ticks_per_bar * ticks_per_bar / self.ticks_per_bar;
            cells[bar * ticks_per_bar + tick].extend(cell);
        }
        self.cells = cells;
        self.ticks_per_bar = ticks_per_bar;
    }
}

impl fmt::Debug for GridStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GridStore")
            .field("ticks_per_bar", &self.ticks_per_bar)
            .field("events", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod test {
    use super::{GridEvent, GridStore, LoopId};
    use crate::{samples::SampleId, Error};

    const KICK: SampleId = SampleId(0);
    const SNARE: SampleId = SampleId(1);

    #[test]
    fn test_new_grid_is_empty() {
        let grid = GridStore::new(16);
        assert!(grid.is_empty());
        for bar in 0..4 {
            for tick in 0..16 {
                assert!(grid.events_at(bar, tick).unwrap().is_empty());
            }
        }
    }

    #[test]
    fn test_record_preserves_multiplicity() -> Result<(), Error> {
        let mut grid = GridStore::new(16);
        grid.record(0, 4, LoopId(1), KICK)?;
        grid.record(0, 4, LoopId(2), KICK)?;
        grid.record(0, 4, LoopId(2), SNARE)?;

        let events = grid.events_at(0, 4)?;
        assert_eq!(3, events.len());
        assert_eq!(
            2,
            events.iter().filter(|event| event.sample == KICK).count()
        );
        assert_eq!(3, grid.len());
        Ok(())
    }

    #[test]
    fn test_out_of_range() {
        let mut grid = GridStore::new(16);
        assert_eq!(
            Err(Error::OutOfRange {
                bar: 4,
                tick: 0,
                bars: 4,
                ticks_per_bar: 16
            }),
            grid.record(4, 0, LoopId(1), KICK)
        );
        assert!(matches!(
            grid.record(0, 16, LoopId(1), KICK),
            Err(Error::OutOfRange { .. })
        ));
        assert!(grid.events_at(3, 16).is_err());
        assert!(grid.is_empty());
    }

    #[test]
    fn test_events_at_is_idempotent() -> Result<(), Error> {
        let mut grid = GridStore::new(8);
        grid.record(2, 3, LoopId(1), KICK)?;
        grid.record(2, 3, LoopId(1), SNARE)?;

        let first: Vec<GridEvent> = grid.events_at(2, 3)?.to_vec();
        let second: Vec<GridEvent> = grid.events_at(2, 3)?.to_vec();
        assert_eq!(first, second);
        Ok(())
    }

    #[test]
    fn test_remove_loop() -> Result<(), Error> {
        let mut grid = GridStore::new(16);
        grid.record(0, 0, LoopId(1), KICK)?;
        grid.record(1, 5, LoopId(2), SNARE)?;
        grid.record(3, 15, LoopId(2), KICK)?;
        grid.record(3, 15, LoopId(1), KICK)?;

        assert_eq!(2, grid.remove_loop(LoopId(2)));
        for bar in 0..4 {
            for tick in 0..16 {
                assert!(grid
                    .events_at(bar, tick)?
                    .iter()
                    .all(|event| event.loop_id != LoopId(2)));
            }
        }
        assert_eq!(2, grid.len());

        // Absent loops are a no-op.
        assert_eq!(0, grid.remove_loop(LoopId(7)));
        assert_eq!(2, grid.len());
        Ok(())
    }

    #[test]
    fn test_requantize() -> Result<(), Error> {
        let mut grid = GridStore::new(16);
        grid.record(1, 5, LoopId(1), KICK)?;
        grid.record(1, 4, LoopId(1), SNARE)?;

        // Halving the resolution folds ticks 4 and 5 into tick 2.
        grid.requantize(8);
        assert_eq!(8, grid.ticks_per_bar());
        assert_eq!(2, grid.events_at(1, 2)?.len());

        // Doubling it again spreads nothing back out.
        grid.requantize(16);
        assert_eq!(2, grid.events_at(1, 4)?.len());
        assert_eq!(2, grid.len());
        Ok(())
    }
}
