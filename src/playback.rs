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
use tracing::debug;

use crate::audio;
use crate::grid::{GridStore, LoopId};
use crate::Error;

/// Plays every event recorded at the given cell, except those belonging to the
/// loop being recorded. Those were already played once by the trigger that
/// wrote them. Returns the number of events played.
pub fn play_due(
    grid: &GridStore,
    audio: &dyn audio::Device,
    bar: usize,
    tick: usize,
    active_loop: Option<LoopId>,
) -> Result<usize, Error> {
    let mut played = 0;
    for event in grid.events_at(bar, tick)? {
        if Some(event.loop_id) == active_loop {
            continue;
        }
        debug!(bar, tick, loop_id = %event.loop_id, sample = %event.sample, "Replaying event.");
        audio.play(event.sample);
        played += 1;
    }
    Ok(played)
}

#[cfg(test)]
mod test {
    use crate::{
        audio::test::Device,
        grid::{GridStore, LoopId},
        samples::SampleId,
        Error,
    };

    #[test]
    fn test_plays_every_event_in_cell() -> Result<(), Error> {
        let mut grid = GridStore::new(16);
        grid.record(2, 7, LoopId(1), SampleId(0))?;
        grid.record(2, 7, LoopId(2), SampleId(0))?;
        grid.record(2, 7, LoopId(2), SampleId(1))?;
        grid.record(2, 8, LoopId(1), SampleId(2))?;

        let device = Device::get("mock-audio");
        assert_eq!(3, super::play_due(&grid, &device, 2, 7, None)?);
        assert_eq!(
            vec![SampleId(0), SampleId(0), SampleId(1)],
            device.played()
        );
        Ok(())
    }

    #[test]
    fn test_suppresses_active_loop() -> Result<(), Error> {
        let mut grid = GridStore::new(16);
        grid.record(0, 4, LoopId(1), SampleId(0))?;
        grid.record(0, 4, LoopId(2), SampleId(1))?;

        let device = Device::get("mock-audio");
        assert_eq!(1, super::play_due(&grid, &device, 0, 4, Some(LoopId(2)))?);
        assert_eq!(vec![SampleId(0)], device.played());
        Ok(())
    }

    #[test]
    fn test_empty_cell() -> Result<(), Error> {
        let grid = GridStore::new(16);
        let device = Device::get("mock-audio");
        assert_eq!(0, super::play_due(&grid, &device, 3, 15, None)?);
        assert!(device.played().is_empty());
        Ok(())
    }
}
