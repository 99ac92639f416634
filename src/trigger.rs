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
use tracing::{debug, error, warn};

use crate::audio;
use crate::grid::{GridStore, LoopId};
use crate::samples::{SampleId, Samples};
use crate::transport::Position;
use crate::Error;

/// Handles a trigger: the sample plays right away and, while a loop is being
/// recorded, lands in the grid cell at `position`.
///
/// `position` must be the most recently entered tick. Triggers between ticks
/// are quantized backwards, never ahead. Returns the loop the event was recorded
/// into, if any.
pub fn route(
    samples: &Samples,
    audio: &dyn audio::Device,
    grid: &mut GridStore,
    position: Position,
    active_loop: Option<LoopId>,
    sample: SampleId,
) -> Result<Option<LoopId>, Error> {
    if !samples.contains(sample) {
        warn!(sample = %sample, "Trigger for unknown sample.");
        return Err(Error::UnknownSample(sample));
    }

    audio.play(sample);

    let Some(loop_id) = active_loop else {
        debug!(sample = %sample, position = %position, "Triggered.");
        return Ok(None);
    };

    if let Err(e) = grid.record(position.bar, position.tick_in_bar, loop_id, sample) {
        error!(err = %e, position = %position, "Trigger position is outside of the grid.");
        return Err(e);
    }
    debug!(sample = %sample, position = %position, loop_id = %loop_id, "Triggered and recorded.");
    Ok(Some(loop_id))
}

#[cfg(test)]
mod test {
    use std::path::PathBuf;

    use crate::{
        audio::test::Device,
        grid::{GridStore, LoopId},
        samples::{SampleId, Samples, TriggerSource},
        transport::Position,
        Error,
    };

    fn samples() -> Samples {
        let mut samples = Samples::new();
        samples.register(
            "kick",
            PathBuf::from("kick.wav"),
            1.0,
            TriggerSource::default(),
        );
        samples
    }

    fn position(bar: usize, beat: usize, tick_in_beat: usize) -> Position {
        Position {
            bar,
            beat,
            tick_in_beat,
            tick_in_bar: beat * 4 + tick_in_beat,
        }
    }

    #[test]
    fn test_plays_without_recording_when_idle() -> Result<(), Error> {
        let samples = samples();
        let device = Device::get("mock-audio");
        let mut grid = GridStore::new(16);

        let recorded = super::route(
            &samples,
            &device,
            &mut grid,
            position(1, 2, 3),
            None,
            SampleId(0),
        )?;
        assert_eq!(None, recorded);
        assert_eq!(vec![SampleId(0)], device.played());
        assert!(grid.is_empty());
        Ok(())
    }

    #[test]
    fn test_records_at_last_entered_cell() -> Result<(), Error> {
        let samples = samples();
        let device = Device::get("mock-audio");
        let mut grid = GridStore::new(16);

        let recorded = super::route(
            &samples,
            &device,
            &mut grid,
            position(0, 1, 0),
            Some(LoopId(1)),
            SampleId(0),
        )?;
        assert_eq!(Some(LoopId(1)), recorded);
        assert_eq!(vec![SampleId(0)], device.played());
        assert_eq!(1, grid.events_at(0, 4)?.len());
        assert_eq!(LoopId(1), grid.events_at(0, 4)?[0].loop_id);
        Ok(())
    }

    #[test]
    fn test_unknown_sample() {
        let samples = samples();
        let device = Device::get("mock-audio");
        let mut grid = GridStore::new(16);

        assert_eq!(
            Err(Error::UnknownSample(SampleId(5))),
            super::route(
                &samples,
                &device,
                &mut grid,
                position(0, 0, 0),
                Some(LoopId(1)),
                SampleId(5),
            )
        );
        assert!(device.played().is_empty());
        assert!(grid.is_empty());
    }
}
