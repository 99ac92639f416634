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

//! Musical time: tempo, resolution and the bar/beat/tick counters.

use std::fmt;
use std::time::Duration;

use crate::Error;

/// Beats in a bar. The time signature is fixed at 4/4.
pub const BEATS_PER_BAR: usize = 4;

/// Bars in a loop cycle. The grid spans exactly one cycle.
pub const BARS_PER_LOOP: usize = 4;

/// The finest resolution accepted, matching 96 PPQN sequencers.
pub const MAX_TICKS_PER_BEAT: usize = 96;

/// A point in the loop cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Position {
    /// The bar within the loop cycle, [0, 4).
    pub bar: usize,
    /// The beat within the bar, [0, 4).
    pub beat: usize,
    /// The tick within the beat, [0, ticks_per_beat).
    pub tick_in_beat: usize,
    /// The tick within the bar, [0, ticks_per_beat * 4). Used for grid addressing.
    pub tick_in_bar: usize,
}

impl Position {
    /// True on the first tick of a beat.
    pub fn is_beat_boundary(&self) -> bool {
        self.tick_in_beat == 0
    }

    /// True on the first tick of the loop cycle.
    pub fn is_cycle_boundary(&self) -> bool {
        self.bar == 0 && self.tick_in_bar == 0
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}",
            self.bar + 1,
            self.beat + 1,
            self.tick_in_beat + 1
        )
    }
}

/// Owns tempo and the running position.
#[derive(Clone, Debug)]
pub struct Transport {
    tempo_bpm: f64,
    ticks_per_beat: usize,
    /// Cached so it's never stale relative to tempo and resolution.
    tick_duration: Duration,
    position: Position,
}

impl Transport {
    /// Creates a transport at the start of the loop cycle.
    pub fn new(tempo_bpm: f64, ticks_per_beat: usize) -> Result<Transport, Error> {
        validate_tempo(tempo_bpm)?;
        validate_ticks_per_beat(ticks_per_beat)?;
        Ok(Transport {
            tempo_bpm,
            ticks_per_beat,
            tick_duration: tick_duration(tempo_bpm, ticks_per_beat),
            position: Position::default(),
        })
    }

    /// Gets the tempo in beats per minute.
    pub fn tempo_bpm(&self) -> f64 {
        self.tempo_bpm
    }

    /// Gets the quantization resolution.
    pub fn ticks_per_beat(&self) -> usize {
        self.ticks_per_beat
    }

    /// Gets the number of ticks in a bar.
    pub fn ticks_per_bar(&self) -> usize {
        self.ticks_per_beat * BEATS_PER_BAR
    }

    /// Gets the length of one beat.
    pub fn beat_duration(&self) -> Duration {
        Duration::from_secs_f64(60.0 / self.tempo_bpm)
    }

    /// Gets the length of one tick.
    pub fn tick_duration(&self) -> Duration {
        self.tick_duration
    }

    /// Gets the most recently entered position.
    pub fn position(&self) -> Position {
        self.position
    }

    /// Changes the tempo. Takes effect on the next tick period.
    pub fn set_tempo(&mut self, tempo_bpm: f64) -> Result<(), Error> {
        validate_tempo(tempo_bpm)?;
        self.tempo_bpm = tempo_bpm;
        self.tick_duration = tick_duration(self.tempo_bpm, self.ticks_per_beat);
        Ok(())
    }

    /// Changes the resolution. The current tick is rescaled to the new resolution
    /// so that the position stays within the same beat.
    pub fn set_ticks_per_beat(&mut self, ticks_per_beat: usize) -> Result<(), Error> {
        validate_ticks_per_beat(ticks_per_beat)?;
        let tick_in_beat = self.position.tick_in_beat * ticks_per_beat / self.ticks_per_beat;
        self.ticks_per_beat = ticks_per_beat;
        self.tick_duration = tick_duration(self.tempo_bpm, self.ticks_per_beat);
        self.position.tick_in_beat = tick_in_beat;
        self.position.tick_in_bar = self.position.beat * ticks_per_beat + tick_in_beat;
        Ok(())
    }

    /// Moves to the next tick and returns the new position.
    pub fn advance(&mut self) -> Position {
        let pos = &mut self.position;
        pos.tick_in_beat += 1;
        if pos.tick_in_beat == self.ticks_per_beat {
            pos.tick_in_beat = 0;
            pos.beat += 1;
            if pos.beat == BEATS_PER_BAR {
                pos.beat = 0;
                pos.bar = (pos.bar + 1) % BARS_PER_LOOP;
            }
        }
        pos.tick_in_bar = pos.beat * self.ticks_per_beat + pos.tick_in_beat;
        *pos
    }
}

fn tick_duration(tempo_bpm: f64, ticks_per_beat: usize) -> Duration {
    Duration::from_secs_f64(60.0 / tempo_bpm / ticks_per_beat as f64)
}

fn validate_tempo(tempo_bpm: f64) -> Result<(), Error> {
    if tempo_bpm.is_finite() && tempo_bpm > 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidConfig(format!(
            "tempo must be a positive number of beats per minute, got {}",
            tempo_bpm
        )))
    }
}

fn validate_ticks_per_beat(ticks_per_beat: usize) -> Result<(), Error> {
    if (1..=MAX_TICKS_PER_BEAT).contains(&ticks_per_beat) {
        Ok(())
    } else {
        Err(Error::InvalidConfig(format!(
            "ticks per beat must be between 1 and {}, got {}",
            MAX_TICKS_PER_BEAT, ticks_per_beat
        )))
    }
}
