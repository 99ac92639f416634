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

//! The looper state that the tick thread and trigger handling share.
//!
//! Everything here is driven from outside: the engine calls [Sequencer::step]
//! for the first tick, then sleeps and calls [Sequencer::next_tick] for every
//! tick after it. Moving the transport and doing the new tick's work happen in
//! one call, so a trigger can never land on a position whose boundary work
//! hasn't run. A single lock around the whole struct serializes those calls
//! with triggers and requests. Lamp changes are handed back as [Indications]
//! and shown after the lock is released.

use std::{fmt, sync::Arc, time::Duration};

use tracing::info;

use crate::audio;
use crate::grid::{GridStore, LoopId};
use crate::indicator::{self, IndicatorGroup};
use crate::playback;
use crate::recording::Recorder;
use crate::samples::{SampleId, Samples};
use crate::transport::{Position, Transport};
use crate::trigger;
use crate::Error;

/// Click samples played on every beat.
#[derive(Clone, Debug)]
pub struct Metronome {
    /// Played on the first beat of each bar.
    high: SampleId,
    /// Played on the other beats.
    low: SampleId,
    enabled: bool,
}

impl Metronome {
    pub fn new(high: SampleId, low: SampleId, enabled: bool) -> Metronome {
        Metronome { high, low, enabled }
    }

    fn click(&self, beat: usize) -> SampleId {
        if beat == 0 {
            self.high
        } else {
            self.low
        }
    }
}

/// A point-in-time view of the looper.
#[derive(Clone, Debug, PartialEq)]
pub struct Status {
    pub position: Position,
    pub tempo_bpm: f64,
    pub ticks_per_beat: usize,
    pub recording: Option<LoopId>,
    pub record_pending: bool,
    pub undo_depth: usize,
    pub metronome_enabled: bool,
    pub events: usize,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} @ {} BPM, 1/{} ",
            self.position,
            self.tempo_bpm,
            self.ticks_per_beat * 4
        )?;
        match self.recording {
            Some(loop_id) => write!(f, "recording loop {}", loop_id)?,
            None if self.record_pending => write!(f, "armed")?,
            None => write!(f, "idle")?,
        }
        write!(f, ", {} loops, {} events", self.undo_depth, self.events)
    }
}

/// Lamp changes made by one or more ticks, waiting to be shown.
#[must_use]
pub struct Indications {
    device: Arc<dyn indicator::Device>,
    updates: Vec<(IndicatorGroup, usize)>,
}

impl Indications {
    /// Sends every change to the indicator device, oldest first.
    pub fn show(self) {
        for (group, index) in self.updates {
            self.device.set_active(group, index);
        }
    }
}

pub struct Sequencer {
    transport: Transport,
    grid: GridStore,
    recorder: Recorder,
    samples: Arc<Samples>,
    metronome: Option<Metronome>,
    audio: Arc<dyn audio::Device>,
    indicators: Arc<dyn indicator::Device>,
    /// Lamp changes not yet taken by [Sequencer::take_indications].
    pending_indications: Vec<(IndicatorGroup, usize)>,
}

impl Sequencer {
    /// Creates a sequencer at the start of an empty loop cycle.
    pub fn new(
        transport: Transport,
        samples: Arc<Samples>,
        metronome: Option<Metronome>,
        audio: Arc<dyn audio::Device>,
        indicators: Arc<dyn indicator::Device>,
    ) -> Sequencer {
        Sequencer {
            grid: GridStore::new(transport.ticks_per_bar()),
            transport,
            recorder: Recorder::new(),
            samples,
            metronome,
            audio,
            indicators,
            pending_indications: Vec::new(),
        }
    }

    /// Does the work due at the current tick: indicators and metronome on beat
    /// boundaries, recording transitions on cycle boundaries, then replay of the
    /// current grid cell.
    pub fn step(&mut self) -> Result<(), Error> {
        let position = self.transport.position();

        if position.is_beat_boundary() {
            self.pending_indications
                .push((IndicatorGroup::Beat, position.beat));
            self.pending_indications
                .push((IndicatorGroup::Bar, position.bar));
            if let Some(metronome) = self.metronome.as_ref().filter(|m| m.enabled) {
                self.audio.play(metronome.click(position.beat));
            }
        }

        if position.is_cycle_boundary() {
            self.recorder.on_cycle_boundary();
        }

        if position.is_beat_boundary() {
            self.pending_indications.push((
                IndicatorGroup::Recording,
                usize::from(self.recorder.is_recording()),
            ));
        }

        playback::play_due(
            &self.grid,
            self.audio.as_ref(),
            position.bar,
            position.tick_in_bar,
            self.recorder.active_loop(),
        )?;
        Ok(())
    }

    /// Moves to the next tick and does its work.
    pub fn next_tick(&mut self) -> Result<Position, Error> {
        let position = self.advance();
        self.step()?;
        Ok(position)
    }

    fn advance(&mut self) -> Position {
        self.transport.advance()
    }

    /// Takes the lamp changes made since the last call.
    pub fn take_indications(&mut self) -> Indications {
        Indications {
            device: self.indicators.clone(),
            updates: std::mem::take(&mut self.pending_indications),
        }
    }

    /// Gets the length of the current tick period.
    pub fn tick_duration(&self) -> Duration {
        self.transport.tick_duration()
    }

    /// Handles a trigger for the given sample.
    pub fn trigger(&mut self, sample: SampleId) -> Result<Option<LoopId>, Error> {
        trigger::route(
            &self.samples,
            self.audio.as_ref(),
            &mut self.grid,
            self.transport.position(),
            self.recorder.active_loop(),
            sample,
        )
    }

    pub fn request_record_toggle(&mut self) {
        self.recorder.request_record_toggle();
    }

    /// Removes the most recently completed loop.
    pub fn undo(&mut self) -> Result<(LoopId, usize), Error> {
        self.recorder.undo(&mut self.grid)
    }

    pub fn set_tempo(&mut self, tempo_bpm: f64) -> Result<(), Error> {
        self.transport.set_tempo(tempo_bpm)?;
        info!(tempo_bpm, "Tempo changed.");
        Ok(())
    }

    /// Changes the quantization resolution, moving recorded events and the
    /// current position onto the new grid.
    pub fn set_ticks_per_beat(&mut self, ticks_per_beat: usize) -> Result<(), Error> {
        self.transport.set_ticks_per_beat(ticks_per_beat)?;
        self.grid.requantize(self.transport.ticks_per_bar());
        info!(ticks_per_beat, "Resolution changed.");
        Ok(())
    }

    /// Flips the metronome on or off. Returns the new state, or None if there's
    /// no metronome configured.
    pub fn toggle_metronome(&mut self) -> Option<bool> {
        let metronome = self.metronome.as_mut()?;
        metronome.enabled = !metronome.enabled;
        info!(enabled = metronome.enabled, "Metronome toggled.");
        Some(metronome.enabled)
    }

    pub fn samples(&self) -> &Samples {
        &self.samples
    }

    pub fn grid(&self) -> &GridStore {
        &self.grid
    }

    pub fn status(&self) -> Status {
        Status {
            position: self.transport.position(),
            tempo_bpm: self.transport.tempo_bpm(),
            ticks_per_beat: self.transport.ticks_per_beat(),
            recording: self.recorder.active_loop(),
            record_pending: self.recorder.is_pending(),
            undo_depth: self.recorder.history().len(),
            metronome_enabled: self.metronome.as_ref().is_some_and(|m| m.enabled),
            events: self.grid.len(),
        }
    }
}
