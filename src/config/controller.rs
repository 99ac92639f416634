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
use std::error::Error;

use midly::live::LiveEvent;
use serde::Deserialize;

use super::midi::{self, ToMidiEvent};

/// Allows users to specify various controllers.
#[derive(Deserialize, Clone, Debug, Default)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Controller {
    #[default]
    Keyboard,
    Midi(MidiController),
    Multi(MultiController),
}

/// The configuration that maps MIDI events to looper controls. Sample
/// triggers are configured on the samples themselves.
#[derive(Deserialize, Clone, Debug)]
pub struct MidiController {
    /// The MIDI event that arms or disarms recording.
    record: midi::Event,
    /// The MIDI event that removes the most recent loop.
    undo: midi::Event,
    /// The MIDI event that toggles the metronome.
    metronome: Option<midi::Event>,
}

impl MidiController {
    #[cfg(test)]
    pub fn new(record: midi::Event, undo: midi::Event, metronome: Option<midi::Event>) -> Self {
        MidiController {
            record,
            undo,
            metronome,
        }
    }

    /// Gets the record event.
    pub fn record(&self) -> Result<LiveEvent<'static>, Box<dyn Error>> {
        self.record.to_midi_event()
    }

    /// Gets the undo event.
    pub fn undo(&self) -> Result<LiveEvent<'static>, Box<dyn Error>> {
        self.undo.to_midi_event()
    }

    /// Gets the metronome event, if any.
    pub fn metronome(&self) -> Result<Option<LiveEvent<'static>>, Box<dyn Error>> {
        self.metronome
            .as_ref()
            .map(|event| event.to_midi_event())
            .transpose()
    }
}

/// Runs several controllers at once.
#[derive(Deserialize, Clone, Debug)]
pub struct MultiController {
    drivers: Vec<Controller>,
}

impl MultiController {
    pub fn drivers(&self) -> &[Controller] {
        &self.drivers
    }
}
