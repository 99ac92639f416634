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

/// Default sample volume.
const DEFAULT_VOLUME: f32 = 1.0;

/// Default metronome click volume.
const DEFAULT_METRONOME_VOLUME: f32 = 0.4;

/// A YAML representation of a sample definition.
#[derive(Deserialize, Clone, Debug)]
pub struct SampleDefinition {
    /// The audio file for this sample. Relative paths are resolved against the
    /// directory of the config file.
    file: String,

    /// Playback volume, 0.0 to 1.0.
    volume: Option<f32>,

    /// Keyboard command that fires the sample.
    key: Option<String>,

    /// MIDI event that fires the sample.
    midi: Option<midi::Event>,
}

impl SampleDefinition {
    /// Gets the file.
    pub fn file(&self) -> &str {
        &self.file
    }

    /// Gets the volume (default: 1.0).
    pub fn volume(&self) -> f32 {
        self.volume.unwrap_or(DEFAULT_VOLUME)
    }

    /// Gets the keyboard command.
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    /// Gets the MIDI trigger event.
    pub fn midi(&self) -> Result<Option<LiveEvent<'static>>, Box<dyn Error>> {
        self.midi
            .as_ref()
            .map(|event| event.to_midi_event())
            .transpose()
    }
}

/// A YAML representation of the metronome.
#[derive(Deserialize, Clone, Debug)]
pub struct Metronome {
    /// Click played on the first beat of a bar.
    high: String,

    /// Click played on the other beats.
    low: String,

    /// Click volume, 0.0 to 1.0 (default: 0.4).
    volume: Option<f32>,

    /// Whether the metronome clicks from the start (default: true).
    enabled: Option<bool>,
}

impl Metronome {
    pub fn high(&self) -> &str {
        &self.high
    }

    pub fn low(&self) -> &str {
        &self.low
    }

    pub fn volume(&self) -> f32 {
        self.volume.unwrap_or(DEFAULT_METRONOME_VOLUME)
    }

    pub fn enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }
}
