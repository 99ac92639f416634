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

use midly::num::{u4, u7};
use serde::Deserialize;

use super::midi::{parse_channel, parse_u7};

/// Where beat, bar and recording indicators go.
#[derive(Deserialize, Clone, Debug, Default)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Indicators {
    /// Logs lamp changes at debug level.
    #[default]
    Log,
    /// Remembers lamp changes. Used by tests.
    Mock,
    /// Lights pads on a MIDI controller.
    Midi(MidiIndicators),
}

/// Note numbers of the pads that make up each indicator bank. Lamp `n` of a
/// bank is the `n`th note in its list.
#[derive(Deserialize, Clone, Debug)]
pub struct MidiIndicators {
    /// The channel (1-16) the pads listen on.
    channel: u8,
    beat: Vec<u8>,
    bar: Vec<u8>,
    /// Usually two pads: off and on.
    recording: Vec<u8>,
}

impl MidiIndicators {
    pub fn channel(&self) -> Result<u4, Box<dyn Error>> {
        parse_channel(self.channel)
    }

    pub fn beat(&self) -> Result<Vec<u7>, Box<dyn Error>> {
        notes(&self.beat)
    }

    pub fn bar(&self) -> Result<Vec<u7>, Box<dyn Error>> {
        notes(&self.bar)
    }

    pub fn recording(&self) -> Result<Vec<u7>, Box<dyn Error>> {
        notes(&self.recording)
    }
}

fn notes(raw: &[u8]) -> Result<Vec<u7>, Box<dyn Error>> {
    raw.iter().map(|note| parse_u7(*note)).collect()
}
