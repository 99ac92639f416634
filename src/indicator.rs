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

//! Visual feedback for the performer.
//!
//! Each group drives a bank of lamps and exactly one lamp in a bank is lit at a
//! time. Beat and bar banks have four lamps. The recording bank lights lamp 1
//! while a pass is running and lamp 0 otherwise.

use std::{error::Error, fmt, sync::Arc};

use crate::config;

mod log;
mod midi;
mod mock;

/// Number of lamps in the beat and bar banks.
pub const BANK_SIZE: usize = 4;

/// A bank of lamps.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IndicatorGroup {
    Beat,
    Bar,
    Recording,
}

impl IndicatorGroup {
    pub const ALL: [IndicatorGroup; 3] = [
        IndicatorGroup::Beat,
        IndicatorGroup::Bar,
        IndicatorGroup::Recording,
    ];
}

impl fmt::Display for IndicatorGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IndicatorGroup::Beat => "beat",
            IndicatorGroup::Bar => "bar",
            IndicatorGroup::Recording => "recording",
        };
        write!(f, "{}", name)
    }
}

/// Something that can show which lamp of a group is active.
pub trait Device: fmt::Display + std::marker::Send + std::marker::Sync {
    /// Lights lamp `index` of the group and darkens the rest. Calling this again
    /// with the same arguments changes nothing.
    fn set_active(&self, group: IndicatorGroup, index: usize);

    #[cfg(test)]
    fn to_mock(&self) -> Result<Arc<mock::Device>, Box<dyn Error>>;
}

/// Gets the indicator device described by the configuration. The MIDI device is
/// required for MIDI indicators.
pub fn get_device(
    config: &config::Indicators,
    midi_device: Option<Arc<dyn crate::midi::Device>>,
) -> Result<Arc<dyn Device>, Box<dyn Error>> {
    match config {
        config::Indicators::Log => Ok(Arc::new(log::Device::new())),
        config::Indicators::Mock => Ok(Arc::new(mock::Device::new())),
        config::Indicators::Midi(midi_config) => {
            let midi_device = match midi_device {
                Some(midi_device) => midi_device,
                None => return Err("MIDI indicators require a MIDI device".into()),
            };
            Ok(Arc::new(midi::Device::new(midi_config, midi_device)?))
        }
    }
}
