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
use std::{collections::HashMap, error::Error, fmt, sync::Arc};

use midly::{
    live::LiveEvent,
    num::{u4, u7},
    MidiMessage,
};
use parking_lot::Mutex;
use tracing::error;

use super::IndicatorGroup;
use crate::config;

/// Velocity used for a lit pad.
const LIT_VELOCITY: u8 = 127;

/// Lights pads on a MIDI controller. Each group maps lamp indices to note numbers;
/// the lit lamp gets a note on at full velocity and the others a note on at zero
/// velocity, which pad controllers treat as off.
pub struct Device {
    midi_device: Arc<dyn crate::midi::Device>,
    channel: u4,
    notes: HashMap<IndicatorGroup, Vec<u7>>,
    /// The lamp currently lit in each group, so repeats can be skipped.
    active: Mutex<HashMap<IndicatorGroup, usize>>,
}

impl Device {
    pub fn new(
        config: &config::MidiIndicators,
        midi_device: Arc<dyn crate::midi::Device>,
    ) -> Result<Device, Box<dyn Error>> {
        let mut notes = HashMap::new();
        notes.insert(IndicatorGroup::Beat, config.beat()?);
        notes.insert(IndicatorGroup::Bar, config.bar()?);
        notes.insert(IndicatorGroup::Recording, config.recording()?);

        Ok(Device {
            midi_device,
            channel: config.channel()?,
            notes,
            active: Mutex::new(HashMap::new()),
        })
    }

    fn event(&self, key: u7, lit: bool) -> LiveEvent<'static> {
        LiveEvent::Midi {
            channel: self.channel,
            message: MidiMessage::NoteOn {
                key,
                vel: if lit { LIT_VELOCITY.into() } else { 0.into() },
            },
        }
    }
}

impl super::Device for Device {
    fn set_active(&self, group: IndicatorGroup, index: usize) {
        {
            let mut active = self.active.lock();
            if active.get(&group) == Some(&index) {
                return;
            }
            active.insert(group, index);
        }

        let Some(notes) = self.notes.get(&group) else {
            return;
        };
        for (lamp, key) in notes.iter().enumerate() {
            if let Err(e) = self.midi_device.emit(self.event(*key, lamp == index)) {
                error!(group = %group, err = e.as_ref(), "Error emitting indicator event.");
            }
        }
    }

    #[cfg(test)]
    fn to_mock(&self) -> Result<Arc<super::mock::Device>, Box<dyn Error>> {
        Err("not a mock".into())
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MIDI ({})", self.midi_device.name())
    }
}
