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
use std::{error::Error, fmt, sync::Arc};

use midly::{live::LiveEvent, MidiMessage};
use tokio::sync::mpsc::Sender;

mod midir;
mod mock;

/// A MIDI device that can listen for inputs and emit events.
pub trait Device: fmt::Display + std::marker::Send + std::marker::Sync {
    /// Returns the name of the device.
    fn name(&self) -> String;

    /// Watches MIDI input for events and sends them to the given sender.
    fn watch_events(&self, sender: Sender<Vec<u8>>) -> Result<(), Box<dyn Error>>;

    /// Stops watching events.
    fn stop_watch_events(&self);

    /// Emits an event.
    fn emit(&self, event: LiveEvent<'static>) -> Result<(), Box<dyn Error>>;
}

/// Lists devices known to midir.
pub fn list_devices() -> Result<Vec<Box<dyn Device>>, Box<dyn Error>> {
    midir::list()
}

/// Gets a device with the given name.
pub fn get_device(name: &str) -> Result<Arc<dyn Device>, Box<dyn Error>> {
    if name.starts_with("mock") {
        return Ok(Arc::new(mock::Device::get(name)));
    };

    Ok(Arc::new(midir::get(name)?))
}

/// Returns true if the incoming event matches the configured trigger. Note
/// velocities are ignored, but a note on with zero velocity is a release and
/// never matches.
pub fn matches_ignoring_velocity(event: &LiveEvent, trigger: &LiveEvent) -> bool {
    match (event, trigger) {
        (
            LiveEvent::Midi {
                channel: event_channel,
                message: event_message,
            },
            LiveEvent::Midi {
                channel: trigger_channel,
                message: trigger_message,
            },
        ) => {
            if event_channel != trigger_channel {
                return false;
            }
            match (event_message, trigger_message) {
                (MidiMessage::NoteOn { key, vel }, MidiMessage::NoteOn { key: trigger_key, .. }) => {
                    key == trigger_key && *vel > 0
                }
                (
                    MidiMessage::NoteOff { key, .. },
                    MidiMessage::NoteOff { key: trigger_key, .. },
                ) => key == trigger_key,
                (
                    MidiMessage::Aftertouch { key, .. },
                    MidiMessage::Aftertouch { key: trigger_key, .. },
                ) => key == trigger_key,
                _ => event_message == trigger_message,
            }
        }
        _ => event == trigger,
    }
}
