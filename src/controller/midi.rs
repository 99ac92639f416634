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
use std::{io, sync::Arc};

use midly::live::LiveEvent;
use tokio::{
    sync::mpsc::{self, Sender},
    task::JoinHandle,
};
use tracing::{debug, error, info, span, Level};

use super::Event;
use crate::midi::{matches_ignoring_velocity, Device};
use crate::samples::Samples;

/// A controller that drives the looper from a MIDI device. Pads fire the
/// samples whose triggers they match.
pub struct Driver {
    /// The MIDI device.
    midi_device: Arc<dyn Device>,
    /// The sample registry, for trigger matching.
    samples: Arc<Samples>,
    /// The MIDI event that arms recording.
    record: LiveEvent<'static>,
    /// The MIDI event that removes the most recent loop.
    undo: LiveEvent<'static>,
    /// The MIDI event that toggles the metronome.
    metronome: Option<LiveEvent<'static>>,
}

impl Driver {
    pub fn new(
        midi_device: Arc<dyn Device>,
        samples: Arc<Samples>,
        record: LiveEvent<'static>,
        undo: LiveEvent<'static>,
        metronome: Option<LiveEvent<'static>>,
    ) -> Driver {
        Driver {
            midi_device,
            samples,
            record,
            undo,
            metronome,
        }
    }
}

/// Maps a MIDI event to a looper event. Controls win over sample triggers.
fn to_event(
    samples: &Samples,
    record: &LiveEvent,
    undo: &LiveEvent,
    metronome: Option<&LiveEvent>,
    event: &LiveEvent,
) -> Option<Event> {
    if matches_ignoring_velocity(event, record) {
        Some(Event::Record)
    } else if matches_ignoring_velocity(event, undo) {
        Some(Event::Undo)
    } else if metronome.is_some_and(|metronome| matches_ignoring_velocity(event, metronome)) {
        Some(Event::Metronome)
    } else {
        samples
            .by_midi(event)
            .map(|sample| Event::Trigger(sample.id()))
    }
}

impl super::Driver for Driver {
    fn monitor_events(&self, events_tx: Sender<Event>) -> JoinHandle<Result<(), io::Error>> {
        let (midi_events_tx, mut midi_events_rx) = mpsc::channel::<Vec<u8>>(32);
        let device = self.midi_device.clone();

        tokio::task::spawn_blocking(move || {
            let span = span!(Level::INFO, "MIDI driver");
            let _enter = span.enter();

            info!(device = device.name(), "MIDI driver started.");

            if let Err(e) = device.watch_events(midi_events_tx) {
                error!(err = e.to_string(), "Error watching MIDI events");
            }
        });

        let device = self.midi_device.clone();
        let samples = self.samples.clone();
        let record = self.record;
        let undo = self.undo;
        let metronome = self.metronome;
        tokio::spawn(async move {
            loop {
                let raw_event = match midi_events_rx.recv().await {
                    Some(raw_event) => raw_event,
                    None => {
                        info!("MIDI watcher closed.");
                        device.stop_watch_events();
                        return Ok(());
                    }
                };

                let event = match LiveEvent::parse(&raw_event) {
                    Ok(event) => event,
                    Err(e) => {
                        error!(err = format!("{:?}", e), "Error parsing event.");
                        continue;
                    }
                };

                let Some(event) = to_event(&samples, &record, &undo, metronome.as_ref(), &event)
                else {
                    debug!(event = ?event, "Ignoring MIDI event.");
                    continue;
                };

                if events_tx.send(event).await.is_err() {
                    info!("Controller closed, stopping MIDI driver.");
                    device.stop_watch_events();
                    return Ok(());
                }
            }
        })
    }
}
