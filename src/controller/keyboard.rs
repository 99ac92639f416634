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

use tokio::{sync::mpsc::Sender, task::JoinHandle};
use tracing::{info, span, warn, Level};

use super::Event;
use crate::samples::Samples;

const RECORD: &str = "record";
const UNDO: &str = "undo";
const METRONOME: &str = "metronome";
const TEMPO: &str = "tempo";
const RESOLUTION: &str = "resolution";

/// Commands that can't be used as sample keys.
pub const COMMANDS: [&str; 5] = [RECORD, UNDO, METRONOME, TEMPO, RESOLUTION];

/// A controller that drives the looper from the keyboard, one command per line.
/// Sample keys fire samples.
pub struct Driver {
    samples: Arc<Samples>,
}

impl Driver {
    pub fn new(samples: Arc<Samples>) -> Driver {
        Driver { samples }
    }

    /// Reads and handles one line. Returns false once the input is closed.
    fn monitor_io<R, W>(
        samples: &Samples,
        events_tx: &Sender<Event>,
        mut reader: R,
        mut writer: W,
    ) -> Result<bool, io::Error>
    where
        R: io::BufRead,
        W: io::Write,
    {
        write!(
            writer,
            "Command (<sample key>, {}, {}, {}, {} <bpm>, {} <ticks per beat>): ",
            RECORD, UNDO, METRONOME, TEMPO, RESOLUTION,
        )?;
        writer.flush()?;
        let mut input: String = String::default();
        if reader.read_line(&mut input)? == 0 {
            return Ok(false);
        }

        let event = match parse(samples, input.trim()) {
            Some(event) => event,
            None => {
                warn!(input = input.trim(), "Unrecognized input");
                return Ok(true);
            }
        };
        events_tx
            .blocking_send(event)
            .map_err(|e| io::Error::new(io::ErrorKind::BrokenPipe, e))?;
        Ok(true)
    }
}

/// Parses a command. Sample keys are case sensitive, commands are not.
fn parse(samples: &Samples, input: &str) -> Option<Event> {
    if let Some(sample) = samples.by_key(input) {
        return Some(Event::Trigger(sample.id()));
    }

    let mut words = input.split_whitespace();
    let command = words.next()?.to_lowercase();
    let event = match (command.as_str(), words.next()) {
        (RECORD, None) => Event::Record,
        (UNDO, None) => Event::Undo,
        (METRONOME, None) => Event::Metronome,
        (TEMPO, Some(bpm)) => Event::Tempo(bpm.parse().ok()?),
        (RESOLUTION, Some(ticks)) => Event::Resolution(ticks.parse().ok()?),
        _ => return None,
    };
    if words.next().is_some() {
        return None;
    }
    Some(event)
}

impl super::Driver for Driver {
    fn monitor_events(&self, events_tx: Sender<Event>) -> JoinHandle<Result<(), io::Error>> {
        let samples = self.samples.clone();
        tokio::task::spawn_blocking(move || {
            let span = span!(Level::INFO, "keyboard driver");
            let _enter = span.enter();

            info!("Keyboard driver started.");

            while Self::monitor_io(&samples, &events_tx, io::stdin().lock(), io::stdout())? {}

            info!("Keyboard input closed.");
            Ok(())
        })
    }
}

#[cfg(test)]
mod test {
    use std::{
        io::{self, BufReader, BufWriter},
        path::PathBuf,
    };

    use tokio::sync::mpsc;

    use crate::controller::Event;
    use crate::samples::{SampleId, Samples, TriggerSource};

    use super::{Driver, METRONOME, RECORD, UNDO};

    fn samples() -> Samples {
        let mut samples = Samples::new();
        for (name, key) in [("kick", "k"), ("snare", "s")] {
            samples.register(
                name,
                PathBuf::from(format!("{}.wav", name)),
                1.0,
                TriggerSource {
                    key: Some(key.to_string()),
                    midi: None,
                },
            );
        }
        samples
    }

    fn get_event(input: &str) -> Result<Option<Event>, io::Error> {
        let (sender, mut receiver) = mpsc::channel::<Event>(1);

        let reader = BufReader::new(input.as_bytes());
        let writer = BufWriter::new(Vec::new());
        assert!(Driver::monitor_io(&samples(), &sender, reader, writer)?);

        // Force the sender to close.
        drop(sender);
        Ok(receiver.blocking_recv())
    }

    #[test]
    fn test_keyboard_events() -> Result<(), io::Error> {
        assert_eq!(Some(Event::Trigger(SampleId(0))), get_event("k\n")?);
        assert_eq!(Some(Event::Trigger(SampleId(1))), get_event("  s  \n")?);
        assert_eq!(Some(Event::Record), get_event(RECORD)?);
        assert_eq!(Some(Event::Undo), get_event("UNDO\n")?);
        assert_eq!(Some(Event::Metronome), get_event(METRONOME)?);
        assert_eq!(Some(Event::Tempo(96.5)), get_event("tempo 96.5\n")?);
        assert_eq!(Some(Event::Resolution(8)), get_event("Resolution 8\n")?);
        Ok(())
    }

    #[test]
    fn test_unrecognized_input() -> Result<(), io::Error> {
        assert_eq!(None, get_event("unrecognized")?);
        assert_eq!(None, get_event("K")?);
        assert_eq!(None, get_event("tempo")?);
        assert_eq!(None, get_event("tempo fast")?);
        assert_eq!(None, get_event("resolution -2")?);
        assert_eq!(None, get_event(&format!("{} now", UNDO))?);
        Ok(())
    }

    #[test]
    fn test_closed_input() -> Result<(), io::Error> {
        let (sender, _receiver) = mpsc::channel::<Event>(1);
        let reader = BufReader::new("".as_bytes());
        let writer = BufWriter::new(Vec::new());
        assert!(!Driver::monitor_io(&samples(), &sender, reader, writer)?);
        Ok(())
    }
}
