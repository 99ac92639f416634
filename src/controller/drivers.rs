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
use std::{error::Error, sync::Arc};

use super::Driver;
use crate::config;
use crate::samples::Samples;

/// Creates a MIDI driver from the config.
fn midi_driver(
    config: &config::MidiController,
    samples: Arc<Samples>,
    midi_device: Option<Arc<dyn crate::midi::Device>>,
) -> Result<Arc<dyn Driver>, Box<dyn Error>> {
    match midi_device {
        Some(midi_device) => Ok(Arc::new(super::midi::Driver::new(
            midi_device,
            samples,
            config.record()?,
            config.undo()?,
            config.metronome()?,
        ))),
        None => Err("No MIDI device found for MIDI controller.".into()),
    }
}

/// Creates a controller driver from the config.
pub fn driver(
    config: &config::Controller,
    samples: Arc<Samples>,
    midi_device: Option<Arc<dyn crate::midi::Device>>,
) -> Result<Arc<dyn Driver>, Box<dyn Error>> {
    match config {
        config::Controller::Keyboard => Ok(Arc::new(super::keyboard::Driver::new(samples))),
        config::Controller::Midi(midi_config) => midi_driver(midi_config, samples, midi_device),
        config::Controller::Multi(multi_config) => {
            let drivers = multi_config
                .drivers()
                .iter()
                .map(|sub_config| match sub_config {
                    config::Controller::Multi(_) => {
                        Err("Recursive multi controllers are not supported".into())
                    }
                    sub_config => driver(sub_config, samples.clone(), midi_device.clone()),
                })
                .collect::<Result<Vec<_>, Box<dyn Error>>>()?;
            Ok(Arc::new(super::multi::Driver::new(drivers)))
        }
    }
}

#[cfg(test)]
mod test {
    use std::{error::Error, sync::Arc};

    use config::{Config, File, FileFormat};

    use crate::samples::Samples;

    fn controller(yaml: &str) -> Result<crate::config::Controller, Box<dyn Error>> {
        Ok(Config::builder()
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .build()?
            .try_deserialize::<crate::config::Controller>()?)
    }

    const MIDI: &str = r#"
kind: midi
record:
  type: note_on
  channel: 10
  key: 48
undo:
  type: note_on
  channel: 10
  key: 49
"#;

    #[test]
    fn test_midi_needs_a_device() -> Result<(), Box<dyn Error>> {
        let samples = Arc::new(Samples::new());
        let config = controller(MIDI)?;
        assert!(super::driver(&config, samples.clone(), None).is_err());

        let midi_device: Arc<dyn crate::midi::Device> =
            Arc::new(crate::midi::test::Device::get("mock-midi"));
        assert!(super::driver(&config, samples, Some(midi_device)).is_ok());
        Ok(())
    }

    #[test]
    fn test_recursive_multi_is_rejected() -> Result<(), Box<dyn Error>> {
        let samples = Arc::new(Samples::new());
        let nested = controller(
            r#"
kind: multi
drivers:
  - kind: keyboard
  - kind: multi
    drivers:
      - kind: keyboard
"#,
        )?;
        assert!(super::driver(&nested, samples.clone(), None).is_err());

        let flat = controller("kind: multi\ndrivers:\n  - kind: keyboard\n")?;
        assert!(super::driver(&flat, samples, None).is_ok());
        Ok(())
    }
}
