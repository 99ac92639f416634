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
use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::controller::Controller as LooperController;
use crate::engine::Engine;
use crate::samples::Samples;
use crate::sequencer::Sequencer;
use crate::transport::Transport;

mod audio;
mod controller;
mod error;
mod indicators;
mod looper;
pub mod midi;
mod samples;

pub use self::audio::Audio;
pub use self::controller::{Controller, MidiController, MultiController};
pub use self::error::ConfigError;
pub use self::indicators::{Indicators, MidiIndicators};
pub use self::looper::{Looper, METRONOME_HIGH, METRONOME_LOW};

/// Initializes the engine and controller from the given config file. The engine
/// runs until it's dropped; the controller feeds it events from the configured
/// inputs. Must be called from within a tokio runtime.
pub fn init_looper_and_controller(
    path: &Path,
) -> Result<(Engine, LooperController), Box<dyn Error>> {
    let looper = Looper::load(path)?;
    let (sequencer, samples, midi_device) = sequencer(&looper)?;
    let driver = crate::controller::driver(looper.controller(), samples, midi_device)?;
    let engine = Engine::start(sequencer)?;
    let controller = LooperController::new(engine.handle(), driver);
    Ok((engine, controller))
}

/// Builds the devices described by the config and the sequencer that drives
/// them. Also returns the registry and MIDI device for the controller.
#[allow(clippy::type_complexity)]
fn sequencer(
    looper: &Looper,
) -> Result<(Sequencer, Arc<Samples>, Option<Arc<dyn crate::midi::Device>>), Box<dyn Error>> {
    let (samples, metronome) = looper.samples()?;
    let samples = Arc::new(samples);
    info!(
        samples = samples.len(),
        metronome = metronome.is_some(),
        "Samples registered."
    );

    let audio_device = crate::audio::get_device(looper.audio(), &samples)?;
    let midi_device = looper
        .midi_device()
        .map(crate::midi::get_device)
        .transpose()?;
    let indicators = crate::indicator::get_device(looper.indicators(), midi_device.clone())?;

    let sequencer = Sequencer::new(
        Transport::new(looper.tempo_bpm(), looper.ticks_per_beat())?,
        samples.clone(),
        metronome,
        audio_device,
        indicators,
    );
    Ok((sequencer, samples, midi_device))
}

#[cfg(test)]
mod test {
    use std::{error::Error, path::Path};

    use serial_test::serial;

    use super::{sequencer, Looper};
    use crate::engine::Engine;
    use crate::testutil::eventually;

    const LOOPER: &str = r#"
tempo_bpm: 240
audio:
  device: mock-audio
samples:
  kick:
    file: kick01.wav
    midi:
      type: note_on
      channel: 10
      key: 36
controller:
  kind: multi
  drivers:
    - kind: keyboard
    - kind: midi
      record:
        type: note_on
        channel: 10
        key: 48
      undo:
        type: note_on
        channel: 10
        key: 49
midi_device: mock-midi
indicators:
  kind: midi
  channel: 10
  beat: [60, 61, 62, 63]
  bar: [64, 65, 66, 67]
  recording: [68, 69]
"#;

    #[test]
    #[serial]
    fn test_engine_from_config() -> Result<(), Box<dyn Error>> {
        let looper = Looper::from_yaml(LOOPER, Path::new("/looper"))?;
        let (sequencer, samples, midi_device) = sequencer(&looper)?;
        assert_eq!(1, samples.len());
        assert!(midi_device.is_some());
        assert!(crate::controller::driver(looper.controller(), samples, midi_device).is_ok());

        let engine = Engine::start(sequencer)?;
        let handle = engine.handle();
        assert_eq!(240.0, handle.status().tempo_bpm);
        eventually(
            || {
                let position = handle.status().position;
                position.beat > 0 || position.bar > 0
            },
            "Transport never moved",
        );
        engine.stop();
        Ok(())
    }

    #[test]
    fn test_midi_indicators_need_a_midi_device() -> Result<(), Box<dyn Error>> {
        let looper = Looper::from_yaml(
            r#"
audio:
  device: mock-audio
indicators:
  kind: midi
  channel: 1
  beat: [1, 2, 3, 4]
  bar: [5, 6, 7, 8]
  recording: [9, 10]
"#,
            Path::new("/looper"),
        )?;
        assert!(sequencer(&looper).is_err());
        Ok(())
    }
}
