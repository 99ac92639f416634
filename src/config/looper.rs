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
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use config::{Config, File};
use serde::Deserialize;

use super::audio::Audio;
use super::controller::Controller;
use super::error::ConfigError;
use super::indicators::Indicators;
use super::samples::{Metronome, SampleDefinition};
use crate::controller::keyboard;
use crate::samples::{Samples, TriggerSource};
use crate::sequencer;
use crate::transport::MAX_TICKS_PER_BEAT;
use crate::Error;

/// 80 BPM.
const DEFAULT_TEMPO_BPM: f64 = 80.0;

/// 1/16 note quantization.
const DEFAULT_TICKS_PER_BEAT: usize = 4;

/// Registry names of the metronome clicks.
pub const METRONOME_HIGH: &str = "metronome-high";
pub const METRONOME_LOW: &str = "metronome-low";

/// The configuration for the looper.
#[derive(Deserialize, Clone, Debug)]
pub struct Looper {
    /// Tempo in beats per minute.
    tempo_bpm: Option<f64>,
    /// Quantization resolution.
    ticks_per_beat: Option<usize>,
    /// The audio device to use.
    audio: Audio,
    /// Samples by name. Kept sorted so sample IDs are stable between runs.
    #[serde(default)]
    samples: BTreeMap<String, SampleDefinition>,
    /// The metronome clicks.
    metronome: Option<Metronome>,
    /// The controller configuration.
    #[serde(default)]
    controller: Controller,
    /// Where beat, bar and recording indicators go.
    #[serde(default)]
    indicators: Indicators,
    /// The MIDI device to use.
    midi_device: Option<String>,

    /// The directory relative sample paths are resolved against.
    #[serde(skip)]
    base_dir: PathBuf,
}

impl Looper {
    /// Loads the looper configuration from the given file.
    pub fn load(path: &Path) -> Result<Looper, ConfigError> {
        let mut looper = Config::builder()
            .add_source(File::from(path))
            .build()?
            .try_deserialize::<Looper>()?;
        looper.base_dir = path
            .canonicalize()?
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        looper.validate()?;
        Ok(looper)
    }

    #[cfg(test)]
    pub fn from_yaml(yaml: &str, base_dir: &Path) -> Result<Looper, ConfigError> {
        let mut looper = Config::builder()
            .add_source(config::File::from_str(yaml, config::FileFormat::Yaml))
            .build()?
            .try_deserialize::<Looper>()?;
        looper.base_dir = base_dir.to_path_buf();
        looper.validate()?;
        Ok(looper)
    }

    /// Gets the tempo (default: 80 BPM).
    pub fn tempo_bpm(&self) -> f64 {
        self.tempo_bpm.unwrap_or(DEFAULT_TEMPO_BPM)
    }

    /// Gets the quantization resolution (default: 4 ticks per beat).
    pub fn ticks_per_beat(&self) -> usize {
        self.ticks_per_beat.unwrap_or(DEFAULT_TICKS_PER_BEAT)
    }

    pub fn audio(&self) -> &Audio {
        &self.audio
    }

    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    pub fn indicators(&self) -> &Indicators {
        &self.indicators
    }

    pub fn midi_device(&self) -> Option<&str> {
        self.midi_device.as_deref()
    }

    /// Resolves a sample path against the config directory.
    fn resolve(&self, file: &str) -> PathBuf {
        let path = PathBuf::from(file);
        if path.is_absolute() {
            path
        } else {
            self.base_dir.join(path)
        }
    }

    /// Checks the values the engine can't work with.
    fn validate(&self) -> Result<(), Error> {
        let tempo_bpm = self.tempo_bpm();
        if !tempo_bpm.is_finite() || tempo_bpm <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "tempo_bpm must be greater than 0, got {}",
                tempo_bpm
            )));
        }
        let ticks_per_beat = self.ticks_per_beat();
        if !(1..=MAX_TICKS_PER_BEAT).contains(&ticks_per_beat) {
            return Err(Error::InvalidConfig(format!(
                "ticks_per_beat must be between 1 and {}, got {}",
                MAX_TICKS_PER_BEAT, ticks_per_beat
            )));
        }

        let mut keys = HashSet::new();
        for (name, sample) in self.samples.iter() {
            check_volume(name, sample.volume())?;
            if let Some(key) = sample.key() {
                if keyboard::COMMANDS.contains(&key) {
                    return Err(Error::InvalidConfig(format!(
                        "sample {} uses the reserved key {}",
                        name, key
                    )));
                }
                if !keys.insert(key) {
                    return Err(Error::InvalidConfig(format!(
                        "key {} is used by more than one sample",
                        key
                    )));
                }
            }
            if let Err(e) = sample.midi() {
                return Err(Error::InvalidConfig(format!(
                    "sample {} has an invalid MIDI trigger: {}",
                    name, e
                )));
            }
        }

        if let Some(metronome) = &self.metronome {
            check_volume("metronome", metronome.volume())?;
            for reserved in [METRONOME_HIGH, METRONOME_LOW] {
                if self.samples.contains_key(reserved) {
                    return Err(Error::InvalidConfig(format!(
                        "the sample name {} is reserved for the metronome",
                        reserved
                    )));
                }
            }
        }

        Ok(())
    }

    /// Builds the sample registry. Metronome clicks are registered after the
    /// configured samples and never have triggers of their own.
    pub fn samples(&self) -> Result<(Samples, Option<sequencer::Metronome>), Error> {
        let mut samples = Samples::new();
        for (name, sample) in self.samples.iter() {
            let midi = sample.midi().map_err(|e| {
                Error::InvalidConfig(format!("sample {} has an invalid MIDI trigger: {}", name, e))
            })?;
            samples.register(
                name,
                self.resolve(sample.file()),
                sample.volume(),
                TriggerSource {
                    key: sample.key().map(str::to_string),
                    midi,
                },
            );
        }

        let metronome = self.metronome.as_ref().map(|metronome| {
            let high = samples.register(
                METRONOME_HIGH,
                self.resolve(metronome.high()),
                metronome.volume(),
                TriggerSource::default(),
            );
            let low = samples.register(
                METRONOME_LOW,
                self.resolve(metronome.low()),
                metronome.volume(),
                TriggerSource::default(),
            );
            sequencer::Metronome::new(high, low, metronome.enabled())
        });

        Ok((samples, metronome))
    }
}

fn check_volume(name: &str, volume: f32) -> Result<(), Error> {
    if (0.0..=1.0).contains(&volume) {
        Ok(())
    } else {
        Err(Error::InvalidConfig(format!(
            "{} volume must be between 0.0 and 1.0, got {}",
            name, volume
        )))
    }
}

#[cfg(test)]
mod test {
    use std::{error::Error, path::Path};

    use midly::{live::LiveEvent, MidiMessage};

    use super::{Looper, METRONOME_HIGH, METRONOME_LOW};
    use crate::config::{error::ConfigError, Controller, Indicators};
    use crate::samples::SampleId;

    const FULL: &str = r#"
tempo_bpm: 120
ticks_per_beat: 2
audio:
  device: mock-audio
  sample_rate: 48000
samples:
  kick:
    file: kick01.wav
    key: k
    midi:
      type: note_on
      channel: 10
      key: 36
  snare:
    file: /abs/snare01.wav
    volume: 0.5
    key: s
metronome:
  high: click-high.wav
  low: click-low.wav
  enabled: false
controller:
  kind: midi
  record:
    type: control_change
    channel: 1
    controller: 64
    value: 127
  undo:
    type: note_on
    channel: 10
    key: 40
midi_device: mock-midi
indicators:
  kind: mock
"#;

    fn invalid(yaml: &str) -> String {
        match Looper::from_yaml(yaml, Path::new("/looper")) {
            Err(ConfigError::Invalid(crate::Error::InvalidConfig(message))) => message,
            Err(e) => panic!("unexpected error: {}", e),
            Ok(_) => panic!("config should not have been valid"),
        }
    }

    #[test]
    fn test_full_config() -> Result<(), Box<dyn Error>> {
        let looper = Looper::from_yaml(FULL, Path::new("/looper"))?;
        assert_eq!(120.0, looper.tempo_bpm());
        assert_eq!(2, looper.ticks_per_beat());
        assert_eq!("mock-audio", looper.audio().device());
        assert_eq!(48000, looper.audio().sample_rate());
        assert_eq!(32, looper.audio().max_voices());
        assert_eq!(Some("mock-midi"), looper.midi_device());
        assert!(matches!(looper.indicators(), Indicators::Mock));
        let Controller::Midi(midi) = looper.controller() else {
            panic!("expected a MIDI controller");
        };
        assert!(midi.metronome()?.is_none());

        let (samples, metronome) = looper.samples()?;
        assert_eq!(4, samples.len());

        // Samples are registered in name order, then the metronome.
        let kick = samples.get(SampleId(0)).unwrap();
        assert_eq!("kick", kick.name());
        assert_eq!(Path::new("/looper/kick01.wav"), kick.file());
        assert_eq!(1.0, kick.volume());
        assert_eq!(
            Some(LiveEvent::Midi {
                channel: 9.into(),
                message: MidiMessage::NoteOn {
                    key: 36.into(),
                    vel: 127.into(),
                },
            }),
            kick.trigger().midi
        );

        let snare = samples.by_key("s").unwrap();
        assert_eq!(Path::new("/abs/snare01.wav"), snare.file());
        assert_eq!(0.5, snare.volume());

        let high = samples.by_name(METRONOME_HIGH).unwrap();
        assert_eq!(0.4, high.volume());
        assert_eq!(Path::new("/looper/click-high.wav"), high.file());
        assert!(samples.by_name(METRONOME_LOW).is_some());
        assert!(metronome.is_some());
        Ok(())
    }

    #[test]
    fn test_defaults() -> Result<(), Box<dyn Error>> {
        let looper = Looper::from_yaml("audio:\n  device: mock-audio\n", Path::new("/"))?;
        assert_eq!(80.0, looper.tempo_bpm());
        assert_eq!(4, looper.ticks_per_beat());
        assert_eq!(44100, looper.audio().sample_rate());
        assert_eq!(2, looper.audio().channels());
        assert!(matches!(looper.controller(), Controller::Keyboard));
        assert!(matches!(looper.indicators(), Indicators::Log));

        let (samples, metronome) = looper.samples()?;
        assert!(samples.is_empty());
        assert!(metronome.is_none());
        Ok(())
    }

    #[test]
    fn test_invalid_timing() {
        assert!(invalid("tempo_bpm: 0\naudio:\n  device: mock\n").contains("tempo_bpm"));
        assert!(invalid("tempo_bpm: -10\naudio:\n  device: mock\n").contains("tempo_bpm"));
        assert!(invalid("ticks_per_beat: 0\naudio:\n  device: mock\n").contains("ticks_per_beat"));
        assert!(invalid("ticks_per_beat: 97\naudio:\n  device: mock\n").contains("ticks_per_beat"));
    }

    #[test]
    fn test_invalid_samples() {
        let duplicate = r#"
audio:
  device: mock
samples:
  a:
    file: a.wav
    key: x
  b:
    file: b.wav
    key: x
"#;
        assert!(invalid(duplicate).contains("more than one sample"));

        let reserved = r#"
audio:
  device: mock
samples:
  a:
    file: a.wav
    key: record
"#;
        assert!(invalid(reserved).contains("reserved key"));

        let loud = r#"
audio:
  device: mock
samples:
  a:
    file: a.wav
    volume: 1.5
"#;
        assert!(invalid(loud).contains("volume"));

        let bad_midi = r#"
audio:
  device: mock
samples:
  a:
    file: a.wav
    midi:
      type: note_on
      channel: 0
      key: 36
"#;
        assert!(invalid(bad_midi).contains("MIDI trigger"));
    }

    #[test]
    fn test_missing_audio_is_a_load_error() {
        assert!(matches!(
            Looper::from_yaml("tempo_bpm: 100\n", Path::new("/")),
            Err(ConfigError::Load(_))
        ));
    }
}
