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

//! Registered samples and the machinery for getting them into memory.
//!
//! This module provides:
//! - The sample registry, built once at startup and immutable afterwards
//! - Sample loading (in-memory for zero-latency playback)
//! - Voice mixing with a polyphony limit

mod loader;
mod voice;

use std::fmt;
use std::path::{Path, PathBuf};

use midly::live::LiveEvent;

pub use loader::{LoadedSample, SampleLoader};
pub use voice::{Voice, VoiceMixer};

/// Identifies a registered sample. Ids are dense indices into the registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SampleId(pub usize);

impl fmt::Display for SampleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The input identities that fire a sample.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TriggerSource {
    /// Keyboard command that fires the sample.
    pub key: Option<String>,
    /// MIDI event that fires the sample.
    pub midi: Option<LiveEvent<'static>>,
}

/// A sample registered with the looper.
#[derive(Clone, Debug)]
pub struct Sample {
    id: SampleId,
    name: String,
    file: PathBuf,
    volume: f32,
    trigger: TriggerSource,
}

impl Sample {
    /// Gets the sample ID.
    pub fn id(&self) -> SampleId {
        self.id
    }

    /// Gets the sample name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Gets the audio file backing this sample.
    pub fn file(&self) -> &Path {
        &self.file
    }

    /// Gets the playback volume (0.0 to 1.0).
    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// Gets the trigger identities of this sample.
    pub fn trigger(&self) -> &TriggerSource {
        &self.trigger
    }
}

impl fmt::Display for Sample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}, file={}", self.name, self.id, self.file.display())?;
        if let Some(key) = &self.trigger.key {
            write!(f, ", key={}", key)?;
        }
        if let Some(midi) = &self.trigger.midi {
            write!(f, ", midi={:?}", midi)?;
        }
        write!(f, ")")
    }
}

/// The sample registry. Samples are registered once at startup; the registry is
/// shared read-only afterwards.
#[derive(Clone, Debug, Default)]
pub struct Samples {
    samples: Vec<Sample>,
}

impl Samples {
    /// Creates an empty registry.
    pub fn new() -> Samples {
        Samples {
            samples: Vec::new(),
        }
    }

    /// Registers a sample and returns its ID.
    pub fn register(
        &mut self,
        name: &str,
        file: PathBuf,
        volume: f32,
        trigger: TriggerSource,
    ) -> SampleId {
        let id = SampleId(self.samples.len());
        self.samples.push(Sample {
            id,
            name: name.to_string(),
            file,
            volume,
            trigger,
        });
        id
    }

    /// Gets a sample by ID.
    pub fn get(&self, id: SampleId) -> Option<&Sample> {
        self.samples.get(id.0)
    }

    /// Returns true if the ID belongs to a registered sample.
    pub fn contains(&self, id: SampleId) -> bool {
        id.0 < self.samples.len()
    }

    /// Finds a sample by name.
    pub fn by_name(&self, name: &str) -> Option<&Sample> {
        self.samples.iter().find(|sample| sample.name == name)
    }

    /// Finds the sample fired by the given keyboard command.
    pub fn by_key(&self, key: &str) -> Option<&Sample> {
        self.samples
            .iter()
            .find(|sample| sample.trigger.key.as_deref() == Some(key))
    }

    /// Finds the sample fired by the given MIDI event. Velocity is ignored so that
    /// soft and hard hits on the same pad fire the same sample.
    pub fn by_midi(&self, event: &LiveEvent) -> Option<&Sample> {
        self.samples.iter().find(|sample| {
            sample
                .trigger
                .midi
                .as_ref()
                .is_some_and(|trigger| crate::midi::matches_ignoring_velocity(event, trigger))
        })
    }

    /// Iterates over all samples in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter()
    }

    /// Returns the number of registered samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Returns true if no samples are registered.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}
