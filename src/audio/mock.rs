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
use std::{fmt, sync::Arc};

#[cfg(test)]
use std::error::Error;

use parking_lot::Mutex;
use tracing::debug;

use crate::samples::SampleId;

/// A mock device. Doesn't actually play anything, but remembers what it was asked
/// to play.
#[derive(Clone)]
pub struct Device {
    name: String,
    played: Arc<Mutex<Vec<SampleId>>>,
}

impl Device {
    /// Gets the given mock device.
    pub fn get(name: &str) -> Device {
        Device {
            name: name.to_string(),
            played: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Returns every sample played so far, in order.
    #[cfg(test)]
    pub fn played(&self) -> Vec<SampleId> {
        self.played.lock().clone()
    }

    /// Returns how many times the given sample has been played.
    #[cfg(test)]
    pub fn play_count(&self, sample: SampleId) -> usize {
        self.played.lock().iter().filter(|s| **s == sample).count()
    }

    /// Forgets all plays so far.
    #[cfg(test)]
    pub fn reset(&self) {
        self.played.lock().clear();
    }
}

impl super::Device for Device {
    fn play(&self, sample: SampleId) {
        debug!(device = self.name, sample = %sample, "Playing sample (mock).");
        self.played.lock().push(sample);
    }

    #[cfg(test)]
    fn to_mock(&self) -> Result<Arc<Device>, Box<dyn Error>> {
        Ok(Arc::new(self.clone()))
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (Mock)", self.name,)
    }
}
