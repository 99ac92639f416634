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

use super::IndicatorGroup;

/// A mock indicator. Remembers every call.
#[derive(Clone)]
pub struct Device {
    calls: Arc<Mutex<Vec<(IndicatorGroup, usize)>>>,
}

impl Device {
    pub fn new() -> Device {
        Device {
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Gets the lamp most recently lit in the group.
    #[cfg(test)]
    pub fn active(&self, group: IndicatorGroup) -> Option<usize> {
        self.calls
            .lock()
            .iter()
            .rev()
            .find(|(g, _)| *g == group)
            .map(|(_, index)| *index)
    }

    /// Gets every call made for the group, in order.
    #[cfg(test)]
    pub fn history(&self, group: IndicatorGroup) -> Vec<usize> {
        self.calls
            .lock()
            .iter()
            .filter(|(g, _)| *g == group)
            .map(|(_, index)| *index)
            .collect()
    }
}

impl super::Device for Device {
    fn set_active(&self, group: IndicatorGroup, index: usize) {
        self.calls.lock().push((group, index));
    }

    #[cfg(test)]
    fn to_mock(&self) -> Result<Arc<Device>, Box<dyn Error>> {
        Ok(Arc::new(self.clone()))
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Mock")
    }
}
