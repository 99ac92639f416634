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
use std::fmt;

#[cfg(test)]
use std::{error::Error, sync::Arc};

use tracing::debug;

use super::IndicatorGroup;

/// Writes indicator changes to the log. Useful when running without hardware.
pub struct Device {}

impl Device {
    pub fn new() -> Device {
        Device {}
    }
}

impl super::Device for Device {
    fn set_active(&self, group: IndicatorGroup, index: usize) {
        let lamps: String = (0..lamp_count(group))
            .map(|lamp| if lamp == index { '*' } else { '.' })
            .collect();
        debug!(group = %group, index, lamps, "Indicator.");
    }

    #[cfg(test)]
    fn to_mock(&self) -> Result<Arc<super::mock::Device>, Box<dyn Error>> {
        Err("not a mock".into())
    }
}

fn lamp_count(group: IndicatorGroup) -> usize {
    match group {
        IndicatorGroup::Beat | IndicatorGroup::Bar => super::BANK_SIZE,
        IndicatorGroup::Recording => 2,
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Log")
    }
}
