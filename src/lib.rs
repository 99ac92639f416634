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
pub mod audio;
pub mod config;
pub mod controller;
pub mod engine;
pub mod error;
pub mod grid;
pub mod indicator;
pub mod midi;
pub mod playback;
pub mod playsync;
pub mod recording;
pub mod samples;
pub mod sequencer;
pub mod thread_priority;
pub mod transport;
pub mod trigger;
#[cfg(test)]
mod testutil;

pub use error::Error;
