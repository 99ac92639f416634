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

//! Polyphonic voice mixing for triggered samples.

use std::sync::Arc;

use tracing::warn;

use super::{LoadedSample, SampleId};

/// One playing instance of a sample.
pub struct Voice {
    sample: SampleId,
    data: Arc<Vec<f32>>,
    channel_count: usize,
    volume: f32,
    /// The next frame to play.
    frame: usize,
}

impl Voice {
    /// Creates a voice at the start of the given sample.
    pub fn new(sample: SampleId, loaded: &LoadedSample, volume: f32) -> Voice {
        Voice {
            sample,
            data: loaded.data().clone(),
            channel_count: usize::from(loaded.channel_count().max(1)),
            volume,
            frame: 0,
        }
    }

    pub fn sample(&self) -> SampleId {
        self.sample
    }

    fn frames(&self) -> usize {
        self.data.len() / self.channel_count
    }

    fn is_finished(&self) -> bool {
        self.frame >= self.frames()
    }
}

/// Mixes active voices into interleaved output buffers. When the voice limit
/// is reached, the oldest voice is stolen.
pub struct VoiceMixer {
    /// Active voices, oldest first.
    voices: Vec<Voice>,
    max_voices: usize,
    output_channels: usize,
}

impl VoiceMixer {
    pub fn new(max_voices: usize, output_channels: u16) -> VoiceMixer {
        VoiceMixer {
            voices: Vec::with_capacity(max_voices),
            max_voices: max_voices.max(1),
            output_channels: usize::from(output_channels.max(1)),
        }
    }

    /// Starts a voice, stealing the oldest one if the limit is reached.
    pub fn add(&mut self, voice: Voice) {
        if self.voices.len() >= self.max_voices {
            let stolen = self.voices.remove(0);
            warn!(
                max_voices = self.max_voices,
                stolen = %stolen.sample(),
                "Voice limit reached, stealing oldest"
            );
        }
        self.voices.push(voice);
    }

    /// Returns the number of voices still playing.
    pub fn active(&self) -> usize {
        self.voices.len()
    }

    /// Writes the next block of audio into `output`, replacing its contents.
    /// Mono samples are sent to every output channel; otherwise source channels
    /// wrap around the output channels.
    pub fn mix(&mut self, output: &mut [f32]) {
        output.fill(0.0);
        let out_channels = self.output_channels;
        let out_frames = output.len() / out_channels;

        for voice in self.voices.iter_mut() {
            let frames = (voice.frames() - voice.frame.min(voice.frames())).min(out_frames);
            for frame in 0..frames {
                let source = (voice.frame + frame) * voice.channel_count;
                let dest = frame * out_channels;
                for out_channel in 0..out_channels {
                    let channel = out_channel % voice.channel_count;
                    output[dest + out_channel] += voice.data[source + channel] * voice.volume;
                }
            }
            voice.frame += frames;
        }

        self.voices.retain(|voice| !voice.is_finished());

        for sample in output.iter_mut() {
            *sample = sample.clamp(-1.0, 1.0);
        }
    }
}
