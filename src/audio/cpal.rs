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
use std::{collections::HashMap, error::Error, fmt, thread};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{Receiver, Sender, TrySendError};
use tracing::{debug, error, info, span, Level};

#[cfg(test)]
use std::sync::Arc;

use crate::{
    config,
    samples::{LoadedSample, SampleId, SampleLoader, Samples, Voice, VoiceMixer},
    thread_priority,
};

/// How many play requests may be queued for the audio callback.
const VOICE_QUEUE_SIZE: usize = 256;

/// A cpal output device with every registered sample preloaded. Playing a sample
/// hands a voice to the output callback, which mixes it in on its next buffer.
pub struct Device {
    /// The name of the device.
    name: String,
    /// The host ID of the device.
    host_id: cpal::HostId,
    /// The number of output channels in use.
    channels: u16,
    /// The output sample rate. Samples are transcoded to it at load time.
    sample_rate: u32,
    /// Preloaded samples and their volumes.
    loaded: HashMap<SampleId, (LoadedSample, f32)>,
    /// Voices waiting to be picked up by the output callback.
    voice_tx: Sender<Voice>,
    /// Dropping this stops the output thread.
    shutdown_tx: Option<Sender<()>>,
    /// Owns the cpal stream, which can't leave the thread that built it.
    output_thread: Option<thread::JoinHandle<()>>,
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (Channels={}, Rate={}) ({})",
            self.name,
            self.channels,
            self.sample_rate,
            self.host_id.name()
        )
    }
}

/// An output device found while scanning the hosts.
struct Candidate {
    name: String,
    host_id: cpal::HostId,
    max_channels: u16,
    device: cpal::Device,
}

impl Device {
    /// Lists cpal output devices.
    pub fn list() -> Result<Vec<String>, Box<dyn Error>> {
        Ok(list_output_devices()?
            .into_iter()
            .map(|candidate| {
                format!(
                    "{} (Channels={}) ({})",
                    candidate.name,
                    candidate.max_channels,
                    candidate.host_id.name()
                )
            })
            .collect())
    }

    /// Gets the given cpal device, loads every registered sample into memory and
    /// starts the output stream.
    pub fn get(config: &config::Audio, samples: &Samples) -> Result<Device, Box<dyn Error>> {
        let span = span!(Level::INFO, "audio device (cpal)");
        let _enter = span.enter();

        let name = config.device();
        let candidate = list_output_devices()?
            .into_iter()
            .find(|candidate| candidate.name.trim() == name)
            .ok_or_else(|| format!("no device found with name {}", name))?;

        let channels = config.channels().min(candidate.max_channels);
        let sample_rate = config.sample_rate();

        let mut loader = SampleLoader::new(sample_rate);
        let mut loaded = HashMap::new();
        for sample in samples.iter() {
            loaded.insert(sample.id(), (loader.load(sample.file())?, sample.volume()));
        }
        info!(
            device = name,
            samples = loaded.len(),
            memory_kb = loader.total_memory_usage() / 1024,
            "Samples loaded."
        );

        let (voice_tx, voice_rx) = crossbeam_channel::bounded(VOICE_QUEUE_SIZE);
        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded::<()>(0);
        let (ready_tx, ready_rx) = crossbeam_channel::bounded(1);

        let device = candidate.device;
        let max_voices = config.max_voices();
        let output_thread = thread::Builder::new()
            .name("gridloop-audio".to_string())
            .spawn(move || {
                output(
                    device,
                    channels,
                    sample_rate,
                    max_voices,
                    voice_rx,
                    shutdown_rx,
                    ready_tx,
                )
            })?;

        // The thread reports whether the stream came up before we hand out the device.
        match ready_rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => return Err("audio output thread exited before starting".into()),
        }

        info!(
            device = name,
            channels, sample_rate, max_voices, "Audio output started."
        );

        Ok(Device {
            name: candidate.name,
            host_id: candidate.host_id,
            channels,
            sample_rate,
            loaded,
            voice_tx,
            shutdown_tx: Some(shutdown_tx),
            output_thread: Some(output_thread),
        })
    }
}

impl super::Device for Device {
    fn play(&self, sample: SampleId) {
        let Some((loaded, volume)) = self.loaded.get(&sample) else {
            error!(device = self.name, sample = %sample, "Sample was never loaded.");
            return;
        };

        match self.voice_tx.try_send(Voice::new(sample, loaded, *volume)) {
            Ok(()) => debug!(device = self.name, sample = %sample, "Playing sample."),
            Err(TrySendError::Full(_)) => {
                error!(device = self.name, sample = %sample, "Voice queue full, dropping sample.")
            }
            Err(TrySendError::Disconnected(_)) => {
                error!(device = self.name, sample = %sample, "Audio output has stopped.")
            }
        }
    }

    #[cfg(test)]
    fn to_mock(&self) -> Result<Arc<super::mock::Device>, Box<dyn Error>> {
        Err("not a mock".into())
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        self.shutdown_tx.take();
        if let Some(thread) = self.output_thread.take() {
            let _ = thread.join();
        }
    }
}

/// Scans every host for devices that can output audio.
fn list_output_devices() -> Result<Vec<Candidate>, Box<dyn Error>> {
    let mut candidates = Vec::new();
    for host_id in cpal::available_hosts() {
        let host_devices = match cpal::host_from_id(host_id)?.devices() {
            Ok(host_devices) => host_devices,
            Err(e) => {
                error!(
                    err = e.to_string(),
                    host = host_id.name(),
                    "Unable to list devices for host"
                );
                continue;
            }
        };

        for device in host_devices {
            let Ok(output_configs) = device.supported_output_configs() else {
                continue;
            };
            let max_channels = output_configs
                .map(|output_config| output_config.channels())
                .max()
                .unwrap_or(0);

            if max_channels > 0 {
                candidates.push(Candidate {
                    name: device.name()?,
                    host_id,
                    max_channels,
                    device,
                });
            }
        }
    }

    candidates.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(candidates)
}

/// Builds and runs the output stream until shutdown.
fn output(
    device: cpal::Device,
    channels: u16,
    sample_rate: u32,
    max_voices: usize,
    voice_rx: Receiver<Voice>,
    shutdown_rx: Receiver<()>,
    ready_tx: Sender<Result<(), String>>,
) {
    let span = span!(Level::INFO, "audio output (cpal)");
    let _enter = span.enter();

    let config = cpal::StreamConfig {
        channels,
        sample_rate: sample_rate,
        buffer_size: cpal::BufferSize::Default,
    };

    let mut mixer = VoiceMixer::new(max_voices, channels);
    let priority = thread_priority::thread_priority();
    let rt = thread_priority::rt_enabled();
    let mut priority_set = false;
    let stream = device.build_output_stream(
        &config,
        move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
            thread_priority::configure_current_thread(
                "audio callback",
                priority,
                rt,
                &mut priority_set,
            );
            for voice in voice_rx.try_iter() {
                mixer.add(voice);
            }
            mixer.mix(data);
        },
        |err| error!("CPAL output stream error: {}", err),
        None,
    );

    let stream = match stream {
        Ok(stream) => stream,
        Err(e) => {
            let _ = ready_tx.send(Err(format!("failed to create output stream: {}", e)));
            return;
        }
    };
    if let Err(e) = stream.play() {
        let _ = ready_tx.send(Err(format!("failed to start output stream: {}", e)));
        return;
    }
    let _ = ready_tx.send(Ok(()));

    // Blocks until the device is dropped.
    let _ = shutdown_rx.recv();
    info!("Audio output stopped.");
}
