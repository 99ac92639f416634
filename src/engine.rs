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

//! The tick thread and the handle everything else uses to talk to it.
//!
//! The tick thread owns the cadence: it sleeps until the next tick, then locks
//! the sequencer, drains queued requests, advances and runs the tick's work
//! before unlocking. The lock is never held across the sleep, and a trigger
//! can't see a moved transport whose tick work hasn't run. Triggers take the same
//! lock directly so the sample plays without waiting for a tick; record and undo
//! requests are queued and never block the caller.

use std::{
    sync::Arc,
    thread,
    time::{Duration, Instant},
};

use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use tracing::{error, info, span, warn, Level};

use crate::grid::LoopId;
use crate::playsync::CancelHandle;
use crate::samples::SampleId;
use crate::sequencer::{Sequencer, Status};
use crate::thread_priority;
use crate::Error;

/// Requests that are applied at the top of the next tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Request {
    RecordToggle,
    Undo,
    ToggleMetronome,
}

/// A running looper. Stops when dropped.
pub struct Engine {
    handle: Handle,
    cancel_handle: CancelHandle,
    join_handle: Option<thread::JoinHandle<()>>,
}

/// A cheap, cloneable way to drive a running engine from any thread.
#[derive(Clone)]
pub struct Handle {
    sequencer: Arc<Mutex<Sequencer>>,
    requests: Sender<Request>,
}

impl Engine {
    /// Starts the tick thread.
    pub fn start(sequencer: Sequencer) -> Result<Engine, std::io::Error> {
        let sequencer = Arc::new(Mutex::new(sequencer));
        let (requests_tx, requests_rx) = crossbeam_channel::unbounded();
        let cancel_handle = CancelHandle::new();

        let join_handle = {
            let sequencer = sequencer.clone();
            let cancel_handle = cancel_handle.clone();
            thread::Builder::new()
                .name("gridloop-tick".to_string())
                .spawn(move || run(sequencer, requests_rx, cancel_handle))?
        };

        Ok(Engine {
            handle: Handle {
                sequencer,
                requests: requests_tx,
            },
            cancel_handle,
            join_handle: Some(join_handle),
        })
    }

    /// Gets a handle to the engine.
    pub fn handle(&self) -> Handle {
        self.handle.clone()
    }

    /// Stops the tick thread between ticks and waits for it to exit.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.cancel_handle.cancel();
        if let Some(join_handle) = self.join_handle.take() {
            if join_handle.join().is_err() {
                error!("Tick thread panicked.");
            }
        }
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl Handle {
    /// Plays the sample now and records it if a loop is being recorded.
    pub fn trigger(&self, sample: SampleId) -> Result<Option<LoopId>, Error> {
        self.sequencer.lock().trigger(sample)
    }

    /// Arms recording for the next loop cycle boundary.
    pub fn request_record_toggle(&self) {
        self.send(Request::RecordToggle);
    }

    /// Removes the most recent completed loop at the top of the next tick.
    pub fn request_undo(&self) {
        self.send(Request::Undo);
    }

    pub fn toggle_metronome(&self) {
        self.send(Request::ToggleMetronome);
    }

    /// Changes the tempo. Takes effect on the next tick period.
    pub fn set_tempo(&self, tempo_bpm: f64) -> Result<(), Error> {
        self.sequencer.lock().set_tempo(tempo_bpm)
    }

    /// Changes the quantization resolution. Takes effect on the next tick period.
    pub fn set_ticks_per_beat(&self, ticks_per_beat: usize) -> Result<(), Error> {
        self.sequencer.lock().set_ticks_per_beat(ticks_per_beat)
    }

    pub fn status(&self) -> Status {
        self.sequencer.lock().status()
    }

    fn send(&self, request: Request) {
        if self.requests.send(request).is_err() {
            warn!(request = ?request, "Engine is stopped, dropping request.");
        }
    }
}

fn apply(sequencer: &mut Sequencer, request: Request) {
    match request {
        Request::RecordToggle => sequencer.request_record_toggle(),
        Request::Undo => {
            // NothingToUndo is already logged by the recorder.
            let _ = sequencer.undo();
        }
        Request::ToggleMetronome => {
            if sequencer.toggle_metronome().is_none() {
                warn!("No metronome configured.");
            }
        }
    }
}

/// Applies queued requests and runs one tick under a single lock, moving the
/// transport first unless this is the opening tick. Lamp changes are shown once
/// the lock is released. Returns the length of the tick.
fn tick(sequencer: &Mutex<Sequencer>, requests: &Receiver<Request>, advance: bool) -> Duration {
    let (indications, tick_duration) = {
        let mut sequencer = sequencer.lock();
        for request in requests.try_iter() {
            apply(&mut sequencer, request);
        }
        let result = if advance {
            sequencer.next_tick().map(|_| ())
        } else {
            sequencer.step()
        };
        if let Err(e) = result {
            error!(err = %e, "Error during tick.");
        }
        (sequencer.take_indications(), sequencer.tick_duration())
    };
    indications.show();
    tick_duration
}

fn run(sequencer: Arc<Mutex<Sequencer>>, requests: Receiver<Request>, cancel_handle: CancelHandle) {
    let span = span!(Level::INFO, "tick");
    let _enter = span.enter();

    let mut priority_set = false;
    thread_priority::configure_current_thread(
        "tick",
        thread_priority::thread_priority(),
        thread_priority::rt_enabled(),
        &mut priority_set,
    );

    info!(status = %sequencer.lock().status(), "Engine started.");

    let mut next_tick = Instant::now();
    let mut tick_duration = tick(&sequencer, &requests, false);
    while !cancel_handle.is_cancelled() {
        next_tick += tick_duration;
        let now = Instant::now();
        if next_tick < now {
            warn!(
                behind = ?now.duration_since(next_tick),
                "Tick thread fell behind, resynchronizing."
            );
            next_tick = now;
        }

        if cancel_handle.sleep_until(next_tick) {
            break;
        }
        tick_duration = tick(&sequencer, &requests, true);
    }

    info!("Engine stopped.");
}

#[cfg(test)]
mod test {
    use std::{
        path::PathBuf,
        sync::Arc,
        time::{Duration, Instant},
    };

    use serial_test::serial;

    use crate::{
        audio, grid::LoopId, indicator, samples::SampleId, samples::Samples,
        samples::TriggerSource, sequencer::Sequencer, testutil::eventually, transport::Transport,
        Error,
    };

    use super::Engine;

    const S1: SampleId = SampleId(0);

    /// One loop cycle at 600 BPM.
    const CYCLE: Duration = Duration::from_millis(1600);

    /// Upper bound on how long a stop waits for the tick thread.
    const STOP_TIMEOUT: Duration = Duration::from_secs(1);

    fn start(
        tempo_bpm: f64,
        ticks_per_beat: usize,
    ) -> Result<(Engine, Arc<audio::test::Device>), Box<dyn std::error::Error>> {
        let mut samples = Samples::new();
        samples.register(
            "s1",
            PathBuf::from("s1.wav"),
            1.0,
            TriggerSource::default(),
        );
        let audio = Arc::new(audio::test::Device::get("mock-audio"));
        let sequencer = Sequencer::new(
            Transport::new(tempo_bpm, ticks_per_beat)?,
            Arc::new(samples),
            None,
            audio.clone(),
            Arc::new(indicator::test::Device::new()),
        );
        Ok((Engine::start(sequencer)?, audio))
    }

    #[test]
    #[serial]
    fn test_record_replay_undo() -> Result<(), Box<dyn std::error::Error>> {
        // 25ms ticks.
        let (engine, audio) = start(600.0, 4)?;
        let handle = engine.handle();

        handle.request_record_toggle();
        eventually(
            || handle.status().recording == Some(LoopId(1)),
            "Recording never started",
        );

        assert_eq!(Some(LoopId(1)), handle.trigger(S1)?);
        assert_eq!(1, audio.play_count(S1));
        assert_eq!(1, handle.status().events);

        eventually(
            || {
                let status = handle.status();
                status.recording.is_none() && status.undo_depth == 1
            },
            "Recording never stopped",
        );
        eventually(|| audio.play_count(S1) == 2, "Recorded event never replayed");

        handle.request_undo();
        eventually(
            || {
                let status = handle.status();
                status.events == 0 && status.undo_depth == 0
            },
            "Undo never happened",
        );
        // One replay for the pass after recording, none once it's undone.
        assert_eq!(2, audio.play_count(S1));
        std::thread::sleep(CYCLE + Duration::from_millis(100));
        assert_eq!(2, audio.play_count(S1));

        engine.stop();
        Ok(())
    }

    #[test]
    #[serial]
    fn test_trigger_while_idle_plays_immediately() -> Result<(), Box<dyn std::error::Error>> {
        let (engine, audio) = start(120.0, 4)?;
        let handle = engine.handle();

        assert_eq!(None, handle.trigger(S1)?);
        assert_eq!(vec![S1], audio.played());
        assert_eq!(0, handle.status().events);
        assert_eq!(
            Err(Error::UnknownSample(SampleId(9))),
            handle.trigger(SampleId(9))
        );

        engine.stop();
        Ok(())
    }

    #[test]
    #[serial]
    fn test_runtime_tempo_change() -> Result<(), Box<dyn std::error::Error>> {
        let (engine, _) = start(120.0, 4)?;
        let handle = engine.handle();

        handle.set_tempo(90.0)?;
        assert_eq!(90.0, handle.status().tempo_bpm);
        assert!(handle.set_tempo(0.0).is_err());
        handle.set_ticks_per_beat(3)?;
        assert_eq!(3, handle.status().ticks_per_beat);
        assert!(handle.set_ticks_per_beat(1 << 62).is_err());
        assert_eq!(3, handle.status().ticks_per_beat);

        engine.stop();
        Ok(())
    }

    #[test]
    #[serial]
    fn test_stop_does_not_wait_for_tick() -> Result<(), Box<dyn std::error::Error>> {
        // 3s ticks.
        let (engine, _) = start(20.0, 1)?;
        std::thread::sleep(Duration::from_millis(50));

        let start = Instant::now();
        engine.stop();
        assert!(start.elapsed() < STOP_TIMEOUT);
        Ok(())
    }
}
