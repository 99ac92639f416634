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
use std::io;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinError;
use tokio::{sync::mpsc::Sender, task::JoinHandle};
use tracing::{debug, info, span, warn, Level};

use crate::engine::Handle;
use crate::samples::SampleId;

mod drivers;
pub mod keyboard;
pub mod midi;
pub mod multi;

pub use drivers::driver;

/// Controller events that drive the looper.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Plays the sample now, and records it if a loop is being recorded.
    Trigger(SampleId),

    /// Arms recording for the next loop cycle. Pressing it while recording
    /// arms another pass that starts when the current one stops.
    Record,

    /// Removes the most recently recorded loop.
    Undo,

    /// Turns the metronome on or off.
    Metronome,

    /// Changes the tempo.
    Tempo(f64),

    /// Changes the number of ticks per beat, requantizing recorded loops.
    Resolution(usize),
}

pub trait Driver: Send + Sync + 'static {
    fn monitor_events(&self, events_tx: Sender<Event>) -> JoinHandle<Result<(), io::Error>>;
}

/// Feeds events from a driver into the engine.
pub struct Controller {
    handle: JoinHandle<()>,
}

impl Controller {
    /// Creates a new controller with the given driver.
    pub fn new(engine: Handle, driver: Arc<dyn Driver>) -> Controller {
        Controller {
            handle: tokio::spawn(async move { Controller::dispatch_events(engine, driver).await }),
        }
    }

    /// Join will block until the controller finishes, which happens once every
    /// input has closed.
    pub async fn join(&mut self) -> Result<(), JoinError> {
        (&mut self.handle).await
    }

    /// Watches the driver and hands its events to the engine.
    async fn dispatch_events(engine: Handle, driver: Arc<dyn Driver>) {
        let span = span!(Level::INFO, "controller");
        let _enter = span.enter();

        let (events_tx, mut events_rx) = mpsc::channel(16);
        let join_handle = driver.monitor_events(events_tx);

        info!(status = %engine.status(), "Controller started.");

        while let Some(event) = events_rx.recv().await {
            dispatch(&engine, event);
        }

        info!("Controller closing.");
        match join_handle.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(err = %e, "Input driver stopped with an error."),
            Err(e) => warn!(err = %e, "Error waiting for event monitor to stop."),
        }
    }
}

/// Applies one event to the engine.
fn dispatch(engine: &Handle, event: Event) {
    debug!(event = ?event, "Received event.");
    match event {
        Event::Trigger(sample) => {
            // Failures are logged where they happen.
            let _ = engine.trigger(sample);
        }
        Event::Record => engine.request_record_toggle(),
        Event::Undo => engine.request_undo(),
        Event::Metronome => engine.toggle_metronome(),
        Event::Tempo(tempo_bpm) => match engine.set_tempo(tempo_bpm) {
            Ok(()) => info!(tempo_bpm, "Tempo changed."),
            Err(e) => warn!(err = %e, "Tempo change rejected."),
        },
        Event::Resolution(ticks_per_beat) => match engine.set_ticks_per_beat(ticks_per_beat) {
            Ok(()) => info!(ticks_per_beat, "Resolution changed."),
            Err(e) => warn!(err = %e, "Resolution change rejected."),
        },
    }
}

#[cfg(test)]
mod test {
    use std::{
        error::Error,
        io,
        path::PathBuf,
        sync::{Arc, Barrier, Mutex},
    };

    use serial_test::serial;
    use tokio::{sync::mpsc::Sender, task::JoinHandle};

    use crate::{
        audio,
        engine::Engine,
        grid::LoopId,
        indicator,
        samples::{SampleId, Samples, TriggerSource},
        sequencer::{Metronome, Sequencer},
        testutil::eventually,
        transport::Transport,
    };

    use super::{Driver, Event};

    const KICK: SampleId = SampleId(0);

    #[derive(Debug)]
    enum TestEvent {
        Unset,
        Send(Event),
        Close,
    }

    struct TestDriver {
        current_event: Arc<Mutex<TestEvent>>,
        barrier: Arc<Barrier>,
    }

    impl TestDriver {
        /// Creates a new test driver which is explicitly controlled by the next_event function.
        fn new() -> TestDriver {
            TestDriver {
                current_event: Arc::new(Mutex::new(TestEvent::Unset)),
                barrier: Arc::new(Barrier::new(2)),
            }
        }

        /// Signals the next event to the monitor thread.
        fn next_event(&self, event: TestEvent) {
            {
                let mut current_event = self.current_event.lock().expect("failed to get lock");
                *current_event = event;
            }
            // Wait until the thread goes to receive the event.
            self.barrier.wait();
            // Wait until the thread has sent it on.
            self.barrier.wait();
        }
    }

    impl Driver for TestDriver {
        fn monitor_events(&self, events_tx: Sender<Event>) -> JoinHandle<Result<(), io::Error>> {
            let barrier = self.barrier.clone();
            let current_event = self.current_event.clone();
            tokio::task::spawn_blocking(move || loop {
                // Wait for next event to set the current event.
                barrier.wait();
                let event = {
                    let current_event = current_event.lock().expect("failed to get lock");
                    match &*current_event {
                        TestEvent::Unset => panic!("current event should not be unset"),
                        TestEvent::Send(event) => Some(event.clone()),
                        TestEvent::Close => None,
                    }
                };
                let result = match event {
                    Some(event) => events_tx.blocking_send(event),
                    None => {
                        barrier.wait();
                        return Ok(());
                    }
                };
                // Let next event know that we sent the event.
                barrier.wait();
                assert!(result.is_ok());
            })
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    #[serial]
    async fn test_controller() -> Result<(), Box<dyn Error>> {
        let mut samples = Samples::new();
        samples.register("kick", PathBuf::from("kick.wav"), 1.0, TriggerSource::default());
        let high = samples.register("high", PathBuf::from("high.wav"), 0.4, TriggerSource::default());
        let low = samples.register("low", PathBuf::from("low.wav"), 0.4, TriggerSource::default());

        let audio = Arc::new(audio::test::Device::get("mock-audio"));
        let engine = Engine::start(Sequencer::new(
            Transport::new(600.0, 4)?,
            Arc::new(samples),
            Some(Metronome::new(high, low, false)),
            audio.clone(),
            Arc::new(indicator::test::Device::new()),
        ))?;
        let handle = engine.handle();

        let driver = Arc::new(TestDriver::new());
        let mut controller = super::Controller::new(handle.clone(), driver.clone());

        driver.next_event(TestEvent::Send(Event::Trigger(KICK)));
        eventually(|| audio.play_count(KICK) == 1, "Kick never played");

        driver.next_event(TestEvent::Send(Event::Tempo(300.0)));
        eventually(
            || handle.status().tempo_bpm == 300.0,
            "Tempo never changed",
        );

        // Rejected tempos leave the old one in place.
        driver.next_event(TestEvent::Send(Event::Tempo(-1.0)));
        driver.next_event(TestEvent::Send(Event::Metronome));
        eventually(
            || handle.status().metronome_enabled,
            "Metronome never enabled",
        );
        assert_eq!(300.0, handle.status().tempo_bpm);

        driver.next_event(TestEvent::Send(Event::Resolution(2)));
        eventually(
            || handle.status().ticks_per_beat == 2,
            "Resolution never changed",
        );

        driver.next_event(TestEvent::Send(Event::Record));
        eventually(
            || handle.status().recording == Some(LoopId(1)),
            "Recording never started",
        );
        eventually(
            || handle.status().undo_depth == 1,
            "Recording never finished",
        );

        driver.next_event(TestEvent::Send(Event::Undo));
        eventually(|| handle.status().undo_depth == 0, "Undo never happened");

        driver.next_event(TestEvent::Close);
        assert!(
            controller.join().await.is_ok(),
            "Error waiting for controller",
        );

        engine.stop();
        Ok(())
    }
}
