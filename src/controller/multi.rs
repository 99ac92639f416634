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
use std::{io, sync::Arc};

use tokio::{sync::mpsc::Sender, task::JoinHandle};
use tracing::{info, warn};

use super::Event;

/// A controller that runs several other drivers at once. It finishes once all
/// of them have.
pub struct Driver {
    drivers: Vec<Arc<dyn super::Driver>>,
}

impl Driver {
    pub fn new(drivers: Vec<Arc<dyn super::Driver>>) -> Driver {
        Driver { drivers }
    }
}

impl super::Driver for Driver {
    fn monitor_events(&self, events_tx: Sender<Event>) -> JoinHandle<Result<(), io::Error>> {
        let join_handles = self
            .drivers
            .iter()
            .map(|driver| driver.monitor_events(events_tx.clone()))
            .collect::<Vec<_>>();

        tokio::spawn(async move {
            let mut failed = 0;
            for join_handle in join_handles {
                match join_handle.await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        warn!(err = %e, "Driver stopped with an error.");
                        failed += 1;
                    }
                    Err(e) => {
                        warn!(err = %e, "Driver task failed.");
                        failed += 1;
                    }
                }
            }

            info!(failed, "All drivers stopped.");
            if failed == 0 {
                Ok(())
            } else {
                Err(io::Error::other(format!("{} drivers failed", failed)))
            }
        })
    }
}

#[cfg(test)]
mod test {
    use std::{error::Error, io, sync::Arc};

    use tokio::{sync::mpsc::Sender, task::JoinHandle};

    use crate::controller::{Driver as _, Event};

    /// Sends a fixed list of events and stops.
    struct ScriptedDriver {
        events: Vec<Event>,
        fail: bool,
    }

    impl crate::controller::Driver for ScriptedDriver {
        fn monitor_events(&self, events_tx: Sender<Event>) -> JoinHandle<Result<(), io::Error>> {
            let events = self.events.clone();
            let fail = self.fail;
            tokio::spawn(async move {
                for event in events {
                    events_tx
                        .send(event)
                        .await
                        .map_err(|e| io::Error::other(e.to_string()))?;
                }
                if fail {
                    Err(io::Error::other("scripted failure"))
                } else {
                    Ok(())
                }
            })
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_multi_driver_merges_events() -> Result<(), Box<dyn Error>> {
        let driver = super::Driver::new(vec![
            Arc::new(ScriptedDriver {
                events: vec![Event::Record, Event::Undo],
                fail: false,
            }),
            Arc::new(ScriptedDriver {
                events: vec![Event::Metronome],
                fail: false,
            }),
        ]);

        let (events_tx, mut events_rx) = tokio::sync::mpsc::channel(16);
        assert!(driver.monitor_events(events_tx).await?.is_ok());

        let mut events = Vec::new();
        while let Some(event) = events_rx.recv().await {
            events.push(event);
        }
        assert_eq!(3, events.len());
        assert!(events.contains(&Event::Metronome));
        // Each driver's own events stay in order.
        let record = events.iter().position(|e| *e == Event::Record);
        let undo = events.iter().position(|e| *e == Event::Undo);
        assert!(record < undo);
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_multi_driver_reports_failures() -> Result<(), Box<dyn Error>> {
        let driver = super::Driver::new(vec![
            Arc::new(ScriptedDriver {
                events: vec![],
                fail: true,
            }),
            Arc::new(ScriptedDriver {
                events: vec![Event::Undo],
                fail: false,
            }),
        ]);

        let (events_tx, mut events_rx) = tokio::sync::mpsc::channel(16);
        assert!(driver.monitor_events(events_tx).await?.is_err());
        assert_eq!(Some(Event::Undo), events_rx.recv().await);
        Ok(())
    }
}
