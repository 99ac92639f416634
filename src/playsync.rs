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
use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use parking_lot::{Condvar, Mutex};

/// The last stretch of a sleep is spun rather than waited on the condvar, which
/// can oversleep by a scheduler quantum.
const SPIN_MARGIN: Duration = Duration::from_millis(2);

/// A cancel handle is passed to a long-running thread. It's the thread's
/// responsibility to check it between units of work.
#[derive(Clone)]
pub struct CancelHandle {
    /// Set to true once the owner asks the thread to stop.
    cancelled: Arc<Mutex<bool>>,
    /// Wakes sleepers when cancelled.
    condvar: Arc<Condvar>,
}

impl CancelHandle {
    /// Creates a new cancel handle.
    pub fn new() -> CancelHandle {
        CancelHandle {
            cancelled: Arc::new(Mutex::new(false)),
            condvar: Arc::new(Condvar::new()),
        }
    }

    /// Returns true if the handle has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        *self.cancelled.lock()
    }

    /// Sleeps until the deadline or until cancelled, whichever comes first.
    /// Returns true if cancelled.
    pub fn sleep_until(&self, deadline: Instant) -> bool {
        if let Some(coarse_deadline) = deadline.checked_sub(SPIN_MARGIN) {
            let mut cancelled = self.cancelled.lock();
            while !*cancelled && Instant::now() < coarse_deadline {
                if self
                    .condvar
                    .wait_until(&mut cancelled, coarse_deadline)
                    .timed_out()
                {
                    break;
                }
            }
            if *cancelled {
                return true;
            }
        }

        let now = Instant::now();
        if deadline > now {
            spin_sleep::sleep(deadline - now);
        }
        self.is_cancelled()
    }

    /// Cancels the handle and wakes anything sleeping on it.
    pub fn cancel(&self) {
        let mut cancelled = self.cancelled.lock();
        if !*cancelled {
            *cancelled = true;
            self.condvar.notify_all();
        }
    }
}

impl Default for CancelHandle {
    fn default() -> Self {
        Self::new()
    }
}
