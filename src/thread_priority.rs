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

use thread_priority::{set_current_thread_priority, ThreadPriority, ThreadPriorityValue};
use tracing::{info, warn};

/// Default priority for timing-critical threads when GRIDLOOP_THREAD_PRIORITY is unset.
const DEFAULT_THREAD_PRIORITY: u8 = 70;

/// Reads GRIDLOOP_THREAD_PRIORITY (0-99). Read once at thread start so the hot
/// path never touches the environment.
pub fn thread_priority() -> ThreadPriority {
    parse_priority(std::env::var("GRIDLOOP_THREAD_PRIORITY").ok().as_deref())
}

fn parse_priority(value: Option<&str>) -> ThreadPriority {
    let requested = value
        .and_then(|v| v.trim().parse::<u8>().ok())
        .filter(|n| *n < 100)
        .unwrap_or(DEFAULT_THREAD_PRIORITY);
    match ThreadPriorityValue::try_from(requested) {
        Ok(value) => ThreadPriority::Crossplatform(value),
        Err(_) => ThreadPriority::Max,
    }
}

fn env_flag(name: &str) -> bool {
    std::env::var(name).is_ok_and(|v| is_truthy(&v))
}

fn is_truthy(v: &str) -> bool {
    v == "1"
        || v.eq_ignore_ascii_case("true")
        || v.eq_ignore_ascii_case("yes")
        || v.eq_ignore_ascii_case("on")
}

/// Returns whether we should attempt RT (SCHED_FIFO) scheduling for the tick
/// and audio threads. Opt out with GRIDLOOP_DISABLE_RT_TICK=1.
pub fn rt_enabled() -> bool {
    !env_flag("GRIDLOOP_DISABLE_RT_TICK")
}

/// Raises the priority of the calling thread. Does nothing once `priority_set`
/// is true, so it can be called from inside a callback.
pub fn configure_current_thread(
    thread_name: &str,
    priority: ThreadPriority,
    rt: bool,
    priority_set: &mut bool,
) {
    if *priority_set {
        return;
    }
    if let Err(e) = set_current_thread_priority(priority) {
        warn!(thread = thread_name, error = ?e, "Failed to raise thread priority");
    }

    #[cfg(unix)]
    if rt {
        use thread_priority::unix::{
            set_thread_priority_and_policy, thread_native_id, RealtimeThreadSchedulePolicy,
            ThreadSchedulePolicy,
        };
        match set_thread_priority_and_policy(
            thread_native_id(),
            priority,
            ThreadSchedulePolicy::Realtime(RealtimeThreadSchedulePolicy::Fifo),
        ) {
            Ok(()) => info!(thread = thread_name, "Enabled RT SCHED_FIFO"),
            Err(e) => warn!(thread = thread_name, error = %e, "Failed to set RT SCHED_FIFO"),
        }
    }
    #[cfg(not(unix))]
    let _ = rt;

    *priority_set = true;
}

#[cfg(test)]
mod test {
    use thread_priority::{ThreadPriority, ThreadPriorityValue};

    use super::{is_truthy, parse_priority};

    fn crossplatform(value: u8) -> ThreadPriority {
        ThreadPriority::Crossplatform(ThreadPriorityValue::try_from(value).unwrap())
    }

    #[test]
    fn test_parse_priority() {
        assert_eq!(crossplatform(70), parse_priority(None));
        assert_eq!(crossplatform(70), parse_priority(Some("banana")));
        assert_eq!(crossplatform(70), parse_priority(Some("100")));
        assert_eq!(crossplatform(42), parse_priority(Some(" 42 ")));
    }

    #[test]
    fn test_truthy() {
        for v in ["1", "true", "TRUE", "yes", "On"] {
            assert!(is_truthy(v), "{} should be truthy", v);
        }
        for v in ["0", "false", "", "nope"] {
            assert!(!is_truthy(v), "{} should not be truthy", v);
        }
    }
}
