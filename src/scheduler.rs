//! Periodic task scheduler.
//!
//! Drives the two cadences of the controller from a monotonic millisecond
//! clock.  The scheduler notifies a [`SchedulerDelegate`] when a task is
//! due; the main loop implements the delegate and runs the matching
//! service operation.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      Scheduler                               │
//! │                                                              │
//! │  ┌────────────────────────┐     ┌────────────────────────┐   │
//! │  │ "control"              │     │ "publish"              │   │
//! │  │ every send_interval_ms │     │ every polling_interval │   │
//! │  └───────────┬────────────┘     └───────────┬────────────┘   │
//! │              ▼                              ▼                │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │              SchedulerDelegate                         │  │
//! │  └───────────────────────┬────────────────────────────────┘  │
//! │                          ▼                                   │
//! │           AppService.tick()   AppService.publish()           │
//! └──────────────────────────────────────────────────────────────┘
//! ```

use crate::app::ports::{PollTask, SchedulerDelegate};
use crate::config::HeaterConfig;
use log::{debug, info};

// ═══════════════════════════════════════════════════════════════
//  Schedule types
// ═══════════════════════════════════════════════════════════════

/// A single periodic schedule.
#[derive(Debug, Clone)]
pub struct Schedule {
    /// Human-readable label (e.g., "control").
    pub label: &'static str,
    pub task: PollTask,
    pub interval_ms: u32,
}

// ═══════════════════════════════════════════════════════════════
//  Scheduler engine
// ═══════════════════════════════════════════════════════════════

/// Maximum number of concurrent schedules (stack-allocated).
const MAX_SCHEDULES: usize = 4;

pub struct Scheduler {
    schedules: [Option<ScheduleEntry>; MAX_SCHEDULES],
}

#[derive(Debug, Clone)]
struct ScheduleEntry {
    schedule: Schedule,
    /// When this schedule is next due; `None` until the first tick.
    next_due_ms: Option<u64>,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            schedules: [None, None, None, None],
        }
    }

    /// The controller's standard schedule: a control cycle every
    /// `send_interval_ms` and a publish every `polling_interval_ms`.
    pub fn for_config(config: &HeaterConfig) -> Self {
        let mut sched = Self::new();
        sched.add(Schedule {
            label: "control",
            task: PollTask::Control,
            interval_ms: config.send_interval_ms,
        });
        sched.add(Schedule {
            label: "publish",
            task: PollTask::Publish,
            interval_ms: config.polling_interval_ms,
        });
        sched
    }

    /// Add a schedule.  Returns the slot index, or `None` if full.
    pub fn add(&mut self, schedule: Schedule) -> Option<usize> {
        let (i, slot) = self
            .schedules
            .iter_mut()
            .enumerate()
            .find(|(_, s)| s.is_none())?;
        info!(
            "Scheduler: added '{}' every {} ms at slot {}",
            schedule.label, schedule.interval_ms, i
        );
        *slot = Some(ScheduleEntry {
            schedule,
            next_due_ms: None,
        });
        Some(i)
    }

    /// Change the interval of every schedule running `task`.  Takes effect
    /// from the next fire.
    pub fn set_interval(&mut self, task: PollTask, interval_ms: u32) {
        for entry in self.schedules.iter_mut().flatten() {
            if entry.schedule.task == task && entry.schedule.interval_ms != interval_ms {
                info!(
                    "Scheduler: '{}' interval {} -> {} ms",
                    entry.schedule.label, entry.schedule.interval_ms, interval_ms
                );
                entry.schedule.interval_ms = interval_ms;
            }
        }
    }

    /// Fire every schedule that is due at `now_ms`.
    ///
    /// Every schedule fires on the first tick.  A schedule that fell more
    /// than one interval behind fires once and re-anchors to `now_ms`
    /// instead of replaying missed runs.
    pub fn tick(&mut self, now_ms: u64, delegate: &mut dyn SchedulerDelegate) {
        for entry in self.schedules.iter_mut().flatten() {
            let interval = u64::from(entry.schedule.interval_ms.max(1));
            let due = *entry.next_due_ms.get_or_insert(now_ms);
            if now_ms < due {
                continue;
            }

            debug!("Scheduler: '{}' fired at {} ms", entry.schedule.label, now_ms);
            delegate.on_schedule_fired(entry.schedule.label, entry.schedule.task);

            let next = due + interval;
            entry.next_due_ms = Some(if next <= now_ms { now_ms + interval } else { next });
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
