//! # Timer Registry
//!
//! Single-threaded scheduler that owns every live timed task on the device.
//! Tasks are kept in a min-heap keyed by deadline; each scheduling call hands
//! back a [`TaskId`] that the owning engine keeps so it can cancel, suspend or
//! resume exactly its own work. The registry itself can drop everything in
//! one step, which is what a presentation cycle teardown relies on.
//!
//! ## Clock
//! Time is a monotonic offset (`Duration`) from the registry's creation. The
//! registry never reads a wall clock: the runtime loop calls
//! [`TimerRegistry::pop_due`] with the elapsed time, and tests simply pass
//! whatever instant they want to simulate.
//!
//! ## Heap hygiene
//! Cancelling or re-arming a task does not touch the heap. Every arming gets
//! a fresh sequence number and stale heap entries are discarded lazily when
//! they surface.

use crate::collaborators::ContentSource;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::time::Duration;

/// What a presentation timer does when it fires.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerEvent {
    /// Reload the current page of one slot
    ReloadSlot(ContentSource),
    /// Advance the secondary slot to its next page
    RotateSecondary,
    /// Screensaver idle period elapsed
    ScreensaverIdle,
    /// Screensaver active window elapsed
    ScreensaverEnd,
    /// Re-check connectivity after a network outage
    NetworkRetry,
}

/// The registry as used by the presentation engines.
pub type Timers = TimerRegistry<TimerEvent>;

/// Handle to a registered task.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "task#{}", self.0)
    }
}

/// Whether a task fires once or keeps re-arming itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Repeat {
    Once,
    Every,
}

#[derive(Debug)]
struct TaskEntry<E> {
    event: E,
    period: Duration,
    repeat: Repeat,
    /// Sequence number of the live heap entry, `None` while suspended.
    armed: Option<u64>,
}

/// Registry of every scheduled task, generic over the event a task carries.
#[derive(Debug)]
pub struct TimerRegistry<E> {
    now: Duration,
    next_id: u64,
    next_seq: u64,
    heap: BinaryHeap<Reverse<(Duration, u64, TaskId)>>,
    tasks: HashMap<TaskId, TaskEntry<E>>,
}

impl<E: Clone> Default for TimerRegistry<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Clone> TimerRegistry<E> {
    pub fn new() -> Self {
        Self {
            now: Duration::ZERO,
            next_id: 0,
            next_seq: 0,
            heap: BinaryHeap::new(),
            tasks: HashMap::new(),
        }
    }

    /// Current registry clock.
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Register a task that fires `period` from now, once or repeatedly.
    pub fn register(&mut self, period: Duration, repeat: Repeat, event: E) -> TaskId {
        let id = TaskId(self.next_id);
        self.next_id += 1;
        self.tasks.insert(
            id,
            TaskEntry {
                event,
                period,
                repeat,
                armed: None,
            },
        );
        self.arm(id);
        id
    }

    /// Cancel one task. Returns false when the task was already gone.
    pub fn cancel(&mut self, id: TaskId) -> bool {
        self.tasks.remove(&id).is_some()
    }

    /// Cancel every registered task. Safe to call on an empty registry.
    pub fn cancel_all(&mut self) {
        self.tasks.clear();
        self.heap.clear();
    }

    /// Stop a task from firing without forgetting it.
    pub fn suspend(&mut self, id: TaskId) -> bool {
        match self.tasks.get_mut(&id) {
            Some(entry) => {
                entry.armed = None;
                true
            }
            None => false,
        }
    }

    pub fn suspend_all(&mut self) {
        for entry in self.tasks.values_mut() {
            entry.armed = None;
        }
        self.heap.clear();
    }

    /// Re-arm a suspended task for a full period from now. Tasks that are
    /// already armed keep their deadline.
    pub fn resume(&mut self, id: TaskId) -> bool {
        match self.tasks.get(&id) {
            Some(entry) if entry.armed.is_none() => {
                self.arm(id);
                true
            }
            Some(_) => true,
            None => false,
        }
    }

    pub fn resume_all(&mut self) {
        let mut suspended: Vec<TaskId> = self
            .tasks
            .iter()
            .filter(|(_, entry)| entry.armed.is_none())
            .map(|(id, _)| *id)
            .collect();
        suspended.sort();
        for id in suspended {
            self.arm(id);
        }
    }

    pub fn is_live(&self, id: TaskId) -> bool {
        self.tasks.contains_key(&id)
    }

    pub fn is_suspended(&self, id: TaskId) -> bool {
        self.tasks.get(&id).is_some_and(|entry| entry.armed.is_none())
    }

    /// Number of registered tasks, suspended ones included.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Deadline of the next task due to fire.
    pub fn next_deadline(&mut self) -> Option<Duration> {
        self.discard_stale();
        self.heap.peek().map(|Reverse((due, _, _))| *due)
    }

    /// Pop the earliest task due at or before `until`, moving the clock to its
    /// deadline. One-shot tasks deregister as they fire; repeating tasks are
    /// re-armed one period later. Once nothing else is due the clock settles
    /// on `until`.
    pub fn pop_due(&mut self, until: Duration) -> Option<(TaskId, E)> {
        self.discard_stale();
        let due = match self.heap.peek() {
            Some(Reverse((due, _, _))) if *due <= until => *due,
            _ => {
                self.now = self.now.max(until);
                return None;
            }
        };
        let Reverse((_, _, id)) = self.heap.pop()?;
        self.now = self.now.max(due);

        let entry = self.tasks.get(&id)?;
        let event = entry.event.clone();
        match entry.repeat {
            Repeat::Once => {
                self.tasks.remove(&id);
            }
            Repeat::Every => self.arm(id),
        }
        Some((id, event))
    }

    fn arm(&mut self, id: TaskId) {
        let Some(entry) = self.tasks.get_mut(&id) else {
            return;
        };
        let seq = self.next_seq;
        self.next_seq += 1;
        entry.armed = Some(seq);
        self.heap.push(Reverse((self.now + entry.period, seq, id)));
    }

    fn discard_stale(&mut self) {
        while let Some(Reverse((_, seq, id))) = self.heap.peek() {
            let live = self
                .tasks
                .get(id)
                .is_some_and(|entry| entry.armed == Some(*seq));
            if live {
                break;
            }
            self.heap.pop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mins(m: u64) -> Duration {
        Duration::from_secs(m * 60)
    }

    fn drain(reg: &mut TimerRegistry<&'static str>, until: Duration) -> Vec<&'static str> {
        let mut fired = Vec::new();
        while let Some((_, event)) = reg.pop_due(until) {
            fired.push(event);
        }
        fired
    }

    #[test]
    fn one_shot_fires_once_and_deregisters() {
        let mut reg = TimerRegistry::new();
        let id = reg.register(mins(2), Repeat::Once, "retry");

        assert!(drain(&mut reg, mins(1)).is_empty());
        assert_eq!(drain(&mut reg, mins(2)), vec!["retry"]);
        assert!(!reg.is_live(id));
        assert!(reg.is_empty());
        assert!(drain(&mut reg, mins(10)).is_empty());
    }

    #[test]
    fn repeating_task_rearms_each_period() {
        let mut reg = TimerRegistry::new();
        reg.register(mins(3), Repeat::Every, "reload");

        assert_eq!(drain(&mut reg, mins(10)).len(), 3);
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.next_deadline(), Some(mins(12)));
    }

    #[test]
    fn cancel_all_is_idempotent_on_empty_registry() {
        let mut reg: TimerRegistry<&'static str> = TimerRegistry::new();
        reg.cancel_all();
        reg.cancel_all();
        assert!(reg.is_empty());
        assert_eq!(reg.next_deadline(), None);
    }

    #[test]
    fn cancelled_task_never_fires() {
        let mut reg = TimerRegistry::new();
        let a = reg.register(mins(1), Repeat::Once, "a");
        reg.register(mins(1), Repeat::Once, "b");
        assert!(reg.cancel(a));
        assert!(!reg.cancel(a));
        assert_eq!(drain(&mut reg, mins(5)), vec!["b"]);
    }

    #[test]
    fn equal_deadlines_fire_in_registration_order() {
        let mut reg = TimerRegistry::new();
        reg.register(mins(1), Repeat::Once, "first");
        reg.register(mins(1), Repeat::Once, "second");
        assert_eq!(drain(&mut reg, mins(1)), vec!["first", "second"]);
    }

    #[test]
    fn suspended_task_restarts_full_period_on_resume() {
        let mut reg = TimerRegistry::new();
        let id = reg.register(mins(5), Repeat::Every, "rotate");

        assert!(drain(&mut reg, mins(4)).is_empty());
        reg.suspend(id);
        assert!(reg.is_suspended(id));
        assert!(drain(&mut reg, mins(6)).is_empty());

        reg.resume(id);
        assert_eq!(reg.next_deadline(), Some(mins(11)));
        assert_eq!(drain(&mut reg, mins(11)), vec!["rotate"]);
    }

    #[test]
    fn resume_leaves_armed_task_untouched() {
        let mut reg = TimerRegistry::new();
        let id = reg.register(mins(5), Repeat::Once, "idle");
        drain(&mut reg, mins(3));
        reg.resume(id);
        assert_eq!(reg.next_deadline(), Some(mins(5)));
    }

    #[test]
    fn suspend_all_then_resume_all() {
        let mut reg = TimerRegistry::new();
        reg.register(mins(1), Repeat::Every, "a");
        reg.register(mins(2), Repeat::Once, "b");
        reg.suspend_all();
        assert_eq!(reg.next_deadline(), None);
        assert_eq!(reg.len(), 2);

        drain(&mut reg, mins(10));
        reg.resume_all();
        assert_eq!(drain(&mut reg, mins(12)), vec!["a", "b", "a"]);
    }
}
