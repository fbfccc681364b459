//! # Screensaver Engine
//!
//! ```text
//!            idle timer fires                 duration timer fires
//!   Idle ───────────────────────▶ Active ──────────────────────────▶ Idle
//!    ▲ │                                                               (refresh)
//!    └─┘ start_idle_timer()
//! ```
//!
//! The engine is inert unless the configuration gives both an idle period
//! and an active length. Activation swaps the normal content for one random
//! screensaver page at full brightness; deactivation restores brightness and
//! asks the orchestrator for a full refresh, since the normal slots were
//! destroyed on the way in.
//!
//! Standby always wins: an idle timer that fires during standby is dropped
//! and nothing is re-armed until standby ends and a refresh configures the
//! engine again.

use crate::collaborators::{Brightness, ContentSource, ContentView, ViewHandle};
use crate::configuration::{Configuration, PageList};
use crate::device_state::{DeviceFlags, ScreenSavingFlag};
use crate::timer::{Repeat, TaskId, TimerEvent, Timers};
use rand::rngs::StdRng;
use rand::Rng;
use std::time::Duration;
use tracing::{debug, info};

/// Externally visible screensaver phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScreensaverState {
    Inert,
    Idle,
    Active,
}

#[derive(Debug)]
enum Phase {
    Inert,
    Idle { idle_task: Option<TaskId> },
    Active { end_task: TaskId, view: ViewHandle },
}

#[derive(Debug)]
pub struct Screensaver {
    flag: ScreenSavingFlag,
    rng: StdRng,
    idle_period: Duration,
    active_length: Duration,
    error_reload: Duration,
    pages: PageList,
    phase: Phase,
}

impl Screensaver {
    pub fn new(flag: ScreenSavingFlag, rng: StdRng) -> Self {
        Self {
            flag,
            rng,
            idle_period: Duration::ZERO,
            active_length: Duration::ZERO,
            error_reload: Duration::ZERO,
            pages: PageList::default(),
            phase: Phase::Inert,
        }
    }

    pub fn state(&self) -> ScreensaverState {
        match self.phase {
            Phase::Inert => ScreensaverState::Inert,
            Phase::Idle { .. } => ScreensaverState::Idle,
            Phase::Active { .. } => ScreensaverState::Active,
        }
    }

    /// Outstanding idle or duration task, if any.
    pub fn pending_task(&self) -> Option<TaskId> {
        match self.phase {
            Phase::Inert => None,
            Phase::Idle { idle_task } => idle_task,
            Phase::Active { end_task, .. } => Some(end_task),
        }
    }

    /// Take timing and pages from a new configuration and start counting idle
    /// time. Expects the previous cycle to be torn down already.
    pub fn configure(&mut self, config: &Configuration, timers: &mut Timers) {
        if let Some(task) = self.pending_task() {
            timers.cancel(task);
        }
        self.pages = config.screensaver_pages.clone();
        self.error_reload = config.error_reload_period();
        match config.screensaver_timing() {
            Some((idle, length)) => {
                self.idle_period = idle;
                self.active_length = length;
                self.phase = Phase::Idle { idle_task: None };
                self.start_idle_timer(timers);
            }
            None => {
                debug!("screensaver not configured");
                self.phase = Phase::Inert;
            }
        }
    }

    /// (Re)start the idle countdown. Any previous idle timer is cancelled
    /// first so two countdowns can never race. No-op while active or inert.
    pub fn start_idle_timer(&mut self, timers: &mut Timers) {
        let Phase::Idle { idle_task } = &mut self.phase else {
            return;
        };
        if let Some(task) = idle_task.take() {
            timers.cancel(task);
        }
        if self.flag.in_standby_period() {
            debug!("in standby, idle timer not armed");
            return;
        }
        let task = timers.register(self.idle_period, Repeat::Once, TimerEvent::ScreensaverIdle);
        debug!(task = %task, period = ?self.idle_period, "screensaver idle timer armed");
        *idle_task = Some(task);
    }

    /// Cancel the idle countdown without leaving the idle phase.
    pub fn pause_idle_timer(&mut self, timers: &mut Timers) {
        if let Phase::Idle { idle_task } = &mut self.phase {
            if let Some(task) = idle_task.take() {
                timers.cancel(task);
            }
        }
    }

    /// The idle timer fired. Returns true when the screensaver should
    /// activate; the caller then clears the display and calls
    /// [`Screensaver::activate`].
    pub fn idle_elapsed(&mut self, task: TaskId) -> bool {
        let Phase::Idle { idle_task } = &mut self.phase else {
            debug!(task = %task, "idle fire while not idle, ignored");
            return false;
        };
        if *idle_task != Some(task) {
            debug!(task = %task, "stale idle timer, ignored");
            return false;
        }
        *idle_task = None;

        if self.flag.in_standby_period() {
            debug!("idle timer fired in standby, dropped");
            return false;
        }
        if self.flag.is_user_interacting() {
            debug!("idle timer fired during interaction, dropped");
            return false;
        }
        if self.pages.is_empty() {
            debug!("no screensaver pages, dropped");
            return false;
        }
        true
    }

    /// Show a random screensaver page fullscreen at maximum brightness.
    pub fn activate(
        &mut self,
        view: &mut dyn ContentView,
        brightness: &mut dyn Brightness,
        timers: &mut Timers,
    ) {
        let pairs = self.pages.page_count();
        if pairs == 0 {
            return;
        }
        let index = self.rng.gen_range(0..pairs) * 2;
        let Some(page) = self.pages.page(index) else {
            return;
        };

        self.flag.set(true);
        let handle = view.create_slot_view(ContentSource::Screensaver, 1.0, self.error_reload);
        view.load_url(handle, page.url);
        brightness.undim_device();
        info!(title = page.title, url = page.url, "starting screensaver");

        let end_task = timers.register(self.active_length, Repeat::Once, TimerEvent::ScreensaverEnd);
        self.phase = Phase::Active {
            end_task,
            view: handle,
        };
    }

    /// The active window elapsed. Returns true when the caller must refresh
    /// the presentation.
    pub fn length_elapsed(
        &mut self,
        task: TaskId,
        view: &mut dyn ContentView,
        brightness: &mut dyn Brightness,
    ) -> bool {
        match self.phase {
            Phase::Active { end_task, view: handle } if end_task == task => {
                info!("stopping screensaver");
                self.deactivate(handle, view, brightness);
                true
            }
            _ => {
                debug!(task = %task, "stale screensaver end, ignored");
                false
            }
        }
    }

    /// Cancel whatever timer is outstanding. When the screensaver was showing
    /// it is taken down and true is returned: the caller owes exactly one
    /// refresh. Stopping an idle engine returns false.
    pub fn stop(
        &mut self,
        view: &mut dyn ContentView,
        brightness: &mut dyn Brightness,
        timers: &mut Timers,
    ) -> bool {
        match self.phase {
            Phase::Inert => false,
            Phase::Idle { idle_task } => {
                if let Some(task) = idle_task {
                    timers.cancel(task);
                }
                self.phase = Phase::Idle { idle_task: None };
                false
            }
            Phase::Active { end_task, view: handle } => {
                timers.cancel(end_task);
                self.deactivate(handle, view, brightness);
                true
            }
        }
    }

    /// Stop and forget the configuration until the next `configure`.
    pub fn shutdown(
        &mut self,
        view: &mut dyn ContentView,
        brightness: &mut dyn Brightness,
        timers: &mut Timers,
    ) {
        self.stop(view, brightness, timers);
        self.phase = Phase::Inert;
    }

    fn deactivate(
        &mut self,
        handle: ViewHandle,
        view: &mut dyn ContentView,
        brightness: &mut dyn Brightness,
    ) {
        self.flag.set(false);
        brightness.dim_device();
        view.destroy(handle);
        self.phase = Phase::Idle { idle_task: None };
    }
}
