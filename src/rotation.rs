//! # Content Rotation Engine
//!
//! Turns a [`Configuration`] into display slots and keeps them fresh:
//!
//! - **Layout**: the home slot and the secondary (sites) slot split the
//!   screen according to [`layout_weight`]. A slot with weight 0 is not
//!   created; a slot whose counterpart has no pages takes the whole screen.
//! - **Reload**: with a reload period each slot owns a repeating task that
//!   redraws its current page. Failed loads are the view's business.
//! - **Rotation**: the sites slot can step through its page list on a timer,
//!   two entries at a time because the list interleaves url and title.
//!
//! While the user touches the screen every task owned here is suspended so a
//! reload never yanks a page out from under them.

use crate::collaborators::{ContentSource, ContentView, ViewHandle};
use crate::configuration::{Configuration, Layout, PageList};
use crate::device_state::{DeviceFlags, FlagReader};
use crate::timer::{Repeat, TaskId, TimerEvent, Timers};
use std::time::Duration;
use tracing::{debug, info};

/// Share of the screen given to the home slot (`main = true`) or the
/// secondary slot for a layout.
pub fn layout_weight(layout: Layout, main: bool) -> f32 {
    match (layout, main) {
        (Layout::Fullscreen, true) => 1.0,
        (Layout::Fullscreen, false) => 0.0,
        (Layout::Half, _) => 0.5,
        (Layout::SixtyForty, true) => 0.6,
        (Layout::SixtyForty, false) => 0.4,
        (Layout::SeventyThirty, true) => 0.7,
        (Layout::SeventyThirty, false) => 0.3,
        (Layout::EightyTwenty, true) => 0.8,
        (Layout::EightyTwenty, false) => 0.2,
    }
}

/// One visible content region.
#[derive(Clone, Debug, PartialEq)]
pub struct DisplaySlot {
    pub source: ContentSource,
    pub view: ViewHandle,
    /// Entry index of the page currently shown (always even)
    pub index: usize,
    pub weight: f32,
    pub reload_task: Option<TaskId>,
}

#[derive(Debug)]
pub struct ContentRotation {
    flags: FlagReader,
    home_pages: PageList,
    site_pages: PageList,
    slots: Vec<DisplaySlot>,
    rotation_task: Option<TaskId>,
}

impl ContentRotation {
    pub fn new(flags: FlagReader) -> Self {
        Self {
            flags,
            home_pages: PageList::default(),
            site_pages: PageList::default(),
            slots: Vec::new(),
            rotation_task: None,
        }
    }

    pub fn slots(&self) -> &[DisplaySlot] {
        &self.slots
    }

    pub fn slot(&self, source: ContentSource) -> Option<&DisplaySlot> {
        self.slots.iter().find(|slot| slot.source == source)
    }

    pub fn slot_for_view(&self, view: ViewHandle) -> Option<&DisplaySlot> {
        self.slots.iter().find(|slot| slot.view == view)
    }

    pub fn rotation_task(&self) -> Option<TaskId> {
        self.rotation_task
    }

    /// Build the slots for `config` and register their timers. Anything left
    /// over from a previous configuration is torn down first.
    pub fn apply(&mut self, config: &Configuration, view: &mut dyn ContentView, timers: &mut Timers) {
        self.teardown(view, timers);
        self.home_pages = config.home_pages.clone();
        self.site_pages = config.site_pages.clone();

        let has_home = !self.home_pages.is_empty();
        let has_sites = !self.site_pages.is_empty();
        let error_reload = config.error_reload_period();
        let reload = config.reload_period();

        if has_home {
            let weight = if has_sites {
                layout_weight(config.layout, true)
            } else {
                1.0
            };
            self.create_slot(ContentSource::Home, weight, error_reload, reload, view, timers);
        }
        if has_sites {
            let weight = if has_home {
                layout_weight(config.layout, false)
            } else {
                1.0
            };
            self.create_slot(ContentSource::Sites, weight, error_reload, reload, view, timers);
        }

        if let Some(period) = config.secondary_cycle_period() {
            if self.site_pages.page_count() > 1 {
                let id = timers.register(period, Repeat::Every, TimerEvent::RotateSecondary);
                debug!(task = %id, ?period, "secondary rotation armed");
                self.rotation_task = Some(id);
            }
        }

        info!(
            slots = self.slots.len(),
            layout = u8::from(config.layout),
            "content slots created"
        );
    }

    fn create_slot(
        &mut self,
        source: ContentSource,
        weight: f32,
        error_reload: Duration,
        reload: Option<Duration>,
        view: &mut dyn ContentView,
        timers: &mut Timers,
    ) {
        if weight <= 0.0 {
            return;
        }
        let pages = match source {
            ContentSource::Sites => &self.site_pages,
            _ => &self.home_pages,
        };
        let Some(first) = pages.page(0) else {
            return;
        };
        let handle = view.create_slot_view(source, weight, error_reload);
        view.load_url(handle, first.url);
        debug!(?source, weight, url = first.url, title = first.title, "slot loaded");

        let reload_task =
            reload.map(|period| timers.register(period, Repeat::Every, TimerEvent::ReloadSlot(source)));
        self.slots.push(DisplaySlot {
            source,
            view: handle,
            index: 0,
            weight,
            reload_task,
        });
    }

    /// Reload timer for `source` fired.
    pub fn on_reload(
        &mut self,
        source: ContentSource,
        task: TaskId,
        view: &mut dyn ContentView,
        timers: &mut Timers,
    ) {
        let owned = self
            .slot(source)
            .filter(|slot| slot.reload_task == Some(task))
            .map(|slot| slot.view);
        let Some(handle) = owned else {
            debug!(task = %task, ?source, "reload for missing slot, cancelling");
            timers.cancel(task);
            return;
        };
        if self.flags.is_user_interacting() {
            debug!(?source, "user interacting, skipping reload");
            return;
        }
        view.reload(handle);
    }

    /// Secondary rotation timer fired.
    pub fn on_rotate(&mut self, task: TaskId, view: &mut dyn ContentView, timers: &mut Timers) {
        if self.rotation_task != Some(task) {
            timers.cancel(task);
            return;
        }
        let len = self.site_pages.len();
        let Some(slot) = self
            .slots
            .iter_mut()
            .find(|slot| slot.source == ContentSource::Sites)
        else {
            debug!(task = %task, "secondary slot gone, rotation cancels itself");
            timers.cancel(task);
            self.rotation_task = None;
            return;
        };
        if len == 0 {
            return;
        }
        slot.index = (slot.index + 2) % len;
        if let Some(page) = self.site_pages.page(slot.index) {
            debug!(index = slot.index, url = page.url, "rotating secondary slot");
            view.load_url(slot.view, page.url);
        }
    }

    fn owned_tasks(&self) -> impl Iterator<Item = TaskId> + '_ {
        self.slots
            .iter()
            .filter_map(|slot| slot.reload_task)
            .chain(self.rotation_task)
    }

    /// Pause every reload/rotation task (touch-down).
    pub fn suspend(&self, timers: &mut Timers) {
        for task in self.owned_tasks() {
            timers.suspend(task);
        }
    }

    /// Restart paused tasks for a full period (touch-up).
    pub fn resume(&self, timers: &mut Timers) {
        for task in self.owned_tasks() {
            timers.resume(task);
        }
    }

    /// Return the home slot to its first page and redraw the others in place.
    pub fn reload_all(&mut self, view: &mut dyn ContentView) {
        for slot in &mut self.slots {
            match (slot.source, self.home_pages.page(0)) {
                (ContentSource::Home, Some(first)) => {
                    slot.index = 0;
                    view.load_url(slot.view, first.url);
                }
                _ => view.reload(slot.view),
            }
        }
    }

    /// Cancel owned tasks and destroy every slot view.
    pub fn teardown(&mut self, view: &mut dyn ContentView, timers: &mut Timers) {
        let tasks: Vec<TaskId> = self.owned_tasks().collect();
        for task in tasks {
            timers.cancel(task);
        }
        self.rotation_task = None;
        for slot in self.slots.drain(..) {
            view.destroy(slot.view);
        }
    }
}
