//! Recording fakes for the external collaborators.
//!
//! Every fake is a cheap handle over shared state, so a test can box one
//! clone into a [`Kiosk`](crate::orchestrator::Kiosk) and keep another to
//! inspect what happened.

use crate::collaborators::{
    Brightness, ContentSource, ContentView, Connectivity, SettingsStore, StoreError, ViewHandle,
};
use crate::configuration::Configuration;
use std::cell::{Cell, Ref, RefCell};
use std::collections::HashSet;
use std::rc::Rc;
use std::time::Duration;

#[derive(Clone, Debug, PartialEq)]
pub enum ViewEvent {
    Created {
        view: ViewHandle,
        source: ContentSource,
        weight: f32,
    },
    Loaded(ViewHandle, String),
    Reloaded(ViewHandle),
    Destroyed(ViewHandle),
    Navigation(ViewHandle),
    Status(String, String),
    Prompt,
}

#[derive(Debug, Default)]
pub struct ViewLog {
    next_handle: u64,
    live: HashSet<ViewHandle>,
    pub events: Vec<ViewEvent>,
}

impl ViewLog {
    pub fn loaded_urls(&self) -> Vec<String> {
        self.events
            .iter()
            .filter_map(|e| match e {
                ViewEvent::Loaded(_, url) => Some(url.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn reload_count(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, ViewEvent::Reloaded(_)))
            .count()
    }

    pub fn live_views(&self) -> usize {
        self.live.len()
    }

    /// Sources and weights of every view ever created, in order.
    pub fn created(&self) -> Vec<(ContentSource, f32)> {
        self.events
            .iter()
            .filter_map(|e| match e {
                ViewEvent::Created { source, weight, .. } => Some((*source, *weight)),
                _ => None,
            })
            .collect()
    }

    pub fn last_status(&self) -> Option<(String, String)> {
        self.events.iter().rev().find_map(|e| match e {
            ViewEvent::Status(main, sub) => Some((main.clone(), sub.clone())),
            _ => None,
        })
    }

    pub fn prompts(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, ViewEvent::Prompt))
            .count()
    }
}

#[derive(Clone, Debug, Default)]
pub struct RecordingView(Rc<RefCell<ViewLog>>);

impl RecordingView {
    pub fn log(&self) -> Ref<'_, ViewLog> {
        self.0.borrow()
    }

    pub fn clear(&self) {
        self.0.borrow_mut().events.clear();
    }
}

impl ContentView for RecordingView {
    fn create_slot_view(
        &mut self,
        source: ContentSource,
        weight: f32,
        _error_reload: Duration,
    ) -> ViewHandle {
        let mut log = self.0.borrow_mut();
        log.next_handle += 1;
        let view = ViewHandle(log.next_handle);
        log.live.insert(view);
        log.events.push(ViewEvent::Created {
            view,
            source,
            weight,
        });
        view
    }

    fn load_url(&mut self, view: ViewHandle, url: &str) {
        self.0
            .borrow_mut()
            .events
            .push(ViewEvent::Loaded(view, url.to_string()));
    }

    fn reload(&mut self, view: ViewHandle) {
        self.0.borrow_mut().events.push(ViewEvent::Reloaded(view));
    }

    fn destroy(&mut self, view: ViewHandle) {
        let mut log = self.0.borrow_mut();
        assert!(log.live.remove(&view), "{view:?} destroyed twice");
        log.events.push(ViewEvent::Destroyed(view));
    }

    fn show_navigation(&mut self, view: ViewHandle) {
        self.0.borrow_mut().events.push(ViewEvent::Navigation(view));
    }

    fn show_status(&mut self, main: &str, sub: &str) {
        self.0
            .borrow_mut()
            .events
            .push(ViewEvent::Status(main.to_string(), sub.to_string()));
    }

    fn prompt_base_source(&mut self) {
        self.0.borrow_mut().events.push(ViewEvent::Prompt);
    }
}

#[derive(Clone, Debug, Default)]
pub struct RecordingBrightness {
    dims: Rc<Cell<usize>>,
    undims: Rc<Cell<usize>>,
}

impl RecordingBrightness {
    pub fn dims(&self) -> usize {
        self.dims.get()
    }

    pub fn undims(&self) -> usize {
        self.undims.get()
    }
}

impl Brightness for RecordingBrightness {
    fn dim_device(&mut self) {
        self.dims.set(self.dims.get() + 1);
    }

    fn undim_device(&mut self) {
        self.undims.set(self.undims.get() + 1);
    }
}

/// Connectivity switch shared with the test.
#[derive(Clone, Debug)]
pub struct FakeNetwork(Rc<Cell<bool>>);

impl FakeNetwork {
    pub fn new(online: bool) -> Self {
        Self(Rc::new(Cell::new(online)))
    }

    pub fn set_online(&self, online: bool) {
        self.0.set(online);
    }
}

impl Connectivity for FakeNetwork {
    fn is_network_available(&self) -> bool {
        self.0.get()
    }
}

#[derive(Debug, Default)]
pub struct StoredSettings {
    pub device_id: String,
    pub base_source: Option<String>,
    pub safe: Option<Configuration>,
}

#[derive(Clone, Debug, Default)]
pub struct MemoryStore(Rc<RefCell<StoredSettings>>);

impl MemoryStore {
    pub fn with_base(base: &str) -> Self {
        let store = Self::default();
        {
            let mut settings = store.0.borrow_mut();
            settings.device_id = "kiosk-test".to_string();
            settings.base_source = Some(base.to_string());
        }
        store
    }

    pub fn settings(&self) -> Ref<'_, StoredSettings> {
        self.0.borrow()
    }
}

impl SettingsStore for MemoryStore {
    fn device_id(&self) -> String {
        self.0.borrow().device_id.clone()
    }

    fn set_device_id(&mut self, id: &str) -> Result<(), StoreError> {
        self.0.borrow_mut().device_id = id.to_string();
        Ok(())
    }

    fn base_source(&self) -> Option<String> {
        self.0.borrow().base_source.clone()
    }

    fn set_base_source(&mut self, url: Option<&str>) -> Result<(), StoreError> {
        self.0.borrow_mut().base_source = url.map(str::to_string);
        Ok(())
    }

    fn load_safe_settings(&self) -> Option<Configuration> {
        self.0.borrow().safe.clone()
    }

    fn save_safe_settings(&mut self, config: &Configuration) -> Result<(), StoreError> {
        self.0.borrow_mut().safe = Some(config.clone());
        Ok(())
    }

    fn clear_safe_settings(&mut self) -> Result<(), StoreError> {
        self.0.borrow_mut().safe = None;
        Ok(())
    }
}
