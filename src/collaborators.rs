//! # External Collaborators
//!
//! Narrow interfaces the presentation scheduler drives but does not
//! implement: the content view, display brightness, network reachability and
//! the persisted device settings. The binary wires console/file/TCP
//! implementations; tests use recording fakes.

use crate::configuration::Configuration;
use std::time::Duration;
use thiserror::Error;

/// Opaque handle to a view created by the [`ContentView`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ViewHandle(pub u64);

/// Which page list a view is bound to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ContentSource {
    Home,
    Sites,
    Screensaver,
}

/// Renders content regions and status text.
pub trait ContentView {
    /// Create a region taking `weight` of the screen. The view owns
    /// reload-on-error using `error_reload`.
    fn create_slot_view(
        &mut self,
        source: ContentSource,
        weight: f32,
        error_reload: Duration,
    ) -> ViewHandle;
    fn load_url(&mut self, view: ViewHandle, url: &str);
    /// Re-fetch and redraw whatever the view currently shows.
    fn reload(&mut self, view: ViewHandle);
    fn destroy(&mut self, view: ViewHandle);
    /// Reveal the navigation overlay of a view.
    fn show_navigation(&mut self, view: ViewHandle);
    fn show_status(&mut self, main: &str, sub: &str);
    /// Show the one-field base source input used during initial setup.
    fn prompt_base_source(&mut self);
}

/// Display brightness control. Only the screensaver calls this.
pub trait Brightness {
    fn dim_device(&mut self);
    fn undim_device(&mut self);
}

/// Synchronous, side-effect free reachability check.
pub trait Connectivity {
    fn is_network_available(&self) -> bool;
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("settings IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("settings encode: {0}")]
    Encode(#[from] toml::ser::Error),

    #[error("safe settings encode: {0}")]
    Json(#[from] serde_json::Error),
}

/// Persisted device identity, base source and last good configuration.
pub trait SettingsStore {
    fn device_id(&self) -> String;
    fn set_device_id(&mut self, id: &str) -> Result<(), StoreError>;
    fn base_source(&self) -> Option<String>;
    fn set_base_source(&mut self, url: Option<&str>) -> Result<(), StoreError>;
    fn load_safe_settings(&self) -> Option<Configuration>;
    fn save_safe_settings(&mut self, config: &Configuration) -> Result<(), StoreError>;
    fn clear_safe_settings(&mut self) -> Result<(), StoreError>;
}
