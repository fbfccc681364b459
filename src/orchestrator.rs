//! # Refresh/Recovery Orchestrator
//!
//! [`Kiosk`] is the top-level state machine of the device. Every time the
//! screen should be (re)built (startup, resume, reconfiguration, the end of
//! a screensaver run, a network retry, an explicit reset) it runs one
//! presentation cycle:
//!
//! 1. **Setup gate**: without a base configuration source the device shows a
//!    one-field prompt and waits for [`Kiosk::submit_base_source`].
//! 2. **Teardown**: every registered timer is cancelled and every view is
//!    destroyed *before* anything new is scheduled.
//! 3. **Connectivity**: offline devices show a status message and arm a
//!    single two-minute retry that re-enters the cycle.
//! 4. **Fetch**: online devices publish a [`FetchRequest`]. The runtime loop
//!    performs it and hands the result back through
//!    [`Kiosk::on_configuration`]; results for superseded requests are
//!    dropped.
//! 5. **Present**: the configuration goes to the rotation and screensaver
//!    engines, which register their own timers.
//!
//! Touch events are routed through here too: they pause the engines while a
//! finger is down and feed the hidden maintenance gesture.
//!
//! Nothing in this module is fatal. Every failure degrades to a status
//! message and the device keeps retrying or idling.

use crate::collaborators::{
    Brightness, ContentView, Connectivity, SettingsStore, StoreError, ViewHandle,
};
use crate::configuration::Configuration;
use crate::device_state::{
    DeviceCapabilities, DeviceFlags, FlagReader, InteractionFlag, SetupFlag, StandbyFlag,
};
use crate::fetch::FetchError;
use crate::rotation::ContentRotation;
use crate::screensaver::{Screensaver, ScreensaverState};
use crate::tap::TapDetector;
use crate::timer::{Repeat, TaskId, TimerEvent, Timers};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Delay before re-checking connectivity after finding the device offline.
pub const NETWORK_RETRY: Duration = Duration::from_secs(2 * 60);

/// Where the presentation cycle currently stands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PresentationState {
    /// No base configuration source yet; the setup prompt is showing
    AwaitingInitialSetup,
    /// Checking the network or waiting for a configuration download
    CheckingConnectivity,
    /// Offline; `retry` re-enters the cycle
    AwaitingNetwork { retry: TaskId },
    Presenting,
    /// Maintenance settings have the screen; every task is suspended
    Maintenance,
    Standby,
    /// Moved to the background; nothing is shown
    Background,
}

/// Errors from setup and maintenance input.
#[derive(Error, Debug)]
pub enum SetupError {
    #[error("not a valid base url: {0}")]
    InvalidUrl(String),

    #[error("device is not waiting for initial setup")]
    NotInSetup,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A configuration download the runtime loop should perform.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchRequest {
    pub ticket: u64,
    pub base_source: String,
    pub device_id: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TouchKind {
    Down,
    Move,
    Up,
}

/// Data handed to the maintenance settings surface on unlock.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MaintenanceRequest {
    pub device_id: String,
    pub base_source: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TouchOutcome {
    Handled,
    /// The maintenance gesture completed; show the settings surface
    UnlockMaintenance(MaintenanceRequest),
}

/// How the maintenance settings surface was closed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MaintenanceOutcome {
    /// Closed without changes (or with a wrong password)
    Cancelled,
    Applied {
        device_id: Option<String>,
        base_source: Option<String>,
    },
    /// Forget safe settings and the base source, then run initial setup
    Reset,
}

/// The external collaborators a [`Kiosk`] drives.
pub struct Collaborators {
    pub view: Box<dyn ContentView>,
    pub brightness: Box<dyn Brightness>,
    pub network: Box<dyn Connectivity>,
    pub store: Box<dyn SettingsStore>,
}

/// Check a base source typed into the setup prompt or maintenance settings.
pub fn validate_base_source(input: &str) -> Result<String, SetupError> {
    let trimmed = input.trim();
    let url = reqwest::Url::parse(trimmed).map_err(|_| SetupError::InvalidUrl(trimmed.into()))?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(SetupError::InvalidUrl(trimmed.into()));
    }
    Ok(trimmed.trim_end_matches('/').to_string())
}

pub struct Kiosk {
    view: Box<dyn ContentView>,
    brightness: Box<dyn Brightness>,
    network: Box<dyn Connectivity>,
    store: Box<dyn SettingsStore>,
    timers: Timers,
    flags: FlagReader,
    interaction: InteractionFlag,
    standby: StandbyFlag,
    setup: SetupFlag,
    rotation: ContentRotation,
    screensaver: Screensaver,
    taps: TapDetector,
    state: PresentationState,
    before_maintenance: PresentationState,
    refresh_on_return: bool,
    next_ticket: u64,
    awaiting: Option<u64>,
    pending_fetch: Option<FetchRequest>,
    configuration: Option<Configuration>,
}

impl Kiosk {
    pub fn new(collaborators: Collaborators) -> Self {
        Self::with_rng(collaborators, StdRng::from_entropy())
    }

    /// Build with an explicit random source for screensaver page choice.
    pub fn with_rng(collaborators: Collaborators, rng: StdRng) -> Self {
        let DeviceCapabilities {
            reader,
            screen_saving,
            interaction,
            standby,
            setup,
        } = DeviceCapabilities::new();
        setup.set(collaborators.store.base_source().is_none());

        Self {
            view: collaborators.view,
            brightness: collaborators.brightness,
            network: collaborators.network,
            store: collaborators.store,
            timers: Timers::new(),
            rotation: ContentRotation::new(reader.clone()),
            screensaver: Screensaver::new(screen_saving, rng),
            flags: reader,
            interaction,
            standby,
            setup,
            taps: TapDetector::default(),
            state: PresentationState::Background,
            before_maintenance: PresentationState::Background,
            refresh_on_return: false,
            next_ticket: 0,
            awaiting: None,
            pending_fetch: None,
            configuration: None,
        }
    }

    pub fn state(&self) -> PresentationState {
        self.state
    }

    pub fn flags(&self) -> &FlagReader {
        &self.flags
    }

    pub fn rotation(&self) -> &ContentRotation {
        &self.rotation
    }

    pub fn screensaver_state(&self) -> ScreensaverState {
        self.screensaver.state()
    }

    pub fn timers(&self) -> &Timers {
        &self.timers
    }

    /// Configuration currently on screen.
    pub fn configuration(&self) -> Option<&Configuration> {
        self.configuration.as_ref()
    }

    /// Clock of the timer registry.
    pub fn now(&self) -> Duration {
        self.timers.now()
    }

    pub fn next_deadline(&mut self) -> Option<Duration> {
        self.timers.next_deadline()
    }

    // -- Lifecycle --

    /// First presentation after process start.
    pub fn start(&mut self) {
        info!("kiosk starting");
        self.refresh();
    }

    /// The device came back to the foreground.
    pub fn resume(&mut self) {
        debug!("resume");
        self.refresh();
    }

    /// The device left the foreground; drop the presentation.
    pub fn move_to_background(&mut self) {
        if self.flags.in_standby_period() {
            return;
        }
        debug!("moving to background");
        self.teardown();
        if self.state == PresentationState::Maintenance {
            self.before_maintenance = PresentationState::Background;
            self.refresh_on_return = true;
        } else {
            self.state = PresentationState::Background;
        }
    }

    /// Externally requested refresh: stop the screensaver and rebuild exactly
    /// once.
    pub fn request_refresh(&mut self) {
        if self.state == PresentationState::Maintenance {
            debug!("refresh requested during maintenance, ignored");
            return;
        }
        self.screensaver
            .stop(&mut *self.view, &mut *self.brightness, &mut self.timers);
        self.refresh();
    }

    /// Drop the presentation until [`Kiosk::exit_standby`]. An open
    /// maintenance surface stays open; the standby state is taken over when
    /// it closes.
    pub fn enter_standby(&mut self) {
        info!("entering standby");
        self.standby.set(true);
        self.teardown();
        if self.state == PresentationState::Maintenance {
            self.before_maintenance = PresentationState::Standby;
            self.refresh_on_return = true;
        } else {
            self.state = PresentationState::Standby;
        }
    }

    pub fn exit_standby(&mut self) {
        info!("leaving standby");
        self.standby.set(false);
        match self.state {
            PresentationState::Standby => self.state = PresentationState::Background,
            PresentationState::Maintenance => {
                if self.before_maintenance == PresentationState::Standby {
                    self.before_maintenance = PresentationState::Background;
                }
            }
            _ => {}
        }
        self.refresh();
    }

    // -- Presentation cycle --

    /// Run one presentation cycle.
    fn refresh(&mut self) {
        if self.state == PresentationState::Maintenance {
            debug!("maintenance open, refresh deferred");
            return;
        }
        if self.flags.in_standby_period() {
            debug!("in standby, refresh deferred");
            return;
        }
        self.teardown();

        let base_source = match self.store.base_source() {
            Some(base) if !self.flags.is_initial_setup() => base,
            _ => {
                self.enter_initial_setup();
                return;
            }
        };

        info!("refreshing device");
        self.state = PresentationState::CheckingConnectivity;
        if !self.network.is_network_available() {
            warn!(retry_in = ?NETWORK_RETRY, "no internet");
            self.view.show_status(
                "No internet",
                "Please refresh from settings. Auto retry in 2 mins.",
            );
            let retry = self
                .timers
                .register(NETWORK_RETRY, Repeat::Once, TimerEvent::NetworkRetry);
            self.state = PresentationState::AwaitingNetwork { retry };
            return;
        }

        self.view.show_status("Downloading settings", "Starting download.");
        self.next_ticket += 1;
        let request = FetchRequest {
            ticket: self.next_ticket,
            base_source,
            device_id: self.store.device_id(),
        };
        debug!(ticket = request.ticket, base = %request.base_source, "settings download requested");
        self.awaiting = Some(request.ticket);
        self.pending_fetch = Some(request);
    }

    fn enter_initial_setup(&mut self) {
        info!("initial setup required");
        self.setup.set(true);
        self.state = PresentationState::AwaitingInitialSetup;
        self.view.show_status("Initial Run", "Please set the base url.");
        self.view.prompt_base_source();
    }

    /// Cancel every timer and destroy every view.
    fn teardown(&mut self) {
        self.timers.cancel_all();
        self.rotation.teardown(&mut *self.view, &mut self.timers);
        self.screensaver
            .shutdown(&mut *self.view, &mut *self.brightness, &mut self.timers);
        self.awaiting = None;
        self.pending_fetch = None;
    }

    /// Next download for the runtime loop to perform, if one is pending.
    pub fn take_fetch_request(&mut self) -> Option<FetchRequest> {
        self.pending_fetch.take()
    }

    /// Result of the download issued under `ticket`.
    pub fn on_configuration(&mut self, ticket: u64, result: Result<Configuration, FetchError>) {
        if self.awaiting != Some(ticket) {
            debug!(ticket, "result for superseded download dropped");
            return;
        }
        self.awaiting = None;

        match result {
            Ok(config) => {
                if let Err(err) = self.store.save_safe_settings(&config) {
                    warn!(error = %err, "could not persist safe settings");
                }
                self.present(config);
            }
            Err(err) => {
                error!(error = %err, "settings download failed");
                match self.store.load_safe_settings() {
                    Some(safe) => {
                        warn!("presenting last known safe settings");
                        self.present(safe);
                    }
                    None => self.view.show_status("Downloading settings", &err.to_string()),
                }
            }
        }
    }

    fn present(&mut self, config: Configuration) {
        self.rotation
            .apply(&config, &mut *self.view, &mut self.timers);
        self.screensaver.configure(&config, &mut self.timers);
        self.configuration = Some(config);
        self.state = PresentationState::Presenting;
        info!(tasks = self.timers.len(), "presenting");
    }

    /// Fire every timer due at or before `now`.
    pub fn advance_to(&mut self, now: Duration) {
        while let Some((task, event)) = self.timers.pop_due(now) {
            self.on_timer(task, event);
        }
    }

    fn on_timer(&mut self, task: TaskId, event: TimerEvent) {
        debug!(task = %task, ?event, "timer fired");
        match event {
            TimerEvent::ReloadSlot(source) => {
                self.rotation
                    .on_reload(source, task, &mut *self.view, &mut self.timers)
            }
            TimerEvent::RotateSecondary => {
                self.rotation
                    .on_rotate(task, &mut *self.view, &mut self.timers)
            }
            TimerEvent::ScreensaverIdle => {
                if self.screensaver.idle_elapsed(task) {
                    self.rotation.teardown(&mut *self.view, &mut self.timers);
                    self.screensaver
                        .activate(&mut *self.view, &mut *self.brightness, &mut self.timers);
                }
            }
            TimerEvent::ScreensaverEnd => {
                if self
                    .screensaver
                    .length_elapsed(task, &mut *self.view, &mut *self.brightness)
                {
                    self.refresh();
                }
            }
            TimerEvent::NetworkRetry => match self.state {
                PresentationState::AwaitingNetwork { retry } if retry == task => {
                    info!("retrying network");
                    self.refresh();
                }
                _ => debug!(task = %task, "stale network retry"),
            },
        }
    }

    // -- Setup and maintenance --

    /// Input from the initial setup prompt.
    pub fn submit_base_source(&mut self, input: &str) -> Result<(), SetupError> {
        if self.state != PresentationState::AwaitingInitialSetup {
            return Err(SetupError::NotInSetup);
        }
        let base = match validate_base_source(input) {
            Ok(base) => base,
            Err(err) => {
                self.view
                    .show_status("Initial Run", "You did not enter a valid base url");
                return Err(err);
            }
        };
        self.store.set_base_source(Some(&base))?;
        self.setup.set(false);
        info!(base = %base, "base url set");
        self.refresh();
        Ok(())
    }

    /// Route a touch on `target` at clock time `at`.
    pub fn on_touch(&mut self, target: ViewHandle, kind: TouchKind, at: Duration) -> TouchOutcome {
        if self.state == PresentationState::Maintenance {
            return TouchOutcome::Handled;
        }
        match kind {
            TouchKind::Down => {
                self.interaction.set(true);
                if self.taps.on_touch_down(at) {
                    return self.unlock_maintenance();
                }
                self.rotation.suspend(&mut self.timers);
                if self.screensaver.state() == ScreensaverState::Active {
                    if self
                        .screensaver
                        .stop(&mut *self.view, &mut *self.brightness, &mut self.timers)
                    {
                        self.refresh();
                    }
                } else {
                    self.screensaver.pause_idle_timer(&mut self.timers);
                }
            }
            TouchKind::Move => {
                if let Some(slot) = self.rotation.slot_for_view(target) {
                    self.view.show_navigation(slot.view);
                }
            }
            TouchKind::Up => {
                self.interaction.set(false);
                self.rotation.resume(&mut self.timers);
                self.screensaver.start_idle_timer(&mut self.timers);
            }
        }
        TouchOutcome::Handled
    }

    fn unlock_maintenance(&mut self) -> TouchOutcome {
        info!("maintenance access unlocked");
        self.interaction.set(false);
        let was_screen_saving =
            self.screensaver
                .stop(&mut *self.view, &mut *self.brightness, &mut self.timers);
        let fetch_in_flight = self.awaiting.is_some() || self.pending_fetch.is_some();
        self.refresh_on_return = was_screen_saving || fetch_in_flight;
        self.awaiting = None;
        self.pending_fetch = None;
        self.timers.suspend_all();

        self.before_maintenance = self.state;
        self.state = PresentationState::Maintenance;
        TouchOutcome::UnlockMaintenance(MaintenanceRequest {
            device_id: self.store.device_id(),
            base_source: self.store.base_source(),
        })
    }

    /// The maintenance settings surface closed.
    pub fn close_maintenance(&mut self, outcome: MaintenanceOutcome) -> Result<(), SetupError> {
        if self.state != PresentationState::Maintenance {
            warn!("maintenance closed while not open");
            return Ok(());
        }
        self.state = self.before_maintenance;
        let refresh_owed = std::mem::take(&mut self.refresh_on_return);

        match outcome {
            MaintenanceOutcome::Cancelled => {
                if refresh_owed {
                    self.refresh();
                } else {
                    debug!("maintenance cancelled, resuming tasks");
                    self.timers.resume_all();
                    self.rotation.reload_all(&mut *self.view);
                    self.screensaver.start_idle_timer(&mut self.timers);
                }
                Ok(())
            }
            MaintenanceOutcome::Applied {
                device_id,
                base_source,
            } => {
                let stored = self.store_maintenance_settings(device_id, base_source);
                self.refresh();
                stored
            }
            MaintenanceOutcome::Reset => {
                info!("resetting device");
                let cleared = self
                    .store
                    .clear_safe_settings()
                    .and_then(|()| self.store.set_base_source(None));
                self.configuration = None;
                self.setup.set(true);
                self.refresh();
                cleared.map_err(SetupError::from)
            }
        }
    }

    fn store_maintenance_settings(
        &mut self,
        device_id: Option<String>,
        base_source: Option<String>,
    ) -> Result<(), SetupError> {
        if let Some(id) = device_id {
            self.store.set_device_id(&id)?;
        }
        if let Some(input) = base_source {
            let base = validate_base_source(&input)?;
            self.store.set_base_source(Some(&base))?;
            self.setup.set(false);
        }
        Ok(())
    }
}
