//! # Device State
//!
//! Process-wide presentation flags shared by the engines. The state object is
//! created once and split into capabilities: every component can read every
//! flag through [`DeviceFlags`], but only the holder of a flag's writer can
//! change it. Writers are deliberately not `Clone`, so ownership of a flag is
//! visible in the type of whoever holds it.
//!
//! | Flag                  | Writer             | Owner                   |
//! |-----------------------|--------------------|-------------------------|
//! | `in_standby_period`   | [`StandbyFlag`]    | standby caller (`Kiosk`) |
//! | `is_screen_saving`    | [`ScreenSavingFlag`] | screensaver engine    |
//! | `is_user_interacting` | [`InteractionFlag`] | touch routing (`Kiosk`) |
//! | `is_initial_setup`    | [`SetupFlag`]      | orchestrator            |
//!
//! Everything runs on one logical thread, so the flags are plain `Cell`s
//! behind an `Rc`.

use std::cell::Cell;
use std::rc::Rc;

#[derive(Debug, Default)]
struct DeviceState {
    in_standby_period: Cell<bool>,
    is_screen_saving: Cell<bool>,
    is_user_interacting: Cell<bool>,
    is_initial_setup: Cell<bool>,
}

/// Read access to every device flag.
pub trait DeviceFlags {
    fn in_standby_period(&self) -> bool;
    fn is_screen_saving(&self) -> bool;
    fn is_user_interacting(&self) -> bool;
    fn is_initial_setup(&self) -> bool;
}

macro_rules! read_flags {
    ($ty:ty) => {
        impl DeviceFlags for $ty {
            fn in_standby_period(&self) -> bool {
                self.0.in_standby_period.get()
            }
            fn is_screen_saving(&self) -> bool {
                self.0.is_screen_saving.get()
            }
            fn is_user_interacting(&self) -> bool {
                self.0.is_user_interacting.get()
            }
            fn is_initial_setup(&self) -> bool {
                self.0.is_initial_setup.get()
            }
        }
    };
}

/// Shared read-only view of the device flags.
#[derive(Clone, Debug)]
pub struct FlagReader(Rc<DeviceState>);

/// Write capability for `is_screen_saving`.
#[derive(Debug)]
pub struct ScreenSavingFlag(Rc<DeviceState>);

/// Write capability for `is_user_interacting`.
#[derive(Debug)]
pub struct InteractionFlag(Rc<DeviceState>);

/// Write capability for `in_standby_period`.
#[derive(Debug)]
pub struct StandbyFlag(Rc<DeviceState>);

/// Write capability for `is_initial_setup`.
#[derive(Debug)]
pub struct SetupFlag(Rc<DeviceState>);

read_flags!(FlagReader);
read_flags!(ScreenSavingFlag);
read_flags!(InteractionFlag);
read_flags!(StandbyFlag);
read_flags!(SetupFlag);

impl ScreenSavingFlag {
    pub fn set(&self, value: bool) {
        self.0.is_screen_saving.set(value);
    }
}

impl InteractionFlag {
    pub fn set(&self, value: bool) {
        self.0.is_user_interacting.set(value);
    }
}

impl StandbyFlag {
    pub fn set(&self, value: bool) {
        self.0.in_standby_period.set(value);
    }
}

impl SetupFlag {
    pub fn set(&self, value: bool) {
        self.0.is_initial_setup.set(value);
    }
}

/// The device flags split into one reader and one writer per flag.
#[derive(Debug)]
pub struct DeviceCapabilities {
    pub reader: FlagReader,
    pub screen_saving: ScreenSavingFlag,
    pub interaction: InteractionFlag,
    pub standby: StandbyFlag,
    pub setup: SetupFlag,
}

impl DeviceCapabilities {
    /// Create a fresh device state with every flag cleared.
    pub fn new() -> Self {
        let state = Rc::new(DeviceState::default());
        Self {
            reader: FlagReader(Rc::clone(&state)),
            screen_saving: ScreenSavingFlag(Rc::clone(&state)),
            interaction: InteractionFlag(Rc::clone(&state)),
            standby: StandbyFlag(Rc::clone(&state)),
            setup: SetupFlag(state),
        }
    }
}

impl Default for DeviceCapabilities {
    fn default() -> Self {
        Self::new()
    }
}
