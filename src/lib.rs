//! # Kiosker Core Library
//!
//! Presentation scheduler for an unattended, always-on kiosk display. The
//! device shows one or two web content regions, reloads and rotates them on
//! timers, swaps in a screensaver after a period of inactivity, and recovers
//! from network loss on its own.
//!
//! ## Design Philosophy
//!
//! ### Single Event Context
//! Everything runs on one thread. Timers, touch input and download results
//! are all delivered to [`orchestrator::Kiosk`] one at a time, so no engine
//! ever needs a lock. The timer registry runs on a virtual clock that the
//! runtime loop (or a test) advances explicitly.
//!
//! ### Teardown Before Schedule
//! Every presentation cycle cancels every timer and destroys every view
//! before anything new is scheduled. Repeated refreshes can never leave two
//! reload timers racing for the same view.
//!
//! ### Degrade, Never Crash
//! Offline devices retry every two minutes, failed downloads fall back to
//! the last configuration that worked, and invalid input only produces a
//! status message.
//!
//! ## Data Flow
//! 1. **Setup**: a base configuration source is entered once and persisted
//! 2. **Download**: `{base}/{device_id}.json`, falling back to `{base}/base.json`
//! 3. **Present**: [`rotation`] builds the content slots, [`screensaver`]
//!    starts counting idle time
//! 4. **Maintain**: a hidden five-tap gesture suspends everything and opens
//!    the maintenance settings

pub mod collaborators;
pub mod config;
pub mod configuration;
pub mod console;
pub mod device_state;
pub mod fetch;
pub mod network;
pub mod orchestrator;
pub mod rotation;
pub mod screensaver;
pub mod store;
pub mod tap;
pub mod timer;

#[cfg(test)]
mod tests;

pub use configuration::{Configuration, Layout, PageList};
pub use orchestrator::{Collaborators, Kiosk, PresentationState};
