//! # Console Collaborators
//!
//! Development stand-ins for the real display: view and brightness calls are
//! written to the log instead of a screen, and lines typed on stdin become
//! touch, setup and lifecycle events. Lets the scheduler run headless on any
//! machine.
//!
//! ## Commands
//! ```text
//! tap <view>                 down + up on a view
//! down <view> | up <view> | move <view>
//! setup <url>                answer the initial setup prompt
//! refresh | resume | background
//! standby on|off
//! maintenance cancel | maintenance reset | maintenance apply <device-id> [url]
//! quit
//! ```

use crate::collaborators::{Brightness, ContentSource, ContentView, ViewHandle};
use crate::orchestrator::{MaintenanceOutcome, TouchKind};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

/// Logs every view call and hands out sequential view handles.
#[derive(Debug, Default)]
pub struct ConsoleView {
    next_handle: u64,
}

impl ContentView for ConsoleView {
    fn create_slot_view(
        &mut self,
        source: ContentSource,
        weight: f32,
        error_reload: Duration,
    ) -> ViewHandle {
        self.next_handle += 1;
        info!(
            view = self.next_handle,
            ?source,
            weight,
            error_reload_mins = error_reload.as_secs() / 60,
            "view created"
        );
        ViewHandle(self.next_handle)
    }

    fn load_url(&mut self, view: ViewHandle, url: &str) {
        info!(view = view.0, url, "load");
    }

    fn reload(&mut self, view: ViewHandle) {
        info!(view = view.0, "reload");
    }

    fn destroy(&mut self, view: ViewHandle) {
        info!(view = view.0, "view destroyed");
    }

    fn show_navigation(&mut self, view: ViewHandle) {
        info!(view = view.0, "navigation shown");
    }

    fn show_status(&mut self, main: &str, sub: &str) {
        info!(main, sub, "status");
    }

    fn prompt_base_source(&mut self) {
        info!("enter the base url with: setup <url>");
    }
}

#[derive(Debug, Default)]
pub struct ConsoleBrightness;

impl Brightness for ConsoleBrightness {
    fn dim_device(&mut self) {
        info!("brightness restored");
    }

    fn undim_device(&mut self) {
        info!("brightness at maximum");
    }
}

/// One line of console input.
#[derive(Clone, Debug, PartialEq)]
pub enum ConsoleCommand {
    /// Down followed by up on the same view
    Tap(ViewHandle),
    Touch(TouchKind, ViewHandle),
    Setup(String),
    Refresh,
    Resume,
    Background,
    Standby(bool),
    Maintenance(MaintenanceOutcome),
    Quit,
}

#[derive(Error, Debug, PartialEq)]
pub enum CommandError {
    #[error("empty command")]
    Empty,

    #[error("unknown command: {0}")]
    Unknown(String),

    #[error("usage: {0}")]
    Usage(&'static str),
}

fn view_arg(arg: Option<&str>, usage: &'static str) -> Result<ViewHandle, CommandError> {
    arg.and_then(|a| a.parse().ok())
        .map(ViewHandle)
        .ok_or(CommandError::Usage(usage))
}

impl std::str::FromStr for ConsoleCommand {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let command = words.next().ok_or(CommandError::Empty)?;
        let arg = words.next();

        let parsed = match command {
            "tap" => ConsoleCommand::Tap(view_arg(arg, "tap <view>")?),
            "down" => ConsoleCommand::Touch(TouchKind::Down, view_arg(arg, "down <view>")?),
            "move" => ConsoleCommand::Touch(TouchKind::Move, view_arg(arg, "move <view>")?),
            "up" => ConsoleCommand::Touch(TouchKind::Up, view_arg(arg, "up <view>")?),
            "setup" => ConsoleCommand::Setup(arg.ok_or(CommandError::Usage("setup <url>"))?.into()),
            "refresh" => ConsoleCommand::Refresh,
            "resume" => ConsoleCommand::Resume,
            "background" => ConsoleCommand::Background,
            "standby" => match arg {
                Some("on") => ConsoleCommand::Standby(true),
                Some("off") => ConsoleCommand::Standby(false),
                _ => return Err(CommandError::Usage("standby on|off")),
            },
            "maintenance" => ConsoleCommand::Maintenance(match arg {
                Some("cancel") => MaintenanceOutcome::Cancelled,
                Some("reset") => MaintenanceOutcome::Reset,
                Some("apply") => MaintenanceOutcome::Applied {
                    device_id: Some(
                        words
                            .next()
                            .ok_or(CommandError::Usage("maintenance apply <device-id> [url]"))?
                            .to_string(),
                    ),
                    base_source: words.next().map(str::to_string),
                },
                _ => return Err(CommandError::Usage("maintenance cancel|reset|apply")),
            }),
            "quit" | "exit" => ConsoleCommand::Quit,
            other => return Err(CommandError::Unknown(other.to_string())),
        };
        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_touch_commands() {
        assert_eq!(
            "tap 2".parse::<ConsoleCommand>(),
            Ok(ConsoleCommand::Tap(ViewHandle(2)))
        );
        assert_eq!(
            " move 1 ".parse::<ConsoleCommand>(),
            Ok(ConsoleCommand::Touch(TouchKind::Move, ViewHandle(1)))
        );
        assert_eq!(
            "down x".parse::<ConsoleCommand>(),
            Err(CommandError::Usage("down <view>"))
        );
    }

    #[test]
    fn parses_maintenance_outcomes() {
        assert_eq!(
            "maintenance apply lobby https://cfg.example".parse::<ConsoleCommand>(),
            Ok(ConsoleCommand::Maintenance(MaintenanceOutcome::Applied {
                device_id: Some("lobby".into()),
                base_source: Some("https://cfg.example".into()),
            }))
        );
        assert_eq!(
            "maintenance reset".parse::<ConsoleCommand>(),
            Ok(ConsoleCommand::Maintenance(MaintenanceOutcome::Reset))
        );
    }

    #[test]
    fn rejects_unknown_and_empty() {
        assert_eq!("".parse::<ConsoleCommand>(), Err(CommandError::Empty));
        assert_eq!(
            "dance".parse::<ConsoleCommand>(),
            Err(CommandError::Unknown("dance".into()))
        );
        assert_eq!(
            "standby maybe".parse::<ConsoleCommand>(),
            Err(CommandError::Usage("standby on|off"))
        );
    }

    #[test]
    fn console_view_hands_out_fresh_handles() {
        let mut view = ConsoleView::default();
        let a = view.create_slot_view(ContentSource::Home, 1.0, Duration::ZERO);
        let b = view.create_slot_view(ContentSource::Sites, 0.5, Duration::ZERO);
        assert_ne!(a, b);
    }
}
