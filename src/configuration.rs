//! # Remote Presentation Configuration
//!
//! The immutable snapshot downloaded from the device's base configuration
//! source. A new snapshot fully replaces the previous one; nothing here is
//! ever mutated after deserialization.
//!
//! ## Wire format
//! ```json
//! {
//!   "layout": 2,
//!   "home": ["https://example.org", "Front page"],
//!   "sites": ["https://a.example", "A", "https://b.example", "B"],
//!   "screensavers": ["https://art.example", "Art"],
//!   "reloadPeriodMins": 30,
//!   "errorReloadMins": 1,
//!   "autoCycleSecondary": true,
//!   "autoCycleSecondaryPeriodMins": 5,
//!   "screenSavePeriodMins": 15,
//!   "screenSaveLengthMins": 3
//! }
//! ```
//!
//! Page lists interleave url and title, so they must have an even length.
//! Odd lists are rejected while deserializing and never reach the engines.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

/// Problems with a configuration document.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A page list holds an unpaired url or title
    #[error("page list has odd length {0}; expected url/title pairs")]
    OddPageList(usize),

    /// The document is not valid configuration JSON
    #[error("malformed configuration: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// One url/title pair borrowed from a [`PageList`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Page<'a> {
    pub url: &'a str,
    pub title: &'a str,
}

/// Interleaved `[url, title, url, title, ...]` list of pages.
///
/// Indexes are entry indexes, so the n-th page starts at index `2 * n`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct PageList(Vec<String>);

impl TryFrom<Vec<String>> for PageList {
    type Error = ConfigError;

    fn try_from(entries: Vec<String>) -> Result<Self, Self::Error> {
        if entries.len() % 2 != 0 {
            return Err(ConfigError::OddPageList(entries.len()));
        }
        Ok(Self(entries))
    }
}

impl From<PageList> for Vec<String> {
    fn from(list: PageList) -> Self {
        list.0
    }
}

impl PageList {
    /// Number of entries (twice the number of pages).
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn page_count(&self) -> usize {
        self.0.len() / 2
    }

    /// Page starting at entry `index`. Odd indexes point at a title and
    /// return `None`.
    pub fn page(&self, index: usize) -> Option<Page<'_>> {
        if index % 2 != 0 {
            return None;
        }
        Some(Page {
            url: self.0.get(index)?,
            title: self.0.get(index + 1)?,
        })
    }
}

/// Screen split between the home slot and the secondary (sites) slot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum Layout {
    #[default]
    Fullscreen,
    Half,
    SixtyForty,
    SeventyThirty,
    EightyTwenty,
}

impl From<u8> for Layout {
    fn from(id: u8) -> Self {
        match id {
            0 => Layout::Fullscreen,
            1 => Layout::Half,
            2 => Layout::SixtyForty,
            3 => Layout::SeventyThirty,
            4 => Layout::EightyTwenty,
            other => {
                warn!(layout = other, "unknown layout id, using fullscreen");
                Layout::Fullscreen
            }
        }
    }
}

impl From<Layout> for u8 {
    fn from(layout: Layout) -> Self {
        match layout {
            Layout::Fullscreen => 0,
            Layout::Half => 1,
            Layout::SixtyForty => 2,
            Layout::SeventyThirty => 3,
            Layout::EightyTwenty => 4,
        }
    }
}

/// Full presentation configuration for one device.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Configuration {
    #[serde(default)]
    pub layout: Layout,
    #[serde(default, rename = "home")]
    pub home_pages: PageList,
    #[serde(default, rename = "sites")]
    pub site_pages: PageList,
    #[serde(default, rename = "screensavers")]
    pub screensaver_pages: PageList,
    /// 0 disables periodic reload
    #[serde(default, rename = "reloadPeriodMins")]
    pub reload_period_minutes: u32,
    /// Handed to the content view, which owns reload-on-error
    #[serde(default, rename = "errorReloadMins")]
    pub error_reload_minutes: u32,
    #[serde(default, rename = "autoCycleSecondary")]
    pub auto_cycle_secondary_enabled: bool,
    #[serde(default, rename = "autoCycleSecondaryPeriodMins")]
    pub auto_cycle_secondary_period_minutes: Option<u32>,
    #[serde(default, rename = "screenSavePeriodMins")]
    pub screen_save_period_minutes: Option<u32>,
    #[serde(default, rename = "screenSaveLengthMins")]
    pub screen_save_length_minutes: Option<u32>,
}

pub(crate) fn minutes(m: u32) -> Duration {
    Duration::from_secs(u64::from(m) * 60)
}

impl Configuration {
    /// Parse a configuration document.
    pub fn from_json(bytes: &[u8]) -> Result<Self, ConfigError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    pub fn reload_period(&self) -> Option<Duration> {
        (self.reload_period_minutes > 0).then(|| minutes(self.reload_period_minutes))
    }

    pub fn error_reload_period(&self) -> Duration {
        minutes(self.error_reload_minutes)
    }

    /// Rotation period for the secondary slot, if rotation is switched on.
    pub fn secondary_cycle_period(&self) -> Option<Duration> {
        if !self.auto_cycle_secondary_enabled {
            return None;
        }
        self.auto_cycle_secondary_period_minutes
            .filter(|m| *m > 0)
            .map(minutes)
    }

    /// Idle period and active length, present only when both are positive.
    pub fn screensaver_timing(&self) -> Option<(Duration, Duration)> {
        let period = self.screen_save_period_minutes.filter(|m| *m > 0)?;
        let length = self.screen_save_length_minutes.filter(|m| *m > 0)?;
        Some((minutes(period), minutes(length)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_wire_key_names() {
        let json = br#"{
            "layout": 2,
            "home": ["https://home.example", "Home"],
            "sites": ["https://a.example", "A", "https://b.example", "B"],
            "screensavers": [],
            "reloadPeriodMins": 30,
            "errorReloadMins": 2,
            "autoCycleSecondary": true,
            "autoCycleSecondaryPeriodMins": 5,
            "screenSavePeriodMins": 15,
            "screenSaveLengthMins": 3
        }"#;
        let config = Configuration::from_json(json).unwrap();

        assert_eq!(config.layout, Layout::SixtyForty);
        assert_eq!(config.home_pages.page_count(), 1);
        assert_eq!(
            config.site_pages.page(2),
            Some(Page {
                url: "https://b.example",
                title: "B"
            })
        );
        assert_eq!(config.reload_period(), Some(Duration::from_secs(1800)));
        assert_eq!(config.secondary_cycle_period(), Some(Duration::from_secs(300)));
        assert_eq!(
            config.screensaver_timing(),
            Some((Duration::from_secs(900), Duration::from_secs(180)))
        );
    }

    #[test]
    fn odd_page_list_is_rejected() {
        let json = br#"{ "layout": 0, "home": ["https://home.example"] }"#;
        let err = Configuration::from_json(json).unwrap_err();
        assert!(err.to_string().contains("odd length 1"), "{err}");
    }

    #[test]
    fn missing_fields_fall_back_to_disabled() {
        let config = Configuration::from_json(b"{}").unwrap();
        assert_eq!(config.layout, Layout::Fullscreen);
        assert!(config.home_pages.is_empty());
        assert_eq!(config.reload_period(), None);
        assert_eq!(config.secondary_cycle_period(), None);
        assert_eq!(config.screensaver_timing(), None);
    }

    #[test]
    fn screensaver_needs_both_period_and_length() {
        let config = Configuration {
            screen_save_period_minutes: Some(5),
            screen_save_length_minutes: Some(0),
            ..Configuration::default()
        };
        assert_eq!(config.screensaver_timing(), None);
    }

    #[test]
    fn unknown_layout_falls_back_to_fullscreen() {
        let config = Configuration::from_json(br#"{ "layout": 9 }"#).unwrap();
        assert_eq!(config.layout, Layout::Fullscreen);
    }

    #[test]
    fn odd_index_is_not_a_page() {
        let list = PageList::try_from(vec!["u".to_string(), "t".to_string()]).unwrap();
        assert_eq!(list.page(1), None);
        assert_eq!(list.page(2), None);
    }
}
