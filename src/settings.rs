//! User settings: the persisted shape, defaults, and export naming.
//!
//! The core never writes settings; it re-reads them from the settings
//! store on every rewrite invocation. The serde shape here must stay
//! byte-compatible with what the popup and background collaborators
//! persist (camelCase keys, lowercase enum strings).

use crate::error::{Result, SettingsError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How the rewrite target size is derived from the current size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IncreaseKind {
  /// The target is exactly `value`, ignoring the current size.
  Fixed,
  /// The target is `current * value`.
  Multiplier,
}

/// Unit of the rewritten font-size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeUnit {
  Px,
  Em,
  Rem,
}

impl fmt::Display for SizeUnit {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      SizeUnit::Px => "px",
      SizeUnit::Em => "em",
      SizeUnit::Rem => "rem",
    })
  }
}

/// The size policy configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IncreaseMethod {
  #[serde(rename = "type")]
  pub kind: IncreaseKind,
  pub unit: SizeUnit,
  pub value: f32,
}

/// Whether the domain list selects or excludes pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListType {
  Whitelist,
  Blacklist,
}

/// One domain rule: a literal hostname fragment or a regex source.
///
/// A malformed regex source is data, not an error; matching treats it as a
/// rule that never matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainRule {
  pub value: String,
  #[serde(rename = "isRegex", default)]
  pub is_regex: bool,
}

impl DomainRule {
  pub fn literal(value: &str) -> Self {
    Self {
      value: value.to_string(),
      is_regex: false,
    }
  }

  pub fn regex(value: &str) -> Self {
    Self {
      value: value.to_string(),
      is_regex: true,
    }
  }
}

/// The full user configuration, as persisted by the popup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
  pub enabled: bool,
  /// Elements computed below this size (px) are rewritten.
  pub threshold: f32,
  pub increase_method: IncreaseMethod,
  pub list_type: ListType,
  #[serde(default)]
  pub domains: Vec<DomainRule>,
}

impl Default for Settings {
  /// The defaults written by the install hook: enabled, boost anything
  /// under 9px up to a fixed 16px, blacklist mode with no domains (so the
  /// extension applies everywhere).
  fn default() -> Self {
    Self {
      enabled: true,
      threshold: 9.0,
      increase_method: IncreaseMethod {
        kind: IncreaseKind::Fixed,
        unit: SizeUnit::Px,
        value: 16.0,
      },
      list_type: ListType::Blacklist,
      domains: Vec::new(),
    }
  }
}

/// Decode persisted settings JSON.
pub fn parse_settings(json: &str) -> Result<Settings> {
  let settings = serde_json::from_str(json).map_err(SettingsError::Invalid)?;
  Ok(settings)
}

/// The filename used when exporting settings:
/// `extension-settings-YYMMDD.json` with a 2-digit year and zero-padded
/// month and day.
pub fn export_filename(date: NaiveDate) -> String {
  format!("extension-settings-{}.json", date.format("%y%m%d"))
}
