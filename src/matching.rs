//! Domain allow/deny matching.
//!
//! Decides whether a page qualifies for rewriting. Regex rules test the
//! full URL; literal rules compare against the hostname. An invalid regex
//! source never escapes this module: the rule simply never matches.

use crate::settings::{DomainRule, ListType};
use regex::Regex;
use rustc_hash::FxHashMap;

/// How literal (non-regex) rules compare against the hostname.
///
/// Two variants of this check exist in the wild; the choice is explicit
/// here rather than implied. Exact hostname equality matches under both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HostMatchMode {
  /// `hostname.starts_with(value)`.
  #[default]
  Prefix,
  /// `hostname.ends_with(value)`: subdomain matching, so `example.com`
  /// also covers `www.example.com`.
  Suffix,
}

/// Matcher with a per-instance cache of compiled rule patterns.
///
/// Settings are re-read on every pass, but rule sources rarely change, so
/// compiled regexes (and compile failures) are memoized by source string.
pub struct DomainMatcher {
  mode: HostMatchMode,
  compiled: FxHashMap<String, Option<Regex>>,
}

impl DomainMatcher {
  pub fn new(mode: HostMatchMode) -> Self {
    Self {
      mode,
      compiled: FxHashMap::default(),
    }
  }

  pub fn mode(&self) -> HostMatchMode {
    self.mode
  }

  /// Whether rewriting applies to this page.
  ///
  /// An empty rule list applies everywhere regardless of list type.
  /// Otherwise whitelist mode requires some rule to match and blacklist
  /// mode requires that none does.
  pub fn applies(
    &mut self,
    url: &str,
    hostname: &str,
    domains: &[DomainRule],
    list_type: ListType,
  ) -> bool {
    if domains.is_empty() {
      return true;
    }
    let matched = domains.iter().any(|rule| self.rule_matches(rule, url, hostname));
    match list_type {
      ListType::Whitelist => matched,
      ListType::Blacklist => !matched,
    }
  }

  fn rule_matches(&mut self, rule: &DomainRule, url: &str, hostname: &str) -> bool {
    if rule.value.is_empty() {
      return false;
    }
    if rule.is_regex {
      return match self.compile(&rule.value) {
        Some(regex) => regex.is_match(url),
        None => false,
      };
    }
    if hostname == rule.value {
      return true;
    }
    match self.mode {
      HostMatchMode::Prefix => hostname.starts_with(&rule.value),
      HostMatchMode::Suffix => hostname.ends_with(&rule.value),
    }
  }

  fn compile(&mut self, source: &str) -> Option<&Regex> {
    self
      .compiled
      .entry(source.to_string())
      .or_insert_with(|| match Regex::new(source) {
        Ok(regex) => Some(regex),
        Err(err) => {
          log::debug!("invalid domain rule regex '{}': {}", source, err);
          None
        }
      })
      .as_ref()
  }
}

impl Default for DomainMatcher {
  fn default() -> Self {
    Self::new(HostMatchMode::default())
  }
}

/// One-shot convenience over [`DomainMatcher::applies`] with the default
/// host-match mode.
pub fn applies(url: &str, hostname: &str, domains: &[DomainRule], list_type: ListType) -> bool {
  DomainMatcher::default().applies(url, hostname, domains, list_type)
}
