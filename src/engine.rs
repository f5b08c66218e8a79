//! The rewrite engine: decide, apply, restore.
//!
//! One engine instance lives for one page load. It owns the original-size
//! ledger and the domain matcher; everything else it needs (the page, the
//! discovered roots, the settings snapshot) is handed in per pass, because
//! settings are re-read from the store on every invocation.
//!
//! The pass structure follows a small state machine:
//! Idle → Evaluating → (Applying | Restoring) → Idle. `evaluate` is the
//! whole machine; the return value says which arm ran.

use crate::collect::collect_text_nodes;
use crate::dom::{Dom, NodeId, Page};
use crate::matching::{DomainMatcher, HostMatchMode};
use crate::settings::Settings;
use crate::sizing::compute_size;
use crate::style::{computed_font_size, FontSize};
use rustc_hash::FxHashMap;

/// Diagnostic counters from an Applying pass. Not part of any contract;
/// logged and used by tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassOutcome {
  /// Elements whose font-size was rewritten.
  pub changed: usize,
  /// Text nodes skipped (no parent element, script/style parent, or no
  /// computable target size).
  pub skipped: usize,
  /// Elements at or above the threshold, left as-is.
  pub over_threshold: usize,
}

/// Which arm of the state machine an evaluation took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Evaluation {
  /// Settings were absent; nothing happened.
  NoSettings,
  /// The extension is disabled; ledger entries were restored.
  Restored { restored: usize },
  /// Domain rules exclude this page; nothing happened.
  OutOfScope,
  /// A rewrite pass ran.
  Applied(PassOutcome),
}

/// The rewrite engine for one page load.
pub struct RewriteEngine {
  matcher: DomainMatcher,
  // First-observed computed size per element. Entries are non-owning and
  // survive until page teardown; restoring does not clear them, so
  // enable/disable toggling always returns to the same baseline.
  ledger: FxHashMap<NodeId, f32>,
}

impl RewriteEngine {
  pub fn new(mode: HostMatchMode) -> Self {
    Self {
      matcher: DomainMatcher::new(mode),
      ledger: FxHashMap::default(),
    }
  }

  /// Run one full evaluation against a settings snapshot.
  ///
  /// `roots` is the discovered traversal-root list (callers that also
  /// maintain observers discover once and share the list).
  pub fn evaluate(
    &mut self,
    page: &mut Page,
    settings: Option<&Settings>,
    roots: &[NodeId],
  ) -> Evaluation {
    let Some(settings) = settings else {
      log::debug!("no settings available; leaving page untouched");
      return Evaluation::NoSettings;
    };
    if !settings.enabled {
      let restored = self.restore(&mut page.dom);
      log::debug!("disabled; restored {} element(s)", restored);
      return Evaluation::Restored { restored };
    }
    let url = page.url.as_str().to_string();
    let hostname = page.hostname().to_string();
    if !self
      .matcher
      .applies(&url, &hostname, &settings.domains, settings.list_type)
    {
      log::debug!("domain rules exclude {}", hostname);
      return Evaluation::OutOfScope;
    }
    Evaluation::Applied(self.apply(page, settings, roots))
  }

  /// The Applying arm: rewrite every below-threshold text parent.
  pub fn apply(&mut self, page: &mut Page, settings: &Settings, roots: &[NodeId]) -> PassOutcome {
    let mut outcome = PassOutcome::default();
    for text in collect_text_nodes(&page.dom, roots) {
      let Some(parent) = page.dom.parent_element(text) else {
        outcome.skipped += 1;
        continue;
      };
      let tag = page.dom.tag_name(parent).unwrap_or("");
      if tag.eq_ignore_ascii_case("script") || tag.eq_ignore_ascii_case("style") {
        outcome.skipped += 1;
        continue;
      }

      let current = computed_font_size(&page.dom, parent);
      // First sight of this element: record the baseline. This is the
      // first-observed size, not necessarily the author's original if an
      // earlier pass already rewrote it under different settings.
      self.ledger.entry(parent).or_insert(current);

      if current < settings.threshold {
        match compute_size(current, &settings.increase_method) {
          Some(size) => {
            if page.dom.set_inline_font_size(parent, size).is_ok() {
              outcome.changed += 1;
            } else {
              outcome.skipped += 1;
            }
          }
          None => outcome.skipped += 1,
        }
      } else {
        outcome.over_threshold += 1;
      }
    }
    log::debug!(
      "rewrite pass: {} changed, {} skipped, {} over threshold",
      outcome.changed,
      outcome.skipped,
      outcome.over_threshold
    );
    outcome
  }

  /// The Restoring arm: put every surviving ledger element back to its
  /// first-observed pixel size. Entries whose element is gone are swept;
  /// surviving entries are kept so a later re-enable still restores to
  /// the same baseline.
  pub fn restore(&mut self, dom: &mut Dom) -> usize {
    let mut restored = 0;
    let mut dead: Vec<NodeId> = Vec::new();
    for (&node, &original) in &self.ledger {
      if dom.contains(node) {
        if dom.set_inline_font_size(node, FontSize::Px(original)).is_ok() {
          restored += 1;
        }
      } else {
        dead.push(node);
      }
    }
    for node in dead {
      self.ledger.remove(&node);
    }
    restored
  }

  /// Page teardown: release every element reference.
  pub fn clear_ledger(&mut self) {
    self.ledger.clear();
  }

  pub fn ledger_len(&self) -> usize {
    self.ledger.len()
  }

  /// The first-observed size recorded for an element, if any.
  pub fn original_size(&self, element: NodeId) -> Option<f32> {
    self.ledger.get(&element).copied()
  }
}

impl Default for RewriteEngine {
  fn default() -> Self {
    Self::new(HostMatchMode::default())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::discovery::discover_roots;
  use crate::dom::Page;
  use crate::settings::{DomainRule, ListType};
  use url::Url;

  fn page_with_paragraph(size: Option<FontSize>) -> (Page, NodeId) {
    let mut page = Page::new(Url::parse("https://example.com/article").unwrap());
    let body = page.dom.create_element("body");
    let p = page.dom.create_element("p");
    let text = page.dom.create_text("small print");
    page.dom.append_child(page.document, body).unwrap();
    page.dom.append_child(body, p).unwrap();
    page.dom.append_child(p, text).unwrap();
    if let Some(size) = size {
      page.dom.set_inline_font_size(p, size).unwrap();
    }
    (page, p)
  }

  fn settings() -> Settings {
    Settings {
      threshold: 9.0,
      ..Settings::default()
    }
  }

  #[test]
  fn below_threshold_paragraph_is_boosted_and_ledgered() {
    let (mut page, p) = page_with_paragraph(Some(FontSize::Px(8.0)));
    let mut engine = RewriteEngine::default();
    let roots = discover_roots(&page.dom, page.document);

    let evaluation = engine.evaluate(&mut page, Some(&settings()), &roots);
    assert!(matches!(
      evaluation,
      Evaluation::Applied(PassOutcome { changed: 1, .. })
    ));
    assert_eq!(page.dom.inline_font_size(p), Some(FontSize::Px(16.0)));
    assert_eq!(engine.original_size(p), Some(8.0));
  }

  #[test]
  fn disable_restores_the_first_observed_size() {
    let (mut page, p) = page_with_paragraph(Some(FontSize::Px(8.0)));
    let mut engine = RewriteEngine::default();
    let roots = discover_roots(&page.dom, page.document);
    engine.evaluate(&mut page, Some(&settings()), &roots);

    let disabled = Settings {
      enabled: false,
      ..settings()
    };
    let evaluation = engine.evaluate(&mut page, Some(&disabled), &roots);
    assert_eq!(evaluation, Evaluation::Restored { restored: 1 });
    assert_eq!(page.dom.inline_font_size(p), Some(FontSize::Px(8.0)));
    // Ledger survives restoration; only teardown clears it.
    assert_eq!(engine.ledger_len(), 1);

    // Re-enable, re-disable: still the same baseline.
    engine.evaluate(&mut page, Some(&settings()), &roots);
    engine.evaluate(&mut page, Some(&disabled), &roots);
    assert_eq!(page.dom.inline_font_size(p), Some(FontSize::Px(8.0)));
  }

  #[test]
  fn applying_twice_is_a_fixpoint() {
    let (mut page, p) = page_with_paragraph(Some(FontSize::Px(8.0)));
    let mut engine = RewriteEngine::default();
    let roots = discover_roots(&page.dom, page.document);
    let config = settings();

    engine.evaluate(&mut page, Some(&config), &roots);
    let after_first = page.dom.inline_font_size(p);
    let second = engine.evaluate(&mut page, Some(&config), &roots);

    assert_eq!(page.dom.inline_font_size(p), after_first);
    assert_eq!(engine.original_size(p), Some(8.0), "baseline must not move");
    assert!(matches!(
      second,
      Evaluation::Applied(PassOutcome {
        changed: 0,
        over_threshold: 1,
        ..
      })
    ));
  }

  #[test]
  fn absent_settings_do_nothing() {
    let (mut page, p) = page_with_paragraph(Some(FontSize::Px(8.0)));
    let mut engine = RewriteEngine::default();
    let roots = discover_roots(&page.dom, page.document);

    assert_eq!(
      engine.evaluate(&mut page, None, &roots),
      Evaluation::NoSettings
    );
    assert_eq!(page.dom.inline_font_size(p), Some(FontSize::Px(8.0)));
    assert_eq!(engine.ledger_len(), 0);
  }

  #[test]
  fn excluded_domain_is_left_untouched() {
    let (mut page, p) = page_with_paragraph(Some(FontSize::Px(8.0)));
    let mut engine = RewriteEngine::default();
    let roots = discover_roots(&page.dom, page.document);
    let config = Settings {
      list_type: ListType::Blacklist,
      domains: vec![DomainRule::literal("example.com")],
      ..settings()
    };

    assert_eq!(
      engine.evaluate(&mut page, Some(&config), &roots),
      Evaluation::OutOfScope
    );
    assert_eq!(page.dom.inline_font_size(p), Some(FontSize::Px(8.0)));
  }

  #[test]
  fn script_and_style_parents_are_skipped() {
    let mut page = Page::new(Url::parse("https://example.com/").unwrap());
    let body = page.dom.create_element("body");
    let style = page.dom.create_element("style");
    let css = page.dom.create_text("p { color: red }");
    page.dom.append_child(page.document, body).unwrap();
    page.dom.append_child(body, style).unwrap();
    page.dom.append_child(style, css).unwrap();

    let mut engine = RewriteEngine::default();
    let roots = discover_roots(&page.dom, page.document);
    let outcome = engine.apply(&mut page, &settings(), &roots);

    // Style content is filtered during collection already; nothing to do.
    assert_eq!(outcome, PassOutcome::default());
    assert_eq!(engine.ledger_len(), 0);
  }

  #[test]
  fn over_threshold_elements_keep_their_size_and_baseline() {
    let (mut page, p) = page_with_paragraph(Some(FontSize::Px(14.0)));
    let mut engine = RewriteEngine::default();
    let roots = discover_roots(&page.dom, page.document);

    let evaluation = engine.evaluate(&mut page, Some(&settings()), &roots);
    assert!(matches!(
      evaluation,
      Evaluation::Applied(PassOutcome {
        changed: 0,
        over_threshold: 1,
        ..
      })
    ));
    assert_eq!(page.dom.inline_font_size(p), Some(FontSize::Px(14.0)));
    assert_eq!(engine.original_size(p), Some(14.0));
  }

  #[test]
  fn restore_sweeps_entries_for_removed_elements() {
    let (mut page, p) = page_with_paragraph(Some(FontSize::Px(8.0)));
    let mut engine = RewriteEngine::default();
    let roots = discover_roots(&page.dom, page.document);
    engine.evaluate(&mut page, Some(&settings()), &roots);
    assert_eq!(engine.ledger_len(), 1);

    page.dom.remove_node(p).unwrap();
    assert_eq!(engine.restore(&mut page.dom), 0);
    assert_eq!(engine.ledger_len(), 0, "dead entries are swept");
  }
}
