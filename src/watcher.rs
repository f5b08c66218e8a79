//! The mutation watcher: observers, debounce, liveness, teardown.
//!
//! One watcher task serves one page load. It attaches observers to every
//! discovered traversal root, folds mutation bursts into a single shared
//! deadline (quiet period 100 ms, cancel-and-reschedule), and on each fire
//! probes host liveness, re-reads settings, re-discovers roots, and runs
//! the engine. An invalid host context is terminal: observers come down
//! and the task stops for good, page reload being the only recovery.
//!
//! Everything is single-threaded. The page sits behind `Rc<RefCell<..>>`
//! and is only borrowed between awaits, never across one; settings are
//! awaited first, then the synchronous DOM work happens.

use crate::discovery::discover_roots;
use crate::dom::{MutationRecord, NodeId, NodeKind, Page};
use crate::engine::RewriteEngine;
use crate::host::{HostContext, SettingsStore, Signal};
use crate::matching::HostMatchMode;
use crate::settings::Settings;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::time::{sleep_until, Instant};

/// How long the page must stay quiet after a mutation burst before a
/// rewrite pass runs.
pub const QUIET_PERIOD: Duration = Duration::from_millis(100);

/// The per-page watcher. Built with [`Watcher::new`], driven by
/// [`Watcher::run`], which returns the watcher back for inspection once
/// the signal channel closes or a terminal condition hits.
pub struct Watcher<S: SettingsStore> {
  page: Rc<RefCell<Page>>,
  engine: RewriteEngine,
  store: S,
  context: HostContext,
  record_tx: UnboundedSender<MutationRecord>,
  records: UnboundedReceiver<MutationRecord>,
  signals: UnboundedReceiver<Signal>,
  passes: usize,
  terminated: bool,
}

impl<S: SettingsStore> Watcher<S> {
  /// Build a watcher for `page`. The returned sender is the host's side of
  /// the signal channel; dropping it (or sending `PageHidden`) tears the
  /// watcher down.
  pub fn new(
    page: Rc<RefCell<Page>>,
    store: S,
    context: HostContext,
    mode: HostMatchMode,
  ) -> (Self, UnboundedSender<Signal>) {
    let (record_tx, records) = unbounded_channel();
    let (signal_tx, signals) = unbounded_channel();
    let watcher = Self {
      page,
      engine: RewriteEngine::new(mode),
      store,
      context,
      record_tx,
      records,
      signals,
      passes: 0,
      terminated: false,
    };
    (watcher, signal_tx)
  }

  /// Engine passes run so far (initial load, signals, and debounce fires).
  pub fn pass_count(&self) -> usize {
    self.passes
  }

  /// Whether the watcher stopped because the host context went invalid.
  pub fn is_terminated(&self) -> bool {
    self.terminated
  }

  pub fn ledger_len(&self) -> usize {
    self.engine.ledger_len()
  }

  /// Drive the watcher until teardown. Runs one evaluation up front (the
  /// page-load pass), then reacts to signals and mutation bursts.
  pub async fn run(mut self) -> Self {
    self.evaluate(EvaluateCause::PageLoad).await;

    let mut deadline: Option<Instant> = None;
    loop {
      let quiet = async move {
        match deadline {
          Some(at) => sleep_until(at).await,
          None => std::future::pending().await,
        }
      };
      tokio::select! {
        biased;
        signal = self.signals.recv() => match signal {
          Some(Signal::SettingsUpdated) => {
            // The one path that restores on disable.
            self.evaluate(EvaluateCause::SettingsUpdated).await;
          }
          Some(Signal::PageHidden) | None => {
            self.teardown();
            break;
          }
        },
        record = self.records.recv() => match record {
          Some(_) => {
            let mut burst = 1usize;
            while self.records.try_recv().is_ok() {
              burst += 1;
            }
            log::debug!("mutation burst of {} record(s); (re)arming quiet period", burst);
            deadline = Some(Instant::now() + QUIET_PERIOD);
          }
          // Unreachable while we hold record_tx, but harmless.
          None => {
            self.teardown();
            break;
          }
        },
        _ = quiet => {
          deadline = None;
          if !self.context.is_valid() {
            log::warn!("host context invalidated; stopping watcher permanently");
            self.page.borrow_mut().dom.disconnect_all();
            self.terminated = true;
            break;
          }
          self.evaluate(EvaluateCause::QuietPeriod).await;
        }
      }
    }
    self
  }

  /// One evaluation: read settings, then do the synchronous DOM work.
  async fn evaluate(&mut self, cause: EvaluateCause) {
    let settings = match self.store.get().await {
      Ok(settings) => settings,
      Err(err) => {
        log::warn!("settings read failed ({}); treating as absent", err);
        None
      }
    };

    // Mutation-driven passes only ever apply. Restoring a disabled page
    // happens once, on the explicit settings-updated signal, not on every
    // DOM change afterwards.
    if cause == EvaluateCause::QuietPeriod && !mutation_pass_allowed(settings.as_ref()) {
      log::debug!("disabled or unconfigured; skipping mutation-driven pass");
      return;
    }

    // A disabled extension keeps its observers so a later re-enable signal
    // still sees a live page; only teardown removes them.
    let mut page = self.page.borrow_mut();
    let roots = discover_roots(&page.dom, page.document);
    observe_roots(&mut page, &roots, &self.record_tx);
    let evaluation = self.engine.evaluate(&mut page, settings.as_ref(), &roots);
    self.passes += 1;
    log::debug!("{:?} pass: {:?}", cause, evaluation);
  }

  fn teardown(&mut self) {
    let mut page = self.page.borrow_mut();
    page.dom.disconnect_all();
    drop(page);
    self.engine.clear_ledger();
    log::debug!("watcher torn down");
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EvaluateCause {
  PageLoad,
  SettingsUpdated,
  QuietPeriod,
}

/// Attach an observer to every root that does not have one yet.
///
/// Documents are observed at their `body` element when one exists; shadow
/// roots and body-less documents are observed at the root node itself.
fn observe_roots(page: &mut Page, roots: &[NodeId], sender: &UnboundedSender<MutationRecord>) {
  for &root in roots {
    if page.dom.is_observed(root) {
      continue;
    }
    let target = match page.dom.kind(root) {
      Some(NodeKind::Document) => page.dom.find_body(root).unwrap_or(root),
      Some(NodeKind::ShadowRoot { .. }) => root,
      _ => continue,
    };
    if page.dom.observe(root, target, sender.clone()) {
      log::debug!("observing root {:?} at target {:?}", root, target);
    }
  }
}

/// Convenience for hosts and tests: whether a settings snapshot would let
/// a mutation-driven pass proceed.
pub fn mutation_pass_allowed(settings: Option<&Settings>) -> bool {
  settings.is_some_and(|s| s.enabled)
}
