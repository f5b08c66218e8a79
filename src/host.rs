//! Seams to the hosting environment.
//!
//! The engine never talks to storage or messaging directly; it sees these
//! three shapes instead. Real hosts back them with extension APIs, tests
//! and the CLI back them with the in-memory implementations here.

use crate::error::Result;
use crate::settings::Settings;
use async_trait::async_trait;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Read access to the persisted settings.
///
/// Re-queried on every rewrite invocation; the engine never caches the
/// result. `Ok(None)` means nothing persisted yet, which callers treat as
/// "do nothing". `?Send` because the whole page model is single-threaded.
#[async_trait(?Send)]
pub trait SettingsStore {
  async fn get(&self) -> Result<Option<Settings>>;
}

/// In-memory store for tests and the CLI. Shared handles see updates
/// immediately, which is how the settings-updated signal is exercised.
#[derive(Clone, Default)]
pub struct MemoryStore {
  settings: Rc<RefCell<Option<Settings>>>,
}

impl MemoryStore {
  pub fn new(settings: Option<Settings>) -> Self {
    Self {
      settings: Rc::new(RefCell::new(settings)),
    }
  }

  pub fn put(&self, settings: Settings) {
    *self.settings.borrow_mut() = Some(settings);
  }

  pub fn clear(&self) {
    *self.settings.borrow_mut() = None;
  }
}

#[async_trait(?Send)]
impl SettingsStore for MemoryStore {
  async fn get(&self) -> Result<Option<Settings>> {
    Ok(self.settings.borrow().clone())
  }
}

/// Liveness handle for the hosting context.
///
/// When the extension is reloaded or unloaded, the host flips this to
/// invalid and every in-flight watcher must tear itself down permanently;
/// only a page reload recovers. Cloneable so the host keeps one end and
/// the watcher the other.
#[derive(Clone)]
pub struct HostContext {
  valid: Arc<AtomicBool>,
}

impl HostContext {
  pub fn new() -> Self {
    Self {
      valid: Arc::new(AtomicBool::new(true)),
    }
  }

  pub fn is_valid(&self) -> bool {
    self.valid.load(Ordering::Acquire)
  }

  pub fn invalidate(&self) {
    self.valid.store(false, Ordering::Release);
  }
}

impl Default for HostContext {
  fn default() -> Self {
    Self::new()
  }
}

/// Inbound host messages the watcher reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
  /// Settings changed in storage; run a full evaluation now.
  SettingsUpdated,
  /// The page is going away; tear down observers and state.
  PageHidden,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn memory_store_round_trips_and_shares_updates() {
    let store = MemoryStore::default();
    assert!(store.get().await.unwrap().is_none());

    let handle = store.clone();
    handle.put(Settings::default());
    assert!(store.get().await.unwrap().is_some());

    handle.clear();
    assert!(store.get().await.unwrap().is_none());
  }

  #[test]
  fn invalidation_is_visible_through_clones() {
    let context = HostContext::new();
    let probe = context.clone();
    assert!(probe.is_valid());
    context.invalidate();
    assert!(!probe.is_valid());
  }
}
