//! Scope discovery: enumerate every traversal root reachable from a
//! document.
//!
//! Breadth-first over an explicit frontier with a visited set, never
//! recursion: shadow roots can sit inside frames inside shadow roots to
//! arbitrary depth, and re-discovery must be idempotent. Cross-origin
//! frame content is unreachable by design and skipped without comment;
//! ids that stopped resolving mid-walk are skipped the same way.

use crate::dom::{Dom, NodeId};
use rustc_hash::FxHashSet;
use std::collections::VecDeque;

/// All traversal roots reachable from `start`, in discovery order:
/// the start document, then open shadow roots and same-origin frame
/// documents, recursively.
pub fn discover_roots(dom: &Dom, start: NodeId) -> Vec<NodeId> {
  let mut order = Vec::new();
  let mut seen: FxHashSet<NodeId> = FxHashSet::default();
  let mut frontier: VecDeque<NodeId> = VecDeque::new();

  if dom.contains(start) {
    seen.insert(start);
    frontier.push_back(start);
  }

  while let Some(root) = frontier.pop_front() {
    order.push(root);
    for element in dom.elements_under(root) {
      if let Some(shadow) = dom.open_shadow_root_of(element) {
        if seen.insert(shadow) {
          frontier.push_back(shadow);
        }
      }
      if dom.tag_name(element).is_some_and(|t| t.eq_ignore_ascii_case("iframe")) {
        match dom.content_document(element) {
          Ok(Some(doc)) => {
            if seen.insert(doc) {
              frontier.push_back(doc);
            }
          }
          // No document attached yet, or cross-origin: both expected.
          Ok(None) | Err(_) => {}
        }
      }
    }
  }

  log::debug!("discovered {} traversal root(s)", order.len());
  order
}
