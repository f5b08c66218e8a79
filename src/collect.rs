//! Text collection: the set of rewrite candidates inside a traversal root.

use crate::dom::{Dom, NodeId, NodeKind};

/// Collect the non-empty text nodes inside each root, in document order.
///
/// Each walk stays within its root: nested shadow roots are separate
/// entries in `roots`, never reached through their host. Script, style,
/// and inert template content is skipped here the way a page-visible text
/// walk would skip it. Roots that no longer resolve are skipped.
pub fn collect_text_nodes(dom: &Dom, roots: &[NodeId]) -> Vec<NodeId> {
  let mut out = Vec::new();
  for &root in roots {
    if !dom.contains(root) {
      continue;
    }
    let mut stack: Vec<NodeId> = dom.children(root).iter().rev().copied().collect();
    while let Some(id) = stack.pop() {
      match dom.kind(id) {
        Some(NodeKind::Text { content }) => {
          if !content.trim().is_empty() {
            out.push(id);
          }
        }
        Some(NodeKind::Element(data)) => {
          let skip = data.tag_name.eq_ignore_ascii_case("script")
            || data.tag_name.eq_ignore_ascii_case("style")
            || data.tag_name.eq_ignore_ascii_case("template");
          if skip {
            continue;
          }
          stack.extend(dom.children(id).iter().rev().copied());
        }
        // A nested root boundary, or a node that vanished mid-walk.
        Some(NodeKind::ShadowRoot { .. }) | Some(NodeKind::Document) | None => {}
      }
    }
  }
  out
}
