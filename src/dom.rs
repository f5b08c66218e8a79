//! Mutable, observable DOM arena.
//!
//! Nodes live in one id-keyed arena shared by the main document, attached
//! shadow roots, and the content documents of same-origin frames. A
//! `NodeId` is a non-owning handle: holding one never keeps a node alive,
//! and resolving one after removal simply yields `None`. This is what lets
//! the rewrite engine keep its original-size ledger without pinning
//! elements on long-lived pages.
//!
//! Mutation observation mirrors the child-list/character-data subset of the
//! platform observer: attribute-level changes (including the inline
//! font-size writes the rewrite engine performs) are deliberately not
//! reported, which is what keeps a rewrite pass from re-triggering itself.

use crate::error::{DomError, Result};
use crate::style::FontSize;
use rustc_hash::FxHashMap;
use tokio::sync::mpsc::UnboundedSender;
use url::Url;

/// Non-owning handle to a node in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
  pub fn from_raw(raw: u64) -> Self {
    NodeId(raw)
  }

  pub fn raw(self) -> u64 {
    self.0
  }
}

/// Whether a shadow root is reachable from page script.
///
/// Closed shadow roots exist in the tree but are invisible to traversal
/// (`element.shadowRoot` is null for them), so scope discovery skips them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShadowRootMode {
  Open,
  Closed,
}

/// Data stored for each element node.
#[derive(Debug, Clone)]
pub struct ElementData {
  pub tag_name: String,
  pub attributes: Vec<(String, String)>,
  pub inline_font_size: Option<FontSize>,
}

impl ElementData {
  fn new(tag_name: &str) -> Self {
    Self {
      tag_name: tag_name.to_string(),
      attributes: Vec::new(),
      inline_font_size: None,
    }
  }
}

/// Data stored for each node in the arena.
#[derive(Debug, Clone)]
pub enum NodeKind {
  Document,
  Element(ElementData),
  Text { content: String },
  ShadowRoot { mode: ShadowRootMode },
}

#[derive(Debug)]
struct Node {
  kind: NodeKind,
  parent: Option<NodeId>,
  children: Vec<NodeId>,
}

/// Content document link for a frame element.
#[derive(Debug, Clone, Copy)]
struct FrameContent {
  document: NodeId,
  same_origin: bool,
}

/// What changed in an observed subtree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
  ChildList,
  CharacterData,
}

/// One delivered mutation. Batching happens at the channel level; the
/// watcher treats any number of queued records as a single burst.
#[derive(Debug, Clone, Copy)]
pub struct MutationRecord {
  /// The traversal root whose observer produced this record.
  pub root: NodeId,
  /// The node the change happened at (the parent for child-list changes,
  /// the text node for character-data changes).
  pub target: NodeId,
  pub kind: MutationKind,
}

struct Observer {
  target: NodeId,
  sender: UnboundedSender<MutationRecord>,
}

/// The DOM arena.
pub struct Dom {
  nodes: FxHashMap<NodeId, Node>,
  next_id: u64,
  frames: FxHashMap<NodeId, FrameContent>,
  // At most one observer per traversal root; key is the root id, the
  // observed target may be a descendant (body for documents).
  observers: FxHashMap<NodeId, Observer>,
}

impl Dom {
  pub fn new() -> Self {
    Self {
      nodes: FxHashMap::default(),
      next_id: 0,
      frames: FxHashMap::default(),
      observers: FxHashMap::default(),
    }
  }

  fn insert(&mut self, kind: NodeKind) -> NodeId {
    let id = NodeId(self.next_id);
    self.next_id += 1;
    self.nodes.insert(
      id,
      Node {
        kind,
        parent: None,
        children: Vec::new(),
      },
    );
    id
  }

  /// Create a detached document node (a traversal root).
  pub fn create_document(&mut self) -> NodeId {
    self.insert(NodeKind::Document)
  }

  /// Create a detached element node.
  pub fn create_element(&mut self, tag_name: &str) -> NodeId {
    self.insert(NodeKind::Element(ElementData::new(tag_name)))
  }

  /// Create a detached text node.
  pub fn create_text(&mut self, content: &str) -> NodeId {
    self.insert(NodeKind::Text {
      content: content.to_string(),
    })
  }

  pub fn contains(&self, node: NodeId) -> bool {
    self.nodes.contains_key(&node)
  }

  pub fn kind(&self, node: NodeId) -> Option<&NodeKind> {
    self.nodes.get(&node).map(|n| &n.kind)
  }

  pub fn parent(&self, node: NodeId) -> Option<NodeId> {
    self.nodes.get(&node).and_then(|n| n.parent)
  }

  pub fn children(&self, node: NodeId) -> &[NodeId] {
    self
      .nodes
      .get(&node)
      .map(|n| n.children.as_slice())
      .unwrap_or(&[])
  }

  /// The nearest ancestor (or self) that is an element node.
  ///
  /// Text directly under a document or shadow root has no parent element,
  /// matching the platform's `parentElement` for those positions.
  pub fn parent_element(&self, node: NodeId) -> Option<NodeId> {
    let parent = self.parent(node)?;
    match self.kind(parent)? {
      NodeKind::Element(_) => Some(parent),
      _ => None,
    }
  }

  pub fn tag_name(&self, node: NodeId) -> Option<&str> {
    match self.kind(node)? {
      NodeKind::Element(data) => Some(data.tag_name.as_str()),
      _ => None,
    }
  }

  pub fn text_content(&self, node: NodeId) -> Option<&str> {
    match self.kind(node)? {
      NodeKind::Text { content } => Some(content.as_str()),
      _ => None,
    }
  }

  pub fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
    match self.kind(node)? {
      NodeKind::Element(data) => data
        .attributes
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str()),
      _ => None,
    }
  }

  pub fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> Result<()> {
    let data = self.element_data_mut(node)?;
    if let Some(slot) = data
      .attributes
      .iter_mut()
      .find(|(k, _)| k.eq_ignore_ascii_case(name))
    {
      slot.1 = value.to_string();
    } else {
      data.attributes.push((name.to_string(), value.to_string()));
    }
    Ok(())
  }

  pub fn inline_font_size(&self, node: NodeId) -> Option<FontSize> {
    match self.kind(node)? {
      NodeKind::Element(data) => data.inline_font_size,
      _ => None,
    }
  }

  /// Set the element's inline font-size.
  ///
  /// Style writes are not reported to observers; the observer model covers
  /// child-list and character-data changes only, so a rewrite pass cannot
  /// wake its own watcher.
  pub fn set_inline_font_size(&mut self, node: NodeId, size: FontSize) -> Result<()> {
    self.element_data_mut(node)?.inline_font_size = Some(size);
    Ok(())
  }

  fn element_data_mut(&mut self, node: NodeId) -> Result<&mut ElementData> {
    match self.nodes.get_mut(&node) {
      None => Err(DomError::Detached { node }.into()),
      Some(n) => match &mut n.kind {
        NodeKind::Element(data) => Ok(data),
        _ => Err(DomError::NotAnElement { node }.into()),
      },
    }
  }

  /// Append `child` to `parent`, re-parenting it if it is already attached
  /// elsewhere. Reported to the owning root's observer as a child-list
  /// change at `parent`.
  ///
  /// Inserting a node under itself or one of its own descendants is
  /// rejected; the parent chain must stay acyclic or every ancestor walk
  /// in the arena would spin.
  pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
    if !self.contains(parent) {
      return Err(DomError::Detached { node: parent }.into());
    }
    if !self.contains(child) {
      return Err(DomError::Detached { node: child }.into());
    }
    if self.is_descendant_or_self(parent, child) {
      return Err(DomError::HierarchyViolation { parent, child }.into());
    }
    if let Some(old_parent) = self.parent(child) {
      if let Some(node) = self.nodes.get_mut(&old_parent) {
        node.children.retain(|&c| c != child);
      }
    }
    self.nodes.get_mut(&parent).unwrap().children.push(child);
    self.nodes.get_mut(&child).unwrap().parent = Some(parent);
    self.record_mutation(parent, MutationKind::ChildList);
    Ok(())
  }

  /// Remove a node and its entire subtree, including any shadow roots and
  /// frame content documents hanging off removed elements.
  pub fn remove_node(&mut self, node: NodeId) -> Result<()> {
    if !self.contains(node) {
      return Err(DomError::Detached { node }.into());
    }
    let parent = self.parent(node);
    if let Some(parent) = parent {
      // Record against the old position before the subtree disappears.
      self.record_mutation(parent, MutationKind::ChildList);
      if let Some(p) = self.nodes.get_mut(&parent) {
        p.children.retain(|&c| c != node);
      }
    }

    let mut stack = vec![node];
    while let Some(id) = stack.pop() {
      if let Some(removed) = self.nodes.remove(&id) {
        stack.extend(removed.children);
      }
      if let Some(frame) = self.frames.remove(&id) {
        stack.push(frame.document);
      }
      self.observers.remove(&id);
    }
    Ok(())
  }

  /// Replace a text node's content. Reported as a character-data change at
  /// the text node itself.
  pub fn set_text(&mut self, node: NodeId, content: &str) -> Result<()> {
    match self.nodes.get_mut(&node) {
      None => Err(DomError::Detached { node }.into()),
      Some(n) => match &mut n.kind {
        NodeKind::Text { content: slot } => {
          *slot = content.to_string();
          self.record_mutation(node, MutationKind::CharacterData);
          Ok(())
        }
        _ => Err(DomError::NotAText { node }.into()),
      },
    }
  }

  /// Attach a shadow root to `host` as its first child.
  ///
  /// The insertion is reported as a child-list change at the host so a
  /// watcher can discover roots attached after initial load.
  pub fn attach_shadow_root(&mut self, host: NodeId, mode: ShadowRootMode) -> Result<NodeId> {
    self.element_data_mut(host)?;
    if self.shadow_root_of_any_mode(host).is_some() {
      return Err(DomError::ShadowRootExists { host }.into());
    }
    let shadow = self.insert(NodeKind::ShadowRoot { mode });
    let host_node = self.nodes.get_mut(&host).unwrap();
    host_node.children.insert(0, shadow);
    self.nodes.get_mut(&shadow).unwrap().parent = Some(host);
    self.record_mutation(host, MutationKind::ChildList);
    Ok(shadow)
  }

  /// The shadow root attached to `host`, regardless of mode.
  fn shadow_root_of_any_mode(&self, host: NodeId) -> Option<NodeId> {
    self
      .children(host)
      .iter()
      .copied()
      .find(|&c| matches!(self.kind(c), Some(NodeKind::ShadowRoot { .. })))
  }

  /// The shadow root attached to `host`, if it is open.
  ///
  /// Closed roots are invisible here by design; traversal code only ever
  /// reaches open roots.
  pub fn open_shadow_root_of(&self, host: NodeId) -> Option<NodeId> {
    let shadow = self.shadow_root_of_any_mode(host)?;
    match self.kind(shadow) {
      Some(NodeKind::ShadowRoot {
        mode: ShadowRootMode::Open,
      }) => Some(shadow),
      _ => None,
    }
  }

  /// Give a frame element a fresh content document and return it.
  ///
  /// Re-attaching replaces the previous content document (frame
  /// navigation); the old document subtree is dropped.
  pub fn attach_frame_document(&mut self, frame: NodeId, same_origin: bool) -> Result<NodeId> {
    self.element_data_mut(frame)?;
    if let Some(old) = self.frames.remove(&frame) {
      let mut stack = vec![old.document];
      while let Some(id) = stack.pop() {
        if let Some(removed) = self.nodes.remove(&id) {
          stack.extend(removed.children);
        }
        if let Some(nested) = self.frames.remove(&id) {
          stack.push(nested.document);
        }
        self.observers.remove(&id);
      }
    }
    let document = self.create_document();
    self.frames.insert(
      frame,
      FrameContent {
        document,
        same_origin,
      },
    );
    Ok(document)
  }

  /// The content document of a frame element.
  ///
  /// `Ok(None)` means no document is attached; `Err(CrossOriginFrame)` is
  /// the expected access failure for foreign-origin frames and is skipped
  /// silently by discovery.
  pub fn content_document(&self, frame: NodeId) -> Result<Option<NodeId>> {
    if !self.contains(frame) {
      return Err(DomError::Detached { node: frame }.into());
    }
    match self.frames.get(&frame) {
      None => Ok(None),
      Some(content) if !content.same_origin => Err(DomError::CrossOriginFrame { frame }.into()),
      Some(content) => Ok(Some(content.document)),
    }
  }

  /// The nearest self-or-ancestor node that anchors a traversal root
  /// (document or shadow root).
  pub fn owning_root(&self, node: NodeId) -> Option<NodeId> {
    let mut cursor = Some(node);
    while let Some(id) = cursor {
      match self.kind(id)? {
        NodeKind::Document | NodeKind::ShadowRoot { .. } => return Some(id),
        _ => cursor = self.parent(id),
      }
    }
    None
  }

  pub fn is_descendant_or_self(&self, node: NodeId, ancestor: NodeId) -> bool {
    let mut cursor = Some(node);
    while let Some(id) = cursor {
      if id == ancestor {
        return true;
      }
      cursor = self.parent(id);
    }
    false
  }

  /// All element nodes inside a traversal root, in document order, without
  /// descending into nested shadow roots or inert template content.
  pub fn elements_under(&self, root: NodeId) -> Vec<NodeId> {
    let mut out = Vec::new();
    let mut stack: Vec<NodeId> = self.children(root).iter().rev().copied().collect();
    while let Some(id) = stack.pop() {
      match self.kind(id) {
        Some(NodeKind::Element(data)) => {
          let inert = data.tag_name.eq_ignore_ascii_case("template");
          out.push(id);
          if !inert {
            stack.extend(self.children(id).iter().rev().copied());
          }
        }
        // Nested shadow roots are separate traversal roots.
        Some(NodeKind::ShadowRoot { .. }) | Some(NodeKind::Document) => {}
        Some(NodeKind::Text { .. }) | None => {}
      }
    }
    out
  }

  /// The first `body` element inside a document root, if any.
  pub fn find_body(&self, root: NodeId) -> Option<NodeId> {
    self
      .elements_under(root)
      .into_iter()
      .find(|&el| self.tag_name(el).is_some_and(|t| t.eq_ignore_ascii_case("body")))
  }

  /// Attach an observer for `root`, delivering records to `sender`.
  ///
  /// Attaching is idempotent per root: a second call while an observer is
  /// live is a no-op and returns false.
  pub fn observe(
    &mut self,
    root: NodeId,
    target: NodeId,
    sender: UnboundedSender<MutationRecord>,
  ) -> bool {
    if !self.contains(root) || !self.contains(target) {
      return false;
    }
    if self.observers.contains_key(&root) {
      return false;
    }
    self.observers.insert(root, Observer { target, sender });
    true
  }

  pub fn is_observed(&self, root: NodeId) -> bool {
    self.observers.contains_key(&root)
  }

  pub fn disconnect(&mut self, root: NodeId) {
    self.observers.remove(&root);
  }

  pub fn disconnect_all(&mut self) {
    self.observers.clear();
  }

  pub fn observed_root_count(&self) -> usize {
    self.observers.len()
  }

  fn record_mutation(&mut self, at: NodeId, kind: MutationKind) {
    let Some(root) = self.owning_root(at) else {
      return;
    };
    let Some(observer) = self.observers.get(&root) else {
      return;
    };
    if !self.is_descendant_or_self(at, observer.target) {
      return;
    }
    let record = MutationRecord {
      root,
      target: at,
      kind,
    };
    if observer.sender.send(record).is_err() {
      log::debug!("mutation receiver for root {:?} is gone; dropping record", root);
    }
  }
}

impl Default for Dom {
  fn default() -> Self {
    Self::new()
  }
}

/// A document plus the URL it was loaded from.
///
/// The URL is what domain matching runs against; the document node is the
/// seed for scope discovery.
pub struct Page {
  pub dom: Dom,
  pub document: NodeId,
  pub url: Url,
}

impl Page {
  /// An empty page (document node only) at the given URL.
  pub fn new(url: Url) -> Self {
    let mut dom = Dom::new();
    let document = dom.create_document();
    Self { dom, document, url }
  }

  pub fn hostname(&self) -> &str {
    self.url.host_str().unwrap_or("")
  }
}
