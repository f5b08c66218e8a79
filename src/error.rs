//! Error types for fontboost
//!
//! The crate follows a "degrade, never throw into the page" policy: most
//! failure modes (invalid domain regexes, cross-origin frames, detached
//! nodes) are absorbed at the site that observes them and reported through
//! return values. The types here cover the remaining cases (DOM misuse,
//! page ingestion, settings decoding) and use `thiserror` for the
//! error-trait plumbing.

use crate::dom::NodeId;
use thiserror::Error;

/// Result type alias for fontboost operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for fontboost.
#[derive(Error, Debug)]
pub enum Error {
  /// DOM access or mutation error
  #[error("DOM error: {0}")]
  Dom(#[from] DomError),

  /// Page ingestion (HTML/URL) error
  #[error("Parse error: {0}")]
  Parse(#[from] ParseError),

  /// Settings decoding error
  #[error("Settings error: {0}")]
  Settings(#[from] SettingsError),

  /// I/O error (file reading in the CLI)
  #[error("I/O error: {0}")]
  Io(#[from] std::io::Error),
}

/// Errors raised by the DOM arena.
///
/// Callers inside the engine treat most of these as expected conditions:
/// a `CrossOriginFrame` during discovery is skipped silently, a `Detached`
/// node during collection just drops that node from the pass.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomError {
  /// The node id does not resolve to a live node.
  #[error("node {node:?} is not part of the tree")]
  Detached { node: NodeId },

  /// The operation requires an element node.
  #[error("node {node:?} is not an element")]
  NotAnElement { node: NodeId },

  /// The operation requires a text node.
  #[error("node {node:?} is not a text node")]
  NotAText { node: NodeId },

  /// The frame's content document belongs to another origin.
  #[error("content document of frame {frame:?} is cross-origin")]
  CrossOriginFrame { frame: NodeId },

  /// The element already hosts a shadow root.
  #[error("element {host:?} already hosts a shadow root")]
  ShadowRootExists { host: NodeId },

  /// The insertion would make a node its own ancestor.
  #[error("cannot insert node {child:?} under its own descendant {parent:?}")]
  HierarchyViolation { parent: NodeId, child: NodeId },
}

/// Errors that occur while ingesting a page.
#[derive(Error, Debug, Clone)]
pub enum ParseError {
  /// The page URL could not be parsed.
  #[error("invalid page URL '{url}': {message}")]
  InvalidUrl { url: String, message: String },

  /// The HTML source could not be parsed.
  #[error("failed to parse HTML: {message}")]
  InvalidHtml { message: String },
}

/// Errors that occur while decoding persisted settings.
///
/// Collaborators map these to "settings absent"; corrupt storage must never
/// take the engine down.
#[derive(Error, Debug)]
pub enum SettingsError {
  /// The persisted JSON does not match the settings shape.
  #[error("invalid settings JSON: {0}")]
  Invalid(#[from] serde_json::Error),
}
