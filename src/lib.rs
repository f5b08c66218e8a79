pub mod collect;
pub mod discovery;
pub mod dom;
pub mod engine;
pub mod error;
pub mod host;
pub mod html;
pub mod matching;
pub mod settings;
pub mod sizing;
pub mod style;
pub mod watcher;

pub use dom::{Dom, MutationKind, MutationRecord, NodeId, NodeKind, Page, ShadowRootMode};
pub use engine::{Evaluation, PassOutcome, RewriteEngine};
pub use error::{Error, Result};
pub use host::{HostContext, MemoryStore, SettingsStore, Signal};
pub use html::parse_page;
pub use matching::{DomainMatcher, HostMatchMode};
pub use settings::{DomainRule, IncreaseKind, IncreaseMethod, ListType, Settings, SizeUnit};
pub use style::FontSize;
pub use watcher::{Watcher, QUIET_PERIOD};
