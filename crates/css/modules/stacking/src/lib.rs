//! CSS stacking contexts — classification and an incrementally maintained context tree.
//! Spec: <https://www.w3.org/TR/CSS2/zindex.html>
//! Spec: <https://developer.mozilla.org/en-US/docs/Web/CSS/CSS_positioned_layout/Stacking_context>
//!
//! The crate answers two questions for a styled document: which elements
//! establish a stacking context, and which elements compete for paint order
//! inside their nearest enclosing context. [`ContextTree`] holds the answer,
//! [`scan`] fills it, and [`StackingMaintainer`] keeps it current while the
//! document mutates.

#![allow(
    clippy::missing_inline_in_public_items,
    reason = "Library crate; inlining is left to the compiler"
)]

pub mod config;
pub mod maintainer;
pub mod normalize;
mod printing;
pub mod properties;
pub mod ranker;
pub mod rules;
pub mod scanner;
mod source;
pub mod tree;

pub use config::StackingConfig;
pub use maintainer::{MaintainerState, StackingMaintainer};
pub use normalize::{StyleSnapshot, ZIndex};
pub use properties::{ContextProperties, PropertyValue};
pub use ranker::{Competitor, rank};
pub use rules::{Classification, classify};
pub use scanner::{ScanStats, scan};
pub use source::{TreeSource, context_label};
pub use tree::{ContextId, ContextTree, StackingContext};
