//! DOM tree used as the tree source for stacking-context analysis.
//!
//! The tree lives in an `indextree` arena keyed by stable [`dom::NodeKey`]s.
//! Every mutation is expressed as a [`dom::DOMUpdate`] and committed in
//! batches that are broadcast to mirrors subscribed via [`dom::DOM::subscribe`].

#![allow(
    clippy::missing_inline_in_public_items,
    reason = "Inlining decisions left to compiler for this crate"
)]

pub mod dom;
