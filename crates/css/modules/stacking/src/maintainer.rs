//! Debounced incremental maintenance of a [`ContextTree`].
//!
//! The maintainer owns a mirrored copy of the document and replays every
//! committed `DOMUpdate` batch into it. Relevant mutations arm a debounce
//! deadline; once it passes without further mutations, buffered removals are
//! applied, the tree is rescanned from the maintained root, competitors are
//! recomputed and a fresh snapshot is published to readers.

use core::future;
use core::mem;
use std::collections::BTreeSet;
use std::sync::Arc;

use anyhow::Error;
use html::dom::{DOMMirror, DOMSubscriber, DOMUpdate, NodeKey};
use log::{debug, info, trace};
use style_engine::StyleProvider;
use tokio::sync::broadcast::Receiver;
use tokio::sync::watch;
use tokio::time::{Instant, sleep_until};
use tracing::info_span;

use crate::config::StackingConfig;
use crate::scanner::scan;
use crate::source::{TreeSource, context_label};
use crate::tree::ContextTree;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MaintainerState {
    /// Nothing to do.
    Idle,
    /// Mutations seen; waiting for the debounce deadline.
    Pending,
    /// Rebuilding the context tree.
    Processing,
}

pub struct StackingMaintainer<D> {
    document: D,
    contexts: ContextTree,
    root: NodeKey,
    config: StackingConfig,
    state: MaintainerState,
    deadline: Option<Instant>,
    removed: BTreeSet<NodeKey>,
    cycles: u64,
    snapshots: watch::Sender<Arc<ContextTree>>,
}

impl<D> StackingMaintainer<D>
where
    D: TreeSource + StyleProvider + DOMSubscriber,
{
    /// Build the initial context tree for `root` and start in the idle state.
    ///
    /// # Errors
    /// Propagates style provider failures from the initial scan.
    pub fn start(document: D, root: NodeKey, config: StackingConfig) -> Result<Self, Error> {
        let _span = info_span!("stacking_start", root = root.0).entered();
        let mut contexts = ContextTree::new(root, context_label(&document, root));
        let stats = scan(&mut contexts, root, &document, &document)?;
        contexts.recalculate_competitors(&document, &document)?;
        info!(
            "stacking: initial scan found {} contexts in {} elements",
            stats.contexts, stats.visited
        );
        let (snapshots, _) = watch::channel(Arc::new(contexts.clone()));
        Ok(Self {
            document,
            contexts,
            root,
            config,
            state: MaintainerState::Idle,
            deadline: None,
            removed: BTreeSet::new(),
            cycles: 0,
            snapshots,
        })
    }

    /// Readers receive the tree as of the latest completed processing turn.
    pub fn subscribe(&self) -> watch::Receiver<Arc<ContextTree>> {
        self.snapshots.subscribe()
    }

    pub const fn contexts(&self) -> &ContextTree {
        &self.contexts
    }

    pub const fn document(&self) -> &D {
        &self.document
    }

    pub const fn state(&self) -> MaintainerState {
        self.state
    }

    pub const fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Completed processing turns since [`StackingMaintainer::start`].
    pub const fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn into_document(self) -> D {
        self.document
    }

    /// Mirror one committed batch and re-arm the debounce deadline if it matters.
    ///
    /// Nodes removed by the batch are remembered, with their whole subtree,
    /// before the removal is mirrored.
    ///
    /// # Errors
    /// Returns an error if the mirror rejects an update.
    pub fn handle_batch(&mut self, batch: Vec<DOMUpdate>, now: Instant) -> Result<(), Error> {
        for update in batch {
            self.observe(update, now)?;
        }
        Ok(())
    }

    fn observe(&mut self, update: DOMUpdate, now: Instant) -> Result<(), Error> {
        let relevant = match &update {
            DOMUpdate::RemoveNode { node } => {
                self.removed.extend(self.document.descendants(*node));
                true
            }
            DOMUpdate::InsertElement { .. } | DOMUpdate::InsertText { .. } => true,
            DOMUpdate::SetAttr { node, name, .. } => {
                let watched = self.config.watches(name);
                if !watched {
                    trace!("stacking: ignoring `{name}` change on {node}");
                }
                watched
            }
            DOMUpdate::EndOfDocument => false,
        };
        self.document.apply_update(update)?;
        if relevant {
            self.deadline = Some(now + self.config.debounce());
            self.state = MaintainerState::Pending;
        }
        Ok(())
    }

    /// Process if the debounce deadline has passed; returns whether it did.
    ///
    /// # Errors
    /// Same conditions as [`StackingMaintainer::process`].
    pub fn poll(&mut self, now: Instant) -> Result<bool, Error> {
        let due = self.state == MaintainerState::Pending
            && self.deadline.is_some_and(|deadline| now >= deadline);
        if due {
            self.process()?;
        }
        Ok(due)
    }

    /// Run one processing turn right away.
    ///
    /// # Errors
    /// Propagates style provider failures; the maintainer returns to idle.
    pub fn process(&mut self) -> Result<(), Error> {
        self.state = MaintainerState::Processing;
        self.deadline = None;
        let result = self.rebuild();
        self.state = MaintainerState::Idle;
        result
    }

    fn rebuild(&mut self) -> Result<(), Error> {
        let cycle = self.cycles + 1;
        let _span = info_span!("stacking_cycle", cycle).entered();
        let mut pruned = 0usize;
        for node in mem::take(&mut self.removed) {
            if self.contexts.remove_context(node) {
                pruned += 1;
            }
        }
        let stats = scan(&mut self.contexts, self.root, &self.document, &self.document)?;
        self.contexts
            .recalculate_competitors(&self.document, &self.document)?;
        self.cycles = cycle;
        self.snapshots
            .send_replace(Arc::new(self.contexts.clone()));
        debug!(
            "stacking: cycle {cycle} pruned {pruned}, added {}, demoted {}, {} contexts total",
            stats.added,
            stats.demoted,
            self.contexts.len()
        );
        Ok(())
    }

    /// Follow `updates` until the sending document goes away.
    ///
    /// Batches are mirrored through a [`DOMMirror`] driving this maintainer.
    /// A pending turn is flushed when the channel closes, and the maintainer
    /// is handed back.
    ///
    /// # Errors
    /// Returns an error if batches were dropped because the receiver lagged
    /// (the mirror would no longer match the source), or if processing fails.
    pub async fn run(self, updates: Receiver<Vec<DOMUpdate>>) -> Result<Self, Error> {
        let mut mirror = DOMMirror::new(updates, self);
        loop {
            let deadline = mirror.mirror().deadline;
            tokio::select! {
                received = mirror.next_batch() => {
                    if !received? {
                        let mut maintainer = mirror.into_inner();
                        if maintainer.state == MaintainerState::Pending {
                            maintainer.process()?;
                        }
                        return Ok(maintainer);
                    }
                }
                () = sleep_until_deadline(deadline) => {
                    mirror.mirror_mut().poll(Instant::now())?;
                }
            }
        }
    }
}

/// Each mirrored update is observed at the current time.
impl<D> DOMSubscriber for StackingMaintainer<D>
where
    D: TreeSource + StyleProvider + DOMSubscriber,
{
    fn apply_update(&mut self, update: DOMUpdate) -> Result<(), Error> {
        self.observe(update, Instant::now())
    }
}

async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(instant) => sleep_until(instant).await,
        None => future::pending().await,
    }
}
