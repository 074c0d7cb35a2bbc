use anyhow::{Error, anyhow};
use log::warn;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};

use super::{DOM, NodeKey};

/// A batchable update applied to the DOM and mirrored to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DOMUpdate {
    InsertElement {
        parent: NodeKey,
        node: NodeKey,
        tag: String,
        pos: usize,
    },
    InsertText {
        parent: NodeKey,
        node: NodeKey,
        text: String,
        pos: usize,
    },
    SetAttr {
        node: NodeKey,
        name: String,
        value: String,
    },
    RemoveNode {
        node: NodeKey,
    },
    EndOfDocument,
}

/// A subscriber that receives `DOMUpdate` values and mirrors them into its own state.
pub trait DOMSubscriber {
    /// Apply a single `DOMUpdate` to the subscriber state.
    ///
    /// # Errors
    /// Returns an error when the update cannot be mirrored consistently.
    fn apply_update(&mut self, update: DOMUpdate) -> Result<(), Error>;
}

/// A plain `DOM` can itself act as a mirror of another `DOM`.
impl DOMSubscriber for DOM {
    fn apply_update(&mut self, update: DOMUpdate) -> Result<(), Error> {
        self.apply(&update)
    }
}

/// Drives a subscriber from the broadcast stream of committed batches.
pub struct DOMMirror<T: DOMSubscriber> {
    in_updater: broadcast::Receiver<Vec<DOMUpdate>>,
    mirror: T,
}

impl<T: DOMSubscriber> DOMMirror<T> {
    pub const fn new(in_updater: broadcast::Receiver<Vec<DOMUpdate>>, mirror: T) -> Self {
        Self { in_updater, mirror }
    }

    /// Wait for the next batch and apply it.
    ///
    /// Returns `false` once the sending `DOM` has been dropped.
    ///
    /// # Errors
    /// Returns an error if the subscriber rejects an update or if batches were
    /// dropped because this mirror lagged behind; a lagged mirror no longer
    /// reflects the source tree.
    pub async fn next_batch(&mut self) -> Result<bool, Error> {
        match self.in_updater.recv().await {
            Ok(batch) => {
                for update in batch {
                    self.mirror.apply_update(update)?;
                }
                Ok(true)
            }
            Err(RecvError::Closed) => Ok(false),
            Err(RecvError::Lagged(skipped)) => {
                Err(anyhow!("DOM mirror lagged behind by {skipped} batches"))
            }
        }
    }

    /// Synchronous variant draining every batch that is already queued.
    ///
    /// # Errors
    /// Same conditions as [`DOMMirror::next_batch`].
    pub fn try_update_sync(&mut self) -> Result<usize, Error> {
        let mut applied = 0usize;
        loop {
            match self.in_updater.try_recv() {
                Ok(batch) => {
                    for update in batch {
                        self.mirror.apply_update(update)?;
                    }
                    applied += 1;
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!("DOM mirror lagged behind by {skipped} batches");
                    return Err(anyhow!("DOM mirror lagged behind by {skipped} batches"));
                }
            }
        }
        Ok(applied)
    }

    pub const fn mirror(&self) -> &T {
        &self.mirror
    }

    pub const fn mirror_mut(&mut self) -> &mut T {
        &mut self.mirror
    }

    pub fn into_inner(self) -> T {
        self.mirror
    }
}
