use anyhow::Error;
use html::dom::{DOM, DOMSubscriber, DOMUpdate, NodeKey};

use crate::{ComputedStyle, StyleEngine, StyleProvider};

/// A DOM paired with the engine that styles it.
///
/// As a [`DOMSubscriber`] it can sit behind a `DOMMirror`, keeping a styled
/// replica of a live document.
pub struct StyledDocument {
    dom: DOM,
    engine: StyleEngine,
}

impl StyledDocument {
    /// An empty document styled by `engine`.
    pub fn new(engine: StyleEngine) -> Self {
        Self::from_parts(DOM::new(), engine)
    }

    pub const fn from_parts(dom: DOM, engine: StyleEngine) -> Self {
        Self { dom, engine }
    }

    pub const fn dom(&self) -> &DOM {
        &self.dom
    }

    pub const fn engine(&self) -> &StyleEngine {
        &self.engine
    }

    pub const fn engine_mut(&mut self) -> &mut StyleEngine {
        &mut self.engine
    }
}

impl DOMSubscriber for StyledDocument {
    fn apply_update(&mut self, update: DOMUpdate) -> Result<(), Error> {
        self.dom.apply(&update)
    }
}

impl StyleProvider for StyledDocument {
    fn computed_style(&self, node: NodeKey) -> Result<ComputedStyle, Error> {
        self.engine.compute(&self.dom, node)
    }
}
