//! Arena-backed tree of stacking contexts.
//!
//! Every context is keyed by the node that owns it. Parent links follow tree
//! containment: the parent of a context is the context of its nearest
//! registered ancestor element. The root context is created up front and
//! survives every removal.

use core::fmt;
use std::collections::HashMap;

use anyhow::{Error, anyhow};
use html::dom::NodeKey;
use indextree::{Arena, Node, NodeId};
use log::{debug, trace};
use style_engine::StyleProvider;

use crate::normalize::parse_z_index;
use crate::properties::{ContextProperties, PropertyValue};
use crate::ranker::{Competitor, rank};
use crate::rules::classify;
use crate::source::{TreeSource, context_label};

/// Stable handle of a context inside its [`ContextTree`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ContextId(NodeId);

impl fmt::Display for ContextId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "ctx{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct StackingContext {
    pub node: NodeKey,
    /// `tag.class1.class2`, for display only.
    pub label: String,
    pub properties: ContextProperties,
    /// Direct element children that are not contexts and have a numeric z-index.
    pub competitors: Vec<Competitor>,
}

#[derive(Clone, Debug)]
pub struct ContextTree {
    arena: Arena<StackingContext>,
    root: ContextId,
    index: HashMap<NodeKey, ContextId>,
}

impl ContextTree {
    /// A tree holding only the root context for `root`.
    pub fn new(root: NodeKey, label: impl Into<String>) -> Self {
        let mut properties = ContextProperties::default();
        properties.insert("root-element", PropertyValue::Flag(true));
        let mut arena = Arena::new();
        let root_id = ContextId(arena.new_node(StackingContext {
            node: root,
            label: label.into(),
            properties,
            competitors: Vec::new(),
        }));
        let mut index = HashMap::new();
        index.insert(root, root_id);
        Self {
            arena,
            root: root_id,
            index,
        }
    }

    pub const fn root(&self) -> ContextId {
        self.root
    }

    pub fn root_node(&self) -> NodeKey {
        self.get(self.root)
            .map_or(NodeKey::ROOT, |context| context.node)
    }

    /// Number of registered contexts, the root included.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Always false: the root context cannot be removed.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn contains(&self, node: NodeKey) -> bool {
        self.index.contains_key(&node)
    }

    pub fn context_id(&self, node: NodeKey) -> Option<ContextId> {
        self.index.get(&node).copied()
    }

    pub fn get(&self, id: ContextId) -> Option<&StackingContext> {
        self.arena
            .get(id.0)
            .filter(|entry| !entry.is_removed())
            .map(Node::get)
    }

    pub fn get_context(&self, node: NodeKey) -> Option<&StackingContext> {
        self.context_id(node).and_then(|id| self.get(id))
    }

    pub fn parent(&self, id: ContextId) -> Option<ContextId> {
        self.arena.get(id.0)?.parent().map(ContextId)
    }

    /// Child contexts in insertion order.
    pub fn children(&self, id: ContextId) -> Vec<ContextId> {
        id.0.children(&self.arena).map(ContextId).collect()
    }

    /// Every context in pre-order, starting at the root.
    pub fn iter(&self) -> impl Iterator<Item = (ContextId, &StackingContext)> {
        self.root
            .0
            .descendants(&self.arena)
            .filter_map(|id| self.get(ContextId(id)).map(|context| (ContextId(id), context)))
    }

    /// The context of the nearest proper ancestor of `node` that owns one.
    pub fn find_parent_context<T: TreeSource + ?Sized>(
        &self,
        node: NodeKey,
        tree: &T,
    ) -> Option<ContextId> {
        let mut cursor = tree.parent(node);
        while let Some(ancestor) = cursor {
            if let Some(id) = self.context_id(ancestor) {
                return Some(id);
            }
            cursor = tree.parent(ancestor);
        }
        None
    }

    /// Classify `node` and register or refresh its context.
    ///
    /// Returns `None` when the node is not a context. Refreshing an existing
    /// context updates its label, properties and competitors in place and
    /// moves it if its nearest enclosing context changed. A new context
    /// takes over any existing sibling contexts that lie inside it.
    ///
    /// # Errors
    /// Propagates style provider failures.
    pub fn add_context<T, S>(
        &mut self,
        node: NodeKey,
        tree: &T,
        styles: &S,
    ) -> Result<Option<ContextId>, Error>
    where
        T: TreeSource + ?Sized,
        S: StyleProvider + ?Sized,
    {
        let is_root = node == self.root_node();
        let mut classification = classify(node, tree, styles)?;
        if !classification.is_context && !is_root {
            return Ok(None);
        }
        if is_root {
            classification
                .properties
                .insert("root-element", PropertyValue::Flag(true));
        }
        let label = context_label(tree, node);
        let competitors = self.competitors_of(node, tree, styles)?;

        if let Some(id) = self.context_id(node) {
            if let Some(entry) = self.arena.get_mut(id.0) {
                let context = entry.get_mut();
                context.label = label;
                context.properties = classification.properties;
                context.competitors = competitors;
            }
            if !is_root {
                let parent = self.find_parent_context(node, tree).unwrap_or(self.root);
                if let Some(previous) = self.parent(id)
                    && previous != parent
                {
                    trace!("stacking: moving {node} under {parent}");
                    id.0.detach(&mut self.arena);
                    self.attach(parent, id)?;
                    self.refresh_competitors(previous, tree, styles)?;
                    self.refresh_competitors(parent, tree, styles)?;
                }
            }
            return Ok(Some(id));
        }

        let parent = self.find_parent_context(node, tree).unwrap_or_else(|| {
            debug!("stacking: {node} has no enclosing context, attaching to the root");
            self.root
        });
        let id = ContextId(self.arena.new_node(StackingContext {
            node,
            label,
            properties: classification.properties,
            competitors,
        }));
        self.attach(parent, id)?;
        self.index.insert(node, id);

        let adopted: Vec<ContextId> = self
            .children(parent)
            .into_iter()
            .filter(|sibling| *sibling != id)
            .filter(|sibling| {
                self.get(*sibling)
                    .is_some_and(|context| tree.contains(node, context.node))
            })
            .collect();
        for sibling in adopted {
            trace!("stacking: {node} adopts {sibling}");
            sibling.0.detach(&mut self.arena);
            self.attach(id, sibling)?;
        }
        // `node` may have been competing inside its parent until now.
        self.refresh_competitors(parent, tree, styles)?;
        Ok(Some(id))
    }

    fn attach(&mut self, parent: ContextId, child: ContextId) -> Result<(), Error> {
        parent
            .0
            .checked_append(child.0, &mut self.arena)
            .map_err(|err| anyhow!("cannot attach {child} under {parent}: {err}"))
    }

    /// Remove the context of `node` together with every context below it.
    ///
    /// Returns `false` if `node` has no context or owns the root context.
    pub fn remove_context(&mut self, node: NodeKey) -> bool {
        let Some(id) = self.context_id(node) else {
            debug!("stacking: no context to remove for {node}");
            return false;
        };
        if id == self.root {
            debug!("stacking: refusing to remove the root context");
            return false;
        }
        let owners: Vec<NodeKey> = id
            .0
            .descendants(&self.arena)
            .filter_map(|desc| self.arena.get(desc).map(|entry| entry.get().node))
            .collect();
        for owner in &owners {
            self.index.remove(owner);
        }
        id.0.remove_subtree(&mut self.arena);
        trace!("stacking: removed {} contexts rooted at {node}", owners.len());
        true
    }

    /// Remove only the context of `node`; its child contexts move up to its parent.
    ///
    /// The parent's competitors are recomputed, since `node` may now compete
    /// inside it. Returns `false` if `node` has no context or owns the root
    /// context.
    ///
    /// # Errors
    /// Propagates style provider failures.
    pub fn demote_context<T, S>(&mut self, node: NodeKey, tree: &T, styles: &S) -> Result<bool, Error>
    where
        T: TreeSource + ?Sized,
        S: StyleProvider + ?Sized,
    {
        let Some(id) = self.context_id(node) else {
            return Ok(false);
        };
        if id == self.root {
            return Ok(false);
        }
        let parent = self.parent(id).unwrap_or(self.root);
        self.index.remove(&node);
        id.0.remove(&mut self.arena);
        trace!("stacking: demoted {node}");
        self.refresh_competitors(parent, tree, styles)?;
        Ok(true)
    }

    /// Recompute and re-rank the competitors of every context without reclassifying.
    ///
    /// # Errors
    /// Propagates style provider failures.
    pub fn recalculate_competitors<T, S>(&mut self, tree: &T, styles: &S) -> Result<(), Error>
    where
        T: TreeSource + ?Sized,
        S: StyleProvider + ?Sized,
    {
        let owners: Vec<ContextId> = self.iter().map(|(id, _)| id).collect();
        for id in owners {
            self.refresh_competitors(id, tree, styles)?;
        }
        Ok(())
    }

    fn refresh_competitors<T, S>(&mut self, id: ContextId, tree: &T, styles: &S) -> Result<(), Error>
    where
        T: TreeSource + ?Sized,
        S: StyleProvider + ?Sized,
    {
        let Some(node) = self.get(id).map(|context| context.node) else {
            return Ok(());
        };
        let competitors = self.competitors_of(node, tree, styles)?;
        if let Some(entry) = self.arena.get_mut(id.0) {
            entry.get_mut().competitors = competitors;
        }
        Ok(())
    }

    fn competitors_of<T, S>(
        &self,
        node: NodeKey,
        tree: &T,
        styles: &S,
    ) -> Result<Vec<Competitor>, Error>
    where
        T: TreeSource + ?Sized,
        S: StyleProvider + ?Sized,
    {
        let mut ranked = Vec::new();
        for child in tree.children(node) {
            if self.contains(child) {
                continue;
            }
            let style = styles.computed_style(child)?;
            if let Some(z_index) = parse_z_index(style.get("z-index")).value() {
                ranked.push((child, z_index));
            }
        }
        Ok(rank(&ranked))
    }

    /// Owners of the contexts enclosing `node`, innermost first, ending at the root.
    ///
    /// Starts with `node` itself when it owns a context; empty for unknown nodes.
    pub fn path_to_root(&self, node: NodeKey) -> Vec<NodeKey> {
        let Some(id) = self.context_id(node) else {
            return Vec::new();
        };
        id.0.ancestors(&self.arena)
            .filter_map(|ancestor| self.arena.get(ancestor).map(|entry| entry.get().node))
            .collect()
    }
}
