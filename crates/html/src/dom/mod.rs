use anyhow::{Error, anyhow, bail};
use core::fmt;
use indextree::{Arena, Node, NodeId};
use log::{debug, trace};
use smallvec::SmallVec;
use std::collections::HashMap;
use tokio::sync::broadcast;

pub mod printing;
pub mod updating;

pub use updating::{DOMMirror, DOMSubscriber, DOMUpdate};

/// Capacity of the broadcast channel carrying committed update batches.
const UPDATE_CHANNEL_CAPACITY: usize = 256;

/// A 64-bit stable key for DOM nodes used to correlate asynchronous updates.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, PartialOrd, Ord, Default)]
pub struct NodeKey(pub u64);

impl NodeKey {
    /// The document node key (always present).
    pub const ROOT: Self = Self(0);
}

impl fmt::Display for NodeKey {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum NodeKind {
    #[default]
    Document,
    Element {
        tag: String,
    },
    Text {
        text: String,
    },
}

#[derive(Debug, Clone, Default)]
pub struct DOMNode {
    pub key: NodeKey,
    pub kind: NodeKind,
    pub attrs: SmallVec<(String, String), 4>,
}

impl DOMNode {
    /// Lowercased tag name for elements.
    pub fn tag(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Element { tag } => Some(tag.as_str()),
            NodeKind::Document | NodeKind::Text { .. } => None,
        }
    }

    pub const fn is_element(&self) -> bool {
        matches!(self.kind, NodeKind::Element { .. })
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(attr_name, _)| attr_name.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    fn set_attr(&mut self, name: &str, value: &str) {
        let name = name.to_ascii_lowercase();
        if let Some(slot) = self
            .attrs
            .iter_mut()
            .find(|(attr_name, _)| *attr_name == name)
        {
            slot.1 = value.to_owned();
        } else {
            self.attrs.push((name, value.to_owned()));
        }
    }
}

/// Arena-backed document tree.
///
/// Mutations are applied through [`DOM::commit`], which applies a batch of
/// [`DOMUpdate`]s in order and then broadcasts the same batch to every
/// subscriber so that mirrors can replay it.
pub struct DOM {
    dom: Arena<DOMNode>,
    root: NodeId,
    nodes: HashMap<NodeKey, NodeId>,
    update_sender: broadcast::Sender<Vec<DOMUpdate>>,
    next_key: u64,
}

impl Default for DOM {
    fn default() -> Self {
        Self::new()
    }
}

impl DOM {
    pub fn new() -> Self {
        let mut dom = Arena::new();
        let root = dom.new_node(DOMNode::default());
        let (update_sender, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        let mut nodes = HashMap::new();
        nodes.insert(NodeKey::ROOT, root);
        Self {
            dom,
            root,
            nodes,
            update_sender,
            next_key: 1,
        }
    }

    /// Subscribe to batches committed after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Vec<DOMUpdate>> {
        self.update_sender.subscribe()
    }

    /// Mint a key that is not used by any node currently in the tree.
    pub fn mint_key(&mut self) -> NodeKey {
        loop {
            let key = NodeKey(self.next_key);
            self.next_key = self.next_key.wrapping_add(1).max(1);
            if !self.nodes.contains_key(&key) {
                return key;
            }
        }
    }

    /// Apply a batch of updates and broadcast it to subscribers.
    ///
    /// # Errors
    /// Returns an error if an update references a node that does not exist or
    /// would corrupt the tree. Updates before the failing one stay applied and
    /// nothing is broadcast.
    pub fn commit(&mut self, batch: Vec<DOMUpdate>) -> Result<(), Error> {
        for update in &batch {
            self.apply(update)?;
        }
        if self.update_sender.receiver_count() > 0 {
            self.update_sender
                .send(batch)
                .map_err(|_| anyhow!("DOM update channel closed"))?;
        }
        Ok(())
    }

    /// Apply a single update without broadcasting it.
    ///
    /// # Errors
    /// Returns an error for updates referencing unknown parents, duplicate
    /// node keys, or attribute writes on non-element nodes.
    pub fn apply(&mut self, update: &DOMUpdate) -> Result<(), Error> {
        match update {
            DOMUpdate::InsertElement {
                parent,
                node,
                tag,
                pos,
            } => {
                let kind = NodeKind::Element {
                    tag: tag.to_ascii_lowercase(),
                };
                self.insert(*parent, *node, kind, *pos)
            }
            DOMUpdate::InsertText {
                parent,
                node,
                text,
                pos,
            } => {
                let kind = NodeKind::Text { text: text.clone() };
                self.insert(*parent, *node, kind, *pos)
            }
            DOMUpdate::SetAttr { node, name, value } => {
                let id = self.id_of(*node)?;
                let entry = self
                    .dom
                    .get_mut(id)
                    .ok_or_else(|| anyhow!("node {node} missing from arena"))?
                    .get_mut();
                if !entry.is_element() {
                    bail!("cannot set attribute `{name}` on non-element node {node}");
                }
                entry.set_attr(name, value);
                Ok(())
            }
            DOMUpdate::RemoveNode { node } => {
                self.remove(*node)?;
                Ok(())
            }
            DOMUpdate::EndOfDocument => Ok(()),
        }
    }

    fn insert(
        &mut self,
        parent: NodeKey,
        node: NodeKey,
        kind: NodeKind,
        pos: usize,
    ) -> Result<(), Error> {
        if self.nodes.contains_key(&node) {
            bail!("node {node} is already in the tree");
        }
        let parent_id = self.id_of(parent)?;
        let new_id = self.dom.new_node(DOMNode {
            key: node,
            kind,
            attrs: SmallVec::new(),
        });
        let sibling = parent_id.children(&self.dom).nth(pos);
        let attached = match sibling {
            Some(sibling_id) => sibling_id.checked_insert_before(new_id, &mut self.dom),
            None => parent_id.checked_append(new_id, &mut self.dom),
        };
        attached.map_err(|err| anyhow!("failed to attach {node} under {parent}: {err}"))?;
        self.nodes.insert(node, new_id);
        trace!("DOM: inserted {node} under {parent} at {pos}");
        Ok(())
    }

    /// Remove a node and its subtree, returning the removed keys in tree order.
    fn remove(&mut self, node: NodeKey) -> Result<Vec<NodeKey>, Error> {
        if node == NodeKey::ROOT {
            bail!("the document node cannot be removed");
        }
        let Some(&id) = self.nodes.get(&node) else {
            debug!("DOM: ignoring removal of unknown node {node}");
            return Ok(Vec::new());
        };
        let removed: Vec<NodeKey> = id
            .descendants(&self.dom)
            .filter_map(|desc| self.dom.get(desc).map(|entry| entry.get().key))
            .collect();
        id.remove_subtree(&mut self.dom);
        for key in &removed {
            self.nodes.remove(key);
        }
        trace!("DOM: removed {} nodes rooted at {node}", removed.len());
        Ok(removed)
    }

    fn id_of(&self, key: NodeKey) -> Result<NodeId, Error> {
        self.nodes
            .get(&key)
            .copied()
            .ok_or_else(|| anyhow!("unknown node {key}"))
    }

    fn key_of(&self, id: NodeId) -> Option<NodeKey> {
        self.dom.get(id).map(|entry| entry.get().key)
    }

    pub const fn root(&self) -> NodeKey {
        NodeKey::ROOT
    }

    /// The first element child of the document, typically `<html>`.
    pub fn document_element(&self) -> Option<NodeKey> {
        self.element_children(NodeKey::ROOT).into_iter().next()
    }

    pub fn get(&self, key: NodeKey) -> Option<&DOMNode> {
        let id = self.nodes.get(&key)?;
        self.dom.get(*id).map(Node::get)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    pub fn parent(&self, key: NodeKey) -> Option<NodeKey> {
        let id = self.nodes.get(&key)?;
        let parent = self.dom.get(*id)?.parent()?;
        self.key_of(parent)
    }

    /// All child nodes in document order.
    pub fn children(&self, key: NodeKey) -> Vec<NodeKey> {
        let Some(id) = self.nodes.get(&key) else {
            return Vec::new();
        };
        id.children(&self.dom)
            .filter_map(|child| self.key_of(child))
            .collect()
    }

    /// Element children in document order, skipping text nodes.
    pub fn element_children(&self, key: NodeKey) -> Vec<NodeKey> {
        let Some(id) = self.nodes.get(&key) else {
            return Vec::new();
        };
        id.children(&self.dom)
            .filter_map(|child| self.dom.get(child).map(Node::get))
            .filter(|entry| entry.is_element())
            .map(|entry| entry.key)
            .collect()
    }

    /// The node and every node below it, in pre-order.
    pub fn descendants(&self, key: NodeKey) -> Vec<NodeKey> {
        let Some(id) = self.nodes.get(&key) else {
            return Vec::new();
        };
        id.descendants(&self.dom)
            .filter_map(|desc| self.key_of(desc))
            .collect()
    }

    /// Inclusive containment, matching `Node.contains`: a node contains itself.
    pub fn contains(&self, ancestor: NodeKey, node: NodeKey) -> bool {
        let (Some(ancestor_id), Some(node_id)) = (self.nodes.get(&ancestor), self.nodes.get(&node))
        else {
            return false;
        };
        node_id
            .ancestors(&self.dom)
            .any(|candidate| candidate == *ancestor_id)
    }

    pub fn tag_name(&self, key: NodeKey) -> Option<&str> {
        self.get(key).and_then(DOMNode::tag)
    }

    pub fn attribute(&self, key: NodeKey, name: &str) -> Option<&str> {
        self.get(key).and_then(|entry| entry.attr(name))
    }

    /// Whitespace-separated entries of the `class` attribute.
    pub fn class_list(&self, key: NodeKey) -> Vec<&str> {
        self.attribute(key, "class")
            .map(|classes| classes.split_ascii_whitespace().collect())
            .unwrap_or_default()
    }
}
