use html::dom::NodeKey;
use style_engine::StyledDocument;

/// Read-only navigation over the element tree being classified.
pub trait TreeSource {
    /// The root element; it always establishes a stacking context.
    fn root(&self) -> NodeKey;

    fn parent(&self, node: NodeKey) -> Option<NodeKey>;

    /// Element children in document order.
    fn children(&self, node: NodeKey) -> Vec<NodeKey>;

    /// Inclusive containment: every node contains itself.
    fn contains(&self, ancestor: NodeKey, node: NodeKey) -> bool;

    fn tag_name(&self, node: NodeKey) -> Option<&str>;

    fn class_list(&self, node: NodeKey) -> Vec<&str>;

    /// `node` followed by its element descendants in pre-order.
    fn descendants(&self, node: NodeKey) -> Vec<NodeKey>;
}

impl TreeSource for StyledDocument {
    fn root(&self) -> NodeKey {
        self.dom().document_element().unwrap_or(NodeKey::ROOT)
    }

    fn parent(&self, node: NodeKey) -> Option<NodeKey> {
        self.dom().parent(node)
    }

    fn children(&self, node: NodeKey) -> Vec<NodeKey> {
        self.dom().element_children(node)
    }

    fn contains(&self, ancestor: NodeKey, node: NodeKey) -> bool {
        self.dom().contains(ancestor, node)
    }

    fn tag_name(&self, node: NodeKey) -> Option<&str> {
        self.dom().tag_name(node)
    }

    fn class_list(&self, node: NodeKey) -> Vec<&str> {
        self.dom().class_list(node)
    }

    fn descendants(&self, node: NodeKey) -> Vec<NodeKey> {
        let dom = self.dom();
        dom.descendants(node)
            .into_iter()
            .filter(|key| *key == node || dom.tag_name(*key).is_some())
            .collect()
    }
}

/// Display label `tag.class1.class2`; `#document` for the document node.
pub fn context_label<T: TreeSource + ?Sized>(tree: &T, node: NodeKey) -> String {
    let Some(tag) = tree.tag_name(node) else {
        return String::from("#document");
    };
    let mut label = tag.to_owned();
    for class in tree.class_list(node) {
        label.push('.');
        label.push_str(class);
    }
    label
}
