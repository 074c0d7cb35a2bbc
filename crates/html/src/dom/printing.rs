use core::fmt;

use anyhow::{Error, anyhow, bail};
use indextree::NodeId;
use serde_json::{Map, Value, json};

use super::{DOM, DOMNode, DOMUpdate, NodeKey, NodeKind};

fn write_indent(formatter: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
    for _ in 0..depth {
        formatter.write_str("  ")?;
    }
    Ok(())
}

fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for character in text.chars() {
        match character {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(character),
        }
    }
    out
}

fn sorted_attrs(node: &DOMNode) -> Vec<(&str, &str)> {
    let mut pairs: Vec<(&str, &str)> = node
        .attrs
        .iter()
        .map(|(name, value)| (name.as_str(), value.as_str()))
        .collect();
    pairs.sort_by(|left, right| left.0.cmp(right.0));
    pairs
}

fn fmt_node(
    dom: &DOM,
    id: NodeId,
    formatter: &mut fmt::Formatter<'_>,
    depth: usize,
) -> fmt::Result {
    let Some(node_ref) = dom.dom.get(id) else {
        return Ok(());
    };
    let node = node_ref.get();
    match &node.kind {
        NodeKind::Document => {
            write_indent(formatter, depth)?;
            writeln!(formatter, "#document")?;
        }
        NodeKind::Element { tag } => {
            write_indent(formatter, depth)?;
            write!(formatter, "<{tag}")?;
            for (name, value) in sorted_attrs(node) {
                write!(formatter, " {name}=\"{}\"", escape_text(value))?;
            }
            writeln!(formatter, "> {}", node.key)?;
        }
        NodeKind::Text { text } => {
            // Whitespace-only text is noise in tree dumps.
            if text.chars().all(char::is_whitespace) {
                return Ok(());
            }
            write_indent(formatter, depth)?;
            writeln!(formatter, "\"{}\"", escape_text(text))?;
        }
    }
    for child in id.children(&dom.dom) {
        fmt_node(dom, child, formatter, depth + 1)?;
    }
    Ok(())
}

impl fmt::Debug for DOM {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(formatter, "DOM")?;
        fmt_node(self, self.root, formatter, 0)
    }
}

fn node_to_json(dom: &DOM, id: NodeId) -> Value {
    let Some(node_ref) = dom.dom.get(id) else {
        return Value::Null;
    };
    let node = node_ref.get();
    let children: Vec<Value> = id
        .children(&dom.dom)
        .map(|child| node_to_json(dom, child))
        .filter(|value| !value.is_null())
        .collect();
    match &node.kind {
        NodeKind::Document => json!({ "type": "document", "children": children }),
        NodeKind::Element { tag } => {
            let mut attrs = Map::new();
            for (name, value) in sorted_attrs(node) {
                attrs.insert(name.to_owned(), Value::String(value.to_owned()));
            }
            json!({
                "type": "element",
                "key": node.key.0,
                "tag": tag,
                "attrs": Value::Object(attrs),
                "children": children,
            })
        }
        NodeKind::Text { text } => {
            if text.trim().is_empty() {
                Value::Null
            } else {
                json!({ "type": "text", "text": text })
            }
        }
    }
}

impl DOM {
    /// Build a deterministic JSON representation of the DOM.
    ///
    /// Schema:
    /// - Document: `{ "type":"document", "children":[ ... ] }`
    /// - Element: `{ "type":"element", "key": 3, "tag": "div", "attrs": {..}, "children":[ ... ] }`
    /// - Text: `{ "type":"text", "text":"..." }`
    pub fn to_json_value(&self) -> Value {
        node_to_json(self, self.root)
    }

    /// Translate a JSON snapshot (same schema as [`DOM::to_json_value`]) into
    /// insertion updates below `parent`, minting fresh keys.
    ///
    /// A `document` value contributes its children; `key` fields are ignored.
    ///
    /// # Errors
    /// Returns an error when a value does not follow the schema.
    pub fn updates_from_json(
        &mut self,
        parent: NodeKey,
        value: &Value,
    ) -> Result<Vec<DOMUpdate>, Error> {
        let mut out = Vec::new();
        match json_type(value)? {
            "document" => {
                for (pos, child) in json_children(value)?.iter().enumerate() {
                    self.collect_updates(parent, pos, child, &mut out)?;
                }
            }
            _ => {
                let pos = self.children(parent).len();
                self.collect_updates(parent, pos, value, &mut out)?;
            }
        }
        Ok(out)
    }

    /// Build a fresh DOM from a JSON snapshot.
    ///
    /// # Errors
    /// Returns an error when the snapshot does not follow the schema.
    pub fn from_json_value(value: &Value) -> Result<Self, Error> {
        let mut dom = Self::new();
        let mut batch = dom.updates_from_json(NodeKey::ROOT, value)?;
        batch.push(DOMUpdate::EndOfDocument);
        dom.commit(batch)?;
        Ok(dom)
    }

    fn collect_updates(
        &mut self,
        parent: NodeKey,
        pos: usize,
        value: &Value,
        out: &mut Vec<DOMUpdate>,
    ) -> Result<(), Error> {
        match json_type(value)? {
            "element" => {
                let tag = value
                    .get("tag")
                    .and_then(Value::as_str)
                    .ok_or_else(|| anyhow!("element without a `tag` string"))?;
                let node = self.mint_key();
                out.push(DOMUpdate::InsertElement {
                    parent,
                    node,
                    tag: tag.to_owned(),
                    pos,
                });
                if let Some(attrs) = value.get("attrs").and_then(Value::as_object) {
                    for (name, attr_value) in attrs {
                        let text = attr_value
                            .as_str()
                            .ok_or_else(|| anyhow!("attribute `{name}` is not a string"))?;
                        out.push(DOMUpdate::SetAttr {
                            node,
                            name: name.clone(),
                            value: text.to_owned(),
                        });
                    }
                }
                for (child_pos, child) in json_children(value)?.iter().enumerate() {
                    self.collect_updates(node, child_pos, child, out)?;
                }
            }
            "text" => {
                let text = value
                    .get("text")
                    .and_then(Value::as_str)
                    .ok_or_else(|| anyhow!("text node without a `text` string"))?;
                let node = self.mint_key();
                out.push(DOMUpdate::InsertText {
                    parent,
                    node,
                    text: text.to_owned(),
                    pos,
                });
            }
            other => bail!("unexpected node type `{other}` below {parent}"),
        }
        Ok(())
    }
}

fn json_type(value: &Value) -> Result<&str, Error> {
    value
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| anyhow!("node without a `type` string"))
}

fn json_children(value: &Value) -> Result<&[Value], Error> {
    match value.get("children") {
        None | Some(Value::Null) => Ok(&[]),
        Some(Value::Array(children)) => Ok(children.as_slice()),
        Some(_) => bail!("`children` must be an array"),
    }
}
