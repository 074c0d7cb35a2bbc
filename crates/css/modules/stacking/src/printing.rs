use core::fmt;

use html::dom::NodeKey;
use serde_json::{Value, json};

use crate::ranker::Competitor;
use crate::tree::{ContextId, ContextTree};

fn write_context(
    tree: &ContextTree,
    id: ContextId,
    formatter: &mut fmt::Formatter<'_>,
    depth: usize,
) -> fmt::Result {
    let Some(context) = tree.get(id) else {
        return Ok(());
    };
    let indent = "  ".repeat(depth);
    writeln!(
        formatter,
        "{indent}{} {} {}",
        context.label, context.node, context.properties
    )?;
    for competitor in &context.competitors {
        writeln!(
            formatter,
            "{indent}  ~ {} z={} {}",
            competitor.node,
            competitor.z_index,
            competitor.border_color()
        )?;
    }
    for child in tree.children(id) {
        write_context(tree, child, formatter, depth + 1)?;
    }
    Ok(())
}

/// One line per context, indented by depth, followed by its ranked competitors.
impl fmt::Display for ContextTree {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_context(self, self.root(), formatter, 0)
    }
}

fn competitor_json(competitor: &Competitor) -> Value {
    json!({
        "node": competitor.node.0,
        "z_index": competitor.z_index,
        "hue": competitor.hue,
        "border_color": competitor.border_color(),
    })
}

fn context_json(tree: &ContextTree, id: ContextId) -> Value {
    let Some(context) = tree.get(id) else {
        return Value::Null;
    };
    let children: Vec<Value> = tree
        .children(id)
        .into_iter()
        .map(|child| context_json(tree, child))
        .collect();
    json!({
        "node": context.node.0,
        "label": context.label,
        "properties": context.properties,
        "competitors": context.competitors.iter().map(competitor_json).collect::<Vec<_>>(),
        "contexts": children,
    })
}

impl ContextTree {
    /// Nested JSON report rooted at the root context.
    ///
    /// Schema: `{ "node", "label", "properties": {..}, "competitors": [..], "contexts": [..] }`
    pub fn to_json_value(&self) -> Value {
        context_json(self, self.root())
    }

    /// `label #key -> label #key -> ...` from `node` up to the root context.
    pub fn describe_path(&self, node: NodeKey) -> String {
        self.path_to_root(node)
            .into_iter()
            .filter_map(|owner| self.get_context(owner))
            .map(|context| format!("{} {}", context.label, context.node))
            .collect::<Vec<_>>()
            .join(" -> ")
    }
}
