use css_stacking::{ContextTree, scan};
use html::dom::{DOM, DOMSubscriber as _, DOMUpdate, NodeKey};
use style_engine::{StyleEngine, StyledDocument};

const HTML: NodeKey = NodeKey(1);
const OUTER: NodeKey = NodeKey(3);
const INNER: NodeKey = NodeKey(4);
const LEAF: NodeKey = NodeKey(5);

fn element(parent: NodeKey, node: NodeKey, tag: &str, style: &str) -> Vec<DOMUpdate> {
    vec![
        DOMUpdate::InsertElement {
            parent,
            node,
            tag: tag.into(),
            pos: usize::MAX,
        },
        set_style(node, style),
    ]
}

fn set_style(node: NodeKey, style: &str) -> DOMUpdate {
    DOMUpdate::SetAttr {
        node,
        name: "style".into(),
        value: style.into(),
    }
}

/// `html > body > div.outer(ctx) > div.inner(ctx) > span(z-index: 1)`
fn nested() -> StyledDocument {
    let _ = env_logger::builder().is_test(true).try_init();
    let batch: Vec<DOMUpdate> = [
        element(NodeKey::ROOT, HTML, "html", ""),
        element(HTML, NodeKey(2), "body", ""),
        element(NodeKey(2), OUTER, "div", "position: relative; z-index: 1"),
        vec![DOMUpdate::SetAttr {
            node: OUTER,
            name: "class".into(),
            value: "outer".into(),
        }],
        element(OUTER, INNER, "div", "position: absolute; z-index: 2"),
        element(INNER, LEAF, "span", "z-index: 1"),
    ]
    .concat();
    let mut dom = DOM::new();
    dom.commit(batch).unwrap();
    StyledDocument::from_parts(dom, StyleEngine::new())
}

#[test]
fn nearest_registered_ancestor_is_the_parent() {
    let document = nested();
    let mut tree = ContextTree::new(HTML, "html");
    let stats = scan(&mut tree, HTML, &document, &document).unwrap();
    assert_eq!(stats.visited, 5);
    assert_eq!(stats.contexts, 3);
    assert_eq!(stats.added, 2);

    let inner = tree.context_id(INNER).unwrap();
    assert_eq!(tree.find_parent_context(LEAF, &document), Some(inner));
    assert_eq!(
        tree.parent(inner),
        tree.context_id(OUTER)
    );
    assert_eq!(tree.find_parent_context(HTML, &document), None);
    assert_eq!(tree.get_context(OUTER).unwrap().label, "div.outer");
    assert_eq!(tree.path_to_root(INNER), vec![INNER, OUTER, HTML]);
    assert!(tree.path_to_root(LEAF).is_empty());
    assert_eq!(
        tree.describe_path(INNER),
        "div #4 -> div.outer #3 -> html #1"
    );
}

#[test]
fn adding_twice_is_idempotent() {
    let document = nested();
    let mut tree = ContextTree::new(HTML, "html");
    let first = tree.add_context(OUTER, &document, &document).unwrap();
    let before = tree.get_context(OUTER).cloned();
    let second = tree.add_context(OUTER, &document, &document).unwrap();
    assert!(first.is_some());
    assert_eq!(first, second);
    assert_eq!(tree.len(), 2);
    assert_eq!(tree.get_context(OUTER).cloned(), before);

    assert_eq!(tree.add_context(LEAF, &document, &document).unwrap(), None);
    assert_eq!(tree.len(), 2);
}

#[test]
fn inserting_between_parent_and_child_adopts_the_child() {
    let document = nested();
    let mut tree = ContextTree::new(HTML, "html");
    let inner = tree.add_context(INNER, &document, &document).unwrap().unwrap();
    assert_eq!(tree.parent(inner), Some(tree.root()));

    let outer = tree.add_context(OUTER, &document, &document).unwrap().unwrap();
    assert_eq!(tree.parent(inner), Some(outer));
    assert_eq!(tree.children(tree.root()), vec![outer]);
    assert_eq!(tree.children(outer), vec![inner]);
}

#[test]
fn removing_a_context_drops_its_subtree_but_never_the_root() {
    let document = nested();
    let mut tree = ContextTree::new(HTML, "html");
    scan(&mut tree, HTML, &document, &document).unwrap();

    assert!(tree.remove_context(OUTER));
    assert!(tree.get_context(INNER).is_none());
    assert!(tree.get_context(OUTER).is_none());
    assert_eq!(tree.len(), 1);
    assert!(!tree.remove_context(OUTER));
    assert!(!tree.remove_context(HTML));
    assert!(tree.get_context(HTML).is_some());
}

#[test]
fn contexts_that_stop_qualifying_are_demoted_on_rescan() {
    let mut document = nested();
    let mut tree = ContextTree::new(HTML, "html");
    scan(&mut tree, HTML, &document, &document).unwrap();

    document.apply_update(set_style(OUTER, "")).unwrap();
    let stats = scan(&mut tree, HTML, &document, &document).unwrap();
    assert_eq!(stats.demoted, 1);
    assert!(tree.get_context(OUTER).is_none());
    let inner = tree.context_id(INNER).unwrap();
    assert_eq!(tree.parent(inner), Some(tree.root()));
}

#[test]
fn competitors_skip_contexts_and_auto_z_index() {
    let mut document = nested();
    document
        .apply_update(DOMUpdate::InsertElement {
            parent: OUTER,
            node: NodeKey(6),
            tag: "p".into(),
            pos: usize::MAX,
        })
        .unwrap();
    document
        .apply_update(DOMUpdate::InsertElement {
            parent: OUTER,
            node: NodeKey(7),
            tag: "p".into(),
            pos: usize::MAX,
        })
        .unwrap();
    document.apply_update(set_style(NodeKey(7), "z-index: 4")).unwrap();

    let mut tree = ContextTree::new(HTML, "html");
    scan(&mut tree, HTML, &document, &document).unwrap();
    tree.recalculate_competitors(&document, &document).unwrap();

    let outer = tree.get_context(OUTER).unwrap();
    let nodes: Vec<NodeKey> = outer.competitors.iter().map(|competitor| competitor.node).collect();
    assert_eq!(nodes, vec![NodeKey(7)]);
    let inner = tree.get_context(INNER).unwrap();
    assert_eq!(inner.competitors.len(), 1);
    assert_eq!(inner.competitors[0].node, LEAF);
}

#[test]
fn listing_and_json_report() {
    let document = nested();
    let mut tree = ContextTree::new(HTML, "html");
    scan(&mut tree, HTML, &document, &document).unwrap();
    tree.recalculate_competitors(&document, &document).unwrap();

    let listing = tree.to_string();
    let lines: Vec<&str> = listing.lines().collect();
    assert_eq!(lines[0], "html #1 {root-element: true}");
    assert_eq!(lines[1], "  div.outer #3 {position: relative, z-index: 1}");
    assert_eq!(lines[2], "    div #4 {position: absolute, z-index: 2}");
    assert_eq!(lines[3], "      ~ #5 z=1 hsl(30, 100%, 50%)");

    let report = tree.to_json_value();
    assert_eq!(report["label"], "html");
    assert_eq!(report["contexts"][0]["properties"]["z-index"], 1);
    assert_eq!(report["contexts"][0]["contexts"][0]["competitors"][0]["node"], 5);
    let ids: Vec<NodeKey> = tree.iter().map(|(_, context)| context.node).collect();
    assert_eq!(ids, vec![HTML, OUTER, INNER]);
}

fn assert_no_context_competes(tree: &ContextTree) {
    for (_, context) in tree.iter() {
        for competitor in &context.competitors {
            assert!(
                !tree.contains(competitor.node),
                "{} competes inside {} but owns a context",
                competitor.node,
                context.label
            );
        }
    }
}

#[test]
fn competitors_are_consistent_right_after_scan() {
    let document = nested();
    let mut tree = ContextTree::new(HTML, "html");
    scan(&mut tree, HTML, &document, &document).unwrap();

    assert_no_context_competes(&tree);
    assert!(tree.get_context(OUTER).unwrap().competitors.is_empty());
    let inner = tree.get_context(INNER).unwrap();
    assert_eq!(inner.competitors.len(), 1);
    assert_eq!(inner.competitors[0].node, LEAF);
}

#[test]
fn registering_a_child_context_removes_it_from_the_parent_competitors() {
    let document = nested();
    let mut tree = ContextTree::new(HTML, "html");
    tree.add_context(OUTER, &document, &document).unwrap();
    let competing: Vec<NodeKey> = tree
        .get_context(OUTER)
        .unwrap()
        .competitors
        .iter()
        .map(|competitor| competitor.node)
        .collect();
    assert_eq!(competing, vec![INNER]);

    tree.add_context(INNER, &document, &document).unwrap();
    assert!(tree.get_context(OUTER).unwrap().competitors.is_empty());
    assert_no_context_competes(&tree);
}

#[test]
fn demoted_context_competes_inside_its_parent() {
    let mut document = nested();
    let mut tree = ContextTree::new(HTML, "html");
    scan(&mut tree, HTML, &document, &document).unwrap();
    assert!(tree.get_context(OUTER).unwrap().competitors.is_empty());

    document.apply_update(set_style(INNER, "z-index: 2")).unwrap();
    let stats = scan(&mut tree, HTML, &document, &document).unwrap();
    assert_eq!(stats.demoted, 1);
    assert!(!tree.contains(INNER));

    let outer = tree.get_context(OUTER).unwrap();
    assert_eq!(outer.competitors.len(), 1);
    assert_eq!(outer.competitors[0].node, INNER);
    assert_eq!(outer.competitors[0].z_index, 2);
}
