use html::dom::{DOM, DOMSubscriber as _, DOMUpdate, NodeKey};
use style_engine::{StyleEngine, StyleProvider as _, StyledDocument};

fn element(parent: u64, node: u64, tag: &str) -> DOMUpdate {
    DOMUpdate::InsertElement {
        parent: NodeKey(parent),
        node: NodeKey(node),
        tag: tag.into(),
        pos: usize::MAX,
    }
}

fn attr(node: u64, name: &str, value: &str) -> DOMUpdate {
    DOMUpdate::SetAttr {
        node: NodeKey(node),
        name: name.into(),
        value: value.into(),
    }
}

/// `<html><body><main id=app class="shell"><div class="card"><span/></div></main></body></html>`
fn build_dom() -> DOM {
    let mut dom = DOM::new();
    dom.commit(vec![
        element(0, 1, "html"),
        element(1, 2, "body"),
        element(2, 3, "main"),
        attr(3, "id", "app"),
        attr(3, "class", "shell"),
        element(3, 4, "div"),
        attr(4, "class", "card raised"),
        element(4, 5, "span"),
    ])
    .unwrap();
    dom
}

#[test]
fn user_agent_defaults_and_initial_values() {
    let _ = env_logger::builder().is_test(true).try_init();
    let dom = build_dom();
    let engine = StyleEngine::new();

    let div = engine.compute(&dom, NodeKey(4)).unwrap();
    assert_eq!(div.get("display"), "block");
    assert_eq!(div.get("position"), "static");
    assert_eq!(div.get("z-index"), "auto");
    assert_eq!(div.get("opacity"), "1");
    assert_eq!(div.get("will-change"), "auto");
    assert_eq!(div.get("color"), "");

    let span = engine.compute(&dom, NodeKey(5)).unwrap();
    assert_eq!(span.get("display"), "inline");

    let document = engine.compute(&dom, NodeKey::ROOT).unwrap();
    assert_eq!(document.get("position"), "static");

    assert!(engine.compute(&dom, NodeKey(99)).is_err());
}

#[test]
fn specificity_then_source_order_decide() {
    let dom = build_dom();
    let mut engine = StyleEngine::new();
    let kept = engine.add_author_stylesheet(
        r"
        #app .card { z-index: 7 }
        div.card { z-index: 3; position: Relative }
        .card { z-index: 1 }
        main > div { opacity: 50% }
        body div { opacity: 0.25 }
        a:hover { z-index: 100 }
        ",
    );
    assert_eq!(kept, 5);

    let div = engine.compute(&dom, NodeKey(4)).unwrap();
    assert_eq!(div.get("z-index"), "7");
    assert_eq!(div.get("position"), "relative");
    // Equal specificity (0,0,2): the later rule wins.
    assert_eq!(div.get("opacity"), "0.25");
}

#[test]
fn child_and_descendant_combinators() {
    let dom = build_dom();
    let mut engine = StyleEngine::new();
    engine.add_author_stylesheet(
        r"
        main > span { isolation: isolate }
        main span { filter: blur(2px) }
        .shell > .card > span { contain: paint }
        ",
    );
    let span = engine.compute(&dom, NodeKey(5)).unwrap();
    assert_eq!(span.get("isolation"), "auto");
    assert_eq!(span.get("filter"), "blur(2px)");
    assert_eq!(span.get("contain"), "paint");
}

#[test]
fn inline_style_and_important_declarations() {
    let dom = build_dom();
    let mut engine = StyleEngine::new();
    engine.add_author_stylesheet(
        ".card { z-index: 4; position: absolute !important; opacity: 0.9 }",
    );
    let mut document = StyledDocument::from_parts(dom, engine);
    document
        .apply_update(attr(4, "style", "z-index: 9; position: fixed; opacity: initial"))
        .unwrap();

    let style = document.computed_style(NodeKey(4)).unwrap();
    assert_eq!(style.get("z-index"), "9");
    assert_eq!(style.get("position"), "absolute");
    assert_eq!(style.get("opacity"), "1");

    document
        .apply_update(attr(4, "style", "position: fixed !important"))
        .unwrap();
    let style = document.computed_style(NodeKey(4)).unwrap();
    assert_eq!(style.get("position"), "fixed");
    assert_eq!(style.get("z-index"), "4");
}

#[test]
fn inherit_takes_the_parent_value() {
    let dom = build_dom();
    let mut engine = StyleEngine::new();
    engine.add_author_stylesheet(".card { transform: scale(2) } span { transform: inherit }");
    let span = engine.compute(&dom, NodeKey(5)).unwrap();
    assert_eq!(span.get("transform"), "scale(2)");
}

#[test]
fn styled_document_follows_mirrored_updates() {
    let mut document = StyledDocument::new(StyleEngine::new());
    document.apply_update(element(0, 1, "div")).unwrap();
    document
        .apply_update(attr(1, "style", "mix-blend-mode: Multiply"))
        .unwrap();
    assert_eq!(
        document.computed_style(NodeKey(1)).unwrap().get("mix-blend-mode"),
        "multiply"
    );

    document
        .apply_update(DOMUpdate::RemoveNode { node: NodeKey(1) })
        .unwrap();
    assert!(document.computed_style(NodeKey(1)).is_err());
    assert!(document.dom().get(NodeKey(1)).is_none());
}
