//! Minimal cascade producing computed styles for DOM elements.
//!
//! The engine holds a built-in user-agent stylesheet plus any number of
//! author stylesheets, and resolves the inline `style` attribute on top of
//! them. Styles are computed on demand from the current DOM, so a mirrored
//! document always answers from its latest state.

use anyhow::{Error, anyhow};
use css_syntax::{Declaration, parse_declaration_list, parse_stylesheet};
use html::dom::{DOM, NodeKey};
use log::{debug, warn};
use tracing::trace_span;

mod computed_style;
mod dom_subscriber;
mod selector;

pub use computed_style::{ComputedStyle, INITIAL_VALUES};
pub use dom_subscriber::StyledDocument;
pub use selector::{
    Combinator, ComplexSelector, CompoundSelector, Specificity, parse_selector_list,
};

use computed_style::compute_value;

const UA_CSS: &str = r"
html, body, div, p, header, main, footer, section, article, nav, aside, ul, ol,
h1, h2, h3, h4, h5, h6, form, figure, blockquote, pre { display: block }
li { display: list-item }
head, style, script, template, title, meta, link { display: none }
";

/// Anything able to report the computed style of a node.
pub trait StyleProvider {
    /// Snapshot of the effective style of `node`.
    ///
    /// # Errors
    /// Returns an error when `node` is unknown to the provider.
    fn computed_style(&self, node: NodeKey) -> Result<ComputedStyle, Error>;
}

/// Cascade origin, ordered from weakest to strongest for normal declarations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Origin {
    UserAgent,
    Author,
    Inline,
}

#[derive(Clone, Debug)]
struct CascadeRule {
    selectors: Vec<ComplexSelector>,
    declarations: Vec<Declaration>,
    origin: Origin,
    source_order: usize,
}

/// Sort key of one declaration: importance, origin, specificity, source order.
type CascadeKey = (bool, Origin, Specificity, usize);

pub struct StyleEngine {
    rules: Vec<CascadeRule>,
}

impl Default for StyleEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl StyleEngine {
    /// Create an engine holding only the user-agent stylesheet.
    pub fn new() -> Self {
        let mut engine = Self { rules: Vec::new() };
        engine.add_stylesheet(UA_CSS, Origin::UserAgent);
        engine
    }

    /// Append an author stylesheet; returns the number of rules kept.
    pub fn add_author_stylesheet(&mut self, css: &str) -> usize {
        self.add_stylesheet(css, Origin::Author)
    }

    fn add_stylesheet(&mut self, css: &str, origin: Origin) -> usize {
        let sheet = parse_stylesheet(css);
        let before = self.rules.len();
        for rule in sheet.rules {
            let Some(selectors) = parse_selector_list(&rule.prelude) else {
                warn!("style_engine: dropping rule with unsupported selector `{}`", rule.prelude);
                continue;
            };
            let source_order = self.rules.len();
            self.rules.push(CascadeRule {
                selectors,
                declarations: rule.declarations,
                origin,
                source_order,
            });
        }
        let kept = self.rules.len() - before;
        debug!("style_engine: added {kept} {origin:?} rules");
        kept
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Compute the style of `node` in `dom`.
    ///
    /// The document node and text nodes get initial values.
    ///
    /// # Errors
    /// Returns an error if `node` is not in `dom`.
    pub fn compute(&self, dom: &DOM, node: NodeKey) -> Result<ComputedStyle, Error> {
        let entry = dom
            .get(node)
            .ok_or_else(|| anyhow!("no computed style for unknown node {node}"))?;
        let mut style = ComputedStyle::initial();
        if !entry.is_element() {
            return Ok(style);
        }
        let _span = trace_span!("style_compute", node = node.0).entered();

        let inline = dom
            .attribute(node, "style")
            .map(parse_declaration_list)
            .unwrap_or_default();
        let mut cascaded: Vec<(CascadeKey, &Declaration)> = Vec::new();
        for rule in &self.rules {
            let Some(specificity) = rule
                .selectors
                .iter()
                .filter(|selector| selector.matches(dom, node))
                .map(ComplexSelector::specificity)
                .max()
            else {
                continue;
            };
            for declaration in &rule.declarations {
                let key = (
                    declaration.important,
                    rule.origin,
                    specificity,
                    rule.source_order,
                );
                cascaded.push((key, declaration));
            }
        }
        for declaration in &inline {
            let key = (
                declaration.important,
                Origin::Inline,
                Specificity::default(),
                0,
            );
            cascaded.push((key, declaration));
        }
        // Stable sort keeps declaration order within one rule.
        cascaded.sort_by_key(|(key, _)| *key);

        for (_, declaration) in cascaded {
            self.apply_declaration(dom, node, &mut style, declaration)?;
        }
        Ok(style)
    }

    /// Spec: <https://www.w3.org/TR/css-cascade-4/#defaulting-keywords>
    fn apply_declaration(
        &self,
        dom: &DOM,
        node: NodeKey,
        style: &mut ComputedStyle,
        declaration: &Declaration,
    ) -> Result<(), Error> {
        let name = declaration.name.as_str();
        match declaration.value.to_ascii_lowercase().as_str() {
            "initial" | "unset" | "revert" | "revert-layer" => style.reset(name),
            "inherit" => {
                let inherited = match dom.parent(node) {
                    Some(parent) => self.compute(dom, parent)?.get(name).to_owned(),
                    None => String::new(),
                };
                if inherited.is_empty() {
                    style.reset(name);
                } else {
                    style.set(name, &inherited);
                }
            }
            _ => style.set(name, &compute_value(name, &declaration.value)),
        }
        Ok(())
    }
}
