//! The ordered rule table deciding whether an element is a stacking-context boundary.
//! Spec: <https://www.w3.org/TR/css-position-4/#stacking-context>
//!
//! Rules are evaluated independently and in table order; every rule that
//! holds contributes its properties. A node that satisfies at least one rule
//! only counts as a context when one of its element children has a z-index
//! other than `auto`, since otherwise nothing competes inside it. The root
//! element is always a context.

use anyhow::Error;
use html::dom::NodeKey;
use style_engine::StyleProvider;

use crate::normalize::{StyleSnapshot, ZIndex, parse_z_index};
use crate::properties::{ContextProperties, PropertyValue};
use crate::source::TreeSource;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Predicate {
    /// `position: absolute|relative` with a numeric z-index.
    PositionedWithZIndex,
    /// `position: fixed|sticky`.
    FixedOrSticky,
    ContainerType,
    Opacity,
    MixBlendMode,
    /// The named property is anything but `none`.
    NotNone(&'static str),
    MaskFamily,
    Isolation,
    Contain,
    /// Numeric z-index on a child of a flex or grid container.
    FlexOrGridChild,
    /// `will-change` names a trigger of any other rule.
    WillChange,
}

/// One row of the rule table.
#[derive(Clone, Copy, Debug)]
pub struct Rule {
    pub name: &'static str,
    /// Property names this rule reacts to; `will-change` matches against them.
    pub triggers: &'static [&'static str],
    predicate: Predicate,
}

pub const RULES: &[Rule] = &[
    Rule {
        name: "position/z-index",
        triggers: &["position", "z-index"],
        predicate: Predicate::PositionedWithZIndex,
    },
    Rule {
        name: "position",
        triggers: &["position"],
        predicate: Predicate::FixedOrSticky,
    },
    Rule {
        name: "container-type",
        triggers: &["container-type"],
        predicate: Predicate::ContainerType,
    },
    Rule {
        name: "opacity",
        triggers: &["opacity"],
        predicate: Predicate::Opacity,
    },
    Rule {
        name: "mix-blend-mode",
        triggers: &["mix-blend-mode"],
        predicate: Predicate::MixBlendMode,
    },
    Rule {
        name: "transform",
        triggers: &["transform"],
        predicate: Predicate::NotNone("transform"),
    },
    Rule {
        name: "scale",
        triggers: &["scale"],
        predicate: Predicate::NotNone("scale"),
    },
    Rule {
        name: "rotate",
        triggers: &["rotate"],
        predicate: Predicate::NotNone("rotate"),
    },
    Rule {
        name: "translate",
        triggers: &["translate"],
        predicate: Predicate::NotNone("translate"),
    },
    Rule {
        name: "filter",
        triggers: &["filter"],
        predicate: Predicate::NotNone("filter"),
    },
    Rule {
        name: "backdrop-filter",
        triggers: &["backdrop-filter"],
        predicate: Predicate::NotNone("backdrop-filter"),
    },
    Rule {
        name: "perspective",
        triggers: &["perspective"],
        predicate: Predicate::NotNone("perspective"),
    },
    Rule {
        name: "clip-path",
        triggers: &["clip-path"],
        predicate: Predicate::NotNone("clip-path"),
    },
    Rule {
        name: "mask/mask-image/mask-border",
        triggers: &["mask", "mask-image", "mask-border"],
        predicate: Predicate::MaskFamily,
    },
    Rule {
        name: "isolation",
        triggers: &["isolation"],
        predicate: Predicate::Isolation,
    },
    Rule {
        name: "contain",
        triggers: &["contain"],
        predicate: Predicate::Contain,
    },
    Rule {
        name: "flex-or-grid-child",
        triggers: &["z-index"],
        predicate: Predicate::FlexOrGridChild,
    },
    Rule {
        name: "will-change",
        triggers: &["will-change"],
        predicate: Predicate::WillChange,
    },
];

const FLEX_OR_GRID: [&str; 4] = ["flex", "inline-flex", "grid", "inline-grid"];
const CONTAIN_TOKENS: [&str; 4] = ["paint", "layout", "strict", "content"];

/// What a rule sees of the node being classified.
pub struct RuleInput<'style> {
    pub style: &'style StyleSnapshot,
    /// Computed `display` of the parent element, when there is one.
    pub parent_display: Option<&'style str>,
}

/// True if `name` is a trigger of any rule other than `will-change`.
pub fn is_trigger_name(name: &str) -> bool {
    RULES
        .iter()
        .filter(|rule| rule.predicate != Predicate::WillChange)
        .any(|rule| rule.triggers.contains(&name))
}

impl Rule {
    pub fn holds(&self, input: &RuleInput<'_>) -> bool {
        let style = input.style;
        match self.predicate {
            Predicate::PositionedWithZIndex => {
                matches!(style.get("position"), "absolute" | "relative") && !style.z_index.is_auto()
            }
            Predicate::FixedOrSticky => matches!(style.get("position"), "fixed" | "sticky"),
            Predicate::ContainerType => {
                matches!(style.get("container-type"), "size" | "inline-size")
            }
            Predicate::Opacity => style.opacity < 1.0,
            Predicate::MixBlendMode => style.get("mix-blend-mode") != "normal",
            Predicate::NotNone(name) => style.get(name) != "none",
            Predicate::MaskFamily => ["mask", "mask-image", "mask-border"]
                .iter()
                .any(|name| style.get(name) != "none"),
            Predicate::Isolation => style.get("isolation") == "isolate",
            Predicate::Contain => style
                .get("contain")
                .split_ascii_whitespace()
                .any(|token| CONTAIN_TOKENS.contains(&token)),
            Predicate::FlexOrGridChild => {
                !style.z_index.is_auto()
                    && input
                        .parent_display
                        .is_some_and(|display| FLEX_OR_GRID.contains(&display))
            }
            Predicate::WillChange => style
                .get("will-change")
                .split(',')
                .any(|token| is_trigger_name(token.trim())),
        }
    }

    fn contribute(&self, input: &RuleInput<'_>, properties: &mut ContextProperties) {
        let style = input.style;
        let keyword = |name: &str| PropertyValue::from(style.get(name));
        match self.predicate {
            Predicate::PositionedWithZIndex => {
                properties.insert("position", keyword("position"));
                if let ZIndex::Value(value) = style.z_index {
                    properties.insert("z-index", PropertyValue::Integer(value));
                }
            }
            Predicate::FixedOrSticky => properties.insert("position", keyword("position")),
            Predicate::NotNone(name) => properties.insert(name, keyword(name)),
            Predicate::MaskFamily => {
                properties.insert("mask", keyword("mask"));
                properties.insert("mask-image", keyword("mask-image"));
                properties.insert("mask-border", keyword("mask-border"));
            }
            Predicate::FlexOrGridChild => {
                if let Some(display) = input.parent_display {
                    properties.insert("parent-display", PropertyValue::from(display));
                }
                if let ZIndex::Value(value) = style.z_index {
                    properties.insert("z-index", PropertyValue::Integer(value));
                }
            }
            Predicate::ContainerType
            | Predicate::Opacity
            | Predicate::MixBlendMode
            | Predicate::Isolation
            | Predicate::Contain
            | Predicate::WillChange => {
                for &name in self.triggers {
                    properties.insert(name, keyword(name));
                }
            }
        }
    }
}

/// Outcome of classifying one node.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Classification {
    pub is_context: bool,
    pub properties: ContextProperties,
}

/// Evaluate every rule for `node`.
///
/// # Errors
/// Propagates style provider failures for the node, its parent, or its children.
pub fn classify<T, S>(node: NodeKey, tree: &T, styles: &S) -> Result<Classification, Error>
where
    T: TreeSource + ?Sized,
    S: StyleProvider + ?Sized,
{
    let computed = styles.computed_style(node)?;
    let style = StyleSnapshot::from_computed(&computed);
    let parent_style = match tree.parent(node) {
        Some(parent) if !style.z_index.is_auto() => Some(styles.computed_style(parent)?),
        Some(_) | None => None,
    };
    let input = RuleInput {
        style: &style,
        parent_display: parent_style.as_ref().map(|parent| parent.get("display")),
    };

    let mut properties = ContextProperties::default();
    let is_root = node == tree.root();
    if is_root {
        properties.insert("root-element", PropertyValue::Flag(true));
    }
    let mut triggered = false;
    for rule in RULES {
        if rule.holds(&input) {
            triggered = true;
            rule.contribute(&input, &mut properties);
        }
    }

    let is_context = is_root || (triggered && has_z_indexed_child(node, tree, styles)?);
    Ok(Classification {
        is_context,
        properties,
    })
}

fn has_z_indexed_child<T, S>(node: NodeKey, tree: &T, styles: &S) -> Result<bool, Error>
where
    T: TreeSource + ?Sized,
    S: StyleProvider + ?Sized,
{
    for child in tree.children(node) {
        let style = styles.computed_style(child)?;
        if !parse_z_index(style.get("z-index")).is_auto() {
            return Ok(true);
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use style_engine::ComputedStyle;

    use super::*;

    fn snapshot(pairs: &[(&str, &str)]) -> StyleSnapshot {
        StyleSnapshot::from_computed(&ComputedStyle::from_pairs(pairs.iter().copied()))
    }

    fn holding(style: &StyleSnapshot, parent_display: Option<&str>) -> Vec<&'static str> {
        let input = RuleInput {
            style,
            parent_display,
        };
        RULES
            .iter()
            .filter(|rule| rule.holds(&input))
            .map(|rule| rule.name)
            .collect()
    }

    #[test]
    fn initial_style_triggers_nothing() {
        assert!(holding(&snapshot(&[]), Some("block")).is_empty());
    }

    #[test]
    fn positioned_rules() {
        let style = snapshot(&[("position", "relative"), ("z-index", "1")]);
        assert_eq!(holding(&style, None), vec!["position/z-index"]);
        let style = snapshot(&[("position", "relative")]);
        assert!(holding(&style, None).is_empty());
        let style = snapshot(&[("position", "sticky")]);
        assert_eq!(holding(&style, None), vec!["position"]);
    }

    #[test]
    fn flex_child_needs_numeric_z_index() {
        let style = snapshot(&[("z-index", "3")]);
        assert_eq!(holding(&style, Some("inline-grid")), vec!["flex-or-grid-child"]);
        assert!(holding(&style, Some("block")).is_empty());
        assert!(holding(&snapshot(&[]), Some("flex")).is_empty());
    }

    #[test]
    fn opacity_and_blend_and_contain() {
        assert_eq!(holding(&snapshot(&[("opacity", "0.99")]), None), vec!["opacity"]);
        assert!(holding(&snapshot(&[("opacity", "1")]), None).is_empty());
        assert!(holding(&snapshot(&[("opacity", "")]), None).is_empty());
        assert_eq!(
            holding(&snapshot(&[("mix-blend-mode", "multiply")]), None),
            vec!["mix-blend-mode"]
        );
        assert_eq!(
            holding(&snapshot(&[("contain", "layout style")]), None),
            vec!["contain"]
        );
        assert!(holding(&snapshot(&[("contain", "size")]), None).is_empty());
    }

    #[test]
    fn mask_border_alone_counts_and_empty_values_are_none() {
        let style = snapshot(&[("mask-border", "url(x.png) 30")]);
        assert_eq!(holding(&style, None), vec!["mask/mask-image/mask-border"]);
        let style = snapshot(&[("transform", ""), ("mask", "")]);
        assert!(holding(&style, None).is_empty());
    }

    #[test]
    fn will_change_matches_other_triggers_only() {
        let style = snapshot(&[("will-change", "scroll-position, transform")]);
        assert_eq!(holding(&style, None), vec!["will-change"]);
        let style = snapshot(&[("will-change", "will-change")]);
        assert!(holding(&style, None).is_empty());
        assert!(is_trigger_name("z-index"));
        assert!(!is_trigger_name("color"));
    }

    #[test]
    fn contributions_keep_rule_order() {
        let style = snapshot(&[
            ("position", "absolute"),
            ("z-index", "4"),
            ("isolation", "isolate"),
        ]);
        let input = RuleInput {
            style: &style,
            parent_display: Some("flex"),
        };
        let mut properties = ContextProperties::default();
        for rule in RULES.iter().filter(|rule| rule.holds(&input)) {
            rule.contribute(&input, &mut properties);
        }
        let names: Vec<&str> = properties.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["position", "z-index", "isolation", "parent-display"]);
        assert_eq!(properties.get("z-index"), Some(&PropertyValue::Integer(4)));
    }
}
