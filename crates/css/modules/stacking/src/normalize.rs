//! Canonical view of the style values the rule table reads.

use std::collections::BTreeMap;

use style_engine::ComputedStyle;

/// Every property the rule table may consult.
pub const TRACKED_PROPERTIES: [&str; 20] = [
    "position",
    "z-index",
    "display",
    "container-type",
    "opacity",
    "mix-blend-mode",
    "transform",
    "scale",
    "rotate",
    "translate",
    "filter",
    "backdrop-filter",
    "perspective",
    "clip-path",
    "mask",
    "mask-image",
    "mask-border",
    "isolation",
    "contain",
    "will-change",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ZIndex {
    #[default]
    Auto,
    Value(i32),
}

impl ZIndex {
    pub const fn is_auto(self) -> bool {
        matches!(self, Self::Auto)
    }

    pub const fn value(self) -> Option<i32> {
        match self {
            Self::Auto => None,
            Self::Value(value) => Some(value),
        }
    }
}

/// Empty strings read as `none`; everything else is kept as reported.
pub fn normalize_value(raw: &str) -> &str {
    if raw.is_empty() { "none" } else { raw }
}

/// Integers become [`ZIndex::Value`]; `auto`, empty and malformed input are `Auto`.
pub fn parse_z_index(raw: &str) -> ZIndex {
    raw.trim().parse::<i32>().map_or(ZIndex::Auto, ZIndex::Value)
}

/// NaN when unparseable, so any `< 1` comparison fails.
pub fn parse_opacity(raw: &str) -> f32 {
    raw.trim().parse::<f32>().unwrap_or(f32::NAN)
}

/// Immutable normalized snapshot of one node's style.
#[derive(Clone, Debug)]
pub struct StyleSnapshot {
    values: BTreeMap<&'static str, String>,
    pub z_index: ZIndex,
    pub opacity: f32,
}

impl StyleSnapshot {
    pub fn from_computed(style: &ComputedStyle) -> Self {
        let values = TRACKED_PROPERTIES
            .iter()
            .map(|name| (*name, normalize_value(style.get(name)).to_owned()))
            .collect();
        Self {
            values,
            z_index: parse_z_index(style.get("z-index")),
            opacity: parse_opacity(style.get("opacity")),
        }
    }

    /// Normalized value of a tracked property; `none` for anything else.
    pub fn get(&self, name: &str) -> &str {
        self.values.get(name).map_or("none", String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_values_fall_back() {
        assert_eq!(parse_z_index("12"), ZIndex::Value(12));
        assert_eq!(parse_z_index("-3"), ZIndex::Value(-3));
        assert_eq!(parse_z_index("auto"), ZIndex::Auto);
        assert_eq!(parse_z_index(""), ZIndex::Auto);
        assert_eq!(parse_z_index("1.5"), ZIndex::Auto);
        assert!(parse_opacity("abc").is_nan());
        assert_eq!(normalize_value(""), "none");
        assert_eq!(normalize_value("auto"), "auto");
    }

    #[test]
    fn snapshot_normalizes_missing_values() {
        let mut style = ComputedStyle::default();
        style.set("opacity", "0.4");
        let snapshot = StyleSnapshot::from_computed(&style);
        assert_eq!(snapshot.get("transform"), "none");
        assert_eq!(snapshot.get("mask-border"), "none");
        assert_eq!(snapshot.z_index, ZIndex::Auto);
        assert!((snapshot.opacity - 0.4).abs() < f32::EPSILON);
    }
}
