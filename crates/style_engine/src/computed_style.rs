use std::collections::BTreeMap;

/// Initial values of the properties the engine always reports.
///
/// Every [`ComputedStyle`] produced by the engine carries at least these.
pub const INITIAL_VALUES: &[(&str, &str)] = &[
    ("position", "static"),
    ("z-index", "auto"),
    ("display", "inline"),
    ("container-type", "normal"),
    ("opacity", "1"),
    ("mix-blend-mode", "normal"),
    ("transform", "none"),
    ("scale", "none"),
    ("rotate", "none"),
    ("translate", "none"),
    ("filter", "none"),
    ("backdrop-filter", "none"),
    ("perspective", "none"),
    ("clip-path", "none"),
    ("mask", "none"),
    ("mask-image", "none"),
    ("mask-border", "none"),
    ("isolation", "auto"),
    ("contain", "none"),
    ("will-change", "auto"),
];

/// Properties whose values are keywords and therefore compare ASCII case-insensitively.
const KEYWORD_PROPERTIES: &[&str] = &[
    "position",
    "display",
    "container-type",
    "mix-blend-mode",
    "isolation",
    "contain",
    "will-change",
];

/// Serialized computed values keyed by lowercase property name.
///
/// Reading a property that was never set yields the empty string, the same
/// way `getComputedStyle` reports unknown properties.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComputedStyle {
    properties: BTreeMap<String, String>,
}

impl ComputedStyle {
    /// A style holding the initial value of every property in [`INITIAL_VALUES`].
    pub fn initial() -> Self {
        let properties = INITIAL_VALUES
            .iter()
            .map(|(name, value)| ((*name).to_owned(), (*value).to_owned()))
            .collect();
        Self { properties }
    }

    /// Initial values overridden by `pairs`, already in computed form.
    pub fn from_pairs<'pair, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'pair str, &'pair str)>,
    {
        let mut style = Self::initial();
        for (name, value) in pairs {
            style.set(name, value);
        }
        style
    }

    pub fn initial_value(name: &str) -> Option<&'static str> {
        INITIAL_VALUES
            .iter()
            .find(|(candidate, _)| *candidate == name)
            .map(|(_, value)| *value)
    }

    pub fn get(&self, name: &str) -> &str {
        self.properties.get(name).map_or("", String::as_str)
    }

    pub fn set(&mut self, name: &str, value: &str) {
        self.properties
            .insert(name.to_ascii_lowercase(), value.to_owned());
    }

    /// Reset `name` to its initial value, or drop it when it has none.
    pub fn reset(&mut self, name: &str) {
        match Self::initial_value(name) {
            Some(initial) => self.set(name, initial),
            None => {
                self.properties.remove(name);
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.properties
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }
}

/// Convert a cascaded value into its serialized computed form.
///
/// Keywords are lowercased, integer z-indices and opacities are re-serialized
/// (`50%` becomes `0.5`). Values that do not parse are kept verbatim.
pub(crate) fn compute_value(name: &str, specified: &str) -> String {
    let trimmed = specified.trim();
    if KEYWORD_PROPERTIES.contains(&name) {
        return trimmed.to_ascii_lowercase();
    }
    match name {
        "z-index" => trimmed
            .parse::<i32>()
            .map_or_else(|_| trimmed.to_ascii_lowercase(), |value| value.to_string()),
        "opacity" => compute_opacity(trimmed).unwrap_or_else(|| trimmed.to_owned()),
        _ => trimmed.to_owned(),
    }
}

fn compute_opacity(specified: &str) -> Option<String> {
    let number = match specified.strip_suffix('%') {
        Some(percent) => percent.trim().parse::<f32>().ok()? / 100.0,
        None => specified.parse::<f32>().ok()?,
    };
    Some(number.clamp(0.0, 1.0).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_properties_read_as_empty() {
        let style = ComputedStyle::initial();
        assert_eq!(style.get("position"), "static");
        assert_eq!(style.get("color"), "");
    }

    #[test]
    fn values_are_brought_to_computed_form() {
        assert_eq!(compute_value("position", " Relative "), "relative");
        assert_eq!(compute_value("z-index", "+05"), "5");
        assert_eq!(compute_value("z-index", "AUTO"), "auto");
        assert_eq!(compute_value("opacity", "50%"), "0.5");
        assert_eq!(compute_value("opacity", "1.0"), "1");
        assert_eq!(compute_value("opacity", "bogus"), "bogus");
        assert_eq!(compute_value("transform", "rotate(5deg)"), "rotate(5deg)");
    }
}
