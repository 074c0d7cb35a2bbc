use core::fmt;

use serde::ser::{Serialize, SerializeMap as _, Serializer};

/// The concrete value a property contributed to a context.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Keyword(String),
    Integer(i32),
    Flag(bool),
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Keyword(keyword) => formatter.write_str(keyword),
            Self::Integer(value) => write!(formatter, "{value}"),
            Self::Flag(flag) => write!(formatter, "{flag}"),
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(keyword: &str) -> Self {
        Self::Keyword(keyword.to_owned())
    }
}

/// Properties that made a node a stacking context, in rule order.
///
/// Writing a name twice keeps its first position and replaces the value.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ContextProperties {
    entries: Vec<(&'static str, PropertyValue)>,
}

impl ContextProperties {
    pub fn insert(&mut self, name: &'static str, value: PropertyValue) {
        if let Some(slot) = self.entries.iter_mut().find(|(existing, _)| *existing == name) {
            slot.1 = value;
        } else {
            self.entries.push((name, value));
        }
    }

    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.entries
            .iter()
            .find(|(existing, _)| *existing == name)
            .map(|(_, value)| value)
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &PropertyValue)> {
        self.entries.iter().map(|(name, value)| (*name, value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for ContextProperties {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("{")?;
        for (index, (name, value)) in self.entries.iter().enumerate() {
            if index > 0 {
                formatter.write_str(", ")?;
            }
            write!(formatter, "{name}: {value}")?;
        }
        formatter.write_str("}")
    }
}

impl Serialize for ContextProperties {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}
