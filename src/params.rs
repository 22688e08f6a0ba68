//! Ordered parameter assembly for Job submissions
//!
//! A [`ParameterSet`] is the flat key/value input to manifest resolution.
//! Insertion order is significant: it drives the naming fallback and the
//! last-write-wins flattening into substitution bindings, so the set is a
//! list of pairs rather than a map, and duplicate keys are allowed.

/// Parse a `KEY=VALUE` argument into a trimmed key/value pair.
///
/// Splits at the first `=`; both sides are trimmed. Wired in as a clap value
/// parser so a malformed override fails at argument parse time, before any
/// template is loaded.
pub fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) => Ok((key.trim().to_string(), value.trim().to_string())),
        None => Err(format!("expected KEY=VALUE format, got '{raw}'")),
    }
}

/// An ordered set of submission parameters
///
/// Immutable once built; constructed fresh for every submission cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterSet {
    entries: Vec<(String, String)>,
}

impl ParameterSet {
    /// Start building a parameter set.
    pub fn builder() -> ParameterSetBuilder {
        ParameterSetBuilder::default()
    }

    /// Iterate entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of entries, counting duplicate keys separately.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the set has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Builder enforcing the assembly order: fixed fields, then overrides, then
/// the queue identifier last
#[derive(Debug, Default)]
pub struct ParameterSetBuilder {
    entries: Vec<(String, String)>,
}

impl ParameterSetBuilder {
    /// Append one entry. Repeating a key shadows the earlier value when the
    /// set is flattened into bindings (last write wins).
    pub fn field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.entries.push((key.into(), value.into()));
        self
    }

    /// Append user overrides in the order given.
    pub fn overrides<'a, I>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = &'a (String, String)>,
    {
        for (key, value) in pairs {
            self.entries.push((key.clone(), value.clone()));
        }
        self
    }

    /// Append the Kueue queue identifier under the reserved key, only when
    /// present. Always the last entry.
    pub fn queue(mut self, queue: Option<&str>) -> Self {
        if let Some(queue) = queue {
            self.entries.push((crate::QUEUE_KEY.to_string(), queue.to_string()));
        }
        self
    }

    /// Finish building.
    pub fn build(self) -> ParameterSet {
        ParameterSet {
            entries: self.entries,
        }
    }
}
