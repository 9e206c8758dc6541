//! Parsing of `qm status` output.

use serde::ser::{Serialize, SerializeMap, Serializer};

/// Ordered `key: value` pairs reported by `qm status`.
///
/// Keys keep the position of their first occurrence; a repeated key
/// overwrites the earlier value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VmStatus {
    entries: Vec<(String, String)>,
}

impl VmStatus {
    /// Parse line-oriented `key: value` output.
    ///
    /// Each line is split on its first colon and both sides are trimmed.
    /// Lines without a colon are ignored.
    #[must_use]
    pub fn parse(output: &str) -> Self {
        let mut status = Self::default();
        for line in output.lines() {
            if let Some((key, value)) = line.split_once(':') {
                status.insert(key.trim(), value.trim());
            }
        }
        status
    }

    fn insert(&mut self, key: &str, value: &str) {
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value.to_string(),
            None => self.entries.push((key.to_string(), value.to_string())),
        }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// The VM power state, e.g. `running` or `stopped`.
    #[must_use]
    pub fn state(&self) -> Option<&str> {
        self.get("status")
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for VmStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}
