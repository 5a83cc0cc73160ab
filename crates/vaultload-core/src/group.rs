//! Secret grouping.
//!
//! Folds the flat record list into one [`SecretData`] per group name. Group
//! order is the first-seen order of names in the input; within a group a
//! repeated key keeps its first position and takes the later value.

use std::collections::HashMap;
use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::parser::SecretRecord;

/// Ordered key→value map for one secret.
///
/// Serializes as a JSON object in insertion order and deserializes keeping
/// document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecretData {
    entries: Vec<(String, String)>,
}

impl SecretData {
    /// Create an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key` to `value`. An existing key keeps its position.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Look up a value by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map has no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for SecretData {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut data = Self::new();
        for (k, v) in iter {
            data.insert(k, v);
        }
        data
    }
}

impl Serialize for SecretData {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for SecretData {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct DataVisitor;

        impl<'de> Visitor<'de> for DataVisitor {
            type Value = SecretData;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of string keys to string values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<SecretData, A::Error> {
                let mut data = SecretData::new();
                while let Some((k, v)) = access.next_entry::<String, String>()? {
                    data.insert(k, v);
                }
                Ok(data)
            }
        }

        deserializer.deserialize_map(DataVisitor)
    }
}

/// One logical secret: a name and its keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SecretGroup {
    /// Secret name, used as the last path segment.
    pub name: String,
    /// Keys and values to store.
    pub data: SecretData,
}

/// Ordered mapping from secret name to its data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct GroupedSecrets {
    groups: Vec<SecretGroup>,
}

impl GroupedSecrets {
    /// Number of distinct secrets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Whether there are no secrets.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Secret names in first-seen order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(|g| g.name.as_str())
    }

    /// Groups in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = &SecretGroup> {
        self.groups.iter()
    }

    /// Data for one secret.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&SecretData> {
        self.groups.iter().find(|g| g.name == name).map(|g| &g.data)
    }

    /// Total number of keys across all secrets.
    #[must_use]
    pub fn key_count(&self) -> usize {
        self.groups.iter().map(|g| g.data.len()).sum()
    }
}

/// Fold records into grouped secrets. Pure and deterministic.
pub fn group_records(records: &[SecretRecord]) -> GroupedSecrets {
    let mut groups: Vec<SecretGroup> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for record in records {
        let slot = *index.entry(record.group_name.as_str()).or_insert_with(|| {
            groups.push(SecretGroup {
                name: record.group_name.clone(),
                data: SecretData::new(),
            });
            groups.len() - 1
        });
        groups[slot].data.insert(record.key.clone(), record.value.clone());
    }

    GroupedSecrets { groups }
}
