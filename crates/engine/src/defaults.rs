use std::collections::BTreeMap;

use tracing::warn;

/// Set applied for a save that has no explicit mapping.
pub const BASIC_SET_NAME: &str = "Basic";

/// Operator-authored mapping from save name to the biome set applied at
/// startup for that save. Persisted as a `save|set;save2|set2;` string in
/// the settings file; that wire form predates this implementation and
/// existing settings files must keep working.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DefaultSets {
    by_save: BTreeMap<String, String>,
}

impl DefaultSets {
    /// Parses the delimited wire form. Segments without a `|` separator are
    /// skipped with a warning rather than failing the whole string.
    pub fn parse(raw: &str) -> Self {
        let mut by_save = BTreeMap::new();
        for segment in raw.split(';') {
            if segment.is_empty() {
                continue;
            }
            match segment.split_once('|') {
                Some((save, set)) if !save.is_empty() => {
                    by_save.insert(save.to_string(), set.to_string());
                }
                _ => warn!(segment, "default_set_segment_skipped"),
            }
        }
        Self { by_save }
    }

    /// Deterministic wire form: entries sorted by save name, each closed
    /// with `;`.
    pub fn encode(&self) -> String {
        let mut out = String::new();
        for (save, set) in &self.by_save {
            out.push_str(save);
            out.push('|');
            out.push_str(set);
            out.push(';');
        }
        out
    }

    pub fn set_for_save(&self, save: &str) -> &str {
        self.by_save
            .get(save)
            .map(String::as_str)
            .unwrap_or(BASIC_SET_NAME)
    }

    pub fn assign(&mut self, save: impl Into<String>, set: impl Into<String>) {
        self.by_save.insert(save.into(), set.into());
    }

    pub fn len(&self) -> usize {
        self.by_save.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_save.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.by_save
            .iter()
            .map(|(save, set)| (save.as_str(), set.as_str()))
    }
}
